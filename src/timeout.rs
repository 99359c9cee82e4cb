//! The proposer's three independent timers, plus the derived "blocked" threshold.

use std::time::{Duration, Instant};

use crate::clock::Clock;

/// A single countdown: either armed with an expiry instant, or idle.
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    active: bool,
    expire_time: Instant,
    duration: Duration,
}

impl Timeout {
    fn new(duration: Duration, now: Instant) -> Timeout {
        Timeout {
            active: false,
            expire_time: now,
            duration,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.active = true;
        self.expire_time = now + self.duration;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.active && now >= self.expire_time
    }

    pub fn expire_time(&self) -> Instant {
        self.expire_time
    }

    /// Time left before expiry, clamped to a 1 second poll floor once the timer is due. Mirrors
    /// the "time until expiry" reading of the original's `paxos_timeout_remaining`.
    pub fn remaining(&self, now: Instant) -> Duration {
        if !self.active {
            return Duration::from_secs(1);
        }
        if self.expire_time <= now {
            Duration::from_secs(1)
        } else {
            self.expire_time - now
        }
    }
}

/// Default durations, matching the original engine's constants exactly.
pub const PREPARE_TIMEOUT: Duration = Duration::from_secs(5);
pub const PROPOSE_TIMEOUT: Duration = Duration::from_secs(5);
pub const RESTART_TIMEOUT: Duration = Duration::from_secs(1);
/// Derived: a node that hasn't heard back from a `RequestChosen` in this long is considered
/// blocked (behind the cluster) rather than merely racing a competing proposer.
pub const CHOSEN_TIMEOUT: Duration = Duration::from_secs(6);

/// The three timers the proposer owns. At most one is logically active at a time.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutSet {
    pub prepare: Timeout,
    pub propose: Timeout,
    pub restart: Timeout,
}

impl TimeoutSet {
    pub fn new(
        prepare_timeout: Duration,
        propose_timeout: Duration,
        restart_timeout: Duration,
        now: Instant,
    ) -> TimeoutSet {
        TimeoutSet {
            prepare: Timeout::new(prepare_timeout, now),
            propose: Timeout::new(propose_timeout, now),
            restart: Timeout::new(restart_timeout, now),
        }
    }

    pub fn stop_all(&mut self) {
        self.prepare.stop();
        self.propose.stop();
        self.restart.stop();
    }

    /// The earliest active timer's expiry, if any is active.
    pub fn earliest_expiry(&self) -> Option<Instant> {
        [self.prepare, self.propose, self.restart]
            .iter()
            .filter(|t| t.is_active())
            .map(|t| t.expire_time())
            .min()
    }
}

/// True once `now` is further than `CHOSEN_TIMEOUT` past `last_request_chosen_time`: the node is
/// likely behind the cluster rather than merely racing a peer for the current ballot.
pub fn is_blocked(last_request_chosen_time: Instant, now: Instant) -> bool {
    now.duration_since(last_request_chosen_time) > CHOSEN_TIMEOUT
}

//! The learner side of the engine: tracking whether this instance's value is known, and the
//! bootstrap/catch-up exchange that lets a lagging node recover it without re-running
//! consensus.
//!
//! The engine keeps only the single most recently learned value (the original source's own
//! noted limitation — see its `TODO: store more than one value` on `paxos_learner_t`), so
//! "do we have the value for instance N" only ever answers yes for the instance this node is
//! currently on.

use std::time::Instant;

use crate::host::Host;
use crate::message::Message;

pub struct Learner {
    pub paxos_id: u64,
    pub learned_value: u64,
    pub has_learned_value: bool,
    pub last_request_chosen_time: Instant,
}

impl Learner {
    pub fn new(now: Instant) -> Learner {
        Learner {
            paxos_id: 0,
            learned_value: 0,
            has_learned_value: false,
            last_request_chosen_time: now,
        }
    }

    pub fn record(&mut self, value: u64) {
        self.learned_value = value;
        self.has_learned_value = true;
    }

    /// Called after a value has been learned for the current instance: advances to the next one.
    /// `has_learned_value`/`learned_value` are left untouched, so the last-learned value keeps
    /// answering bootstrap/catch-up requests until the next instance overwrites it.
    pub fn start_new_round(&mut self) {
        self.paxos_id += 1;
    }

    fn value_for(&self, instance: u64) -> Option<u64> {
        if self.has_learned_value && instance == self.paxos_id.saturating_sub(1) {
            Some(self.learned_value)
        } else {
            None
        }
    }

    /// A peer believes it is behind us at `msg.paxos_id`; reply with what we know.
    pub fn handle_request_chosen<H: Host>(&mut self, msg: &Message, node_id: u64, host: &mut H) {
        if msg.paxos_id >= self.paxos_id {
            return;
        }
        match self.value_for(msg.paxos_id) {
            Some(value) => host.send(msg.node_id, &Message::catchup_start(msg.paxos_id, node_id, value)),
            None => host.send(
                msg.node_id,
                &Message::catchup_start(self.paxos_id, node_id, 0),
            ),
        }
    }

    /// A peer just came up; if we already know the current instance's value, hand it over
    /// directly instead of waiting for it to ask.
    pub fn handle_bootstrap<H: Host>(&self, msg: &Message, node_id: u64, host: &mut H) {
        if msg.node_id == node_id {
            return;
        }
        if self.has_learned_value {
            host.send(
                msg.node_id,
                &Message::catchup_response(self.paxos_id, node_id, self.learned_value),
            );
        }
    }

    pub fn handle_catchup_start<H: Host>(&self, msg: &Message, node_id: u64, host: &mut H) {
        if msg.node_id == node_id {
            return;
        }
        host.send(msg.node_id, &Message::catchup_request(msg.paxos_id, node_id));
    }

    pub fn handle_catchup_request<H: Host>(&self, msg: &Message, node_id: u64, host: &mut H) {
        if let Some(value) = self.value_for(msg.paxos_id) {
            host.send(
                msg.node_id,
                &Message::catchup_response(msg.paxos_id, node_id, value),
            );
        }
    }

    /// Applies a catch-up response. Returns the learned value if this moved us forward.
    pub fn handle_catchup_response(&mut self, msg: &Message) -> Option<u64> {
        if self.has_learned_value && self.paxos_id >= msg.paxos_id {
            return None;
        }
        self.paxos_id = msg.paxos_id;
        self.record(msg.value);
        Some(msg.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};

    struct RecordingHost {
        sent: Vec<(u64, Message)>,
    }

    impl RecordingHost {
        fn new() -> RecordingHost {
            RecordingHost { sent: Vec::new() }
        }
    }

    impl Host for RecordingHost {
        fn send(&mut self, node_id: u64, message: &Message) {
            self.sent.push((node_id, *message));
        }
        fn broadcast(&mut self, _message: &Message) {}
        fn on_learned(&mut self, _value: u64) {}
    }

    #[test]
    fn ignores_request_chosen_from_an_equal_or_ahead_peer() {
        let clock = ManualClock::new();
        let mut learner = Learner::new(clock.now());
        learner.paxos_id = 3;
        let mut host = RecordingHost::new();
        learner.handle_request_chosen(&Message::request_chosen(3, 9), 1, &mut host);
        assert!(host.sent.is_empty());
    }

    #[test]
    fn bootstrap_from_self_is_ignored() {
        let clock = ManualClock::new();
        let learner = Learner::new(clock.now());
        let mut host = RecordingHost::new();
        learner.handle_bootstrap(&Message::bootstrap(1), 1, &mut host);
        assert!(host.sent.is_empty());
    }

    #[test]
    fn catchup_response_jumps_ahead_and_returns_the_value() {
        let clock = ManualClock::new();
        let mut learner = Learner::new(clock.now());
        let learned = learner.handle_catchup_response(&Message::catchup_response(4, 2, 5));
        assert_eq!(learned, Some(5));
        assert_eq!(learner.paxos_id, 4);
        assert_eq!(learner.learned_value, 5);
    }

    #[test]
    fn stale_catchup_response_is_ignored() {
        let clock = ManualClock::new();
        let mut learner = Learner::new(clock.now());
        learner.paxos_id = 5;
        learner.record(10);
        let learned = learner.handle_catchup_response(&Message::catchup_response(4, 2, 99));
        assert_eq!(learned, None);
        assert_eq!(learner.learned_value, 10);
    }
}

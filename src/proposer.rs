//! The proposer side of the engine: phase-1 (prepare) and phase-2 (propose) ballots, and the
//! three timeout-driven retry callbacks.

use std::time::{Duration, Instant};

use log::Level;

use crate::host::Host;
use crate::message::{Message, MessageType};
use crate::quorum::Quorum;
use crate::timeout::{self, TimeoutSet};

/// Per-instance proposer bookkeeping. Reset whenever the engine advances to a new instance.
#[derive(Debug, Clone, Copy)]
pub struct ProposerState {
    pub preparing: bool,
    pub proposing: bool,
    pub learn_sent: bool,
    pub proposal_id: u64,
    pub highest_received_proposal_id: u64,
    pub highest_promised_proposal_id: u64,
    pub proposed_value: u64,
}

// Manual Default: see https://github.com/rust-lang/rust/issues/45036.
impl Default for ProposerState {
    fn default() -> Self {
        ProposerState {
            preparing: false,
            proposing: false,
            learn_sent: false,
            proposal_id: 0,
            highest_received_proposal_id: 0,
            highest_promised_proposal_id: 0,
            proposed_value: 0,
        }
    }
}

pub struct Proposer {
    pub state: ProposerState,
    pub quorum: Quorum,
    pub timeouts: TimeoutSet,
}

impl Proposer {
    pub fn new(
        num_nodes: u32,
        prepare_timeout: Duration,
        propose_timeout: Duration,
        restart_timeout: Duration,
        now: Instant,
    ) -> Proposer {
        Proposer {
            state: ProposerState::default(),
            quorum: Quorum::new(num_nodes),
            timeouts: TimeoutSet::new(prepare_timeout, propose_timeout, restart_timeout, now),
        }
    }

    /// Entry point for a user-driven `propose(value)`. Always runs phase-1 first, even on the
    /// node's first attempt for this instance (plain Paxos, not the Multi-Paxos leader-lease
    /// shortcut).
    pub fn propose<H: Host>(
        &mut self,
        value: u64,
        node_id: u64,
        paxos_id: u64,
        host: &mut H,
        now: Instant,
    ) {
        self.state.proposed_value = value;
        self.start_preparing(node_id, paxos_id, host, now);
    }

    fn start_preparing<H: Host>(&mut self, node_id: u64, paxos_id: u64, host: &mut H, now: Instant) {
        self.state.proposal_id = 1 + self
            .state
            .proposal_id
            .max(self.state.highest_promised_proposal_id);
        self.state.preparing = true;
        self.state.proposing = false;
        self.state.learn_sent = false;
        self.state.highest_received_proposal_id = 0;
        self.quorum.reset();

        self.timeouts.restart.stop();
        self.timeouts.prepare.start(now);

        if log_enabled!(Level::Info) {
            info!(
                "[node={}] instance {} entering phase 1 with proposal_id {}",
                node_id, paxos_id, self.state.proposal_id
            );
        }

        host.broadcast(&Message::prepare_request(
            paxos_id,
            node_id,
            self.state.proposal_id,
        ));
    }

    fn start_proposing<H: Host>(&mut self, node_id: u64, paxos_id: u64, host: &mut H, now: Instant) {
        self.state.preparing = false;
        self.state.proposing = true;
        self.quorum.reset();

        self.timeouts.restart.stop();
        self.timeouts.propose.start(now);

        if log_enabled!(Level::Info) {
            info!(
                "[node={}] instance {} entering phase 2 with proposal_id {} value {}",
                node_id, paxos_id, self.state.proposal_id, self.state.proposed_value
            );
        }

        host.broadcast(&Message::propose_request(
            paxos_id,
            node_id,
            self.state.proposal_id,
            self.state.proposed_value,
        ));
    }

    /// Handles a PREPARE_REJECTED / PREPARE_CURRENTLY_OPEN / PREPARE_PREVIOUSLY_ACCEPTED
    /// response. Responses for a stale ballot, or arriving while not preparing, are ignored.
    pub fn handle_prepare_response<H: Host>(
        &mut self,
        msg: &Message,
        node_id: u64,
        paxos_id: u64,
        host: &mut H,
        now: Instant,
    ) {
        if !self.state.preparing || msg.proposal_id != self.state.proposal_id {
            return;
        }

        match msg.message_type {
            MessageType::PrepareRejected => {
                self.quorum.reject();
                if msg.promised_proposal_id > self.state.highest_promised_proposal_id {
                    self.state.highest_promised_proposal_id = msg.promised_proposal_id;
                }
            }
            MessageType::PrepareCurrentlyOpen => {
                self.quorum.accept();
            }
            MessageType::PreparePreviouslyAccepted => {
                self.quorum.accept();
                if msg.accepted_proposal_id >= self.state.highest_received_proposal_id {
                    self.state.highest_received_proposal_id = msg.accepted_proposal_id;
                    self.state.proposed_value = msg.value;
                }
            }
            _ => return,
        }

        if self.quorum.is_accepted() {
            self.start_proposing(node_id, paxos_id, host, now);
        } else if self.quorum.is_rejected() {
            self.state.preparing = false;
            self.timeouts.prepare.stop();
            self.timeouts.restart.start(now);
        }
    }

    /// Handles a PROPOSE_ACCEPTED / PROPOSE_REJECTED response. Returns `true` once this call
    /// causes the value to be considered chosen (the caller should broadcast the learn message
    /// and record the value).
    pub fn handle_propose_response<H: Host>(
        &mut self,
        msg: &Message,
        node_id: u64,
        paxos_id: u64,
        host: &mut H,
        now: Instant,
    ) -> bool {
        if !self.state.proposing || msg.proposal_id != self.state.proposal_id {
            return false;
        }

        match msg.message_type {
            MessageType::ProposeAccepted => self.quorum.accept(),
            MessageType::ProposeRejected => self.quorum.reject(),
            _ => return false,
        }

        if self.quorum.is_accepted() {
            self.state.proposing = false;
            self.timeouts.propose.stop();
            if !self.state.learn_sent {
                self.state.learn_sent = true;
                if log_enabled!(Level::Info) {
                    info!(
                        "[node={}] instance {} chosen with proposal_id {}",
                        node_id, paxos_id, self.state.proposal_id
                    );
                }
                host.broadcast(&Message::learn_proposal(
                    paxos_id,
                    node_id,
                    self.state.proposal_id,
                ));
            }
            return true;
        } else if self.quorum.is_rejected() {
            self.state.proposing = false;
            self.timeouts.propose.stop();
            self.timeouts.restart.start(now);
        }
        false
    }

    fn retry_or_wait<H: Host>(
        &mut self,
        node_id: u64,
        paxos_id: u64,
        last_request_chosen_time: Instant,
        host: &mut H,
        now: Instant,
        rearm: impl FnOnce(&mut TimeoutSet, Instant),
    ) {
        let blocked = timeout::is_blocked(last_request_chosen_time, now);
        if blocked || self.quorum.is_rejected() {
            self.start_preparing(node_id, paxos_id, host, now);
        } else {
            rearm(&mut self.timeouts, now);
        }
    }

    pub fn on_prepare_timeout<H: Host>(
        &mut self,
        node_id: u64,
        paxos_id: u64,
        last_request_chosen_time: Instant,
        host: &mut H,
        now: Instant,
    ) {
        self.retry_or_wait(node_id, paxos_id, last_request_chosen_time, host, now, |t, now| {
            t.prepare.start(now)
        });
    }

    pub fn on_propose_timeout<H: Host>(
        &mut self,
        node_id: u64,
        paxos_id: u64,
        last_request_chosen_time: Instant,
        host: &mut H,
        now: Instant,
    ) {
        self.retry_or_wait(node_id, paxos_id, last_request_chosen_time, host, now, |t, now| {
            t.propose.start(now)
        });
    }

    /// The restart timer only ever fires while the proposer is idle (neither preparing nor
    /// proposing); it re-enters phase-1 if the node looks blocked, otherwise keeps waiting.
    pub fn on_restart_timeout<H: Host>(
        &mut self,
        node_id: u64,
        paxos_id: u64,
        last_request_chosen_time: Instant,
        host: &mut H,
        now: Instant,
    ) {
        debug_assert!(!self.state.preparing && !self.state.proposing);
        if timeout::is_blocked(last_request_chosen_time, now) {
            self.start_preparing(node_id, paxos_id, host, now);
        } else {
            self.timeouts.restart.start(now);
        }
    }

    pub fn reset(
        &mut self,
        num_nodes: u32,
        prepare_timeout: Duration,
        propose_timeout: Duration,
        restart_timeout: Duration,
        now: Instant,
    ) {
        *self = Proposer::new(num_nodes, prepare_timeout, propose_timeout, restart_timeout, now);
    }
}

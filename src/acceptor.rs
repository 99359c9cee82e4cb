//! The acceptor side of the engine: the can-accept predicate, prepare/propose handling, the
//! commit-hook gate, and the learn-chosen handling that feeds the learner.
//!
//! The commit hook here is a synchronous stub, matching the original source's own stub. Unlike
//! the source — which passes a pointer to an on-stack `commit_info` into the callback, a latent
//! bug if the commit is ever made truly asynchronous — the pending response is owned by
//! [`AcceptorState`] itself, so a future asynchronous commit implementation can defer
//! `finish_commit` without dangling anything.

use log::Level;

use crate::host::Host;
use crate::message::{Message, MessageType};

#[derive(Debug, Clone, Copy)]
pub struct AcceptorState {
    pub promised_proposal_id: u64,
    pub accepted: bool,
    pub accepted_proposal_id: u64,
    pub accepted_value: u64,
    pub is_committing: bool,
    sender_id: u64,
    written_paxos_id: u64,
    pending_response: Option<Message>,
}

impl Default for AcceptorState {
    fn default() -> Self {
        AcceptorState {
            promised_proposal_id: 0,
            accepted: false,
            accepted_proposal_id: 0,
            accepted_value: 0,
            is_committing: false,
            sender_id: 0,
            written_paxos_id: 0,
            pending_response: None,
        }
    }
}

/// Outcome of handling a learn-chosen message, for the engine to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    /// The message was for a stale or committing instance; nothing to do.
    Dropped,
    /// The sender is behind us; a REQUEST_CHOSEN has been sent back to them.
    RequestedChosen,
    /// The instance's value is now known.
    Learned(u64),
}

pub struct Acceptor {
    pub state: AcceptorState,
}

impl Acceptor {
    pub fn new() -> Acceptor {
        Acceptor {
            state: AcceptorState::default(),
        }
    }

    fn can_accept(&self, msg: &Message, paxos_id: u64) -> bool {
        msg.paxos_id == paxos_id
            && msg.proposal_id >= self.state.promised_proposal_id
            && !self.state.is_committing
    }

    pub fn handle_prepare_request<H: Host>(
        &mut self,
        msg: &Message,
        node_id: u64,
        paxos_id: u64,
        host: &mut H,
    ) {
        if !self.can_accept(msg, paxos_id) {
            if log_enabled!(Level::Info) {
                info!(
                    "[node={}] rejecting prepare for proposal_id {} (promised {})",
                    node_id, msg.proposal_id, self.state.promised_proposal_id
                );
            }
            host.send(
                msg.node_id,
                &Message::prepare_rejected(
                    paxos_id,
                    node_id,
                    msg.proposal_id,
                    self.state.promised_proposal_id,
                ),
            );
            return;
        }

        self.state.promised_proposal_id = msg.proposal_id;
        self.state.sender_id = msg.node_id;

        let response = if self.state.accepted {
            Message::prepare_previously_accepted(
                paxos_id,
                node_id,
                msg.proposal_id,
                self.state.accepted_proposal_id,
                self.state.accepted_value,
            )
        } else {
            Message::prepare_currently_open(paxos_id, node_id, msg.proposal_id)
        };

        self.begin_commit(paxos_id, response, host);
    }

    pub fn handle_propose_request<H: Host>(
        &mut self,
        msg: &Message,
        node_id: u64,
        paxos_id: u64,
        host: &mut H,
    ) {
        if !self.can_accept(msg, paxos_id) {
            if log_enabled!(Level::Info) {
                info!(
                    "[node={}] rejecting propose for proposal_id {} (promised {})",
                    node_id, msg.proposal_id, self.state.promised_proposal_id
                );
            }
            host.send(
                msg.node_id,
                &Message::propose_rejected(paxos_id, node_id, msg.proposal_id),
            );
            return;
        }

        self.state.accepted = true;
        self.state.accepted_proposal_id = msg.proposal_id;
        self.state.accepted_value = msg.value;
        self.state.sender_id = msg.node_id;

        let response = Message::propose_accepted(paxos_id, node_id, msg.proposal_id);
        self.begin_commit(paxos_id, response, host);
    }

    /// Starts the (here, synchronous) commit. While committing, no further state-mutating
    /// transition may occur; see `can_accept`.
    fn begin_commit<H: Host>(&mut self, paxos_id: u64, response: Message, host: &mut H) {
        self.state.is_committing = true;
        self.state.written_paxos_id = paxos_id;
        self.state.pending_response = Some(response);
        self.finish_commit(paxos_id, host);
    }

    /// Called once the durable write completes. Only emits the queued response if the instance
    /// has not advanced underneath the write.
    fn finish_commit<H: Host>(&mut self, completed_paxos_id: u64, host: &mut H) {
        self.state.is_committing = false;
        if let Some(response) = self.state.pending_response.take() {
            if completed_paxos_id == self.state.written_paxos_id {
                host.send(self.state.sender_id, &response);
            }
        }
    }

    /// Handles PAXOS_LEARN_VALUE / PAXOS_LEARN_PROPOSAL, and the REQUEST_CHOSEN fallback for a
    /// LEARN_PROPOSAL this acceptor cannot corroborate.
    pub fn handle_learn<H: Host>(
        &mut self,
        msg: &Message,
        node_id: u64,
        paxos_id: u64,
        host: &mut H,
    ) -> LearnOutcome {
        if self.state.is_committing {
            return LearnOutcome::Dropped;
        }

        if msg.paxos_id > paxos_id {
            host.send(msg.node_id, &Message::request_chosen(paxos_id, node_id));
            return LearnOutcome::RequestedChosen;
        }
        if msg.paxos_id < paxos_id {
            return LearnOutcome::Dropped;
        }

        match msg.message_type {
            MessageType::LearnValue => {
                self.state.accepted = true;
                self.state.accepted_value = msg.value;
                LearnOutcome::Learned(msg.value)
            }
            MessageType::LearnProposal => {
                if self.state.accepted && self.state.accepted_proposal_id == msg.proposal_id {
                    LearnOutcome::Learned(self.state.accepted_value)
                } else {
                    host.send(msg.node_id, &Message::request_chosen(paxos_id, node_id));
                    LearnOutcome::RequestedChosen
                }
            }
            _ => LearnOutcome::Dropped,
        }
    }

    pub fn reset(&mut self) {
        self.state = AcceptorState::default();
    }
}

impl Default for Acceptor {
    fn default() -> Self {
        Acceptor::new()
    }
}

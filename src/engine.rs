//! The engine itself: wires the proposer, acceptor and learner to a single shared instance
//! counter, dispatches inbound messages to the right sub-machine, and exposes the handful of
//! entry points a host drives (`open`/`close`/`bootstrap`/`propose`/`process_message`/
//! `next_timeout`/`timeout_trigger`).

use std::time::Duration;

use log::Level;

use crate::acceptor::{Acceptor, LearnOutcome};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::host::Host;
use crate::learner::Learner;
use crate::message::{Message, MessageType};
use crate::proposer::Proposer;

/// A single-decree Paxos engine for one node in a cluster of `num_nodes`.
///
/// Generic over the host capability `H` (send/broadcast/on_learned) and, for tests, over the
/// clock `C`; production code uses the default [`SystemClock`].
pub struct Paxos<H: Host, C: Clock = SystemClock> {
    host: H,
    clock: C,
    config: EngineConfig,
    node_id: u64,
    num_nodes: u32,
    proposer: Proposer,
    acceptor: Acceptor,
    learner: Learner,
}

impl<H: Host> Paxos<H, SystemClock> {
    pub fn open(host: H, node_id: u64, num_nodes: u32) -> Paxos<H, SystemClock> {
        Paxos::open_with(host, SystemClock, node_id, num_nodes, EngineConfig::default())
    }
}

impl<H: Host, C: Clock> Paxos<H, C> {
    pub fn open_with(
        host: H,
        clock: C,
        node_id: u64,
        num_nodes: u32,
        config: EngineConfig,
    ) -> Paxos<H, C> {
        let now = clock.now();
        let proposer = Proposer::new(
            num_nodes,
            config.prepare_timeout(),
            config.propose_timeout(),
            config.restart_timeout(),
            now,
        );
        Paxos {
            host,
            clock,
            config,
            node_id,
            num_nodes,
            proposer,
            acceptor: Acceptor::new(),
            learner: Learner::new(now),
        }
    }

    pub fn close(&mut self) {
        self.proposer.timeouts.stop_all();
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn current_instance(&self) -> u64 {
        self.learner.paxos_id
    }

    pub fn learned_value(&self) -> Option<u64> {
        if self.learner.has_learned_value {
            Some(self.learner.learned_value)
        } else {
            None
        }
    }

    pub fn bootstrap(&mut self) {
        if log_enabled!(Level::Info) {
            info!("[node={}] bootstrapping", self.node_id);
        }
        self.host.broadcast(&Message::bootstrap(self.node_id));
    }

    pub fn propose(&mut self, value: u64) {
        let now = self.clock.now();
        let paxos_id = self.learner.paxos_id;
        self.proposer
            .propose(value, self.node_id, paxos_id, &mut self.host, now);
    }

    /// How long the host may safely block before calling `timeout_trigger` again.
    pub fn next_timeout(&self) -> Duration {
        let now = self.clock.now();
        let timeouts = &self.proposer.timeouts;
        [timeouts.prepare, timeouts.propose, timeouts.restart]
            .iter()
            .filter(|t| t.is_active())
            .map(|t| t.remaining(now))
            .min()
            .unwrap_or_else(|| Duration::from_secs(1))
    }

    /// Fires whichever proposer timer is currently due, if any.
    pub fn timeout_trigger(&mut self) {
        let now = self.clock.now();
        let last_request_chosen_time = self.learner.last_request_chosen_time;
        let node_id = self.node_id;
        let paxos_id = self.learner.paxos_id;

        if self.proposer.timeouts.prepare.is_expired(now) {
            self.proposer.timeouts.prepare.stop();
            self.proposer.on_prepare_timeout(
                node_id,
                paxos_id,
                last_request_chosen_time,
                &mut self.host,
                now,
            );
        } else if self.proposer.timeouts.propose.is_expired(now) {
            self.proposer.timeouts.propose.stop();
            self.proposer.on_propose_timeout(
                node_id,
                paxos_id,
                last_request_chosen_time,
                &mut self.host,
                now,
            );
        } else if self.proposer.timeouts.restart.is_expired(now) {
            self.proposer.timeouts.restart.stop();
            self.proposer.on_restart_timeout(
                node_id,
                paxos_id,
                last_request_chosen_time,
                &mut self.host,
                now,
            );
        }
    }

    pub fn process_message(&mut self, msg: &Message) {
        let now = self.clock.now();
        let node_id = self.node_id;
        let paxos_id = self.learner.paxos_id;

        match msg.message_type {
            MessageType::PrepareRequest => {
                self.acceptor
                    .handle_prepare_request(msg, node_id, paxos_id, &mut self.host);
            }
            MessageType::ProposeRequest => {
                self.acceptor
                    .handle_propose_request(msg, node_id, paxos_id, &mut self.host);
            }
            MessageType::PrepareRejected
            | MessageType::PrepareCurrentlyOpen
            | MessageType::PreparePreviouslyAccepted => {
                self.proposer
                    .handle_prepare_response(msg, node_id, paxos_id, &mut self.host, now);
            }
            MessageType::ProposeAccepted | MessageType::ProposeRejected => {
                let chosen = self
                    .proposer
                    .handle_propose_response(msg, node_id, paxos_id, &mut self.host, now);
                if chosen {
                    self.learn(self.proposer.state.proposed_value);
                }
            }
            MessageType::LearnValue | MessageType::LearnProposal => {
                match self
                    .acceptor
                    .handle_learn(msg, node_id, paxos_id, &mut self.host)
                {
                    LearnOutcome::Learned(value) => self.learn(value),
                    LearnOutcome::RequestedChosen => {
                        self.learner.last_request_chosen_time = now;
                    }
                    LearnOutcome::Dropped => {}
                }
            }
            MessageType::RequestChosen => {
                self.learner
                    .handle_request_chosen(msg, node_id, &mut self.host);
            }
            MessageType::Bootstrap => {
                self.learner.handle_bootstrap(msg, node_id, &mut self.host);
            }
            MessageType::CatchupStart => {
                self.learner
                    .handle_catchup_start(msg, node_id, &mut self.host);
            }
            MessageType::CatchupRequest => {
                self.learner
                    .handle_catchup_request(msg, node_id, &mut self.host);
            }
            MessageType::CatchupResponse => {
                if let Some(value) = self.learner.handle_catchup_response(msg) {
                    self.host.on_learned(value);
                    self.proposer.reset(
                        self.num_nodes,
                        self.config.prepare_timeout(),
                        self.config.propose_timeout(),
                        self.config.restart_timeout(),
                        now,
                    );
                    self.acceptor.reset();
                }
            }
            MessageType::UserProposeValue | MessageType::UserLearnValue => {
                warn!(
                    "[node={}] user-facing message {:?} reached the engine; the server layer \
                     should translate it instead",
                    node_id, msg.message_type
                );
            }
        }
    }

    /// Records `value` as chosen for the current instance, notifies the host, and advances.
    fn learn(&mut self, value: u64) {
        self.learner.record(value);
        self.host.on_learned(value);
        self.learner.start_new_round();
        let now = self.clock.now();
        self.proposer.reset(
            self.num_nodes,
            self.config.prepare_timeout(),
            self.config.propose_timeout(),
            self.config.restart_timeout(),
            now,
        );
        self.acceptor.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct Outbox {
        sent: Rc<RefCell<Vec<(u64, Message)>>>,
        broadcast: Rc<RefCell<Vec<Message>>>,
        learned: Rc<RefCell<Vec<u64>>>,
    }

    impl Outbox {
        fn new() -> Outbox {
            Outbox {
                sent: Rc::new(RefCell::new(Vec::new())),
                broadcast: Rc::new(RefCell::new(Vec::new())),
                learned: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl Host for Outbox {
        fn send(&mut self, node_id: u64, message: &Message) {
            self.sent.borrow_mut().push((node_id, *message));
        }
        fn broadcast(&mut self, message: &Message) {
            self.broadcast.borrow_mut().push(*message);
        }
        fn on_learned(&mut self, value: u64) {
            self.learned.borrow_mut().push(value);
        }
    }

    #[test]
    fn single_node_cluster_commits_locally() {
        let clock = ManualClock::new();
        let mut engine = Paxos::open_with(Outbox::new(), clock, 1, 1, EngineConfig::default());
        engine.propose(42);

        let prepare_req = engine.host().broadcast.borrow()[0];
        engine.process_message(&Message::prepare_currently_open(
            0,
            1,
            prepare_req.proposal_id,
        ));
        let propose_req = engine.host().broadcast.borrow()[1];
        engine.process_message(&Message::propose_accepted(0, 1, propose_req.proposal_id));

        assert_eq!(engine.learned_value(), Some(42));
        assert_eq!(engine.current_instance(), 1);
        assert_eq!(*engine.host().learned.borrow(), vec![42]);
    }

    #[test]
    fn bootstrap_from_a_caught_up_peer_learns_immediately() {
        let clock = ManualClock::new();
        let mut engine = Paxos::open_with(Outbox::new(), clock, 2, 3, EngineConfig::default());
        engine.process_message(&Message::catchup_response(4, 9, 5));
        assert_eq!(engine.learned_value(), Some(5));
        assert_eq!(engine.current_instance(), 4);
        assert_eq!(*engine.host().learned.borrow(), vec![5]);
    }
}

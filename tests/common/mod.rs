//! A deterministic, in-memory multi-node cluster harness: no sockets, no real clock. Each
//! node's outbound messages are queued per recipient; `drain` delivers them until the cluster
//! goes quiet, and `advance` moves a shared manual clock forward and gives every node a chance
//! to act on any timer that is now due.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use paxos_engine::clock::ManualClock;
use paxos_engine::config::EngineConfig;
use paxos_engine::host::Host;
use paxos_engine::message::Message;
use paxos_engine::Paxos;

type Inboxes = Rc<RefCell<Vec<(u64, VecDeque<Message>)>>>;

#[derive(Clone)]
pub struct QueueingHost {
    node_id: u64,
    inboxes: Inboxes,
    pub learned: Rc<RefCell<Vec<u64>>>,
}

impl Host for QueueingHost {
    fn send(&mut self, node_id: u64, message: &Message) {
        let mut inboxes = self.inboxes.borrow_mut();
        if let Some((_, queue)) = inboxes.iter_mut().find(|(id, _)| *id == node_id) {
            queue.push_back(*message);
        }
    }

    fn broadcast(&mut self, message: &Message) {
        let mut inboxes = self.inboxes.borrow_mut();
        for (_, queue) in inboxes.iter_mut() {
            queue.push_back(*message);
        }
    }

    fn on_learned(&mut self, value: u64) {
        self.learned.borrow_mut().push(value);
    }
}

pub struct Cluster {
    pub nodes: Vec<Paxos<QueueingHost, ManualClock>>,
    inboxes: Inboxes,
    severed: Vec<u64>,
}

impl Cluster {
    pub fn new(num_nodes: u64) -> Cluster {
        let inboxes: Inboxes = Rc::new(RefCell::new(
            (1..=num_nodes).map(|id| (id, VecDeque::new())).collect(),
        ));
        let clock = ManualClock::new();
        let nodes = (1..=num_nodes)
            .map(|node_id| {
                let host = QueueingHost {
                    node_id,
                    inboxes: inboxes.clone(),
                    learned: Rc::new(RefCell::new(Vec::new())),
                };
                Paxos::open_with(host, clock.clone(), node_id, num_nodes as u32, EngineConfig::default())
            })
            .collect();
        Cluster {
            nodes,
            inboxes,
            severed: Vec::new(),
        }
    }

    pub fn node(&mut self, node_id: u64) -> &mut Paxos<QueueingHost, ManualClock> {
        self.nodes
            .iter_mut()
            .find(|n| n.node_id() == node_id)
            .expect("no such node in this cluster")
    }

    /// Marks a node as unreachable: messages keep queuing up for it, but `drain` will not hand
    /// them to it, simulating a crashed or partitioned peer.
    pub fn sever(&mut self, node_id: u64) {
        self.severed.push(node_id);
    }

    /// Registers an inbox for an id outside the cluster's own membership, so a test can observe
    /// what a node sends to an outside party (e.g. a freshly bootstrapping peer).
    pub fn register_listener(&mut self, node_id: u64) {
        self.inboxes.borrow_mut().push((node_id, VecDeque::new()));
    }

    pub fn pop(&mut self, node_id: u64) -> Option<Message> {
        let mut inboxes = self.inboxes.borrow_mut();
        inboxes
            .iter_mut()
            .find(|(id, _)| *id == node_id)
            .and_then(|(_, queue)| queue.pop_front())
    }

    fn deliver_once(&mut self) -> bool {
        let mut delivered_any = false;
        let severed = self.severed.clone();
        for node in self.nodes.iter_mut() {
            let node_id = node.node_id();
            if severed.contains(&node_id) {
                continue;
            }
            let msg = {
                let mut inboxes = self.inboxes.borrow_mut();
                inboxes
                    .iter_mut()
                    .find(|(id, _)| *id == node_id)
                    .and_then(|(_, queue)| queue.pop_front())
            };
            if let Some(msg) = msg {
                node.process_message(&msg);
                delivered_any = true;
            }
        }
        delivered_any
    }

    /// Delivers queued messages until no node has anything left to process.
    pub fn drain(&mut self) {
        while self.deliver_once() {}
    }

    /// Moves the shared clock forward and gives every (non-severed) node a chance to act on a
    /// timer that is now due, then drains whatever that produced.
    pub fn advance(&mut self, by: Duration) {
        let clock = self.nodes[0].clock().clone();
        clock.advance(by);
        let severed = self.severed.clone();
        for node in self.nodes.iter_mut() {
            if !severed.contains(&node.node_id()) {
                node.timeout_trigger();
            }
        }
        self.drain();
    }
}

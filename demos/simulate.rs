//! An example which simulates a small Paxos cluster locally (on one machine, one process, no
//! sockets): each node's outbound messages are queued in memory and delivered to its peers by
//! this demo's own loop, which also plays the role of the outer event loop a real host would
//! run around the engine.
//!
//! Run this example as follows
//!     RUST_LOG=paxos_engine=info cargo run --example simulate

extern crate env_logger;
#[macro_use]
extern crate log;
extern crate paxos_engine;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use paxos_engine::{Host, Message, Paxos};

/// A `Host` that queues outbound messages instead of sending them over a socket. `inbox` is
/// shared with every other node's outbox so `broadcast` can fan a message out to the whole
/// cluster, including the sender.
#[derive(Clone)]
struct InMemoryHost {
    node_id: u64,
    inboxes: Rc<RefCell<Vec<(u64, VecDeque<Message>)>>>,
    learned: Rc<RefCell<Option<u64>>>,
}

impl Host for InMemoryHost {
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
        info!("[node={}] learned value {}", self.node_id, value);
        *self.learned.borrow_mut() = Some(value);
    }
}

fn main() {
    env_logger::init();

    let value: u64 = 7;
    let num_nodes = 3;

    let inboxes = Rc::new(RefCell::new(
        (1..=num_nodes).map(|id| (id, VecDeque::new())).collect(),
    ));

    let mut engines: Vec<Paxos<InMemoryHost>> = (1..=num_nodes)
        .map(|node_id| {
            let host = InMemoryHost {
                node_id,
                inboxes: inboxes.clone(),
                learned: Rc::new(RefCell::new(None)),
            };
            Paxos::open(host, node_id, num_nodes as u32)
        })
        .collect();

    // Node 1 proposes; the others only react to incoming messages, exactly as a real deployment
    // would if only one client happened to submit a value this round.
    engines[0].propose(value);

    // Drain every queued message until the cluster goes quiet. A real host would instead block
    // on its socket or on `next_timeout()`.
    loop {
        let mut delivered_any = false;
        for engine in engines.iter_mut() {
            let node_id = engine.node_id();
            let msg = {
                let mut inboxes = inboxes.borrow_mut();
                inboxes
                    .iter_mut()
                    .find(|(id, _)| *id == node_id)
                    .and_then(|(_, queue)| queue.pop_front())
            };
            if let Some(msg) = msg {
                engine.process_message(&msg);
                delivered_any = true;
            }
        }
        if !delivered_any {
            break;
        }
    }

    for engine in &engines {
        info!(
            "[node={}] instance {} learned value = {:?}",
            engine.node_id(),
            engine.current_instance(),
            engine.learned_value()
        );
    }
}

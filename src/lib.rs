//! A transport-agnostic single-decree Paxos consensus engine.
//!
//! The engine decides exactly one value per numbered instance and then advances to the next.
//! It owns no socket and spawns no thread: a host feeds it received messages and a wall-clock
//! tick, and the engine emits outbound messages and a single "value learned" notification
//! through the [`host::Host`] capability trait.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod acceptor;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod learner;
pub mod message;
pub mod proposer;
pub mod quorum;
pub mod timeout;

pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use engine::Paxos;
pub use host::Host;
pub use message::{Message, MessageType};

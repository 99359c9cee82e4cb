//! The capability the engine needs from whatever embeds it: a way to unicast, a way to
//! broadcast, and a way to be told a value has been learned.
//!
//! The original engine took these three as function pointers plus an opaque `void *arg` bundled
//! into a `paxos_context_t`. Here the engine is simply generic over a type implementing this
//! trait; the host supplies its own transport, storage, and callback state behind it.

use crate::message::Message;

/// Outbound effects the engine needs the host to perform. Every method is invoked synchronously
/// from within a `Paxos` handler; implementations must not call back into the same engine from
/// inside these methods.
pub trait Host {
    /// Send `message` to exactly one peer.
    fn send(&mut self, node_id: u64, message: &Message);

    /// Send `message` to every member of the cluster, including this node itself. Self-delivery
    /// is harmless: the engine's own ballot gating makes it a no-op.
    fn broadcast(&mut self, message: &Message);

    /// Called exactly once per instance, right after the value is recorded and before the
    /// instance counter advances.
    fn on_learned(&mut self, value: u64);
}

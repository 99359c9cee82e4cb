//! The fixed-layout wire message exchanged between engines, and the constructors for each
//! message kind.
//!
//! The on-wire record is 52 bytes: a type byte, three bytes of padding, and six `u64` fields.
//! Unused fields for a given message kind are left zero. This fixed shape (rather than a
//! variable-length serde encoding) is what lets `paxos_id`/`node_id`/`proposal_id` sit at the
//! same byte offset for every message kind, matching the record the engine was distilled from.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Number of bytes occupied by an encoded [`Message`] on the wire.
pub const WIRE_SIZE: usize = 52;

/// All message kinds the engine sends or receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    PrepareRequest = 1,
    PrepareRejected = 2,
    PreparePreviouslyAccepted = 3,
    PrepareCurrentlyOpen = 4,
    ProposeRequest = 5,
    ProposeRejected = 6,
    ProposeAccepted = 7,
    LearnProposal = 8,
    LearnValue = 9,
    RequestChosen = 10,
    Bootstrap = 21,
    CatchupStart = 22,
    CatchupRequest = 23,
    CatchupResponse = 24,
    UserProposeValue = 31,
    UserLearnValue = 32,
}

impl MessageType {
    fn from_u8(b: u8) -> Option<MessageType> {
        use MessageType::*;
        Some(match b {
            1 => PrepareRequest,
            2 => PrepareRejected,
            3 => PreparePreviouslyAccepted,
            4 => PrepareCurrentlyOpen,
            5 => ProposeRequest,
            6 => ProposeRejected,
            7 => ProposeAccepted,
            8 => LearnProposal,
            9 => LearnValue,
            10 => RequestChosen,
            21 => Bootstrap,
            22 => CatchupStart,
            23 => CatchupRequest,
            24 => CatchupResponse,
            31 => UserProposeValue,
            32 => UserLearnValue,
            _ => return None,
        })
    }
}

/// A single fixed-layout Paxos message. Every field is present regardless of `message_type`;
/// handlers read only the fields relevant to the kind they expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_type: MessageType,
    pub paxos_id: u64,
    pub node_id: u64,
    pub proposal_id: u64,
    pub accepted_proposal_id: u64,
    pub promised_proposal_id: u64,
    pub value: u64,
}

impl Message {
    fn base(message_type: MessageType, paxos_id: u64, node_id: u64) -> Message {
        Message {
            message_type,
            paxos_id,
            node_id,
            proposal_id: 0,
            accepted_proposal_id: 0,
            promised_proposal_id: 0,
            value: 0,
        }
    }

    pub fn prepare_request(paxos_id: u64, node_id: u64, proposal_id: u64) -> Message {
        let mut m = Message::base(MessageType::PrepareRequest, paxos_id, node_id);
        m.proposal_id = proposal_id;
        m
    }

    pub fn prepare_rejected(
        paxos_id: u64,
        node_id: u64,
        proposal_id: u64,
        promised_proposal_id: u64,
    ) -> Message {
        let mut m = Message::base(MessageType::PrepareRejected, paxos_id, node_id);
        m.proposal_id = proposal_id;
        m.promised_proposal_id = promised_proposal_id;
        m
    }

    pub fn prepare_currently_open(paxos_id: u64, node_id: u64, proposal_id: u64) -> Message {
        let mut m = Message::base(MessageType::PrepareCurrentlyOpen, paxos_id, node_id);
        m.proposal_id = proposal_id;
        m
    }

    pub fn prepare_previously_accepted(
        paxos_id: u64,
        node_id: u64,
        proposal_id: u64,
        accepted_proposal_id: u64,
        value: u64,
    ) -> Message {
        let mut m = Message::base(MessageType::PreparePreviouslyAccepted, paxos_id, node_id);
        m.proposal_id = proposal_id;
        m.accepted_proposal_id = accepted_proposal_id;
        m.value = value;
        m
    }

    pub fn propose_request(paxos_id: u64, node_id: u64, proposal_id: u64, value: u64) -> Message {
        let mut m = Message::base(MessageType::ProposeRequest, paxos_id, node_id);
        m.proposal_id = proposal_id;
        m.value = value;
        m
    }

    pub fn propose_rejected(paxos_id: u64, node_id: u64, proposal_id: u64) -> Message {
        let mut m = Message::base(MessageType::ProposeRejected, paxos_id, node_id);
        m.proposal_id = proposal_id;
        m
    }

    pub fn propose_accepted(paxos_id: u64, node_id: u64, proposal_id: u64) -> Message {
        let mut m = Message::base(MessageType::ProposeAccepted, paxos_id, node_id);
        m.proposal_id = proposal_id;
        m
    }

    pub fn learn_proposal(paxos_id: u64, node_id: u64, proposal_id: u64) -> Message {
        let mut m = Message::base(MessageType::LearnProposal, paxos_id, node_id);
        m.proposal_id = proposal_id;
        m
    }

    pub fn learn_value(paxos_id: u64, node_id: u64, value: u64) -> Message {
        let mut m = Message::base(MessageType::LearnValue, paxos_id, node_id);
        m.value = value;
        m
    }

    pub fn request_chosen(paxos_id: u64, node_id: u64) -> Message {
        Message::base(MessageType::RequestChosen, paxos_id, node_id)
    }

    pub fn bootstrap(node_id: u64) -> Message {
        Message::base(MessageType::Bootstrap, 0, node_id)
    }

    /// Reuses `CatchupStart` as the carrier for "here is the learned value", matching
    /// `paxos_message_learn_value`.
    pub fn catchup_start(paxos_id: u64, node_id: u64, value: u64) -> Message {
        let mut m = Message::base(MessageType::CatchupStart, paxos_id, node_id);
        m.value = value;
        m
    }

    pub fn catchup_request(paxos_id: u64, node_id: u64) -> Message {
        Message::base(MessageType::CatchupRequest, paxos_id, node_id)
    }

    pub fn catchup_response(paxos_id: u64, node_id: u64, value: u64) -> Message {
        let mut m = Message::base(MessageType::CatchupResponse, paxos_id, node_id);
        m.value = value;
        m
    }

    pub fn user_propose_value(node_id: u64, value: u64) -> Message {
        let mut m = Message::base(MessageType::UserProposeValue, 0, node_id);
        m.value = value;
        m
    }

    pub fn user_learn_value(node_id: u64) -> Message {
        Message::base(MessageType::UserLearnValue, 0, node_id)
    }

    /// Encodes this message into its fixed 52-byte wire representation.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(WIRE_SIZE);
        buf.put_u8(self.message_type as u8);
        buf.put_slice(&[0u8; 3]);
        buf.put_u64_le(self.paxos_id);
        buf.put_u64_le(self.node_id);
        buf.put_u64_le(self.proposal_id);
        buf.put_u64_le(self.accepted_proposal_id);
        buf.put_u64_le(self.promised_proposal_id);
        buf.put_u64_le(self.value);
        buf.freeze()
    }

    /// Decodes a message from a byte slice. Returns `None` for a short buffer or an unknown
    /// type byte; both are treated as a transient transport condition, never an error the
    /// engine surfaces.
    pub fn decode(mut bytes: &[u8]) -> Option<Message> {
        if bytes.len() < WIRE_SIZE {
            return None;
        }
        let message_type = MessageType::from_u8(bytes.get_u8())?;
        bytes.advance(3);
        let paxos_id = bytes.get_u64_le();
        let node_id = bytes.get_u64_le();
        let proposal_id = bytes.get_u64_le();
        let accepted_proposal_id = bytes.get_u64_le();
        let promised_proposal_id = bytes.get_u64_le();
        let value = bytes.get_u64_le();
        Some(Message {
            message_type,
            paxos_id,
            node_id,
            proposal_id,
            accepted_proposal_id,
            promised_proposal_id,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_propose_request() {
        let m = Message::propose_request(4, 2, 9, 42);
        let bytes = m.encode();
        assert_eq!(bytes.len(), WIRE_SIZE);
        let decoded = Message::decode(&bytes).expect("should decode");
        assert_eq!(decoded, m);
    }

    #[test]
    fn rejects_a_short_buffer() {
        let short = [0u8; WIRE_SIZE - 1];
        assert!(Message::decode(&short).is_none());
    }

    #[test]
    fn rejects_an_unknown_type_byte() {
        let mut bytes = Message::prepare_request(0, 1, 1).encode().to_vec();
        bytes[0] = 200;
        assert!(Message::decode(&bytes).is_none());
    }

    #[test]
    fn catchup_start_carries_the_learned_value() {
        let m = Message::catchup_start(7, 3, 99);
        assert_eq!(m.message_type, MessageType::CatchupStart);
        assert_eq!(m.value, 99);
    }
}

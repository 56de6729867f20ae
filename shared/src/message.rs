//! Realtime channel wire format
//!
//! One duplex connection per access code. Messages are JSON with a `type`
//! discriminator; frames on the wire are length-prefixed (see the client
//! transport for framing).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ticket::Ticket;

/// Messages exchanged on the realtime reconciliation channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChannelMessage {
    /// A full ticket snapshot from another session or staff. The embedded
    /// `revision` lets receivers discard stale snapshots.
    TicketUpdated { ticket: Ticket },
    /// Error notification; the channel stays open.
    Error { message: String },
}

impl ChannelMessage {
    pub fn ticket_updated(ticket: Ticket) -> Self {
        ChannelMessage::TicketUpdated { ticket }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ChannelMessage::Error {
            message: message.into(),
        }
    }
}

/// Envelope carried on the wire: message id plus the JSON body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelFrame {
    pub message_id: Uuid,
    /// Access code the connection is scoped to.
    pub access_code: String,
    #[serde(flatten)]
    pub message: ChannelMessage,
}

impl ChannelFrame {
    pub fn new(access_code: impl Into<String>, message: ChannelMessage) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            access_code: access_code.into(),
            message,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let ticket = Ticket::draft(4, "Ana");
        let frame = ChannelFrame::new("X7Q2", ChannelMessage::ticket_updated(ticket));
        let bytes = frame.to_bytes().unwrap();
        let back = ChannelFrame::from_bytes(&bytes).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_type_discriminator() {
        let frame = ChannelFrame::new("X7Q2", ChannelMessage::error("kitchen offline"));
        let value: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "error");

        let frame = ChannelFrame::new("X7Q2", ChannelMessage::ticket_updated(Ticket::draft(1, "")));
        let value: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "ticket-updated");
    }
}

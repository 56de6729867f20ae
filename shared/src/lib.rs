//! Shared types for the Mesa table-side ordering system
//!
//! Common types used on both sides of the protocol: the ticket model and
//! its lifecycle state machine, realtime channel messages, REST payloads,
//! and the menu catalog shapes.

pub mod api;
pub mod menu;
pub mod message;
pub mod ticket;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use menu::{Category, Dish};
pub use message::ChannelMessage;
pub use ticket::{LineItem, Ticket, TicketStatus};

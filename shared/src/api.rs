//! REST request/response payloads
//!
//! Shared between the client engine and any service implementing the
//! backend surface. Exact paths are a collaborator detail; the shapes
//! here are the contract.

use serde::{Deserialize, Serialize};

use crate::ticket::{LineItem, TicketStatus};

/// `POST /tickets` — create a principal ticket. Carries the draft's item
/// set so first confirmation is a single call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketRequest {
    pub table_number: u32,
    pub customer_name: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

/// `POST /tickets/{parent_id}/children` — create a linked ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLinkedTicketRequest {
    pub table_number: u32,
    pub customer_name: String,
}

/// `PATCH /tickets/{id}` — partial update. Sending the same item set twice
/// produces the same server state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PatchTicketRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
}

impl PatchTicketRequest {
    pub fn items(items: Vec<LineItem>) -> Self {
        Self {
            items: Some(items),
            ..Default::default()
        }
    }
}

/// `POST /kitchen-orders` — submit a ticket's items for kitchen visibility.
/// Distinct from a patch: this also triggers kitchen-side notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitchenSubmission {
    /// Backend ticket id; `0` when the submission also creates the ticket.
    #[serde(default)]
    pub ticket_id: i64,
    pub table_number: u32,
    pub customer_name: String,
    pub items: Vec<LineItem>,
}

/// Response to a successful confirm/submit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmittedTicket {
    pub id: i64,
    pub access_code: String,
    pub status: TicketStatus,
}

/// `GET /tickets/{id}/status-summary` — lightweight polling payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketStatusSummary {
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
}

//! Ticket ("comanda") model and lifecycle state machine
//!
//! A ticket is the order record for one dining party at one table. It is
//! born as a local draft (`id == 0`), becomes backend-identified on first
//! confirmation, and is closed once it reaches a terminal status.

use serde::{Deserialize, Serialize};

/// Ticket lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Exists only in local storage, never sent to the backend
    #[default]
    Draft,
    /// Created on the backend, waiting for the kitchen
    Pending,
    /// Kitchen started preparation
    Preparing,
    /// Kitchen finished, waiting to be served
    Ready,
    /// Served to the table
    Delivered,
    /// Payment settled
    Paid,
}

impl TicketStatus {
    /// A closed ticket accepts no further item mutation; the client must
    /// start a new draft for follow-on orders at the table.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Delivered | TicketStatus::Paid)
    }

    /// Valid lifecycle transitions. Everything past `Draft -> Pending`
    /// originates from staff actions on the backend; the client only
    /// applies those, it never invents them.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Pending, Preparing)
                | (Pending, Ready)
                | (Preparing, Ready)
                | (Preparing, Delivered)
                | (Preparing, Paid)
                | (Ready, Delivered)
                | (Ready, Paid)
                | (Delivered, Paid)
        )
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TicketStatus::Draft => "draft",
            TicketStatus::Pending => "pending",
            TicketStatus::Preparing => "preparing",
            TicketStatus::Ready => "ready",
            TicketStatus::Delivered => "delivered",
            TicketStatus::Paid => "paid",
        };
        write!(f, "{}", s)
    }
}

/// One line of a ticket.
///
/// Identity key is `(dish_id, note)`: the same dish with a different note
/// is a distinct line, and adding a dish with a matching key increments
/// the existing quantity instead of appending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    pub dish_id: i64,
    pub quantity: i32,
    #[serde(default)]
    pub note: String,
}

impl LineItem {
    pub fn new(dish_id: i64, quantity: i32, note: impl Into<String>) -> Self {
        Self {
            dish_id,
            quantity,
            note: note.into(),
        }
    }

    /// Identity key for merge/removal semantics.
    pub fn key(&self) -> (i64, &str) {
        (self.dish_id, self.note.as_str())
    }
}

/// Ticket entity shared between client sessions and the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// `0` means draft: exists only locally. Any positive value is a
    /// backend-assigned identity.
    #[serde(default)]
    pub id: i64,
    pub table_number: u32,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub status: TicketStatus,
    /// Assigned by the backend when a principal ticket is created; other
    /// sessions at the table use it to link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    /// Exactly one ticket per table session is principal.
    pub is_principal: bool,
    /// Present only on linked tickets; references the principal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_ticket_id: Option<i64>,
    /// Insertion-ordered; never contains two entries with the same key.
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Set by kitchen staff once preparation starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    /// Local revision counter, bumped on every local mutation. Inbound
    /// snapshots whose revision is not newer than the last applied one
    /// are discarded, so a slow response cannot overwrite newer state.
    #[serde(default)]
    pub revision: u64,
    /// Creation timestamp (unix millis)
    #[serde(default)]
    pub created_at: i64,
}

impl Ticket {
    /// Create a local draft for a table. Not persisted or sent anywhere
    /// by itself; the ticket manager owns that.
    pub fn draft(table_number: u32, customer_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            table_number,
            customer_name: customer_name.into(),
            status: TicketStatus::Draft,
            access_code: None,
            is_principal: true,
            parent_ticket_id: None,
            items: Vec::new(),
            estimated_minutes: None,
            revision: 0,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn is_draft(&self) -> bool {
        self.id == 0
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }

    /// Find a line by identity key.
    pub fn find_item(&self, dish_id: i64, note: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.key() == (dish_id, note))
    }

    /// Add a dish, merging by identity key: a matching line has its
    /// quantity incremented, otherwise a new line is appended.
    pub fn merge_item(&mut self, dish_id: i64, quantity: i32, note: &str) {
        match self
            .items
            .iter_mut()
            .find(|i| i.key() == (dish_id, note))
        {
            Some(existing) => existing.quantity += quantity,
            None => self.items.push(LineItem::new(dish_id, quantity, note)),
        }
    }

    /// Remove the line matching the identity key. Returns whether a line
    /// was actually removed.
    pub fn remove_item(&mut self, dish_id: i64, note: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.key() != (dish_id, note));
        self.items.len() != before
    }

    /// Overwrite a line's quantity. A quantity of zero or less removes the
    /// line instead; zero/negative quantities are never a valid stored
    /// state.
    pub fn set_quantity(&mut self, dish_id: i64, note: &str, quantity: i32) {
        if quantity <= 0 {
            self.remove_item(dish_id, note);
            return;
        }
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.key() == (dish_id, note))
        {
            item.quantity = quantity;
        }
    }

    /// Total quantity across all lines (cart badge count).
    pub fn total_quantity(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_item_increments_matching_key() {
        let mut ticket = Ticket::draft(3, "Ana");
        ticket.merge_item(7, 1, "");
        ticket.merge_item(7, 2, "");
        assert_eq!(ticket.items.len(), 1);
        assert_eq!(ticket.items[0].quantity, 3);
    }

    #[test]
    fn test_merge_item_distinct_notes_are_distinct_lines() {
        let mut ticket = Ticket::draft(3, "Ana");
        ticket.merge_item(7, 1, "");
        ticket.merge_item(7, 1, "sin cebolla");
        assert_eq!(ticket.items.len(), 2);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut ticket = Ticket::draft(3, "Ana");
        ticket.merge_item(7, 2, "");
        ticket.set_quantity(7, "", 0);
        assert!(ticket.items.is_empty());

        ticket.merge_item(7, 2, "");
        ticket.set_quantity(7, "", -1);
        assert!(ticket.items.is_empty());
    }

    #[test]
    fn test_set_quantity_overwrites() {
        let mut ticket = Ticket::draft(3, "Ana");
        ticket.merge_item(7, 2, "");
        ticket.set_quantity(7, "", 5);
        assert_eq!(ticket.items[0].quantity, 5);
    }

    #[test]
    fn test_remove_item_respects_note() {
        let mut ticket = Ticket::draft(3, "Ana");
        ticket.merge_item(7, 1, "");
        ticket.merge_item(7, 1, "extra queso");
        assert!(ticket.remove_item(7, "extra queso"));
        assert_eq!(ticket.items.len(), 1);
        assert_eq!(ticket.items[0].note, "");
    }

    #[test]
    fn test_status_transitions() {
        use TicketStatus::*;
        assert!(Draft.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Preparing));
        assert!(Pending.can_transition_to(Ready));
        assert!(Preparing.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Paid));

        assert!(!Pending.can_transition_to(Draft));
        assert!(!Paid.can_transition_to(Pending));
        assert!(!Draft.can_transition_to(Preparing));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TicketStatus::Delivered.is_terminal());
        assert!(TicketStatus::Paid.is_terminal());
        assert!(!TicketStatus::Ready.is_terminal());
        assert!(!TicketStatus::Draft.is_terminal());
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&TicketStatus::Preparing).unwrap();
        assert_eq!(json, "\"PREPARING\"");
    }

    #[test]
    fn test_ticket_roundtrip() {
        let mut ticket = Ticket::draft(7, "Ana");
        ticket.merge_item(3, 2, "");
        let json = serde_json::to_string(&ticket).unwrap();
        let back: Ticket = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ticket);
    }
}

//! Ticket manager
//!
//! Single source of truth for the ticket currently being edited by this
//! client. Every mutation flows through it: local edits are applied
//! synchronously and persisted to the local store before any network
//! call, remote snapshots enter through [`TicketManager::apply_remote`],
//! and poll results through [`TicketManager::apply_status`]. No other
//! component touches the item list directly.

use std::sync::Arc;

use tokio::sync::broadcast;

use shared::api::{
    CreateLinkedTicketRequest, CreateTicketRequest, KitchenSubmission, PatchTicketRequest,
    SubmittedTicket, TicketStatusSummary,
};
use shared::{Dish, Ticket};

use crate::catalog::CatalogCache;
use crate::error::{ClientError, ClientResult};
use crate::gateway::TicketBackend;
use crate::reconcile::merge_items;
use crate::store::TicketStore;

/// Emitted whenever the managed ticket changes, from any source (local
/// edit, channel snapshot, poll result).
#[derive(Debug, Clone)]
pub enum TicketEvent {
    Updated(Ticket),
    Cleared,
}

pub struct TicketManager {
    backend: Arc<dyn TicketBackend>,
    store: TicketStore,
    catalog: CatalogCache,
    current: Option<Ticket>,
    /// Highest snapshot revision applied from the channel; anything not
    /// newer is a late arrival and gets discarded.
    last_remote_revision: u64,
    events: broadcast::Sender<TicketEvent>,
}

impl TicketManager {
    pub fn new(backend: Arc<dyn TicketBackend>, store: TicketStore) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            backend,
            store,
            catalog: CatalogCache::new(),
            current: None,
            last_remote_revision: 0,
            events,
        }
    }

    /// Subscribe to ticket change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.events.subscribe()
    }

    pub fn current(&self) -> Option<&Ticket> {
        self.current.as_ref()
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    /// Total of the current ticket against cached menu prices.
    pub fn ticket_total(&self) -> f64 {
        self.current
            .as_ref()
            .map(|t| self.catalog.ticket_total(t))
            .unwrap_or(0.0)
    }

    /// Re-fetch the menu catalog.
    pub async fn refresh_catalog(&mut self) -> ClientResult<()> {
        let dishes = self.backend.fetch_dishes().await?;
        let categories = self.backend.fetch_categories().await?;
        self.catalog.replace(dishes, categories);
        Ok(())
    }

    // ========================================================================
    // Draft lifecycle
    // ========================================================================

    /// Start a fresh local draft for a table, replacing any prior draft
    /// stored under the same key. Nothing is sent to the backend.
    pub fn start_draft(&mut self, table_number: u32, customer_name: &str) -> ClientResult<Ticket> {
        if table_number == 0 {
            return Err(ClientError::InvalidTable(table_number));
        }

        let ticket = Ticket::draft(table_number, customer_name);
        self.store.save_ticket(&ticket)?;
        self.store.set_active_table(table_number)?;
        self.store.set_customer_name(customer_name)?;

        self.current = Some(ticket.clone());
        self.last_remote_revision = 0;
        self.notify();

        tracing::info!(table = table_number, "started draft ticket");
        Ok(ticket)
    }

    /// Restore the stored ticket for a table, principal first, then
    /// linked. A terminal snapshot is treated as absent: a closed ticket
    /// is never resurrected into the editing session.
    pub fn restore_draft(&mut self, table_number: u32) -> ClientResult<Option<Ticket>> {
        if table_number == 0 {
            return Err(ClientError::InvalidTable(table_number));
        }

        let stored = match self.store.load_ticket(table_number, true)? {
            Some(t) => Some(t),
            None => self.store.load_ticket(table_number, false)?,
        };

        match stored {
            Some(t) if t.is_closed() => Ok(None),
            Some(t) => {
                self.current = Some(t.clone());
                self.last_remote_revision = 0;
                self.notify();
                Ok(Some(t))
            }
            None => Ok(None),
        }
    }

    /// Join an existing table session: resolve the principal ticket that
    /// owns the access code, then create a linked child referencing it.
    /// Linking depth is exactly one level.
    pub async fn link_to_access_code(
        &mut self,
        table_number: u32,
        access_code: &str,
        customer_name: &str,
    ) -> ClientResult<Ticket> {
        if table_number == 0 {
            return Err(ClientError::InvalidTable(table_number));
        }

        let tickets = self.backend.find_by_access_code(access_code).await?;
        if tickets.is_empty() {
            return Err(ClientError::AccessCodeNotFound(access_code.to_string()));
        }
        let principal = tickets
            .iter()
            .find(|t| t.is_principal)
            .ok_or(ClientError::NotPrincipal(tickets[0].id))?;

        let req = CreateLinkedTicketRequest {
            table_number,
            customer_name: customer_name.to_string(),
        };
        let mut child = self
            .backend
            .create_linked_ticket(principal.id, &req)
            .await?;
        child.is_principal = false;
        if child.parent_ticket_id.is_none() {
            child.parent_ticket_id = Some(principal.id);
        }

        self.store.save_ticket(&child)?;
        self.store.set_active_table(table_number)?;
        self.store.set_customer_name(customer_name)?;
        self.store.set_last_access_code(access_code)?;

        tracing::info!(
            table = table_number,
            parent = principal.id,
            "linked to existing table session"
        );

        self.current = Some(child.clone());
        self.last_remote_revision = 0;
        self.notify();
        Ok(child)
    }

    /// Drop a draft that was never sent to the backend.
    pub fn abandon_draft(&mut self) -> ClientResult<()> {
        match self.current.take() {
            Some(t) if t.is_draft() => {
                self.store.clear_ticket(t.table_number, t.is_principal)?;
                let _ = self.events.send(TicketEvent::Cleared);
                Ok(())
            }
            Some(t) => {
                self.current = Some(t);
                Err(ClientError::Validation(
                    "only a draft can be abandoned".to_string(),
                ))
            }
            None => Ok(()),
        }
    }

    /// Clear a ticket that reached a terminal status, ending its local
    /// lifecycle. A fresh draft may then be started for the table.
    pub fn acknowledge_closed(&mut self) -> ClientResult<()> {
        match self.current.take() {
            Some(t) if t.is_closed() => {
                self.store.clear_ticket(t.table_number, t.is_principal)?;
                let _ = self.events.send(TicketEvent::Cleared);
                Ok(())
            }
            other => {
                self.current = other;
                Ok(())
            }
        }
    }

    // ========================================================================
    // Item mutation
    // ========================================================================

    /// Add a dish to the current ticket, merging by `(dish, note)` key.
    pub async fn add_item(&mut self, dish: &Dish, quantity: i32, note: &str) -> ClientResult<()> {
        if quantity < 1 {
            return Err(ClientError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let ticket = self.editable_ticket()?;
        ticket.merge_item(dish.id, quantity, note);
        ticket.revision += 1;
        self.persist()?;
        self.notify();

        self.sync_items().await
    }

    /// Remove the line matching the identity key.
    pub async fn remove_item(&mut self, dish_id: i64, note: &str) -> ClientResult<()> {
        let ticket = self.editable_ticket()?;
        if !ticket.remove_item(dish_id, note) {
            return Ok(());
        }
        ticket.revision += 1;
        self.persist()?;
        self.notify();

        self.sync_items().await
    }

    /// Overwrite a line's quantity; zero or less removes the line.
    pub async fn set_quantity(
        &mut self,
        dish_id: i64,
        note: &str,
        quantity: i32,
    ) -> ClientResult<()> {
        if quantity <= 0 {
            return self.remove_item(dish_id, note).await;
        }

        let ticket = self.editable_ticket()?;
        if ticket.find_item(dish_id, note).is_none() {
            return Ok(());
        }
        ticket.set_quantity(dish_id, note, quantity);
        ticket.revision += 1;
        self.persist()?;
        self.notify();

        self.sync_items().await
    }

    // ========================================================================
    // Confirmation
    // ========================================================================

    /// Validate and submit the current ticket. A draft is created on the
    /// backend with its item set in one call; an already-identified
    /// ticket goes to the kitchen endpoint. On success the local item
    /// buffer is cleared so a follow-on order can start; on failure local
    /// state is left untouched.
    pub async fn confirm(&mut self) -> ClientResult<SubmittedTicket> {
        let ticket = self.current.as_ref().ok_or(ClientError::NoActiveTicket)?;
        if ticket.is_closed() {
            return Err(ClientError::TicketClosed(ticket.status));
        }
        if ticket.items.is_empty() {
            return Err(ClientError::EmptyTicket);
        }
        if ticket.customer_name.trim().is_empty() {
            return Err(ClientError::MissingName);
        }

        let result = if ticket.is_draft() {
            let req = CreateTicketRequest {
                table_number: ticket.table_number,
                customer_name: ticket.customer_name.clone(),
                items: ticket.items.clone(),
            };
            self.backend.create_ticket(&req).await.map(|created| {
                let access_code = created.access_code.clone().unwrap_or_default();
                SubmittedTicket {
                    id: created.id,
                    access_code,
                    status: created.status,
                }
            })
        } else {
            let payload = KitchenSubmission {
                ticket_id: ticket.id,
                table_number: ticket.table_number,
                customer_name: ticket.customer_name.clone(),
                items: ticket.items.clone(),
            };
            self.backend.submit_to_kitchen(&payload).await
        };

        let submitted = match result {
            Ok(s) => s,
            // The backend's table check is authoritative; pass it through.
            Err(e @ ClientError::TableNotFound(_)) => return Err(e),
            Err(e) => return Err(ClientError::SubmissionFailed(e.to_string())),
        };

        if let Some(t) = self.current.as_mut() {
            t.id = submitted.id;
            t.status = submitted.status;
            t.access_code = Some(submitted.access_code.clone());
            t.items.clear();
            t.revision += 1;
        }
        self.store.set_last_access_code(&submitted.access_code)?;
        self.persist()?;
        self.notify();

        tracing::info!(
            ticket = submitted.id,
            status = %submitted.status,
            "ticket submitted"
        );
        Ok(submitted)
    }

    // ========================================================================
    // Remote updates
    // ========================================================================

    /// Merge a full snapshot received from the realtime channel. Returns
    /// whether anything was applied; snapshots for a different ticket or
    /// with a stale revision are dropped.
    pub fn apply_remote(&mut self, snapshot: Ticket) -> ClientResult<bool> {
        let Some(current) = self.current.as_mut() else {
            return Ok(false);
        };

        let same_ticket = (snapshot.id != 0 && snapshot.id == current.id)
            || (snapshot.access_code.is_some() && snapshot.access_code == current.access_code);
        if !same_ticket {
            tracing::debug!(snapshot = snapshot.id, "snapshot for another ticket, ignored");
            return Ok(false);
        }

        if snapshot.revision <= self.last_remote_revision {
            tracing::debug!(
                revision = snapshot.revision,
                last = self.last_remote_revision,
                "stale snapshot discarded"
            );
            return Ok(false);
        }
        self.last_remote_revision = snapshot.revision;

        current.items = merge_items(&snapshot.items, &current.items);
        if snapshot.status != current.status && current.status.can_transition_to(snapshot.status) {
            current.status = snapshot.status;
        }
        if snapshot.estimated_minutes.is_some() {
            current.estimated_minutes = snapshot.estimated_minutes;
        }

        self.persist()?;
        self.notify();
        Ok(true)
    }

    /// Apply a polled status summary. Returns whether anything changed.
    pub fn apply_status(&mut self, summary: TicketStatusSummary) -> ClientResult<bool> {
        let Some(current) = self.current.as_mut() else {
            return Ok(false);
        };

        let mut changed = false;
        if summary.status != current.status && current.status.can_transition_to(summary.status) {
            current.status = summary.status;
            changed = true;
        }
        if summary.estimated_minutes.is_some()
            && summary.estimated_minutes != current.estimated_minutes
        {
            current.estimated_minutes = summary.estimated_minutes;
            changed = true;
        }

        if changed {
            self.persist()?;
            self.notify();
        }
        Ok(changed)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// The current ticket, restored from the store if a reload dropped the
    /// in-memory copy. Closed tickets reject mutation.
    fn editable_ticket(&mut self) -> ClientResult<&mut Ticket> {
        if self.current.is_none() {
            if let Some(table) = self.store.active_table()? {
                if let Some(stored) = self.store.load_ticket(table, true)? {
                    if !stored.is_closed() {
                        self.current = Some(stored);
                    }
                }
            }
        }

        let ticket = self.current.as_mut().ok_or(ClientError::NoActiveTicket)?;
        if ticket.is_closed() {
            return Err(ClientError::TicketClosed(ticket.status));
        }
        Ok(ticket)
    }

    fn persist(&self) -> ClientResult<()> {
        if let Some(t) = &self.current {
            self.store.save_ticket(t)?;
        }
        Ok(())
    }

    fn notify(&self) {
        if let Some(t) = &self.current {
            // No subscribers is fine.
            let _ = self.events.send(TicketEvent::Updated(t.clone()));
        }
    }

    /// Mirror the local item set to an already-identified ticket. Drafts
    /// stay local. The server response passes through the standard merge
    /// so edits made while the request was in flight survive.
    async fn sync_items(&mut self) -> ClientResult<()> {
        let Some(ticket) = &self.current else {
            return Ok(());
        };
        if ticket.is_draft() {
            return Ok(());
        }

        let id = ticket.id;
        let patch = PatchTicketRequest::items(ticket.items.clone());
        let backend = self.backend.clone();
        let remote = backend.patch_ticket(id, &patch).await?;

        if let Some(current) = self.current.as_mut() {
            current.items = merge_items(&remote.items, &current.items);
        }
        self.persist()?;
        self.notify();
        Ok(())
    }
}

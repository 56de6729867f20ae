//! Persistent local store
//!
//! Durable key-value persistence surviving restarts, scoped per table and
//! per role (principal vs. linked), plus a small set of session-scalar
//! keys. Write-through: the ticket manager serializes every mutation here
//! before any network call is attempted, so a restart before a round-trip
//! completes does not lose the user's edits.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use shared::Ticket;

use crate::error::ClientResult;

/// Session-scalar keys
const KEY_ACTIVE_TABLE: &str = "activeTable";
const KEY_CUSTOMER_NAME: &str = "customerName";
const KEY_LAST_ACCESS_CODE: &str = "lastAccessCode";

/// Minimal key-value contract the engine persists through. Injected into
/// the ticket manager rather than accessed ambiently, so tests can swap in
/// an ephemeral store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

/// Ephemeral in-memory store (tests, throwaway sessions).
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}

/// JSON-file-backed store. The whole map is rewritten on every change;
/// the data set is one ticket snapshot per table plus a few scalars, so
/// this stays trivially small.
#[derive(Debug)]
pub struct FileStore {
    file_path: PathBuf,
    data: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or create) the store file at `{dir}/session.json`.
    pub fn open(dir: &Path) -> ClientResult<Self> {
        let file_path = dir.join("session.json");
        let data = if file_path.exists() {
            let content = std::fs::read_to_string(&file_path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            file_path,
            data: Mutex::new(data),
        })
    }

    fn flush(&self, data: &HashMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.file_path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let mut data = self.data.lock().unwrap();
        data.insert(key.to_string(), value.to_string());
        self.flush(&data)
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let mut data = self.data.lock().unwrap();
        data.remove(key);
        self.flush(&data)
    }
}

/// Ticket-shaped view over a [`KeyValueStore`]: owns the key scheme so no
/// other component spells raw keys.
#[derive(Clone)]
pub struct TicketStore {
    store: Arc<dyn KeyValueStore>,
}

impl TicketStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn ticket_key(table_number: u32, is_principal: bool) -> String {
        if is_principal {
            format!("ticket:{}", table_number)
        } else {
            format!("ticket:linked:{}", table_number)
        }
    }

    /// Persist a ticket snapshot under its table/role key.
    pub fn save_ticket(&self, ticket: &Ticket) -> ClientResult<()> {
        let key = Self::ticket_key(ticket.table_number, ticket.is_principal);
        self.store.set(&key, &serde_json::to_string(ticket)?)
    }

    /// Load the stored snapshot for a table and role, if any.
    pub fn load_ticket(&self, table_number: u32, is_principal: bool) -> ClientResult<Option<Ticket>> {
        let key = Self::ticket_key(table_number, is_principal);
        match self.store.get(&key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn clear_ticket(&self, table_number: u32, is_principal: bool) -> ClientResult<()> {
        self.store
            .remove(&Self::ticket_key(table_number, is_principal))
    }

    pub fn active_table(&self) -> ClientResult<Option<u32>> {
        Ok(self
            .store
            .get(KEY_ACTIVE_TABLE)?
            .and_then(|v| v.parse().ok()))
    }

    pub fn set_active_table(&self, table_number: u32) -> ClientResult<()> {
        self.store.set(KEY_ACTIVE_TABLE, &table_number.to_string())
    }

    pub fn customer_name(&self) -> ClientResult<Option<String>> {
        self.store.get(KEY_CUSTOMER_NAME)
    }

    pub fn set_customer_name(&self, name: &str) -> ClientResult<()> {
        self.store.set(KEY_CUSTOMER_NAME, name)
    }

    pub fn last_access_code(&self) -> ClientResult<Option<String>> {
        self.store.get(KEY_LAST_ACCESS_CODE)
    }

    pub fn set_last_access_code(&self, code: &str) -> ClientResult<()> {
        self.store.set(KEY_LAST_ACCESS_CODE, code)
    }
}

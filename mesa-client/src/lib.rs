//! Table-side order client engine
//!
//! Local-first order tickets for restaurant tables: a draft builds up
//! offline in the local store, confirmation pushes it to the backend,
//! and from then on the engine keeps the local copy reconciled with the
//! backend through a realtime channel and a status poll.
//!
//! Main pieces:
//! - [`TicketManager`] — ticket lifecycle and item mutation
//! - [`TicketBackend`] / [`HttpGateway`] — the network surface
//! - [`RealtimeChannel`] — duplex snapshot exchange with reconnects
//! - [`StatusPollMonitor`] — change-only status polling
//! - [`TicketStore`] — write-through persistent session state

pub mod catalog;
pub mod channel;
pub mod config;
pub mod error;
pub mod gateway;
pub mod manager;
pub mod monitor;
pub mod reconcile;
pub mod store;

pub use catalog::CatalogCache;
pub use channel::{ChannelConnector, ChannelEvent, ChannelTransport, RealtimeChannel, TcpConnector};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use gateway::{HttpGateway, TicketBackend};
pub use manager::{TicketEvent, TicketManager};
pub use monitor::StatusPollMonitor;
pub use reconcile::merge_items;
pub use store::{FileStore, KeyValueStore, MemoryStore, TicketStore};

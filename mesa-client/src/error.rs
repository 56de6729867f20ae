//! Client error types

use shared::TicketStatus;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Table number must be a positive integer
    #[error("invalid table number: {0}")]
    InvalidTable(u32),

    /// No ticket owns the given access code
    #[error("access code not found: {0}")]
    AccessCodeNotFound(String),

    /// The resolved ticket is itself linked; linking depth is exactly one
    #[error("ticket {0} is not a principal ticket")]
    NotPrincipal(i64),

    /// Confirm on a ticket without items
    #[error("ticket has no items")]
    EmptyTicket,

    /// Confirm without a customer name
    #[error("customer name is required")]
    MissingName,

    /// The backend rejected the table as inactive or unknown; this is the
    /// authoritative check, any client-side pre-check is advisory
    #[error("table not found: {0}")]
    TableNotFound(u32),

    /// Item mutation attempted after a terminal status
    #[error("ticket is closed ({0})")]
    TicketClosed(TicketStatus),

    /// No ticket is being edited by this client
    #[error("no active ticket")]
    NoActiveTicket,

    /// One-shot submission failed; local state was left untouched
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    /// Transient transport failure; the caller decides whether to retry
    #[error("network error: {0}")]
    Network(String),

    /// Payload rejected by the backend; not retried automatically
    #[error("validation error: {0}")]
    Validation(String),

    /// Local store failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

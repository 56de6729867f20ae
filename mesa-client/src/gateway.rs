//! Synchronization gateway
//!
//! All network calls that mutate or read backend order state. The gateway
//! normalizes mixed response shapes (some endpoints return a single
//! ticket, some a list) and maps HTTP statuses to the client error
//! taxonomy in one place. It never retries; retry policy belongs to the
//! realtime channel and the poll monitor.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use shared::api::{
    CreateLinkedTicketRequest, CreateTicketRequest, KitchenSubmission, PatchTicketRequest,
    SubmittedTicket, TicketStatusSummary,
};
use shared::{Category, Dish, Ticket};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Backend surface consumed by the engine. Object-safe so tests can run
/// the full flow against an in-process double.
#[async_trait]
pub trait TicketBackend: Send + Sync {
    /// Create a principal ticket. The backend is the authoritative check
    /// for whether the table exists.
    async fn create_ticket(&self, req: &CreateTicketRequest) -> ClientResult<Ticket>;

    /// Create a linked child ticket referencing a principal.
    async fn create_linked_ticket(
        &self,
        parent_id: i64,
        req: &CreateLinkedTicketRequest,
    ) -> ClientResult<Ticket>;

    /// All tickets sharing an access code (principal plus any children).
    async fn find_by_access_code(&self, code: &str) -> ClientResult<Vec<Ticket>>;

    /// Partial update; safe to repeat with the same payload.
    async fn patch_ticket(&self, ticket_id: i64, patch: &PatchTicketRequest)
        -> ClientResult<Ticket>;

    /// Submit items for kitchen visibility; also triggers kitchen-side
    /// notifications, unlike a plain patch.
    async fn submit_to_kitchen(&self, payload: &KitchenSubmission) -> ClientResult<SubmittedTicket>;

    /// Lightweight polling payload for a tracked access code.
    async fn fetch_status(&self, access_code: &str) -> ClientResult<TicketStatusSummary>;

    /// Menu catalog list endpoints.
    async fn fetch_dishes(&self) -> ClientResult<Vec<Dish>>;
    async fn fetch_categories(&self) -> ClientResult<Vec<Category>>;
}

/// HTTP implementation of [`TicketBackend`].
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Default status mapping: payload rejections become `Validation`,
    /// everything else transient becomes `Network`.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return match status {
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    Err(ClientError::Validation(text))
                }
                _ => Err(ClientError::Network(format!("{}: {}", status, text))),
            };
        }
        response.json().await.map_err(Into::into)
    }
}

/// Some deployments return a bare ticket object where others return a
/// one-element list. Callers always get a list.
pub(crate) fn normalize_ticket_list(value: serde_json::Value) -> ClientResult<Vec<Ticket>> {
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        let ticket: Ticket = serde_json::from_value(value)?;
        Ok(vec![ticket])
    }
}

#[async_trait]
impl TicketBackend for HttpGateway {
    async fn create_ticket(&self, req: &CreateTicketRequest) -> ClientResult<Ticket> {
        let response = self
            .client
            .post(self.url("tickets"))
            .json(req)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::TableNotFound(req.table_number));
        }
        Self::handle_response(response).await
    }

    async fn create_linked_ticket(
        &self,
        parent_id: i64,
        req: &CreateLinkedTicketRequest,
    ) -> ClientResult<Ticket> {
        let response = self
            .client
            .post(self.url(&format!("tickets/{}/children", parent_id)))
            .json(req)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn find_by_access_code(&self, code: &str) -> ClientResult<Vec<Ticket>> {
        let response = self
            .client
            .get(self.url(&format!("tickets/by-code/{}", code)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::AccessCodeNotFound(code.to_string()));
        }
        let value: serde_json::Value = Self::handle_response(response).await?;
        normalize_ticket_list(value)
    }

    async fn patch_ticket(
        &self,
        ticket_id: i64,
        patch: &PatchTicketRequest,
    ) -> ClientResult<Ticket> {
        let response = self
            .client
            .patch(self.url(&format!("tickets/{}", ticket_id)))
            .json(patch)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn submit_to_kitchen(&self, payload: &KitchenSubmission) -> ClientResult<SubmittedTicket> {
        let response = self
            .client
            .post(self.url("kitchen-orders"))
            .json(payload)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn fetch_status(&self, access_code: &str) -> ClientResult<TicketStatusSummary> {
        let response = self
            .client
            .get(self.url(&format!("tickets/by-code/{}/status-summary", access_code)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::AccessCodeNotFound(access_code.to_string()));
        }
        Self::handle_response(response).await
    }

    async fn fetch_dishes(&self) -> ClientResult<Vec<Dish>> {
        let response = self.client.get(self.url("dishes")).send().await?;
        Self::handle_response(response).await
    }

    async fn fetch_categories(&self) -> ClientResult<Vec<Category>> {
        let response = self.client.get(self.url("categories")).send().await?;
        Self::handle_response(response).await
    }
}

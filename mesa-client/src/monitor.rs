//! Status poll monitor
//!
//! Periodically fetches the status summary for a tracked access code and
//! notifies subscribers only when something changed. Fetch errors are
//! logged and skipped; the next tick retries. When the ticket reaches a
//! terminal status the monitor emits one final notification and stops
//! itself.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use shared::api::TicketStatusSummary;

use crate::config::ClientConfig;
use crate::gateway::TicketBackend;

/// Running poll task for one access code.
pub struct StatusPollMonitor {
    access_code: String,
    updates: broadcast::Sender<TicketStatusSummary>,
    cancel: CancellationToken,
}

impl StatusPollMonitor {
    /// Start polling. `last_seen` seeds change detection so restoring a
    /// tracked ticket does not re-announce the status it already showed.
    pub fn start(
        backend: Arc<dyn TicketBackend>,
        access_code: impl Into<String>,
        last_seen: Option<TicketStatusSummary>,
        config: &ClientConfig,
    ) -> Self {
        let access_code = access_code.into();
        let (updates, _) = broadcast::channel(32);
        let cancel = CancellationToken::new();

        let code = access_code.clone();
        let tx = updates.clone();
        let token = cancel.clone();
        let interval = config.poll_interval;

        tokio::spawn(async move {
            let mut last_seen = last_seen;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick fires immediately; skip it so the initial state
            // comes from the caller, not a racing fetch.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let summary = match backend.fetch_status(&code).await {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::warn!(code = %code, error = %e, "status poll failed");
                        continue;
                    }
                };

                if last_seen.as_ref() == Some(&summary) {
                    continue;
                }
                last_seen = Some(summary);
                let _ = tx.send(summary);

                if summary.status.is_terminal() {
                    tracing::info!(code = %code, status = %summary.status, "ticket closed, poll stopping");
                    token.cancel();
                    break;
                }
            }
        });

        Self {
            access_code,
            updates,
            cancel,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TicketStatusSummary> {
        self.updates.subscribe()
    }

    pub fn access_code(&self) -> &str {
        &self.access_code
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// True once stopped, whether by [`StatusPollMonitor::stop`] or by
    /// reaching a terminal status.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for StatusPollMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    use shared::api::{
        CreateLinkedTicketRequest, CreateTicketRequest, KitchenSubmission, PatchTicketRequest,
        SubmittedTicket,
    };
    use shared::{Category, Dish, Ticket, TicketStatus};

    use crate::error::{ClientError, ClientResult};

    /// Backend double that serves a scripted status sequence, repeating
    /// the last entry once exhausted.
    struct ScriptedStatus {
        script: Mutex<Vec<ClientResult<TicketStatusSummary>>>,
        last: Mutex<Option<TicketStatusSummary>>,
    }

    impl ScriptedStatus {
        fn new(script: Vec<ClientResult<TicketStatusSummary>>) -> Self {
            Self {
                script: Mutex::new(script),
                last: Mutex::new(None),
            }
        }
    }

    fn summary(status: TicketStatus) -> TicketStatusSummary {
        TicketStatusSummary {
            status,
            estimated_minutes: None,
        }
    }

    #[async_trait]
    impl TicketBackend for ScriptedStatus {
        async fn create_ticket(&self, _req: &CreateTicketRequest) -> ClientResult<Ticket> {
            unimplemented!()
        }
        async fn create_linked_ticket(
            &self,
            _parent_id: i64,
            _req: &CreateLinkedTicketRequest,
        ) -> ClientResult<Ticket> {
            unimplemented!()
        }
        async fn find_by_access_code(&self, _code: &str) -> ClientResult<Vec<Ticket>> {
            unimplemented!()
        }
        async fn patch_ticket(
            &self,
            _ticket_id: i64,
            _patch: &PatchTicketRequest,
        ) -> ClientResult<Ticket> {
            unimplemented!()
        }
        async fn submit_to_kitchen(
            &self,
            _payload: &KitchenSubmission,
        ) -> ClientResult<SubmittedTicket> {
            unimplemented!()
        }
        async fn fetch_status(&self, _access_code: &str) -> ClientResult<TicketStatusSummary> {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                let last = self.last.lock().unwrap();
                return match *last {
                    Some(s) => Ok(s),
                    None => Err(ClientError::Network("script exhausted".to_string())),
                };
            }
            let next = script.remove(0);
            if let Ok(s) = &next {
                *self.last.lock().unwrap() = Some(*s);
            }
            next
        }
        async fn fetch_dishes(&self) -> ClientResult<Vec<Dish>> {
            unimplemented!()
        }
        async fn fetch_categories(&self) -> ClientResult<Vec<Category>> {
            unimplemented!()
        }
    }

    fn fast_config() -> ClientConfig {
        ClientConfig::default().with_poll_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_notifies_only_on_change() {
        let backend = Arc::new(ScriptedStatus::new(vec![
            Ok(summary(TicketStatus::Pending)),
            Ok(summary(TicketStatus::Pending)),
            Ok(summary(TicketStatus::Preparing)),
        ]));
        let monitor = StatusPollMonitor::start(
            backend,
            "X7Q2",
            Some(summary(TicketStatus::Pending)),
            &fast_config(),
        );
        let mut updates = monitor.subscribe();

        // The two Pending polls are suppressed; the first update seen is
        // the transition to Preparing.
        let update = updates.recv().await.unwrap();
        assert_eq!(update.status, TicketStatus::Preparing);
        monitor.stop();
    }

    #[tokio::test]
    async fn test_stops_after_terminal_status() {
        let backend = Arc::new(ScriptedStatus::new(vec![
            Ok(summary(TicketStatus::Ready)),
            Ok(summary(TicketStatus::Delivered)),
        ]));
        let monitor = StatusPollMonitor::start(backend, "X7Q2", None, &fast_config());
        let mut updates = monitor.subscribe();

        assert_eq!(updates.recv().await.unwrap().status, TicketStatus::Ready);
        assert_eq!(updates.recv().await.unwrap().status, TicketStatus::Delivered);

        // The task cancels its own token before exiting.
        monitor.cancel.cancelled().await;
        assert!(monitor.is_stopped());
    }

    #[tokio::test]
    async fn test_poll_errors_are_skipped() {
        let backend = Arc::new(ScriptedStatus::new(vec![
            Err(ClientError::Network("timeout".to_string())),
            Err(ClientError::Network("timeout".to_string())),
            Ok(summary(TicketStatus::Preparing)),
        ]));
        let monitor = StatusPollMonitor::start(backend, "X7Q2", None, &fast_config());
        let mut updates = monitor.subscribe();

        let update = updates.recv().await.unwrap();
        assert_eq!(update.status, TicketStatus::Preparing);
        monitor.stop();
    }

    #[tokio::test]
    async fn test_estimate_change_alone_notifies() {
        let backend = Arc::new(ScriptedStatus::new(vec![
            Ok(TicketStatusSummary {
                status: TicketStatus::Preparing,
                estimated_minutes: Some(20),
            }),
            Ok(TicketStatusSummary {
                status: TicketStatus::Preparing,
                estimated_minutes: Some(10),
            }),
        ]));
        let monitor = StatusPollMonitor::start(
            backend,
            "X7Q2",
            Some(TicketStatusSummary {
                status: TicketStatus::Preparing,
                estimated_minutes: Some(20),
            }),
            &fast_config(),
        );
        let mut updates = monitor.subscribe();

        let update = updates.recv().await.unwrap();
        assert_eq!(update.estimated_minutes, Some(10));
        monitor.stop();
    }
}

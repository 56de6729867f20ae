//! Realtime reconciliation channel
//!
//! One duplex connection per access code. Inbound `ticket-updated`
//! snapshots and `error` notifications are fanned out to subscribers;
//! the owner feeds snapshots into the ticket manager's merge path.
//! Outbound, [`RealtimeChannel::send`] pushes the local ticket after a
//! mutation. The channel owns its reconnect loop: exponential backoff
//! capped at the configured maximum, retrying indefinitely and resetting
//! the attempt counter on a successful open.

pub mod transport;

pub use transport::{
    ChannelConnector, ChannelTransport, MemoryTransport, TcpConnector, TcpTransport,
};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;

use shared::Ticket;
use shared::message::{ChannelFrame, ChannelMessage};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Connection and message events observable by the UI layer.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Full ticket snapshot from another session or staff.
    TicketUpdated(Ticket),
    /// Error notification from the backend; the channel stays open.
    Error(String),
    Connected,
    /// A reconnect is scheduled; the UI shows a soft affordance, it does
    /// not block interaction.
    Reconnecting { attempt: u32, delay: Duration },
}

/// Delay before reconnect attempt `attempt` (0-based): doubles from
/// `initial`, capped at `max`.
pub fn reconnect_backoff(attempt: u32, initial: Duration, max: Duration) -> Duration {
    initial.saturating_mul(1u32 << attempt.min(10)).min(max)
}

/// Handle to a running channel. Dropping it (or calling
/// [`RealtimeChannel::shutdown`]) cancels the reconnect loop and closes
/// the connection; starting a new channel for a ticket must replace the
/// previous handle.
pub struct RealtimeChannel {
    access_code: String,
    events: broadcast::Sender<ChannelEvent>,
    transport: Arc<RwLock<Option<Arc<dyn ChannelTransport>>>>,
    cancel: CancellationToken,
}

impl RealtimeChannel {
    /// Open a channel scoped to an access code and start its reconnect
    /// loop in the background.
    pub fn connect(
        access_code: impl Into<String>,
        connector: Arc<dyn ChannelConnector>,
        config: &ClientConfig,
    ) -> Self {
        let access_code = access_code.into();
        let (events, _) = broadcast::channel(256);
        let transport: Arc<RwLock<Option<Arc<dyn ChannelTransport>>>> =
            Arc::new(RwLock::new(None));
        let cancel = CancellationToken::new();

        tokio::spawn(run_loop(
            access_code.clone(),
            connector,
            events.clone(),
            transport.clone(),
            cancel.clone(),
            config.reconnect_delay,
            config.max_reconnect_delay,
        ));

        Self {
            access_code,
            events,
            transport,
            cancel,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    pub fn access_code(&self) -> &str {
        &self.access_code
    }

    pub async fn is_connected(&self) -> bool {
        self.transport.read().await.is_some()
    }

    /// Push the local ticket to the other participants. Fails soft while
    /// disconnected; the reconnect loop keeps running.
    pub async fn send(&self, ticket: &Ticket) -> ClientResult<()> {
        let guard = self.transport.read().await;
        let transport = guard
            .as_ref()
            .ok_or_else(|| ClientError::Network("channel not connected".to_string()))?;
        let frame = ChannelFrame::new(
            self.access_code.clone(),
            ChannelMessage::ticket_updated(ticket.clone()),
        );
        transport.write_frame(&frame).await
    }

    /// Single teardown call: stops the reconnect loop and closes the
    /// connection.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_loop(
    access_code: String,
    connector: Arc<dyn ChannelConnector>,
    events: broadcast::Sender<ChannelEvent>,
    slot: Arc<RwLock<Option<Arc<dyn ChannelTransport>>>>,
    cancel: CancellationToken,
    initial_delay: Duration,
    max_delay: Duration,
) {
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let transport = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connector.connect() => match result {
                Ok(t) => t,
                Err(e) => {
                    let delay = reconnect_backoff(attempt, initial_delay, max_delay);
                    tracing::warn!(error = %e, attempt, "channel connect failed");
                    let _ = events.send(ChannelEvent::Reconnecting { attempt, delay });
                    attempt += 1;
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }
            },
        };

        attempt = 0;
        *slot.write().await = Some(transport.clone());
        let _ = events.send(ChannelEvent::Connected);
        tracing::info!(code = %access_code, "realtime channel connected");

        // Read until the connection drops or we are torn down.
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = transport.close().await;
                    *slot.write().await = None;
                    return;
                }
                frame = transport.read_frame() => frame,
            };

            match frame {
                Ok(frame) => {
                    if frame.access_code != access_code {
                        tracing::debug!(code = %frame.access_code, "frame for another code, ignored");
                        continue;
                    }
                    let event = match frame.message {
                        ChannelMessage::TicketUpdated { ticket } => {
                            ChannelEvent::TicketUpdated(ticket)
                        }
                        ChannelMessage::Error { message } => ChannelEvent::Error(message),
                    };
                    let _ = events.send(event);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "channel read failed, reconnecting");
                    break;
                }
            }
        }

        *slot.write().await = None;
        let delay = reconnect_backoff(attempt, initial_delay, max_delay);
        let _ = events.send(ChannelEvent::Reconnecting { attempt, delay });
        attempt += 1;
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    *slot.write().await = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn test_backoff_sequence() {
        let initial = Duration::from_millis(1000);
        let max = Duration::from_millis(10_000);
        let delays: Vec<u64> = (0..5)
            .map(|a| reconnect_backoff(a, initial, max).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10_000]);
    }

    #[test]
    fn test_backoff_stays_capped() {
        let initial = Duration::from_millis(1000);
        let max = Duration::from_millis(10_000);
        assert_eq!(reconnect_backoff(30, initial, max), max);
    }

    /// Connector that fails a scripted number of times before handing out
    /// a memory transport.
    #[derive(Debug)]
    struct FlakyConnector {
        failures_left: Mutex<u32>,
        server_tx: broadcast::Sender<ChannelFrame>,
        client_tx: broadcast::Sender<ChannelFrame>,
    }

    #[async_trait]
    impl ChannelConnector for FlakyConnector {
        async fn connect(&self) -> ClientResult<Arc<dyn ChannelTransport>> {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(ClientError::Network("connection refused".to_string()));
            }
            Ok(Arc::new(MemoryTransport::new(
                &self.server_tx,
                &self.client_tx,
            )))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_backs_off_then_connects() {
        let (server_tx, _keep) = broadcast::channel(16);
        let (client_tx, _keep2) = broadcast::channel(16);
        let connector = Arc::new(FlakyConnector {
            failures_left: Mutex::new(3),
            server_tx: server_tx.clone(),
            client_tx,
        });

        let config = ClientConfig::default();
        let channel = RealtimeChannel::connect("X7Q2", connector, &config);
        let mut events = channel.subscribe();

        let mut delays = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                ChannelEvent::Reconnecting { delay, .. } => delays.push(delay.as_millis() as u64),
                ChannelEvent::Connected => break,
                _ => {}
            }
        }
        assert_eq!(delays, vec![1000, 2000, 4000]);
        assert!(channel.is_connected().await);

        channel.shutdown();
        assert!(channel.is_shut_down());
    }

    #[tokio::test]
    async fn test_inbound_snapshot_reaches_subscribers() {
        let (server_tx, _keep) = broadcast::channel(16);
        let (client_tx, _keep2) = broadcast::channel(16);
        let connector = Arc::new(FlakyConnector {
            failures_left: Mutex::new(0),
            server_tx: server_tx.clone(),
            client_tx,
        });

        let channel = RealtimeChannel::connect("X7Q2", connector, &ClientConfig::default());
        let mut events = channel.subscribe();
        assert!(matches!(events.recv().await.unwrap(), ChannelEvent::Connected));

        let mut ticket = shared::Ticket::draft(7, "Ana");
        ticket.revision = 3;
        server_tx
            .send(ChannelFrame::new(
                "X7Q2",
                ChannelMessage::ticket_updated(ticket.clone()),
            ))
            .unwrap();

        match events.recv().await.unwrap() {
            ChannelEvent::TicketUpdated(t) => assert_eq!(t, ticket),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_frames_for_other_codes_are_ignored() {
        let (server_tx, _keep) = broadcast::channel(16);
        let (client_tx, _keep2) = broadcast::channel(16);
        let connector = Arc::new(FlakyConnector {
            failures_left: Mutex::new(0),
            server_tx: server_tx.clone(),
            client_tx,
        });

        let channel = RealtimeChannel::connect("X7Q2", connector, &ClientConfig::default());
        let mut events = channel.subscribe();
        assert!(matches!(events.recv().await.unwrap(), ChannelEvent::Connected));

        server_tx
            .send(ChannelFrame::new(
                "OTHER",
                ChannelMessage::ticket_updated(shared::Ticket::draft(1, "")),
            ))
            .unwrap();
        server_tx
            .send(ChannelFrame::new("X7Q2", ChannelMessage::error("busy")))
            .unwrap();

        // Only the matching-code frame comes through.
        match events.recv().await.unwrap() {
            ChannelEvent::Error(message) => assert_eq!(message, "busy"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

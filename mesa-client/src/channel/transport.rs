//! Transport abstraction for the realtime channel
//!
//! Frames are length-prefixed JSON: a 4-byte little-endian payload length
//! followed by the serialized [`ChannelFrame`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, broadcast};

use shared::message::ChannelFrame;

use crate::error::{ClientError, ClientResult};

/// Upper bound on a single frame; anything larger is a protocol error.
const MAX_FRAME_LEN: usize = 1024 * 1024;

#[async_trait]
pub trait ChannelTransport: Send + Sync + std::fmt::Debug {
    async fn read_frame(&self) -> ClientResult<ChannelFrame>;
    async fn write_frame(&self, frame: &ChannelFrame) -> ClientResult<()>;
    async fn close(&self) -> ClientResult<()>;
}

/// Establishes transports; the channel calls it again on every reconnect
/// attempt.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self) -> ClientResult<Arc<dyn ChannelTransport>>;
}

// ============================================================================
// TCP
// ============================================================================

/// TCP transport implementation
#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        })
    }
}

#[async_trait]
impl ChannelTransport for TcpTransport {
    async fn read_frame(&self) -> ClientResult<ChannelFrame> {
        let mut reader = self.reader.lock().await;

        // Payload length (4 bytes)
        let mut len_buf = [0u8; 4];
        reader
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            return Err(ClientError::Network(format!("frame too large: {}", len)));
        }

        // Payload
        let mut payload = vec![0u8; len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(ChannelFrame::from_bytes(&payload)?)
    }

    async fn write_frame(&self, frame: &ChannelFrame) -> ClientResult<()> {
        let payload = frame.to_bytes()?;
        let mut data = Vec::with_capacity(4 + payload.len());
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&payload);

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&data)
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> ClientResult<()> {
        // Dropping the halves closes the stream.
        Ok(())
    }
}

/// Reconnecting TCP connector for a fixed address.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl ChannelConnector for TcpConnector {
    async fn connect(&self) -> ClientResult<Arc<dyn ChannelTransport>> {
        Ok(Arc::new(TcpTransport::connect(&self.addr).await?))
    }
}

// ============================================================================
// In-memory (tests, in-process doubles)
// ============================================================================

/// Memory transport for in-process communication.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    /// Receiver for frames FROM the peer
    rx: Arc<Mutex<broadcast::Receiver<ChannelFrame>>>,
    /// Sender for frames TO the peer
    tx: broadcast::Sender<ChannelFrame>,
}

impl MemoryTransport {
    pub fn new(
        peer_broadcast_tx: &broadcast::Sender<ChannelFrame>,
        to_peer_tx: &broadcast::Sender<ChannelFrame>,
    ) -> Self {
        Self {
            rx: Arc::new(Mutex::new(peer_broadcast_tx.subscribe())),
            tx: to_peer_tx.clone(),
        }
    }
}

#[async_trait]
impl ChannelTransport for MemoryTransport {
    async fn read_frame(&self) -> ClientResult<ChannelFrame> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .map_err(|e| ClientError::Network(format!("memory channel error: {}", e)))
    }

    async fn write_frame(&self, frame: &ChannelFrame) -> ClientResult<()> {
        self.tx
            .send(frame.clone())
            .map_err(|e| ClientError::Network(format!("failed to send to peer: {}", e)))?;
        Ok(())
    }

    async fn close(&self) -> ClientResult<()> {
        Ok(())
    }
}

use anyhow::Result;

/// One inbound unit of traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Application message (JSON text)
    Text(String),
    /// Transport-level keepalive (e.g. a WebSocket ping), already answered
    Keepalive,
}

/// A single physical connection to the streaming endpoint
///
/// Implementations:
/// - WebSocket: `tokio-tungstenite` client (production)
/// - In-memory channels (tests)
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Send one text frame
    async fn send(&mut self, text: String) -> Result<()>;

    /// Receive the next frame
    ///
    /// Returns `None` once the peer closed the connection.
    async fn recv(&mut self) -> Option<Result<Frame>>;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;

    /// Transport name for logging
    fn name(&self) -> &str;
}

/// Opens transports to an endpoint
///
/// Kept separate from `Transport` so the connection manager can dial again
/// after a drop without knowing which library is underneath.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>>;
}

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use super::backend::{Connector, Frame, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connection to the streaming endpoint
pub struct WebSocketTransport {
    stream: WsStream,
    endpoint: String,
}

impl WebSocketTransport {
    /// Open a WebSocket connection (`ws://` or `wss://`)
    pub async fn connect(endpoint: &str) -> Result<Self> {
        info!("Opening WebSocket to {}", endpoint);

        let (stream, response) = connect_async(endpoint)
            .await
            .with_context(|| format!("WebSocket handshake with {} failed", endpoint))?;

        debug!("WebSocket upgrade status: {}", response.status());

        Ok(Self {
            stream,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .context("Failed to send WebSocket frame")
    }

    async fn recv(&mut self) -> Option<Result<Frame>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(anyhow::Error::new(e).context("WebSocket read failed"))),
            };

            match message {
                Message::Text(text) => return Some(Ok(Frame::Text(text))),
                Message::Binary(bytes) => {
                    return Some(
                        String::from_utf8(bytes)
                            .map(Frame::Text)
                            .context("Binary frame is not UTF-8"),
                    )
                }
                // tungstenite queues the pong itself
                Message::Ping(_) | Message::Pong(_) => return Some(Ok(Frame::Keepalive)),
                Message::Close(frame) => {
                    debug!("WebSocket {} closed by peer: {:?}", self.endpoint, frame);
                    return None;
                }
                Message::Frame(_) => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        info!("Closing WebSocket to {}", self.endpoint);
        self.stream
            .close(None)
            .await
            .context("Failed to close WebSocket")
    }

    fn name(&self) -> &str {
        "websocket"
    }
}

/// Dials `WebSocketTransport`s
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>> {
        let transport = WebSocketTransport::connect(endpoint).await?;
        Ok(Box::new(transport))
    }
}

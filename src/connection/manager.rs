use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use super::backoff::ReconnectPolicy;
use super::state::{ConnectionChange, ConnectionState};
use crate::error::StreamError;
use crate::observer::Observers;
use crate::protocol::{ClientIntent, ServerEvent};
use crate::transport::{Connector, Frame, Transport};

/// Timing knobs of the connection manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Silence longer than this counts as a drop. Also bounds the handshake.
    pub liveness_window: Duration,

    /// A heartbeat arriving sooner than this after our last echo is the
    /// endpoint answering that echo, so it is not echoed again
    pub heartbeat_echo_interval: Duration,

    pub reconnect: ReconnectPolicy,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            liveness_window: Duration::from_secs(60), // 2x the endpoint heartbeat
            heartbeat_echo_interval: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Result of waiting on the connection
#[derive(Debug, Clone)]
pub enum Incoming {
    /// An application event (heartbeats are answered internally)
    Event(ServerEvent),
    /// The connection dropped and was re-established; subscriptions must be replayed
    Reconnected,
}

/// Owner of the single physical connection to the streaming endpoint
///
/// Handles the handshake, heartbeat echo, liveness detection and bounded
/// exponential reconnection. The first explicit `connect` is never retried.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    settings: ConnectionSettings,
    endpoint: Option<String>,
    transport: Option<Box<dyn Transport>>,
    state: ConnectionState,
    reconnect_attempt: u32,
    client_id: Option<String>,
    last_echo: Option<Instant>,
    observers: Observers<ConnectionChange>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, settings: ConnectionSettings) -> Self {
        Self {
            connector,
            settings,
            endpoint: None,
            transport: None,
            state: ConnectionState::Disconnected,
            reconnect_attempt: 0,
            client_id: None,
            last_echo: None,
            observers: Observers::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.reconnect_attempt
    }

    /// Client id assigned by the endpoint in the last handshake
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Register a connection-change listener
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: FnMut(&ConnectionChange) + Send + 'static,
    {
        self.observers.register(listener);
    }

    fn transition(&mut self, change: ConnectionChange) {
        self.state = change.state();
        self.observers.notify(&change);
    }

    /// Connect and wait for the endpoint's handshake acknowledgement.
    ///
    /// Fails with `ConnectionError` after a single attempt.
    pub async fn connect(&mut self, endpoint: &str) -> Result<(), StreamError> {
        if self.transport.is_some() {
            self.disconnect().await;
        }

        self.transition(ConnectionChange::Connecting {
            endpoint: endpoint.to_string(),
        });

        let dialed = Self::dial(
            Arc::clone(&self.connector),
            endpoint,
            self.settings.liveness_window,
        )
        .await;

        match dialed {
            Ok((transport, client_id)) => {
                info!(
                    "Connected to {} via {} (client_id={:?})",
                    endpoint,
                    transport.name(),
                    client_id
                );
                self.transport = Some(transport);
                self.endpoint = Some(endpoint.to_string());
                self.reconnect_attempt = 0;
                self.client_id = client_id.clone();
                self.last_echo = None;
                self.transition(ConnectionChange::Connected { client_id });
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect to {}: {:#}", endpoint, e);
                self.transition(ConnectionChange::Disconnected);
                Err(StreamError::ConnectionError {
                    endpoint: endpoint.to_string(),
                    reason: format!("{:#}", e),
                })
            }
        }
    }

    /// Close the connection on purpose. No reconnection follows.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                warn!("Error while closing {}: {:#}", transport.name(), e);
            }
        }
        self.endpoint = None;
        self.client_id = None;
        self.reconnect_attempt = 0;
        if self.state != ConnectionState::Disconnected {
            info!("Disconnected");
            self.transition(ConnectionChange::Disconnected);
        }
    }

    /// Send an intent on the live connection.
    pub async fn send(&mut self, intent: &ClientIntent) -> Result<(), StreamError> {
        if !self.is_connected() {
            return Err(StreamError::NotConnected);
        }
        let text = intent.encode()?;
        let transport = self.transport.as_mut().ok_or(StreamError::NotConnected)?;

        debug!("-> {}", text);
        transport
            .send(text)
            .await
            .map_err(|e| StreamError::Transport(format!("{:#}", e)))
    }

    /// Wait for the next application event.
    ///
    /// Heartbeats are echoed and malformed frames dropped without returning.
    /// A drop (close, read error or silence beyond the liveness window) runs
    /// the reconnect loop; on success `Incoming::Reconnected` is returned, on
    /// exhaustion `ConnectionLost`.
    ///
    /// Cancel safe: if the future is dropped during the reconnect loop, the
    /// next call resumes it with the attempts already spent.
    pub async fn recv(&mut self) -> Result<Incoming, StreamError> {
        loop {
            match self.state {
                ConnectionState::Connected => {}
                ConnectionState::Failed => {
                    return Err(StreamError::ConnectionLost {
                        attempts: self.reconnect_attempt,
                    })
                }
                ConnectionState::Reconnecting if self.endpoint.is_some() => {
                    info!(
                        "Resuming interrupted reconnect after {} attempts",
                        self.reconnect_attempt
                    );
                    self.reconnect("reconnect interrupted".to_string()).await?;
                    return Ok(Incoming::Reconnected);
                }
                _ => return Err(StreamError::NotConnected),
            }

            let window = self.settings.liveness_window;
            let transport = self.transport.as_mut().ok_or(StreamError::NotConnected)?;

            let reason = match timeout(window, transport.recv()).await {
                Ok(Some(Ok(Frame::Keepalive))) => continue,
                Ok(Some(Ok(Frame::Text(text)))) => match ServerEvent::decode(&text) {
                    Ok(ServerEvent::Heartbeat { .. }) => {
                        self.answer_heartbeat().await;
                        continue;
                    }
                    Ok(event) => {
                        debug!("<- {}", event.kind());
                        return Ok(Incoming::Event(event));
                    }
                    Err(e) => {
                        warn!("Dropping inbound frame: {}", e);
                        continue;
                    }
                },
                Ok(Some(Err(e))) => format!("{:#}", e),
                Ok(None) => "closed by peer".to_string(),
                Err(_) => format!("no traffic for {:?}", window),
            };

            self.reconnect(reason).await?;
            return Ok(Incoming::Reconnected);
        }
    }

    async fn answer_heartbeat(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_echo {
            if now.duration_since(last) < self.settings.heartbeat_echo_interval {
                debug!("Heartbeat answers our echo, not replying");
                return;
            }
        }
        self.last_echo = Some(now);
        if let Err(e) = self.send(&ClientIntent::Heartbeat).await {
            warn!("Failed to echo heartbeat: {}", e);
        }
    }

    async fn reconnect(&mut self, reason: String) -> Result<(), StreamError> {
        // Dropped rather than closed: a stalled peer would block the close
        self.transport = None;
        let endpoint = self.endpoint.clone().ok_or(StreamError::NotConnected)?;

        warn!("Connection to {} dropped: {}", endpoint, reason);

        loop {
            let attempt = self.reconnect_attempt + 1;
            let Some(delay) = self.settings.reconnect.delay_for(attempt) else {
                error!(
                    "Giving up on {} after {} reconnect attempts",
                    endpoint, self.reconnect_attempt
                );
                let error = StreamError::ConnectionLost {
                    attempts: self.reconnect_attempt,
                };
                self.transition(ConnectionChange::Failed {
                    error: error.to_string(),
                });
                return Err(error);
            };

            info!(
                "Reconnect attempt {}/{} to {} in {:?}",
                attempt, self.settings.reconnect.max_attempts, endpoint, delay
            );
            self.transition(ConnectionChange::Reconnecting {
                attempt,
                delay,
                reason: reason.clone(),
            });

            tokio::time::sleep(delay).await;

            // Counted only once the dial starts, so a cancelled delay is redone
            self.reconnect_attempt = attempt;

            match Self::dial(
                Arc::clone(&self.connector),
                &endpoint,
                self.settings.liveness_window,
            )
            .await
            {
                Ok((transport, client_id)) => {
                    info!("Reconnected to {} on attempt {}", endpoint, attempt);
                    self.transport = Some(transport);
                    self.reconnect_attempt = 0;
                    self.client_id = client_id.clone();
                    self.last_echo = None;
                    self.transition(ConnectionChange::Connected { client_id });
                    return Ok(());
                }
                Err(e) => warn!("Reconnect attempt {} failed: {:#}", attempt, e),
            }
        }
    }

    /// Open a transport and wait for `connection {status: "connected"}`.
    async fn dial(
        connector: Arc<dyn Connector>,
        endpoint: &str,
        window: Duration,
    ) -> Result<(Box<dyn Transport>, Option<String>)> {
        let mut transport = connector
            .connect(endpoint)
            .await
            .context("Transport connect failed")?;

        let client_id = timeout(window, Self::await_ack(transport.as_mut()))
            .await
            .with_context(|| format!("No handshake acknowledgement within {:?}", window))??;

        Ok((transport, client_id))
    }

    async fn await_ack(transport: &mut dyn Transport) -> Result<Option<String>> {
        loop {
            let text = match transport.recv().await {
                Some(Ok(Frame::Text(text))) => text,
                Some(Ok(Frame::Keepalive)) => continue,
                Some(Err(e)) => return Err(e.context("Read failed during handshake")),
                None => bail!("Connection closed during handshake"),
            };

            match ServerEvent::decode(&text) {
                Ok(ServerEvent::Connection { status, client_id }) if status == "connected" => {
                    return Ok(client_id)
                }
                Ok(ServerEvent::Connection { status, .. }) => {
                    bail!("Endpoint refused connection: {}", status)
                }
                Ok(other) => debug!("Ignoring {} before handshake", other.kind()),
                Err(e) => warn!("Dropping frame during handshake: {}", e),
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("reconnect_attempt", &self.reconnect_attempt)
            .field("client_id", &self.client_id)
            .finish()
    }
}

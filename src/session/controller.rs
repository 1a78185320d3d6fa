use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::api::{
    HealthStatus, SessionApi, SessionInfo, StartSessionRequest, StartSessionResponse,
    StopSessionResponse,
};
use super::status::SessionStatus;
use crate::client::{Dispatch, StreamClient};
use crate::error::StreamError;

/// Drives the start/stop lifecycle of sessions this client records
///
/// Start and stop go through the session-management API; everything else
/// (chunks, summary, error status) arrives on the stream and is applied by
/// the wrapped `StreamClient`.
pub struct SessionController {
    /// Streaming client holding the connection and aggregates
    client: StreamClient,

    /// Session-management collaborator
    api: Arc<dyn SessionApi>,
}

impl SessionController {
    pub fn new(client: StreamClient, api: Arc<dyn SessionApi>) -> Self {
        Self { client, api }
    }

    pub fn client(&self) -> &StreamClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut StreamClient {
        &mut self.client
    }

    pub fn into_client(self) -> StreamClient {
        self.client
    }

    pub fn status(&self, session_id: &str) -> Option<SessionStatus> {
        self.client.get_aggregate(session_id).map(|a| a.status())
    }

    /// Ask the service for a new session, then subscribe to it.
    ///
    /// Fails with `NotConnected` before touching the service when the stream
    /// is down, so no subscription is ever created in that case.
    pub async fn start(
        &mut self,
        request: StartSessionRequest,
    ) -> Result<StartSessionResponse, StreamError> {
        if !self.client.is_connected() {
            warn!("Refusing to start a session while {}", self.client.connection_state());
            return Err(StreamError::NotConnected);
        }

        info!("Starting new session (name={:?})", request.session_name);

        let response = match self.api.start_session(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to start session: {}", e);
                return Err(e);
            }
        };
        let session_id = response.session_id.clone();

        // Aggregate exists from here on, so chunks racing the ack are kept
        self.client.subscribe(&session_id).await;
        self.client
            .advance_session(&session_id, SessionStatus::Starting)
            .await?;
        self.client
            .advance_session(&session_id, SessionStatus::Active)
            .await?;

        info!("Session {} is active", session_id);
        Ok(response)
    }

    /// Request termination of an active session.
    ///
    /// The subscription stays open until the final summary or an error
    /// status arrives; use `wait_for_completion` to drive that.
    pub async fn stop(&mut self, session_id: &str) -> Result<StopSessionResponse, StreamError> {
        let status = self.status(session_id);
        if status != Some(SessionStatus::Active) {
            return Err(StreamError::InvalidState {
                session_id: session_id.to_string(),
                action: "stop",
                status: status.map_or_else(|| "untracked".to_string(), |s| s.to_string()),
            });
        }
        if !self.client.is_connected() {
            return Err(StreamError::NotConnected);
        }

        self.client
            .advance_session(session_id, SessionStatus::Stopping)
            .await?;
        info!("Stopping session {}", session_id);

        match self.api.stop_session(session_id).await {
            Ok(response) => {
                info!(
                    "Session {} stopped: {} chunks over {:.1}s, awaiting final summary",
                    session_id, response.total_chunks, response.total_duration
                );
                Ok(response)
            }
            Err(e) => {
                error!("Failed to stop session {}: {}", session_id, e);
                if let Err(transition) = self
                    .client
                    .advance_session(session_id, SessionStatus::Error)
                    .await
                {
                    warn!("{}", transition);
                }
                Err(e)
            }
        }
    }

    /// Process events until the session reaches Completed or Error.
    pub async fn wait_for_completion(
        &mut self,
        session_id: &str,
    ) -> Result<SessionStatus, StreamError> {
        loop {
            match self.status(session_id) {
                Some(status) if status.is_terminal() => return Ok(status),
                Some(_) => {}
                None => {
                    return Err(StreamError::InvalidState {
                        session_id: session_id.to_string(),
                        action: "wait for completion",
                        status: "untracked".to_string(),
                    })
                }
            }
            self.next_event().await?;
        }
    }

    /// Apply the next inbound event.
    ///
    /// After a reconnect, stopping sessions are checked against the service:
    /// a summary broadcast while the link was down is not redelivered.
    pub async fn next_event(&mut self) -> Result<Dispatch, StreamError> {
        let dispatch = self.client.next_event().await?;
        if matches!(dispatch, Dispatch::Reconnected { .. }) {
            self.reconcile_stopping().await;
        }
        Ok(dispatch)
    }

    /// Complete stopping sessions the service has already finished with.
    async fn reconcile_stopping(&mut self) {
        for session_id in self.client.sessions_in(SessionStatus::Stopping) {
            match self.api.session_status(&session_id).await {
                Ok(None) => {
                    warn!(
                        "Session {} finished while the stream was down; its summary was missed",
                        session_id
                    );
                    self.client.complete_without_summary(&session_id).await;
                }
                Ok(Some(progress)) => {
                    debug!("Session {} still stopping ({:?})", session_id, progress.status);
                }
                Err(e) => warn!("Could not check session {}: {}", session_id, e),
            }
        }
    }

    pub async fn list_active_sessions(&self) -> Result<Vec<SessionInfo>, StreamError> {
        self.api.list_active_sessions().await
    }

    pub async fn health(&self) -> Result<HealthStatus, StreamError> {
        self.api.health().await
    }
}

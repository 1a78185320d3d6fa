use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::aggregate::{
    AggregateStore, Chunk, ChunkOutcome, FinalSummary, SessionAggregate, SessionSnapshot,
    SummaryOutcome,
};
use crate::connection::{
    ConnectionChange, ConnectionManager, ConnectionSettings, ConnectionState, Incoming,
};
use crate::error::StreamError;
use crate::http::ViewState;
use crate::observer::Observers;
use crate::protocol::{ClientIntent, ServerEvent, StatusEvent};
use crate::session::SessionStatus;
use crate::subscription::SubscriptionRegistry;
use crate::transport::{Connector, WebSocketConnector};

/// A `status` event together with its effect on the local session
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub event: StatusEvent,

    /// Lifecycle state of the addressed session after the event, if tracked
    pub session_status: Option<SessionStatus>,
}

/// What processing one inbound event amounted to
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Chunk {
        session_id: String,
        chunk_id: u64,
        outcome: ChunkOutcome,
    },
    Summary {
        session_id: String,
        outcome: SummaryOutcome,
    },
    Status {
        session_id: Option<String>,
        session_status: Option<SessionStatus>,
    },
    /// The connection was re-established and subscriptions replayed
    Reconnected {
        replayed: usize,
    },
    SubscriptionConfirmed {
        session_id: String,
        status: String,
    },
    ServerStatus {
        active_connections: u64,
        active_sessions: u64,
        client_subscriptions: u64,
    },
    /// Well-formed frame with invalid content (logged and dropped)
    Rejected {
        reason: String,
    },
    /// Nothing to do for this event type
    Ignored {
        kind: &'static str,
    },
}

/// Streaming client: one connection, many session subscriptions
///
/// Every inbound event is processed to completion inside `next_event`
/// before the next one is read, so aggregates need no locking. Only this
/// client mutates its aggregates; viewers get snapshots.
pub struct StreamClient {
    connection: ConnectionManager,
    subscriptions: SubscriptionRegistry,
    aggregates: AggregateStore,
    chunk_observers: Observers<Chunk>,
    summary_observers: Observers<FinalSummary>,
    status_observers: Observers<StatusUpdate>,
    view: Option<ViewState>,
}

impl StreamClient {
    pub fn new(connector: Arc<dyn Connector>, settings: ConnectionSettings) -> Self {
        Self {
            connection: ConnectionManager::new(connector, settings),
            subscriptions: SubscriptionRegistry::new(),
            aggregates: AggregateStore::new(),
            chunk_observers: Observers::new(),
            summary_observers: Observers::new(),
            status_observers: Observers::new(),
            view: None,
        }
    }

    /// Client speaking WebSocket to the endpoint
    pub fn websocket(settings: ConnectionSettings) -> Self {
        Self::new(Arc::new(WebSocketConnector), settings)
    }

    /// Publish snapshots into `view` after every applied event.
    ///
    /// The connection state is mirrored on every transition, so viewers see
    /// `Reconnecting` while the reconnect loop is still running.
    pub async fn attach_view(&mut self, view: ViewState) {
        view.set_connection_state(self.connection.state());
        let mirror = view.clone();
        self.connection
            .on_change(move |change| mirror.set_connection_state(change.state()));
        for aggregate in self.aggregate_list() {
            view.publish(SessionSnapshot::from(aggregate)).await;
        }
        self.view = Some(view);
    }

    fn aggregate_list(&self) -> Vec<&SessionAggregate> {
        self.aggregates
            .session_ids()
            .filter_map(|id| self.aggregates.get(id))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------------

    /// Connect, then send every registered subscription.
    pub async fn connect(&mut self, endpoint: &str) -> Result<(), StreamError> {
        let result = self.connection.connect(endpoint).await;
        if result.is_ok() {
            self.subscriptions.replay(&mut self.connection).await;
        }
        result
    }

    pub async fn disconnect(&mut self) {
        self.connection.disconnect().await;
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Ask the endpoint for its connection statistics.
    ///
    /// The answer arrives as `Dispatch::ServerStatus`.
    pub async fn request_server_status(&mut self) -> Result<(), StreamError> {
        self.connection.send(&ClientIntent::GetStatus).await
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    /// Start tracking a session. Idempotent.
    ///
    /// A finished session still held for reading is not subscribed again;
    /// nothing more will be delivered for it.
    pub async fn subscribe(&mut self, session_id: &str) {
        if self.aggregates.ensure(session_id) {
            info!("Tracking session {}", session_id);
        } else if self
            .aggregates
            .get(session_id)
            .is_some_and(SessionAggregate::is_frozen)
        {
            debug!("Session {} already finished, not resubscribing", session_id);
            return;
        }
        self.subscriptions
            .subscribe(session_id, &mut self.connection)
            .await;
        self.publish(session_id).await;
    }

    /// Stop tracking a session and drop its aggregate.
    ///
    /// Effective immediately: chunks still in flight for it are discarded.
    pub async fn unsubscribe(&mut self, session_id: &str) {
        self.subscriptions
            .unsubscribe(session_id, &mut self.connection)
            .await;
        if self.aggregates.remove(session_id).is_some() {
            info!("Stopped tracking session {}", session_id);
        }
        self.publish(session_id).await;
    }

    /// Drop the aggregate of a finished session once the caller has read it.
    pub async fn acknowledge_completion(&mut self, session_id: &str) -> Option<SessionAggregate> {
        let terminal = self
            .aggregates
            .get(session_id)
            .is_some_and(SessionAggregate::is_frozen);
        if !terminal {
            return None;
        }
        let aggregate = self.aggregates.remove(session_id);
        self.publish(session_id).await;
        aggregate
    }

    /// Ids of tracked sessions currently in `status`, sorted
    pub fn sessions_in(&self, status: SessionStatus) -> Vec<String> {
        let mut ids: Vec<String> = self
            .aggregate_list()
            .into_iter()
            .filter(|aggregate| aggregate.status() == status)
            .map(|aggregate| aggregate.session_id().to_string())
            .collect();
        ids.sort();
        ids
    }

    pub fn is_subscribed(&self, session_id: &str) -> bool {
        self.subscriptions.contains(session_id)
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    /// Stop receiving events for a finished session but keep its aggregate.
    async fn release(&mut self, session_id: &str) {
        if self
            .subscriptions
            .unsubscribe(session_id, &mut self.connection)
            .await
        {
            debug!("Released subscription for finished session {}", session_id);
        }
    }

    // ------------------------------------------------------------------------
    // Query surface
    // ------------------------------------------------------------------------

    pub fn get_aggregate(&self, session_id: &str) -> Option<&SessionAggregate> {
        self.aggregates.get(session_id)
    }

    pub fn get_final_summary(&self, session_id: &str) -> Option<&FinalSummary> {
        self.aggregates.final_summary(session_id)
    }

    pub fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.aggregates.get(session_id).map(SessionSnapshot::from)
    }

    pub fn on_chunk<F>(&mut self, listener: F)
    where
        F: FnMut(&Chunk) + Send + 'static,
    {
        self.chunk_observers.register(listener);
    }

    pub fn on_summary<F>(&mut self, listener: F)
    where
        F: FnMut(&FinalSummary) + Send + 'static,
    {
        self.summary_observers.register(listener);
    }

    pub fn on_status<F>(&mut self, listener: F)
    where
        F: FnMut(&StatusUpdate) + Send + 'static,
    {
        self.status_observers.register(listener);
    }

    pub fn on_connection_change<F>(&mut self, listener: F)
    where
        F: FnMut(&ConnectionChange) + Send + 'static,
    {
        self.connection.on_change(listener);
    }

    // ------------------------------------------------------------------------
    // Lifecycle hooks used by the session controller
    // ------------------------------------------------------------------------

    pub(crate) async fn advance_session(
        &mut self,
        session_id: &str,
        next: SessionStatus,
    ) -> Result<SessionStatus, StreamError> {
        let aggregate =
            self.aggregates
                .get_mut(session_id)
                .ok_or_else(|| StreamError::InvalidState {
                    session_id: session_id.to_string(),
                    action: "transition",
                    status: "untracked".to_string(),
                })?;
        let previous = aggregate.transition(next)?;
        if next.is_terminal() {
            self.release(session_id).await;
        }
        self.publish(session_id).await;
        Ok(previous)
    }

    /// Complete a stopping session whose summary will never be delivered.
    pub(crate) async fn complete_without_summary(&mut self, session_id: &str) -> bool {
        let finished = self
            .aggregates
            .get_mut(session_id)
            .is_some_and(SessionAggregate::complete_without_summary);
        if finished {
            self.release(session_id).await;
            self.publish(session_id).await;
        }
        finished
    }

    // ------------------------------------------------------------------------
    // Event processing
    // ------------------------------------------------------------------------

    /// Wait for and apply the next inbound event.
    ///
    /// Fails with `ConnectionLost` once the reconnect budget is spent and with
    /// `NotConnected` when there is no connection to read from.
    pub async fn next_event(&mut self) -> Result<Dispatch, StreamError> {
        match self.connection.recv().await? {
            Incoming::Reconnected => {
                let replayed = self.subscriptions.replay(&mut self.connection).await;
                Ok(Dispatch::Reconnected { replayed })
            }
            Incoming::Event(event) => Ok(self.dispatch(event).await),
        }
    }

    async fn dispatch(&mut self, event: ServerEvent) -> Dispatch {
        match event {
            ServerEvent::ChunkUpdate { session_id, chunk } => {
                self.handle_chunk(session_id, chunk).await
            }
            ServerEvent::SummaryUpdate {
                session_id,
                summary,
            } => self.handle_summary(session_id, summary).await,
            ServerEvent::Status(event) => self.handle_status(event).await,
            ServerEvent::SubscriptionConfirmed { session_id, status } => {
                debug!("Subscription {} for {}", status, session_id);
                Dispatch::SubscriptionConfirmed { session_id, status }
            }
            ServerEvent::StatusResponse {
                active_connections,
                active_sessions,
                client_subscriptions,
            } => Dispatch::ServerStatus {
                active_connections,
                active_sessions,
                client_subscriptions,
            },
            other => {
                debug!("Ignoring {} event", other.kind());
                Dispatch::Ignored { kind: other.kind() }
            }
        }
    }

    async fn handle_chunk(
        &mut self,
        session_id: String,
        payload: crate::protocol::ChunkPayload,
    ) -> Dispatch {
        let chunk_id = payload.chunk_id;
        let chunk = match Chunk::from_payload(&session_id, payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Dropping chunk: {}", e);
                return Dispatch::Rejected {
                    reason: e.to_string(),
                };
            }
        };

        let outcome = self.aggregates.apply_chunk(chunk);
        if outcome.is_applied() {
            if let Some(chunk) = self
                .aggregates
                .get(&session_id)
                .and_then(|aggregate| aggregate.chunk(chunk_id))
            {
                self.chunk_observers.notify(chunk);
            }
            self.publish(&session_id).await;
        }

        Dispatch::Chunk {
            session_id,
            chunk_id,
            outcome,
        }
    }

    async fn handle_summary(
        &mut self,
        session_id: String,
        mut summary: FinalSummary,
    ) -> Dispatch {
        if summary.session_id != session_id {
            warn!(
                "Summary envelope for {} carries session id {}; using the envelope",
                session_id, summary.session_id
            );
            summary.session_id = session_id.clone();
        }

        let outcome = self.aggregates.apply_final_summary(summary);
        if outcome == SummaryOutcome::Applied {
            if let Some(summary) = self.aggregates.final_summary(&session_id) {
                self.summary_observers.notify(summary);
            }
            self.release(&session_id).await;
            self.publish(&session_id).await;
        }

        Dispatch::Summary {
            session_id,
            outcome,
        }
    }

    async fn handle_status(&mut self, event: StatusEvent) -> Dispatch {
        let mut session_status = None;

        if let Some(session_id) = event.session_id.clone() {
            if let Some(aggregate) = self.aggregates.get_mut(&session_id) {
                let mut finished = false;
                if event.is_error() && !aggregate.is_frozen() {
                    warn!("Session {} reported an error: {}", session_id, event.status);
                    finished = aggregate.transition(SessionStatus::Error).is_ok();
                } else if event.summary_unavailable() {
                    finished = aggregate.complete_without_summary();
                }
                session_status = Some(aggregate.status());

                if finished {
                    self.release(&session_id).await;
                }
                self.publish(&session_id).await;
            }
        }

        info!("Status: {}", event.status);
        let session_id = event.session_id.clone();
        self.status_observers.notify(&StatusUpdate {
            event,
            session_status,
        });

        Dispatch::Status {
            session_id,
            session_status,
        }
    }

    // ------------------------------------------------------------------------
    // Viewer publishing
    // ------------------------------------------------------------------------

    async fn publish(&self, session_id: &str) {
        let Some(view) = &self.view else {
            return;
        };
        match self.aggregates.get(session_id) {
            Some(aggregate) => view.publish(SessionSnapshot::from(aggregate)).await,
            None => view.remove(session_id).await,
        }
    }
}

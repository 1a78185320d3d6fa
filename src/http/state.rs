use crate::aggregate::SessionSnapshot;
use crate::connection::ConnectionState;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Read models shared between the streaming client and the HTTP handlers
///
/// The client is the only writer; handlers only read.
#[derive(Clone)]
pub struct ViewState {
    /// Latest snapshot per tracked session (session_id → snapshot)
    pub sessions: Arc<RwLock<HashMap<String, SessionSnapshot>>>,

    /// Connection state, updated on every transition (including mid-reconnect)
    pub connection: Arc<watch::Sender<ConnectionState>>,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            connection: Arc::new(watch::channel(ConnectionState::Disconnected).0),
        }
    }

    pub async fn publish(&self, snapshot: SessionSnapshot) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(snapshot.session_id.clone(), snapshot);
    }

    pub async fn remove(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    /// Never blocks, so it can run inside a connection-change listener.
    pub fn set_connection_state(&self, state: ConnectionState) {
        self.connection.send_replace(state);
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub async fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

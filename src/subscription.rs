use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::connection::ConnectionManager;
use crate::protocol::ClientIntent;

/// Session ids the client wants events for
///
/// The registry, not the endpoint, is the source of truth: the full set is
/// re-sent on every Connected transition because the endpoint forgets
/// subscriptions when a connection drops.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    active: BTreeSet<String>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.active.contains(session_id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.active.iter().map(String::as_str)
    }

    /// Add a session and tell the endpoint if connected.
    ///
    /// Re-subscribing is a no-op; when disconnected the intent waits for the
    /// next replay. Returns true if the id was newly added.
    pub async fn subscribe(&mut self, session_id: &str, connection: &mut ConnectionManager) -> bool {
        if !self.active.insert(session_id.to_string()) {
            debug!("Already subscribed to {}", session_id);
            return false;
        }

        if connection.is_connected() {
            let intent = ClientIntent::Subscribe {
                session_id: session_id.to_string(),
            };
            if let Err(e) = connection.send(&intent).await {
                warn!("Subscribe intent for {} not sent: {}", session_id, e);
            }
        } else {
            info!("Deferring subscribe for {} until connected", session_id);
        }
        true
    }

    /// Remove a session and tell the endpoint if connected.
    ///
    /// Unknown ids are ignored. Returns true if the id was subscribed.
    pub async fn unsubscribe(&mut self, session_id: &str, connection: &mut ConnectionManager) -> bool {
        if !self.active.remove(session_id) {
            return false;
        }

        if connection.is_connected() {
            let intent = ClientIntent::Unsubscribe {
                session_id: session_id.to_string(),
            };
            if let Err(e) = connection.send(&intent).await {
                warn!("Unsubscribe intent for {} not sent: {}", session_id, e);
            }
        }
        true
    }

    /// Re-send every active subscription. Returns how many intents were sent.
    pub async fn replay(&self, connection: &mut ConnectionManager) -> usize {
        let mut sent = 0;
        for session_id in &self.active {
            let intent = ClientIntent::Subscribe {
                session_id: session_id.clone(),
            };
            match connection.send(&intent).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!("Replay of subscription {} failed: {}", session_id, e);
                    break;
                }
            }
        }
        if sent > 0 {
            info!("Replayed {} subscriptions", sent);
        }
        sent
    }
}

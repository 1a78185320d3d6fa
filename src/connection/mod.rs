//! Connection management for the streaming endpoint
//!
//! This module provides the `ConnectionManager` abstraction that owns:
//! - The single physical transport and its handshake
//! - Heartbeat echo and liveness detection
//! - Bounded exponential reconnection (`ReconnectPolicy`)
//! - Connection-change notifications

mod backoff;
mod manager;
mod state;

pub use backoff::ReconnectPolicy;
pub use manager::{ConnectionManager, ConnectionSettings, Incoming};
pub use state::{ConnectionChange, ConnectionState};

//! Read-only HTTP API for presentation layers
//!
//! Serves the snapshots the streaming client publishes:
//! - GET /connection - Streaming connection state
//! - GET /sessions - All tracked sessions
//! - GET /sessions/:id - One session snapshot
//! - GET /sessions/:id/chunks - Ordered chunk headers
//! - GET /sessions/:id/summary - Final summary
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ConnectionResponse, ErrorResponse};
pub use routes::create_router;
pub use state::ViewState;

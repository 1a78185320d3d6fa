//! Session lifecycle
//!
//! This module provides:
//! - `SessionStatus`: the per-session lifecycle state machine
//! - `SessionApi` / `HttpSessionApi`: the session-management service client
//! - `SessionController`: start/stop orchestration on top of `StreamClient`

mod api;
mod controller;
mod status;

pub use api::{
    AudioDeviceInfo, HealthStatus, HttpSessionApi, SessionApi, SessionInfo, SessionProgress,
    StartSessionRequest, StartSessionResponse, StopSessionRequest, StopSessionResponse,
};
pub use controller::SessionController;
pub use status::SessionStatus;

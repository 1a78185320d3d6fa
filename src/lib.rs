pub mod aggregate;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod observer;
pub mod protocol;
pub mod session;
pub mod subscription;
pub mod transport;

pub use aggregate::{
    AggregateStore, Chunk, ChunkOutcome, FinalSummary, SessionAggregate, SessionSnapshot,
    SessionStatistics, StatisticsSource, SummaryOutcome,
};
pub use client::{Dispatch, StatusUpdate, StreamClient};
pub use config::Config;
pub use connection::{
    ConnectionChange, ConnectionManager, ConnectionSettings, ConnectionState, ReconnectPolicy,
};
pub use error::{ProtocolError, StreamError};
pub use http::{create_router, ViewState};
pub use protocol::{ClientIntent, ServerEvent};
pub use session::{
    HttpSessionApi, SessionApi, SessionController, SessionStatus, StartSessionRequest,
};
pub use subscription::SubscriptionRegistry;
pub use transport::{Connector, Frame, Transport, WebSocketConnector};

pub mod backend;
pub mod websocket;

pub use backend::{Connector, Frame, Transport};
pub use websocket::{WebSocketConnector, WebSocketTransport};

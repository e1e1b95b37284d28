//! Realtime stream modules.
//!
//! - `proto`: subscription frames and the inbound message decoder.
//! - `transport`: one WebSocket connection, split into write and read halves.
//! - `reader`: the per-socket read loop feeding the shared inbound queue.
//! - `session`: the dual-socket session that owns both connections.

/// Stream error types.
pub mod error;
/// Stream protocol frames.
pub mod proto;
/// Per-socket reader task and counters.
pub mod reader;
/// Session owning the private and markets sockets.
pub mod session;
/// WebSocket transport socket.
pub mod transport;

pub use error::{CloseFailure, ConnectError, StreamError};
pub use proto::{InboundMessage, InboundPayload, SocketKind, SubscriptionKind, SubscriptionRequest};
pub use reader::{ReaderExit, ReaderStatus, StreamStats};
pub use session::{SessionState, StreamEndpoints, StreamOptions, StreamSession};

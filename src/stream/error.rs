use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::auth::AuthError;
use crate::stream::proto::SocketKind;
use crate::stream::session::SessionState;

/// Why a single socket failed to open.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("websocket handshake failed: {0}")]
    WebSocket(#[source] WsError),

    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to sign handshake: {0}")]
    Auth(#[from] AuthError),
}

/// One socket's failure during [`close`](crate::stream::session::StreamSession::close).
#[derive(Debug, Error)]
#[error("{socket} socket: {source}")]
pub struct CloseFailure {
    pub socket: SocketKind,
    pub source: WsError,
}

/// Errors surfaced to callers of [`StreamSession`](crate::stream::session::StreamSession).
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("{socket} socket connect failed: {source}")]
    Connect {
        socket: SocketKind,
        source: ConnectError,
    },

    #[error("{socket} socket write failed: {source}")]
    Write { socket: SocketKind, source: WsError },

    #[error("{0} socket is not connected")]
    NotConnected(SocketKind),

    #[error("close failed: {}", join_failures(.0))]
    Close(Vec<CloseFailure>),

    #[error("cannot {operation} a session that is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StreamError {
    /// Socket the error concerns, when there is exactly one.
    pub fn socket(&self) -> Option<SocketKind> {
        match self {
            Self::Connect { socket, .. } | Self::Write { socket, .. } => Some(*socket),
            Self::NotConnected(socket) => Some(*socket),
            Self::Close(_) | Self::InvalidState { .. } | Self::Encode(_) => None,
        }
    }
}

fn join_failures(failures: &[CloseFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

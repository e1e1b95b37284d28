//! One bidirectional stream connection, split into a shared write half and
//! a read half owned by the socket's reader task.

use std::pin::Pin;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use http::HeaderMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::retry::with_timeout;
use crate::stream::error::ConnectError;
use crate::stream::proto::SocketKind;

pub(crate) type WsSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;
pub(crate) type WsSource = Pin<Box<dyn Stream<Item = Result<Message, WsError>> + Send>>;

/// Data frame handed to the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Error)]
pub enum ReadError {
    /// The peer closed cleanly (1000/1001 or no code) or the stream ended.
    #[error("connection closed normally")]
    NormalClosure,

    #[error("connection closed with code {code}: {reason}")]
    Closed { code: u16, reason: String },

    #[error("websocket read failed: {0}")]
    Transport(#[source] WsError),
}

/// Opens a socket, sending `headers` with the upgrade request.
pub async fn connect(
    kind: SocketKind,
    url: &str,
    headers: HeaderMap,
    timeout: Duration,
) -> Result<(SocketWriter, SocketReader), ConnectError> {
    let mut request = url.into_client_request().map_err(ConnectError::WebSocket)?;
    request.headers_mut().extend(headers);

    let (socket, _response) = with_timeout(timeout, connect_async(request))
        .await
        .map_err(|_| ConnectError::Timeout(timeout))?
        .map_err(ConnectError::WebSocket)?;

    let (sink, source) = socket.split();
    Ok(from_parts(kind, Box::pin(sink), Box::pin(source)))
}

pub(crate) fn from_parts(
    kind: SocketKind,
    sink: WsSink,
    source: WsSource,
) -> (SocketWriter, SocketReader) {
    (
        SocketWriter {
            kind,
            sink: Mutex::new(sink),
        },
        SocketReader { kind, source },
    )
}

/// Write half. Sends are serialized, one frame at a time.
pub struct SocketWriter {
    kind: SocketKind,
    sink: Mutex<WsSink>,
}

impl SocketWriter {
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    pub async fn send_text(&self, text: String) -> Result<(), WsError> {
        self.sink.lock().await.send(Message::Text(text)).await
    }

    /// Starts the close handshake. A socket that is already gone counts as
    /// closed.
    pub async fn close(&self) -> Result<(), WsError> {
        let mut sink = self.sink.lock().await;
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        match sink.send(Message::Close(Some(frame))).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Read half, owned by exactly one reader task.
pub struct SocketReader {
    kind: SocketKind,
    source: WsSource,
}

impl SocketReader {
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    /// Waits for the next data frame. Control frames are absorbed here.
    pub async fn receive(&mut self) -> Result<Frame, ReadError> {
        loop {
            match self.source.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text)),
                Some(Ok(Message::Binary(bytes))) => return Ok(Frame::Binary(bytes)),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => return Err(close_error(frame)),
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Err(ReadError::NormalClosure)
                }
                Some(Err(err)) => return Err(ReadError::Transport(err)),
            }
        }
    }
}

fn close_error(frame: Option<CloseFrame<'_>>) -> ReadError {
    let Some(frame) = frame else {
        return ReadError::NormalClosure;
    };
    match frame.code {
        CloseCode::Normal | CloseCode::Away => ReadError::NormalClosure,
        code => ReadError::Closed {
            code: code.into(),
            reason: frame.reason.into_owned(),
        },
    }
}

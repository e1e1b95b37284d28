//! Per-socket reader task: receive, decode, drop heartbeats, enqueue.
//!
//! Enqueueing never waits. When the inbound queue is full the message is
//! dropped and counted, so a slow consumer cannot stall socket reads or the
//! other socket's reader.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::stream::proto::{DecodeError, InboundMessage, SocketKind};
use crate::stream::transport::{Frame, ReadError, SocketReader};

/// How a reader task ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReaderExit {
    /// The session fired its cancellation signal.
    Cancelled,
    /// The peer closed the connection cleanly.
    NormalClosure,
    /// The connection failed; carries the rendered read error.
    Failed(String),
    /// The consumer dropped the message receiver.
    ConsumerGone,
}

/// Emitted on the session's status channel as each reader ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderStatus {
    pub socket: SocketKind,
    pub exit: ReaderExit,
}

/// Counter snapshot for both readers combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub delivered: u64,
    pub dropped: u64,
    pub heartbeats: u64,
    pub malformed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StreamCounters {
    delivered: AtomicU64,
    dropped: AtomicU64,
    heartbeats: AtomicU64,
    malformed: AtomicU64,
}

impl StreamCounters {
    pub(crate) fn snapshot(&self) -> StreamStats {
        StreamStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

pub(crate) enum Admission {
    Deliver(InboundMessage),
    Heartbeat,
    Malformed(DecodeError),
}

/// Decodes and classifies one frame without touching the queue.
pub(crate) fn admit(frame: &Frame) -> Admission {
    let decoded = match frame {
        Frame::Text(text) => InboundMessage::decode(text),
        Frame::Binary(bytes) => InboundMessage::decode_bytes(bytes),
    };
    match decoded {
        Ok(message) if message.is_heartbeat() => Admission::Heartbeat,
        Ok(message) => Admission::Deliver(message),
        Err(err) => Admission::Malformed(err),
    }
}

pub(crate) async fn run_reader(
    mut reader: SocketReader,
    queue: mpsc::Sender<InboundMessage>,
    cancel: CancellationToken,
    counters: std::sync::Arc<StreamCounters>,
) -> ReaderExit {
    let socket = reader.kind();
    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ReaderExit::Cancelled,
            received = reader.receive() => received,
        };

        let frame = match received {
            Ok(frame) => frame,
            Err(ReadError::NormalClosure) => {
                info!(event = "stream_socket_closed", socket = %socket);
                return ReaderExit::NormalClosure;
            }
            Err(err) => {
                warn!(event = "stream_read_failed", socket = %socket, error = %err);
                return ReaderExit::Failed(err.to_string());
            }
        };

        match admit(&frame) {
            Admission::Deliver(message) => match queue.try_send(message) {
                Ok(()) => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(message)) => {
                    let dropped = counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        event = "stream_queue_full",
                        socket = %socket,
                        payload = message.payload.name(),
                        dropped
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(event = "stream_consumer_gone", socket = %socket);
                    return ReaderExit::ConsumerGone;
                }
            },
            Admission::Heartbeat => {
                counters.heartbeats.fetch_add(1, Ordering::Relaxed);
                trace!(event = "stream_heartbeat", socket = %socket);
            }
            Admission::Malformed(err) => {
                counters.malformed.fetch_add(1, Ordering::Relaxed);
                debug!(event = "stream_frame_skipped", socket = %socket, error = %err);
            }
        }
    }
}

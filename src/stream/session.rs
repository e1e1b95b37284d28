//! Dual-socket stream session.
//!
//! `StreamSession` owns the private and markets sockets, one reader task per
//! socket, and the bounded inbound queue both readers feed. Subscriptions go
//! out on whichever socket serves their kind; everything that comes back is
//! merged into one receiver handed out by [`StreamSession::messages`].
//!
//! There is no reconnect. Callers that want one can watch
//! [`StreamSession::take_status`] and build a fresh session.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::Signer;
use crate::config::ClientConfig;
use crate::retry::with_timeout;
use crate::stream::error::{CloseFailure, ConnectError, StreamError};
use crate::stream::proto::{
    ClientFrame, InboundMessage, SocketKind, SubscriptionKind, SubscriptionRequest,
};
use crate::stream::reader::{run_reader, ReaderStatus, StreamCounters, StreamStats};
use crate::stream::transport::{self, SocketReader, SocketWriter};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StreamDefaults;

impl StreamDefaults {
    pub const QUEUE_CAPACITY: usize = 100;
    pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
    pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);
}

#[derive(Clone, Debug)]
pub struct StreamOptions {
    /// Bound of the inbound queue. Messages beyond it are dropped.
    pub queue_capacity: usize,
    pub handshake_timeout: Duration,
    /// How long `close` waits for each socket and reader before giving up.
    pub shutdown_grace: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            queue_capacity: StreamDefaults::QUEUE_CAPACITY,
            handshake_timeout: StreamDefaults::HANDSHAKE_TIMEOUT,
            shutdown_grace: StreamDefaults::SHUTDOWN_GRACE,
        }
    }
}

impl StreamOptions {
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamEndpoints {
    pub private_url: String,
    pub markets_url: String,
}

impl StreamEndpoints {
    pub fn new(private_url: impl Into<String>, markets_url: impl Into<String>) -> Self {
        Self {
            private_url: private_url.into(),
            markets_url: markets_url.into(),
        }
    }

    pub fn url(&self, socket: SocketKind) -> &str {
        match socket {
            SocketKind::Private => &self.private_url,
            SocketKind::Markets => &self.markets_url,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connecting,
    Connected,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconnected => "unconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        })
    }
}

#[derive(Default)]
struct WriterSlots {
    private: Option<Arc<SocketWriter>>,
    markets: Option<Arc<SocketWriter>>,
}

impl WriterSlots {
    fn slot(&mut self, socket: SocketKind) -> &mut Option<Arc<SocketWriter>> {
        match socket {
            SocketKind::Private => &mut self.private,
            SocketKind::Markets => &mut self.markets,
        }
    }
}

pub struct StreamSession {
    endpoints: StreamEndpoints,
    signer: Signer,
    options: StreamOptions,
    state: Mutex<SessionState>,
    next_request_id: AtomicU64,
    writers: Mutex<WriterSlots>,
    inbound_tx: Mutex<Option<mpsc::Sender<InboundMessage>>>,
    inbound_rx: Mutex<Option<mpsc::Receiver<InboundMessage>>>,
    status_tx: mpsc::UnboundedSender<ReaderStatus>,
    status_rx: Mutex<Option<mpsc::UnboundedReceiver<ReaderStatus>>>,
    readers: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
    counters: Arc<StreamCounters>,
}

impl StreamSession {
    pub fn new(endpoints: StreamEndpoints, signer: Signer, options: StreamOptions) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(options.queue_capacity.max(1));
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        Self {
            endpoints,
            signer,
            options,
            state: Mutex::new(SessionState::Unconnected),
            next_request_id: AtomicU64::new(0),
            writers: Mutex::new(WriterSlots::default()),
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: Mutex::new(Some(inbound_rx)),
            status_tx,
            status_rx: Mutex::new(Some(status_rx)),
            readers: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
            counters: Arc::new(StreamCounters::default()),
        }
    }

    pub fn from_config(config: &ClientConfig, options: StreamOptions) -> Self {
        let endpoints = StreamEndpoints::new(&config.ws_private_url, &config.ws_markets_url);
        Self::new(endpoints, config.signer(), options)
    }

    /// Opens the private socket, then the markets socket, and starts both
    /// readers. If the markets socket fails the private one is closed again
    /// and the session returns to `Unconnected`.
    pub async fn connect(&self) -> Result<(), StreamError> {
        {
            let mut state = lock(&self.state);
            if *state != SessionState::Unconnected {
                return Err(StreamError::InvalidState {
                    operation: "connect",
                    state: *state,
                });
            }
            *state = SessionState::Connecting;
        }

        let (private_writer, private_reader) = match self.open(SocketKind::Private).await {
            Ok(pair) => pair,
            Err(err) => {
                self.abandon_connect();
                return Err(err);
            }
        };
        let (markets_writer, markets_reader) = match self.open(SocketKind::Markets).await {
            Ok(pair) => pair,
            Err(err) => {
                self.roll_back(&[&private_writer]).await;
                drop(private_reader);
                self.abandon_connect();
                return Err(err);
            }
        };

        let private_writer = Arc::new(private_writer);
        let markets_writer = Arc::new(markets_writer);
        let attached = self.attach(
            (Arc::clone(&private_writer), private_reader),
            (Arc::clone(&markets_writer), markets_reader),
        );
        if let Err(err) = attached {
            // Closed while the handshakes were in flight.
            self.roll_back(&[&*private_writer, &*markets_writer]).await;
            return Err(err);
        }
        Ok(())
    }

    async fn open(&self, socket: SocketKind) -> Result<(SocketWriter, SocketReader), StreamError> {
        let url = self.endpoints.url(socket);
        let headers = self
            .signer
            .stream_headers(socket.auth_path())
            .map_err(|err| StreamError::Connect {
                socket,
                source: ConnectError::Auth(err),
            })?;

        let pair = transport::connect(socket, url, headers, self.options.handshake_timeout)
            .await
            .map_err(|source| {
                warn!(event = "stream_connect_failed", socket = %socket, url, error = %source);
                StreamError::Connect { socket, source }
            })?;
        info!(event = "stream_socket_connected", socket = %socket, url);
        Ok(pair)
    }

    /// Closes sockets opened by a connect attempt that is being abandoned.
    /// Failures are logged and returned; none of them stop the rollback.
    async fn roll_back(&self, writers: &[&SocketWriter]) -> Vec<CloseFailure> {
        let mut failures = Vec::new();
        for writer in writers {
            let socket = writer.kind();
            if let Err(source) = self.close_writer(writer).await {
                warn!(event = "stream_rollback_close_failed", socket = %socket, error = %source);
                failures.push(CloseFailure { socket, source });
            }
        }
        failures
    }

    /// Closes one writer, giving up after `shutdown_grace`.
    async fn close_writer(&self, writer: &SocketWriter) -> Result<(), WsError> {
        match with_timeout(self.options.shutdown_grace, writer.close()).await {
            Ok(result) => result,
            Err(_) => Err(WsError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "close handshake timed out",
            ))),
        }
    }

    fn abandon_connect(&self) {
        let mut state = lock(&self.state);
        if *state == SessionState::Connecting {
            *state = SessionState::Unconnected;
        }
    }

    /// Installs both sockets and spawns their readers.
    pub(crate) fn attach(
        &self,
        private: (Arc<SocketWriter>, SocketReader),
        markets: (Arc<SocketWriter>, SocketReader),
    ) -> Result<(), StreamError> {
        let mut state = lock(&self.state);
        if !matches!(*state, SessionState::Unconnected | SessionState::Connecting) {
            return Err(StreamError::InvalidState {
                operation: "connect",
                state: *state,
            });
        }
        let queue = lock(&self.inbound_tx)
            .take()
            .ok_or(StreamError::InvalidState {
                operation: "connect",
                state: SessionState::Closed,
            })?;

        let mut writers = lock(&self.writers);
        let mut readers = lock(&self.readers);
        for (writer, reader) in [private, markets] {
            *writers.slot(reader.kind()) = Some(writer);
            readers.push(self.spawn_reader(reader, queue.clone()));
        }
        *state = SessionState::Connected;
        info!(event = "stream_session_connected");
        Ok(())
    }

    fn spawn_reader(
        &self,
        reader: SocketReader,
        queue: mpsc::Sender<InboundMessage>,
    ) -> JoinHandle<()> {
        let socket = reader.kind();
        let cancel = self.cancel.clone();
        let counters = Arc::clone(&self.counters);
        let status = self.status_tx.clone();
        tokio::spawn(async move {
            let exit = run_reader(reader, queue, cancel, counters).await;
            debug!(event = "stream_reader_exit", socket = %socket, exit = ?exit);
            let _ = status.send(ReaderStatus { socket, exit });
        })
    }

    /// Subscribes to `kind` and returns the allocated request id.
    pub async fn subscribe(
        &self,
        kind: SubscriptionKind,
        market_slugs: &[String],
        debounced: bool,
    ) -> Result<String, StreamError> {
        let request = SubscriptionRequest::new(kind)
            .with_market_slugs(market_slugs.iter().cloned())
            .with_debounced(debounced);
        self.send_subscription(request).await
    }

    /// Sends `request`, keeping its request id if it has one.
    pub async fn send_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> Result<String, StreamError> {
        let kind = request.kind;
        let socket = kind.socket();
        let writer = self.writer(socket)?;
        let request_id = match request.request_id.clone() {
            Some(request_id) => request_id,
            None => self.allocate_request_id(kind),
        };

        let text = request.into_frame(request_id.clone()).to_text()?;
        writer
            .send_text(text)
            .await
            .map_err(|source| StreamError::Write { socket, source })?;
        info!(
            event = "stream_subscribed",
            socket = %socket,
            kind = kind.id_prefix(),
            request_id = %request_id
        );
        Ok(request_id)
    }

    pub async fn subscribe_orders(&self, market_slugs: &[String]) -> Result<String, StreamError> {
        self.subscribe(SubscriptionKind::Order, market_slugs, false)
            .await
    }

    pub async fn subscribe_positions(
        &self,
        market_slugs: &[String],
    ) -> Result<String, StreamError> {
        self.subscribe(SubscriptionKind::Position, market_slugs, false)
            .await
    }

    pub async fn subscribe_balances(&self) -> Result<String, StreamError> {
        self.subscribe(SubscriptionKind::AccountBalance, &[], false)
            .await
    }

    pub async fn subscribe_market_data(
        &self,
        market_slugs: &[String],
        debounced: bool,
    ) -> Result<String, StreamError> {
        self.subscribe(SubscriptionKind::MarketData, market_slugs, debounced)
            .await
    }

    pub async fn subscribe_market_data_lite(
        &self,
        market_slugs: &[String],
    ) -> Result<String, StreamError> {
        self.subscribe(SubscriptionKind::MarketDataLite, market_slugs, false)
            .await
    }

    pub async fn subscribe_trades(&self, market_slugs: &[String]) -> Result<String, StreamError> {
        self.subscribe(SubscriptionKind::Trade, market_slugs, false)
            .await
    }

    /// Cancels a subscription on `socket`. Unknown ids are left to the server.
    pub async fn unsubscribe(&self, request_id: &str, socket: SocketKind) -> Result<(), StreamError> {
        let writer = self.writer(socket)?;
        let text = ClientFrame::unsubscribe(request_id).to_text()?;
        writer
            .send_text(text)
            .await
            .map_err(|source| StreamError::Write { socket, source })?;
        info!(event = "stream_unsubscribed", socket = %socket, request_id);
        Ok(())
    }

    /// Receiver for the merged inbound sequence. Returns `None` after the
    /// first call.
    pub fn messages(&self) -> Option<mpsc::Receiver<InboundMessage>> {
        lock(&self.inbound_rx).take()
    }

    /// Receiver of reader exit notices. Returns `None` after the first call.
    pub fn take_status(&self) -> Option<mpsc::UnboundedReceiver<ReaderStatus>> {
        lock(&self.status_rx).take()
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    /// True between a successful `connect` and `close`.
    ///
    /// This tracks the session, not the sockets: if the server drops both
    /// connections it stays true. Watch [`take_status`](Self::take_status)
    /// for reader exits to detect that.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    pub fn stats(&self) -> StreamStats {
        self.counters.snapshot()
    }

    pub fn endpoints(&self) -> &StreamEndpoints {
        &self.endpoints
    }

    /// Cancels both readers, closes both sockets and waits for the readers.
    ///
    /// Every socket is closed even if another one fails; failures come back
    /// together. Calling `close` again is a no-op.
    pub async fn close(&self) -> Result<(), StreamError> {
        let previous = std::mem::replace(&mut *lock(&self.state), SessionState::Closed);
        if previous == SessionState::Closed {
            debug!(event = "stream_close_repeated");
            return Ok(());
        }

        self.cancel.cancel();
        lock(&self.inbound_tx).take();

        let writers = {
            let mut slots = lock(&self.writers);
            SocketKind::BOTH.map(|socket| (socket, slots.slot(socket).take()))
        };
        let grace = self.options.shutdown_grace;
        let mut failures = Vec::new();
        for (socket, writer) in writers {
            let Some(writer) = writer else {
                continue;
            };
            if let Err(source) = self.close_writer(&writer).await {
                warn!(event = "stream_close_failed", socket = %socket, error = %source);
                failures.push(CloseFailure { socket, source });
            }
        }

        let readers = std::mem::take(&mut *lock(&self.readers));
        for mut handle in readers {
            if with_timeout(grace, &mut handle).await.is_err() {
                warn!(event = "stream_reader_aborted");
                handle.abort();
            }
        }

        info!(event = "stream_session_closed", failures = failures.len());
        if failures.is_empty() {
            Ok(())
        } else {
            Err(StreamError::Close(failures))
        }
    }

    fn writer(&self, socket: SocketKind) -> Result<Arc<SocketWriter>, StreamError> {
        lock(&self.writers)
            .slot(socket)
            .clone()
            .ok_or(StreamError::NotConnected(socket))
    }

    fn allocate_request_id(&self, kind: SubscriptionKind) -> String {
        let n = self.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n}", kind.id_prefix())
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("endpoints", &self.endpoints)
            .field("state", &self.state())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use secrecy::SecretString;
    use tokio_tungstenite::tungstenite::Message;

    use super::*;
    use crate::auth::SigningKey;
    use crate::stream::proto::InboundPayload;
    use crate::stream::reader::ReaderExit;
    use crate::stream::transport::testing::{failing_socket, mock_socket, stalled_socket, MockPeer};

    const WAIT: Duration = Duration::from_secs(2);

    fn session_with(options: StreamOptions) -> StreamSession {
        let key = SigningKey::from_bytes(&[5u8; 32]).expect("key");
        let signer = Signer::new(SecretString::new("key-id".to_string()), Arc::new(key));
        StreamSession::new(
            StreamEndpoints::new("ws://127.0.0.1:1/v1/ws/private", "ws://127.0.0.1:1/v1/ws/markets"),
            signer,
            options,
        )
    }

    fn attached(options: StreamOptions) -> (StreamSession, MockPeer, MockPeer) {
        let session = session_with(options);
        let ((private_writer, private_reader), private_peer) = mock_socket(SocketKind::Private);
        let ((markets_writer, markets_reader), markets_peer) = mock_socket(SocketKind::Markets);
        session
            .attach(
                (Arc::new(private_writer), private_reader),
                (Arc::new(markets_writer), markets_reader),
            )
            .expect("attach");
        (session, private_peer, markets_peer)
    }

    #[tokio::test]
    async fn server_side_drop_shows_in_status_not_in_is_connected() {
        let (session, private, markets) = attached(StreamOptions::default());
        let mut status = session.take_status().expect("status receiver");
        drop(private);
        drop(markets);

        for _ in 0..2 {
            let update = tokio::time::timeout(WAIT, status.recv())
                .await
                .expect("reader exit reported")
                .expect("status channel open");
            assert_eq!(update.exit, ReaderExit::NormalClosure);
        }
        assert!(session.is_connected());
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn rollback_close_is_bounded_and_reports_failures() {
        let session =
            session_with(StreamOptions::default().with_shutdown_grace(Duration::from_millis(50)));
        let ((stalled, _stalled_reader), _stalled_inbound) = stalled_socket(SocketKind::Private);
        let ((failing, _failing_reader), _failing_inbound) = failing_socket(SocketKind::Markets);

        let failures = tokio::time::timeout(WAIT, session.roll_back(&[&stalled, &failing]))
            .await
            .expect("rollback finishes within the grace period");

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].socket, SocketKind::Private);
        assert!(matches!(
            &failures[0].source,
            WsError::Io(err) if err.kind() == io::ErrorKind::TimedOut
        ));
        assert_eq!(failures[1].socket, SocketKind::Markets);
        assert!(matches!(
            &failures[1].source,
            WsError::Io(err) if err.kind() == io::ErrorKind::BrokenPipe
        ));
        assert_eq!(session.state(), SessionState::Unconnected);
    }

    async fn next_frame(peer: &mut MockPeer) -> ClientFrame {
        match tokio::time::timeout(WAIT, peer.outbound.recv()).await {
            Ok(Some(Message::Text(text))) => ClientFrame::from_text(&text).expect("frame"),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscriptions_route_by_kind() {
        let (session, mut private, mut markets) = attached(StreamOptions::default());

        for kind in SubscriptionKind::ALL {
            let request_id = session.subscribe(kind, &[], false).await.expect("subscribe");
            let (hit, miss) = match kind.socket() {
                SocketKind::Private => (&mut private, &mut markets),
                SocketKind::Markets => (&mut markets, &mut private),
            };
            match next_frame(hit).await {
                ClientFrame::Subscribe(sub) => {
                    assert_eq!(sub.request_id, request_id);
                    assert_eq!(sub.subscription_type, kind.wire_code());
                }
                other => panic!("unexpected frame: {other:?}"),
            }
            assert!(miss.outbound.try_recv().is_err(), "{kind:?} leaked");
        }
    }

    #[tokio::test]
    async fn concurrent_subscribes_get_distinct_ids() {
        let (session, _private, mut markets) = attached(StreamOptions::default());
        let session = Arc::new(session);

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.subscribe_trades(&["m".to_string()]).await })
            })
            .collect();

        let mut ids = HashSet::new();
        for task in tasks {
            ids.insert(task.await.expect("join").expect("subscribe"));
        }
        assert_eq!(ids.len(), 32);
        assert!(ids.iter().all(|id| id.starts_with("trade-")));

        let mut frames = HashSet::new();
        for _ in 0..32 {
            frames.insert(next_frame(&mut markets).await.request_id().to_string());
        }
        assert_eq!(frames, ids);
    }

    #[tokio::test]
    async fn caller_supplied_request_id_is_kept() {
        let (session, mut private, _markets) = attached(StreamOptions::default());
        let request = SubscriptionRequest::new(SubscriptionKind::OrderSnapshot)
            .with_request_id("snapshot-mine")
            .with_market_slugs(["m1"]);

        let request_id = session.send_subscription(request).await.expect("send");
        assert_eq!(request_id, "snapshot-mine");
        match next_frame(&mut private).await {
            ClientFrame::Subscribe(sub) => {
                assert_eq!(sub.request_id, "snapshot-mine");
                assert_eq!(sub.subscription_type, 2);
                assert_eq!(sub.market_slugs, vec!["m1".to_string()]);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsubscribe_goes_to_the_named_socket() {
        let (session, mut private, mut markets) = attached(StreamOptions::default());
        session
            .unsubscribe("marketdata-9", SocketKind::Markets)
            .await
            .expect("unsubscribe");

        assert_eq!(
            next_frame(&mut markets).await,
            ClientFrame::unsubscribe("marketdata-9")
        );
        assert!(private.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn operations_before_connect_are_not_connected() {
        let session = session_with(StreamOptions::default());
        assert!(matches!(
            session.subscribe_balances().await,
            Err(StreamError::NotConnected(SocketKind::Private))
        ));
        assert!(matches!(
            session.unsubscribe("x", SocketKind::Markets).await,
            Err(StreamError::NotConnected(SocketKind::Markets))
        ));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn both_sockets_feed_one_queue_and_messages_is_single_use() {
        let (session, private, markets) = attached(StreamOptions::default());
        let mut inbound = session.messages().expect("first call");
        assert!(session.messages().is_none());

        private
            .inbound
            .send(Ok(Message::Text(
                r#"{"accountBalancesSnapshot":{"balances":[]}}"#.to_string(),
            )))
            .unwrap();
        markets
            .inbound
            .send(Ok(Message::Text(r#"{"heartbeat":{}}"#.to_string())))
            .unwrap();
        markets
            .inbound
            .send(Ok(Message::Text(r#"{"marketDataLite":{"marketSlug":"m"}}"#.to_string())))
            .unwrap();

        let mut names = HashSet::new();
        for _ in 0..2 {
            let message = tokio::time::timeout(WAIT, inbound.recv())
                .await
                .expect("message in time")
                .expect("open queue");
            names.insert(message.payload.name());
        }
        assert_eq!(
            names,
            HashSet::from(["accountBalancesSnapshot", "marketDataLite"])
        );
        assert!(!matches!(
            inbound.try_recv(),
            Ok(InboundMessage {
                payload: InboundPayload::Heartbeat,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn close_stops_readers_and_is_idempotent() {
        let (session, mut private, mut markets) = attached(StreamOptions::default());
        let mut status = session.take_status().expect("status");
        let mut inbound = session.messages().expect("messages");
        assert!(session.is_connected());

        session.close().await.expect("close");
        assert_eq!(session.state(), SessionState::Closed);

        for peer in [&mut private, &mut markets] {
            assert!(matches!(
                peer.outbound.recv().await,
                Some(Message::Close(Some(_)))
            ));
        }
        let mut exits = Vec::new();
        for _ in 0..2 {
            exits.push(tokio::time::timeout(WAIT, status.recv()).await.expect("status").expect("open"));
        }
        assert!(exits.iter().all(|status| status.exit == ReaderExit::Cancelled));
        assert!(tokio::time::timeout(WAIT, inbound.recv()).await.expect("drained").is_none());

        session.close().await.expect("second close is a no-op");
        assert!(matches!(
            session.connect().await,
            Err(StreamError::InvalidState {
                state: SessionState::Closed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn close_reports_failures_and_still_closes_the_other_socket() {
        let session = session_with(StreamOptions::default());
        let ((private_writer, private_reader), _private_inbound) =
            failing_socket(SocketKind::Private);
        let ((markets_writer, markets_reader), mut markets) = mock_socket(SocketKind::Markets);
        session
            .attach(
                (Arc::new(private_writer), private_reader),
                (Arc::new(markets_writer), markets_reader),
            )
            .expect("attach");
        let mut status = session.take_status().expect("status");

        match session.close().await {
            Err(StreamError::Close(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].socket, SocketKind::Private);
            }
            other => panic!("unexpected close result: {other:?}"),
        }
        assert!(matches!(
            markets.outbound.recv().await,
            Some(Message::Close(Some(_)))
        ));
        for _ in 0..2 {
            tokio::time::timeout(WAIT, status.recv())
                .await
                .expect("reader ended")
                .expect("open");
        }
    }

    #[tokio::test]
    async fn closing_an_unconnected_session_closes_the_queue() {
        let session = session_with(StreamOptions::default());
        let mut inbound = session.messages().expect("messages");
        session.close().await.expect("close");
        assert_eq!(session.state(), SessionState::Closed);
        assert!(inbound.recv().await.is_none());
    }

    #[tokio::test]
    async fn failed_private_connect_leaves_session_unconnected() {
        let session =
            session_with(StreamOptions::default().with_handshake_timeout(Duration::from_secs(2)));
        match session.connect().await {
            Err(StreamError::Connect { socket, .. }) => assert_eq!(socket, SocketKind::Private),
            other => panic!("unexpected connect result: {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Unconnected);
    }

    #[tokio::test]
    async fn connect_twice_is_rejected() {
        let (session, _private, _markets) = attached(StreamOptions::default());
        assert!(matches!(
            session.connect().await,
            Err(StreamError::InvalidState {
                state: SessionState::Connected,
                ..
            })
        ));
    }
}

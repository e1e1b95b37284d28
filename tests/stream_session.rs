use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use polymarket_retail_sdk::auth::{Signer, SigningKey, WS_MARKETS_PATH, WS_PRIVATE_PATH};
use polymarket_retail_sdk::stream::{
    ConnectError, InboundPayload, SessionState, SocketKind, StreamEndpoints, StreamError,
    StreamOptions, StreamSession,
};
use ring::signature::{UnparsedPublicKey, ED25519};
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

const TEST_API_KEY: &str = "test-api-key";
const TEST_SEED: [u8; 32] = [7; 32];
const TEST_SLUG: &str = "nba-lal-bos-2025-01-01";

#[derive(Debug, PartialEq)]
enum Observed {
    Frame { socket: SocketKind, frame: Value },
    Ended(SocketKind),
}

#[derive(Clone)]
struct WsState {
    public_key: Arc<Vec<u8>>,
    observed_tx: mpsc::UnboundedSender<Observed>,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn session_routes_subscriptions_and_merges_both_sockets() {
    let (state, mut observed_rx) = ws_state();
    let (addr, shutdown_tx, server_task) = spawn_server(ws_router(state)).await;

    let session = session_for(endpoints(addr, addr), TEST_API_KEY);
    session.connect().await.expect("connect to mock stream server");
    assert_eq!(session.state(), SessionState::Connected);
    let mut messages = session.messages().expect("first messages() call");
    assert!(session.messages().is_none());

    let order_id = session
        .subscribe_orders(&[TEST_SLUG.to_string()])
        .await
        .expect("subscribe orders");
    let market_id = session
        .subscribe_market_data(&[TEST_SLUG.to_string()], true)
        .await
        .expect("subscribe market data");
    assert_ne!(order_id, market_id);

    let mut seen_order = false;
    let mut seen_market = false;
    while !(seen_order && seen_market) {
        let message = timeout(Duration::from_secs(2), messages.recv())
            .await
            .expect("timed out waiting for stream message")
            .expect("inbound queue open");
        match message.payload {
            InboundPayload::OrderUpdate(update) => {
                assert_eq!(message.request_id.as_deref(), Some(order_id.as_str()));
                let execution = update.execution.expect("execution");
                assert_eq!(execution.id, "exec-1");
                seen_order = true;
            }
            InboundPayload::MarketData(update) => {
                assert_eq!(message.request_id.as_deref(), Some(market_id.as_str()));
                assert_eq!(update.market_slug, TEST_SLUG);
                let bid = update.best_bid().and_then(|level| level.px.as_ref());
                assert_eq!(bid.map(|px| px.value.as_str()), Some("0.45"));
                seen_market = true;
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    let first = recv_observed(&mut observed_rx).await;
    let second = recv_observed(&mut observed_rx).await;
    let mut frames = [first, second]
        .into_iter()
        .map(|observed| match observed {
            Observed::Frame { socket, frame } => (socket, frame),
            other => panic!("unexpected observation: {other:?}"),
        })
        .collect::<Vec<_>>();
    frames.sort_by_key(|(socket, _)| socket.as_str());
    assert_eq!(
        frames,
        vec![
            (
                SocketKind::Markets,
                json!({"subscribe": {
                    "request_id": market_id,
                    "subscription_type": 1,
                    "market_slugs": [TEST_SLUG],
                    "responses_debounced": true,
                }})
            ),
            (
                SocketKind::Private,
                json!({"subscribe": {
                    "request_id": order_id,
                    "subscription_type": 1,
                    "market_slugs": [TEST_SLUG],
                }})
            ),
        ]
    );

    session.close().await.expect("close session");
    assert_eq!(session.state(), SessionState::Closed);
    let ended = timeout(Duration::from_secs(2), messages.recv())
        .await
        .expect("inbound queue drains after close");
    assert!(ended.is_none());

    let stats = session.stats();
    assert_eq!(stats.heartbeats, 2);
    assert_eq!(stats.delivered, 2);

    let _ = shutdown_tx.send(());
    server_task.await.expect("mock ws server task should join");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn markets_failure_closes_private_socket_and_resets_state() {
    let (state, mut observed_rx) = ws_state();
    let (addr, shutdown_tx, server_task) = spawn_server(ws_router(state)).await;
    let dead = unused_addr().await;

    let session = session_for(endpoints(addr, dead), TEST_API_KEY);
    let err = session.connect().await.expect_err("markets socket is unreachable");
    assert!(matches!(
        err,
        StreamError::Connect {
            socket: SocketKind::Markets,
            source: ConnectError::WebSocket(_),
        }
    ));
    assert_eq!(session.state(), SessionState::Unconnected);
    assert!(!session.is_connected());

    assert_eq!(
        recv_observed(&mut observed_rx).await,
        Observed::Ended(SocketKind::Private)
    );

    let _ = shutdown_tx.send(());
    server_task.await.expect("mock ws server task should join");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_handshake_surfaces_as_private_connect_error() {
    let (state, _observed_rx) = ws_state();
    let (addr, shutdown_tx, server_task) = spawn_server(ws_router(state)).await;

    let session = session_for(endpoints(addr, addr), "wrong-key");
    let err = session.connect().await.expect_err("server rejects the api key");
    assert_eq!(err.socket(), Some(SocketKind::Private));
    assert_eq!(session.state(), SessionState::Unconnected);

    let _ = shutdown_tx.send(());
    server_task.await.expect("mock ws server task should join");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_twice_and_subscribe_after_close() {
    let (state, _observed_rx) = ws_state();
    let (addr, shutdown_tx, server_task) = spawn_server(ws_router(state)).await;

    let session = session_for(endpoints(addr, addr), TEST_API_KEY);
    session.connect().await.expect("connect to mock stream server");
    session.close().await.expect("first close");
    session.close().await.expect("second close is a no-op");

    let err = session
        .subscribe_trades(&[TEST_SLUG.to_string()])
        .await
        .expect_err("no socket after close");
    assert!(matches!(err, StreamError::NotConnected(SocketKind::Markets)));
    assert!(matches!(
        session.connect().await,
        Err(StreamError::InvalidState { .. })
    ));

    let _ = shutdown_tx.send(());
    server_task.await.expect("mock ws server task should join");
}

fn ws_state() -> (WsState, mpsc::UnboundedReceiver<Observed>) {
    let key = SigningKey::from_bytes(&TEST_SEED).expect("test seed");
    let (observed_tx, observed_rx) = mpsc::unbounded_channel();
    let state = WsState {
        public_key: Arc::new(key.public_key().to_vec()),
        observed_tx,
    };
    (state, observed_rx)
}

fn ws_router(state: WsState) -> Router {
    Router::new()
        .route(WS_PRIVATE_PATH, get(private_ws_handler))
        .route(WS_MARKETS_PATH, get(markets_ws_handler))
        .with_state(state)
}

fn session_for(endpoints: StreamEndpoints, api_key: &str) -> StreamSession {
    let key = SigningKey::from_bytes(&TEST_SEED).expect("test seed");
    let signer = Signer::new(SecretString::new(api_key.to_string()), Arc::new(key));
    let options = StreamOptions::default()
        .with_handshake_timeout(Duration::from_secs(2))
        .with_shutdown_grace(Duration::from_secs(1));
    StreamSession::new(endpoints, signer, options)
}

fn endpoints(private: SocketAddr, markets: SocketAddr) -> StreamEndpoints {
    StreamEndpoints::new(
        format!("ws://{private}{WS_PRIVATE_PATH}"),
        format!("ws://{markets}{WS_MARKETS_PATH}"),
    )
}

async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    listener.local_addr().expect("read throwaway address")
}

async fn recv_observed(observed_rx: &mut mpsc::UnboundedReceiver<Observed>) -> Observed {
    timeout(Duration::from_secs(2), observed_rx.recv())
        .await
        .expect("timed out waiting for ws server observation")
        .expect("observation channel closed")
}

async fn private_ws_handler(
    State(state): State<WsState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade(state, headers, ws, SocketKind::Private)
}

async fn markets_ws_handler(
    State(state): State<WsState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade(state, headers, ws, SocketKind::Markets)
}

fn upgrade(
    state: WsState,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
    socket_kind: SocketKind,
) -> axum::response::Response {
    if let Err(reason) = verify_handshake(&state, &headers, socket_kind.auth_path()) {
        return (StatusCode::UNAUTHORIZED, reason).into_response();
    }
    ws.on_upgrade(move |socket| run_ws_protocol(socket, socket_kind, state.observed_tx))
        .into_response()
}

fn verify_handshake(state: &WsState, headers: &HeaderMap, path: &str) -> Result<(), String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| format!("missing {name}"))
    };
    let api_key = header("x-api-key")?;
    if api_key != TEST_API_KEY {
        return Err("unknown api key".to_string());
    }
    let timestamp = header("x-api-timestamp")?;
    let public_key = UnparsedPublicKey::new(&ED25519, state.public_key.as_slice());

    let signature = BASE64_STANDARD
        .decode(header("x-api-signature")?)
        .map_err(|err| err.to_string())?;
    public_key
        .verify(format!("{timestamp}GET{path}").as_bytes(), &signature)
        .map_err(|_| "bad signature".to_string())?;

    let passphrase = BASE64_STANDARD
        .decode(header("x-api-passphrase")?)
        .map_err(|err| err.to_string())?;
    public_key
        .verify(api_key.as_bytes(), &passphrase)
        .map_err(|_| "bad passphrase".to_string())
}

async fn run_ws_protocol(
    mut socket: WebSocket,
    socket_kind: SocketKind,
    observed_tx: mpsc::UnboundedSender<Observed>,
) {
    while let Some(Ok(message)) = socket.recv().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(frame) = serde_json::from_str::<Value>(&text) else {
            break;
        };
        let request_id = frame
            .pointer("/subscribe/request_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let _ = observed_tx.send(Observed::Frame {
            socket: socket_kind,
            frame,
        });
        let Some(request_id) = request_id else {
            continue;
        };

        let reply = match socket_kind {
            SocketKind::Private => json!({
                "requestId": request_id,
                "subscriptionType": "SUBSCRIPTION_TYPE_ORDER",
                "orderSubscriptionUpdate": {
                    "execution": {"id": "exec-1", "type": "EXECUTION_TYPE_FILL"}
                }
            }),
            SocketKind::Markets => json!({
                "requestId": request_id,
                "subscriptionType": 1,
                "marketData": {
                    "marketSlug": TEST_SLUG,
                    "bids": [{"px": {"value": "0.45", "currency": "USD"}, "qty": "100"}],
                    "offers": [{"px": {"value": "0.55", "currency": "USD"}, "qty": "80"}]
                }
            }),
        };
        for payload in [json!({"heartbeat": {}}), reply] {
            if socket.send(Message::Text(payload.to_string())).await.is_err() {
                break;
            }
        }
    }
    let _ = observed_tx.send(Observed::Ended(socket_kind));
}

async fn spawn_server(
    app: Router,
) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server listener");
    let addr = listener
        .local_addr()
        .expect("read mock server listener address");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("mock server should run");
    });
    (addr, shutdown_tx, task)
}

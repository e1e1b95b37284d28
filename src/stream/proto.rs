use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::auth::{WS_MARKETS_PATH, WS_PRIVATE_PATH};
use crate::models::{
    BalanceSnapshot, BalanceUpdate, MarketDataLiteUpdate, MarketDataUpdate, OrderSnapshot,
    OrderUpdate, PositionUpdate, TradeUpdate,
};

/// Which of the two stream connections a frame belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// Account stream: orders, positions, balances.
    Private,
    /// Public market stream: books, prices, trades.
    Markets,
}

impl SocketKind {
    pub const BOTH: [SocketKind; 2] = [SocketKind::Private, SocketKind::Markets];

    /// Endpoint path, which is also the path covered by the handshake signature.
    pub fn auth_path(self) -> &'static str {
        match self {
            Self::Private => WS_PRIVATE_PATH,
            Self::Markets => WS_MARKETS_PATH,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Markets => "markets",
        }
    }
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    Order,
    OrderSnapshot,
    Position,
    AccountBalance,
    MarketData,
    MarketDataLite,
    Trade,
}

impl SubscriptionKind {
    pub const ALL: [SubscriptionKind; 7] = [
        SubscriptionKind::Order,
        SubscriptionKind::OrderSnapshot,
        SubscriptionKind::Position,
        SubscriptionKind::AccountBalance,
        SubscriptionKind::MarketData,
        SubscriptionKind::MarketDataLite,
        SubscriptionKind::Trade,
    ];

    pub fn socket(self) -> SocketKind {
        match self {
            Self::Order | Self::OrderSnapshot | Self::Position | Self::AccountBalance => {
                SocketKind::Private
            }
            Self::MarketData | Self::MarketDataLite | Self::Trade => SocketKind::Markets,
        }
    }

    /// Integer `subscription_type`. Codes are scoped per socket, so the same
    /// number means different things on the two connections.
    pub fn wire_code(self) -> u8 {
        match self {
            Self::Order => 1,
            Self::OrderSnapshot => 2,
            Self::Position => 3,
            Self::AccountBalance => 4,
            Self::MarketData => 1,
            Self::MarketDataLite => 2,
            Self::Trade => 3,
        }
    }

    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::OrderSnapshot => "ordersnapshot",
            Self::Position => "position",
            Self::AccountBalance => "balance",
            Self::MarketData => "marketdata",
            Self::MarketDataLite => "marketdatalite",
            Self::Trade => "trade",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub request_id: String,
    pub subscription_type: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub market_slugs: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub responses_debounced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unsubscription {
    pub request_id: String,
}

/// Outbound control frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe(Subscription),
    Unsubscribe(Unsubscription),
}

impl ClientFrame {
    pub fn unsubscribe(request_id: impl Into<String>) -> Self {
        Self::Unsubscribe(Unsubscription {
            request_id: request_id.into(),
        })
    }

    pub fn request_id(&self) -> &str {
        match self {
            Self::Subscribe(sub) => &sub.request_id,
            Self::Unsubscribe(unsub) => &unsub.request_id,
        }
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A subscription to send, before a request id has been settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub kind: SubscriptionKind,
    /// Caller-chosen id. The session allocates one when unset.
    pub request_id: Option<String>,
    pub market_slugs: Vec<String>,
    pub debounced: bool,
}

impl SubscriptionRequest {
    pub fn new(kind: SubscriptionKind) -> Self {
        Self {
            kind,
            request_id: None,
            market_slugs: Vec::new(),
            debounced: false,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_market_slugs<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.market_slugs = slugs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_debounced(mut self, debounced: bool) -> Self {
        self.debounced = debounced;
        self
    }

    pub fn into_frame(self, request_id: String) -> ClientFrame {
        ClientFrame::Subscribe(Subscription {
            request_id,
            subscription_type: self.kind.wire_code(),
            market_slugs: self.market_slugs,
            responses_debounced: self.debounced,
        })
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid json frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame carries no known payload")]
    NoPayload,

    #[error("frame carries several payloads: {}", .0.join(", "))]
    Ambiguous(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    Heartbeat,
    Error(String),
    /// Bare acknowledgement: a request id and no payload.
    Ack,
    OrderSnapshot(OrderSnapshot),
    OrderUpdate(OrderUpdate),
    PositionUpdate(PositionUpdate),
    BalanceSnapshot(BalanceSnapshot),
    BalanceUpdate(BalanceUpdate),
    MarketData(MarketDataUpdate),
    MarketDataLite(MarketDataLiteUpdate),
    Trade(TradeUpdate),
}

impl InboundPayload {
    /// Wire key the payload arrived under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Heartbeat => "heartbeat",
            Self::Error(_) => "error",
            Self::Ack => "ack",
            Self::OrderSnapshot(_) => "orderSubscriptionSnapshot",
            Self::OrderUpdate(_) => "orderSubscriptionUpdate",
            Self::PositionUpdate(_) => "positionSubscription",
            Self::BalanceSnapshot(_) => "accountBalancesSnapshot",
            Self::BalanceUpdate(_) => "accountBalancesUpdate",
            Self::MarketData(_) => "marketData",
            Self::MarketDataLite(_) => "marketDataLite",
            Self::Trade(_) => "trade",
        }
    }
}

/// One decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub request_id: Option<String>,
    pub subscription_type: Option<String>,
    pub payload: InboundPayload,
}

impl InboundMessage {
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        Self::from_raw(serde_json::from_str(text)?)
    }

    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::from_raw(serde_json::from_slice(bytes)?)
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self.payload, InboundPayload::Heartbeat)
    }

    fn from_raw(raw: RawFrame) -> Result<Self, DecodeError> {
        let request_id = raw.request_id.filter(|id| !id.is_empty());
        let subscription_type = raw.subscription_type.and_then(render_subscription_type);

        // An error wins over anything else the frame carries.
        if let Some(error) = raw.error.filter(|error| !error.is_empty()) {
            return Ok(Self {
                request_id,
                subscription_type,
                payload: InboundPayload::Error(error),
            });
        }

        let mut payloads = Vec::with_capacity(1);
        if raw.heartbeat.is_some() {
            payloads.push(InboundPayload::Heartbeat);
        }
        payloads.extend(raw.order_subscription_snapshot.map(InboundPayload::OrderSnapshot));
        payloads.extend(raw.order_subscription_update.map(InboundPayload::OrderUpdate));
        payloads.extend(raw.position_subscription.map(InboundPayload::PositionUpdate));
        payloads.extend(raw.account_balances_snapshot.map(InboundPayload::BalanceSnapshot));
        payloads.extend(raw.account_balances_update.map(InboundPayload::BalanceUpdate));
        payloads.extend(raw.market_data.map(InboundPayload::MarketData));
        payloads.extend(raw.market_data_lite.map(InboundPayload::MarketDataLite));
        payloads.extend(raw.trade.map(InboundPayload::Trade));

        if payloads.len() > 1 {
            return Err(DecodeError::Ambiguous(
                payloads.iter().map(InboundPayload::name).collect(),
            ));
        }
        let payload = match payloads.pop() {
            Some(payload) => payload,
            None if request_id.is_some() => InboundPayload::Ack,
            None => return Err(DecodeError::NoPayload),
        };

        Ok(Self {
            request_id,
            subscription_type,
            payload,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawFrame {
    request_id: Option<String>,
    subscription_type: Option<Value>,
    error: Option<String>,
    heartbeat: Option<Value>,
    order_subscription_snapshot: Option<OrderSnapshot>,
    order_subscription_update: Option<OrderUpdate>,
    position_subscription: Option<PositionUpdate>,
    account_balances_snapshot: Option<BalanceSnapshot>,
    account_balances_update: Option<BalanceUpdate>,
    market_data: Option<MarketDataUpdate>,
    market_data_lite: Option<MarketDataLiteUpdate>,
    trade: Option<TradeUpdate>,
}

// The server has sent both string and numeric forms.
fn render_subscription_type(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

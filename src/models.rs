//! REST and stream payload types for the Retail API.
//!
//! Responses spell enums as upper-snake strings (`ORDER_SIDE_BUY`); order
//! requests use small integers instead. The two families are kept as separate
//! types so neither wire form can leak into the other.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Monetary amount as a decimal string plus currency code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amount {
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(deserialize_with = "null_as_default")]
    pub currency: String,
}

impl Amount {
    pub fn usd(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            currency: "USD".to_string(),
        }
    }
}

/// Reads an explicit `null` as the field's default, the same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "ORDER_TYPE_LIMIT")]
    Limit,
    #[serde(rename = "ORDER_TYPE_MARKET")]
    Market,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    #[serde(rename = "ORDER_SIDE_BUY")]
    Buy,
    #[serde(rename = "ORDER_SIDE_SELL")]
    Sell,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Position direction of an order as reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderIntent {
    #[serde(rename = "ORDER_INTENT_BUY_LONG")]
    BuyLong,
    #[serde(rename = "ORDER_INTENT_SELL_LONG")]
    SellLong,
    #[serde(rename = "ORDER_INTENT_BUY_SHORT")]
    BuyShort,
    #[serde(rename = "ORDER_INTENT_SELL_SHORT")]
    SellShort,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    #[serde(rename = "TIME_IN_FORCE_GOOD_TILL_CANCEL")]
    GoodTillCancel,
    #[serde(rename = "TIME_IN_FORCE_GOOD_TILL_DATE")]
    GoodTillDate,
    #[serde(rename = "TIME_IN_FORCE_IMMEDIATE_OR_CANCEL")]
    ImmediateOrCancel,
    #[serde(rename = "TIME_IN_FORCE_FILL_OR_KILL")]
    FillOrKill,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    #[serde(rename = "ORDER_STATE_PENDING_NEW")]
    PendingNew,
    #[serde(rename = "ORDER_STATE_PARTIALLY_FILLED")]
    PartiallyFilled,
    #[serde(rename = "ORDER_STATE_FILLED")]
    Filled,
    #[serde(rename = "ORDER_STATE_CANCELED")]
    Canceled,
    #[serde(rename = "ORDER_STATE_REJECTED")]
    Rejected,
    #[serde(rename = "ORDER_STATE_EXPIRED")]
    Expired,
    #[serde(rename = "ORDER_STATE_PENDING_CANCEL")]
    PendingCancel,
    #[serde(rename = "ORDER_STATE_PENDING_REPLACE")]
    PendingReplace,
    #[serde(rename = "ORDER_STATE_PENDING_RISK")]
    PendingRisk,
    #[serde(rename = "ORDER_STATE_REPLACED")]
    Replaced,
    #[default]
    #[serde(other)]
    Unknown,
}

impl OrderState {
    /// True once the order can no longer trade.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Rejected | Self::Expired | Self::Replaced
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionType {
    #[serde(rename = "EXECUTION_TYPE_PARTIAL_FILL")]
    PartialFill,
    #[serde(rename = "EXECUTION_TYPE_FILL")]
    Fill,
    #[serde(rename = "EXECUTION_TYPE_CANCELED")]
    Canceled,
    #[serde(rename = "EXECUTION_TYPE_REJECTED")]
    Rejected,
    #[serde(rename = "EXECUTION_TYPE_EXPIRED")]
    Expired,
    #[serde(rename = "EXECUTION_TYPE_REPLACE")]
    Replace,
    #[serde(rename = "EXECUTION_TYPE_DONE_FOR_DAY")]
    DoneForDay,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Error for an integer request code outside its known range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} code {code}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: u8,
}

/// Order type as sent in requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OrderTypeCode {
    Limit,
    Market,
}

impl From<OrderTypeCode> for u8 {
    fn from(code: OrderTypeCode) -> Self {
        match code {
            OrderTypeCode::Limit => 1,
            OrderTypeCode::Market => 2,
        }
    }
}

impl TryFrom<u8> for OrderTypeCode {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Limit),
            2 => Ok(Self::Market),
            code => Err(UnknownCode {
                kind: "order type",
                code,
            }),
        }
    }
}

/// Order intent as sent in requests: which outcome and which direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OrderIntentCode {
    BuyYes,
    SellYes,
    BuyNo,
    SellNo,
}

impl From<OrderIntentCode> for u8 {
    fn from(code: OrderIntentCode) -> Self {
        match code {
            OrderIntentCode::BuyYes => 1,
            OrderIntentCode::SellYes => 2,
            OrderIntentCode::BuyNo => 3,
            OrderIntentCode::SellNo => 4,
        }
    }
}

impl TryFrom<u8> for OrderIntentCode {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::BuyYes),
            2 => Ok(Self::SellYes),
            3 => Ok(Self::BuyNo),
            4 => Ok(Self::SellNo),
            code => Err(UnknownCode {
                kind: "order intent",
                code,
            }),
        }
    }
}

/// Time in force as sent in requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TimeInForceCode {
    GoodTillCancel,
    GoodTillDate,
    ImmediateOrCancel,
    FillOrKill,
}

impl From<TimeInForceCode> for u8 {
    fn from(code: TimeInForceCode) -> Self {
        match code {
            TimeInForceCode::GoodTillCancel => 1,
            TimeInForceCode::GoodTillDate => 2,
            TimeInForceCode::ImmediateOrCancel => 3,
            TimeInForceCode::FillOrKill => 4,
        }
    }
}

impl TryFrom<u8> for TimeInForceCode {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::GoodTillCancel),
            2 => Ok(Self::GoodTillDate),
            3 => Ok(Self::ImmediateOrCancel),
            4 => Ok(Self::FillOrKill),
            code => Err(UnknownCode {
                kind: "time in force",
                code,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketMetadata {
    #[serde(deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub market_slug: String,
    #[serde(deserialize_with = "null_as_default")]
    pub side: OrderSide,
    #[serde(rename = "type")]
    #[serde(deserialize_with = "null_as_default")]
    pub order_type: OrderType,
    pub price: Option<Amount>,
    #[serde(deserialize_with = "null_as_default")]
    pub quantity: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cum_quantity: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub leaves_quantity: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub tif: TimeInForce,
    pub good_till_time: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub intent: OrderIntent,
    pub market_metadata: Option<MarketMetadata>,
    #[serde(deserialize_with = "null_as_default")]
    pub state: OrderState,
    pub avg_px: Option<Amount>,
    pub insert_time: Option<String>,
    pub create_time: Option<String>,
}

/// Body of `POST /v1/orders` and the inner request of a preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub market_slug: String,
    #[serde(rename = "type")]
    pub order_type: OrderTypeCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    pub tif: TimeInForceCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub good_till_time: Option<String>,
    pub intent: OrderIntentCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_order_qty: Option<Amount>,
    /// Post-only.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub participate_dont_initiate: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synchronous_execution: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_block_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_order_indicator: Option<String>,
}

impl CreateOrderRequest {
    /// Good-till-cancel limit order for `quantity` shares at `price` (USD).
    pub fn limit(
        market_slug: impl Into<String>,
        intent: OrderIntentCode,
        price: impl Into<String>,
        quantity: f64,
    ) -> Self {
        Self {
            market_slug: market_slug.into(),
            order_type: OrderTypeCode::Limit,
            price: Some(Amount::usd(price)),
            quantity: Some(quantity),
            tif: TimeInForceCode::GoodTillCancel,
            good_till_time: None,
            intent,
            cash_order_qty: None,
            participate_dont_initiate: false,
            synchronous_execution: false,
            max_block_time: None,
            manual_order_indicator: None,
        }
    }

    pub fn with_time_in_force(mut self, tif: TimeInForceCode) -> Self {
        self.tif = tif;
        self
    }

    pub fn with_good_till_time(mut self, good_till_time: impl Into<String>) -> Self {
        self.good_till_time = Some(good_till_time.into());
        self
    }

    pub fn with_post_only(mut self, post_only: bool) -> Self {
        self.participate_dont_initiate = post_only;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Execution {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    pub order: Option<Order>,
    pub last_shares: Option<String>,
    pub last_px: Option<Amount>,
    #[serde(rename = "type")]
    #[serde(deserialize_with = "null_as_default")]
    pub execution_type: ExecutionType,
    pub text: Option<String>,
    pub order_reject_reason: Option<String>,
    pub transact_time: Option<String>,
    pub trade_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub aggressor: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOrderResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub executions: Vec<Execution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOpenOrdersResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOrderResponse {
    pub order: Option<Order>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub market_slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOpenOrdersRequest {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub slugs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CancelOpenOrdersResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub canceled_order_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewOrderRequest {
    pub request: CreateOrderRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewOrderResponse {
    pub order: Option<Order>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Balance {
    #[serde(deserialize_with = "null_as_default")]
    pub current_balance: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(deserialize_with = "null_as_default")]
    pub buying_power: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub asset_notional: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub asset_available: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub pending_credit: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub open_orders: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub unsettled_funds: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub margin_requirement: f64,
    pub last_updated: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub pending_withdrawals: Vec<PendingWithdrawal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingWithdrawal {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub balance: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub creation_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetBalancesResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub balances: Vec<Balance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPosition {
    #[serde(deserialize_with = "null_as_default")]
    pub net_position: String,
    pub qty_bought: Option<String>,
    pub qty_sold: Option<String>,
    pub cost: Option<Amount>,
    pub realized: Option<Amount>,
    pub bod_position: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub expired: bool,
    pub update_time: Option<String>,
    pub cash_value: Option<Amount>,
    pub qty_available: Option<String>,
    pub market_metadata: Option<MarketMetadata>,
}

/// Positions keyed by market slug.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetPositionsResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub positions: BTreeMap<String, UserPosition>,
    pub next_cursor: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub eof: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub available_positions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Activity {
    #[serde(rename = "type")]
    #[serde(deserialize_with = "null_as_default")]
    pub activity_type: String,
    pub trade: Option<Trade>,
    pub position_resolution: Option<PositionResolution>,
    pub account_balance_change: Option<AccountBalanceChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Trade {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub market_slug: String,
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub create_time: String,
    pub update_time: Option<String>,
    pub price: Option<Amount>,
    #[serde(deserialize_with = "null_as_default")]
    pub qty: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_aggressor: bool,
    pub cost_basis: Option<Amount>,
    pub realized_pnl: Option<Amount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionResolution {
    #[serde(deserialize_with = "null_as_default")]
    pub market_slug: String,
    pub before_position: Option<UserPosition>,
    pub after_position: Option<UserPosition>,
    pub update_time: Option<String>,
    pub trade_id: Option<String>,
    pub side: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountBalanceChange {
    #[serde(deserialize_with = "null_as_default")]
    pub transaction_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    pub amount: Option<Amount>,
    pub update_time: Option<String>,
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetActivitiesResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub activities: Vec<Activity>,
    pub next_cursor: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub eof: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Market {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(deserialize_with = "null_as_default")]
    pub question: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub active: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub closed: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub archived: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub last_trade_price: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub best_bid: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub best_ask: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub spread: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub one_day_price_change: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub one_week_price_change: f64,
    pub liquidity: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub liquidity_num: f64,
    pub volume: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub volume_num: f64,
    pub volume_24hr: f64,
    pub volume_1wk: f64,
    pub volume_1mo: f64,
    // Sports markets only.
    #[serde(rename = "sportsMarketTypeV2")]
    pub sports_market_type_v2: Option<String>,
    pub game_id: Option<String>,
    pub line: Option<f64>,
    pub prop_type: Option<String>,
    pub outcome_team_a: Option<i64>,
    pub outcome_team_b: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetMarketsResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub markets: Vec<Market>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettlement {
    #[serde(deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(deserialize_with = "null_as_default")]
    pub settlement: f64,
}

// Stream payloads.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSnapshot {
    #[serde(deserialize_with = "null_as_default")]
    pub orders: Vec<Order>,
    #[serde(deserialize_with = "null_as_default")]
    pub eof: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderUpdate {
    pub execution: Option<Execution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionUpdate {
    pub before_position: Option<UserPosition>,
    pub after_position: Option<UserPosition>,
    pub update_time: Option<String>,
    pub entry_type: Option<String>,
    pub trade_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceSnapshot {
    #[serde(deserialize_with = "null_as_default")]
    pub balances: Vec<Balance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalanceUpdate {
    pub balance_change: Option<BalanceChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalanceChange {
    pub before_balance: Option<Balance>,
    pub after_balance: Option<Balance>,
    pub description: Option<String>,
    pub update_time: Option<String>,
    pub entry_type: Option<String>,
}

/// One order book level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceLevel {
    pub px: Option<Amount>,
    #[serde(deserialize_with = "null_as_default")]
    pub qty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketStats {
    pub last_trade_px: Option<Amount>,
    pub shares_traded: Option<String>,
    pub open_interest: Option<String>,
    pub high_px: Option<Amount>,
    pub low_px: Option<Amount>,
}

/// Full book plus stats for one market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketDataUpdate {
    #[serde(deserialize_with = "null_as_default")]
    pub market_slug: String,
    #[serde(deserialize_with = "null_as_default")]
    pub bids: Vec<PriceLevel>,
    #[serde(deserialize_with = "null_as_default")]
    pub offers: Vec<PriceLevel>,
    pub state: Option<String>,
    pub stats: Option<MarketStats>,
    pub transact_time: Option<String>,
}

impl MarketDataUpdate {
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_offer(&self) -> Option<&PriceLevel> {
        self.offers.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketDataLiteUpdate {
    #[serde(deserialize_with = "null_as_default")]
    pub market_slug: String,
    pub current_px: Option<Amount>,
    pub last_trade_px: Option<Amount>,
    pub best_bid: Option<Amount>,
    pub best_ask: Option<Amount>,
    #[serde(deserialize_with = "null_as_default")]
    pub bid_depth: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub ask_depth: i64,
    pub shares_traded: Option<String>,
    pub open_interest: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradeUpdate {
    #[serde(deserialize_with = "null_as_default")]
    pub market_slug: String,
    pub price: Option<Amount>,
    pub quantity: Option<Amount>,
    #[serde(deserialize_with = "null_as_default")]
    pub trade_time: String,
    pub maker: Option<TradeSide>,
    pub taker: Option<TradeSide>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeSide {
    #[serde(deserialize_with = "null_as_default")]
    pub side: OrderSide,
    #[serde(deserialize_with = "null_as_default")]
    pub intent: OrderIntent,
}

pub const MARKET_STATE_OPEN: &str = "MARKET_STATE_OPEN";
pub const MARKET_STATE_PREOPEN: &str = "MARKET_STATE_PREOPEN";
pub const MARKET_STATE_SUSPENDED: &str = "MARKET_STATE_SUSPENDED";
pub const MARKET_STATE_HALTED: &str = "MARKET_STATE_HALTED";
pub const MARKET_STATE_EXPIRED: &str = "MARKET_STATE_EXPIRED";
pub const MARKET_STATE_TERMINATED: &str = "MARKET_STATE_TERMINATED";

pub const LEDGER_ENTRY_ORDER_EXECUTION: &str = "LEDGER_ENTRY_TYPE_ORDER_EXECUTION";
pub const LEDGER_ENTRY_DEPOSIT: &str = "LEDGER_ENTRY_TYPE_DEPOSIT";
pub const LEDGER_ENTRY_WITHDRAWAL: &str = "LEDGER_ENTRY_TYPE_WITHDRAWAL";
pub const LEDGER_ENTRY_RESOLUTION: &str = "LEDGER_ENTRY_TYPE_RESOLUTION";
pub const LEDGER_ENTRY_COMMISSION: &str = "LEDGER_ENTRY_TYPE_COMMISSION";

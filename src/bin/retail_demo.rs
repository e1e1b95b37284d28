//! End-to-end walkthrough of the Retail API: REST reads, both streams, and
//! a resting order that is placed and then cancelled.
//!
//! Every step after configuration is best-effort: a failure is logged and
//! the walkthrough moves on.

use std::collections::VecDeque;
use std::error::Error;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use polymarket_retail_sdk::config::ClientConfig;
use polymarket_retail_sdk::models::{CreateOrderRequest, MarketDataUpdate, OrderIntentCode};
use polymarket_retail_sdk::rest::{ActivitiesQuery, PositionsQuery, RestClient};
use polymarket_retail_sdk::stream::{
    InboundMessage, InboundPayload, StreamOptions, StreamSession,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const RECENT_MARKET_DATA: usize = 10;
const CONFIRMATION_WAIT: Duration = Duration::from_secs(2);

type RecentUpdates = Arc<Mutex<VecDeque<MarketDataUpdate>>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Configuration
    if let Err(err) = dotenvy::dotenv() {
        info!(event = "demo_dotenv_skipped", error = %err);
    }
    let config = ClientConfig::from_env()?;
    info!(event = "demo_config_loaded", symbol = %config.symbol, base_url = %config.base_url);
    let slugs = vec![config.symbol.clone()];

    // 2. Clients
    let rest = RestClient::from_config(&config)?;
    let session = StreamSession::from_config(&config, StreamOptions::default());

    // 3-6. REST reads
    match rest.get_markets(Some(10), Some(true)).await {
        Ok(response) => {
            info!(event = "demo_markets", count = response.markets.len());
            for market in response.markets.iter().take(5) {
                info!(slug = %market.slug, question = %market.question, "market");
            }
        }
        Err(err) => warn!(event = "demo_step_failed", step = "list_markets", error = %err),
    }
    match rest.get_market_by_slug(&config.symbol).await {
        Ok(market) => info!(
            event = "demo_market",
            slug = %market.slug,
            best_bid = market.best_bid,
            best_ask = market.best_ask
        ),
        Err(err) => warn!(event = "demo_step_failed", step = "get_market", error = %err),
    }
    log_balances(&rest, "initial").await;
    match rest.get_positions(&PositionsQuery::default()).await {
        Ok(response) => {
            for (slug, position) in &response.positions {
                info!(slug = %slug, net = %position.net_position, "position");
            }
        }
        Err(err) => warn!(event = "demo_step_failed", step = "get_positions", error = %err),
    }

    // 7. Streams and consumer
    let shutdown = CancellationToken::new();
    let recent: RecentUpdates = Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_MARKET_DATA)));
    let consumer = match session.connect().await {
        Ok(()) => session.messages().map(|messages| {
            tokio::spawn(consume(messages, Arc::clone(&recent), shutdown.clone()))
        }),
        Err(err) => {
            warn!(event = "demo_step_failed", step = "stream_connect", error = %err);
            None
        }
    };
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(event = "demo_interrupted");
                shutdown.cancel();
            }
        }
    });

    // 8-9. Subscriptions
    if session.is_connected() {
        let subscriptions = [
            ("orders", session.subscribe_orders(&slugs).await),
            ("positions", session.subscribe_positions(&slugs).await),
            ("balances", session.subscribe_balances().await),
            ("market_data", session.subscribe_market_data(&slugs, true).await),
            ("trades", session.subscribe_trades(&slugs).await),
        ];
        for (name, result) in subscriptions {
            match result {
                Ok(request_id) => info!(event = "demo_subscribed", stream = name, request_id = %request_id),
                Err(err) => warn!(event = "demo_step_failed", step = name, error = %err),
            }
        }
    }

    // 10-11. Far-from-market order
    let request = CreateOrderRequest::limit(&config.symbol, OrderIntentCode::BuyYes, "0.01", 10.0);
    let order_id = match rest.create_order(&request).await {
        Ok(response) => {
            info!(event = "demo_order_placed", order_id = %response.id, executions = response.executions.len());
            Some(response.id)
        }
        Err(err) => {
            warn!(event = "demo_step_failed", step = "create_order", error = %err);
            None
        }
    };
    pause(&shutdown, CONFIRMATION_WAIT).await;

    // 12-15. Inspect and cancel
    if let Some(order_id) = order_id.as_deref() {
        match rest.get_order(order_id).await {
            Ok(response) => match response.order {
                Some(order) => info!(event = "demo_order", order_id, state = ?order.state),
                None => warn!(event = "demo_order_missing", order_id),
            },
            Err(err) => warn!(event = "demo_step_failed", step = "get_order", error = %err),
        }
    }
    match rest.get_open_orders(&slugs).await {
        Ok(response) => info!(event = "demo_open_orders", count = response.orders.len()),
        Err(err) => warn!(event = "demo_step_failed", step = "open_orders", error = %err),
    }
    if let Some(order_id) = order_id.as_deref() {
        match rest.cancel_order(order_id, &config.symbol).await {
            Ok(()) => info!(event = "demo_order_cancelled", order_id),
            Err(err) => warn!(event = "demo_step_failed", step = "cancel_order", error = %err),
        }
    }
    pause(&shutdown, CONFIRMATION_WAIT).await;

    // 16-18. Wrap-up reads
    log_balances(&rest, "final").await;
    let activities = ActivitiesQuery {
        limit: Some(10),
        ..ActivitiesQuery::default()
    };
    match rest.get_activities(&activities).await {
        Ok(response) => {
            for activity in &response.activities {
                info!(kind = %activity.activity_type, "activity");
            }
        }
        Err(err) => warn!(event = "demo_step_failed", step = "activities", error = %err),
    }
    summarize_market_data(&recent);

    // 19. Shutdown
    if let Err(err) = session.close().await {
        warn!(event = "demo_step_failed", step = "stream_close", error = %err);
    }
    shutdown.cancel();
    if let Some(consumer) = consumer {
        let _ = consumer.await;
    }
    let stats = session.stats();
    info!(
        event = "demo_done",
        delivered = stats.delivered,
        dropped = stats.dropped,
        heartbeats = stats.heartbeats
    );
    Ok(())
}

async fn consume(
    mut messages: mpsc::Receiver<InboundMessage>,
    recent: RecentUpdates,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = messages.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let request_id = message.request_id.as_deref().unwrap_or("-");
        match message.payload {
            InboundPayload::Error(error) => {
                warn!(event = "demo_stream_error", request_id, error = %error)
            }
            InboundPayload::MarketData(update) => {
                let mut recent = recent.lock().unwrap_or_else(PoisonError::into_inner);
                if recent.len() == RECENT_MARKET_DATA {
                    recent.pop_front();
                }
                recent.push_back(update);
            }
            InboundPayload::OrderUpdate(update) => {
                if let Some(execution) = update.execution {
                    info!(event = "demo_execution", request_id, kind = ?execution.execution_type);
                }
            }
            other => info!(event = "demo_stream_message", request_id, payload = other.name()),
        }
    }
}

async fn log_balances(rest: &RestClient, label: &'static str) {
    match rest.get_balances().await {
        Ok(response) => {
            for balance in &response.balances {
                info!(
                    event = "demo_balance",
                    label,
                    currency = %balance.currency,
                    current = balance.current_balance,
                    buying_power = balance.buying_power
                );
            }
        }
        Err(err) => warn!(event = "demo_step_failed", step = "balances", label, error = %err),
    }
}

fn summarize_market_data(recent: &RecentUpdates) {
    let recent = recent.lock().unwrap_or_else(PoisonError::into_inner);
    info!(event = "demo_market_data_summary", updates = recent.len());
    for update in recent.iter() {
        let px = |level: Option<&polymarket_retail_sdk::models::PriceLevel>| {
            level
                .and_then(|level| level.px.as_ref())
                .map(|amount| amount.value.clone())
                .unwrap_or_else(|| "-".to_string())
        };
        info!(
            slug = %update.market_slug,
            bid = %px(update.best_bid()),
            offer = %px(update.best_offer()),
            "market data"
        );
    }
}

async fn pause(shutdown: &CancellationToken, duration: Duration) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}

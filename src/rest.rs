use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::auth::{AuthError, Signer};
use crate::config::ClientConfig;
use crate::models::{
    CancelOpenOrdersRequest, CancelOpenOrdersResponse, CancelOrderRequest, CreateOrderRequest,
    CreateOrderResponse, GetActivitiesResponse, GetBalancesResponse, GetMarketsResponse,
    GetOpenOrdersResponse, GetOrderResponse, GetPositionsResponse, Market, MarketSettlement,
    PreviewOrderRequest, PreviewOrderResponse,
};
use crate::retry::{retry_async, RetryPolicy};

const ERROR_BODY_SNIPPET_LEN: usize = 220;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RestDefaults;

impl RestDefaults {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
}

#[derive(Clone, Debug)]
pub struct RestClientOptions {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Applied to GET requests only. POSTs are sent exactly once.
    pub read_retry: RetryPolicy,
    pub accept_invalid_certs: bool,
}

impl Default for RestClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: RestDefaults::REQUEST_TIMEOUT,
            connect_timeout: RestDefaults::CONNECT_TIMEOUT,
            read_retry: RetryPolicy::reads(),
            accept_invalid_certs: false,
        }
    }
}

/// Optional filters for [`RestClient::get_positions`].
#[derive(Clone, Debug, Default)]
pub struct PositionsQuery {
    pub market: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// Optional filters for [`RestClient::get_activities`].
#[derive(Clone, Debug, Default)]
pub struct ActivitiesQuery {
    pub market_slug: Option<String>,
    pub types: Vec<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub sort_order: Option<String>,
}

/// Signed client for the Retail REST API.
#[derive(Clone, Debug)]
pub struct RestClient {
    http: Client,
    base_url: Url,
    signer: Signer,
    read_retry: RetryPolicy,
}

impl RestClient {
    pub fn new(base_url: &str, signer: Signer) -> Result<Self, RestError> {
        Self::with_options(base_url, signer, RestClientOptions::default())
    }

    pub fn with_options(
        base_url: &str,
        signer: Signer,
        options: RestClientOptions,
    ) -> Result<Self, RestError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(RestError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        let http = Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(options.connect_timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .map_err(RestError::Transport)?;

        Ok(Self {
            http,
            base_url,
            signer,
            read_retry: options.read_retry,
        })
    }

    /// Client for `config.base_url`, honouring its TLS relaxation flag.
    pub fn from_config(config: &ClientConfig) -> Result<Self, RestError> {
        let options = RestClientOptions {
            accept_invalid_certs: config.insecure_skip_verify,
            ..RestClientOptions::default()
        };
        Self::with_options(&config.base_url, config.signer(), options)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // Markets

    pub async fn get_markets(
        &self,
        limit: Option<u32>,
        active: Option<bool>,
    ) -> Result<GetMarketsResponse, RestError> {
        let mut query = Vec::new();
        push_opt(&mut query, "limit", limit);
        push_opt(&mut query, "active", active);
        self.get(&["v1", "markets"], &query).await
    }

    pub async fn get_market_by_slug(&self, slug: &str) -> Result<Market, RestError> {
        self.get(&["v1", "market", "slug", slug], &[]).await
    }

    pub async fn get_market_settlement(&self, slug: &str) -> Result<MarketSettlement, RestError> {
        self.get(&["v1", "markets", slug, "settlement"], &[]).await
    }

    // Account

    pub async fn get_balances(&self) -> Result<GetBalancesResponse, RestError> {
        self.get(&["v1", "account", "balances"], &[]).await
    }

    // Portfolio

    pub async fn get_positions(
        &self,
        filter: &PositionsQuery,
    ) -> Result<GetPositionsResponse, RestError> {
        let mut query = Vec::new();
        push_opt(&mut query, "market", filter.market.as_deref());
        push_opt(&mut query, "limit", filter.limit);
        push_opt(&mut query, "cursor", filter.cursor.as_deref());
        self.get(&["v1", "portfolio", "positions"], &query).await
    }

    pub async fn get_activities(
        &self,
        filter: &ActivitiesQuery,
    ) -> Result<GetActivitiesResponse, RestError> {
        let mut query = Vec::new();
        push_opt(&mut query, "marketSlug", filter.market_slug.as_deref());
        if !filter.types.is_empty() {
            query.push(("types", filter.types.join(",")));
        }
        push_opt(&mut query, "limit", filter.limit);
        push_opt(&mut query, "cursor", filter.cursor.as_deref());
        push_opt(&mut query, "sortOrder", filter.sort_order.as_deref());
        self.get(&["v1", "portfolio", "activities"], &query).await
    }

    // Orders

    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, RestError> {
        self.post(&["v1", "orders"], request).await
    }

    pub async fn preview_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<PreviewOrderResponse, RestError> {
        let body = PreviewOrderRequest {
            request: request.clone(),
        };
        self.post(&["v1", "order", "preview"], &body).await
    }

    pub async fn get_open_orders(
        &self,
        slugs: &[String],
    ) -> Result<GetOpenOrdersResponse, RestError> {
        let mut query = Vec::new();
        if !slugs.is_empty() {
            query.push(("slugs", slugs.join(",")));
        }
        self.get(&["v1", "orders", "open"], &query).await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<GetOrderResponse, RestError> {
        self.get(&["v1", "order", order_id], &[]).await
    }

    /// Cancels one order. The response body is not interpreted.
    pub async fn cancel_order(&self, order_id: &str, market_slug: &str) -> Result<(), RestError> {
        let body = CancelOrderRequest {
            market_slug: market_slug.to_string(),
        };
        let url = self.url(&["v1", "order", order_id, "cancel"], &[])?;
        self.send(Method::POST, &url, Some(encode_body(&body)?))
            .await
            .map(|_| ())
    }

    pub async fn cancel_all_open_orders(
        &self,
        slugs: &[String],
    ) -> Result<CancelOpenOrdersResponse, RestError> {
        let body = CancelOpenOrdersRequest {
            slugs: slugs.to_vec(),
        };
        self.post(&["v1", "orders", "open", "cancel"], &body).await
    }

    async fn get<T>(&self, segments: &[&str], query: &[(&str, String)]) -> Result<T, RestError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(segments, query)?;
        let body = retry_async(
            &self.read_retry,
            |_| self.send(Method::GET, &url, None),
            RestError::is_retryable,
        )
        .await?;
        parse_body(&body)
    }

    async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, RestError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = self.url(segments, &[])?;
        let body = self
            .send(Method::POST, &url, Some(encode_body(body)?))
            .await?;
        parse_body(&body)
    }

    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, RestError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RestError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    /// Sends one signed attempt and returns the raw success body.
    async fn send(&self, method: Method, url: &Url, body: Option<String>) -> Result<String, RestError> {
        let headers = self.signer.rest_headers(method.as_str(), url.path())?;
        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .headers(headers);
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send().await.map_err(RestError::Transport)?;
        let status = response.status();
        let text = response.text().await.map_err(RestError::Transport)?;
        debug!(
            event = "rest_response",
            method = %method,
            path = url.path(),
            status = status.as_u16()
        );

        if !status.is_success() {
            return Err(RestError::HttpStatus {
                status,
                body: summarize_error_body(&text),
            });
        }
        Ok(text)
    }
}

#[derive(Debug, Error)]
pub enum RestError {
    #[error("request failed: {0}")]
    Transport(reqwest::Error),

    #[error("http status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to sign request: {0}")]
    Auth(#[from] AuthError),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl RestError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_timeout() || err.is_connect(),
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Parse(_) | Self::Encode(_) | Self::Auth(_) | Self::Url(_) => false,
        }
    }

    /// HTTP status for `HttpStatus` errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn push_opt<V: ToString>(query: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<V>) {
    if let Some(value) = value {
        query.push((name, value.to_string()));
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<String, RestError> {
    serde_json::to_string(body).map_err(RestError::Encode)
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, RestError> {
    serde_json::from_str(body).map_err(|err| RestError::Parse(err.to_string()))
}

fn summarize_error_body(body: &str) -> String {
    #[derive(Debug, Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            return message;
        }
    }

    body.chars().take(ERROR_BODY_SNIPPET_LEN).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;

    use super::*;
    use crate::auth::SigningKey;

    fn client(base: &str) -> RestClient {
        let key = SigningKey::from_bytes(&[9u8; 32]).expect("key");
        let signer = Signer::new(SecretString::new("key-id".to_string()), Arc::new(key));
        RestClient::new(base, signer).expect("client")
    }

    #[test]
    fn url_escapes_segments_and_encodes_query() {
        let client = client("https://api.example.test");
        let url = client
            .url(
                &["v1", "market", "slug", "a b/c"],
                &[("limit", "10".to_string()), ("types", "TRADE,RESOLUTION".to_string())],
            )
            .expect("url");

        assert_eq!(url.path(), "/v1/market/slug/a%20b%2Fc");
        assert_eq!(url.query(), Some("limit=10&types=TRADE%2CRESOLUTION"));
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let client = client("http://localhost:8080/api/");
        let url = client.url(&["v1", "orders"], &[]).expect("url");
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/orders");
    }

    #[test]
    fn url_without_query_has_no_question_mark() {
        let client = client("https://api.example.test");
        let url = client.url(&["v1", "account", "balances"], &[]).expect("url");
        assert_eq!(url.as_str(), "https://api.example.test/v1/account/balances");
    }

    #[test]
    fn error_body_prefers_error_then_message_then_snippet() {
        assert_eq!(summarize_error_body(r#"{"error":"bad slug"}"#), "bad slug");
        assert_eq!(summarize_error_body(r#"{"message":"nope"}"#), "nope");

        let long = "x".repeat(500);
        assert_eq!(summarize_error_body(&long).len(), ERROR_BODY_SNIPPET_LEN);
    }

    #[test]
    fn retryable_statuses() {
        let status = |code| RestError::HttpStatus {
            status: StatusCode::from_u16(code).expect("status"),
            body: String::new(),
        };
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!RestError::Parse("x".to_string()).is_retryable());
    }

    #[test]
    fn rejects_non_base_urls() {
        let key = SigningKey::from_bytes(&[9u8; 32]).expect("key");
        let signer = Signer::new(SecretString::new("k".to_string()), Arc::new(key));
        assert!(matches!(
            RestClient::new("mailto:someone@example.test", signer),
            Err(RestError::Url(_))
        ));
    }
}

//! Environment-driven client configuration.

use std::fmt;
use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;

use crate::auth::{AuthError, Signer, SigningKey, WS_MARKETS_PATH, WS_PRIVATE_PATH};

/// REST base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.polymarket.us";

const API_KEY_VARS: (&str, &str) = ("POLYMARKET_API_KEY", "TEST_API_KEY_ID");
const SECRET_KEY_VARS: (&str, &str) = ("POLYMARKET_PRIVATE_KEY", "TEST_API_SECRET_KEY");
const SYMBOL_VARS: (&str, &str) = ("POLYMARKET_SYMBOL", "TEST_MARKET_SLUG");
const BASE_URL_VARS: (&str, &str) = ("POLYMARKET_BASE_URL", "RETAIL_API_URL");
const WS_URL_VARS: (&str, &str) = ("POLYMARKET_WS_URL", "RETAIL_WS_URL");
const INSECURE_VAR: &str = "INSECURE_SKIP_VERIFY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {primary} (or {fallback})")]
    Missing {
        primary: &'static str,
        fallback: &'static str,
    },

    #[error("invalid secret key: {0}")]
    SecretKey(#[from] AuthError),
}

/// Resolved settings for the REST client and the stream session.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: SecretString,
    pub signing_key: Arc<SigningKey>,
    /// Market slug the demo trades against.
    pub symbol: String,
    pub base_url: String,
    pub ws_private_url: String,
    pub ws_markets_url: String,
    /// Accept invalid TLS certificates on REST calls.
    pub insecure_skip_verify: bool,
}

impl ClientConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |(primary, fallback): (&'static str, &'static str)| {
            non_empty(lookup(primary)).or_else(|| non_empty(lookup(fallback)))
        };
        let require = |vars: (&'static str, &'static str)| {
            get(vars).ok_or(ConfigError::Missing {
                primary: vars.0,
                fallback: vars.1,
            })
        };

        let api_key = require(API_KEY_VARS)?;
        let signing_key = SigningKey::from_base64(&require(SECRET_KEY_VARS)?)?;
        let symbol = require(SYMBOL_VARS)?;
        let base_url = get(BASE_URL_VARS)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let ws_base = get(WS_URL_VARS)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| derive_ws_base(&base_url));
        let insecure_skip_verify = lookup(INSECURE_VAR)
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            api_key: SecretString::new(api_key),
            signing_key: Arc::new(signing_key),
            symbol,
            base_url,
            ws_private_url: format!("{ws_base}{WS_PRIVATE_PATH}"),
            ws_markets_url: format!("{ws_base}{WS_MARKETS_PATH}"),
            insecure_skip_verify,
        })
    }

    /// Signer sharing this config's credentials.
    pub fn signer(&self) -> Signer {
        Signer::new(self.api_key.clone(), Arc::clone(&self.signing_key))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"[REDACTED]")
            .field("signing_key", &self.signing_key)
            .field("symbol", &self.symbol)
            .field("base_url", &self.base_url)
            .field("ws_private_url", &self.ws_private_url)
            .field("ws_markets_url", &self.ws_markets_url)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

/// Maps an HTTP(S) base URL onto its WebSocket counterpart.
pub fn derive_ws_base(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

//! Ed25519 request signing for REST calls and stream handshakes.
//!
//! Every authenticated request signs `"{timestamp_ms}{METHOD}{PATH}"` with
//! the account's Ed25519 key. The query string is never part of `PATH`.
//! REST calls and stream handshakes carry different header sets built from
//! the same primitive.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use http::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use ring::signature::{Ed25519KeyPair, KeyPair};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// REST header carrying the API key id.
pub const REST_ACCESS_KEY_HEADER: &str = "x-pm-access-key";
/// REST header carrying the signing timestamp in milliseconds.
pub const REST_TIMESTAMP_HEADER: &str = "x-pm-timestamp";
/// REST header carrying the base64 signature.
pub const REST_SIGNATURE_HEADER: &str = "x-pm-signature";

/// Stream handshake header carrying the API key id.
pub const STREAM_API_KEY_HEADER: &str = "x-api-key";
/// Stream handshake header carrying the signing timestamp in milliseconds.
pub const STREAM_TIMESTAMP_HEADER: &str = "x-api-timestamp";
/// Stream handshake header carrying the base64 signature.
pub const STREAM_SIGNATURE_HEADER: &str = "x-api-signature";
/// Stream handshake header carrying the signature over the API key.
pub const STREAM_PASSPHRASE_HEADER: &str = "x-api-passphrase";

/// Path of the private (account) stream endpoint; also the signed path.
pub const WS_PRIVATE_PATH: &str = "/v1/ws/private";
/// Path of the public markets stream endpoint; also the signed path.
pub const WS_MARKETS_PATH: &str = "/v1/ws/markets";

/// Maximum tolerated distance between a request timestamp and server time.
pub const TIMESTAMP_WINDOW: Duration = Duration::from_secs(5 * 60);

const SEED_LEN: usize = 32;
const KEYPAIR_LEN: usize = 64;

/// Errors produced while loading keys or building signed headers.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("secret key is not valid base64: {0}")]
    SecretEncoding(#[from] base64::DecodeError),

    #[error("secret key must be {SEED_LEN} or {KEYPAIR_LEN} bytes, got {0}")]
    SecretLength(usize),

    #[error("secret key rejected: {0}")]
    KeyRejected(String),

    #[error("invalid value for header {name}: {source}")]
    HeaderValue {
        name: &'static str,
        #[source]
        source: InvalidHeaderValue,
    },

    #[error("timestamp {timestamp_ms} is {skew_ms} ms from local clock (limit {limit_ms} ms)")]
    TimestampSkew {
        timestamp_ms: u64,
        skew_ms: u64,
        limit_ms: u64,
    },
}

/// Ed25519 signing key loaded from the account secret.
pub struct SigningKey {
    pair: Ed25519KeyPair,
}

impl SigningKey {
    /// Decodes a standard-base64 secret of either 32 seed bytes or 64
    /// seed-plus-public-key bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, AuthError> {
        let raw = BASE64_STANDARD.decode(encoded.trim())?;
        Self::from_bytes(&raw)
    }

    /// Builds a key from raw secret bytes.
    ///
    /// The 64-byte form must carry the public key that matches its seed.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, AuthError> {
        let pair = match raw.len() {
            SEED_LEN => Ed25519KeyPair::from_seed_unchecked(raw),
            KEYPAIR_LEN => {
                Ed25519KeyPair::from_seed_and_public_key(&raw[..SEED_LEN], &raw[SEED_LEN..])
            }
            other => return Err(AuthError::SecretLength(other)),
        }
        .map_err(|err| AuthError::KeyRejected(err.to_string()))?;

        Ok(Self { pair })
    }

    /// Raw 32-byte public key.
    pub fn public_key(&self) -> &[u8] {
        self.pair.public_key().as_ref()
    }

    /// Signs arbitrary bytes and returns the detached 64-byte signature.
    pub fn sign_bytes(&self, message: &[u8]) -> Vec<u8> {
        self.pair.sign(message).as_ref().to_vec()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &BASE64_STANDARD.encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

/// Builds the exact message that gets signed.
///
/// `path` is truncated at the first `?`; the method is upper-cased.
pub fn signing_message(timestamp_ms: u64, method: &str, path: &str) -> String {
    let path = path.split_once('?').map_or(path, |(path, _)| path);
    format!("{timestamp_ms}{}{path}", method.to_ascii_uppercase())
}

/// Signs `"{timestamp_ms}{METHOD}{PATH}"` with `key`.
pub fn sign(key: &SigningKey, timestamp_ms: u64, method: &str, path: &str) -> Vec<u8> {
    key.sign_bytes(signing_message(timestamp_ms, method, path).as_bytes())
}

/// Builds the REST authentication header set.
pub fn build_headers(
    api_key: &str,
    timestamp_ms: u64,
    signature: &[u8],
) -> Result<HeaderMap, AuthError> {
    let mut headers = HeaderMap::with_capacity(3);
    insert_header(&mut headers, REST_ACCESS_KEY_HEADER, api_key)?;
    insert_header(&mut headers, REST_TIMESTAMP_HEADER, &timestamp_ms.to_string())?;
    insert_header(
        &mut headers,
        REST_SIGNATURE_HEADER,
        &BASE64_STANDARD.encode(signature),
    )?;
    Ok(headers)
}

/// Builds the stream handshake header set for the endpoint at `path`.
///
/// The passphrase is a signature over the API key itself.
pub fn build_stream_headers(
    key: &SigningKey,
    api_key: &str,
    timestamp_ms: u64,
    path: &str,
) -> Result<HeaderMap, AuthError> {
    let signature = sign(key, timestamp_ms, "GET", path);
    let passphrase = key.sign_bytes(api_key.as_bytes());

    let mut headers = HeaderMap::with_capacity(4);
    insert_header(&mut headers, STREAM_API_KEY_HEADER, api_key)?;
    insert_header(&mut headers, STREAM_TIMESTAMP_HEADER, &timestamp_ms.to_string())?;
    insert_header(
        &mut headers,
        STREAM_SIGNATURE_HEADER,
        &BASE64_STANDARD.encode(signature),
    )?;
    insert_header(
        &mut headers,
        STREAM_PASSPHRASE_HEADER,
        &BASE64_STANDARD.encode(passphrase),
    )?;
    Ok(headers)
}

/// Checks that `timestamp_ms` lies within [`TIMESTAMP_WINDOW`] of `now_ms`.
pub fn validate_timestamp(timestamp_ms: u64, now_ms: u64) -> Result<(), AuthError> {
    let skew_ms = timestamp_ms.abs_diff(now_ms);
    let limit_ms = TIMESTAMP_WINDOW.as_millis() as u64;
    if skew_ms > limit_ms {
        return Err(AuthError::TimestampSkew {
            timestamp_ms,
            skew_ms,
            limit_ms,
        });
    }
    Ok(())
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn insert_header(
    headers: &mut HeaderMap,
    name: &'static str,
    value: &str,
) -> Result<(), AuthError> {
    let value =
        HeaderValue::from_str(value).map_err(|source| AuthError::HeaderValue { name, source })?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

/// API key plus signing key, producing freshly timestamped header sets.
#[derive(Clone)]
pub struct Signer {
    api_key: SecretString,
    key: Arc<SigningKey>,
}

impl Signer {
    pub fn new(api_key: SecretString, key: Arc<SigningKey>) -> Self {
        Self { api_key, key }
    }

    /// Headers for a REST call. Each call takes a new timestamp.
    pub fn rest_headers(&self, method: &str, path: &str) -> Result<HeaderMap, AuthError> {
        let timestamp_ms = now_ms();
        let signature = sign(&self.key, timestamp_ms, method, path);
        build_headers(self.api_key.expose_secret(), timestamp_ms, &signature)
    }

    /// Headers for a stream handshake against the endpoint at `path`.
    pub fn stream_headers(&self, path: &str) -> Result<HeaderMap, AuthError> {
        build_stream_headers(&self.key, self.api_key.expose_secret(), now_ms(), path)
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("api_key", &"[REDACTED]")
            .field("key", &self.key)
            .finish()
    }
}

//! Rust client for the Polymarket Retail API.
//!
//! The crate is organized by transport surface:
//! - `stream`: the dual-socket realtime session (private account stream plus
//!   public markets stream) merged into one inbound queue.
//! - `rest`: signed HTTP client for markets, account, portfolio and orders.
//! - `auth`: Ed25519 request signing shared by both surfaces.
//! - `config`: environment-driven client configuration.
//! - `models`: request and response payloads.
//! - `retry`: shared retry and timeout utilities.

/// Request signing and authentication headers.
pub mod auth;
/// Environment configuration.
pub mod config;
/// REST and stream payload types.
pub mod models;
/// REST client and endpoints.
pub mod rest;
/// Retry and timeout helpers used across the SDK.
pub mod retry;
/// Realtime stream session, transport and protocol types.
pub mod stream;

pub use auth::{Signer, SigningKey};
pub use config::ClientConfig;
pub use rest::{RestClient, RestError};
pub use stream::{StreamError, StreamSession};

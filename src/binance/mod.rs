//! Binance exchange gateway
//!
//! Signed REST access to market data, account balances, and order
//! placement, plus the instrument filter table that drives quantization.
//!
//! # Modules
//!
//! - [`auth`]: HMAC-SHA256 signing for private endpoints
//! - [`client`]: the REST client
//! - [`filters`]: step-size filters and the quantizer
//! - [`types`]: wire type definitions

pub mod auth;
pub mod client;
pub mod filters;
pub mod types;

pub use auth::Credentials;
pub use client::BinanceClient;
pub use filters::{InstrumentFilters, QuantizeKind};
pub use types::{BinanceKline, OrderAck};

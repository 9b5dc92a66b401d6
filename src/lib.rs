//! Automated Binance Spot-Trading Bot
//!
//! Polls candle data on a fixed interval, classifies the market regime
//! (ADX + EMA), selects one of three signal strategies per symbol, and
//! manages open positions with two overlays: averaging-down on losses and
//! a trailing take-profit on gains. Trades persist in a SQLite ledger; a
//! realtime dashboard follows along over WebSocket and can start/stop the
//! bot or resize its entries at runtime.
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use crypto_autobot::binance::{BinanceClient, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BinanceClient::new(Credentials::from_env()?, true, Duration::from_secs(10));
//!     let candles = client.get_candles("BTCUSDT", "15m", 100).await?;
//!     println!("Fetched {} candles", candles.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod binance;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod indicators;
pub mod ledger;
pub mod regime;
pub mod strategies;
pub mod types;

pub use config::Config;
pub use engine::BotEngine;
pub use error::{BotError, Result};
pub use events::{EventLevel, EventSink, LogEvent};
pub use ledger::TradeLedger;
pub use strategies::StrategyKind;
pub use types::*;

// Re-export the exchange client for convenience
pub use binance::BinanceClient;

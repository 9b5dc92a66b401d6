//! Error taxonomy for the trading core
//!
//! Errors are grouped by how the trading loop must react to them:
//! validation failures are rejected without retry, gateway failures abandon
//! the trade for the current cycle, data failures degrade to HOLD, and
//! persistence failures are logged at the highest severity but never stop
//! the loop. Config errors are fatal at startup only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    /// Order rejected before it reaches the exchange (e.g. below the
    /// minimum notional). Not retried.
    #[error("order rejected: {0}")]
    Validation(String),

    /// Exchange gateway failure: network, HTTP status, or signature.
    /// Abandons the trade for this cycle; the next cycle retries naturally.
    #[error("exchange gateway error: {0}")]
    Gateway(String),

    /// Missing or insufficient market data (short candle history,
    /// indicator warmup). Treated as HOLD downstream.
    #[error("insufficient market data: {0}")]
    Data(String),

    /// Trade ledger failure. After a successful exchange fill this is the
    /// most severe case: the exchange has executed but the local record is
    /// missing.
    #[error("trade ledger error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// Startup-time configuration problem (missing credentials, failed
    /// instrument-filter load). Fatal: the process must not begin trading.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Gateway(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

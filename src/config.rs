//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable support for API credentials and deployment toggles.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::Symbol;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub overlays: OverlayConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a JSON file, then apply environment
    /// overrides. Credentials never live in the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env();
        Ok(config)
    }

    /// Build a configuration purely from defaults + environment.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("BINANCE_API_KEY") {
            self.exchange.api_key = Some(api_key);
        }
        if let Ok(api_secret) = std::env::var("BINANCE_API_SECRET") {
            self.exchange.api_secret = Some(api_secret);
        }
        if let Ok(testnet) = std::env::var("USE_TESTNET") {
            self.exchange.testnet = matches!(testnet.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Ok(db_path) = std::env::var("DB_PATH") {
            self.server.db_path = db_path;
        }
    }

    /// Startup gate: trading must not begin without credentials.
    pub fn require_credentials(&self) -> crate::error::Result<(&str, &str)> {
        match (
            self.exchange.api_key.as_deref(),
            self.exchange.api_secret.as_deref(),
        ) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Ok((key, secret))
            }
            _ => Err(crate::error::BotError::Config(
                "BINANCE_API_KEY / BINANCE_API_SECRET not set (check your .env file)".to_string(),
            )),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exchange: ExchangeConfig::default(),
            trading: TradingConfig::default(),
            overlays: OverlayConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Exchange connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    /// Trade against the Binance spot testnet instead of production
    pub testnet: bool,
    /// Per-request timeout in seconds for all gateway calls
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            api_key: None,
            api_secret: None,
            testnet: true,
            timeout_secs: 10,
        }
    }
}

/// Trading loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub pairs: Vec<String>,
    /// Candle timeframe fetched each cycle
    pub interval: String,
    /// Candle window length fetched each cycle
    pub lookback: u32,
    /// Sleep between cycles, a rate-limit safety margin
    pub cycle_seconds: u64,
    /// Fixed USDT notional per entry (must stay >= the exchange minimum)
    pub trade_amount_usdt: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            pairs: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            interval: "15m".to_string(),
            lookback: 100,
            cycle_seconds: 10,
            trade_amount_usdt: 15.0,
        }
    }
}

impl TradingConfig {
    pub fn symbols(&self) -> Vec<Symbol> {
        self.pairs.iter().map(|s| Symbol::new(s.clone())).collect()
    }
}

/// Money-management overlay thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Average down once the position is this far under water
    pub dca_drop_pct: f64,
    /// Arm the trailing stop once unrealized profit reaches this fraction
    pub ttp_activation_pct: f64,
    /// Close the whole position once price retraces this far from peak
    pub ttp_trail_pct: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            dca_drop_pct: 0.05,
            ttp_activation_pct: 0.03,
            ttp_trail_pct: 0.01,
        }
    }
}

/// Dashboard API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub db_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 8000,
            db_path: "crypto_bot.db".to_string(),
        }
    }
}

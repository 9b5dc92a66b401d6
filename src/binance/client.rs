//! Signed Binance REST client
//!
//! Covers the endpoints the trading loop needs: market data (public),
//! account balances and order placement/cancellation (signed), and the
//! one-shot exchange-info load that feeds the quantizer. Private calls are
//! signed with HMAC-SHA256 over the canonical query string and carry a
//! millisecond timestamp; every request has a fixed timeout so a stalled
//! gateway call can never wedge the loop.

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::auth::Credentials;
use super::filters::InstrumentFilters;
use super::types::{AccountInfo, BinanceKline, ExchangeInfo, OpenOrder, OrderAck};
use crate::types::{Candle, Side};

/// Production REST base
const MAINNET_BASE: &str = "https://api.binance.com/api/v3";

/// Spot testnet REST base
const TESTNET_BASE: &str = "https://testnet.binance.vision/api/v3";

/// Binance API client
#[derive(Debug, Clone)]
pub struct BinanceClient {
    http: Client,
    credentials: Credentials,
    base_url: String,
}

impl BinanceClient {
    /// Create a client. `timeout` applies to every request; on expiry the
    /// call fails like any other gateway error.
    pub fn new(credentials: Credentials, testnet: bool, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        BinanceClient {
            http,
            credentials,
            base_url: if testnet { TESTNET_BASE } else { MAINNET_BASE }.to_string(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Append timestamp and signature to a parameter list, producing the
    /// final query for a signed endpoint.
    fn sign_params(&self, mut params: Vec<(String, String)>) -> Vec<(String, String)> {
        params.push((
            "timestamp".to_string(),
            Utc::now().timestamp_millis().to_string(),
        ));

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        params.push(("signature".to_string(), self.credentials.sign(&query)));
        params
    }

    async fn send(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        params: &[(String, String)],
        signed: bool,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.request(method, self.url(endpoint)).query(params);
        if signed {
            request = request.header("X-MBX-APIKEY", self.credentials.api_key());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to Binance {}", endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Binance API error {} on {}: {}", status, endpoint, body);
        }

        Ok(response)
    }

    /// Check server connectivity
    pub async fn ping(&self) -> bool {
        match self.send(reqwest::Method::GET, "/ping", &[], false).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Ping failed: {}", e);
                false
            }
        }
    }

    /// Fetch the most recent `limit` candles for a symbol, oldest first
    pub async fn get_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("interval".to_string(), interval.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];

        debug!(
            "Fetching klines: symbol={}, interval={}, limit={}",
            symbol, interval, limit
        );

        let raw_data: Vec<Vec<serde_json::Value>> = self
            .send(reqwest::Method::GET, "/klines", &params, false)
            .await?
            .json()
            .await
            .context("Failed to parse Binance klines response")?;

        let candles: Vec<Candle> = raw_data
            .iter()
            .filter_map(|row| BinanceKline::from_raw(row))
            .filter_map(BinanceKline::into_candle)
            .collect();

        Ok(candles)
    }

    /// Free balances per asset, positive amounts only (signed)
    pub async fn get_balances(&self) -> Result<HashMap<String, f64>> {
        let params = self.sign_params(vec![]);
        let account: AccountInfo = self
            .send(reqwest::Method::GET, "/account", &params, true)
            .await?
            .json()
            .await
            .context("Failed to parse Binance account response")?;

        let mut balances = HashMap::new();
        for entry in account.balances {
            if let Ok(free) = entry.free.parse::<f64>() {
                if free > 0.0 {
                    balances.insert(entry.asset, free);
                }
            }
        }
        Ok(balances)
    }

    /// Place a market order. `quantity` must already be quantized to the
    /// instrument's lot step.
    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: &str,
    ) -> Result<OrderAck> {
        let params = self.sign_params(vec![
            ("symbol".to_string(), symbol.to_string()),
            ("side".to_string(), side.as_str().to_string()),
            ("type".to_string(), "MARKET".to_string()),
            ("quantity".to_string(), quantity.to_string()),
        ]);

        self.send(reqwest::Method::POST, "/order", &params, true)
            .await?
            .json()
            .await
            .context("Failed to parse Binance order response")
    }

    /// Place a GTC limit order. `quantity` and `price` must already be
    /// quantized to the instrument's steps.
    pub async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: &str,
        price: &str,
    ) -> Result<OrderAck> {
        let params = self.sign_params(vec![
            ("symbol".to_string(), symbol.to_string()),
            ("side".to_string(), side.as_str().to_string()),
            ("type".to_string(), "LIMIT".to_string()),
            ("quantity".to_string(), quantity.to_string()),
            ("price".to_string(), price.to_string()),
            ("timeInForce".to_string(), "GTC".to_string()),
        ]);

        self.send(reqwest::Method::POST, "/order", &params, true)
            .await?
            .json()
            .await
            .context("Failed to parse Binance order response")
    }

    /// Resting orders for a symbol (signed)
    pub async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        let params = self.sign_params(vec![("symbol".to_string(), symbol.to_string())]);

        self.send(reqwest::Method::GET, "/openOrders", &params, true)
            .await?
            .json()
            .await
            .context("Failed to parse Binance open orders response")
    }

    /// Cancel a resting order by its opaque id (signed)
    pub async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<()> {
        let params = self.sign_params(vec![
            ("symbol".to_string(), symbol.to_string()),
            ("orderId".to_string(), order_id.to_string()),
        ]);

        self.send(reqwest::Method::DELETE, "/order", &params, true)
            .await?;
        Ok(())
    }

    /// Load step-size filters for every tradable instrument. Called once
    /// at startup; trading must not start if this fails.
    pub async fn load_exchange_filters(&self) -> Result<InstrumentFilters> {
        let info: ExchangeInfo = self
            .send(reqwest::Method::GET, "/exchangeInfo", &[], false)
            .await?
            .json()
            .await
            .context("Failed to parse Binance exchange info")?;

        let filters = InstrumentFilters::from_exchange_info(&info);
        debug!("Loaded step filters for {} instruments", filters.len());
        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_selection() {
        let creds = Credentials::new("k", "s");
        let mainnet = BinanceClient::new(creds.clone(), false, Duration::from_secs(10));
        let testnet = BinanceClient::new(creds, true, Duration::from_secs(10));

        assert_eq!(mainnet.url("/ping"), "https://api.binance.com/api/v3/ping");
        assert_eq!(
            testnet.url("/ping"),
            "https://testnet.binance.vision/api/v3/ping"
        );
    }

    #[test]
    fn test_sign_params_appends_timestamp_then_signature() {
        let client = BinanceClient::new(
            Credentials::new("k", "s"),
            true,
            Duration::from_secs(10),
        );

        let params = client.sign_params(vec![("symbol".to_string(), "BTCUSDT".to_string())]);
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].0, "symbol");
        assert_eq!(params[1].0, "timestamp");
        assert_eq!(params[2].0, "signature");
        assert_eq!(params[2].1.len(), 64);
    }
}

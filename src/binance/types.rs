//! Binance API wire types
//!
//! Klines arrive as heterogeneous JSON arrays, numeric fields arrive as
//! strings, and order ids arrive as integers that can exceed the 53-bit
//! range JavaScript (and any float round-trip) can represent, so order ids
//! are captured as opaque strings the moment they enter the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::types::Candle;

/// Binance kline/candlestick row.
/// API returns an array: [open_time, open, high, low, close, volume,
/// close_time, quote_volume, trades, taker_buy_base, taker_buy_quote, ignore]
#[derive(Debug, Clone)]
pub struct BinanceKline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl BinanceKline {
    /// Parse from a raw JSON array returned by the klines endpoint
    pub fn from_raw(raw: &[serde_json::Value]) -> Option<Self> {
        if raw.len() < 6 {
            return None;
        }

        Some(BinanceKline {
            open_time: raw[0].as_i64()?,
            open: raw[1].as_str()?.parse().ok()?,
            high: raw[2].as_str()?.parse().ok()?,
            low: raw[3].as_str()?.parse().ok()?,
            close: raw[4].as_str()?.parse().ok()?,
            volume: raw[5].as_str()?.parse().ok()?,
        })
    }

    pub fn into_candle(self) -> Option<Candle> {
        Some(Candle {
            open_time: DateTime::<Utc>::from_timestamp_millis(self.open_time)?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

/// Accept a JSON number or string and keep it as its exact string form.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected order id as string or number, got {}",
            other
        ))),
    }
}

/// Acknowledgement returned by the order endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
    #[serde(rename = "orderId", deserialize_with = "opaque_id")]
    pub order_id: String,
    #[serde(rename = "executedQty", default)]
    pub executed_qty: Option<String>,
}

impl OrderAck {
    /// Filled amount reported by the exchange, falling back to the
    /// requested quantity when the field is absent or unparseable.
    pub fn filled_amount(&self, requested_qty: f64) -> f64 {
        self.executed_qty
            .as_deref()
            .and_then(|q| q.parse::<f64>().ok())
            .unwrap_or(requested_qty)
    }
}

/// One resting order from the open-orders endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrder {
    #[serde(rename = "orderId", deserialize_with = "opaque_id")]
    pub order_id: String,
    pub symbol: String,
    pub side: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(rename = "origQty", default)]
    pub orig_qty: Option<String>,
}

/// Account endpoint payload (signed)
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub balances: Vec<BalanceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceEntry {
    pub asset: String,
    pub free: String,
}

/// Exchange-info payload, reduced to the filters the quantizer needs
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub filters: Vec<RawFilter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFilter {
    #[serde(rename = "filterType")]
    pub filter_type: String,
    #[serde(rename = "stepSize", default)]
    pub step_size: Option<String>,
    #[serde(rename = "tickSize", default)]
    pub tick_size: Option<String>,
}

/// Valid Binance intervals
pub const BINANCE_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

pub fn is_valid_interval(interval: &str) -> bool {
    BINANCE_INTERVALS.contains(&interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kline_from_raw() {
        let raw = vec![
            json!(1_700_000_000_000_i64),
            json!("42000.5"),
            json!("42100.0"),
            json!("41900.0"),
            json!("42050.25"),
            json!("123.456"),
            json!(1_700_000_899_999_i64),
        ];
        let kline = BinanceKline::from_raw(&raw).unwrap();
        assert_eq!(kline.open, 42000.5);
        assert_eq!(kline.close, 42050.25);

        let candle = kline.into_candle().unwrap();
        assert_eq!(candle.volume, 123.456);
        assert_eq!(candle.open_time.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_kline_from_raw_rejects_short_rows() {
        let raw = vec![json!(1), json!("1.0")];
        assert!(BinanceKline::from_raw(&raw).is_none());
    }

    #[test]
    fn test_order_id_survives_53_bit_overflow() {
        // 2^53 + 1 is not representable as f64; the id must arrive intact.
        let ack: OrderAck = serde_json::from_value(json!({
            "orderId": 9007199254740993_i64,
            "executedQty": "0.0015"
        }))
        .unwrap();
        assert_eq!(ack.order_id, "9007199254740993");
        assert_eq!(ack.filled_amount(0.002), 0.0015);
    }

    #[test]
    fn test_order_ack_falls_back_to_requested_qty() {
        let ack: OrderAck = serde_json::from_value(json!({ "orderId": "abc-123" })).unwrap();
        assert_eq!(ack.order_id, "abc-123");
        assert_eq!(ack.filled_amount(0.5), 0.5);
    }

    #[test]
    fn test_valid_intervals() {
        assert!(is_valid_interval("15m"));
        assert!(is_valid_interval("1d"));
        assert!(!is_valid_interval("2d"));
    }
}

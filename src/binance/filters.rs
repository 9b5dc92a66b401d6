//! Instrument filters and quantization
//!
//! Binance rejects orders whose quantity or price is not aligned to the
//! instrument's step granularity, and rejects string representations in
//! exponential notation. All arithmetic here runs in exact decimal form;
//! rounding is always DOWN so the bot can never over-request quantity or
//! price and trip an insufficient-balance rejection.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use super::types::ExchangeInfo;

/// Which step size applies to the value being quantized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizeKind {
    Quantity,
    Price,
}

/// Step sizes for one instrument, parsed from exchange info
#[derive(Debug, Clone, Default)]
pub struct SymbolFilters {
    pub qty_step: Option<Decimal>,
    pub price_step: Option<Decimal>,
}

/// Per-symbol filter table, loaded once at startup and immutable afterwards
#[derive(Debug, Clone, Default)]
pub struct InstrumentFilters {
    filters: HashMap<String, SymbolFilters>,
}

impl InstrumentFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from the exchange-info payload. Step sizes are
    /// parsed from their string form so they stay decimal-exact.
    pub fn from_exchange_info(info: &ExchangeInfo) -> Self {
        let mut filters = HashMap::new();

        for symbol_info in &info.symbols {
            let mut entry = SymbolFilters::default();
            for filter in &symbol_info.filters {
                match filter.filter_type.as_str() {
                    "LOT_SIZE" => {
                        entry.qty_step = filter
                            .step_size
                            .as_deref()
                            .and_then(|s| Decimal::from_str(s).ok());
                    }
                    "PRICE_FILTER" => {
                        entry.price_step = filter
                            .tick_size
                            .as_deref()
                            .and_then(|s| Decimal::from_str(s).ok());
                    }
                    _ => {}
                }
            }
            filters.insert(symbol_info.symbol.clone(), entry);
        }

        InstrumentFilters { filters }
    }

    /// Single-symbol table from literal step strings. Convenient for
    /// tests and offline tooling.
    pub fn with_steps(symbol: &str, qty_step: &str, price_step: &str) -> Self {
        let mut filters = HashMap::new();
        filters.insert(
            symbol.to_string(),
            SymbolFilters {
                qty_step: Decimal::from_str(qty_step).ok(),
                price_step: Decimal::from_str(price_step).ok(),
            },
        );
        InstrumentFilters { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Round `value` DOWN to the instrument's step granularity and return
    /// its exact decimal string (no exponential notation). Unknown symbol
    /// or missing step → plain decimal pass-through, no rounding.
    pub fn quantize(&self, symbol: &str, value: f64, kind: QuantizeKind) -> String {
        let value_dec = match Decimal::from_f64(value) {
            Some(d) => d,
            None => return value.to_string(),
        };

        let step = self.filters.get(symbol).and_then(|f| match kind {
            QuantizeKind::Quantity => f.qty_step,
            QuantizeKind::Price => f.price_step,
        });

        match step {
            Some(step) if !step.is_zero() => {
                let quantized = (value_dec / step).trunc() * step;
                quantized.to_string()
            }
            _ => value_dec.normalize().to_string(),
        }
    }
}

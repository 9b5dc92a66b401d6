//! Signal-generating strategies
//!
//! Three pure decision functions over a candle window. The regime
//! classifier picks which one is live for a symbol each cycle; only the
//! selected strategy's output gates a new entry. Indicator warmup always
//! evaluates to HOLD, never a trade.

use crate::indicators;
use crate::types::{Candle, Signal};

/// The closed set of strategies the regime classifier selects from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// RSI-14 reversal: buy oversold, sell overbought
    TrendReversal,
    /// RSI-7 scalping: tighter bands, shorter lookback
    RsiScalping,
    /// MACD(12,26,9) bullish cross; exits are left to the trailing stop
    MacdCross,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::TrendReversal => "trend_reversal",
            StrategyKind::RsiScalping => "rsi_scalping",
            StrategyKind::MacdCross => "macd_cross",
        }
    }

    /// Evaluate this strategy on a candle window (oldest first)
    pub fn evaluate(&self, candles: &[Candle]) -> Signal {
        match self {
            StrategyKind::TrendReversal => trend_reversal(candles),
            StrategyKind::RsiScalping => rsi_scalping(candles),
            StrategyKind::MacdCross => macd_cross(candles),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn last_rsi(candles: &[Candle], period: usize) -> Option<f64> {
    let closes = indicators::close_series(candles);
    indicators::rsi(&closes, period).last().copied()?
}

fn trend_reversal(candles: &[Candle]) -> Signal {
    match last_rsi(candles, 14) {
        Some(rsi) if rsi < 30.0 => Signal::Buy,
        Some(rsi) if rsi > 70.0 => Signal::Sell,
        _ => Signal::Hold,
    }
}

fn rsi_scalping(candles: &[Candle]) -> Signal {
    match last_rsi(candles, 7) {
        Some(rsi) if rsi < 25.0 => Signal::Buy,
        Some(rsi) if rsi > 75.0 => Signal::Sell,
        _ => Signal::Hold,
    }
}

/// BUY on the bar where the MACD line crosses above its signal line
/// (previous bar at-or-below, current bar above). Never sells.
fn macd_cross(candles: &[Candle]) -> Signal {
    let closes = indicators::close_series(candles);
    let (macd_line, signal_line, _) = indicators::macd(&closes, 12, 26, 9);

    let n = macd_line.len();
    if n < 2 {
        return Signal::Hold;
    }

    let (prev_macd, prev_signal, cur_macd, cur_signal) = match (
        macd_line[n - 2],
        signal_line[n - 2],
        macd_line[n - 1],
        signal_line[n - 1],
    ) {
        (Some(pm), Some(ps), Some(cm), Some(cs)) => (pm, ps, cm, cs),
        _ => return Signal::Hold,
    };

    if prev_macd <= prev_signal && cur_macd > cur_signal {
        Signal::Buy
    } else {
        Signal::Hold
    }
}

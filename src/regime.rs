//! Market regime classification
//!
//! ADX(14) measures trend strength, EMA(50) splits trending markets into
//! bullish and bearish. Each regime maps to the one strategy allowed to
//! open positions while it holds. Pure function: identical input always
//! yields identical classification.

use crate::indicators;
use crate::strategies::StrategyKind;
use crate::types::{Candle, Regime};

const ADX_PERIOD: usize = 14;
const EMA_PERIOD: usize = 50;
const ADX_TREND_THRESHOLD: f64 = 25.0;

/// Outcome of one classification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegimeDecision {
    pub regime: Regime,
    pub strategy: StrategyKind,
}

/// Classify the market regime for one symbol's candle window.
///
/// Returns `None` while either indicator is still warming up; callers
/// treat that as HOLD (no trade this cycle).
pub fn classify(candles: &[Candle]) -> Option<RegimeDecision> {
    let close = indicators::close_series(candles);
    let high = indicators::high_series(candles);
    let low = indicators::low_series(candles);

    let adx = *indicators::adx(&high, &low, &close, ADX_PERIOD).last()?;
    let ema50 = *indicators::ema(&close, EMA_PERIOD).last()?;
    let last_close = *close.last()?;

    let (adx, ema50) = (adx?, ema50?);

    let decision = if adx > ADX_TREND_THRESHOLD {
        if last_close > ema50 {
            RegimeDecision {
                regime: Regime::Bullish,
                strategy: StrategyKind::MacdCross,
            }
        } else {
            RegimeDecision {
                regime: Regime::Bearish,
                strategy: StrategyKind::TrendReversal,
            }
        }
    } else {
        RegimeDecision {
            regime: Regime::Sideways,
            strategy: StrategyKind::RsiScalping,
        }
    };

    Some(decision)
}

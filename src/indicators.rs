//! Technical indicators powered by the `ta` crate
//!
//! Thin wrappers around `ta` for RSI, EMA, and MACD, plus a Wilder-smoothed
//! ADX/DMI implementation (the `ta` crate has no directional-movement
//! indicators). Outputs are `Vec<Option<f64>>` aligned with the input
//! series; `None` marks warmup bars where the indicator is undefined.

use ta::indicators::{
    ExponentialMovingAverage, MovingAverageConvergenceDivergence, RelativeStrengthIndex,
};
use ta::Next;

use crate::types::Candle;

/// Type alias for three-line indicators (macd, signal, histogram)
pub type BandOutput = (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>);

// =============================================================================
// Series helpers
// =============================================================================

pub fn close_series(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

pub fn high_series(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.high).collect()
}

pub fn low_series(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.low).collect()
}

// =============================================================================
// Moving Averages
// =============================================================================

/// Calculate Exponential Moving Average
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match ExponentialMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    let mut result = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let ema_val = indicator.next(value);
        if i + 1 >= period {
            result.push(Some(ema_val));
        } else {
            result.push(None);
        }
    }

    result
}

// =============================================================================
// Momentum Indicators
// =============================================================================

/// Calculate Relative Strength Index
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match RelativeStrengthIndex::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    let mut result = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let rsi_val = indicator.next(value);
        if i + 1 >= period {
            result.push(Some(rsi_val));
        } else {
            result.push(None);
        }
    }

    result
}

/// Calculate MACD (macd line, signal line, histogram)
pub fn macd(
    values: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> BandOutput {
    if values.is_empty() {
        return (vec![], vec![], vec![]);
    }

    let mut indicator =
        match MovingAverageConvergenceDivergence::new(fast_period, slow_period, signal_period) {
            Ok(i) => i,
            Err(_) => {
                return (
                    vec![None; values.len()],
                    vec![None; values.len()],
                    vec![None; values.len()],
                )
            }
        };

    let warmup = slow_period;
    let mut macd_line = Vec::with_capacity(values.len());
    let mut signal_line = Vec::with_capacity(values.len());
    let mut histogram = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let out = indicator.next(value);
        if i + 1 >= warmup {
            macd_line.push(Some(out.macd));
            signal_line.push(Some(out.signal));
            histogram.push(Some(out.histogram));
        } else {
            macd_line.push(None);
            signal_line.push(None);
            histogram.push(None);
        }
    }

    (macd_line, signal_line, histogram)
}

// =============================================================================
// Trend-Strength Indicators (Wilder)
// =============================================================================

/// Calculate True Range
fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(high.len());

    for i in 0..high.len() {
        let tr_value = if i == 0 {
            high[i] - low[i]
        } else {
            let hl = high[i] - low[i];
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            hl.max(hc).max(lc)
        };
        tr.push(tr_value);
    }

    tr
}

/// Wilder's smoothing: first value is an SMA, then
/// `smoothed = (prev * (period - 1) + value) / period`
fn wilders_smooth(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut result = Vec::with_capacity(values.len());
    let mut smoothed: Option<f64> = None;

    for (i, &value) in values.iter().enumerate() {
        if i + 1 < period {
            result.push(None);
        } else if i + 1 == period {
            let sum: f64 = values[0..period].iter().sum();
            smoothed = Some(sum / period as f64);
            result.push(smoothed);
        } else if let Some(prev) = smoothed {
            smoothed = Some((prev * (period - 1) as f64 + value) / period as f64);
            result.push(smoothed);
        } else {
            result.push(None);
        }
    }

    result
}

/// Calculate Average True Range using Wilder's smoothing
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    if high.is_empty() || period == 0 || high.len() != low.len() || high.len() != close.len() {
        return vec![];
    }

    wilders_smooth(&true_range(high, low, close), period)
}

/// Calculate the Directional Movement Index (+DI, -DI)
pub fn dmi(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    if high.is_empty() || period == 0 {
        return (vec![], vec![]);
    }

    let mut plus_dm = vec![0.0; high.len()];
    let mut minus_dm = vec![0.0; high.len()];

    for i in 1..high.len() {
        let up_move = high[i] - high[i - 1];
        let down_move = low[i - 1] - low[i];

        if up_move > down_move && up_move > 0.0 {
            plus_dm[i] = up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm[i] = down_move;
        }
    }

    let smoothed_plus_dm = wilders_smooth(&plus_dm, period);
    let smoothed_minus_dm = wilders_smooth(&minus_dm, period);
    let atr_values = atr(high, low, close, period);

    let mut plus_di = Vec::with_capacity(high.len());
    let mut minus_di = Vec::with_capacity(high.len());

    for i in 0..high.len() {
        match (
            smoothed_plus_dm.get(i),
            smoothed_minus_dm.get(i),
            atr_values.get(i),
        ) {
            (Some(Some(pdm)), Some(Some(mdm)), Some(Some(atr_val))) if *atr_val > 0.0 => {
                plus_di.push(Some(pdm / atr_val * 100.0));
                minus_di.push(Some(mdm / atr_val * 100.0));
            }
            _ => {
                plus_di.push(None);
                minus_di.push(None);
            }
        }
    }

    (plus_di, minus_di)
}

/// Calculate Average Directional Index (ADX) with Wilder's smoothing.
///
/// ADX needs 2*period - 1 warmup bars: one period for the DI values to
/// become valid, a second for the ADX smoothing of DX.
pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    if high.is_empty() || period == 0 {
        return vec![];
    }

    let (plus_di, minus_di) = dmi(high, low, close, period);
    let di_start = period - 1;
    let mut result = vec![None; high.len()];

    let mut dx_values: Vec<f64> = Vec::new();
    for i in di_start..high.len() {
        if let (Some(pdi), Some(mdi)) = (
            plus_di.get(i).and_then(|x| *x),
            minus_di.get(i).and_then(|x| *x),
        ) {
            let sum = pdi + mdi;
            if sum > 0.0 {
                dx_values.push((pdi - mdi).abs() / sum * 100.0);
            } else {
                dx_values.push(0.0);
            }
        } else {
            dx_values.push(0.0);
        }
    }

    if dx_values.len() >= period {
        let mut adx_value: Option<f64> = None;

        for (j, &dx) in dx_values.iter().enumerate() {
            let bar_idx = di_start + j;

            if j + 1 < period {
                // still accumulating DX
            } else if j + 1 == period {
                let sum: f64 = dx_values[0..period].iter().sum();
                adx_value = Some(sum / period as f64);
                result[bar_idx] = adx_value;
            } else if let Some(prev_adx) = adx_value {
                adx_value = Some((prev_adx * (period - 1) as f64 + dx) / period as f64);
                result[bar_idx] = adx_value;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 * 1.01f64.powi(i as i32)).collect()
    }

    fn falling(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 * 0.99f64.powi(i as i32)).collect()
    }

    #[test]
    fn test_ema_warmup_and_convergence() {
        let values = vec![10.0; 60];
        let out = ema(&values, 50);

        assert_eq!(out.len(), 60);
        assert!(out[48].is_none());
        // constant series: EMA equals the constant once defined
        assert!((out[59].unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_extremes() {
        let up = rsi(&rising(40), 14);
        let down = rsi(&falling(40), 14);

        assert!(up.last().unwrap().unwrap() > 70.0);
        assert!(down.last().unwrap().unwrap() < 30.0);
    }

    #[test]
    fn test_rsi_warmup_is_none() {
        let out = rsi(&rising(40), 14);
        assert!(out[12].is_none());
        assert!(out[13].is_some());
    }

    #[test]
    fn test_macd_lengths_align() {
        let values = rising(80);
        let (macd_line, signal_line, histogram) = macd(&values, 12, 26, 9);

        assert_eq!(macd_line.len(), 80);
        assert_eq!(signal_line.len(), 80);
        assert_eq!(histogram.len(), 80);
        assert!(macd_line[24].is_none());
        assert!(macd_line[26].is_some());
    }

    #[test]
    fn test_adx_high_in_trend() {
        let close = rising(60);
        let high: Vec<f64> = close.iter().map(|c| c * 1.001).collect();
        let low: Vec<f64> = close.iter().map(|c| c * 0.999).collect();

        let out = adx(&high, &low, &close, 14);
        let last = out.last().unwrap().unwrap();
        assert!(last > 25.0, "ADX {} should signal a strong trend", last);
    }

    #[test]
    fn test_adx_low_when_flat() {
        let close = vec![100.0; 60];
        let high = vec![100.0; 60];
        let low = vec![100.0; 60];

        let out = adx(&high, &low, &close, 14);
        // zero-range series: no directional movement at all
        for v in out.iter().flatten() {
            assert!(*v <= 25.0);
        }
    }

    #[test]
    fn test_adx_warmup_window() {
        let close = rising(60);
        let high: Vec<f64> = close.iter().map(|c| c * 1.001).collect();
        let low: Vec<f64> = close.iter().map(|c| c * 0.999).collect();

        let out = adx(&high, &low, &close, 14);
        // first defined value at bar 2*period - 2
        assert!(out[25].is_none());
        assert!(out[26].is_some());
    }
}

//! Integration tests for the trading core
//!
//! These exercise the pieces that must agree with each other in
//! production: the ledger feeding the position manager, the quantizer
//! feeding order sizing, and the regime classifier driving strategy
//! selection.

use chrono::{Duration, TimeZone, Utc};

use crypto_autobot::binance::{InstrumentFilters, QuantizeKind};
use crypto_autobot::config::OverlayConfig;
use crypto_autobot::engine::{
    ExecutionCoordinator, ManagementAction, PositionManager, MIN_NOTIONAL_USDT,
};
use crypto_autobot::regime;
use crypto_autobot::{Candle, Regime, Side, Signal, StrategyKind, TradeLedger, TradeStatus};

// =============================================================================
// Test Utilities
// =============================================================================

fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            open_time: start + Duration::minutes(15 * i as i64),
            open: close,
            high: close * 1.001,
            low: close * 0.999,
            close,
            volume: 1000.0,
        })
        .collect()
}

fn rising_closes(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 * 1.01f64.powi(i as i32)).collect()
}

fn falling_closes(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 * 0.99f64.powi(i as i32)).collect()
}

// =============================================================================
// Ledger + Position Manager
// =============================================================================

#[test]
fn test_dca_cycle_lowers_average_entry() {
    let ledger = TradeLedger::open_in_memory().unwrap();
    let mut pm = PositionManager::new(ledger.clone(), OverlayConfig::default());

    ledger
        .insert_open("BTCUSDT", "1", 100.0, 0.15, "macd_cross")
        .unwrap();

    // price drops 6%: manager demands an average-down
    let review = pm.review("BTCUSDT", 94.0).unwrap();
    assert_eq!(review.action, ManagementAction::AverageDown);

    // the resulting DCA buy lands in the ledger as another OPEN lot
    ledger.insert_open("BTCUSDT", "2", 94.0, 0.16, "dca").unwrap();

    let review = pm.review("BTCUSDT", 94.0).unwrap();
    let snapshot = review.snapshot.unwrap();
    assert!(snapshot.avg_price < 100.0);
    assert!(snapshot.avg_price > 94.0);
    // closer to break-even now, so the same price no longer triggers DCA
    assert_eq!(review.action, ManagementAction::None);
}

#[test]
fn test_trailing_exit_closes_the_whole_group() {
    let ledger = TradeLedger::open_in_memory().unwrap();
    let mut pm = PositionManager::new(ledger.clone(), OverlayConfig::default());

    ledger.insert_open("BTCUSDT", "1", 100.0, 1.0, "s").unwrap();
    ledger.insert_open("BTCUSDT", "2", 90.0, 1.0, "dca").unwrap();

    // avg 95; climb through activation, peak, then retrace past the trail
    assert_eq!(
        pm.review("BTCUSDT", 99.0).unwrap().action,
        ManagementAction::None
    );
    assert_eq!(
        pm.review("BTCUSDT", 103.0).unwrap().action,
        ManagementAction::None
    );

    let review = pm.review("BTCUSDT", 101.5).unwrap();
    match review.action {
        ManagementAction::CloseAll { amount } => assert_eq!(amount, 2.0),
        other => panic!("expected CloseAll, got {:?}", other),
    }

    // the SELL settles as a group close; nothing stays half-open
    ledger.close_all_open("BTCUSDT").unwrap();
    let all = ledger.recent(10).unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|t| t.status == TradeStatus::Closed));

    // and the next review clears the peak with the position gone
    let review = pm.review("BTCUSDT", 101.5).unwrap();
    assert!(review.snapshot.is_none());
    assert!(pm.peak("BTCUSDT").is_none());
}

#[test]
fn test_restart_resumes_from_persisted_state_only() {
    let ledger = TradeLedger::open_in_memory().unwrap();
    ledger.insert_open("ETHUSDT", "7", 3000.0, 0.005, "s").unwrap();
    ledger.insert_open("ETHUSDT", "8", 2800.0, 0.005, "dca").unwrap();

    let mut first = PositionManager::new(ledger.clone(), OverlayConfig::default());
    let before = first.review("ETHUSDT", 2950.0).unwrap().snapshot.unwrap();

    // "crash": drop the manager, keep the ledger
    drop(first);
    let mut second = PositionManager::new(ledger, OverlayConfig::default());
    let after = second.review("ETHUSDT", 2950.0).unwrap().snapshot.unwrap();

    assert_eq!(before, after);
}

// =============================================================================
// Quantizer + Sizing
// =============================================================================

#[test]
fn test_sized_entry_quantizes_to_lot_step() {
    let filters = InstrumentFilters::with_steps("BTCUSDT", "0.00001", "0.01");

    let qty = ExecutionCoordinator::order_quantity(Side::Buy, 43219.77, 15.0, None);
    let quantized = filters.quantize("BTCUSDT", qty, QuantizeKind::Quantity);

    let parsed: f64 = quantized.parse().unwrap();
    assert!(parsed <= qty);
    assert!(!quantized.contains('e') && !quantized.contains('E'));

    // still a multiple of the step after the round-down
    let steps = (parsed / 0.00001).round();
    assert!((parsed - steps * 0.00001).abs() < 1e-12);
}

#[test]
fn test_minimum_notional_boundary() {
    // the default 15 USDT entry clears the gate at any price
    let qty = ExecutionCoordinator::order_quantity(Side::Buy, 50000.0, 15.0, None);
    assert!(qty * 50000.0 >= MIN_NOTIONAL_USDT);

    // a dust-sized close-all does not
    let qty = ExecutionCoordinator::order_quantity(Side::Sell, 50000.0, 15.0, Some(0.0000001));
    assert!(qty * 50000.0 < MIN_NOTIONAL_USDT);
}

// =============================================================================
// Regime + Strategy selection
// =============================================================================

#[test]
fn test_regime_routes_to_matching_strategy() {
    let bull = candles_from_closes(&rising_closes(80));
    let bear = candles_from_closes(&falling_closes(80));
    let flat = candles_from_closes(&vec![100.0; 80]);

    let bull_decision = regime::classify(&bull).unwrap();
    assert_eq!(bull_decision.regime, Regime::Bullish);
    assert_eq!(bull_decision.strategy, StrategyKind::MacdCross);

    let bear_decision = regime::classify(&bear).unwrap();
    assert_eq!(bear_decision.regime, Regime::Bearish);
    assert_eq!(bear_decision.strategy, StrategyKind::TrendReversal);

    let flat_decision = regime::classify(&flat).unwrap();
    assert_eq!(flat_decision.regime, Regime::Sideways);
    assert_eq!(flat_decision.strategy, StrategyKind::RsiScalping);
}

#[test]
fn test_bearish_regime_buys_the_oversold_dip() {
    // a hard downtrend: bearish regime, and its reversal strategy sees an
    // oversold RSI -> entry signal
    let candles = candles_from_closes(&falling_closes(80));
    let decision = regime::classify(&candles).unwrap();

    assert_eq!(decision.regime, Regime::Bearish);
    assert_eq!(decision.strategy.evaluate(&candles), Signal::Buy);
}

#[test]
fn test_selected_strategy_alone_gates_entry() {
    // in a hard uptrend the reversal strategy would SELL, but the regime
    // selects MACD-cross, which holds without a fresh cross
    let candles = candles_from_closes(&rising_closes(80));
    let decision = regime::classify(&candles).unwrap();

    assert_eq!(decision.strategy, StrategyKind::MacdCross);
    assert_eq!(
        StrategyKind::TrendReversal.evaluate(&candles),
        Signal::Sell
    );
    assert_ne!(decision.strategy.evaluate(&candles), Signal::Sell);
}

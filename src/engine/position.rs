//! Position management: averaging-down and trailing take-profit
//!
//! Per symbol, per cycle: rebuild the position snapshot from the ledger's
//! OPEN lots (never cached across cycles), then decide at most ONE
//! management action. A drawdown past the DCA threshold averages down and
//! ends the evaluation for that cycle, because adding to a position and
//! immediately judging it for exit against stale averages is exactly the
//! trap the early return avoids. A profit past the activation threshold
//! arms the trailing stop; a retrace from the tracked peak closes the
//! whole lot group.
//!
//! Peak prices live only in this instance's map. After a restart the map
//! is empty and the first evaluation reseeds the peak from the average
//! entry price, which can only delay a trailing trigger, never fire one
//! early.

use std::collections::HashMap;

use crate::config::OverlayConfig;
use crate::error::Result;
use crate::ledger::TradeLedger;
use crate::types::{PositionSnapshot, TradeRecord};

/// The single action (if any) a review produces for a symbol this cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManagementAction {
    None,
    /// Buy another fixed-notional lot to lower the average entry
    AverageDown,
    /// Sell the entire open amount (group close)
    CloseAll { amount: f64 },
}

/// Outcome of one per-symbol review
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReview {
    pub action: ManagementAction,
    /// Set when the tracked peak was raised this cycle
    pub new_peak: Option<f64>,
    pub snapshot: Option<PositionSnapshot>,
}

impl PositionReview {
    fn idle() -> Self {
        PositionReview {
            action: ManagementAction::None,
            new_peak: None,
            snapshot: None,
        }
    }
}

/// Per-symbol overlay state and decision logic
pub struct PositionManager {
    ledger: TradeLedger,
    overlays: OverlayConfig,
    peaks: HashMap<String, f64>,
}

impl PositionManager {
    pub fn new(ledger: TradeLedger, overlays: OverlayConfig) -> Self {
        PositionManager {
            ledger,
            overlays,
            peaks: HashMap::new(),
        }
    }

    /// Weighted-average snapshot of a lot group at the current price.
    /// Returns `None` for an empty group or a degenerate zero amount.
    pub fn snapshot(trades: &[TradeRecord], current_price: f64) -> Option<PositionSnapshot> {
        if trades.is_empty() {
            return None;
        }

        let total_amount: f64 = trades.iter().map(|t| t.amount).sum();
        if total_amount <= 0.0 {
            return None;
        }

        let total_cost: f64 = trades.iter().map(|t| t.price * t.amount).sum();
        let avg_price = total_cost / total_amount;

        Some(PositionSnapshot {
            total_amount,
            avg_price,
            profit_pct: (current_price - avg_price) / avg_price,
        })
    }

    /// Evaluate the symbol's open position against the current price.
    pub fn review(&mut self, symbol: &str, current_price: f64) -> Result<PositionReview> {
        let trades = self.ledger.open_trades(symbol)?;

        let snapshot = match Self::snapshot(&trades, current_price) {
            Some(s) => s,
            None => {
                // no live lot group: any stale peak must not survive
                self.peaks.remove(symbol);
                return Ok(PositionReview::idle());
            }
        };

        if snapshot.profit_pct <= -self.overlays.dca_drop_pct {
            return Ok(PositionReview {
                action: ManagementAction::AverageDown,
                new_peak: None,
                snapshot: Some(snapshot),
            });
        }

        let mut new_peak = None;
        if snapshot.profit_pct >= self.overlays.ttp_activation_pct {
            let peak = self
                .peaks
                .get(symbol)
                .copied()
                .unwrap_or(snapshot.avg_price);

            let peak = if current_price > peak {
                self.peaks.insert(symbol.to_string(), current_price);
                new_peak = Some(current_price);
                current_price
            } else {
                peak
            };

            let drawdown = (peak - current_price) / peak;
            if drawdown >= self.overlays.ttp_trail_pct {
                return Ok(PositionReview {
                    action: ManagementAction::CloseAll {
                        amount: snapshot.total_amount,
                    },
                    new_peak,
                    snapshot: Some(snapshot),
                });
            }
        }

        Ok(PositionReview {
            action: ManagementAction::None,
            new_peak,
            snapshot: Some(snapshot),
        })
    }

    /// Tracked peak for a symbol, if the trailing stop is armed.
    pub fn peak(&self, symbol: &str) -> Option<f64> {
        self.peaks.get(symbol).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn manager_with_lots(lots: &[(f64, f64)]) -> (PositionManager, TradeLedger) {
        let ledger = TradeLedger::open_in_memory().unwrap();
        for (i, &(price, amount)) in lots.iter().enumerate() {
            ledger
                .insert_open("BTCUSDT", &i.to_string(), price, amount, "test")
                .unwrap();
        }
        (
            PositionManager::new(ledger.clone(), OverlayConfig::default()),
            ledger,
        )
    }

    #[test]
    fn test_weighted_average_entry() {
        let (mut pm, _ledger) =
            manager_with_lots(&[(100.0, 1.0), (90.0, 1.0), (80.0, 2.0)]);

        let review = pm.review("BTCUSDT", 82.5).unwrap();
        let snapshot = review.snapshot.unwrap();

        // (100 + 90 + 160) / 4
        assert_relative_eq!(snapshot.avg_price, 82.5);
        assert_relative_eq!(snapshot.total_amount, 4.0);
        assert_relative_eq!(snapshot.profit_pct, 0.0);
    }

    #[test]
    fn test_dca_fires_at_threshold() {
        let (mut pm, _ledger) = manager_with_lots(&[(100.0, 1.0)]);

        // -6% <= -5%: averages down
        let review = pm.review("BTCUSDT", 94.0).unwrap();
        assert_eq!(review.action, ManagementAction::AverageDown);
    }

    #[test]
    fn test_dca_holds_above_threshold() {
        let (mut pm, _ledger) = manager_with_lots(&[(100.0, 1.0)]);

        // -4%: not deep enough
        let review = pm.review("BTCUSDT", 96.0).unwrap();
        assert_eq!(review.action, ManagementAction::None);
    }

    #[test]
    fn test_trailing_stop_sequence() {
        let (mut pm, _ledger) = manager_with_lots(&[(100.0, 2.0)]);

        // +4% profit arms the trail and sets the first peak
        let review = pm.review("BTCUSDT", 104.0).unwrap();
        assert_eq!(review.action, ManagementAction::None);
        assert_eq!(review.new_peak, Some(104.0));

        // higher high raises the peak
        let review = pm.review("BTCUSDT", 106.0).unwrap();
        assert_eq!(review.action, ManagementAction::None);
        assert_eq!(review.new_peak, Some(106.0));
        assert_eq!(pm.peak("BTCUSDT"), Some(106.0));

        // (106 - 104.8) / 106 ≈ 1.13% >= 1%: close the whole group
        let review = pm.review("BTCUSDT", 104.8).unwrap();
        assert_eq!(
            review.action,
            ManagementAction::CloseAll { amount: 2.0 }
        );
        assert_eq!(review.new_peak, None);
    }

    #[test]
    fn test_peak_is_monotonic() {
        let (mut pm, _ledger) = manager_with_lots(&[(100.0, 1.0)]);

        pm.review("BTCUSDT", 106.0).unwrap();
        // a lower (still profitable, still inside the trail) price must not
        // move the peak down
        pm.review("BTCUSDT", 105.5).unwrap();
        assert_eq!(pm.peak("BTCUSDT"), Some(106.0));
    }

    #[test]
    fn test_peak_cleared_when_position_gone() {
        let (mut pm, ledger) = manager_with_lots(&[(100.0, 1.0)]);

        pm.review("BTCUSDT", 106.0).unwrap();
        assert!(pm.peak("BTCUSDT").is_some());

        ledger.close_all_open("BTCUSDT").unwrap();
        let review = pm.review("BTCUSDT", 106.0).unwrap();
        assert_eq!(review.action, ManagementAction::None);
        assert!(review.snapshot.is_none());
        assert!(pm.peak("BTCUSDT").is_none());
    }

    #[test]
    fn test_dca_preempts_trailing_evaluation() {
        let (mut pm, _ledger) = manager_with_lots(&[(100.0, 1.0)]);

        // arm the trail at a profit first
        pm.review("BTCUSDT", 106.0).unwrap();

        // deep drawdown: DCA wins, trailing logic untouched this cycle
        let review = pm.review("BTCUSDT", 94.0).unwrap();
        assert_eq!(review.action, ManagementAction::AverageDown);
        assert_eq!(review.new_peak, None);
        // the stale peak survives untouched; the no-position path clears it
        assert_eq!(pm.peak("BTCUSDT"), Some(106.0));
    }

    #[test]
    fn test_crash_recovery_rebuilds_identical_snapshot() {
        let (mut pm, ledger) = manager_with_lots(&[(100.0, 1.0), (90.0, 3.0)]);

        pm.review("BTCUSDT", 120.0).unwrap();
        let before = pm.review("BTCUSDT", 95.0).unwrap().snapshot.unwrap();

        // a fresh manager over the same ledger = process restart
        let mut recovered = PositionManager::new(ledger, OverlayConfig::default());
        let after = recovered.review("BTCUSDT", 95.0).unwrap().snapshot.unwrap();

        assert_eq!(before, after);
        // peak state is volatile: gone after restart until profit re-arms it
        assert!(recovered.peak("BTCUSDT").is_none());
    }
}

//! Trading engine
//!
//! One background task drives the whole bot: per cycle and per symbol it
//! fetches candles, classifies the market regime, lets the position
//! manager act on any open lot group, and only then considers a fresh
//! entry. A symbol's failure is contained to that symbol; the loop itself
//! only ever exits through a cooperative stop observed at a cycle
//! boundary.

pub mod execution;
pub mod position;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::binance::{BinanceClient, InstrumentFilters};
use crate::config::Config;
use crate::error::BotError;
use crate::events::EventSink;
use crate::ledger::TradeLedger;
use crate::regime;
use crate::types::{Side, Signal, Symbol};

pub use execution::{ExecutionCoordinator, ExecutionOutcome, MIN_NOTIONAL_USDT};
pub use position::{ManagementAction, PositionManager, PositionReview};

const STOPPED: u8 = 0;
const RUNNING: u8 = 1;

/// Loop state machine. Starting is a compare-and-set so two start
/// commands can never spawn two concurrent loops.
#[derive(Debug)]
pub struct RunState(AtomicU8);

impl RunState {
    pub fn new() -> Self {
        RunState(AtomicU8::new(STOPPED))
    }

    /// STOPPED -> RUNNING. Returns false if the loop is already running.
    pub fn try_start(&self) -> bool {
        self.0
            .compare_exchange(STOPPED, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Request a cooperative stop, observed at the next cycle boundary.
    pub fn stop(&self) {
        self.0.store(STOPPED, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst) == RUNNING
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// The bot: loop state, per-symbol overlay state, and execution plumbing.
pub struct BotEngine {
    client: Arc<BinanceClient>,
    ledger: TradeLedger,
    events: EventSink,
    coordinator: ExecutionCoordinator,
    positions: Mutex<PositionManager>,
    state: RunState,
    symbols: Vec<Symbol>,
    interval: String,
    lookback: u32,
    cycle: Duration,
    trade_amount_usdt: RwLock<f64>,
    active_strategies: Mutex<HashMap<String, &'static str>>,
}

impl BotEngine {
    pub fn new(
        client: Arc<BinanceClient>,
        ledger: TradeLedger,
        events: EventSink,
        filters: InstrumentFilters,
        config: &Config,
    ) -> Arc<Self> {
        let coordinator = ExecutionCoordinator::new(
            client.clone(),
            ledger.clone(),
            events.clone(),
            filters,
        );
        let positions = Mutex::new(PositionManager::new(
            ledger.clone(),
            config.overlays.clone(),
        ));

        Arc::new(BotEngine {
            client,
            ledger,
            events,
            coordinator,
            positions,
            state: RunState::new(),
            symbols: config.trading.symbols(),
            interval: config.trading.interval.clone(),
            lookback: config.trading.lookback,
            cycle: Duration::from_secs(config.trading.cycle_seconds),
            trade_amount_usdt: RwLock::new(config.trading.trade_amount_usdt),
            active_strategies: Mutex::new(HashMap::new()),
        })
    }

    /// Start the trading loop. Idempotent: a second start while running
    /// spawns nothing and returns false.
    pub fn start(self: Arc<Self>) -> bool {
        if !self.state.try_start() {
            self.events
                .warning("Start ignored: bot engine is already running.");
            return false;
        }

        tokio::spawn(async move {
            self.run_loop().await;
        });
        true
    }

    /// Request a cooperative stop; in-flight per-symbol work completes.
    pub fn stop(&self) {
        self.state.stop();
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn trade_amount_usdt(&self) -> f64 {
        *self.trade_amount_usdt.read().unwrap()
    }

    /// Update the fixed per-entry notional. Values under the exchange
    /// minimum are rejected with an error event.
    pub fn set_trade_amount(&self, value: f64) -> bool {
        if value < MIN_NOTIONAL_USDT {
            self.events.error(format!(
                "Rejected trade amount {:.2} USDT: below the {:.1} USDT exchange minimum.",
                value, MIN_NOTIONAL_USDT
            ));
            return false;
        }

        *self.trade_amount_usdt.write().unwrap() = value;
        self.events
            .success(format!("Trade amount updated to {:.2} USDT.", value));
        true
    }

    /// Strategy currently selected per symbol, for the status endpoint.
    pub fn active_strategies(&self) -> HashMap<String, String> {
        self.active_strategies
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    async fn run_loop(self: Arc<Self>) {
        self.events.info("Bot engine started successfully.");

        while self.state.is_running() {
            for symbol in &self.symbols {
                if let Err(e) = self.process_symbol(symbol).await {
                    self.events
                        .error(format!("Error processing {}: {:#}", symbol, e));
                }
            }

            // rate-limit safety margin between cycles
            tokio::time::sleep(self.cycle).await;
        }

        self.events.info("Bot engine stopped.");
    }

    /// One symbol, one cycle: candles -> regime -> position management ->
    /// possible fresh entry. Errors here are isolated by the caller.
    async fn process_symbol(&self, symbol: &Symbol) -> Result<()> {
        let candles = self
            .client
            .get_candles(symbol.as_str(), &self.interval, self.lookback)
            .await?;

        let current_price = match candles.last() {
            Some(c) => c.close,
            None => {
                return Err(
                    BotError::Data(format!("no candle data returned for {}", symbol)).into(),
                )
            }
        };

        // indicator warmup degrades to HOLD; position management still runs
        let decision = regime::classify(&candles);
        if let Some(d) = decision {
            self.events.info(format!(
                "[{}] Market regime: {} | Selected strategy: {}",
                symbol, d.regime, d.strategy
            ));
            self.active_strategies
                .lock()
                .unwrap()
                .insert(symbol.as_str().to_string(), d.strategy.name());
        } else {
            debug!("[{}] Indicators warming up, holding", symbol);
        }

        // lock scope ends before any await: decisions are synchronous
        let review = {
            let mut positions = self.positions.lock().unwrap();
            positions.review(symbol.as_str(), current_price)?
        };

        if let Some(peak) = review.new_peak {
            self.events
                .info(format!("[{}] New trailing peak: {}", symbol, peak));
        }

        let trade_amount = self.trade_amount_usdt();
        let acted = match review.action {
            ManagementAction::AverageDown => {
                if let Some(snapshot) = review.snapshot {
                    self.events.info(format!(
                        "[{}] Position {:.2}% under water, averaging down",
                        symbol,
                        snapshot.profit_pct * 100.0
                    ));
                }
                self.coordinator
                    .execute(symbol, Side::Buy, current_price, "dca", trade_amount, None)
                    .await;
                true
            }
            ManagementAction::CloseAll { amount } => {
                self.events.info(format!(
                    "[{}] Price retraced from peak, taking profit on the full position",
                    symbol
                ));
                self.coordinator
                    .execute(
                        symbol,
                        Side::Sell,
                        current_price,
                        "ttp",
                        trade_amount,
                        Some(amount),
                    )
                    .await;
                true
            }
            ManagementAction::None => false,
        };

        // fresh entry only without an open group and without a management
        // action this cycle
        if !acted && !self.ledger.has_open(symbol.as_str())? {
            if let Some(d) = decision {
                if d.strategy.evaluate(&candles) == Signal::Buy {
                    self.coordinator
                        .execute(
                            symbol,
                            Side::Buy,
                            current_price,
                            d.strategy.name(),
                            trade_amount,
                            None,
                        )
                        .await;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_start_is_idempotent() {
        let state = RunState::new();

        assert!(state.try_start());
        // second start must not win the CAS
        assert!(!state.try_start());
        assert!(state.is_running());

        state.stop();
        assert!(!state.is_running());
        assert!(state.try_start());
    }

    #[test]
    fn test_run_state_stop_is_safe_when_stopped() {
        let state = RunState::new();
        state.stop();
        assert!(!state.is_running());
    }
}

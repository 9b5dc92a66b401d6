//! Order execution
//!
//! Validates a proposed trade, submits it to the exchange, and persists
//! the result. The minimum-notional check is a hard gate: a too-small
//! order never reaches the gateway and never touches the ledger. Gateway
//! failures are contained here: the event sink gets an error, the ledger
//! stays untouched, and the next cycle retries naturally.

use std::sync::Arc;

use crate::binance::{BinanceClient, InstrumentFilters, QuantizeKind};
use crate::error::BotError;
use crate::events::EventSink;
use crate::ledger::TradeLedger;
use crate::types::{Side, Symbol};

/// Exchange-wide minimum order value in USDT
pub const MIN_NOTIONAL_USDT: f64 = 10.0;

/// How one execution attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Order filled and recorded
    Executed,
    /// Below the exchange minimum; nothing sent, nothing written
    RejectedBelowMinimum,
    /// Gateway refused or never answered; ledger untouched
    GatewayFailed,
    /// Order filled but the ledger write failed: the exchange holds a
    /// position this process has no record of
    LedgerWriteFailed,
}

pub struct ExecutionCoordinator {
    client: Arc<BinanceClient>,
    ledger: TradeLedger,
    events: EventSink,
    filters: InstrumentFilters,
}

impl ExecutionCoordinator {
    pub fn new(
        client: Arc<BinanceClient>,
        ledger: TradeLedger,
        events: EventSink,
        filters: InstrumentFilters,
    ) -> Self {
        ExecutionCoordinator {
            client,
            ledger,
            events,
            filters,
        }
    }

    /// Sizing rule: a closing SELL sells exactly the lot group's amount;
    /// any other order buys a fixed USDT notional at the current price.
    pub fn order_quantity(
        side: Side,
        price: f64,
        trade_amount_usdt: f64,
        close_all_amount: Option<f64>,
    ) -> f64 {
        match (side, close_all_amount) {
            (Side::Sell, Some(amount)) => amount,
            _ => trade_amount_usdt / price,
        }
    }

    /// The hard validation gate in front of every order.
    pub fn validate_notional(quantity: f64, price: f64) -> Result<(), BotError> {
        let notional = quantity * price;
        if notional < MIN_NOTIONAL_USDT {
            return Err(BotError::Validation(format!(
                "notional {:.2} USDT below the {:.1} USDT exchange minimum",
                notional, MIN_NOTIONAL_USDT
            )));
        }
        Ok(())
    }

    /// Validate, quantize, submit, persist. Never propagates an error to
    /// the trading loop; every failure path speaks through the event sink.
    pub async fn execute(
        &self,
        symbol: &Symbol,
        side: Side,
        price: f64,
        strategy_name: &str,
        trade_amount_usdt: f64,
        close_all_amount: Option<f64>,
    ) -> ExecutionOutcome {
        let quantity = Self::order_quantity(side, price, trade_amount_usdt, close_all_amount);

        if let Err(e) = Self::validate_notional(quantity, price) {
            self.events
                .warning(format!("{} {} not sent: {}", side, symbol, e));
            return ExecutionOutcome::RejectedBelowMinimum;
        }

        let quantized_qty = self
            .filters
            .quantize(symbol.as_str(), quantity, QuantizeKind::Quantity);

        let ack = match self
            .client
            .place_market_order(symbol.as_str(), side, &quantized_qty)
            .await
        {
            Ok(ack) => ack,
            Err(e) => {
                let gateway_err = BotError::Gateway(format!("{:#}", e));
                self.events
                    .error(format!("Order failed for {} {}: {}", side, symbol, gateway_err));
                return ExecutionOutcome::GatewayFailed;
            }
        };

        let filled = ack.filled_amount(quantity);
        let persisted = match side {
            Side::Buy => self.ledger.insert_open(
                symbol.as_str(),
                &ack.order_id,
                price,
                filled,
                strategy_name,
            ),
            Side::Sell => self.ledger.close_all_open(symbol.as_str()).map(|_| ()),
        };

        if let Err(e) = persisted {
            // the exchange executed but the local record is missing: a
            // reconciliation gap, the worst non-fatal state we can be in
            self.events.error(format!(
                "CRITICAL: {} {} filled (order {}) but the ledger write failed: {}. \
                 Local records no longer match the exchange.",
                side, symbol, ack.order_id, e
            ));
            return ExecutionOutcome::LedgerWriteFailed;
        }

        self.events.success(format!(
            "{} {} executed [strategy: {}, price: {}, qty: {}]",
            side, symbol, strategy_name, price, filled
        ));
        ExecutionOutcome::Executed
    }
}

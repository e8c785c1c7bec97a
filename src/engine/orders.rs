//! Order admission and simulated execution.
//!
//! The path is: risk validation against the current oracle price, then a
//! simulated fill with latency, then atomic ledger settlement and position
//! creation. Every failure resolves the order to FAILED with a typed reason;
//! an order is never left PENDING and never retried here.

use rust_decimal::Decimal;
use tracing::{debug, info};

use super::core::Engine;
use super::results::{EngineError, OrderOutcome};
use crate::events::{AlertLevel, RiskAlert, TradeStatus, TradeUpdate};
use crate::fill::FillOutcome;
use crate::ledger::{Entry, LedgerError};
use crate::order::{FailReason, Order};
use crate::position::Position;
use crate::risk::assess_order;
use crate::types::{Leverage, Price, Side, Symbol, Timestamp, Wallet};

impl Engine {
    /// Admit, execute and settle one order.
    pub async fn open_order(
        &self,
        wallet: Wallet,
        symbol: Symbol,
        side: Side,
        size: Decimal,
        price: Price,
        leverage: Leverage,
    ) -> Result<OrderOutcome, EngineError> {
        if size <= Decimal::ZERO {
            return Err(EngineError::Validation {
                reason: format!("order size must be positive, got {size}"),
            });
        }

        // risk validation needs the live price; if the oracle is down the
        // order fails up front and the ledger is never touched
        let current = match self.quote_bounded(&symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                debug!(%symbol, error = %e, "oracle unavailable during admission");
                let mut order = self.new_order(&wallet, &symbol, side, size, price, leverage);
                order.fail(FailReason::OracleUnavailable);
                self.persist_order(&order).await;
                return Ok(OrderOutcome::Failed(order));
            }
        };

        let profile_score = self.profiles.score(&wallet).await;
        let history = self
            .oracle
            .recent_prices(&symbol, self.config.risk.volatility_window)
            .await;
        let assessment = assess_order(
            profile_score,
            size,
            leverage,
            current.price,
            &history,
            &self.config.risk,
        );

        // the alert is a side effect of scoring, independent of acceptance
        if assessment.risk_score > self.config.risk.alert_score {
            self.push_risk_alert(
                &wallet,
                RiskAlert {
                    level: AlertLevel::High,
                    score: assessment.risk_score,
                    message: format!("high risk position detected for {symbol}"),
                },
            )
            .await;
        }

        if !assessment.accepted {
            debug!(%wallet, %symbol, reason = ?assessment.reason, "order rejected by risk limits");
            return Ok(OrderOutcome::Rejected(assessment));
        }

        let mut order = self.new_order(&wallet, &symbol, side, size, price, leverage);
        self.persist_order(&order).await;

        // simulated processing latency, then the fill verdict
        tokio::time::sleep(self.fills.latency()).await;

        if self.fills.next_outcome() == FillOutcome::Rejected {
            order.fail(FailReason::InsufficientLiquidity);
            self.persist_order(&order).await;
            return Ok(OrderOutcome::Failed(order));
        }

        // settle both legs under the account's lock: BUY pays quote for base,
        // SELL the inverse
        let notional = crate::types::Quote::new(order.notional());
        let base = crate::types::Quote::new(size);
        let (debit, credit) = match side {
            Side::Buy => (
                Entry::new(self.config.quote_asset.clone(), notional),
                Entry::new(symbol.as_str(), base),
            ),
            Side::Sell => (
                Entry::new(symbol.as_str(), base),
                Entry::new(self.config.quote_asset.clone(), notional),
            ),
        };

        match self.ledger.apply_fill(&wallet, debit, credit).await {
            Ok(()) => {}
            Err(LedgerError::InsufficientFunds { .. }) => {
                order.fail(FailReason::InsufficientFunds);
                self.persist_order(&order).await;
                return Ok(OrderOutcome::Failed(order));
            }
            Err(e) => return Err(e.into()),
        }

        let position = Position::open(
            self.next_position_id(),
            order.id,
            wallet.clone(),
            symbol.clone(),
            side,
            size,
            price,
            leverage,
            self.config.execution.liquidation_margin,
            Timestamp::now(),
        );

        {
            let mut positions = self.positions.write().await;
            positions.insert(
                position.id,
                std::sync::Arc::new(tokio::sync::Mutex::new(position.clone())),
            );
        }
        self.persist_position(&position).await;

        order.fill(position.id);
        self.persist_order(&order).await;

        info!(
            order = %order.id,
            position = %position.id,
            %wallet,
            %symbol,
            %side,
            %size,
            price = %price,
            "order filled"
        );

        self.publish_trade(TradeUpdate {
            trade_id: order.id,
            wallet: wallet.clone(),
            symbol,
            side,
            size,
            price,
            leverage,
            status: TradeStatus::Filled,
        })
        .await;

        Ok(OrderOutcome::Filled {
            order,
            position,
            risk: assessment,
        })
    }

    fn new_order(
        &self,
        wallet: &Wallet,
        symbol: &Symbol,
        side: Side,
        size: Decimal,
        price: Price,
        leverage: Leverage,
    ) -> Order {
        Order::pending(
            self.next_order_id(),
            wallet.clone(),
            symbol.clone(),
            side,
            size,
            price,
            leverage,
            Timestamp::now(),
        )
    }
}

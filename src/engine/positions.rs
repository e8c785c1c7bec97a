//! Position lifecycle: user closes and queries.
//!
//! The close/liquidate race is settled by the per-position mutex: whoever
//! observes OPEN under the lock and drives the transition wins; the loser
//! sees a terminal status and gets `AlreadyClosed`. Ledger settlement happens
//! inside the same critical section so a close is all-or-nothing: if the
//! ledger refuses, the position stays open.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::core::Engine;
use super::results::{EngineError, PositionResult};
use crate::events::{TradeStatus, TradeUpdate};
use crate::ledger::Entry;
use crate::position::Position;
use crate::risk::PositionOutcome;
use crate::types::{PositionId, Quote, Timestamp, Wallet};

impl Engine {
    /// Close an open position at the current oracle price, crediting the
    /// wallet with the entry notional plus realized PnL.
    pub async fn close_position(
        &self,
        wallet: &Wallet,
        position_id: PositionId,
    ) -> Result<PositionResult, EngineError> {
        let handle = self
            .position_handle(position_id)
            .await
            .ok_or(EngineError::PositionNotFound(position_id))?;

        // cheap pre-checks before going to the oracle
        let symbol = {
            let position = handle.lock().await;
            if position.wallet != *wallet {
                return Err(EngineError::Unauthorized {
                    position: position_id,
                    wallet: wallet.clone(),
                });
            }
            if !position.is_open() {
                return Err(EngineError::AlreadyClosed(position_id));
            }
            position.symbol.clone()
        };

        let current = self.quote_bounded(&symbol).await?;

        let (snapshot, proceeds) = {
            let mut position = handle.lock().await;
            // the monitor may have liquidated while we fetched the price
            if !position.is_open() {
                return Err(EngineError::AlreadyClosed(position_id));
            }

            let final_pnl = position.unrealized_pnl(current.price);
            let proceeds = self.settle_close(&position, final_pnl).await?;
            position.mark_closed(final_pnl, Timestamp::now());
            (position.clone(), proceeds)
        };

        let outcome = if snapshot.pnl > Quote::zero() {
            PositionOutcome::Profit
        } else if snapshot.pnl < Quote::zero() {
            PositionOutcome::Loss
        } else {
            PositionOutcome::Flat
        };
        self.profiles.record_outcome(wallet, outcome).await;
        self.persist_position(&snapshot).await;

        info!(
            position = %snapshot.id,
            %wallet,
            symbol = %snapshot.symbol,
            pnl = %snapshot.pnl,
            %proceeds,
            "position closed"
        );

        self.publish_trade(TradeUpdate {
            trade_id: snapshot.order_id,
            wallet: wallet.clone(),
            symbol: snapshot.symbol.clone(),
            side: snapshot.side,
            size: snapshot.size,
            price: current.price,
            leverage: snapshot.leverage,
            status: TradeStatus::Closed,
        })
        .await;

        Ok(PositionResult {
            final_pnl: snapshot.pnl,
            proceeds,
            position: snapshot,
        })
    }

    /// Open positions owned by the wallet.
    pub async fn get_positions(&self, wallet: &Wallet) -> Vec<Position> {
        let handles: Vec<Arc<Mutex<Position>>> = {
            let positions = self.positions.read().await;
            positions.values().map(Arc::clone).collect()
        };

        let mut found = Vec::new();
        for handle in handles {
            let position = handle.lock().await;
            if position.wallet == *wallet && position.is_open() {
                found.push(position.clone());
            }
        }
        found.sort_by_key(|p| p.id);
        found
    }

    /// Current state of one position, any status.
    pub async fn position(&self, position_id: PositionId) -> Option<Position> {
        let handle = self.position_handle(position_id).await?;
        let position = handle.lock().await;
        Some(position.clone())
    }

    pub(super) async fn position_handle(
        &self,
        position_id: PositionId,
    ) -> Option<Arc<Mutex<Position>>> {
        self.positions.read().await.get(&position_id).map(Arc::clone)
    }

    // Reverse the fill's legs at entry price and land the PnL on the quote
    // leg. Long: give back the base, receive notional + pnl. Short: pay the
    // buy-back cost notional - pnl, receive the base; a profit larger than
    // the notional turns the cost into a surplus credit.
    async fn settle_close(
        &self,
        position: &Position,
        final_pnl: Quote,
    ) -> Result<Quote, EngineError> {
        let notional = position.entry_notional();
        let base = Quote::new(position.size);
        let quote_asset = self.config.quote_asset.clone();
        let symbol = position.symbol.as_str();

        match position.side {
            crate::types::Side::Buy => {
                // a leveraged loss can exceed the notional; the margin is
                // exhausted at zero, the ledger is never credited negatively
                let proceeds = (notional + final_pnl).max(Quote::zero());
                self.ledger
                    .apply_fill(
                        &position.wallet,
                        Entry::new(symbol, base),
                        Entry::new(quote_asset, proceeds),
                    )
                    .await?;
                Ok(proceeds)
            }
            crate::types::Side::Sell => {
                let cost = notional - final_pnl;
                if cost >= Quote::zero() {
                    self.ledger
                        .apply_fill(
                            &position.wallet,
                            Entry::new(quote_asset, cost),
                            Entry::new(symbol, base),
                        )
                        .await?;
                    Ok(-cost)
                } else {
                    let surplus = -cost;
                    self.ledger.credit(&position.wallet, symbol, base).await?;
                    self.ledger
                        .credit(&position.wallet, &quote_asset, surplus)
                        .await?;
                    Ok(surplus)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_are_not_open() {
        use crate::position::PositionStatus;
        use crate::types::{Leverage, OrderId, Price, Side, Symbol};
        use rust_decimal_macros::dec;

        let mut position = Position::open(
            PositionId(1),
            OrderId(1),
            Wallet::new("inj1a"),
            Symbol::new("PEPE"),
            Side::Buy,
            dec!(10),
            Price::new_unchecked(dec!(1)),
            Leverage::one(),
            dec!(0.2),
            Timestamp::from_millis(0),
        );
        position.mark_closed(Quote::zero(), Timestamp::from_millis(1));
        assert_eq!(position.status, PositionStatus::Closed);
        assert!(!position.is_open());
    }
}

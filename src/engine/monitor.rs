//! Liquidation monitor.
//!
//! A recurring tick walks the synthetic market: refresh each token's quote,
//! broadcast it, recompute every open position's PnL against it, and
//! force-close positions whose liquidation price is breached. Ticks are
//! independent; a symbol whose oracle call fails or times out is skipped
//! this round and retried on the next.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::core::Engine;
use super::results::TickReport;
use crate::events::{channels, AlertLevel, PositionUpdate, PriceUpdate, RiskAlert};
use crate::position::Position;
use crate::risk::PositionOutcome;
use crate::types::{PositionId, Symbol, Timestamp};

impl Engine {
    /// One monitor sweep over the whole market.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        // group live position handles by symbol; terminal ones are ignored
        let mut by_symbol: BTreeMap<Symbol, Vec<(PositionId, Arc<Mutex<Position>>)>> =
            BTreeMap::new();
        {
            let positions = self.positions.read().await;
            for (id, handle) in positions.iter() {
                let position = handle.lock().await;
                if position.is_open() {
                    by_symbol
                        .entry(position.symbol.clone())
                        .or_default()
                        .push((*id, Arc::clone(handle)));
                }
            }
        }

        // quote every oracle symbol plus any symbol with an open position
        let mut symbols: Vec<Symbol> = self.oracle.symbols().await;
        for symbol in by_symbol.keys() {
            if !symbols.contains(symbol) {
                symbols.push(symbol.clone());
            }
        }

        for symbol in symbols {
            let quote = match self.quote_bounded(&symbol).await {
                Ok(quote) => quote,
                Err(e) => {
                    warn!(%symbol, error = %e, "skipping symbol this tick");
                    report.symbols_skipped.push(symbol);
                    continue;
                }
            };
            report.symbols_quoted += 1;

            self.hub
                .publish(
                    channels::PRICE_FEED,
                    &PriceUpdate {
                        symbol: symbol.clone(),
                        price: quote.price,
                        change_24h: quote.change_24h,
                        volume_24h: quote.volume_24h,
                        market_cap: quote.market_cap,
                    }
                    .into_message(),
                )
                .await;

            let Some(handles) = by_symbol.get(&symbol) else {
                continue;
            };

            for (id, handle) in handles {
                report.positions_checked += 1;

                // check-and-set under the position's own lock; a concurrent
                // user close that got there first leaves nothing to do
                let update = {
                    let mut position = handle.lock().await;
                    if !position.is_open() {
                        continue;
                    }

                    if position.is_breached(quote.price) {
                        position.mark_liquidated(Timestamp::now());
                        Sweep::Liquidated(position.clone())
                    } else {
                        position.pnl = position.unrealized_pnl(quote.price);
                        Sweep::Repriced(position.clone())
                    }
                };

                match update {
                    Sweep::Repriced(position) => {
                        self.push_position_update(
                            &position.wallet,
                            PositionUpdate {
                                position_id: position.id,
                                pnl: position.pnl,
                                status: position.status,
                            },
                        )
                        .await;
                    }
                    Sweep::Liquidated(position) => {
                        info!(
                            position = %position.id,
                            wallet = %position.wallet,
                            %symbol,
                            price = %quote.price,
                            liquidation_price = %position.liquidation_price,
                            "position liquidated"
                        );

                        // the margin is forfeit: no ledger credit here
                        self.profiles
                            .record_outcome(&position.wallet, PositionOutcome::Loss)
                            .await;
                        self.persist_position(&position).await;

                        self.push_position_update(
                            &position.wallet,
                            PositionUpdate {
                                position_id: position.id,
                                pnl: position.pnl,
                                status: position.status,
                            },
                        )
                        .await;
                        self.push_risk_alert(
                            &position.wallet,
                            RiskAlert {
                                level: AlertLevel::Critical,
                                score: rust_decimal_macros::dec!(100),
                                message: format!(
                                    "position {} liquidated at {}",
                                    position.id, quote.price
                                ),
                            },
                        )
                        .await;

                        report.liquidated.push(*id);
                    }
                }
            }
        }

        report
    }

    /// Run the monitor forever at the configured cadence. A slow tick delays
    /// but never cancels the following ones. Callers spawn this and abort the
    /// task to stop it.
    pub async fn run_monitor(self: Arc<Self>) {
        let interval = Duration::from_millis(self.config.monitor.tick_interval_ms);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let report = self.tick().await;
            debug!(
                symbols = report.symbols_quoted,
                skipped = report.symbols_skipped.len(),
                positions = report.positions_checked,
                liquidated = report.liquidated.len(),
                "monitor tick"
            );
        }
    }
}

enum Sweep {
    Repriced(Position),
    Liquidated(Position),
}

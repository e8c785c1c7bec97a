// 4.0: open position tracking. pnl = (current - entry) * size * leverage * direction.
// the liquidation price is fixed at open from entry, direction and the margin
// fraction; it never moves afterwards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Leverage, OrderId, PositionId, Price, Quote, Side, Symbol, Timestamp, Wallet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
    Liquidated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    // the filled order this position came from; exactly one per position
    pub order_id: OrderId,
    pub wallet: Wallet,
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Price,
    pub leverage: Leverage,
    pub liquidation_price: Price,
    // running mark-to-market pnl, refreshed by the monitor
    pub pnl: Quote,
    pub status: PositionStatus,
    pub opened_at: Timestamp,
    pub closed_at: Option<Timestamp>,
    pub final_pnl: Option<Quote>,
}

impl Position {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: PositionId,
        order_id: OrderId,
        wallet: Wallet,
        symbol: Symbol,
        side: Side,
        size: Decimal,
        entry_price: Price,
        leverage: Leverage,
        liquidation_margin: Decimal,
        opened_at: Timestamp,
    ) -> Self {
        let liquidation_price = liquidation_price(entry_price, side, liquidation_margin);
        Self {
            id,
            order_id,
            wallet,
            symbol,
            side,
            size,
            entry_price,
            leverage,
            liquidation_price,
            pnl: Quote::zero(),
            status: PositionStatus::Open,
            opened_at,
            closed_at: None,
            final_pnl: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    // 4.1: size * entry, the capital committed at open
    pub fn entry_notional(&self) -> Quote {
        Quote::new(self.size * self.entry_price.value())
    }

    pub fn unrealized_pnl(&self, current_price: Price) -> Quote {
        calculate_pnl(
            self.side,
            self.size,
            self.entry_price,
            current_price,
            self.leverage,
        )
    }

    // 4.2: longs liquidate when price falls to the floor, shorts when it rises to the cap
    pub fn is_breached(&self, current_price: Price) -> bool {
        match self.side {
            Side::Buy => current_price <= self.liquidation_price,
            Side::Sell => current_price >= self.liquidation_price,
        }
    }

    pub fn mark_closed(&mut self, final_pnl: Quote, closed_at: Timestamp) {
        debug_assert!(self.is_open(), "position already terminal");
        self.status = PositionStatus::Closed;
        self.pnl = final_pnl;
        self.final_pnl = Some(final_pnl);
        self.closed_at = Some(closed_at);
    }

    // liquidation forfeits the entire entry notional
    pub fn mark_liquidated(&mut self, closed_at: Timestamp) {
        debug_assert!(self.is_open(), "position already terminal");
        let final_pnl = -self.entry_notional();
        self.status = PositionStatus::Liquidated;
        self.pnl = final_pnl;
        self.final_pnl = Some(final_pnl);
        self.closed_at = Some(closed_at);
    }
}

// 4.3: the pnl formula. leverage amplifies the move, direction flips the sign.
pub fn calculate_pnl(
    side: Side,
    size: Decimal,
    entry_price: Price,
    current_price: Price,
    leverage: Leverage,
) -> Quote {
    let diff = current_price.value() - entry_price.value();
    Quote::new(diff * size * leverage.value() * side.sign())
}

// 4.4: long floor at entry * (1 - margin), short cap at entry * (1 + margin)
pub fn liquidation_price(entry_price: Price, side: Side, margin: Decimal) -> Price {
    let factor = match side {
        Side::Buy => Decimal::ONE - margin,
        Side::Sell => Decimal::ONE + margin,
    };
    Price::new_unchecked(entry_price.value() * factor)
}

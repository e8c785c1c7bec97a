// 3.0: order admission records. an order is the request; a position is what a
// filled order becomes. PENDING resolves to exactly one of FILLED or FAILED
// and is immutable after that.

use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;

use crate::types::{Leverage, OrderId, PositionId, Price, Side, Symbol, Timestamp, Wallet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    Failed,
}

// why a simulated order did not fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    InsufficientLiquidity,
    InsufficientFunds,
    OracleUnavailable,
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailReason::InsufficientLiquidity => write!(f, "insufficient liquidity"),
            FailReason::InsufficientFunds => write!(f, "insufficient funds"),
            FailReason::OracleUnavailable => write!(f, "price oracle unavailable"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub wallet: Wallet,
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
    pub price: Price,
    pub leverage: Leverage,
    pub status: OrderStatus,
    pub created_at: Timestamp,
    pub failure_reason: Option<FailReason>,
    // set iff the order filled
    pub position_id: Option<PositionId>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        id: OrderId,
        wallet: Wallet,
        symbol: Symbol,
        side: Side,
        size: Decimal,
        price: Price,
        leverage: Leverage,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            wallet,
            symbol,
            side,
            size,
            price,
            leverage,
            status: OrderStatus::Pending,
            created_at,
            failure_reason: None,
            position_id: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != OrderStatus::Pending
    }

    pub fn fill(&mut self, position_id: PositionId) {
        debug_assert!(!self.is_terminal(), "order already resolved");
        self.status = OrderStatus::Filled;
        self.position_id = Some(position_id);
    }

    pub fn fail(&mut self, reason: FailReason) {
        debug_assert!(!self.is_terminal(), "order already resolved");
        self.status = OrderStatus::Failed;
        self.failure_reason = Some(reason);
    }

    pub fn notional(&self) -> Decimal {
        self.size * self.price.value()
    }
}

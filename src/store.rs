// 9.0: persistence seam. the engine writes after every in-memory mutation and
// treats the store as eventually consistent: a failed write is logged by the
// caller, never rolled back into engine state.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::order::Order;
use crate::position::{Position, PositionStatus};
use crate::types::{OrderId, PositionId, Wallet};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn save_order(&self, order: &Order) -> Result<(), StoreError>;
    async fn save_position(&self, position: &Position) -> Result<(), StoreError>;

    async fn orders_for(&self, wallet: &Wallet) -> Result<Vec<Order>, StoreError>;
    async fn positions_for(
        &self,
        wallet: &Wallet,
        status: Option<PositionStatus>,
    ) -> Result<Vec<Position>, StoreError>;
}

// 9.1: in-memory implementation. backs tests and the sim binary.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    positions: RwLock<HashMap<PositionId, Position>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn save_position(&self, position: &Position) -> Result<(), StoreError> {
        self.positions
            .write()
            .await
            .insert(position.id, position.clone());
        Ok(())
    }

    async fn orders_for(&self, wallet: &Wallet) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut found: Vec<Order> = orders
            .values()
            .filter(|o| &o.wallet == wallet)
            .cloned()
            .collect();
        found.sort_by_key(|o| o.id);
        Ok(found)
    }

    async fn positions_for(
        &self,
        wallet: &Wallet,
        status: Option<PositionStatus>,
    ) -> Result<Vec<Position>, StoreError> {
        let positions = self.positions.read().await;
        let mut found: Vec<Position> = positions
            .values()
            .filter(|p| &p.wallet == wallet && status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        found.sort_by_key(|p| p.id);
        Ok(found)
    }
}

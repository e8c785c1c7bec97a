// 11.1 engine/core.rs: the engine aggregate. every collaborator is injected
// once at construction; nothing reaches for ambient state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::broadcast::{BroadcastHub, ClientId};
use crate::config::EngineConfig;
use crate::events::{channels, OutboundMessage, PositionUpdate, RiskAlert, TradeUpdate};
use crate::fill::FillSource;
use crate::ledger::WalletLedger;
use crate::oracle::{OracleError, PriceOracle, PriceQuote};
use crate::order::Order;
use crate::position::Position;
use crate::risk::RiskProfileBook;
use crate::store::TradeStore;
use crate::types::{OrderId, PositionId, Quote, Symbol, Wallet};

pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) ledger: WalletLedger,
    pub(super) profiles: RiskProfileBook,
    pub(super) oracle: Arc<dyn PriceOracle>,
    pub(super) fills: Arc<dyn FillSource>,
    pub(super) store: Arc<dyn TradeStore>,
    pub(super) hub: Arc<BroadcastHub>,
    // terminal positions stay in the map so a late close gets AlreadyClosed,
    // not NotFound
    pub(super) positions: RwLock<HashMap<PositionId, Arc<Mutex<Position>>>>,
    next_order_id: AtomicU64,
    next_position_id: AtomicU64,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        oracle: Arc<dyn PriceOracle>,
        fills: Arc<dyn FillSource>,
        store: Arc<dyn TradeStore>,
    ) -> Self {
        Self {
            ledger: WalletLedger::new(config.seed_balances.clone()),
            profiles: RiskProfileBook::new(config.risk.clone()),
            config,
            oracle,
            fills,
            store,
            hub: Arc::new(BroadcastHub::new()),
            positions: RwLock::new(HashMap::new()),
            next_order_id: AtomicU64::new(1),
            next_position_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn hub(&self) -> Arc<BroadcastHub> {
        Arc::clone(&self.hub)
    }

    pub async fn balance(&self, wallet: &Wallet, asset: &str) -> Quote {
        self.ledger.balance(wallet, asset).await
    }

    pub async fn balances(&self, wallet: &Wallet) -> Vec<crate::ledger::Entry> {
        self.ledger.balances(wallet).await
    }

    pub async fn risk_score(&self, wallet: &Wallet) -> rust_decimal::Decimal {
        self.profiles.score(wallet).await
    }

    /// All orders this wallet has submitted, from the store.
    pub async fn orders(&self, wallet: &Wallet) -> Vec<Order> {
        match self.store.orders_for(wallet).await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(%wallet, error = %e, "order query failed");
                Vec::new()
            }
        }
    }

    pub(super) fn next_order_id(&self) -> OrderId {
        OrderId(self.next_order_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(super) fn next_position_id(&self) -> PositionId {
        PositionId(self.next_position_id.fetch_add(1, Ordering::Relaxed))
    }

    // every oracle call goes through here so nothing can hang on a slow feed
    pub(super) async fn quote_bounded(&self, symbol: &Symbol) -> Result<PriceQuote, OracleError> {
        let timeout = Duration::from_millis(self.config.execution.oracle_timeout_ms);
        match tokio::time::timeout(timeout, self.oracle.quote(symbol)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout),
        }
    }

    // persistence is write-after-mutation; failures are logged, never unwound
    pub(super) async fn persist_order(&self, order: &Order) {
        if let Err(e) = self.store.save_order(order).await {
            warn!(order = %order.id, error = %e, "order persistence failed");
        }
    }

    pub(super) async fn persist_position(&self, position: &Position) {
        if let Err(e) = self.store.save_position(position).await {
            warn!(position = %position.id, error = %e, "position persistence failed");
        }
    }

    // broadcast is fire-and-forget relative to the mutation that triggered it
    pub(super) async fn publish_trade(&self, update: TradeUpdate) {
        self.hub
            .publish(channels::TRADES, &update.into_message())
            .await;
    }

    pub(super) async fn push_position_update(&self, wallet: &Wallet, update: PositionUpdate) {
        self.send_to_wallet(channels::POSITIONS, wallet, update.into_message())
            .await;
    }

    pub(super) async fn push_risk_alert(&self, wallet: &Wallet, alert: RiskAlert) {
        self.send_to_wallet(channels::RISK, wallet, alert.into_message())
            .await;
    }

    // personal channels address clients by wallet address
    async fn send_to_wallet(&self, channel: &str, wallet: &Wallet, message: OutboundMessage) {
        let client = ClientId::new(wallet.as_str());
        self.hub.send(channel, &client, &message).await;
    }
}

// papertrade-core: simulated leveraged trading engine.
// risk-first paper trading: every order passes the validator before it can
// touch the ledger, and every open position is swept for liquidation as the
// synthetic market moves. external seams (prices, fills, persistence,
// delivery) are traits so the engine itself stays deterministic.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Wallet, Symbol, Side, Price, Quote, Leverage
//   2.x  ledger.rs: wallet ledger, per-account balances, credit/debit
//   3.x  order.rs: order lifecycle (pending -> filled/failed)
//   4.x  position.rs: position struct, pnl, liquidation price
//   5.x  fill.rs: simulated fill outcomes (pluggable randomness)
//   6.x  oracle.rs: price oracle trait, random-walk simulator, history
//   7.x  risk.rs: risk profiles, composite scoring, order admission
//   8.x  events.rs: channel names and outbound message payloads
//   9.x  store.rs: persistence seam + in-memory store
//   10.x config.rs: engine parameters and presets
//   11.x engine/: core engine: orders, positions, liquidation monitor
//   12.x broadcast.rs: pub/sub hub over delivery endpoints

// core trading modules
pub mod engine;
pub mod ledger;
pub mod order;
pub mod position;
pub mod risk;
pub mod types;

// integration modules
pub mod broadcast;
pub mod config;
pub mod events;
pub mod fill;
pub mod oracle;
pub mod store;

// re exports for convenience
pub use broadcast::{BroadcastHub, ClientId, DeliveryEndpoint, DeliveryError};
pub use config::{ConfigError, EngineConfig, ExecutionConfig, MonitorConfig, RiskConfig};
pub use engine::{Engine, EngineError, OrderOutcome, PositionResult, TickReport};
pub use events::{
    channels, AlertLevel, OutboundMessage, PositionUpdate, PriceUpdate, RiskAlert, TradeStatus,
    TradeUpdate,
};
pub use fill::{FillOutcome, FillSource, FixedFills, RandomFills};
pub use ledger::{Entry, LedgerError, WalletLedger};
pub use oracle::{OracleError, PriceOracle, PriceQuote, SimulatedOracle, StaticOracle, TokenSpec};
pub use order::{FailReason, Order, OrderStatus};
pub use position::{calculate_pnl, liquidation_price, Position, PositionStatus};
pub use risk::{
    adjusted_score, assess_order, composite_score, volatility, PositionOutcome, RiskAssessment,
    RiskProfileBook,
};
pub use store::{MemoryStore, StoreError, TradeStore};
pub use types::{
    Leverage, OrderId, PositionId, Price, Quote, Side, Symbol, Timestamp, Wallet,
};

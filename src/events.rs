// 8.0: outbound message shapes. every state change the hub pushes is one of
// these payloads wrapped in an envelope of {kind, data, timestamp}.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::position::PositionStatus;
use crate::types::{Leverage, OrderId, PositionId, Price, Quote, Side, Symbol, Wallet};

/// Channel names the engine publishes on.
pub mod channels {
    pub const PRICE_FEED: &str = "price_feed";
    pub const TRADES: &str = "trades";
    pub const POSITIONS: &str = "positions";
    pub const RISK: &str = "risk";
}

/// The wire envelope. `data` is the serialized payload struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
    pub timestamp: String,
}

impl OutboundMessage {
    pub fn new(kind: &str, data: impl Serialize) -> Self {
        Self {
            kind: kind.to_string(),
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub symbol: Symbol,
    pub price: Price,
    pub change_24h: Decimal,
    pub volume_24h: Decimal,
    pub market_cap: Decimal,
}

impl PriceUpdate {
    pub fn into_message(self) -> OutboundMessage {
        OutboundMessage::new("price_update", self)
    }
}

/// Lifecycle stage a trade update announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Filled,
    Closed,
    Liquidated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeUpdate {
    pub trade_id: OrderId,
    pub wallet: Wallet,
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
    pub price: Price,
    pub leverage: Leverage,
    pub status: TradeStatus,
}

impl TradeUpdate {
    pub fn into_message(self) -> OutboundMessage {
        OutboundMessage::new("trade_update", self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub position_id: PositionId,
    pub pnl: Quote,
    pub status: PositionStatus,
}

impl PositionUpdate {
    pub fn into_message(self) -> OutboundMessage {
        OutboundMessage::new("position_update", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAlert {
    pub level: AlertLevel,
    pub score: Decimal,
    pub message: String,
}

impl RiskAlert {
    pub fn into_message(self) -> OutboundMessage {
        OutboundMessage::new("risk_alert", self)
    }
}

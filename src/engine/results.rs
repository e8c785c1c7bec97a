// 11.0.2: result types and errors for engine operations.

use crate::ledger::LedgerError;
use crate::oracle::OracleError;
use crate::order::Order;
use crate::position::Position;
use crate::risk::RiskAssessment;
use crate::types::{PositionId, Quote, Symbol, Wallet};

/// How an order admission resolved. Every branch is an expected outcome, not
/// an error: rejections and failed fills are part of normal operation.
#[derive(Debug, Clone)]
pub enum OrderOutcome {
    /// The risk validator refused the order. Nothing was executed or persisted.
    Rejected(RiskAssessment),
    /// The order reached execution and failed there; `failure_reason` says why.
    Failed(Order),
    /// Filled: the ledger settled and a position is open.
    Filled {
        order: Order,
        position: Position,
        risk: RiskAssessment,
    },
}

/// A successful position close.
#[derive(Debug, Clone)]
pub struct PositionResult {
    pub position: Position,
    pub final_pnl: Quote,
    /// Net quote-asset balance change from settlement. Negative for a short
    /// whose buy-back cost exceeded the pnl.
    pub proceeds: Quote,
}

/// Summary of one liquidation-monitor sweep.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub symbols_quoted: usize,
    pub symbols_skipped: Vec<Symbol>,
    pub positions_checked: usize,
    pub liquidated: Vec<PositionId>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    #[error("position {0} not found")]
    PositionNotFound(PositionId),

    #[error("position {position} is not owned by {wallet}")]
    Unauthorized {
        position: PositionId,
        wallet: Wallet,
    },

    /// The benign outcome of losing the close/liquidate race: someone else
    /// already drove this position to a terminal state.
    #[error("position {0} already closed")]
    AlreadyClosed(PositionId),

    #[error("upstream unavailable: {0}")]
    Upstream(#[from] OracleError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

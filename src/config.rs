// 10.0 config.rs: all settings in one place. risk limits, execution model, monitor cadence.
// defaults mirror the sandbox environment this engine simulates.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Leverage;

// 10.1: risk validator and profile settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    // Base position size limit, scaled by the wallet's risk score
    pub base_position_limit: Decimal,
    // Ceiling for position notional used in composite scoring
    pub max_position_notional: Decimal,
    // Hard leverage cap
    pub max_leverage: Leverage,
    // Volatility considered "full risk" in composite scoring
    pub volatility_threshold: Decimal,
    // Number of recent price samples for the volatility window
    pub volatility_window: usize,
    // Composite score above which a risk alert is published
    pub alert_score: Decimal,
    // Risk score bounds and per-outcome step
    pub score_floor: Decimal,
    pub score_ceiling: Decimal,
    pub score_step: Decimal,
    pub default_score: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_position_limit: dec!(1000),
            max_position_notional: dec!(100_000),
            max_leverage: Leverage::new(dec!(5)).unwrap(),
            volatility_threshold: dec!(0.5),
            volatility_window: 24,
            alert_score: dec!(70),
            score_floor: dec!(0.5),
            score_ceiling: dec!(1.0),
            score_step: dec!(0.05),
            default_score: dec!(0.8),
        }
    }
}

// 10.2: simulated execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    // Probability a submitted order fills (the rest fail on liquidity)
    pub fill_success_rate: f64,
    // Simulated processing latency bounds in milliseconds
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    // Margin fraction that fixes the liquidation price at open
    pub liquidation_margin: Decimal,
    // Upper bound on any single oracle call
    pub oracle_timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fill_success_rate: 0.9,
            min_latency_ms: 10,
            max_latency_ms: 50,
            liquidation_margin: dec!(0.2),
            oracle_timeout_ms: 2_000,
        }
    }
}

// 10.3: liquidation monitor cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub tick_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
        }
    }
}

// 10.4: the complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub risk: RiskConfig,
    pub execution: ExecutionConfig,
    pub monitor: MonitorConfig,
    // Asset all positions settle in
    pub quote_asset: String,
    // Balances granted when a wallet first touches the ledger
    pub seed_balances: Vec<(String, Decimal)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk: RiskConfig::default(),
            execution: ExecutionConfig::default(),
            monitor: MonitorConfig::default(),
            quote_asset: "USDT".to_string(),
            seed_balances: vec![
                ("USDT".to_string(), dec!(10_000)),
                ("PEPE".to_string(), dec!(1_000_000)),
                ("DOGE".to_string(), dec!(10_000)),
            ],
        }
    }
}

impl EngineConfig {
    // Generous sandbox: bigger limits, instant fills, frequent ticks
    pub fn sandbox() -> Self {
        let mut config = Self::default();
        config.risk.base_position_limit = dec!(10_000);
        config.execution.min_latency_ms = 0;
        config.execution.max_latency_ms = 5;
        config.monitor.tick_interval_ms = 250;
        config
    }

    // Conservative preset: tighter leverage, earlier liquidation
    pub fn conservative() -> Self {
        let mut config = Self::default();
        config.risk.max_leverage = Leverage::new(dec!(3)).unwrap();
        config.risk.alert_score = dec!(50);
        config.execution.liquidation_margin = dec!(0.1);
        config
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.risk.score_floor >= self.risk.score_ceiling {
            return Err(ConfigError::InvalidRisk {
                reason: "score floor must be below ceiling".to_string(),
            });
        }

        if self.risk.default_score < self.risk.score_floor
            || self.risk.default_score > self.risk.score_ceiling
        {
            return Err(ConfigError::InvalidRisk {
                reason: "default score must sit within the bounds".to_string(),
            });
        }

        if self.risk.base_position_limit <= Decimal::ZERO {
            return Err(ConfigError::InvalidRisk {
                reason: "base position limit must be positive".to_string(),
            });
        }

        if self.risk.volatility_window < 2 {
            return Err(ConfigError::InvalidRisk {
                reason: "volatility window needs at least 2 samples".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.execution.fill_success_rate) {
            return Err(ConfigError::InvalidExecution {
                reason: "fill success rate must be in [0, 1]".to_string(),
            });
        }

        if self.execution.min_latency_ms > self.execution.max_latency_ms {
            return Err(ConfigError::InvalidExecution {
                reason: "min latency exceeds max latency".to_string(),
            });
        }

        // margin fraction of 1 or more would put the liquidation price at or below zero
        if self.execution.liquidation_margin <= Decimal::ZERO
            || self.execution.liquidation_margin >= Decimal::ONE
        {
            return Err(ConfigError::InvalidExecution {
                reason: "liquidation margin must be between 0 and 1".to_string(),
            });
        }

        if self.monitor.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidMonitor {
                reason: "tick interval must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid risk config: {reason}")]
    InvalidRisk { reason: String },

    #[error("invalid execution config: {reason}")]
    InvalidExecution { reason: String },

    #[error("invalid monitor config: {reason}")]
    InvalidMonitor { reason: String },
}

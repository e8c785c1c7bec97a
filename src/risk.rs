//! Risk scoring and order admission limits.
//!
//! Two layers: a per-wallet risk profile (a bounded score earned through past
//! position outcomes, scaling how large this wallet may trade) and a
//! per-order composite risk score combining notional, leverage and recent
//! price volatility. The scoring math is pure so property tests can pin it.

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::config::RiskConfig;
use crate::types::{Leverage, Price, Wallet};

/// How a closed position ended, from the profile's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionOutcome {
    Profit,
    Loss,
    Flat,
}

/// Verdict on one order: whether it may proceed, and the numbers behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub accepted: bool,
    pub max_position: Decimal,
    pub max_leverage: Leverage,
    /// Composite 0-100 score for this order.
    pub risk_score: Decimal,
    pub reason: Option<String>,
}

/// Per-wallet risk scores, clamped to the configured bounds.
#[derive(Debug)]
pub struct RiskProfileBook {
    scores: RwLock<HashMap<Wallet, Decimal>>,
    config: RiskConfig,
}

impl RiskProfileBook {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            scores: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub async fn score(&self, wallet: &Wallet) -> Decimal {
        self.scores
            .read()
            .await
            .get(wallet)
            .copied()
            .unwrap_or(self.config.default_score)
    }

    /// Nudge the wallet's score after a position resolves. Wins raise it,
    /// losses lower it, always clamped to the bounds. Returns the new score.
    pub async fn record_outcome(&self, wallet: &Wallet, outcome: PositionOutcome) -> Decimal {
        let mut scores = self.scores.write().await;
        let current = scores
            .get(wallet)
            .copied()
            .unwrap_or(self.config.default_score);
        let updated = adjusted_score(current, outcome, &self.config);
        scores.insert(wallet.clone(), updated);
        updated
    }
}

/// Pure score adjustment: one step toward the bound, never past it.
pub fn adjusted_score(current: Decimal, outcome: PositionOutcome, config: &RiskConfig) -> Decimal {
    let stepped = match outcome {
        PositionOutcome::Profit => current + config.score_step,
        PositionOutcome::Loss => current - config.score_step,
        PositionOutcome::Flat => current,
    };
    stepped.clamp(config.score_floor, config.score_ceiling)
}

/// Standard deviation of consecutive returns over a price sample window.
/// Fewer than two samples, or a zero price in the window, contribute nothing.
pub fn volatility(prices: &[Decimal]) -> Decimal {
    if prices.len() < 2 {
        return Decimal::ZERO;
    }

    let returns: Vec<Decimal> = prices
        .windows(2)
        .filter(|w| !w[0].is_zero())
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();

    if returns.is_empty() {
        return Decimal::ZERO;
    }

    let n = Decimal::from(returns.len());
    let mean = returns.iter().sum::<Decimal>() / n;
    let variance = returns
        .iter()
        .map(|r| {
            let d = *r - mean;
            d * d
        })
        .sum::<Decimal>()
        / n;

    variance.sqrt().unwrap_or(Decimal::ZERO)
}

/// Composite 0-100 risk score: 30% position notional, 40% leverage,
/// 30% recent volatility, each normalized against its configured ceiling.
pub fn composite_score(
    notional: Decimal,
    leverage: Leverage,
    volatility: Decimal,
    config: &RiskConfig,
) -> Decimal {
    let notional_part = notional / config.max_position_notional * Decimal::from(30);
    let leverage_part = leverage.value() / config.max_leverage.value() * Decimal::from(40);
    let volatility_part = volatility / config.volatility_threshold * Decimal::from(30);

    (notional_part + leverage_part + volatility_part).min(Decimal::ONE_HUNDRED)
}

/// Validate one order against the wallet's limits. `profile_score` comes from
/// the wallet's RiskProfileBook entry, `recent_prices` from the oracle.
pub fn assess_order(
    profile_score: Decimal,
    size: Decimal,
    leverage: Leverage,
    current_price: Price,
    recent_prices: &[Decimal],
    config: &RiskConfig,
) -> RiskAssessment {
    let max_position = config.base_position_limit * profile_score;
    let vol = volatility(recent_prices);
    let notional = size * current_price.value();
    let risk_score = composite_score(notional, leverage, vol, config);

    let reason = if size > max_position {
        Some(format!(
            "size {size} exceeds position limit {max_position}"
        ))
    } else if leverage > config.max_leverage {
        Some(format!(
            "leverage {leverage} exceeds maximum {}",
            config.max_leverage
        ))
    } else {
        None
    };

    RiskAssessment {
        accepted: reason.is_none(),
        max_position,
        max_leverage: config.max_leverage,
        risk_score,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> RiskConfig {
        RiskConfig::default()
    }

    #[tokio::test]
    async fn unknown_wallet_gets_default_score() {
        let book = RiskProfileBook::new(config());
        let score = book.score(&Wallet::new("inj1new")).await;
        assert_eq!(score, dec!(0.8));
    }

    #[tokio::test]
    async fn outcomes_nudge_and_clamp() {
        let book = RiskProfileBook::new(config());
        let w = Wallet::new("inj1trader");

        assert_eq!(book.record_outcome(&w, PositionOutcome::Profit).await, dec!(0.85));
        assert_eq!(book.record_outcome(&w, PositionOutcome::Loss).await, dec!(0.80));

        // ten straight wins pin at the ceiling
        for _ in 0..10 {
            book.record_outcome(&w, PositionOutcome::Profit).await;
        }
        assert_eq!(book.score(&w).await, dec!(1.0));

        // twenty straight losses pin at the floor
        for _ in 0..20 {
            book.record_outcome(&w, PositionOutcome::Loss).await;
        }
        assert_eq!(book.score(&w).await, dec!(0.5));
    }

    #[test]
    fn flat_outcome_leaves_score_alone() {
        let score = adjusted_score(dec!(0.75), PositionOutcome::Flat, &config());
        assert_eq!(score, dec!(0.75));
    }

    #[test]
    fn volatility_of_constant_series_is_zero() {
        let prices = vec![dec!(1.0); 10];
        assert_eq!(volatility(&prices), Decimal::ZERO);
    }

    #[test]
    fn volatility_needs_two_samples() {
        assert_eq!(volatility(&[]), Decimal::ZERO);
        assert_eq!(volatility(&[dec!(1.0)]), Decimal::ZERO);
    }

    #[test]
    fn volatility_grows_with_swing() {
        let calm = vec![dec!(1.00), dec!(1.01), dec!(1.00), dec!(1.01)];
        let wild = vec![dec!(1.00), dec!(1.30), dec!(0.80), dec!(1.25)];
        assert!(volatility(&wild) > volatility(&calm));
    }

    #[test]
    fn composite_score_caps_at_hundred() {
        let score = composite_score(
            dec!(10_000_000),
            Leverage::new(dec!(5)).unwrap(),
            dec!(5),
            &config(),
        );
        assert_eq!(score, dec!(100));
    }

    #[test]
    fn oversized_order_rejected_with_reason() {
        // score 0.8 -> limit 800
        let assessment = assess_order(
            dec!(0.8),
            dec!(900),
            Leverage::one(),
            Price::new_unchecked(dec!(1.0)),
            &[],
            &config(),
        );
        assert!(!assessment.accepted);
        assert_eq!(assessment.max_position, dec!(800.0));
        assert!(assessment.reason.unwrap().contains("position limit"));
    }

    #[test]
    fn excess_leverage_rejected() {
        let assessment = assess_order(
            dec!(0.8),
            dec!(10),
            Leverage::new(dec!(8)).unwrap(),
            Price::new_unchecked(dec!(1.0)),
            &[],
            &config(),
        );
        assert!(!assessment.accepted);
        assert!(assessment.reason.unwrap().contains("leverage"));
    }

    #[test]
    fn modest_order_accepted() {
        let assessment = assess_order(
            dec!(0.8),
            dec!(100),
            Leverage::new(dec!(2)).unwrap(),
            Price::new_unchecked(dec!(1.0)),
            &[dec!(1.0), dec!(1.01), dec!(0.99)],
            &config(),
        );
        assert!(assessment.accepted);
        assert!(assessment.reason.is_none());
        assert!(assessment.risk_score >= Decimal::ZERO);
        assert!(assessment.risk_score <= dec!(100));
    }
}

// 6.0: price oracle integration. the engine is agnostic to where prices come
// from; it sees a trait. the simulated oracle drives a seeded random walk per
// token and keeps the sample history the risk validator needs for volatility.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::types::{Price, Symbol, Timestamp};

/// One observation of a token's market state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: Symbol,
    pub price: Price,
    pub change_24h: Decimal,
    pub volume_24h: Decimal,
    pub market_cap: Decimal,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("no price available for {0}")]
    Unavailable(Symbol),

    #[error("price source timed out")]
    Timeout,
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Tokens this oracle can quote.
    async fn symbols(&self) -> Vec<Symbol>;

    /// Current quote for a token. May fail or be slow; callers bound it with
    /// a timeout and treat failure as retryable.
    async fn quote(&self, symbol: &Symbol) -> Result<PriceQuote, OracleError>;

    /// Up to `n` most recent observed prices, oldest first.
    async fn recent_prices(&self, symbol: &Symbol, n: usize) -> Vec<Decimal>;
}

// 6.1: simulated token universe.

/// Static description of one simulated token.
#[derive(Debug, Clone)]
pub struct TokenSpec {
    pub symbol: Symbol,
    pub start_price: Decimal,
    // max fractional move per observation, e.g. 0.02 for +-2%
    pub volatility: f64,
    pub volume_24h: Decimal,
    pub market_cap: Decimal,
}

impl TokenSpec {
    pub fn new(
        symbol: impl Into<String>,
        start_price: Decimal,
        volatility: f64,
        volume_24h: Decimal,
        market_cap: Decimal,
    ) -> Self {
        Self {
            symbol: Symbol::new(symbol),
            start_price,
            volatility,
            volume_24h,
            market_cap,
        }
    }
}

#[derive(Debug)]
struct TokenState {
    spec: TokenSpec,
    price: Decimal,
    history: VecDeque<Decimal>,
}

const HISTORY_CAP: usize = 288;

/// Seeded random-walk oracle. Every `quote` call is a fresh observation: the
/// walk advances one step and the sample lands in the history buffer.
#[derive(Debug)]
pub struct SimulatedOracle {
    state: Mutex<OracleState>,
}

#[derive(Debug)]
struct OracleState {
    tokens: HashMap<Symbol, TokenState>,
    rng: StdRng,
}

impl SimulatedOracle {
    pub fn new(specs: Vec<TokenSpec>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tokens = HashMap::new();

        for spec in specs {
            let mut state = TokenState {
                price: spec.start_price,
                history: VecDeque::with_capacity(HISTORY_CAP),
                spec,
            };
            // pre-walk a full volatility window so scoring works from the start
            for _ in 0..24 {
                step_walk(&mut state, &mut rng);
            }
            tokens.insert(state.spec.symbol.clone(), state);
        }

        Self {
            state: Mutex::new(OracleState { tokens, rng }),
        }
    }

    /// The default meme-token universe the sandbox trades against.
    pub fn meme_market(seed: u64) -> Self {
        use rust_decimal_macros::dec;
        Self::new(
            vec![
                TokenSpec::new("PEPE", dec!(1.0), 0.02, dec!(4_500_000), dec!(420_000_000)),
                TokenSpec::new("DOGE", dec!(0.32), 0.01, dec!(950_000_000), dec!(46_000_000_000)),
                TokenSpec::new("SHIB", dec!(0.000018), 0.015, dec!(320_000_000), dec!(10_500_000_000)),
            ],
            seed,
        )
    }
}

fn step_walk(state: &mut TokenState, rng: &mut StdRng) -> Decimal {
    let delta = rng.gen_range(-state.spec.volatility..=state.spec.volatility);
    let factor = Decimal::ONE + Decimal::from_f64(delta).unwrap_or(Decimal::ZERO);
    let next = (state.price * factor).max(Decimal::new(1, 12));

    state.price = next;
    state.history.push_back(next);
    while state.history.len() > HISTORY_CAP {
        state.history.pop_front();
    }
    next
}

#[async_trait]
impl PriceOracle for SimulatedOracle {
    async fn symbols(&self) -> Vec<Symbol> {
        let state = self.state.lock().expect("oracle state poisoned");
        let mut symbols: Vec<Symbol> = state.tokens.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    async fn quote(&self, symbol: &Symbol) -> Result<PriceQuote, OracleError> {
        let mut state = self.state.lock().expect("oracle state poisoned");
        let OracleState { tokens, rng } = &mut *state;

        let token = tokens
            .get_mut(symbol)
            .ok_or_else(|| OracleError::Unavailable(symbol.clone()))?;

        let price = step_walk(token, rng);
        let oldest = token.history.front().copied().unwrap_or(price);
        let change_24h = if oldest.is_zero() {
            Decimal::ZERO
        } else {
            (price - oldest) / oldest * Decimal::ONE_HUNDRED
        };

        Ok(PriceQuote {
            symbol: symbol.clone(),
            price: Price::new_unchecked(price),
            change_24h,
            volume_24h: token.spec.volume_24h,
            market_cap: token.spec.market_cap,
            timestamp: Timestamp::now(),
        })
    }

    async fn recent_prices(&self, symbol: &Symbol, n: usize) -> Vec<Decimal> {
        let state = self.state.lock().expect("oracle state poisoned");
        match state.tokens.get(symbol) {
            Some(token) => {
                let skip = token.history.len().saturating_sub(n);
                token.history.iter().skip(skip).copied().collect()
            }
            None => Vec::new(),
        }
    }
}

// 6.2: fixed-price oracle for tests. prices move only when told to.
#[derive(Debug)]
pub struct StaticOracle {
    inner: Mutex<StaticState>,
}

impl Default for StaticOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct StaticState {
    prices: HashMap<Symbol, Decimal>,
    history: HashMap<Symbol, Vec<Decimal>>,
    available: bool,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StaticState {
                prices: HashMap::new(),
                history: HashMap::new(),
                available: true,
            }),
        }
    }

    pub fn set_price(&self, symbol: &Symbol, price: Decimal) {
        let mut state = self.inner.lock().expect("oracle state poisoned");
        state.prices.insert(symbol.clone(), price);
        state.history.entry(symbol.clone()).or_default().push(price);
    }

    pub fn set_history(&self, symbol: &Symbol, prices: Vec<Decimal>) {
        let mut state = self.inner.lock().expect("oracle state poisoned");
        state.history.insert(symbol.clone(), prices);
    }

    pub fn set_available(&self, available: bool) {
        self.inner.lock().expect("oracle state poisoned").available = available;
    }
}

#[async_trait]
impl PriceOracle for StaticOracle {
    async fn symbols(&self) -> Vec<Symbol> {
        let state = self.inner.lock().expect("oracle state poisoned");
        let mut symbols: Vec<Symbol> = state.prices.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    async fn quote(&self, symbol: &Symbol) -> Result<PriceQuote, OracleError> {
        let state = self.inner.lock().expect("oracle state poisoned");
        if !state.available {
            return Err(OracleError::Unavailable(symbol.clone()));
        }
        let price = state
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| OracleError::Unavailable(symbol.clone()))?;

        Ok(PriceQuote {
            symbol: symbol.clone(),
            price: Price::new_unchecked(price),
            change_24h: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            market_cap: Decimal::ZERO,
            timestamp: Timestamp::now(),
        })
    }

    async fn recent_prices(&self, symbol: &Symbol, n: usize) -> Vec<Decimal> {
        let state = self.inner.lock().expect("oracle state poisoned");
        match state.history.get(symbol) {
            Some(history) => {
                let skip = history.len().saturating_sub(n);
                history[skip..].to_vec()
            }
            None => Vec::new(),
        }
    }
}

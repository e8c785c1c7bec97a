// 5.0: simulated fill outcomes. the engine never rolls dice itself; it asks a
// FillSource, so tests swap in a deterministic one and the sim seeds its rng.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    Filled,
    // the simulated pool had no depth for this order
    Rejected,
}

/// Source of simulated fill results and processing latency.
pub trait FillSource: Send + Sync {
    fn next_outcome(&self) -> FillOutcome;
    fn latency(&self) -> Duration;
}

// 5.1: the production source. success with a fixed probability, latency drawn
// uniformly from the configured bounds.
#[derive(Debug)]
pub struct RandomFills {
    success_rate: f64,
    min_latency_ms: u64,
    max_latency_ms: u64,
    rng: Mutex<StdRng>,
}

impl RandomFills {
    pub fn new(success_rate: f64, min_latency_ms: u64, max_latency_ms: u64) -> Self {
        Self::with_seed(success_rate, min_latency_ms, max_latency_ms, rand::random())
    }

    pub fn with_seed(
        success_rate: f64,
        min_latency_ms: u64,
        max_latency_ms: u64,
        seed: u64,
    ) -> Self {
        debug_assert!((0.0..=1.0).contains(&success_rate));
        Self {
            success_rate,
            min_latency_ms,
            max_latency_ms,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl FillSource for RandomFills {
    fn next_outcome(&self) -> FillOutcome {
        let mut rng = self.rng.lock().expect("fill rng poisoned");
        if rng.gen::<f64>() < self.success_rate {
            FillOutcome::Filled
        } else {
            FillOutcome::Rejected
        }
    }

    fn latency(&self) -> Duration {
        let mut rng = self.rng.lock().expect("fill rng poisoned");
        let ms = rng.gen_range(self.min_latency_ms..=self.max_latency_ms);
        Duration::from_millis(ms)
    }
}

// 5.2: deterministic source for tests. always the same outcome, zero latency.
#[derive(Debug, Clone, Copy)]
pub struct FixedFills {
    outcome: FillOutcome,
}

impl FixedFills {
    pub fn always_filled() -> Self {
        Self {
            outcome: FillOutcome::Filled,
        }
    }

    pub fn always_rejected() -> Self {
        Self {
            outcome: FillOutcome::Rejected,
        }
    }
}

impl FillSource for FixedFills {
    fn next_outcome(&self) -> FillOutcome {
        self.outcome
    }

    fn latency(&self) -> Duration {
        Duration::ZERO
    }
}

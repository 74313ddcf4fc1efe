//! Lag samplers used by the delay stage.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;

/// Source of replication lag values.
pub trait LagSampler: Send {
    /// Draw a lag in `[0, max_lag)`. A zero bound yields zero.
    fn sample(&mut self, max_lag: Duration) -> Duration;
}

/// Uniform lag drawn from a seedable RNG.
#[derive(Debug)]
pub struct UniformLag {
    rng: StdRng,
}

impl UniformLag {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible draws for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl LagSampler for UniformLag {
    fn sample(&mut self, max_lag: Duration) -> Duration {
        let upper = u64::try_from(max_lag.as_nanos()).unwrap_or(u64::MAX);
        if upper == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.rng.gen_range(0..upper))
    }
}

/// Replays a fixed list of lags, then `fallback` once the list runs out.
/// The bound passed to `sample` is ignored so tests can pin exact delays.
#[derive(Clone, Debug, Default)]
pub struct ScriptedLag {
    script: VecDeque<Duration>,
    fallback: Duration,
}

impl ScriptedLag {
    pub fn new(script: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: Duration::ZERO,
        }
    }

    /// Convenience for millisecond scripts.
    pub fn from_millis(script: impl IntoIterator<Item = u64>) -> Self {
        Self::new(script.into_iter().map(Duration::from_millis))
    }

    pub fn with_fallback(mut self, fallback: Duration) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl LagSampler for ScriptedLag {
    fn sample(&mut self, _max_lag: Duration) -> Duration {
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_lag_stays_below_bound() {
        let mut sampler = UniformLag::seeded(7);
        let bound = Duration::from_millis(250);

        for _ in 0..1_000 {
            assert!(sampler.sample(bound) < bound);
        }
    }

    #[test]
    fn test_zero_bound_yields_zero() {
        let mut sampler = UniformLag::from_entropy();
        assert_eq!(sampler.sample(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_same_seed_same_draws() {
        let bound = Duration::from_secs(300);
        let mut a = UniformLag::seeded(12345);
        let mut b = UniformLag::seeded(12345);

        let draws_a: Vec<_> = (0..20).map(|_| a.sample(bound)).collect();
        let draws_b: Vec<_> = (0..20).map(|_| b.sample(bound)).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_scripted_lag_replays_then_falls_back() {
        let mut sampler =
            ScriptedLag::from_millis([50, 10]).with_fallback(Duration::from_millis(5));

        assert_eq!(sampler.remaining(), 2);
        assert_eq!(sampler.sample(Duration::ZERO), Duration::from_millis(50));
        assert_eq!(sampler.sample(Duration::ZERO), Duration::from_millis(10));
        assert_eq!(sampler.sample(Duration::ZERO), Duration::from_millis(5));
    }
}

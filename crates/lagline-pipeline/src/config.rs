//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the delay stage draws the lag applied to each delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LagStrategy {
    /// A fresh draw for every delivery.
    #[default]
    PerDelivery,
    /// One draw when the stage starts, applied to every delivery.
    FixedAtStartup,
}

impl std::fmt::Display for LagStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LagStrategy::PerDelivery => write!(f, "per-delivery"),
            LagStrategy::FixedAtStartup => write!(f, "fixed-at-startup"),
        }
    }
}

/// Timing and channel settings for a pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How often the source generates a record (in milliseconds).
    pub feed_interval_ms: u64,
    /// Upper bound (exclusive) of the replication lag (in milliseconds).
    pub max_lag_ms: u64,
    /// How often the poller reads the accumulator (in milliseconds).
    pub poll_interval_ms: u64,
    /// Lag draw strategy.
    pub lag_strategy: LagStrategy,
    /// Seed for the lag sampler; `None` seeds from entropy.
    pub lag_seed: Option<u64>,
    /// Capacity of the broadcast channels handed to external observers.
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feed_interval_ms: 30_000,
            max_lag_ms: 5 * 60_000,
            poll_interval_ms: 30_000,
            lag_strategy: LagStrategy::PerDelivery,
            lag_seed: None,
            event_capacity: 100,
        }
    }
}

impl PipelineConfig {
    pub fn feed_interval(&self) -> Duration {
        Duration::from_millis(self.feed_interval_ms.max(1))
    }

    pub fn max_lag(&self) -> Duration {
        Duration::from_millis(self.max_lag_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn event_capacity(&self) -> usize {
        self.event_capacity.max(1)
    }
}

/// Builder for pipeline configuration.
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn feed_interval(mut self, ms: u64) -> Self {
        self.config.feed_interval_ms = ms;
        self
    }

    pub fn max_lag(mut self, ms: u64) -> Self {
        self.config.max_lag_ms = ms;
        self
    }

    pub fn poll_interval(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn lag_strategy(mut self, strategy: LagStrategy) -> Self {
        self.config.lag_strategy = strategy;
        self
    }

    pub fn lag_seed(mut self, seed: u64) -> Self {
        self.config.lag_seed = Some(seed);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Explicit wiring of the four stages around one shared mode store.

use crate::accumulator::Accumulator;
use crate::config::PipelineConfig;
use crate::delay::DelayStage;
use crate::lag::{LagSampler, UniformLag};
use crate::mode::ModeStore;
use crate::poller::{Poller, PollerEvent};
use crate::source::SourceFeed;
use lagline_core::Mode;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A running `source -> delay -> accumulator -> poller` chain.
///
/// Must be started from within a tokio runtime. Dropping the pipeline stops
/// the stage tasks; deliveries already scheduled still fire.
pub struct Pipeline {
    mode: Arc<ModeStore>,
    source: Arc<SourceFeed>,
    delay: Arc<DelayStage>,
    accumulator: Arc<Accumulator>,
    poller: Arc<Poller>,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Start with a uniform lag sampler seeded from the config.
    pub fn start(config: PipelineConfig) -> Self {
        let sampler = match config.lag_seed {
            Some(seed) => UniformLag::seeded(seed),
            None => UniformLag::from_entropy(),
        };
        Self::start_with_sampler(config, Box::new(sampler))
    }

    /// Start with a caller-supplied lag sampler.
    pub fn start_with_sampler(config: PipelineConfig, sampler: Box<dyn LagSampler>) -> Self {
        let mode = Arc::new(ModeStore::new());
        let source = Arc::new(SourceFeed::new());
        let delay = DelayStage::new(config.max_lag(), config.lag_strategy, sampler);
        let accumulator = Accumulator::new(mode.clone(), config.event_capacity());
        let poller = Poller::new(config.poll_interval(), config.event_capacity());

        let mut tasks = Vec::with_capacity(4);
        match delay.attach(&*source) {
            Ok(task) => tasks.push(task),
            Err(err) => warn!(error = %err, "delay stage not attached"),
        }
        match accumulator.attach(&*delay) {
            Ok(task) => tasks.push(task),
            Err(err) => warn!(error = %err, "accumulator degraded at startup"),
        }
        tasks.push(poller.start(accumulator.clone()));
        tasks.push(source.start(config.feed_interval()));

        info!(
            feed_interval_ms = config.feed_interval_ms,
            max_lag_ms = config.max_lag_ms,
            poll_interval_ms = config.poll_interval_ms,
            lag_strategy = %config.lag_strategy,
            mode = %mode.mode(),
            "pipeline started"
        );

        Self {
            mode,
            source,
            delay,
            accumulator,
            poller,
            tasks,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn mode_store(&self) -> &Arc<ModeStore> {
        &self.mode
    }

    pub fn source(&self) -> &Arc<SourceFeed> {
        &self.source
    }

    pub fn delay(&self) -> &Arc<DelayStage> {
        &self.delay
    }

    pub fn accumulator(&self) -> &Arc<Accumulator> {
        &self.accumulator
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    /// The data-fetched stream handed to external viewers.
    pub fn subscribe_data_fetched(&self) -> broadcast::Receiver<PollerEvent> {
        self.poller.subscribe()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::AccumulatorState;
    use crate::config::PipelineConfigBuilder;
    use crate::lag::ScriptedLag;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_goes_live_after_first_delivery() {
        let config = PipelineConfigBuilder::new()
            .feed_interval(1_000)
            .max_lag(10_000)
            .poll_interval(1_000)
            .build();
        let pipeline = Pipeline::start_with_sampler(
            config,
            Box::new(ScriptedLag::from_millis([5_000, 500])),
        );
        let mut fetched = pipeline.subscribe_data_fetched();

        assert_eq!(pipeline.mode(), Mode::Boot);

        // Emission 1 at 1s (lag 5s), emission 2 at 2s (lag 0.5s): the
        // second one lands first at 2.5s.
        let first = pipeline.accumulator().first_load().await;
        assert_eq!(first.generation(), 2);
        assert_eq!(pipeline.mode(), Mode::Live);
        assert_eq!(pipeline.accumulator().state(), AccumulatorState::Loaded);

        let event = fetched.recv().await.unwrap();
        assert_eq!(event.tick(), 1);
        assert!(!event.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_pipeline_reaches_live() {
        let config = PipelineConfigBuilder::new()
            .feed_interval(100)
            .max_lag(1_000)
            .poll_interval(100)
            .lag_seed(7)
            .build();
        let pipeline = Pipeline::start(config);

        pipeline.mode_store().wait_for(Mode::Live).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(pipeline.source().generation() >= 40);
        assert!(pipeline.delay().released() > 0);
        assert!(pipeline.accumulator().deliveries() > 0);
        assert!(pipeline.poller().ticks() > 0);
    }
}

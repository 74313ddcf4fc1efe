//! Delay stage: re-emits every upstream snapshot after a random lag.
//!
//! Each delivery is scheduled on its own timer, so deliveries complete in
//! lag order rather than emission order. Nothing is coalesced or re-sorted.
//! The outgoing topic closes only when the upstream feed has ended and every
//! scheduled delivery has fired.

use crate::config::LagStrategy;
use crate::error::Result;
use crate::lag::LagSampler;
use crate::topic::{SnapshotFeed, Topic};
use lagline_core::Snapshot;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Progress {
    scheduled: u64,
    released: u64,
    in_flight: usize,
    upstream_done: bool,
}

pub struct DelayStage {
    topic: Topic<Snapshot>,
    max_lag: Duration,
    sampler: Mutex<Box<dyn LagSampler>>,
    fixed_lag: Option<Duration>,
    progress: Mutex<Progress>,
}

impl DelayStage {
    /// Create a stage. With [`LagStrategy::FixedAtStartup`] the single lag is
    /// drawn here. A zero `max_lag` never consults the sampler.
    pub fn new(
        max_lag: Duration,
        strategy: LagStrategy,
        mut sampler: Box<dyn LagSampler>,
    ) -> Arc<Self> {
        let fixed_lag = match strategy {
            LagStrategy::PerDelivery => None,
            LagStrategy::FixedAtStartup if max_lag.is_zero() => Some(Duration::ZERO),
            LagStrategy::FixedAtStartup => Some(sampler.sample(max_lag)),
        };
        if let Some(lag) = fixed_lag {
            debug!(lag_ms = lag.as_millis() as u64, "delay stage drew fixed lag");
        }

        Arc::new(Self {
            topic: Topic::new("delay"),
            max_lag,
            sampler: Mutex::new(sampler),
            fixed_lag,
            progress: Mutex::new(Progress::default()),
        })
    }

    /// Subscribe to `upstream` and schedule every snapshot it emits.
    ///
    /// If the upstream subscription fails the stage treats its input as
    /// finished, which closes its own topic.
    pub fn attach<F>(self: &Arc<Self>, upstream: &F) -> Result<JoinHandle<()>>
    where
        F: SnapshotFeed + ?Sized,
    {
        let mut rx = match upstream.subscribe() {
            Ok(rx) => rx,
            Err(err) => {
                warn!(error = %err, "delay stage could not subscribe upstream");
                self.finish_upstream();
                return Err(err);
            }
        };

        let stage = Arc::clone(self);
        Ok(tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                stage.schedule(snapshot);
            }
            debug!("delay stage upstream ended");
            stage.finish_upstream();
        }))
    }

    /// Schedule one delivery and return the lag it was given.
    pub fn schedule(self: &Arc<Self>, snapshot: Snapshot) -> Duration {
        let lag = self.next_lag();
        {
            let mut progress = self.progress.lock();
            progress.scheduled += 1;
            progress.in_flight += 1;
        }
        debug!(
            generation = snapshot.generation(),
            records = snapshot.len(),
            lag_ms = lag.as_millis() as u64,
            "delivery scheduled"
        );

        let stage = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(lag).await;
            stage.release(snapshot, lag);
        });

        lag
    }

    fn next_lag(&self) -> Duration {
        match self.fixed_lag {
            Some(lag) => lag,
            None if self.max_lag.is_zero() => Duration::ZERO,
            None => self.sampler.lock().sample(self.max_lag),
        }
    }

    fn release(&self, snapshot: Snapshot, lag: Duration) {
        let generation = snapshot.generation();
        let records = snapshot.len();
        let subscribers = self.topic.publish(snapshot);

        let drained = {
            let mut progress = self.progress.lock();
            progress.in_flight -= 1;
            progress.released += 1;
            progress.upstream_done && progress.in_flight == 0
        };
        debug!(
            generation,
            records,
            lag_ms = lag.as_millis() as u64,
            subscribers,
            "delivery released"
        );

        if drained {
            debug!("delay stage drained, closing");
            self.topic.close();
        }
    }

    fn finish_upstream(&self) {
        let drained = {
            let mut progress = self.progress.lock();
            progress.upstream_done = true;
            progress.in_flight == 0
        };
        if drained {
            self.topic.close();
        }
    }

    /// The single lag used by every delivery, for `FixedAtStartup`.
    pub fn fixed_lag(&self) -> Option<Duration> {
        self.fixed_lag
    }

    /// Deliveries scheduled but not yet released.
    pub fn in_flight(&self) -> usize {
        self.progress.lock().in_flight
    }

    pub fn scheduled(&self) -> u64 {
        self.progress.lock().scheduled
    }

    pub fn released(&self) -> u64 {
        self.progress.lock().released
    }

    pub fn is_closed(&self) -> bool {
        self.topic.is_closed()
    }
}

impl SnapshotFeed for DelayStage {
    fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<Snapshot>> {
        self.topic.subscribe()
    }
}

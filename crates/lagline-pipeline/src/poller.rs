//! Poller: republishes the accumulated view on a fixed period once the
//! first load has happened.

use async_trait::async_trait;
use chrono::Utc;
use lagline_core::{Millis, Snapshot};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

/// Read side of an accumulated view.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    /// Resolve once the view has been loaded for the first time.
    async fn wait_first_load(&self) -> Snapshot;

    /// Current view; waits for the first load if necessary.
    async fn get_data(&self) -> Snapshot;
}

/// Events emitted by the poller.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PollerEvent {
    /// The view was read on a poll tick.
    DataFetched {
        tick: u64,
        fetched_at_ms: Millis,
        snapshot: Snapshot,
    },
}

impl PollerEvent {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            PollerEvent::DataFetched { snapshot, .. } => snapshot,
        }
    }

    pub fn tick(&self) -> u64 {
        match self {
            PollerEvent::DataFetched { tick, .. } => *tick,
        }
    }
}

pub struct Poller {
    period: Duration,
    ticks: AtomicU64,
    event_tx: broadcast::Sender<PollerEvent>,
}

impl Poller {
    pub fn new(period: Duration, event_capacity: usize) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));
        Arc::new(Self {
            period,
            ticks: AtomicU64::new(0),
            event_tx,
        })
    }

    /// Wait for `source`'s first load, then poll it every period forever.
    /// The first poll happens one full period after the first load.
    pub fn start<S: SnapshotSource>(self: &Arc<Self>, source: Arc<S>) -> JoinHandle<()> {
        let poller = Arc::clone(self);
        tokio::spawn(async move {
            let first = source.wait_first_load().await;
            info!(
                records = first.len(),
                period_ms = poller.period.as_millis() as u64,
                "first load observed, polling started"
            );

            let mut ticker = interval_at(Instant::now() + poller.period, poller.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let snapshot = source.get_data().await;
                let tick = poller.ticks.fetch_add(1, Ordering::SeqCst) + 1;
                info!(
                    tick,
                    generation = snapshot.generation(),
                    records = snapshot.len(),
                    "poll fetched data"
                );

                let _ = poller.event_tx.send(PollerEvent::DataFetched {
                    tick,
                    fetched_at_ms: Utc::now().timestamp_millis(),
                    snapshot,
                });
            }
        })
    }

    /// Number of polls completed.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Subscribe to data-fetched events. Receivers that fall more than the
    /// channel capacity behind skip the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<PollerEvent> {
        self.event_tx.subscribe()
    }
}

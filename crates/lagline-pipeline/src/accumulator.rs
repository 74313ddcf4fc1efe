//! Accumulator: holds the latest released snapshot and gates the
//! `BOOT -> LIVE` transition on its first load.
//!
//! Every delivery replaces the buffer outright, in arrival order. A snapshot
//! generated earlier can therefore overwrite a larger one that happened to
//! arrive first; such regressions are counted, not corrected.
//!
//! Readers that arrive before the first load park on a wait-list of oneshot
//! senders. The first delivery drains the whole list in one pass, so every
//! early reader resolves, not only the first.

use crate::error::Result;
use crate::mode::ModeStore;
use crate::poller::SnapshotSource;
use crate::topic::SnapshotFeed;
use async_trait::async_trait;
use lagline_core::{Mode, Snapshot};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Load state of the accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccumulatorState {
    AwaitingFirstLoad,
    Loaded,
}

/// What a single delivery did to the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// First delivery ever: buffer stored, waiters released, mode flipped.
    FirstLoad,
    /// Buffer replaced by a different snapshot.
    Replaced,
    /// Identical snapshot delivered again.
    Unchanged,
}

/// Events emitted after each delivery.
#[derive(Clone, Debug)]
pub enum AccumulatorEvent {
    Applied {
        outcome: ApplyOutcome,
        generation: u64,
        records: usize,
        previous_generation: u64,
        previous_records: usize,
    },
}

struct Inner {
    state: AccumulatorState,
    buffer: Snapshot,
    waiters: Vec<oneshot::Sender<Snapshot>>,
    deliveries: u64,
    regressions: u64,
    degraded: bool,
}

pub struct Accumulator {
    mode: Arc<ModeStore>,
    inner: Mutex<Inner>,
    event_tx: broadcast::Sender<AccumulatorEvent>,
}

impl Accumulator {
    pub fn new(mode: Arc<ModeStore>, event_capacity: usize) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));

        Arc::new(Self {
            mode,
            inner: Mutex::new(Inner {
                state: AccumulatorState::AwaitingFirstLoad,
                buffer: Snapshot::empty(),
                waiters: Vec::new(),
                deliveries: 0,
                regressions: 0,
                degraded: false,
            }),
            event_tx,
        })
    }

    /// Subscribe to `feed` and apply every snapshot it releases.
    ///
    /// If the subscription cannot be established the mode is forced back to
    /// `BOOT` and the accumulator is marked degraded for good.
    pub fn attach<F>(self: &Arc<Self>, feed: &F) -> Result<JoinHandle<()>>
    where
        F: SnapshotFeed + ?Sized,
    {
        let mut rx = match feed.subscribe() {
            Ok(rx) => rx,
            Err(err) => {
                error!(error = %err, "accumulator failed to subscribe to deliveries");
                let mut inner = self.inner.lock();
                inner.degraded = true;
                self.mode.set_mode(Mode::Boot);
                return Err(err);
            }
        };

        let accumulator = Arc::clone(self);
        Ok(tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                accumulator.apply(snapshot);
            }
            debug!("accumulator delivery feed ended");
        }))
    }

    /// Apply one released snapshot.
    pub fn apply(&self, snapshot: Snapshot) -> ApplyOutcome {
        let mut inner = self.inner.lock();
        let previous = std::mem::replace(&mut inner.buffer, snapshot.clone());
        inner.deliveries += 1;

        info!(
            generation = snapshot.generation(),
            previous_records = previous.len(),
            records = snapshot.len(),
            "accumulator received delivery"
        );

        let outcome = match inner.state {
            AccumulatorState::AwaitingFirstLoad => {
                inner.state = AccumulatorState::Loaded;

                let waiters = std::mem::take(&mut inner.waiters);
                info!(
                    generation = snapshot.generation(),
                    records = snapshot.len(),
                    waiters = waiters.len(),
                    "first load complete"
                );
                for waiter in waiters {
                    let _ = waiter.send(snapshot.clone());
                }

                if self.mode.mode() == Mode::Boot {
                    self.mode.set_mode(Mode::Live);
                }
                ApplyOutcome::FirstLoad
            }
            AccumulatorState::Loaded if previous == snapshot => ApplyOutcome::Unchanged,
            AccumulatorState::Loaded => {
                if snapshot.len() < previous.len() {
                    inner.regressions += 1;
                    debug!(
                        generation = snapshot.generation(),
                        previous_generation = previous.generation(),
                        records = snapshot.len(),
                        previous_records = previous.len(),
                        "buffer regressed to an older snapshot"
                    );
                }
                ApplyOutcome::Replaced
            }
        };
        drop(inner);

        let _ = self.event_tx.send(AccumulatorEvent::Applied {
            outcome,
            generation: snapshot.generation(),
            records: snapshot.len(),
            previous_generation: previous.generation(),
            previous_records: previous.len(),
        });

        outcome
    }

    /// Wait for the first load. Callers parked before it resolve with the
    /// first-load snapshot; once loaded, returns the current buffer at once.
    pub async fn first_load(&self) -> Snapshot {
        let rx = {
            let mut inner = self.inner.lock();
            if inner.state == AccumulatorState::Loaded {
                return inner.buffer.clone();
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.push(tx);
            rx
        };

        match rx.await {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    /// Current buffer; waits for the first load if it has not happened yet.
    pub async fn get_data(&self) -> Snapshot {
        if let Some(snapshot) = self.try_get_data() {
            return snapshot;
        }

        debug!("waiting for first load to complete");
        self.first_load().await;
        self.snapshot()
    }

    /// Current buffer, or `None` before the first load.
    pub fn try_get_data(&self) -> Option<Snapshot> {
        let inner = self.inner.lock();
        match inner.state {
            AccumulatorState::Loaded => Some(inner.buffer.clone()),
            AccumulatorState::AwaitingFirstLoad => None,
        }
    }

    /// Current buffer without waiting (empty before the first load).
    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().buffer.clone()
    }

    pub fn state(&self) -> AccumulatorState {
        self.inner.lock().state
    }

    /// Number of deliveries applied.
    pub fn deliveries(&self) -> u64 {
        self.inner.lock().deliveries
    }

    /// Number of deliveries that shrank the buffer.
    pub fn regressions(&self) -> u64 {
        self.inner.lock().regressions
    }

    /// Readers currently parked on the first load.
    pub fn pending_readers(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// True once the delivery subscription has failed.
    pub fn is_degraded(&self) -> bool {
        self.inner.lock().degraded
    }

    pub fn mode_store(&self) -> &Arc<ModeStore> {
        &self.mode
    }

    /// Subscribe to per-delivery events.
    pub fn subscribe(&self) -> broadcast::Receiver<AccumulatorEvent> {
        self.event_tx.subscribe()
    }
}

#[async_trait]
impl SnapshotSource for Accumulator {
    async fn wait_first_load(&self) -> Snapshot {
        Accumulator::first_load(self).await
    }

    async fn get_data(&self) -> Snapshot {
        Accumulator::get_data(self).await
    }
}

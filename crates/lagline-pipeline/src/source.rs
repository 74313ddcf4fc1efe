//! Source feed: grows a record collection and emits it whole on every tick.

use crate::error::Result;
use crate::topic::{SnapshotFeed, Topic};
use chrono::Utc;
use lagline_core::{Millis, RecordId, RecordIdGenerator, Snapshot};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

struct FeedState {
    records: BTreeMap<RecordId, Millis>,
    ids: RecordIdGenerator,
    generation: u64,
    last_stamp: Millis,
    latest: Snapshot,
}

/// Produces cumulative snapshots: every emission holds every record
/// generated so far. The collection is never pruned.
pub struct SourceFeed {
    topic: Topic<Snapshot>,
    state: Mutex<FeedState>,
}

impl SourceFeed {
    pub fn new() -> Self {
        Self {
            topic: Topic::new("source"),
            state: Mutex::new(FeedState {
                records: BTreeMap::new(),
                ids: RecordIdGenerator::new(),
                generation: 0,
                last_stamp: Millis::MIN,
                latest: Snapshot::empty(),
            }),
        }
    }

    /// Generate one record and emit the full collection.
    ///
    /// Emission happens under the feed lock, so subscribers always see
    /// generations in increasing order.
    pub fn tick(&self) -> Result<Snapshot> {
        let mut state = self.state.lock();

        let id = loop {
            let id = state.ids.next_id()?;
            if !state.records.contains_key(&id) {
                break id;
            }
        };

        // Wall-clock steps backwards are flattened so stamps never decrease.
        let stamp = Utc::now().timestamp_millis().max(state.last_stamp);
        state.last_stamp = stamp;
        state.records.insert(id.clone(), stamp);
        state.generation += 1;

        let snapshot = Snapshot::new(state.generation, state.records.clone());
        state.latest = snapshot.clone();

        let subscribers = self.topic.publish(snapshot.clone());
        debug!(
            generation = snapshot.generation(),
            records = snapshot.len(),
            record_id = %id,
            subscribers,
            "source emitted snapshot"
        );

        Ok(snapshot)
    }

    /// Run `tick` every `period`, starting one period from now.
    pub fn start(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let feed = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if feed.topic.is_closed() {
                    debug!("source feed closed, ticker stopping");
                    break;
                }
                // Only id exhaustion fails a tick, which needs the 80-bit
                // random part to overflow within one millisecond.
                if let Err(err) = feed.tick() {
                    warn!(error = %err, "source tick skipped");
                }
            }
        })
    }

    /// Most recently emitted snapshot.
    pub fn latest(&self) -> Snapshot {
        self.state.lock().latest.clone()
    }

    /// Number of emissions so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Stop emitting. Downstream receivers end once drained.
    pub fn close(&self) {
        self.topic.close();
    }
}

impl Default for SourceFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotFeed for SourceFeed {
    fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<Snapshot>> {
        self.topic.subscribe()
    }
}

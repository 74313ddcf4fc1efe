//! Point-in-time view of every record known to a source.
//!
//! A snapshot is immutable once built: the record map sits behind an `Arc`
//! and consumers replace whole snapshots rather than editing them, so a
//! reader always sees a complete, untorn view.

use crate::record::{Millis, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Emission counter of the source that produced this snapshot (0 = empty).
    generation: u64,
    records: Arc<BTreeMap<RecordId, Millis>>,
}

impl Snapshot {
    pub fn new(generation: u64, records: BTreeMap<RecordId, Millis>) -> Self {
        Self {
            generation,
            records: Arc::new(records),
        }
    }

    /// The snapshot held before anything has been loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records<I, K>(generation: u64, records: I) -> Self
    where
        I: IntoIterator<Item = (K, Millis)>,
        K: Into<RecordId>,
    {
        Self::new(
            generation,
            records.into_iter().map(|(id, ts)| (id.into(), ts)).collect(),
        )
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Millis> {
        self.records.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, Millis)> {
        self.records.iter().map(|(id, ts)| (id, *ts))
    }

    /// True when every record of `other` is also present here.
    pub fn is_superset_of(&self, other: &Snapshot) -> bool {
        other.records.len() <= self.records.len()
            && other.records.keys().all(|id| self.records.contains_key(id))
    }

    /// Timestamp of the most recently generated record, if any.
    pub fn latest_timestamp(&self) -> Option<Millis> {
        self.records.values().copied().max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_generation_zero() {
        let snapshot = Snapshot::empty();
        assert_eq!(snapshot.generation(), 0);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.latest_timestamp(), None);
    }

    #[test]
    fn lookup_by_str() {
        let snapshot = Snapshot::from_records(2, [("a", 100), ("b", 200)]);

        assert_eq!(snapshot.get("a"), Some(100));
        assert_eq!(snapshot.get("c"), None);
        assert!(snapshot.contains("b"));
        assert_eq!(snapshot.latest_timestamp(), Some(200));
    }

    #[test]
    fn superset_relation() {
        let small = Snapshot::from_records(1, [("a", 100)]);
        let large = Snapshot::from_records(2, [("a", 100), ("b", 200)]);
        let other = Snapshot::from_records(2, [("c", 300)]);

        assert!(large.is_superset_of(&small));
        assert!(!small.is_superset_of(&large));
        assert!(!large.is_superset_of(&other));
        assert!(small.is_superset_of(&Snapshot::empty()));
    }

    #[test]
    fn serializes_records_as_json_object() {
        let snapshot = Snapshot::from_records(1, [("a", 100)]);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["generation"], 1);
        assert_eq!(json["records"]["a"], 100);
    }
}

//! Property-based tests for the snapshot and mode model
//!
//! These tests check the invariants the pipeline relies on:
//!  - A snapshot built by adding records is a superset of every earlier one
//!  - Ids from one generator never collide
//!  - The mode order is total with BOOT below LIVE

use lagline_core::{Mode, RecordIdGenerator, Snapshot};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Build the sequence of cumulative snapshots a source would emit
fn cumulative_snapshots(timestamps: &[i64]) -> Vec<Snapshot> {
    let mut ids = RecordIdGenerator::new();
    let mut records = BTreeMap::new();
    let mut emitted = Vec::new();

    for (i, ts) in timestamps.iter().enumerate() {
        records.insert(ids.next_id().unwrap(), *ts);
        emitted.push(Snapshot::new(i as u64 + 1, records.clone()));
    }

    emitted
}

proptest! {
    #[test]
    fn cumulative_snapshots_grow_monotonically(
        timestamps in prop::collection::vec(0i64..1_000_000, 1..40)
    ) {
        let emitted = cumulative_snapshots(&timestamps);

        for pair in emitted.windows(2) {
            prop_assert!(pair[1].is_superset_of(&pair[0]));
            prop_assert_eq!(pair[1].len(), pair[0].len() + 1);
            prop_assert!(pair[1].generation() > pair[0].generation());
        }
    }

    #[test]
    fn earlier_snapshot_is_never_superset_of_later(
        timestamps in prop::collection::vec(0i64..1_000_000, 2..20)
    ) {
        let emitted = cumulative_snapshots(&timestamps);
        let first = &emitted[0];
        let last = &emitted[emitted.len() - 1];

        prop_assert!(!first.is_superset_of(last));
    }

    #[test]
    fn generator_never_repeats(count in 1usize..2_000) {
        let mut ids = RecordIdGenerator::new();
        let unique: BTreeSet<_> = (0..count).map(|_| ids.next_id().unwrap()).collect();

        prop_assert_eq!(unique.len(), count);
    }

    #[test]
    fn unknown_mode_strings_are_rejected(raw in "[ a-zA-Z]{0,8}") {
        prop_assume!(raw != "BOOT" && raw != "LIVE");

        prop_assert!(raw.parse::<Mode>().is_err());
    }
}

#[test]
fn mode_sequence_sorts_boot_first() {
    let mut observed = vec![Mode::Live, Mode::Boot, Mode::Live];
    observed.sort();

    assert_eq!(observed, vec![Mode::Boot, Mode::Live, Mode::Live]);
}

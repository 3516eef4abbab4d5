//! Merge and garbage collection: the reconciliation path of the U-Set.
//!
//! `merge_in` folds a peer's full snapshot into the receiver and then runs
//! the two GC passes. Tombstone application drops add timestamps that a
//! tombstone strictly dominates, deleting a value from the add-set once
//! every add of it has been superseded. Tombstone pruning forgets a
//! tombstone once it is causally stable: strictly earlier than every clock
//! this replica knows about, so no replica can still be unaware of the
//! removal or racing an add concurrent with it.

use tracing::debug;
use uset_clock::ClockOrdering;

use crate::replica::ReplicatedSet;

impl<T: Ord + Clone> ReplicatedSet<T> {
    /// Fold a peer's snapshot into this replica.
    ///
    /// The snapshot is taken by value: the sender clones its state before
    /// handing it over, so the receiver owns an isolated copy and the
    /// sender is free to keep mutating its own. Merging a replica's own
    /// snapshot is legal and acts as a local reconciliation pass.
    ///
    /// In order:
    /// 1. advance the own clock slot (receipt is a local event);
    /// 2. pointwise-merge every known clock with the sender's view of the
    ///    same replica, then fold the sender's own clock into ours so the
    ///    receiver dominates everything the sender had observed;
    /// 3. union the add-set and tombstone set by key;
    /// 4. apply tombstones to the add-set;
    /// 5. prune causally-stable tombstones.
    ///
    /// # Panics
    ///
    /// If the two replicas were constructed with different replica counts;
    /// merging across differently-sized groups is a wiring error, not a
    /// runtime condition.
    pub fn merge_in(&mut self, snapshot: ReplicatedSet<T>) {
        assert_eq!(
            self.replica_count(),
            snapshot.replica_count(),
            "replica count mismatch: {} vs {}",
            self.replica_count(),
            snapshot.replica_count(),
        );

        self.known_clocks[self.self_index].increment(self.self_index);

        for (ours, theirs) in self.known_clocks.iter_mut().zip(&snapshot.known_clocks) {
            ours.merge_in(theirs);
        }
        let sender_clock = &snapshot.known_clocks[snapshot.self_index];
        self.known_clocks[self.self_index].merge_in(sender_clock);

        for (value, stamps) in snapshot.adds {
            self.adds.entry(value).or_default().extend(stamps);
        }
        for (value, stamps) in snapshot.tombstones {
            self.tombstones.entry(value).or_default().extend(stamps);
        }

        let dropped = self.apply_tombstones();
        let pruned = self.prune_stable_tombstones();
        debug!(
            dropped_adds = dropped,
            pruned_tombstones = pruned,
            "merge reconciled"
        );
    }

    /// GC of the add-set: drop every add timestamp strictly dominated by
    /// some tombstone of the same value, deleting values whose timestamp
    /// set empties. The dominance test is the same one `contains` uses, so
    /// collection never changes observable membership.
    fn apply_tombstones(&mut self) -> usize {
        let tombstones = &self.tombstones;
        let mut dropped = 0;

        self.adds.retain(|value, stamps| {
            if let Some(tombs) = tombstones.get(value) {
                let before = stamps.len();
                stamps.retain(|stamp| {
                    !tombs
                        .iter()
                        .any(|tomb| stamp.compare(tomb) == ClockOrdering::Earlier)
                });
                dropped += before - stamps.len();
                !stamps.is_empty()
            } else {
                true
            }
        });

        dropped
    }

    /// GC of the tombstone set: a tombstone is causally stable once every
    /// clock in `known_clocks` strictly dominates it. At that point each
    /// replica's clock has passed the remove event, which it can only have
    /// done by merging a snapshot that carried the tombstone, so every
    /// replica has already dropped the dominated adds, and the tombstone
    /// can be forgotten. Keys with no tombstones left are deleted.
    fn prune_stable_tombstones(&mut self) -> usize {
        let clocks = &self.known_clocks;
        let mut pruned = 0;

        self.tombstones.retain(|_, stamps| {
            let before = stamps.len();
            stamps.retain(|stamp| {
                !clocks
                    .iter()
                    .all(|clock| stamp.compare(clock) == ClockOrdering::Earlier)
            });
            pruned += before - stamps.len();
            !stamps.is_empty()
        });

        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uset_clock::CausalClock;

    fn pair() -> (ReplicatedSet<u64>, ReplicatedSet<u64>) {
        (
            ReplicatedSet::new(2, 0).unwrap(),
            ReplicatedSet::new(2, 1).unwrap(),
        )
    }

    #[test]
    fn merge_unions_concurrent_adds() {
        let (mut a, mut b) = pair();

        a.add(5);
        b.add(7);

        a.merge_in(b.clone());
        b.merge_in(a.clone());

        assert_eq!(a.elements().copied().collect::<Vec<_>>(), vec![5, 7]);
        assert_eq!(b.elements().copied().collect::<Vec<_>>(), vec![5, 7]);
        assert!(a.converged_with(&b));
    }

    #[test]
    fn merge_advances_clock_caches() {
        let (mut a, mut b) = pair();

        a.add(5);
        b.add(7);
        a.merge_in(b.clone());

        // Own slot: one add + one merge receipt; the sender's progress is
        // folded into the own clock, and the peer cache records it too.
        assert_eq!(a.clock(), &CausalClock::from_slots([2, 1]));
        assert_eq!(a.known_clock(1), &CausalClock::from_slots([0, 1]));
    }

    #[test]
    fn removal_propagates_and_tombstones_drain() {
        let (mut a, mut b) = pair();

        a.add(5);
        b.add(7);
        a.merge_in(b.clone());
        b.merge_in(a.clone());

        a.remove(&5);

        // Hub-and-spoke through replica 0, twice in each direction.
        a.merge_in(b.clone());
        b.merge_in(a.clone());
        a.merge_in(b.clone());
        b.merge_in(a.clone());

        assert_eq!(a.elements().copied().collect::<Vec<_>>(), vec![7]);
        assert_eq!(b.elements().copied().collect::<Vec<_>>(), vec![7]);
        assert!(a.converged_with(&b));

        // The removed key is gone from both add-sets, not just hidden.
        assert!(!a.adds.contains_key(&5));
        assert!(!b.adds.contains_key(&5));

        assert!(a.tombstones_drained());
        assert!(b.tombstones_drained());
    }

    #[test]
    fn tombstone_survives_until_every_clock_dominates_the_removal() {
        let mut a: ReplicatedSet<u64> = ReplicatedSet::new(3, 0).unwrap();
        let b: ReplicatedSet<u64> = ReplicatedSet::new(3, 1).unwrap();

        a.add(5);
        a.remove(&5);

        // Replica 2 has never been heard from: its cached clock cannot
        // dominate the removal, so the tombstone must be retained.
        a.merge_in(b.clone());
        assert_eq!(a.tombstone_count(&5), 1);
        assert!(!a.adds.contains_key(&5));
    }

    #[test]
    fn self_merge_reconciles_locally() {
        let mut a: ReplicatedSet<u64> = ReplicatedSet::new(1, 0).unwrap();

        a.add(5);
        a.remove(&5);
        assert!(a.adds.contains_key(&5));

        a.merge_in(a.clone());

        assert!(!a.adds.contains_key(&5));
        assert!(a.tombstones_drained());
        assert!(a.is_empty());
    }

    #[test]
    fn concurrent_add_survives_remove() {
        let (mut a, mut b) = pair();

        a.add(5);
        a.merge_in(b.clone());
        b.merge_in(a.clone());

        // b removes 5 while a concurrently re-adds it.
        b.remove(&5);
        a.add(5);

        a.merge_in(b.clone());
        b.merge_in(a.clone());
        a.merge_in(b.clone());
        b.merge_in(a.clone());

        // Add wins: the re-add was never observed by the remover.
        assert!(a.contains(&5));
        assert!(b.contains(&5));
        assert!(a.converged_with(&b));
    }

    #[test]
    fn merge_is_idempotent_on_observable_state() {
        let (mut a, mut b) = pair();

        a.add(5);
        b.add(7);
        b.remove(&7);

        let snapshot = b.clone();
        a.merge_in(snapshot.clone());
        let keys_once: Vec<u64> = a.adds.keys().copied().collect();
        let members_once: Vec<u64> = a.elements().copied().collect();
        let tombstones_once = a.tombstone_count(&7);

        a.merge_in(snapshot);
        let keys_twice: Vec<u64> = a.adds.keys().copied().collect();
        let members_twice: Vec<u64> = a.elements().copied().collect();

        assert_eq!(keys_once, keys_twice);
        assert_eq!(members_once, members_twice);
        // Re-merging must not resurrect pruned tombstones.
        assert!(a.tombstone_count(&7) <= tombstones_once);
    }

    #[test]
    fn stale_snapshot_does_not_resurrect_a_removed_value() {
        let (mut a, mut b) = pair();

        a.add(5);
        a.merge_in(b.clone());
        b.merge_in(a.clone());

        a.remove(&5);
        a.merge_in(b.clone());
        b.merge_in(a.clone());

        // b still tombstones the add it carries, even though a fresh
        // exchange already reconciled both sides.
        a.merge_in(b.clone());
        b.merge_in(a.clone());

        assert!(!a.contains(&5));
        assert!(!b.contains(&5));
        assert!(a.converged_with(&b));
    }

    #[test]
    #[should_panic(expected = "replica count mismatch")]
    fn merge_rejects_mismatched_replica_counts() {
        let mut a: ReplicatedSet<u64> = ReplicatedSet::new(2, 0).unwrap();
        let b: ReplicatedSet<u64> = ReplicatedSet::new(3, 1).unwrap();
        a.merge_in(b);
    }
}

//! Per-replica state and local operations of the replicated U-Set.

use crate::error::{ReplicaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uset_clock::{CausalClock, ClockOrdering};

/// A replicated add/remove set with merge-time garbage collection.
///
/// Local mutations advance only this replica's own clock slot and its own
/// maps; [`merge_in`](ReplicatedSet::merge_in) is the only operation that
/// crosses replicas. Cloning a replica produces the full, isolated
/// snapshot that is handed to a peer's `merge_in`: every field is owned,
/// so a clone shares no mutable state with the original.
///
/// `remove` does not delete from the add-set. It records a tombstone
/// carrying the remover's clock; the value's add timestamps are dropped
/// (and the key eventually deleted) during merge-time reconciliation.
/// Membership is nevertheless correct at all times because
/// [`contains`](ReplicatedSet::contains) is derived from both maps on
/// every call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplicatedSet<T: Ord + Clone> {
    /// This replica's slot in every clock it stores.
    pub(crate) self_index: usize,
    /// `known_clocks[self_index]` is the authoritative local clock; every
    /// other entry is the most recent snapshot of that peer's clock this
    /// replica has observed, a lower bound on the peer's true progress.
    pub(crate) known_clocks: Vec<CausalClock>,
    /// The add-set S: one timestamp per add event. A value carries several
    /// timestamps when adds race across replicas or it is re-added.
    pub(crate) adds: BTreeMap<T, BTreeSet<CausalClock>>,
    /// The tombstone set R: one timestamp per remove event, kept until the
    /// removal is causally stable.
    pub(crate) tombstones: BTreeMap<T, BTreeSet<CausalClock>>,
}

impl<T: Ord + Clone> ReplicatedSet<T> {
    /// New empty replica: `replica_count` all-zero clocks, observing slot
    /// `self_index` as its own.
    pub fn new(replica_count: usize, self_index: usize) -> Result<Self> {
        Self::with_clock(CausalClock::new(replica_count), self_index)
    }

    /// New empty replica whose own clock is seeded from `initial`. The
    /// replica count is the length of `initial`; peer clock caches start
    /// at zero.
    pub fn with_clock(initial: CausalClock, self_index: usize) -> Result<Self> {
        let count = initial.len();
        if count == 0 {
            return Err(ReplicaError::EmptyGroup);
        }
        if self_index >= count {
            return Err(ReplicaError::IndexOutOfRange {
                index: self_index,
                count,
            });
        }

        let known_clocks = (0..count)
            .map(|i| {
                if i == self_index {
                    initial.clone()
                } else {
                    CausalClock::new(count)
                }
            })
            .collect();

        Ok(ReplicatedSet {
            self_index,
            known_clocks,
            adds: BTreeMap::new(),
            tombstones: BTreeMap::new(),
        })
    }

    /// This replica's slot index.
    pub fn self_index(&self) -> usize {
        self.self_index
    }

    /// Number of replicas in the group, fixed at construction.
    pub fn replica_count(&self) -> usize {
        self.known_clocks.len()
    }

    /// The authoritative local clock.
    pub fn clock(&self) -> &CausalClock {
        &self.known_clocks[self.self_index]
    }

    /// Last-observed clock of replica `index`. For `self_index` this is
    /// the live local clock.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn known_clock(&self, index: usize) -> &CausalClock {
        &self.known_clocks[index]
    }

    /// Record a local add event for `value`.
    ///
    /// Advances the own clock slot by one and stores a clone of the
    /// advanced clock as the add timestamp. Never fails; adding a value
    /// that is already present accumulates another timestamp.
    pub fn add(&mut self, value: T) {
        self.known_clocks[self.self_index].increment(self.self_index);
        let stamp = self.known_clocks[self.self_index].clone();
        self.adds.entry(value).or_default().insert(stamp);
    }

    /// Record a local remove event for `value`.
    ///
    /// Returns `false`, without advancing the clock, when `value` has no
    /// add entry. Otherwise advances the own clock slot and stores a clone
    /// of the advanced clock as a tombstone. The local clock dominates
    /// every timestamp this replica has ever observed, so the tombstone
    /// strictly dominates each currently-recorded add of `value`; adds
    /// concurrent with the removal (not yet observed here) survive it.
    ///
    /// The key stays in the add-set; merge-time reconciliation is what
    /// deletes it.
    pub fn remove(&mut self, value: &T) -> bool {
        if !self.adds.contains_key(value) {
            return false;
        }

        self.known_clocks[self.self_index].increment(self.self_index);
        let stamp = self.known_clocks[self.self_index].clone();
        self.tombstones
            .entry(value.clone())
            .or_default()
            .insert(stamp);
        true
    }

    /// Membership, derived from the add-set and tombstone set on every
    /// call: `value` is a member iff some add timestamp is not strictly
    /// dominated by any of its tombstones. A freshly-removed value is a
    /// non-member immediately, before any merge has garbage-collected it.
    pub fn contains(&self, value: &T) -> bool {
        let Some(stamps) = self.adds.get(value) else {
            return false;
        };
        let Some(tombs) = self.tombstones.get(value) else {
            return true;
        };

        stamps.iter().any(|stamp| {
            !tombs
                .iter()
                .any(|tomb| stamp.compare(tomb) == ClockOrdering::Earlier)
        })
    }

    /// Iterate over current members. Iteration order carries no meaning.
    pub fn elements(&self) -> impl Iterator<Item = &T> {
        self.adds.keys().filter(|value| self.contains(value))
    }

    /// Number of current members.
    pub fn len(&self) -> usize {
        self.elements().count()
    }

    /// True when the set has no current members.
    pub fn is_empty(&self) -> bool {
        self.elements().next().is_none()
    }

    /// Convergence-oriented equality: two replicas agree once the key sets
    /// of their add-sets match, independent of residual tombstones and
    /// clock caches.
    pub fn converged_with(&self, other: &ReplicatedSet<T>) -> bool {
        self.adds.keys().eq(other.adds.keys())
    }

    /// Number of live tombstone timestamps for `value`.
    pub fn tombstone_count(&self, value: &T) -> usize {
        self.tombstones.get(value).map_or(0, BTreeSet::len)
    }

    /// True once every tombstone has been pruned, the steady state after
    /// enough merge rounds.
    pub fn tombstones_drained(&self) -> bool {
        self.tombstones.is_empty()
    }
}

impl<T: Ord + Clone + fmt::Display> fmt::Display for ReplicatedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_map<T: fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            map: &BTreeMap<T, BTreeSet<CausalClock>>,
        ) -> fmt::Result {
            write!(f, "{{")?;
            for (i, (value, stamps)) in map.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: [", value)?;
                for (j, stamp) in stamps.iter().enumerate() {
                    if j > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", stamp)?;
                }
                write!(f, "]")?;
            }
            write!(f, "}}")
        }

        write!(f, "s: ")?;
        write_map(f, &self.adds)?;
        write!(f, " r: ")?;
        write_map(f, &self.tombstones)?;
        write!(f, " clocks: [")?;
        for (i, clock) in self.known_clocks.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", clock)?;
        }
        write!(f, "]")
    }
}

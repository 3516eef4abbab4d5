//! Fixed-length vector clock.
//!
//! One slot per replica in the group, indexed by dense replica id
//! `0..N-1`. A replica increments only its own slot; every other slot
//! advances only through pointwise-maximum merges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of comparing two clocks under the happened-before partial order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockOrdering {
    /// Every slot is identical.
    Equal,
    /// Self is greater or equal in every slot and greater in at least one.
    Later,
    /// Other is greater or equal in every slot and greater in at least one.
    Earlier,
    /// Neither clock dominates the other.
    Concurrent,
}

impl ClockOrdering {
    /// The ordering as seen from the other operand's side.
    pub fn inverse(self) -> Self {
        match self {
            ClockOrdering::Later => ClockOrdering::Earlier,
            ClockOrdering::Earlier => ClockOrdering::Later,
            other => other,
        }
    }
}

/// A fixed-length vector of per-replica event counters.
///
/// Clocks are value types: the derived `Ord` and `Hash` let them live in
/// `BTreeSet`s as timestamps keyed by full structural equality. That total
/// order is a storage order only; causal ordering comes from
/// [`CausalClock::compare`].
///
/// Cloning produces an independent snapshot. A clock stored as a timestamp
/// must always be a clone, never a reference to a clock that will keep
/// advancing.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CausalClock {
    slots: Vec<u64>,
}

impl CausalClock {
    /// All-zero clock with one slot per replica.
    pub fn new(len: usize) -> Self {
        CausalClock {
            slots: vec![0; len],
        }
    }

    /// Clock with the given slot values.
    pub fn from_slots(slots: impl Into<Vec<u64>>) -> Self {
        CausalClock {
            slots: slots.into(),
        }
    }

    /// Number of replica slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True for the zero-replica clock.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Event counter for one replica slot.
    ///
    /// # Panics
    ///
    /// If `index` is out of range. An out-of-range replica index means the
    /// embedding wired the group incorrectly.
    pub fn get(&self, index: usize) -> u64 {
        self.slots[index]
    }

    /// Raw slot values.
    pub fn slots(&self) -> &[u64] {
        &self.slots
    }

    /// Record one local event by bumping `index` by one.
    ///
    /// Only a replica's own slot may be incremented directly; foreign
    /// slots advance through [`CausalClock::merge_in`].
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn increment(&mut self, index: usize) {
        self.slots[index] += 1;
    }

    /// Compare two clocks under the happened-before partial order.
    ///
    /// # Panics
    ///
    /// If the clocks have different lengths. Mismatched lengths mean two
    /// replicas from differently-sized groups were wired together, which
    /// is a configuration error surfaced immediately rather than resolved
    /// by silently comparing a common prefix.
    pub fn compare(&self, other: &CausalClock) -> ClockOrdering {
        assert_eq!(
            self.slots.len(),
            other.slots.len(),
            "clock length mismatch: {} vs {}",
            self.slots.len(),
            other.slots.len(),
        );

        let mut greater = false;
        let mut smaller = false;
        for (a, b) in self.slots.iter().zip(&other.slots) {
            if a > b {
                greater = true;
            }
            if a < b {
                smaller = true;
            }
        }

        match (greater, smaller) {
            (false, false) => ClockOrdering::Equal,
            (true, false) => ClockOrdering::Later,
            (false, true) => ClockOrdering::Earlier,
            (true, true) => ClockOrdering::Concurrent,
        }
    }

    /// True if this clock is `Later` than or `Equal` to `other`.
    pub fn dominates(&self, other: &CausalClock) -> bool {
        matches!(
            self.compare(other),
            ClockOrdering::Later | ClockOrdering::Equal
        )
    }

    /// In-place pointwise maximum; returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// On length mismatch, as for [`CausalClock::compare`].
    pub fn merge_in(&mut self, other: &CausalClock) -> &mut Self {
        assert_eq!(
            self.slots.len(),
            other.slots.len(),
            "clock length mismatch: {} vs {}",
            self.slots.len(),
            other.slots.len(),
        );

        for (slot, &theirs) in self.slots.iter_mut().zip(&other.slots) {
            *slot = (*slot).max(theirs);
        }
        self
    }
}

impl fmt::Display for CausalClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", slot)?;
        }
        write!(f, "]")
    }
}

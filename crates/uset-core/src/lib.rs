//! # uset-core
//!
//! The replicated U-Set engine: an add/remove set that converges across
//! uncoordinated replicas.
//!
//! Each replica keeps:
//! - the add-set `S`: value → clock timestamps, one per add event;
//! - the tombstone set `R`: value → clock timestamps, one per remove event;
//! - a cache of the last-known [`CausalClock`](uset_clock::CausalClock) of
//!   every replica in the group, its own included.
//!
//! Local `add`/`remove` touch only the replica's own clock slot and maps.
//! [`ReplicatedSet::merge_in`] is the only cross-replica operation: it
//! folds a peer's full snapshot into the receiver, applies tombstones to
//! the add-set, and prunes tombstones once they are causally stable:
//! every clock the replica knows about dominates the removal, so no
//! replica can still be unaware of it or racing an add concurrent with it.
//! Pruning is what keeps tombstone metadata bounded.

mod error;
mod merge;
mod replica;

pub use error::{ReplicaError, Result};
pub use replica::ReplicatedSet;
pub use uset_clock::{CausalClock, ClockOrdering};

//! # uset-clock
//!
//! Fixed-length vector clocks for per-replica causality tracking.
//!
//! A [`CausalClock`] holds one event counter per replica in the group.
//! Comparing two clocks yields the happened-before partial order
//! ([`ClockOrdering`]): `Later`, `Earlier`, `Equal`, or `Concurrent`.
//! This is the leaf crate of the Ammolite workspace; the set engine in
//! `uset-core` stores clones of these clocks as event timestamps.

mod clock;

pub use clock::{CausalClock, ClockOrdering};

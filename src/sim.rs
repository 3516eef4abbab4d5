//! Randomized convergence driver.
//!
//! An externally-owned harness that exercises the replicated set the way
//! an embedding system would: every replica lives behind its own async
//! mutex (one lock per replica linearizes that replica's operations), a
//! seeded random schedule of adds, removes and gossip merges runs against
//! the group, and the run finishes with two hub-and-spoke merge rounds
//! through replica 0 before checking that every replica agrees on the set
//! contents and that every tombstone has drained.

use async_stream::stream;
use futures::stream::{Stream, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uset_core::ReplicatedSet;

type SharedReplica = Arc<Mutex<ReplicatedSet<u64>>>;

/// Statistics collected during a convergence run
#[derive(Clone, Debug)]
pub struct RunStats {
    pub seed: u64,
    pub num_replicas: usize,
    pub adds: usize,
    pub removes: usize,
    pub merges: usize,
    pub final_members: usize,
    pub tombstones_drained: bool,
    pub total_time: Duration,
    pub events_per_second: f64,
}

impl RunStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Convergence Run Statistics                     ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Seed:                      {:>38} ║", self.seed);
        println!("║  Number of Replicas:        {:>38} ║", self.num_replicas);
        println!("║  Add Events:                {:>38} ║", self.adds);
        println!("║  Remove Events:             {:>38} ║", self.removes);
        println!("║  Merge Events:              {:>38} ║", self.merges);
        println!("║  Final Set Size:            {:>38} ║", self.final_members);
        println!("║  Tombstones Drained:        {:>38} ║", self.tombstones_drained);
        println!(
            "║  Total Time:                {:>37}s ║",
            format!("{:.3}", self.total_time.as_secs_f64())
        );
        println!("║  Events/Second:             {:>38.0} ║", self.events_per_second);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// One scheduled event against the replica group.
#[derive(Clone, Copy, Debug)]
enum Event {
    Add { target: usize, value: u64 },
    /// `pick` selects a victim among the target's current members.
    Remove { target: usize, pick: u64 },
    Merge { target: usize, source: usize },
}

/// Generator yielding a seeded random event schedule. Seed 0 draws from
/// entropy, any other seed reproduces the same schedule.
fn event_schedule(
    seed: u64,
    num_replicas: usize,
    num_events: usize,
    value_range: u64,
) -> impl Stream<Item = Event> {
    stream! {
        let mut rng = match seed {
            0 => StdRng::from_entropy(),
            seed => StdRng::seed_from_u64(seed),
        };
        for _ in 0..num_events {
            let target = rng.gen_range(0..num_replicas);
            let event = match rng.gen_range(0..3) {
                0 => Event::Add { target, value: rng.gen_range(0..value_range) },
                1 => Event::Remove { target, pick: rng.gen() },
                _ => Event::Merge { target, source: rng.gen_range(0..num_replicas) },
            };
            yield event;
        }
    }
}

/// Run one randomized convergence trial and verify the outcome.
pub async fn convergence_run(
    seed: u64,
    num_replicas: usize,
    num_events: usize,
    value_range: u64,
) -> RunStats {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Replicated U-Set Convergence Run                    ║");
    println!(
        "║  Replicas: {} | Events: {} | Values: 0..{} | Seed: {} ║",
        num_replicas, num_events, value_range, seed
    );
    println!("╚════════════════════════════════════════════════════════════╝");

    let start = Instant::now();

    let replicas: Vec<SharedReplica> = (0..num_replicas)
        .map(|i| {
            Arc::new(Mutex::new(
                ReplicatedSet::new(num_replicas, i).expect("valid replica configuration"),
            ))
        })
        .collect();

    println!("\n[Phase 1/2] Applying random operation schedule...");

    let mut adds = 0;
    let mut removes = 0;
    let mut merges = 0;

    let mut schedule = Box::pin(event_schedule(seed, num_replicas, num_events, value_range));
    while let Some(event) = schedule.next().await {
        match event {
            Event::Add { target, value } => {
                replicas[target].lock().await.add(value);
                adds += 1;
            }
            Event::Remove { target, pick } => {
                let mut set = replicas[target].lock().await;
                let members: Vec<u64> = set.elements().copied().collect();
                if !members.is_empty() {
                    let victim = members[(pick % members.len() as u64) as usize];
                    set.remove(&victim);
                    removes += 1;
                }
            }
            Event::Merge { target, source } => {
                let snapshot = replicas[source].lock().await.clone();
                replicas[target].lock().await.merge_in(snapshot);
                merges += 1;
            }
        }
    }

    println!("[Phase 1/2] ✓ Completed");
    println!("[Phase 2/2] Hub-and-spoke merge rounds...");

    // Two rounds through replica 0 in both directions: afterwards every
    // cached clock dominates every earlier event, so the group agrees and
    // all tombstones can be forgotten.
    for _ in 0..2 {
        for i in 1..num_replicas {
            let snapshot = replicas[i].lock().await.clone();
            replicas[0].lock().await.merge_in(snapshot);
            merges += 1;
        }
        for i in 1..num_replicas {
            let snapshot = replicas[0].lock().await.clone();
            replicas[i].lock().await.merge_in(snapshot);
            merges += 1;
        }
    }

    println!("[Phase 2/2] ✓ Completed");

    let hub = replicas[0].lock().await;
    let mut drained = hub.tombstones_drained();
    for replica in &replicas[1..] {
        let set = replica.lock().await;
        assert!(
            hub.converged_with(&set),
            "replica group failed to converge (seed {seed})"
        );
        drained &= set.tombstones_drained();
    }
    if num_replicas > 1 {
        assert!(drained, "tombstones survived the hub rounds (seed {seed})");
    }

    let final_members = hub.len();
    drop(hub);

    let total_time = start.elapsed();
    let total_events = adds + removes + merges;
    let events_per_second = total_events as f64 / total_time.as_secs_f64();

    RunStats {
        seed,
        num_replicas,
        adds,
        removes,
        merges,
        final_members,
        tombstones_drained: drained,
        total_time,
        events_per_second,
    }
}

/// Sweep group sizes to show convergence cost as the group grows.
pub async fn convergence_scaling(max_replicas: usize, step_size: usize) {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║     Scaling Analysis - Convergence vs Replica Count        ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut current = step_size.max(2);
    while current <= max_replicas {
        let stats = convergence_run(42, current, current * 200, 16).await;
        stats.print();
        current += step_size;
    }
}

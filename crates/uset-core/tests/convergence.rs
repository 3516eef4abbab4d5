//! Distributed convergence runs: the scripted two-replica scenario and
//! seeded random operation logs across small replica groups, each finished
//! with two hub-and-spoke merge rounds through replica 0. Two rounds are
//! what it takes for every cached clock to dominate every earlier event,
//! which both settles the add-sets and drains every tombstone.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uset_core::ReplicatedSet;

fn hub_rounds(replicas: &mut [ReplicatedSet<u64>]) {
    for _ in 0..2 {
        for i in 1..replicas.len() {
            let snapshot = replicas[i].clone();
            replicas[0].merge_in(snapshot);
        }
        for i in 1..replicas.len() {
            let snapshot = replicas[0].clone();
            replicas[i].merge_in(snapshot);
        }
    }
}

#[test]
fn two_replica_scripted_scenario() {
    let mut r0: ReplicatedSet<u64> = ReplicatedSet::new(2, 0).unwrap();
    let mut r1: ReplicatedSet<u64> = ReplicatedSet::new(2, 1).unwrap();

    r0.add(5);
    r1.add(7);

    r0.merge_in(r1.clone());
    r1.merge_in(r0.clone());

    assert_eq!(r0.elements().copied().collect::<Vec<_>>(), vec![5, 7]);
    assert_eq!(r1.elements().copied().collect::<Vec<_>>(), vec![5, 7]);

    r0.remove(&5);

    for _ in 0..2 {
        r0.merge_in(r1.clone());
        r1.merge_in(r0.clone());
    }

    assert_eq!(r0.elements().copied().collect::<Vec<_>>(), vec![7]);
    assert_eq!(r1.elements().copied().collect::<Vec<_>>(), vec![7]);
    assert!(r0.converged_with(&r1));
    assert!(r0.tombstones_drained());
    assert!(r1.tombstones_drained());
}

#[test]
fn removal_reaches_a_replica_that_never_saw_the_add() {
    let mut replicas: Vec<ReplicatedSet<u64>> = (0..3)
        .map(|i| ReplicatedSet::new(3, i).unwrap())
        .collect();

    replicas[0].add(5);
    let snapshot = replicas[0].clone();
    replicas[1].merge_in(snapshot);
    replicas[1].remove(&5);

    // Replica 2 first hears about 5 through the hub rounds, add and
    // tombstone together.
    hub_rounds(&mut replicas);

    for replica in &replicas {
        assert!(!replica.contains(&5));
        assert!(replica.tombstones_drained());
    }
    assert!(replicas[0].converged_with(&replicas[1]));
    assert!(replicas[0].converged_with(&replicas[2]));
}

fn random_run(seed: u64, replica_count: usize, events: usize, value_range: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut replicas: Vec<ReplicatedSet<u64>> = (0..replica_count)
        .map(|i| ReplicatedSet::new(replica_count, i).unwrap())
        .collect();

    for _ in 0..events {
        let target = rng.gen_range(0..replica_count);
        match rng.gen_range(0..3) {
            0 => {
                let value = rng.gen_range(0..value_range);
                replicas[target].add(value);
            }
            1 => {
                let members: Vec<u64> = replicas[target].elements().copied().collect();
                if !members.is_empty() {
                    let victim = members[rng.gen_range(0..members.len())];
                    assert!(replicas[target].remove(&victim));
                }
            }
            _ => {
                let source = rng.gen_range(0..replica_count);
                let snapshot = replicas[source].clone();
                replicas[target].merge_in(snapshot);
            }
        }
    }

    hub_rounds(&mut replicas);

    let (first, rest) = replicas.split_first().unwrap();
    for replica in rest.iter() {
        assert!(
            first.converged_with(replica),
            "replicas diverged for seed {seed} ({replica_count} replicas, {events} events)"
        );
        assert!(first.elements().eq(replica.elements()));
    }
    for replica in &replicas {
        assert!(
            replica.tombstones_drained(),
            "tombstones survived the hub rounds for seed {seed}"
        );
    }
}

#[test]
fn randomized_runs_converge() {
    for seed in 1..=20 {
        for &replica_count in &[2usize, 3, 5] {
            for &events in &[0usize, 10, 40] {
                random_run(seed, replica_count, events, 8);
            }
        }
    }
}

#[test]
fn long_randomized_run_converges() {
    random_run(99, 4, 500, 16);
}

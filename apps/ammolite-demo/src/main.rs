//! # Ammolite Demo
//!
//! A standalone CLI exercising the replicated U-Set. Each subcommand runs
//! a small replica group in-process and narrates what the engine does:
//! adds and removes touch only one replica's state, merges ship full
//! snapshots, and reconciliation makes the group agree.
//!
//! ## Scenarios
//!
//! ```text
//! demo        two replicas add, cross-merge, remove, converge
//! conflict    a removal racing a concurrent re-add: the add wins
//! partition   two halves diverge, then heal through merges
//! interactive REPL against an N-replica group
//! ```

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use colored::*;
use uset_core::ReplicatedSet;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ammolite-demo")]
#[command(about = "Replicated U-Set CRDT demos (add/remove set with tombstone GC)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Basic demo: two replicas add, cross-merge, remove, and converge
    Demo,
    /// Conflict scenario: a removal racing a concurrent re-add (add wins)
    Conflict,
    /// Network partition simulation: split, independent work, heal, converge
    Partition,
    /// Interactive REPL for manual experimentation
    Interactive {
        /// Number of replicas in the group
        #[arg(short, long, default_value_t = 3)]
        replicas: usize,
    },
}

// ─── Helpers ───────────────────────────────────────────────────────────────

fn banner(title: &str) {
    println!("\n{}", format!("━━━ {} ━━━", title).bold().cyan());
}

fn show(label: &str, replica: &ReplicatedSet<u64>) {
    let members: Vec<String> = replica.elements().map(u64::to_string).collect();
    println!(
        "  {} members: {{{}}}  |  {}",
        label.bold(),
        members.join(", ").green(),
        replica.to_string().dimmed()
    );
}

fn merge(label_to: &str, to: &mut ReplicatedSet<u64>, label_from: &str, from: &ReplicatedSet<u64>) {
    println!(
        "  {} {} ← {}",
        "merge".yellow(),
        label_to.bold(),
        label_from.bold()
    );
    to.merge_in(from.clone());
}

// ─── Scenarios ─────────────────────────────────────────────────────────────

fn run_demo() {
    banner("Two replicas: add, merge, remove, converge");

    let mut r0: ReplicatedSet<u64> = ReplicatedSet::new(2, 0).expect("two-replica group");
    let mut r1: ReplicatedSet<u64> = ReplicatedSet::new(2, 1).expect("two-replica group");

    println!("  r0 adds {}", "5".green());
    r0.add(5);
    println!("  r1 adds {}", "7".green());
    r1.add(7);

    merge("r0", &mut r0, "r1", &r1);
    merge("r1", &mut r1, "r0", &r0);

    show("r0", &r0);
    show("r1", &r1);

    println!("\n  r0 removes {}", "5".red());
    r0.remove(&5);

    for _ in 0..2 {
        merge("r0", &mut r0, "r1", &r1);
        merge("r1", &mut r1, "r0", &r0);
    }

    show("r0", &r0);
    show("r1", &r1);

    assert!(r0.converged_with(&r1));
    assert!(r0.tombstones_drained() && r1.tombstones_drained());
    println!(
        "\n  {} both replicas agree on {{7}} and every tombstone has drained",
        "✓".green().bold()
    );
}

fn run_conflict() {
    banner("Concurrent remove vs re-add: the add wins");

    let mut r0: ReplicatedSet<u64> = ReplicatedSet::new(2, 0).expect("two-replica group");
    let mut r1: ReplicatedSet<u64> = ReplicatedSet::new(2, 1).expect("two-replica group");

    println!("  r0 adds {}", "5".green());
    r0.add(5);
    merge("r1", &mut r1, "r0", &r0);

    println!(
        "\n  {} r1 removes 5 while r0 concurrently re-adds it",
        "race:".magenta().bold()
    );
    r1.remove(&5);
    r0.add(5);

    for _ in 0..2 {
        merge("r0", &mut r0, "r1", &r1);
        merge("r1", &mut r1, "r0", &r0);
    }

    show("r0", &r0);
    show("r1", &r1);

    assert!(r0.contains(&5) && r1.contains(&5));
    println!(
        "\n  {} the re-add was never observed by the remover, so it survives",
        "✓".green().bold()
    );
}

fn run_partition() {
    banner("Partition: two halves diverge, then heal");

    let mut group: Vec<ReplicatedSet<u64>> = (0..4)
        .map(|i| ReplicatedSet::new(4, i).expect("four-replica group"))
        .collect();

    println!("  partition: {{r0, r1}} | {{r2, r3}}");
    println!("  left half adds 1, 2 and removes 1; right half adds 3, 4");

    group[0].add(1);
    group[1].add(2);
    let snapshot = group[0].clone();
    group[1].merge_in(snapshot);
    let snapshot = group[1].clone();
    group[0].merge_in(snapshot);
    group[0].remove(&1);

    group[2].add(3);
    group[3].add(4);

    for (i, replica) in group.iter().enumerate() {
        show(&format!("r{}", i), replica);
    }

    println!("\n  {} all replicas exchange snapshots through r0", "heal:".magenta().bold());
    for _ in 0..2 {
        for i in 1..group.len() {
            let snapshot = group[i].clone();
            group[0].merge_in(snapshot);
        }
        for i in 1..group.len() {
            let snapshot = group[0].clone();
            group[i].merge_in(snapshot);
        }
    }

    for (i, replica) in group.iter().enumerate() {
        show(&format!("r{}", i), replica);
    }

    let hub = group[0].clone();
    assert!(group.iter().all(|r| r.converged_with(&hub)));
    assert!(group.iter().all(ReplicatedSet::tombstones_drained));
    println!(
        "\n  {} the group converged to {{2, 3, 4}} with no tombstones left",
        "✓".green().bold()
    );
}

// ─── Interactive REPL ──────────────────────────────────────────────────────

fn run_interactive(replica_count: usize) {
    banner(&format!("Interactive group of {} replicas", replica_count));
    println!(
        "  commands: {}",
        "add <r> <v> | remove <r> <v> | merge <to> <from> | values <r> | state <r> | sync | quit"
            .dimmed()
    );

    let mut group: Vec<ReplicatedSet<u64>> = (0..replica_count)
        .map(|i| ReplicatedSet::new(replica_count, i).expect("valid replica group"))
        .collect();

    let stdin = io::stdin();
    loop {
        print!("{} ", ">".bold().cyan());
        io::stdout().flush().expect("flush stdout");

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).expect("read stdin") == 0 {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts.as_slice() {
            ["add", r, v] => match (r.parse::<usize>(), v.parse::<u64>()) {
                (Ok(r), Ok(v)) if r < replica_count => {
                    group[r].add(v);
                    println!("  r{} added {}", r, v.to_string().green());
                }
                _ => println!("  {}", "usage: add <replica> <value>".red()),
            },
            ["remove", r, v] => match (r.parse::<usize>(), v.parse::<u64>()) {
                (Ok(r), Ok(v)) if r < replica_count => {
                    if group[r].remove(&v) {
                        println!("  r{} tombstoned {}", r, v.to_string().red());
                    } else {
                        println!("  r{} has never seen {}", r, v);
                    }
                }
                _ => println!("  {}", "usage: remove <replica> <value>".red()),
            },
            ["merge", to, from] => match (to.parse::<usize>(), from.parse::<usize>()) {
                (Ok(to), Ok(from)) if to < replica_count && from < replica_count => {
                    let snapshot = group[from].clone();
                    group[to].merge_in(snapshot);
                    println!("  r{} merged a snapshot of r{}", to, from);
                }
                _ => println!("  {}", "usage: merge <to> <from>".red()),
            },
            ["values", r] => match r.parse::<usize>() {
                Ok(r) if r < replica_count => show(&format!("r{}", r), &group[r]),
                _ => println!("  {}", "usage: values <replica>".red()),
            },
            ["state", r] => match r.parse::<usize>() {
                Ok(r) if r < replica_count => println!("  {}", group[r]),
                _ => println!("  {}", "usage: state <replica>".red()),
            },
            ["sync"] => {
                for _ in 0..2 {
                    for i in 1..replica_count {
                        let snapshot = group[i].clone();
                        group[0].merge_in(snapshot);
                    }
                    for i in 1..replica_count {
                        let snapshot = group[0].clone();
                        group[i].merge_in(snapshot);
                    }
                }
                println!("  {} double hub round completed", "sync".yellow());
                for (i, replica) in group.iter().enumerate() {
                    show(&format!("r{}", i), replica);
                }
            }
            ["quit"] | ["exit"] => break,
            [] => {}
            _ => println!("  {}", "unknown command".red()),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Demo => run_demo(),
        Commands::Conflict => run_conflict(),
        Commands::Partition => run_partition(),
        Commands::Interactive { replicas } => run_interactive(replicas.max(1)),
    }
}

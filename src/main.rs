use sim::{convergence_run, convergence_scaling};
pub mod sim;

fn main() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async_main());
}

async fn async_main() {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            REPLICATED U-SET CONVERGENCE RUNS                ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Run 1: two replicas, small value range (heavy add/remove contention)
    let stats = convergence_run(1, 2, 200, 8).await;
    stats.print();

    // Run 2: four replicas, medium schedule
    let stats = convergence_run(2, 4, 500, 16).await;
    stats.print();

    // Run 3: five replicas, long schedule, entropy seed
    let stats = convergence_run(0, 5, 2000, 32).await;
    stats.print();

    // Run 4: scaling analysis
    convergence_scaling(10, 2).await;

    println!("\n✓ All convergence runs completed successfully!");
}

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use benor_common::NodeStateView;
use benor_node::{
    cli::{Cli, Command, RunArgs},
    runtime::{launch_in_memory, launch_network, run_simulation, ClusterControl, DriverOptions, SimulationReport},
    setup::init_tracing,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateConfig(args) => {
            let config = args.network.to_config()?;
            config.save_to_file(&args.out)?;
            println!("Wrote {} nodes ({} faulty) to {}", config.n(), config.f(), args.out.display());
            Ok(())
        }
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let run_name = if args.in_memory { "in-memory" } else { "http" };
    let _guard = init_tracing(run_name)?;

    let config = args.network_config()?;
    info!("--- BEN-OR SIMULATION ---");
    info!("N={} F={} base port {}", config.n(), config.f(), config.base_port);

    let mut cluster: Box<dyn ClusterControl> = if args.in_memory {
        Box::new(launch_in_memory(&config, args.seed)?)
    } else {
        Box::new(launch_network(&config, args.seed).await?)
    };

    let options = DriverOptions {
        timeout: Duration::from_secs(args.timeout_secs),
        ..DriverOptions::default()
    };
    let outcome = run_simulation(cluster.as_ref(), options).await;
    cluster.shutdown().await;

    match outcome {
        Ok(report) => {
            print_report(&report);
            if let Some(path) = &args.report {
                std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
                info!("report written to {}", path.display());
            }
            Ok(())
        }
        Err(e) => {
            error!("simulation failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_report(report: &SimulationReport) {
    println!("{:<8} {:<7} {:<6} {:<6} {:<8} {:<7}", "node", "faulty", "x", "k", "decided", "killed");
    for (i, (state, faulty)) in report.states.iter().zip(&report.faulty).enumerate() {
        let NodeStateView { x, k, killed, decided } = state;
        println!(
            "{:<8} {:<7} {:<6} {:<6} {:<8} {:<7}",
            i,
            faulty,
            x.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
            k.map(|k| k.to_string()).unwrap_or_else(|| "-".into()),
            decided.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            killed,
        );
    }
    match report.agreed_value() {
        Some(value) => println!("\nAgreement on {} after {:?} (max round {:?})", value, report.elapsed, report.max_round()),
        None => println!("\nNo agreement after {:?}: {:?}", report.elapsed, report.decisions()),
    }
}

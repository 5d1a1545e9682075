//! Headless runner driving an ecosystem simulation from the command line.

mod telemetry;

use anyhow::{Context, Result};
use biome_core::{DiseaseConfig, ScenarioConfig};
use biome_world::{Simulator, StepReport};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "biome-runner", version, about = "Run a predator/prey ecosystem simulation")]
struct Args {
    /// Number of steps to simulate
    #[arg(short, long, default_value_t = 1000)]
    steps: u64,

    /// Seed of the random source (overrides the scenario file)
    #[arg(long)]
    seed: Option<u64>,

    /// JSON scenario file with simulation parameters, species and diseases
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Field rows (overrides the scenario file)
    #[arg(long)]
    depth: Option<i32>,

    /// Field columns (overrides the scenario file)
    #[arg(long)]
    width: Option<i32>,

    /// Steps between population snapshots in the log
    #[arg(long)]
    report_every: Option<u64>,

    /// Introduce a disease in this host species at the start of the run
    #[arg(long)]
    outbreak: Option<String>,

    /// Stop as soon as a trophic level has gone extinct
    #[arg(long)]
    halt_on_collapse: bool,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    print_report: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn load_scenario(args: &Args) -> Result<ScenarioConfig> {
    let mut scenario = match &args.config {
        Some(path) => ScenarioConfig::from_file(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?,
        None => ScenarioConfig::default(),
    };

    let simulation = &mut scenario.simulation;
    if let Some(seed) = args.seed {
        simulation.seed = seed;
    }
    if let Some(depth) = args.depth {
        simulation.depth = depth;
    }
    if let Some(width) = args.width {
        simulation.width = width;
    }
    if let Some(interval) = args.report_every {
        simulation.report_interval = interval;
    }
    if let Some(host) = &args.outbreak {
        scenario.diseases.push(DiseaseConfig {
            main_host: host.clone(),
            ..Default::default()
        });
    }
    Ok(scenario)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_telemetry(args.json_logs)?;

    let scenario = load_scenario(&args)?;
    let mut sim = Simulator::from_scenario(scenario).context("failed to set up the simulation")?;
    info!(
        event = "run_started",
        run_id = %sim.run_id(),
        seed = sim.seed(),
        depth = sim.depth(),
        width = sim.width(),
        species = sim.registry().len(),
        steps = args.steps,
        "Starting simulation"
    );

    let stop = Arc::new(AtomicBool::new(false));
    let watcher = {
        let stop = stop.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                stop.store(true, Ordering::SeqCst);
            }
        })
    };

    let report = drive(&mut sim, &args, &stop).await;
    watcher.abort();

    info!(
        event = "run_finished",
        run_id = %sim.run_id(),
        step = report.step,
        day = report.day,
        total = report.total,
        infected = report.infected,
        viable = report.viable,
        "Simulation finished"
    );
    for entry in &report.populations {
        info!(
            event = "final_population",
            species = %entry.name,
            entity_type = %entry.entity_type,
            count = entry.count,
            "Final population"
        );
    }

    if args.print_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Step until the budget is spent, the run collapses (when asked to halt on
/// collapse) or a shutdown signal arrives. Stops only between steps.
async fn drive(sim: &mut Simulator, args: &Args, stop: &AtomicBool) -> StepReport {
    sim.start();
    for _ in 0..args.steps {
        if stop.load(Ordering::SeqCst) {
            warn!(step = sim.step_count(), "Run interrupted");
            break;
        }
        let report = sim.step();
        if args.halt_on_collapse && !report.viable {
            warn!(step = report.step, "Halting: ecosystem is no longer viable");
            break;
        }
        // Let the signal watcher run between steps.
        tokio::task::yield_now().await;
    }
    sim.pause();
    sim.last_report().clone()
}

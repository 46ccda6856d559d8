//! Costsim CLI
//!
//! Runs the cost-aware vs naive placement comparison and prints per-job
//! results, total cost per scenario and the savings.
//!
//! ```bash
//! # Reference scenario
//! costsim
//!
//! # Fewer jobs than VMs, where the policies diverge
//! costsim --lengths 1000,2000
//!
//! # Scenario file, 200 synthetic jobs, JSON export
//! costsim --config scenario.toml --random-jobs 200 --seed 7 --output report.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use costsim_simulation_engine::{
    config::SimulationConfig,
    cost::CostModel,
    harness::ComparisonHarness,
    report::{render_comparison, write_json},
    simulator::TimeSharedEngine,
    workload::WorkloadGenerator,
};

#[derive(Parser, Debug)]
#[command(name = "costsim")]
#[command(about = "Compare cost-aware and naive job placement over priced VMs", long_about = None)]
struct Args {
    /// Scenario file (TOML); defaults reproduce the reference scenario
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capacity threshold K: a VM fits a job when capacity * K >= length
    #[arg(short = 'k', long)]
    threshold: Option<f64>,

    /// How placements are priced
    #[arg(long, value_enum)]
    cost_model: Option<CostModel>,

    /// Job lengths to use instead of the configured jobs (comma-separated)
    #[arg(long, value_delimiter = ',', conflicts_with = "random_jobs")]
    lengths: Vec<u64>,

    /// Generate this many synthetic jobs instead of the configured jobs
    #[arg(long)]
    random_jobs: Option<usize>,

    /// Median synthetic job length
    #[arg(long, default_value_t = 10_000.0)]
    median_length: f64,

    /// Log-normal spread of synthetic job lengths
    #[arg(long, default_value_t = 1.0)]
    length_spread: f64,

    /// Upper bound on synthetic job lengths
    #[arg(long)]
    max_length: Option<u64>,

    /// Seed for synthetic jobs
    #[arg(long)]
    seed: Option<u64>,

    /// Report jobs still running at this time as failed
    #[arg(long)]
    horizon: Option<f64>,

    /// Run both scenarios concurrently
    #[cfg(feature = "async")]
    #[arg(long)]
    concurrent: bool,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "costsim=info,costsim_simulation_engine=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Simulation error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("failed to load scenario file {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    if let Some(threshold) = args.threshold {
        config.capacity_threshold = threshold;
    }
    if let Some(model) = args.cost_model {
        config.cost_model = model;
    }
    if let Some(horizon) = args.horizon {
        config.engine.horizon = Some(horizon);
    }

    if !args.lengths.is_empty() {
        config = config.with_job_lengths(&args.lengths);
    } else if let Some(count) = args.random_jobs {
        let mut generator = WorkloadGenerator::new(args.median_length, args.length_spread, args.seed)
            .context("invalid synthetic workload parameters")?;
        if let Some(max_length) = args.max_length {
            generator = generator.with_bounds(1, max_length);
        }
        config.jobs = generator.generate(count);
        info!("Generated {} synthetic jobs", count);
    }

    Ok(config)
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    let engine = Arc::new(TimeSharedEngine::new(config.engine.clone()));
    let harness = ComparisonHarness::new(engine.clone(), config).context("invalid scenario setup")?;

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Costsim: cost-aware vs naive placement                  ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    let config = harness.config();
    println!("Configuration:");
    println!("  Jobs: {}", config.jobs.len());
    println!("  Capacity threshold (K): {}", config.capacity_threshold);
    println!("  Cost model: {}", config.cost_model);
    println!("  Boot delay: {}", engine.config().boot_delay);
    if let Some(horizon) = engine.config().horizon {
        println!("  Horizon: {}", horizon);
    }
    println!(
        "  Scenarios: {} ({}, {} VMs) vs {} ({}, {} VMs)",
        config.cost_aware.name,
        config.cost_aware.policy,
        config.cost_aware.resources.len(),
        config.naive.name,
        config.naive.policy,
        config.naive.resources.len()
    );

    #[cfg(feature = "async")]
    let outcome = if args.concurrent {
        tokio::runtime::Runtime::new()
            .context("failed to start async runtime")?
            .block_on(harness.run_concurrent())
    } else {
        harness.run()
    };

    #[cfg(not(feature = "async"))]
    let outcome = harness.run();

    let report = outcome.context("simulation aborted")?;

    print!("{}", render_comparison(&report));

    if let Some(output_path) = args.output {
        println!("\nWriting results to {}...", output_path.display());
        write_json(&report, &output_path)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        println!("  Results saved");
    }

    println!("\n✅ Simulation complete!\n");
    Ok(())
}

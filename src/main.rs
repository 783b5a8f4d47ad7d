//! EVCI planner entry point: CLI wiring, config loading and result export.

use std::path::PathBuf;
use std::process;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use evci_planner::config::PlannerConfig;
use evci_planner::context::{CancelToken, RunContext};
use evci_planner::data::load_planning_area;
use evci_planner::eval::CapacityEvaluator;
use evci_planner::io::export::{confirmed_label, to_crore};
use evci_planner::io::{DirectorySink, PlanSink};
use evci_planner::plan::Planner;

#[derive(Debug, Parser)]
#[command(
    name = "evci-planner",
    about = "EV charging site evaluation and consolidation"
)]
struct Cli {
    /// Planning area directory holding the input CSV tables.
    #[arg(long)]
    data: PathBuf,
    /// Run configuration TOML file.
    #[arg(long, conflicts_with = "preset")]
    config: Option<PathBuf>,
    /// Built-in preset (public_places, fleet_hubs, bus_depots).
    #[arg(long)]
    preset: Option<String>,
    /// Directory that receives one sub-directory per run.
    #[arg(long, default_value = "output")]
    out: PathBuf,
    /// Run identifier; defaults to `run-<unix seconds>`.
    #[arg(long = "run-id")]
    run_id: Option<String>,
    #[arg(long = "analysis-id")]
    analysis_id: Option<u64>,
    #[arg(long = "created-by")]
    created_by: Option<u64>,
    /// Skip clustering; the final sites are the confirmed ones.
    #[arg(long = "no-cluster")]
    no_cluster: bool,
    /// Override the utilization threshold (0.0-1.0).
    #[arg(long = "cluster-th")]
    cluster_th: Option<f64>,
    /// Abort the run after this many seconds.
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,
    /// Plan and print reports without writing any files.
    #[arg(long = "dry-run")]
    dry_run: bool,
}

fn load_config(cli: &Cli) -> PlannerConfig {
    let loaded = match (&cli.config, &cli.preset) {
        (Some(path), _) => PlannerConfig::from_toml_file(path),
        (None, Some(name)) => PlannerConfig::from_preset(name),
        (None, None) => Ok(PlannerConfig::public_places()),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if cli.no_cluster {
        config.run.cluster = false;
    }
    if let Some(th) = cli.cluster_th {
        config.run.cluster_th = th;
    }
    if let Some(secs) = cli.timeout_secs {
        config.run.timeout_secs = Some(secs);
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    config
}

fn default_run_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    format!("run-{secs}")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = load_config(&cli);

    let cancel: CancelToken = config.cancel_token();
    let ctx = RunContext {
        run_id: cli.run_id.clone().unwrap_or_else(default_run_id),
        analysis_id: cli.analysis_id,
        created_by: cli.created_by,
        cancel,
    };
    info!(
        run_id = %ctx.run_id,
        scenario = %config.run.planning_scenario,
        data = %cli.data.display(),
        "planning run started"
    );

    let inputs = load_planning_area(&cli.data).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    let evaluator = CapacityEvaluator::new(config.evaluator.backoff_factor);
    let outcome = Planner::new(&evaluator, &config)
        .run(&ctx, &inputs)
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        });

    println!("\n--- Plan Summary ({}) ---", ctx.run_id);
    for report in outcome.reports() {
        println!(
            "{:<22} {:<8} sites={:<8} capex={:>8.2} cr  opex={:>6.2} cr  margin={:>8.2} cr  {}",
            report.charging_type.to_string(),
            report.stage.to_string(),
            report.site_count_label(),
            to_crore(report.capex),
            to_crore(report.opex),
            to_crore(report.margin),
            confirmed_label(report),
        );
    }

    if cli.dry_run {
        eprintln!("Dry run: nothing written");
        return;
    }

    let sink = DirectorySink::new(&cli.out);
    if let Err(e) = sink.commit(&ctx, &outcome) {
        eprintln!("error: failed to write results: {e}");
        process::exit(1);
    }
    eprintln!("Results written to {}", sink.run_dir(&ctx.run_id).display());
}

//! ---
//! plc_section: "01-core-functionality"
//! plc_subsection: "binary"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Binary entrypoint for the R-PLC daemon."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use r_plc_common::config::AppConfig;
use r_plc_common::logging::{init_tracing, ConsoleTarget};
use r_plc_core::{build_sink, SimulationDriver};
use r_plc_logging::{log_system_event, plc_info, plc_warn, LogContext, SystemEventOutcome};
use r_plc_metrics::{new_registry, spawn_http_server, DaemonMetrics, SharedRegistry, TelemetryMetrics};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

const DEFAULT_CONFIG: &str = "configs/r-plc.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "R-PLC boiler simulator daemon",
    long_about = None
)]
struct Cli {
    #[arg(
        long,
        value_name = "FILE",
        env = "R_PLC_CONFIG",
        help = "Path to configuration file"
    )]
    config: Option<PathBuf>,

    #[arg(long, value_name = "N", help = "Seed for the noise source (overrides simulation.random_seed)")]
    seed: Option<u64>,

    #[arg(long, value_name = "N", help = "Stop after N ticks (overrides simulation.max_ticks)")]
    max_ticks: Option<u64>,

    #[arg(long, help = "Print line-protocol batches to stdout instead of writing to InfluxDB")]
    dry_run: bool,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Commands {
    #[command(about = "Run the control loop until interrupted")]
    Run,
    #[command(about = "Run a single tick, print its batch, and exit")]
    Once,
    #[command(about = "Load and validate configuration, then print the effective TOML")]
    CheckConfig,
}

fn profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("R-PLC {} ({})", env!("CARGO_PKG_VERSION"), profile());
        return Ok(());
    }

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from(DEFAULT_CONFIG));

    let load_started = Instant::now();
    let loaded_config = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded_config.config;
    let config_path = loaded_config.source;
    let load_duration = load_started.elapsed();

    if let Some(max_ticks) = cli.max_ticks {
        config.simulation.max_ticks = Some(max_ticks);
    }
    if let Some(seed) = cli.seed {
        config.simulation.random_seed = Some(seed);
    }

    let command = cli.command.unwrap_or(Commands::Run);
    if let Commands::CheckConfig = command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let metrics_registry = new_registry();
    let daemon_metrics = DaemonMetrics::new(metrics_registry.clone())?;
    daemon_metrics.observe_config_load(load_duration.as_secs_f64());
    daemon_metrics.inc_start();
    daemon_metrics.set_build_info(env!("CARGO_PKG_VERSION"), profile());

    // Keep stdout for line protocol whenever batches are printed there.
    let console = if cli.dry_run || !config.sink.enabled || matches!(command, Commands::Once) {
        ConsoleTarget::Stderr
    } else {
        ConsoleTarget::Stdout
    };
    init_tracing("r-plcd", &config.logging, console)?;
    info!(config_path = %config_path.display(), "configuration loaded");

    match command {
        Commands::Run => run_daemon(config, cli.dry_run, metrics_registry).await?,
        Commands::Once => run_once(config, cli.dry_run).await?,
        Commands::CheckConfig => {}
    }

    Ok(())
}

async fn run_daemon(config: AppConfig, dry_run: bool, registry: SharedRegistry) -> Result<()> {
    let metrics_server = if config.metrics.enabled {
        info!(address = %config.metrics.listen, "metrics exporter enabled");
        Some(spawn_http_server(registry.clone(), config.metrics.listen).await?)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };
    let telemetry = TelemetryMetrics::new(registry)?;

    let sink = build_sink(&config.sink, dry_run)?;
    let driver = SimulationDriver::from_config(&config, None, sink)?
        .with_metrics(telemetry);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
    let mut driver_task = tokio::spawn(driver.run(shutdown_rx));
    info!("daemon running; waiting for termination signal");

    let site = config.sink.site.clone();
    let ctx = LogContext::for_component(&site, "r-plcd");
    let joined = tokio::select! {
        joined = &mut driver_task => joined,
        received = signal::ctrl_c() => {
            match received {
                Ok(()) => plc_info!(context = ctx, "ctrl-c received; shutting down"),
                Err(err) => plc_warn!(context = ctx, "unable to listen for ctrl-c ({}); shutting down", err),
            }
            let _ = shutdown_tx.send(());
            driver_task.await
        }
    };
    let stats = match joined {
        Ok(stats) => stats,
        Err(err) => {
            log_system_event(
                &ctx,
                "driver_failed",
                format_args!("control loop task ended abnormally: {err}"),
                SystemEventOutcome::Fault,
            );
            return Err(err).context("driver task failed");
        }
    };
    info!(
        ticks = stats.ticks,
        reports_sent = stats.reports_sent,
        reports_failed = stats.reports_failed,
        "control loop stopped"
    );

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    Ok(())
}

async fn run_once(config: AppConfig, dry_run: bool) -> Result<()> {
    let to_stdout = dry_run || !config.sink.enabled;
    let sink = build_sink(&config.sink, dry_run)?;
    let sink_name = sink.name().to_owned();
    let mut driver = SimulationDriver::from_config(&config, None, sink)?;
    let outcome = driver.tick().await;
    if !to_stdout {
        print!("{}", outcome.batch.as_str());
    }
    if !outcome.delivered {
        bail!("report to {} failed", sink_name);
    }
    Ok(())
}

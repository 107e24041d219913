//! lamco-screen-coordinator
//!
//! Entry point for the coordinator binary: replays a scenario of hardware
//! events and power calls against the simulated render service.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lamco_screen_coordinator::config::{Config, DeviceClass};
use lamco_screen_coordinator::multiscreen::{MemorySettingsStore, SettingsStore, TomlSettingsStore};
use lamco_screen_coordinator::notify::LoggingListener;
use lamco_screen_coordinator::render::SimulatedRenderService;
use lamco_screen_coordinator::scenario::Scenario;
use lamco_screen_coordinator::utils::{format_user_error, log_startup_diagnostics};
use lamco_screen_coordinator::ScreenSessionManager;

/// Command-line arguments for lamco-screen-coordinator
#[derive(Parser, Debug)]
#[command(name = "lamco-screen-coordinator")]
#[command(version, about = "Screen session coordinator", long_about = None)]
struct Args {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long, env = "LSC_CONFIG")]
    config: Option<String>,

    /// Scenario file (JSON) to replay
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Topology store file, overrides [settings] store_path
    #[arg(long, env = "LSC_SETTINGS")]
    settings: Option<PathBuf>,

    /// Device class override (standard|foldable|dual-panel)
    #[arg(long, value_parser = parse_device_class)]
    device_class: Option<DeviceClass>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    log_format: String,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_device_class(value: &str) -> std::result::Result<DeviceClass, String> {
    match value {
        "standard" => Ok(DeviceClass::Standard),
        "foldable" => Ok(DeviceClass::Foldable),
        "dual-panel" | "dual_panel" => Ok(DeviceClass::DualPanel),
        other => Err(format!("unknown device class '{}'", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_user_error(&e));
            return Err(e);
        }
    };

    init_logging(&args, &config)?;

    info!("════════════════════════════════════════════════════════");
    info!("  lamco-screen-coordinator v{}", env!("CARGO_PKG_VERSION"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    log_startup_diagnostics(&config);
    debug!("Config: {:?}", config);

    if let Err(e) = run(args, config).await {
        eprintln!("{}", format_user_error(&e));
        return Err(e);
    }

    info!("Coordinator shut down");
    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default_config(),
    };
    let config = config.with_overrides(args.device_class, args.settings.clone());
    config.validate().context("Invalid config after CLI overrides")?;
    Ok(config)
}

async fn run(args: Args, config: Config) -> Result<()> {
    let settings: Arc<dyn SettingsStore> = match config.settings.resolved_store_path() {
        Some(path) => {
            info!("Topology store: {}", path.display());
            Arc::new(TomlSettingsStore::open(&path)?)
        }
        None => Arc::new(MemorySettingsStore::new()),
    };

    let render = Arc::new(SimulatedRenderService::new());
    let manager = Arc::new(ScreenSessionManager::new(&config, render, settings)?);
    manager.register_listener(Arc::new(LoggingListener));
    manager
        .start()
        .context("Failed to register with the render service")?;

    let Some(path) = args.scenario else {
        info!("No scenario given, nothing to replay");
        return shutdown(manager);
    };
    let scenario = Scenario::load(&path)?;
    info!("Replaying {} steps from {}", scenario.steps.len(), path.display());

    for (index, step) in scenario.steps.into_iter().enumerate() {
        let worker = Arc::clone(&manager);
        let task = tokio::task::spawn_blocking(move || step.apply(&worker));

        tokio::select! {
            joined = task => {
                let summary = joined
                    .context("Scenario step panicked")?
                    .with_context(|| format!("Scenario step {} failed", index + 1))?;
                info!("[{}] {}", index + 1, summary);
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping replay after step {}", index);
                break;
            }
        }
    }

    shutdown(manager)
}

fn shutdown(manager: Arc<ScreenSessionManager>) -> Result<()> {
    if let Err(e) = manager.flush_notifications(Duration::from_secs(2)) {
        warn!("Pending notifications not delivered: {}", e);
    }
    match Arc::try_unwrap(manager) {
        Ok(manager) => manager.shutdown(),
        Err(_) => warn!("Manager still in use by an interrupted step, skipping orderly shutdown"),
    }
    Ok(())
}

fn init_logging(args: &Args, config: &Config) -> Result<()> {
    use std::fs::File;

    let log_level = match args.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "lamco_screen_coordinator={level},warn",
            level = log_level
        ))
    });

    let log_file_path = args.log_file.clone().or_else(|| {
        config
            .logging
            .log_dir
            .as_ref()
            .map(|dir| dir.join("lamco-screen-coordinator.log"))
    });

    // If log file is specified, write to both stdout and file
    if let Some(log_file_path) = &log_file_path {
        let file = File::create(log_file_path)
            .with_context(|| format!("Failed to create log file {}", log_file_path.display()))?;

        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stdout),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stdout),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stdout),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
        }
        info!("Logging to file: {}", log_file_path.display());
    } else {
        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json())
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().compact())
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().pretty())
                    .init();
            }
        }
    }

    Ok(())
}

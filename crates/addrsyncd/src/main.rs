// # addrsyncd - Dynamic DNS Daemon
//
// A THIN integration layer: all reconciliation logic lives in addrsync-core.
//
// The daemon is responsible for:
// 1. Parsing flags and initializing logging
// 2. Initializing the runtime
// 3. Loading the YAML configuration and registering record services
// 4. Ticking the updaters until SIGTERM/SIGINT
//
// ## Usage
//
// ```bash
// addrsyncd /etc/addrsync.yaml                 # tick every 5 minutes
// addrsyncd --dry-run /etc/addrsync.yaml       # print computed values once
// ADDRSYNC_LOG_LEVEL=debug addrsyncd --interval 60 /etc/addrsync.yaml
// ```

use addrsync_core::{DdnsConfig, IpLookup, ServiceRegistry, UpdateOutcome, Updaters};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Keep dynamic DNS records in sync with this host's public addresses
#[derive(Debug, Parser)]
#[command(name = "addrsyncd", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(env = "ADDRSYNC_CONFIG")]
    config: PathBuf,

    /// Compute and print every record value once, without submitting
    #[arg(long)]
    dry_run: bool,

    /// Seconds between ticks
    #[arg(
        long,
        env = "ADDRSYNC_INTERVAL",
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(10..=86400)
    )]
    interval: u64,

    /// Log verbosity
    #[arg(long, env = "ADDRSYNC_LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not errors
            return if e.use_stderr() {
                DaemonExitCode::ConfigError.into()
            } else {
                DaemonExitCode::CleanShutdown.into()
            };
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(args.log_level))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting addrsyncd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        let updaters = match build_updaters(&args.config).await {
            Ok(updaters) => updaters,
            Err(e) => {
                error!("{:#}", e);
                return DaemonExitCode::ConfigError;
            }
        };
        info!("Configuration loaded: {} record(s)", updaters.len());

        if args.dry_run {
            updaters.dry_run().await;
            return DaemonExitCode::CleanShutdown;
        }

        match run_daemon(updaters, Duration::from_secs(args.interval)).await {
            Ok(signal) => {
                info!("Received shutdown signal: {}", signal);
                info!("Shutting down daemon");
                DaemonExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DaemonExitCode::RuntimeError
            }
        }
    });

    code.into()
}

/// Read and decode the configuration file
async fn load_config(path: &Path) -> Result<DdnsConfig> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    DdnsConfig::from_yaml_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Registry with every record service compiled into this binary
fn service_registry() -> ServiceRegistry {
    let registry = ServiceRegistry::new();

    #[cfg(feature = "cloudflare")]
    addrsync_provider_cloudflare::register(&registry);

    #[cfg(feature = "dyndns")]
    addrsync_provider_dyndns::register(&registry);

    debug!("Registered services: {:?}", registry.list_services());
    registry
}

/// Load, validate and build everything needed to start ticking
async fn build_updaters(path: &Path) -> Result<Updaters> {
    let config = load_config(path).await?;
    let lookup = Arc::new(IpLookup::with_system_interfaces(
        addrsync_ip_http::default_services(),
    ));

    Updaters::from_config(&config, &service_registry(), lookup)
        .with_context(|| format!("Invalid configuration in {}", path.display()))
}

/// Tick until a shutdown signal arrives
///
/// A signal interrupts an in-flight tick; no state outlives the process.
async fn run_daemon(mut updaters: Updaters, interval: Duration) -> Result<&'static str> {
    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => return signal,
            _ = tick(&mut updaters, interval) => {}
        }
    }
}

async fn tick(updaters: &mut Updaters, interval: Duration) {
    let outcomes = updaters.update().await;
    let submitted = outcomes
        .iter()
        .filter(|o| matches!(o, UpdateOutcome::Submitted { .. }))
        .count();
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, UpdateOutcome::Failed { .. }))
        .count();
    debug!(
        "Tick done: {} submitted, {} failed, next in {:?}",
        submitted, failed, interval
    );

    tokio::time::sleep(interval).await;
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

//! uptimed — the UptimeShield daemon.
//!
//! Single binary that assembles the dashboard backend:
//! - State store (redb)
//! - Application context (registry, event log, settings)
//! - Supervisor tick loop with the simulated probe
//! - Registry persistence loop
//! - Inventory and diagnostics adapters
//! - REST API
//!
//! # Usage
//!
//! ```text
//! uptimed serve --port 8080 --data-dir /var/lib/uptimeshield --monitor
//! uptimed export --data-dir /var/lib/uptimeshield --output services.config.json
//! uptimed import --data-dir /var/lib/uptimeshield --input services.config.json
//! ```

mod config;
mod persist;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use uptime_adapters::{DiagnosticAdvisor, GeminiGenerator, InventoryClient, diagnostics, inventory};
use uptime_api::{ApiState, build_router};
use uptime_state::StateStore;
use uptime_state::transfer::{export_services, parse_import};
use uptime_supervisor::{AppContext, SimulatedProbe, Supervisor};

use crate::config::DaemonConfig;

const DEFAULT_LOG_FILTER: &str = "info,uptimed=debug,uptime=debug";
const DB_FILE: &str = "uptime.redb";

#[derive(Parser)]
#[command(name = "uptimed", about = "UptimeShield daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the supervisor and REST API.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/uptimeshield")]
        data_dir: PathBuf,

        /// Optional TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Start monitoring immediately.
        #[arg(long)]
        monitor: bool,
    },

    /// Write the persisted registry as a JSON array.
    Export {
        #[arg(long, default_value = "/var/lib/uptimeshield")]
        data_dir: PathBuf,

        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Replace the persisted registry with a JSON array.
    Import {
        #[arg(long, default_value = "/var/lib/uptimeshield")]
        data_dir: PathBuf,

        #[arg(long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve {
            port,
            data_dir,
            config,
            monitor,
        } => run_serve(port, data_dir, config, monitor).await,
        Command::Export { data_dir, output } => run_export(&data_dir, output.as_deref()),
        Command::Import { data_dir, input } => run_import(&data_dir, &input),
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // stderr keeps `export` output on stdout clean.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_store(data_dir: &Path) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let db_path = data_dir.join(DB_FILE);
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");
    Ok(store)
}

async fn run_serve(
    port: u16,
    data_dir: PathBuf,
    config_path: Option<PathBuf>,
    monitor: bool,
) -> anyhow::Result<()> {
    info!("UptimeShield daemon starting");

    let config = match &config_path {
        Some(path) => DaemonConfig::from_file(path)?,
        None => DaemonConfig::default(),
    };

    // ── State ──────────────────────────────────────────────────

    let store = open_store(&data_dir)?;

    let settings = config.resolve_settings(store.load_settings()?)?;
    store.save_settings(&settings)?;
    if let Some(include_system) = config.inventory.include_system {
        store.save_show_hidden(include_system)?;
    }

    let services = store.load_services()?;
    info!(
        services = services.len(),
        check_interval = settings.check_interval,
        "registry loaded"
    );
    let ctx = AppContext::with_services(settings, services);

    // ── Supervisor & adapters ──────────────────────────────────

    let supervisor = Arc::new(Supervisor::new(
        ctx.clone(),
        Arc::new(SimulatedProbe::default()),
    ));

    let inventory = match &config.inventory.url {
        Some(url) => {
            info!(%url, "inventory adapter enabled");
            Some(InventoryClient::new(url.clone(), inventory::DEFAULT_TIMEOUT)?)
        }
        None => None,
    };

    let api_key = config.api_key();
    if api_key.is_none() {
        warn!(
            env = %config.diagnostics.api_key_env,
            "diagnostics API key not set, analysis will return a fallback message"
        );
    }
    let generator = GeminiGenerator::new(
        config.diagnostics.endpoint.clone(),
        config.diagnostics.model.clone(),
        api_key,
        diagnostics::DEFAULT_TIMEOUT,
    )?;
    let advisor = DiagnosticAdvisor::new(Arc::new(generator));

    // ── Background tasks ───────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let persist_handle = tokio::spawn(persist::run_persist_loop(
        ctx.clone(),
        store.clone(),
        shutdown_rx,
    ));

    if monitor {
        supervisor.start().await;
    }

    // ── API server ─────────────────────────────────────────────

    let router = build_router(ApiState {
        supervisor: supervisor.clone(),
        store,
        inventory,
        advisor,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown signal received");
        })
        .await?;

    supervisor.stop().await;
    let _ = shutdown_tx.send(true);
    let _ = persist_handle.await;

    info!("UptimeShield daemon stopped");
    Ok(())
}

fn run_export(data_dir: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    let services = store.load_services()?;
    let json = export_services(&services)?;

    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), count = services.len(), "registry exported");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_import(data_dir: &Path, input: &Path) -> anyhow::Result<()> {
    let payload = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let services = parse_import(&payload)?;

    let store = open_store(data_dir)?;
    store.save_services(&services)?;
    info!(path = %input.display(), count = services.len(), "registry imported");
    Ok(())
}

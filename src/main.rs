//! Service host.
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ──▶ ConfigStore ◀── ConfigWatcher (hot reload)
//!                       │
//!                       ▼
//!   Coordinator: load ─▶ open mysql ─▶ open redis ─▶ bind + serve
//!                                                        │
//!   SIGINT/SIGTERM ──────────────────────────────────────┘
//!                       │
//!                       ▼
//!   drain (bounded) ─▶ close redis ─▶ close mysql ─▶ exit
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use service_host::config::{ConfigSource, ConfigStore};
use service_host::http::{setup_router, AppState};
use service_host::lifecycle::{exit_status, Coordinator, Signals};
use service_host::observability::logging;
use service_host::resources::{MySqlStore, RedisStore};

#[derive(Parser)]
#[command(name = "service-host")]
#[command(about = "Runs the HTTP service with its backing stores", long_about = None)]
struct Cli {
    /// Use this config file instead of searching for one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to search for the config file (repeatable, in order)
    #[arg(long = "config-dir", default_value = ".")]
    config_dirs: Vec<PathBuf>,

    /// Config file base name, without extension
    #[arg(long, default_value = "config")]
    config_name: String,

    /// Load and validate the configuration, then exit
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn source(&self) -> ConfigSource {
        match &self.config {
            Some(path) => ConfigSource::file(path),
            None => ConfigSource::search(self.config_name.clone(), self.config_dirs.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let store = Arc::new(ConfigStore::new());
    let mysql = Arc::new(MySqlStore::new());
    let redis = Arc::new(RedisStore::new());

    let mut coordinator = Coordinator::new(cli.source(), store.clone())
        .with_resource(mysql.clone())
        .with_resource(redis.clone());

    let snapshot = match coordinator.load_config() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("init settings failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        println!(
            "configuration ok: {} {} ({}) on {}",
            snapshot.app.name,
            snapshot.app.version,
            snapshot.app.mode,
            snapshot.app.bind_address()
        );
        return ExitCode::SUCCESS;
    }

    let _log_guard = match logging::init(&snapshot.log, snapshot.app.is_dev()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("init logger failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        name = %snapshot.app.name,
        version = %snapshot.app.version,
        machine_id = snapshot.app.machine_id,
        start_time = ?snapshot.app.start_time,
        "service-host starting"
    );

    let signals = match Signals::install() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            eprintln!("install signal handlers failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = coordinator.open_resources().await {
        eprintln!("init resources failed: {e}");
        return ExitCode::FAILURE;
    }

    let router = setup_router(AppState::new(store, mysql, redis));
    let shutdown_signal = async move {
        if signals.wait().await.is_none() {
            tracing::warn!("Signal stream closed; shutting down");
        }
    };

    let result = coordinator.serve(router, shutdown_signal).await;
    match &result {
        Ok(outcome) => tracing::info!(outcome = ?outcome, "Server exiting"),
        Err(e) => {
            tracing::error!(error = %e, "Server exiting with error");
            eprintln!("serve failed: {e}");
        }
    }
    ExitCode::from(exit_status(&result))
}

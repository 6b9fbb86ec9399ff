//! # standup - service entry point
//!
//! ## Initialization Sequence
//!
//! 1. **Configuration** - TOML file, every field defaulted
//! 2. **SurrealDB Connection** - connect, define the schema, verify health
//! 3. **Actor runtime** - collaborators, clock and directories; every actor
//!    with a pending wake-up is reloaded so its timer is armed again
//! 4. **Axum API** - serve until Ctrl+C
//!
//! ## Shutdown
//!
//! On Ctrl+C the server stops accepting requests and every actor is stopped.
//! Actor state and pending wake-ups stay in the store and resume on the
//! next start.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use standup_orchestrator::api::{self, ApiState};
use standup_orchestrator::integrations::{
    DisabledWorkLogClient, HttpWorkLogClient, Integrations, LoggingChatClient, WorkLogClient,
};
use standup_orchestrator::persistence::SurrealStore;
use standup_orchestrator::{ActorRuntime, MeetingOrchestrator, StandupConfig, SystemClock};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match Cli::parse().command {
        Commands::Serve { config } => serve(config.as_deref()).await,
        Commands::CheckConfig { config } => check_config(&config),
    }
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: Option<&Path>) -> Result<StandupConfig> {
    match path {
        Some(path) => StandupConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(StandupConfig::default()),
    }
}

fn check_config(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

async fn serve(path: Option<&Path>) -> Result<()> {
    let start_time = Instant::now();
    let config = load_config(path)?;
    let bind = config.bind_addr()?;

    let store = SurrealStore::open(&config.store)
        .await
        .context("Database initialization failed. Please check the [store] settings")?;

    let work_log: Arc<dyn WorkLogClient> = match &config.work_log {
        Some(settings) => Arc::new(
            HttpWorkLogClient::new(&settings.endpoint, Duration::from_secs(settings.timeout_secs))
                .context("Failed to build work-log client")?,
        ),
        None => Arc::new(DisabledWorkLogClient),
    };
    let store = Arc::new(store);
    let integrations = Integrations {
        chat: Arc::new(LoggingChatClient::new()),
        work_log,
        meetings: store.clone(),
        responses: store.clone(),
        active: store.clone(),
    };
    let runtime = ActorRuntime::new(integrations, store, Arc::new(SystemClock), config.schedule);
    let recovered = runtime
        .recover()
        .await
        .context("Failed to reload scheduled actors")?;
    info!(recovered, "Actor runtime ready");
    let orchestrator = MeetingOrchestrator::new(Arc::clone(&runtime));

    let app = api::router(ApiState::new(orchestrator));
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(
        "standup listening on http://{} (started in {:?})",
        bind,
        start_time.elapsed()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("API server failed")?;

    info!("Stopping actors...");
    runtime.shutdown().await;
    info!("standup stopped gracefully");
    Ok(())
}


/// Wait for shutdown signal (Ctrl+C).
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}

//! Remediator
//!
//! Automated remediation agent: receives Alertmanager webhook
//! notifications and restarts the misbehaving containers they map to,
//! and independently polls container health, auto-restarting containers
//! that stay unhealthy across consecutive passes. Only containers that
//! opt in via a label are ever touched.

mod alerts;
mod config;
mod executor;
mod hysteresis;
mod metrics;
mod runtime;
mod safety;
mod server;
#[cfg(test)]
mod testutil;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use config::{RemediatorConfig, RoutingTable};
use executor::RemediationExecutor;
use hysteresis::HealthHysteresis;
use metrics::MetricsSink;
use runtime::{ContainerRuntime, DockerRuntime};
use server::ServerState;

/// Automated remediation agent for opt-in labeled containers
#[derive(Parser)]
#[command(name = "remediator")]
#[command(about = "Restarts opt-in labeled containers on alerts and failing healthchecks")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Label key a container must carry with value "true" to opt in
    #[arg(long, env = "ALLOWED_LABEL", default_value = config::DEFAULT_ALLOWED_LABEL)]
    allowed_label: String,

    /// Seconds between health poll passes
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = config::DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval: u64,

    /// Consecutive unhealthy observations before an auto-restart
    #[arg(long, env = "UNHEALTHY_THRESHOLD", default_value_t = config::DEFAULT_UNHEALTHY_THRESHOLD)]
    unhealthy_threshold: u32,

    /// Path to a JSON routing table (alert name -> container names),
    /// replacing the built-in routes
    #[arg(long, env = "ROUTES_FILE")]
    routes_file: Option<PathBuf>,

    /// Docker socket path (defaults to the local Docker endpoint)
    #[arg(long, env = "DOCKER_SOCKET")]
    docker_socket: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "remediator=debug,tower_http=debug"
        } else {
            "remediator=info"
        })
        .init();

    let config = RemediatorConfig {
        allowed_label: cli.allowed_label,
        unhealthy_threshold: cli.unhealthy_threshold,
        poll_interval: Duration::from_secs(cli.poll_interval),
    };

    let routes = match &cli.routes_file {
        Some(path) => RoutingTable::from_file(path)?,
        None => RoutingTable::builtin(),
    };
    info!(
        "Routing table loaded: {} alert(s), safety label: {}=true",
        routes.len(),
        config.allowed_label
    );

    let docker = match cli.docker_socket.as_deref() {
        Some(path) => DockerRuntime::connect_socket(path),
        None => DockerRuntime::connect_local(),
    }
    .context("Failed to connect to the container runtime")?;
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(docker);

    let metrics = Arc::new(MetricsSink::new());
    let executor = Arc::new(RemediationExecutor::new(
        runtime.clone(),
        metrics.clone(),
        &config.allowed_label,
    ));

    let hysteresis = Arc::new(HealthHysteresis::new(
        runtime,
        executor.clone(),
        &config.allowed_label,
        config.unhealthy_threshold,
    ));
    info!(
        "Health poll loop: every {}s, threshold {}",
        config.poll_interval.as_secs(),
        config.unhealthy_threshold
    );
    tokio::spawn(hysteresis.run(config.poll_interval));

    let state = Arc::new(ServerState {
        executor,
        routes,
        metrics,
    });
    server::run_server(state, &format!("0.0.0.0:{}", cli.port)).await
}

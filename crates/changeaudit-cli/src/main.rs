//! ChangeAudit
//!
//! Compare two revisions of a structured document, describe every change
//! with a language model, and learn classification rules from reviewer
//! corrections.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod cli;
mod commands;
mod config;
mod render;

use cli::{Cli, Commands};
use config::AuditConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let metrics_handle = match &cli.metrics_file {
        Some(_) => Some(init_metrics()?),
        None => None,
    };

    let config = AuditConfig::load(cli.config.as_deref())?;
    info!(
        backend = ?config.backend.kind,
        model = %config.backend.model,
        rules = ?config.rules.backend,
        "Configuration loaded"
    );

    let result = match &cli.command {
        Commands::Audit(args) => {
            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_signal(cancel.clone()));

            commands::audit(config, args, cancel).await.map(|report| {
                if report.has_errors() {
                    warn!(
                        failed = report.summary().errors,
                        "Some changes could not be classified"
                    );
                }
            })
        }
        Commands::Rules { command } => commands::rules(&config, command).await,
        Commands::Train(args) => commands::train(&config, args).await,
    };

    if let (Some(handle), Some(path)) = (&metrics_handle, &cli.metrics_file) {
        if let Err(e) = write_metrics(handle, path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics");
        }
    }

    result
}

/// Cancel the run on Ctrl+C; in-flight requests finish, no new ones start
async fn cancel_on_signal(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            warn!("Interrupt received, finishing in-flight requests");
            cancel.cancel();
        }
        Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
    }
}

/// Initialize tracing/logging on stderr
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("changeaudit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("changeaudit=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Install the metrics recorder and return the handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "changeaudit_classifications_total",
        "Classification attempts by outcome"
    );
    metrics::describe_histogram!(
        "changeaudit_classification_latency_ms",
        metrics::Unit::Milliseconds,
        "Classification latency in milliseconds, retries included"
    );
    metrics::describe_counter!(
        "changeaudit_rule_store_fallbacks_total",
        "Rule loads that fell back to the seed rules"
    );
    metrics::describe_counter!("changeaudit_pairs_total", "Aligned pairs by kind");

    Ok(handle)
}

/// Write the Prometheus text exposition to `path`
fn write_metrics(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    std::fs::write(path, handle.render())?;
    info!(path = %path.display(), "Metrics written");
    Ok(())
}

//! Batch video classifier
//!
//! Single-binary batch job that:
//! 1. Reads video identifiers from a CSV input
//! 2. Skips identifiers already present in the output store
//! 3. Looks each one up with a rotating pool of API credentials
//! 4. Labels it short, standard or failed and checkpoints results in batches
//!
//! SIGINT/SIGTERM stops dispatch, lets in-flight lookups finish and flushes
//! everything buffered. Exit code 0 means every pending identifier was
//! processed; 130 means the run was interrupted and can be resumed.

mod classifier;
mod config;
mod engine;
mod error;
mod metrics;
mod runner;
mod service;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use credential_pool::CredentialPool;
use tracing::{Instrument, error, info, info_span};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use video_lookup::{HttpLookup, Lookup};

use crate::config::Config;
use crate::runner::Runner;
use crate::service::ShutdownController;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr with LOG_LEVEL / RUST_LOG support; stdout carries the summary
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let run_id = uuid::Uuid::new_v4();
    let span = info_span!("run", %run_id);

    let exit_code = async {
        info!(
            path = %config_path.display(),
            input = %config.input.path.display(),
            output = %config.output.path.display(),
            endpoint_url = %config.lookup.endpoint_url,
            workers = config.engine.workers,
            flush_threshold = config.engine.flush_threshold,
            "starting batch-classifier"
        );

        let pool = CredentialPool::load(&config.credentials.path)
            .await
            .with_context(|| {
                format!(
                    "failed to load credentials from {}",
                    config.credentials.path.display()
                )
            })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.lookup.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        let lookup: Arc<dyn Lookup> = Arc::new(HttpLookup::new(
            client,
            config.lookup.endpoint_url.clone(),
            Duration::from_secs(config.lookup.timeout_secs),
        ));

        let shutdown = Arc::new(ShutdownController::new());
        tokio::spawn(listen_for_signals(shutdown.clone()).in_current_span());

        let runner = Runner::new(&config, Arc::new(pool), lookup);
        let result = runner.run(shutdown).await;

        // Metrics are written even when the run failed
        if let Some(ref metrics_config) = config.metrics {
            if let Err(e) = metrics::write_textfile(&prometheus_handle, &metrics_config.textfile).await
            {
                error!(
                    error = %e,
                    path = %metrics_config.textfile.display(),
                    "failed to write metrics textfile"
                );
            }
        }

        let summary = result.context("run aborted")?;
        println!("{summary}");
        anyhow::Ok(summary.exit_code())
    }
    .instrument(span)
    .await?;

    if exit_code != service::EXIT_COMPLETED {
        std::process::exit(exit_code);
    }
    Ok(())
}

/// Trigger shutdown on every SIGINT/SIGTERM. Only the first one has effect;
/// later ones are logged and ignored.
async fn listen_for_signals(shutdown: Arc<ShutdownController>) {
    loop {
        shutdown_signal().await;
        shutdown.trigger();
    }
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}

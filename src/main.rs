//! Main entry point for the vantage CLI

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use vantage_dataflow::cli::{Cli, CliError, Commands};
use vantage_dataflow::shutdown::CancelSignal;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vantage=info,vantage_dataflow=info"));

    // Logs go to stderr so stdout carries only the payload.
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = vantage_dataflow::metrics::init_metrics(addr).await {
            error!("Failed to start metrics exporter: {}", e);
        }
    }

    // Ctrl+C aborts in-flight requests and pending backoff sleeps.
    let cancel = CancelSignal::shared();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - cancelling request...");
                cancel.cancel();
            }
        }
    });

    let result = match &cli.command {
        Commands::Query(args) => args
            .execute(&cli, cancel.clone())
            .await
            .map_err(anyhow::Error::from),
        Commands::Filter(args) => args.execute(&cli).map_err(anyhow::Error::from),
    };

    match result {
        Ok(text) => print!("{text}"),
        Err(e) => {
            error!("Command failed: {:#}", e);
            if let Some(hint) = e.downcast_ref::<CliError>().and_then(CliError::hint) {
                eprintln!("{hint}");
            }
            std::process::exit(1);
        }
    }
}

//! perfwatch CLI
//!
//! Command-line interface for the perfwatch performance monitoring server.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use perfwatch::collector::Collector;
use perfwatch::telemetry;

/// perfwatch - Web Vitals aggregation and alerting
#[derive(Parser)]
#[command(name = "perfwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "PERFWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// HTTP port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = match perfwatch::Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve { host, port } => run_serve(config, cli.verbose, host, port).await,
        Commands::Config => print_config(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_serve(
    mut config: perfwatch::Config,
    verbose: bool,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    telemetry::init_tracing(&config.logging, verbose)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!(
        addr = %config.bind_addr(),
        max_reports = config.retention.max_reports,
        max_alerts = config.retention.max_alerts,
        webhook = config.alerting.notifications.webhook_url.is_some(),
        "Starting perfwatch"
    );

    let mut collector = Collector::new(config).context("failed to build collector")?;
    collector.start().await.context("server error")?;

    Ok(())
}

fn print_config(config: &perfwatch::Config) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    println!("{json}");
    Ok(())
}

mod commands;
mod gateway;
mod render;
mod util;

use std::time::Duration;

use clap::{Parser, Subcommand};
use riskflow_core::SessionConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::catalog::CatalogCommands;
use crate::gateway::HttpCatalog;
use crate::util::exit_error;

#[derive(Parser)]
#[command(
    name = "riskflow",
    version,
    about = "Riskflow CLI: guided risk-assessment interview against the catalog service"
)]
struct Cli {
    /// Catalog service base URL
    #[arg(long, env = "RISKFLOW_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Per-request timeout for catalog calls, in seconds
    #[arg(long, env = "RISKFLOW_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Inactivity window of a running assessment, in seconds
    /// (falls back to RISKFLOW_INACTIVITY_TIMEOUT_SECS, then 300)
    #[arg(long)]
    inactivity_timeout_secs: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, env = "RISKFLOW_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive risk-assessment interview (default)
    Interview,
    /// Query the catalog service directly
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "riskflow_cli=info,riskflow_core=info".into());
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

fn session_config(flag: Option<&str>) -> SessionConfig {
    match flag {
        Some(value) => SessionConfig::from_timeout_value(Some(value)),
        None => SessionConfig::from_env(),
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let gateway = match HttpCatalog::new(
        &cli.api_url,
        Duration::from_secs(cli.request_timeout_secs),
    ) {
        Ok(gateway) => gateway,
        Err(e) => exit_error(
            &e.to_string(),
            Some("Set --api-url or RISKFLOW_API_URL to the catalog service base URL."),
        ),
    };

    let code = match cli.command.unwrap_or(Commands::Interview) {
        Commands::Interview => {
            let config = session_config(cli.inactivity_timeout_secs.as_deref());
            commands::interview::run(gateway, config).await
        }
        Commands::Catalog { command } => commands::catalog::run(&gateway, command).await,
    };

    std::process::exit(code);
}

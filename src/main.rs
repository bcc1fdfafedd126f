//! telegate - API gateway for the Telegram bot backends

#![allow(missing_docs)]

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use telegate::config::{Config, DEFAULT_CONFIG_PATH};
use telegate::server;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "gateway", version, about = "API gateway for the Telegram bot backends")]
struct Args {
    /// YAML configuration file; defaults apply when it does not exist
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, ignore_case = true, default_value = "text")]
    log_format: LogFormat,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(args.log_format);

    let result = match Config::load_from(&args.config).await {
        Ok(_) if args.check => {
            println!("Configuration OK");
            Ok(())
        }
        Ok(config) => server::run_server(config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Display keeps multi-line config errors readable
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

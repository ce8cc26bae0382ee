//! # Uniscope server binary
//!
//! ```bash
//! uniscope --config ./config/uniscope.toml serve
//! ```
//!
//! Configuration is layered: TOML file (optional), then environment
//! variables (`COMPLETION_API_KEY`, `REDIS_URL`, `BIND_ADDR`, ...).
//! Log verbosity follows `RUST_LOG`, defaulting to `info`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use uniscope::{config, server};

#[derive(Parser)]
#[command(
    name = "uniscope",
    about = "Community-grounded study-abroad insight API over discussion evidence and LLM synthesis",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). A missing file falls back to
    /// built-in defaults plus environment overrides.
    #[arg(long, global = true, default_value = "./config/uniscope.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => server::run_server(&cfg).await?,
    }

    Ok(())
}

/*
newsdigest - main.rs
This binary loads configuration, builds the fetcher and the map-reduce summarizer and
serves the `/summarize` endpoint with Rocket.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newsdigest::llm;
use newsdigest::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "newsdigest", about = "Fetch articles and summarize them with an LLM")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // API keys may live in a local .env file
    match dotenv::dotenv() {
        Ok(path) => info!(path = ?path, "loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(%e, "failed to read .env file"),
    }

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    // Load configuration with defaults
    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("failed to load configuration: {:#}", e);
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let llm_provider: Arc<dyn llm::LlmProvider> = match llm::create_llm_provider(&config.llm) {
        Ok(provider) => Arc::from(provider),
        Err(e) => {
            error!("failed to initialize LLM provider: {:#}", e);
            return Err(e);
        }
    };
    info!(model = llm_provider.model(), "LLM provider initialized");

    let state = AppState::from_config(&config, llm_provider)
        .context("invalid configuration")
        .map_err(|e| {
            error!("{:#}", e);
            e
        })?;

    server::launch_rocket(state, &config.server).await
}

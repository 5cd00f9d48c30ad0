use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rocket::figment::Figment;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, Rocket, State};
use serde::{Deserialize, Serialize};

use common::{Config, ServerConfig};

use crate::chunking::{ChunkWindow, DEFAULT_MAX_TOKENS, DEFAULT_OVERLAP};
use crate::llm::summarizer::{MapReduceSummarizer, Prompts};
use crate::llm::LlmProvider;
use crate::pacing::Pacer;
use crate::processing::{self, ArticleResult};
use crate::scraping::ArticleFetcher;

const DEFAULT_DELAY_SECONDS: u64 = 5;
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Application state stored inside Rocket managed state.
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub fetcher: ArticleFetcher,
    pub summarizer: MapReduceSummarizer,
}

impl AppState {
    /// Wire the fetcher and summarizer from configuration.
    ///
    /// Fails on an invalid chunk window or prompt template; callers treat this as fatal.
    pub fn from_config(config: &Config, llm_provider: Arc<dyn LlmProvider>) -> Result<Self> {
        let politeness = &config.politeness;
        let fetch_pacer = Arc::new(Pacer::from_secs(
            politeness.delay_seconds.unwrap_or(DEFAULT_DELAY_SECONDS),
        ));
        let fetcher = ArticleFetcher::new(
            politeness
                .fetch_timeout_seconds
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECONDS),
            politeness.user_agent.as_deref(),
            fetch_pacer,
        )?;

        let summarizer_cfg = &config.summarizer;
        let window = ChunkWindow::new(
            summarizer_cfg.chunk_max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            summarizer_cfg.chunk_overlap.unwrap_or(DEFAULT_OVERLAP),
        )
        .context("invalid [summarizer] chunk settings")?;
        let prompts = Prompts::from_overrides(
            summarizer_cfg.map_prompt.as_deref(),
            summarizer_cfg.reduce_prompt.as_deref(),
        )?;
        let llm_pacer = Arc::new(Pacer::from_secs(
            config.llm.call_delay_seconds.unwrap_or(DEFAULT_DELAY_SECONDS),
        ));

        Ok(Self {
            started_at: Utc::now(),
            fetcher,
            summarizer: MapReduceSummarizer::new(llm_provider, llm_pacer, window, prompts),
        })
    }
}

/// Request body for `/summarize`.
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub urls: Option<Vec<String>>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub description: String,
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    model: String,
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning simple JSON with uptime and the configured model.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        model: state.summarizer.model().to_string(),
    })
}

/// Summarize every unique URL of the request body.
///
/// A missing or empty `urls` list is answered with 404, which existing clients rely on.
#[post("/summarize", data = "<body>")]
async fn summarize(
    state: &State<AppState>,
    body: Json<SummarizeRequest>,
) -> Result<Json<Vec<ArticleResult>>, Custom<Json<ErrorBody>>> {
    let urls = body.into_inner().urls.unwrap_or_default();
    if urls.is_empty() {
        tracing::warn!("summarize: request without URLs");
        return Err(Custom(
            Status::NotFound,
            Json(ErrorBody {
                error: "Not Found".to_string(),
                description: "No URLs provided".to_string(),
            }),
        ));
    }

    let results = processing::process_urls(&state.fetcher, &state.summarizer, &urls).await;
    Ok(Json(results))
}

/// Build the Rocket instance with managed state and routes.
pub fn build_rocket(state: AppState, figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount("/", routes![health, status, summarize])
}

/// Rocket figment with `[server] bind/port` applied on top of Rocket's own sources.
pub fn server_figment(server: &ServerConfig) -> Figment {
    let mut fig = rocket::Config::figment();
    if let Some(bind) = &server.bind {
        fig = fig.merge(("address", bind.clone()));
    }
    if let Some(port) = server.port {
        fig = fig.merge(("port", port));
    }
    fig
}

/// Build and launch a Rocket server.
///
/// This function blocks until the Rocket server shuts down (it awaits `rocket.launch().await`)
/// and returns an error if Rocket fails to start.
pub async fn launch_rocket(state: AppState, server: &ServerConfig) -> Result<()> {
    let rocket = build_rocket(state, server_figment(server));

    // Launch Rocket - this will run until shutdown (SIGINT/SIGTERM etc.)
    tracing::info!("Starting Rocket HTTP server");
    rocket
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}

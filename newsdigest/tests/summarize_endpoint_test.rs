use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use common::{Config, LlmConfig, PolitenessConfig, ServerConfig, SummarizerConfig};
use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;

use newsdigest::llm::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use newsdigest::processing::{ArticleResult, ArticleStatus};
use newsdigest::server::{build_rocket, server_figment, AppState};

const REDUCE_MARKER: &str = "5 major points";

/// Answers map prompts with "partial N" and the reduce prompt with "FINAL SUMMARY"
struct FakeLlm {
    prompts: Mutex<Vec<String>>,
    fail_reduce: bool,
}

impl FakeLlm {
    fn new(fail_reduce: bool) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            fail_reduce,
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let is_reduce = request.prompt.contains(REDUCE_MARKER);
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.prompt);
            prompts.len()
        };
        if is_reduce && self.fail_reduce {
            bail!("LLM API error 503 Service Unavailable: overloaded");
        }
        let content = if is_reduce {
            "FINAL SUMMARY".to_string()
        } else {
            format!("partial {}", call)
        };
        Ok(LlmResponse {
            content,
            usage: UsageMetadata::default(),
            model: "fake".to_string(),
        })
    }

    fn model(&self) -> &str {
        "fake"
    }
}

fn test_config() -> Config {
    Config {
        server: ServerConfig::default(),
        politeness: PolitenessConfig {
            delay_seconds: Some(0),
            fetch_timeout_seconds: Some(5),
            user_agent: None,
        },
        llm: LlmConfig {
            call_delay_seconds: Some(0),
            ..Default::default()
        },
        summarizer: SummarizerConfig::default(),
    }
}

async fn client_with(llm: Arc<FakeLlm>) -> Client {
    let state = AppState::from_config(&test_config(), llm).expect("app state");
    let rocket = build_rocket(state, server_figment(&ServerConfig::default()));
    Client::tracked(rocket).await.expect("valid rocket instance")
}

async fn post_urls(client: &Client, body: &str) -> (Status, Option<String>) {
    let response = client
        .post("/summarize")
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_string().await)
}

const ARTICLE_HTML: &str = r#"<html>
<head>
  <title>Ferris goes to town</title>
  <meta property="article:published_time" content="2024-03-01T08:00:00Z">
</head>
<body>
  <p>Ferris the crab visited the town square.</p>
  <p>Everyone cheered.</p>
</body>
</html>"#;

const ARTICLE_BODY: &str = "Ferris the crab visited the town square. Everyone cheered.";

#[rocket::async_test]
async fn empty_url_list_is_not_found() {
    let llm = FakeLlm::new(false);
    let client = client_with(llm.clone()).await;

    let (status, body) = post_urls(&client, r#"{"urls": []}"#).await;
    assert_eq!(status, Status::NotFound);
    assert!(body.unwrap_or_default().contains("No URLs provided"));

    let (status, body) = post_urls(&client, r#"{}"#).await;
    assert_eq!(status, Status::NotFound);
    assert!(body.unwrap_or_default().contains("No URLs provided"));

    assert!(llm.prompts().is_empty());
}

#[rocket::async_test]
async fn successful_article_returns_reduce_output() {
    let mut site = mockito::Server::new_async().await;
    let page = site
        .mock("GET", "/good")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(ARTICLE_HTML)
        .create_async()
        .await;

    let llm = FakeLlm::new(false);
    let client = client_with(llm.clone()).await;

    let url = format!("{}/good", site.url());
    let (status, body) = post_urls(&client, &format!(r#"{{"urls": ["{}"]}}"#, url)).await;
    assert_eq!(status, Status::Ok);

    let results: Vec<ArticleResult> = serde_json::from_str(&body.unwrap()).unwrap();
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.url, url);
    assert_eq!(result.title, "Ferris goes to town");
    assert_eq!(result.date, "2024-03-01T08:00:00Z");
    assert_eq!(result.summary, "FINAL SUMMARY");
    assert_eq!(result.data, ARTICLE_BODY);
    assert_eq!(result.status, ArticleStatus::Ok);

    // one map call for the short body, then the reduce call over its summary
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].ends_with(ARTICLE_BODY));
    assert!(prompts[1].contains(REDUCE_MARKER));
    assert!(prompts[1].ends_with("partial 1"));

    page.assert_async().await;
}

#[rocket::async_test]
async fn page_without_paragraphs_is_reduced_from_empty_text() {
    let mut site = mockito::Server::new_async().await;
    let _page = site
        .mock("GET", "/bare")
        .with_status(200)
        .with_body("<html><head><title>Bare</title></head><body><div>x</div></body></html>")
        .create_async()
        .await;

    let llm = FakeLlm::new(false);
    let client = client_with(llm.clone()).await;

    let url = format!("{}/bare", site.url());
    let (status, body) = post_urls(&client, &format!(r#"{{"urls": ["{}"]}}"#, url)).await;
    assert_eq!(status, Status::Ok);

    let results: Vec<ArticleResult> = serde_json::from_str(&body.unwrap()).unwrap();
    assert_eq!(results[0].status, ArticleStatus::Ok);
    assert_eq!(results[0].summary, "FINAL SUMMARY");
    assert_eq!(results[0].data, "");

    // no map calls, a single reduce over nothing
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(REDUCE_MARKER));
    assert!(prompts[0].ends_with(": "));
}

#[rocket::async_test]
async fn duplicate_urls_are_processed_once() {
    let mut site = mockito::Server::new_async().await;
    let page = site
        .mock("GET", "/dup")
        .with_status(200)
        .with_body(ARTICLE_HTML)
        .expect(1)
        .create_async()
        .await;

    let llm = FakeLlm::new(false);
    let client = client_with(llm.clone()).await;

    let url = format!("{}/dup", site.url());
    let (status, body) =
        post_urls(&client, &format!(r#"{{"urls": ["{0}", "{0}"]}}"#, url)).await;
    assert_eq!(status, Status::Ok);

    let results: Vec<ArticleResult> = serde_json::from_str(&body.unwrap()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(llm.prompts().len(), 2);

    page.assert_async().await;
}

#[rocket::async_test]
async fn fetch_failure_yields_placeholder() {
    let mut site = mockito::Server::new_async().await;
    let _page = site
        .mock("GET", "/missing")
        .with_status(500)
        .create_async()
        .await;

    let llm = FakeLlm::new(false);
    let client = client_with(llm.clone()).await;

    let url = format!("{}/missing", site.url());
    let (status, body) = post_urls(&client, &format!(r#"{{"urls": ["{}"]}}"#, url)).await;
    assert_eq!(status, Status::Ok);

    let results: Vec<ArticleResult> = serde_json::from_str(&body.unwrap()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].summary, "Error fetching article content");
    assert_eq!(results[0].data, "No content");
    assert_eq!(results[0].title, "No Title");
    assert_eq!(results[0].date, "No Date");
    assert_eq!(results[0].status, ArticleStatus::FetchError);
    assert!(llm.prompts().is_empty());
}

#[rocket::async_test]
async fn reduce_failure_keeps_fetched_body() {
    let mut site = mockito::Server::new_async().await;
    let _page = site
        .mock("GET", "/good")
        .with_status(200)
        .with_body(ARTICLE_HTML)
        .create_async()
        .await;

    let llm = FakeLlm::new(true);
    let client = client_with(llm.clone()).await;

    let url = format!("{}/good", site.url());
    let (status, body) = post_urls(&client, &format!(r#"{{"urls": ["{}"]}}"#, url)).await;
    assert_eq!(status, Status::Ok);

    let results: Vec<ArticleResult> = serde_json::from_str(&body.unwrap()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].summary, "Error processing the article");
    assert_eq!(results[0].data, ARTICLE_BODY);
    assert_eq!(results[0].title, "Ferris goes to town");
    assert_eq!(results[0].status, ArticleStatus::SummarizationError);
}

#[rocket::async_test]
async fn one_failure_does_not_abort_other_urls() {
    let mut site = mockito::Server::new_async().await;
    let _bad = site
        .mock("GET", "/bad")
        .with_status(404)
        .create_async()
        .await;
    let _good = site
        .mock("GET", "/good")
        .with_status(200)
        .with_body(ARTICLE_HTML)
        .create_async()
        .await;

    let llm = FakeLlm::new(false);
    let client = client_with(llm.clone()).await;

    let bad = format!("{}/bad", site.url());
    let good = format!("{}/good", site.url());
    let (status, body) = post_urls(
        &client,
        &format!(r#"{{"urls": ["{}", "not a url", "{}"]}}"#, bad, good),
    )
    .await;
    assert_eq!(status, Status::Ok);

    let results: Vec<ArticleResult> = serde_json::from_str(&body.unwrap()).unwrap();
    let statuses: Vec<ArticleStatus> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ArticleStatus::FetchError,
            ArticleStatus::FetchError,
            ArticleStatus::Ok
        ]
    );
    assert_eq!(results[2].url, good);
    assert_eq!(results[2].summary, "FINAL SUMMARY");
}

#[rocket::async_test]
async fn health_and_status_endpoints() {
    let client = client_with(FakeLlm::new(false)).await;

    let response = client.get("/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().await.as_deref(), Some("OK"));

    let response = client.get("/api/v1/status").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let status: serde_json::Value =
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
    assert_eq!(status["status"], "ok");
    assert_eq!(status["model"], "fake");
}

#[test]
fn invalid_chunk_settings_fail_at_startup() {
    let mut config = test_config();
    config.summarizer.chunk_max_tokens = Some(100);
    config.summarizer.chunk_overlap = Some(100);

    let err = AppState::from_config(&config, FakeLlm::new(false))
        .err()
        .expect("overlap >= max_tokens must be rejected");
    assert!(format!("{:#}", err).contains("overlap"));
}

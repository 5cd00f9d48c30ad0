use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::pacing::Pacer;

pub const NO_TITLE: &str = "No Title";
pub const NO_DATE: &str = "No Date";

const DEFAULT_USER_AGENT: &str = "Newsdigest/0.1.0";

/// Text extracted from an article page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    pub title: String,
    pub published_date: String,
    pub body: String,
}

/// Downloads article pages and extracts their text.
///
/// One HTTP client is reused for every fetch; fetches are spaced out by the
/// politeness pacer.
pub struct ArticleFetcher {
    client: Client,
    pacer: Arc<Pacer>,
}

impl ArticleFetcher {
    pub fn new(timeout_secs: u64, user_agent: Option<&str>, pacer: Arc<Pacer>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client, pacer })
    }

    /// Fetch `url` and extract title, publication date and paragraph text.
    /// Network errors and non-2xx statuses are returned as errors.
    pub async fn fetch(&self, url: &str) -> Result<ArticleContent> {
        let parsed = url::Url::parse(url).with_context(|| format!("invalid article URL: {}", url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("unsupported URL scheme: {}", parsed.scheme());
        }

        self.pacer.pace().await;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .context("failed to fetch article page")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("article fetch failed with status: {}", status));
        }

        let html_content = response.text().await.context("failed to read response body")?;
        let article = parse_article(&html_content);
        info!(
            "scraping: extracted {} chars from {} ({})",
            article.body.len(),
            url,
            article.title
        );
        Ok(article)
    }
}

/// Extract the article fields from an HTML document.
pub fn parse_article(html: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    let title = select_first(&document, "title")
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let published_date = select_first(&document, r#"meta[property="article:published_time"]"#)
        .and_then(|el| el.value().attr("content").map(str::to_string))
        .unwrap_or_else(|| NO_DATE.to_string());

    let body = match Selector::parse("p") {
        Ok(p_selector) => document
            .select(&p_selector)
            .map(|p| p.text().collect::<String>())
            .collect::<Vec<_>>()
            .join(" "),
        Err(_) => String::new(),
    };

    debug!(title = %title, date = %published_date, "scraping: parsed article");

    ArticleContent {
        title,
        published_date,
        body,
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<scraper::ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

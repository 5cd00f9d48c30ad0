use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::llm::summarizer::MapReduceSummarizer;
use crate::scraping::{ArticleFetcher, NO_DATE, NO_TITLE};

pub const FETCH_ERROR_SUMMARY: &str = "Error fetching article content";
pub const SUMMARIZATION_ERROR_SUMMARY: &str = "Error processing the article";
pub const NO_CONTENT: &str = "No content";

/// What happened to one requested URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Summarized {
        title: String,
        date: String,
        summary: String,
        body: String,
    },
    FetchFailed,
    SummarizationFailed {
        title: String,
        date: String,
        body: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Ok,
    FetchError,
    SummarizationError,
}

/// Wire form of an [`ArticleOutcome`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleResult {
    pub url: String,
    pub title: String,
    pub date: String,
    pub summary: String,
    pub data: String,
    pub status: ArticleStatus,
}

impl ArticleResult {
    pub fn from_outcome(url: String, outcome: ArticleOutcome) -> Self {
        match outcome {
            ArticleOutcome::Summarized {
                title,
                date,
                summary,
                body,
            } => Self {
                url,
                title,
                date,
                summary,
                data: body,
                status: ArticleStatus::Ok,
            },
            ArticleOutcome::FetchFailed => Self {
                url,
                title: NO_TITLE.to_string(),
                date: NO_DATE.to_string(),
                summary: FETCH_ERROR_SUMMARY.to_string(),
                data: NO_CONTENT.to_string(),
                status: ArticleStatus::FetchError,
            },
            ArticleOutcome::SummarizationFailed { title, date, body } => Self {
                url,
                title,
                date,
                summary: SUMMARIZATION_ERROR_SUMMARY.to_string(),
                data: body,
                status: ArticleStatus::SummarizationError,
            },
        }
    }
}

/// Drop repeated URLs (exact string match), keeping first-occurrence order
pub fn dedup_urls(urls: &[String]) -> Vec<&str> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.iter()
        .map(String::as_str)
        .filter(|url| seen.insert(*url))
        .collect()
}

/// Fetch and summarize one URL. Never fails: errors become outcome variants.
pub async fn process_article(
    fetcher: &ArticleFetcher,
    summarizer: &MapReduceSummarizer,
    url: &str,
) -> ArticleOutcome {
    let article = match fetcher.fetch(url).await {
        Ok(article) => article,
        Err(e) => {
            warn!(url = %url, "error fetching article: {:#}", e);
            return ArticleOutcome::FetchFailed;
        }
    };

    match summarizer.summarize_large(&article.body).await {
        Ok(summary) => ArticleOutcome::Summarized {
            title: article.title,
            date: article.published_date,
            summary,
            body: article.body,
        },
        Err(e) => {
            warn!(url = %url, "error summarizing article: {:#}", e);
            ArticleOutcome::SummarizationFailed {
                title: article.title,
                date: article.published_date,
                body: article.body,
            }
        }
    }
}

/// Process every unique URL one after the other
pub async fn process_urls(
    fetcher: &ArticleFetcher,
    summarizer: &MapReduceSummarizer,
    urls: &[String],
) -> Vec<ArticleResult> {
    let unique = dedup_urls(urls);
    info!("Processing {} unique URLs ({} requested)", unique.len(), urls.len());

    let mut results = Vec::with_capacity(unique.len());
    for url in unique {
        let outcome = process_article(fetcher, summarizer, url).await;
        results.push(ArticleResult::from_outcome(url.to_string(), outcome));
    }

    let succeeded = results
        .iter()
        .filter(|r| r.status == ArticleStatus::Ok)
        .count();
    info!("Summarized {}/{} articles successfully", succeeded, results.len());
    results
}

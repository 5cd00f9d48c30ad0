// Map-reduce summarization over token chunks
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use super::{LlmProvider, LlmRequest, UsageMetadata};
use crate::chunking::{chunk_text, ChunkWindow};
use crate::pacing::Pacer;

const TEXT_PLACEHOLDER: &str = "{text}";

pub const DEFAULT_MAP_PROMPT: &str = "Read the complete text, process it providing a coherent and concise summary of the text. Ensure that the summary does not get cut off in between: {text}";

pub const DEFAULT_REDUCE_PROMPT: &str = "Read the complete article, process it providing a coherent and concise summary by breaking it into exactly 5 major points with up to 3 sub-points each. Ensure no point is cut off in between: {text}";

/// Prompt with a single `{text}` slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(TEXT_PLACEHOLDER) {
            bail!("prompt template is missing the {} placeholder", TEXT_PLACEHOLDER);
        }
        Ok(Self { template })
    }

    pub fn render(&self, text: &str) -> String {
        self.template.replace(TEXT_PLACEHOLDER, text)
    }
}

/// The two prompts used by [`MapReduceSummarizer`]
#[derive(Debug, Clone)]
pub struct Prompts {
    pub map: PromptTemplate,
    pub reduce: PromptTemplate,
}

impl Prompts {
    /// Build from optional overrides, falling back to the default wording
    pub fn from_overrides(map: Option<&str>, reduce: Option<&str>) -> Result<Self> {
        Ok(Self {
            map: PromptTemplate::new(map.unwrap_or(DEFAULT_MAP_PROMPT))
                .context("invalid map prompt")?,
            reduce: PromptTemplate::new(reduce.unwrap_or(DEFAULT_REDUCE_PROMPT))
                .context("invalid reduce prompt")?,
        })
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            map: PromptTemplate {
                template: DEFAULT_MAP_PROMPT.to_string(),
            },
            reduce: PromptTemplate {
                template: DEFAULT_REDUCE_PROMPT.to_string(),
            },
        }
    }
}

/// Summarizes texts of any length: every chunk is summarized on its own, then
/// the joined chunk summaries are summarized into five major points.
///
/// Model calls are strictly sequential and each one waits on the shared pacer.
pub struct MapReduceSummarizer {
    provider: Arc<dyn LlmProvider>,
    pacer: Arc<Pacer>,
    window: ChunkWindow,
    prompts: Prompts,
}

impl MapReduceSummarizer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        pacer: Arc<Pacer>,
        window: ChunkWindow,
        prompts: Prompts,
    ) -> Self {
        Self {
            provider,
            pacer,
            window,
            prompts,
        }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Map then reduce. Any failed model call aborts the whole summary.
    ///
    /// Text without tokens has no map step; the reduce prompt still runs once, on
    /// empty text.
    pub async fn summarize_large(&self, text: &str) -> Result<String> {
        let chunks = chunk_text(text, self.window);
        let chunk_total = chunks.len();
        debug!(tokens = chunks.token_count(), chunks = chunk_total, "summarizing text");

        let mut usage = UsageMetadata::default();
        let mut chunk_summaries = Vec::with_capacity(chunk_total);

        for (index, chunk) in chunks.enumerate() {
            let (summary, call_usage) = self
                .complete(self.prompts.map.render(&chunk))
                .await
                .with_context(|| {
                    format!("failed to summarize chunk {}/{}", index + 1, chunk_total)
                })?;
            usage += call_usage;
            chunk_summaries.push(summary);
        }

        let combined = chunk_summaries.join(" ");
        let (final_summary, call_usage) = self
            .complete(self.prompts.reduce.render(&combined))
            .await
            .context("failed to combine chunk summaries")?;
        usage += call_usage;

        info!(
            chunks = chunk_total,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "map-reduce summary complete"
        );

        Ok(final_summary)
    }

    async fn complete(&self, prompt: String) -> Result<(String, UsageMetadata)> {
        self.pacer.pace().await;
        let response = self.provider.generate(LlmRequest::new(prompt)).await?;
        Ok((response.content, response.usage))
    }
}

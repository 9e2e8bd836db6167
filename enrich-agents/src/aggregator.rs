//! Content Aggregator
//!
//! Merges crawled pages into one [`AggregatedProfile`]:
//! - Structured signals are unioned, first-seen page wins on collisions
//! - Page text is joined and cut to a character budget
//! - Optionally, pages are summarized per chunk (map) and the summaries
//!   combined (reduce) before extraction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

use enrich_core::{AggregatedProfile, ContactInfo, Metadata, PageRecord, SocialLinks};

use crate::{LlmBackend, LlmError, ModelStage, SharedBackend};

/// Default character budget for aggregated text
pub const DEFAULT_CHAR_BUDGET: usize = 12_000;

/// Largest character budget accepted
pub const MAX_CHAR_BUDGET: usize = 24_000;

/// Per-page cap before chunk summarization
pub const DEFAULT_CHUNK_CHARS: usize = 1_500;

/// Separator between page texts
const PAGE_SEPARATOR: &str = "\n\n";

/// URL keywords marking high-value pages
const PRIORITY_KEYWORDS: &[&str] = &["about", "contact", "company"];

/// Prompt for summarizing one chunk
const MAP_PROMPT: &str = r#"
Analyze the following company website content and extract key information.

Focus on identifying:
1. Company name and legal entity name
2. Business description and industry
3. Company size indicators (employees, revenue mentions)
4. Key services or products
5. Location/address information

Provide a concise summary in 3-4 sentences focusing on the most important company details.

Page: {url}

Content:
"#;

/// Prompt for combining chunk summaries
const REDUCE_PROMPT: &str = r#"
Combine the following page summaries from one company website into a single comprehensive company profile.
Keep every concrete detail about the company name, legal entity, business description, industry, size, products or services, and location. Summaries from higher-weight pages (about, contact, company) are more reliable when details conflict.

Summaries:
"#;

/// How aggregated text is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryMode {
    /// Truncated raw text, no model call
    #[default]
    Direct,
    /// Per-page summaries combined into one
    MapReduce,
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryMode::Direct => f.write_str("direct"),
            SummaryMode::MapReduce => f.write_str("map-reduce"),
        }
    }
}

impl FromStr for SummaryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(SummaryMode::Direct),
            "map-reduce" | "mapreduce" | "map_reduce" => Ok(SummaryMode::MapReduce),
            other => Err(format!("unknown summary mode: {}", other)),
        }
    }
}

/// Aggregation configuration
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    pub summary_mode: SummaryMode,
    /// Character budget for `summary_text` (capped at [`MAX_CHAR_BUDGET`])
    pub char_budget: usize,
    /// Per-page character cap for map-reduce chunks
    pub chunk_chars: usize,
    /// Temperature for summarization calls
    pub temperature: f32,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            summary_mode: SummaryMode::default(),
            char_budget: DEFAULT_CHAR_BUDGET,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            temperature: 0.1,
        }
    }
}

/// Aggregation errors
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Failed to extract content from the website: no pages collected")]
    Empty,

    #[error("Model call failed during {stage}: {source}")]
    Model {
        stage: ModelStage,
        #[source]
        source: LlmError,
    },
}

/// Structured signals merged across pages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSignals {
    pub social_links: SocialLinks,
    pub contact_info: ContactInfo,
    pub metadata: Metadata,
}

/// A page's text prepared for summarization
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub url: String,
    pub text: String,
    /// 2.0 for about/contact/company pages, else 1.0
    pub weight: f64,
}

/// Union page signals in crawl order; the first page to report a key wins
pub fn merge_signals(pages: &[PageRecord]) -> MergedSignals {
    let mut merged = MergedSignals::default();

    for page in pages {
        for (platform, link) in &page.social_links {
            merged
                .social_links
                .entry(*platform)
                .or_insert_with(|| link.clone());
        }
        merged.contact_info.fill_missing(&page.contact_info);
        for (name, value) in &page.metadata {
            merged
                .metadata
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    merged
}

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Join page texts and cut the result to `budget` characters
pub fn concat_and_truncate(pages: &[PageRecord], budget: usize) -> String {
    let joined = pages
        .iter()
        .map(|p| p.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR);

    truncate_chars(&joined, budget).to_string()
}

/// Weight of a page for summarization
pub fn chunk_weight(url: &str) -> f64 {
    let lower = url.to_lowercase();
    if PRIORITY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        2.0
    } else {
        1.0
    }
}

/// One chunk per page, each capped at `chunk_chars`
pub fn build_chunks(pages: &[PageRecord], chunk_chars: usize) -> Vec<Chunk> {
    pages
        .iter()
        .filter(|p| p.has_text())
        .map(|p| Chunk {
            url: p.url.clone(),
            text: truncate_chars(&p.text, chunk_chars).to_string(),
            weight: chunk_weight(&p.url),
        })
        .collect()
}

fn map_prompt(chunk: &Chunk) -> String {
    format!("{}{}", MAP_PROMPT.replace("{url}", &chunk.url), chunk.text)
}

fn reduce_prompt(summaries: &[(Chunk, String)]) -> String {
    let mut prompt = REDUCE_PROMPT.to_string();
    for (chunk, summary) in summaries {
        prompt.push_str(&format!(
            "\n### {} (weight {:.1})\n{}\n",
            chunk.url,
            chunk.weight,
            summary.trim()
        ));
    }
    prompt
}

/// Builds the aggregated profile handed to extraction
pub struct ContentAggregator {
    backend: SharedBackend,
    config: AggregateConfig,
}

impl ContentAggregator {
    pub fn new(backend: SharedBackend, config: AggregateConfig) -> Self {
        Self { backend, config }
    }

    /// Merge, budget and (optionally) summarize collected pages
    pub async fn aggregate(&self, pages: Vec<PageRecord>) -> Result<AggregatedProfile, AggregateError> {
        if pages.is_empty() {
            return Err(AggregateError::Empty);
        }

        let budget = self.config.char_budget.min(MAX_CHAR_BUDGET);
        let merged = merge_signals(&pages);

        let summary_text = match self.config.summary_mode {
            SummaryMode::Direct => concat_and_truncate(&pages, budget),
            SummaryMode::MapReduce => {
                let chunks = build_chunks(&pages, self.config.chunk_chars);
                let summary = summarize_chunks(self.backend.as_ref(), chunks, self.config.temperature).await?;
                truncate_chars(&summary, budget).to_string()
            }
        };

        info!(
            "Aggregated {} pages into {} chars ({} mode, {} social links)",
            pages.len(),
            summary_text.chars().count(),
            self.config.summary_mode,
            merged.social_links.len()
        );

        Ok(AggregatedProfile {
            summary_text,
            social_links: merged.social_links,
            contact_info: merged.contact_info,
            metadata: merged.metadata,
            pages_analyzed: pages,
        })
    }
}

/// Map-reduce summarization. A single chunk is summarized directly.
pub async fn summarize_chunks(
    backend: &dyn LlmBackend,
    chunks: Vec<Chunk>,
    temperature: f32,
) -> Result<String, AggregateError> {
    if chunks.is_empty() {
        return Err(AggregateError::Empty);
    }

    if chunks.len() == 1 {
        debug!("Summarizing single chunk from {}", chunks[0].url);
        return backend
            .complete(&map_prompt(&chunks[0]), temperature)
            .await
            .map_err(|source| AggregateError::Model {
                stage: ModelStage::Summarize,
                source,
            });
    }

    let mut summaries = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        debug!("Summarizing chunk from {} (weight {:.1})", chunk.url, chunk.weight);
        let summary = backend
            .complete(&map_prompt(&chunk), temperature)
            .await
            .map_err(|source| AggregateError::Model {
                stage: ModelStage::Map,
                source,
            })?;
        summaries.push((chunk, summary));
    }

    // Heavier pages first; stable so crawl order holds within a weight
    summaries.sort_by(|a, b| b.0.weight.total_cmp(&a.0.weight));

    info!("Combining {} chunk summaries", summaries.len());
    backend
        .complete(&reduce_prompt(&summaries), temperature)
        .await
        .map_err(|source| AggregateError::Model {
            stage: ModelStage::Reduce,
            source,
        })
}

//! Profile Extractor
//!
//! Issues the structured-extraction prompt and recovers a [`CompanyProfile`]
//! from the model's answer. Recovery is two pure steps: strip a surrounding
//! code fence, then parse the text between the first `{` and the last `}`.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use enrich_core::{AggregatedProfile, CompanyProfile, NOT_FOUND};

use crate::{LlmBackend, LlmError, SharedBackend};

/// Extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("No JSON object in model response")]
    NoJsonObject { raw: String },

    #[error("Invalid JSON in model response: {message}")]
    Parse { raw: String, message: String },
}

impl ExtractionError {
    /// Raw model response, when the failure was in parsing it
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ExtractionError::Model(_) => None,
            ExtractionError::NoJsonObject { raw } | ExtractionError::Parse { raw, .. } => Some(raw),
        }
    }
}

/// Instructions preceding the crawled data
const EXTRACTION_HEADER: &str = r#"
Based on the following company information, extract structured data about the company.
"#;

/// Output schema and rules following the crawled data
const EXTRACTION_SCHEMA: &str = r#"
Extract and return ONLY a JSON object with these exact keys:
{
    "legal_name": "Company legal name",
    "description": "Brief business description",
    "industry": "Industry sector",
    "employees": "Employee count or range",
    "annual_revenue": "Revenue information if available",
    "linkedin": "LinkedIn URL",
    "facebook": "Facebook URL",
    "twitter": "Twitter/X URL",
    "pinterest": "Pinterest URL",
    "address": {
        "street": "Street address",
        "city": "City",
        "state": "State",
        "zip": "ZIP code",
        "country": "Country"
    },
    "sic_code": "SIC code if determinable",
    "phone": "Phone number",
    "email": "Email address"
}

Rules:
1. Every value is a string
2. Use "{not_found}" for any information you cannot determine
3. Return only the JSON object: no explanations, no markdown, no code fences
"#;

/// Build the extraction prompt for an aggregated crawl
pub fn build_extraction_prompt(aggregated: &AggregatedProfile, source_url: &str) -> String {
    let mut prompt = EXTRACTION_HEADER.to_string();

    prompt.push_str(&format!("\nWebsite: {}\n", source_url));

    prompt.push_str("\nSocial Links:\n");
    if aggregated.social_links.is_empty() {
        prompt.push_str("- none found\n");
    }
    for (platform, link) in &aggregated.social_links {
        prompt.push_str(&format!("- {}: {}\n", platform, link));
    }

    prompt.push_str("\nContact Info:\n");
    prompt.push_str(&format!(
        "- phone: {}\n- email: {}\n",
        aggregated.contact_info.phone.as_deref().unwrap_or(NOT_FOUND),
        aggregated.contact_info.email.as_deref().unwrap_or(NOT_FOUND)
    ));

    prompt.push_str("\nMetadata:\n");
    if aggregated.metadata.is_empty() {
        prompt.push_str("- none found\n");
    }
    for (name, value) in &aggregated.metadata {
        prompt.push_str(&format!("- {}: {}\n", name, value));
    }

    prompt.push_str("\nContent:\n");
    prompt.push_str(&aggregated.summary_text);
    prompt.push('\n');

    prompt.push_str(&EXTRACTION_SCHEMA.replace("{not_found}", NOT_FOUND));
    prompt
}

/// Remove a leading ```` ``` ```` / ```` ```json ```` line and a trailing ```` ``` ````
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (e.g. "json") up to the end of the fence line
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Sanitize a model response down to its outermost JSON object text
pub fn sanitize_response(raw: &str) -> Result<&str, ExtractionError> {
    let text = strip_code_fence(raw);

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(ExtractionError::NoJsonObject {
            raw: raw.to_string(),
        }),
    }
}

/// Sanitize and parse a model response into a JSON object
pub fn parse_json_object(raw: &str) -> Result<Value, ExtractionError> {
    let json = sanitize_response(raw)?;

    let value: Value = serde_json::from_str(json).map_err(|e| ExtractionError::Parse {
        raw: raw.to_string(),
        message: e.to_string(),
    })?;

    if !value.is_object() {
        return Err(ExtractionError::Parse {
            raw: raw.to_string(),
            message: "top-level JSON value is not an object".to_string(),
        });
    }

    Ok(value)
}

/// Sanitize and parse a model response into a [`CompanyProfile`]
pub fn parse_profile(raw: &str) -> Result<CompanyProfile, ExtractionError> {
    let value = parse_json_object(raw)?;

    serde_json::from_value(value).map_err(|e| ExtractionError::Parse {
        raw: raw.to_string(),
        message: e.to_string(),
    })
}

/// Turns an aggregated crawl into a company profile with one model call
pub struct ProfileExtractor {
    backend: SharedBackend,
    temperature: f32,
    backfill_signals: bool,
}

impl ProfileExtractor {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            temperature: 0.1,
            backfill_signals: true,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Fill missing social/contact fields from crawled signals (default on)
    pub fn with_backfill(mut self, backfill_signals: bool) -> Self {
        self.backfill_signals = backfill_signals;
        self
    }

    pub async fn extract(
        &self,
        aggregated: &AggregatedProfile,
        source_url: &str,
    ) -> Result<CompanyProfile, ExtractionError> {
        let mut profile =
            extract_profile(self.backend.as_ref(), aggregated, source_url, self.temperature).await?;

        if self.backfill_signals {
            let filled = profile.backfill(&aggregated.social_links, &aggregated.contact_info);
            if filled > 0 {
                debug!("Backfilled {} fields from crawled signals", filled);
            }
        }

        info!(
            "Extracted profile for {} using {} ({} fields not found)",
            source_url,
            self.backend.model_name(),
            profile.missing_fields().len()
        );

        Ok(profile)
    }
}

/// One extraction call and tolerant parse, without signal backfill
pub async fn extract_profile(
    backend: &dyn LlmBackend,
    aggregated: &AggregatedProfile,
    source_url: &str,
    temperature: f32,
) -> Result<CompanyProfile, ExtractionError> {
    let prompt = build_extraction_prompt(aggregated, source_url);
    debug!("Extraction prompt is {} chars", prompt.len());

    let raw = backend.complete(&prompt, temperature).await?;

    parse_profile(&raw).inspect_err(|e| {
        warn!("Could not parse model response for {}: {}", source_url, e);
    })
}

//! Enrichment Pipeline
//!
//! Drives one run end to end:
//! crawl → aggregate (direct or map-reduce) → extract → backfill.
//!
//! Page failures stay inside the crawl report. An empty crawl ends the run
//! before any model call; model and final-parse failures end it with the
//! stage they happened in.

use thiserror::Error;
use tracing::{info, warn};

use enrich_agents::{
    AggregateError, ContentAggregator, ExtractionError, LlmBackend, LlmError, ModelStage,
    ProfileExtractor, SharedBackend,
};
use enrich_core::{AggregatedProfile, CompanyProfile};
use enrich_web::{crawl_site, CrawlError, CrawlReport};

use crate::PipelineConfig;

/// Errors that end an enrichment run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(
        "Failed to extract content from the website: {attempted} pages attempted \
         ({fetch_failures} fetch failures, {parse_failures} parse failures)"
    )]
    AggregationEmpty {
        attempted: usize,
        fetch_failures: usize,
        parse_failures: usize,
    },

    #[error("Model call failed during {stage}: {source}")]
    Model {
        stage: ModelStage,
        #[source]
        source: LlmError,
    },

    #[error(transparent)]
    Extraction(ExtractionError),

    #[error("Missing API key: set {0}")]
    MissingCredential(String),

    #[error("Backend setup failed: {0}")]
    Backend(LlmError),
}

impl PipelineError {
    /// Raw model text when the final answer could not be parsed
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PipelineError::Extraction(e) => e.raw_response(),
            _ => None,
        }
    }
}

impl From<AggregateError> for PipelineError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::Empty => PipelineError::AggregationEmpty {
                attempted: 0,
                fetch_failures: 0,
                parse_failures: 0,
            },
            AggregateError::Model { stage, source } => PipelineError::Model { stage, source },
        }
    }
}

impl From<ExtractionError> for PipelineError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Model(source) => PipelineError::Model {
                stage: ModelStage::Extract,
                source,
            },
            other => PipelineError::Extraction(other),
        }
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct EnrichmentResult {
    pub profile: CompanyProfile,
    pub aggregated: AggregatedProfile,
    pub report: CrawlReport,
}

/// Crawl-to-profile pipeline over one shared backend
pub struct Pipeline {
    backend: SharedBackend,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(backend: SharedBackend, config: PipelineConfig) -> Self {
        Self { backend, config }
    }

    /// Enrich one company website
    pub async fn run(&self, url: &str) -> Result<EnrichmentResult, PipelineError> {
        info!(
            "Enriching {} ({} mode, {} summary, model {})",
            url,
            self.config.crawl_mode,
            self.config.summary_mode,
            self.backend.model_name()
        );

        let report = crawl_only(url, &self.config).await?;

        let aggregator = ContentAggregator::new(self.backend.clone(), self.config.aggregate_config());
        let aggregated = aggregator.aggregate(report.pages.clone()).await?;

        let extractor = ProfileExtractor::new(self.backend.clone())
            .with_temperature(self.config.temperature)
            .with_backfill(self.config.backfill_signals);
        let profile = extractor.extract(&aggregated, url).await?;

        Ok(EnrichmentResult {
            profile,
            aggregated,
            report,
        })
    }
}

/// Crawl without any model call. An empty crawl is
/// [`PipelineError::AggregationEmpty`].
pub async fn crawl_only(url: &str, config: &PipelineConfig) -> Result<CrawlReport, PipelineError> {
    let report = crawl_site(url, &config.crawl_config()).await?;

    if report.is_empty() {
        warn!(
            "No content collected from {} ({} attempted)",
            report.root,
            report.attempts.len()
        );
        return Err(PipelineError::AggregationEmpty {
            attempted: report.attempts.len(),
            fetch_failures: report.fetch_failures(),
            parse_failures: report.parse_failures(),
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use enrich_agents::SummaryMode;
    use enrich_core::NOT_FOUND;
    use enrich_web::CrawlMode;
    use mockito::{Mock, Server, ServerGuard};
    use std::sync::{Arc, Mutex};

    const EMPTY_PROFILE: &str = r#"```json
{
    "legal_name": "Not found",
    "description": "Not found",
    "industry": "Not found",
    "employees": "Not found",
    "annual_revenue": "Not found",
    "linkedin": "Not found",
    "facebook": "Not found",
    "twitter": "Not found",
    "pinterest": "Not found",
    "address": {"street": "Not found", "city": "Not found", "state": "Not found", "zip": "Not found", "country": "Not found"},
    "sic_code": "Not found",
    "phone": "Not found",
    "email": "Not found"
}
```"#;

    /// Answers extraction prompts with a fixed profile, anything else with a summary
    struct MockBackend {
        profile: String,
        fail_extract: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl MockBackend {
        fn new(profile: &str) -> Arc<Self> {
            Arc::new(Self {
                profile: profile.to_string(),
                fail_extract: false,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing_extract() -> Arc<Self> {
            Arc::new(Self {
                profile: String::new(),
                fail_extract: true,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmBackend for MockBackend {
        async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if !prompt.contains("Extract and return ONLY a JSON object") {
                return Ok("Acme Corp builds rockets.".to_string());
            }
            if self.fail_extract {
                return Err(LlmError::Api("rate limited".to_string()));
            }
            Ok(self.profile.clone())
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    async fn html_mock(server: &mut ServerGuard, path: &str, body: &str) -> Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(body)
            .create_async()
            .await
    }

    /// Root, /about (with LinkedIn) and /contact; every other path fails
    async fn acme_site(server: &mut ServerGuard) -> Vec<Mock> {
        vec![
            html_mock(server, "/", "<main><h1>Acme Corp</h1><p>We build rockets.</p></main>").await,
            html_mock(
                server,
                "/about",
                r#"<main><p>Founded in 1999.</p><a href="https://www.linkedin.com/company/acme">LinkedIn</a></main>"#,
            )
            .await,
            html_mock(server, "/contact", "<main><p>Write to us any time.</p></main>").await,
        ]
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            max_pages: 5,
            fetch_timeout_secs: 5,
            user_agent: Some("enrich-test".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_end_to_end_priority_crawl() {
        let mut server = Server::new_async().await;
        let _site = acme_site(&mut server).await;
        let backend = MockBackend::new(EMPTY_PROFILE);

        let pipeline = Pipeline::new(backend.clone(), config());
        let result = pipeline.run(&server.url()).await.unwrap();

        assert_eq!(result.report.attempts.len(), 5);
        assert_eq!(result.aggregated.pages_analyzed.len(), 3);
        assert_eq!(
            result.profile.linkedin,
            "https://www.linkedin.com/company/acme"
        );
        assert_eq!(result.profile.legal_name, NOT_FOUND);
        assert_eq!(result.profile.phone, NOT_FOUND);
        assert_eq!(result.profile.address.city, NOT_FOUND);
        assert_eq!(result.profile.missing_fields().len(), 16);

        // Direct mode: one extraction call only
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_map_reduce_call_count() {
        let mut server = Server::new_async().await;
        let _site = acme_site(&mut server).await;
        let backend = MockBackend::new(r#"{"legal_name": "Acme Corp"}"#);

        let config = PipelineConfig {
            summary_mode: SummaryMode::MapReduce,
            ..config()
        };
        let result = Pipeline::new(backend.clone(), config)
            .run(&server.url())
            .await
            .unwrap();

        // 3 map + 1 reduce + 1 extract
        assert_eq!(backend.calls(), 5);
        assert_eq!(result.aggregated.summary_text, "Acme Corp builds rockets.");
        assert_eq!(result.profile.legal_name, "Acme Corp");
    }

    #[tokio::test]
    async fn test_empty_crawl_makes_no_model_call() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        let backend = MockBackend::new(EMPTY_PROFILE);

        let err = Pipeline::new(backend.clone(), config())
            .run(&server.url())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::AggregationEmpty {
                attempted: 5,
                fetch_failures: 5,
                parse_failures: 0
            }
        ));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_extract_failure_carries_stage() {
        let mut server = Server::new_async().await;
        let _site = acme_site(&mut server).await;

        let err = Pipeline::new(MockBackend::failing_extract(), config())
            .run(&server.url())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Model {
                stage: ModelStage::Extract,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unparseable_response_keeps_raw() {
        let mut server = Server::new_async().await;
        let _site = acme_site(&mut server).await;
        let backend = MockBackend::new("I'm sorry, I can't determine that.");

        let err = Pipeline::new(backend, config())
            .run(&server.url())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Extraction(_)));
        assert_eq!(err.raw_response(), Some("I'm sorry, I can't determine that."));
    }

    #[tokio::test]
    async fn test_extraction_prompt_names_requested_url() {
        let mut server = Server::new_async().await;
        let _site = acme_site(&mut server).await;
        let backend = MockBackend::new(EMPTY_PROFILE);

        let url = format!("{}/about", server.url());
        Pipeline::new(backend.clone(), config()).run(&url).await.unwrap();

        let prompts = backend.prompts.lock().unwrap();
        let extraction = prompts.last().unwrap();
        assert!(extraction.contains(&format!("Website: {}", url)));
    }

    #[tokio::test]
    async fn test_model_errors_have_no_raw_response() {
        let mut server = Server::new_async().await;
        let _site = acme_site(&mut server).await;

        let err = Pipeline::new(MockBackend::failing_extract(), config())
            .run(&server.url())
            .await
            .unwrap_err();

        assert_eq!(err.raw_response(), None);
    }

    #[tokio::test]
    async fn test_invalid_seed() {
        let err = crawl_only("not a url at all", &config()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Crawl(CrawlError::InvalidSeed(_))));
    }

    #[tokio::test]
    async fn test_crawl_only_frontier() {
        let mut server = Server::new_async().await;
        let _root = html_mock(
            &mut server,
            "/",
            r#"<main><p>Home</p><a href="/team">Team</a><a href="https://elsewhere.example/x">Out</a></main>"#,
        )
        .await;
        let _team = html_mock(&mut server, "/team", "<main><p>Our team</p></main>").await;

        let config = PipelineConfig {
            crawl_mode: CrawlMode::Frontier,
            ..config()
        };
        let report = crawl_only(&server.url(), &config).await.unwrap();

        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.pages[1].text, "Our team");
    }
}

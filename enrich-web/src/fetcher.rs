//! Single-page fetcher
//!
//! One GET per URL, no retries. Every failure mode comes back as a
//! [`FetchError`] so the crawl controller can skip the page and move on.

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{create_client, FetchConfig, FetchError};

/// Response body and headers of a fetched page
#[derive(Debug, Clone)]
pub struct RawPage {
    /// URL that was requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Decoded response body
    pub body: String,
}

/// Fetches pages with one shared client
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    config: FetchConfig,
}

impl PageFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = create_client(&config)?;
        Ok(Self { client, config })
    }

    /// Fetch a URL. Non-2xx responses are errors.
    pub async fn fetch(&self, url: &str) -> Result<RawPage, FetchError> {
        debug!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Fetch of {} returned status: {}", url, status);
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.text().await.map_err(|e| self.classify(e))?;

        debug!("Fetched {} bytes from {}", body.len(), url);

        Ok(RawPage {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.config.timeout_secs)
        } else if error.is_builder() {
            FetchError::InvalidUrl(
                error
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| error.to_string()),
            )
        } else {
            FetchError::Request(error)
        }
    }
}

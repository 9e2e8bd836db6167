//! Bounded company-site crawler
//!
//! Two strategies:
//! - **Priority**: walk the fixed candidate list (root, /about, /contact, ...)
//!   in declared order, no link discovery.
//! - **Frontier**: breadth-first from the seed, following same-site links.
//!
//! Both stop at `max_pages` attempted URLs, never attempt a URL twice, and
//! never leave the seed's scheme+host. A failing page is recorded and
//! skipped; it never aborts the crawl.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use enrich_core::{
    clamp_max_pages, domain_root, parse_site_url, priority_paths, same_site, visit_key,
    PageRecord, UrlError, DEFAULT_MAX_PAGES,
};

use crate::{extract_page, ExtractOptions, ExtractedPage, FetchConfig, FetchError, PageFetcher, ParseError};

/// Crawl strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    /// Fixed candidate list in priority order
    #[default]
    Priority,
    /// Breadth-first link following from the seed
    #[serde(alias = "bfs")]
    Frontier,
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlMode::Priority => f.write_str("priority"),
            CrawlMode::Frontier => f.write_str("frontier"),
        }
    }
}

impl FromStr for CrawlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priority" => Ok(CrawlMode::Priority),
            "frontier" | "bfs" => Ok(CrawlMode::Frontier),
            other => Err(format!("unknown crawl mode: {}", other)),
        }
    }
}

/// Crawl configuration
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub mode: CrawlMode,
    /// Maximum URLs attempted (clamped to 1-10)
    pub max_pages: usize,
    /// Concurrent fetches in priority mode; frontier mode is always sequential
    pub max_concurrent: usize,
    pub fetch: FetchConfig,
    pub extract: ExtractOptions,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            mode: CrawlMode::default(),
            max_pages: DEFAULT_MAX_PAGES,
            max_concurrent: 1,
            fetch: FetchConfig::default(),
            extract: ExtractOptions::default(),
        }
    }
}

impl CrawlConfig {
    pub fn with_mode(mut self, mode: CrawlMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }
}

/// Errors that prevent a crawl from starting
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid seed URL: {0}")]
    InvalidSeed(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Client(FetchError),
}

/// What happened to one attempted URL
#[derive(Debug)]
pub enum PageOutcome {
    /// Page produced text and was kept
    Collected,
    /// Page fetched and parsed but had no text
    Blank,
    FetchFailed(FetchError),
    ParseFailed(ParseError),
    /// Redirected off the crawl's scheme+host; holds the final URL
    OffSite(String),
}

impl PageOutcome {
    pub fn is_collected(&self) -> bool {
        matches!(self, PageOutcome::Collected)
    }
}

/// One attempted URL and its outcome
#[derive(Debug)]
pub struct PageAttempt {
    pub url: String,
    pub outcome: PageOutcome,
    /// Same-site links found on the page
    pub links: Vec<String>,
}

/// Result of a crawl
#[derive(Debug)]
pub struct CrawlReport {
    /// `scheme://host` all pages were confined to
    pub root: String,
    pub mode: CrawlMode,
    /// Pages with non-empty text, in crawl order
    pub pages: Vec<PageRecord>,
    /// Every attempted URL, in crawl order
    pub attempts: Vec<PageAttempt>,
}

impl CrawlReport {
    fn new(root: String, mode: CrawlMode) -> Self {
        Self {
            root,
            mode,
            pages: Vec::new(),
            attempts: Vec::new(),
        }
    }

    /// URLs attempted, in order
    pub fn visited(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.url.as_str()).collect()
    }

    pub fn fetch_failures(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(a.outcome, PageOutcome::FetchFailed(_)))
            .count()
    }

    pub fn parse_failures(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(a.outcome, PageOutcome::ParseFailed(_)))
            .count()
    }

    pub fn blank_pages(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(a.outcome, PageOutcome::Blank))
            .count()
    }

    pub fn off_site_pages(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(a.outcome, PageOutcome::OffSite(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    fn record(&mut self, url: String, outcome: PageOutcome, extracted: Option<ExtractedPage>) {
        let links = match extracted {
            Some(extracted) => {
                if outcome.is_collected() {
                    self.pages.push(extracted.record);
                }
                extracted.links
            }
            None => Vec::new(),
        };
        self.attempts.push(PageAttempt { url, outcome, links });
    }
}

/// Crawl a company site
pub async fn crawl_site(seed: &str, config: &CrawlConfig) -> Result<CrawlReport, CrawlError> {
    let root = domain_root(seed)?;
    let max_pages = clamp_max_pages(config.max_pages);
    let fetcher = PageFetcher::new(config.fetch.clone()).map_err(CrawlError::Client)?;

    info!(
        "Crawling {} ({} mode, up to {} pages)",
        root, config.mode, max_pages
    );

    let report = match config.mode {
        CrawlMode::Priority => {
            crawl_priority(&fetcher, &root, max_pages, config.max_concurrent, &config.extract).await
        }
        CrawlMode::Frontier => {
            let mut seed_url = parse_site_url(seed)?;
            seed_url.set_fragment(None);
            crawl_frontier(&fetcher, &root, seed_url.as_str(), max_pages, &config.extract).await
        }
    };

    info!(
        "Crawl of {} finished: {} attempted, {} collected, {} fetch failures, {} parse failures",
        report.root,
        report.attempts.len(),
        report.pages.len(),
        report.fetch_failures(),
        report.parse_failures()
    );

    Ok(report)
}

async fn crawl_priority(
    fetcher: &PageFetcher,
    root: &str,
    max_pages: usize,
    max_concurrent: usize,
    options: &ExtractOptions,
) -> CrawlReport {
    let mut report = CrawlReport::new(root.to_string(), CrawlMode::Priority);
    let mut visited: HashSet<String> = HashSet::new();

    let mut candidates = priority_paths(root);
    candidates.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));

    // Cap the candidate list up front so the page limit holds under concurrency
    let mut targets = Vec::new();
    for target in candidates {
        if targets.len() >= max_pages {
            break;
        }
        if visited.insert(visit_key(&target.url)) {
            targets.push(target);
        }
    }

    let results: Vec<_> = stream::iter(targets)
        .map(|target| visit(fetcher, root, target.url, options))
        .buffered(max_concurrent.max(1))
        .collect()
        .await;

    for (url, outcome, extracted) in results {
        report.record(url, outcome, extracted);
    }

    report
}

async fn crawl_frontier(
    fetcher: &PageFetcher,
    root: &str,
    seed_url: &str,
    max_pages: usize,
    options: &ExtractOptions,
) -> CrawlReport {
    let mut report = CrawlReport::new(root.to_string(), CrawlMode::Frontier);
    let mut visited: HashSet<String> = HashSet::new();
    let mut queued: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    queued.insert(visit_key(seed_url));
    queue.push_back(seed_url.to_string());

    while let Some(url) = queue.pop_front() {
        if visited.len() >= max_pages {
            break;
        }
        if !visited.insert(visit_key(&url)) {
            continue;
        }

        let (url, outcome, extracted) = visit(fetcher, root, url, options).await;

        if let Some(extracted) = &extracted {
            let mut discovered = 0;
            for link in &extracted.links {
                if !same_site(link, root) {
                    continue;
                }
                let key = visit_key(link);
                if !visited.contains(&key) && queued.insert(key) {
                    queue.push_back(link.clone());
                    discovered += 1;
                }
            }
            debug!("Discovered {} new links on {}", discovered, url);
        }

        report.record(url, outcome, extracted);
    }

    report
}

/// Fetch and extract one URL. Blank pages still return their links so they
/// can be followed; only collected pages contribute a record.
async fn visit(
    fetcher: &PageFetcher,
    root: &str,
    url: String,
    options: &ExtractOptions,
) -> (String, PageOutcome, Option<ExtractedPage>) {
    let raw = match fetcher.fetch(&url).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skipping {}: {}", url, e);
            return (url, PageOutcome::FetchFailed(e), None);
        }
    };

    if !same_site(&raw.final_url, root) {
        warn!("Skipping {}: redirected off site to {}", url, raw.final_url);
        return (url, PageOutcome::OffSite(raw.final_url), None);
    }

    match extract_page(&raw, options) {
        Ok(extracted) if extracted.record.has_text() => {
            debug!("Collected {} chars from {}", extracted.record.char_count(), url);
            (url, PageOutcome::Collected, Some(extracted))
        }
        Ok(extracted) => {
            debug!("Empty content from {}", url);
            (url, PageOutcome::Blank, Some(extracted))
        }
        Err(e) => {
            warn!("Failed to parse {}: {}", url, e);
            (url, PageOutcome::ParseFailed(e), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Mock, Server, ServerGuard};

    async fn html_mock(server: &mut ServerGuard, path: &str, body: &str) -> Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(body)
            .create_async()
            .await
    }

    fn config(mode: CrawlMode, max_pages: usize) -> CrawlConfig {
        CrawlConfig::default()
            .with_mode(mode)
            .with_max_pages(max_pages)
            .with_fetch(FetchConfig::default().with_timeout(5).with_user_agent("enrich-test"))
    }

    #[test]
    fn test_crawl_mode_from_str() {
        assert_eq!("priority".parse::<CrawlMode>(), Ok(CrawlMode::Priority));
        assert_eq!("Frontier".parse::<CrawlMode>(), Ok(CrawlMode::Frontier));
        assert!("depth".parse::<CrawlMode>().is_err());
    }

    #[tokio::test]
    async fn test_priority_mode_declared_order_and_limit() {
        let mut server = Server::new_async().await;
        let _root = html_mock(&mut server, "/", "<p>Home of Acme</p>").await;
        let _about = html_mock(&mut server, "/about", "<p>About Acme</p>").await;
        let _contact = html_mock(&mut server, "/contact", "<p>Contact Acme</p>").await;

        let base = server.url();
        let report = crawl_site(&format!("{}/some/deep/page", base), &config(CrawlMode::Priority, 3))
            .await
            .unwrap();

        // root, /about, /about-us: the limit cuts before /contact
        assert_eq!(
            report.visited(),
            vec![
                base.clone(),
                format!("{}/about", base),
                format!("{}/about-us", base),
            ]
        );
        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.pages[0].text, "Home of Acme");
        assert_eq!(report.pages[1].text, "About Acme");
        assert_eq!(report.fetch_failures(), 1);
    }

    #[tokio::test]
    async fn test_priority_mode_concurrent_keeps_order() {
        let mut server = Server::new_async().await;
        let _root = html_mock(&mut server, "/", "<p>Home</p>").await;
        let _about = html_mock(&mut server, "/about", "<p>About</p>").await;
        let _about_us = html_mock(&mut server, "/about-us", "<p>About us</p>").await;
        let _contact = html_mock(&mut server, "/contact", "<p>Contact</p>").await;

        let report = crawl_site(
            &server.url(),
            &config(CrawlMode::Priority, 4).with_max_concurrent(4),
        )
        .await
        .unwrap();

        let texts: Vec<_> = report.pages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Home", "About", "About us", "Contact"]);
        assert!(report.visited().len() <= 4);
    }

    #[tokio::test]
    async fn test_frontier_mode_follows_same_site_links() {
        let mut server = Server::new_async().await;
        let _root = html_mock(
            &mut server,
            "/",
            r#"<p>Home</p>
               <a href="/about">About</a>
               <a href="/about#team">About again</a>
               <a href="https://elsewhere.example.org/">Elsewhere</a>
               <a href="mailto:hi@acme.io">Mail</a>
               <a href="/contact">Contact</a>"#,
        )
        .await;
        let _about = html_mock(
            &mut server,
            "/about",
            r#"<p>About</p><a href="/">Home</a><a href="/team">Team</a>"#,
        )
        .await;
        let _contact = html_mock(&mut server, "/contact", "<p>Contact</p>").await;
        let _team = html_mock(&mut server, "/team", "<p>Team</p>").await;

        let base = server.url();
        let report = crawl_site(&base, &config(CrawlMode::Frontier, 10)).await.unwrap();

        assert_eq!(
            report.visited(),
            vec![
                format!("{}/", base),
                format!("{}/about", base),
                format!("{}/contact", base),
                format!("{}/team", base),
            ]
        );
        assert_eq!(report.pages.len(), 4);

        // No URL attempted twice
        let keys: HashSet<_> = report.visited().iter().map(|u| visit_key(u)).collect();
        assert_eq!(keys.len(), report.visited().len());

        // Domain confinement
        assert!(report.pages.iter().all(|p| same_site(&p.url, &report.root)));
    }

    #[tokio::test]
    async fn test_frontier_mode_respects_page_limit() {
        let mut server = Server::new_async().await;
        let _root = html_mock(
            &mut server,
            "/",
            r#"<p>Home</p><a href="/a">a</a><a href="/b">b</a><a href="/c">c</a>"#,
        )
        .await;
        let _a = html_mock(&mut server, "/a", "<p>A</p>").await;
        let _b = html_mock(&mut server, "/b", "<p>B</p>").await;
        let _c = html_mock(&mut server, "/c", "<p>C</p>").await;

        let report = crawl_site(&server.url(), &config(CrawlMode::Frontier, 2))
            .await
            .unwrap();

        assert_eq!(report.visited().len(), 2);
        assert_eq!(report.pages.len(), 2);
    }

    #[tokio::test]
    async fn test_bad_page_does_not_abort_crawl() {
        let mut server = Server::new_async().await;
        let _root = html_mock(&mut server, "/", "<p>Home of Acme</p>").await;
        let _about = server
            .mock("GET", "/about")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.7 binary")
            .create_async()
            .await;
        let _about_us = html_mock(&mut server, "/about-us", "<script>only()</script>").await;
        let _contact = html_mock(&mut server, "/contact", "<p>Call 212-555-1234</p>").await;

        let report = crawl_site(&server.url(), &config(CrawlMode::Priority, 4))
            .await
            .unwrap();

        assert_eq!(report.attempts.len(), 4);
        assert_eq!(report.parse_failures(), 1);
        assert_eq!(report.blank_pages(), 1);
        assert_eq!(report.pages.len(), 2);
        assert_eq!(
            report.pages[1].contact_info.phone.as_deref(),
            Some("(212) 555-1234")
        );
    }

    #[tokio::test]
    async fn test_frontier_resolves_links_after_redirect() {
        let mut server = Server::new_async().await;
        let _root = html_mock(&mut server, "/", r#"<p>Home</p><a href="/blog">Blog</a>"#).await;
        let _blog = server
            .mock("GET", "/blog")
            .with_status(301)
            .with_header("location", "/blog/")
            .create_async()
            .await;
        let _blog_index = html_mock(&mut server, "/blog/", r#"<p>Posts</p><a href="launch">Launch</a>"#).await;
        let _launch = html_mock(&mut server, "/blog/launch", "<p>We launched</p>").await;

        let base = server.url();
        let report = crawl_site(&base, &config(CrawlMode::Frontier, 10)).await.unwrap();

        assert_eq!(
            report.visited(),
            vec![
                format!("{}/", base),
                format!("{}/blog", base),
                format!("{}/blog/launch", base),
            ]
        );
        assert_eq!(report.fetch_failures(), 0);
        assert_eq!(report.pages[1].url, format!("{}/blog/", base));
        assert_eq!(report.pages[2].text, "We launched");
    }

    #[tokio::test]
    async fn test_off_site_redirect_is_not_collected() {
        let mut jobs = Server::new_async().await;
        let _jobs = html_mock(
            &mut jobs,
            "/jobs",
            r#"<p>Jobs board careers</p><a href="https://www.linkedin.com/company/jobsboard">li</a>"#,
        )
        .await;

        let mut server = Server::new_async().await;
        let _root = server
            .mock("GET", "/")
            .with_status(301)
            .with_header("location", format!("{}/jobs", jobs.url()).as_str())
            .create_async()
            .await;
        let _about = html_mock(&mut server, "/about", "<p>About Acme</p>").await;

        let report = crawl_site(&server.url(), &config(CrawlMode::Priority, 2))
            .await
            .unwrap();

        assert_eq!(report.off_site_pages(), 1);
        assert!(matches!(
            &report.attempts[0].outcome,
            PageOutcome::OffSite(final_url) if final_url.starts_with(&jobs.url())
        ));
        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.pages[0].text, "About Acme");
        assert!(report.pages.iter().all(|p| p.social_links.is_empty()));
    }

    #[tokio::test]
    async fn test_frontier_seed_fragment_is_ignored() {
        let mut server = Server::new_async().await;
        let _root = html_mock(
            &mut server,
            "/",
            r#"<p>Home</p><a href="/">Home</a><a href="/about">About</a>"#,
        )
        .await;
        let _about = html_mock(&mut server, "/about", "<p>About</p>").await;

        let base = server.url();
        let report = crawl_site(&format!("{}/#top", base), &config(CrawlMode::Frontier, 10))
            .await
            .unwrap();

        assert_eq!(
            report.visited(),
            vec![format!("{}/", base), format!("{}/about", base)]
        );
        assert_eq!(
            report.attempts[0].links,
            vec![format!("{}/", base), format!("{}/about", base)]
        );
    }

    #[tokio::test]
    async fn test_invalid_seed() {
        let result = crawl_site("ftp://acme.io", &CrawlConfig::default()).await;
        assert!(matches!(result, Err(CrawlError::InvalidSeed(_))));
    }
}

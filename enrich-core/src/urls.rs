//! URL resolution for company websites
//!
//! Normalizes a seed URL into its domain root and builds the ordered list
//! of candidate pages most likely to describe the company.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors from URL resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Invalid URL '{url}': {reason}")]
    Invalid { url: String, reason: String },

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

/// A page queued for crawling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlTarget {
    /// Absolute URL
    pub url: String,
    /// Higher scores are crawled first
    pub priority_score: f64,
}

impl CrawlTarget {
    pub fn new(url: impl Into<String>, priority_score: f64) -> Self {
        Self {
            url: url.into(),
            priority_score,
        }
    }
}

/// Candidate paths, in priority order. The empty path is the site root.
pub const PRIORITY_PATHS: &[&str] = &[
    "",
    "/about",
    "/about-us",
    "/contact",
    "/team",
    "/company",
    "/careers",
    "/services",
    "/products",
    "/leadership",
    "/legal",
];

/// Parse user input into an http(s) URL, assuming `https://` when no
/// scheme was given.
pub fn parse_site_url(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| UrlError::Invalid {
        url: input.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost(input.to_string()));
    }

    Ok(url)
}

/// `scheme://host[:port]` of a URL, with path, query and fragment stripped
pub fn domain_root(input: &str) -> Result<String, UrlError> {
    let url = parse_site_url(input)?;
    Ok(origin_of(&url))
}

fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Build the fixed candidate list for a domain root
pub fn priority_paths(domain_root: &str) -> Vec<CrawlTarget> {
    let root = domain_root.trim_end_matches('/');
    let total = PRIORITY_PATHS.len();

    PRIORITY_PATHS
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let url = if path.is_empty() {
                root.to_string()
            } else {
                format!("{}{}", root, path)
            };
            CrawlTarget::new(url, (total - i) as f64)
        })
        .collect()
}

/// Whether `url` shares scheme, host and port with `root`
pub fn same_site(url: &str, root: &str) -> bool {
    match (Url::parse(url), Url::parse(root)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

/// Resolve an href against the page it appeared on.
///
/// Returns `None` for non-http(s) targets such as `mailto:` or
/// `javascript:`. Fragments are dropped.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let mut resolved = base.join(href.trim()).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Key used for visited-set membership. `https://a.com` and
/// `https://a.com/` are the same page.
pub fn visit_key(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_root_strips_path_and_query() {
        let root = domain_root("https://Example.com/about/team?x=1#top").unwrap();
        assert_eq!(root, "https://example.com");
    }

    #[test]
    fn test_domain_root_keeps_port() {
        let root = domain_root("http://127.0.0.1:8080/contact").unwrap();
        assert_eq!(root, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_domain_root_assumes_https() {
        assert_eq!(domain_root("acme.io/about").unwrap(), "https://acme.io");
    }

    #[test]
    fn test_domain_root_rejects_other_schemes() {
        assert!(matches!(
            domain_root("ftp://acme.io"),
            Err(UrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_priority_paths_order() {
        let targets = priority_paths("https://example.com/");
        let urls: Vec<_> = targets.iter().map(|t| t.url.as_str()).collect();

        assert_eq!(urls[0], "https://example.com");
        assert_eq!(urls[1], "https://example.com/about");
        assert_eq!(urls[2], "https://example.com/about-us");
        assert_eq!(urls[3], "https://example.com/contact");
        assert_eq!(targets.len(), PRIORITY_PATHS.len());

        // Root appears once and scores descend
        assert_eq!(urls.iter().filter(|u| **u == "https://example.com").count(), 1);
        assert!(targets.windows(2).all(|w| w[0].priority_score > w[1].priority_score));
    }

    #[test]
    fn test_same_site() {
        assert!(same_site("https://example.com/about", "https://example.com"));
        assert!(!same_site("https://example.com.evil.org/", "https://example.com"));
        assert!(!same_site("http://example.com/", "https://example.com"));
        assert!(!same_site("https://blog.example.com/", "https://example.com"));
    }

    #[test]
    fn test_resolve_link() {
        let base = Url::parse("https://example.com/company/").unwrap();
        assert_eq!(
            resolve_link(&base, "../about#team").as_deref(),
            Some("https://example.com/about")
        );
        assert_eq!(
            resolve_link(&base, "https://linkedin.com/company/acme").as_deref(),
            Some("https://linkedin.com/company/acme")
        );
        assert_eq!(resolve_link(&base, "mailto:hi@example.com"), None);
        assert_eq!(resolve_link(&base, "javascript:void(0)"), None);
    }

    #[test]
    fn test_visit_key() {
        assert_eq!(visit_key("https://a.com/"), visit_key("https://a.com"));
    }
}

//! Signal extraction from fetched HTML
//!
//! Turns a [`RawPage`] into a [`PageRecord`]: visible text with
//! non-content elements stripped, the first link per social platform, the
//! first phone number and email address, and the description/keywords meta
//! tags. Same-site outbound links are returned alongside for link-following
//! crawls.

use scraper::node::Node;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

use enrich_core::{
    find_email, find_phone, resolve_link, same_site, visit_key, ContactInfo, Metadata,
    PageRecord, SocialLinks, SocialPlatform,
};

use crate::RawPage;

/// Errors from turning a page into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unsupported content type: {0}")]
    UnsupportedContent(String),

    #[error("Invalid page URL: {0}")]
    InvalidPageUrl(String),
}

/// Extraction options
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Drop `nav`, `header` and `footer` text from the page text.
    /// Contact signals are still read from them.
    pub strip_chrome: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { strip_chrome: true }
    }
}

/// A page record plus the same-site links it points at
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub record: PageRecord,
    /// Absolute same-site links in document order, deduplicated
    pub links: Vec<String>,
}

/// Elements whose text is never content
const CODE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Page chrome dropped from the text when `strip_chrome` is set
const CHROME_ELEMENTS: &[&str] = &["nav", "header", "footer"];

/// Metadata names kept from `<meta>` tags
const META_NAMES: &[&str] = &["description", "keywords"];

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());

static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name][content]").unwrap());

/// Extract a record from a fetched page. The record carries the
/// post-redirect URL and relative links resolve against it.
pub fn extract_page(page: &RawPage, options: &ExtractOptions) -> Result<ExtractedPage, ParseError> {
    if let Some(content_type) = &page.content_type {
        if !is_textual(content_type) {
            return Err(ParseError::UnsupportedContent(content_type.clone()));
        }
    }

    extract_html(&page.body, &page.final_url, options)
}

/// Extract a record from raw HTML; relative links resolve against `url`
pub fn extract_html(
    html: &str,
    url: &str,
    options: &ExtractOptions,
) -> Result<ExtractedPage, ParseError> {
    let base = enrich_core::parse_site_url(url)
        .map_err(|e| ParseError::InvalidPageUrl(e.to_string()))?;
    let page_url = base.to_string();

    let document = Html::parse_document(html);

    let (text, signal_text) = collect_text(&document, options);

    let mut social_links = SocialLinks::new();
    let mut links = Vec::new();
    let mut seen_links = HashSet::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_link(&base, href) else {
            continue;
        };

        if let Some(platform) = SocialPlatform::detect(&resolved) {
            social_links.entry(platform).or_insert_with(|| resolved.clone());
            continue;
        }

        if same_site(&resolved, &page_url) && seen_links.insert(visit_key(&resolved)) {
            links.push(resolved);
        }
    }

    let contact_info = ContactInfo {
        phone: find_phone(&signal_text),
        email: find_email(&signal_text),
    };

    let metadata = collect_metadata(&document);

    debug!(
        "Extracted {} chars, {} social links, {} links from {}",
        text.len(),
        social_links.len(),
        links.len(),
        url
    );

    Ok(ExtractedPage {
        record: PageRecord {
            url: url.to_string(),
            text,
            social_links,
            contact_info,
            metadata,
        },
        links,
    })
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime.contains("html") || mime.contains("xml") || mime == "text/plain"
}

/// Walk all text nodes. Returns (content text, signal text): content text
/// excludes page chrome when configured, signal text only excludes code.
fn collect_text(document: &Html, options: &ExtractOptions) -> (String, String) {
    let mut content_parts = Vec::new();
    let mut signal_parts = Vec::new();

    for node_ref in document.root_element().descendants() {
        let Node::Text(text_node) = node_ref.value() else {
            continue;
        };

        let trimmed = text_node.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut in_code = false;
        let mut in_chrome = false;
        for ancestor in node_ref.ancestors() {
            if let Some(el) = ancestor.value().as_element() {
                if CODE_ELEMENTS.contains(&el.name()) {
                    in_code = true;
                    break;
                }
                if CHROME_ELEMENTS.contains(&el.name()) {
                    in_chrome = true;
                }
            }
        }

        if in_code {
            continue;
        }

        signal_parts.push(trimmed);
        if !(options.strip_chrome && in_chrome) {
            content_parts.push(trimmed);
        }
    }

    (
        normalize_whitespace(&content_parts.join(" ")),
        normalize_whitespace(&signal_parts.join(" ")),
    )
}

fn collect_metadata(document: &Html) -> Metadata {
    let mut metadata = Metadata::new();

    for element in document.select(&META_SELECTOR) {
        let (Some(name), Some(content)) =
            (element.value().attr("name"), element.value().attr("content"))
        else {
            continue;
        };

        let name = name.trim().to_ascii_lowercase();
        let content = content.trim();
        if META_NAMES.contains(&name.as_str()) && !content.is_empty() {
            metadata.entry(name).or_insert_with(|| content.to_string());
        }
    }

    metadata
}

/// Normalize whitespace in text
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

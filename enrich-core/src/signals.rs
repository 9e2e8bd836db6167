//! Structured contact signals found in page content
//!
//! Supports detection of:
//! - Social profile links (LinkedIn, Facebook, Twitter/X, Pinterest, Instagram, YouTube)
//! - North-American phone numbers
//! - Email addresses

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

/// Social platforms recognized in anchor hrefs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Linkedin,
    Facebook,
    Twitter,
    Pinterest,
    Instagram,
    Youtube,
}

impl SocialPlatform {
    /// All platforms, in detection order
    pub const ALL: [SocialPlatform; 6] = [
        SocialPlatform::Linkedin,
        SocialPlatform::Facebook,
        SocialPlatform::Twitter,
        SocialPlatform::Pinterest,
        SocialPlatform::Instagram,
        SocialPlatform::Youtube,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SocialPlatform::Linkedin => "linkedin",
            SocialPlatform::Facebook => "facebook",
            SocialPlatform::Twitter => "twitter",
            SocialPlatform::Pinterest => "pinterest",
            SocialPlatform::Instagram => "instagram",
            SocialPlatform::Youtube => "youtube",
        }
    }

    /// Registrable domains owned by the platform
    pub fn domains(&self) -> &'static [&'static str] {
        match self {
            SocialPlatform::Linkedin => &["linkedin.com"],
            SocialPlatform::Facebook => &["facebook.com"],
            SocialPlatform::Twitter => &["twitter.com", "x.com"],
            SocialPlatform::Pinterest => &["pinterest.com"],
            SocialPlatform::Instagram => &["instagram.com"],
            SocialPlatform::Youtube => &["youtube.com"],
        }
    }

    /// Detect which platform an absolute URL points at.
    ///
    /// Matches on the host so that `dropbox.com` is not mistaken for `x.com`.
    pub fn detect(url: &str) -> Option<SocialPlatform> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();

        Self::ALL.into_iter().find(|platform| {
            platform
                .domains()
                .iter()
                .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
        })
    }
}

impl fmt::Display for SocialPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Optional +1 country code, then 3-3-4 digits with common separators
static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?([0-9]{3})\)?[-.\s]?([0-9]{3})[-.\s]?([0-9]{4})").unwrap()
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

/// First phone number in `text`, normalized to `(NNN) NNN-NNNN`
pub fn find_phone(text: &str) -> Option<String> {
    PHONE_REGEX
        .captures(text)
        .map(|caps| format!("({}) {}-{}", &caps[1], &caps[2], &caps[3]))
}

/// First email address in `text`, verbatim
pub fn find_email(text: &str) -> Option<String> {
    EMAIL_REGEX.find(text).map(|m| m.as_str().to_string())
}

//! Per-page crawl records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::SocialPlatform;

/// Social profile links keyed by platform
pub type SocialLinks = BTreeMap<SocialPlatform, String>;

/// `<meta>` values keyed by lowercase name
pub type Metadata = BTreeMap<String, String>;

/// Contact details found in page text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.email.is_none()
    }

    /// Fill fields that are still unset from `other`; existing values win
    pub fn fill_missing(&mut self, other: &ContactInfo) {
        if self.phone.is_none() {
            self.phone = other.phone.clone();
        }
        if self.email.is_none() {
            self.email = other.email.clone();
        }
    }
}

/// Text and structured signals extracted from one fetched page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Page URL
    pub url: String,
    /// Whitespace-normalized visible text
    pub text: String,
    /// First link found per social platform
    pub social_links: SocialLinks,
    /// First phone and email found
    pub contact_info: ContactInfo,
    /// `description` and `keywords` meta tags
    pub metadata: Metadata,
}

impl PageRecord {
    /// A well-formed record with no content
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: String::new(),
            social_links: SocialLinks::new(),
            contact_info: ContactInfo::default(),
            metadata: Metadata::new(),
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

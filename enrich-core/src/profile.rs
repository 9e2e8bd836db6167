//! Aggregated crawl content and the final company profile
//!
//! [`CompanyProfile`] has a fixed shape: every field is always present and
//! holds either a value or [`NOT_FOUND`]. Deserialization is tolerant of
//! what language models actually emit (missing keys, nulls, numbers,
//! "N/A") and normalizes all of it onto that shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{ContactInfo, Metadata, PageRecord, SocialLinks, SocialPlatform};

/// Marker for a profile field that could not be determined
pub const NOT_FOUND: &str = "Not found";

/// Placeholders models use instead of the requested marker
const MISSING_PLACEHOLDERS: &[&str] = &[
    "not found",
    "n/a",
    "na",
    "none",
    "null",
    "unknown",
    "not available",
    "not specified",
    "-",
];

/// Whether a field value means "missing"
pub fn is_not_found(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || MISSING_PLACEHOLDERS
            .iter()
            .any(|p| trimmed.eq_ignore_ascii_case(p))
}

fn not_found() -> String {
    NOT_FOUND.to_string()
}

/// Everything the crawl produced, merged and budgeted for extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedProfile {
    /// Summary (map-reduce) or truncated raw text (direct)
    pub summary_text: String,
    pub social_links: SocialLinks,
    pub contact_info: ContactInfo,
    pub metadata: Metadata,
    /// Pages in crawl order
    pub pages_analyzed: Vec<PageRecord>,
}

/// Postal address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    #[serde(deserialize_with = "lenient_string")]
    pub street: String,
    #[serde(deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(deserialize_with = "lenient_string")]
    pub zip: String,
    #[serde(deserialize_with = "lenient_string")]
    pub country: String,
}

impl Default for Address {
    fn default() -> Self {
        Self {
            street: not_found(),
            city: not_found(),
            state: not_found(),
            zip: not_found(),
            country: not_found(),
        }
    }
}

/// Normalized company profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    #[serde(deserialize_with = "lenient_string")]
    pub legal_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub industry: String,
    #[serde(deserialize_with = "lenient_string")]
    pub employees: String,
    #[serde(deserialize_with = "lenient_string")]
    pub annual_revenue: String,
    #[serde(deserialize_with = "lenient_string")]
    pub linkedin: String,
    #[serde(deserialize_with = "lenient_string")]
    pub facebook: String,
    #[serde(deserialize_with = "lenient_string")]
    pub twitter: String,
    #[serde(deserialize_with = "lenient_string")]
    pub pinterest: String,
    #[serde(deserialize_with = "lenient_address")]
    pub address: Address,
    #[serde(deserialize_with = "lenient_string")]
    pub sic_code: String,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            legal_name: not_found(),
            description: not_found(),
            industry: not_found(),
            employees: not_found(),
            annual_revenue: not_found(),
            linkedin: not_found(),
            facebook: not_found(),
            twitter: not_found(),
            pinterest: not_found(),
            address: Address::default(),
            sic_code: not_found(),
            phone: not_found(),
            email: not_found(),
        }
    }
}

impl CompanyProfile {
    /// Names of top-level and address fields still holding [`NOT_FOUND`]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let fields: [(&'static str, &str); 17] = [
            ("legal_name", &self.legal_name),
            ("description", &self.description),
            ("industry", &self.industry),
            ("employees", &self.employees),
            ("annual_revenue", &self.annual_revenue),
            ("linkedin", &self.linkedin),
            ("facebook", &self.facebook),
            ("twitter", &self.twitter),
            ("pinterest", &self.pinterest),
            ("address.street", &self.address.street),
            ("address.city", &self.address.city),
            ("address.state", &self.address.state),
            ("address.zip", &self.address.zip),
            ("address.country", &self.address.country),
            ("sic_code", &self.sic_code),
            ("phone", &self.phone),
            ("email", &self.email),
        ];

        fields
            .into_iter()
            .filter(|(_, value)| *value == NOT_FOUND)
            .map(|(name, _)| name)
            .collect()
    }

    /// Fill still-missing social and contact fields from signals observed
    /// directly on the crawled pages. Returns the number of fields filled.
    pub fn backfill(&mut self, social: &SocialLinks, contact: &ContactInfo) -> usize {
        let mut filled = 0;

        let slots = [
            (SocialPlatform::Linkedin, &mut self.linkedin),
            (SocialPlatform::Facebook, &mut self.facebook),
            (SocialPlatform::Twitter, &mut self.twitter),
            (SocialPlatform::Pinterest, &mut self.pinterest),
        ];
        for (platform, slot) in slots {
            if *slot == NOT_FOUND {
                if let Some(link) = social.get(&platform) {
                    *slot = link.clone();
                    filled += 1;
                }
            }
        }

        let contact_slots = [
            (&contact.phone, &mut self.phone),
            (&contact.email, &mut self.email),
        ];
        for (value, slot) in contact_slots {
            if *slot == NOT_FOUND {
                if let Some(value) = value {
                    *slot = value.clone();
                    filled += 1;
                }
            }
        }

        filled
    }
}

fn value_to_field(value: &Value) -> String {
    match value {
        Value::String(s) if !is_not_found(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(value_to_field)
                .filter(|s| s != NOT_FOUND)
                .collect();
            if parts.is_empty() {
                not_found()
            } else {
                parts.join(", ")
            }
        }
        _ => not_found(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_field(&value))
}

fn lenient_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Object(_) => serde_json::from_value(value).map_err(serde::de::Error::custom),
        Value::String(s) if !is_not_found(&s) => Ok(Address {
            street: s.trim().to_string(),
            ..Address::default()
        }),
        _ => Ok(Address::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_not_found() {
        let profile = CompanyProfile::default();
        assert_eq!(profile.missing_fields().len(), 17);
        assert_eq!(profile.address.city, NOT_FOUND);
    }

    #[test]
    fn test_partial_json_fills_markers() {
        let profile: CompanyProfile =
            serde_json::from_str(r#"{"legal_name": "Acme Corp"}"#).unwrap();

        assert_eq!(profile.legal_name, "Acme Corp");
        assert_eq!(profile.industry, NOT_FOUND);
        assert_eq!(profile.address, Address::default());
    }

    #[test]
    fn test_lenient_values() {
        let json = r#"{
            "legal_name": "  Acme Corp ",
            "employees": 250,
            "annual_revenue": null,
            "industry": "N/A",
            "description": "",
            "sic_code": ["7372", "7371"],
            "address": {"city": "Austin", "zip": 78701}
        }"#;
        let profile: CompanyProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.legal_name, "Acme Corp");
        assert_eq!(profile.employees, "250");
        assert_eq!(profile.annual_revenue, NOT_FOUND);
        assert_eq!(profile.industry, NOT_FOUND);
        assert_eq!(profile.description, NOT_FOUND);
        assert_eq!(profile.sic_code, "7372, 7371");
        assert_eq!(profile.address.city, "Austin");
        assert_eq!(profile.address.zip, "78701");
        assert_eq!(profile.address.street, NOT_FOUND);
    }

    #[test]
    fn test_address_as_string() {
        let profile: CompanyProfile =
            serde_json::from_str(r#"{"address": "1 Main St, Springfield"}"#).unwrap();
        assert_eq!(profile.address.street, "1 Main St, Springfield");
        assert_eq!(profile.address.country, NOT_FOUND);
    }

    #[test]
    fn test_serialized_shape_is_fixed() {
        let value = serde_json::to_value(CompanyProfile::default()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 13);
        assert_eq!(obj["address"].as_object().unwrap().len(), 5);
        assert!(obj.values().all(|v| v.is_string() || v.is_object()));
    }

    #[test]
    fn test_backfill_only_missing() {
        let mut profile = CompanyProfile {
            twitter: "https://x.com/acme_official".to_string(),
            ..Default::default()
        };
        let mut social = SocialLinks::new();
        social.insert(SocialPlatform::Linkedin, "https://linkedin.com/company/acme".to_string());
        social.insert(SocialPlatform::Twitter, "https://x.com/acme".to_string());
        let contact = ContactInfo {
            phone: None,
            email: Some("hi@acme.io".to_string()),
        };

        let filled = profile.backfill(&social, &contact);

        assert_eq!(filled, 2);
        assert_eq!(profile.linkedin, "https://linkedin.com/company/acme");
        assert_eq!(profile.twitter, "https://x.com/acme_official");
        assert_eq!(profile.email, "hi@acme.io");
        assert_eq!(profile.phone, NOT_FOUND);
    }
}

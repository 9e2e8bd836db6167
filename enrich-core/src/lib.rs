//! Company Enrich Core - domain model for company website enrichment
//!
//! This crate provides the foundational primitives:
//! - URL resolution and the priority page list
//! - Contact signal patterns (social links, phone, email)
//! - Per-page records and the aggregated crawl result
//! - The fixed-shape company profile

pub mod urls;
pub mod signals;
pub mod page;
pub mod profile;

pub use urls::*;
pub use signals::*;
pub use page::*;
pub use profile::*;

/// Default number of pages to crawl
pub const DEFAULT_MAX_PAGES: usize = 5;

/// Smallest accepted page limit
pub const MIN_PAGES: usize = 1;

/// Largest accepted page limit
pub const MAX_PAGES: usize = 10;

/// Clamp a requested page limit into the accepted range
pub fn clamp_max_pages(requested: usize) -> usize {
    requested.clamp(MIN_PAGES, MAX_PAGES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_max_pages() {
        assert_eq!(clamp_max_pages(0), 1);
        assert_eq!(clamp_max_pages(5), 5);
        assert_eq!(clamp_max_pages(50), 10);
    }
}

//! Company Enrich Web Layer
//!
//! Provides the crawl-side plumbing:
//! - HTTP client with timeout, User-Agent rotation and optional proxy
//! - Single-page fetching with typed failures
//! - HTML signal extraction (text, social links, contact info, meta tags)
//! - Bounded priority-list and breadth-first site crawling

pub mod client;
pub mod fetcher;
pub mod extract;
pub mod crawler;

pub use client::*;
pub use fetcher::*;
pub use extract::*;
pub use crawler::*;

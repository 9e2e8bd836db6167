//! Company Enrich Runtime
//!
//! Wires the crawl, aggregation and extraction stages into one run:
//! - [`PipelineConfig`]: TOML-loadable run settings
//! - [`build_backend`]: provider selection and credential checks
//! - [`Pipeline`]: crawl → aggregate → extract over a shared backend

pub mod config;
pub mod pipeline;

pub use config::*;
pub use pipeline::*;

//! Company Enrich Agents
//!
//! Model-facing stages of the enrichment pipeline:
//! - **Backend**: OpenAI-compatible and Anthropic completion backends
//! - **Aggregator**: merges crawled pages and budgets their text, either
//!   directly or through a map-reduce summary
//! - **Extractor**: prompts for the structured profile and recovers it from
//!   free-form model output

pub mod backend;
pub mod aggregator;
pub mod extractor;

pub use backend::*;
pub use aggregator::*;
pub use extractor::*;

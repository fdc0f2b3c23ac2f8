//! Pipeline entry points for ingestion operations.
//!
//! - `run_ingest`: Poll feeds and insert new articles
//! - `run_content`: Scrape body text for articles without content
//! - `run_stats`: Report content coverage
//! - `run_analysis`: Send stored articles to the NLP service

pub mod analyze;
pub mod content;
pub mod ingest;

pub use analyze::{AnalysisKind, AnalysisRequest, run_analysis};
pub use content::{RepositoryStats, run_content, run_stats};
pub use ingest::run_ingest;

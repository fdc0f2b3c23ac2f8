// src/models/mod.rs

//! Domain models for the ingestion library.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod article;
mod config;
mod feed;
mod site;

// Re-export all public types
pub use article::{
    ArticleId, ArticleRecord, ContentUpdate, NewArticle, PAYWALL_PLACEHOLDER, ScrapingOutcome,
    ScrapingStatus,
};
pub use config::{Config, LoggingConfig, NlpConfig, PaywallConfig, ScraperConfig};
pub use feed::{
    FeedItem, FeedRunReport, FeedSource, IngestionStatus, ScrapeJob, SourceState, SourceStatus,
};
pub use site::{SiteConfig, common_remove_selectors};

//! Service layer for the ingestion application.
//!
//! This module contains the business logic for:
//! - Feed polling and deduplicated inserts (`FeedIngestor`)
//! - Per-site extraction rules (`SiteRegistry`)
//! - Article body extraction (`ContentExtractor`, `ContentScraper`)
//! - Bounded batch scraping (`BatchOrchestrator`, `ConcurrencyLimiter`)
//! - The NLP microservice client (`NlpClient`)

mod batch;
mod extract;
mod feeds;
mod limiter;
mod nlp;
mod scraper;
mod sites;

pub use batch::{BatchOrchestrator, ContentRunSummary, ScrapingStats, SourceTally};
pub use extract::{ContentExtractor, Extraction};
pub use feeds::{FeedIngestor, build_article, parse_feed};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use nlp::{
    DEFAULT_NUM_TOPICS, NlpArticle, NlpClient, NlpHealth, SemanticResponse, SentimentResponse,
    TopicResponse,
};
pub use scraper::ContentScraper;
pub use sites::SiteRegistry;

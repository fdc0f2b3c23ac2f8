//! Storage abstractions for article persistence.
//!
//! The ingestion core only depends on the [`ArticleRepository`] contract.
//! Two adapters ship with the crate:
//!
//! - [`MemoryRepository`]: in-process table, used by tests and one-shot runs
//! - [`LocalRepository`]: JSON snapshot on the local filesystem
//!
//! ```text
//! storage/
//! └── articles.json         # All article records, oldest first
//! ```

pub mod local;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ArticleId, ArticleRecord, ContentUpdate, NewArticle, ScrapingStatus};

// Re-export for convenience
pub use local::LocalRepository;
pub use memory::MemoryRepository;

/// Result of an insert against the fingerprint uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was created
    Inserted(ArticleId),
    /// A record with the same fingerprint already exists and was kept
    Duplicate(ArticleId),
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Row predicate for [`ArticleRepository::count`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleFilter {
    All,
    WithContent,
    WithoutContent,
    Source(String),
    Status(ScrapingStatus),
}

impl ArticleFilter {
    pub fn matches(&self, article: &ArticleRecord) -> bool {
        match self {
            ArticleFilter::All => true,
            ArticleFilter::WithContent => article.content.is_some(),
            ArticleFilter::WithoutContent => article.content.is_none(),
            ArticleFilter::Source(source) => article.source == *source,
            ArticleFilter::Status(status) => article.content_scraping_status == Some(*status),
        }
    }
}

/// Trait for article storage backends.
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Look up a record by content fingerprint.
    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ArticleRecord>>;

    /// Insert a record unless its fingerprint is already stored.
    async fn insert(&self, article: NewArticle) -> Result<InsertOutcome>;

    /// Fetch up to `limit` records with no content, newest first.
    ///
    /// `before` restricts the scan to ids lower than the given one, so callers
    /// can page through the set while rows are being updated.
    async fn find_missing_content(
        &self,
        limit: usize,
        before: Option<ArticleId>,
    ) -> Result<Vec<ArticleRecord>>;

    /// Fetch up to `limit` records matching `filter`, newest first.
    async fn find_recent(&self, limit: usize, filter: ArticleFilter) -> Result<Vec<ArticleRecord>>;

    /// Apply content fields to a record.
    async fn update_content(&self, id: ArticleId, update: ContentUpdate) -> Result<()>;

    /// Load a record by id.
    async fn get(&self, id: ArticleId) -> Result<Option<ArticleRecord>>;

    /// Count records matching a predicate.
    async fn count(&self, filter: ArticleFilter) -> Result<usize>;

    /// Count records per scraping status, excluding unset statuses.
    async fn count_grouped_by_status(&self) -> Result<BTreeMap<ScrapingStatus, usize>>;

    /// Count records per source.
    async fn count_grouped_by_source(&self) -> Result<BTreeMap<String, usize>>;
}

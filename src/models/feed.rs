//! Feed sources, normalized feed items, and ingestion bookkeeping.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured syndication feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    /// Source identifier stored on every article from this feed
    pub name: String,

    /// Feed URL
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One feed entry, normalized across RSS and Atom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub creator: Option<String>,
    pub author: Option<String>,
    /// Raw date string as published
    pub pub_date: Option<String>,
    /// `media:content` url
    pub media_url: Option<String>,
    pub enclosure_url: Option<String>,
    pub enclosure_type: Option<String>,
}

/// Per-source ingestion state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    #[default]
    Idle,
    Fetching,
    Parsed,
    FetchFailed,
}

/// Result of one feed poll, used for logging and observability.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedRunReport {
    pub source: String,
    pub items: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Items without title and link
    pub skipped: usize,
    pub error: Option<String>,
}

impl FeedRunReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(source)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Descriptor returned when feed scraping is scheduled in the background.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeJob {
    pub id: String,
    pub status: String,
    /// `None` when every configured source is scheduled
    pub source: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

/// Snapshot of the feed ingestor for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionStatus {
    pub last_run_time: Option<DateTime<Utc>>,
    pub next_run_time: DateTime<Utc>,
    pub sources: BTreeMap<String, SourceStatus>,
}

/// Last known state of one source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceStatus {
    pub state: SourceState,
    pub last_report: Option<FeedRunReport>,
}

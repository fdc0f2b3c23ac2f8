//! Article record and content-scraping status types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage-assigned article identity. Higher ids are newer.
pub type ArticleId = u64;

/// Placeholder stored for articles from known-paywall sources.
///
/// Non-empty so the row never shows up again as missing content.
pub const PAYWALL_PLACEHOLDER: &str = "[paywall] content not available";

/// One discovered piece of content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleRecord {
    /// Storage identity
    pub id: ArticleId,

    /// Headline from the feed
    pub title: String,

    /// Link to the article page
    pub url: String,

    /// Site identifier, possibly a section variant (`hn.cz-byznys`)
    pub source: String,

    /// SHA-256 of the best-available raw text at discovery time
    pub content_fingerprint: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub image_url: Option<String>,

    /// Ingestion time
    pub created_at: DateTime<Utc>,

    /// Extracted body text
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub content_length: Option<usize>,

    #[serde(default)]
    pub content_scraping_status: Option<ScrapingStatus>,

    #[serde(default)]
    pub content_scraped_at: Option<DateTime<Utc>>,
}

impl ArticleRecord {
    /// Build a stored record from an insert payload.
    pub fn from_new(id: ArticleId, new: NewArticle, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            url: new.url,
            source: new.source,
            content_fingerprint: new.content_fingerprint,
            description: new.description,
            author: new.author,
            published_at: new.published_at,
            image_url: new.image_url,
            created_at,
            content: None,
            content_length: None,
            content_scraping_status: None,
            content_scraped_at: None,
        }
    }

    /// Apply a content update in place.
    pub fn apply(&mut self, update: ContentUpdate) {
        self.content = update.content;
        self.content_length = update.content_length;
        self.content_scraping_status = Some(update.status);
        self.content_scraped_at = Some(update.scraped_at);
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

/// Insert payload produced by the feed ingestor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub content_fingerprint: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

/// Content-field mutation applied after a scraping attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    pub content: Option<String>,
    pub content_length: Option<usize>,
    pub status: ScrapingStatus,
    pub scraped_at: DateTime<Utc>,
}

impl ContentUpdate {
    /// Successful extraction.
    pub fn success(content: String, scraped_at: DateTime<Utc>) -> Self {
        Self {
            content_length: Some(content.chars().count()),
            content: Some(content),
            status: ScrapingStatus::Success,
            scraped_at,
        }
    }

    /// Terminal failure with no content.
    pub fn failed(scraped_at: DateTime<Utc>) -> Self {
        Self {
            content: None,
            content_length: None,
            status: ScrapingStatus::Failed,
            scraped_at,
        }
    }

    /// Known-paywall source skipped without a fetch.
    pub fn paywall_skipped(scraped_at: DateTime<Utc>) -> Self {
        Self {
            content: Some(PAYWALL_PLACEHOLDER.to_string()),
            content_length: Some(0),
            status: ScrapingStatus::PaywallSkipped,
            scraped_at,
        }
    }
}

/// Status of a content-scraping attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ScrapingStatus {
    Success,
    HttpError,
    NoContent,
    Paywall,
    NetworkError,
    UnknownError,
    /// Known-paywall source, placeholder stored
    PaywallSkipped,
    /// Persisted for transport or unexpected failures
    Failed,
}

impl ScrapingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapingStatus::Success => "success",
            ScrapingStatus::HttpError => "http_error",
            ScrapingStatus::NoContent => "no_content",
            ScrapingStatus::Paywall => "paywall",
            ScrapingStatus::NetworkError => "network_error",
            ScrapingStatus::UnknownError => "unknown_error",
            ScrapingStatus::PaywallSkipped => "paywall_skipped",
            ScrapingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScrapingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scraping a single article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapingOutcome {
    pub success: bool,
    pub status: ScrapingStatus,
    pub content: Option<String>,
    pub error: Option<String>,
}

impl ScrapingOutcome {
    pub fn success(content: String) -> Self {
        Self {
            success: true,
            status: ScrapingStatus::Success,
            content: Some(content),
            error: None,
        }
    }

    pub fn failure(status: ScrapingStatus, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            content: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new() -> NewArticle {
        NewArticle {
            title: "Vláda schválila rozpočet".to_string(),
            url: "https://hn.cz/c1-1".to_string(),
            source: "hn.cz".to_string(),
            content_fingerprint: "abc".to_string(),
            description: None,
            author: None,
            published_at: None,
            image_url: None,
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ScrapingStatus::PaywallSkipped).unwrap();
        assert_eq!(json, "\"paywall_skipped\"");
        assert_eq!(ScrapingStatus::HttpError.to_string(), "http_error");
    }

    #[test]
    fn test_apply_success_sets_length() {
        let mut record = ArticleRecord::from_new(1, sample_new(), Utc::now());
        assert!(!record.has_content());

        record.apply(ContentUpdate::success("Příliš žluťoučký".to_string(), Utc::now()));
        assert_eq!(record.content_length, Some(16));
        assert_eq!(
            record.content_scraping_status,
            Some(ScrapingStatus::Success)
        );
        assert!(record.content_scraped_at.is_some());
    }

    #[test]
    fn test_paywall_skipped_placeholder() {
        let update = ContentUpdate::paywall_skipped(Utc::now());
        assert_eq!(update.content.as_deref(), Some(PAYWALL_PLACEHOLDER));
        assert_eq!(update.content_length, Some(0));
        assert_eq!(update.status, ScrapingStatus::PaywallSkipped);
    }
}

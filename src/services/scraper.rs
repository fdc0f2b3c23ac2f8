// src/services/scraper.rs

//! Single-article content scraper.
//!
//! Fetches an article page, extracts the body with the site rules from the
//! [`SiteRegistry`], and records successful extractions in storage.

use std::sync::Arc;

use chrono::Utc;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};

use crate::error::Result;
use crate::models::{ArticleRecord, Config, ContentUpdate, ScrapingOutcome, ScrapingStatus};
use crate::services::extract::{ContentExtractor, Extraction};
use crate::services::sites::SiteRegistry;
use crate::storage::ArticleRepository;
use crate::utils::http::create_article_client;

/// Service scraping the body text of one article at a time.
pub struct ContentScraper {
    client: Client,
    registry: Arc<SiteRegistry>,
    extractor: ContentExtractor,
    repository: Arc<dyn ArticleRepository>,
}

impl ContentScraper {
    /// Create a scraper with an HTTP client built from `config`.
    pub fn new(
        config: &Config,
        registry: Arc<SiteRegistry>,
        repository: Arc<dyn ArticleRepository>,
    ) -> Result<Self> {
        let client = create_article_client(&config.scraper)?;
        let extractor =
            ContentExtractor::from_config(config.scraper.min_content_length, &config.paywall);
        Ok(Self::with_client(client, registry, extractor, repository))
    }

    pub fn with_client(
        client: Client,
        registry: Arc<SiteRegistry>,
        extractor: ContentExtractor,
        repository: Arc<dyn ArticleRepository>,
    ) -> Self {
        Self {
            client,
            registry,
            extractor,
            repository,
        }
    }

    /// Scrape and persist the content of one article.
    ///
    /// Only successful extractions and transport failures touch storage;
    /// HTTP errors, short pages and paywalls leave the record unchanged so a
    /// later run can retry. An `Err` means storage itself failed.
    pub async fn scrape_article_content(
        &self,
        article: &ArticleRecord,
    ) -> Result<ScrapingOutcome> {
        let site = self.registry.get_config(&article.source);

        let mut request = self.client.get(&article.url);
        if let Some(user_agent) = &site.user_agent {
            request = request.header(USER_AGENT, user_agent);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return self.record_transport_failure(article, e).await,
        };

        let status = response.status();
        if status != StatusCode::OK {
            log::debug!(
                "Article {} ({}) returned HTTP {}",
                article.id,
                article.url,
                status.as_u16()
            );
            return Ok(ScrapingOutcome::failure(
                ScrapingStatus::HttpError,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => return self.record_transport_failure(article, e).await,
        };

        match self.extractor.extract(&html, site) {
            Extraction::Content(content) => {
                log::debug!(
                    "Extracted {} chars for article {} via '{}'",
                    content.chars().count(),
                    article.id,
                    site.key
                );
                self.repository
                    .update_content(article.id, ContentUpdate::success(content.clone(), Utc::now()))
                    .await?;
                Ok(ScrapingOutcome::success(content))
            }
            Extraction::NoContent { length } => Ok(ScrapingOutcome::failure(
                ScrapingStatus::NoContent,
                format!("Extracted content too short ({length} chars)"),
            )),
            Extraction::Paywall { marker } => {
                log::debug!("Paywall marker '{}' on {}", marker, article.url);
                Ok(ScrapingOutcome::failure(
                    ScrapingStatus::Paywall,
                    "Paywall detected",
                ))
            }
        }
    }

    /// Persist `failed` and report the failure class of a transport error.
    async fn record_transport_failure(
        &self,
        article: &ArticleRecord,
        error: reqwest::Error,
    ) -> Result<ScrapingOutcome> {
        let status = classify_transport_error(&error);
        log::warn!(
            "Failed to fetch article {} ({}): {}",
            article.id,
            article.url,
            error
        );
        self.repository
            .update_content(article.id, ContentUpdate::failed(Utc::now()))
            .await?;
        Ok(ScrapingOutcome::failure(status, error.to_string()))
    }
}

/// Timeouts and connection failures are network errors; anything else is unknown.
fn classify_transport_error(error: &reqwest::Error) -> ScrapingStatus {
    if error.is_timeout() || error.is_connect() {
        ScrapingStatus::NetworkError
    } else {
        ScrapingStatus::UnknownError
    }
}

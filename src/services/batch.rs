// src/services/batch.rs

//! Batch content scraping.
//!
//! Pages through articles without content, skips known-paywall sources
//! without fetching, and scrapes the rest concurrently under a shared
//! [`ConcurrencyLimiter`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;

use crate::error::Result;
use crate::models::{ArticleId, ArticleRecord, Config, ContentUpdate, ScrapingStatus};
use crate::services::limiter::ConcurrencyLimiter;
use crate::services::scraper::ContentScraper;
use crate::services::sites::SiteRegistry;
use crate::storage::{ArticleFilter, ArticleRepository};

/// Per-source success and failure counts.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SourceTally {
    pub success: usize,
    pub failure: usize,
}

/// Totals for one content-scraping run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ContentRunSummary {
    pub batches: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub paywall_skipped: usize,
    pub by_status: BTreeMap<ScrapingStatus, usize>,
    pub by_source: BTreeMap<String, SourceTally>,
}

impl ContentRunSummary {
    fn record(&mut self, source: &str, status: ScrapingStatus) {
        self.processed += 1;
        *self.by_status.entry(status).or_default() += 1;

        let tally = self.by_source.entry(source.to_string()).or_default();
        match status {
            ScrapingStatus::Success => {
                self.succeeded += 1;
                tally.success += 1;
            }
            ScrapingStatus::PaywallSkipped => self.paywall_skipped += 1,
            _ => {
                self.failed += 1;
                tally.failure += 1;
            }
        }
    }
}

/// Content coverage across the whole repository.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ScrapingStats {
    pub total: usize,
    pub with_content: usize,
    pub without_content: usize,
    pub by_status: BTreeMap<ScrapingStatus, usize>,
}

/// Orchestrates content scraping in bounded batches.
pub struct BatchOrchestrator {
    scraper: Arc<ContentScraper>,
    registry: Arc<SiteRegistry>,
    repository: Arc<dyn ArticleRepository>,
    limiter: ConcurrencyLimiter,
    batch_size: usize,
    default_delay: Duration,
}

impl BatchOrchestrator {
    pub fn new(
        config: &Config,
        scraper: Arc<ContentScraper>,
        registry: Arc<SiteRegistry>,
        repository: Arc<dyn ArticleRepository>,
    ) -> Self {
        Self {
            scraper,
            registry,
            repository,
            limiter: ConcurrencyLimiter::new(config.scraper.max_concurrent),
            batch_size: config.scraper.batch_size.max(1),
            default_delay: Duration::from_millis(config.scraper.default_delay_ms),
        }
    }

    /// Scrape content for the given articles, or for everything missing content.
    ///
    /// Supplied lists are capped at one batch. Without a list, batches of
    /// missing-content records are processed newest first until a short
    /// batch comes back. Individual article failures never abort the run.
    pub async fn scrape_articles_content(
        &self,
        articles: Option<Vec<ArticleRecord>>,
    ) -> Result<ContentRunSummary> {
        let mut summary = ContentRunSummary::default();

        if let Some(mut articles) = articles {
            articles.truncate(self.batch_size);
            self.process_batch(articles, &mut summary).await;
            self.log_summary(&summary);
            return Ok(summary);
        }

        let mut cursor: Option<ArticleId> = None;
        loop {
            let batch = self
                .repository
                .find_missing_content(self.batch_size, cursor)
                .await?;
            if batch.is_empty() {
                break;
            }

            let fetched = batch.len();
            cursor = batch.last().map(|article| article.id);
            log::info!(
                "Processing batch {} ({} articles)",
                summary.batches + 1,
                fetched
            );
            self.process_batch(batch, &mut summary).await;

            if fetched < self.batch_size {
                break;
            }
        }

        self.log_summary(&summary);
        Ok(summary)
    }

    /// Coverage counts across the repository.
    pub async fn get_scraping_stats(&self) -> Result<ScrapingStats> {
        Ok(ScrapingStats {
            total: self.repository.count(ArticleFilter::All).await?,
            with_content: self.repository.count(ArticleFilter::WithContent).await?,
            without_content: self
                .repository
                .count(ArticleFilter::WithoutContent)
                .await?,
            by_status: self.repository.count_grouped_by_status().await?,
        })
    }

    async fn process_batch(&self, batch: Vec<ArticleRecord>, summary: &mut ContentRunSummary) {
        summary.batches += 1;
        let (succeeded, failed, skipped) =
            (summary.succeeded, summary.failed, summary.paywall_skipped);

        let (paywalled, scrapable): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .partition(|article| self.registry.is_known_paywall_source(&article.source));

        for article in paywalled {
            let status = match self
                .repository
                .update_content(article.id, ContentUpdate::paywall_skipped(Utc::now()))
                .await
            {
                Ok(()) => ScrapingStatus::PaywallSkipped,
                Err(e) => {
                    log::error!("Failed to mark article {} as paywalled: {}", article.id, e);
                    ScrapingStatus::Failed
                }
            };
            summary.record(&article.source, status);
        }

        let results = join_all(scrapable.into_iter().map(|article| self.scrape_one(article))).await;
        for (source, status) in results {
            summary.record(&source, status);
        }

        log::info!(
            "Batch {}: {} succeeded, {} failed, {} paywall skipped",
            summary.batches,
            summary.succeeded - succeeded,
            summary.failed - failed,
            summary.paywall_skipped - skipped
        );
    }

    /// Scrape one article in its own task, holding a limiter slot for the
    /// fetch and the politeness delay after it.
    async fn scrape_one(&self, article: ArticleRecord) -> (String, ScrapingStatus) {
        let delay = self.delay_for(&article.source);
        let scraper = Arc::clone(&self.scraper);
        let limiter = self.limiter.clone();
        let task_article = article.clone();

        let handle = tokio::spawn(async move {
            let _permit = limiter.acquire().await?;
            let outcome = scraper.scrape_article_content(&task_article).await;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            outcome
        });

        let error = match handle.await {
            Ok(Ok(outcome)) => {
                if let Some(error) = &outcome.error {
                    log::debug!("Article {} -> {}: {}", article.id, outcome.status, error);
                }
                return (article.source, outcome.status);
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };

        log::error!("Scraping article {} ({}) failed: {}", article.id, article.url, error);
        if let Err(e) = self
            .repository
            .update_content(article.id, ContentUpdate::failed(Utc::now()))
            .await
        {
            log::error!("Failed to mark article {} as failed: {}", article.id, e);
        }
        (article.source, ScrapingStatus::Failed)
    }

    /// Politeness delay for a source: the site's own, else the configured default.
    fn delay_for(&self, source: &str) -> Duration {
        self.registry
            .get_config(source)
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_delay)
    }

    fn log_summary(&self, summary: &ContentRunSummary) {
        for (source, tally) in &summary.by_source {
            log::info!(
                "  {}: {} succeeded, {} failed",
                source,
                tally.success,
                tally.failure
            );
        }
        log::info!(
            "Content run: {} processed in {} batches, {} succeeded, {} failed, {} paywall skipped",
            summary.processed,
            summary.batches,
            summary.succeeded,
            summary.failed,
            summary.paywall_skipped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::Client;

    use crate::error::AppError;
    use crate::models::{NewArticle, PAYWALL_PLACEHOLDER, SiteConfig};
    use crate::services::extract::ContentExtractor;
    use crate::storage::{InsertOutcome, MemoryRepository};

    const BODY: &str = "Sněmovna dnes po dlouhé debatě schválila novelu zákona o dani z příjmů.";

    fn config() -> Config {
        let mut config = Config::default();
        config.scraper.max_concurrent = 2;
        config.scraper.default_delay_ms = 0;
        config
    }

    fn registry() -> Arc<SiteRegistry> {
        Arc::new(SiteRegistry::new(
            vec![SiteConfig::new("test.cz", [".article-body"]).with_delay_ms(0)],
            ["zamceno.cz"],
        ))
    }

    fn orchestrator(repo: Arc<dyn ArticleRepository>) -> BatchOrchestrator {
        orchestrator_with(&config(), registry(), repo)
    }

    fn orchestrator_with(
        config: &Config,
        registry: Arc<SiteRegistry>,
        repo: Arc<dyn ArticleRepository>,
    ) -> BatchOrchestrator {
        let scraper = Arc::new(ContentScraper::with_client(
            Client::new(),
            Arc::clone(&registry),
            ContentExtractor::new(30, ["pro předplatitele"]),
            Arc::clone(&repo),
        ));
        BatchOrchestrator::new(config, scraper, registry, repo)
    }

    async fn seed(repo: &MemoryRepository, source: &str, url: &str) -> ArticleRecord {
        let InsertOutcome::Inserted(id) = repo
            .insert(NewArticle {
                title: format!("Článek {url}"),
                url: url.to_string(),
                source: source.to_string(),
                content_fingerprint: crate::utils::fingerprint(url),
                description: None,
                author: None,
                published_at: None,
                image_url: None,
            })
            .await
            .unwrap()
        else {
            panic!("expected insert");
        };
        repo.get(id).await.unwrap().unwrap()
    }

    fn article_page() -> String {
        format!(r#"<html><body><div class="article-body"><p>{BODY}</p></div></body></html>"#)
    }

    #[tokio::test]
    async fn test_supplied_list_capped_at_batch_size() {
        let repo = Arc::new(MemoryRepository::new());
        let mut articles = Vec::new();
        for i in 0..60 {
            articles.push(seed(&repo, "zamceno.cz", &format!("https://zamceno.cz/{i}")).await);
        }

        let summary = orchestrator(repo.clone())
            .scrape_articles_content(Some(articles))
            .await
            .unwrap();

        assert_eq!(summary.processed, 50);
        assert_eq!(summary.paywall_skipped, 50);
        assert_eq!(repo.count(ArticleFilter::WithoutContent).await.unwrap(), 10);
        assert_eq!(
            repo.count(ArticleFilter::Status(ScrapingStatus::PaywallSkipped))
                .await
                .unwrap(),
            50
        );
    }

    #[tokio::test]
    async fn test_delay_resolution() {
        let mut config = config();
        config.scraper.default_delay_ms = 500;
        let registry = Arc::new(SiteRegistry::new(
            vec![
                SiteConfig::new("pomaly.cz", [".article-body"]).with_delay_ms(200),
                SiteConfig::new("bez-prodlevy.cz", [".article-body"]),
            ],
            Vec::<String>::new(),
        ));
        let orchestrator =
            orchestrator_with(&config, registry, Arc::new(MemoryRepository::new()));

        assert_eq!(orchestrator.delay_for("pomaly.cz"), Duration::from_millis(200));
        assert_eq!(
            orchestrator.delay_for("bez-prodlevy.cz"),
            Duration::from_millis(500)
        );
        assert_eq!(orchestrator.delay_for("neznamy.org"), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_site_delay_holds_the_slot() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(article_page())
            .expect(3)
            .create_async()
            .await;

        let mut config = config();
        config.scraper.max_concurrent = 1;
        let registry = Arc::new(SiteRegistry::new(
            vec![SiteConfig::new("pomaly.cz", [".article-body"]).with_delay_ms(200)],
            Vec::<String>::new(),
        ));

        let repo = Arc::new(MemoryRepository::new());
        let mut articles = Vec::new();
        for i in 0..3 {
            articles.push(seed(&repo, "pomaly.cz", &format!("{}/{i}", server.url())).await);
        }

        let orchestrator = orchestrator_with(&config, registry, repo.clone());
        let started = std::time::Instant::now();
        let summary = orchestrator
            .scrape_articles_content(Some(articles))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(600));
        assert_eq!(summary.succeeded, 3);
    }

    #[tokio::test]
    async fn test_known_paywall_is_not_fetched() {
        let mut server = mockito::Server::new_async().await;
        let paywall_mock = server
            .mock("GET", "/zamceno")
            .expect(0)
            .create_async()
            .await;
        let open_mock = server
            .mock("GET", "/otevreno")
            .with_status(200)
            .with_body(article_page())
            .create_async()
            .await;

        let repo = Arc::new(MemoryRepository::new());
        let locked = seed(&repo, "zamceno.cz", &format!("{}/zamceno", server.url())).await;
        let open = seed(&repo, "test.cz", &format!("{}/otevreno", server.url())).await;

        let summary = orchestrator(repo.clone())
            .scrape_articles_content(None)
            .await
            .unwrap();

        paywall_mock.assert_async().await;
        open_mock.assert_async().await;
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.paywall_skipped, 1);

        let locked = repo.get(locked.id).await.unwrap().unwrap();
        assert_eq!(locked.content.as_deref(), Some(PAYWALL_PLACEHOLDER));
        assert_eq!(locked.content_length, Some(0));
        assert_eq!(
            locked.content_scraping_status,
            Some(ScrapingStatus::PaywallSkipped)
        );

        let open = repo.get(open.id).await.unwrap().unwrap();
        assert_eq!(open.content.as_deref(), Some(BODY));
    }

    #[tokio::test]
    async fn test_pages_until_short_batch() {
        let repo = Arc::new(MemoryRepository::new());
        for i in 0..120 {
            seed(&repo, "zamceno.cz", &format!("https://zamceno.cz/{i}")).await;
        }

        let summary = orchestrator(repo.clone())
            .scrape_articles_content(None)
            .await
            .unwrap();

        assert_eq!(summary.batches, 3);
        assert_eq!(summary.processed, 120);
        assert_eq!(repo.count(ArticleFilter::WithoutContent).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unscrapable_rows_do_not_loop_forever() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(404)
            .expect(3)
            .create_async()
            .await;

        let repo = Arc::new(MemoryRepository::new());
        for i in 0..3 {
            seed(&repo, "test.cz", &format!("{}/{i}", server.url())).await;
        }

        let summary = orchestrator(repo.clone())
            .scrape_articles_content(None)
            .await
            .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.by_status[&ScrapingStatus::HttpError], 3);
        assert_eq!(summary.by_source["test.cz"].failure, 3);
        assert_eq!(repo.count(ArticleFilter::WithoutContent).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_batch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex(r"^/ok/\d$".to_string()))
            .with_status(200)
            .with_body(article_page())
            .expect(4)
            .create_async()
            .await;

        let repo = Arc::new(MemoryRepository::new());
        let mut articles = Vec::new();
        for i in 0..5 {
            let url = if i == 2 {
                "http://127.0.0.1:9/refused".to_string()
            } else {
                format!("{}/ok/{i}", server.url())
            };
            articles.push(seed(&repo, "test.cz", &url).await);
        }
        let failing_id = articles[2].id;

        let summary = orchestrator(repo.clone())
            .scrape_articles_content(Some(articles))
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);
        let failing = repo.get(failing_id).await.unwrap().unwrap();
        assert_eq!(failing.content_scraping_status, Some(ScrapingStatus::Failed));
        assert!(failing.content.is_none());
    }

    /// Repository whose content updates fail for one id.
    struct FlakyRepository {
        inner: MemoryRepository,
        broken_id: ArticleId,
    }

    #[async_trait]
    impl ArticleRepository for FlakyRepository {
        async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ArticleRecord>> {
            self.inner.find_by_fingerprint(fingerprint).await
        }

        async fn insert(&self, article: NewArticle) -> Result<InsertOutcome> {
            self.inner.insert(article).await
        }

        async fn find_missing_content(
            &self,
            limit: usize,
            before: Option<ArticleId>,
        ) -> Result<Vec<ArticleRecord>> {
            self.inner.find_missing_content(limit, before).await
        }

        async fn find_recent(
            &self,
            limit: usize,
            filter: ArticleFilter,
        ) -> Result<Vec<ArticleRecord>> {
            self.inner.find_recent(limit, filter).await
        }

        async fn update_content(&self, id: ArticleId, update: ContentUpdate) -> Result<()> {
            if id == self.broken_id {
                return Err(AppError::storage("disk full"));
            }
            self.inner.update_content(id, update).await
        }

        async fn get(&self, id: ArticleId) -> Result<Option<ArticleRecord>> {
            self.inner.get(id).await
        }

        async fn count(&self, filter: ArticleFilter) -> Result<usize> {
            self.inner.count(filter).await
        }

        async fn count_grouped_by_status(&self) -> Result<BTreeMap<ScrapingStatus, usize>> {
            self.inner.count_grouped_by_status().await
        }

        async fn count_grouped_by_source(&self) -> Result<BTreeMap<String, usize>> {
            self.inner.count_grouped_by_source().await
        }
    }

    #[tokio::test]
    async fn test_scraper_error_is_recorded_as_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(article_page())
            .create_async()
            .await;

        let inner = MemoryRepository::new();
        let mut articles = Vec::new();
        for i in 0..3 {
            articles.push(seed(&inner, "test.cz", &format!("{}/{i}", server.url())).await);
        }
        let repo = Arc::new(FlakyRepository {
            inner,
            broken_id: articles[1].id,
        });

        let summary = orchestrator(repo.clone())
            .scrape_articles_content(Some(articles))
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.by_status[&ScrapingStatus::Failed], 1);
        assert_eq!(repo.count(ArticleFilter::WithContent).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_scraping_stats() {
        let repo = Arc::new(MemoryRepository::new());
        let done = seed(&repo, "test.cz", "https://test.cz/a").await;
        seed(&repo, "test.cz", "https://test.cz/b").await;
        seed(&repo, "zamceno.cz", "https://zamceno.cz/c").await;
        repo.update_content(done.id, ContentUpdate::success(BODY.to_string(), Utc::now()))
            .await
            .unwrap();

        let stats = orchestrator(repo).get_scraping_stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_content, 1);
        assert_eq!(stats.without_content, 2);
        assert_eq!(stats.by_status.get(&ScrapingStatus::Success), Some(&1));
        assert_eq!(stats.by_status.len(), 1);
    }
}

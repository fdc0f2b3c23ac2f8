// src/pipeline/content.rs

//! Content scraping and statistics pipelines.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::models::Config;
use crate::services::{
    BatchOrchestrator, ContentRunSummary, ContentScraper, ScrapingStats, SiteRegistry,
};
use crate::storage::ArticleRepository;

/// Scraping statistics plus per-source article counts.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryStats {
    #[serde(flatten)]
    pub scraping: ScrapingStats,
    pub by_source: BTreeMap<String, usize>,
}

fn build_orchestrator(
    config: &Config,
    repository: Arc<dyn ArticleRepository>,
) -> Result<BatchOrchestrator> {
    let registry = Arc::new(SiteRegistry::from_config(config));
    let scraper = Arc::new(ContentScraper::new(
        config,
        Arc::clone(&registry),
        Arc::clone(&repository),
    )?);
    Ok(BatchOrchestrator::new(config, scraper, registry, repository))
}

/// Scrape content for articles that have none.
///
/// With `limit`, only the newest `limit` such articles are processed, capped
/// at one batch.
pub async fn run_content(
    config: &Config,
    repository: Arc<dyn ArticleRepository>,
    limit: Option<usize>,
) -> Result<ContentRunSummary> {
    let orchestrator = build_orchestrator(config, Arc::clone(&repository))?;

    let articles = match limit {
        Some(limit) => Some(repository.find_missing_content(limit, None).await?),
        None => None,
    };
    orchestrator.scrape_articles_content(articles).await
}

/// Collect coverage statistics for the repository.
pub async fn run_stats(
    config: &Config,
    repository: Arc<dyn ArticleRepository>,
) -> Result<RepositoryStats> {
    let orchestrator = build_orchestrator(config, Arc::clone(&repository))?;
    Ok(RepositoryStats {
        scraping: orchestrator.get_scraping_stats().await?,
        by_source: repository.count_grouped_by_source().await?,
    })
}

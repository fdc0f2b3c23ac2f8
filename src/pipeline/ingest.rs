// src/pipeline/ingest.rs

//! Feed ingestion pipeline.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, FeedRunReport};
use crate::services::FeedIngestor;
use crate::storage::ArticleRepository;

/// Poll one source, or every configured source, into the repository.
pub async fn run_ingest(
    config: &Config,
    repository: Arc<dyn ArticleRepository>,
    source: Option<&str>,
) -> Result<Vec<FeedRunReport>> {
    let start_time = Utc::now();
    let ingestor = FeedIngestor::new(config, repository)?;

    let reports = match source {
        Some(name) => {
            log::info!("Polling feed {}", name);
            vec![ingestor.scrape_by_name(name).await?]
        }
        None => {
            log::info!("Polling {} feeds", ingestor.feeds().len());
            ingestor.scrape_all().await
        }
    };

    let inserted: usize = reports.iter().map(|r| r.inserted).sum();
    let duplicates: usize = reports.iter().map(|r| r.duplicates).sum();
    for report in reports.iter().filter(|r| !r.is_ok()) {
        log::warn!(
            "  {}: {}",
            report.source,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    log::info!(
        "Ingestion finished in {}s: {} new, {} duplicates. Next run at {}",
        (Utc::now() - start_time).num_seconds(),
        inserted,
        duplicates,
        ingestor.next_run_time().to_rfc3339()
    );

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::FeedSource;
    use crate::storage::{ArticleFilter, MemoryRepository};

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title><link>https://a.cz</link><description>d</description>
  <item><title>Jedna</title><link>https://a.cz/1</link><description>první</description></item>
  <item><title>Dva</title><link>https://a.cz/2</link><description>druhá</description></item>
</channel></rss>"#;

    fn config(feeds: Vec<FeedSource>) -> Config {
        Config {
            feeds,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_run_ingest_single_source() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/a")
            .with_status(200)
            .with_body(RSS)
            .create_async()
            .await;
        let untouched = server.mock("GET", "/b").expect(0).create_async().await;

        let repo = Arc::new(MemoryRepository::new());
        let config = config(vec![
            FeedSource::new("a.cz", format!("{}/a", server.url())),
            FeedSource::new("b.cz", format!("{}/b", server.url())),
        ]);

        let reports = run_ingest(&config, repo.clone(), Some("a.cz")).await.unwrap();
        untouched.assert_async().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].inserted, 2);
        assert_eq!(repo.count(ArticleFilter::Source("a.cz".into())).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_run_ingest_unknown_source() {
        let repo = Arc::new(MemoryRepository::new());
        let config = config(vec![FeedSource::new("a.cz", "http://127.0.0.1:9/a")]);

        let err = run_ingest(&config, repo, Some("x.cz")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidSource { .. }));
    }
}

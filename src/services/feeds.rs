// src/services/feeds.rs

//! RSS/Atom feed ingestion.
//!
//! Polls the configured feeds, normalizes every entry, and inserts new
//! articles keyed by a SHA-256 fingerprint of their raw text so the same
//! story is stored once no matter how often it is polled.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{
    Config, FeedItem, FeedRunReport, FeedSource, IngestionStatus, NewArticle, ScrapeJob,
    SourceState, SourceStatus,
};
use crate::storage::{ArticleRepository, InsertOutcome};
use crate::utils::http::create_feed_client;
use crate::utils::{fingerprint, first_image_src, next_top_of_hour, parse_feed_date, strip_html};

/// Service polling syndication feeds into the article repository.
pub struct FeedIngestor {
    client: Client,
    feeds: Vec<FeedSource>,
    repository: Arc<dyn ArticleRepository>,
    states: RwLock<HashMap<String, SourceStatus>>,
    last_run_time: RwLock<Option<DateTime<Utc>>>,
    job_counter: AtomicU64,
}

impl FeedIngestor {
    /// Create an ingestor for the feeds in `config`.
    pub fn new(config: &Config, repository: Arc<dyn ArticleRepository>) -> Result<Self> {
        let client = create_feed_client(&config.scraper)?;
        Ok(Self::with_client(client, config.feeds.clone(), repository))
    }

    pub fn with_client(
        client: Client,
        feeds: Vec<FeedSource>,
        repository: Arc<dyn ArticleRepository>,
    ) -> Self {
        Self {
            client,
            feeds,
            repository,
            states: RwLock::new(HashMap::new()),
            last_run_time: RwLock::new(None),
            job_counter: AtomicU64::new(0),
        }
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    /// Poll one feed and insert its new items.
    ///
    /// Never fails: fetch and parse errors are logged and reported in the
    /// returned [`FeedRunReport`].
    pub async fn scrape_source(&self, name: &str, feed_url: &str) -> FeedRunReport {
        *self.last_run_time.write().await = Some(Utc::now());
        self.set_state(name, SourceState::Fetching, None).await;

        let items = match self.fetch_items(name, feed_url).await {
            Ok(items) => items,
            Err(e) => {
                log::warn!("Feed {} ({}) failed: {}", name, feed_url, e);
                let report = FeedRunReport::failed(name, e.to_string());
                self.set_state(name, SourceState::FetchFailed, None).await;
                self.set_state(name, SourceState::Idle, Some(report.clone()))
                    .await;
                return report;
            }
        };
        self.set_state(name, SourceState::Parsed, None).await;

        let mut report = FeedRunReport::new(name);
        report.items = items.len();

        for item in items {
            let Some(article) = build_article(name, item) else {
                report.skipped += 1;
                continue;
            };
            match self.repository.insert(article).await {
                Ok(InsertOutcome::Inserted(_)) => report.inserted += 1,
                Ok(InsertOutcome::Duplicate(_)) => report.duplicates += 1,
                Err(e) => {
                    log::error!("Failed to store item from {}: {}", name, e);
                    report.error = Some(e.to_string());
                }
            }
        }

        log::info!(
            "Feed {}: {} items, {} new, {} duplicates, {} skipped",
            name,
            report.items,
            report.inserted,
            report.duplicates,
            report.skipped
        );
        self.set_state(name, SourceState::Idle, Some(report.clone()))
            .await;
        report
    }

    /// Poll one configured source by name and wait for it.
    pub async fn scrape_by_name(&self, name: &str) -> Result<FeedRunReport> {
        let feed = self.find_feed(name)?;
        Ok(self.scrape_source(&feed.name, &feed.url).await)
    }

    /// Poll every configured feed concurrently.
    pub async fn scrape_all(&self) -> Vec<FeedRunReport> {
        let runs = self
            .feeds
            .iter()
            .map(|feed| self.scrape_source(&feed.name, &feed.url));
        let reports = join_all(runs).await;

        let inserted: usize = reports.iter().map(|r| r.inserted).sum();
        let failed = reports.iter().filter(|r| !r.is_ok()).count();
        log::info!(
            "Scraped {} feeds: {} new articles, {} failed sources",
            reports.len(),
            inserted,
            failed
        );
        reports
    }

    /// Schedule a background poll of one source, or of all sources.
    ///
    /// Rejects unknown source names before anything is scheduled.
    pub fn scrape_immediately(self: &Arc<Self>, source: Option<&str>) -> Result<ScrapeJob> {
        let target = match source {
            Some(name) => Some(self.find_feed(name)?.clone()),
            None => None,
        };

        let scheduled_at = Utc::now();
        let job = ScrapeJob {
            id: format!(
                "scrape-{}-{}",
                scheduled_at.timestamp_millis(),
                self.job_counter.fetch_add(1, Ordering::Relaxed) + 1
            ),
            status: "scheduled".to_string(),
            source: target.as_ref().map(|feed| feed.name.clone()),
            scheduled_at,
        };

        log::info!(
            "Scheduled scrape job {} for {}",
            job.id,
            job.source.as_deref().unwrap_or("all sources")
        );
        let ingestor = Arc::clone(self);
        let job_id = job.id.clone();
        tokio::spawn(async move {
            match target {
                Some(feed) => {
                    ingestor.scrape_source(&feed.name, &feed.url).await;
                }
                None => {
                    ingestor.scrape_all().await;
                }
            }
            log::info!("Scrape job {} finished", job_id);
        });

        Ok(job)
    }

    pub async fn last_run_time(&self) -> Option<DateTime<Utc>> {
        *self.last_run_time.read().await
    }

    /// Next hourly poll.
    pub fn next_run_time(&self) -> DateTime<Utc> {
        next_top_of_hour(Utc::now())
    }

    /// Snapshot of run times and per-source state.
    pub async fn status(&self) -> IngestionStatus {
        let states = self.states.read().await;
        let sources: BTreeMap<String, SourceStatus> = self
            .feeds
            .iter()
            .map(|feed| {
                let status = states.get(&feed.name).cloned().unwrap_or_default();
                (feed.name.clone(), status)
            })
            .collect();

        IngestionStatus {
            last_run_time: self.last_run_time().await,
            next_run_time: self.next_run_time(),
            sources,
        }
    }

    fn find_feed(&self, name: &str) -> Result<&FeedSource> {
        self.feeds
            .iter()
            .find(|feed| feed.name == name)
            .ok_or_else(|| {
                AppError::invalid_source(name, self.feeds.iter().map(|feed| feed.name.clone()))
            })
    }

    async fn fetch_items(&self, name: &str, feed_url: &str) -> Result<Vec<FeedItem>> {
        let response = self
            .client
            .get(feed_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::feed_fetch(name, e))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::feed_fetch(name, e))?;
        parse_feed(name, &body)
    }

    async fn set_state(&self, name: &str, state: SourceState, report: Option<FeedRunReport>) {
        let mut states = self.states.write().await;
        let entry = states.entry(name.to_string()).or_default();
        entry.state = state;
        if report.is_some() {
            entry.last_report = report;
        }
    }
}

/// Parse an RSS 2.0 document, falling back to Atom.
pub fn parse_feed(name: &str, body: &[u8]) -> Result<Vec<FeedItem>> {
    match rss::Channel::read_from(body) {
        Ok(channel) => Ok(channel.items().iter().map(rss_item).collect()),
        Err(rss_error) => match atom_syndication::Feed::read_from(body) {
            Ok(feed) => Ok(feed.entries().iter().map(atom_entry).collect()),
            Err(atom_error) => Err(AppError::feed_parse(
                name,
                format!("not RSS ({rss_error}) or Atom ({atom_error})"),
            )),
        },
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Body text kept byte-for-byte so the fingerprint covers the raw feed value.
fn raw_body(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(String::from)
}

fn rss_item(item: &rss::Item) -> FeedItem {
    let media_url = item
        .extensions()
        .get("media")
        .and_then(|media| media.get("content"))
        .and_then(|contents| {
            contents
                .iter()
                .find_map(|content| content.attrs().get("url").cloned())
        });
    let creator = item
        .dublin_core_ext()
        .and_then(|dc| dc.creators().first().map(String::as_str))
        .and_then(|c| non_empty(Some(c)));

    FeedItem {
        title: non_empty(item.title()),
        link: non_empty(item.link()),
        content: raw_body(item.content()),
        summary: None,
        description: raw_body(item.description()),
        creator,
        author: non_empty(item.author()),
        pub_date: non_empty(item.pub_date()),
        media_url,
        enclosure_url: item.enclosure().map(|e| e.url().to_string()),
        enclosure_type: item.enclosure().map(|e| e.mime_type().to_string()),
    }
}

fn atom_entry(entry: &atom_syndication::Entry) -> FeedItem {
    let link = entry
        .links()
        .iter()
        .find(|link| link.rel() == "alternate")
        .or_else(|| entry.links().first())
        .map(|link| link.href().to_string());
    let published = entry
        .published()
        .map(|date| date.to_rfc3339())
        .unwrap_or_else(|| entry.updated().to_rfc3339());

    FeedItem {
        title: non_empty(Some(entry.title().as_str())),
        link,
        content: raw_body(entry.content().and_then(|c| c.value())),
        summary: raw_body(entry.summary().map(|s| s.as_str())),
        description: None,
        creator: None,
        author: non_empty(entry.authors().first().map(|p| p.name())),
        pub_date: Some(published),
        media_url: None,
        enclosure_url: None,
        enclosure_type: None,
    }
}

/// Turn a feed item into an insert payload.
///
/// Returns `None` for items with neither title nor link.
pub fn build_article(source: &str, item: FeedItem) -> Option<NewArticle> {
    if item.title.is_none() && item.link.is_none() {
        return None;
    }

    let body = [&item.content, &item.summary, &item.description]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .find(|text| !text.is_empty())
        .unwrap_or("");

    let description = Some(strip_html(body)).filter(|d| !d.is_empty());

    let published_at = item.pub_date.as_deref().and_then(|raw| {
        let parsed = parse_feed_date(raw);
        if parsed.is_none() {
            log::debug!("Unparseable date '{}' from {}", raw, source);
        }
        parsed
    });

    let image_url = item
        .media_url
        .clone()
        .or_else(|| {
            item.enclosure_url.clone().filter(|_| {
                item.enclosure_type
                    .as_deref()
                    .is_some_and(|mime| mime.starts_with("image/"))
            })
        })
        .or_else(|| first_image_src(body));

    Some(NewArticle {
        content_fingerprint: fingerprint(body),
        title: item.title.unwrap_or_default(),
        url: item.link.unwrap_or_default(),
        source: source.to_string(),
        description,
        author: item.creator.or(item.author),
        published_at,
        image_url,
    })
}

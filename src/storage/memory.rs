//! In-process article table.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{ArticleId, ArticleRecord, ContentUpdate, NewArticle, ScrapingStatus};
use crate::storage::{ArticleFilter, ArticleRepository, InsertOutcome};

/// Article rows indexed by id and fingerprint.
#[derive(Debug, Default)]
pub(crate) struct ArticleTable {
    rows: BTreeMap<ArticleId, ArticleRecord>,
    by_fingerprint: HashMap<String, ArticleId>,
    last_id: ArticleId,
}

impl ArticleTable {
    /// Rebuild a table from persisted rows.
    pub(crate) fn from_rows(rows: Vec<ArticleRecord>) -> Self {
        let mut table = Self::default();
        for row in rows {
            table.last_id = table.last_id.max(row.id);
            table
                .by_fingerprint
                .entry(row.content_fingerprint.clone())
                .or_insert(row.id);
            table.rows.insert(row.id, row);
        }
        table
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = &ArticleRecord> {
        self.rows.values()
    }

    pub(crate) fn find_by_fingerprint(&self, fingerprint: &str) -> Option<ArticleRecord> {
        self.by_fingerprint
            .get(fingerprint)
            .and_then(|id| self.rows.get(id))
            .cloned()
    }

    pub(crate) fn insert(&mut self, article: NewArticle) -> InsertOutcome {
        if let Some(&existing) = self.by_fingerprint.get(&article.content_fingerprint) {
            return InsertOutcome::Duplicate(existing);
        }

        self.last_id += 1;
        let id = self.last_id;
        self.by_fingerprint
            .insert(article.content_fingerprint.clone(), id);
        self.rows
            .insert(id, ArticleRecord::from_new(id, article, Utc::now()));
        InsertOutcome::Inserted(id)
    }

    pub(crate) fn find_missing_content(
        &self,
        limit: usize,
        before: Option<ArticleId>,
    ) -> Vec<ArticleRecord> {
        let upper = before.unwrap_or(ArticleId::MAX);
        self.rows
            .range(..upper)
            .rev()
            .map(|(_, row)| row)
            .filter(|row| row.content.is_none())
            .take(limit)
            .cloned()
            .collect()
    }

    pub(crate) fn find_recent(&self, limit: usize, filter: &ArticleFilter) -> Vec<ArticleRecord> {
        self.rows
            .values()
            .rev()
            .filter(|row| filter.matches(row))
            .take(limit)
            .cloned()
            .collect()
    }

    pub(crate) fn update_content(&mut self, id: ArticleId, update: ContentUpdate) -> Result<()> {
        let row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::storage(format!("Article {id} not found")))?;
        row.apply(update);
        Ok(())
    }

    pub(crate) fn get(&self, id: ArticleId) -> Option<ArticleRecord> {
        self.rows.get(&id).cloned()
    }

    pub(crate) fn count(&self, filter: &ArticleFilter) -> usize {
        self.rows.values().filter(|row| filter.matches(row)).count()
    }

    pub(crate) fn count_grouped_by_status(&self) -> BTreeMap<ScrapingStatus, usize> {
        let mut counts = BTreeMap::new();
        for status in self
            .rows
            .values()
            .filter_map(|row| row.content_scraping_status)
        {
            *counts.entry(status).or_insert(0) += 1;
        }
        counts
    }

    pub(crate) fn count_grouped_by_source(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for row in self.rows.values() {
            *counts.entry(row.source.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Repository kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    table: RwLock<ArticleTable>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record, oldest first.
    pub async fn all(&self) -> Vec<ArticleRecord> {
        self.table.read().await.rows().cloned().collect()
    }
}

#[async_trait]
impl ArticleRepository for MemoryRepository {
    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ArticleRecord>> {
        Ok(self.table.read().await.find_by_fingerprint(fingerprint))
    }

    async fn insert(&self, article: NewArticle) -> Result<InsertOutcome> {
        Ok(self.table.write().await.insert(article))
    }

    async fn find_missing_content(
        &self,
        limit: usize,
        before: Option<ArticleId>,
    ) -> Result<Vec<ArticleRecord>> {
        Ok(self.table.read().await.find_missing_content(limit, before))
    }

    async fn find_recent(&self, limit: usize, filter: ArticleFilter) -> Result<Vec<ArticleRecord>> {
        Ok(self.table.read().await.find_recent(limit, &filter))
    }

    async fn update_content(&self, id: ArticleId, update: ContentUpdate) -> Result<()> {
        self.table.write().await.update_content(id, update)
    }

    async fn get(&self, id: ArticleId) -> Result<Option<ArticleRecord>> {
        Ok(self.table.read().await.get(id))
    }

    async fn count(&self, filter: ArticleFilter) -> Result<usize> {
        Ok(self.table.read().await.count(&filter))
    }

    async fn count_grouped_by_status(&self) -> Result<BTreeMap<ScrapingStatus, usize>> {
        Ok(self.table.read().await.count_grouped_by_status())
    }

    async fn count_grouped_by_source(&self) -> Result<BTreeMap<String, usize>> {
        Ok(self.table.read().await.count_grouped_by_source())
    }
}

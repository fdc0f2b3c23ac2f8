//! Local filesystem storage implementation.
//!
//! Keeps the whole article table in memory and persists it as one JSON
//! snapshot after every write. Intended for development and single-host runs.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── articles.json         # Article records, oldest first
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{AppError, Result};
use crate::models::{ArticleId, ArticleRecord, ContentUpdate, NewArticle, ScrapingStatus};
use crate::storage::memory::ArticleTable;
use crate::storage::{ArticleFilter, ArticleRepository, InsertOutcome};

const ARTICLES_KEY: &str = "articles.json";

/// Local filesystem storage backend.
pub struct LocalRepository {
    root_dir: PathBuf,
    table: Mutex<Option<ArticleTable>>,
}

impl LocalRepository {
    /// Create a new LocalRepository rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            table: Mutex::new(None),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Lock the table, loading the snapshot on first use.
    async fn table(&self) -> Result<MutexGuard<'_, Option<ArticleTable>>> {
        let mut guard = self.table.lock().await;
        if guard.is_none() {
            let rows: Vec<ArticleRecord> = match self.read_json(ARTICLES_KEY).await? {
                Some(rows) => rows,
                None => {
                    log::warn!(
                        "No {} found in {}, starting empty",
                        ARTICLES_KEY,
                        self.root_dir.display()
                    );
                    Vec::new()
                }
            };
            log::debug!("Loaded {} articles from local storage", rows.len());
            *guard = Some(ArticleTable::from_rows(rows));
        }
        Ok(guard)
    }

    /// Persist the current table.
    async fn persist(&self, table: &ArticleTable) -> Result<()> {
        let rows: Vec<&ArticleRecord> = table.rows().collect();
        self.write_json(ARTICLES_KEY, &rows).await
    }
}

/// Borrow the loaded table out of a guard.
fn loaded(guard: &mut Option<ArticleTable>) -> Result<&mut ArticleTable> {
    guard
        .as_mut()
        .ok_or_else(|| AppError::storage("article table not loaded"))
}

#[async_trait]
impl ArticleRepository for LocalRepository {
    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ArticleRecord>> {
        let mut guard = self.table().await?;
        Ok(loaded(&mut guard)?.find_by_fingerprint(fingerprint))
    }

    async fn insert(&self, article: NewArticle) -> Result<InsertOutcome> {
        let mut guard = self.table().await?;
        let table = loaded(&mut guard)?;
        let outcome = table.insert(article);
        if outcome.is_inserted() {
            self.persist(table).await?;
        }
        Ok(outcome)
    }

    async fn find_missing_content(
        &self,
        limit: usize,
        before: Option<ArticleId>,
    ) -> Result<Vec<ArticleRecord>> {
        let mut guard = self.table().await?;
        Ok(loaded(&mut guard)?.find_missing_content(limit, before))
    }

    async fn find_recent(&self, limit: usize, filter: ArticleFilter) -> Result<Vec<ArticleRecord>> {
        let mut guard = self.table().await?;
        Ok(loaded(&mut guard)?.find_recent(limit, &filter))
    }

    async fn update_content(&self, id: ArticleId, update: ContentUpdate) -> Result<()> {
        let mut guard = self.table().await?;
        let table = loaded(&mut guard)?;
        table.update_content(id, update)?;
        self.persist(table).await
    }

    async fn get(&self, id: ArticleId) -> Result<Option<ArticleRecord>> {
        let mut guard = self.table().await?;
        Ok(loaded(&mut guard)?.get(id))
    }

    async fn count(&self, filter: ArticleFilter) -> Result<usize> {
        let mut guard = self.table().await?;
        Ok(loaded(&mut guard)?.count(&filter))
    }

    async fn count_grouped_by_status(&self) -> Result<BTreeMap<ScrapingStatus, usize>> {
        let mut guard = self.table().await?;
        Ok(loaded(&mut guard)?.count_grouped_by_status())
    }

    async fn count_grouped_by_source(&self) -> Result<BTreeMap<String, usize>> {
        let mut guard = self.table().await?;
        Ok(loaded(&mut guard)?.count_grouped_by_source())
    }
}

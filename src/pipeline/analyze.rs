// src/pipeline/analyze.rs

//! NLP analysis of stored articles.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::services::{NlpArticle, NlpClient};
use crate::storage::{ArticleFilter, ArticleRepository};

/// Analysis endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum AnalysisKind {
    Sentiment,
    Topics,
    Semantic,
    Batch,
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisKind::Sentiment => "sentiment",
            AnalysisKind::Topics => "topics",
            AnalysisKind::Semantic => "semantic",
            AnalysisKind::Batch => "batch",
        })
    }
}

/// Which articles to send and the per-endpoint options.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,
    pub limit: usize,
    pub source: Option<String>,
    /// Semantic search query
    pub query: Option<String>,
    pub num_topics: Option<usize>,
}

impl AnalysisRequest {
    pub fn new(kind: AnalysisKind, limit: usize) -> Self {
        Self {
            kind,
            limit,
            source: None,
            query: None,
            num_topics: None,
        }
    }
}

/// Send the newest stored articles to the NLP service.
pub async fn run_analysis(
    config: &Config,
    repository: Arc<dyn ArticleRepository>,
    request: &AnalysisRequest,
) -> Result<Value> {
    let client = NlpClient::new(&config.nlp)?;
    analyze_with(&client, repository, request).await
}

async fn analyze_with(
    client: &NlpClient,
    repository: Arc<dyn ArticleRepository>,
    request: &AnalysisRequest,
) -> Result<Value> {
    let filter = match &request.source {
        Some(source) => ArticleFilter::Source(source.clone()),
        None => ArticleFilter::All,
    };
    let records = repository.find_recent(request.limit, filter).await?;
    if records.is_empty() {
        return Err(AppError::nlp("no stored articles to analyze"));
    }

    let articles: Vec<NlpArticle> = records.iter().map(NlpArticle::from).collect();
    log::info!(
        "Running {} analysis on {} articles",
        request.kind,
        articles.len()
    );

    let value = match request.kind {
        AnalysisKind::Sentiment => serde_json::to_value(client.sentiment(&articles).await?)?,
        AnalysisKind::Topics => {
            serde_json::to_value(client.topics(&articles, request.num_topics).await?)?
        }
        AnalysisKind::Semantic => serde_json::to_value(
            client
                .semantic(&articles, request.query.as_deref())
                .await?,
        )?,
        AnalysisKind::Batch => client.batch_analysis(&articles).await?,
    };
    Ok(value)
}

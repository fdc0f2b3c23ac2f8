// src/services/nlp.rs

//! Client for the Czech NLP microservice.
//!
//! Sends stored articles for sentiment, topic and semantic analysis. Result
//! dictionaries are returned as raw JSON values.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{ArticleId, ArticleRecord, NlpConfig};

/// Default topic count for [`NlpClient::topics`].
pub const DEFAULT_NUM_TOPICS: usize = 10;

/// Article payload accepted by every analysis endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NlpArticle {
    pub id: ArticleId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<&ArticleRecord> for NlpArticle {
    fn from(article: &ArticleRecord) -> Self {
        Self {
            id: article.id,
            title: article.title.clone(),
            description: article.description.clone(),
            content: article.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NlpHealth {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResponse {
    pub sentiments: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicResponse {
    pub topics: Vec<Value>,
    pub article_topics: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticResponse {
    pub embeddings: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarities: Option<Vec<f64>>,
}

#[derive(Serialize)]
struct ArticlesRequest<'a> {
    articles: &'a [NlpArticle],
}

#[derive(Serialize)]
struct TopicRequest<'a> {
    articles: &'a [NlpArticle],
    num_topics: usize,
}

#[derive(Serialize)]
struct SemanticRequest<'a> {
    articles: &'a [NlpArticle],
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
}

/// HTTP client for the NLP service.
pub struct NlpClient {
    client: Client,
    base_url: String,
}

impl NlpClient {
    pub fn new(config: &NlpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> Result<NlpHealth> {
        let response = self.client.get(self.endpoint("/health")).send().await?;
        Self::decode("/health", response).await
    }

    pub async fn sentiment(&self, articles: &[NlpArticle]) -> Result<SentimentResponse> {
        self.post("/sentiment", &ArticlesRequest { articles }).await
    }

    /// Topic modeling; `num_topics` defaults to [`DEFAULT_NUM_TOPICS`].
    pub async fn topics(
        &self,
        articles: &[NlpArticle],
        num_topics: Option<usize>,
    ) -> Result<TopicResponse> {
        let request = TopicRequest {
            articles,
            num_topics: num_topics.unwrap_or(DEFAULT_NUM_TOPICS),
        };
        self.post("/topics", &request).await
    }

    pub async fn semantic(
        &self,
        articles: &[NlpArticle],
        query: Option<&str>,
    ) -> Result<SemanticResponse> {
        self.post("/semantic", &SemanticRequest { articles, query })
            .await
    }

    /// All analyses in one call. The request body is a bare array.
    pub async fn batch_analysis(&self, articles: &[NlpArticle]) -> Result<Value> {
        self.post("/batch-analysis", articles).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        log::debug!("POST {}{}", self.base_url, path);
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;
        Self::decode(path, response).await
    }

    async fn decode<R: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<R> {
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::nlp(format!(
                "{} returned HTTP {}: {}",
                path,
                status.as_u16(),
                detail
            )));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn articles() -> Vec<NlpArticle> {
        vec![
            NlpArticle {
                id: 1,
                title: "Inflace klesla".to_string(),
                description: Some("ČNB hlásí pokles".to_string()),
                content: None,
            },
            NlpArticle {
                id: 2,
                title: "Nový stadion".to_string(),
                description: None,
                content: Some("Praha postaví stadion.".to_string()),
            },
        ]
    }

    #[test]
    fn test_article_serialization_skips_none() {
        let value = serde_json::to_value(&articles()[0]).unwrap();
        assert_eq!(
            value,
            json!({"id": 1, "title": "Inflace klesla", "description": "ČNB hlásí pokles"})
        );
    }

    #[tokio::test]
    async fn test_health() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status":"healthy","service":"czech-nlp"}"#)
            .create_async()
            .await;

        let client = NlpClient::with_client(Client::new(), &format!("{}/", server.url()));
        let health = client.health().await.unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "czech-nlp");
    }

    #[tokio::test]
    async fn test_topics_default_count() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/topics")
            .match_body(Matcher::PartialJson(json!({"num_topics": 10})))
            .with_status(200)
            .with_body(r#"{"topics":[{"id":0,"words":["inflace"]}],"article_topics":[]}"#)
            .create_async()
            .await;

        let client = NlpClient::with_client(Client::new(), &server.url());
        let response = client.topics(&articles(), None).await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.topics.len(), 1);
        assert!(response.article_topics.is_empty());
    }

    #[tokio::test]
    async fn test_semantic_without_query() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/semantic")
            .with_status(200)
            .with_body(r#"{"embeddings":[{"id":1},{"id":2}]}"#)
            .create_async()
            .await;

        let client = NlpClient::with_client(Client::new(), &server.url());
        let response = client.semantic(&articles(), None).await.unwrap();
        assert_eq!(response.embeddings.len(), 2);
        assert!(response.similarities.is_none());
    }

    #[tokio::test]
    async fn test_batch_analysis_sends_bare_array() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/batch-analysis")
            .match_body(Matcher::Json(json!([
                {"id": 1, "title": "Inflace klesla", "description": "ČNB hlásí pokles"},
                {"id": 2, "title": "Nový stadion", "content": "Praha postaví stadion."}
            ])))
            .with_status(200)
            .with_body(r#"{"sentiments":[],"topics":[]}"#)
            .create_async()
            .await;

        let client = NlpClient::with_client(Client::new(), &server.url());
        let value = client.batch_analysis(&articles()).await.unwrap();
        mock.assert_async().await;
        assert!(value.get("topics").is_some());
    }

    #[tokio::test]
    async fn test_non_success_is_nlp_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/sentiment")
            .with_status(500)
            .with_body(r#"{"detail":"model not loaded"}"#)
            .create_async()
            .await;

        let client = NlpClient::with_client(Client::new(), &server.url());
        let err = client.sentiment(&articles()).await.unwrap_err();
        assert!(matches!(err, AppError::Nlp(_)));
        assert!(err.to_string().contains("model not loaded"));
    }
}

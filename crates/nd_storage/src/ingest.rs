use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use nd_core::{Article, Error, Ingestor, Result};
use serde::Deserialize;

/// One entry of a pre-parsed feed.
#[derive(Debug, Deserialize)]
struct FeedRecord {
    title: String,
    #[serde(default)]
    content: String,
    publication_date: DateTime<FixedOffset>,
    #[serde(default)]
    url: Option<String>,
    /// Vectors computed upstream may be shipped with the feed.
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

impl From<FeedRecord> for Article {
    fn from(record: FeedRecord) -> Self {
        let mut article = Article::new(record.title.trim(), record.content, record.publication_date, record.url);
        article.embedding = record.embedding;
        article
    }
}

/// Parse a JSON array of feed records into articles, in order.
pub fn parse_feed(json: &str) -> Result<Vec<Article>> {
    let records: Vec<FeedRecord> = serde_json::from_str(json)?;
    Ok(records.into_iter().map(Article::from).collect())
}

/// Reads a JSON feed file produced by an upstream feed parser.
#[derive(Debug, Default, Clone)]
pub struct JsonFeedIngestor;

impl JsonFeedIngestor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Ingestor for JsonFeedIngestor {
    async fn ingest(&self, source: &str) -> Result<Vec<Article>> {
        tracing::info!("📰 Reading feed: {}", source);
        let json = tokio::fs::read_to_string(source)
            .await
            .map_err(|e| Error::Ingestion(format!("Failed to read {}: {}", source, e)))?;
        let articles = parse_feed(&json)?;
        tracing::info!("✨ Ingested {} articles from {}", articles.len(), source);
        Ok(articles)
    }
}

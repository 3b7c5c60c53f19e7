//! Narrow interfaces to the collaborators this workspace does not own:
//! feed ingestion, the embedding model, 2-D projection and full-text fetching.

use async_trait::async_trait;

use crate::types::Article;
use crate::Result;

#[async_trait]
pub trait Ingestor: Send + Sync {
    /// Parse a feed into articles, in feed order. Embeddings, filters and
    /// selection are left at their defaults.
    async fn ingest(&self, source: &str) -> Result<Vec<Article>>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[async_trait]
pub trait Projector: Send + Sync {
    /// Reduce vectors to 2-D points for plotting, same order and count.
    async fn project_2d(&self, vectors: &[Vec<f32>], perplexity: f32) -> Result<Vec<(f32, f32)>>;
}

#[async_trait]
pub trait FullTextFetcher: Send + Sync {
    /// May be slow or fail; callers decide how failures surface.
    async fn fetch_full_text(&self, url: &str, title: &str) -> Result<String>;
}

//! Embedding computation and 2-D projection for stored articles.

use std::sync::Arc;

use async_trait::async_trait;
use nd_core::{Embedder, Error, Projector, Result};
use nd_storage::ArticleStore;

/// Default t-SNE perplexity for small article sets.
pub const DEFAULT_PERPLEXITY: f32 = 3.0;

/// Offline embedder: text length plus character frequencies.
///
/// Deterministic, so it is usable for demos and tests, but it carries no
/// semantics beyond spelling.
#[derive(Debug, Clone)]
pub struct DummyEmbedder {
    dimensions: usize,
}

impl Default for DummyEmbedder {
    fn default() -> Self {
        Self::new(768)
    }
}

impl DummyEmbedder {
    /// One length slot plus at least one character bucket.
    pub const MIN_DIMENSIONS: usize = 2;

    /// Widths below [`Self::MIN_DIMENSIONS`] are raised to it.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(Self::MIN_DIMENSIONS),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        let char_count = text.chars().count();
        if char_count == 0 {
            return embedding;
        }

        embedding[0] = text.len() as f32 / 1000.0;
        for c in text.to_lowercase().chars() {
            let bucket = 1 + (c as usize) % (self.dimensions - 1);
            embedding[bucket] += 1.0;
        }
        for value in embedding.iter_mut().skip(1) {
            *value /= char_count as f32;
        }
        embedding
    }
}

#[async_trait]
impl Embedder for DummyEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// Embeds articles that lack a vector and refreshes their 2-D projection.
pub struct EmbeddingPipeline {
    embedder: Arc<dyn Embedder>,
    projector: Option<Arc<dyn Projector>>,
}

impl EmbeddingPipeline {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            projector: None,
        }
    }

    pub fn with_projector(mut self, projector: Arc<dyn Projector>) -> Self {
        self.projector = Some(projector);
        self
    }

    /// Returns how many articles received a new embedding. Existing vectors
    /// are kept.
    pub async fn compute_and_assign(&self, store: &ArticleStore, perplexity: f32) -> Result<usize> {
        let articles = store.snapshot().await;
        let missing: Vec<_> = articles.iter().filter(|a| a.embedding.is_none()).collect();

        if !missing.is_empty() {
            tracing::info!("🧮 Embedding {} articles", missing.len());
            let texts: Vec<String> = missing.iter().map(|a| a.embedding_text()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != missing.len() {
                return Err(Error::Embedding(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    missing.len()
                )));
            }
            for (article, vector) in missing.iter().zip(vectors) {
                store.set_embedding(&article.id, vector).await;
            }
        }

        if let Some(projector) = &self.projector {
            self.project(projector.as_ref(), store, perplexity).await?;
        }

        Ok(missing.len())
    }

    async fn project(&self, projector: &dyn Projector, store: &ArticleStore, perplexity: f32) -> Result<()> {
        let articles = store.snapshot().await;
        let (ids, vectors): (Vec<_>, Vec<_>) = articles
            .into_iter()
            .filter_map(|a| a.embedding.map(|e| (a.id, e)))
            .unzip();
        if vectors.is_empty() {
            return Ok(());
        }

        let points = projector.project_2d(&vectors, perplexity).await?;
        if points.len() != vectors.len() {
            return Err(Error::Embedding(format!(
                "projector returned {} points for {} vectors",
                points.len(),
                vectors.len()
            )));
        }
        for (id, point) in ids.iter().zip(points) {
            store.set_projection(id, point).await;
        }
        tracing::debug!("Projected {} articles to 2-D", ids.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nd_core::Article;

    #[derive(Debug)]
    struct FirstTwo;

    #[async_trait]
    impl Projector for FirstTwo {
        async fn project_2d(&self, vectors: &[Vec<f32>], _perplexity: f32) -> Result<Vec<(f32, f32)>> {
            Ok(vectors.iter().map(|v| (v[0], v[1])).collect())
        }
    }

    struct Broken;

    #[async_trait]
    impl Embedder for Broken {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]])
        }
    }

    #[test]
    fn test_dummy_width_has_a_floor() {
        assert_eq!(DummyEmbedder::new(1).dimensions(), DummyEmbedder::MIN_DIMENSIONS);
        assert_eq!(DummyEmbedder::new(1).embed_one("abc").len(), 2);
        assert_eq!(DummyEmbedder::new(16).dimensions(), 16);
    }

    #[test]
    fn test_dummy_embedding_is_deterministic() {
        let embedder = DummyEmbedder::new(64);
        let a = embedder.embed_one("Vaccine approved");
        assert_eq!(a, embedder.embed_one("Vaccine approved"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, embedder.embed_one("Election results"));
        assert!(embedder.embed_one("").iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_pipeline_fills_missing_embeddings_and_projects() {
        let keep = Article::new("kept", "x", Utc::now(), None).with_embedding(vec![9.0; 8]);
        let store = ArticleStore::from_articles(vec![keep, Article::new("new", "story", Utc::now(), None)]).await;

        let pipeline = EmbeddingPipeline::new(Arc::new(DummyEmbedder::new(8))).with_projector(Arc::new(FirstTwo));
        assert_eq!(pipeline.compute_and_assign(&store, DEFAULT_PERPLEXITY).await.unwrap(), 1);

        let articles = store.snapshot().await;
        assert_eq!(articles[0].embedding, Some(vec![9.0; 8]));
        assert_eq!(articles[0].projection_2d, Some((9.0, 9.0)));
        assert_eq!(articles[1].embedding.as_ref().map(Vec::len), Some(8));
        assert!(articles[1].projection_2d.is_some());

        assert_eq!(pipeline.compute_and_assign(&store, DEFAULT_PERPLEXITY).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_an_error() {
        let store = ArticleStore::from_articles(vec![
            Article::new("a", "", Utc::now(), None),
            Article::new("b", "", Utc::now(), None),
        ])
        .await;
        let pipeline = EmbeddingPipeline::new(Arc::new(Broken));
        assert!(matches!(
            pipeline.compute_and_assign(&store, DEFAULT_PERPLEXITY).await,
            Err(Error::Embedding(_))
        ));
    }
}

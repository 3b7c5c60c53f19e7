use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use nd_core::{Article, FilterResult, FullTextFetcher};
use serde::Serialize;

use crate::memory::ArticleStore;

/// Field set handed to the export formatters for one selected article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub title: String,
    pub content: String,
    pub publication_date: DateTime<FixedOffset>,
    pub url: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub projection_2d: Option<(f32, f32)>,
    pub filters: HashMap<String, FilterResult>,
    pub full_text: Option<String>,
}

impl From<Article> for ExportRecord {
    fn from(article: Article) -> Self {
        Self {
            title: article.title,
            content: article.content,
            publication_date: article.publication_date,
            url: article.url,
            embedding: article.embedding,
            projection_2d: article.projection_2d,
            filters: article.filters,
            full_text: article.full_text,
        }
    }
}

/// Records for the selected articles, in store order.
///
/// With a fetcher, selected articles that have a url but no full text get
/// one fetched and cached first. Fetch failures are logged and leave
/// `full_text` empty.
pub async fn collect_export(store: &ArticleStore, fetcher: Option<&dyn FullTextFetcher>) -> Vec<ExportRecord> {
    if let Some(fetcher) = fetcher {
        for article in store.selected().await {
            if article.full_text.is_some() {
                continue;
            }
            let Some(url) = article.url.as_deref() else {
                continue;
            };
            match fetcher.fetch_full_text(url, &article.title).await {
                Ok(text) => {
                    store.set_full_text(&article.id, text).await;
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to fetch full text for {}: {}", url, e);
                }
            }
        }
    }

    store
        .selected()
        .await
        .into_iter()
        .map(ExportRecord::from)
        .collect()
}

//! Deterministic filters that write `Boolean` results.

use chrono::NaiveDate;
use nd_core::{Article, FilterResult, DATE_FILTER};

use crate::memory::ArticleStore;

/// Inclusive calendar-date check on the publication day in its own offset;
/// a missing bound is open.
pub fn date_in_range(article: &Article, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    let day = article.publication_date.date_naive();
    start.map_or(true, |start| day >= start) && end.map_or(true, |end| day <= end)
}

/// Case-insensitive substring match against the title.
pub fn title_contains(article: &Article, keyword: &str) -> bool {
    article.title.to_lowercase().contains(&keyword.to_lowercase())
}

/// Write `date_filter` for every stored article. Returns how many passed.
pub async fn apply_date_filter(store: &ArticleStore, start: Option<NaiveDate>, end: Option<NaiveDate>) -> usize {
    let mut passed = 0;
    for handle in store.handles().await {
        let mut article = handle.write().await;
        let keep = date_in_range(&article, start, end);
        article.set_filter(DATE_FILTER, FilterResult::Boolean(keep));
        if keep {
            passed += 1;
        }
    }
    tracing::info!(
        "📅 Date filter {:?}..{:?} kept {}/{} articles",
        start,
        end,
        passed,
        store.len().await
    );
    passed
}

/// Write a filter named after `keyword` for every stored article. Returns
/// how many titles matched.
pub async fn apply_keyword_filter(store: &ArticleStore, keyword: &str) -> usize {
    let mut matched = 0;
    for handle in store.handles().await {
        let mut article = handle.write().await;
        let hit = title_contains(&article, keyword);
        article.set_filter(keyword, FilterResult::Boolean(hit));
        if hit {
            matched += 1;
        }
    }
    tracing::info!("🔎 Keyword filter '{}' matched {} articles", keyword, matched);
    matched
}

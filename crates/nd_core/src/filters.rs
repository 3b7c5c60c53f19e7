//! AND-composition over named filter results.

use std::collections::BTreeSet;

use crate::types::Article;

/// Articles satisfying every filter in `names`, in their original order.
///
/// An article missing any of the names is excluded. With no names the input
/// is returned unchanged.
pub fn compose_and<'a, S: AsRef<str>>(articles: &'a [Article], names: &[S]) -> Vec<&'a Article> {
    articles
        .iter()
        .filter(|article| article.passes_all(names))
        .collect()
}

/// Articles for which the single filter `name` holds.
pub fn articles_matching<'a>(articles: &'a [Article], name: &str) -> Vec<&'a Article> {
    compose_and(articles, &[name])
}

/// Union of filter names across the articles, sorted for display.
pub fn list_filter_names(articles: &[Article]) -> BTreeSet<String> {
    articles
        .iter()
        .flat_map(|article| article.filters.keys().cloned())
        .collect()
}

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Filter name written by the date range filter. The AI tagger only calls a
/// provider for articles where this filter holds.
pub const DATE_FILTER: &str = "date_filter";

/// Stable identity of an article: hex SHA-256 of its title and url.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    pub fn from_parts(title: &str, url: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update(b"\n");
        hasher.update(url.unwrap_or_default().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured verdict returned by an AI provider.
///
/// `None` fields mean "unknown": the article was skipped or the provider
/// answer could not be classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    #[serde(rename = "match")]
    pub matched: Option<bool>,
    pub confidence: Option<f32>,
    pub reason: String,
}

impl Judgment {
    pub fn new(matched: bool, confidence: f32, reason: impl Into<String>) -> Self {
        Self {
            matched: Some(matched),
            confidence: Some(confidence),
            reason: reason.into(),
        }
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            matched: None,
            confidence: None,
            reason: reason.into(),
        }
    }

    /// Failed provider call: never a match, zero confidence.
    pub fn failure(provider: &str, cause: impl fmt::Display) -> Self {
        Self::new(false, 0.0, format!("{} error: {}", provider, cause))
    }
}

/// Outcome of one named filter for one article.
///
/// Serialized untagged so exports read `true`/`false` for deterministic
/// filters and `{"match": .., "confidence": .., "reason": ..}` for judgments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterResult {
    Boolean(bool),
    Judgment(Judgment),
}

impl FilterResult {
    /// True only for `Boolean(true)` or a judgment with `match == Some(true)`.
    pub fn is_satisfied(&self) -> bool {
        match self {
            FilterResult::Boolean(value) => *value,
            FilterResult::Judgment(judgment) => judgment.matched == Some(true),
        }
    }

    pub fn as_judgment(&self) -> Option<&Judgment> {
        match self {
            FilterResult::Judgment(judgment) => Some(judgment),
            FilterResult::Boolean(_) => None,
        }
    }
}

impl From<bool> for FilterResult {
    fn from(value: bool) -> Self {
        FilterResult::Boolean(value)
    }
}

impl From<Judgment> for FilterResult {
    fn from(judgment: Judgment) -> Self {
        FilterResult::Judgment(judgment)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    /// Kept in the offset the feed gave it, so calendar days are the
    /// publisher's own.
    pub publication_date: DateTime<FixedOffset>,
    pub url: Option<String>,
    pub domain: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub projection_2d: Option<(f32, f32)>,
    pub full_text: Option<String>,
    pub user_selected: bool,
    pub filters: HashMap<String, FilterResult>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        publication_date: impl Into<DateTime<FixedOffset>>,
        url: Option<String>,
    ) -> Self {
        let title = title.into();
        let url = url.filter(|u| !u.trim().is_empty());
        let domain = url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_string));

        Self {
            id: ArticleId::from_parts(&title, url.as_deref()),
            title,
            content: content.into(),
            publication_date: publication_date.into(),
            url,
            domain,
            embedding: None,
            projection_2d: None,
            full_text: None,
            user_selected: false,
            filters: HashMap::new(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn filter(&self, name: &str) -> Option<&FilterResult> {
        self.filters.get(name)
    }

    /// Overwrites whatever was stored under `name` and returns the old value.
    pub fn set_filter(&mut self, name: impl Into<String>, result: FilterResult) -> Option<FilterResult> {
        self.filters.insert(name.into(), result)
    }

    /// Every name present and satisfied. An empty list is trivially satisfied.
    pub fn passes_all<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|name| {
            self.filters
                .get(name.as_ref())
                .map(FilterResult::is_satisfied)
                .unwrap_or(false)
        })
    }

    /// The date filter must have run and accepted this article.
    pub fn passes_date_filter(&self) -> bool {
        matches!(self.filters.get(DATE_FILTER), Some(FilterResult::Boolean(true)))
    }

    /// Text handed to the embedding model.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn article() -> Article {
        Article::new(
            "Test Article",
            "This is a test article about politics.",
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            Some("https://news.example.com/politics/1".to_string()),
        )
    }

    #[test]
    fn test_new_article_defaults() {
        let article = article();
        assert!(article.filters.is_empty());
        assert!(!article.user_selected);
        assert!(article.embedding.is_none());
        assert!(article.projection_2d.is_none());
        assert!(article.full_text.is_none());
        assert_eq!(article.domain.as_deref(), Some("news.example.com"));
    }

    #[test]
    fn test_id_is_stable_and_depends_on_url() {
        let a = article();
        let b = article();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.as_str().len(), 64);

        let c = Article::new("Test Article", "other content", Utc::now(), None);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_blank_url_is_treated_as_missing() {
        let a = Article::new("t", "c", Utc::now(), Some("  ".to_string()));
        assert!(a.url.is_none());
        assert!(a.domain.is_none());
    }

    #[test]
    fn test_set_filter_overwrites() {
        let mut article = article();
        assert!(article.set_filter("A", FilterResult::Boolean(true)).is_none());
        let previous = article.set_filter("A", Judgment::new(false, 0.4, "no").into());
        assert_eq!(previous, Some(FilterResult::Boolean(true)));
        assert_eq!(article.filters.len(), 1);
        assert!(!article.filter("A").unwrap().is_satisfied());
    }

    #[test]
    fn test_unknown_judgment_never_satisfies() {
        let result = FilterResult::Judgment(Judgment::unknown("filtered out by date"));
        assert!(!result.is_satisfied());
        assert!(FilterResult::Judgment(Judgment::new(true, 0.9, "yes")).is_satisfied());
        assert!(!FilterResult::Boolean(false).is_satisfied());
    }

    #[test]
    fn test_failure_judgment_names_provider() {
        let judgment = Judgment::failure("OpenAI", "invalid JSON");
        assert_eq!(judgment.matched, Some(false));
        assert_eq!(judgment.confidence, Some(0.0));
        assert_eq!(judgment.reason, "OpenAI error: invalid JSON");
    }

    #[test]
    fn test_filter_result_serializes_untagged() {
        let boolean = serde_json::to_string(&FilterResult::Boolean(true)).unwrap();
        assert_eq!(boolean, "true");

        let judgment = FilterResult::Judgment(Judgment::new(true, 0.5, "quoted fact"));
        let json = serde_json::to_value(&judgment).unwrap();
        assert_eq!(json["match"], serde_json::json!(true));
        assert_eq!(json["reason"], serde_json::json!("quoted fact"));

        let back: FilterResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, judgment);

        let unknown: FilterResult =
            serde_json::from_str(r#"{"match": null, "confidence": null, "reason": "skipped"}"#).unwrap();
        assert_eq!(unknown, FilterResult::Judgment(Judgment::unknown("skipped")));
    }

    #[test]
    fn test_passes_date_filter_requires_boolean_true() {
        let mut article = article();
        assert!(!article.passes_date_filter());
        article.set_filter(DATE_FILTER, Judgment::new(true, 1.0, "odd").into());
        assert!(!article.passes_date_filter());
        article.set_filter(DATE_FILTER, FilterResult::Boolean(true));
        assert!(article.passes_date_filter());
    }
}

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::JudgmentProvider;
use crate::error::TaggingError;
use crate::options::ProviderSettings;
use crate::tagging::prompt::Prompt;

const STOP_WORDS: &[&str] = &[
    "about", "after", "articles", "from", "into", "news", "only", "that", "their", "them", "there", "these", "they",
    "this", "with", "which", "would",
];

/// Offline judge: an article matches when it mentions any significant word
/// of the filter. Answers in the same JSON shape as the remote models.
pub struct DummyProvider {
    min_interval: Duration,
}

impl fmt::Debug for DummyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyProvider").finish()
    }
}

impl DummyProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            min_interval: settings.interval_or(Duration::ZERO),
        }
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 4)
        .map(str::to_lowercase)
}

fn terms(filter: &str) -> BTreeSet<String> {
    words(filter).filter(|word| !STOP_WORDS.contains(&word.as_str())).collect()
}

#[async_trait]
impl JudgmentProvider for DummyProvider {
    fn name(&self) -> &str {
        "Dummy"
    }

    fn min_interval(&self) -> Duration {
        self.min_interval
    }

    async fn judge(&self, prompt: &Prompt) -> Result<String, TaggingError> {
        let terms = terms(&prompt.filter);
        let article: BTreeSet<String> = words(&prompt.title).chain(words(&prompt.content)).collect();
        let hits: Vec<&String> = terms.iter().filter(|term| article.contains(*term)).collect();

        let answer = if hits.is_empty() {
            let confidence = if terms.is_empty() { 0.0 } else { 0.7 };
            json!({
                "match": false,
                "confidence": confidence,
                "reason": "The article does not mention any term of the filter.",
            })
        } else {
            let quoted: Vec<String> = hits.iter().map(|hit| format!("\"{}\"", hit)).collect();
            json!({
                "match": true,
                "confidence": hits.len() as f32 / terms.len() as f32,
                "reason": format!("The article mentions {}.", quoted.join(", ")),
            })
        };
        Ok(answer.to_string())
    }
}

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TaggingError;

/// A `Duration` written as a human string (`"30s"`, `"1m 30s"`, `"500ms"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn get(&self) -> Duration {
        self.0
    }
}

impl FromStr for HumanDuration {
    type Err = humantime::DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        humantime::parse_duration(s.trim()).map(Self)
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.0))
    }
}

impl From<Duration> for HumanDuration {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Knobs for a tagging run. Every field has a default, so a config file only
/// lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingOptions {
    /// Articles judged at once. `0` is treated as `1`.
    pub concurrency: usize,
    pub request_timeout: HumanDuration,
    /// Extra attempts after a transport failure.
    pub max_retries: u32,
    pub retry_backoff: HumanDuration,
    /// Only the first N store articles are considered.
    pub max_articles: Option<usize>,
    /// Minimum spacing between requests, keyed by provider name.
    pub rate_limits: HashMap<String, HumanDuration>,
    /// Model overrides, keyed by provider name.
    pub models: HashMap<String, String>,
    /// Endpoint overrides, keyed by provider name.
    pub base_urls: HashMap<String, String>,
}

impl Default for TaggingOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            request_timeout: HumanDuration::from_secs(30),
            max_retries: 1,
            retry_backoff: HumanDuration::from_secs(2),
            max_articles: None,
            rate_limits: HashMap::new(),
            models: HashMap::new(),
            base_urls: HashMap::new(),
        }
    }
}

impl TaggingOptions {
    pub fn from_json(json: &str) -> nd_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> nd_core::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Settings handed to the factory of provider `key`.
    pub fn settings_for(&self, key: &str) -> ProviderSettings {
        ProviderSettings {
            model: self.models.get(key).cloned(),
            base_url: self.base_urls.get(key).cloned(),
            timeout: self.request_timeout.get(),
            min_interval: self.rate_limits.get(key).map(HumanDuration::get),
        }
    }
}

/// Per-provider construction settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderSettings {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub min_interval: Option<Duration>,
}

impl ProviderSettings {
    pub fn model_or(&self, default: &str) -> String {
        self.model.clone().unwrap_or_else(|| default.to_string())
    }

    pub fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn interval_or(&self, default: Duration) -> Duration {
        self.min_interval.unwrap_or(default)
    }
}

/// Secrets and endpoints for every provider. Nothing is required up front;
/// a provider only checks for the fields it needs when it is built.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub vertex_project: Option<String>,
    pub vertex_location: Option<String>,
    pub vertex_access_token: Option<String>,
    pub ollama_url: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_deref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("claude_api_key", &redact(&self.claude_api_key))
            .field("deepseek_api_key", &redact(&self.deepseek_api_key))
            .field("vertex_project", &self.vertex_project)
            .field("vertex_location", &self.vertex_location)
            .field("vertex_access_token", &redact(&self.vertex_access_token))
            .field("ollama_url", &self.ollama_url)
            .finish()
    }
}

impl Credentials {
    /// Read the conventional environment variables.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: var("OPENAI_API_KEY"),
            claude_api_key: var("ANTHROPIC_API_KEY"),
            deepseek_api_key: var("DEEPSEEK_API_KEY"),
            vertex_project: var("VERTEX_PROJECT"),
            vertex_location: var("VERTEX_LOCATION"),
            vertex_access_token: var("VERTEX_ACCESS_TOKEN"),
            ollama_url: var("OLLAMA_URL"),
        }
    }

    /// The value of a required field, or `MissingCredentials` naming it.
    pub fn require(value: &Option<String>, field: &str) -> Result<String, TaggingError> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| TaggingError::MissingCredentials(format!("{} is not set", field)))
    }
}

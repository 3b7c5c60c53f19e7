pub mod claude;
pub mod deepseek;
pub mod dummy;
mod http;
pub mod ollama;
pub mod openai;
pub mod vertex;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TaggingError;
use crate::options::{Credentials, ProviderSettings};
use crate::tagging::prompt::Prompt;

pub use claude::ClaudeProvider;
pub use deepseek::DeepSeekProvider;
pub use dummy::DummyProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use vertex::VertexProvider;

/// A backend able to judge one article against a filter.
#[async_trait]
pub trait JudgmentProvider: Send + Sync + fmt::Debug {
    /// Display name, used in failure reasons.
    fn name(&self) -> &str;

    /// Minimum spacing between two requests to this backend.
    fn min_interval(&self) -> Duration;

    /// Raw answer text, expected to hold one JSON object.
    async fn judge(&self, prompt: &Prompt) -> Result<String, TaggingError>;
}

pub type ProviderFactory =
    Box<dyn Fn(&Credentials, &ProviderSettings) -> Result<Arc<dyn JudgmentProvider>, TaggingError> + Send + Sync>;

struct ProviderEntry {
    display_name: String,
    factory: ProviderFactory,
}

/// Name to factory lookup table for judgment providers.
pub struct ProviderRegistry {
    entries: HashMap<String, ProviderEntry>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry").field("providers", &self.names()).finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Every bundled provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("openai", "OpenAI", |credentials, settings| {
            Ok(Arc::new(OpenAiProvider::new(credentials, settings)?))
        });
        registry.register("claude", "Claude", |credentials, settings| {
            Ok(Arc::new(ClaudeProvider::new(credentials, settings)?))
        });
        registry.register("vertex", "Vertex AI", |credentials, settings| {
            Ok(Arc::new(VertexProvider::new(credentials, settings)?))
        });
        registry.register("ollama", "Ollama", |credentials, settings| {
            Ok(Arc::new(OllamaProvider::new(credentials, settings)?))
        });
        registry.register("deepseek", "DeepSeek", |credentials, settings| {
            Ok(Arc::new(DeepSeekProvider::new(credentials, settings)?))
        });
        registry.register("dummy", "Dummy", |_, settings| Ok(Arc::new(DummyProvider::new(settings))));
        registry
    }

    pub fn register<F>(&mut self, key: &str, display_name: &str, factory: F)
    where
        F: Fn(&Credentials, &ProviderSettings) -> Result<Arc<dyn JudgmentProvider>, TaggingError>
            + Send
            + Sync
            + 'static,
    {
        self.entries.insert(
            Self::normalize(key),
            ProviderEntry {
                display_name: display_name.to_string(),
                factory: Box::new(factory),
            },
        );
    }

    /// Lookup key for a user-facing name: `"Vertex AI"` and `"Ollama (local)"`
    /// become `"vertex"` and `"ollama"`.
    pub fn normalize(name: &str) -> String {
        name.split(|c: char| c.is_whitespace() || c == '(')
            .find(|part| !part.is_empty())
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&Self::normalize(name))
    }

    /// Display name for `name`, falling back to `name` itself.
    pub fn display_name(&self, name: &str) -> String {
        self.entries
            .get(&Self::normalize(name))
            .map(|entry| entry.display_name.clone())
            .unwrap_or_else(|| name.trim().to_string())
    }

    /// Sorted lookup keys.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn create(
        &self,
        name: &str,
        credentials: &Credentials,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn JudgmentProvider>, TaggingError> {
        let key = Self::normalize(name);
        let entry = self
            .entries
            .get(&key)
            .ok_or_else(|| TaggingError::UnknownProvider(name.to_string()))?;
        (entry.factory)(credentials, settings)
    }
}

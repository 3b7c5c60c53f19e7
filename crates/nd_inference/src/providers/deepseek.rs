use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::http::{build_client, send_json};
use super::openai::{ChatRequest, ChatResponse};
use super::JudgmentProvider;
use crate::error::TaggingError;
use crate::options::{Credentials, ProviderSettings};
use crate::tagging::prompt::Prompt;

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEFAULT_MODEL: &str = "deepseek-chat";

/// DeepSeek speaks the OpenAI chat completions dialect.
pub struct DeepSeekProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    min_interval: Duration,
}

impl fmt::Debug for DeepSeekProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepSeekProvider")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl DeepSeekProvider {
    pub fn new(credentials: &Credentials, settings: &ProviderSettings) -> Result<Self, TaggingError> {
        let api_key = Credentials::require(&credentials.deepseek_api_key, "DEEPSEEK_API_KEY")?;
        Ok(Self {
            client: build_client(settings.timeout)?,
            api_key,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            model: settings.model_or(DEFAULT_MODEL),
            min_interval: settings.interval_or(Duration::from_millis(500)),
        })
    }
}

#[async_trait]
impl JudgmentProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        "DeepSeek"
    }

    fn min_interval(&self) -> Duration {
        self.min_interval
    }

    async fn judge(&self, prompt: &Prompt) -> Result<String, TaggingError> {
        tracing::debug!("🤖 DeepSeek request with model {}", self.model);
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ChatRequest::new(&self.model, prompt));
        send_json::<ChatResponse>(request).await?.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_requires_api_key() {
        let result = DeepSeekProvider::new(&Credentials::default(), &ProviderSettings::default());
        assert_eq!(
            result.unwrap_err().to_string(),
            "missing credentials: DEEPSEEK_API_KEY is not set"
        );

        let credentials = Credentials {
            deepseek_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let provider = DeepSeekProvider::new(&credentials, &ProviderSettings::default()).unwrap();
        assert_eq!(provider.name(), "DeepSeek");
        assert_eq!(provider.model, DEFAULT_MODEL);
        assert!(!format!("{:?}", provider).contains("test-key"));
    }
}

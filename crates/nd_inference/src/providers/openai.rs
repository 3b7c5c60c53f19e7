use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http::{build_client, send_json};
use super::JudgmentProvider;
use crate::error::TaggingError;
use crate::options::{Credentials, ProviderSettings};
use crate::tagging::prompt::Prompt;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Chat Completions request body, shared with OpenAI-compatible backends.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(model: &str, prompt: &Prompt) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt.system.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.user_message(),
                },
            ],
            max_tokens: 256,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    pub fn into_text(self) -> Result<String, TaggingError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TaggingError::MalformedResponse("no message content in choices".to_string()))
    }
}

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    min_interval: Duration,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(credentials: &Credentials, settings: &ProviderSettings) -> Result<Self, TaggingError> {
        Ok(Self {
            client: build_client(settings.timeout)?,
            api_key: Credentials::require(&credentials.openai_api_key, "OPENAI_API_KEY")?,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            model: settings.model_or(DEFAULT_MODEL),
            min_interval: settings.interval_or(Duration::from_millis(500)),
        })
    }
}

#[async_trait]
impl JudgmentProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn min_interval(&self) -> Duration {
        self.min_interval
    }

    async fn judge(&self, prompt: &Prompt) -> Result<String, TaggingError> {
        tracing::debug!("🤖 OpenAI request with model {}", self.model);
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

    fn prompt() -> Prompt {
        Prompt {
            system: "sys".to_string(),
            filter: "health".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
        }
    }

    #[test]
    fn test_request_has_system_and_user_messages() {
        let body = serde_json::to_value(ChatRequest::new("gpt-test", &prompt())).unwrap();
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["messages"][1]["content"].as_str().unwrap().contains("User Filter: health"));
    }

    #[test]
    fn test_response_text_location() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"id": "x", "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"match\": true}"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "{\"match\": true}");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(empty.into_text(), Err(TaggingError::MalformedResponse(_))));
    }

    #[test]
    fn test_settings_override_defaults() {
        let credentials = Credentials {
            openai_api_key: Some("sk-secret-key".to_string()),
            ..Default::default()
        };
        let settings = ProviderSettings {
            model: Some("gpt-4o-mini".to_string()),
            min_interval: Some(Duration::ZERO),
            ..Default::default()
        };
        let provider = OpenAiProvider::new(&credentials, &settings).unwrap();
        assert_eq!(provider.model, "gpt-4o-mini");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(provider.min_interval(), Duration::ZERO);
        assert!(!format!("{:?}", provider).contains("sk-secret-key"));
    }
}

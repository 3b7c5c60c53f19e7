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

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<UserMessage>,
}

#[derive(Debug, Serialize)]
struct UserMessage {
    role: &'static str,
    content: String,
}

impl MessagesRequest {
    fn new(model: &str, prompt: &Prompt) -> Self {
        Self {
            model: model.to_string(),
            max_tokens: 256,
            temperature: 0.2,
            system: prompt.system.clone(),
            messages: vec![UserMessage {
                role: "user",
                content: prompt.user_message(),
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    fn into_text(self) -> Result<String, TaggingError> {
        self.content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| TaggingError::MalformedResponse("no text block in content".to_string()))
    }
}

/// Anthropic Messages API.
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    min_interval: Duration,
}

impl fmt::Debug for ClaudeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeProvider")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl ClaudeProvider {
    pub fn new(credentials: &Credentials, settings: &ProviderSettings) -> Result<Self, TaggingError> {
        Ok(Self {
            client: build_client(settings.timeout)?,
            api_key: Credentials::require(&credentials.claude_api_key, "ANTHROPIC_API_KEY")?,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            model: settings.model_or(DEFAULT_MODEL),
            min_interval: settings.interval_or(Duration::from_secs(1)),
        })
    }
}

#[async_trait]
impl JudgmentProvider for ClaudeProvider {
    fn name(&self) -> &str {
        "Claude"
    }

    fn min_interval(&self) -> Duration {
        self.min_interval
    }

    async fn judge(&self, prompt: &Prompt) -> Result<String, TaggingError> {
        tracing::debug!("🤖 Claude request with model {}", self.model);
        let request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&MessagesRequest::new(&self.model, prompt));
        send_json::<MessagesResponse>(request).await?.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_sends_system_separately() {
        let prompt = Prompt {
            system: "be strict".to_string(),
            filter: "sports".to_string(),
            title: "Cup final".to_string(),
            content: "The match ended 2-1.".to_string(),
        };
        let body = serde_json::to_value(MessagesRequest::new(DEFAULT_MODEL, &prompt)).unwrap();
        assert_eq!(body["system"], "be strict");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn test_response_text_location() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"id": "msg_1", "type": "message", "content": [{"type": "text", "text": "{\"match\": false}"}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "{\"match\": false}");

        let empty: MessagesResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert!(empty.into_text().is_err());
    }

    #[test]
    fn test_missing_key() {
        assert!(matches!(
            ClaudeProvider::new(&Credentials::default(), &ProviderSettings::default()),
            Err(TaggingError::MissingCredentials(_))
        ));
    }
}

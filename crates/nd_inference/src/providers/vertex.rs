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

const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    fn new(prompt: &Prompt) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.user_message()),
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(prompt.system.clone()),
                }],
            },
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 256,
                response_mime_type: "application/json",
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, joined.
    fn into_text(self) -> Result<String, TaggingError> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(TaggingError::MalformedResponse("no text in candidates".to_string()));
        }
        Ok(text)
    }
}

/// Google Vertex AI `generateContent`, authenticated with an OAuth access token.
pub struct VertexProvider {
    client: Client,
    endpoint: String,
    access_token: String,
    model: String,
    min_interval: Duration,
}

impl fmt::Debug for VertexProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexProvider")
            .field("endpoint", &self.endpoint)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl VertexProvider {
    pub fn new(credentials: &Credentials, settings: &ProviderSettings) -> Result<Self, TaggingError> {
        let project = Credentials::require(&credentials.vertex_project, "VERTEX_PROJECT")?;
        let location = Credentials::require(&credentials.vertex_location, "VERTEX_LOCATION")?;
        let access_token = Credentials::require(&credentials.vertex_access_token, "VERTEX_ACCESS_TOKEN")?;
        let model = settings.model_or(DEFAULT_MODEL);
        let base_url = settings.base_url_or(&format!("https://{}-aiplatform.googleapis.com/v1", location));

        Ok(Self {
            client: build_client(settings.timeout)?,
            endpoint: format!(
                "{}/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                base_url, project, location, model
            ),
            access_token,
            model,
            min_interval: settings.interval_or(Duration::from_secs(1)),
        })
    }
}

#[async_trait]
impl JudgmentProvider for VertexProvider {
    fn name(&self) -> &str {
        "Vertex AI"
    }

    fn min_interval(&self) -> Duration {
        self.min_interval
    }

    async fn judge(&self, prompt: &Prompt) -> Result<String, TaggingError> {
        tracing::debug!("🤖 Vertex AI request with model {}", self.model);
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&GenerateRequest::new(prompt));
        send_json::<GenerateResponse>(request).await?.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            vertex_project: Some("newsroom".to_string()),
            vertex_location: Some("us-central1".to_string()),
            vertex_access_token: Some("ya29.token".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_layout() {
        let provider = VertexProvider::new(&credentials(), &ProviderSettings::default()).unwrap();
        assert_eq!(
            provider.endpoint,
            "https://us-central1-aiplatform.googleapis.com/v1/projects/newsroom/locations/us-central1/publishers/google/models/gemini-1.5-flash:generateContent"
        );
        assert!(!format!("{:?}", provider).contains("ya29"));
    }

    #[test]
    fn test_every_field_is_required() {
        let mut partial = credentials();
        partial.vertex_location = None;
        let err = VertexProvider::new(&partial, &ProviderSettings::default()).unwrap_err();
        assert!(err.to_string().contains("VERTEX_LOCATION"));
    }

    #[test]
    fn test_request_shape() {
        let prompt = Prompt {
            system: "sys".to_string(),
            filter: "f".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
        };
        let body = serde_json::to_value(GenerateRequest::new(&prompt)).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_response_text_location() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "{\"match\":"}, {"text": " true}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "{\"match\": true}");

        let blocked: GenerateResponse = serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(matches!(blocked.into_text(), Err(TaggingError::MalformedResponse(_))));
    }
}

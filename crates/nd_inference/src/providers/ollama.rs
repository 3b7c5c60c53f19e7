use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::http::{build_client, send_json};
use super::JudgmentProvider;
use crate::error::TaggingError;
use crate::options::{Credentials, ProviderSettings};
use crate::tagging::prompt::Prompt;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "gemma3:1b";
const GENERATE_PATH: &str = "/api/generate";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    format: &'static str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Accepts either a server root or the full generate endpoint.
fn generate_endpoint(raw: &str) -> Result<Url, TaggingError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let full = if trimmed.ends_with(GENERATE_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, GENERATE_PATH)
    };
    Url::parse(&full).map_err(|e| TaggingError::MissingCredentials(format!("OLLAMA_URL is not a valid URL: {}", e)))
}

/// Local Ollama server, asked for JSON-formatted output.
#[derive(Debug)]
pub struct OllamaProvider {
    client: Client,
    endpoint: Url,
    model: String,
    min_interval: Duration,
}

impl OllamaProvider {
    pub fn new(credentials: &Credentials, settings: &ProviderSettings) -> Result<Self, TaggingError> {
        let raw = settings
            .base_url
            .as_deref()
            .or(credentials.ollama_url.as_deref())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_OLLAMA_URL);
        Ok(Self {
            client: build_client(settings.timeout)?,
            endpoint: generate_endpoint(raw)?,
            model: settings.model_or(DEFAULT_MODEL),
            min_interval: settings.interval_or(Duration::ZERO),
        })
    }
}

#[async_trait]
impl JudgmentProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    fn min_interval(&self) -> Duration {
        self.min_interval
    }

    async fn judge(&self, prompt: &Prompt) -> Result<String, TaggingError> {
        tracing::debug!("🦙 Ollama request to {} with model {}", self.endpoint, self.model);
        let body = GenerateRequest {
            model: &self.model,
            prompt: prompt.full_text(),
            format: "json",
            stream: false,
        };
        let request = self.client.post(self.endpoint.clone()).json(&body);
        send_json::<GenerateResponse>(request)
            .await?
            .response
            .ok_or_else(|| TaggingError::MalformedResponse("missing `response` field".to_string()))
    }
}

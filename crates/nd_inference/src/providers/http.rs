use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::TaggingError;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, TaggingError> {
    let mut builder = Client::builder();
    if !timeout.is_zero() {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| TaggingError::Transport(format!("failed to build HTTP client: {}", e)))
}

/// Send a request and decode a successful JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, TaggingError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(TaggingError::from_status(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| TaggingError::MalformedResponse(format!("unexpected response body: {}", e)))
}

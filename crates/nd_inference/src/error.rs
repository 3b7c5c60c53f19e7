use reqwest::StatusCode;
use thiserror::Error;

/// Why a single AI judgment could not be obtained. Never escapes a tagging
/// run: each one is folded into a failed `Judgment` for its article.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaggingError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid judgment: {0}")]
    Validation(String),
}

impl TaggingError {
    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaggingError::Transport(_))
    }

    /// Map a non-success HTTP status to the taxonomy.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let snippet: String = body.chars().take(200).collect();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                TaggingError::Auth(format!("HTTP {}: {}", status, snippet))
            }
            _ => TaggingError::Transport(format!("HTTP {}: {}", status, snippet)),
        }
    }
}

impl From<reqwest::Error> for TaggingError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return TaggingError::from_status(status, &e.to_string());
        }
        if e.is_decode() {
            TaggingError::MalformedResponse(e.to_string())
        } else {
            TaggingError::Transport(e.to_string())
        }
    }
}

/// Violated preconditions of the similarity functions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimilarityError {
    #[error("embedding dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("article {0} has no embedding")]
    MissingEmbedding(String),

    #[error("cancelled after {completed}/{total} steps")]
    Cancelled { completed: usize, total: usize },
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_keep_the_cause() {
        let json = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = Error::from(json);
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error:"));

        let external = Error::from(anyhow::anyhow!("403 Forbidden"));
        assert_eq!(external.to_string(), "External error: 403 Forbidden");
    }
}

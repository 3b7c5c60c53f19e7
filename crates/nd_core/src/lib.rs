pub mod collaborators;
pub mod error;
pub mod filters;
pub mod types;

pub use collaborators::{Embedder, FullTextFetcher, Ingestor, Projector};
pub use error::Error;
pub use filters::{articles_matching, compose_and, list_filter_names};
pub use types::{Article, ArticleId, FilterResult, Judgment, DATE_FILTER};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::{Article, ArticleId, Error, FilterResult, Judgment, Result};
}

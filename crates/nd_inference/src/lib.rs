pub mod embeddings;
pub mod error;
pub mod options;
pub mod providers;
pub mod similarity;
pub mod tagging;

pub use error::{SimilarityError, TaggingError};
pub use options::{Credentials, HumanDuration, ProviderSettings, TaggingOptions};
pub use providers::{JudgmentProvider, ProviderRegistry};
pub use tagging::{AiTagger, ArticleOutcome, TaggingReport, TaggingRequest};

pub mod prelude {
    pub use super::embeddings::{DummyEmbedder, EmbeddingPipeline};
    pub use super::similarity::{
        average_linkage, average_linkage_tracked, cosine_similarity, find_similar, group_articles,
        group_by_similarity, group_by_similarity_tracked, Merge, SimilarArticle,
    };
    pub use super::tagging::{AiTagger, TaggingReport, TaggingRequest};
    pub use super::{Credentials, TaggingOptions};
    pub use nd_core::{Article, Error, FilterResult, Judgment, Result};
}

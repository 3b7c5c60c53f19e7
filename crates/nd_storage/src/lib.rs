pub mod builtin;
pub mod export;
pub mod ingest;
pub mod memory;

pub use builtin::{apply_date_filter, apply_keyword_filter};
pub use export::{collect_export, ExportRecord};
pub use ingest::JsonFeedIngestor;
pub use memory::{ArticleHandle, ArticleStore};

pub mod prelude {
    pub use super::memory::ArticleStore;
    pub use nd_core::{Article, ArticleId, FilterResult, Judgment, Result};
}

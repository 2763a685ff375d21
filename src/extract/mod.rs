//! Source extraction.
//!
//! An `Extractor` turns one configured source into raw text items. The
//! pipeline only sees the trait, so extraction can be faked in tests.

mod html;

use async_trait::async_trait;

use crate::config::SourceConfig;
use crate::error_handling::ExtractionError;

pub use html::{extract_texts, HtmlExtractor};

/// One unclassified text item and the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub source: String,
    pub text: String,
}

impl RawItem {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        RawItem {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// Produces raw items for a source.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetches and extracts the items of `source`, in page order.
    async fn extract(&self, source: &SourceConfig) -> Result<Vec<RawItem>, ExtractionError>;
}

//! Text classification.
//!
//! A `Classifier` picks one of the candidate labels for a text and reports its
//! confidence. The confidence threshold and low-confidence policy are applied
//! afterwards by [`Classification::verdict`].

mod zero_shot;

use async_trait::async_trait;

use crate::config::LowConfidencePolicy;
use crate::error_handling::ClassificationError;

pub use zero_shot::ZeroShotClassifier;

/// Best label for one text.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Label the item will be stored under
    pub category: String,
    /// Label exactly as the model produced it
    pub raw_label: String,
    /// Score of the best label, in `[0, 1]`
    pub confidence: f64,
}

/// What to do with a classified item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// At or above threshold: store with its category
    Confident,
    /// Below threshold, keep policy: store as `Uncategorized`
    Uncategorized,
    /// Below threshold, drop policy: skip the item
    Dropped,
}

impl Classification {
    pub fn verdict(&self, threshold: f64, policy: LowConfidencePolicy) -> Verdict {
        if self.confidence >= threshold {
            Verdict::Confident
        } else {
            match policy {
                LowConfidencePolicy::Keep => Verdict::Uncategorized,
                LowConfidencePolicy::Drop => Verdict::Dropped,
            }
        }
    }
}

/// Assigns a category to a piece of text.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Picks the best of `labels` for `text`.
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<Classification, ClassificationError>;
}

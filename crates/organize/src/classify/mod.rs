//! The image classifier collaborator.
//!
//! Vision models live outside this crate; the organizer only sees ranked
//! `(category, confidence)` pairs through [`Classifier`]. A classifier that
//! fails is logged and skipped, it never stops a run.

pub mod error;
mod keyword;

pub use self::error::{Error, ErrorKind, Result};
pub use self::keyword::{DEFAULT_CATEGORIES, KeywordClassifier};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub category: String,
    /// In `[0, 1]`.
    pub confidence: f64,
}
impl Prediction {
    pub fn new(category: impl Into<String>, confidence: f64) -> Self {
        Self { category: category.into(), confidence: confidence.clamp(0.0, 1.0) }
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Human readable name, used for logging only.
    fn name(&self) -> &str;

    /// Predictions for the file at `path`, best first.
    ///
    /// `vocabulary` lists the categories the caller knows about. Callers
    /// impose their own timeout; return [`ErrorKind::Unavailable`] rather
    /// than blocking indefinitely.
    async fn classify(&self, path: &Path, vocabulary: &[String]) -> Result<Vec<Prediction>>;
}

/// The built-in category names plus a profile's custom ones, sorted.
pub fn vocabulary(custom: &BTreeMap<String, BTreeSet<String>>) -> Vec<String> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(name, _)| name.to_string())
        .chain(custom.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_merges_custom_categories() {
        let custom = BTreeMap::from([
            ("weapon".to_string(), BTreeSet::from(["blade".to_string()])),
            ("kratos".to_string(), BTreeSet::new()),
        ]);
        let vocabulary = vocabulary(&custom);
        assert!(vocabulary.contains(&"kratos".to_string()));
        assert_eq!(vocabulary.iter().filter(|c| *c == "weapon").count(), 1);
        assert!(vocabulary.is_sorted());
    }

    #[test]
    fn test_prediction_confidence_is_clamped() {
        assert_eq!(Prediction::new("ui", 1.7).confidence, 1.0);
        assert_eq!(Prediction::new("ui", -0.2).confidence, 0.0);
    }
}

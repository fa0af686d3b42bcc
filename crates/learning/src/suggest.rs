//! Ranking candidate destinations for one file.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::store::PatternStore;

pub const DEFAULT_LEARN_WEIGHT: f64 = 0.7;
pub const DEFAULT_MODEL_WEIGHT: f64 = 0.3;
pub const DEFAULT_LIMIT: usize = 5;

/// A classifier's best guess for a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierHint {
    pub category: String,
    pub confidence: f64,
}
impl ClassifierHint {
    pub fn new(category: impl Into<String>, confidence: f64) -> Self {
        Self { category: category.into(), confidence }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub destination: String,
    pub score: f64,
    /// Most recent confirmation of this destination for the file's pattern.
    pub last_learned: Option<OffsetDateTime>,
}

/// Combines learned mappings with a classifier hint.
///
/// With both sources present a destination scores
/// `learn_weight * learned + model_weight * confidence`, where `learned` is
/// the summed normalized weight of the matching entries pointing at it and
/// `confidence` only counts for the classifier's own category. With one
/// source, that source's raw value is the score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestionEngine {
    learn_weight: f64,
    model_weight: f64,
    limit: usize,
}
impl Default for SuggestionEngine {
    fn default() -> Self {
        Self { learn_weight: DEFAULT_LEARN_WEIGHT, model_weight: DEFAULT_MODEL_WEIGHT, limit: DEFAULT_LIMIT }
    }
}
impl SuggestionEngine {
    /// Non-finite or negative weights fall back to zero; `limit` is at least 1.
    pub fn new(learn_weight: f64, model_weight: f64, limit: usize) -> Self {
        let sane = |w: f64| if w.is_finite() && w >= 0.0 { w } else { 0.0 };
        Self { learn_weight: sane(learn_weight), model_weight: sane(model_weight), limit: limit.max(1) }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// At most `limit` suggestions, best first. Ties go to the destination
    /// learned most recently, then the one learned last, then by name.
    pub fn suggest(&self, store: &PatternStore, filename: &str, hint: Option<&ClassifierHint>) -> Vec<Suggestion> {
        #[derive(Default)]
        struct Candidate {
            learned: f64,
            last_learned: Option<OffsetDateTime>,
            index: Option<usize>,
        }

        let mut candidates: BTreeMap<&str, Candidate> = BTreeMap::new();
        for hit in store.matches(filename) {
            let candidate = candidates.entry(hit.entry.destination.as_str()).or_default();
            candidate.learned += hit.score;
            candidate.last_learned = candidate.last_learned.max(Some(hit.entry.last_seen));
            candidate.index = candidate.index.max(Some(hit.index));
        }
        let has_learned = !candidates.is_empty();
        let hint = hint.filter(|h| !h.category.trim().is_empty());
        if let Some(hint) = hint {
            candidates.entry(hint.category.as_str()).or_default();
        }

        let mut suggestions: Vec<(Suggestion, Option<usize>)> = candidates
            .into_iter()
            .map(|(destination, candidate)| {
                let model = match hint {
                    Some(hint) if hint.category == destination => hint.confidence.clamp(0.0, 1.0),
                    _ => 0.0,
                };
                let score = match (has_learned, hint.is_some()) {
                    (true, true) => self.learn_weight * candidate.learned + self.model_weight * model,
                    (true, false) => candidate.learned,
                    _ => model,
                };
                let suggestion =
                    Suggestion { destination: destination.to_string(), score, last_learned: candidate.last_learned };
                (suggestion, candidate.index)
            })
            .collect();
        suggestions.sort_by(|(a, a_index), (b, b_index)| compare(a, *a_index, b, *b_index));
        suggestions.truncate(self.limit);
        suggestions.into_iter().map(|(s, _)| s).collect()
    }
}

fn compare(a: &Suggestion, a_index: Option<usize>, b: &Suggestion, b_index: Option<usize>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.last_learned.cmp(&a.last_learned))
        .then_with(|| b_index.cmp(&a_index))
        .then_with(|| a.destination.cmp(&b.destination))
}

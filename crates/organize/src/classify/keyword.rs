use crate::classify::{Classifier, Prediction, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("character", &[
        "character", "char", "body", "head", "face", "hair", "eye", "skin", "hand", "arm", "leg", "npc", "player",
    ]),
    ("vehicle", &["vehicle", "car", "bike", "truck", "boat", "plane", "wheel", "tire"]),
    ("weapon", &["weapon", "gun", "sword", "blade", "axe", "bow", "rifle", "pistol"]),
    ("ui", &["ui", "hud", "menu", "button", "icon", "font", "cursor"]),
    ("environment", &[
        "wall", "floor", "ground", "grass", "rock", "tree", "sky", "water", "terrain", "brick", "road",
    ]),
    ("effect", &["fx", "effect", "particle", "smoke", "fire", "spark", "glow"]),
    ("item", &["item", "pickup", "coin", "chest", "key", "potion"]),
];

/// Keywords shorter than this only match whole tokens.
const MIN_PREFIX_LEN: usize = 3;

/// Classifies by filename keywords alone.
///
/// A category's confidence is the share of the filename's words that hit one
/// of its keywords, either exactly or as a prefix (`swords` hits `sword`).
/// Used when no vision model is attached.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    categories: BTreeMap<String, BTreeSet<String>>,
}
impl Default for KeywordClassifier {
    fn default() -> Self {
        let categories = DEFAULT_CATEGORIES
            .iter()
            .map(|(name, words)| (name.to_string(), words.iter().map(|w| w.to_string()).collect()))
            .collect();
        Self { categories }
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a profile's custom categories. Each category name also counts as
    /// one of its own keywords.
    pub fn with_categories(mut self, custom: &BTreeMap<String, BTreeSet<String>>) -> Self {
        for (name, keywords) in custom {
            let entry = self.categories.entry(name.to_lowercase()).or_default();
            entry.insert(name.to_lowercase());
            entry.extend(keywords.iter().map(|k| k.to_lowercase()));
        }
        self
    }

    fn predict(&self, filename: &str, vocabulary: &[String]) -> Vec<Prediction> {
        let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem).to_lowercase();
        let words: Vec<&str> = stem
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !w.chars().all(|c| c.is_ascii_digit()))
            .collect();
        if words.is_empty() {
            return Vec::new();
        }

        let mut predictions: Vec<Prediction> = self
            .categories
            .iter()
            .filter(|(name, _)| vocabulary.is_empty() || vocabulary.iter().any(|v| v.eq_ignore_ascii_case(name)))
            .filter_map(|(name, keywords)| {
                let hits = words.iter().filter(|word| keywords.iter().any(|k| hit(word, k))).count();
                (hits > 0).then(|| Prediction::new(name.as_str(), hits as f64 / words.len() as f64))
            })
            .collect();
        predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence).then_with(|| a.category.cmp(&b.category)));
        predictions
    }
}

fn hit(word: &str, keyword: &str) -> bool {
    word == keyword || (keyword.len() >= MIN_PREFIX_LEN && word.starts_with(keyword))
}

#[async_trait]
impl Classifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keywords"
    }

    async fn classify(&self, path: &Path, vocabulary: &[String]) -> Result<Vec<Prediction>> {
        let filename = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        Ok(self.predict(&filename, vocabulary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("kratos_head_02.png", Some(("character", 0.5)))]
    #[case("hud_icon.dds", Some(("ui", 1.0)))]
    #[case("swords_rack.png", Some(("weapon", 0.5)))]
    #[case("0001.png", None)]
    #[case("mystery_blob.png", None)]
    #[tokio::test]
    async fn test_classify(#[case] name: &str, #[case] expected: Option<(&str, f64)>) {
        let predictions = KeywordClassifier::new().classify(Path::new(name), &[]).await.unwrap();
        let best = predictions.first().map(|p| (p.category.as_str(), p.confidence));
        assert_eq!(best, expected);
    }

    #[tokio::test]
    async fn test_short_keywords_need_exact_match() {
        // "ui" must not fire on "uiltin", "fx" must not fire on "fxaa"
        let predictions = KeywordClassifier::new().classify(Path::new("uiltin_fxaa.png"), &[]).await.unwrap();
        assert!(predictions.is_empty());
    }

    #[tokio::test]
    async fn test_custom_categories() {
        let custom = BTreeMap::from([("kratos".to_string(), BTreeSet::from(["spartan".to_string()]))]);
        let classifier = KeywordClassifier::new().with_categories(&custom);
        let predictions = classifier.classify(Path::new("chars/spartan_kratos_cape.png"), &[]).await.unwrap();
        assert_eq!(predictions[0].category, "kratos");
        assert!((predictions[0].confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_vocabulary_restricts_categories() {
        let vocabulary = vec!["weapon".to_string()];
        let predictions = KeywordClassifier::new().classify(Path::new("hud_sword.png"), &vocabulary).await.unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].category, "weapon");
    }
}

//! The table of learned `(pattern → destination)` mappings for one profile.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use time::OffsetDateTime;

use crate::error::{ErrorKind, Result};
use crate::pattern::Pattern;

/// How a mapping came to be learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    /// The operator accepted the suggested destination.
    Accepted,
    /// The operator overrode the suggestion with a destination of their own.
    Corrected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEntry {
    pub pattern: Pattern,
    /// Folder relative to the organized library root, `/` separated.
    pub destination: String,
    /// Number of confirmations. Never decreases.
    pub weight: f64,
    pub confidence_at_creation: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
    pub source: EntrySource,
}

/// Outcome of [`PatternStore::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Added,
    Reinforced,
}

/// Outcome of merging one incoming entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merged {
    Added,
    Updated,
    Unchanged,
}

/// An entry whose pattern fits a queried filename.
#[derive(Debug, Clone, Copy)]
pub struct PatternMatch<'a> {
    pub entry: &'a LearningEntry,
    /// Position in the store; later means learned more recently.
    pub index: usize,
    /// `weight` divided by the summed weight of every matching entry.
    pub score: f64,
}

/// Ordered learned mappings. Insertion order is kept and serves as the last
/// recency tie-break. No two entries share a `(pattern, destination)` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternStore {
    entries: Vec<LearningEntry>,
}

impl PatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LearningEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Learns that `filename` belongs in `destination`.
    ///
    /// Re-recording an existing `(pattern, destination)` pair adds one to its
    /// weight and refreshes `last_seen` instead of adding a duplicate.
    pub fn record(
        &mut self,
        filename: &str,
        destination: &str,
        confidence: f64,
        source: EntrySource,
    ) -> Result<Recorded> {
        self.record_at(filename, destination, confidence, source, OffsetDateTime::now_utc())
    }

    pub fn record_at(
        &mut self,
        filename: &str,
        destination: &str,
        confidence: f64,
        source: EntrySource,
        now: OffsetDateTime,
    ) -> Result<Recorded> {
        let Some(destination) = normalize_destination(destination) else {
            exn::bail!(ErrorKind::InvalidEntry(format!("empty destination for `{filename}`")));
        };
        let pattern = Pattern::of(filename)?;
        if let Some(entry) = self.entries.iter_mut().find(|e| e.pattern == pattern && e.destination == destination) {
            entry.weight += 1.0;
            entry.last_seen = now;
            tracing::debug!(%pattern, %destination, weight = entry.weight, "Reinforced learned mapping");
            return Ok(Recorded::Reinforced);
        }
        tracing::debug!(%pattern, %destination, ?source, "Learned new mapping");
        self.entries.push(LearningEntry {
            pattern,
            destination,
            weight: 1.0,
            confidence_at_creation: clamp_unit(confidence),
            last_seen: now,
            source,
        });
        Ok(Recorded::Added)
    }

    /// Every entry whose pattern fits `filename`, best first.
    ///
    /// Ordered by normalized weight, then by the more recent `last_seen`,
    /// then by the later insertion.
    pub fn matches(&self, filename: &str) -> Vec<PatternMatch<'_>> {
        let hits: Vec<(usize, &LearningEntry)> =
            self.entries.iter().enumerate().filter(|(_, e)| e.pattern.matches(filename)).collect();
        let total: f64 = hits.iter().map(|(_, e)| e.weight).sum();
        let mut matches: Vec<PatternMatch<'_>> = hits
            .into_iter()
            .map(|(index, entry)| PatternMatch {
                entry,
                index,
                score: if total > 0.0 { entry.weight / total } else { 0.0 },
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.entry.last_seen.cmp(&a.entry.last_seen))
                .then_with(|| b.index.cmp(&a.index))
        });
        matches
    }

    /// Folds one entry from another profile into this store. Same pair: the
    /// heavier entry wins, ties go to the later `last_seen`. New pair:
    /// appended. Nothing is ever removed, so merging twice equals merging once.
    pub fn merge_entry(&mut self, incoming: &LearningEntry) -> Merged {
        match self.entries.iter_mut().find(|e| e.pattern == incoming.pattern && e.destination == incoming.destination) {
            Some(existing) => match compare_strength(incoming, existing) {
                Ordering::Greater => {
                    *existing = incoming.clone();
                    Merged::Updated
                },
                _ => Merged::Unchanged,
            },
            None => {
                self.entries.push(incoming.clone());
                Merged::Added
            },
        }
    }

    /// Structural checks applied to stores read from disk.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.destination.trim().is_empty() {
                return Err(format!("entry {index} has an empty destination"));
            }
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(format!("entry {index} has an invalid weight"));
            }
            if !seen.insert((entry.pattern.as_str(), entry.destination.as_str())) {
                return Err(format!(
                    "duplicate mapping `{}` -> `{}` at entry {index}",
                    entry.pattern, entry.destination
                ));
            }
        }
        Ok(())
    }
}

fn compare_strength(a: &LearningEntry, b: &LearningEntry) -> Ordering {
    a.weight.total_cmp(&b.weight).then_with(|| a.last_seen.cmp(&b.last_seen))
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// `/`-separated, without empty components or surrounding slashes.
pub(crate) fn normalize_destination(destination: &str) -> Option<String> {
    let parts: Vec<&str> = destination.split(['/', '\\']).map(str::trim).filter(|p| !p.is_empty() && *p != ".").collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const T0: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);
    const T1: OffsetDateTime = datetime!(2024-01-02 00:00 UTC);

    #[test]
    fn test_record_reinforces_instead_of_duplicating() {
        let mut store = PatternStore::new();
        assert_eq!(store.record_at("kratos_head_02.png", "character/kratos", 0.8, EntrySource::Accepted, T0).unwrap(), Recorded::Added);
        assert_eq!(store.record_at("kratos_head_05.png", "character/kratos/", 0.4, EntrySource::Corrected, T1).unwrap(), Recorded::Reinforced);
        assert_eq!(store.len(), 1);
        let entry = &store.entries()[0];
        assert_eq!(entry.pattern.as_str(), "kratos_head_*.png");
        assert_eq!(entry.weight, 2.0);
        assert_eq!(entry.last_seen, T1);
        assert_eq!(entry.confidence_at_creation, 0.8);
        assert_eq!(entry.source, EntrySource::Accepted);
    }

    #[test]
    fn test_record_rejects_empty_destination() {
        let mut store = PatternStore::new();
        let err = store.record("a.png", " / ", 0.5, EntrySource::Accepted).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidEntry(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_matches_normalizes_weights() {
        let mut store = PatternStore::new();
        for _ in 0..3 {
            store.record_at("kratos_head_01.png", "character/kratos", 0.9, EntrySource::Accepted, T0).unwrap();
        }
        store.record_at("kratos_head_01.png", "character/other", 0.9, EntrySource::Corrected, T0).unwrap();
        store.record_at("zeus_01.png", "character/zeus", 0.9, EntrySource::Accepted, T0).unwrap();
        let matches = store.matches("kratos_head_77.png");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].entry.destination, "character/kratos");
        assert_eq!(matches[0].score, 0.75);
        assert_eq!(matches[1].entry.destination, "character/other");
        assert_eq!(matches[1].score, 0.25);
    }

    #[test]
    fn test_matches_ties_prefer_recent_then_later() {
        let mut store = PatternStore::new();
        store.record_at("rock_01.png", "env/old", 0.5, EntrySource::Accepted, T1).unwrap();
        store.record_at("rock_02.png", "env/new", 0.5, EntrySource::Accepted, T0).unwrap();
        let matches = store.matches("rock_03.png");
        assert_eq!(matches[0].entry.destination, "env/old");

        let mut store = PatternStore::new();
        store.record_at("rock_01.png", "env/first", 0.5, EntrySource::Accepted, T0).unwrap();
        store.record_at("rock_02.png", "env/second", 0.5, EntrySource::Accepted, T0).unwrap();
        let matches = store.matches("rock_03.png");
        assert_eq!(matches[0].entry.destination, "env/second");
        assert_eq!(matches[0].index, 1);
    }

    #[test]
    fn test_merge_entry() {
        let mut store = PatternStore::new();
        store.record_at("a_1.png", "x", 0.5, EntrySource::Accepted, T0).unwrap();
        let mut heavier = store.entries()[0].clone();
        heavier.weight = 4.0;
        assert_eq!(store.merge_entry(&heavier), Merged::Updated);
        assert_eq!(store.merge_entry(&heavier), Merged::Unchanged);
        let mut lighter_but_newer = heavier.clone();
        lighter_but_newer.weight = 1.0;
        lighter_but_newer.last_seen = T1;
        assert_eq!(store.merge_entry(&lighter_but_newer), Merged::Unchanged);
        let mut same_weight_newer = heavier.clone();
        same_weight_newer.last_seen = T1;
        assert_eq!(store.merge_entry(&same_weight_newer), Merged::Updated);
        assert_eq!(store.entries()[0].last_seen, T1);
        let mut other = heavier.clone();
        other.destination = "y".to_string();
        assert_eq!(store.merge_entry(&other), Merged::Added);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut store = PatternStore::new();
        store.record_at("a_1.png", "x", 0.5, EntrySource::Accepted, T0).unwrap();
        assert!(store.validate().is_ok());
        let dup = store.entries()[0].clone();
        store.entries.push(dup);
        assert!(store.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_normalize_destination() {
        assert_eq!(normalize_destination("/character//kratos/").as_deref(), Some("character/kratos"));
        assert_eq!(normalize_destination("ui\\icons").as_deref(), Some("ui/icons"));
        assert_eq!(normalize_destination("./"), None);
    }
}

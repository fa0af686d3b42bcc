//! The persisted per-game learning profile.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;

use crate::error::{ErrorKind, Result};
use crate::store::{EntrySource, Merged, PatternStore};

/// The only schema this build reads and writes.
pub const SCHEMA_VERSION: u64 = 1;
const MOST_USED_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub game_name: String,
    #[serde(default)]
    pub game_serial: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningProfile {
    pub schema_version: u64,
    pub metadata: ProfileMetadata,
    #[serde(rename = "learned_mappings", default)]
    pub entries: PatternStore,
    /// Category name → keywords. Sets, so order never matters.
    #[serde(default)]
    pub custom_categories: BTreeMap<String, BTreeSet<String>>,
}

/// Counts reported after an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub game_name: String,
    pub game_serial: Option<String>,
    pub entries_added: usize,
    pub entries_updated: usize,
    pub entries_unchanged: usize,
    pub categories_added: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileStatistics {
    pub total_entries: usize,
    pub accepted: usize,
    pub corrected: usize,
    pub custom_categories: usize,
    /// Destinations by summed weight, heaviest first.
    pub most_used: Vec<(String, f64)>,
}

impl LearningProfile {
    pub fn new(game_name: impl Into<String>, game_serial: Option<String>, author: Option<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            schema_version: SCHEMA_VERSION,
            metadata: ProfileMetadata {
                game_name: game_name.into(),
                game_serial,
                author,
                created_at: now,
                updated_at: now,
            },
            entries: PatternStore::new(),
            custom_categories: BTreeMap::new(),
        }
    }

    /// Pretty JSON with keys sorted at every level, so that two saves of
    /// the same profile are byte-identical and diffs stay small.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        // serde_json's Value map is ordered by key.
        let value = serde_json::to_value(self).map_err(|e| ErrorKind::ProfileCorrupt(e.to_string()))?;
        let mut bytes = serde_json::to_vec_pretty(&value).map_err(|e| ErrorKind::ProfileCorrupt(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parses and validates a plaintext profile.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ErrorKind::ProfileCorrupt(format!("invalid JSON: {e}")))?;
        match value.get("schema_version") {
            None => exn::bail!(ErrorKind::ProfileCorrupt("missing schema_version".to_string())),
            Some(version) if version.as_u64() == Some(SCHEMA_VERSION) => {},
            Some(version) => exn::bail!(ErrorKind::ProfileCorrupt(format!("unsupported schema_version {version}"))),
        }
        let profile: Self = serde_json::from_value(value).map_err(|e| ErrorKind::ProfileCorrupt(e.to_string()))?;
        profile.entries.validate().map_err(ErrorKind::ProfileCorrupt)?;
        Ok(profile)
    }

    pub fn touch(&mut self) {
        self.metadata.updated_at = OffsetDateTime::now_utc();
    }

    /// Adds keywords to a category, creating it if needed. Keywords are
    /// stored lowercase; blanks are ignored. Returns `true` if the category is new.
    pub fn add_custom_category<S: AsRef<str>>(&mut self, name: &str, keywords: impl IntoIterator<Item = S>) -> bool {
        let name = name.trim().to_string();
        let is_new = !self.custom_categories.contains_key(&name);
        let set = self.custom_categories.entry(name).or_default();
        set.extend(
            keywords.into_iter().map(|k| k.as_ref().trim().to_lowercase()).filter(|k| !k.is_empty()),
        );
        is_new
    }

    /// Folds `incoming` into this profile. Metadata stays as it is.
    pub fn merge(&mut self, incoming: &LearningProfile) -> ImportSummary {
        let mut summary = ImportSummary {
            game_name: incoming.metadata.game_name.clone(),
            game_serial: incoming.metadata.game_serial.clone(),
            ..ImportSummary::default()
        };
        for entry in incoming.entries.entries() {
            match self.entries.merge_entry(entry) {
                Merged::Added => summary.entries_added += 1,
                Merged::Updated => summary.entries_updated += 1,
                Merged::Unchanged => summary.entries_unchanged += 1,
            }
        }
        for (name, keywords) in &incoming.custom_categories {
            if self.add_custom_category(name, keywords) {
                summary.categories_added += 1;
            }
        }
        summary
    }

    pub fn statistics(&self) -> ProfileStatistics {
        let entries = self.entries.entries();
        let mut by_destination: BTreeMap<&str, f64> = BTreeMap::new();
        for entry in entries {
            *by_destination.entry(entry.destination.as_str()).or_default() += entry.weight;
        }
        let mut most_used: Vec<(String, f64)> = by_destination.into_iter().map(|(d, w)| (d.to_string(), w)).collect();
        most_used.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        most_used.truncate(MOST_USED_LIMIT);
        ProfileStatistics {
            total_entries: entries.len(),
            accepted: entries.iter().filter(|e| e.source == EntrySource::Accepted).count(),
            corrected: entries.iter().filter(|e| e.source == EntrySource::Corrected).count(),
            custom_categories: self.custom_categories.len(),
            most_used,
        }
    }
}

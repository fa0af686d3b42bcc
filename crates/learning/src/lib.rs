//! Per-game learning.
//!
//! Every time the operator accepts or corrects a destination, the filename is
//! generalized into a [`Pattern`] and remembered with the chosen folder in the
//! active [`LearningProfile`]. Later files matching the pattern get that folder
//! suggested first, blended with whatever the classifier thinks.
//!
//! - [`pattern`]: filename generalization
//! - [`store`]: the learned mappings table
//! - [`suggest`]: ranking destinations
//! - [`ProfileManager`]: profile lifecycle, persistence and encrypted exports

pub mod crypto;
pub mod error;
mod manager;
pub mod pattern;
mod profile;
pub mod store;
pub mod suggest;

pub use crate::manager::{ImportMode, ProfileManager, ProfileStatus, ProfileSummary};
pub use crate::pattern::{Pattern, generalize};
pub use crate::profile::{ImportSummary, LearningProfile, ProfileMetadata, ProfileStatistics, SCHEMA_VERSION};
pub use crate::store::{EntrySource, LearningEntry, PatternStore};
pub use crate::suggest::{ClassifierHint, Suggestion, SuggestionEngine};

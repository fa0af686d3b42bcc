//! Sorting game texture dumps into folder hierarchies.
//!
//! An [`Organizer`] walks a source [backend](texsort_storage::StorageBackend),
//! works out where each texture belongs and moves (or copies) it into the
//! target backend. Where a file goes is decided by three collaborators:
//!
//! - a [`Classifier`](classify::Classifier) guessing a category from the file,
//! - the [learning profile](texsort_learning::ProfileManager), which ranks
//!   folders the operator chose for similarly named files before,
//! - the [`Mode`], which decides whether the operator is asked.
//!
//! The chosen folder is then laid out by an [`OrganizationStyle`].
//!
//! ```no_run
//! use futures::StreamExt;
//! use std::sync::Arc;
//! use texsort_organize::{OrganizationStyle, Organizer, OrganizeEvent, StyleKind};
//! use texsort_storage::backend::LocalBackend;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(LocalBackend::existing("dump", "dumps/SLUS-20917")?);
//! let target = Arc::new(LocalBackend::new("library", "library/god-of-war-2")?);
//! let organizer = Organizer::new(source, target).style(OrganizationStyle::new::<&str>(StyleKind::Flat, &[])?);
//! let mut events = std::pin::pin!(organizer.run());
//! while let Some(event) = events.next().await {
//!     if let Ok(OrganizeEvent::Finished(summary)) = event {
//!         println!("{summary}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
mod consts;
pub mod control;
pub mod decision;
mod engine;
pub mod error;
pub mod style;
pub mod texture;

pub use crate::control::RunControl;
pub use crate::decision::{Decision, DecisionRequest};
pub use crate::engine::{
    Action, ConflictPolicy, FileFailure, Mode, Observer, Operation, Options, OrganizeEvent, Organizer, Placement,
    RunState, RunSummary, drive,
};
pub use crate::style::{CustomStyle, OrganizationStyle, StyleKind};
pub use crate::texture::TextureInfo;

//! Organizer Error Types
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.
//! Variants are split by what happens to the run: a per-file failure is
//! reported and the run moves on, anything [fatal](ErrorKind::is_fatal)
//! stops it.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An organizer error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for organizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// ### Per-file Errors
/// - [`ErrorKind::FileOperation`]
///
/// ### Fatal Errors
/// - [`ErrorKind::SourceUnavailable`]
/// - [`ErrorKind::Discovery`]
/// - [`ErrorKind::EmptyPath`]
/// - [`ErrorKind::Template`]
/// - [`ErrorKind::DecisionChannelClosed`]
///
/// ### Setup Errors
/// - [`ErrorKind::InvalidOption`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Reading, writing, moving or deleting one file failed (permission
    /// denied, disk full, path too long, ...).
    #[display("{}: {reason}", path.display())]
    FileOperation {
        #[error(not(source))]
        path: PathBuf,
        #[error(not(source))]
        reason: String,
    },
    /// The source tree disappeared mid-run.
    #[display("source is no longer available: {_0}")]
    SourceUnavailable(#[error(not(source))] String),
    /// Listing the source tree failed before any file was processed.
    #[display("could not list source files")]
    Discovery,
    /// A style resolved a file to no folder at all.
    #[display("style resolved {} to an empty path", _0.display())]
    EmptyPath(#[error(not(source))] PathBuf),
    /// A custom style template failed to compile or render.
    #[display("invalid style template: {_0}")]
    Template(#[error(not(source))] String),
    /// Nobody is answering decision requests any more.
    #[display("decision channel closed")]
    DecisionChannelClosed,
    /// An unrecognised style, mode, conflict policy or operation name.
    #[display("invalid option: {_0}")]
    InvalidOption(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FileOperation { .. } | Self::SourceUnavailable(_))
    }

    /// Returns `true` if the error must abort the whole run rather than just
    /// the file it happened on.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FileOperation { .. })
    }
}

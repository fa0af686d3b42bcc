//! Metadata describing a file inside a storage backend.

use std::path::PathBuf;
use time::OffsetDateTime;

/// File metadata returned by storage backends.
///
/// Produced by listing and `stat` operations; the organizer builds a texture
/// descriptor from it before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self { path: path.into(), size, modified }
    }

    /// Final path component, or an empty string for paths without one.
    pub fn file_name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
    }

    /// Lowercased extension without the leading dot.
    pub fn extension(&self) -> Option<String> {
        self.path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
    }

    /// Whether the file's extension is one of `extensions` (compared
    /// case-insensitively, leading dots ignored).
    pub fn has_extension<S: AsRef<str>>(&self, extensions: &[S]) -> bool {
        match self.extension() {
            Some(ext) => extensions.iter().any(|e| e.as_ref().trim_start_matches('.').eq_ignore_ascii_case(&ext)),
            None => false,
        }
    }
}

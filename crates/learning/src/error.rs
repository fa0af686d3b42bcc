//! Learning Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The profile is malformed or uses a schema this build cannot read. Never
    /// repaired automatically.
    #[display("profile is corrupt: {_0}")]
    ProfileCorrupt(#[error(not(source))] String),
    /// Wrong password, or the ciphertext was tampered with. Prompt again
    /// rather than reporting data loss.
    #[display("could not decrypt profile (wrong password or damaged file)")]
    Decryption,
    /// The file is encrypted and no password was supplied.
    #[display("profile is encrypted, a password is required")]
    PasswordRequired,
    #[display("could not encrypt profile")]
    Encryption,
    #[display("profile I/O failed: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// Operation needs an active profile and none is loaded.
    #[display("no profile is loaded")]
    NotLoaded,
    /// A learned mapping with an empty filename or destination.
    #[display("invalid learning entry: {_0}")]
    InvalidEntry(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Decryption | Self::PasswordRequired)
    }
}

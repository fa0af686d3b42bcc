//! Storage backend trait and implementations.
//!
//! A texture tree is read from one backend (the dump being sorted) and written
//! to another (the organized library). Both sides speak [`StorageBackend`], so
//! the organizer never touches `std::fs` directly and tests can swap in the
//! in-memory backend.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// # Path Handling
/// All paths are relative to the storage root and are validated with
/// [`validate_path`](crate::validate_path) by every implementation before use.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use texsort_storage::{backend::StorageBackend, error::Result};
///
/// async fn texture_size(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("chars/kratos_head_02.png");
///     if backend.exists(path).await? {
///         Ok(backend.stat(path).await?.size)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Human readable name, used for logging only.
    fn name(&self) -> &str;

    /// Directory on the local filesystem that this backend is rooted at, if
    /// there is one.
    fn root(&self) -> Option<&Path> {
        None
    }

    /// Whether the storage root is still reachable. The organizer checks this
    /// between files to notice a source tree vanishing mid-run.
    async fn available(&self) -> bool {
        true
    }

    /// List all files matching an optional prefix.
    ///
    /// Collects [`list_stream()`](Self::list_stream) into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream file metadata, optionally restricted to files under `prefix`.
    ///
    /// Order is unspecified; callers that need determinism sort the result.
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use texsort_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream(None);
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.path.display(), info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create or overwrite a file, creating parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Copy a file within the same backend, creating parent directories of
    /// the destination. An existing destination is overwritten.
    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let data = self.read(from).await?;
        self.write(to, &data).await
    }

    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Move a file within the same backend, creating parent directories of
    /// the destination. An existing destination is overwritten.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the source
    /// file does not exist.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// File metadata without reading contents.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}

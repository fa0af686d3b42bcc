//! Read-only wrapper used for dry runs.

use async_trait::async_trait;
use std::path::Path;

use crate::{BackendHandle, StorageBackend, backend::FileInfoStream, error::Result, file::FileInfo};

/// Wraps another backend; reads pass through, mutations are logged at
/// `info` and reported as successful without touching anything.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn root(&self) -> Option<&Path> {
        self.inner.root()
    }

    async fn available(&self) -> bool {
        self.inner.available().await
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        self.inner.list_stream(prefix)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tracing::info!(backend = self.name(), path = %path.display(), bytes = data.len(), "Dry run: skipping write");
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        tracing::info!(backend = self.name(), from = %from.display(), to = %to.display(), "Dry run: skipping copy");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        tracing::info!(backend = self.name(), path = %path.display(), "Dry run: skipping delete");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        tracing::info!(backend = self.name(), from = %from.display(), to = %to.display(), "Dry run: skipping move");
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.inner.stat(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mutations_are_dropped() {
        let inner = Arc::new(MockBackend::with_files([("a.png", b"data")]));
        let ro = ReadOnlyBackend::new(inner.clone());
        ro.rename(Path::new("a.png"), Path::new("b/a.png")).await.unwrap();
        ro.copy(Path::new("a.png"), Path::new("c/a.png")).await.unwrap();
        ro.write(Path::new("d.png"), b"x").await.unwrap();
        ro.delete(Path::new("a.png")).await.unwrap();
        assert_eq!(inner.paths().await, vec![PathBuf::from("a.png")]);
        assert_eq!(ro.read(Path::new("a.png")).await.unwrap(), b"data");
    }
}

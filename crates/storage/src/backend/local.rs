//! Local filesystem storage backend, built on `tokio::fs`.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Files in a directory on the local filesystem. All paths are relative to
/// the configured root.
///
/// ```no_run
/// use texsort_storage::backend::LocalBackend;
///
/// # fn example() -> texsort_storage::error::Result<()> {
/// let dump = LocalBackend::new("source", "/home/me/pcsx2/textures/SLUS-20917")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Opens (creating if missing) a directory as a backend.
    ///
    /// # Errors
    /// `InvalidPath` if `root` is relative or names something that is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Constructor stays sync; this runs once per backend.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Opens an existing directory without creating it. Used for trees that
    /// are only ever read, such as the dump being sorted.
    pub fn existing(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if !root.is_dir() {
            exn::bail!(ErrorKind::NotFound(root));
        }
        Ok(Self { name: name.into(), root })
    }

    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        if !absolute.is_absolute() {
            exn::bail!(ErrorKind::BackendError(format!("expected an absolute path, got `{}`", absolute.display())))
        }
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("`{}` is outside of `{}`", absolute.display(), self.root.display()))
        })?;
        Ok(validate_path(relative)?)
    }

    fn metadata(path: &Path, metadata: Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?.into();
        Ok(FileInfo::new(path, metadata.len(), modified))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    async fn ensure_parent(&self, absolute: &Path, relative: &Path) -> Result<()> {
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, relative))?;
        }
        Ok(())
    }

    /// Classifies one directory entry so the walk loop below only has to
    /// yield or push.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&Path>) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        let relative = self.relative_path(&path)?;
        if let Some(pfx) = prefix
            && !relative.starts_with(pfx)
            && !pfx.starts_with(&relative)
        {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() && prefix.is_none_or(|pfx| relative.starts_with(pfx)) {
            return Ok(WalkEntry::File(Self::metadata(&relative, metadata)?));
        }
        // Broken symlinks, sockets and friends.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> Option<&Path> {
        Some(&self.root)
    }

    async fn available(&self) -> bool {
        fs::metadata(&self.root).await.is_ok_and(|m| m.is_dir())
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };
        let mut stack = vec![self.root.clone()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // A missing directory lists as empty.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref()).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        self.ensure_parent(&abs_path, path).await?;
        Ok(fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        if !fs::try_exists(&from_path).await.map_err(ErrorKind::Io)? {
            exn::bail!(ErrorKind::NotFound(from.to_path_buf()));
        }
        self.ensure_parent(&to_path, to).await?;
        fs::copy(&from_path, &to_path).await.map_err(|e| Self::map_io_error(e, to))?;
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        if !fs::try_exists(&from_path).await.map_err(ErrorKind::Io)? {
            exn::bail!(ErrorKind::NotFound(from.to_path_buf()));
        }
        self.ensure_parent(&to_path, to).await?;
        Ok(fs::rename(&from_path, &to_path).await.map_err(|e| Self::map_io_error(e, to))?)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let abs_path = self.absolute_path(path)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        Self::metadata(path, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/textures").is_err());
    }

    #[test]
    fn test_existing_does_not_create() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("gone");
        let err = LocalBackend::existing("source", &missing).err().unwrap();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(!missing.exists());
    }

    #[test]
    fn test_relative_path() {
        let (temp_dir, backend) = backend();
        let abs = temp_dir.path().join("chars/kratos_head.png");
        assert_eq!(backend.relative_path(&abs).unwrap(), Path::new("chars/kratos_head.png"));
        assert!(backend.relative_path("/elsewhere/file.png").is_err());
        assert!(backend.absolute_path("../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_write_creates_directories_and_reads_back() {
        let (_dir, backend) = backend();
        backend.write(Path::new("a/b/c/tex.dds"), b"DDS ").await.unwrap();
        assert!(backend.exists(Path::new("a/b/c/tex.dds")).await.unwrap());
        assert_eq!(backend.read(Path::new("a/b/c/tex.dds")).await.unwrap(), b"DDS ");
    }

    #[tokio::test]
    async fn test_copy_keeps_source() {
        let (_dir, backend) = backend();
        backend.write(Path::new("a.png"), b"png").await.unwrap();
        backend.copy(Path::new("a.png"), Path::new("character/a.png")).await.unwrap();
        assert!(backend.exists(Path::new("a.png")).await.unwrap());
        assert_eq!(backend.read(Path::new("character/a.png")).await.unwrap(), b"png");
        let err = backend.copy(Path::new("missing.png"), Path::new("x.png")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_creates_directories() {
        let (_dir, backend) = backend();
        backend.write(Path::new("a.png"), b"png").await.unwrap();
        backend.rename(Path::new("a.png"), Path::new("character/kratos/a.png")).await.unwrap();
        assert!(!backend.exists(Path::new("a.png")).await.unwrap());
        assert!(backend.exists(Path::new("character/kratos/a.png")).await.unwrap());
        let err = backend.rename(Path::new("a.png"), Path::new("b.png")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, backend) = backend();
        backend.write(Path::new("a.png"), b"png").await.unwrap();
        backend.delete(Path::new("a.png")).await.unwrap();
        assert!(!backend.exists(Path::new("a.png")).await.unwrap());
        let err = backend.delete(Path::new("a.png")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stat() {
        let (_dir, backend) = backend();
        backend.write(Path::new("ui/icon.TGA"), b"12345").await.unwrap();
        let info = backend.stat(Path::new("ui/icon.TGA")).await.unwrap();
        assert_eq!(info.path, PathBuf::from("ui/icon.TGA"));
        assert_eq!(info.size, 5);
        assert_eq!(info.extension().as_deref(), Some("tga"));
    }

    #[tokio::test]
    async fn test_list_recurses() {
        let (_dir, backend) = backend();
        backend.write(Path::new("a.png"), b"1").await.unwrap();
        backend.write(Path::new("sub/b.png"), b"2").await.unwrap();
        backend.write(Path::new("sub/deeper/c.dds"), b"3").await.unwrap();
        let mut paths: Vec<_> = backend.list(None).await.unwrap().into_iter().map(|f| f.path).collect();
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("a.png"), PathBuf::from("sub/b.png"), PathBuf::from("sub/deeper/c.dds")]);
    }

    #[tokio::test]
    async fn test_list_with_prefix_is_component_based() {
        let (_dir, backend) = backend();
        backend.write(Path::new("chars/Sub/file.png"), b"1").await.unwrap();
        backend.write(Path::new("chars/Subdir/file.png"), b"2").await.unwrap();
        backend.write(Path::new("chars/Subfile.png"), b"3").await.unwrap();
        let files = backend.list(Some(Path::new("chars/Sub"))).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, Path::new("chars/Sub/file.png"));
        assert!(backend.list(Some(Path::new("nothing/here"))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_available_tracks_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("dump");
        let backend = LocalBackend::new("source", &root).unwrap();
        assert!(backend.available().await);
        assert_eq!(backend.root(), Some(root.as_path()));
        std::fs::remove_dir_all(&root).unwrap();
        assert!(!backend.available().await);
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_dir, backend) = backend();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("../escape.png"), b"x").await.is_err());
        assert!(backend.copy(Path::new("a.png"), Path::new("../../b.png")).await.is_err());
    }
}

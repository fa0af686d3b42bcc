use crate::engine::ConflictPolicy;
use crate::engine::file::StorageResultExt;
use crate::error::{ErrorKind, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use texsort_storage::BackendHandle;

/// Gives up looking for a free `_N` name after this many attempts.
const MAX_RENAME_ATTEMPTS: usize = 10_000;

/// What to do with a file whose destination has been decided.
#[derive(Debug, PartialEq)]
pub(crate) enum Resolution {
    /// Nothing is there; place the file.
    Free(PathBuf),
    /// Something is there and gets replaced.
    Overwrite(PathBuf),
    /// Something is there; leave the file alone.
    Skip(PathBuf),
}

/// Applies `policy` to `wanted`.
///
/// A destination counts as taken if it exists in `target` or was claimed by
/// an earlier file of the same run, so a dry run reports the same names a
/// real run would produce.
pub(crate) async fn resolve_conflict(
    target: &BackendHandle,
    claimed: &HashSet<PathBuf>,
    policy: ConflictPolicy,
    wanted: PathBuf,
) -> Result<Resolution> {
    if !is_taken(target, claimed, &wanted).await? {
        return Ok(Resolution::Free(wanted));
    }
    match policy {
        ConflictPolicy::Skip => Ok(Resolution::Skip(wanted)),
        ConflictPolicy::Overwrite => Ok(Resolution::Overwrite(wanted)),
        ConflictPolicy::Rename => {
            for n in 1..=MAX_RENAME_ATTEMPTS {
                let candidate = with_suffix(&wanted, n);
                if !is_taken(target, claimed, &candidate).await? {
                    return Ok(Resolution::Free(candidate));
                }
            }
            exn::bail!(ErrorKind::FileOperation {
                path: wanted,
                reason: format!("no free name after {MAX_RENAME_ATTEMPTS} attempts"),
            })
        },
    }
}

async fn is_taken(target: &BackendHandle, claimed: &HashSet<PathBuf>, path: &Path) -> Result<bool> {
    if claimed.contains(path) {
        return Ok(true);
    }
    target.exists(path).await.or_file_error(path)
}

/// `dir/name.ext` → `dir/name_N.ext`
fn with_suffix(path: &Path, n: usize) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match path.extension() {
        Some(extension) => format!("{stem}_{n}.{}", extension.to_string_lossy()),
        None => format!("{stem}_{n}"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use texsort_storage::backend::MockBackend;

    fn target(files: &[&str]) -> BackendHandle {
        Arc::new(MockBackend::with_files(files.iter().map(|f| (*f, b"x".to_vec()))))
    }

    #[rstest]
    #[case("character/a.png", 1, "character/a_1.png")]
    #[case("character/a.png", 12, "character/a_12.png")]
    #[case("README", 2, "README_2")]
    #[case("ui/icon.tar.gz", 1, "ui/icon.tar_1.gz")]
    fn test_with_suffix(#[case] path: &str, #[case] n: usize, #[case] expected: &str) {
        assert_eq!(with_suffix(Path::new(path), n), Path::new(expected));
    }

    #[tokio::test]
    async fn test_free_destination() {
        let resolution =
            resolve_conflict(&target(&[]), &HashSet::new(), ConflictPolicy::Skip, "ui/a.png".into()).await.unwrap();
        assert_eq!(resolution, Resolution::Free("ui/a.png".into()));
    }

    #[rstest]
    #[case(ConflictPolicy::Skip, Resolution::Skip("ui/a.png".into()))]
    #[case(ConflictPolicy::Overwrite, Resolution::Overwrite("ui/a.png".into()))]
    #[case(ConflictPolicy::Rename, Resolution::Free("ui/a_2.png".into()))]
    #[tokio::test]
    async fn test_existing_destination(#[case] policy: ConflictPolicy, #[case] expected: Resolution) {
        let target = target(&["ui/a.png", "ui/a_1.png"]);
        let resolution = resolve_conflict(&target, &HashSet::new(), policy, "ui/a.png".into()).await.unwrap();
        assert_eq!(resolution, expected);
    }

    #[tokio::test]
    async fn test_claimed_destinations_count_as_taken() {
        let claimed = HashSet::from([PathBuf::from("ui/a.png"), PathBuf::from("ui/a_1.png")]);
        let resolution =
            resolve_conflict(&target(&[]), &claimed, ConflictPolicy::Rename, "ui/a.png".into()).await.unwrap();
        assert_eq!(resolution, Resolution::Free("ui/a_2.png".into()));
    }
}

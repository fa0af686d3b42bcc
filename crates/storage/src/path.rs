//! Path validation for storage-relative paths, plus sanitising of single
//! directory segments produced by organization styles.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Characters that cannot appear in a Windows file name. Rejected everywhere
/// so that an organized tree can be copied to any platform.
const INVALID_SEGMENT_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\', '/'];

/// Normalizes a storage-relative path and rejects anything that would leave
/// the storage root.
///
/// `.` components and repeated separators disappear, `..` pops the previous
/// component, and the result must still contain at least one component.
/// Root and drive prefixes are refused, as are NUL bytes.
///
/// ```
/// use std::path::Path;
/// use texsort_storage::validate_path;
/// assert!(validate_path("chars/kratos/kratos_head_02.png").is_ok());
/// assert!(validate_path("chars/../kratos_head_02.png").is_ok());
/// assert!(validate_path("../outside.png").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("chars/./kratos//head.dds/").unwrap(),
///     Path::new("chars/kratos/head.dds")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut kept = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(part) if part.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(part) => kept.push(part),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if kept.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    if kept.is_empty() {
        exn::bail!(invalid());
    }
    Ok(kept.into_iter().collect())
}

/// Makes a single directory name safe to create: invalid characters become
/// `_`, control characters are removed, surrounding whitespace and trailing
/// dots are trimmed. `.` and `..` collapse to an empty string, which callers
/// treat as "drop this segment".
pub fn sanitize_segment(segment: &str) -> String {
    let replaced: String = segment
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if INVALID_SEGMENT_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim().trim_end_matches('.').trim_end();
    match trimmed {
        "" | "." | ".." => String::new(),
        other => other.to_string(),
    }
}

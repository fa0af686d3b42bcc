use crate::error::ErrorKind;
use derive_more::Display;
use std::str::FromStr;

/// Who picks each file's folder.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Mode {
    /// The primary suggestion, else the classifier's category, else
    /// `uncategorized`. Nothing is learned.
    #[default]
    #[display("automatic")]
    Automatic,
    /// The operator confirms, rejects or corrects each primary suggestion.
    #[display("suggested")]
    Suggested,
    /// The operator names each folder.
    #[display("manual")]
    Manual,
}
impl Mode {
    pub fn is_interactive(&self) -> bool {
        !matches!(self, Self::Automatic)
    }
}

/// What to do when a file's destination is already taken.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConflictPolicy {
    /// Leave the file in the source.
    #[display("skip")]
    Skip,
    /// Replace whatever is there.
    #[display("overwrite")]
    Overwrite,
    /// Add `_1`, `_2`, ... before the extension until the name is free.
    #[default]
    #[display("rename")]
    Rename,
}

#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Operation {
    #[default]
    #[display("move")]
    Move,
    #[display("copy")]
    Copy,
}

macro_rules! parse_by_display {
    ($type:ty, $what:literal, [$($variant:expr),+ $(,)?]) => {
        impl FromStr for $type {
            type Err = ErrorKind;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                [$($variant),+]
                    .into_iter()
                    .find(|v: &$type| v.to_string() == wanted)
                    .ok_or_else(|| ErrorKind::InvalidOption(format!(concat!("unknown ", $what, " `{}`"), s)))
            }
        }
    };
}
parse_by_display!(Mode, "mode", [Mode::Automatic, Mode::Suggested, Mode::Manual]);
parse_by_display!(ConflictPolicy, "conflict policy", [
    ConflictPolicy::Skip,
    ConflictPolicy::Overwrite,
    ConflictPolicy::Rename
]);
parse_by_display!(Operation, "operation", [Operation::Move, Operation::Copy]);

/// Per-run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Lowercase, without dots. Empty accepts every file.
    pub extensions: Vec<String>,
    /// Descend into subfolders of the source.
    pub recursive: bool,
    pub mode: Mode,
    pub conflict: ConflictPolicy,
    pub operation: Operation,
    /// Record operator choices in the profile (never in automatic mode).
    pub learning: bool,
    /// Resolve every destination without touching either tree.
    pub dry_run: bool,
}
impl Default for Options {
    fn default() -> Self {
        Self {
            extensions: ["png", "dds", "tga", "bmp", "jpg", "jpeg", "tif", "tiff", "webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            recursive: true,
            mode: Mode::default(),
            conflict: ConflictPolicy::default(),
            operation: Operation::default(),
            learning: true,
            dry_run: false,
        }
    }
}

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::consts::SERIAL_REGEX;
use crate::error::{Error, ErrorKind};

/// A disc serial in canonical `XXXX-NNNNN` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Serial(String);
impl Serial {
    /// Finds the first serial anywhere in `text`.
    pub fn find(text: &str) -> Option<Self> {
        let captures = SERIAL_REGEX.captures(text)?;
        Some(Self(format!("{}-{}{}", &captures[1], &captures[2], &captures[3])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The four letter publisher/region prefix.
    pub fn prefix(&self) -> &str {
        &self.0[..4]
    }

    pub fn region(&self) -> Region {
        Region::from_prefix(self.prefix())
    }
}
impl FromStr for Serial {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::find(s.trim()) {
            Some(serial) => Ok(serial),
            None => exn::bail!(ErrorKind::InvalidSerial(s.to_string())),
        }
    }
}
impl TryFrom<String> for Serial {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
impl From<Serial> for String {
    fn from(serial: Serial) -> Self {
        serial.0
    }
}
impl Display for Serial {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Video standard/market, derived from the serial prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    NtscU,
    NtscJ,
    NtscK,
    Pal,
    Unknown,
}
impl Region {
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "SLUS" | "SCUS" => Self::NtscU,
            "SLPS" | "SCPS" | "SLPM" => Self::NtscJ,
            "SLES" | "SCES" => Self::Pal,
            "SLKA" | "SCKA" => Self::NtscK,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NtscU => "NTSC-U",
            Self::NtscJ => "NTSC-J",
            Self::NtscK => "NTSC-K",
            Self::Pal => "PAL",
            Self::Unknown => "Unknown",
        }
    }
}
impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// How the [`GameInfo`] was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Confidence {
    /// Nothing recognisable in the path.
    None,
    /// A path segment contained a keyword associated with a known title.
    Low,
    /// A path segment spelled out a known title.
    Medium,
    /// A disc serial appeared in the path.
    High,
}
impl Display for Confidence {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameInfo {
    pub title: Option<String>,
    pub serial: Option<Serial>,
    pub confidence: Confidence,
}
impl GameInfo {
    pub fn unknown() -> Self {
        Self { title: None, serial: None, confidence: Confidence::None }
    }

    pub fn region(&self) -> Option<Region> {
        self.serial.as_ref().map(Serial::region)
    }

    pub fn is_known(&self) -> bool {
        self.confidence != Confidence::None
    }
}
impl Display for GameInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (&self.title, &self.serial) {
            (Some(title), Some(serial)) => write!(f, "{title} [{serial}, {}]", serial.region())?,
            (Some(title), None) => write!(f, "{title}")?,
            (None, Some(serial)) => write!(f, "unknown title [{serial}, {}]", serial.region())?,
            (None, None) => write!(f, "unknown game")?,
        }
        write!(f, " (confidence: {})", self.confidence)
    }
}

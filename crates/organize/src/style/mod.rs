//! Organization styles.
//!
//! A style turns a [`TextureInfo`] into the folders a file is placed under,
//! outermost first; the filename itself is appended by the engine. Every
//! style except [`Custom`](OrganizationStyle::Custom) is a fixed layout.
//!
//! | Style            | Folders                                                        |
//! |------------------|----------------------------------------------------------------|
//! | `sims`           | gender / skin / body part / variant                            |
//! | `neopets`        | category / subtype                                             |
//! | `flat`           | category                                                       |
//! | `game_area`      | level / area / category                                        |
//! | `asset_pipeline` | category / resolution bucket / EXTENSION                       |
//! | `modular`        | module / category                                              |
//! | `minimalist`     | category                                                       |
//! | `maximum_detail` | category / subtype / gender / skin / lod / variant             |
//! | `custom`         | one folder per template segment                                |
//!
//! Segments are sanitized for every major filesystem, a category containing
//! `/` spreads over several folders, and segments that end up empty are
//! dropped.

mod custom;

pub use self::custom::{CustomStyle, FIELDS};
use crate::error::{ErrorKind, Result};
use crate::texture::TextureInfo;
use derive_more::Display;
use std::str::FromStr;
use texsort_storage::sanitize_segment;
use tracing::instrument;

const UNKNOWN: &str = "unknown";
const DEFAULT_VARIANT: &str = "default";
const NO_LOD: &str = "nolod";
const GENERAL: &str = "general";

/// The name of a style, without any configuration.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StyleKind {
    #[display("sims")]
    Sims,
    #[display("neopets")]
    Neopets,
    #[display("flat")]
    Flat,
    #[display("game_area")]
    GameArea,
    #[display("asset_pipeline")]
    AssetPipeline,
    #[display("modular")]
    Modular,
    #[display("minimalist")]
    Minimalist,
    #[display("maximum_detail")]
    MaximumDetail,
    #[display("custom")]
    Custom,
}
impl StyleKind {
    pub const ALL: [Self; 9] = [
        Self::Sims,
        Self::Neopets,
        Self::Flat,
        Self::GameArea,
        Self::AssetPipeline,
        Self::Modular,
        Self::Minimalist,
        Self::MaximumDetail,
        Self::Custom,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Self::Sims => "character traits: gender, skin tone, body part, variant",
            Self::Neopets => "collectible families: category, then base name",
            Self::Flat => "one folder per category, LODs included",
            Self::GameArea => "level, area, then category",
            Self::AssetPipeline => "category, resolution tier, file format",
            Self::Modular => "game system (characters, vehicles, ui, items, environment), then category",
            Self::Minimalist => "one folder per category, no variant folders",
            Self::MaximumDetail => "every detected attribute as its own folder",
            Self::Custom => "user-defined folder templates",
        }
    }
}
impl FromStr for StyleKind {
    type Err = ErrorKind;

    /// Accepts the snake_case name, with `-` or spaces in place of `_`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string() == normalized)
            .ok_or_else(|| ErrorKind::InvalidOption(format!("unknown style `{s}`")))
    }
}

/// A style ready to resolve paths.
#[derive(Debug, Clone)]
pub enum OrganizationStyle {
    Sims,
    Neopets,
    Flat,
    GameArea,
    AssetPipeline,
    Modular,
    Minimalist,
    MaximumDetail,
    Custom(CustomStyle),
}

impl OrganizationStyle {
    /// Builds the style named by `kind`. `template` is only used by
    /// [`StyleKind::Custom`], whose segments are compiled here.
    pub fn new<S: AsRef<str>>(kind: StyleKind, template: &[S]) -> Result<Self> {
        Ok(match kind {
            StyleKind::Sims => Self::Sims,
            StyleKind::Neopets => Self::Neopets,
            StyleKind::Flat => Self::Flat,
            StyleKind::GameArea => Self::GameArea,
            StyleKind::AssetPipeline => Self::AssetPipeline,
            StyleKind::Modular => Self::Modular,
            StyleKind::Minimalist => Self::Minimalist,
            StyleKind::MaximumDetail => Self::MaximumDetail,
            StyleKind::Custom => Self::Custom(CustomStyle::new(template)?),
        })
    }

    pub fn kind(&self) -> StyleKind {
        match self {
            Self::Sims => StyleKind::Sims,
            Self::Neopets => StyleKind::Neopets,
            Self::Flat => StyleKind::Flat,
            Self::GameArea => StyleKind::GameArea,
            Self::AssetPipeline => StyleKind::AssetPipeline,
            Self::Modular => StyleKind::Modular,
            Self::Minimalist => StyleKind::Minimalist,
            Self::MaximumDetail => StyleKind::MaximumDetail,
            Self::Custom(_) => StyleKind::Custom,
        }
    }

    /// Folders for `texture`, outermost first. May be empty if every segment
    /// sanitized away; the engine treats that as fatal.
    #[instrument(level = "debug", skip_all, fields(style = %self.kind(), file = %texture.filename), ret)]
    pub fn resolve_path(&self, texture: &TextureInfo) -> Result<Vec<String>> {
        let category = texture.category.clone();
        let gender = || texture.gender().unwrap_or(UNKNOWN).to_string();
        let skin = || texture.skin().unwrap_or(UNKNOWN).to_string();
        let variant = || texture.variant().unwrap_or(DEFAULT_VARIANT).to_string();

        let segments = match self {
            Self::Sims => vec![
                gender(),
                skin(),
                texture.body_part().map_or_else(|| category.clone(), str::to_string),
                variant(),
            ],
            Self::Neopets => {
                let subtype = texture.subtype().map_or_else(|| category.clone(), str::to_string);
                vec![category, subtype]
            },
            Self::Flat | Self::Minimalist => vec![category],
            Self::GameArea => vec![
                texture.level().unwrap_or_else(|| UNKNOWN.to_string()),
                texture.area().unwrap_or(UNKNOWN).to_string(),
                category,
            ],
            Self::AssetPipeline => vec![
                category,
                texture.resolution_bucket().to_string(),
                texture.extension.as_deref().unwrap_or(UNKNOWN).to_uppercase(),
            ],
            Self::Modular => vec![texture.module().to_string(), category],
            Self::MaximumDetail => vec![
                category.clone(),
                texture.subtype().unwrap_or(GENERAL).to_string(),
                gender(),
                skin(),
                texture.lod_level.as_deref().map_or_else(|| NO_LOD.to_string(), |lod| format!("lod{lod}")),
                variant(),
            ],
            Self::Custom(custom) => custom.render(texture)?,
        };
        Ok(normalize(segments))
    }
}

/// Splits on `/`, sanitizes each piece and drops the empty ones.
fn normalize(segments: Vec<String>) -> Vec<String> {
    segments
        .iter()
        .flat_map(|segment| segment.split('/'))
        .map(sanitize_segment)
        .filter(|segment| !segment.is_empty())
        .collect()
}

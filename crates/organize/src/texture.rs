//! Per-file descriptor the organization styles work from.

use std::collections::BTreeSet;
use std::path::PathBuf;
use texsort_identify::GameInfo;
use texsort_learning::pattern::{COLOR_WORDS, GENDER_WORDS};

use crate::consts::{LEVEL_REGEX, LOD_REGEX, NUMERIC_VARIANT_REGEX, RESOLUTION_REGEX};

/// Category used when neither a suggestion, a decision nor the classifier
/// names one.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Colour words that double as skin tones, in the order they are preferred.
const SKIN_TONES: &[&str] = &["black", "white", "brown", "tan", "light", "medium", "dark", "pale", "olive"];

const BODY_PARTS: &[(&str, &[&str])] = &[
    ("head", &["head", "face", "eye", "eyes", "mouth", "teeth", "hair"]),
    ("torso", &["body", "torso", "chest", "top", "shirt"]),
    ("arms", &["arm", "arms", "hand", "hands", "glove", "gloves"]),
    ("legs", &["leg", "legs", "pants", "bottom"]),
    ("feet", &["foot", "feet", "shoe", "shoes", "boot", "boots"]),
];

const AREAS: &[(&str, &[&str])] = &[
    ("downtown", &["downtown", "city", "urban"]),
    ("residential", &["residential", "house", "home"]),
    ("industrial", &["industrial", "factory", "warehouse"]),
    ("park", &["park", "garden", "outdoor"]),
    ("interior", &["interior", "indoor", "inside"]),
];

const MODULES: &[(&str, &[&str])] = &[
    ("characters", &["character", "npc", "player", "body", "face", "hair", "skin"]),
    ("vehicles", &["vehicle", "car", "bike", "plane", "boat"]),
    ("ui", &["ui", "hud", "menu", "button", "icon", "interface", "font"]),
    ("items", &["weapon", "gun", "sword", "item"]),
];
const DEFAULT_MODULE: &str = "environment";

/// Everything known about one texture while it is being placed.
///
/// Built from the file's path when processing starts; the engine then fills
/// in what the classifier and the operator decided. Variant detection runs
/// once, in [`new`](Self::new).
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    /// Relative to the source root.
    pub path: PathBuf,
    pub filename: String,
    /// Lowercase, without the dot.
    pub extension: Option<String>,
    /// The classifier's best category, if it had one.
    pub detected_category: Option<String>,
    pub classifier_confidence: Option<f64>,
    /// Folder the file was assigned to; may contain `/`.
    pub category: String,
    pub lod_level: Option<String>,
    /// `male`/`female`, colour words and `variant_NN` markers.
    pub variant_tags: BTreeSet<String>,
    /// Only known when the filename spells it out (`wall_1024x512.png`).
    pub resolution: Option<(u32, u32)>,
    pub game: GameInfo,
}

impl TextureInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let (stem, extension) = split_extension(&filename);
        let extension = extension.map(str::to_lowercase);

        let lod_level = LOD_REGEX.captures(stem).map(|c| c[1].to_string());
        let resolution = RESOLUTION_REGEX.captures(stem).and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)));
        let mut variant_tags: BTreeSet<String> = tokens(stem)
            .filter(|token| GENDER_WORDS.contains(&token.as_str()) || COLOR_WORDS.contains(&token.as_str()))
            .collect();
        if let Some(number) = NUMERIC_VARIANT_REGEX.captures(stem) {
            variant_tags.insert(format!("variant_{}", &number[1]));
        }

        Self {
            path,
            filename,
            extension,
            detected_category: None,
            classifier_confidence: None,
            category: UNCATEGORIZED.to_string(),
            lod_level,
            variant_tags,
            resolution,
            game: GameInfo::unknown(),
        }
    }

    pub fn with_game(mut self, game: GameInfo) -> Self {
        self.game = game;
        self
    }

    /// The filename without its extension.
    pub fn stem(&self) -> &str {
        split_extension(&self.filename).0
    }

    pub fn gender(&self) -> Option<&str> {
        GENDER_WORDS.iter().copied().find(|g| self.variant_tags.contains(*g))
    }

    pub fn skin(&self) -> Option<&str> {
        SKIN_TONES.iter().copied().find(|tone| self.variant_tags.contains(*tone))
    }

    /// The numeric variant marker, else the first colour that is not a skin
    /// tone.
    pub fn variant(&self) -> Option<&str> {
        self.variant_tags
            .iter()
            .map(String::as_str)
            .find(|tag| tag.starts_with("variant_"))
            .or_else(|| {
                COLOR_WORDS
                    .iter()
                    .copied()
                    .find(|color| !SKIN_TONES.contains(color) && self.variant_tags.contains(*color))
            })
    }

    /// The base name shared by a family of textures: the stem up to its last
    /// underscore (`blumaroo_red` → `blumaroo`).
    pub fn subtype(&self) -> Option<&str> {
        self.stem().rsplit_once('_').map(|(base, _)| base.trim()).filter(|base| !base.is_empty())
    }

    pub fn body_part(&self) -> Option<&'static str> {
        lookup(BODY_PARTS, tokens(self.stem()))
    }

    /// `level_01` style folder name for `level1`, `lvl_3`, `l12`, ...
    pub fn level(&self) -> Option<String> {
        let number: u32 = LEVEL_REGEX.captures(self.stem())?[1].parse().ok()?;
        Some(format!("level_{number:02}"))
    }

    pub fn area(&self) -> Option<&'static str> {
        lookup(AREAS, tokens(self.stem()))
    }

    /// Which game system the assigned category belongs to.
    pub fn module(&self) -> &'static str {
        lookup(MODULES, tokens(&self.category)).unwrap_or(DEFAULT_MODULE)
    }

    pub fn resolution_bucket(&self) -> &'static str {
        match self.resolution.map(|(w, h)| w.max(h)) {
            None => "unknown",
            Some(4096..) => "4k",
            Some(2048..) => "2k",
            Some(1024..) => "1k",
            Some(512..) => "512",
            Some(_) => "low",
        }
    }
}

fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(dot) if dot > 0 => (&filename[..dot], Some(&filename[dot + 1..])),
        _ => (filename, None),
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(['_', '-', '.', ' ', '/']).filter(|t| !t.is_empty()).map(str::to_lowercase)
}

/// First table row with a keyword that starts one of the tokens.
fn lookup(table: &[(&'static str, &[&str])], tokens: impl Iterator<Item = String>) -> Option<&'static str> {
    let tokens: Vec<String> = tokens.collect();
    table
        .iter()
        .find(|(_, words)| tokens.iter().any(|t| words.iter().any(|w| t.starts_with(w))))
        .map(|(name, _)| *name)
}

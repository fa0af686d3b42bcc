//! User-defined folder layouts.
//!
//! Each segment is either a bare field name (`category`) or an [upon]
//! template over the same fields (`{{ game|slug }}-{{ serial }}`), extended
//! with path-friendly helpers:
//!
//! - **`slug`**: URL-safe slug, quotation marks stripped first.
//! - **`upper`** / **`lower`**: change case.
//! - **`truncate`**: cut to a byte length at a character boundary, as
//!   `truncate(value, n)` or `{{ value|truncate: n }}`.
//!
//! # Fields
//!
//! | Field        | Example       | Missing value |
//! |--------------|---------------|---------------|
//! | `category`   | `character`   | -             |
//! | `subtype`    | `kratos_head` | `unknown`     |
//! | `gender`     | `male`        | `unknown`     |
//! | `skin`       | `tan`         | `unknown`     |
//! | `variant`    | `variant_02`  | `unknown`     |
//! | `lod`        | `lod0`        | `unknown`     |
//! | `extension`  | `png`         | `unknown`     |
//! | `resolution` | `1024x512`    | `unknown`     |
//! | `level`      | `level_01`    | `unknown`     |
//! | `area`       | `downtown`    | `unknown`     |
//! | `module`     | `characters`  | -             |
//! | `game`       | `God of War`  | `unknown`     |
//! | `serial`     | `SLUS-20917`  | `unknown`     |
//!
//! `format` is accepted as another name for `extension`, and a `filename`
//! segment is skipped because the file name is always appended last. Any
//! other name, bare or inside a template, renders as `unknown`.

use crate::consts::{IDENTIFIER_REGEX, TEMPLATE_TAG_REGEX};
use crate::error::{ErrorKind, Result};
use crate::texture::TextureInfo;
use exn::ResultExt;
use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use upon::{Engine, Template};

pub const FIELDS: [&str; 13] = [
    "category",
    "subtype",
    "gender",
    "skin",
    "variant",
    "lod",
    "extension",
    "resolution",
    "level",
    "area",
    "module",
    "game",
    "serial",
];

const MISSING: &str = "unknown";

struct Compiled {
    engine: Engine<'static>,
    templates: Vec<Template<'static>>,
    sources: Vec<String>,
    /// Names used by the templates that no texture provides.
    undefined: BTreeSet<String>,
}

/// Compiled segment templates. Cheap to clone.
///
/// Templates compile in [`new`](Self::new), so a typo is reported before a
/// run starts rather than on its first file.
#[derive(Clone)]
pub struct CustomStyle {
    compiled: Arc<Compiled>,
}
impl Debug for CustomStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CustomStyle").field("segments", &self.compiled.sources).finish()
    }
}

impl CustomStyle {
    pub fn new<S: AsRef<str>>(segments: &[S]) -> Result<Self> {
        if segments.is_empty() {
            exn::bail!(ErrorKind::Template("a custom style needs at least one segment".to_string()));
        }
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let mut templates = Vec::with_capacity(segments.len());
        let mut sources = Vec::with_capacity(segments.len());
        let mut undefined = BTreeSet::new();
        for segment in segments {
            let Some(source) = expand(segment.as_ref()) else {
                continue;
            };
            let template = engine
                .compile(source.clone())
                .or_raise(|| ErrorKind::Template(format!("cannot compile `{}`", segment.as_ref())))?;
            undefined.extend(undefined_names(&source));
            templates.push(template);
            sources.push(source);
        }
        if templates.is_empty() {
            exn::bail!(ErrorKind::Template("a custom style needs at least one folder segment".to_string()));
        }
        Ok(Self { compiled: Arc::new(Compiled { engine, templates, sources, undefined }) })
    }

    /// The segments as compiled, bare field names expanded to templates.
    pub fn segments(&self) -> &[String] {
        &self.compiled.sources
    }

    pub(crate) fn render(&self, texture: &TextureInfo) -> Result<Vec<String>> {
        let Compiled { engine, templates, sources, undefined } = self.compiled.as_ref();
        let mut values = parameters(texture);
        if let upon::Value::Map(map) = &mut values {
            for name in undefined {
                map.insert(name.clone(), upon::Value::String(MISSING.to_string()));
            }
        }
        templates
            .iter()
            .zip(sources)
            .map(|(template, source)| {
                template
                    .render(engine, &values)
                    .to_string()
                    .or_raise(|| ErrorKind::Template(format!("cannot render `{source}`")))
            })
            .collect()
    }
}

/// A bare field name becomes `{{ name }}`, an unknown one the literal
/// `unknown`. `None` for segments that produce no folder.
fn expand(segment: &str) -> Option<String> {
    let trimmed = segment.trim();
    if trimmed.contains("{{") || trimmed.contains("{%") {
        return Some(trimmed.to_string());
    }
    let name = match trimmed.to_lowercase().as_str() {
        "filename" => return None,
        "format" => "extension".to_string(),
        name if FIELDS.contains(&name) => name.to_string(),
        _ => {
            tracing::warn!(field = trimmed, "Unknown custom style field, rendering as `unknown`");
            return Some(MISSING.to_string());
        },
    };
    Some(format!("{{{{ {name} }}}}"))
}

/// Identifiers inside template tags that are not [`FIELDS`]. Formatter and
/// function names end up here too, which is harmless.
fn undefined_names(source: &str) -> Vec<String> {
    TEMPLATE_TAG_REGEX
        .captures_iter(source)
        .filter_map(|tag| tag.get(1))
        .flat_map(|inner| IDENTIFIER_REGEX.find_iter(inner.as_str()))
        .map(|name| name.as_str())
        .filter(|name| !FIELDS.contains(name))
        .map(str::to_string)
        .collect()
}

fn parameters(texture: &TextureInfo) -> upon::Value {
    let or_missing = |value: Option<&str>| value.unwrap_or(MISSING).to_string();
    upon::value! {
        category: texture.category.clone(),
        subtype: or_missing(texture.subtype()),
        gender: or_missing(texture.gender()),
        skin: or_missing(texture.skin()),
        variant: or_missing(texture.variant()),
        lod: texture.lod_level.as_deref().map_or_else(|| MISSING.to_string(), |lod| format!("lod{lod}")),
        extension: or_missing(texture.extension.as_deref()),
        resolution: texture.resolution.map_or_else(|| MISSING.to_string(), |(w, h)| format!("{w}x{h}")),
        level: texture.level().unwrap_or_else(|| MISSING.to_string()),
        area: or_missing(texture.area()),
        module: texture.module(),
        game: or_missing(texture.game.title.as_deref()),
        serial: or_missing(texture.game.serial.as_ref().map(|s| s.as_str())),
    }
}

/// Custom [`upon`] extensions for path-safe string manipulation.
mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Strips quotation marks before slugifying, so `"hello"` does not come
    /// out as `-hello-`.
    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                let marks = [
                    '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}',
                    '\u{0060}', '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
                ];
                let stripped: String = s.chars().filter(|c| !marks.contains(c)).collect();
                write!(f, "{}", slugify!(&stripped))?
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    fn upper_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => write!(f, "{}", s.to_uppercase())?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    fn lower_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => write!(f, "{}", s.to_lowercase())?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> String {
        s[..s.floor_char_boundary(max_bytes)].to_string()
    }

    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("slug", slug_formatter);
        engine.add_formatter("upper", upper_formatter);
        engine.add_formatter("lower", lower_formatter);
        engine.add_function("truncate", truncate_to_char_boundary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use texsort_identify::{Confidence, GameInfo, Serial};

    fn texture() -> TextureInfo {
        let mut texture = TextureInfo::new("chars/Kratos_Head_02_lod1.PNG").with_game(GameInfo {
            title: Some("God of War II".to_string()),
            serial: Some("SLUS-20917".parse::<Serial>().unwrap()),
            confidence: Confidence::High,
        });
        texture.category = "character".to_string();
        texture
    }

    fn render(segments: &[&str], texture: &TextureInfo) -> Vec<String> {
        CustomStyle::new(segments).unwrap().render(texture).unwrap()
    }

    #[rstest]
    #[case(&["category", "extension"], &["character", "png"])]
    #[case(&["Category", " lod "], &["character", "lod1"])]
    #[case(&["game", "serial"], &["God of War II", "SLUS-20917"])]
    #[case(&["{{ game|slug }}", "{{ extension|upper }}"], &["god-of-war-ii", "PNG"])]
    #[case(&["{{ serial|lower }}-{{ module }}"], &["slus-20917-characters"])]
    #[case(&["{{ truncate(game, 6)|slug }}"], &["god-of"])]
    #[case(&["{{ game|truncate: 3 }}"], &["God"])]
    #[case(&["resolution", "skin", "gender"], &["unknown", "unknown", "unknown"])]
    fn test_render(#[case] segments: &[&str], #[case] expected: &[&str]) {
        assert_eq!(render(segments, &texture()), expected);
    }

    #[test]
    fn test_missing_game_renders_unknown() {
        let mut texture = TextureInfo::new("wall.png");
        texture.category = "environment".to_string();
        assert_eq!(render(&["game", "serial", "level"], &texture), ["unknown", "unknown", "unknown"]);
    }

    #[rstest]
    #[case(&["{{ category"])]
    #[case(&["{{ category }"])]
    #[case(&["filename"])]
    #[case(&[])]
    fn test_rejects_bad_segments(#[case] segments: &[&str]) {
        assert!(CustomStyle::new(segments).is_err());
    }

    #[rstest]
    #[case(&["category", "colour"], &["character", "unknown"])]
    #[case(&["category", "format", "filename"], &["character", "png"])]
    #[case(&["category", "{{ colour }}"], &["character", "unknown"])]
    #[case(&["{{ colour|upper }}-{{ lod }}"], &["UNKNOWN-lod1"])]
    fn test_unknown_fields_render_unknown(#[case] segments: &[&str], #[case] expected: &[&str]) {
        assert_eq!(render(segments, &texture()), expected);
    }

    #[test]
    fn test_segments_are_expanded() {
        let style = CustomStyle::new(&["category", "{{ lod|upper }}"]).unwrap();
        assert_eq!(style.segments(), ["{{ category }}", "{{ lod|upper }}"]);
        let style = CustomStyle::new(&["Format", "skin_tone", "filename"]).unwrap();
        assert_eq!(style.segments(), ["{{ extension }}", "unknown"]);
    }
}

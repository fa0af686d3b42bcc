//! Filename generalization.
//!
//! A learned mapping is keyed by a generalized filename rather than the
//! filename itself, so that one correction covers every numbered or coloured
//! sibling of a texture. Digit runs become `*`; whole segments naming a colour,
//! gender or body side become a typed wildcard (`<color>`, `<gender>`, `<side>`).
//!
//! | filename                  | pattern                       |
//! |---------------------------|-------------------------------|
//! | `kratos_head_02.png`      | `kratos_head_*.png`           |
//! | `kratos_head_02_red.png`  | `kratos_head_*_<color>.png`   |
//! | `Body_Female_L.DDS`       | `body_<gender>_<side>.dds`    |

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::LazyLock;
use tracing::instrument;

use crate::error::ErrorKind;

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

const SEPARATORS: &[char] = &['_', '-', '.', ' '];
const WILDCARD: char = '*';

/// Colour names, including the skin tones texture packs use for variants.
pub const COLOR_WORDS: &[&str] = &[
    "black", "white", "brown", "tan", "red", "blue", "green", "yellow", "orange", "purple", "pink", "gray", "grey",
    "light", "medium", "dark", "pale", "olive",
];
pub const GENDER_WORDS: &[&str] = &["male", "female"];
pub const SIDE_WORDS: &[&str] = &["l", "r", "left", "right"];

/// A typed wildcard standing for one whole segment drawn from a vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    Color,
    Gender,
    Side,
}
impl Wildcard {
    pub const ALL: [Self; 3] = [Self::Color, Self::Gender, Self::Side];

    pub fn token(&self) -> &'static str {
        match self {
            Self::Color => "<color>",
            Self::Gender => "<gender>",
            Self::Side => "<side>",
        }
    }

    pub fn words(&self) -> &'static [&'static str] {
        match self {
            Self::Color => COLOR_WORDS,
            Self::Gender => GENDER_WORDS,
            Self::Side => SIDE_WORDS,
        }
    }

    /// Which vocabulary (if any) a whole segment belongs to.
    pub fn classify(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.words().iter().any(|word| word.eq_ignore_ascii_case(segment)))
    }

    fn alternation(&self) -> String {
        format!("(?:{})", self.words().join("|"))
    }
}

/// Generalizes a filename into its learning pattern.
///
/// Pure and deterministic. Any directory part is ignored, the result is
/// lowercase, the extension is kept verbatim.
#[instrument(level = "trace", ret)]
pub fn generalize(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename).to_lowercase();
    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name.as_str(), ""),
    };
    let mut pattern = String::with_capacity(name.len());
    let mut rest = stem;
    while let Some(split) = rest.find(SEPARATORS) {
        pattern.push_str(&generalize_segment(&rest[..split]));
        // Separators are all single byte.
        pattern.push_str(&rest[split..=split]);
        rest = &rest[split + 1..];
    }
    pattern.push_str(&generalize_segment(rest));
    pattern.push_str(extension);
    pattern
}

fn generalize_segment(segment: &str) -> String {
    if segment.is_empty() {
        return String::new();
    }
    match Wildcard::classify(segment) {
        Some(wildcard) => wildcard.token().to_string(),
        None => DIGIT_RUN.replace_all(segment, "*").into_owned(),
    }
}

/// A generalized filename together with its compiled matcher.
///
/// Serialized as the plain pattern text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    text: String,
    matcher: Regex,
}
impl Pattern {
    /// The pattern for `filename`.
    pub fn of(filename: &str) -> Result<Self, ErrorKind> {
        Self::parse(generalize(filename))
    }

    /// Parses stored pattern text.
    pub fn parse(text: impl Into<String>) -> Result<Self, ErrorKind> {
        let text = text.into();
        if text.is_empty() {
            return Err(ErrorKind::InvalidEntry("empty pattern".to_string()));
        }
        let matcher = Self::compile(&text).map_err(|e| ErrorKind::InvalidEntry(format!("pattern `{text}`: {e}")))?;
        Ok(Self { text, matcher })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether `filename` (any directory part ignored, case-insensitive) fits
    /// this pattern. `*` matches any run of characters, typed wildcards match
    /// one word of their vocabulary.
    pub fn matches(&self, filename: &str) -> bool {
        let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
        self.matcher.is_match(name)
    }

    fn compile(text: &str) -> Result<Regex, regex::Error> {
        let mut source = String::from("^");
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            if c == WILDCARD {
                source.push_str(".*");
                rest = &rest[1..];
            } else if let Some(wildcard) = Wildcard::ALL.into_iter().find(|w| rest.starts_with(w.token())) {
                source.push_str(&wildcard.alternation());
                rest = &rest[wildcard.token().len()..];
            } else {
                let width = c.len_utf8();
                source.push_str(&regex::escape(&rest[..width]));
                rest = &rest[width..];
            }
        }
        source.push('$');
        RegexBuilder::new(&source).case_insensitive(true).build()
    }
}
impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}
impl Eq for Pattern {}
impl TryFrom<String> for Pattern {
    type Error = ErrorKind;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.text
    }
}
impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("kratos_head_02.png", "kratos_head_*.png")]
    #[case("kratos_head_02_red.png", "kratos_head_*_<color>.png")]
    #[case("kratos_head_05_blue.png", "kratos_head_*_<color>.png")]
    #[case("Body_Female_Dark_03.DDS", "body_<gender>_<color>_*.dds")]
    #[case("arm_L.tga", "arm_<side>.tga")]
    #[case("lod0_rock12b.png", "lod*_rock*b.png")]
    #[case("tex 01-02.png", "tex *-*.png")]
    #[case("chars/kratos/kratos_head_02.png", "kratos_head_*.png")]
    #[case("README", "readme")]
    #[case(".hidden", ".hidden")]
    #[case("redshift.png", "redshift.png")]
    fn test_generalize(#[case] filename: &str, #[case] expected: &str) {
        assert_eq!(generalize(filename), expected);
    }

    #[test]
    fn test_generalize_is_deterministic() {
        for name in ["kratos_head_02.png", "a_b_c_1_2_3.dds", "Male_R_Green_0007.tga"] {
            assert_eq!(generalize(name), generalize(name));
        }
    }

    #[test]
    fn test_siblings_share_pattern() {
        assert_eq!(generalize("kratos_head_02_red.png"), generalize("kratos_head_05_blue.png"));
        assert_ne!(generalize("kratos_head_02.png"), generalize("kratos_body_02.png"));
    }

    #[rstest]
    #[case("kratos_head_02.png", "kratos_head_05.png", true)]
    #[case("kratos_head_02.png", "KRATOS_HEAD_123.PNG", true)]
    #[case("kratos_head_02.png", "kratos_body_02.png", false)]
    #[case("kratos_head_02.png", "kratos_head_02.dds", false)]
    #[case("arm_L.tga", "arm_right.tga", true)]
    #[case("arm_L.tga", "arm_x.tga", false)]
    #[case("skin_female_01.png", "skin_male_07.png", true)]
    fn test_matches(#[case] learned: &str, #[case] candidate: &str, #[case] expected: bool) {
        assert_eq!(Pattern::of(learned).unwrap().matches(candidate), expected);
    }

    #[test]
    fn test_pattern_matches_its_own_filename() {
        for name in ["kratos_head_02_red.png", "Body_Female_Dark_03.DDS", "a+b(1).png", "[ui] icon.tga"] {
            assert!(Pattern::of(name).unwrap().matches(name), "{name}");
        }
    }

    #[test]
    fn test_parse_round_trip_and_errors() {
        let pattern = Pattern::parse("kratos_head_*_<color>.png").unwrap();
        assert!(pattern.matches("kratos_head_9_tan.png"));
        assert_eq!(String::from(pattern.clone()), "kratos_head_*_<color>.png");
        assert!(matches!(Pattern::parse(""), Err(ErrorKind::InvalidEntry(_))));
    }
}

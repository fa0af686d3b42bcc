//! Game identification from texture dump paths.
//!
//! Emulators write texture dumps into folders named after the disc serial
//! (`.../textures/SLUS-20917/...`), so the serial is the most reliable hint.
//! Without one, folder names spelling out a known title, or containing a
//! keyword associated with one, give weaker guesses.

mod consts;
pub mod error;
mod known;
pub mod models;

use std::path::{Component, Path};
use std::sync::Arc;
use tracing::instrument;

pub use crate::known::{KnownGame, KnownGames, TitleLookup};
pub use crate::models::{Confidence, GameInfo, Region, Serial};

/// Identifies `path` against the built-in [`KnownGames`] table.
pub fn identify(path: impl AsRef<Path>) -> GameInfo {
    Identifier::default().identify(path)
}

/// Path → [`GameInfo`] with an injectable title table.
#[derive(Clone)]
pub struct Identifier {
    lookup: Arc<dyn TitleLookup>,
}
impl Default for Identifier {
    fn default() -> Self {
        Self::new(Arc::new(KnownGames::builtin()))
    }
}
impl Identifier {
    pub fn new(lookup: Arc<dyn TitleLookup>) -> Self {
        Self { lookup }
    }

    /// Never fails; an unrecognisable path yields [`GameInfo::unknown`].
    ///
    /// When several segments carry a serial, the deepest one wins.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn identify(&self, path: impl AsRef<Path>) -> GameInfo {
        let segments: Vec<&str> = path
            .as_ref()
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();

        let serial = segments.iter().rev().find_map(|segment| Serial::find(segment));
        let info = match serial {
            Some(serial) => {
                let title = match self.lookup.by_serial(&serial) {
                    Some(game) => Some(game.title.clone()),
                    None => self.guess_title(&segments).map(|(title, _)| title),
                };
                GameInfo { title, serial: Some(serial), confidence: Confidence::High }
            },
            None => match self.guess_title(&segments) {
                Some((title, confidence)) => GameInfo { title: Some(title), serial: None, confidence },
                None => GameInfo::unknown(),
            },
        };
        if info.is_known() {
            tracing::debug!(game = %info, "Identified game");
        }
        info
    }

    /// Best title guess from folder names alone. An exact title match on any
    /// segment beats a keyword hit.
    fn guess_title(&self, segments: &[&str]) -> Option<(String, Confidence)> {
        let games = self.lookup.all();
        let normalised: Vec<String> = segments.iter().map(|s| normalise(s)).collect();
        for game in &games {
            let title = normalise(&game.title);
            if normalised.iter().any(|segment| !segment.is_empty() && *segment == title) {
                return Some((game.title.clone(), Confidence::Medium));
            }
        }
        for segment in segments {
            let tokens = tokens(segment);
            for game in &games {
                if game.keywords.iter().any(|keyword| tokens.iter().any(|token| token.starts_with(keyword.as_str()))) {
                    return Some((game.title.clone(), Confidence::Low));
                }
            }
        }
        None
    }
}

/// Lowercase with everything except letters and digits removed, so that
/// `God_of_War_II`, `god-of-war-ii` and `God of War II` compare equal.
fn normalise(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

fn tokens(segment: &str) -> Vec<String> {
    segment.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).map(str::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_serial_in_path_is_high_confidence() {
        let info = identify("/home/me/pcsx2/textures/SLUS-20917/textures/foo.png");
        assert_eq!(info.serial.as_ref().map(Serial::as_str), Some("SLUS-20917"));
        assert_eq!(info.title.as_deref(), Some("God of War II"));
        assert_eq!(info.confidence, Confidence::High);
        assert_eq!(info.region(), Some(Region::NtscU));
    }

    #[test]
    fn test_nothing_recognisable() {
        let info = identify("/data/random_folder/foo.png");
        assert_eq!(info, GameInfo::unknown());
        assert_eq!(info.title, None);
        assert_eq!(info.serial, None);
        assert_eq!(info.confidence, Confidence::None);
    }

    #[test]
    fn test_unknown_serial_is_still_high() {
        let info = identify("dumps/SCES_500.51/replacements");
        assert_eq!(info.serial.as_ref().map(Serial::as_str), Some("SCES-50051"));
        assert_eq!(info.title, None);
        assert_eq!(info.confidence, Confidence::High);
    }

    #[test]
    fn test_deepest_serial_wins() {
        let info = identify("SLUS-20917/imports/SLUS-20778/tex.png");
        assert_eq!(info.serial.as_ref().map(Serial::as_str), Some("SLUS-20778"));
        assert_eq!(info.title.as_deref(), Some("God of War"));
    }

    #[rstest]
    #[case("textures/God of War II/foo.png", "God of War II")]
    #[case("textures/god_of_war_ii/foo.png", "God of War II")]
    #[case("Final-Fantasy-X-2/ui", "Final Fantasy X-2")]
    fn test_title_segment_is_medium(#[case] path: &str, #[case] title: &str) {
        let info = identify(path);
        assert_eq!(info.title.as_deref(), Some(title));
        assert_eq!(info.confidence, Confidence::Medium);
        assert_eq!(info.serial, None);
    }

    #[test]
    fn test_keyword_is_low() {
        let info = identify("dump/olympus_gate/wall_01.png");
        assert_eq!(info.title.as_deref(), Some("God of War II"));
        assert_eq!(info.confidence, Confidence::Low);
    }

    #[test]
    fn test_injected_lookup() {
        let mut games = KnownGames::empty();
        games.add(KnownGame::new("SLES-12345".parse().unwrap(), "Homebrew Racer", &["racer"]));
        let identifier = Identifier::new(Arc::new(games));
        let info = identifier.identify("SLES-12345/x.png");
        assert_eq!(info.title.as_deref(), Some("Homebrew Racer"));
        // The built-in table is not consulted.
        let info = identifier.identify("SLUS-20917/x.png");
        assert_eq!(info.title, None);
        assert_eq!(identifier.identify("racer_cars/x.png").confidence, Confidence::Low);
    }

    #[test]
    fn test_identify_is_deterministic() {
        let path = "SLUS_209.17/kratos";
        assert_eq!(identify(path), identify(path));
    }
}

//! Table of recognised games.

use std::collections::BTreeMap;

use crate::models::Serial;

/// One recognised game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownGame {
    pub serial: Serial,
    pub title: String,
    /// Lowercase fragments that show up in this game's texture or folder
    /// names, used as a weak hint when no serial is present.
    pub keywords: Vec<String>,
}
impl KnownGame {
    pub fn new(serial: Serial, title: impl Into<String>, keywords: &[&str]) -> Self {
        Self { serial, title: title.into(), keywords: keywords.iter().map(|k| k.to_ascii_lowercase()).collect() }
    }
}

/// Source of serial → title knowledge. Injected into the
/// [`Identifier`](crate::Identifier) so callers can plug in a bigger database.
pub trait TitleLookup: Send + Sync {
    fn by_serial(&self, serial: &Serial) -> Option<&KnownGame>;

    /// Every known game, in a stable order.
    fn all(&self) -> Vec<&KnownGame>;
}

#[derive(Debug, Clone, Default)]
pub struct KnownGames {
    games: BTreeMap<Serial, KnownGame>,
}
impl KnownGames {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        let mut games = Self::empty();
        for (serial, title, keywords) in BUILTIN {
            if let Ok(serial) = serial.parse() {
                games.add(KnownGame::new(serial, *title, keywords));
            }
        }
        games
    }

    /// Registers a game, replacing any previous entry for the same serial.
    pub fn add(&mut self, game: KnownGame) {
        self.games.insert(game.serial.clone(), game);
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl TitleLookup for KnownGames {
    fn by_serial(&self, serial: &Serial) -> Option<&KnownGame> {
        self.games.get(serial)
    }

    /// Sorted by title, then serial.
    fn all(&self) -> Vec<&KnownGame> {
        let mut all: Vec<_> = self.games.values().collect();
        all.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.serial.cmp(&b.serial)));
        all
    }
}

const BUILTIN: &[(&str, &str, &[&str])] = &[
    ("SLUS-20917", "God of War II", &["kratos", "olympus"]),
    ("SLUS-20778", "God of War", &["kratos", "ares"]),
    ("SLUS-20584", "Jak 3", &["jak", "daxter"]),
    ("SLUS-20065", "Jak and Daxter: The Precursor Legacy", &["jak", "daxter"]),
    ("SLUS-20472", "Jak II", &["jak", "daxter"]),
    ("SLUS-20946", "Grand Theft Auto: San Andreas", &["cj", "sanandreas"]),
    ("SLUS-20370", "Kingdom Hearts", &["sora", "heartless"]),
    ("SLUS-21005", "Kingdom Hearts II", &["sora", "nobody"]),
    ("SLUS-20144", "Metal Gear Solid 2: Sons of Liberty", &["snake", "raiden"]),
    ("SLUS-20818", "Metal Gear Solid 3: Snake Eater", &["snake", "boss"]),
    ("SLUS-20312", "Final Fantasy X", &["tidus", "yuna"]),
    ("SLUS-20672", "Final Fantasy X-2", &["yuna", "rikku"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let games = KnownGames::builtin();
        assert_eq!(games.len(), BUILTIN.len());
        let serial: Serial = "SLUS-20917".parse().unwrap();
        assert_eq!(games.by_serial(&serial).unwrap().title, "God of War II");
    }

    #[test]
    fn test_all_is_sorted_by_title() {
        let games = KnownGames::builtin();
        let titles: Vec<_> = games.all().into_iter().map(|g| g.title.as_str()).collect();
        let mut sorted = titles.clone();
        sorted.sort();
        assert_eq!(titles, sorted);
        assert_eq!(titles.first(), Some(&"Final Fantasy X"));
    }

    #[test]
    fn test_add_replaces_same_serial() {
        let mut games = KnownGames::empty();
        let serial: Serial = "SLES-12345".parse().unwrap();
        games.add(KnownGame::new(serial.clone(), "Placeholder", &[]));
        games.add(KnownGame::new(serial.clone(), "Homebrew Racer", &["Racer"]));
        assert_eq!(games.len(), 1);
        let game = games.by_serial(&serial).unwrap();
        assert_eq!(game.title, "Homebrew Racer");
        assert_eq!(game.keywords, vec!["racer".to_string()]);
    }
}

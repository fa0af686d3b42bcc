//! Profile lifecycle: create, load, save, export, import, list.

use exn::ResultExt;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use time::OffsetDateTime;
use time::macros::format_description;
use tokio::fs;
use tracing::instrument;

use crate::crypto::{self, Envelope};
use crate::error::{ErrorKind, Result};
use crate::profile::{ImportSummary, LearningProfile, ProfileStatistics};
use crate::store::{EntrySource, Recorded};
use crate::suggest::{ClassifierHint, Suggestion, SuggestionEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    Unloaded,
    /// Read from disk, unchanged since.
    Loaded,
    /// Changed since the last load or save.
    Dirty,
    /// Written to disk, unchanged since.
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Fold the imported mappings into the active profile.
    Merge,
    /// Discard the active profile in favour of the imported one.
    Replace,
}

/// One row of [`ProfileManager::list_profiles`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub path: PathBuf,
    pub filename: String,
    pub game_name: String,
    pub game_serial: Option<String>,
    pub entry_count: usize,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
struct State {
    status: ProfileStatus,
    profile: Option<LearningProfile>,
    path: Option<PathBuf>,
    /// Bumped on every mutation, so a save racing a `record` can tell whether
    /// what it wrote is still current.
    revision: u64,
}

/// Owner of the active [`LearningProfile`].
///
/// Cheap to clone; clones share the same profile. Suggestion queries take a
/// read lock, `record` and the other mutations take the write lock, and
/// save/export serialize a snapshot taken under the lock so file I/O never
/// blocks a running organizer.
#[derive(Debug, Clone)]
pub struct ProfileManager {
    profiles_dir: PathBuf,
    state: Arc<RwLock<State>>,
}

impl ProfileManager {
    /// `profiles_dir` is where [`save`](Self::save) puts profiles that were
    /// never saved before.
    pub fn new(profiles_dir: impl Into<PathBuf>) -> Self {
        Self {
            profiles_dir: profiles_dir.into(),
            state: Arc::new(RwLock::new(State {
                status: ProfileStatus::Unloaded,
                profile: None,
                path: None,
                revision: 0,
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` to the active profile and marks it dirty.
    fn mutate<R>(&self, change: impl FnOnce(&mut LearningProfile) -> Result<R>) -> Result<R> {
        let mut state = self.write();
        let profile = state.profile.as_mut().ok_or(ErrorKind::NotLoaded)?;
        let result = change(profile)?;
        state.status = ProfileStatus::Dirty;
        state.revision += 1;
        Ok(result)
    }

    pub fn profiles_dir(&self) -> &Path {
        &self.profiles_dir
    }

    pub fn status(&self) -> ProfileStatus {
        self.read().status
    }

    pub fn is_dirty(&self) -> bool {
        self.status() == ProfileStatus::Dirty
    }

    /// Where the active profile was last loaded from or saved to.
    pub fn path(&self) -> Option<PathBuf> {
        self.read().path.clone()
    }

    /// A copy of the active profile.
    pub fn profile(&self) -> Option<LearningProfile> {
        self.read().profile.clone()
    }

    /// Starts a fresh profile, replacing any active one.
    pub fn create(&self, game_name: &str, serial: Option<&str>, author: Option<&str>) -> LearningProfile {
        let profile = LearningProfile::new(game_name, serial.map(str::to_string), author.map(str::to_string));
        let mut state = self.write();
        state.profile = Some(profile.clone());
        state.path = None;
        state.status = ProfileStatus::Dirty;
        state.revision += 1;
        tracing::info!(game = game_name, "Created learning profile");
        profile
    }

    /// Makes the profile at `path` the active one. Encrypted exports must go
    /// through [`import`](Self::import) instead.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<LearningProfile> {
        let path = path.as_ref();
        let bytes = read_file(path).await?;
        if Envelope::detect(&bytes).is_some() {
            exn::bail!(ErrorKind::PasswordRequired);
        }
        let profile = LearningProfile::from_json(&bytes)?;
        let mut state = self.write();
        state.profile = Some(profile.clone());
        state.path = Some(path.to_path_buf());
        state.status = ProfileStatus::Loaded;
        state.revision += 1;
        tracing::info!(game = %profile.metadata.game_name, entries = profile.entries.len(), "Loaded learning profile");
        Ok(profile)
    }

    /// Writes the active profile as canonical JSON and refreshes `updated_at`.
    ///
    /// Without an explicit `path` the last load/save location is reused, or
    /// a new `profile_<game>_<timestamp>.json` is created in the profiles
    /// directory. Returns the path written.
    #[instrument(skip(self))]
    pub async fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let (bytes, target, revision) = {
            let mut state = self.write();
            let target = match (path, &state.path) {
                (Some(path), _) => path.to_path_buf(),
                (None, Some(last)) => last.clone(),
                (None, None) => {
                    let profile = state.profile.as_ref().ok_or(ErrorKind::NotLoaded)?;
                    self.profiles_dir.join(default_file_name(&profile.metadata.game_name, OffsetDateTime::now_utc()))
                },
            };
            let revision = state.revision;
            let profile = state.profile.as_mut().ok_or(ErrorKind::NotLoaded)?;
            profile.touch();
            (profile.to_json()?, target, revision)
        };
        write_file(&target, &bytes).await?;
        let mut state = self.write();
        state.path = Some(target.clone());
        if state.revision == revision {
            state.status = ProfileStatus::Saved;
        }
        tracing::info!(path = %target.display(), "Saved learning profile");
        Ok(target)
    }

    /// Writes a copy of the active profile to `path`, sealed with `password`
    /// when one is given. The active profile's state is not affected.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), encrypted = password.is_some()))]
    pub async fn export(&self, path: impl AsRef<Path>, password: Option<&str>) -> Result<()> {
        let path = path.as_ref();
        let json = {
            let state = self.read();
            let mut snapshot = state.profile.clone().ok_or(ErrorKind::NotLoaded)?;
            snapshot.touch();
            snapshot.to_json()?
        };
        let bytes = match password {
            Some(password) => {
                let envelope = crypto::seal(&json, password)?;
                serde_json::to_vec_pretty(&envelope).or_raise(|| ErrorKind::Encryption)?
            },
            None => json,
        };
        write_file(path, &bytes).await?;
        tracing::info!("Exported learning profile");
        Ok(())
    }

    /// Reads a plaintext or encrypted profile and merges it into, or replaces,
    /// the active profile. With nothing active both modes simply adopt it.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), ?mode))]
    pub async fn import(
        &self,
        path: impl AsRef<Path>,
        password: Option<&str>,
        mode: ImportMode,
    ) -> Result<ImportSummary> {
        let path = path.as_ref();
        let bytes = read_file(path).await?;
        let json = match Envelope::detect(&bytes) {
            Some(envelope) => {
                let password = password.ok_or(ErrorKind::PasswordRequired)?;
                crypto::open(&envelope, password)?
            },
            None => bytes,
        };
        let incoming = LearningProfile::from_json(&json)?;

        let mut state = self.write();
        let merged = match (mode, state.profile.as_mut()) {
            (ImportMode::Merge, Some(active)) => Some(active.merge(&incoming)),
            _ => None,
        };
        let summary = match merged {
            Some(summary) => summary,
            None => {
                let summary = ImportSummary {
                    game_name: incoming.metadata.game_name.clone(),
                    game_serial: incoming.metadata.game_serial.clone(),
                    entries_added: incoming.entries.len(),
                    categories_added: incoming.custom_categories.len(),
                    ..ImportSummary::default()
                };
                state.profile = Some(incoming);
                // The old location belongs to the profile that was replaced.
                state.path = None;
                summary
            },
        };
        state.status = ProfileStatus::Dirty;
        state.revision += 1;
        tracing::info!(
            ?mode,
            added = summary.entries_added,
            updated = summary.entries_updated,
            unchanged = summary.entries_unchanged,
            "Imported learning profile"
        );
        Ok(summary)
    }

    /// Summaries of every readable plaintext profile in `directory`, most
    /// recently updated first. Unreadable and encrypted files are skipped.
    #[instrument]
    pub async fn list_profiles(directory: &Path) -> Result<Vec<ProfileSummary>> {
        let mut entries = match fs::read_dir(directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io(directory.to_path_buf())),
        };
        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await.or_raise(|| ErrorKind::Io(directory.to_path_buf()))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let profile = match read_file(&path).await.and_then(|bytes| LearningProfile::from_json(&bytes)) {
                Ok(profile) => profile,
                Err(err) => {
                    let reason: &ErrorKind = &err;
                    tracing::warn!(path = %path.display(), error = %reason, "Skipping unreadable profile");
                    continue;
                },
            };
            summaries.push(ProfileSummary {
                filename: entry.file_name().to_string_lossy().into_owned(),
                path,
                game_name: profile.metadata.game_name,
                game_serial: profile.metadata.game_serial,
                entry_count: profile.entries.len(),
                updated_at: profile.metadata.updated_at,
            });
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.filename.cmp(&b.filename)));
        Ok(summaries)
    }

    /// Removes a profile file. Deleting the active profile's file keeps the
    /// profile in memory, unsaved.
    pub async fn delete_profile(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::remove_file(path).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        let mut state = self.write();
        if state.path.as_deref() == Some(path) {
            state.path = None;
            if state.profile.is_some() {
                state.status = ProfileStatus::Dirty;
            }
        }
        tracing::info!(path = %path.display(), "Deleted learning profile");
        Ok(())
    }

    /// Learns `filename → destination` in the active profile.
    pub fn record(&self, filename: &str, destination: &str, confidence: f64, source: EntrySource) -> Result<Recorded> {
        self.mutate(|profile| profile.entries.record(filename, destination, confidence, source))
    }

    /// Ranked destinations for `filename`. Without an active profile only
    /// the classifier hint contributes.
    pub fn suggest(&self, engine: &SuggestionEngine, filename: &str, hint: Option<&ClassifierHint>) -> Vec<Suggestion> {
        let state = self.read();
        match &state.profile {
            Some(profile) => engine.suggest(&profile.entries, filename, hint),
            None => engine.suggest(&Default::default(), filename, hint),
        }
    }

    pub fn statistics(&self) -> Result<ProfileStatistics> {
        let state = self.read();
        Ok(state.profile.as_ref().ok_or(ErrorKind::NotLoaded)?.statistics())
    }

    pub fn custom_categories(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.read().profile.as_ref().map(|p| p.custom_categories.clone()).unwrap_or_default()
    }

    pub fn add_custom_category<S: AsRef<str>>(&self, name: &str, keywords: impl IntoIterator<Item = S>) -> Result<()> {
        if name.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidEntry("empty category name".to_string()));
        }
        self.mutate(|profile| {
            profile.add_custom_category(name, keywords);
            Ok(())
        })
    }

    /// Forgets every learned mapping; metadata and categories stay.
    pub fn clear_history(&self) -> Result<()> {
        self.mutate(|profile| {
            profile.entries.clear();
            Ok(())
        })
    }
}

fn default_file_name(game_name: &str, now: OffsetDateTime) -> String {
    let safe: String = game_name
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => Some(c),
            ' ' => Some('_'),
            _ => None,
        })
        .collect();
    let safe = if safe.is_empty() { "unnamed".to_string() } else { safe };
    let stamp = now
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    format!("profile_{safe}_{stamp}.json")
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))
}

/// Writes through a temporary sibling so a crash never leaves half a profile.
async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
    }
    let mut temporary = path.as_os_str().to_owned();
    temporary.push(".tmp");
    let temporary = PathBuf::from(temporary);
    fs::write(&temporary, bytes).await.or_raise(|| ErrorKind::Io(temporary.clone()))?;
    fs::rename(&temporary, path).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn manager() -> (tempfile::TempDir, ProfileManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = ProfileManager::new(dir.path().join("profiles"));
        (dir, manager)
    }

    fn populated(manager: &ProfileManager) {
        manager.create("God of War II", Some("SLUS-20917"), Some("tester"));
        manager.record("kratos_head_02.png", "character/kratos", 0.91, EntrySource::Accepted).unwrap();
        manager.record("kratos_head_03.png", "character/kratos", 0.91, EntrySource::Accepted).unwrap();
        manager.record("blade_01_red.png", "weapons/blades", 0.3, EntrySource::Corrected).unwrap();
        manager.add_custom_category("weapons", ["sword", "blade", "axe"]).unwrap();
    }

    #[test]
    fn test_default_file_name() {
        let name = default_file_name("God of War: II", datetime!(2024-03-05 07:08:09 UTC));
        assert_eq!(name, "profile_God_of_War_II_20240305_070809.json");
        assert_eq!(default_file_name("???", datetime!(2024-03-05 07:08:09 UTC)), "profile_unnamed_20240305_070809.json");
    }

    #[test]
    fn test_mutations_require_profile() {
        let (_dir, manager) = manager();
        assert_eq!(manager.status(), ProfileStatus::Unloaded);
        let err = manager.record("a.png", "x", 0.5, EntrySource::Accepted).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotLoaded));
        assert!(matches!(&*manager.statistics().unwrap_err(), ErrorKind::NotLoaded));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (dir, manager) = manager();
        manager.create("Jak II", None, None);
        assert_eq!(manager.status(), ProfileStatus::Dirty);
        let saved = manager.save(None).await.unwrap();
        assert!(saved.starts_with(dir.path().join("profiles")));
        assert!(saved.file_name().unwrap().to_string_lossy().starts_with("profile_Jak_II_"));
        assert_eq!(manager.status(), ProfileStatus::Saved);
        manager.record("jak_01.png", "character/jak", 0.5, EntrySource::Accepted).unwrap();
        assert_eq!(manager.status(), ProfileStatus::Dirty);
        // Reuses the last location.
        assert_eq!(manager.save(None).await.unwrap(), saved);
        let other = ProfileManager::new(dir.path());
        other.load(&saved).await.unwrap();
        assert_eq!(other.status(), ProfileStatus::Loaded);
        assert_eq!(other.profile().unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_import_saves_to_a_new_file() {
        let (dir, manager) = manager();
        let gow = dir.path().join("gow.json");
        manager.create("God of War II", Some("SLUS-20917"), None);
        manager.save(Some(gow.as_path())).await.unwrap();

        let other = ProfileManager::new(dir.path());
        other.create("Final Fantasy X", Some("SLUS-20312"), None);
        let ffx = dir.path().join("ffx.json");
        other.save(Some(ffx.as_path())).await.unwrap();

        manager.load(&gow).await.unwrap();
        manager.import(&ffx, None, ImportMode::Replace).await.unwrap();
        assert_eq!(manager.path(), None);
        let saved = manager.save(None).await.unwrap();
        assert_ne!(saved, gow);
        assert!(saved.file_name().unwrap().to_string_lossy().starts_with("profile_Final_Fantasy_X_"));

        let untouched = ProfileManager::new(dir.path());
        assert_eq!(untouched.load(&gow).await.unwrap().metadata.game_name, "God of War II");
    }

    #[tokio::test]
    async fn test_merge_import_keeps_location() {
        let (dir, manager) = manager();
        let gow = dir.path().join("gow.json");
        populated(&manager);
        manager.save(Some(gow.as_path())).await.unwrap();
        let export = dir.path().join("export.json");
        manager.export(&export, None).await.unwrap();

        manager.import(&export, None, ImportMode::Merge).await.unwrap();
        assert_eq!(manager.path(), Some(gow));
    }

    #[tokio::test]
    async fn test_save_is_canonical() {
        let (dir, manager) = manager();
        populated(&manager);
        let path = dir.path().join("gow2.json");
        manager.save(Some(path.as_path())).await.unwrap();
        let first = std::fs::read(&path).unwrap();
        let reloaded = ProfileManager::new(dir.path());
        reloaded.load(&path).await.unwrap();
        let profile = reloaded.profile().unwrap();
        assert_eq!(profile.to_json().unwrap(), first);
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let (dir, manager) = manager();
        populated(&manager);
        let original = manager.profile().unwrap();
        let path = dir.path().join("export.json");
        manager.export(&path, None).await.unwrap();

        let other = ProfileManager::new(dir.path());
        let summary = other.import(&path, None, ImportMode::Replace).await.unwrap();
        assert_eq!(summary.entries_added, 2);
        let imported = other.profile().unwrap();
        assert_eq!(imported.entries, original.entries);
        assert_eq!(imported.custom_categories, original.custom_categories);
        assert_eq!(other.status(), ProfileStatus::Dirty);
    }

    #[tokio::test]
    async fn test_encrypted_export() {
        let (dir, manager) = manager();
        populated(&manager);
        let path = dir.path().join("secret.json");
        manager.export(&path, Some("a")).await.unwrap();
        assert!(!String::from_utf8(std::fs::read(&path).unwrap()).unwrap().contains("kratos"));

        let other = ProfileManager::new(dir.path());
        other.create("Empty", None, None);
        let err = other.import(&path, Some("b"), ImportMode::Merge).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decryption));
        assert!(other.profile().unwrap().entries.is_empty());
        let err = other.import(&path, None, ImportMode::Merge).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PasswordRequired));
        let err = other.load(&path).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PasswordRequired));

        other.import(&path, Some("a"), ImportMode::Merge).await.unwrap();
        assert_eq!(other.profile().unwrap().entries, manager.profile().unwrap().entries);
    }

    #[tokio::test]
    async fn test_merge_import_twice() {
        let (dir, manager) = manager();
        populated(&manager);
        let path = dir.path().join("export.json");
        manager.export(&path, None).await.unwrap();

        let other = ProfileManager::new(dir.path());
        other.create("God of War II", None, None);
        other.record("zeus_01.png", "character/zeus", 0.8, EntrySource::Accepted).unwrap();
        let first = other.import(&path, None, ImportMode::Merge).await.unwrap();
        let once = other.profile().unwrap();
        let second = other.import(&path, None, ImportMode::Merge).await.unwrap();
        assert_eq!(first.entries_added, 2);
        assert_eq!(second.entries_added, 0);
        assert_eq!(second.entries_unchanged, 2);
        assert_eq!(other.profile().unwrap().entries, once.entries);
        assert_eq!(once.entries.len(), 3);
    }

    #[tokio::test]
    async fn test_corrupt_load_keeps_state() {
        let (dir, manager) = manager();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, br#"{"schema_version": 99}"#).unwrap();
        let err = manager.load(&path).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ProfileCorrupt(_)));
        assert_eq!(manager.status(), ProfileStatus::Unloaded);
        let err = manager.load(dir.path().join("missing.json")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
    }

    #[tokio::test]
    async fn test_list_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let older = ProfileManager::new(dir.path());
        older.create("Jak 3", None, None);
        older.save(Some(dir.path().join("jak3.json").as_path())).await.unwrap();
        let newer = ProfileManager::new(dir.path());
        populated(&newer);
        newer.save(Some(dir.path().join("gow2.json").as_path())).await.unwrap();
        newer.export(dir.path().join("locked.json"), Some("pw")).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

        let listed = ProfileManager::list_profiles(dir.path()).await.unwrap();
        let names: Vec<_> = listed.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["gow2.json", "jak3.json"]);
        assert_eq!(listed[0].game_name, "God of War II");
        assert_eq!(listed[0].entry_count, 2);
        assert!(ProfileManager::list_profiles(&dir.path().join("nope")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (dir, manager) = manager();
        populated(&manager);
        let path = dir.path().join("gow2.json");
        manager.save(Some(path.as_path())).await.unwrap();
        manager.delete_profile(&path).await.unwrap();
        assert!(!path.exists());
        assert_eq!(manager.path(), None);
        assert_eq!(manager.status(), ProfileStatus::Dirty);
        manager.clear_history().unwrap();
        let profile = manager.profile().unwrap();
        assert!(profile.entries.is_empty());
        assert_eq!(profile.custom_categories.len(), 1);
    }

    #[test]
    fn test_suggest_without_profile_uses_hint() {
        let manager = ProfileManager::new("unused");
        let hint = ClassifierHint::new("character", 0.8);
        let suggestions = manager.suggest(&SuggestionEngine::default(), "a.png", Some(&hint));
        assert_eq!(suggestions[0].destination, "character");
    }
}

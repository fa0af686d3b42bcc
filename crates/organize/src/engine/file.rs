use crate::classify::Prediction;
use crate::decision::{self, Decision};
use crate::engine::conflict::{Resolution, resolve_conflict};
use crate::engine::{Action, Mode, Operation, Organizer, Placement};
use crate::error::{ErrorKind, Result};
use crate::texture::{TextureInfo, UNCATEGORIZED};
use exn::ResultExt;
use std::collections::HashSet;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use texsort_identify::GameInfo;
use texsort_learning::{ClassifierHint, EntrySource, Suggestion};
use texsort_storage::error::Result as StorageResult;
use texsort_storage::{BackendHandle, FileInfo, validate_path};

/// Turns a storage failure into a per-file [`ErrorKind::FileOperation`],
/// keeping the storage error as its source.
pub(crate) trait StorageResultExt<T> {
    fn or_file_error(self, path: &Path) -> Result<T>;
}
impl<T> StorageResultExt<T> for StorageResult<T> {
    fn or_file_error(self, path: &Path) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => {
                let reason = e.deref().to_string();
                Err(e).or_raise(|| ErrorKind::FileOperation { path: path.to_path_buf(), reason })
            },
        }
    }
}

/// State shared by every file of one run.
pub(crate) struct RunContext<'a> {
    pub organizer: &'a Organizer,
    /// The backends file operations go through (read-only wrappers on a dry
    /// run).
    pub source: BackendHandle,
    pub target: BackendHandle,
    pub game: GameInfo,
    pub vocabulary: Vec<String>,
    /// Destinations handed out so far.
    pub claimed: HashSet<PathBuf>,
}

/// The folder settled on for one file, and how to learn from it.
enum Choice {
    Place { destination: String, learn: Option<(f64, EntrySource)> },
    Reject { destination: String },
}

impl RunContext<'_> {
    /// Places one file: classify, suggest, decide, lay out, transfer, learn.
    ///
    /// # Errors
    /// [`ErrorKind::FileOperation`] when only this file is affected; any
    /// other kind is [fatal](ErrorKind::is_fatal) to the run.
    pub(crate) async fn process(&mut self, file: FileInfo) -> Result<Placement> {
        let organizer = self.organizer;
        let options = &organizer.options;
        let mut texture = TextureInfo::new(&file.path).with_game(self.game.clone());

        let prediction = self.classify(&file.path).await;
        if let Some(prediction) = &prediction {
            texture.detected_category = Some(prediction.category.clone());
            texture.classifier_confidence = Some(prediction.confidence);
        }
        let hint = prediction.map(|p| ClassifierHint::new(p.category, p.confidence));
        let suggestions = match &organizer.profile {
            Some(profile) => profile.suggest(&organizer.suggestions, &texture.filename, hint.as_ref()),
            None => organizer.suggestions.suggest(&Default::default(), &texture.filename, hint.as_ref()),
        };

        let (destination, learn) = match self.decide(&texture, suggestions).await? {
            Choice::Place { destination, learn } => (destination, learn),
            Choice::Reject { destination } => {
                tracing::debug!(file = %file.path.display(), "Rejected by operator");
                return Ok(Placement {
                    source: file.path,
                    destination: None,
                    category: destination,
                    action: Action::Rejected,
                    learned: false,
                });
            },
        };
        texture.category = destination.clone();

        let segments = organizer.style.resolve_path(&texture)?;
        if segments.is_empty() {
            exn::bail!(ErrorKind::EmptyPath(file.path));
        }
        let relative: PathBuf = segments.iter().map(String::as_str).chain([texture.filename.as_str()]).collect();
        let wanted = validate_path(&relative).or_file_error(&relative)?;

        let (placed_at, action) = if organizer.same_backend() && wanted == file.path {
            // Already where it belongs.
            self.claimed.insert(wanted.clone());
            (wanted, completed(options.operation))
        } else {
            match resolve_conflict(&self.target, &self.claimed, options.conflict, wanted).await? {
                Resolution::Skip(path) => (path, Action::Skipped),
                Resolution::Free(path) | Resolution::Overwrite(path) => {
                    self.transfer(&file.path, &path).await?;
                    self.claimed.insert(path.clone());
                    (path, completed(options.operation))
                },
            }
        };
        tracing::debug!(
            file = %file.path.display(),
            destination = %placed_at.display(),
            category = %destination,
            ?action,
            "Placed file"
        );

        let learned = match learn {
            Some((confidence, source)) => self.learn(&texture.filename, &destination, confidence, source),
            None => false,
        };
        Ok(Placement { source: file.path, destination: Some(placed_at), category: destination, action, learned })
    }

    /// The classifier's best prediction. Failures only cost suggestion
    /// quality.
    async fn classify(&self, path: &Path) -> Option<Prediction> {
        let classifier = self.organizer.classifier.as_ref()?;
        let absolute = match self.organizer.source.root() {
            Some(root) => root.join(path),
            None => path.to_path_buf(),
        };
        match classifier.classify(&absolute, &self.vocabulary).await {
            Ok(predictions) => predictions.into_iter().next(),
            Err(e) => {
                tracing::warn!(classifier = classifier.name(), file = %path.display(), error = %e, "Classifier unavailable");
                None
            },
        }
    }

    async fn decide(&self, texture: &TextureInfo, suggestions: Vec<Suggestion>) -> Result<Choice> {
        let fallback = texture.detected_category.clone().unwrap_or_else(|| UNCATEGORIZED.to_string());
        let primary = suggestions.first().map(|s| s.destination.clone()).unwrap_or_else(|| fallback.clone());
        let mode = self.organizer.options.mode;
        if mode == Mode::Automatic {
            return Ok(Choice::Place { destination: primary, learn: None });
        }

        let accepted_confidence = suggestions.first().map(|s| s.score).or(texture.classifier_confidence).unwrap_or(0.0);
        let scores: Vec<(String, f64)> = suggestions.iter().map(|s| (s.destination.clone(), s.score)).collect();
        let sender = self.organizer.decisions.as_ref().ok_or(ErrorKind::DecisionChannelClosed)?;
        let decision = decision::ask(sender, mode, texture.clone(), suggestions, fallback).await;
        Ok(match decision.ok_or(ErrorKind::DecisionChannelClosed)? {
            Decision::Reject => Choice::Reject { destination: primary },
            Decision::Override(destination) if !destination.trim().is_empty() => {
                let destination = destination.trim().to_string();
                let confidence = scores.iter().find(|(d, _)| *d == destination).map_or(0.0, |(_, score)| *score);
                Choice::Place { destination, learn: Some((confidence, EntrySource::Corrected)) }
            },
            Decision::Accept | Decision::Override(_) => {
                Choice::Place { destination: primary, learn: Some((accepted_confidence, EntrySource::Accepted)) }
            },
        })
    }

    /// Moves or copies `from` (in the source) to `to` (in the target).
    async fn transfer(&self, from: &Path, to: &Path) -> Result<()> {
        let operation = self.organizer.options.operation;
        if self.organizer.same_backend() {
            return match operation {
                Operation::Move => self.target.rename(from, to).await.or_file_error(from),
                Operation::Copy => self.target.copy(from, to).await.or_file_error(from),
            };
        }
        let data = self.source.read(from).await.or_file_error(from)?;
        self.target.write(to, &data).await.or_file_error(to)?;
        if operation == Operation::Move {
            self.source.delete(from).await.or_file_error(from)?;
        }
        Ok(())
    }

    /// Records the operator's choice. Returns whether anything was learned.
    fn learn(&self, filename: &str, destination: &str, confidence: f64, source: EntrySource) -> bool {
        let organizer = self.organizer;
        let Some(profile) = organizer.profile.as_ref() else {
            return false;
        };
        if !organizer.options.learning || organizer.options.dry_run {
            return false;
        }
        match profile.record(filename, destination, confidence, source) {
            Ok(recorded) => {
                tracing::debug!(filename, destination, ?recorded, "Learned destination");
                true
            },
            Err(e) => {
                tracing::warn!(filename, destination, error = %e, "Could not record decision");
                false
            },
        }
    }
}

fn completed(operation: Operation) -> Action {
    match operation {
        Operation::Move => Action::Moved,
        Operation::Copy => Action::Copied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use texsort_storage::error::ErrorKind as StorageErrorKind;

    #[test]
    fn test_storage_errors_become_file_errors() {
        let result: StorageResult<()> = Err(StorageErrorKind::PermissionDenied("ui/a.png".into()).into());
        let error = result.or_file_error(Path::new("a.png")).unwrap_err();
        assert!(matches!(error.deref(), ErrorKind::FileOperation { path, .. } if path == Path::new("a.png")));
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_completed_action() {
        assert_eq!(completed(Operation::Move), Action::Moved);
        assert_eq!(completed(Operation::Copy), Action::Copied);
    }
}

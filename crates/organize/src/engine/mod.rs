//! The organization run.
//!
//! [`Organizer::run`] walks the source backend, and for every matching file:
//!
//! 1. asks the [`Classifier`] for a category (optional, failures tolerated),
//! 2. ranks destinations with the [`SuggestionEngine`] over the active
//!    learning profile,
//! 3. settles on a folder according to the [`Mode`], asking the operator
//!    through the decision channel when the mode is interactive,
//! 4. resolves the folder hierarchy with the [`OrganizationStyle`],
//! 5. moves or copies the file into the target backend, applying the
//!    [`ConflictPolicy`],
//! 6. records the operator's choice in the profile when learning is on.
//!
//! Files are processed one at a time, in sorted path order. Progress is
//! reported through the [`OrganizeEvent`] stream; [`drive`] adapts that
//! stream to callbacks.

mod conflict;
mod file;
mod options;
mod stream;
mod summary;

pub use self::options::{ConflictPolicy, Mode, Operation, Options};
pub use self::stream::OrganizeEvent;
pub use self::summary::{Action, FileFailure, Observer, Placement, RunState, RunSummary, drive};
use crate::classify::Classifier;
use crate::control::RunControl;
use crate::decision::{DecisionRequest, DecisionSender};
use crate::style::OrganizationStyle;
use std::sync::Arc;
use texsort_identify::Identifier;
use texsort_learning::{ProfileManager, SuggestionEngine};
use texsort_storage::BackendHandle;
use texsort_storage::backend::ReadOnlyBackend;
use tokio::sync::mpsc;

/// A configured organization run.
///
/// Built with chained setters; everything except the two backends has a
/// default (flat style, automatic mode, no classifier, no learning).
pub struct Organizer {
    source: BackendHandle,
    target: BackendHandle,
    style: OrganizationStyle,
    options: Options,
    classifier: Option<Arc<dyn Classifier>>,
    identifier: Identifier,
    profile: Option<ProfileManager>,
    suggestions: SuggestionEngine,
    decisions: Option<DecisionSender>,
    control: RunControl,
}

impl Organizer {
    pub fn new(source: BackendHandle, target: BackendHandle) -> Self {
        Self {
            source,
            target,
            style: OrganizationStyle::Flat,
            options: Options::default(),
            classifier: None,
            identifier: Identifier::default(),
            profile: None,
            suggestions: SuggestionEngine::default(),
            decisions: None,
            control: RunControl::new(),
        }
    }

    pub fn style(mut self, style: OrganizationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = identifier;
        self
    }

    /// The profile suggestions come from and, when
    /// [`Options::learning`] is set, choices are recorded into.
    pub fn profile(mut self, profile: ProfileManager) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn suggestions(mut self, engine: SuggestionEngine) -> Self {
        self.suggestions = engine;
        self
    }

    /// Where interactive modes send their [`DecisionRequest`]s; see
    /// [`decision::channel`](crate::decision::channel).
    pub fn decisions(mut self, sender: mpsc::Sender<DecisionRequest>) -> Self {
        self.decisions = Some(sender);
        self
    }

    /// Replaces the run's control handle, e.g. to share one with a signal
    /// handler created before the organizer.
    pub fn with_control(mut self, control: RunControl) -> Self {
        self.control = control;
        self
    }

    /// A handle for pausing, resuming or cancelling the run.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    /// The backends file operations go to: dry runs wrap both in a
    /// [`ReadOnlyBackend`] so that nothing on either side changes.
    fn effective_backends(&self) -> (BackendHandle, BackendHandle) {
        if self.options.dry_run {
            (
                Arc::new(ReadOnlyBackend::new(self.source.clone())),
                Arc::new(ReadOnlyBackend::new(self.target.clone())),
            )
        } else {
            (self.source.clone(), self.target.clone())
        }
    }

    /// Whether source and target are the very same backend, in which case
    /// files can be renamed rather than rewritten.
    fn same_backend(&self) -> bool {
        Arc::ptr_eq(&self.source, &self.target)
    }
}

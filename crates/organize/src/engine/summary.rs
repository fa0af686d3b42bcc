use crate::engine::OrganizeEvent;
use crate::error::Error;
use futures::{Stream, StreamExt};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::pin::pin;

/// What happened to a file that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Moved,
    Copied,
    /// The destination was taken and the conflict policy is skip.
    Skipped,
    /// The operator rejected the suggestion.
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Relative to the source root.
    pub source: PathBuf,
    /// Relative to the target root. `None` when rejected.
    pub destination: Option<PathBuf>,
    /// The folder chosen for the file, before the style laid it out.
    pub category: String,
    pub action: Action,
    /// The choice was recorded in the learning profile.
    pub learned: bool,
}
impl Placement {
    pub fn succeeded(&self) -> bool {
        matches!(self.action, Action::Moved | Action::Copied)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Every file was processed, successfully or not.
    Completed,
    Cancelled,
    /// Stopped by a fatal error.
    Failed,
}

/// The outcome of a run. Files already placed stay placed whatever the
/// state; `untouched` lists what a resumed run still has to do.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub state: RunState,
    pub total: u64,
    pub placements: Vec<Placement>,
    pub failures: Vec<FileFailure>,
    pub untouched: Vec<PathBuf>,
    /// Why a [failed](RunState::Failed) run stopped.
    pub fatal: Option<String>,
    pub dry_run: bool,
}

impl RunSummary {
    pub(crate) fn new(total: u64, dry_run: bool) -> Self {
        Self {
            state: RunState::Completed,
            total,
            placements: Vec::new(),
            failures: Vec::new(),
            untouched: Vec::new(),
            fatal: None,
            dry_run,
        }
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>, untouched: impl IntoIterator<Item = PathBuf>) {
        self.state = RunState::Failed;
        self.fatal = Some(reason.into());
        self.untouched.extend(untouched);
    }

    pub(crate) fn cancel(&mut self, untouched: impl IntoIterator<Item = PathBuf>) {
        self.state = RunState::Cancelled;
        self.untouched.extend(untouched);
    }

    pub fn succeeded(&self) -> usize {
        self.placements.iter().filter(|p| p.succeeded()).count()
    }

    fn count(&self, action: Action) -> usize {
        self.placements.iter().filter(|p| p.action == action).count()
    }

    pub fn learned(&self) -> usize {
        self.placements.iter().filter(|p| p.learned).count()
    }
}

impl Display for RunSummary {
    /// `3 of 5 succeeded, 1 skipped, failures: a.png (permission denied)`
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} of {} succeeded", self.succeeded(), self.total)?;
        if self.dry_run {
            write!(f, " (dry run)")?;
        }
        for (action, label) in [(Action::Skipped, "skipped"), (Action::Rejected, "rejected")] {
            match self.count(action) {
                0 => {},
                n => write!(f, ", {n} {label}")?,
            }
        }
        if !self.failures.is_empty() {
            let failures: Vec<String> =
                self.failures.iter().map(|fail| format!("{} ({})", fail.path.display(), fail.reason)).collect();
            write!(f, ", failures: {}", failures.join("; "))?;
        }
        match self.state {
            RunState::Completed => {},
            RunState::Cancelled => write!(f, "; cancelled, {} untouched", self.untouched.len())?,
            RunState::Failed => write!(
                f,
                "; stopped: {}, {} untouched",
                self.fatal.as_deref().unwrap_or("unknown error"),
                self.untouched.len()
            )?,
        }
        Ok(())
    }
}

/// Callback view of a run. Every method defaults to doing nothing.
pub trait Observer {
    fn on_event(&mut self, _event: &OrganizeEvent) {}
    fn on_progress(&mut self, _processed: u64, _total: u64) {}
    fn on_placed(&mut self, _placement: &Placement) {}
    /// A single file failed; the run carries on.
    fn on_error(&mut self, _path: &Path, _error: &Error) {}
    /// The run is about to stop.
    fn on_fatal(&mut self, _error: &Error) {}
    fn on_complete(&mut self, _summary: &RunSummary) {}
}

/// Drains `events` into `observer` and returns the final summary.
pub async fn drive(events: impl Stream<Item = crate::error::Result<OrganizeEvent>>, observer: &mut impl Observer) -> RunSummary {
    let mut events = pin!(events);
    let mut summary = None;
    let mut fatal = None;
    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(error) => {
                observer.on_fatal(&error);
                fatal = Some(error.to_string());
                continue;
            },
        };
        observer.on_event(&event);
        match event {
            OrganizeEvent::Progress { processed, total } => observer.on_progress(processed, total),
            OrganizeEvent::Placed(placement) => observer.on_placed(&placement),
            OrganizeEvent::FileFailed { path, error } => observer.on_error(&path, &error),
            OrganizeEvent::Finished(finished) => {
                observer.on_complete(&finished);
                summary = Some(finished);
            },
            _ => {},
        }
    }
    summary.unwrap_or_else(|| {
        let mut aborted = RunSummary::new(0, false);
        aborted.fail(fatal.unwrap_or_else(|| "run ended without a summary".to_string()), []);
        aborted
    })
}

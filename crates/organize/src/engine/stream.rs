use crate::classify;
use crate::control::Signal;
use crate::engine::file::RunContext;
use crate::engine::{FileFailure, Organizer, Placement, RunSummary};
use crate::error::{Error, ErrorKind, Result};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use texsort_identify::GameInfo;
use texsort_storage::FileInfo;

/// Progress events emitted by [`Organizer::run`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`GameIdentified`](Self::GameIdentified) and
///    [`DiscoveryComplete`](Self::DiscoveryComplete), once each, unless
///    listing the source failed.
/// 3. Per file: [`Placed`](Self::Placed) or [`FileFailed`](Self::FileFailed),
///    then [`Progress`](Self::Progress). [`Paused`](Self::Paused) and
///    [`Resumed`](Self::Resumed) appear between files.
/// 4. [`Finished`](Self::Finished), exactly once and always last.
///
/// A fatal error is yielded as an `Err` item right before
/// [`Finished`](Self::Finished).
#[derive(Debug)]
pub enum OrganizeEvent {
    Started,
    /// Best guess at the game the textures were dumped from.
    GameIdentified(GameInfo),
    /// The source has been listed; the total file count is now known.
    DiscoveryComplete(u64),
    Progress {
        processed: u64,
        total: u64,
    },
    Placed(Placement),
    /// One file could not be placed; the run carries on.
    FileFailed {
        path: PathBuf,
        error: Error,
    },
    Paused,
    Resumed,
    Finished(RunSummary),
}

impl Organizer {
    /// Organizes every matching file of the source into the target,
    /// streaming [`OrganizeEvent`]s as it goes.
    ///
    /// Files are processed one at a time, in sorted path order. Pause,
    /// resume and cancel requests made through [`control`](Self::control)
    /// take effect between files; nothing is rolled back on cancel.
    pub fn run(&self) -> impl Stream<Item = Result<OrganizeEvent>> + '_ {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            let dry_run = self.options.dry_run;
            tracing::info!(
                source = self.source.name(),
                target = self.target.name(),
                style = %self.style.kind(),
                mode = %self.options.mode,
                dry_run,
                "Organization run started"
            );
            yield Ok(OrganizeEvent::Started);

            let files = match self.discover().await {
                Ok(files) => files,
                Err(e) => {
                    let mut summary = RunSummary::new(0, dry_run);
                    summary.fail(e.to_string(), []);
                    tracing::info!(%summary, "Organization run finished");
                    yield Err(e);
                    yield Ok(OrganizeEvent::Finished(summary));
                    return;
                },
            };
            // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
            let total = u64::try_from(files.len()).unwrap_or(u64::MAX);

            let game = self.identify_game(files.first().map(|f| f.path.as_path()));
            if game.is_known() {
                tracing::info!(%game, "Game identified");
            }
            yield Ok(OrganizeEvent::GameIdentified(game.clone()));
            yield Ok(OrganizeEvent::DiscoveryComplete(total));

            let (source, target) = self.effective_backends();
            let vocabulary = classify::vocabulary(
                &self.profile.as_ref().map(|p| p.custom_categories()).unwrap_or_default(),
            );
            let mut context = RunContext {
                organizer: self,
                source,
                target,
                game,
                vocabulary,
                claimed: HashSet::new(),
            };
            let mut summary = RunSummary::new(total, dry_run);
            let mut processed = 0;
            let mut files = files.into_iter();

            while let Some(file) = files.next() {
                if self.control.current() == Signal::Pause {
                    tracing::info!("Organization run paused");
                    yield Ok(OrganizeEvent::Paused);
                    if self.control.wait_while_paused().await == Signal::Run {
                        tracing::info!("Organization run resumed");
                        yield Ok(OrganizeEvent::Resumed);
                    }
                }
                if self.control.is_cancelled() {
                    summary.cancel(std::iter::once(file.path).chain(files.by_ref().map(|f| f.path)));
                    break;
                }
                if !self.source.available().await {
                    let error = Error::from(ErrorKind::SourceUnavailable(self.source.name().to_string()));
                    summary.fail(error.to_string(), std::iter::once(file.path).chain(files.by_ref().map(|f| f.path)));
                    yield Err(error);
                    break;
                }

                let path = file.path.clone();
                let result = match context.process(file).await {
                    // The file may have failed because the source went away.
                    Err(e) if !e.is_fatal() => match self.source.available().await {
                        true => Err(e),
                        false => Err(e.raise(ErrorKind::SourceUnavailable(self.source.name().to_string()))),
                    },
                    result => result,
                };
                match result {
                    Ok(placement) => {
                        summary.placements.push(placement.clone());
                        yield Ok(OrganizeEvent::Placed(placement));
                    },
                    Err(e) if !e.is_fatal() => {
                        tracing::debug!(file = %path.display(), error = %e, "File failed");
                        summary.failures.push(FileFailure { path: path.clone(), reason: e.to_string() });
                        yield Ok(OrganizeEvent::FileFailed { path, error: e });
                    },
                    Err(e) => {
                        summary.fail(e.to_string(), std::iter::once(path).chain(files.by_ref().map(|f| f.path)));
                        yield Err(e);
                        break;
                    },
                }
                processed += 1;
                yield Ok(OrganizeEvent::Progress { processed, total });
            }

            tracing::info!(%summary, "Organization run finished");
            yield Ok(OrganizeEvent::Finished(summary));
        })
    }

    /// Matching files in the source, sorted by path.
    async fn discover(&self) -> Result<Vec<FileInfo>> {
        let mut files = self.source.list(None).await.or_raise(|| ErrorKind::Discovery)?;
        let extensions = &self.options.extensions;
        files.retain(|file| {
            (extensions.is_empty() || file.has_extension(extensions)) && (self.options.recursive || is_top_level(&file.path))
        });
        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(files = files.len(), "Discovered source files");
        Ok(files)
    }

    /// Runs once per run, against the source root joined with the first
    /// file so that serial-named dump folders on either side are seen.
    fn identify_game(&self, first: Option<&Path>) -> GameInfo {
        let path = match (self.source.root(), first) {
            (Some(root), Some(first)) => root.join(first),
            (Some(root), None) => root.to_path_buf(),
            (None, Some(first)) => first.to_path_buf(),
            (None, None) => return GameInfo::unknown(),
        };
        self.identifier.identify(path)
    }
}

fn is_top_level(path: &Path) -> bool {
    path.components().filter(|c| matches!(c, Component::Normal(_))).count() == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::ops::Deref;

    #[rstest]
    #[case("a.png", true)]
    #[case("./a.png", true)]
    #[case("chars/a.png", false)]
    fn test_is_top_level(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_top_level(Path::new(path)), expected);
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(ErrorKind::SourceUnavailable("src".to_string()).is_fatal());
        assert!(ErrorKind::EmptyPath("a.png".into()).is_fatal());
        assert!(!ErrorKind::FileOperation { path: "a.png".into(), reason: "disk full".to_string() }.is_fatal());
        let error: Error = ErrorKind::Discovery.into();
        assert!(matches!(error.deref(), ErrorKind::Discovery));
    }
}

use crate::cli::OrganizeArgs;
use crate::error::{ErrorKind, Result};
use crate::prompt;
use exn::ResultExt;
use std::path::Path;
use std::sync::Arc;
use texsort_config::Config;
use texsort_learning::ProfileManager;
use texsort_organize::classify::KeywordClassifier;
use texsort_organize::error::Error as OrganizeError;
use texsort_organize::{
    Action, Observer, Operation, Options, OrganizeEvent, Organizer, Placement, RunControl, RunState, decision, drive,
};
use texsort_storage::BackendHandle;
use texsort_storage::backend::LocalBackend;

const UNNAMED_GAME: &str = "Unknown game";

/// Prints one line per file.
struct Reporter;

impl Observer for Reporter {
    fn on_event(&mut self, event: &OrganizeEvent) {
        match event {
            OrganizeEvent::GameIdentified(game) if game.is_known() => println!("game: {game}"),
            OrganizeEvent::DiscoveryComplete(total) => println!("{total} textures found"),
            OrganizeEvent::Paused => println!("paused"),
            OrganizeEvent::Resumed => println!("resumed"),
            _ => {},
        }
    }

    fn on_placed(&mut self, placement: &Placement) {
        let source = placement.source.display();
        match (&placement.destination, placement.action) {
            (_, Action::Rejected) | (None, _) => println!("kept     {source}"),
            (Some(to), Action::Skipped) => println!("skipped  {source} ({} exists)", to.display()),
            (Some(to), Action::Moved) => println!("moved    {source} -> {}", to.display()),
            (Some(to), Action::Copied) => println!("copied   {source} -> {}", to.display()),
        }
    }

    fn on_error(&mut self, path: &Path, error: &OrganizeError) {
        eprintln!("failed   {}: {error}", path.display());
    }

    fn on_fatal(&mut self, error: &OrganizeError) {
        eprintln!("stopping: {error:?}");
    }
}

pub async fn run(mut config: Config, args: OrganizeArgs) -> Result<RunState> {
    let organize = &mut config.organize;
    if let Some(style) = args.style {
        organize.style = style;
    }
    if !args.template.is_empty() {
        organize.custom_template = args.template.clone();
    }
    if let Some(mode) = args.mode {
        organize.mode = mode;
    }
    if let Some(conflict) = args.conflict {
        organize.conflict = conflict;
    }
    if args.copy {
        organize.operation = Operation::Copy;
    }
    organize.dry_run |= args.dry_run;
    organize.recursive &= !args.no_recursive;
    organize.learning &= !args.no_learning;
    config.validate().or_raise(|| ErrorKind::Config)?;

    let source: BackendHandle = Arc::new(
        LocalBackend::existing("source", &args.source).or_raise(|| ErrorKind::Storage(args.source.clone()))?,
    );
    let target: BackendHandle = if same_directory(&args.source, &args.target) {
        source.clone()
    } else {
        Arc::new(LocalBackend::new("target", &args.target).or_raise(|| ErrorKind::Storage(args.target.clone()))?)
    };

    let options = config.organize.options();
    let style = config.organize.style().or_raise(|| ErrorKind::Config)?;
    let control = RunControl::new();
    let mut organizer = Organizer::new(source, target)
        .style(style)
        .options(options.clone())
        .suggestions(config.suggestions.engine())
        .with_control(control.clone());

    let manager = ProfileManager::new(&config.profiles_dir);
    let mut classifier = KeywordClassifier::new();
    if attach_profile(&manager, &args, &options).await? {
        classifier = classifier.with_categories(&manager.custom_categories());
        organizer = organizer.profile(manager.clone());
    }
    organizer = organizer.classifier(Arc::new(classifier));

    let answering = if options.mode.is_interactive() {
        let (sender, receiver) = decision::channel();
        organizer = organizer.decisions(sender);
        Some(tokio::spawn(prompt::answer(receiver)))
    } else {
        None
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping after the current file");
            control.cancel();
        }
    });

    let summary = drive(organizer.run(), &mut Reporter).await;
    drop(organizer);
    if let Some(answering) = answering {
        answering.abort();
    }
    println!("{summary}");

    // A profile started for this run is only worth keeping if it learned something.
    let keep = args.profile.is_some() || summary.learned() > 0;
    if options.learning && !options.dry_run && manager.is_dirty() && keep {
        let path = manager.save(args.profile.as_deref()).await.or_raise(|| ErrorKind::Profile)?;
        println!("profile saved to {}", path.display());
    }
    Ok(summary.state)
}

/// Loads `--profile` into `manager`. Without one, an interactive run that
/// records decisions starts a new profile named after the game in `source`.
/// Returns whether the run has a profile.
async fn attach_profile(manager: &ProfileManager, args: &OrganizeArgs, options: &Options) -> Result<bool> {
    if let Some(path) = &args.profile {
        manager.load(path).await.or_raise(|| ErrorKind::Profile)?;
        return Ok(true);
    }
    if !options.learning || options.dry_run || !options.mode.is_interactive() {
        return Ok(false);
    }
    let game = texsort_identify::identify(&args.source);
    let serial = game.serial.as_ref().map(|s| s.as_str());
    let name = game.title.as_deref().or(serial).unwrap_or(UNNAMED_GAME);
    manager.create(name, serial, None);
    tracing::info!(game = name, "No profile given, learning into a new one");
    Ok(true)
}

/// Whether both paths name the same existing directory.
fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use rstest::rstest;
    use texsort_organize::Mode;

    fn organize_args(extra: &[&str]) -> OrganizeArgs {
        let args = ["texsort", "organize", "dumps/SLUS-20917", "sorted"].into_iter().chain(extra.iter().copied());
        match Cli::parse_from(args).command {
            Command::Organize(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn options(mode: Mode) -> Options {
        Options { mode, ..Options::default() }
    }

    #[rstest]
    #[case(Mode::Suggested)]
    #[case(Mode::Manual)]
    #[tokio::test]
    async fn test_interactive_run_without_profile_learns_into_new_one(#[case] mode: Mode) {
        let dir = tempfile::tempdir().unwrap();
        let manager = ProfileManager::new(dir.path());
        assert!(attach_profile(&manager, &organize_args(&[]), &options(mode)).await.unwrap());
        let profile = manager.profile().unwrap();
        assert_eq!(profile.metadata.game_name, "God of War II");
        assert_eq!(profile.metadata.game_serial.as_deref(), Some("SLUS-20917"));
        assert_eq!(manager.path(), None);
    }

    #[rstest]
    #[case::automatic(options(Mode::Automatic))]
    #[case::no_learning(Options { learning: false, ..options(Mode::Suggested) })]
    #[case::dry_run(Options { dry_run: true, ..options(Mode::Manual) })]
    #[tokio::test]
    async fn test_no_profile_when_nothing_is_recorded(#[case] options: Options) {
        let dir = tempfile::tempdir().unwrap();
        let manager = ProfileManager::new(dir.path());
        assert!(!attach_profile(&manager, &organize_args(&[]), &options).await.unwrap());
        assert!(manager.profile().is_none());
    }

    #[tokio::test]
    async fn test_explicit_profile_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jak.json");
        let author = ProfileManager::new(dir.path());
        author.create("Jak II", None, None);
        author.save(Some(path.as_path())).await.unwrap();

        let manager = ProfileManager::new(dir.path());
        let args = organize_args(&["--profile", path.to_str().unwrap()]);
        assert!(attach_profile(&manager, &args, &options(Mode::Automatic)).await.unwrap());
        assert_eq!(manager.profile().unwrap().metadata.game_name, "Jak II");
        assert_eq!(manager.path(), Some(path));
    }
}

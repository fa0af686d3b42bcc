use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use texsort_organize::{ConflictPolicy, Mode, StyleKind};

#[derive(Parser, Debug)]
#[command(name = "texsort", version, about = "Sort game texture dumps into folders, learning from corrections")]
pub struct Cli {
    /// Extra configuration file (TOML, YAML or JSON).
    #[arg(long, global = true, env = "TEXSORT_CONFIG")]
    pub config: Option<PathBuf>,
    /// Log at debug level (`RUST_LOG` still takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Move (or copy) the textures of SOURCE into folders under TARGET
    Organize(OrganizeArgs),
    /// Manage learning profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Guess which game a dump folder belongs to
    Identify {
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct OrganizeArgs {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Folder layout [sims, neopets, flat, game_area, asset_pipeline, modular, minimalist, maximum_detail, custom]
    #[arg(long)]
    pub style: Option<StyleKind>,
    /// A segment of the custom style; repeat for nested folders
    #[arg(long = "template", value_name = "SEGMENT")]
    pub template: Vec<String>,
    /// Who picks each folder [automatic, suggested, manual]
    #[arg(long)]
    pub mode: Option<Mode>,
    /// What to do when a destination is taken [skip, overwrite, rename]
    #[arg(long)]
    pub conflict: Option<ConflictPolicy>,
    /// Copy instead of moving
    #[arg(long)]
    pub copy: bool,
    /// Report where files would go without touching anything
    #[arg(long)]
    pub dry_run: bool,
    /// Only organize files directly inside SOURCE
    #[arg(long)]
    pub no_recursive: bool,
    /// Learning profile to suggest from and record into
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,
    /// Do not record decisions in the profile
    #[arg(long)]
    pub no_learning: bool,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Create and save an empty profile
    New {
        game: String,
        #[arg(long)]
        serial: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// Defaults to a generated name in the profiles directory
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// List the profiles in the profiles directory
    List,
    /// Show a profile's metadata and statistics
    Show {
        path: PathBuf,
    },
    /// Write a shareable copy of a profile, optionally encrypted
    Export {
        path: PathBuf,
        output: PathBuf,
        /// Encrypt the export with this password
        #[arg(long, env = "TEXSORT_PROFILE_PASSWORD")]
        password: Option<String>,
    },
    /// Import a shared profile, merging it into an existing one
    Import {
        file: PathBuf,
        /// Profile to merge into; without it the import is saved as a new profile
        #[arg(long, value_name = "FILE")]
        into: Option<PathBuf>,
        /// Replace the target profile instead of merging
        #[arg(long)]
        replace: bool,
        /// Password of an encrypted export
        #[arg(long, env = "TEXSORT_PROFILE_PASSWORD")]
        password: Option<String>,
    },
    /// Delete a profile file
    Delete {
        path: PathBuf,
    },
    /// Add a custom category (and its keywords) to a profile
    Category {
        path: PathBuf,
        name: String,
        keywords: Vec<String>,
    },
    /// Forget every learned mapping of a profile
    Clear {
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_organize_flags() {
        let cli = Cli::try_parse_from([
            "texsort",
            "organize",
            "dump",
            "library",
            "--style",
            "game-area",
            "--mode",
            "suggested",
            "--conflict",
            "skip",
            "--copy",
            "-v",
        ])
        .unwrap();
        let Command::Organize(args) = cli.command else {
            panic!("expected organize");
        };
        assert!(cli.verbose);
        assert_eq!(args.style, Some(StyleKind::GameArea));
        assert_eq!(args.mode, Some(Mode::Suggested));
        assert_eq!(args.conflict, Some(ConflictPolicy::Skip));
        assert!(args.copy && !args.dry_run);
    }

    #[test]
    fn test_rejects_unknown_style() {
        assert!(Cli::try_parse_from(["texsort", "organize", "a", "b", "--style", "pinterest"]).is_err());
    }
}

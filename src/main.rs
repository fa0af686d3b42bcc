mod cli;
mod commands;
mod error;
mod prompt;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use std::process::ExitCode;
use texsort_config::Config;
use texsort_organize::RunState;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(RunState::Completed) => ExitCode::SUCCESS,
        Ok(RunState::Cancelled) => ExitCode::from(130),
        Ok(RunState::Failed) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<RunState> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Organize(args) => return commands::organize::run(config, args).await,
        Command::Profile(command) => commands::profile::run(config, command).await?,
        Command::Identify { path } => commands::identify::run(&path),
    }
    Ok(RunState::Completed)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "texsort=debug" } else { "texsort=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

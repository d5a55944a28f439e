//! ddlkit CLI - schema diffing and migration planning from the command line.

use clap::Parser;

use ddlkit_cli::cli::{Cli, Command};
use ddlkit_cli::commands;
use ddlkit_cli::error::CliResult;
use ddlkit_cli::{logging, output};

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = cli.config.clone();

    match cli.command {
        Command::Init(args) => commands::init::run(args).await,
        Command::Generate(args) => commands::generate::run(config, args).await,
        Command::Diff(args) => commands::diff::run(args).await,
        Command::Check(args) => commands::check::run(config, args).await,
        Command::Pull(args) => commands::pull::run(config, args).await,
        Command::Drift(args) => commands::drift::run(config, args).await,
        Command::Version => commands::version::run().await,
    }
}

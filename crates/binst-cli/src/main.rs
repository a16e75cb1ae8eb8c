//! binst CLI

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use binst_cli::ui::Output;
use binst_cli::{Cli, Commands, cmd, exit};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = cli.validate() {
        err.exit();
    }
    let output = Output::new(cli.quiet);

    match run(cli, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let failure = exit::classify(&err);
            output.error(failure.label, &format!("{err:#}"));
            ExitCode::from(failure.code)
        }
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let dry_run = cli.dry_run;

    match cli.command {
        Commands::Install(args) => cmd::install::install(&args, dry_run, output).await,
        Commands::Verify {
            path,
            args,
            timeout,
        } => cmd::verify::verify(&path, &args, timeout, output),
        Commands::Hash { algorithm, files } => cmd::hash::hash(&files, algorithm),
        Commands::Clean { dest } => cmd::clean::clean(dest, dry_run, output),
    }
}

mod cli;
mod commands;
mod interactive;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use commands::CommandOptions;

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\n\nInterrupted by user (Ctrl+C); unpushed edits stay recorded in the ledger");
        std::process::exit(130);
    })
    .context("Failed to set Ctrl+C handler")?;

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let options = CommandOptions::new(cli.verbose, cli.config.as_deref(), &cli.set, &cli.after);

    // `--after` without a subcommand means a one-shot init
    let command = cli.command.unwrap_or(if cli.after.is_empty() {
        Commands::Shell
    } else {
        Commands::Init
    });

    match command {
        Commands::Init => {
            commands::Init::execute(&options).context("Failed to execute init command")?;
        }
        Commands::Diff { patch } => {
            commands::Diff::execute(&options, patch).context("Failed to execute diff command")?;
        }
        Commands::Push => {
            commands::Push::execute(&options).context("Failed to execute push command")?;
        }
        Commands::Pull => {
            commands::Pull::execute(&options).context("Failed to execute pull command")?;
        }
        Commands::Shell => {
            commands::Shell::execute(&options).context("Failed to execute shell command")?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            tracing_subscriber::EnvFilter::new("debug,ignore=warn,globset=warn")
        } else {
            tracing_subscriber::EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        ui::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: config::resolve(cli.config.as_ref())?,
    };

    match cli.command {
        Command::Status(args) => commands::declarative::status(&ctx, args.target.as_deref()),
        Command::Diff(args) => commands::declarative::diff(&ctx, args.target.as_deref()),
        Command::Apply(args) => commands::declarative::apply(&ctx, &args),
        Command::List { json } => commands::list::run(&ctx, json),
        Command::Validate => commands::validate::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "chprov", &mut io::stdout());
            Ok(())
        }
    }
}

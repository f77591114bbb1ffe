use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chprov")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative ClickHouse database provisioning", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file [default: ~/.config/chprov/config.toml]
    #[arg(short, long, global = true, env = crate::paths::ENV_CONFIG)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show declared databases next to what the server has
    Status(TargetArgs),

    /// Preview what apply would change
    Diff(TargetArgs),

    /// Create and drop databases until the server matches the config
    Apply(ApplyArgs),

    /// List every database on the server
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check the config file without contacting the server
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Only databases whose name contains this text
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only databases whose name contains this text
    pub target: Option<String>,

    /// Show what would change without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of databases applied concurrently
    #[arg(short, long, default_value = "1")]
    pub jobs: usize,

    /// Re-run discovery after each statement instead of trusting its exit status
    #[arg(long)]
    pub rediscover: bool,
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
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "chprov", "-vv", "apply", "events", "--dry-run", "--jobs", "4", "--rediscover",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);

        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.target.as_deref(), Some("events"));
        assert!(args.dry_run);
        assert!(!args.yes);
        assert_eq!(args.jobs, 4);
        assert!(args.rediscover);
    }

    #[test]
    fn test_parse_global_config() {
        let cli = Cli::try_parse_from(["chprov", "list", "--json", "--config", "/srv/ch.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/srv/ch.toml")));
        assert!(matches!(cli.command, Command::List { json: true }));
    }
}

//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// repowatch - upstream-divergence watcher for git checkouts
#[derive(Parser)]
#[command(
    name = "repowatch",
    about = "Watch a git checkout for upstream updates",
    version,
    after_help = "Logs are written to: ~/.local/share/repowatch/logs/repowatch.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Check for upstream updates now
    Check,

    /// Show the incoming (unmerged upstream) log
    Log,

    /// Pull the latest upstream changes
    Pull {
        /// Pull without the interactive log/update prompt
        #[arg(long)]
        confirm: bool,
    },

    /// Evaluate and print the current divergence without fetching
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run the automatic check timer in the foreground until interrupted
    Watch,
}

/// Output format for status output
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from(["repowatch", "check"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Check)));
    }

    #[test]
    fn test_cli_parses_pull_confirm() {
        let cli = Cli::try_parse_from(["repowatch", "pull", "--confirm"]).unwrap();
        match cli.command {
            Some(Command::Pull { confirm }) => assert!(confirm),
            _ => panic!("Expected pull"),
        }
    }

    #[test]
    fn test_cli_parses_status_format() {
        let cli = Cli::try_parse_from(["repowatch", "status", "--format", "json"]).unwrap();
        match cli.command {
            Some(Command::Status { format }) => assert_eq!(format, OutputFormat::Json),
            _ => panic!("Expected status"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["repowatch", "--verbose", "watch"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Command::Watch)));
    }
}

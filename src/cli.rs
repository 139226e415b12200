//! Command-line interface definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Spaced-repetition vocabulary review
#[derive(Parser, Debug)]
#[command(name = "vocab-review")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a single word to the vocabulary pool
    Add { term: String, definition: String },

    /// Import a JSON vocabulary list
    Import { file: PathBuf },

    /// Review the cards that are due
    Review {
        /// Maximum number of cards in this session
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Print review statistics as JSON
    Stats,

    /// Export every card schedule to a JSON file
    Export { file: PathBuf },

    /// Pretend time has passed
    AdvanceDay {
        #[arg(short, long, default_value_t = 1)]
        days: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_review_with_limit() {
        let cli = Cli::parse_from(["vocab-review", "review", "--limit", "5"]);
        assert!(matches!(cli.command, Commands::Review { limit: Some(5) }));
    }

    #[test]
    fn test_advance_day_defaults_to_one() {
        let cli = Cli::parse_from(["vocab-review", "-v", "advance-day"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::AdvanceDay { days: 1 }));
    }
}

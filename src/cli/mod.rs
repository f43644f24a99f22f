//! CLI module for the detectable catalog loader
//!
//! Provides command-line access to loading, inspecting and querying the catalog.

mod commands;
mod output;

use clap::{Parser, Subcommand};

use output::OutputFormat;

/// Detectable Catalog - game list loader with mirror fallback
#[derive(Parser, Debug)]
#[command(name = "detectable-catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[command(flatten)]
    pub output: OutputOptions,

    /// Report total failures on stderr instead of a native dialog
    #[arg(long, global = true)]
    pub no_dialog: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output formatting options
#[derive(Parser, Debug, Clone)]
pub struct OutputOptions {
    /// Output in JSON format (for machine parsing)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl OutputOptions {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the game list (mirror with bundled fallback) and show a summary
    Fetch {
        /// Include the activity log in the output
        #[arg(long)]
        log: bool,
    },

    /// Show mirror freshness metadata
    Meta,

    /// Find the game a process executable belongs to
    Lookup {
        /// Executable name or path (e.g., "cs2.exe")
        executable: String,
    },

    /// Search games by name or alias
    Search {
        /// Text to look for
        query: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.output.format();
    let quiet = cli.output.quiet;
    let verbose = cli.output.verbose;
    let no_dialog = cli.no_dialog;

    match cli.command {
        Commands::Fetch { log } => commands::catalog::fetch(log, verbose, no_dialog, format).await,
        Commands::Meta => commands::catalog::meta(format).await,
        Commands::Lookup { executable } => {
            commands::catalog::lookup(&executable, no_dialog, format, quiet).await
        }
        Commands::Search { query, limit } => {
            commands::catalog::search(&query, limit, no_dialog, format).await
        }
        Commands::Config { command } => commands::config::run(command, format, quiet).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch_with_globals() {
        let cli = Cli::try_parse_from(["detectable-catalog", "fetch", "--log", "--json", "--no-dialog"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Fetch { log: true }));
        assert_eq!(cli.output.format(), OutputFormat::Json);
        assert!(cli.no_dialog);
    }

    #[test]
    fn test_parse_search_default_limit() {
        let cli = Cli::try_parse_from(["detectable-catalog", "search", "counter"]).unwrap();
        match cli.command {
            Commands::Search { query, limit } => {
                assert_eq!(query, "counter");
                assert_eq!(limit, 20);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_lookup_requires_executable() {
        assert!(Cli::try_parse_from(["detectable-catalog", "lookup"]).is_err());
    }
}

//! CLI argument definitions using clap
//!
//! Commands:
//! - relquery compile --config <path> --collection <name>
//! - relquery validate --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// relquery - compile declarative relational filters into SQL
#[derive(Parser, Debug)]
#[command(name = "relquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log every compilation step to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile one JSON query read from stdin
    Compile {
        /// Path to configuration file
        #[arg(long, default_value = "./relquery.json")]
        config: PathBuf,

        /// Root collection of the query
        #[arg(long)]
        collection: String,

        /// Seed join aliases for reproducible output
        #[arg(long)]
        alias_seed: Option<u64>,
    },

    /// Load and check the schema overview
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./relquery.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

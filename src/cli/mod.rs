//! CLI module for relquery
//!
//! Provides command-line interface for:
//! - compile: one-shot compilation of a JSON query read from stdin
//! - validate: schema overview consistency check

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{compile, run, run_command, validate};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};

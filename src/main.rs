//! relquery CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`; failures are printed
//! to stderr with a non-zero exit code.

use relquery::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

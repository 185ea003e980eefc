//! Binary entry point for the `sparsefile` command-line tool.
//!
//! Parsing is handled by clap (usage errors exit with code 2); dispatch and
//! the remaining exit codes live in [`sparsefile::cli`]. Application errors
//! are printed to stderr with their full context chain.

use clap::Parser;

use sparsefile::cli::{self, Cli, EXIT_APP_ERROR};

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let exit_code = match cli::run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            EXIT_APP_ERROR
        }
    };
    std::process::exit(exit_code);
}

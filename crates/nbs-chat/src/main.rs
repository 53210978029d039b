//! nbs-chat - shared chat log for cooperating agent processes
//!
//! A thin CLI over [`nbs_core::chat`]: every command opens the log file
//! named on the command line, does one operation and exits. Exit codes are
//! shared with `nbs-bus` (see [`nbs_core::error::exit`]).

use clap::Parser;
use clap::error::ErrorKind;
use nbs_core::error::{exit, exit_code_for};

mod commands;

use commands::Cli;

fn main() {
    nbs_core::logging::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit::OK,
                _ => exit::INVALID_ARGS,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    match cli.execute() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(exit_code_for(&e));
        }
    }
}

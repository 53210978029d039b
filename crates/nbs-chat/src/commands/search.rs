//! Search command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::ChatLog;
use nbs_core::error::exit;
use std::path::PathBuf;

use super::print_messages;

/// Search message bodies
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Chat file
    path: PathBuf,

    /// Case-insensitive regex; matched literally if it is not a valid regex
    #[arg(allow_hyphen_values = true)]
    pattern: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the search command
pub fn execute(args: SearchArgs) -> Result<i32> {
    let hits = ChatLog::new(&args.path).search(&args.pattern)?;
    print_messages(&hits, args.json, true)?;
    Ok(exit::OK)
}

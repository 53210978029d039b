//! Create command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::ChatLog;
use nbs_core::error::exit;
use std::path::PathBuf;

/// Create a new, empty chat file
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Path of the chat file to create
    path: PathBuf,
}

/// Execute the create command
pub fn execute(args: CreateArgs) -> Result<i32> {
    ChatLog::new(&args.path).create()?;
    println!("Created: {}", args.path.display());
    Ok(exit::OK)
}

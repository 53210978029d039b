//! Ack command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::EventQueue;
use nbs_core::error::exit;
use std::path::PathBuf;

/// Move a pending event to processed/
#[derive(Args, Debug)]
pub struct AckArgs {
    /// Queue directory
    dir: PathBuf,

    /// Event file name as listed by `check`
    file: String,
}

/// Execute the ack command
pub fn execute(args: AckArgs) -> Result<i32> {
    let queue = EventQueue::open(&args.dir)?;
    queue.ack(&args.file)?;
    Ok(exit::OK)
}

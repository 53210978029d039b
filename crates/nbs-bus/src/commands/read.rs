//! Read command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::EventQueue;
use nbs_core::error::exit;
use std::io::Write;
use std::path::PathBuf;

/// Print the raw content of a pending event
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Queue directory
    dir: PathBuf,

    /// Event file name as listed by `check`
    file: String,
}

/// Execute the read command
pub fn execute(args: ReadArgs) -> Result<i32> {
    let queue = EventQueue::open(&args.dir)?;
    let content = queue.read(&args.file)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(&content)?;
    out.flush()?;
    Ok(exit::OK)
}

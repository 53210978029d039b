//! Ack-all command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::EventQueue;
use nbs_core::error::exit;
use std::path::PathBuf;

/// Acknowledge every pending event
#[derive(Args, Debug)]
pub struct AckAllArgs {
    /// Queue directory
    dir: PathBuf,

    /// Only events published by this source
    #[arg(long, value_name = "SOURCE")]
    handle: Option<String>,
}

/// Execute the ack-all command
pub fn execute(args: AckAllArgs) -> Result<i32> {
    let queue = EventQueue::open(&args.dir)?;
    let acked = queue.ack_all(args.handle.as_deref())?;
    let noun = if acked == 1 { "event" } else { "events" };
    println!("Acknowledged {acked} {noun}");
    Ok(exit::OK)
}

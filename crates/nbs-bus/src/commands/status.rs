//! Status command implementation

use anyhow::Result;
use chrono::DateTime;
use clap::Args;
use nbs_core::EventQueue;
use nbs_core::error::exit;
use std::path::PathBuf;

use super::format_kb;

/// Show queue counts and processed/ usage
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Queue directory
    dir: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the status command
pub fn execute(args: StatusArgs) -> Result<i32> {
    let queue = EventQueue::open(&args.dir)?;
    let status = queue.status(&queue.config())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(exit::OK);
    }

    let p = &status.pending;
    println!(
        "Pending: {} total (critical={}, high={}, normal={}, low={})",
        p.total(),
        p.critical,
        p.high,
        p.normal,
        p.low
    );
    if let Some(oldest) = status
        .oldest_pending_us
        .and_then(DateTime::from_timestamp_micros)
    {
        println!("Oldest pending: {}", oldest.format("%Y-%m-%dT%H:%M:%SZ"));
    }
    println!(
        "Processed: {} events ({})",
        status.processed_count,
        format_kb(status.processed_bytes)
    );
    if status.stale > 0 {
        println!(
            "WARNING: {} stale event(s) (unacked > {}s)",
            status.stale, status.ack_timeout_secs
        );
    }
    Ok(exit::OK)
}

//! Prune command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::EventQueue;
use nbs_core::error::exit;
use std::path::PathBuf;

use super::format_kb;

/// Delete the oldest processed events to fit a byte budget
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Queue directory
    dir: PathBuf,

    /// Byte budget for processed/ (default from config.yaml, else 16MiB)
    #[arg(long, value_name = "BYTES", value_parser = clap::value_parser!(u64).range(1..))]
    max_bytes: Option<u64>,
}

/// Execute the prune command
pub fn execute(args: PruneArgs) -> Result<i32> {
    let queue = EventQueue::open(&args.dir)?;
    let max_bytes = args
        .max_bytes
        .unwrap_or_else(|| queue.config().retention_max_bytes);

    let report = queue.prune(max_bytes)?;
    if !report.processed_dir_present {
        println!("Pruned 0 events (no processed directory)");
        return Ok(exit::OK);
    }
    println!(
        "Pruned {} event(s) ({} remaining, {} limit)",
        report.pruned,
        format_kb(report.remaining_bytes),
        format_kb(report.limit_bytes)
    );
    Ok(exit::OK)
}

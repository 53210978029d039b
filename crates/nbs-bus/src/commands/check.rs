//! Check command implementation

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use nbs_core::EventQueue;
use nbs_core::bus::format_age;
use nbs_core::error::exit;
use std::path::PathBuf;

/// List pending events, most urgent first
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Queue directory
    dir: PathBuf,

    /// Only events published by this source
    #[arg(long, value_name = "SOURCE")]
    handle: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the check command
pub fn execute(args: CheckArgs) -> Result<i32> {
    let queue = EventQueue::open(&args.dir)?;
    let events = queue.check(args.handle.as_deref())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(exit::OK);
    }

    let now_us = Utc::now().timestamp_micros();
    for event in &events {
        println!(
            "[{}] {} ({})",
            event.priority,
            event.file_name,
            format_age(now_us.saturating_sub(event.timestamp_us))
        );
    }
    Ok(exit::OK)
}

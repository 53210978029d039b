//! Publish command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::bus::PublishOptions;
use nbs_core::error::exit;
use nbs_core::{Event, EventQueue, Priority};
use std::ffi::OsString;
use std::path::PathBuf;

/// Write a new event into the queue
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Queue directory
    dir: PathBuf,

    /// Producer name
    source: String,

    /// Event type
    #[arg(value_name = "TYPE")]
    kind: String,

    /// critical, high, normal or low
    priority: Priority,

    /// Opaque payload, stored byte for byte (may start with `-`)
    #[arg(allow_hyphen_values = true)]
    payload: Option<OsString>,

    /// Drop the event if one with the same source and type is pending and
    /// younger than this many seconds (0 disables; default from config.yaml)
    #[arg(long, value_name = "SECONDS")]
    dedup_window: Option<u64>,
}

/// Execute the publish command
pub fn execute(args: PublishArgs) -> Result<i32> {
    let queue = EventQueue::open(&args.dir)?;
    let options = PublishOptions::from_config(&queue.config(), args.dedup_window);
    let payload = args.payload.map(OsString::into_encoded_bytes);
    let event = Event::new(&args.source, &args.kind, args.priority, payload)?;

    let name = queue.publish(&event, &options)?;
    println!("{name}");
    Ok(exit::OK)
}

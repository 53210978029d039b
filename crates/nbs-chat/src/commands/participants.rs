//! Participants command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::ChatLog;
use nbs_core::error::exit;
use std::path::PathBuf;

/// List participants with message counts
#[derive(Args, Debug)]
pub struct ParticipantsArgs {
    /// Chat file
    path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the participants command
pub fn execute(args: ParticipantsArgs) -> Result<i32> {
    let participants = ChatLog::new(&args.path).participants()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&participants)?);
        return Ok(exit::OK);
    }
    for p in &participants {
        let noun = if p.count == 1 { "message" } else { "messages" };
        println!("{:<24} {} {noun}", p.handle, p.count);
    }
    Ok(exit::OK)
}

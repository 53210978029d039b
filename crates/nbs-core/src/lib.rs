//! Core library for nbs: file-based coordination between agent processes
//!
//! Two primitives share one crash-safety model built from plain files,
//! advisory locks and atomic renames:
//!
//! - [`chat`]: a shared append-only chat log with per-reader cursors
//! - [`bus`]: a directory-backed priority event queue
//!
//! [`bridge`] connects them, publishing chat activity and `@mentions` to the
//! event queue. No daemon is involved; any number of unrelated processes may
//! use the same files concurrently.

pub mod bridge;
pub mod bus;
pub mod chat;
pub mod codec;
pub mod error;
pub mod io;
pub mod logging;
pub mod text;

pub use bridge::BusBridge;
pub use bus::{BusConfig, Event, EventQueue, Priority};
pub use chat::{ChatLog, ChatOptions, Message, Notifier, PollOutcome};
pub use error::NbsError;

//! Error types shared by the chat log and the event bus

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Process exit codes shared by `nbs-chat` and `nbs-bus`.
pub mod exit {
    pub const OK: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const ITEM_NOT_FOUND: i32 = 3;
    pub const INVALID_ARGS: i32 = 4;
    pub const DUPLICATE: i32 = 5;
}

/// Errors that can occur during chat log and event bus operations
#[derive(Error, Debug)]
pub enum NbsError {
    /// Target already exists (e.g. `create` on an existing chat file)
    #[error("File already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Chat file or queue directory does not exist
    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    /// A specific event is not pending in the queue
    #[error("Event not found: {name}")]
    EventNotFound { name: String },

    /// Bad priority, malformed flag, invalid handle or filename
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Publish rejected because an event with the same dedup key is pending
    #[error("Duplicate event {key} dropped (within {window_secs}s dedup window)")]
    Duplicate { key: String, window_secs: u64 },

    /// Failed to acquire an advisory lock within the wait budget
    #[error("Failed to acquire lock on {path} after {waited:?}")]
    LockTimeout { path: PathBuf, waited: Duration },

    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl NbsError {
    /// Build an `Io` error, promoting `ErrorKind::NotFound` to [`NbsError::NotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => NbsError::NotFound { path },
            _ => NbsError::Io { path, source },
        }
    }

    /// Exit code for this error under the shared CLI convention.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            NbsError::AlreadyExists { .. } => exit::FAILURE,
            NbsError::NotFound { .. } => exit::NOT_FOUND,
            NbsError::EventNotFound { .. } => exit::ITEM_NOT_FOUND,
            NbsError::InvalidArgument(_) => exit::INVALID_ARGS,
            NbsError::Duplicate { .. } => exit::DUPLICATE,
            NbsError::LockTimeout { .. } | NbsError::Io { .. } => exit::FAILURE,
        }
    }
}

/// Exit code for an error returned by a CLI command.
///
/// Errors that do not wrap an [`NbsError`] are generic failures.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<NbsError>()
        .map_or(exit::FAILURE, NbsError::exit_code)
}

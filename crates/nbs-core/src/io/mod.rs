//! Crash-safe file mutation
//!
//! Every file the chat log owns is changed through [`atomic::rewrite`]: an
//! exclusive advisory lock on a sibling `.lock` file serializes writers, and
//! the new content is renamed into place from a temporary file. Event files
//! are never rewritten; they are created with [`atomic::create_new`]-style
//! write-then-rename and moved with a single `rename`.

pub mod atomic;
pub mod lock;

pub use atomic::{Rewrite, create_new, rewrite, rewrite_or_create};
pub use lock::{DEFAULT_LOCK_WAIT, FileLock, acquire_lock, lock_path_for};

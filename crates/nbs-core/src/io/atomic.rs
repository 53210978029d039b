//! Locked read-modify-write through a temporary file
//!
//! This is the only way a chat log or cursor file is mutated:
//!
//! 1. take the exclusive lock on `<target>.lock`
//! 2. read the current full content
//! 3. compute the new content with a caller-supplied transform
//! 4. write it to a fresh temporary file in the target's directory and fsync
//! 5. rename the temporary file over the target
//! 6. release the lock (on drop)
//!
//! A process killed before step 5 leaves the target untouched and at worst
//! orphans a `.tmp-*` file. Readers never take the lock: they always see
//! either the old or the new file in full.

use crate::error::NbsError;
use crate::io::lock::{acquire_lock, lock_path_for};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

/// What a transform wants done with the target.
pub enum Rewrite<T> {
    /// Replace the target with these bytes and return the value.
    Replace(Vec<u8>, T),
    /// Leave the target as it is and return the value.
    Keep(T),
}

/// Apply `transform` to the content of an existing `target` under its lock.
///
/// # Errors
///
/// `NotFound` if `target` does not exist, `LockTimeout` if the lock is not
/// obtained within `lock_wait`, whatever the transform returns, or `Io` for
/// failures while writing the replacement.
pub fn rewrite<T, F>(target: &Path, lock_wait: Duration, transform: F) -> Result<T, NbsError>
where
    F: FnOnce(Vec<u8>) -> Result<Rewrite<T>, NbsError>,
{
    rewrite_inner(target, lock_wait, false, |current| {
        let current = current.ok_or_else(|| NbsError::NotFound {
            path: target.to_path_buf(),
        })?;
        transform(current)
    })
}

/// Like [`rewrite`], but a missing target is handed to the transform as `None`.
pub fn rewrite_or_create<T, F>(
    target: &Path,
    lock_wait: Duration,
    transform: F,
) -> Result<T, NbsError>
where
    F: FnOnce(Option<Vec<u8>>) -> Result<Rewrite<T>, NbsError>,
{
    rewrite_inner(target, lock_wait, true, transform)
}

fn rewrite_inner<T, F>(
    target: &Path,
    lock_wait: Duration,
    allow_missing: bool,
    transform: F,
) -> Result<T, NbsError>
where
    F: FnOnce(Option<Vec<u8>>) -> Result<Rewrite<T>, NbsError>,
{
    // no lock file litter next to a target that does not exist
    if !allow_missing {
        fs::metadata(target).map_err(|e| NbsError::io(target, e))?;
    }

    let lock_path = lock_path_for(target);
    let _lock = acquire_lock(&lock_path, lock_wait)?;

    let current = match fs::read(target) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => None,
        Err(e) => return Err(NbsError::io(target, e)),
    };

    match transform(current)? {
        Rewrite::Keep(value) => Ok(value),
        Rewrite::Replace(bytes, value) => {
            replace_contents(target, &bytes)?;
            tracing::debug!(path = %target.display(), bytes = bytes.len(), "rewrote file");
            Ok(value)
        }
    }
}

/// Write `bytes` to a temporary sibling of `target`, then rename it into place.
pub(crate) fn replace_contents(target: &Path, bytes: &[u8]) -> Result<(), NbsError> {
    let tmp = write_temp_sibling(target, bytes)?;
    tmp.persist(target)
        .map_err(|e| NbsError::io(target, e.error))?;
    Ok(())
}

/// Write `bytes` to a new file at `target`, failing if it already exists.
///
/// The content is fully written before the name appears, so no reader can
/// observe a half-written file.
pub fn create_new(target: &Path, bytes: &[u8]) -> Result<(), NbsError> {
    if target.exists() {
        return Err(NbsError::AlreadyExists {
            path: target.to_path_buf(),
        });
    }
    let tmp = write_temp_sibling(target, bytes)?;
    tmp.persist_noclobber(target).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            NbsError::AlreadyExists {
                path: target.to_path_buf(),
            }
        } else {
            NbsError::io(target, e.error)
        }
    })?;
    Ok(())
}

fn write_temp_sibling(target: &Path, bytes: &[u8]) -> Result<NamedTempFile, NbsError> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(|e| NbsError::io(dir, e))?;

    tmp.write_all(bytes)
        .map_err(|e| NbsError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| NbsError::io(tmp.path(), e))?;
    Ok(tmp)
}

//! File locking with backoff retry

use crate::error::NbsError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default time a writer waits for a contended lock before giving up.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(30);

const INITIAL_BACKOFF: Duration = Duration::from_millis(2);
const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// File lock guard that automatically releases on drop
///
/// The lock is an advisory `flock` on a sibling lock file. The kernel drops
/// it when the holding process exits, so a killed writer never blocks the
/// next one.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Path of the lock file backing this guard.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Lock file path used to serialize writers of `target`: `<target>.lock`.
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Acquire an exclusive lock on `path`, retrying until `max_wait` elapses
///
/// Backoff starts at 2ms and doubles up to 50ms between attempts.
///
/// # Errors
///
/// Returns `NbsError::LockTimeout` if the lock is still held when the budget
/// runs out, or `NbsError::Io`/`NotFound` if the lock file cannot be opened.
pub fn acquire_lock(path: &Path, max_wait: Duration) -> Result<FileLock, NbsError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| NbsError::io(path, e))?;

    let start = Instant::now();
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), waited = ?start.elapsed(), "lock acquired");
                return Ok(FileLock {
                    file,
                    path: path.to_path_buf(),
                });
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {}
            Err(e) => return Err(NbsError::io(path, e)),
        }

        let waited = start.elapsed();
        if waited >= max_wait {
            return Err(NbsError::LockTimeout {
                path: path.to_path_buf(),
                waited,
            });
        }
        std::thread::sleep(backoff.min(max_wait - waited));
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_lock_success() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("test.lock");

        let lock = acquire_lock(&lock_path, DEFAULT_LOCK_WAIT).unwrap();
        assert!(lock_path.exists());
        assert_eq!(lock.path(), lock_path);
    }

    #[test]
    fn test_lock_path_for_appends_suffix() {
        assert_eq!(
            lock_path_for(Path::new("/tmp/room.chat")),
            PathBuf::from("/tmp/room.chat.lock")
        );
        assert_eq!(
            lock_path_for(Path::new("/tmp/room.chat.cursors")),
            PathBuf::from("/tmp/room.chat.cursors.lock")
        );
    }

    #[test]
    fn test_acquire_lock_waits_for_holder() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = Arc::new(temp_dir.path().join("test.lock"));
        let barrier = Arc::new(Barrier::new(2));

        let lock_path_clone = Arc::clone(&lock_path);
        let barrier_clone = Arc::clone(&barrier);

        let holder = thread::spawn(move || {
            let _lock = acquire_lock(&lock_path_clone, DEFAULT_LOCK_WAIT).unwrap();
            barrier_clone.wait();
            thread::sleep(Duration::from_millis(100));
        });

        barrier.wait();
        let started = Instant::now();
        let result = acquire_lock(&lock_path, Duration::from_secs(5));
        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_millis(50));

        holder.join().unwrap();
    }

    #[test]
    fn test_acquire_lock_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("test.lock");

        let _held = acquire_lock(&lock_path, DEFAULT_LOCK_WAIT).unwrap();

        // flock locks belong to the open file description, so a second open
        // in the same process contends like another process would.
        let result = acquire_lock(&lock_path, Duration::from_millis(100));
        assert!(matches!(result, Err(NbsError::LockTimeout { .. })));
    }

    #[test]
    fn test_lock_auto_release() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("test.lock");

        {
            let _lock = acquire_lock(&lock_path, DEFAULT_LOCK_WAIT).unwrap();
        }

        let _lock2 = acquire_lock(&lock_path, Duration::from_millis(10)).unwrap();
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("missing/test.lock");
        let result = acquire_lock(&lock_path, DEFAULT_LOCK_WAIT);
        assert!(matches!(result, Err(NbsError::NotFound { .. })));
    }
}

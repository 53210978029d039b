//! Per-reader read cursors stored beside a chat log
//!
//! `<log>.cursors` holds one `handle=ordinal` line per reader that has ever
//! done a cursor-based read. It has its own lock (`<log>.cursors.lock`), so
//! cursor traffic never contends with senders on the log lock.

use crate::error::NbsError;
use crate::io::{Rewrite, rewrite_or_create};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FILE_COMMENT: &str = "# Read cursors: last-read message ordinal per handle";

/// Cursor sidecar path for a log: `<log>.cursors`.
pub fn cursor_path_for(log: &Path) -> PathBuf {
    let mut name = log.as_os_str().to_owned();
    name.push(".cursors");
    PathBuf::from(name)
}

/// Parsed cursor file, preserving entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursors {
    entries: Vec<(String, u64)>,
}

impl Cursors {
    /// Parse cursor file content. Comments, blank lines and malformed
    /// entries are ignored.
    pub fn parse(content: &[u8]) -> Self {
        let text = String::from_utf8_lossy(content);
        let mut entries: Vec<(String, u64)> = Vec::new();
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((handle, value)) = line.split_once('=') else {
                continue;
            };
            let Ok(value) = value.trim().parse::<u64>() else {
                tracing::warn!(handle, "ignoring invalid cursor value");
                continue;
            };
            if handle.is_empty() {
                continue;
            }
            match entries.iter_mut().find(|(h, _)| h == handle) {
                Some(entry) => entry.1 = value,
                None => entries.push((handle.to_string(), value)),
            }
        }
        Self { entries }
    }

    pub fn get(&self, handle: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(h, _)| h == handle)
            .map(|(_, v)| *v)
    }

    /// Raise `handle`'s cursor to `to`. Returns true if anything changed.
    /// A cursor never moves backwards.
    pub fn advance(&mut self, handle: &str, to: u64) -> bool {
        match self.entries.iter_mut().find(|(h, _)| h == handle) {
            Some(entry) if entry.1 >= to => false,
            Some(entry) => {
                entry.1 = to;
                true
            }
            None => {
                self.entries.push((handle.to_string(), to));
                true
            }
        }
    }

    pub fn render(&self) -> Vec<u8> {
        let mut out = String::from(FILE_COMMENT);
        out.push('\n');
        for (handle, value) in &self.entries {
            out.push_str(&format!("{handle}={value}\n"));
        }
        out.into_bytes()
    }
}

/// Cursor file for one chat log.
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
    lock_wait: Duration,
}

impl CursorStore {
    pub fn for_log(log: &Path, lock_wait: Duration) -> Self {
        Self {
            path: cursor_path_for(log),
            lock_wait,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all cursors without locking or writing anything.
    ///
    /// A missing file reads as empty.
    pub fn load(&self) -> Result<Cursors, NbsError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Cursors::parse(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Cursors::default()),
            Err(e) => Err(NbsError::io(&self.path, e)),
        }
    }

    /// Current cursor for `handle`, 0 if it has none.
    pub fn position(&self, handle: &str) -> Result<u64, NbsError> {
        Ok(self.load()?.get(handle).unwrap_or(0))
    }

    /// Locked read-modify-write of the cursor file.
    ///
    /// `f` receives the previous value for `handle` and returns the ordinal
    /// to advance to along with a result.
    /// The file is only rewritten when the cursor actually moves or the
    /// entry is new.
    pub fn update<T, F>(&self, handle: &str, f: F) -> Result<T, NbsError>
    where
        F: FnOnce(u64) -> Result<(u64, T), NbsError>,
    {
        rewrite_or_create(&self.path, self.lock_wait, |current| {
            let mut cursors = current.map(|c| Cursors::parse(&c)).unwrap_or_default();
            let previous = cursors.get(handle).unwrap_or(0);
            let (to, value) = f(previous)?;
            if cursors.advance(handle, to) {
                Ok(Rewrite::Replace(cursors.render(), value))
            } else {
                Ok(Rewrite::Keep(value))
            }
        })
    }

    /// Advance `handle`'s cursor to `to` only if it already has an entry.
    ///
    /// Returns whether an entry existed. Never creates the cursor file.
    pub fn advance_existing(&self, handle: &str, to: u64) -> Result<bool, NbsError> {
        if self.load()?.get(handle).is_none() {
            return Ok(false);
        }
        rewrite_or_create(&self.path, self.lock_wait, |current| {
            let mut cursors = current.map(|c| Cursors::parse(&c)).unwrap_or_default();
            if cursors.get(handle).is_none() {
                return Ok(Rewrite::Keep(false));
            }
            if cursors.advance(handle, to) {
                Ok(Rewrite::Replace(cursors.render(), true))
            } else {
                Ok(Rewrite::Keep(true))
            }
        })
    }
}

//! Directory-backed event queue
//!
//! Pending events are loose `*.event` files in the queue directory;
//! acknowledged ones live in `processed/`. Events are created by
//! write-then-rename and acknowledged by a single `rename`, so a file is in
//! exactly one of the two places at any instant and concurrent acks of the
//! same event have one winner.

use super::config::{BusConfig, MAX_SECONDS};
use super::event::{
    EVENT_SUFFIX, Event, EventFields, Priority, file_name_timestamp, validate_file_name,
};
use crate::error::NbsError;
use crate::io::{DEFAULT_LOCK_WAIT, acquire_lock, create_new};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Subdirectory holding acknowledged events.
pub const PROCESSED_DIR: &str = "processed";

/// Lock serializing deduplicated publishes.
pub const PUBLISH_LOCK: &str = ".publish.lock";

/// A pending event as listed by [`EventQueue::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEvent {
    pub file_name: String,
    pub priority: Priority,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Creation time in Unix microseconds.
    pub timestamp_us: i64,
}

/// Pending counts in [`Priority::ALL`] order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

impl PriorityCounts {
    fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::Critical => self.critical += 1,
            Priority::High => self.high += 1,
            Priority::Normal => self.normal += 1,
            Priority::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.normal + self.low
    }
}

/// Snapshot returned by [`EventQueue::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub pending: PriorityCounts,
    pub oldest_pending_us: Option<i64>,
    pub processed_count: usize,
    pub processed_bytes: u64,
    /// Pending events older than `ack_timeout_secs`; always 0 when disabled.
    pub stale: usize,
    pub ack_timeout_secs: u64,
}

/// Outcome of [`EventQueue::prune`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub pruned: usize,
    pub remaining_bytes: u64,
    pub limit_bytes: u64,
    /// False when there was no `processed/` directory at all.
    pub processed_dir_present: bool,
}

/// Per-call publish settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    /// Seconds within which a pending event with the same dedup key causes
    /// the publish to be dropped; 0 disables deduplication.
    pub dedup_window_secs: u64,
    pub lock_wait: Duration,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            dedup_window_secs: 0,
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }
}

impl PublishOptions {
    /// Options from queue config, with an optional explicit window override.
    pub fn from_config(config: &BusConfig, dedup_window_secs: Option<u64>) -> Self {
        Self {
            dedup_window_secs: dedup_window_secs.unwrap_or(config.dedup_window_secs),
            ..Self::default()
        }
    }
}

/// Handle to one queue directory.
#[derive(Debug, Clone)]
pub struct EventQueue {
    dir: PathBuf,
}

impl EventQueue {
    /// Open an existing queue directory.
    ///
    /// # Errors
    ///
    /// `NotFound` if `dir` is missing or is not a directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, NbsError> {
        let dir = dir.into();
        let meta = fs::metadata(&dir).map_err(|e| NbsError::io(&dir, e))?;
        if !meta.is_dir() {
            return Err(NbsError::NotFound { path: dir });
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.dir.join(PROCESSED_DIR)
    }

    /// Configuration from this queue's `config.yaml`.
    pub fn config(&self) -> BusConfig {
        BusConfig::load(&self.dir)
    }

    /// Write `event` into the queue and return its file name.
    ///
    /// With a non-zero dedup window, the scan for a pending event with the
    /// same `source:type` and the file creation happen under
    /// `.publish.lock`, so racing duplicates cannot both land.
    ///
    /// # Errors
    ///
    /// `Duplicate` if a matching pending event is inside the window,
    /// `InvalidArgument` for an out-of-range window, `LockTimeout` or `Io`
    /// on filesystem failures.
    pub fn publish(&self, event: &Event, options: &PublishOptions) -> Result<String, NbsError> {
        if options.dedup_window_secs > MAX_SECONDS {
            return Err(NbsError::InvalidArgument(format!(
                "dedup window too large: {}s",
                options.dedup_window_secs
            )));
        }
        if options.dedup_window_secs == 0 {
            return self.write_event(event);
        }

        let _lock = acquire_lock(&self.dir.join(PUBLISH_LOCK), options.lock_wait)?;
        let key = event.dedup_key();
        let window_us = options.dedup_window_secs as i64 * 1_000_000;
        let cutoff = event.timestamp.timestamp_micros().saturating_sub(window_us);

        for (name, ts) in self.pending_names()? {
            if ts < cutoff {
                continue;
            }
            let Ok(bytes) = fs::read(self.dir.join(&name)) else {
                continue;
            };
            if EventFields::parse(&bytes).dedup_key == key {
                tracing::info!(key, existing = %name, "duplicate event dropped");
                return Err(NbsError::Duplicate {
                    key,
                    window_secs: options.dedup_window_secs,
                });
            }
        }
        self.write_event(event)
    }

    fn write_event(&self, event: &Event) -> Result<String, NbsError> {
        let name = event.file_name();
        create_new(&self.dir.join(&name), &event.render())?;
        tracing::debug!(
            dir = %self.dir.display(),
            file = %name,
            priority = %event.priority,
            "event published"
        );
        Ok(name)
    }

    /// Pending event names with their filename timestamps, unordered.
    fn pending_names(&self) -> Result<Vec<(String, i64)>, NbsError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| NbsError::io(&self.dir, e))?;
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let Some(ts) = file_name_timestamp(&name) else {
                continue;
            };
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                out.push((name, ts));
            }
        }
        Ok(out)
    }

    /// Pending events, highest priority first, oldest first within a
    /// priority, ties broken by file name.
    ///
    /// `source` restricts the listing to one producer. Events that vanish
    /// between listing and reading (acked concurrently) are left out.
    pub fn check(&self, source: Option<&str>) -> Result<Vec<PendingEvent>, NbsError> {
        let mut events = Vec::new();
        for (name, ts) in self.pending_names()? {
            let Ok(bytes) = fs::read(self.dir.join(&name)) else {
                continue;
            };
            let fields = EventFields::parse(&bytes);
            if source.is_some_and(|s| s != fields.source) {
                continue;
            }
            events.push(PendingEvent {
                file_name: name,
                priority: fields.priority,
                source: fields.source,
                kind: fields.kind,
                timestamp_us: ts,
            });
        }
        events.sort_by(|a, b| {
            (a.priority, a.timestamp_us, &a.file_name).cmp(&(b.priority, b.timestamp_us, &b.file_name))
        });
        Ok(events)
    }

    /// Raw content of one pending event.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a name that could leave the directory,
    /// `EventNotFound` if no such pending event exists.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, NbsError> {
        validate_file_name(name)?;
        fs::read(self.dir.join(name)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => NbsError::EventNotFound {
                name: name.to_string(),
            },
            _ => NbsError::io(self.dir.join(name), e),
        })
    }

    /// Move one pending event into `processed/`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a bad name, `EventNotFound` if the event is not
    /// pending (including when a concurrent ack won the race).
    pub fn ack(&self, name: &str) -> Result<(), NbsError> {
        validate_file_name(name)?;
        let from = self.dir.join(name);
        if !from.is_file() {
            return Err(NbsError::EventNotFound {
                name: name.to_string(),
            });
        }

        let processed = self.processed_dir();
        fs::create_dir_all(&processed).map_err(|e| NbsError::io(&processed, e))?;
        fs::rename(&from, processed.join(name)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => NbsError::EventNotFound {
                name: name.to_string(),
            },
            _ => NbsError::io(&from, e),
        })?;
        tracing::debug!(dir = %self.dir.display(), file = name, "event acknowledged");
        Ok(())
    }

    /// Acknowledge every pending event, optionally only those from `source`.
    ///
    /// Events lost to a concurrent ack are not counted and not an error.
    pub fn ack_all(&self, source: Option<&str>) -> Result<usize, NbsError> {
        let mut acked = 0;
        for event in self.check(source)? {
            match self.ack(&event.file_name) {
                Ok(()) => acked += 1,
                Err(NbsError::EventNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(acked)
    }

    /// Pending counts, oldest pending event and `processed/` usage.
    pub fn status(&self, config: &BusConfig) -> Result<QueueStatus, NbsError> {
        let pending = self.check(None)?;
        let now_us = Utc::now().timestamp_micros();

        let mut counts = PriorityCounts::default();
        for event in &pending {
            counts.bump(event.priority);
        }

        let stale = if config.ack_timeout_secs > 0 {
            let timeout_us = config.ack_timeout_secs as i64 * 1_000_000;
            pending
                .iter()
                .filter(|e| now_us.saturating_sub(e.timestamp_us) > timeout_us)
                .count()
        } else {
            0
        };

        let processed = self.processed_entries()?.unwrap_or_default();
        Ok(QueueStatus {
            pending: counts,
            oldest_pending_us: pending.iter().map(|e| e.timestamp_us).min(),
            processed_count: processed.len(),
            processed_bytes: processed.iter().map(|e| e.size).sum(),
            stale,
            ack_timeout_secs: config.ack_timeout_secs,
        })
    }

    /// Delete the oldest processed events until `processed/` fits in
    /// `max_bytes`. Pending events are never touched.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `max_bytes` is 0.
    pub fn prune(&self, max_bytes: u64) -> Result<PruneReport, NbsError> {
        if max_bytes == 0 {
            return Err(NbsError::InvalidArgument(
                "max-bytes must be greater than 0".into(),
            ));
        }
        let Some(mut entries) = self.processed_entries()? else {
            return Ok(PruneReport {
                pruned: 0,
                remaining_bytes: 0,
                limit_bytes: max_bytes,
                processed_dir_present: false,
            });
        };

        let mut total: u64 = entries.iter().map(|e| e.size).sum();
        entries.sort_by(|a, b| (a.timestamp_us, &a.name).cmp(&(b.timestamp_us, &b.name)));

        let mut pruned = 0;
        for entry in &entries {
            if total <= max_bytes {
                break;
            }
            let path = self.processed_dir().join(&entry.name);
            match fs::remove_file(&path) {
                Ok(()) => {
                    total -= entry.size;
                    pruned += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => total -= entry.size,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to prune event"),
            }
        }

        tracing::debug!(dir = %self.dir.display(), pruned, remaining = total, "pruned processed events");
        Ok(PruneReport {
            pruned,
            remaining_bytes: total,
            limit_bytes: max_bytes,
            processed_dir_present: true,
        })
    }

    /// Event files in `processed/`, or `None` if the directory is missing.
    fn processed_entries(&self) -> Result<Option<Vec<ProcessedEntry>>, NbsError> {
        let dir = self.processed_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(NbsError::io(&dir, e)),
        };

        let mut out = Vec::new();
        for entry in entries.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.ends_with(EVENT_SUFFIX) {
                continue;
            }
            let Some(timestamp_us) = file_name_timestamp(&name) else {
                continue;
            };
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if meta.is_file() {
                out.push(ProcessedEntry {
                    name,
                    timestamp_us,
                    size: meta.len(),
                });
            }
        }
        Ok(Some(out))
    }
}

struct ProcessedEntry {
    name: String,
    timestamp_us: i64,
    size: u64,
}

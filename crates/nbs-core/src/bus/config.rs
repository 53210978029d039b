//! Queue-scoped configuration from `<queue-dir>/config.yaml`
//!
//! | key                   | default    | effect                                   |
//! |-----------------------|------------|------------------------------------------|
//! | `dedup-window`        | `0`        | default dedup window (seconds) for publish |
//! | `retention-max-bytes` | `16777216` | default byte budget for prune            |
//! | `ack-timeout`         | `0`        | pending events older than this are stale |
//!
//! The file is read line by line as `key: value`. It is never allowed to
//! break a command: unreadable files, comments, unknown keys and invalid
//! values are all skipped and the defaults stay in place.

use serde::Serialize;
use std::path::Path;

/// File name of the queue configuration inside the queue directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Default byte budget for `processed/`: 16 MiB.
pub const DEFAULT_RETENTION_MAX_BYTES: u64 = 16 * 1024 * 1024;

/// Largest second count that still fits in microseconds as an `i64`.
pub const MAX_SECONDS: u64 = (i64::MAX / 1_000_000) as u64;

/// Effective queue configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusConfig {
    /// Seconds within which a repeated `source:type` is dropped; 0 disables.
    pub dedup_window_secs: u64,
    /// Byte budget for `processed/` used by prune.
    pub retention_max_bytes: u64,
    /// Age in seconds after which a pending event is reported stale; 0 disables.
    pub ack_timeout_secs: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: 0,
            retention_max_bytes: DEFAULT_RETENTION_MAX_BYTES,
            ack_timeout_secs: 0,
        }
    }
}

impl BusConfig {
    /// Load `<dir>/config.yaml`, falling back to defaults.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        match std::fs::read(&path) {
            Ok(bytes) => Self::parse(&bytes),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable bus config");
                }
                Self::default()
            }
        }
    }

    pub fn parse(content: &[u8]) -> Self {
        let mut config = Self::default();
        for raw in content.split(|&b| b == b'\n') {
            let Ok(line) = std::str::from_utf8(raw) else {
                continue;
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "dedup-window" => {
                    if let Some(v) = parse_seconds(value) {
                        config.dedup_window_secs = v;
                    }
                }
                "ack-timeout" => {
                    if let Some(v) = parse_seconds(value) {
                        config.ack_timeout_secs = v;
                    }
                }
                "retention-max-bytes" => match value.parse::<u64>() {
                    Ok(v) if v > 0 && v <= i64::MAX as u64 => config.retention_max_bytes = v,
                    _ => tracing::debug!(value, "ignoring invalid retention-max-bytes"),
                },
                other => tracing::debug!(key = other, "ignoring unknown bus config key"),
            }
        }
        config
    }
}

/// Parse a non-negative second count small enough to convert to microseconds.
pub fn parse_seconds(value: &str) -> Option<u64> {
    value.parse::<u64>().ok().filter(|v| *v <= MAX_SECONDS)
}

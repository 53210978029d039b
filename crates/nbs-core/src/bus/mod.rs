//! Priority event queue backed by one file per event

pub mod config;
pub mod event;
pub mod queue;

pub use config::{BusConfig, CONFIG_FILE, DEFAULT_RETENTION_MAX_BYTES};
pub use event::{Event, EventFields, Priority, format_age, validate_file_name};
pub use queue::{
    EventQueue, PendingEvent, PriorityCounts, PruneReport, PublishOptions, QueueStatus,
};

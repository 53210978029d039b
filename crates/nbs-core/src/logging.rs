//! Diagnostics for the nbs binaries.
//!
//! `NBS_LOG` takes `tracing-subscriber` filter directives, e.g. `debug` or
//! `nbs_core::bus=trace,warn`. Unset or unparseable values fall back to
//! [`DEFAULT_DIRECTIVE`]. Everything goes to stderr; stdout belongs to
//! command output.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "NBS_LOG";

pub const DEFAULT_DIRECTIVE: &str = "warn";

fn filter_from(value: Option<&str>) -> EnvFilter {
    value
        .and_then(|v| EnvFilter::try_new(v.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the stderr subscriber. Later calls are no-ops.
pub fn init() {
    let value = std::env::var(LOG_ENV).ok();
    let _ = tracing_subscriber::registry()
        .with(filter_from(value.as_deref()))
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_warn() {
        assert_eq!(filter_from(None).to_string(), "warn");
        assert_eq!(filter_from(Some("nbs_core=loud")).to_string(), "warn");
    }

    #[test]
    fn test_filter_accepts_directives() {
        assert_eq!(filter_from(Some("debug")).to_string(), "debug");
        assert!(
            filter_from(Some(" nbs_core::bus=trace "))
                .to_string()
                .contains("nbs_core::bus=trace")
        );
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
    }
}

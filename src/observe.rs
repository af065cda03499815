//! Structured logging and the counting span.
//!
//! The process entry point owns subscriber initialization; nothing in
//! the library installs or lazily creates one. Services emit events
//! through the `tracing` macros and wrap the counting phase in the span
//! produced by [`count_span`].
//!
//! A successful request emits exactly three info events:
//! `query: <q>`, `number of files: <n>` and
//! `query '<q>' matched count: <c>`, plus `starting server: <addr>`
//! once at boot.

use anyhow::Result;
use tracing::{info_span, Span};
use tracing_subscriber::EnvFilter;

/// Output format for the structured log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON record per line, for machine-ingested sinks.
    Json,
    /// Human-readable single-line output, for local runs.
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!(
                "unknown log format '{}', expected 'json' or 'compact'",
                other
            )),
        }
    }
}

/// Install the process-wide subscriber. Called once from `main`.
///
/// Honors `RUST_LOG` for filtering; defaults to `info`. Field naming
/// for a particular log sink (e.g. renaming `level` to `severity`) is
/// deployment configuration layered on the JSON stream, not something
/// done here.
pub fn init(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))?,
        LogFormat::Compact => builder
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))?,
    }

    Ok(())
}

/// The span bracketing the counting phase of one request.
///
/// The query service records `count_start` and `count_end` point events
/// inside it; the fetch phase is deliberately outside.
pub fn count_span() -> Span {
    info_span!("matchcount")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_log_format_parses() {
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("compact").unwrap(), LogFormat::Compact);
        assert!(LogFormat::from_str("xml").is_err());
    }
}

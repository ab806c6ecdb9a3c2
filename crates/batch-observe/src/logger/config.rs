use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::logger::{error::LoggerError, format::LoggerFormat};

/// Target prefix shared by every event and span of the batch crates.
///
/// Matches both explicit targets (`batch.core.dispatch`) and module paths
/// (`batch_exec::worker`).
pub const BATCH_TARGET: &str = "batch";

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// Level for everything outside the batch crates (`axum`, `hyper`, ...).
    pub level: String,
    /// Level for the batch crates; inherits `level` when `None`.
    pub batch_level: Option<String>,
    /// Extra `EnvFilter` directives appended last, e.g. `"batch.exec.shell=trace"`.
    pub directives: Vec<String>,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            batch_level: None,
            directives: Vec::new(),
            with_targets: true,
            use_color: std::io::stdout().is_terminal(),
        }
    }
}

impl LoggerConfig {
    /// The combined filter string: global level, batch level, then extras.
    pub fn filter_directives(&self) -> String {
        let mut parts = vec![self.level.trim().to_string()];
        if let Some(batch) = &self.batch_level {
            parts.push(format!("{BATCH_TARGET}={}", batch.trim()));
        }
        parts.extend(self.directives.iter().map(|d| d.trim().to_string()));
        parts.retain(|p| !p.is_empty());
        parts.join(",")
    }

    pub(crate) fn env_filter(&self) -> Result<EnvFilter, LoggerError> {
        let directives = self.filter_directives();
        EnvFilter::builder()
            .parse(&directives)
            .map_err(|e| LoggerError::InvalidFilter {
                reason: e.to_string(),
                directives,
            })
    }
}

//! Logging configuration and initialization.

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Shift the level by `-v` (positive) or `-q` (negative) steps.
    #[must_use]
    pub fn adjusted(mut self, steps: i8) -> Self {
        let current = LEVELS
            .iter()
            .position(|l| l.eq_ignore_ascii_case(&self.level))
            .unwrap_or(2);
        let target = (current as i16 + i16::from(steps)).clamp(0, LEVELS.len() as i16 - 1);
        self.level = LEVELS[target as usize].to_string();
        self
    }

    /// Force JSON output.
    #[must_use]
    pub fn json(mut self, json: bool) -> Self {
        if json {
            self.format = "json".into();
        }
        self
    }

    /// Initialize the tracing subscriber with this logging configuration.
    ///
    /// `RUST_LOG` wins over the configured level. Logs go to stderr so command
    /// output on stdout stays machine-readable. A second call is a no-op.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let _ = match self.format.as_str() {
            "json" => fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
            _ => fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
        };
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "pretty".into(),
        }
    }
}

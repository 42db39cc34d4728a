//! Miette-based error diagnostics for CLI error presentation.
//!
//! Every command error is reported through [`report`], which attaches a
//! stable code and a help line per error family. Settings files that fail
//! to parse are shown with the offending region labeled.

use std::fmt::Display;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use super::paths;
use crate::error::{ConfigError, Error, StorageError};

/// Exit status for a command interrupted by the user.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Exit status for any other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Settings file parse error with source location context.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(minicluster::config::parse))]
pub struct SettingsParseError {
    /// Human-readable error message.
    pub message: String,

    /// The settings file text.
    #[source_code]
    pub src: NamedSource<String>,

    /// Byte offset and length of the problematic region.
    #[label("here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub help: Option<String>,
}

impl SettingsParseError {
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        name: impl AsRef<str>,
        src: String,
        span: Option<(usize, usize)>,
    ) -> Self {
        Self {
            message: message.into(),
            src: NamedSource::new(name, src),
            span: span.map(Into::into),
            help: None,
        }
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// A failed command, with a code and help derived from the error family.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct CommandFailure {
    #[from]
    error: Error,
}

impl CommandFailure {
    #[must_use]
    pub const fn error(&self) -> &Error {
        &self.error
    }

    /// Process exit status for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self.error {
            Error::Cancelled => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }

    fn code_str(&self) -> &'static str {
        match &self.error {
            Error::Config(ConfigError::NoRuntime { .. }) | Error::Runtime { .. } => {
                "minicluster::runtime"
            }
            Error::Config(_) => "minicluster::config",
            Error::Storage(_) => "minicluster::state",
            Error::ImagePull { .. } | Error::ImageBuild { .. } => "minicluster::image",
            Error::Readiness { .. } => "minicluster::readiness",
            Error::Timeout { .. } => "minicluster::timeout",
            Error::Network { .. } => "minicluster::network",
            Error::NotFound(_) | Error::RemovalInProgress(_) => "minicluster::not_found",
            Error::AlreadyActive { .. } | Error::InvalidState { .. } => "minicluster::cluster",
            Error::Cancelled => "minicluster::cancelled",
            Error::Io(_) => "minicluster::io",
        }
    }

    fn help_text(&self) -> Option<String> {
        let text = match &self.error {
            Error::Config(ConfigError::NoRuntime { .. }) => {
                "start the Docker daemon, or point DOCKER_HOST at one".to_string()
            }
            Error::Config(ConfigError::ReadFile { .. }) => {
                "check the path given to --config".to_string()
            }
            Error::Config(ConfigError::InvalidValue {
                field: "worker_resources",
                ..
            }) => "give one worker_resources entry per worker, or leave it out to use defaults"
                .to_string(),
            Error::Config(_) => format!(
                "settings are read from --config, ./minicluster.toml or {}",
                paths::user_config().display()
            ),
            Error::Storage(StorageError::Decode { path, .. }) => format!(
                "if no cluster is running, delete {} and try again",
                path.display()
            ),
            Error::Storage(_) => "check permissions on the --state-dir directory".to_string(),
            Error::ImagePull { .. } => {
                "check the image name and that the registry is reachable".to_string()
            }
            Error::ImageBuild { .. } => {
                "check the Dockerfile in worker_build_context".to_string()
            }
            Error::Readiness { container_id, .. } => {
                format!("inspect the container with `docker logs {container_id}`")
            }
            Error::Timeout { .. } => {
                "raise [readiness] cluster_timeout_secs, or pass a longer --timeout".to_string()
            }
            Error::Runtime { .. } => "is the Docker daemon running?".to_string(),
            Error::AlreadyActive { .. } => "run `minicluster destroy` first".to_string(),
            Error::Network { .. }
            | Error::NotFound(_)
            | Error::RemovalInProgress(_)
            | Error::InvalidState { .. } => {
                "run `minicluster info` to see what is left of the cluster".to_string()
            }
            Error::Cancelled | Error::Io(_) => return None,
        };
        Some(text)
    }
}

impl Diagnostic for CommandFailure {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.code_str()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.help_text()
            .map(|text| Box::new(text) as Box<dyn Display + 'a>)
    }
}

/// Render `error` as a diagnostic report, returning it with its exit status.
#[must_use]
pub fn report(error: Error) -> (miette::Report, u8) {
    if let Error::Config(ConfigError::Parse { path, source }) = &error {
        if let Ok(text) = std::fs::read_to_string(path) {
            let span = source.span().map(|range| (range.start, range.len()));
            let parse = SettingsParseError::new(
                source.message().to_string(),
                path.display().to_string(),
                text,
                span,
            )
            .with_help("see the [cluster], [images], [readiness] and [logging] tables");
            return (miette::Report::new(parse), EXIT_FAILURE);
        }
    }

    let failure = CommandFailure::from(error);
    let code = failure.exit_code();
    (miette::Report::new(failure), code)
}

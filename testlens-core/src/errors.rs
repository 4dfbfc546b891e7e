// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testlens.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error::Error, fmt, io, process::ExitStatus, time::Duration};
use thiserror::Error;

pub use testlens_junit::ParseError;

/// An error that occurred while loading the config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self { config_file, kind }
    }

    /// Returns the config file that failed to load, or `None` for the embedded defaults.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

impl fmt::Display for ConfigParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.config_file {
            Some(config_file) => write!(f, "failed to parse testlens config at `{config_file}`"),
            None => write!(f, "failed to parse default testlens config"),
        }
    }
}

/// The kind of error that occurred while loading the config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// A pattern in the config is not a valid regular expression.
    #[error("invalid pattern in `{key}`")]
    InvalidPattern {
        /// The config key holding the pattern list.
        key: &'static str,

        /// The underlying regex error.
        #[source]
        error: regex::Error,
    },
}

/// A `testcase` entry that could not be turned into an assertion.
///
/// These are not fatal: the entry is skipped and the rest of the report is processed.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum MalformedEntry {
    /// The testcase has no `name` attribute.
    #[error("testcase in suite `{suite}` has no name")]
    MissingName {
        /// The innermost enclosing suite.
        suite: String,
    },

    /// Neither the testcase nor any enclosing suite names a class.
    #[error("testcase `{name}` has no class")]
    MissingClass {
        /// The testcase name.
        name: String,
    },

    /// Neither the testcase nor any enclosing suite names a source file.
    #[error("testcase `{qualified_name}` has no source file")]
    MissingFile {
        /// The qualified test name.
        qualified_name: String,
    },

    /// The testcase has no line, and its declaration could not be found in its file.
    #[error("testcase `{qualified_name}` has no line and no declaration in `{file}`")]
    MissingLine {
        /// The qualified test name.
        qualified_name: String,

        /// The file that was searched.
        file: Utf8PathBuf,
    },
}

/// An error that occurred while locating or running the test runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerExecutionError {
    /// No runner executable could be found.
    #[error("could not find `{binary}` (searched upwards from `{searched_from}` and the search path)")]
    MissingExecutable {
        /// The binary that was searched for.
        binary: String,

        /// The directory the upward search started from.
        searched_from: Utf8PathBuf,
    },

    /// The runner could not be started.
    #[error("failed to spawn `{executable}`")]
    Spawn {
        /// The executable.
        executable: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The runner did not finish in time.
    #[error("`{executable}` did not finish within {}s", .timeout.as_secs())]
    Timeout {
        /// The executable.
        executable: Utf8PathBuf,

        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The runner exited without writing a report.
    #[error("`{executable}` exited with {status} without writing a report{}", display_stderr(.stderr))]
    NoReport {
        /// The executable.
        executable: Utf8PathBuf,

        /// The exit status of the runner.
        status: ExitStatus,

        /// Standard error of the runner, lossily decoded.
        stderr: String,
    },

    /// An I/O error occurred while preparing the run or collecting its report.
    #[error("I/O error while running tests")]
    Io(#[from] io::Error),
}

fn display_stderr(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

/// An error that aborted one annotation run.
///
/// The orchestrator turns these into a [`Notice`](crate::orchestrator::Notice) and leaves the
/// cached messages alone.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnnotateError {
    /// The runner could not be located or failed.
    #[error("test run failed")]
    Runner(#[from] RunnerExecutionError),

    /// The runner's report could not be parsed.
    #[error("test report could not be parsed")]
    Parse(#[from] ParseError),
}

/// Displays an error along with its chain of sources, one per line.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut current = self.error.source();
        if current.is_some() {
            write!(f, "\n  caused by:")?;
        }
        while let Some(source) = current {
            write!(f, "\n  - {source}")?;
            current = source.source();
        }

        Ok(())
    }
}

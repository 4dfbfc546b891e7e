// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for testlens.
//!
//! The embedded `default-config.toml` is always loaded first; a user config file, if given, is
//! layered on top of it key by key.

use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use regex::RegexSet;
use serde::Deserialize;
use std::{collections::BTreeSet, time::Duration};
use tracing::warn;

/// Resolved testlens configuration.
#[derive(Clone, Debug)]
pub struct TestlensConfig {
    /// When and how documents are annotated.
    pub annotate: AnnotateConfig,

    /// How the test runner is located and invoked.
    pub runner: RunnerConfig,

    /// How executables are looked up on the search path.
    pub search_path: SearchPathConfig,
}

impl TestlensConfig {
    /// The default config, embedded in the binary.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Loads the embedded default config, with the given user config file layered on top.
    pub fn from_sources(config_file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        let mut builder = Self::make_default_config();
        if let Some(config_file) = config_file {
            builder = builder.add_source(File::new(config_file.as_str(), FileFormat::Toml));
        }

        let config_file = config_file.map(Utf8Path::to_path_buf);
        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(config_file.clone(), kind))?;

        if !unknown.is_empty() {
            let location = config_file
                .as_deref()
                .map_or("default config".to_owned(), |file| format!("config file {file}"));
            let unknown = unknown.into_iter().collect::<Vec<_>>().join(", ");
            warn!("in {location}, ignoring unknown configuration keys: {unknown}");
        }

        deserialized
            .into_config()
            .map_err(|kind| ConfigParseError::new(config_file, kind))
    }

    /// Returns the embedded default config.
    pub fn default_config() -> Self {
        Self::from_sources(None).expect("embedded default config is valid")
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(TestlensConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: TestlensConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // The config crate also reports the key; drop it so that it only appears once.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// Settings that decide which documents are annotated and how reports are read.
#[derive(Clone, Debug)]
pub struct AnnotateConfig {
    /// A document must match one of these to be annotated.
    pub test_markers: RegexSet,

    /// A document whose path matches one of these is never annotated.
    pub excluded_files: RegexSet,

    /// Keywords that introduce a method declaration.
    pub declaration_keywords: Vec<String>,

    /// Replaces `.` in `classname` attributes.
    pub namespace_separator: String,

    /// The source label attached to diagnostics.
    pub diagnostic_source: String,
}

impl AnnotateConfig {
    /// Returns true if a document with this path and text should be annotated.
    pub fn is_eligible(&self, path: &Utf8Path, text: &str) -> bool {
        self.test_markers.is_match(text) && !self.excluded_files.is_match(path.as_str())
    }
}

/// Settings for locating and invoking the test runner.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunnerConfig {
    /// The runner binary, looked up on the search path.
    pub binary: String,

    /// Project-local runner paths, looked up from the test file upwards.
    pub local_candidates: Vec<String>,

    /// Runner configuration file names, looked up from the test file upwards.
    pub config_files: Vec<String>,

    /// The argument introducing the configuration file.
    pub config_arg: String,

    /// The argument introducing the JUnit report path.
    pub report_arg: String,

    /// Extra arguments for the runner.
    pub extra_args: Vec<String>,

    /// How long one run may take.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Settings for search-path lookups.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchPathConfig {
    /// Suffixes tried for each candidate, in order.
    pub suffixes: Vec<String>,
}

impl SearchPathConfig {
    /// Returns the suffixes to try, substituting the platform default for an empty list.
    pub fn effective_suffixes(&self) -> Vec<String> {
        if !self.suffixes.is_empty() {
            return self.suffixes.clone();
        }
        if cfg!(windows) {
            [".bat", ".exe", ".cmd", ""]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect()
        } else {
            vec![String::new()]
        }
    }
}

// This is the form of `TestlensConfig` that gets deserialized.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TestlensConfigDeserialize {
    annotate: AnnotateConfigDeserialize,
    runner: RunnerConfig,
    search_path: SearchPathConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AnnotateConfigDeserialize {
    test_markers: Vec<String>,
    excluded_files: Vec<String>,
    declaration_keywords: Vec<String>,
    namespace_separator: String,
    diagnostic_source: String,
}

impl TestlensConfigDeserialize {
    fn into_config(self) -> Result<TestlensConfig, ConfigParseErrorKind> {
        let annotate = self.annotate;
        Ok(TestlensConfig {
            annotate: AnnotateConfig {
                test_markers: compile("annotate.test-markers", &annotate.test_markers)?,
                excluded_files: compile("annotate.excluded-files", &annotate.excluded_files)?,
                declaration_keywords: annotate.declaration_keywords,
                namespace_separator: annotate.namespace_separator,
                diagnostic_source: annotate.diagnostic_source,
            },
            runner: self.runner,
            search_path: self.search_path,
        })
    }
}

fn compile(key: &'static str, patterns: &[String]) -> Result<RegexSet, ConfigParseErrorKind> {
    RegexSet::new(patterns).map_err(|error| ConfigParseErrorKind::InvalidPattern { key, error })
}

/// Where a config file for a project would live.
pub fn default_config_path(workspace_root: &Utf8Path) -> Utf8PathBuf {
    workspace_root.join(".config").join("testlens.toml")
}

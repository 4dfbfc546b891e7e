// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem access used while locating runners and reading test sources.
//!
//! Everything goes through the [`Filesystem`] trait so that the orchestrator can be driven
//! against an in-memory tree in tests.

use crate::config::SearchPathConfig;
use camino::{Utf8Path, Utf8PathBuf};
use std::{env, future::Future, io};
use tracing::debug;

/// The directories and suffixes used to look up executables by name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SearchPath {
    /// Directories searched, in order.
    pub dirs: Vec<Utf8PathBuf>,

    /// Suffixes tried for each directory, in order.
    pub suffixes: Vec<String>,
}

impl SearchPath {
    /// Builds a search path from the `PATH` environment variable.
    ///
    /// Entries that are not valid UTF-8 are skipped.
    pub fn from_env(config: &SearchPathConfig) -> Self {
        let dirs = env::var_os("PATH")
            .map(|path| {
                env::split_paths(&path)
                    .filter_map(|dir| match Utf8PathBuf::from_path_buf(dir) {
                        Ok(dir) => Some(dir),
                        Err(dir) => {
                            debug!("skipping non-UTF-8 search path entry {}", dir.display());
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            dirs,
            suffixes: config.effective_suffixes(),
        }
    }
}

/// Read-only access to the filesystem.
pub trait Filesystem: Send + Sync {
    /// Returns true if something exists at `path`.
    fn exists(&self, path: &Utf8Path) -> impl Future<Output = bool> + Send;

    /// Reads the file at `path` as UTF-8 text.
    fn read_text(&self, path: &Utf8Path) -> impl Future<Output = io::Result<String>> + Send;

    /// Returns the search path used by [`which`](Self::which).
    fn search_path(&self) -> &SearchPath;

    /// Looks up an executable by name in `cwd`, then in each search path directory.
    ///
    /// For each directory, every configured suffix is tried in order.
    fn which(
        &self,
        name: &str,
        cwd: &Utf8Path,
    ) -> impl Future<Output = Option<Utf8PathBuf>> + Send {
        async move {
            let search_path = self.search_path();
            let dirs = std::iter::once(cwd)
                .chain(search_path.dirs.iter().map(Utf8PathBuf::as_path));
            for dir in dirs {
                for suffix in &search_path.suffixes {
                    let candidate = dir.join(format!("{name}{suffix}"));
                    if self.exists(&candidate).await {
                        return Some(candidate);
                    }
                }
            }
            None
        }
    }

    /// Looks for `name` in `from` and each of its ancestors, nearest first.
    ///
    /// The filesystem root is included in the search.
    fn find_up(
        &self,
        name: &str,
        from: &Utf8Path,
    ) -> impl Future<Output = Option<Utf8PathBuf>> + Send {
        async move {
            for dir in from.ancestors() {
                let candidate = dir.join(name);
                if self.exists(&candidate).await {
                    return Some(candidate);
                }
            }
            None
        }
    }
}

/// A [`Filesystem`] backed by the real filesystem.
#[derive(Clone, Debug)]
pub struct OsFilesystem {
    search_path: SearchPath,
}

impl OsFilesystem {
    /// Creates a new `OsFilesystem` with the given search path.
    pub fn new(search_path: SearchPath) -> Self {
        Self { search_path }
    }
}

impl Filesystem for OsFilesystem {
    async fn exists(&self, path: &Utf8Path) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(_) => true,
            // Permission errors and the like mean that something is there.
            Err(error) => error.kind() != io::ErrorKind::NotFound,
        }
    }

    async fn read_text(&self, path: &Utf8Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    fn search_path(&self) -> &SearchPath {
        &self.search_path
    }
}

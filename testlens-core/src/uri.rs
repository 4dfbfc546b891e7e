// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::fmt;

/// The normalized identity of a source file.
///
/// Reports, editors and the filesystem all spell paths slightly differently: `file://` URIs,
/// `./` segments, `..` hops. A `FileUri` strips the scheme and folds those segments lexically
/// (without touching the filesystem), so that two spellings of the same path compare equal.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FileUri(Utf8PathBuf);

impl FileUri {
    /// Creates a new `FileUri` from a path or a `file://` URI.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        let path = path.strip_prefix("file://").unwrap_or(path);
        Self(normalize(Utf8Path::new(path)))
    }

    /// Returns the path this URI refers to.
    pub fn as_path(&self) -> &Utf8Path {
        &self.0
    }

    /// Returns the directory containing this file, if any.
    pub fn parent(&self) -> Option<&Utf8Path> {
        self.0.parent()
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<Utf8Path> for FileUri {
    fn as_ref(&self) -> &Utf8Path {
        &self.0
    }
}

impl From<&Utf8Path> for FileUri {
    fn from(path: &Utf8Path) -> Self {
        Self::new(path.as_str())
    }
}

impl From<&str> for FileUri {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match out.components().next_back() {
                Some(Utf8Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`.
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_str()),
        }
    }
    out
}

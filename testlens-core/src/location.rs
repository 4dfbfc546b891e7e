// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping tests and stack frames to positions in source files.

use crate::{FileUri, filesystem::Filesystem};
use regex::Regex;
use std::{collections::HashMap, fmt};
use tracing::debug;

/// A zero-based position in a text document.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Position {
    /// The zero-based line.
    pub line: u32,

    /// The zero-based character offset within the line.
    pub character: u32,
}

impl Position {
    /// Creates a new position.
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open range in a text document.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Range {
    /// The start of the range.
    pub start: Position,

    /// The end of the range, exclusive.
    pub end: Position,
}

impl Range {
    /// Creates a new range.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Returns an empty range at the start of the given zero-based line.
    pub fn line(line: u32) -> Self {
        let position = Position::new(line, 0);
        Self::new(position, position)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.character, self.end.line, self.end.character
        )
    }
}

/// Finds declarations and lines in source files.
///
/// A resolver lives for the duration of one report parse. Each file is read at most once; a file
/// that cannot be read is remembered as such and never retried.
pub struct LocationResolver<'a, F> {
    fs: &'a F,
    keywords: Option<String>,
    declarations: HashMap<String, Option<Regex>>,
    files: HashMap<FileUri, Option<String>>,
}

impl<'a, F: Filesystem> LocationResolver<'a, F> {
    /// Creates a new resolver using the given declaration keywords.
    pub fn new(fs: &'a F, keywords: &[String]) -> Self {
        let keywords = (!keywords.is_empty()).then(|| {
            keywords
                .iter()
                .map(|keyword| regex::escape(keyword))
                .collect::<Vec<_>>()
                .join("|")
        });
        Self {
            fs,
            keywords,
            declarations: HashMap::new(),
            files: HashMap::new(),
        }
    }

    /// Finds the declaration of `method` in `file`.
    ///
    /// The range covers the trimmed signature line: the first line where `method` follows one of
    /// the declaration keywords.
    pub async fn resolve(&mut self, file: &FileUri, method: &str) -> Option<Range> {
        let regex = self.declaration(method)?;
        let text = self.text(file).await?;
        text.lines().enumerate().find_map(|(index, line)| {
            if !regex.is_match(line) {
                return None;
            }
            trimmed_range(line, u32::try_from(index).ok()?)
        })
    }

    /// Returns the range of the non-whitespace text on the given zero-based line of `file`.
    ///
    /// Returns `None` if the file cannot be read, or the line does not exist or is blank.
    pub async fn line_range(&mut self, file: &FileUri, line: u32) -> Option<Range> {
        let text = self.text(file).await?;
        let content = text.lines().nth(usize::try_from(line).ok()?)?;
        trimmed_range(content, line)
    }

    /// The pattern matching a declaration of `method`, compiled once per method name.
    fn declaration(&mut self, method: &str) -> Option<Regex> {
        let keywords = self.keywords.as_deref()?;
        self.declarations
            .entry(method.to_owned())
            .or_insert_with(|| {
                let pattern = format!(r"\b(?:{keywords})\s+&?{}\b", regex::escape(method));
                Regex::new(&pattern)
                    .inspect_err(|error| debug!("not searching for `{method}`: {error}"))
                    .ok()
            })
            .clone()
    }

    async fn text(&mut self, file: &FileUri) -> Option<&str> {
        if !self.files.contains_key(file) {
            let text = match self.fs.read_text(file.as_path()).await {
                Ok(text) => Some(text),
                Err(error) => {
                    debug!("could not read `{file}`: {error}");
                    None
                }
            };
            self.files.insert(file.clone(), text);
        }
        self.files.get(file)?.as_deref()
    }
}

/// The extent of `content` without leading and trailing whitespace, in characters.
fn trimmed_range(content: &str, line: u32) -> Option<Range> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    let leading = content.chars().take_while(|c| c.is_whitespace()).count();
    let start = u32::try_from(leading).ok()?;
    let end = start + u32::try_from(trimmed.chars().count()).ok()?;
    Some(Range::new(
        Position::new(line, start),
        Position::new(line, end),
    ))
}

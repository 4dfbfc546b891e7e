// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-file cache of test results.

use crate::{
    FileUri,
    location::Range,
    report::{Assertion, Outcome},
};
use indexmap::IndexMap;
use std::fmt;

/// The state a message is displayed with.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum MessageState {
    /// The test passed.
    Passed,

    /// The test failed or errored.
    Failed,

    /// The test was skipped or left incomplete.
    Skipped,

    /// The test was flagged as risky.
    Risky,
}

impl MessageState {
    /// All states, in display order.
    pub const ALL: [MessageState; 4] = [
        MessageState::Passed,
        MessageState::Failed,
        MessageState::Skipped,
        MessageState::Risky,
    ];

    /// Returns the name of this state.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageState::Passed => "passed",
            MessageState::Failed => "failed",
            MessageState::Skipped => "skipped",
            MessageState::Risky => "risky",
        }
    }
}

impl From<Outcome> for MessageState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Passed => MessageState::Passed,
            Outcome::Failure | Outcome::Error => MessageState::Failed,
            Outcome::Skipped | Outcome::Incomplete => MessageState::Skipped,
            Outcome::Risky => MessageState::Risky,
        }
    }
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached test result, ready to be shown.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    /// The file the result belongs to.
    pub file: FileUri,

    /// The zero-based line the result is shown at.
    pub line_number: u32,

    /// The range the result is shown at.
    pub range: Range,

    /// The display state.
    pub state: MessageState,

    /// The failure text, for results other than passes.
    pub failure_text: Option<String>,
}

impl From<&Assertion> for Message {
    fn from(assertion: &Assertion) -> Self {
        Self {
            file: assertion.file.clone(),
            line_number: assertion.range.start.line,
            range: assertion.range,
            state: assertion.outcome.into(),
            failure_text: assertion.failure_message.clone(),
        }
    }
}

/// Test results, cached per file.
///
/// Each file's messages are replaced wholesale by [`put`](Self::put); messages for different runs
/// of the same file are never merged.
#[derive(Clone, Debug, Default)]
pub struct MessageCollection {
    items: IndexMap<FileUri, Vec<Message>>,
}

impl MessageCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the messages for `assertions`, replacing whatever was cached for every file they
    /// belong to.
    ///
    /// Returns the files that were replaced, in order of first appearance.
    pub fn put(&mut self, assertions: &[Assertion]) -> Vec<FileUri> {
        let mut grouped: IndexMap<FileUri, Vec<Message>> = IndexMap::new();
        for assertion in assertions {
            grouped
                .entry(assertion.file.clone())
                .or_default()
                .push(Message::from(assertion));
        }

        let files = grouped.keys().cloned().collect();
        for (file, messages) in grouped {
            self.items.insert(file, messages);
        }
        files
    }

    /// Returns the messages cached for `file`.
    pub fn get(&self, file: &FileUri) -> &[Message] {
        self.items.get(file).map_or(&[], Vec::as_slice)
    }

    /// Returns true if anything is cached for `file`.
    pub fn has(&self, file: &FileUri) -> bool {
        self.items.contains_key(file)
    }

    /// Iterates over the cached files.
    pub fn files(&self) -> impl Iterator<Item = &FileUri> + '_ {
        self.items.keys()
    }

    /// Drops everything. Calling this more than once is harmless.
    pub fn dispose(&mut self) {
        self.items.clear();
    }
}

// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{FileUri, location::Range};
use std::{fmt, time::Duration};
use testlens_junit::{NonSuccessKind, SkippedKind, TestCaseStatus};

/// The outcome of a single test method.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Outcome {
    /// The test passed.
    Passed,

    /// An assertion in the test failed.
    Failure,

    /// The test raised an unexpected error.
    Error,

    /// The test was skipped.
    Skipped,

    /// The test was marked incomplete.
    Incomplete,

    /// The test passed but was flagged as risky.
    Risky,
}

impl Outcome {
    /// Returns true for outcomes that produce a diagnostic.
    pub fn is_failure(self) -> bool {
        matches!(self, Outcome::Failure | Outcome::Error)
    }

    /// Returns the string used for this outcome in user-facing output.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failure => "failure",
            Outcome::Error => "error",
            Outcome::Skipped => "skipped",
            Outcome::Incomplete => "incomplete",
            Outcome::Risky => "risky",
        }
    }
}

impl From<&TestCaseStatus> for Outcome {
    fn from(status: &TestCaseStatus) -> Self {
        match status {
            TestCaseStatus::Success => Outcome::Passed,
            TestCaseStatus::NonSuccess { kind, .. } => match kind {
                NonSuccessKind::Failure => Outcome::Failure,
                NonSuccessKind::Error => Outcome::Error,
                NonSuccessKind::Risky | NonSuccessKind::Warning => Outcome::Risky,
            },
            TestCaseStatus::Skipped { kind, .. } => match kind {
                SkippedKind::Skipped => Outcome::Skipped,
                SkippedKind::Incomplete => Outcome::Incomplete,
            },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of one test method, located in its source file.
#[derive(Clone, Debug, PartialEq)]
pub struct Assertion {
    /// The class declaring the test method.
    pub declaring_class: String,

    /// `{declaring_class}::{method_name}`.
    pub qualified_name: String,

    /// The method name, without any data set suffix.
    pub method_name: String,

    /// The file declaring the test.
    pub file: FileUri,

    /// The one-based line of the declaration.
    pub declaration_line: u32,

    /// The range of the method signature, if it could be found.
    pub declaration_range: Option<Range>,

    /// Where the result is shown: the failing line for failures with a stack frame in `file`,
    /// otherwise the declaration.
    pub range: Range,

    /// How long the test took, if the report says.
    pub duration: Option<Duration>,

    /// The outcome of the test.
    pub outcome: Outcome,

    /// The failure text. `None` for passed tests, possibly empty otherwise.
    pub failure_message: Option<String>,
}

/// The severity of a [`Diagnostic`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Severity {
    /// An error. Test failures are always reported as errors.
    Error,
}

/// An inline diagnostic for a failed test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    /// The file the diagnostic belongs to.
    pub file: FileUri,

    /// The failure text.
    pub message: String,

    /// The range the diagnostic is shown at.
    pub range: Range,

    /// The severity.
    pub severity: Severity,

    /// The label identifying where the diagnostic came from.
    pub source: String,
}

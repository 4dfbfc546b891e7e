// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{ParseError, read::read_report};
use indexmap::map::IndexMap;
use std::time::Duration;

/// The root element of a JUnit report.
///
/// Produced by [`Report::from_xml`]. Documents whose root is a bare
/// `testsuite` (no `testsuites` wrapper) are read as a report with a single
/// top-level suite and no name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    /// The name of this report, if the root element carried one.
    pub name: Option<String>,

    /// The overall time taken by the run, if reported.
    pub time: Option<Duration>,

    /// The top-level test suites, in document order.
    pub testsuites: Vec<TestSuite>,
}

impl Report {
    /// Reads a report from the text of a JUnit XML document.
    pub fn from_xml(xml: &str) -> Result<Self, ParseError> {
        read_report(xml)
    }

    /// Iterates over every testcase in the report, depth-first and in
    /// document order, along with the chain of suites enclosing it
    /// (outermost first).
    pub fn walk(&self) -> impl Iterator<Item = (Vec<&TestSuite>, &TestCase)> + '_ {
        let mut out = Vec::new();
        for suite in &self.testsuites {
            let mut ancestors = vec![suite];
            walk_suite(suite, &mut ancestors, &mut out);
        }
        out.into_iter()
    }
}

fn walk_suite<'a>(
    suite: &'a TestSuite,
    ancestors: &mut Vec<&'a TestSuite>,
    out: &mut Vec<(Vec<&'a TestSuite>, &'a TestCase)>,
) {
    for child in &suite.children {
        match child {
            SuiteChild::Suite(nested) => {
                ancestors.push(nested);
                walk_suite(nested, ancestors, out);
                ancestors.pop();
            }
            SuiteChild::Case(testcase) => out.push((ancestors.clone(), testcase)),
        }
    }
}

/// Represents a single testsuite.
///
/// Suites nest: PHPUnit, for example, emits one suite per test class and a
/// nested suite per data-provided method.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct TestSuite {
    /// The name of this testsuite. Empty if the element had no `name`.
    pub name: String,

    /// The source file this suite was declared in, if reported.
    pub file: Option<String>,

    /// The overall time taken by the testsuite.
    pub time: Option<Duration>,

    /// Nested suites and testcases, in document order.
    pub children: Vec<SuiteChild>,

    /// Other attributes, such as "tests", "hostname" or "package".
    pub extra: IndexMap<String, String>,
}

impl TestSuite {
    /// Creates a new, empty `TestSuite`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Iterates over the testcases directly inside this suite.
    pub fn testcases(&self) -> impl Iterator<Item = &TestCase> + '_ {
        self.children.iter().filter_map(|child| match child {
            SuiteChild::Case(testcase) => Some(testcase),
            SuiteChild::Suite(_) => None,
        })
    }

    /// Iterates over the suites directly nested inside this suite.
    pub fn testsuites(&self) -> impl Iterator<Item = &TestSuite> + '_ {
        self.children.iter().filter_map(|child| match child {
            SuiteChild::Suite(suite) => Some(suite),
            SuiteChild::Case(_) => None,
        })
    }
}

/// A child of a [`TestSuite`].
#[derive(Clone, Debug, PartialEq)]
pub enum SuiteChild {
    /// A nested testsuite.
    Suite(TestSuite),

    /// A testcase.
    Case(TestCase),
}

/// Represents a single testcase.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct TestCase {
    /// The name of the testcase, typically the test method.
    pub name: Option<String>,

    /// The "classname" of the testcase.
    ///
    /// Many runners write this with `.` as the namespace separator.
    pub classname: Option<String>,

    /// The "class" of the testcase, as written by PHPUnit. Uses the source
    /// language's own namespace separator.
    pub class: Option<String>,

    /// The source file the test was declared in.
    pub file: Option<String>,

    /// The one-based line the test was declared on.
    pub line: Option<u32>,

    /// The number of assertions in the testcase.
    pub assertions: Option<usize>,

    /// The time it took to execute this testcase.
    pub time: Option<Duration>,

    /// The status of this test.
    pub status: TestCaseStatus,

    /// Other attributes that were not recognized.
    pub extra: IndexMap<String, String>,
}

impl TestCase {
    /// Creates a new testcase.
    pub fn new(name: impl Into<String>, status: TestCaseStatus) -> Self {
        Self {
            name: Some(name.into()),
            classname: None,
            class: None,
            file: None,
            line: None,
            assertions: None,
            time: None,
            status,
            extra: IndexMap::new(),
        }
    }
}

/// Represents the success or failure of a testcase.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TestCaseStatus {
    /// This testcase passed.
    #[default]
    Success,

    /// This testcase did not pass.
    NonSuccess {
        /// How the testcase did not pass.
        kind: NonSuccessKind,

        /// The `message` attribute.
        message: Option<String>,

        /// The "type" of failure that occurred.
        ty: Option<String>,

        /// The description of the failure, read verbatim from the text node of the element.
        description: Option<String>,
    },

    /// This testcase was not run to completion.
    Skipped {
        /// Whether the test was skipped or marked incomplete.
        kind: SkippedKind,

        /// The `message` attribute.
        message: Option<String>,

        /// The "type" of skip that occurred.
        ty: Option<String>,

        /// The description of the skip, read verbatim from the text node of the element.
        description: Option<String>,
    },
}

impl TestCaseStatus {
    /// Returns the human-readable text attached to a non-success status.
    ///
    /// This is the element's text content if it had any, otherwise its `message` attribute,
    /// otherwise the empty string. Returns `None` for successful tests.
    pub fn failure_text(&self) -> Option<&str> {
        match self {
            TestCaseStatus::Success => None,
            TestCaseStatus::NonSuccess {
                message,
                description,
                ..
            }
            | TestCaseStatus::Skipped {
                message,
                description,
                ..
            } => Some(
                description
                    .as_deref()
                    .or(message.as_deref())
                    .unwrap_or_default(),
            ),
        }
    }

    /// Returns true if this status represents a successful test.
    pub fn is_success(&self) -> bool {
        matches!(self, TestCaseStatus::Success)
    }
}

/// The ways in which a test can fail to pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NonSuccessKind {
    /// An expected failure, such as a failed assertion. Read from `failure`.
    Failure,

    /// An unexpected error. Read from `error`.
    Error,

    /// The test passed but was flagged as risky. Read from `risky`, and from `error` elements
    /// whose type names a risky-test error.
    Risky,

    /// The test passed with a warning. Read from `warning`.
    Warning,
}

/// The ways in which a test can be left unfinished.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SkippedKind {
    /// The test was skipped. Read from `skipped`.
    Skipped,

    /// The test was marked incomplete. Read from `incomplete`.
    Incomplete,
}

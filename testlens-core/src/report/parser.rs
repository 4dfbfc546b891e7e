// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Assertion, Diagnostic, Outcome, Severity};
use crate::{
    FileUri,
    config::AnnotateConfig,
    errors::{MalformedEntry, ParseError},
    filesystem::Filesystem,
    location::{LocationResolver, Range},
};
use indexmap::IndexMap;
use testlens_junit::{Report, TestCase, TestSuite};
use tracing::{debug, warn};

/// PHPUnit appends this, followed by the data set name, to data-provided test names.
const DATA_SET_MARKER: &str = " with data set ";

/// The result of parsing one report.
#[derive(Clone, Debug, Default)]
pub struct ParsedReport {
    /// One assertion per well-formed testcase, in document order.
    pub assertions: Vec<Assertion>,

    /// Diagnostics for failed tests, keyed by file in order of first appearance.
    pub diagnostics_by_file: IndexMap<FileUri, Vec<Diagnostic>>,

    /// Testcases that were skipped because they could not be located.
    pub malformed: Vec<MalformedEntry>,
}

/// Parses JUnit reports into [`Assertion`]s and [`Diagnostic`]s.
///
/// The parser holds no state between calls to [`parse`](Self::parse).
pub struct ReportParser<'a, F> {
    fs: &'a F,
    config: &'a AnnotateConfig,
}

impl<'a, F: Filesystem> ReportParser<'a, F> {
    /// Creates a new parser.
    pub fn new(fs: &'a F, config: &'a AnnotateConfig) -> Self {
        Self { fs, config }
    }

    /// Parses `xml`.
    ///
    /// `target` is the file the run was started for; it is used for testcases that neither they
    /// nor their suites attribute to a file.
    pub async fn parse(
        &self,
        xml: &str,
        target: Option<&FileUri>,
    ) -> Result<ParsedReport, ParseError> {
        let report = Report::from_xml(xml)?;
        let mut resolver = LocationResolver::new(self.fs, &self.config.declaration_keywords);
        let mut parsed = ParsedReport::default();

        for (ancestors, testcase) in report.walk() {
            match self
                .make_assertion(&mut resolver, &ancestors, testcase, target)
                .await
            {
                Ok(assertion) => {
                    if assertion.outcome.is_failure() {
                        parsed
                            .diagnostics_by_file
                            .entry(assertion.file.clone())
                            .or_default()
                            .push(self.make_diagnostic(&assertion));
                    }
                    parsed.assertions.push(assertion);
                }
                Err(entry) => {
                    warn!("skipping testcase: {entry}");
                    parsed.malformed.push(entry);
                }
            }
        }

        debug!(
            "parsed {} assertions ({} malformed) across {} suites",
            parsed.assertions.len(),
            parsed.malformed.len(),
            report.testsuites.len(),
        );
        Ok(parsed)
    }

    async fn make_assertion(
        &self,
        resolver: &mut LocationResolver<'a, F>,
        ancestors: &[&TestSuite],
        testcase: &TestCase,
        target: Option<&FileUri>,
    ) -> Result<Assertion, MalformedEntry> {
        let Some(name) = testcase.name.as_deref() else {
            return Err(MalformedEntry::MissingName {
                suite: ancestors
                    .last()
                    .map(|suite| suite.name.clone())
                    .unwrap_or_default(),
            });
        };
        let method_name = name
            .split_once(DATA_SET_MARKER)
            .map_or(name, |(method, _)| method);

        let declaring_class = self
            .declaring_class(ancestors, testcase)
            .ok_or_else(|| MalformedEntry::MissingClass {
                name: name.to_owned(),
            })?;
        let qualified_name = format!("{declaring_class}::{method_name}");

        let file = testcase
            .file
            .as_deref()
            .or_else(|| ancestors.iter().rev().find_map(|suite| suite.file.as_deref()))
            .map(FileUri::new)
            .or_else(|| target.cloned())
            .ok_or_else(|| MalformedEntry::MissingFile {
                qualified_name: qualified_name.clone(),
            })?;

        let declaration_range = resolver.resolve(&file, method_name).await;
        let declaration_line = testcase
            .line
            .filter(|&line| line >= 1)
            .or_else(|| declaration_range.map(|range| range.start.line + 1))
            .ok_or_else(|| MalformedEntry::MissingLine {
                qualified_name: qualified_name.clone(),
                file: file.as_path().to_owned(),
            })?;

        let outcome = Outcome::from(&testcase.status);
        let failure_message = testcase.status.failure_text().map(ToOwned::to_owned);

        let mut range = None;
        if matches!(
            outcome,
            Outcome::Failure | Outcome::Error | Outcome::Risky
        ) && let Some(line) = failure_message
            .as_deref()
            .and_then(|text| failing_line(text, &file))
        {
            range = Some(
                resolver
                    .line_range(&file, line)
                    .await
                    .unwrap_or_else(|| Range::line(line)),
            );
        }
        let range = range
            .or(declaration_range)
            .unwrap_or_else(|| Range::line(declaration_line - 1));

        Ok(Assertion {
            declaring_class,
            qualified_name,
            method_name: method_name.to_owned(),
            file,
            declaration_line,
            declaration_range,
            range,
            duration: testcase.time,
            outcome,
            failure_message,
        })
    }

    fn declaring_class(&self, ancestors: &[&TestSuite], testcase: &TestCase) -> Option<String> {
        if let Some(class) = &testcase.class {
            return Some(class.clone());
        }
        if let Some(classname) = &testcase.classname {
            return Some(classname.replace('.', &self.config.namespace_separator));
        }
        ancestors
            .iter()
            .rev()
            .map(|suite| suite.name.as_str())
            .find(|name| !name.is_empty() && !name.contains("::"))
            .map(ToOwned::to_owned)
    }

    fn make_diagnostic(&self, assertion: &Assertion) -> Diagnostic {
        Diagnostic {
            file: assertion.file.clone(),
            message: assertion.failure_message.clone().unwrap_or_default(),
            range: assertion.range,
            severity: Severity::Error,
            source: self.config.diagnostic_source.clone(),
        }
    }
}

/// Finds the first `path:line` stack frame in `text` that points into `file`, and returns its
/// zero-based line.
fn failing_line(text: &str, file: &FileUri) -> Option<u32> {
    text.lines().find_map(|line| {
        let (path, line) = line.trim().rsplit_once(':')?;
        let line = line.parse::<u32>().ok().filter(|&line| line >= 1)?;
        (FileUri::new(path) == *file).then_some(line - 1)
    })
}

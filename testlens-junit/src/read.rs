// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read a `Report`.

use crate::{
    NonSuccessKind, ParseError, Report, SkippedKind, SuiteChild, TestCase, TestCaseStatus,
    TestSuite,
};
use indexmap::IndexMap;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::time::Duration;
use tracing::{debug, warn};

static TESTSUITES_TAG: &[u8] = b"testsuites";
static TESTSUITE_TAG: &[u8] = b"testsuite";
static TESTCASE_TAG: &[u8] = b"testcase";
static FAILURE_TAG: &[u8] = b"failure";
static ERROR_TAG: &[u8] = b"error";
static RISKY_TAG: &[u8] = b"risky";
static WARNING_TAG: &[u8] = b"warning";
static SKIPPED_TAG: &[u8] = b"skipped";
static INCOMPLETE_TAG: &[u8] = b"incomplete";

/// Error types whose name contains this are reported by PHPUnit for risky tests.
static RISKY_ERROR_TYPE: &str = "RiskyTest";

pub(crate) fn read_report(xml: &str) -> Result<Report, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut state = ReadState::default();

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|error| ParseError::xml(position, error))?;

        match event {
            Event::Start(tag) => {
                state
                    .open(&tag, false)
                    .map_err(|error| ParseError::xml(position, error))?;
            }
            Event::Empty(tag) => {
                state
                    .open(&tag, true)
                    .map_err(|error| ParseError::xml(position, error))?;
            }
            Event::End(tag) => state.close(tag.name().as_ref()),
            Event::Text(text) => {
                if state.in_status() {
                    let text = text
                        .unescape()
                        .map_err(|error| ParseError::xml(position, error))?;
                    state.push_text(&text);
                }
            }
            Event::CData(cdata) => {
                if state.in_status() {
                    let raw = cdata.into_inner();
                    let text = reader
                        .decoder()
                        .decode(&raw)
                        .map_err(|error| ParseError::xml(position, error))?;
                    state.push_text(&text);
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry nothing we use.
            _ => {}
        }
    }

    state.finish()
}

#[derive(Debug, Default)]
struct ReadState {
    report: Option<Report>,
    suites: Vec<TestSuite>,
    testcase: Option<TestCase>,
    status: Option<PendingStatus>,
    // Depth of elements we don't model (system-out, properties, ...) inside the current scope.
    unknown_depth: usize,
}

#[derive(Debug)]
struct PendingStatus {
    tag: Vec<u8>,
    status: TestCaseStatus,
    text: Option<String>,
    // Set when a status was already recorded for this testcase: the element is read but dropped.
    discard: bool,
}

impl ReadState {
    fn in_status(&self) -> bool {
        self.status.is_some()
    }

    fn push_text(&mut self, text: &str) {
        if let Some(status) = &mut self.status {
            status.text.get_or_insert_with(String::new).push_str(text);
        }
    }

    fn open(&mut self, tag: &BytesStart<'_>, is_empty: bool) -> quick_xml::Result<()> {
        let name = tag.name();
        let name = name.as_ref();

        if self.status.is_some() || self.unknown_depth > 0 {
            // Markup nested inside a status element or an unknown element is not modeled.
            if !is_empty {
                self.unknown_depth += 1;
            }
            return Ok(());
        }

        if name == TESTSUITES_TAG && self.report.is_none() && self.suites.is_empty() {
            let mut attrs = read_attributes(tag)?;
            self.report = Some(Report {
                name: attrs.shift_remove("name"),
                time: attrs.shift_remove("time").as_deref().and_then(parse_time),
                testsuites: Vec::new(),
            });
        } else if name == TESTSUITE_TAG && self.testcase.is_none() {
            self.suites.push(suite_from_attributes(read_attributes(tag)?));
            if is_empty {
                self.close_suite();
            }
        } else if name == TESTCASE_TAG && self.testcase.is_none() && !self.suites.is_empty() {
            self.testcase = Some(testcase_from_attributes(read_attributes(tag)?));
            if is_empty {
                self.close_testcase();
            }
        } else if self.testcase.is_some() && is_status_tag(name) {
            let attrs = read_attributes(tag)?;
            let discard = self
                .testcase
                .as_ref()
                .is_some_and(|testcase| !testcase.status.is_success());
            if discard {
                debug!(
                    "ignoring extra `{}` element: testcase already has a status",
                    String::from_utf8_lossy(name)
                );
            }
            self.status = Some(PendingStatus {
                tag: name.to_vec(),
                status: status_from_attributes(name, attrs),
                text: None,
                discard,
            });
            if is_empty {
                self.close_status();
            }
        } else {
            if name == TESTCASE_TAG && self.suites.is_empty() {
                warn!("ignoring `testcase` element outside of any `testsuite`");
            }
            if !is_empty {
                self.unknown_depth += 1;
            }
        }

        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        if self.unknown_depth > 0 {
            self.unknown_depth -= 1;
            return;
        }

        if self.status.as_ref().is_some_and(|status| status.tag == name) {
            self.close_status();
            return;
        }

        if name == TESTCASE_TAG && self.testcase.is_some() {
            self.close_testcase();
        } else if name == TESTSUITE_TAG && !self.suites.is_empty() {
            self.close_suite();
        }
        // The `testsuites` end tag needs no bookkeeping: its suites were attached as they closed.
    }

    fn close_status(&mut self) {
        let Some(PendingStatus {
            status,
            text,
            discard,
            ..
        }) = self.status.take()
        else {
            return;
        };
        if discard {
            return;
        }
        if let Some(testcase) = &mut self.testcase {
            testcase.status = with_description(status, text);
        }
    }

    fn close_testcase(&mut self) {
        if let (Some(testcase), Some(suite)) = (self.testcase.take(), self.suites.last_mut()) {
            suite.children.push(SuiteChild::Case(testcase));
        }
    }

    fn close_suite(&mut self) {
        let Some(suite) = self.suites.pop() else {
            return;
        };
        match self.suites.last_mut() {
            Some(parent) => parent.children.push(SuiteChild::Suite(suite)),
            None => self
                .report
                .get_or_insert_with(Report::default)
                .testsuites
                .push(suite),
        }
    }

    fn finish(self) -> Result<Report, ParseError> {
        if self.status.is_some() || self.testcase.is_some() {
            return Err(ParseError::Truncated { element: "testcase" });
        }
        if !self.suites.is_empty() {
            return Err(ParseError::Truncated { element: "testsuite" });
        }
        self.report.ok_or(ParseError::MissingRoot)
    }
}

fn is_status_tag(name: &[u8]) -> bool {
    [
        FAILURE_TAG,
        ERROR_TAG,
        RISKY_TAG,
        WARNING_TAG,
        SKIPPED_TAG,
        INCOMPLETE_TAG,
    ]
    .contains(&name)
}

fn read_attributes(tag: &BytesStart<'_>) -> quick_xml::Result<IndexMap<String, String>> {
    let mut attrs = IndexMap::new();
    for attr in tag.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn suite_from_attributes(mut attrs: IndexMap<String, String>) -> TestSuite {
    let mut suite = TestSuite::new(attrs.shift_remove("name").unwrap_or_default());
    suite.file = attrs.shift_remove("file");
    suite.time = attrs.shift_remove("time").as_deref().and_then(parse_time);
    suite.extra = attrs;
    suite
}

fn testcase_from_attributes(mut attrs: IndexMap<String, String>) -> TestCase {
    let name = attrs.shift_remove("name");
    let line = attrs.shift_remove("line").and_then(|line| match line.trim().parse() {
        Ok(line) => Some(line),
        Err(_) => {
            warn!("ignoring unparseable `line` attribute {line:?} on testcase {name:?}");
            None
        }
    });

    TestCase {
        classname: attrs.shift_remove("classname"),
        class: attrs.shift_remove("class"),
        file: attrs.shift_remove("file"),
        line,
        assertions: attrs
            .shift_remove("assertions")
            .and_then(|assertions| assertions.trim().parse().ok()),
        time: attrs.shift_remove("time").as_deref().and_then(parse_time),
        status: TestCaseStatus::Success,
        extra: attrs,
        name,
    }
}

fn status_from_attributes(tag: &[u8], mut attrs: IndexMap<String, String>) -> TestCaseStatus {
    let message = attrs.shift_remove("message");
    let ty = attrs.shift_remove("type");

    let skipped = |kind| TestCaseStatus::Skipped {
        kind,
        message: message.clone(),
        ty: ty.clone(),
        description: None,
    };
    let non_success = |kind| TestCaseStatus::NonSuccess {
        kind,
        message: message.clone(),
        ty: ty.clone(),
        description: None,
    };

    if tag == SKIPPED_TAG {
        skipped(SkippedKind::Skipped)
    } else if tag == INCOMPLETE_TAG {
        skipped(SkippedKind::Incomplete)
    } else if tag == FAILURE_TAG {
        non_success(NonSuccessKind::Failure)
    } else if tag == RISKY_TAG {
        non_success(NonSuccessKind::Risky)
    } else if tag == WARNING_TAG {
        non_success(NonSuccessKind::Warning)
    } else if ty.as_deref().is_some_and(|ty| ty.contains(RISKY_ERROR_TYPE)) {
        non_success(NonSuccessKind::Risky)
    } else {
        non_success(NonSuccessKind::Error)
    }
}

fn with_description(mut status: TestCaseStatus, text: Option<String>) -> TestCaseStatus {
    match &mut status {
        TestCaseStatus::Success => {}
        TestCaseStatus::NonSuccess { description, .. }
        | TestCaseStatus::Skipped { description, .. } => *description = text,
    }
    status
}

// Times are written as (possibly fractional) seconds.
fn parse_time(time: &str) -> Option<Duration> {
    let seconds: f64 = time.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// An error that occurs while reading a [`Report`](crate::Report).
///
/// Returned by [`Report::from_xml`](crate::Report::from_xml). Any of these
/// errors means the document as a whole could not be trusted; individual bad
/// `testcase` entries are not errors at this level.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("malformed JUnit XML at byte {position}")]
    Xml {
        /// The byte offset at which the reader gave up.
        position: usize,

        /// The underlying XML error.
        #[source]
        error: quick_xml::Error,
    },

    /// The document has no `testsuites` or `testsuite` element.
    #[error("JUnit report has no `testsuites` or `testsuite` root element")]
    MissingRoot,

    /// The document ended while an element was still open.
    #[error("JUnit report ended inside an unclosed `{element}` element")]
    Truncated {
        /// The element that was left open.
        element: &'static str,
    },
}

impl ParseError {
    pub(crate) fn xml(position: usize, error: impl Into<quick_xml::Error>) -> Self {
        Self::Xml {
            position,
            error: error.into(),
        }
    }
}

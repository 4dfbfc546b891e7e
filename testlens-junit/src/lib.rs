// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Read JUnit reports in Rust.
//!
//! [`Report::from_xml`] turns the text of a JUnit/XUnit XML document into a
//! nested tree of [`TestSuite`]s and [`TestCase`]s, in document order. The
//! tree stays close to the XML: it keeps missing or odd attributes
//! as `None` and leaves validation to the consumer.

mod errors;
mod read;
mod report;

pub use errors::*;
pub use report::*;

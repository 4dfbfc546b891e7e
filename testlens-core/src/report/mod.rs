// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning JUnit reports into assertions and diagnostics.
//!
//! The XML itself is read by `testlens_junit`; this module flattens the resulting suite tree,
//! derives each test's class, file and line, and maps failures back onto source ranges.

mod assertion;
mod parser;

pub use assertion::*;
pub use parser::*;

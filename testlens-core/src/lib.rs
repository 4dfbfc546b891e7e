// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for testlens: turning JUnit reports into gutter markers
//! and diagnostics for the file being edited.
//!
//! The basic flow is: a [`TestRunner`](runner::TestRunner) produces JUnit XML,
//! the [`ReportParser`](report::ReportParser) turns it into
//! [`Assertion`](report::Assertion)s, the
//! [`MessageCollection`](messages::MessageCollection) caches them per file, and
//! the two projectors in [`projector`] render the cache onto the host editor.
//! The [`Orchestrator`](orchestrator::Orchestrator) decides when each of those
//! steps happens.

pub mod config;
pub mod errors;
pub mod filesystem;
pub mod location;
pub mod messages;
pub mod orchestrator;
pub mod projector;
pub mod report;
pub mod runner;
#[cfg(test)]
mod test_helpers;
mod uri;

pub use uri::FileUri;

// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering cached messages onto the host editor.
//!
//! Both projectors are idempotent: projecting the same collection twice leaves the host in the
//! same state as projecting it once.

mod decorations;
mod diagnostics;

pub use decorations::*;
pub use diagnostics::*;

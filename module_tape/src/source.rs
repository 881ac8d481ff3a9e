// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Source positions attached to builder calls for diagnostics.

use core::fmt;

/// A 1-based `(line, column)` source position.
///
/// Builder operations accept an optional location; it travels into build
/// errors and into the container's per-item annotation table. The builder
/// itself never interprets it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceLoc {
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl SourceLoc {
    /// Creates a location from `line` and `column`.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

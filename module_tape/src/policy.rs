// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build errors and the pluggable reporting policy.
//!
//! Every semantic build failure goes through one funnel,
//! [`ErrorPolicy::report`]. The strict policy turns the funnel into an
//! early return; the capturing policy latches the first error and lets the
//! operation finish with a null result. Builder internals are written
//! against the funnel only and never assume either behavior.
//!
//! Structural misuse (body operations with no open function, malformed
//! register names) is a programmer error and panics instead of reporting.

use alloc::boxed::Box;
use core::fmt;

use crate::source::SourceLoc;

/// A semantic build error, with the source location of the offending call
/// when one was supplied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildError {
    /// What went wrong.
    pub kind: BuildErrorKind,
    /// Where, if the caller attached a location.
    pub loc: Option<SourceLoc>,
}

impl BuildError {
    /// Creates an error from its kind and optional location.
    #[must_use]
    pub fn new(kind: BuildErrorKind, loc: Option<SourceLoc>) -> Self {
        Self { kind, loc }
    }
}

/// The build error taxonomy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildErrorKind {
    /// A label name was declared twice in one function body.
    DuplicateLabel {
        /// The label name.
        name: Box<str>,
    },
    /// A label was referenced but never declared before the body closed.
    UnresolvedLabel {
        /// The label name.
        name: Box<str>,
    },
    /// An address operand named a symbol no open scope binds.
    SymbolNotFound {
        /// The symbol name.
        name: Box<str>,
    },
    /// An executable reference named no known function/kernel/signature.
    ExecutableNotFound {
        /// The executable name.
        name: Box<str>,
    },
    /// A signature reference named no known signature.
    SignatureNotFound {
        /// The signature name.
        name: Box<str>,
    },
    /// A directive reference resolved to nothing in any open scope.
    IdentifierNotFound {
        /// The identifier.
        name: Box<str>,
    },
    /// `start_arg_scope` while an argument scope was already open.
    NestedArgBlock,
    /// An argument-segment variable was declared with no open argument scope.
    MissingArgBlock,
    /// A label was referenced or declared outside any code block.
    LabelOutsideBody,
    /// A local name was declared where only module-scope symbols live.
    LocalSymbolAtModuleScope,
    /// A register list was built with fewer than 2 or more than 4 registers.
    BadRegisterListArity {
        /// The rejected element count.
        count: usize,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BuildErrorKind::DuplicateLabel { name } => {
                write!(f, "duplicate label declaration {name}")?;
            }
            BuildErrorKind::UnresolvedLabel { name } => {
                write!(f, "label {name} doesn't exist")?;
            }
            BuildErrorKind::SymbolNotFound { name } => write!(f, "symbol not found: {name}")?,
            BuildErrorKind::ExecutableNotFound { name } => {
                write!(f, "unknown executable reference {name}")?;
            }
            BuildErrorKind::SignatureNotFound { name } => write!(f, "unknown signature {name}")?,
            BuildErrorKind::IdentifierNotFound { name } => {
                write!(f, "identifier not found: {name}")?;
            }
            BuildErrorKind::NestedArgBlock => {
                write!(f, "nested argument scope is not allowed")?;
            }
            BuildErrorKind::MissingArgBlock => {
                write!(f, "no argument scope available at this location")?;
            }
            BuildErrorKind::LabelOutsideBody => {
                write!(f, "labels cannot be used outside of code blocks")?;
            }
            BuildErrorKind::LocalSymbolAtModuleScope => {
                write!(f, "local symbol declared at module scope")?;
            }
            BuildErrorKind::BadRegisterListArity { count } => {
                write!(f, "register list must contain 2, 3 or 4 registers, got {count}")?;
            }
        }
        if let Some(loc) = self.loc {
            write!(f, " at {loc}")?;
        }
        Ok(())
    }
}

impl core::error::Error for BuildError {}

/// The pluggable error-reporting strategy, one per builder instance.
pub trait ErrorPolicy {
    /// The single error funnel.
    ///
    /// Returning `Err` aborts the calling operation chain (the strict
    /// behavior); returning `Ok(())` tells the operation to finish with a
    /// null/default result (the capturing behavior).
    fn report(&mut self, err: BuildError) -> Result<(), BuildError>;

    /// The captured first error, if this policy captures.
    fn first_error(&self) -> Option<&BuildError>;

    /// Removes and returns the captured first error, if any.
    fn take_error(&mut self) -> Option<BuildError>;
}

/// Fail-fast policy: every reported error unwinds out of the call chain as
/// `Err`. A builder that failed under this policy is partially built and
/// must be discarded.
#[derive(Copy, Clone, Debug, Default)]
pub struct Strict;

impl ErrorPolicy for Strict {
    fn report(&mut self, err: BuildError) -> Result<(), BuildError> {
        Err(err)
    }

    fn first_error(&self) -> Option<&BuildError> {
        None
    }

    fn take_error(&mut self) -> Option<BuildError> {
        None
    }
}

/// Capture-and-continue policy: latches the *first* reported error, drops
/// the rest, and lets every operation return normally with a null result.
///
/// Clients check for an outstanding error after a build sequence and discard
/// the (structurally valid but semantically incomplete) container if one is
/// set.
#[derive(Clone, Debug, Default)]
pub struct Capture {
    first: Option<BuildError>,
}

impl Capture {
    /// Creates an empty capturing policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorPolicy for Capture {
    fn report(&mut self, err: BuildError) -> Result<(), BuildError> {
        if self.first.is_none() {
            self.first = Some(err);
        }
        Ok(())
    }

    fn first_error(&self) -> Option<&BuildError> {
        self.first.as_ref()
    }

    fn take_error(&mut self) -> Option<BuildError> {
        self.first.take()
    }
}

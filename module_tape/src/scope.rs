// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Name classification and per-region symbol maps.
//!
//! Classification is a pure function of the name's leading sigil and decides
//! where a declaration is *stored*; the builder's scope-chain lookup decides
//! where a reference is *searched*. The two are kept separate on purpose.

use hashbrown::HashMap;

use crate::record::{CodeId, StringId};

/// Sigil of function-local names.
pub const LOCAL_SIGIL: char = '%';
/// Sigil of module-global names (by convention; any non-local name is global).
pub const GLOBAL_SIGIL: char = '&';
/// Sigil of register names. Registers are operands, not symbols.
pub const REGISTER_SIGIL: char = '$';

/// Storage classification of a symbol name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NameKind {
    /// `%`-prefixed: belongs to the innermost open local scope.
    Local,
    /// Everything else: belongs to the global scope.
    Global,
}

impl NameKind {
    /// Classifies `name` by its leading sigil.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        if name.starts_with(LOCAL_SIGIL) {
            Self::Local
        } else {
            Self::Global
        }
    }
}

/// A name→symbol map for one lexical region.
///
/// Keys are interned name handles; at most one binding per name; iteration
/// order is unspecified.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scope {
    entries: HashMap<StringId, CodeId>,
}

impl Scope {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the binding for `name`.
    pub(crate) fn insert(&mut self, name: StringId, sym: CodeId) {
        self.entries.insert(name, sym);
    }

    pub(crate) fn get(&self, name: StringId) -> Option<CodeId> {
        self.entries.get(&name).copied()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

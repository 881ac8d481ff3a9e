// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The append-only typed item store.
//!
//! A [`ModuleContainer`] owns the code and operand item sequences, the
//! interning string pool, and per-item source annotations. Appending is the
//! only way to create an item; nothing is ever removed, resized in place, or
//! reordered, so handles stay valid for the container's lifetime. The one
//! sanctioned mutation of an existing item is resolving a reference slot
//! (label patching and the decl→def pass below).

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::record::{CodeId, CodeItem, ExecutableRecord, Operand, OperandId, StringId, VariableRecord};
use crate::source::SourceLoc;

/// The append-only container of module records.
#[derive(Clone, Debug, Default)]
pub struct ModuleContainer {
    code: Vec<CodeItem>,
    operands: Vec<Operand>,
    strings: Vec<Box<str>>,
    intern: HashMap<Box<str>, StringId>,
    code_locs: BTreeMap<u32, SourceLoc>,
    operand_locs: BTreeMap<u32, SourceLoc>,
}

impl ModuleContainer {
    /// Creates an empty container.
    ///
    /// Index 0 of each item sequence is seeded with a reserved null entry,
    /// and the string pool with the empty string, so zero/default handles
    /// never name real data.
    #[must_use]
    pub fn new() -> Self {
        let mut c = Self::default();
        c.code.push(CodeItem::Null);
        c.operands.push(Operand::Null);
        c.strings.push("".into());
        c.intern.insert("".into(), StringId::NONE);
        c
    }

    /// Appends a code item and returns its handle.
    pub fn append_code(&mut self, item: CodeItem) -> CodeId {
        let id = CodeId(u32::try_from(self.code.len()).unwrap_or(u32::MAX));
        self.code.push(item);
        id
    }

    /// Appends an operand item and returns its handle.
    pub fn append_operand(&mut self, op: Operand) -> OperandId {
        let id = OperandId(u32::try_from(self.operands.len()).unwrap_or(u32::MAX));
        self.operands.push(op);
        id
    }

    /// Returns the one-past-last code handle.
    ///
    /// The sentinel is usable as a range boundary ("nothing follows yet")
    /// and becomes the handle of the next appended item.
    #[must_use]
    pub fn end(&self) -> CodeId {
        CodeId(u32::try_from(self.code.len()).unwrap_or(u32::MAX))
    }

    /// Number of code items, including the reserved null entry.
    #[must_use]
    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Number of operand items, including the reserved null entry.
    #[must_use]
    pub fn operand_len(&self) -> usize {
        self.operands.len()
    }

    /// Returns the code item at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range (including the end sentinel).
    #[must_use]
    pub fn code(&self, id: CodeId) -> &CodeItem {
        &self.code[id.index()]
    }

    pub(crate) fn code_mut(&mut self, id: CodeId) -> &mut CodeItem {
        &mut self.code[id.index()]
    }

    /// Returns the operand at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    #[must_use]
    pub fn operand(&self, id: OperandId) -> &Operand {
        &self.operands[id.index()]
    }

    pub(crate) fn operand_mut(&mut self, id: OperandId) -> &mut Operand {
        &mut self.operands[id.index()]
    }

    /// Returns the executable record at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name an executable item.
    #[must_use]
    pub fn executable(&self, id: CodeId) -> &ExecutableRecord {
        match &self.code[id.index()] {
            CodeItem::Executable(x) => x,
            other => panic!("code item {id:?} is not an executable: {other:?}"),
        }
    }

    pub(crate) fn executable_mut(&mut self, id: CodeId) -> &mut ExecutableRecord {
        match &mut self.code[id.index()] {
            CodeItem::Executable(x) => x,
            other => panic!("code item {id:?} is not an executable: {other:?}"),
        }
    }

    /// Returns the variable record at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name a variable item.
    #[must_use]
    pub fn variable(&self, id: CodeId) -> &VariableRecord {
        match &self.code[id.index()] {
            CodeItem::Variable(v) => v,
            other => panic!("code item {id:?} is not a variable: {other:?}"),
        }
    }

    pub(crate) fn variable_mut(&mut self, id: CodeId) -> &mut VariableRecord {
        match &mut self.code[id.index()] {
            CodeItem::Variable(v) => v,
            other => panic!("code item {id:?} is not a variable: {other:?}"),
        }
    }

    /// Interns `s` and returns its handle. Equal content always yields the
    /// same handle.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.intern.get(s) {
            return id;
        }
        let id = StringId(u32::try_from(self.strings.len()).unwrap_or(u32::MAX));
        self.strings.push(s.into());
        self.intern.insert(s.into(), id);
        id
    }

    /// Looks up an already-interned string without interning it.
    #[must_use]
    pub fn find_str(&self, s: &str) -> Option<StringId> {
        self.intern.get(s).copied()
    }

    /// Returns the interned string at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    #[must_use]
    pub fn str(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    /// Records a source annotation for a code item.
    pub fn annotate_code(&mut self, id: CodeId, loc: Option<SourceLoc>) {
        if let Some(loc) = loc {
            self.code_locs.insert(id.0, loc);
        }
    }

    /// Records a source annotation for an operand item.
    pub fn annotate_operand(&mut self, id: OperandId, loc: Option<SourceLoc>) {
        if let Some(loc) = loc {
            self.operand_locs.insert(id.0, loc);
        }
    }

    /// Returns the source annotation of a code item, if any.
    #[must_use]
    pub fn code_loc(&self, id: CodeId) -> Option<SourceLoc> {
        self.code_locs.get(&id.0).copied()
    }

    /// Returns the source annotation of an operand item, if any.
    #[must_use]
    pub fn operand_loc(&self, id: OperandId) -> Option<SourceLoc> {
        self.operand_locs.get(&id.0).copied()
    }

    /// Iterates code items in program order, skipping the null entry.
    pub fn iter_code(&self) -> impl Iterator<Item = (CodeId, &CodeItem)> {
        self.code
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, item)| (CodeId(u32::try_from(i).unwrap_or(u32::MAX)), item))
    }

    /// Redirects operand references from executable declarations to their
    /// same-name definitions.
    ///
    /// Global lookup binds a name to its *first* occurrence in program
    /// order, declaration or definition. References recorded against a bare
    /// declaration must eventually resolve against the defining record, so
    /// this pass runs once when the program closes and rewrites every
    /// code-reference slot whose target is a non-definition executable.
    pub fn patch_decl_to_defs(&mut self) {
        let mut defs: HashMap<StringId, CodeId> = HashMap::new();
        for (id, item) in self.code.iter().enumerate().skip(1) {
            if let CodeItem::Executable(x) = item
                && x.is_definition
            {
                defs.entry(x.name)
                    .or_insert(CodeId(u32::try_from(id).unwrap_or(u32::MAX)));
            }
        }
        if defs.is_empty() {
            return;
        }

        let code = &self.code;
        let resolve = |target: CodeId| -> Option<CodeId> {
            let x = code.get(target.index())?.as_executable()?;
            if x.is_definition {
                return None;
            }
            defs.get(&x.name).copied().filter(|d| *d != target)
        };
        for op in &mut self.operands {
            match op {
                Operand::CodeRef { target } => {
                    if let Some(def) = resolve(*target) {
                        *target = def;
                    }
                }
                Operand::CodeList { elements } => {
                    for e in elements {
                        if let Some(def) = resolve(*e) {
                            *e = def;
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ExecutableKind, StringId};

    fn executable(name: StringId, is_definition: bool) -> CodeItem {
        CodeItem::Executable(ExecutableRecord {
            name,
            kind: ExecutableKind::Function,
            out_arg_count: 0,
            in_arg_count: 0,
            next_module_entry: CodeId::NONE,
            first_code_block_entry: CodeId::NONE,
            first_in_arg: CodeId::NONE,
            is_definition,
        })
    }

    #[test]
    fn append_returns_stable_handles() {
        let mut c = ModuleContainer::new();
        assert_eq!(c.end(), CodeId(1));
        let a = c.append_code(CodeItem::ArgBlockStart);
        let b = c.append_code(CodeItem::ArgBlockEnd);
        assert_eq!(a, CodeId(1));
        assert_eq!(b, CodeId(2));
        assert_eq!(c.end(), CodeId(3));
        assert_eq!(*c.code(a), CodeItem::ArgBlockStart);
        // Appending more items never invalidates earlier handles.
        for _ in 0..100 {
            c.append_code(CodeItem::ArgBlockStart);
        }
        assert_eq!(*c.code(b), CodeItem::ArgBlockEnd);

        // Enumeration skips the reserved null entry and starts at the
        // first real item.
        let mut iter = c.iter_code();
        assert_eq!(iter.next(), Some((a, &CodeItem::ArgBlockStart)));
        assert_eq!(c.iter_code().count(), c.code_len() - 1);
        assert_eq!(c.operand_len(), 1);
    }

    #[test]
    fn interning_deduplicates() {
        let mut c = ModuleContainer::new();
        let a = c.intern("&foo");
        let b = c.intern("&foo");
        let d = c.intern("&bar");
        assert_eq!(a, b);
        assert_ne!(a, d);
        assert_eq!(c.str(a), "&foo");
        assert_eq!(c.find_str("&bar"), Some(d));
        assert_eq!(c.find_str("&baz"), None);
        assert_eq!(c.str(StringId::NONE), "");
    }

    #[test]
    fn annotations_are_per_item() {
        let mut c = ModuleContainer::new();
        let a = c.append_code(CodeItem::ArgBlockStart);
        let b = c.append_code(CodeItem::ArgBlockEnd);
        c.annotate_code(a, Some(SourceLoc::new(3, 1)));
        c.annotate_code(b, None);
        assert_eq!(c.code_loc(a), Some(SourceLoc::new(3, 1)));
        assert_eq!(c.code_loc(b), None);
    }

    #[test]
    fn decl_to_def_redirects_references() {
        let mut c = ModuleContainer::new();
        let name = c.intern("&f");
        let decl = c.append_code(executable(name, false));
        let op = c.append_operand(Operand::CodeRef { target: decl });
        let list = c.append_operand(Operand::CodeList {
            elements: alloc::vec![decl, CodeId::NONE],
        });
        let def = c.append_code(executable(name, true));

        c.patch_decl_to_defs();

        assert_eq!(*c.operand(op), Operand::CodeRef { target: def });
        assert_eq!(
            *c.operand(list),
            Operand::CodeList {
                elements: alloc::vec![def, CodeId::NONE],
            }
        );
    }

    #[test]
    fn decl_without_def_is_left_alone() {
        let mut c = ModuleContainer::new();
        let name = c.intern("&g");
        let decl = c.append_code(executable(name, false));
        let op = c.append_operand(Operand::CodeRef { target: decl });
        c.patch_decl_to_defs();
        assert_eq!(*c.operand(op), Operand::CodeRef { target: decl });
    }
}

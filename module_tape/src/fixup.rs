// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Forward label reference bookkeeping.
//!
//! A reference to a not-yet-defined label is parked here as a patchable
//! slot. When the label is finally declared, every parked slot for its name
//! is overwritten with the label's handle. Pending entries are keyed by
//! interned name in an ordered map, so the "first remaining reference"
//! surfaced by the unresolved-label error is deterministic.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::container::ModuleContainer;
use crate::record::{CodeId, Operand, OperandId, StringId};
use crate::source::SourceLoc;

/// A patchable reference slot inside an already-appended operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RefSlot {
    /// The `target` field of a code-reference operand.
    CodeRefTarget(OperandId),
    /// One element of a code-list operand.
    ListElement {
        /// The list operand.
        operand: OperandId,
        /// Element position.
        index: usize,
    },
}

/// One parked reference awaiting its label.
#[derive(Copy, Clone, Debug)]
pub(crate) struct PendingRef {
    pub(crate) slot: RefSlot,
    pub(crate) loc: Option<SourceLoc>,
}

/// The per-function pending map: interned label name → FIFO reference list.
#[derive(Clone, Debug, Default)]
pub(crate) struct LabelFixups {
    pending: BTreeMap<StringId, Vec<PendingRef>>,
}

impl LabelFixups {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Parks `slot` until a label named `name` is declared.
    pub(crate) fn record(&mut self, name: StringId, slot: RefSlot, loc: Option<SourceLoc>) {
        self.pending
            .entry(name)
            .or_default()
            .push(PendingRef { slot, loc });
    }

    /// Removes and returns the pending list for `name`, if any.
    pub(crate) fn take(&mut self, name: StringId) -> Option<Vec<PendingRef>> {
        self.pending.remove(&name)
    }

    /// Returns the first entry of the first remaining list, if any.
    ///
    /// Its location is the one surfaced by the unresolved-label error.
    pub(crate) fn first_pending(&self) -> Option<(StringId, PendingRef)> {
        let (&name, list) = self.pending.iter().next()?;
        list.first().map(|&r| (name, r))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Writes `target` into the reference slot `slot`.
///
/// # Panics
///
/// Panics if the slot does not name a code-reference or code-list operand,
/// or if a list index is out of range. Slots are produced by the builder
/// alongside the operands they point into, so a mismatch is a logic error.
pub(crate) fn patch_slot(container: &mut ModuleContainer, slot: RefSlot, target: CodeId) {
    match slot {
        RefSlot::CodeRefTarget(id) => match container.operand_mut(id) {
            Operand::CodeRef { target: t } => *t = target,
            other => panic!("fixup slot {id:?} is not a code reference: {other:?}"),
        },
        RefSlot::ListElement { operand, index } => match container.operand_mut(operand) {
            Operand::CodeList { elements } => elements[index] = target,
            other => panic!("fixup slot {operand:?} is not a code list: {other:?}"),
        },
    }
}

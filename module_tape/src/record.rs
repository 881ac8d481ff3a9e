// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Record definitions and typed handles for the module container.
//!
//! The container holds two append-only item sequences: *code* items
//! (directives and instructions, in program order) and *operand* items.
//! Handles are plain indices into those sequences; index 0 of each sequence
//! is a reserved null entry, so the zero/default handle always means
//! "absent".

use alloc::vec::Vec;

use crate::types::{
    Alignment, Allocation, Linkage, MachineModel, Profile, RegKind, Round, ScalarType, Segment,
    TypeTag,
};

/// Handle of a code item (directive or instruction).
///
/// `CodeId::NONE` (the default) is the reserved null handle. Handles stay
/// valid for the container's lifetime: items are never moved or deleted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CodeId(pub u32);

impl CodeId {
    /// The null handle.
    pub const NONE: Self = Self(0);

    /// Returns `true` for the null handle.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Returns the handle of the item appended directly after this one.
    ///
    /// Used to walk an executable header to its parameter records.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of an operand item.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OperandId(pub u32);

impl OperandId {
    /// The null handle.
    pub const NONE: Self = Self(0);

    /// Returns `true` for the null handle.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of an interned string. `StringId::NONE` is the empty string.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringId(pub u32);

impl StringId {
    /// The reserved empty-string handle.
    pub const NONE: Self = Self(0);

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An opaque instruction opcode. The opcode catalog is collaborator data;
/// the container stores the id without interpreting it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OpcodeId(pub u16);

/// The kind of an executable (function-like) record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecutableKind {
    /// A directly callable function.
    Function,
    /// An indirectly callable function.
    IndirectFunction,
    /// A kernel entry point.
    Kernel,
    /// A call signature (no body; created as a definition).
    Signature,
}

/// The module header record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Module name.
    pub name: StringId,
    /// Major format version.
    pub major: u32,
    /// Minor format version.
    pub minor: u32,
    /// Address-space width.
    pub machine_model: MachineModel,
    /// Feature profile.
    pub profile: Profile,
    /// Default float rounding.
    pub default_round: Round,
}

/// A function/kernel/indirect-function/signature header record.
///
/// The three auxiliary handles let a reader walk
/// header → output parameters → input parameters → code block without
/// re-scanning: they are stamped to the store's end sentinel at each
/// declaration step and settle to their final values when the body closes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutableRecord {
    /// Symbol name (global by convention).
    pub name: StringId,
    /// Which executable flavor this header declares.
    pub kind: ExecutableKind,
    /// Number of output parameters.
    pub out_arg_count: u32,
    /// Number of input parameters.
    pub in_arg_count: u32,
    /// First code item after this executable's extent.
    pub next_module_entry: CodeId,
    /// First code item of the body.
    pub first_code_block_entry: CodeId,
    /// First input parameter record.
    pub first_in_arg: CodeId,
    /// `true` once a body has been opened (or immediately, for signatures).
    pub is_definition: bool,
}

/// A variable (or image/sampler) record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableRecord {
    /// Symbol name.
    pub name: StringId,
    /// Memory segment.
    pub segment: Segment,
    /// Value type; arrays use the array tag plus [`dim`](Self::dim).
    pub type_tag: TypeTag,
    /// Element count for array variables, 0 otherwise.
    pub dim: u64,
    /// Natural alignment of the element type.
    pub align: Alignment,
    /// Binding class.
    pub linkage: Linkage,
    /// Storage placement class.
    pub allocation: Allocation,
    /// `true` for defining occurrences.
    pub is_definition: bool,
}

/// An instruction record. Operand semantics are collaborator data keyed by
/// the opcode; the container only stores the attached operand handles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstRecord {
    /// Opcode id.
    pub opcode: OpcodeId,
    /// Instruction type tag.
    pub type_tag: TypeTag,
    /// Attached operands, in operand-slot order.
    pub operands: Vec<OperandId>,
}

/// One entry of the code item sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodeItem {
    /// The reserved entry at index 0.
    Null,
    /// Module header.
    Module(ModuleRecord),
    /// Executable header.
    Executable(ExecutableRecord),
    /// Variable, image, or sampler.
    Variable(VariableRecord),
    /// A code label.
    Label {
        /// Label name (function-local by convention).
        name: StringId,
    },
    /// A named synchronization barrier resource.
    Fbarrier {
        /// Barrier name.
        name: StringId,
    },
    /// Start marker of a call-argument block.
    ArgBlockStart,
    /// End marker of a call-argument block.
    ArgBlockEnd,
    /// A comment directive.
    Comment {
        /// Comment text.
        text: StringId,
    },
    /// An extension directive.
    Extension {
        /// Extension name.
        name: StringId,
    },
    /// An instruction.
    Inst(InstRecord),
}

impl CodeItem {
    /// Returns the symbol name of named items, `None` otherwise.
    #[must_use]
    pub fn name(&self) -> Option<StringId> {
        match self {
            Self::Module(m) => Some(m.name),
            Self::Executable(x) => Some(x.name),
            Self::Variable(v) => Some(v.name),
            Self::Label { name } | Self::Fbarrier { name } | Self::Extension { name } => {
                Some(*name)
            }
            _ => None,
        }
    }

    /// Returns the executable record, if this item is one.
    #[must_use]
    pub fn as_executable(&self) -> Option<&ExecutableRecord> {
        match self {
            Self::Executable(x) => Some(x),
            _ => None,
        }
    }

    /// Returns the variable record, if this item is one.
    #[must_use]
    pub fn as_variable(&self) -> Option<&VariableRecord> {
        match self {
            Self::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` for label items.
    #[must_use]
    pub fn is_label(&self) -> bool {
        matches!(self, Self::Label { .. })
    }

    /// Returns `true` for directives (every code item except instructions
    /// and the null entry).
    #[must_use]
    pub fn is_directive(&self) -> bool {
        !matches!(self, Self::Null | Self::Inst(_))
    }
}

/// One entry of the operand item sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// The reserved entry at index 0.
    Null,
    /// A register operand.
    Register {
        /// Register kind from the name's kind letter.
        kind: RegKind,
        /// Decimal register index from the name.
        num: u32,
    },
    /// An immediate: raw bytes plus a scalar type tag.
    ConstantBytes {
        /// Little-endian payload bytes.
        bytes: Vec<u8>,
        /// Scalar value type of the payload.
        type_tag: ScalarType,
    },
    /// A reference to a code item (label, executable, other directive).
    CodeRef {
        /// Referenced code item; null while a label reference is pending.
        target: CodeId,
    },
    /// An ordered list of code references (e.g. a jump table's labels).
    CodeList {
        /// Referenced code items; null elements are pending label slots.
        elements: Vec<CodeId>,
    },
    /// A short vector of register operands.
    RegisterList {
        /// 2 to 4 register operands.
        regs: Vec<OperandId>,
    },
    /// A memory address: optional symbol, optional base register, offset.
    Address {
        /// Addressed variable, or null.
        symbol: CodeId,
        /// Base register operand, or null.
        reg: OperandId,
        /// Byte offset, stored unsigned (truncated under 32-bit addressing).
        offset: u64,
    },
    /// The wavefront-size placeholder operand.
    Wavesize,
}

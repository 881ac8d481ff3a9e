// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// @generated by module_tape_codegen. Do not edit by hand.

/// Semantic category of an instruction/operand property.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PropCategory {
    /// Placeholder category of [`PropId::None`].
    None,
    /// The property's value is a type tag.
    Type,
    /// The property's value is an operand slot.
    Operand,
    /// The property's value is a scalar attribute.
    Attribute,
}

/// Identifiers of instruction and operand properties.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PropId {
    /// No property.
    None = 0,
    /// Instruction result/value type.
    Type = 1,
    /// Coordinate type of image instructions.
    CoordType = 2,
    /// Image access type.
    ImageType = 3,
    /// Signal value type.
    SignalType = 4,
    /// Source value type of converting instructions.
    SourceType = 5,
    /// Byte size attribute of the instruction type.
    TypeSize = 6,
    /// Byte size attribute of the source type.
    SourceTypeSize = 7,
    /// Float rounding attribute.
    Round = 8,
    /// Execution width attribute.
    Width = 9,
    /// Memory equivalence class attribute.
    EquivClass = 10,
    /// Destination operand slot 0.
    D0 = 11,
    /// Destination operand slot 1.
    D1 = 12,
    /// Source operand slot 0.
    S0 = 13,
    /// Source operand slot 1.
    S1 = 14,
    /// Source operand slot 2.
    S2 = 15,
    /// Source operand slot 3.
    S3 = 16,
    /// Source operand slot 4.
    S4 = 17,
}

impl PropId {
    /// Parses a property from its id value.
    #[must_use]
    pub const fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::Type),
            2 => Some(Self::CoordType),
            3 => Some(Self::ImageType),
            4 => Some(Self::SignalType),
            5 => Some(Self::SourceType),
            6 => Some(Self::TypeSize),
            7 => Some(Self::SourceTypeSize),
            8 => Some(Self::Round),
            9 => Some(Self::Width),
            10 => Some(Self::EquivClass),
            11 => Some(Self::D0),
            12 => Some(Self::D1),
            13 => Some(Self::S0),
            14 => Some(Self::S1),
            15 => Some(Self::S2),
            16 => Some(Self::S3),
            17 => Some(Self::S4),
            _ => None,
        }
    }

    /// Returns the property's id value.
    #[must_use]
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Returns the property's semantic category.
    #[must_use]
    pub const fn category(self) -> PropCategory {
        match self {
            Self::None => PropCategory::None,
            Self::Type => PropCategory::Type,
            Self::CoordType => PropCategory::Type,
            Self::ImageType => PropCategory::Type,
            Self::SignalType => PropCategory::Type,
            Self::SourceType => PropCategory::Type,
            Self::TypeSize => PropCategory::Attribute,
            Self::SourceTypeSize => PropCategory::Attribute,
            Self::Round => PropCategory::Attribute,
            Self::Width => PropCategory::Attribute,
            Self::EquivClass => PropCategory::Attribute,
            Self::D0 => PropCategory::Operand,
            Self::D1 => PropCategory::Operand,
            Self::S0 => PropCategory::Operand,
            Self::S1 => PropCategory::Operand,
            Self::S2 => PropCategory::Operand,
            Self::S3 => PropCategory::Operand,
            Self::S4 => PropCategory::Operand,
        }
    }
}

/// Returns `true` for type-valued properties.
#[must_use]
pub const fn is_type_prop(p: PropId) -> bool {
    matches!(p.category(), PropCategory::Type)
}

/// Returns `true` for operand-valued properties.
#[must_use]
pub const fn is_operand_prop(p: PropId) -> bool {
    matches!(p.category(), PropCategory::Operand)
}

/// Returns the operand slot index of an operand-valued property.
#[must_use]
pub const fn operand_index(p: PropId) -> Option<u32> {
    match p {
        PropId::D0 => Some(0),
        PropId::D1 => Some(1),
        PropId::S0 => Some(0),
        PropId::S1 => Some(1),
        PropId::S2 => Some(2),
        PropId::S3 => Some(3),
        PropId::S4 => Some(4),
        _ => None,
    }
}

/// Returns the source-operand property for slot `index`.
#[must_use]
pub const fn src_operand_prop(index: u32) -> Option<PropId> {
    match index {
        0 => Some(PropId::S0),
        1 => Some(PropId::S1),
        2 => Some(PropId::S2),
        3 => Some(PropId::S3),
        4 => Some(PropId::S4),
        _ => None,
    }
}

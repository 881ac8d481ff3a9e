// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type tags, layout tables, and the small closed enums records are built
//! from (segments, linkage, allocation, machine model, profile, rounding,
//! register kinds).
//!
//! The alignment and array-of tables here are fixed collaborator data: the
//! builder consults them but never extends them.

/// A scalar (non-array) element type tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// 1-bit control value.
    B1,
    /// 8 opaque bits.
    B8,
    /// 16 opaque bits.
    B16,
    /// 32 opaque bits.
    B32,
    /// 64 opaque bits.
    B64,
    /// 128 opaque bits.
    B128,
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// Signed 8-bit integer.
    S8,
    /// Signed 16-bit integer.
    S16,
    /// Signed 32-bit integer.
    S32,
    /// Signed 64-bit integer.
    S64,
    /// 16-bit float.
    F16,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Read-write image handle.
    RwImg,
    /// Read-only image handle.
    RoImg,
    /// Write-only image handle.
    WoImg,
    /// Sampler handle.
    Samp,
    /// 32-bit signal handle.
    Sig32,
    /// 64-bit signal handle.
    Sig64,
}

impl ScalarType {
    /// Returns the natural alignment of a value of this type.
    #[must_use]
    pub const fn natural_alignment(self) -> Alignment {
        match self {
            Self::B1 | Self::B8 | Self::U8 | Self::S8 => Alignment::A1,
            Self::B16 | Self::U16 | Self::S16 | Self::F16 => Alignment::A2,
            Self::B32 | Self::U32 | Self::S32 | Self::F32 | Self::Sig32 => Alignment::A4,
            Self::B64
            | Self::U64
            | Self::S64
            | Self::F64
            | Self::Sig64
            | Self::RwImg
            | Self::RoImg
            | Self::WoImg
            | Self::Samp => Alignment::A8,
            Self::B128 => Alignment::A16,
        }
    }
}

/// A record type tag: a scalar, or an array of a scalar element type.
///
/// Array records carry their element count separately (see
/// [`VariableRecord::dim`](crate::record::VariableRecord::dim)); the tag only
/// distinguishes "array-of" from the plain element type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// A plain scalar value.
    Scalar(ScalarType),
    /// An array of scalar elements.
    Array(ScalarType),
}

impl TypeTag {
    /// The "array-of" transform: maps an element type to its array tag.
    #[must_use]
    pub const fn array_of(element: ScalarType) -> Self {
        Self::Array(element)
    }

    /// Returns `true` for array tags.
    #[must_use]
    pub const fn is_array(self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Returns the scalar element type.
    #[must_use]
    pub const fn element(self) -> ScalarType {
        match self {
            Self::Scalar(s) | Self::Array(s) => s,
        }
    }
}

/// A byte alignment, stored as its power-of-two exponent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Alignment {
    /// 1-byte alignment.
    A1,
    /// 2-byte alignment.
    A2,
    /// 4-byte alignment.
    A4,
    /// 8-byte alignment.
    A8,
    /// 16-byte alignment.
    A16,
}

impl Alignment {
    /// Returns the alignment in bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::A1 => 1,
            Self::A2 => 2,
            Self::A4 => 4,
            Self::A8 => 8,
            Self::A16 => 16,
        }
    }
}

/// The memory segment of a variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Flat addressing.
    Flat,
    /// Global memory.
    Global,
    /// Read-only memory.
    Readonly,
    /// Kernel argument memory.
    Kernarg,
    /// Work-group memory.
    Group,
    /// Work-item private memory.
    Private,
    /// Spill slots.
    Spill,
    /// Call-argument memory.
    Arg,
}

/// Visibility/binding class of a symbol.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Linkage {
    /// No linkage (e.g. formal parameters).
    #[default]
    None,
    /// Module-wide.
    Module,
    /// Function-local.
    Function,
    /// Argument-block-local.
    Arg,
}

/// Storage lifetime/placement category of a variable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Allocation {
    /// No allocation.
    #[default]
    None,
    /// Program lifetime.
    Program,
    /// Agent-resident.
    Agent,
    /// Automatic (stack-like) lifetime.
    Automatic,
}

/// Address-space width of the module.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MachineModel {
    /// 32-bit addressing.
    Small,
    /// 64-bit addressing.
    #[default]
    Large,
}

/// Feature profile of the module.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    /// Base profile.
    #[default]
    Base,
    /// Full profile.
    Full,
}

/// Default float rounding declared by the module header.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Round {
    /// Round to nearest even.
    #[default]
    NearEven,
    /// Round toward zero.
    Zero,
}

/// Register kind, derived from the kind letter of a register name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegKind {
    /// Control register (`$c`), 1 bit.
    Control,
    /// Single register (`$s`), 32 bits.
    Single,
    /// Double register (`$d`), 64 bits.
    Double,
    /// Quad register (`$q`), 128 bits.
    Quad,
}

impl RegKind {
    /// Returns the register width in bits.
    #[must_use]
    pub const fn bit_width(self) -> u32 {
        match self {
            Self::Control => 1,
            Self::Single => 32,
            Self::Double => 64,
            Self::Quad => 128,
        }
    }

    /// Returns the operand type of a register of this kind.
    #[must_use]
    pub const fn value_type(self) -> ScalarType {
        match self {
            Self::Control => ScalarType::B1,
            Self::Single => ScalarType::B32,
            Self::Double => ScalarType::B64,
            Self::Quad => ScalarType::B128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_alignment_follows_value_size() {
        assert_eq!(ScalarType::B1.natural_alignment().bytes(), 1);
        assert_eq!(ScalarType::U16.natural_alignment().bytes(), 2);
        assert_eq!(ScalarType::F32.natural_alignment().bytes(), 4);
        assert_eq!(ScalarType::S64.natural_alignment().bytes(), 8);
        assert_eq!(ScalarType::B128.natural_alignment().bytes(), 16);
        assert_eq!(ScalarType::RwImg.natural_alignment().bytes(), 8);
        assert_eq!(ScalarType::Samp.natural_alignment().bytes(), 8);
    }

    #[test]
    fn array_of_preserves_element() {
        let t = TypeTag::array_of(ScalarType::U32);
        assert!(t.is_array());
        assert_eq!(t.element(), ScalarType::U32);
        assert!(!TypeTag::Scalar(ScalarType::U32).is_array());
    }

    #[test]
    fn register_kind_widths() {
        assert_eq!(RegKind::Control.bit_width(), 1);
        assert_eq!(RegKind::Single.bit_width(), 32);
        assert_eq!(RegKind::Double.bit_width(), 64);
        assert_eq!(RegKind::Quad.bit_width(), 128);
        assert_eq!(RegKind::Quad.value_type(), ScalarType::B128);
    }
}

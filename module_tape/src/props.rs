// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instruction/operand property metadata (generated).
//!
//! These tables classify property identifiers into semantic categories
//! (type-valued vs. operand-valued vs. scalar attribute) and map operand
//! properties to their slot indices. They are generated from
//! `module_tape/props.json` by `module_tape_codegen` and consumed read-only.

include!("props_gen.rs");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prop_ids_are_stable() {
        assert_eq!(PropId::None.id(), 0);
        assert_eq!(PropId::Type.id(), 1);
        assert_eq!(PropId::D0.id(), 11);
        assert_eq!(PropId::S4.id(), 17);
        assert_eq!(PropId::from_u16(9), Some(PropId::Width));
        assert_eq!(PropId::from_u16(99), None);
    }

    #[test]
    fn categories_partition_the_id_space() {
        assert!(is_type_prop(PropId::Type));
        assert!(is_type_prop(PropId::SourceType));
        assert!(!is_type_prop(PropId::Width));
        assert!(is_operand_prop(PropId::D1));
        assert!(is_operand_prop(PropId::S2));
        assert!(!is_operand_prop(PropId::TypeSize));
        assert_eq!(PropId::Round.category(), PropCategory::Attribute);
    }

    #[test]
    fn operand_index_mapping() {
        assert_eq!(operand_index(PropId::D0), Some(0));
        assert_eq!(operand_index(PropId::S0), Some(0));
        assert_eq!(operand_index(PropId::S4), Some(4));
        assert_eq!(operand_index(PropId::Type), None);
        assert_eq!(src_operand_prop(2), Some(PropId::S2));
        assert_eq!(src_operand_prop(5), None);
    }
}

// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `module_tape`: a typed, append-only container and single-pass builder
//! for kernel-language module IR.
//!
//! A front end drives a [`builder::ModuleBuilder`] with declarations,
//! symbols, labels, instructions, and operands; the builder resolves all
//! cross-references — including forward label references and
//! declaration-before-definition executables — while appending typed
//! records into a [`container::ModuleContainer`]. Serialization of the
//! finished container is a separate layer's job.
//!
//! ## Example
//!
//! ```
//! use module_tape::builder::ModuleBuilder;
//! use module_tape::record::{OpcodeId, Operand};
//! use module_tape::types::{MachineModel, Profile, Round, ScalarType, Segment, TypeTag};
//!
//! let mut b = ModuleBuilder::new();
//! b.start_program();
//! b.module("&m", 1, 0, MachineModel::Large, Profile::Base, Round::NearEven, None);
//!
//! b.decl_kernel("&k", None);
//! b.start_body();
//! // A branch to a label that is only declared later in the body.
//! let br = b.add_inst(OpcodeId(0x10), TypeTag::Scalar(ScalarType::B1), None);
//! let target = b.create_label_ref("@exit", None)?;
//! b.set_operands(br, vec![target]);
//! let exit = b.add_label("@exit", None)?;
//! assert!(b.end_body()?);
//! b.end_program();
//!
//! let c = b.into_container();
//! assert_eq!(*c.operand(target), Operand::CodeRef { target: exit });
//! # Ok::<(), module_tape::policy::BuildError>(())
//! ```

#![no_std]

extern crate alloc;

pub mod builder;
pub mod container;
pub(crate) mod fixup;
pub mod policy;
pub mod props;
pub mod record;
pub mod scope;
pub mod source;
pub mod types;

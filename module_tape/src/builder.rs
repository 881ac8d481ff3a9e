// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-pass module builder.
//!
//! A [`ModuleBuilder`] accumulates typed records into a
//! [`ModuleContainer`] and resolves all cross-references among them, so a
//! front end can feed it forward-referencing input (labels used before
//! their declaration, executables referenced before their definition)
//! without a second pass over source text.
//!
//! Structural protocol: `start_program` before anything else; parameters
//! are added between an executable declaration and `start_body`; labels and
//! instructions only while a body is open; `start_*`/`end_*` pairs strictly
//! nested, with at most one argument block open inside a body. Violating
//! the protocol is a programmer error and panics; semantic build failures
//! (unknown names, duplicate labels, bad nesting of argument blocks) are
//! routed through the instance's [`ErrorPolicy`].
//!
//! ## Example
//!
//! ```
//! use module_tape::builder::ModuleBuilder;
//! use module_tape::types::{MachineModel, Profile, Round, ScalarType, Segment};
//!
//! let mut b = ModuleBuilder::new();
//! b.start_program();
//! b.module("&m", 1, 0, MachineModel::Large, Profile::Base, Round::NearEven, None);
//!
//! b.decl_function("&f", None);
//! let out = b.add_variable("%out", Segment::Arg, ScalarType::U32, None)?;
//! b.add_output_parameter(out);
//! b.start_body();
//! let target = b.create_label_ref("@done", None)?; // forward reference
//! b.add_label("@done", None)?;
//! assert!(b.end_body()?);
//! b.end_program();
//! # let _ = target;
//! # Ok::<(), module_tape::policy::BuildError>(())
//! ```

use alloc::vec::Vec;

use crate::container::ModuleContainer;
use crate::fixup::{self, LabelFixups, RefSlot};
use crate::policy::{BuildError, BuildErrorKind, ErrorPolicy, Strict};
use crate::record::{
    CodeId, CodeItem, ExecutableKind, ExecutableRecord, InstRecord, ModuleRecord, OpcodeId,
    Operand, OperandId, StringId, VariableRecord,
};
use crate::scope::{NameKind, Scope};
use crate::source::SourceLoc;
use crate::types::{
    Allocation, Linkage, MachineModel, Profile, RegKind, Round, ScalarType, Segment, TypeTag,
};

/// Infers a register's operand type from its name alone.
///
/// The kind letter after the `$` sigil maps to B1 (`c`), B32 (`s`) or
/// B128 (`q`); anything else, including `d`, defaults to B64. For contexts
/// that hold a parsed register operand, prefer
/// [`RegKind::value_type`].
#[must_use]
pub fn register_type(name: &str) -> ScalarType {
    debug_assert!(!name.is_empty());
    match name.as_bytes().get(1) {
        Some(b'c') => ScalarType::B1,
        Some(b's') => ScalarType::B32,
        Some(b'q') => ScalarType::B128,
        _ => ScalarType::B64,
    }
}

fn parse_register_name(name: &str) -> (RegKind, u32) {
    let bytes = name.as_bytes();
    assert!(
        bytes.len() > 2 && bytes[0] == b'$',
        "malformed register name {name:?}"
    );
    let kind = match bytes[1] {
        b'c' => RegKind::Control,
        b's' => RegKind::Single,
        b'd' => RegKind::Double,
        b'q' => RegKind::Quad,
        _ => panic!("invalid register kind in {name:?}"),
    };
    let num = match name[2..].parse::<u32>() {
        Ok(n) => n,
        Err(_) => panic!("invalid register index in {name:?}"),
    };
    (kind, num)
}

/// The single-pass module builder.
///
/// One instance builds one module; it is synchronous and non-reentrant.
/// The error policy `P` decides whether semantic failures unwind
/// ([`Strict`], the default) or are latched for later inspection
/// ([`Capture`](crate::policy::Capture)).
#[derive(Debug)]
pub struct ModuleBuilder<P: ErrorPolicy = Strict> {
    container: ModuleContainer,
    policy: P,
    global_scope: Option<Scope>,
    func_scope: Option<Scope>,
    arg_scope: Option<Scope>,
    current_func: CodeId,
    fixups: LabelFixups,
    machine_model: MachineModel,
    profile: Profile,
}

impl ModuleBuilder<Strict> {
    /// Creates a builder with the strict (fail-fast) error policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(Strict)
    }
}

impl Default for ModuleBuilder<Strict> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ErrorPolicy> ModuleBuilder<P> {
    /// Creates a builder with an explicit error policy.
    #[must_use]
    pub fn with_policy(policy: P) -> Self {
        Self {
            container: ModuleContainer::new(),
            policy,
            global_scope: None,
            func_scope: None,
            arg_scope: None,
            current_func: CodeId::NONE,
            fixups: LabelFixups::new(),
            machine_model: MachineModel::default(),
            profile: Profile::default(),
        }
    }

    /// Read access to the container under construction.
    #[must_use]
    pub fn container(&self) -> &ModuleContainer {
        &self.container
    }

    /// Consumes the builder and returns the finished container.
    #[must_use]
    pub fn into_container(self) -> ModuleContainer {
        self.container
    }

    /// The error captured by a capturing policy, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<&BuildError> {
        self.policy.first_error()
    }

    /// Removes and returns the captured error, if any.
    pub fn take_error(&mut self) -> Option<BuildError> {
        self.policy.take_error()
    }

    /// The machine model declared by the module header.
    #[must_use]
    pub fn machine_model(&self) -> MachineModel {
        self.machine_model
    }

    /// The profile declared by the module header.
    #[must_use]
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// The executable currently under construction, or null.
    #[must_use]
    pub fn current_function(&self) -> CodeId {
        self.current_func
    }

    // The single error funnel. Everything semantic goes through here; the
    // policy decides whether the `?` at the call site unwinds.
    fn fail(&mut self, kind: BuildErrorKind, loc: Option<SourceLoc>) -> Result<(), BuildError> {
        self.policy.report(BuildError::new(kind, loc))
    }

    // ---- program lifecycle ----

    /// Opens the program and its global scope.
    ///
    /// # Panics
    ///
    /// Panics if a program is already open.
    pub fn start_program(&mut self) {
        assert!(self.global_scope.is_none(), "program already started");
        self.global_scope = Some(Scope::new());
    }

    /// Closes the program: drops the global scope and reconciles
    /// declarations with their definitions
    /// (see [`ModuleContainer::patch_decl_to_defs`]).
    ///
    /// # Panics
    ///
    /// Panics if no program is open.
    pub fn end_program(&mut self) {
        assert!(self.global_scope.is_some(), "no program is open");
        self.global_scope = None;
        self.container.patch_decl_to_defs();
    }

    /// Emits the module header and records its profile and machine model
    /// for the rest of the build.
    ///
    /// # Panics
    ///
    /// Panics if no program is open.
    pub fn module(
        &mut self,
        name: &str,
        major: u32,
        minor: u32,
        machine_model: MachineModel,
        profile: Profile,
        default_round: Round,
        loc: Option<SourceLoc>,
    ) -> CodeId {
        assert!(self.global_scope.is_some(), "no program is open");
        debug_assert_eq!(NameKind::classify(name), NameKind::Global);
        let name_id = self.container.intern(name);
        let id = self.container.append_code(CodeItem::Module(ModuleRecord {
            name: name_id,
            major,
            minor,
            machine_model,
            profile,
            default_round,
        }));
        self.container.annotate_code(id, loc);
        self.machine_model = machine_model;
        self.profile = profile;
        if let Some(global) = self.global_scope.as_mut() {
            global.insert(name_id, id);
        }
        id
    }

    // ---- executable declarations ----

    /// Declares a function. The record becomes a definition when a body is
    /// opened.
    pub fn decl_function(&mut self, name: &str, loc: Option<SourceLoc>) -> CodeId {
        self.decl_executable_common(ExecutableKind::Function, false, name, loc)
    }

    /// Declares an indirectly callable function.
    pub fn decl_indirect_function(&mut self, name: &str, loc: Option<SourceLoc>) -> CodeId {
        self.decl_executable_common(ExecutableKind::IndirectFunction, false, name, loc)
    }

    /// Declares a kernel.
    pub fn decl_kernel(&mut self, name: &str, loc: Option<SourceLoc>) -> CodeId {
        self.decl_executable_common(ExecutableKind::Kernel, false, name, loc)
    }

    /// Declares a call signature. Signatures have no body and are created
    /// as definitions.
    pub fn decl_signature(&mut self, name: &str, loc: Option<SourceLoc>) -> CodeId {
        self.decl_executable_common(ExecutableKind::Signature, true, name, loc)
    }

    fn decl_executable_common(
        &mut self,
        kind: ExecutableKind,
        is_definition: bool,
        name: &str,
        loc: Option<SourceLoc>,
    ) -> CodeId {
        assert!(self.global_scope.is_some(), "no program is open");
        debug_assert_eq!(NameKind::classify(name), NameKind::Global);
        let name_id = self.container.intern(name);
        let id = self
            .container
            .append_code(CodeItem::Executable(ExecutableRecord {
                name: name_id,
                kind,
                out_arg_count: 0,
                in_arg_count: 0,
                next_module_entry: CodeId::NONE,
                first_code_block_entry: CodeId::NONE,
                first_in_arg: CodeId::NONE,
                is_definition,
            }));
        self.container.annotate_code(id, loc);
        // "Nothing follows yet": all three walk pointers start at the end
        // sentinel and are re-stamped as parameters and the body arrive.
        let end = self.container.end();
        {
            let x = self.container.executable_mut(id);
            x.next_module_entry = end;
            x.first_code_block_entry = end;
            x.first_in_arg = end;
        }
        // First occurrence wins; a later same-name declaration reuses the
        // registered symbol until patch_decl_to_defs resolves the module.
        let already = {
            let Some(global) = self.global_scope.as_ref() else {
                unreachable!("checked above");
            };
            global
                .get(name_id)
                .is_some_and(|sym| self.container.code(sym).as_executable().is_some())
        };
        if !already
            && let Some(global) = self.global_scope.as_mut()
        {
            global.insert(name_id, id);
        }
        self.current_func = id;
        id
    }

    /// Registers `sym` as the next output parameter of the executable
    /// under declaration. Outputs must all be added before any input.
    ///
    /// # Panics
    ///
    /// Panics if no executable is under declaration, or if `sym` is not a
    /// variable record.
    pub fn add_output_parameter(&mut self, sym: CodeId) {
        let f = self.current_func;
        assert!(!f.is_none(), "no executable is under declaration");
        {
            let v = self.container.variable_mut(sym);
            v.linkage = Linkage::None;
            v.allocation = Allocation::Automatic;
            v.is_definition = true;
        }
        let end = self.container.end();
        let x = self.container.executable_mut(f);
        x.out_arg_count += 1;
        x.next_module_entry = end;
        x.first_code_block_entry = end;
        x.first_in_arg = end;
    }

    /// Registers `sym` as the next input parameter of the executable under
    /// declaration.
    ///
    /// # Panics
    ///
    /// Panics if no executable is under declaration, or if `sym` is not a
    /// variable record.
    pub fn add_input_parameter(&mut self, sym: CodeId) {
        let f = self.current_func;
        assert!(!f.is_none(), "no executable is under declaration");
        {
            let v = self.container.variable_mut(sym);
            v.linkage = Linkage::None;
            v.allocation = Allocation::Automatic;
            v.is_definition = true;
        }
        let end = self.container.end();
        let x = self.container.executable_mut(f);
        x.in_arg_count += 1;
        x.next_module_entry = end;
        x.first_code_block_entry = end;
    }

    /// Opens the body of the executable under declaration: marks it a
    /// definition, opens the function scope, and claims the previously
    /// added parameter records into it.
    ///
    /// # Panics
    ///
    /// Panics if no executable is under declaration or a body is already
    /// open.
    pub fn start_body(&mut self) {
        let f = self.current_func;
        assert!(!f.is_none(), "no executable is under declaration");
        assert!(self.func_scope.is_none(), "function body already open");
        self.func_scope = Some(Scope::new());
        let end = self.container.end();
        let (out_count, in_count, first_in) = {
            let x = self.container.executable_mut(f);
            x.is_definition = true;
            x.first_code_block_entry = end;
            (x.out_arg_count, x.in_arg_count, x.first_in_arg)
        };
        let mut cur = f.next();
        for _ in 0..out_count {
            self.claim_parameter(cur);
            cur = cur.next();
        }
        let mut cur = first_in;
        for _ in 0..in_count {
            self.claim_parameter(cur);
            cur = cur.next();
        }
    }

    // Parameters were declared with no linkage; claiming them into the
    // open body rebinds them as function-local automatics.
    fn claim_parameter(&mut self, sym: CodeId) {
        let name_id = {
            let v = self.container.variable_mut(sym);
            v.linkage = Linkage::Function;
            v.allocation = Allocation::Automatic;
            v.name
        };
        debug_assert_eq!(
            NameKind::classify(self.container.str(name_id)),
            NameKind::Local
        );
        let Some(scope) = self.func_scope.as_mut() else {
            unreachable!("function scope is open");
        };
        scope.insert(name_id, sym);
    }

    /// Closes the open body.
    ///
    /// Fails (returning `Ok(false)` under a capturing policy, `Err` under
    /// the strict one) if any label reference is still unresolved; the
    /// reported location is the earliest-recorded reference to the first
    /// undefined name, and the function scope is left open — the build is
    /// unrecoverable for this function. On success the function's
    /// `next_module_entry` is stamped and the current function is cleared.
    ///
    /// # Panics
    ///
    /// Panics if no body is open.
    pub fn end_body(&mut self) -> Result<bool, BuildError> {
        let f = self.current_func;
        assert!(
            !f.is_none() && self.func_scope.is_some(),
            "no function body is open"
        );
        if let Some((name_id, first)) = self.fixups.first_pending() {
            let name = self.container.str(name_id).into();
            self.fail(BuildErrorKind::UnresolvedLabel { name }, first.loc)?;
            return Ok(false);
        }
        let end = self.container.end();
        self.container.executable_mut(f).next_module_entry = end;
        self.func_scope = None;
        self.current_func = CodeId::NONE;
        Ok(true)
    }

    // ---- argument blocks ----

    /// Opens a call-argument block inside the current body. Nesting is
    /// forbidden: a second open fails and leaves the original block
    /// untouched.
    pub fn start_arg_scope(&mut self, loc: Option<SourceLoc>) -> Result<CodeId, BuildError> {
        if self.arg_scope.is_some() {
            self.fail(BuildErrorKind::NestedArgBlock, loc)?;
            return Ok(CodeId::NONE);
        }
        let id = self.container.append_code(CodeItem::ArgBlockStart);
        self.container.annotate_code(id, loc);
        self.arg_scope = Some(Scope::new());
        Ok(id)
    }

    /// Closes the argument block (a no-op close if none is open) and
    /// appends the end marker.
    pub fn end_arg_scope(&mut self, loc: Option<SourceLoc>) -> CodeId {
        self.arg_scope = None;
        let id = self.container.append_code(CodeItem::ArgBlockEnd);
        self.container.annotate_code(id, loc);
        id
    }

    // ---- symbols ----

    /// Declares a scalar variable and routes it into the scope its name
    /// classifies to.
    ///
    /// Linkage is Arg for the call-argument segment, Function inside an
    /// open body, Module otherwise; allocation is Program for global
    /// memory, Agent for read-only memory, Automatic otherwise. Array
    /// variables go through [`add_array_variable`](Self::add_array_variable),
    /// which is why the element type here is scalar by construction.
    pub fn add_variable(
        &mut self,
        name: &str,
        segment: Segment,
        scalar: ScalarType,
        loc: Option<SourceLoc>,
    ) -> Result<CodeId, BuildError> {
        let name_id = self.container.intern(name);
        let linkage = if segment == Segment::Arg {
            Linkage::Arg
        } else if self.func_scope.is_some() {
            Linkage::Function
        } else {
            Linkage::Module
        };
        let allocation = match segment {
            Segment::Global => Allocation::Program,
            Segment::Readonly => Allocation::Agent,
            _ => Allocation::Automatic,
        };
        let id = self.container.append_code(CodeItem::Variable(VariableRecord {
            name: name_id,
            segment,
            type_tag: TypeTag::Scalar(scalar),
            dim: 0,
            align: scalar.natural_alignment(),
            linkage,
            allocation,
            is_definition: true,
        }));
        self.container.annotate_code(id, loc);
        self.add_symbol(id, loc)
    }

    /// Declares an array variable: a scalar variable whose type tag is
    /// rewritten to the array-of variant, with the element count recorded
    /// separately.
    pub fn add_array_variable(
        &mut self,
        name: &str,
        dim: u64,
        segment: Segment,
        element: ScalarType,
        loc: Option<SourceLoc>,
    ) -> Result<CodeId, BuildError> {
        let id = self.add_variable(name, segment, element, loc)?;
        let v = self.container.variable_mut(id);
        v.type_tag = TypeTag::array_of(element);
        v.dim = dim;
        Ok(id)
    }

    /// Declares an image variable.
    pub fn add_image(
        &mut self,
        name: &str,
        segment: Segment,
        loc: Option<SourceLoc>,
    ) -> Result<CodeId, BuildError> {
        self.add_variable(name, segment, ScalarType::RwImg, loc)
    }

    /// Declares a sampler variable.
    pub fn add_sampler(
        &mut self,
        name: &str,
        segment: Segment,
        loc: Option<SourceLoc>,
    ) -> Result<CodeId, BuildError> {
        self.add_variable(name, segment, ScalarType::Samp, loc)
    }

    /// Routes an already-appended variable record into the scope its name
    /// classifies to. Returns the same handle; a local name with no open
    /// local scope is left unregistered.
    ///
    /// # Panics
    ///
    /// Panics if `sym` is not a variable record, or if a global name is
    /// declared with no open program.
    pub fn add_symbol(&mut self, sym: CodeId, loc: Option<SourceLoc>) -> Result<CodeId, BuildError> {
        let (name_id, segment) = {
            let v = self.container.variable(sym);
            (v.name, v.segment)
        };
        match NameKind::classify(self.container.str(name_id)) {
            NameKind::Global => {
                let Some(global) = self.global_scope.as_mut() else {
                    panic!("no program is open");
                };
                global.insert(name_id, sym);
            }
            NameKind::Local => {
                if self.arg_scope.is_none() && self.func_scope.is_none() {
                    // No local scope open: the record exists but is not
                    // reachable by name.
                } else if segment == Segment::Arg {
                    match self.arg_scope.as_mut() {
                        Some(arg) => arg.insert(name_id, sym),
                        None => self.fail(BuildErrorKind::MissingArgBlock, loc)?,
                    }
                } else {
                    let Some(func) = self.func_scope.as_mut() else {
                        panic!("function scope must be open for non-argument local symbols");
                    };
                    func.insert(name_id, sym);
                }
            }
        }
        Ok(sym)
    }

    /// Declares a named barrier resource.
    pub fn add_fbarrier(
        &mut self,
        name: &str,
        loc: Option<SourceLoc>,
    ) -> Result<CodeId, BuildError> {
        let name_id = self.container.intern(name);
        let is_local = NameKind::classify(name) == NameKind::Local;
        if is_local && self.func_scope.is_none() {
            self.fail(BuildErrorKind::LocalSymbolAtModuleScope, loc)?;
            return Ok(CodeId::NONE);
        }
        let id = self.container.append_code(CodeItem::Fbarrier { name: name_id });
        self.container.annotate_code(id, loc);
        let scope = if is_local {
            self.func_scope.as_mut()
        } else {
            self.global_scope.as_mut()
        };
        let Some(scope) = scope else {
            panic!("no program is open");
        };
        scope.insert(name_id, id);
        Ok(id)
    }

    fn add_label_internal(
        &mut self,
        name: &str,
        loc: Option<SourceLoc>,
    ) -> Result<CodeId, BuildError> {
        let name_id = self.container.intern(name);
        let duplicate = {
            let Some(scope) = self.func_scope.as_ref() else {
                panic!("labels require an open function body");
            };
            scope
                .get(name_id)
                .is_some_and(|id| self.container.code(id).is_label())
        };
        if duplicate {
            self.fail(BuildErrorKind::DuplicateLabel { name: name.into() }, loc)?;
            return Ok(CodeId::NONE);
        }
        let id = self.container.append_code(CodeItem::Label { name: name_id });
        self.container.annotate_code(id, loc);
        let Some(scope) = self.func_scope.as_mut() else {
            unreachable!("checked above");
        };
        scope.insert(name_id, id);
        Ok(id)
    }

    /// Declares a label in the open body and patches every reference that
    /// was recorded for its name.
    ///
    /// A second declaration of the same name fails with a duplicate-label
    /// error and leaves the first binding intact.
    ///
    /// # Panics
    ///
    /// Panics if no function body is open.
    pub fn add_label(&mut self, name: &str, loc: Option<SourceLoc>) -> Result<CodeId, BuildError> {
        let id = self.add_label_internal(name, loc)?;
        if !id.is_none() {
            let name_id = self.container.intern(name);
            self.patch_label_refs(name_id, id);
        }
        Ok(id)
    }

    fn patch_label_refs(&mut self, name_id: StringId, label: CodeId) {
        if let Some(list) = self.fixups.take(name_id) {
            for r in list {
                fixup::patch_slot(&mut self.container, r.slot, label);
            }
        }
    }

    // Resolves `slot` immediately if the label already exists in the open
    // body, otherwise parks it until the label is declared.
    fn record_label_ref(
        &mut self,
        slot: RefSlot,
        name: &str,
        loc: Option<SourceLoc>,
    ) -> Result<(), BuildError> {
        if self.func_scope.is_none() {
            self.fail(BuildErrorKind::LabelOutsideBody, loc)?;
            return Ok(());
        }
        let name_id = self.container.intern(name);
        let existing = {
            let Some(scope) = self.func_scope.as_ref() else {
                unreachable!("checked above");
            };
            scope
                .get(name_id)
                .filter(|&id| self.container.code(id).is_label())
        };
        match existing {
            Some(label) => fixup::patch_slot(&mut self.container, slot, label),
            None => self.fixups.record(name_id, slot, loc),
        }
        Ok(())
    }

    /// Appends a comment directive.
    pub fn add_comment(&mut self, text: &str, loc: Option<SourceLoc>) -> CodeId {
        let text = self.container.intern(text);
        let id = self.container.append_code(CodeItem::Comment { text });
        self.container.annotate_code(id, loc);
        id
    }

    /// Appends an extension directive.
    pub fn add_extension(&mut self, name: &str, loc: Option<SourceLoc>) -> CodeId {
        let name = self.container.intern(name);
        let id = self.container.append_code(CodeItem::Extension { name });
        self.container.annotate_code(id, loc);
        id
    }

    // ---- instructions ----

    /// Appends an instruction with no operands attached yet.
    pub fn add_inst(&mut self, opcode: OpcodeId, type_tag: TypeTag, loc: Option<SourceLoc>) -> CodeId {
        let id = self.container.append_code(CodeItem::Inst(InstRecord {
            opcode,
            type_tag,
            operands: Vec::new(),
        }));
        self.container.annotate_code(id, loc);
        id
    }

    /// Attaches constructed operands to an instruction.
    ///
    /// # Panics
    ///
    /// Panics if `inst` is not an instruction record.
    pub fn set_operands(&mut self, inst: CodeId, operands: Vec<OperandId>) {
        match self.container.code_mut(inst) {
            CodeItem::Inst(i) => i.operands = operands,
            other => panic!("code item {inst:?} is not an instruction: {other:?}"),
        }
    }

    // ---- operand construction ----

    /// Creates a register operand from its name.
    ///
    /// # Panics
    ///
    /// Panics on a malformed name: anything but the `$` sigil, a kind
    /// letter in `c`/`s`/`d`/`q`, and a decimal index.
    pub fn create_register(&mut self, name: &str, loc: Option<SourceLoc>) -> OperandId {
        let (kind, num) = parse_register_name(name);
        let id = self.container.append_operand(Operand::Register { kind, num });
        self.container.annotate_operand(id, loc);
        id
    }

    /// Creates a short vector of 2 to 4 register operands; any other arity
    /// fails with an invalid-arity error.
    pub fn create_register_list(
        &mut self,
        names: &[&str],
        loc: Option<SourceLoc>,
    ) -> Result<OperandId, BuildError> {
        if !(2..=4).contains(&names.len()) {
            self.fail(
                BuildErrorKind::BadRegisterListArity { count: names.len() },
                loc,
            )?;
            return Ok(OperandId::NONE);
        }
        let regs: Vec<OperandId> = names
            .iter()
            .map(|name| self.create_register(name, loc))
            .collect();
        let id = self.container.append_operand(Operand::RegisterList { regs });
        self.container.annotate_operand(id, loc);
        Ok(id)
    }

    /// Creates an immediate operand from raw little-endian bytes and a
    /// scalar type tag.
    pub fn create_immed(
        &mut self,
        bytes: &[u8],
        scalar: ScalarType,
        loc: Option<SourceLoc>,
    ) -> OperandId {
        let id = self.container.append_operand(Operand::ConstantBytes {
            bytes: bytes.into(),
            type_tag: scalar,
        });
        self.container.annotate_operand(id, loc);
        id
    }

    /// Creates a width operand: a U64 immediate, 0 when the caller supplies
    /// no width.
    pub fn create_width_operand(
        &mut self,
        width: Option<u32>,
        loc: Option<SourceLoc>,
    ) -> OperandId {
        let bits = u64::from(width.unwrap_or(0));
        self.create_immed(&bits.to_le_bytes(), ScalarType::U64, loc)
    }

    /// Creates the wavefront-size placeholder operand.
    pub fn create_wavesize(&mut self, loc: Option<SourceLoc>) -> OperandId {
        let id = self.container.append_operand(Operand::Wavesize);
        self.container.annotate_operand(id, loc);
        id
    }

    /// Creates a reference operand to an already-resolved code item.
    pub fn create_code_ref(&mut self, target: CodeId, loc: Option<SourceLoc>) -> OperandId {
        let id = self.container.append_operand(Operand::CodeRef { target });
        self.container.annotate_operand(id, loc);
        id
    }

    /// Resolves `name` to an executable in the global scope and creates a
    /// reference operand to it. Unknown names fail and yield the null
    /// operand.
    pub fn create_executable_ref(
        &mut self,
        name: &str,
        loc: Option<SourceLoc>,
    ) -> Result<OperandId, BuildError> {
        let found = self.global_lookup(name, |item| item.as_executable().is_some());
        let Some(target) = found else {
            self.fail(BuildErrorKind::ExecutableNotFound { name: name.into() }, loc)?;
            return Ok(OperandId::NONE);
        };
        Ok(self.create_code_ref(target, loc))
    }

    /// Resolves `name` to a signature declaration in the global scope and
    /// creates a reference operand to it.
    pub fn create_signature_ref(
        &mut self,
        name: &str,
        loc: Option<SourceLoc>,
    ) -> Result<OperandId, BuildError> {
        let found = self.global_lookup(name, |item| {
            item.as_executable()
                .is_some_and(|x| x.kind == ExecutableKind::Signature)
        });
        let Some(target) = found else {
            self.fail(BuildErrorKind::SignatureNotFound { name: name.into() }, loc)?;
            return Ok(OperandId::NONE);
        };
        Ok(self.create_code_ref(target, loc))
    }

    /// Resolves `name` through the full scope chain to any directive and
    /// creates a reference operand to it.
    pub fn create_directive_ref(
        &mut self,
        name: &str,
        loc: Option<SourceLoc>,
    ) -> Result<OperandId, BuildError> {
        let target = self.find_in_scopes(name, CodeItem::is_directive);
        if target.is_none() {
            self.fail(BuildErrorKind::IdentifierNotFound { name: name.into() }, loc)?;
            return Ok(OperandId::NONE);
        }
        Ok(self.create_code_ref(target, loc))
    }

    /// Creates a label reference operand. A not-yet-declared label leaves
    /// the operand's target null until [`add_label`](Self::add_label)
    /// patches it.
    pub fn create_label_ref(
        &mut self,
        name: &str,
        loc: Option<SourceLoc>,
    ) -> Result<OperandId, BuildError> {
        let op = self.container.append_operand(Operand::CodeRef {
            target: CodeId::NONE,
        });
        self.container.annotate_operand(op, loc);
        self.record_label_ref(RefSlot::CodeRefTarget(op), name, loc)?;
        Ok(op)
    }

    /// Creates a label list operand. Placeholder slots of the final size
    /// are allocated first and each element is resolved independently, so
    /// the list may freely mix already-declared and forward-referenced
    /// labels.
    pub fn create_label_list(
        &mut self,
        names: &[&str],
        loc: Option<SourceLoc>,
    ) -> Result<OperandId, BuildError> {
        let op = self.container.append_operand(Operand::CodeList {
            elements: alloc::vec![CodeId::NONE; names.len()],
        });
        self.container.annotate_operand(op, loc);
        for (index, name) in names.iter().enumerate() {
            self.record_label_ref(RefSlot::ListElement { operand: op, index }, name, loc)?;
        }
        Ok(op)
    }

    /// Creates an address operand from an already-resolved symbol handle
    /// (or null), an optional base register, and a signed byte offset.
    ///
    /// Under 32-bit addressing the offset is reduced to its low 32 bits
    /// and reinterpreted as unsigned; it is not clamped or sign-checked.
    pub fn create_address(
        &mut self,
        symbol: CodeId,
        reg: OperandId,
        offset: i64,
        addr32: bool,
        loc: Option<SourceLoc>,
    ) -> OperandId {
        let offset = if addr32 {
            (offset as u64) & 0xFFFF_FFFF
        } else {
            offset as u64
        };
        let id = self
            .container
            .append_operand(Operand::Address { symbol, reg, offset });
        self.container.annotate_operand(id, loc);
        id
    }

    /// Creates an address operand, resolving the symbol name through the
    /// scope chain first. An empty name means "no symbol"; an unknown name
    /// fails and yields the null operand.
    pub fn create_address_by_name(
        &mut self,
        name: &str,
        reg: OperandId,
        offset: i64,
        addr32: bool,
        loc: Option<SourceLoc>,
    ) -> Result<OperandId, BuildError> {
        let mut symbol = CodeId::NONE;
        if !name.is_empty() {
            symbol = self.find_in_scopes(name, |item| item.as_variable().is_some());
            if symbol.is_none() {
                self.fail(BuildErrorKind::SymbolNotFound { name: name.into() }, loc)?;
                return Ok(OperandId::NONE);
            }
        }
        Ok(self.create_address(symbol, reg, offset, addr32, loc))
    }

    // ---- lookup ----

    /// Searches the scope chain — argument scope, then function scope,
    /// then global scope — for `name`, returning the first binding the
    /// filter accepts, or null. A kind-mismatched binding in an inner scope
    /// does not shadow an acceptable one further out.
    #[must_use]
    pub fn find_in_scopes(&self, name: &str, accept: impl Fn(&CodeItem) -> bool) -> CodeId {
        let Some(name_id) = self.container.find_str(name) else {
            return CodeId::NONE;
        };
        let chain = [
            self.arg_scope.as_ref(),
            self.func_scope.as_ref(),
            self.global_scope.as_ref(),
        ];
        for scope in chain.into_iter().flatten() {
            if let Some(id) = scope.get(name_id)
                && accept(self.container.code(id))
            {
                return id;
            }
        }
        CodeId::NONE
    }

    fn global_lookup(&self, name: &str, accept: impl Fn(&CodeItem) -> bool) -> Option<CodeId> {
        let scope = self.global_scope.as_ref()?;
        let name_id = self.container.find_str(name)?;
        scope
            .get(name_id)
            .filter(|&id| accept(self.container.code(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Capture;
    use crate::types::Alignment;

    fn open_function(b: &mut ModuleBuilder, name: &str) {
        b.decl_function(name, None);
        b.start_body();
    }

    fn program() -> ModuleBuilder {
        let mut b = ModuleBuilder::new();
        b.start_program();
        b.module(
            "&m",
            1,
            0,
            MachineModel::Large,
            Profile::Base,
            Round::NearEven,
            None,
        );
        b
    }

    #[test]
    fn forward_label_refs_patch_on_declaration() {
        let mut b = program();
        open_function(&mut b, "&f");
        let r1 = b.create_label_ref("@l", None).unwrap();
        let r2 = b.create_label_ref("@l", None).unwrap();
        let lbl = b.add_label("@l", None).unwrap();
        assert!(b.end_body().unwrap());

        for r in [r1, r2] {
            assert_eq!(*b.container().operand(r), Operand::CodeRef { target: lbl });
        }
    }

    #[test]
    fn backward_label_refs_resolve_immediately() {
        let mut b = program();
        open_function(&mut b, "&f");
        let lbl = b.add_label("@l", None).unwrap();
        let r = b.create_label_ref("@l", None).unwrap();
        assert_eq!(*b.container().operand(r), Operand::CodeRef { target: lbl });
        assert!(b.end_body().unwrap());
    }

    #[test]
    fn end_body_reports_first_unresolved_reference() {
        let mut b = ModuleBuilder::with_policy(Capture::new());
        b.start_program();
        b.decl_function("&f", None);
        b.start_body();
        b.create_label_ref("@missing", Some(SourceLoc::new(10, 3)))
            .unwrap();
        b.create_label_ref("@missing", Some(SourceLoc::new(11, 3)))
            .unwrap();
        assert!(!b.end_body().unwrap());

        let err = b.take_error().unwrap();
        assert!(matches!(
            err.kind,
            BuildErrorKind::UnresolvedLabel { ref name } if &**name == "@missing"
        ));
        assert_eq!(err.loc, Some(SourceLoc::new(10, 3)));
    }

    #[test]
    fn end_body_under_strict_policy_unwinds() {
        let mut b = program();
        open_function(&mut b, "&f");
        b.create_label_ref("@nowhere", None).unwrap();
        let err = b.end_body().unwrap_err();
        assert!(matches!(err.kind, BuildErrorKind::UnresolvedLabel { .. }));
    }

    #[test]
    fn duplicate_label_keeps_first_binding() {
        let mut b = ModuleBuilder::with_policy(Capture::new());
        b.start_program();
        b.decl_function("&f", None);
        b.start_body();
        let first = b.add_label("@l", None).unwrap();
        let second = b.add_label("@l", Some(SourceLoc::new(5, 1))).unwrap();
        assert!(second.is_none());
        assert!(matches!(
            b.take_error().unwrap().kind,
            BuildErrorKind::DuplicateLabel { .. }
        ));
        let r = b.create_label_ref("@l", None).unwrap();
        assert_eq!(*b.container().operand(r), Operand::CodeRef { target: first });
    }

    #[test]
    fn label_list_mixes_defined_and_forward_labels() {
        let mut b = program();
        open_function(&mut b, "&f");
        let early = b.add_label("@early", None).unwrap();
        let list = b.create_label_list(&["@early", "@late"], None).unwrap();
        let late = b.add_label("@late", None).unwrap();
        assert!(b.end_body().unwrap());
        assert_eq!(
            *b.container().operand(list),
            Operand::CodeList {
                elements: alloc::vec![early, late],
            }
        );
    }

    #[test]
    fn declare_params_body_roundtrip() {
        let mut b = program();
        let f = b.decl_function("&f", None);
        let out = b.add_variable("%out", Segment::Arg, ScalarType::U32, None).unwrap();
        b.add_output_parameter(out);
        let input = b.add_variable("%in", Segment::Arg, ScalarType::F64, None).unwrap();
        b.add_input_parameter(input);

        assert!(!b.container().executable(f).is_definition);
        b.start_body();
        assert!(b.end_body().unwrap());

        let x = b.container().executable(f);
        assert_eq!(x.out_arg_count, 1);
        assert_eq!(x.in_arg_count, 1);
        assert!(x.is_definition);
        assert_eq!(x.next_module_entry, b.container().end());

        // Parameters were claimed into the body as function-local
        // automatics.
        let v = b.container().variable(out);
        assert_eq!(v.linkage, Linkage::Function);
        assert_eq!(v.allocation, Allocation::Automatic);
    }

    #[test]
    fn declaration_without_body_stays_a_declaration() {
        let mut b = program();
        let f = b.decl_function("&f", None);
        assert!(!b.container().executable(f).is_definition);
        let g = b.decl_signature("&sig", None);
        assert!(b.container().executable(g).is_definition);
    }

    #[test]
    fn nested_arg_scope_fails_and_preserves_the_open_one() {
        let mut b = ModuleBuilder::with_policy(Capture::new());
        b.start_program();
        b.decl_function("&f", None);
        b.start_body();
        let open = b.start_arg_scope(None).unwrap();
        assert!(!open.is_none());
        let arg = b.add_variable("%p", Segment::Arg, ScalarType::U32, None).unwrap();

        let nested = b.start_arg_scope(None).unwrap();
        assert!(nested.is_none());
        assert!(matches!(
            b.take_error().unwrap().kind,
            BuildErrorKind::NestedArgBlock
        ));

        // The original scope still resolves its symbols and still closes.
        assert_eq!(
            b.find_in_scopes("%p", |item| item.as_variable().is_some()),
            arg
        );
        b.end_arg_scope(None);
        assert_eq!(
            b.find_in_scopes("%p", |item| item.as_variable().is_some()),
            CodeId::NONE
        );
    }

    #[test]
    fn arg_variable_without_arg_scope_fails() {
        let mut b = ModuleBuilder::with_policy(Capture::new());
        b.start_program();
        b.decl_function("&f", None);
        b.start_body();
        b.add_variable("%p", Segment::Arg, ScalarType::U32, None).unwrap();
        assert!(matches!(
            b.take_error().unwrap().kind,
            BuildErrorKind::MissingArgBlock
        ));
    }

    #[test]
    fn global_names_route_to_global_scope_even_inside_a_body() {
        let mut b = program();
        open_function(&mut b, "&f");
        let g = b
            .add_variable("&counter", Segment::Global, ScalarType::U64, None)
            .unwrap();
        assert!(b.end_body().unwrap());
        // The function scope is gone; the name still resolves globally.
        assert_eq!(
            b.find_in_scopes("&counter", |item| item.as_variable().is_some()),
            g
        );
        let v = b.container().variable(g);
        assert_eq!(v.linkage, Linkage::Function); // declared while a body was open
        assert_eq!(v.allocation, Allocation::Program);
    }

    #[test]
    fn variable_layout_rules() {
        let mut b = program();
        let v = b
            .add_variable("&v", Segment::Readonly, ScalarType::F32, None)
            .unwrap();
        let rec = b.container().variable(v);
        assert_eq!(rec.align, Alignment::A4);
        assert_eq!(rec.linkage, Linkage::Module);
        assert_eq!(rec.allocation, Allocation::Agent);
        assert!(rec.is_definition);

        let a = b
            .add_array_variable("&arr", 16, Segment::Global, ScalarType::U8, None)
            .unwrap();
        let rec = b.container().variable(a);
        assert_eq!(rec.type_tag, TypeTag::Array(ScalarType::U8));
        assert_eq!(rec.dim, 16);
        assert_eq!(rec.align, Alignment::A1);

        let img = b.add_image("&img", Segment::Global, None).unwrap();
        assert_eq!(
            b.container().variable(img).type_tag,
            TypeTag::Scalar(ScalarType::RwImg)
        );
    }

    #[test]
    fn address_offset_truncates_under_32bit_addressing() {
        let mut b = program();
        let r = b.create_register("$s1", None);
        let wide = b.create_address(CodeId::NONE, r, -1, false, None);
        let narrow = b.create_address(CodeId::NONE, r, -1, true, None);
        assert_eq!(
            *b.container().operand(wide),
            Operand::Address {
                symbol: CodeId::NONE,
                reg: r,
                offset: u64::MAX,
            }
        );
        assert_eq!(
            *b.container().operand(narrow),
            Operand::Address {
                symbol: CodeId::NONE,
                reg: r,
                offset: 0xFFFF_FFFF,
            }
        );
    }

    #[test]
    fn address_by_name_resolves_through_scopes() {
        let mut b = ModuleBuilder::with_policy(Capture::new());
        b.start_program();
        b.decl_function("&f", None);
        b.start_body();
        let v = b.add_variable("%local", Segment::Private, ScalarType::U32, None).unwrap();
        let addr = b
            .create_address_by_name("%local", OperandId::NONE, 8, false, None)
            .unwrap();
        assert_eq!(
            *b.container().operand(addr),
            Operand::Address {
                symbol: v,
                reg: OperandId::NONE,
                offset: 8,
            }
        );

        let missing = b
            .create_address_by_name("%nope", OperandId::NONE, 0, false, None)
            .unwrap();
        assert!(missing.is_none());
        assert!(matches!(
            b.take_error().unwrap().kind,
            BuildErrorKind::SymbolNotFound { .. }
        ));

        // Empty name: address with no symbol.
        let bare = b
            .create_address_by_name("", OperandId::NONE, 4, false, None)
            .unwrap();
        assert_eq!(
            *b.container().operand(bare),
            Operand::Address {
                symbol: CodeId::NONE,
                reg: OperandId::NONE,
                offset: 4,
            }
        );
    }

    #[test]
    fn register_parsing_and_type_inference() {
        let mut b = program();
        let r = b.create_register("$s12", None);
        assert_eq!(
            *b.container().operand(r),
            Operand::Register {
                kind: RegKind::Single,
                num: 12,
            }
        );
        assert_eq!(register_type("$c0"), ScalarType::B1);
        assert_eq!(register_type("$s7"), ScalarType::B32);
        assert_eq!(register_type("$d3"), ScalarType::B64);
        assert_eq!(register_type("$q1"), ScalarType::B128);
    }

    #[test]
    #[should_panic(expected = "invalid register kind")]
    fn garbled_register_kind_panics() {
        let mut b = program();
        b.create_register("$x1", None);
    }

    #[test]
    #[should_panic(expected = "malformed register name")]
    fn register_name_without_sigil_panics() {
        let mut b = program();
        b.create_register("s12", None);
    }

    #[test]
    fn register_list_arity_is_checked() {
        let mut b = ModuleBuilder::with_policy(Capture::new());
        b.start_program();
        let ok = b.create_register_list(&["$s1", "$s2", "$s3"], None).unwrap();
        assert!(!ok.is_none());
        let bad = b.create_register_list(&["$s1"], None).unwrap();
        assert!(bad.is_none());
        assert!(matches!(
            b.take_error().unwrap().kind,
            BuildErrorKind::BadRegisterListArity { count: 1 }
        ));
    }

    #[test]
    fn width_operand_defaults_to_zero() {
        let mut b = program();
        let w = b.create_width_operand(None, None);
        assert_eq!(
            *b.container().operand(w),
            Operand::ConstantBytes {
                bytes: alloc::vec![0; 8],
                type_tag: ScalarType::U64,
            }
        );
        let w2 = b.create_width_operand(Some(64), None);
        assert_eq!(
            *b.container().operand(w2),
            Operand::ConstantBytes {
                bytes: 64u64.to_le_bytes().as_slice().into(),
                type_tag: ScalarType::U64,
            }
        );
    }

    #[test]
    fn executable_and_signature_refs_resolve_globally() {
        let mut b = ModuleBuilder::with_policy(Capture::new());
        b.start_program();
        let f = b.decl_function("&f", None);
        let sig = b.decl_signature("&sig", None);

        let fr = b.create_executable_ref("&f", None).unwrap();
        assert_eq!(*b.container().operand(fr), Operand::CodeRef { target: f });

        let sr = b.create_signature_ref("&sig", None).unwrap();
        assert_eq!(*b.container().operand(sr), Operand::CodeRef { target: sig });

        // A function is not a signature.
        let not_sig = b.create_signature_ref("&f", None).unwrap();
        assert!(not_sig.is_none());
        assert!(matches!(
            b.take_error().unwrap().kind,
            BuildErrorKind::SignatureNotFound { .. }
        ));

        let unknown = b.create_executable_ref("&ghost", None).unwrap();
        assert!(unknown.is_none());
        assert!(matches!(
            b.take_error().unwrap().kind,
            BuildErrorKind::ExecutableNotFound { .. }
        ));
    }

    #[test]
    fn redeclaring_a_global_name_reuses_the_first_symbol() {
        let mut b = program();
        let first = b.decl_function("&f", None);
        let second = b.decl_function("&f", None);
        assert_ne!(first, second);
        // Lookup still binds to the first occurrence until the program is
        // reconciled at end_program.
        let r = b.create_executable_ref("&f", None).unwrap();
        assert_eq!(*b.container().operand(r), Operand::CodeRef { target: first });

        // Give the second record a body, then close the program: the
        // reference is redirected to the defining occurrence.
        b.start_body();
        assert!(b.end_body().unwrap());
        b.end_program();
        assert_eq!(*b.container().operand(r), Operand::CodeRef { target: second });
    }

    #[test]
    fn label_ref_outside_a_body_is_an_error() {
        let mut b = ModuleBuilder::with_policy(Capture::new());
        b.start_program();
        let op = b.create_label_ref("@l", None).unwrap();
        assert!(!op.is_none()); // the operand exists, its target stays null
        assert!(matches!(
            b.take_error().unwrap().kind,
            BuildErrorKind::LabelOutsideBody
        ));
        assert_eq!(
            *b.container().operand(op),
            Operand::CodeRef {
                target: CodeId::NONE,
            }
        );
    }

    #[test]
    fn fbarrier_routing() {
        let mut b = ModuleBuilder::with_policy(Capture::new());
        b.start_program();
        let g = b.add_fbarrier("&gbar", None).unwrap();
        assert!(!g.is_none());

        let bad = b.add_fbarrier("%lbar", None).unwrap();
        assert!(bad.is_none());
        assert!(matches!(
            b.take_error().unwrap().kind,
            BuildErrorKind::LocalSymbolAtModuleScope
        ));

        b.decl_function("&f", None);
        b.start_body();
        let l = b.add_fbarrier("%lbar", None).unwrap();
        assert_eq!(
            b.find_in_scopes("%lbar", |item| matches!(item, CodeItem::Fbarrier { .. })),
            l
        );
        assert!(b.end_body().unwrap());
    }

    #[test]
    fn capture_policy_latches_only_the_first_error() {
        let mut b = ModuleBuilder::with_policy(Capture::new());
        b.start_program();
        b.create_executable_ref("&first", None).unwrap();
        b.create_executable_ref("&second", None).unwrap();
        let err = b.first_error().unwrap();
        assert!(matches!(
            &err.kind,
            BuildErrorKind::ExecutableNotFound { name } if &**name == "&first"
        ));
    }

    #[test]
    fn instructions_carry_attached_operands() {
        let mut b = program();
        open_function(&mut b, "&f");
        let inst = b.add_inst(OpcodeId(7), TypeTag::Scalar(ScalarType::U32), None);
        let r = b.create_register("$s1", None);
        let imm = b.create_immed(&5u32.to_le_bytes(), ScalarType::U32, None);
        b.set_operands(inst, alloc::vec![r, imm]);
        assert!(b.end_body().unwrap());

        let CodeItem::Inst(i) = b.container().code(inst) else {
            panic!("expected an instruction");
        };
        assert_eq!(i.opcode, OpcodeId(7));
        assert_eq!(i.operands, alloc::vec![r, imm]);
    }

    #[test]
    fn directive_ref_walks_the_scope_chain() {
        let mut b = program();
        let g = b
            .add_variable("&gv", Segment::Global, ScalarType::U32, None)
            .unwrap();
        open_function(&mut b, "&f");
        let l = b
            .add_variable("%lv", Segment::Private, ScalarType::U32, None)
            .unwrap();
        let lr = b.create_directive_ref("%lv", None).unwrap();
        let gr = b.create_directive_ref("&gv", None).unwrap();
        assert_eq!(*b.container().operand(lr), Operand::CodeRef { target: l });
        assert_eq!(*b.container().operand(gr), Operand::CodeRef { target: g });
        assert!(b.end_body().unwrap());
    }
}

// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![doc = "Code generator for `module_tape` property tables.\n\n\
          This is a std-only build tool crate. It is not shipped as part of the core library.\n"]

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Deserialize, Clone)]
struct Spec {
    version: u32,
    properties: Vec<PropSpec>,
}

#[derive(Deserialize, Clone)]
struct PropSpec {
    name: String,
    id: u16,
    category: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    operand_index: Option<u32>,
    doc: String,
}

fn category_variant(category: &str) -> Result<&'static str> {
    Ok(match category {
        "none" => "None",
        "type" => "Type",
        "operand" => "Operand",
        "attribute" => "Attribute",
        other => bail!("unknown property category '{other}'"),
    })
}

fn sort_and_validate(props: &mut [PropSpec]) -> Result<()> {
    props.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.name.cmp(&b.name)));

    for w in props.windows(2) {
        if w[0].id == w[1].id {
            bail!("duplicate property id {}: {} and {}", w[0].id, w[0].name, w[1].name);
        }
        if w[0].name == w[1].name {
            bail!("duplicate property name '{}'", w[0].name);
        }
    }
    for p in props.iter() {
        category_variant(&p.category)?;
        match (p.category.as_str(), p.operand_index) {
            ("operand", None) => bail!("operand property {} is missing operand_index", p.name),
            ("operand", Some(_)) => match p.role.as_deref() {
                Some("dest") | Some("source") => {}
                Some(other) => bail!("invalid role '{other}' for operand property {}", p.name),
                None => bail!("operand property {} is missing a role", p.name),
            },
            (_, Some(_)) => bail!("non-operand property {} has an operand_index", p.name),
            (_, None) => {}
        }
    }
    Ok(())
}

fn generate(spec: Spec) -> Result<String> {
    if spec.version != 1 {
        bail!("unsupported props.json version {}", spec.version);
    }
    let mut props = spec.properties;
    sort_and_validate(&mut props)?;

    let mut out = String::new();
    out.push_str("// Copyright 2026 the Module Tape Authors\n");
    out.push_str("// SPDX-License-Identifier: Apache-2.0 OR MIT\n\n");
    out.push_str("// @generated by module_tape_codegen. Do not edit by hand.\n\n");

    out.push_str("/// Semantic category of an instruction/operand property.\n");
    out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq)]\n");
    out.push_str("pub enum PropCategory {\n");
    out.push_str("    /// Placeholder category of [`PropId::None`].\n");
    out.push_str("    None,\n");
    out.push_str("    /// The property's value is a type tag.\n");
    out.push_str("    Type,\n");
    out.push_str("    /// The property's value is an operand slot.\n");
    out.push_str("    Operand,\n");
    out.push_str("    /// The property's value is a scalar attribute.\n");
    out.push_str("    Attribute,\n");
    out.push_str("}\n\n");

    out.push_str("/// Identifiers of instruction and operand properties.\n");
    out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]\n");
    out.push_str("#[repr(u16)]\n");
    out.push_str("pub enum PropId {\n");
    for p in &props {
        writeln!(out, "    /// {}", p.doc)?;
        writeln!(out, "    {} = {},", p.name, p.id)?;
    }
    out.push_str("}\n\n");

    out.push_str("impl PropId {\n");
    out.push_str("    /// Parses a property from its id value.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub const fn from_u16(v: u16) -> Option<Self> {\n");
    out.push_str("        match v {\n");
    for p in &props {
        writeln!(out, "            {} => Some(Self::{}),", p.id, p.name)?;
    }
    out.push_str("            _ => None,\n");
    out.push_str("        }\n");
    out.push_str("    }\n\n");
    out.push_str("    /// Returns the property's id value.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub const fn id(self) -> u16 {\n");
    out.push_str("        self as u16\n");
    out.push_str("    }\n\n");
    out.push_str("    /// Returns the property's semantic category.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub const fn category(self) -> PropCategory {\n");
    out.push_str("        match self {\n");
    for p in &props {
        writeln!(
            out,
            "            Self::{} => PropCategory::{},",
            p.name,
            category_variant(&p.category)?
        )?;
    }
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str("/// Returns `true` for type-valued properties.\n");
    out.push_str("#[must_use]\n");
    out.push_str("pub const fn is_type_prop(p: PropId) -> bool {\n");
    out.push_str("    matches!(p.category(), PropCategory::Type)\n");
    out.push_str("}\n\n");

    out.push_str("/// Returns `true` for operand-valued properties.\n");
    out.push_str("#[must_use]\n");
    out.push_str("pub const fn is_operand_prop(p: PropId) -> bool {\n");
    out.push_str("    matches!(p.category(), PropCategory::Operand)\n");
    out.push_str("}\n\n");

    out.push_str("/// Returns the operand slot index of an operand-valued property.\n");
    out.push_str("#[must_use]\n");
    out.push_str("pub const fn operand_index(p: PropId) -> Option<u32> {\n");
    out.push_str("    match p {\n");
    for p in &props {
        if let Some(idx) = p.operand_index {
            writeln!(out, "        PropId::{} => Some({}),", p.name, idx)?;
        }
    }
    out.push_str("        _ => None,\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str("/// Returns the source-operand property for slot `index`.\n");
    out.push_str("#[must_use]\n");
    out.push_str("pub const fn src_operand_prop(index: u32) -> Option<PropId> {\n");
    out.push_str("    match index {\n");
    let mut sources: Vec<&PropSpec> = props
        .iter()
        .filter(|p| p.role.as_deref() == Some("source"))
        .collect();
    sources.sort_by_key(|p| p.operand_index);
    for w in sources.windows(2) {
        if w[0].operand_index == w[1].operand_index {
            bail!(
                "duplicate source operand index {:?}: {} and {}",
                w[0].operand_index,
                w[0].name,
                w[1].name
            );
        }
    }
    for p in &sources {
        let Some(idx) = p.operand_index else {
            bail!("source property {} is missing operand_index", p.name);
        };
        writeln!(out, "        {} => Some(PropId::{}),", idx, p.name)?;
    }
    out.push_str("        _ => None,\n");
    out.push_str("    }\n");
    out.push_str("}\n");

    Ok(out)
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let spec_path: PathBuf = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("module_tape/props.json"));
    let out_path: PathBuf = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("module_tape/src/props_gen.rs"));
    if args.next().is_some() {
        bail!("usage: module_tape_codegen [props.json] [props_gen_out.rs]");
    }

    let json =
        fs::read_to_string(&spec_path).with_context(|| format!("read {}", spec_path.display()))?;
    let spec: Spec =
        serde_json::from_str(&json).with_context(|| format!("parse {}", spec_path.display()))?;

    let rendered = generate(spec)?;
    fs::write(&out_path, rendered.as_bytes())
        .with_context(|| format!("write {}", out_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> Spec {
        serde_json::from_str(include_str!("../../module_tape/props.json")).unwrap()
    }

    #[test]
    fn generated_tables_match_checked_in_file() {
        let rendered = generate(spec()).unwrap();
        let checked_in = include_str!("../../module_tape/src/props_gen.rs");
        assert_eq!(rendered, checked_in);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut s = spec();
        s.properties[1].id = s.properties[2].id;
        assert!(generate(s).is_err());
    }

    #[test]
    fn rejects_operand_props_without_index() {
        let mut s = spec();
        let p = s
            .properties
            .iter_mut()
            .find(|p| p.category == "operand")
            .unwrap();
        p.operand_index = None;
        assert!(generate(s).is_err());
    }
}

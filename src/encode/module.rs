use crate::config::{EncodeOptions, Feature};
use crate::core::custom_section::CustomSection;
use crate::core::indices::{IndexBounds, IndexSpace, ReferenceError};
use crate::core::instruction::Memarg;
use crate::core::sections::{DataMode, ElemInit, ElemMode, ExportDesc, ImportDesc, count};
use crate::core::types::{FuncType, RefType, ValType};
use crate::core::{Expr, Module, SectionKind};
use crate::decode::{MAGIC_NUMBER, VERSION};
use crate::encode::helpers::{LengthOverflowError, encode_sized};
use crate::encode::integer::{Relaxation, encode_u32};
use crate::encode::sections::*;
use crate::validate::ValidationError;
use log::{debug, trace};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    LengthOverflow(#[from] LengthOverflowError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("{construct} requires the {feature} feature")]
    MissingCapability { feature: Feature, construct: String },

    #[error("module failed validation")]
    Validation(#[from] ValidationError),

    #[error("{codes} code entries for {functions} declared functions")]
    CodeFuncEntriesLenMismatch { codes: usize, functions: usize },

    #[error("function indices can only initialize funcref segments")]
    FunctionIndicesForExternref,

    #[error("alignment exponent {0} overlaps the memory index flag")]
    AlignmentOutOfRange(u32),
}

/// Serializes `module` to the binary format.
///
/// Every index is resolved before anything is written, and every construct
/// must be allowed by `options`. Standard sections are written in physical
/// precedence order and left out when empty; custom sections go where their
/// placement puts them.
pub fn encode_module(module: &Module, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    if module.codes.len() != module.functions.len() {
        return Err(EncodeError::CodeFuncEntriesLenMismatch {
            codes: module.codes.len(),
            functions: module.functions.len(),
        });
    }
    if options.validate {
        module.validate()?;
    }
    check_references(module)?;
    for code in &module.codes {
        check_memargs(&code.body)?;
    }
    check_capabilities(module, options)?;

    let mut sections = Vec::new();
    for kind in SectionKind::STANDARD {
        let mut content = Vec::new();
        if encode_standard_section(&mut content, module, options, kind)? {
            sections.push((kind.precedence(), kind, content));
        }
    }
    for custom in &module.customs {
        let enabled = if custom.name == CustomSection::NAME_SECTION {
            options.debug_names
        } else {
            options.custom_sections
        };
        if !enabled {
            debug!("leaving out custom section {:?}", custom.name);
            continue;
        }
        let mut content = Vec::new();
        encode_custom_section(&mut content, custom)?;
        sections.push((custom.placement.precedence(), SectionKind::Custom, content));
    }
    // stable: customs keep their relative order and follow a standard
    // section of equal precedence
    sections.sort_by_key(|(precedence, ..)| *precedence);

    let mut out = MAGIC_NUMBER.to_vec();
    encode_u32(&mut out, VERSION, Relaxation::None);
    for (_, kind, content) in &sections {
        out.push(kind.id());
        encode_sized(&mut out, content)?;
        trace!("wrote {kind} section ({} bytes)", content.len());
    }
    debug!("encoded {} sections into {} bytes", sections.len(), out.len());

    Ok(out)
}

/// Writes the content of a standard section; returns `false` if the section
/// is left out.
fn encode_standard_section(
    out: &mut Vec<u8>,
    module: &Module,
    options: &EncodeOptions,
    kind: SectionKind,
) -> Result<bool, EncodeError> {
    match kind {
        SectionKind::Type if !module.types.is_empty() => encode_type_section(out, &module.types)?,
        SectionKind::Import if !module.imports.is_empty() => {
            encode_import_section(out, &module.imports)?
        }
        SectionKind::Function if !module.functions.is_empty() => {
            encode_function_section(out, &module.functions)?
        }
        SectionKind::Table if !module.tables.is_empty() => {
            encode_table_section(out, &module.tables)?
        }
        SectionKind::Memory if !module.memories.is_empty() => {
            encode_memory_section(out, &module.memories)?
        }
        SectionKind::Global if !module.globals.is_empty() => {
            encode_global_section(out, &module.globals)?
        }
        SectionKind::Export if !module.exports.is_empty() => {
            encode_export_section(out, &module.exports)?
        }
        SectionKind::Start if module.start.function.is_some() => {
            encode_start_section(out, &module.start)
        }
        SectionKind::Element if !module.elements.is_empty() => {
            encode_element_section(out, &module.elements)?
        }
        SectionKind::DataCount if options.bulk_memory && !module.datas.is_empty() => {
            encode_datacount_section(out, count(module.datas.len()))
        }
        SectionKind::Data if !module.datas.is_empty() => encode_data_section(out, &module.datas)?,
        SectionKind::Code if !module.codes.is_empty() => encode_code_section(out, &module.codes)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn check_expr_references(expr: &Expr, bounds: &IndexBounds) -> Result<(), ReferenceError> {
    expr.iter().try_for_each(|i| i.check_references(bounds))
}

/// Resolves every index the module refers to. Global initializers only see
/// the globals before them.
fn check_references(module: &Module) -> Result<(), ReferenceError> {
    let bounds = module.bounds();
    let constant = bounds.constant();

    for import in &module.imports {
        if let ImportDesc::Func(t) = import.desc {
            t.resolve(bounds.types)?;
        }
    }
    for t in &module.functions {
        t.resolve(bounds.types)?;
    }

    let imported_globals = module.imports.count(IndexSpace::Global);
    for (i, global) in module.globals.iter().enumerate() {
        let visible = IndexBounds {
            globals: imported_globals + count(i),
            ..constant
        };
        check_expr_references(&global.init, &visible)?;
    }

    for export in &module.exports {
        match export.desc {
            ExportDesc::Func(f) => f.resolve(bounds.funcs),
            ExportDesc::Table(t) => t.resolve(bounds.tables),
            ExportDesc::Mem(m) => m.resolve(bounds.memories),
            ExportDesc::Global(g) => g.resolve(bounds.globals),
        }?;
    }
    if let Some(f) = module.start.function {
        f.resolve(bounds.funcs)?;
    }

    for elem in &module.elements {
        if let ElemMode::Active { table, offset } = &elem.mode {
            table.resolve(bounds.tables)?;
            check_expr_references(offset, &constant)?;
        }
        match &elem.init {
            ElemInit::Functions(funcs) => {
                for f in funcs {
                    f.resolve(bounds.funcs)?;
                }
            }
            ElemInit::Expressions(exprs) => {
                for expr in exprs {
                    check_expr_references(expr, &constant)?;
                }
            }
        }
    }
    for data in &module.datas {
        if let DataMode::Active { memory, offset } = &data.mode {
            memory.resolve(bounds.memories)?;
            check_expr_references(offset, &constant)?;
        }
    }

    let imported_funcs = module.imports.count(IndexSpace::Func) as usize;
    for (i, (t, code)) in module.functions.iter().zip(&module.codes).enumerate() {
        let ft = module.types.resolve(*t)?;
        let locals = u64::try_from(ft.parameters.len()).unwrap_or(u64::MAX) + code.local_count();
        let body = bounds.for_body(u32::try_from(locals).unwrap_or(u32::MAX));
        check_expr_references(&code.body, &body).inspect_err(|err| {
            debug!("unresolved reference in function {}: {err}", imported_funcs + i);
        })?;
    }

    Ok(())
}

/// Alignment exponents must stay below bit 6 of the encoded field, which
/// flags an explicit memory index.
fn check_memargs(expr: &Expr) -> Result<(), EncodeError> {
    for instr in expr {
        if let Some(memarg) = instr.memarg()
            && memarg.align >= Memarg::MEMORY_FLAG
        {
            return Err(EncodeError::AlignmentOutOfRange(memarg.align));
        }
        for body in instr.bodies() {
            check_memargs(body)?;
        }
    }
    Ok(())
}

fn require(
    options: &EncodeOptions,
    feature: Feature,
    construct: impl FnOnce() -> String,
) -> Result<(), EncodeError> {
    if options.enables(feature) {
        Ok(())
    } else {
        Err(EncodeError::MissingCapability {
            feature,
            construct: construct(),
        })
    }
}

fn check_valtype(options: &EncodeOptions, t: ValType, what: &str) -> Result<(), EncodeError> {
    if t.is_ref() {
        require(options, Feature::ReferenceTypes, || format!("{t} {what}"))?;
    }
    Ok(())
}

fn check_functype(options: &EncodeOptions, ft: &FuncType) -> Result<(), EncodeError> {
    if ft.results.len() > 1 {
        require(options, Feature::MultiValue, || format!("signature {ft}"))?;
    }
    for t in ft.parameters.iter().chain(&ft.results) {
        check_valtype(options, *t, "in a signature")?;
    }
    Ok(())
}

fn check_expr(options: &EncodeOptions, expr: &Expr) -> Result<(), EncodeError> {
    for instr in expr {
        for feature in instr.required_features() {
            require(options, feature, || format!("instruction {}", instr.opcode()))?;
        }
        for body in instr.bodies() {
            check_expr(options, body)?;
        }
    }
    Ok(())
}

/// Rejects every construct that needs a feature `options` leaves disabled.
fn check_capabilities(module: &Module, options: &EncodeOptions) -> Result<(), EncodeError> {
    for ft in &module.types {
        check_functype(options, ft)?;
    }

    for import in &module.imports {
        match import.desc {
            ImportDesc::Global(g) => {
                if g.is_mutable() {
                    require(options, Feature::MutableGlobals, || {
                        format!("mutable global import {}.{}", import.module, import.name)
                    })?;
                }
                check_valtype(options, g.valtype(), "global")?;
            }
            ImportDesc::Table(t) if t.reftype == RefType::Extern => {
                check_valtype(options, ValType::ExternRef, "table")?;
            }
            _ => {}
        }
    }

    if module.table_count() > 1 {
        require(options, Feature::MultipleTables, || {
            format!("{} tables", module.table_count())
        })?;
    }
    if module.memory_count() > 1 {
        require(options, Feature::MultipleMemories, || {
            format!("{} memories", module.memory_count())
        })?;
    }
    for t in &module.tables {
        check_valtype(options, t.elem_type(), "table")?;
    }

    for global in &module.globals {
        check_valtype(options, global.r#type.valtype(), "global")?;
        check_expr(options, &global.init)?;
    }

    for export in &module.exports {
        if let ExportDesc::Global(g) = export.desc {
            if module.global_type(g)?.is_mutable() {
                require(options, Feature::MutableGlobals, || {
                    format!("mutable global export {:?}", export.name)
                })?;
            }
        }
    }

    for elem in &module.elements {
        match &elem.mode {
            ElemMode::Passive => {
                require(options, Feature::BulkMemory, || "passive element segment".into())?
            }
            ElemMode::Declarative => require(options, Feature::ReferenceTypes, || {
                "declarative element segment".into()
            })?,
            ElemMode::Active { offset, .. } => check_expr(options, offset)?,
        }
        check_valtype(options, elem.r#type.into(), "element segment")?;
        if let ElemInit::Expressions(exprs) = &elem.init {
            require(options, Feature::ReferenceTypes, || {
                "element segment with expressions".into()
            })?;
            for expr in exprs {
                check_expr(options, expr)?;
            }
        }
    }

    for data in &module.datas {
        match &data.mode {
            DataMode::Passive => {
                require(options, Feature::BulkMemory, || "passive data segment".into())?
            }
            DataMode::Active { memory, offset } => {
                if memory.0 != 0 {
                    require(options, Feature::MultipleMemories, || {
                        format!("data segment for memory {memory}")
                    })?;
                }
                check_expr(options, offset)?;
            }
        }
    }

    for code in &module.codes {
        for local in &code.locals {
            check_valtype(options, local.t, "local")?;
        }
        check_expr(options, &code.body)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indices::{DataIdx, FuncIdx, GlobalIdx, LocalIdx, MemIdx};
    use crate::core::instruction::{BlockType, Instruction};
    use crate::core::sections::Data;
    use crate::core::types::{GlobalType, Limits, MemType, Mut};
    use crate::core::{CustomSection, Placement};
    use crate::decode::decode_module;
    use pretty_assertions::assert_eq;

    fn ids(bytes: &[u8]) -> Vec<u8> {
        // walks the section framing of an encoded module
        let mut ids = Vec::new();
        let mut rest = &bytes[8..];
        while let Some((&id, tail)) = rest.split_first() {
            let mut size = 0usize;
            let mut shift = 0;
            let mut read = 0;
            for &b in tail {
                size |= usize::from(b & 0x7F) << shift;
                shift += 7;
                read += 1;
                if b & 0x80 == 0 {
                    break;
                }
            }
            ids.push(id);
            rest = &tail[read + size..];
        }
        ids
    }

    #[test]
    fn empty_module_is_just_the_preamble() {
        let bytes = encode_module(&Module::new(), &EncodeOptions::default()).unwrap();
        assert_eq!(bytes, [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn sections_follow_physical_precedence() {
        let mut module = Module::new();
        let t = module.add_type(&FuncType::default());
        module.add_memory(MemType {
            limits: Limits::at_least(1),
        });
        module
            .add_function(
                t,
                vec![],
                vec![Instruction::DataDrop(DataIdx(0))],
            )
            .unwrap();
        module.add_data(Data {
            init: vec![1, 2],
            mode: DataMode::Passive,
        });
        module.add_custom(CustomSection::raw("first", vec![0u8]).with_placement(
            Placement::Before(SectionKind::Type),
        ));
        module.add_custom(
            CustomSection::raw("mem", vec![1u8]).with_placement(Placement::Like(SectionKind::Memory)),
        );

        let bytes = encode_module(&module, &EncodeOptions::default()).unwrap();
        // custom, type, function, memory, custom, datacount, data, code
        assert_eq!(ids(&bytes), [0, 1, 3, 5, 0, 12, 11, 10]);

        let decoded = decode_module(bytes.as_slice()).unwrap();
        assert_eq!(decoded.functions, module.functions);
        assert_eq!(decoded.datas, module.datas);
        assert_eq!(decoded.codes, module.codes);
    }

    #[test]
    fn disabled_features_are_rejected() {
        let mut module = Module::new();
        let g = module.add_global(
            GlobalType(Mut::Var, ValType::I32),
            vec![Instruction::I32Const(0)],
        );
        module
            .add_export("counter", ExportDesc::Global(g))
            .unwrap();

        encode_module(&module, &EncodeOptions::default()).unwrap();
        match encode_module(&module, &EncodeOptions::mvp()).unwrap_err() {
            EncodeError::MissingCapability { feature, construct } => {
                assert_eq!(feature, Feature::MutableGlobals);
                assert_eq!(construct, "mutable global export \"counter\"");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut module = Module::new();
        let t = module.add_type(&FuncType::new([ValType::I32], [ValType::I32]));
        module
            .add_function(
                t,
                vec![],
                vec![
                    Instruction::LocalGet(LocalIdx(0)),
                    Instruction::I32Extend8S,
                ],
            )
            .unwrap();
        assert!(matches!(
            encode_module(&module, &EncodeOptions::mvp()),
            Err(EncodeError::MissingCapability {
                feature: Feature::SignExtension,
                ..
            })
        ));
        encode_module(
            &module,
            &EncodeOptions::mvp().with(Feature::SignExtension, true),
        )
        .unwrap();
    }

    #[test]
    fn unresolved_references_fail_even_without_validation() {
        let mut module = Module::new();
        let t = module.add_type(&FuncType::default());
        module
            .add_function(t, vec![], vec![Instruction::Call(FuncIdx(5))])
            .unwrap();
        let options = EncodeOptions {
            validate: false,
            ..EncodeOptions::default()
        };
        match encode_module(&module, &options).unwrap_err() {
            EncodeError::Reference(err) => {
                assert_eq!(err.space, IndexSpace::Func);
                assert_eq!(err.index, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut module = Module::new();
        module.add_global(
            GlobalType(Mut::Const, ValType::I32),
            vec![Instruction::GlobalGet(GlobalIdx(0))],
        );
        assert!(matches!(
            encode_module(&module, &options),
            Err(EncodeError::Reference(_))
        ));
    }

    #[test]
    fn validation_runs_when_enabled() {
        let mut module = Module::new();
        let t = module.add_type(&FuncType::new([], [ValType::I32]));
        module.add_function(t, vec![], vec![]).unwrap();
        assert!(matches!(
            encode_module(&module, &EncodeOptions::default()),
            Err(EncodeError::Validation(_))
        ));
        let options = EncodeOptions {
            validate: false,
            ..EncodeOptions::default()
        };
        encode_module(&module, &options).unwrap();
    }

    #[test]
    fn alignment_stays_clear_of_the_memory_flag() {
        let load = |align| {
            Instruction::I32Load(Memarg {
                align,
                offset: 5,
                memory: MemIdx(0),
            })
        };
        let module_with = |align| {
            let mut module = Module::new();
            module.add_memory(MemType {
                limits: Limits::at_least(1),
            });
            let t = module.add_type(&FuncType::default());
            module
                .add_function(
                    t,
                    vec![],
                    vec![Instruction::Block(
                        BlockType::Empty,
                        vec![Instruction::I32Const(0), load(align), Instruction::Drop],
                    )],
                )
                .unwrap();
            module
        };
        let options = EncodeOptions {
            validate: false,
            ..EncodeOptions::default()
        };

        match encode_module(&module_with(64), &options).unwrap_err() {
            EncodeError::AlignmentOutOfRange(align) => assert_eq!(align, 64),
            other => panic!("unexpected error: {other:?}"),
        }

        let module = module_with(63);
        let bytes = encode_module(&module, &options).unwrap();
        assert_eq!(decode_module(bytes.as_slice()).unwrap(), module);
    }

    #[test]
    fn custom_sections_can_be_left_out() {
        let mut module = Module::new();
        module.add_custom(CustomSection::raw("producers", vec![0u8]));
        module.add_custom(CustomSection::names(Default::default()));
        module.add_memory(MemType {
            limits: Limits::at_least(0),
        });

        let all = encode_module(&module, &EncodeOptions::default()).unwrap();
        assert_eq!(ids(&all), [5, 0, 0]);

        let options = EncodeOptions {
            custom_sections: false,
            ..EncodeOptions::default()
        };
        let decoded = decode_module(encode_module(&module, &options).unwrap().as_slice()).unwrap();
        assert_eq!(decoded.customs.len(), 1);
        assert!(decoded.customs[0].is_debug_names());

        let options = EncodeOptions {
            debug_names: false,
            ..EncodeOptions::default()
        };
        let decoded = decode_module(encode_module(&module, &options).unwrap().as_slice()).unwrap();
        assert_eq!(decoded.customs.len(), 1);
        assert_eq!(decoded.customs[0].name, "producers");
    }
}

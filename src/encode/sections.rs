//! Content encoders for each section. Framing (id and size) is done by the
//! module encoder.
use crate::core::custom_section::{CustomContent, CustomSection, NameSection};
use crate::core::indices::TableIdx;
use crate::core::sections::*;
use crate::core::types::RefType;
use crate::encode::EncodeError;
use crate::encode::helpers::{
    LengthOverflowError, encode_byte_vector, encode_name, encode_sized, encode_vector,
};
use crate::encode::instructions::encode_expr;
use crate::encode::integer::{Relaxation, encode_u32};

fn index(out: &mut Vec<u8>, idx: u32) {
    encode_u32(out, idx, Relaxation::Canonical);
}

pub(crate) fn encode_type_section(
    out: &mut Vec<u8>,
    types: &TypeSection,
) -> Result<(), EncodeError> {
    Ok(encode_vector(out, types.entries(), |out, ft| ft.encode(out))?)
}

pub(crate) fn encode_import_section(
    out: &mut Vec<u8>,
    imports: &ImportSection,
) -> Result<(), EncodeError> {
    encode_vector(out, imports.entries(), |out, import| {
        encode_name(out, &import.module)?;
        encode_name(out, &import.name)?;
        match &import.desc {
            ImportDesc::Func(t) => {
                out.push(0x00);
                index(out, t.0);
            }
            ImportDesc::Table(t) => {
                out.push(0x01);
                t.encode(out);
            }
            ImportDesc::Mem(m) => {
                out.push(0x02);
                m.encode(out);
            }
            ImportDesc::Global(g) => {
                out.push(0x03);
                g.encode(out);
            }
        }
        Ok::<_, EncodeError>(())
    })
}

pub(crate) fn encode_function_section(
    out: &mut Vec<u8>,
    functions: &FunctionSection,
) -> Result<(), EncodeError> {
    encode_vector(out, functions.entries(), |out, t| {
        index(out, t.0);
        Ok::<_, EncodeError>(())
    })
}

pub(crate) fn encode_table_section(
    out: &mut Vec<u8>,
    tables: &TableSection,
) -> Result<(), EncodeError> {
    encode_vector(out, tables.entries(), |out, t| {
        t.encode(out);
        Ok::<_, EncodeError>(())
    })
}

pub(crate) fn encode_memory_section(
    out: &mut Vec<u8>,
    memories: &MemorySection,
) -> Result<(), EncodeError> {
    encode_vector(out, memories.entries(), |out, m| {
        m.encode(out);
        Ok::<_, EncodeError>(())
    })
}

pub(crate) fn encode_global_section(
    out: &mut Vec<u8>,
    globals: &GlobalSection,
) -> Result<(), EncodeError> {
    encode_vector(out, globals.entries(), |out, global| {
        global.r#type.encode(out);
        Ok::<_, EncodeError>(encode_expr(out, &global.init)?)
    })
}

pub(crate) fn encode_export_section(
    out: &mut Vec<u8>,
    exports: &ExportSection,
) -> Result<(), EncodeError> {
    encode_vector(out, exports.entries(), |out, export| {
        encode_name(out, &export.name)?;
        let (kind, idx) = match export.desc {
            ExportDesc::Func(f) => (0x00, f.0),
            ExportDesc::Table(t) => (0x01, t.0),
            ExportDesc::Mem(m) => (0x02, m.0),
            ExportDesc::Global(g) => (0x03, g.0),
        };
        out.push(kind);
        index(out, idx);
        Ok::<_, EncodeError>(())
    })
}

pub(crate) fn encode_start_section(out: &mut Vec<u8>, start: &StartSection) {
    if let Some(f) = start.function {
        index(out, f.0);
    }
}

// Mirrors the bitfield read by the Element section decoder.
const PASSIVE_OR_DECLARATIVE: u32 = 0b001;
const EXPLICIT_TABLE_OR_DECLARATIVE: u32 = 0b010;
const EXPRESSIONS: u32 = 0b100;

/// The most compact encoding flags able to express `elem`.
fn elem_flags(elem: &Elem) -> u32 {
    let expressions = match elem.init {
        ElemInit::Functions(_) => 0,
        ElemInit::Expressions(_) => EXPRESSIONS,
    };
    let mode = match &elem.mode {
        ElemMode::Active { table, .. } if *table == TableIdx(0) && elem.r#type == RefType::Func => {
            0
        }
        ElemMode::Active { .. } => EXPLICIT_TABLE_OR_DECLARATIVE,
        ElemMode::Passive => PASSIVE_OR_DECLARATIVE,
        ElemMode::Declarative => PASSIVE_OR_DECLARATIVE | EXPLICIT_TABLE_OR_DECLARATIVE,
    };
    mode | expressions
}

pub(crate) fn encode_element_section(
    out: &mut Vec<u8>,
    elements: &ElementSection,
) -> Result<(), EncodeError> {
    encode_vector(out, elements.entries(), |out, elem| {
        if matches!(elem.init, ElemInit::Functions(_)) && elem.r#type != RefType::Func {
            return Err(EncodeError::FunctionIndicesForExternref);
        }

        let flags = elem_flags(elem);
        index(out, flags);

        if let ElemMode::Active { table, offset } = &elem.mode {
            if flags & EXPLICIT_TABLE_OR_DECLARATIVE != 0 {
                index(out, table.0);
            }
            encode_expr(out, offset)?;
        }

        let implicit_type = flags & !EXPRESSIONS == 0;
        match &elem.init {
            ElemInit::Functions(funcs) => {
                if !implicit_type {
                    // elemkind: funcref
                    out.push(0x00);
                }
                encode_vector(out, funcs, |out, f| {
                    index(out, f.0);
                    Ok::<_, LengthOverflowError>(())
                })?;
            }
            ElemInit::Expressions(exprs) => {
                if !implicit_type {
                    elem.r#type.encode(out);
                }
                encode_vector(out, exprs, |out, expr| encode_expr(out, expr))?;
            }
        }
        Ok(())
    })
}

pub(crate) fn encode_datacount_section(out: &mut Vec<u8>, count: u32) {
    encode_u32(out, count, Relaxation::Canonical);
}

pub(crate) fn encode_data_section(
    out: &mut Vec<u8>,
    datas: &DataSection,
) -> Result<(), EncodeError> {
    encode_vector(out, datas.entries(), |out, data| {
        match &data.mode {
            DataMode::Active { memory, offset } if memory.0 == 0 => {
                index(out, 0);
                encode_expr(out, offset)?;
            }
            DataMode::Active { memory, offset } => {
                index(out, 2);
                index(out, memory.0);
                encode_expr(out, offset)?;
            }
            DataMode::Passive => index(out, 1),
        }
        Ok::<_, EncodeError>(encode_byte_vector(out, &data.init)?)
    })
}

pub(crate) fn encode_code_section(
    out: &mut Vec<u8>,
    codes: &CodeSection,
) -> Result<(), EncodeError> {
    encode_vector(out, codes.entries(), |out, code| {
        let mut entry = Vec::new();
        encode_vector(&mut entry, &code.locals, |out, local| {
            encode_u32(out, local.count, Relaxation::Canonical);
            local.t.encode(out);
            Ok::<_, LengthOverflowError>(())
        })?;
        encode_expr(&mut entry, &code.body)?;
        Ok::<_, EncodeError>(encode_sized(out, &entry)?)
    })
}

fn encode_name_section(out: &mut Vec<u8>, names: &NameSection) -> Result<(), LengthOverflowError> {
    let subsection = |out: &mut Vec<u8>, id: u8, content: &[u8]| {
        out.push(id);
        encode_sized(out, content)
    };

    if let Some(module) = &names.module {
        let mut content = Vec::new();
        encode_name(&mut content, module)?;
        subsection(out, NameSection::MODULE_SUBSECTION, &content)?;
    }

    if !names.functions.is_empty() {
        let mut content = Vec::new();
        encode_vector(&mut content, &names.functions, |out, (idx, name)| {
            index(out, idx.0);
            encode_name(out, name)
        })?;
        subsection(out, NameSection::FUNCTION_SUBSECTION, &content)?;
    }

    if !names.locals.is_empty() {
        let mut content = Vec::new();
        encode_vector(&mut content, &names.locals, |out, (func, locals)| {
            index(out, func.0);
            encode_vector(out, locals, |out, (idx, name)| {
                index(out, idx.0);
                encode_name(out, name)
            })
        })?;
        subsection(out, NameSection::LOCAL_SUBSECTION, &content)?;
    }

    for (id, content) in &names.unknown {
        subsection(out, *id, content)?;
    }

    Ok(())
}

/// Writes the name and content of a custom section.
pub(crate) fn encode_custom_section(
    out: &mut Vec<u8>,
    custom: &CustomSection,
) -> Result<(), EncodeError> {
    encode_name(out, &custom.name)?;
    match &custom.content {
        CustomContent::Names(names) => encode_name_section(out, names)?,
        CustomContent::Raw(bytes) => out.extend_from_slice(bytes),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indices::{FuncIdx, IndexBounds, LocalIdx, MemIdx};
    use crate::core::instruction::Instruction;
    use crate::core::types::ValType;
    use crate::decode::sections::{decode_element_section, decode_name_section};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn elem(r#type: RefType, init: ElemInit, mode: ElemMode) -> Elem {
        Elem { r#type, init, mode }
    }

    fn active(table: u32) -> ElemMode {
        ElemMode::Active {
            table: TableIdx(table),
            offset: vec![Instruction::I32Const(0)],
        }
    }

    #[test]
    fn element_flags_pick_the_compact_form() {
        let funcs = || ElemInit::Functions(vec![FuncIdx(0)]);
        let exprs = || ElemInit::Expressions(vec![vec![Instruction::RefNull(RefType::Extern)]]);

        let cases = [
            (elem(RefType::Func, funcs(), active(0)), 0),
            (elem(RefType::Func, funcs(), ElemMode::Passive), 1),
            (elem(RefType::Func, funcs(), active(1)), 2),
            (elem(RefType::Func, funcs(), ElemMode::Declarative), 3),
            (elem(RefType::Func, exprs(), active(0)), 4),
            (elem(RefType::Extern, exprs(), ElemMode::Passive), 5),
            (elem(RefType::Extern, exprs(), active(0)), 6),
            (elem(RefType::Extern, exprs(), ElemMode::Declarative), 7),
        ];
        for (elem, flags) in cases {
            assert_eq!(elem_flags(&elem), flags, "{elem:?}");
        }
    }

    #[test]
    fn elements_decode_back() {
        let mut elements = ElementSection::default();
        elements.push(elem(
            RefType::Func,
            ElemInit::Functions(vec![FuncIdx(1), FuncIdx(0)]),
            active(1),
        ));
        elements.push(elem(
            RefType::Extern,
            ElemInit::Expressions(vec![vec![Instruction::RefNull(RefType::Extern)]]),
            ElemMode::Declarative,
        ));

        let mut out = Vec::new();
        encode_element_section(&mut out, &elements).unwrap();

        let bounds = IndexBounds {
            funcs: 2,
            tables: 2,
            ..Default::default()
        };
        assert_eq!(
            decode_element_section(&mut Cursor::new(out), &bounds).unwrap(),
            elements
        );
    }

    #[test]
    fn function_indices_require_funcref() {
        let mut elements = ElementSection::default();
        elements.push(elem(
            RefType::Extern,
            ElemInit::Functions(vec![]),
            ElemMode::Passive,
        ));
        assert!(matches!(
            encode_element_section(&mut Vec::new(), &elements),
            Err(EncodeError::FunctionIndicesForExternref)
        ));
    }

    #[test]
    fn data_segments_write_memory_only_when_nonzero() {
        let mut datas = DataSection::default();
        datas.push(Data {
            init: vec![0xAA],
            mode: DataMode::Active {
                memory: MemIdx(0),
                offset: vec![Instruction::I32Const(8)],
            },
        });
        datas.push(Data {
            init: vec![],
            mode: DataMode::Active {
                memory: MemIdx(1),
                offset: vec![Instruction::I32Const(0)],
            },
        });
        datas.push(Data {
            init: vec![0xBB],
            mode: DataMode::Passive,
        });

        let mut out = Vec::new();
        encode_data_section(&mut out, &datas).unwrap();
        assert_eq!(
            out,
            [
                0x03, // three segments
                0x00, 0x41, 0x08, 0x0B, 0x01, 0xAA, // active, memory 0
                0x02, 0x01, 0x41, 0x00, 0x0B, 0x00, // active, memory 1
                0x01, 0x01, 0xBB, // passive
            ]
        );
    }

    #[test]
    fn code_entries_are_size_prefixed() {
        let mut codes = CodeSection::default();
        codes.push(Code {
            locals: vec![Local {
                count: 2,
                t: ValType::I64,
            }],
            body: vec![Instruction::Nop],
        });

        let mut out = Vec::new();
        encode_code_section(&mut out, &codes).unwrap();
        assert_eq!(out, [0x01, 0x05, 0x01, 0x02, 0x7E, 0x01, 0x0B]);
    }

    #[test]
    fn name_section_writes_known_subsections_in_order() {
        let names = NameSection {
            module: Some("m".into()),
            functions: vec![(FuncIdx(0), "f".into())],
            locals: vec![(FuncIdx(0), vec![(LocalIdx(1), "x".into())])],
            unknown: vec![(7, vec![0x00])],
        };

        let mut out = Vec::new();
        encode_name_section(&mut out, &names).unwrap();
        assert_eq!(
            out,
            [
                0x00, 0x02, 0x01, b'm', // module
                0x01, 0x04, 0x01, 0x00, 0x01, b'f', // functions
                0x02, 0x06, 0x01, 0x00, 0x01, 0x01, 0x01, b'x', // locals
                0x07, 0x01, 0x00, // unknown
            ]
        );
        assert_eq!(decode_name_section(&out).unwrap(), names);
    }
}

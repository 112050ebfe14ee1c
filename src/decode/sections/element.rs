use crate::core::indices::{FuncIdx, IndexBounds, TableIdx};
use crate::core::sections::{Elem, ElemInit, ElemMode, ElementSection};
use crate::core::types::RefType;
use crate::decode::helpers::{DecodeVectorError, ParseExpressionError};
use crate::decode::helpers::{decode_expr, decode_vector};
use crate::decode::indices::{DecodeFuncIdxError, DecodeTableIdxError};
use crate::decode::integer::{DecodeU32Error, decode_u32};
use crate::decode::read_byte;
use crate::decode::types::DecodeRefTypeError;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeElementSectionError {
    #[error("failed decoding Element section")]
    DecodeVector(#[from] DecodeVectorError<DecodeElementError>),
}

pub(crate) fn decode_element_section<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<ElementSection, DecodeElementSectionError> {
    let bounds = bounds.constant();
    let mut elements = ElementSection::default();
    for elem in decode_vector(reader, |r| parse_elem(r, &bounds))? {
        elements.push(elem);
    }
    Ok(elements)
}

#[derive(Debug, Error)]
pub enum DecodeElementError {
    #[error("failed decoding bitfield")]
    DecodeBitfield(DecodeU32Error),

    #[error("invalid bitfield: expected value in range [0,7]; got {0}")]
    InvalidBitfield(u32),

    #[error("failed decoding offset expression")]
    DecodeOffsetExpression(ParseExpressionError),

    #[error("failed decoding Element kind")]
    DecodeElementKind(#[from] DecodeElementKindError),

    #[error(transparent)]
    DecodeTableIdx(#[from] DecodeTableIdxError),

    #[error(transparent)]
    DecodeReferenceType(#[from] DecodeRefTypeError),

    #[error("failed decoding Element expressions")]
    DecodeInit(DecodeVectorError<ParseExpressionError>),

    #[error(transparent)]
    DecodeFuncIdxVector(#[from] DecodeVectorError<DecodeFuncIdxError>),
}

// The flags form a bitfield: bit 0 marks a passive or declarative segment,
// bit 1 an explicit table index (active) or a declarative segment (otherwise),
// and bit 2 element expressions instead of function indices.
const PASSIVE_OR_DECLARATIVE: u32 = 0b001;
const EXPLICIT_TABLE_OR_DECLARATIVE: u32 = 0b010;
const EXPRESSIONS: u32 = 0b100;

fn parse_elem<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<Elem, DecodeElementError> {
    let bitfield = decode_u32(reader).map_err(DecodeElementError::DecodeBitfield)?;
    if bitfield > 7 {
        return Err(DecodeElementError::InvalidBitfield(bitfield));
    }

    let mode = if bitfield & PASSIVE_OR_DECLARATIVE == 0 {
        let table = if bitfield & EXPLICIT_TABLE_OR_DECLARATIVE != 0 {
            TableIdx::decode_within(reader, bounds.tables)?
        } else {
            let table = TableIdx(0);
            table
                .resolve(bounds.tables)
                .map_err(DecodeTableIdxError::from)?;
            table
        };
        let offset =
            decode_expr(reader, bounds).map_err(DecodeElementError::DecodeOffsetExpression)?;
        ElemMode::Active { table, offset }
    } else if bitfield & EXPLICIT_TABLE_OR_DECLARATIVE != 0 {
        ElemMode::Declarative
    } else {
        ElemMode::Passive
    };

    // flags 0 and 4 leave the element type implicit
    let implicit_type = bitfield & !EXPRESSIONS == 0;

    let (r#type, init) = if bitfield & EXPRESSIONS == 0 {
        let r#type = if implicit_type {
            RefType::Func
        } else {
            parse_elemkind(reader)?
        };
        let funcs = decode_vector(reader, |r| FuncIdx::decode_within(r, bounds.funcs))?;
        (r#type, ElemInit::Functions(funcs))
    } else {
        let r#type = if implicit_type {
            RefType::Func
        } else {
            RefType::decode(reader)?
        };
        let exprs = decode_vector(reader, |r| decode_expr(r, bounds))
            .map_err(DecodeElementError::DecodeInit)?;
        (r#type, ElemInit::Expressions(exprs))
    };

    Ok(Elem { r#type, init, mode })
}

#[derive(Debug, Error)]
pub enum DecodeElementKindError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("expected byte 0x00; got {0:#04X}")]
    InvalidElemKind(u8),
}

fn parse_elemkind<R: Read + ?Sized>(reader: &mut R) -> Result<RefType, DecodeElementKindError> {
    // the function-index encodings spell `funcref` as 0x00
    let b = read_byte(reader)?;
    if b != 0x00 {
        return Err(DecodeElementKindError::InvalidElemKind(b));
    }

    Ok(RefType::Func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instruction::Instruction;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn bounds() -> IndexBounds {
        IndexBounds {
            funcs: 2,
            tables: 2,
            ..Default::default()
        }
    }

    fn parse(bytes: &[u8]) -> Result<Elem, DecodeElementError> {
        parse_elem(&mut Cursor::new(bytes), &bounds())
    }

    #[test]
    fn function_index_forms() {
        let offset = vec![Instruction::I32Const(0)];

        assert_eq!(
            parse(&[0x00, 0x41, 0x00, 0x0B, 0x01, 0x01]).unwrap(),
            Elem {
                r#type: RefType::Func,
                init: ElemInit::Functions(vec![FuncIdx(1)]),
                mode: ElemMode::Active {
                    table: TableIdx(0),
                    offset: offset.clone()
                },
            }
        );
        assert_eq!(
            parse(&[0x01, 0x00, 0x00]).unwrap().mode,
            ElemMode::Passive
        );
        assert_eq!(
            parse(&[0x02, 0x01, 0x41, 0x00, 0x0B, 0x00, 0x00]).unwrap().mode,
            ElemMode::Active {
                table: TableIdx(1),
                offset
            }
        );
        assert_eq!(
            parse(&[0x03, 0x00, 0x01, 0x00]).unwrap().mode,
            ElemMode::Declarative
        );
    }

    #[test]
    fn expression_forms() {
        let elem = parse(&[0x05, 0x6F, 0x01, 0xD0, 0x6F, 0x0B]).unwrap();
        assert_eq!(
            elem,
            Elem {
                r#type: RefType::Extern,
                init: ElemInit::Expressions(vec![vec![Instruction::RefNull(RefType::Extern)]]),
                mode: ElemMode::Passive,
            }
        );

        let elem = parse(&[0x04, 0x41, 0x00, 0x0B, 0x01, 0xD2, 0x00, 0x0B]).unwrap();
        assert_eq!(elem.r#type, RefType::Func);
        assert_eq!(
            elem.init,
            ElemInit::Expressions(vec![vec![Instruction::RefFunc(FuncIdx(0))]])
        );

        assert_eq!(
            parse(&[0x07, 0x70, 0x00]).unwrap().mode,
            ElemMode::Declarative
        );
    }

    #[test]
    fn rejects_unknown_flags_and_elem_kinds() {
        assert!(matches!(
            parse(&[0x08]),
            Err(DecodeElementError::InvalidBitfield(8))
        ));
        assert!(matches!(
            parse(&[0x01, 0x70, 0x00]),
            Err(DecodeElementError::DecodeElementKind(
                DecodeElementKindError::InvalidElemKind(0x70)
            ))
        ));
    }
}

//! WebAssembly instruction decoding.
//!
//! Defined in <https://www.w3.org/TR/wasm-core-2/#instructions>
use crate::core::indices::*;
use crate::core::instruction::{
    ATOMIC_PREFIX, BlockType, ELSE, END, Instruction, MISC_PREFIX, Memarg, Opcode,
};
use crate::core::types::{RefType, ValType};
use crate::decode::helpers::{DecodeFloat32Error, DecodeFloat64Error, DecodeVectorError};
use crate::decode::helpers::{decode_f32, decode_f64, decode_vector};
use crate::decode::indices::*;
use crate::decode::integer::{
    DecodeI32Error, DecodeI64Error, DecodeS33Error, DecodeU32Error, decode_i32, decode_i64,
    decode_s33, decode_u32,
};
use crate::decode::read_byte;
use crate::decode::registry;
use crate::decode::types::{DecodeRefTypeError, DecodeValTypeError};
use std::io::{self, Cursor, Read};
use thiserror::Error;

/// Structured instructions nested deeper than this are rejected.
pub const MAX_NESTING: u32 = 1024;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed reading instruction opcode")]
    ReadOpcode(#[from] io::Error),

    #[error("unexpected opcode: {0:#04X}")]
    InvalidOpcode(u8),

    #[error("failed reading opcode after {prefix:#04X} prefix")]
    ReadExtensionOpcode {
        prefix: u8,
        #[source]
        source: DecodeU32Error,
    },

    #[error("unexpected opcode after {prefix:#04X} prefix: {code}")]
    InvalidExtensionOpcode { prefix: u8, code: u32 },

    #[error("failed decoding control instruction")]
    Control(#[from] ControlError),

    #[error("failed decoding reference instruction")]
    Reference(#[from] DecodeRefTypeError),

    #[error("failed decoding parametric instruction")]
    Parametric(#[from] ParametricError),

    #[error("failed decoding variable instruction")]
    Variable(#[from] VariableError),

    #[error("failed decoding table instruction")]
    Table(#[from] TableError),

    #[error("failed decoding memory instruction")]
    Memory(#[from] MemoryError),

    #[error("failed decoding numeric instruction")]
    Numeric(#[from] NumericError),

    #[error(transparent)]
    Unresolved(#[from] ReferenceError),
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("failed decoding label index")]
    LabelIdx(#[from] DecodeLabelIdxError),

    #[error("failed decoding label index vector")]
    DecodeLabelIdxVector(#[from] DecodeVectorError<DecodeLabelIdxError>),

    #[error("failed decoding function index")]
    FuncIdx(DecodeFuncIdxError),

    #[error("failed decoding table index")]
    TableIdx(DecodeTableIdxError),

    #[error("failed decoding type index")]
    TypeIdx(DecodeTypeIdxError),

    #[error("failed decoding block type")]
    BlockType(#[from] BlockTypeError),

    #[error("unexpected `Else` token")]
    UnexpectedElse,

    #[error("structured instructions nested deeper than {MAX_NESTING}")]
    NestingTooDeep,
}

#[derive(Debug, Error)]
pub enum ParametricError {
    #[error("failed decoding value type vector")]
    DecodeVector(#[from] DecodeVectorError<DecodeValTypeError>),

    #[error("typed select expects exactly one value type; got {0}")]
    InvalidArity(usize),
}

#[derive(Debug, Error)]
pub enum VariableError {
    #[error("failed decoding Local index")]
    LocalIdx(#[from] DecodeLocalIdxError),

    #[error("failed decoding Global index")]
    GlobalIdx(#[from] DecodeGlobalIdxError),
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed decoding table index")]
    TableIdx(#[from] DecodeTableIdxError),

    #[error("failed decoding element index")]
    ElemIdx(#[from] DecodeElemIdxError),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed decoding Memarg")]
    DecodeMemarg(#[from] MemargError),

    #[error("failed decoding data index")]
    DecodeDataIdx(#[from] DecodeDataIdxError),

    #[error("failed decoding memory index")]
    DecodeMemIdx(#[from] DecodeMemIdxError),

    #[error("failed reading atomic.fence flags")]
    ReadFenceFlags(io::Error),

    #[error("unexpected atomic.fence flags: expected 0x00; got {0:#04X}")]
    InvalidFenceFlags(u8),
}

#[derive(Debug, Error)]
pub enum NumericError {
    #[error(transparent)]
    DecodeI32(#[from] DecodeI32Error),

    #[error(transparent)]
    DecodeI64(#[from] DecodeI64Error),

    #[error(transparent)]
    DecodeF32(#[from] DecodeFloat32Error),

    #[error(transparent)]
    DecodeF64(#[from] DecodeFloat64Error),
}

pub(crate) enum ParseResult {
    Instruction(Instruction),
    Else,
    End,
}

impl Instruction {
    /// Parses one instruction, or one of the `end`/`else` delimiters. Every
    /// index the instruction refers to must resolve within `bounds`.
    pub(crate) fn parse<R: Read + ?Sized>(
        reader: &mut R,
        bounds: &IndexBounds,
    ) -> Result<ParseResult, ParseError> {
        let opcode = match read_byte(reader)? {
            END => return Ok(ParseResult::End),
            ELSE => return Ok(ParseResult::Else),
            prefix @ (MISC_PREFIX | ATOMIC_PREFIX) => {
                let code = decode_u32(reader)
                    .map_err(|source| ParseError::ReadExtensionOpcode { prefix, source })?;
                if prefix == MISC_PREFIX {
                    Opcode::Misc(code)
                } else {
                    Opcode::Atomic(code)
                }
            }
            op => Opcode::Primary(op),
        };

        let prototype = registry::prototype(opcode).ok_or(match opcode {
            Opcode::Primary(op) => ParseError::InvalidOpcode(op),
            Opcode::Misc(code) => ParseError::InvalidExtensionOpcode {
                prefix: MISC_PREFIX,
                code,
            },
            Opcode::Atomic(code) => ParseError::InvalidExtensionOpcode {
                prefix: ATOMIC_PREFIX,
                code,
            },
        })?;

        let mut ins = prototype.clone();
        read_immediates(&mut ins, reader, bounds)?;
        ins.check_own_references(bounds)?;

        Ok(ParseResult::Instruction(ins))
    }
}

fn read_immediates<R: Read + ?Sized>(
    ins: &mut Instruction,
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<(), ParseError> {
    if let Some(memarg) = ins.memarg_mut() {
        *memarg = Memarg::decode(reader).map_err(MemoryError::DecodeMemarg)?;
        return Ok(());
    }

    match ins {
        // --- Control instructions ---
        Instruction::Block(bt, body) | Instruction::Loop(bt, body) => {
            *bt = BlockType::decode(reader).map_err(ControlError::BlockType)?;
            let (parsed, end) = parse_body(reader, &nested(bounds)?)?;
            if let ParseResult::Else = end {
                return Err(ControlError::UnexpectedElse.into());
            }
            *body = parsed;
        }
        Instruction::If(bt, then, els) => {
            *bt = BlockType::decode(reader).map_err(ControlError::BlockType)?;
            let inner = nested(bounds)?;
            let (parsed, end) = parse_body(reader, &inner)?;
            *then = parsed;
            if let ParseResult::Else = end {
                let (parsed, end) = parse_body(reader, &inner)?;
                if let ParseResult::Else = end {
                    return Err(ControlError::UnexpectedElse.into());
                }
                *els = Some(parsed);
            }
        }
        Instruction::Br(l) | Instruction::BrIf(l) => {
            *l = LabelIdx::decode(reader).map_err(ControlError::LabelIdx)?;
        }
        Instruction::BrTable(ls, l) => {
            *ls = decode_vector(reader, LabelIdx::decode)
                .map_err(ControlError::DecodeLabelIdxVector)?;
            *l = LabelIdx::decode(reader).map_err(ControlError::LabelIdx)?;
        }
        Instruction::Call(f) => *f = FuncIdx::decode(reader).map_err(ControlError::FuncIdx)?,
        Instruction::CallIndirect(t, table) => {
            *t = TypeIdx::decode(reader).map_err(ControlError::TypeIdx)?;
            *table = TableIdx::decode(reader).map_err(ControlError::TableIdx)?;
        }

        // --- Reference instructions ---
        Instruction::RefNull(t) => *t = RefType::decode(reader)?,
        Instruction::RefFunc(f) => *f = FuncIdx::decode(reader).map_err(ControlError::FuncIdx)?,

        // --- Parametric instructions ---
        Instruction::Select(Some(t)) => {
            let types =
                decode_vector(reader, ValType::decode).map_err(ParametricError::DecodeVector)?;
            match types.as_slice() {
                [single] => *t = *single,
                _ => return Err(ParametricError::InvalidArity(types.len()).into()),
            }
        }

        // --- Variable instructions ---
        Instruction::LocalGet(l) | Instruction::LocalSet(l) | Instruction::LocalTee(l) => {
            *l = LocalIdx::decode(reader).map_err(VariableError::LocalIdx)?;
        }
        Instruction::GlobalGet(g) | Instruction::GlobalSet(g) => {
            *g = GlobalIdx::decode(reader).map_err(VariableError::GlobalIdx)?;
        }

        // --- Table instructions ---
        Instruction::TableGet(t)
        | Instruction::TableSet(t)
        | Instruction::TableGrow(t)
        | Instruction::TableSize(t)
        | Instruction::TableFill(t) => {
            *t = TableIdx::decode(reader).map_err(TableError::TableIdx)?;
        }
        Instruction::TableInit(t, e) => {
            // the element index comes first on the wire
            *e = ElemIdx::decode(reader).map_err(TableError::ElemIdx)?;
            *t = TableIdx::decode(reader).map_err(TableError::TableIdx)?;
        }
        Instruction::ElemDrop(e) => *e = ElemIdx::decode(reader).map_err(TableError::ElemIdx)?,
        Instruction::TableCopy(dst, src) => {
            *dst = TableIdx::decode(reader).map_err(TableError::TableIdx)?;
            *src = TableIdx::decode(reader).map_err(TableError::TableIdx)?;
        }

        // --- Memory instructions ---
        Instruction::MemorySize(m) | Instruction::MemoryGrow(m) | Instruction::MemoryFill(m) => {
            *m = MemIdx::decode(reader).map_err(MemoryError::DecodeMemIdx)?;
        }
        Instruction::MemoryInit(m, d) => {
            // the data index comes first on the wire
            *d = DataIdx::decode(reader).map_err(MemoryError::DecodeDataIdx)?;
            *m = MemIdx::decode(reader).map_err(MemoryError::DecodeMemIdx)?;
        }
        Instruction::DataDrop(d) => *d = DataIdx::decode(reader).map_err(MemoryError::DecodeDataIdx)?,
        Instruction::MemoryCopy(dst, src) => {
            *dst = MemIdx::decode(reader).map_err(MemoryError::DecodeMemIdx)?;
            *src = MemIdx::decode(reader).map_err(MemoryError::DecodeMemIdx)?;
        }
        Instruction::AtomicFence => {
            let flags = read_byte(reader).map_err(MemoryError::ReadFenceFlags)?;
            if flags != 0x00 {
                return Err(MemoryError::InvalidFenceFlags(flags).into());
            }
        }

        // --- Numeric constants ---
        Instruction::I32Const(v) => *v = decode_i32(reader).map_err(NumericError::DecodeI32)?,
        Instruction::I64Const(v) => *v = decode_i64(reader).map_err(NumericError::DecodeI64)?,
        Instruction::F32Const(v) => *v = decode_f32(reader).map_err(NumericError::DecodeF32)?,
        Instruction::F64Const(v) => *v = decode_f64(reader).map_err(NumericError::DecodeF64)?,

        _ => {}
    }

    Ok(())
}

fn nested(bounds: &IndexBounds) -> Result<IndexBounds, ControlError> {
    if bounds.labels >= MAX_NESTING {
        return Err(ControlError::NestingTooDeep);
    }
    Ok(bounds.nested())
}

/// Parses instructions up to the next `end` or `else`, returning which one
/// terminated the body.
fn parse_body<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<(Vec<Instruction>, ParseResult), ParseError> {
    let mut body = Vec::new();
    loop {
        match Instruction::parse(reader, bounds)? {
            ParseResult::Instruction(i) => body.push(i),
            end => return Ok((body, end)),
        }
    }
}

#[derive(Debug, Error)]
pub enum MemargError {
    #[error("Invalid alignment flag {0}; should be less than 2^7")]
    InvalidFlagsBit(u32),

    #[error("failed decoding alignment")]
    Align(DecodeU32Error),

    #[error("failed decoding offset")]
    Offset(DecodeU32Error),

    #[error("failed decoding memory index")]
    MemIdx(#[from] DecodeMemIdxError),
}

impl Memarg {
    /// Bit of the alignment field announcing an explicit memory index.
    pub(crate) const MEMORY_FLAG: u32 = 1 << 6;

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Memarg, MemargError> {
        let n = decode_u32(reader).map_err(MemargError::Align)?;

        let (memory, align) = if n < Self::MEMORY_FLAG {
            (MemIdx(0), n)
        } else if n < Self::MEMORY_FLAG << 1 {
            (MemIdx::decode(reader)?, n - Self::MEMORY_FLAG)
        } else {
            return Err(MemargError::InvalidFlagsBit(n));
        };

        let offset = decode_u32(reader).map_err(MemargError::Offset)?;

        Ok(Self {
            align,
            offset,
            memory,
        })
    }
}

#[derive(Debug, Error)]
pub enum BlockTypeError {
    #[error("failed reading block type marker byte")]
    ReadMarkerByte(io::Error),

    #[error("failed decoding block type index")]
    DecodeIndex(#[from] DecodeS33Error),

    #[error("blocktype Type index negative: {0}")]
    NegativeTypeIndex(i64),
}

impl BlockType {
    pub(crate) const EMPTY_MARKER: u8 = 0x40;

    fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, BlockTypeError> {
        let b = read_byte(reader).map_err(BlockTypeError::ReadMarkerByte)?;
        if b == Self::EMPTY_MARKER {
            return Ok(Self::Empty);
        }

        if let Ok(t) = ValType::decode(&mut Cursor::new([b])) {
            return Ok(Self::Value(t));
        }

        // The type index is a positive signed 33-bit integer, so that it
        // cannot collide with the single-byte value type and empty markers
        // (negative in signed LEB128).
        let mut reader = Cursor::new([b]).chain(reader);
        let x = decode_s33(&mut reader)?;
        let x = u32::try_from(x).map_err(|_| BlockTypeError::NegativeTypeIndex(x))?;

        Ok(Self::Type(TypeIdx(x)))
    }
}

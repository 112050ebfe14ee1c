//! WebAssembly instructions representation.
//!
//! Defined in <https://www.w3.org/TR/wasm-core-2/#instructions>
use crate::config::Feature;
use crate::core::Expr;
use crate::core::indices::*;
use crate::core::types::{RefType, ValType};
use std::fmt;

/// Primary opcode introducing the `0xFC` extension namespace (saturating
/// truncation, bulk memory and table operations).
pub const MISC_PREFIX: u8 = 0xFC;

/// Primary opcode introducing the `0xFE` extension namespace (atomic memory
/// operations).
pub const ATOMIC_PREFIX: u8 = 0xFE;

/// Terminates expressions and structured instruction bodies.
pub const END: u8 = 0x0B;

/// Separates the two arms of an `if`.
pub const ELSE: u8 = 0x05;

/// The numeric code of an instruction: either a single primary byte or a
/// primary extension marker followed by a LEB128 selector.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Opcode {
    Primary(u8),
    Misc(u32),
    Atomic(u32),
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Primary(op) => write!(f, "opcode {op:#04X}"),
            Opcode::Misc(op) => write!(f, "opcode {MISC_PREFIX:#04X} {op}"),
            Opcode::Atomic(op) => write!(f, "opcode {ATOMIC_PREFIX:#04X} {op}"),
        }
    }
}

/// Raw bit pattern of an `f32` constant. Kept as bits so that NaN payloads
/// survive a round trip and compare equal.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Ieee32(pub u32);

impl Ieee32 {
    pub fn value(self) -> f32 {
        f32::from_bits(self.0)
    }
}

impl From<f32> for Ieee32 {
    fn from(v: f32) -> Self {
        Self(v.to_bits())
    }
}

/// Raw bit pattern of an `f64` constant.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Ieee64(pub u64);

impl Ieee64 {
    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl From<f64> for Ieee64 {
    fn from(v: f64) -> Self {
        Self(v.to_bits())
    }
}

/// The signature of a structured instruction.
///
/// <https://www.w3.org/TR/wasm-core-2/#binary-blocktype>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BlockType {
    Empty,
    Value(ValType),
    Type(TypeIdx),
}

/// Immediate of memory instructions: alignment exponent, static offset and
/// the memory the access targets.
///
/// <https://www.w3.org/TR/wasm-core-2/#binary-memarg>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Memarg {
    pub align: u32,
    pub offset: u32,
    pub memory: MemIdx,
}

impl Memarg {
    pub const ZERO: Memarg = Memarg {
        align: 0,
        offset: 0,
        memory: MemIdx(0),
    };

    /// An access to memory 0.
    pub fn new(align: u32, offset: u32) -> Self {
        Self {
            align,
            offset,
            memory: MemIdx(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    // --- Control instructions ---
    Unreachable,
    Nop,
    Block(BlockType, Expr),
    Loop(BlockType, Expr),
    If(BlockType, Expr, Option<Expr>),
    Br(LabelIdx),
    BrIf(LabelIdx),
    BrTable(Vec<LabelIdx>, LabelIdx),
    Return,
    Call(FuncIdx),
    CallIndirect(TypeIdx, TableIdx),

    // --- Reference instructions ---
    RefNull(RefType),
    RefIsNull,
    RefFunc(FuncIdx),

    // --- Parametric instructions ---
    Drop,
    /// `select` without an immediate when `None`, the typed form otherwise.
    Select(Option<ValType>),

    // --- Variable instructions ---
    LocalGet(LocalIdx),
    LocalSet(LocalIdx),
    LocalTee(LocalIdx),
    GlobalGet(GlobalIdx),
    GlobalSet(GlobalIdx),

    // --- Table instructions ---
    TableGet(TableIdx),
    TableSet(TableIdx),
    TableInit(TableIdx, ElemIdx),
    ElemDrop(ElemIdx),
    /// Destination first, source second.
    TableCopy(TableIdx, TableIdx),
    TableGrow(TableIdx),
    TableSize(TableIdx),
    TableFill(TableIdx),

    // --- Memory instructions ---
    I32Load(Memarg),
    I64Load(Memarg),
    F32Load(Memarg),
    F64Load(Memarg),
    I32Load8s(Memarg),
    I32Load8u(Memarg),
    I32Load16s(Memarg),
    I32Load16u(Memarg),
    I64Load8s(Memarg),
    I64Load8u(Memarg),
    I64Load16s(Memarg),
    I64Load16u(Memarg),
    I64Load32s(Memarg),
    I64Load32u(Memarg),
    I32Store(Memarg),
    I64Store(Memarg),
    F32Store(Memarg),
    F64Store(Memarg),
    I32Store8(Memarg),
    I32Store16(Memarg),
    I64Store8(Memarg),
    I64Store16(Memarg),
    I64Store32(Memarg),
    MemorySize(MemIdx),
    MemoryGrow(MemIdx),
    MemoryInit(MemIdx, DataIdx),
    DataDrop(DataIdx),
    /// Destination first, source second.
    MemoryCopy(MemIdx, MemIdx),
    MemoryFill(MemIdx),

    // --- Numeric constants ---
    I32Const(i32),
    I64Const(i64),
    F32Const(Ieee32),
    F64Const(Ieee64),

    // --- I32 tests/relops ---
    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    // --- I64 tests/relops ---
    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,

    // --- F32 relops ---
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,

    // --- F64 relops ---
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,

    // --- I32 numeric ops ---
    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,

    // --- I64 numeric ops ---
    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,

    // --- F32 numeric ops ---
    F32Abs,
    F32Neg,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Sqrt,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,

    // --- F64 numeric ops ---
    F64Abs,
    F64Neg,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Sqrt,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,

    // --- Conversions ---
    I32WrapI64,
    I32TruncF32S,
    I32TruncF32U,
    I32TruncF64S,
    I32TruncF64U,
    I64ExtendI32S,
    I64ExtendI32U,
    I64TruncF32S,
    I64TruncF32U,
    I64TruncF64S,
    I64TruncF64U,
    F32ConvertI32S,
    F32ConvertI32U,
    F32ConvertI64S,
    F32ConvertI64U,
    F32DemoteF64,
    F64ConvertI32S,
    F64ConvertI32U,
    F64ConvertI64S,
    F64ConvertI64U,
    F64PromoteF32,
    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,

    // --- Sign extension ---
    I32Extend8S,
    I32Extend16S,
    I64Extend8S,
    I64Extend16S,
    I64Extend32S,

    // --- Saturating truncation (0xFC 0-7) ---
    I32TruncSatF32S,
    I32TruncSatF32U,
    I32TruncSatF64S,
    I32TruncSatF64U,
    I64TruncSatF32S,
    I64TruncSatF32U,
    I64TruncSatF64S,
    I64TruncSatF64U,

    // --- Atomic memory instructions (0xFE) ---
    MemoryAtomicNotify(Memarg),
    MemoryAtomicWait32(Memarg),
    MemoryAtomicWait64(Memarg),
    AtomicFence,
    I32AtomicLoad(Memarg),
    I64AtomicLoad(Memarg),
    I32AtomicLoad8u(Memarg),
    I32AtomicLoad16u(Memarg),
    I64AtomicLoad8u(Memarg),
    I64AtomicLoad16u(Memarg),
    I64AtomicLoad32u(Memarg),
    I32AtomicStore(Memarg),
    I64AtomicStore(Memarg),
    I32AtomicStore8(Memarg),
    I32AtomicStore16(Memarg),
    I64AtomicStore8(Memarg),
    I64AtomicStore16(Memarg),
    I64AtomicStore32(Memarg),
    I32AtomicRmwAdd(Memarg),
    I64AtomicRmwAdd(Memarg),
    I32AtomicRmwSub(Memarg),
    I64AtomicRmwSub(Memarg),
    I32AtomicRmwAnd(Memarg),
    I64AtomicRmwAnd(Memarg),
    I32AtomicRmwOr(Memarg),
    I64AtomicRmwOr(Memarg),
    I32AtomicRmwXor(Memarg),
    I64AtomicRmwXor(Memarg),
    I32AtomicRmwXchg(Memarg),
    I64AtomicRmwXchg(Memarg),
    I32AtomicRmwCmpxchg(Memarg),
    I64AtomicRmwCmpxchg(Memarg),
}

// Every instruction carrying a `Memarg`, binding it to `$m`.
macro_rules! memory_access {
    ($m:ident) => {
        Instruction::I32Load($m)
            | Instruction::I64Load($m)
            | Instruction::F32Load($m)
            | Instruction::F64Load($m)
            | Instruction::I32Load8s($m)
            | Instruction::I32Load8u($m)
            | Instruction::I32Load16s($m)
            | Instruction::I32Load16u($m)
            | Instruction::I64Load8s($m)
            | Instruction::I64Load8u($m)
            | Instruction::I64Load16s($m)
            | Instruction::I64Load16u($m)
            | Instruction::I64Load32s($m)
            | Instruction::I64Load32u($m)
            | Instruction::I32Store($m)
            | Instruction::I64Store($m)
            | Instruction::F32Store($m)
            | Instruction::F64Store($m)
            | Instruction::I32Store8($m)
            | Instruction::I32Store16($m)
            | Instruction::I64Store8($m)
            | Instruction::I64Store16($m)
            | Instruction::I64Store32($m)
            | Instruction::MemoryAtomicNotify($m)
            | Instruction::MemoryAtomicWait32($m)
            | Instruction::MemoryAtomicWait64($m)
            | Instruction::I32AtomicLoad($m)
            | Instruction::I64AtomicLoad($m)
            | Instruction::I32AtomicLoad8u($m)
            | Instruction::I32AtomicLoad16u($m)
            | Instruction::I64AtomicLoad8u($m)
            | Instruction::I64AtomicLoad16u($m)
            | Instruction::I64AtomicLoad32u($m)
            | Instruction::I32AtomicStore($m)
            | Instruction::I64AtomicStore($m)
            | Instruction::I32AtomicStore8($m)
            | Instruction::I32AtomicStore16($m)
            | Instruction::I64AtomicStore8($m)
            | Instruction::I64AtomicStore16($m)
            | Instruction::I64AtomicStore32($m)
            | Instruction::I32AtomicRmwAdd($m)
            | Instruction::I64AtomicRmwAdd($m)
            | Instruction::I32AtomicRmwSub($m)
            | Instruction::I64AtomicRmwSub($m)
            | Instruction::I32AtomicRmwAnd($m)
            | Instruction::I64AtomicRmwAnd($m)
            | Instruction::I32AtomicRmwOr($m)
            | Instruction::I64AtomicRmwOr($m)
            | Instruction::I32AtomicRmwXor($m)
            | Instruction::I64AtomicRmwXor($m)
            | Instruction::I32AtomicRmwXchg($m)
            | Instruction::I64AtomicRmwXchg($m)
            | Instruction::I32AtomicRmwCmpxchg($m)
            | Instruction::I64AtomicRmwCmpxchg($m)
    };
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        use Instruction::*;
        use Opcode::{Atomic, Misc, Primary};

        match self {
            Unreachable => Primary(0x00),
            Nop => Primary(0x01),
            Block(..) => Primary(0x02),
            Loop(..) => Primary(0x03),
            If(..) => Primary(0x04),
            Br(_) => Primary(0x0C),
            BrIf(_) => Primary(0x0D),
            BrTable(..) => Primary(0x0E),
            Return => Primary(0x0F),
            Call(_) => Primary(0x10),
            CallIndirect(..) => Primary(0x11),

            Drop => Primary(0x1A),
            Select(None) => Primary(0x1B),
            Select(Some(_)) => Primary(0x1C),

            LocalGet(_) => Primary(0x20),
            LocalSet(_) => Primary(0x21),
            LocalTee(_) => Primary(0x22),
            GlobalGet(_) => Primary(0x23),
            GlobalSet(_) => Primary(0x24),
            TableGet(_) => Primary(0x25),
            TableSet(_) => Primary(0x26),

            I32Load(_) => Primary(0x28),
            I64Load(_) => Primary(0x29),
            F32Load(_) => Primary(0x2A),
            F64Load(_) => Primary(0x2B),
            I32Load8s(_) => Primary(0x2C),
            I32Load8u(_) => Primary(0x2D),
            I32Load16s(_) => Primary(0x2E),
            I32Load16u(_) => Primary(0x2F),
            I64Load8s(_) => Primary(0x30),
            I64Load8u(_) => Primary(0x31),
            I64Load16s(_) => Primary(0x32),
            I64Load16u(_) => Primary(0x33),
            I64Load32s(_) => Primary(0x34),
            I64Load32u(_) => Primary(0x35),
            I32Store(_) => Primary(0x36),
            I64Store(_) => Primary(0x37),
            F32Store(_) => Primary(0x38),
            F64Store(_) => Primary(0x39),
            I32Store8(_) => Primary(0x3A),
            I32Store16(_) => Primary(0x3B),
            I64Store8(_) => Primary(0x3C),
            I64Store16(_) => Primary(0x3D),
            I64Store32(_) => Primary(0x3E),
            MemorySize(_) => Primary(0x3F),
            MemoryGrow(_) => Primary(0x40),

            I32Const(_) => Primary(0x41),
            I64Const(_) => Primary(0x42),
            F32Const(_) => Primary(0x43),
            F64Const(_) => Primary(0x44),

            I32Eqz => Primary(0x45),
            I32Eq => Primary(0x46),
            I32Ne => Primary(0x47),
            I32LtS => Primary(0x48),
            I32LtU => Primary(0x49),
            I32GtS => Primary(0x4A),
            I32GtU => Primary(0x4B),
            I32LeS => Primary(0x4C),
            I32LeU => Primary(0x4D),
            I32GeS => Primary(0x4E),
            I32GeU => Primary(0x4F),

            I64Eqz => Primary(0x50),
            I64Eq => Primary(0x51),
            I64Ne => Primary(0x52),
            I64LtS => Primary(0x53),
            I64LtU => Primary(0x54),
            I64GtS => Primary(0x55),
            I64GtU => Primary(0x56),
            I64LeS => Primary(0x57),
            I64LeU => Primary(0x58),
            I64GeS => Primary(0x59),
            I64GeU => Primary(0x5A),

            F32Eq => Primary(0x5B),
            F32Ne => Primary(0x5C),
            F32Lt => Primary(0x5D),
            F32Gt => Primary(0x5E),
            F32Le => Primary(0x5F),
            F32Ge => Primary(0x60),

            F64Eq => Primary(0x61),
            F64Ne => Primary(0x62),
            F64Lt => Primary(0x63),
            F64Gt => Primary(0x64),
            F64Le => Primary(0x65),
            F64Ge => Primary(0x66),

            I32Clz => Primary(0x67),
            I32Ctz => Primary(0x68),
            I32Popcnt => Primary(0x69),
            I32Add => Primary(0x6A),
            I32Sub => Primary(0x6B),
            I32Mul => Primary(0x6C),
            I32DivS => Primary(0x6D),
            I32DivU => Primary(0x6E),
            I32RemS => Primary(0x6F),
            I32RemU => Primary(0x70),
            I32And => Primary(0x71),
            I32Or => Primary(0x72),
            I32Xor => Primary(0x73),
            I32Shl => Primary(0x74),
            I32ShrS => Primary(0x75),
            I32ShrU => Primary(0x76),
            I32Rotl => Primary(0x77),
            I32Rotr => Primary(0x78),

            I64Clz => Primary(0x79),
            I64Ctz => Primary(0x7A),
            I64Popcnt => Primary(0x7B),
            I64Add => Primary(0x7C),
            I64Sub => Primary(0x7D),
            I64Mul => Primary(0x7E),
            I64DivS => Primary(0x7F),
            I64DivU => Primary(0x80),
            I64RemS => Primary(0x81),
            I64RemU => Primary(0x82),
            I64And => Primary(0x83),
            I64Or => Primary(0x84),
            I64Xor => Primary(0x85),
            I64Shl => Primary(0x86),
            I64ShrS => Primary(0x87),
            I64ShrU => Primary(0x88),
            I64Rotl => Primary(0x89),
            I64Rotr => Primary(0x8A),

            F32Abs => Primary(0x8B),
            F32Neg => Primary(0x8C),
            F32Ceil => Primary(0x8D),
            F32Floor => Primary(0x8E),
            F32Trunc => Primary(0x8F),
            F32Nearest => Primary(0x90),
            F32Sqrt => Primary(0x91),
            F32Add => Primary(0x92),
            F32Sub => Primary(0x93),
            F32Mul => Primary(0x94),
            F32Div => Primary(0x95),
            F32Min => Primary(0x96),
            F32Max => Primary(0x97),
            F32Copysign => Primary(0x98),

            F64Abs => Primary(0x99),
            F64Neg => Primary(0x9A),
            F64Ceil => Primary(0x9B),
            F64Floor => Primary(0x9C),
            F64Trunc => Primary(0x9D),
            F64Nearest => Primary(0x9E),
            F64Sqrt => Primary(0x9F),
            F64Add => Primary(0xA0),
            F64Sub => Primary(0xA1),
            F64Mul => Primary(0xA2),
            F64Div => Primary(0xA3),
            F64Min => Primary(0xA4),
            F64Max => Primary(0xA5),
            F64Copysign => Primary(0xA6),

            I32WrapI64 => Primary(0xA7),
            I32TruncF32S => Primary(0xA8),
            I32TruncF32U => Primary(0xA9),
            I32TruncF64S => Primary(0xAA),
            I32TruncF64U => Primary(0xAB),
            I64ExtendI32S => Primary(0xAC),
            I64ExtendI32U => Primary(0xAD),
            I64TruncF32S => Primary(0xAE),
            I64TruncF32U => Primary(0xAF),
            I64TruncF64S => Primary(0xB0),
            I64TruncF64U => Primary(0xB1),
            F32ConvertI32S => Primary(0xB2),
            F32ConvertI32U => Primary(0xB3),
            F32ConvertI64S => Primary(0xB4),
            F32ConvertI64U => Primary(0xB5),
            F32DemoteF64 => Primary(0xB6),
            F64ConvertI32S => Primary(0xB7),
            F64ConvertI32U => Primary(0xB8),
            F64ConvertI64S => Primary(0xB9),
            F64ConvertI64U => Primary(0xBA),
            F64PromoteF32 => Primary(0xBB),
            I32ReinterpretF32 => Primary(0xBC),
            I64ReinterpretF64 => Primary(0xBD),
            F32ReinterpretI32 => Primary(0xBE),
            F64ReinterpretI64 => Primary(0xBF),

            I32Extend8S => Primary(0xC0),
            I32Extend16S => Primary(0xC1),
            I64Extend8S => Primary(0xC2),
            I64Extend16S => Primary(0xC3),
            I64Extend32S => Primary(0xC4),

            RefNull(_) => Primary(0xD0),
            RefIsNull => Primary(0xD1),
            RefFunc(_) => Primary(0xD2),

            I32TruncSatF32S => Misc(0),
            I32TruncSatF32U => Misc(1),
            I32TruncSatF64S => Misc(2),
            I32TruncSatF64U => Misc(3),
            I64TruncSatF32S => Misc(4),
            I64TruncSatF32U => Misc(5),
            I64TruncSatF64S => Misc(6),
            I64TruncSatF64U => Misc(7),
            MemoryInit(..) => Misc(8),
            DataDrop(_) => Misc(9),
            MemoryCopy(..) => Misc(10),
            MemoryFill(_) => Misc(11),
            TableInit(..) => Misc(12),
            ElemDrop(_) => Misc(13),
            TableCopy(..) => Misc(14),
            TableGrow(_) => Misc(15),
            TableSize(_) => Misc(16),
            TableFill(_) => Misc(17),

            MemoryAtomicNotify(_) => Atomic(0x00),
            MemoryAtomicWait32(_) => Atomic(0x01),
            MemoryAtomicWait64(_) => Atomic(0x02),
            AtomicFence => Atomic(0x03),
            I32AtomicLoad(_) => Atomic(0x10),
            I64AtomicLoad(_) => Atomic(0x11),
            I32AtomicLoad8u(_) => Atomic(0x12),
            I32AtomicLoad16u(_) => Atomic(0x13),
            I64AtomicLoad8u(_) => Atomic(0x14),
            I64AtomicLoad16u(_) => Atomic(0x15),
            I64AtomicLoad32u(_) => Atomic(0x16),
            I32AtomicStore(_) => Atomic(0x17),
            I64AtomicStore(_) => Atomic(0x18),
            I32AtomicStore8(_) => Atomic(0x19),
            I32AtomicStore16(_) => Atomic(0x1A),
            I64AtomicStore8(_) => Atomic(0x1B),
            I64AtomicStore16(_) => Atomic(0x1C),
            I64AtomicStore32(_) => Atomic(0x1D),
            I32AtomicRmwAdd(_) => Atomic(0x1E),
            I64AtomicRmwAdd(_) => Atomic(0x1F),
            I32AtomicRmwSub(_) => Atomic(0x25),
            I64AtomicRmwSub(_) => Atomic(0x26),
            I32AtomicRmwAnd(_) => Atomic(0x2C),
            I64AtomicRmwAnd(_) => Atomic(0x2D),
            I32AtomicRmwOr(_) => Atomic(0x33),
            I64AtomicRmwOr(_) => Atomic(0x34),
            I32AtomicRmwXor(_) => Atomic(0x3A),
            I64AtomicRmwXor(_) => Atomic(0x3B),
            I32AtomicRmwXchg(_) => Atomic(0x41),
            I64AtomicRmwXchg(_) => Atomic(0x42),
            I32AtomicRmwCmpxchg(_) => Atomic(0x48),
            I64AtomicRmwCmpxchg(_) => Atomic(0x49),
        }
    }

    /// The memory immediate of a load, store or atomic access.
    pub fn memarg(&self) -> Option<&Memarg> {
        match self {
            memory_access!(m) => Some(m),
            _ => None,
        }
    }

    pub fn memarg_mut(&mut self) -> Option<&mut Memarg> {
        match self {
            memory_access!(m) => Some(m),
            _ => None,
        }
    }

    /// Whether the instruction may appear in a constant expression.
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Instruction::I32Const(_)
                | Instruction::I64Const(_)
                | Instruction::F32Const(_)
                | Instruction::F64Const(_)
                | Instruction::RefNull(_)
                | Instruction::RefFunc(_)
                | Instruction::GlobalGet(_)
        )
    }

    /// Nested bodies of structured instructions.
    pub fn bodies(&self) -> impl Iterator<Item = &Expr> {
        let (first, second) = match self {
            Instruction::Block(_, body) | Instruction::Loop(_, body) => (Some(body), None),
            Instruction::If(_, then, els) => (Some(then), els.as_ref()),
            _ => (None, None),
        };
        first.into_iter().chain(second)
    }

    /// Features beyond the MVP instruction set that this instruction relies
    /// on, not counting nested bodies.
    pub fn required_features(&self) -> Vec<Feature> {
        use Instruction::*;

        let mut features = Vec::new();
        match self {
            Block(BlockType::Type(_), ..)
            | Loop(BlockType::Type(_), ..)
            | If(BlockType::Type(_), ..) => features.push(Feature::MultiValue),

            I32Extend8S | I32Extend16S | I64Extend8S | I64Extend16S | I64Extend32S => {
                features.push(Feature::SignExtension)
            }

            I32TruncSatF32S | I32TruncSatF32U | I32TruncSatF64S | I32TruncSatF64U
            | I64TruncSatF32S | I64TruncSatF32U | I64TruncSatF64S | I64TruncSatF64U => {
                features.push(Feature::SaturatingFloatToInt)
            }

            DataDrop(_) | ElemDrop(_) => features.push(Feature::BulkMemory),
            MemoryInit(mem, _) | MemoryFill(mem) => {
                features.push(Feature::BulkMemory);
                if mem.0 != 0 {
                    features.push(Feature::MultipleMemories);
                }
            }
            MemoryCopy(dst, src) => {
                features.push(Feature::BulkMemory);
                if dst.0 != 0 || src.0 != 0 {
                    features.push(Feature::MultipleMemories);
                }
            }
            TableInit(table, _) => {
                features.push(Feature::BulkMemory);
                if table.0 != 0 {
                    features.push(Feature::MultipleTables);
                }
            }
            TableCopy(dst, src) => {
                features.push(Feature::BulkMemory);
                if dst.0 != 0 || src.0 != 0 {
                    features.push(Feature::MultipleTables);
                }
            }

            RefNull(_) | RefIsNull | RefFunc(_) | Select(Some(_)) => {
                features.push(Feature::ReferenceTypes)
            }
            TableGet(table) | TableSet(table) | TableGrow(table) | TableSize(table)
            | TableFill(table) => {
                features.push(Feature::ReferenceTypes);
                if table.0 != 0 {
                    features.push(Feature::MultipleTables);
                }
            }
            CallIndirect(_, table) if table.0 != 0 => features.push(Feature::MultipleTables),

            MemorySize(mem) | MemoryGrow(mem) if mem.0 != 0 => {
                features.push(Feature::MultipleMemories)
            }

            AtomicFence => features.push(Feature::Threads),
            _ => {}
        }

        if let Some(memarg) = self.memarg() {
            if matches!(self.opcode(), Opcode::Atomic(_)) {
                features.push(Feature::Threads);
            }
            if memarg.memory.0 != 0 {
                features.push(Feature::MultipleMemories);
            }
        }

        features
    }

    /// Checks the index immediates of this instruction, not those of nested
    /// bodies, against `bounds`.
    pub fn check_own_references(&self, bounds: &IndexBounds) -> Result<(), ReferenceError> {
        use Instruction::*;

        match self {
            Block(bt, _) | Loop(bt, _) | If(bt, ..) => {
                if let BlockType::Type(t) = bt {
                    t.resolve(bounds.types)?;
                }
            }
            Br(l) | BrIf(l) => {
                l.resolve(bounds.labels)?;
            }
            BrTable(ls, l) => {
                for l in ls.iter().chain(std::iter::once(l)) {
                    l.resolve(bounds.labels)?;
                }
            }
            Call(f) | RefFunc(f) => {
                f.resolve(bounds.funcs)?;
            }
            CallIndirect(t, table) => {
                t.resolve(bounds.types)?;
                table.resolve(bounds.tables)?;
            }
            LocalGet(l) | LocalSet(l) | LocalTee(l) => {
                l.resolve(bounds.locals)?;
            }
            GlobalGet(g) | GlobalSet(g) => {
                g.resolve(bounds.globals)?;
            }
            TableGet(t) | TableSet(t) | TableGrow(t) | TableSize(t) | TableFill(t) => {
                t.resolve(bounds.tables)?;
            }
            TableInit(t, e) => {
                t.resolve(bounds.tables)?;
                e.resolve(bounds.elems)?;
            }
            ElemDrop(e) => {
                e.resolve(bounds.elems)?;
            }
            TableCopy(dst, src) => {
                dst.resolve(bounds.tables)?;
                src.resolve(bounds.tables)?;
            }
            MemorySize(m) | MemoryGrow(m) | MemoryFill(m) => {
                m.resolve(bounds.memories)?;
            }
            MemoryInit(m, d) => {
                m.resolve(bounds.memories)?;
                d.resolve(bounds.datas)?;
            }
            DataDrop(d) => {
                d.resolve(bounds.datas)?;
            }
            MemoryCopy(dst, src) => {
                dst.resolve(bounds.memories)?;
                src.resolve(bounds.memories)?;
            }
            other => {
                if let Some(memarg) = other.memarg() {
                    memarg.memory.resolve(bounds.memories)?;
                }
            }
        }

        Ok(())
    }

    /// Checks the index immediates of this instruction and of every nested
    /// body against `bounds`.
    pub fn check_references(&self, bounds: &IndexBounds) -> Result<(), ReferenceError> {
        self.check_own_references(bounds)?;
        let nested = bounds.nested();
        for body in self.bodies() {
            for instr in body {
                instr.check_references(&nested)?;
            }
        }
        Ok(())
    }

    /// Whether the instruction reads or drops a data segment by index.
    pub fn uses_data_index(&self) -> bool {
        matches!(self, Instruction::MemoryInit(..) | Instruction::DataDrop(_))
            || self
                .bodies()
                .any(|body| body.iter().any(Instruction::uses_data_index))
    }
}

//! Compile-time tables mapping opcodes to instruction prototypes.
//!
//! A prototype is the instruction with placeholder immediates; decoding looks
//! it up by opcode and then reads the immediates it needs. `end` and `else`
//! are delimiters and have no entry. Duplicate keys are rejected when the
//! tables are built.
use crate::core::indices::*;
use crate::core::instruction::{BlockType, Ieee32, Ieee64, Instruction, Memarg, Opcode};
use crate::core::types::{RefType, ValType};
use phf::phf_ordered_map;

// Instructions with a single-byte opcode.
#[expect(non_upper_case_globals)]
pub(crate) static Primary_OPCODES: phf::OrderedMap<u8, Instruction> = phf_ordered_map! {
    0x00u8 => Instruction::Unreachable,
    0x01u8 => Instruction::Nop,
    0x02u8 => Instruction::Block(BlockType::Empty, Vec::new()),
    0x03u8 => Instruction::Loop(BlockType::Empty, Vec::new()),
    0x04u8 => Instruction::If(BlockType::Empty, Vec::new(), None),
    0x0Cu8 => Instruction::Br(LabelIdx(0)),
    0x0Du8 => Instruction::BrIf(LabelIdx(0)),
    0x0Eu8 => Instruction::BrTable(Vec::new(), LabelIdx(0)),
    0x0Fu8 => Instruction::Return,
    0x10u8 => Instruction::Call(FuncIdx(0)),
    0x11u8 => Instruction::CallIndirect(TypeIdx(0), TableIdx(0)),
    0x1Au8 => Instruction::Drop,
    0x1Bu8 => Instruction::Select(None),
    0x1Cu8 => Instruction::Select(Some(ValType::I32)),
    0x20u8 => Instruction::LocalGet(LocalIdx(0)),
    0x21u8 => Instruction::LocalSet(LocalIdx(0)),
    0x22u8 => Instruction::LocalTee(LocalIdx(0)),
    0x23u8 => Instruction::GlobalGet(GlobalIdx(0)),
    0x24u8 => Instruction::GlobalSet(GlobalIdx(0)),
    0x25u8 => Instruction::TableGet(TableIdx(0)),
    0x26u8 => Instruction::TableSet(TableIdx(0)),
    0x28u8 => Instruction::I32Load(Memarg::ZERO),
    0x29u8 => Instruction::I64Load(Memarg::ZERO),
    0x2Au8 => Instruction::F32Load(Memarg::ZERO),
    0x2Bu8 => Instruction::F64Load(Memarg::ZERO),
    0x2Cu8 => Instruction::I32Load8s(Memarg::ZERO),
    0x2Du8 => Instruction::I32Load8u(Memarg::ZERO),
    0x2Eu8 => Instruction::I32Load16s(Memarg::ZERO),
    0x2Fu8 => Instruction::I32Load16u(Memarg::ZERO),
    0x30u8 => Instruction::I64Load8s(Memarg::ZERO),
    0x31u8 => Instruction::I64Load8u(Memarg::ZERO),
    0x32u8 => Instruction::I64Load16s(Memarg::ZERO),
    0x33u8 => Instruction::I64Load16u(Memarg::ZERO),
    0x34u8 => Instruction::I64Load32s(Memarg::ZERO),
    0x35u8 => Instruction::I64Load32u(Memarg::ZERO),
    0x36u8 => Instruction::I32Store(Memarg::ZERO),
    0x37u8 => Instruction::I64Store(Memarg::ZERO),
    0x38u8 => Instruction::F32Store(Memarg::ZERO),
    0x39u8 => Instruction::F64Store(Memarg::ZERO),
    0x3Au8 => Instruction::I32Store8(Memarg::ZERO),
    0x3Bu8 => Instruction::I32Store16(Memarg::ZERO),
    0x3Cu8 => Instruction::I64Store8(Memarg::ZERO),
    0x3Du8 => Instruction::I64Store16(Memarg::ZERO),
    0x3Eu8 => Instruction::I64Store32(Memarg::ZERO),
    0x3Fu8 => Instruction::MemorySize(MemIdx(0)),
    0x40u8 => Instruction::MemoryGrow(MemIdx(0)),
    0x41u8 => Instruction::I32Const(0),
    0x42u8 => Instruction::I64Const(0),
    0x43u8 => Instruction::F32Const(Ieee32(0)),
    0x44u8 => Instruction::F64Const(Ieee64(0)),
    0x45u8 => Instruction::I32Eqz,
    0x46u8 => Instruction::I32Eq,
    0x47u8 => Instruction::I32Ne,
    0x48u8 => Instruction::I32LtS,
    0x49u8 => Instruction::I32LtU,
    0x4Au8 => Instruction::I32GtS,
    0x4Bu8 => Instruction::I32GtU,
    0x4Cu8 => Instruction::I32LeS,
    0x4Du8 => Instruction::I32LeU,
    0x4Eu8 => Instruction::I32GeS,
    0x4Fu8 => Instruction::I32GeU,
    0x50u8 => Instruction::I64Eqz,
    0x51u8 => Instruction::I64Eq,
    0x52u8 => Instruction::I64Ne,
    0x53u8 => Instruction::I64LtS,
    0x54u8 => Instruction::I64LtU,
    0x55u8 => Instruction::I64GtS,
    0x56u8 => Instruction::I64GtU,
    0x57u8 => Instruction::I64LeS,
    0x58u8 => Instruction::I64LeU,
    0x59u8 => Instruction::I64GeS,
    0x5Au8 => Instruction::I64GeU,
    0x5Bu8 => Instruction::F32Eq,
    0x5Cu8 => Instruction::F32Ne,
    0x5Du8 => Instruction::F32Lt,
    0x5Eu8 => Instruction::F32Gt,
    0x5Fu8 => Instruction::F32Le,
    0x60u8 => Instruction::F32Ge,
    0x61u8 => Instruction::F64Eq,
    0x62u8 => Instruction::F64Ne,
    0x63u8 => Instruction::F64Lt,
    0x64u8 => Instruction::F64Gt,
    0x65u8 => Instruction::F64Le,
    0x66u8 => Instruction::F64Ge,
    0x67u8 => Instruction::I32Clz,
    0x68u8 => Instruction::I32Ctz,
    0x69u8 => Instruction::I32Popcnt,
    0x6Au8 => Instruction::I32Add,
    0x6Bu8 => Instruction::I32Sub,
    0x6Cu8 => Instruction::I32Mul,
    0x6Du8 => Instruction::I32DivS,
    0x6Eu8 => Instruction::I32DivU,
    0x6Fu8 => Instruction::I32RemS,
    0x70u8 => Instruction::I32RemU,
    0x71u8 => Instruction::I32And,
    0x72u8 => Instruction::I32Or,
    0x73u8 => Instruction::I32Xor,
    0x74u8 => Instruction::I32Shl,
    0x75u8 => Instruction::I32ShrS,
    0x76u8 => Instruction::I32ShrU,
    0x77u8 => Instruction::I32Rotl,
    0x78u8 => Instruction::I32Rotr,
    0x79u8 => Instruction::I64Clz,
    0x7Au8 => Instruction::I64Ctz,
    0x7Bu8 => Instruction::I64Popcnt,
    0x7Cu8 => Instruction::I64Add,
    0x7Du8 => Instruction::I64Sub,
    0x7Eu8 => Instruction::I64Mul,
    0x7Fu8 => Instruction::I64DivS,
    0x80u8 => Instruction::I64DivU,
    0x81u8 => Instruction::I64RemS,
    0x82u8 => Instruction::I64RemU,
    0x83u8 => Instruction::I64And,
    0x84u8 => Instruction::I64Or,
    0x85u8 => Instruction::I64Xor,
    0x86u8 => Instruction::I64Shl,
    0x87u8 => Instruction::I64ShrS,
    0x88u8 => Instruction::I64ShrU,
    0x89u8 => Instruction::I64Rotl,
    0x8Au8 => Instruction::I64Rotr,
    0x8Bu8 => Instruction::F32Abs,
    0x8Cu8 => Instruction::F32Neg,
    0x8Du8 => Instruction::F32Ceil,
    0x8Eu8 => Instruction::F32Floor,
    0x8Fu8 => Instruction::F32Trunc,
    0x90u8 => Instruction::F32Nearest,
    0x91u8 => Instruction::F32Sqrt,
    0x92u8 => Instruction::F32Add,
    0x93u8 => Instruction::F32Sub,
    0x94u8 => Instruction::F32Mul,
    0x95u8 => Instruction::F32Div,
    0x96u8 => Instruction::F32Min,
    0x97u8 => Instruction::F32Max,
    0x98u8 => Instruction::F32Copysign,
    0x99u8 => Instruction::F64Abs,
    0x9Au8 => Instruction::F64Neg,
    0x9Bu8 => Instruction::F64Ceil,
    0x9Cu8 => Instruction::F64Floor,
    0x9Du8 => Instruction::F64Trunc,
    0x9Eu8 => Instruction::F64Nearest,
    0x9Fu8 => Instruction::F64Sqrt,
    0xA0u8 => Instruction::F64Add,
    0xA1u8 => Instruction::F64Sub,
    0xA2u8 => Instruction::F64Mul,
    0xA3u8 => Instruction::F64Div,
    0xA4u8 => Instruction::F64Min,
    0xA5u8 => Instruction::F64Max,
    0xA6u8 => Instruction::F64Copysign,
    0xA7u8 => Instruction::I32WrapI64,
    0xA8u8 => Instruction::I32TruncF32S,
    0xA9u8 => Instruction::I32TruncF32U,
    0xAAu8 => Instruction::I32TruncF64S,
    0xABu8 => Instruction::I32TruncF64U,
    0xACu8 => Instruction::I64ExtendI32S,
    0xADu8 => Instruction::I64ExtendI32U,
    0xAEu8 => Instruction::I64TruncF32S,
    0xAFu8 => Instruction::I64TruncF32U,
    0xB0u8 => Instruction::I64TruncF64S,
    0xB1u8 => Instruction::I64TruncF64U,
    0xB2u8 => Instruction::F32ConvertI32S,
    0xB3u8 => Instruction::F32ConvertI32U,
    0xB4u8 => Instruction::F32ConvertI64S,
    0xB5u8 => Instruction::F32ConvertI64U,
    0xB6u8 => Instruction::F32DemoteF64,
    0xB7u8 => Instruction::F64ConvertI32S,
    0xB8u8 => Instruction::F64ConvertI32U,
    0xB9u8 => Instruction::F64ConvertI64S,
    0xBAu8 => Instruction::F64ConvertI64U,
    0xBBu8 => Instruction::F64PromoteF32,
    0xBCu8 => Instruction::I32ReinterpretF32,
    0xBDu8 => Instruction::I64ReinterpretF64,
    0xBEu8 => Instruction::F32ReinterpretI32,
    0xBFu8 => Instruction::F64ReinterpretI64,
    0xC0u8 => Instruction::I32Extend8S,
    0xC1u8 => Instruction::I32Extend16S,
    0xC2u8 => Instruction::I64Extend8S,
    0xC3u8 => Instruction::I64Extend16S,
    0xC4u8 => Instruction::I64Extend32S,
    0xD0u8 => Instruction::RefNull(RefType::Func),
    0xD1u8 => Instruction::RefIsNull,
    0xD2u8 => Instruction::RefFunc(FuncIdx(0)),
};

// Instructions behind the 0xFC prefix.
#[expect(non_upper_case_globals)]
pub(crate) static Misc_OPCODES: phf::OrderedMap<u32, Instruction> = phf_ordered_map! {
    0u32 => Instruction::I32TruncSatF32S,
    1u32 => Instruction::I32TruncSatF32U,
    2u32 => Instruction::I32TruncSatF64S,
    3u32 => Instruction::I32TruncSatF64U,
    4u32 => Instruction::I64TruncSatF32S,
    5u32 => Instruction::I64TruncSatF32U,
    6u32 => Instruction::I64TruncSatF64S,
    7u32 => Instruction::I64TruncSatF64U,
    8u32 => Instruction::MemoryInit(MemIdx(0), DataIdx(0)),
    9u32 => Instruction::DataDrop(DataIdx(0)),
    10u32 => Instruction::MemoryCopy(MemIdx(0), MemIdx(0)),
    11u32 => Instruction::MemoryFill(MemIdx(0)),
    12u32 => Instruction::TableInit(TableIdx(0), ElemIdx(0)),
    13u32 => Instruction::ElemDrop(ElemIdx(0)),
    14u32 => Instruction::TableCopy(TableIdx(0), TableIdx(0)),
    15u32 => Instruction::TableGrow(TableIdx(0)),
    16u32 => Instruction::TableSize(TableIdx(0)),
    17u32 => Instruction::TableFill(TableIdx(0)),
};

// Instructions behind the 0xFE prefix.
#[expect(non_upper_case_globals)]
pub(crate) static Atomic_OPCODES: phf::OrderedMap<u32, Instruction> = phf_ordered_map! {
    0x00u32 => Instruction::MemoryAtomicNotify(Memarg::ZERO),
    0x01u32 => Instruction::MemoryAtomicWait32(Memarg::ZERO),
    0x02u32 => Instruction::MemoryAtomicWait64(Memarg::ZERO),
    0x03u32 => Instruction::AtomicFence,
    0x10u32 => Instruction::I32AtomicLoad(Memarg::ZERO),
    0x11u32 => Instruction::I64AtomicLoad(Memarg::ZERO),
    0x12u32 => Instruction::I32AtomicLoad8u(Memarg::ZERO),
    0x13u32 => Instruction::I32AtomicLoad16u(Memarg::ZERO),
    0x14u32 => Instruction::I64AtomicLoad8u(Memarg::ZERO),
    0x15u32 => Instruction::I64AtomicLoad16u(Memarg::ZERO),
    0x16u32 => Instruction::I64AtomicLoad32u(Memarg::ZERO),
    0x17u32 => Instruction::I32AtomicStore(Memarg::ZERO),
    0x18u32 => Instruction::I64AtomicStore(Memarg::ZERO),
    0x19u32 => Instruction::I32AtomicStore8(Memarg::ZERO),
    0x1Au32 => Instruction::I32AtomicStore16(Memarg::ZERO),
    0x1Bu32 => Instruction::I64AtomicStore8(Memarg::ZERO),
    0x1Cu32 => Instruction::I64AtomicStore16(Memarg::ZERO),
    0x1Du32 => Instruction::I64AtomicStore32(Memarg::ZERO),
    0x1Eu32 => Instruction::I32AtomicRmwAdd(Memarg::ZERO),
    0x1Fu32 => Instruction::I64AtomicRmwAdd(Memarg::ZERO),
    0x25u32 => Instruction::I32AtomicRmwSub(Memarg::ZERO),
    0x26u32 => Instruction::I64AtomicRmwSub(Memarg::ZERO),
    0x2Cu32 => Instruction::I32AtomicRmwAnd(Memarg::ZERO),
    0x2Du32 => Instruction::I64AtomicRmwAnd(Memarg::ZERO),
    0x33u32 => Instruction::I32AtomicRmwOr(Memarg::ZERO),
    0x34u32 => Instruction::I64AtomicRmwOr(Memarg::ZERO),
    0x3Au32 => Instruction::I32AtomicRmwXor(Memarg::ZERO),
    0x3Bu32 => Instruction::I64AtomicRmwXor(Memarg::ZERO),
    0x41u32 => Instruction::I32AtomicRmwXchg(Memarg::ZERO),
    0x42u32 => Instruction::I64AtomicRmwXchg(Memarg::ZERO),
    0x48u32 => Instruction::I32AtomicRmwCmpxchg(Memarg::ZERO),
    0x49u32 => Instruction::I64AtomicRmwCmpxchg(Memarg::ZERO),
};
/// Looks up the prototype registered for `opcode`.
pub fn prototype(opcode: Opcode) -> Option<&'static Instruction> {
    match opcode {
        Opcode::Primary(op) => Primary_OPCODES.get(&op),
        Opcode::Misc(op) => Misc_OPCODES.get(&op),
        Opcode::Atomic(op) => Atomic_OPCODES.get(&op),
    }
}

/// Every registered prototype, primary opcodes first.
pub fn prototypes() -> impl Iterator<Item = &'static Instruction> {
    Primary_OPCODES
        .values()
        .chain(Misc_OPCODES.values())
        .chain(Atomic_OPCODES.values())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instruction::{ATOMIC_PREFIX, ELSE, END, MISC_PREFIX};

    #[test]
    fn every_prototype_reports_its_own_key() {
        for (op, ins) in Primary_OPCODES.entries() {
            assert_eq!(ins.opcode(), Opcode::Primary(*op), "{ins:?}");
        }
        for (op, ins) in Misc_OPCODES.entries() {
            assert_eq!(ins.opcode(), Opcode::Misc(*op), "{ins:?}");
        }
        for (op, ins) in Atomic_OPCODES.entries() {
            assert_eq!(ins.opcode(), Opcode::Atomic(*op), "{ins:?}");
        }
    }

    #[test]
    fn delimiters_and_prefixes_are_not_instructions() {
        for op in [END, ELSE, MISC_PREFIX, ATOMIC_PREFIX] {
            assert!(prototype(Opcode::Primary(op)).is_none(), "{op:#04X}");
        }
    }

    #[test]
    fn lookup_dispatches_on_namespace() {
        assert_eq!(
            prototype(Opcode::Misc(11)),
            Some(&Instruction::MemoryFill(MemIdx(0)))
        );
        assert_eq!(prototype(Opcode::Atomic(0x03)), Some(&Instruction::AtomicFence));
        assert_eq!(prototype(Opcode::Misc(18)), None);
        assert_eq!(prototypes().count(), 231);
    }
}

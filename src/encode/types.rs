//! Encoders for the type system.
//!
//! Marker bytes mirror the decoder tables in [`crate::decode::types`].
use crate::core::instruction::BlockType;
use crate::core::types::*;
use crate::encode::helpers::{LengthOverflowError, encode_vector};
use crate::encode::integer::{Relaxation, encode_s33, encode_u32};

impl ValType {
    pub fn marker(self) -> u8 {
        match self {
            ValType::I32 => 0x7F,
            ValType::I64 => 0x7E,
            ValType::F32 => 0x7D,
            ValType::F64 => 0x7C,
            ValType::FuncRef => 0x70,
            ValType::ExternRef => 0x6F,
        }
    }

    pub fn encode(self, out: &mut Vec<u8>) {
        out.push(self.marker());
    }
}

impl RefType {
    pub fn encode(self, out: &mut Vec<u8>) {
        ValType::from(self).encode(out);
    }
}

impl FuncType {
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), LengthOverflowError> {
        out.push(Self::MARKER_BYTE);
        encode_result_type(out, &self.parameters)?;
        encode_result_type(out, &self.results)
    }
}

fn encode_result_type(out: &mut Vec<u8>, types: &[ValType]) -> Result<(), LengthOverflowError> {
    encode_vector(out, types, |out, t| {
        t.encode(out);
        Ok::<_, LengthOverflowError>(())
    })
}

impl Limits {
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self.max() {
            None => {
                out.push(0x00);
                encode_u32(out, self.min(), Relaxation::Canonical);
            }
            Some(max) => {
                out.push(0x01);
                encode_u32(out, self.min(), Relaxation::Canonical);
                encode_u32(out, max, Relaxation::Canonical);
            }
        }
    }
}

impl MemType {
    pub fn encode(&self, out: &mut Vec<u8>) {
        self.limits.encode(out);
    }
}

impl TableType {
    pub fn encode(&self, out: &mut Vec<u8>) {
        self.reftype.encode(out);
        self.limits.encode(out);
    }
}

impl GlobalType {
    pub fn encode(&self, out: &mut Vec<u8>) {
        self.1.encode(out);
        out.push(match self.0 {
            Mut::Const => 0x00,
            Mut::Var => 0x01,
        });
    }
}

impl BlockType {
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            BlockType::Empty => out.push(Self::EMPTY_MARKER),
            BlockType::Value(t) => t.encode(out),
            BlockType::Type(idx) => encode_s33(out, i64::from(idx.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indices::TypeIdx;
    use pretty_assertions::assert_eq;

    #[test]
    fn function_type_layout() {
        let mut out = Vec::new();
        FuncType::new([ValType::I32, ValType::ExternRef], [ValType::F64])
            .encode(&mut out)
            .unwrap();
        assert_eq!(out, [0x60, 0x02, 0x7F, 0x6F, 0x01, 0x7C]);
    }

    #[test]
    fn limits_flag_announces_max() {
        let mut out = Vec::new();
        Limits::at_least(1).encode(&mut out);
        Limits::new(2, Some(300)).unwrap().encode(&mut out);
        assert_eq!(out, [0x00, 0x01, 0x01, 0x02, 0xAC, 0x02]);
    }

    #[test]
    fn block_type_index_is_positive_s33() {
        let mut out = Vec::new();
        BlockType::Type(TypeIdx(64)).encode(&mut out);
        // 64 needs a second byte to keep the sign bit clear
        assert_eq!(out, [0xC0, 0x00]);

        let mut out = Vec::new();
        BlockType::Empty.encode(&mut out);
        BlockType::Value(ValType::I64).encode(&mut out);
        assert_eq!(out, [0x40, 0x7E]);
    }

    #[test]
    fn global_type_is_valtype_then_mutability() {
        let mut out = Vec::new();
        GlobalType(Mut::Var, ValType::F32).encode(&mut out);
        assert_eq!(out, [0x7D, 0x01]);
    }
}

//! Decoding for WebAssembly indices.
//!
//! See <https://www.w3.org/TR/wasm-core-2/#indices>

use crate::core::indices::{
    DataIdx, ElemIdx, FuncIdx, GlobalIdx, LabelIdx, LocalIdx, MemIdx, ReferenceError, TableIdx,
    TypeIdx,
};
use crate::decode::integer::{DecodeU32Error, decode_u32};
use std::io::Read;
use thiserror::Error;

macro_rules! define_index_decoder {
    ($name:ident, $errorname:ident) => {
        #[derive(Debug, Error)]
        pub enum $errorname {
            #[error("failed decoding {name} index", name = stringify!($name))]
            Decode(#[from] DecodeU32Error),

            #[error(transparent)]
            Unresolved(#[from] ReferenceError),
        }

        impl $name {
            pub(crate) fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, $errorname> {
                let idx = decode_u32(reader)?;
                Ok(Self(idx))
            }

            /// Decodes an index that must refer to one of the first `len`
            /// entries of its index space.
            pub(crate) fn decode_within<R: Read + ?Sized>(
                reader: &mut R,
                len: u32,
            ) -> Result<Self, $errorname> {
                let idx = Self::decode(reader)?;
                idx.resolve(len)?;
                Ok(idx)
            }
        }
    };
}

define_index_decoder!(TypeIdx, DecodeTypeIdxError);
define_index_decoder!(FuncIdx, DecodeFuncIdxError);
define_index_decoder!(TableIdx, DecodeTableIdxError);
define_index_decoder!(MemIdx, DecodeMemIdxError);
define_index_decoder!(GlobalIdx, DecodeGlobalIdxError);
define_index_decoder!(ElemIdx, DecodeElemIdxError);
define_index_decoder!(DataIdx, DecodeDataIdxError);
define_index_decoder!(LocalIdx, DecodeLocalIdxError);
define_index_decoder!(LabelIdx, DecodeLabelIdxError);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indices::IndexSpace;
    use std::io::Cursor;

    #[test]
    fn decode_within_rejects_forward_references() {
        assert_eq!(FuncIdx::decode_within(&mut Cursor::new([0x01]), 2).unwrap(), FuncIdx(1));

        let err = FuncIdx::decode_within(&mut Cursor::new([0x02]), 2).unwrap_err();
        match err {
            DecodeFuncIdxError::Unresolved(ReferenceError { space, index, len }) => {
                assert_eq!((space, index, len), (IndexSpace::Func, 2, 2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

use crate::core::types::reftype::RefType;
use crate::core::types::tabletype::TableType;
use crate::decode::types::limits::{ParseLimitsError, parse_limits};
use crate::decode::types::reftype::DecodeRefTypeError;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeTableTypeError {
    #[error("failed decoding table element type")]
    ElementType(#[source] DecodeRefTypeError),

    #[error("failed decoding table limits")]
    Limits(#[source] ParseLimitsError),
}

impl TableType {
    /// Reads the element reference type, then the limits.
    pub(crate) fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, DecodeTableTypeError> {
        Ok(TableType {
            reftype: RefType::decode(reader).map_err(DecodeTableTypeError::ElementType)?,
            limits: parse_limits(reader).map_err(DecodeTableTypeError::Limits)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::limits::Limits;
    use std::io::Cursor;

    #[test]
    fn decodes_reftype_then_limits() {
        let tt = TableType::decode(&mut Cursor::new([0x6F, 0x01, 0x02, 0x08])).unwrap();
        assert_eq!(tt.reftype, RefType::Extern);
        assert_eq!(tt.limits, Limits::new(2, Some(8)).unwrap());
    }

    #[test]
    fn rejects_numeric_element_types() {
        match TableType::decode(&mut Cursor::new([0x7F, 0x00, 0x01])).unwrap_err() {
            DecodeTableTypeError::ElementType(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

use crate::core::types::memtype::MemType;
use crate::decode::types::limits::{ParseLimitsError, parse_limits};
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed decoding Memory type")]
pub struct DecodeMemoryTypeError(#[from] pub ParseLimitsError);

impl MemType {
    pub(crate) fn decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, DecodeMemoryTypeError> {
        let limits = parse_limits(reader)?;
        Ok(MemType { limits })
    }
}

use crate::core::types::limits::{InvalidLimitsError, Limits};
use crate::decode::integer::{DecodeU32Error, decode_u32};
use crate::decode::read_byte;
use std::io::{self, Read};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseLimitsError {
    #[error("failed reading flag byte")]
    ReadFlagByte(io::Error),

    #[error("unexpected Limits flag byte: expected 0x00 or 0x01; got {0:#04X}")]
    UnexpectedFlagByte(u8),

    #[error("failed reading minimum limit")]
    ReadMinLimit(DecodeU32Error),

    #[error("failed reading maximum limit")]
    ReadMaxLimit(DecodeU32Error),

    #[error(transparent)]
    Invalid(#[from] InvalidLimitsError),
}

pub(super) fn parse_limits<R: Read + ?Sized>(reader: &mut R) -> Result<Limits, ParseLimitsError> {
    let has_max = match read_byte(reader).map_err(ParseLimitsError::ReadFlagByte)? {
        0x00 => false,
        0x01 => true,
        n => return Err(ParseLimitsError::UnexpectedFlagByte(n)),
    };

    let min = decode_u32(reader).map_err(ParseLimitsError::ReadMinLimit)?;
    let max = if has_max {
        Some(decode_u32(reader).map_err(ParseLimitsError::ReadMaxLimit)?)
    } else {
        None
    };

    Ok(Limits::new(min, max)?)
}

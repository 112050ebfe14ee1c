use crate::decode::integer::{DecodeU32Error, decode_u32};
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed decoding Data Count section")]
pub struct DecodeDataCountSectionError(#[from] pub DecodeU32Error);

/// The declared number of data segments. Checked against the Data section
/// once both are decoded.
pub(crate) fn decode_datacount_section<R: Read + ?Sized>(
    reader: &mut R,
) -> Result<u32, DecodeDataCountSectionError> {
    Ok(decode_u32(reader)?)
}

use crate::core::sections::TypeSection;
use crate::core::types::FuncType;
use crate::decode::helpers::{DecodeVectorError, decode_vector};
use crate::decode::types::DecodeFuncTypeError;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeTypeSectionError {
    #[error("failed decoding Type section")]
    DecodeVector(#[from] DecodeVectorError<DecodeFuncTypeError>),
}

/// Entries are kept in wire order, without interning, so that type indices
/// stay what the binary says.
pub(crate) fn decode_type_section<R: Read + ?Sized>(
    reader: &mut R,
) -> Result<TypeSection, DecodeTypeSectionError> {
    let mut types = TypeSection::default();
    for ft in decode_vector(reader, FuncType::decode)? {
        types.push(ft);
    }
    Ok(types)
}

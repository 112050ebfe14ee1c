use crate::core::indices::TypeIdx;
use crate::core::sections::FunctionSection;
use crate::decode::helpers::{DecodeVectorError, decode_vector};
use crate::decode::indices::DecodeTypeIdxError;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeFunctionSectionError {
    #[error("failed decoding Function section")]
    DecodeVector(#[from] DecodeVectorError<DecodeTypeIdxError>),
}

pub(crate) fn decode_function_section<R: Read + ?Sized>(
    reader: &mut R,
    types: u32,
) -> Result<FunctionSection, DecodeFunctionSectionError> {
    let mut functions = FunctionSection::default();
    for t in decode_vector(reader, |r| TypeIdx::decode_within(r, types))? {
        functions.push(t);
    }
    Ok(functions)
}

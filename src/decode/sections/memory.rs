use crate::core::sections::MemorySection;
use crate::core::types::MemType;
use crate::decode::helpers::{DecodeVectorError, decode_vector};
use crate::decode::types::DecodeMemoryTypeError;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeMemorySectionError {
    #[error("failed decoding Memory section")]
    DecodeVector(#[from] DecodeVectorError<DecodeMemoryTypeError>),
}

pub(crate) fn decode_memory_section<R: Read + ?Sized>(
    reader: &mut R,
) -> Result<MemorySection, DecodeMemorySectionError> {
    let mut memories = MemorySection::default();
    for mt in decode_vector(reader, MemType::decode)? {
        memories.push(mt);
    }
    Ok(memories)
}

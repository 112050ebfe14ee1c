use crate::core::sections::TableSection;
use crate::core::types::TableType;
use crate::decode::helpers::{DecodeVectorError, decode_vector};
use crate::decode::types::DecodeTableTypeError;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeTableSectionError {
    #[error("failed decoding Table section")]
    DecodeVector(#[from] DecodeVectorError<DecodeTableTypeError>),
}

pub(crate) fn decode_table_section<R: Read + ?Sized>(
    reader: &mut R,
) -> Result<TableSection, DecodeTableSectionError> {
    let mut tables = TableSection::default();
    for tt in decode_vector(reader, TableType::decode)? {
        tables.push(tt);
    }
    Ok(tables)
}

use crate::core::indices::TypeIdx;
use crate::core::sections::{Import, ImportDesc, ImportSection};
use crate::core::types::{GlobalType, MemType, TableType};
use crate::decode::helpers::{DecodeNameError, DecodeVectorError, decode_name, decode_vector};
use crate::decode::indices::DecodeTypeIdxError;
use crate::decode::read_byte;
use crate::decode::types::{DecodeGlobalTypeError, DecodeMemoryTypeError, DecodeTableTypeError};
use std::io;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeImportSectionError {
    #[error("failed decoding Import section")]
    DecodeVector(#[from] DecodeVectorError<DecodeImportError>),
}

/// Function imports refer to the first `types` entries of the Type section.
pub(crate) fn decode_import_section<R: Read + ?Sized>(
    reader: &mut R,
    types: u32,
) -> Result<ImportSection, DecodeImportSectionError> {
    let mut imports = ImportSection::default();
    for import in decode_vector(reader, |r| parse_import(r, types))? {
        imports.push(import);
    }
    Ok(imports)
}

#[derive(Debug, Error)]
pub enum DecodeImportError {
    #[error("failed decoding module name")]
    DecodeModuleName(DecodeNameError),

    #[error("failed decoding entity name")]
    DecodeName(DecodeNameError),

    #[error("failed reading Import descriptor marker byte")]
    ReadDescriptorMarkerByte(io::Error),

    #[error(transparent)]
    DecodeTypeIdx(#[from] DecodeTypeIdxError),

    #[error(transparent)]
    DecodeTableType(#[from] DecodeTableTypeError),

    #[error(transparent)]
    DecodeMemType(#[from] DecodeMemoryTypeError),

    #[error(transparent)]
    DecodeGlobalType(#[from] DecodeGlobalTypeError),

    #[error(
        "invalid ImportDesc marker byte: expected 0x00 (func), 0x01 (table), 0x02 (mem) or 0x03 (global); got {0:#04X}"
    )]
    InvalidDescriptorMarkerByte(u8),
}

fn parse_import<R: Read + ?Sized>(reader: &mut R, types: u32) -> Result<Import, DecodeImportError> {
    let module = decode_name(reader).map_err(DecodeImportError::DecodeModuleName)?;
    let name = decode_name(reader).map_err(DecodeImportError::DecodeName)?;

    let desc = match read_byte(reader).map_err(DecodeImportError::ReadDescriptorMarkerByte)? {
        0x00 => ImportDesc::Func(TypeIdx::decode_within(reader, types)?),
        0x01 => ImportDesc::Table(TableType::decode(reader)?),
        0x02 => ImportDesc::Mem(MemType::decode(reader)?),
        0x03 => ImportDesc::Global(GlobalType::decode(reader)?),
        n => return Err(DecodeImportError::InvalidDescriptorMarkerByte(n)),
    };

    Ok(Import { module, name, desc })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indices::ReferenceError;
    use std::io::Cursor;

    #[test]
    fn function_import_must_name_a_known_type() {
        // "m" "f" func type 1
        let bytes = [0x01, 0x01, b'm', 0x01, b'f', 0x00, 0x01];

        let imports = decode_import_section(&mut Cursor::new(bytes), 2).unwrap();
        assert_eq!(imports.get(0).map(|i| &i.desc), Some(&ImportDesc::Func(TypeIdx(1))));

        let err = decode_import_section(&mut Cursor::new(bytes), 1).unwrap_err();
        match err {
            DecodeImportSectionError::DecodeVector(DecodeVectorError::ParseElement {
                position: 0,
                source: DecodeImportError::DecodeTypeIdx(DecodeTypeIdxError::Unresolved(
                    ReferenceError { index: 1, len: 1, .. },
                )),
            }) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

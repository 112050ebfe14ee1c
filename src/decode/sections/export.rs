use crate::core::indices::{FuncIdx, GlobalIdx, IndexBounds, MemIdx, TableIdx};
use crate::core::sections::{Export, ExportDesc, ExportSection};
use crate::decode::helpers::{DecodeNameError, DecodeVectorError, decode_name, decode_vector};
use crate::decode::indices::{
    DecodeFuncIdxError, DecodeGlobalIdxError, DecodeMemIdxError, DecodeTableIdxError,
};
use crate::decode::read_byte;
use std::io;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeExportSectionError {
    #[error("failed decoding Export section")]
    DecodeVector(#[from] DecodeVectorError<DecodeExportError>),
}

pub(crate) fn decode_export_section<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<ExportSection, DecodeExportSectionError> {
    let mut exports = ExportSection::default();
    for export in decode_vector(reader, |r| parse_export(r, bounds))? {
        exports.push(export);
    }
    Ok(exports)
}

#[derive(Debug, Error)]
pub enum DecodeExportError {
    #[error(transparent)]
    DecodeName(#[from] DecodeNameError),

    #[error("failed reading Export descriptor marker byte")]
    ReadDescriptorMarkerByte(io::Error),

    #[error(transparent)]
    DecodeFuncIdx(#[from] DecodeFuncIdxError),

    #[error(transparent)]
    DecodeTableIdx(#[from] DecodeTableIdxError),

    #[error(transparent)]
    DecodeMemIdx(#[from] DecodeMemIdxError),

    #[error(transparent)]
    DecodeGlobalIdx(#[from] DecodeGlobalIdxError),

    #[error(
        "invalid ExportDesc marker byte: expected 0x00 (func), 0x01 (table), 0x02 (mem) or 0x03 (global); got {0:#04X}"
    )]
    InvalidDescriptorMarkerByte(u8),
}

// name uniqueness is checked by module validation
fn parse_export<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<Export, DecodeExportError> {
    let name = decode_name(reader)?;

    let desc = match read_byte(reader).map_err(DecodeExportError::ReadDescriptorMarkerByte)? {
        0x00 => ExportDesc::Func(FuncIdx::decode_within(reader, bounds.funcs)?),
        0x01 => ExportDesc::Table(TableIdx::decode_within(reader, bounds.tables)?),
        0x02 => ExportDesc::Mem(MemIdx::decode_within(reader, bounds.memories)?),
        0x03 => ExportDesc::Global(GlobalIdx::decode_within(reader, bounds.globals)?),
        n => return Err(DecodeExportError::InvalidDescriptorMarkerByte(n)),
    };

    Ok(Export { name, desc })
}

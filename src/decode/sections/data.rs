use crate::core::indices::{IndexBounds, MemIdx};
use crate::core::sections::{Data, DataMode, DataSection};
use crate::decode::helpers::{
    DecodeByteVectorError, DecodeVectorError, ParseExpressionError, decode_byte_vector,
    decode_expr, decode_vector,
};
use crate::decode::indices::DecodeMemIdxError;
use crate::decode::integer::{DecodeU32Error, decode_u32};
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeDataSectionError {
    #[error("failed decoding Data section")]
    DecodeVector(#[from] DecodeVectorError<DecodeDataSegmentError>),
}

pub(crate) fn decode_data_section<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<DataSection, DecodeDataSectionError> {
    let bounds = bounds.constant();
    let mut datas = DataSection::default();
    for data in decode_vector(reader, |r| parse_data(r, &bounds))? {
        datas.push(data);
    }
    Ok(datas)
}

#[derive(Debug, Error)]
pub enum DecodeDataSegmentError {
    #[error("failed decoding bitfield")]
    DecodeBitfield(DecodeU32Error),

    #[error("invalid bitfield: expected 0 (passive), 1 or 2 (active); got {0}")]
    InvalidBitfield(u32),

    #[error("failed decoding offset expression")]
    DecodeOffsetExpr(ParseExpressionError),

    #[error("failed decoding init byte vector")]
    DecodeInitVector(#[from] DecodeByteVectorError),

    #[error("failed decoding Memory index")]
    DecodeMemIdx(#[from] DecodeMemIdxError),
}

fn parse_data<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<Data, DecodeDataSegmentError> {
    let mode = match decode_u32(reader).map_err(DecodeDataSegmentError::DecodeBitfield)? {
        0 => {
            let memory = MemIdx(0);
            memory
                .resolve(bounds.memories)
                .map_err(DecodeMemIdxError::from)?;
            let offset =
                decode_expr(reader, bounds).map_err(DecodeDataSegmentError::DecodeOffsetExpr)?;
            DataMode::Active { memory, offset }
        }
        1 => DataMode::Passive,
        2 => {
            let memory = MemIdx::decode_within(reader, bounds.memories)?;
            let offset =
                decode_expr(reader, bounds).map_err(DecodeDataSegmentError::DecodeOffsetExpr)?;
            DataMode::Active { memory, offset }
        }
        n => return Err(DecodeDataSegmentError::InvalidBitfield(n)),
    };

    Ok(Data {
        init: decode_byte_vector(reader)?,
        mode,
    })
}

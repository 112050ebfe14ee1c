use crate::core::indices::IndexBounds;
use crate::core::sections::{Code, CodeSection, Local};
use crate::core::types::ValType;
use crate::decode::helpers::{DecodeVectorError, ParseExpressionError};
use crate::decode::helpers::{decode_array, decode_expr, decode_vector};
use crate::decode::integer::{DecodeU32Error, decode_u32};
use crate::decode::types::DecodeValTypeError;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeCodeSectionError {
    #[error("failed decoding Code entry count")]
    DecodeLength(#[from] DecodeU32Error),

    #[error("Code section has {codes} entries for {functions} declared functions")]
    CountMismatch { codes: u32, functions: usize },

    #[error("failed decoding Code section")]
    DecodeVector(#[from] DecodeVectorError<DecodeCodeError>),
}

/// Decodes one body per defined function. `params` holds the parameter
/// count of each defined function, in Function section order.
pub(crate) fn decode_code_section<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
    params: &[u32],
) -> Result<CodeSection, DecodeCodeSectionError> {
    let codes = decode_u32(reader)?;
    if codes as usize != params.len() {
        return Err(DecodeCodeSectionError::CountMismatch {
            codes,
            functions: params.len(),
        });
    }

    let mut params = params.iter();
    let mut section = CodeSection::default();
    for code in decode_array(reader, codes, |r| {
        parse_code(r, bounds, params.next().copied().unwrap_or_default())
    })? {
        section.push(code);
    }

    Ok(section)
}

#[derive(Debug, Error)]
pub enum DecodeCodeError {
    #[error("failed decoding size of function code")]
    DecodeFunctionSize(DecodeU32Error),

    #[error("failed decoding locals vector")]
    DecodeLocalsVector(#[from] DecodeVectorError<DecodeCodeLocalsError>),

    #[error("failed decoding function body expression")]
    DecodeFunctionBody(#[from] ParseExpressionError),

    #[error(
        "Code entry size mismatch: declared {declared_bytes} bytes; consumed {consumed_bytes} (leftover: {leftover_bytes})"
    )]
    EntrySizeMismatch {
        declared_bytes: u32,
        leftover_bytes: u64,
        consumed_bytes: u64,
    },
}

fn parse_code<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
    params: u32,
) -> Result<Code, DecodeCodeError> {
    let size = decode_u32(reader).map_err(DecodeCodeError::DecodeFunctionSize)?;

    let mut reader = reader.take(size.into());
    let mut expanded_locals = u64::from(params);
    let max_locals = u64::from(u32::MAX);

    let locals = decode_vector(&mut reader, |r| {
        parse_code_local(r, &mut expanded_locals, max_locals)
    })?;

    // bounded by max_locals above
    let local_count = u32::try_from(expanded_locals).unwrap_or(u32::MAX);
    let body = decode_expr(&mut reader, &bounds.for_body(local_count))?;

    if reader.limit() != 0 {
        return Err(DecodeCodeError::EntrySizeMismatch {
            declared_bytes: size,
            leftover_bytes: reader.limit(),
            consumed_bytes: u64::from(size) - reader.limit(),
        });
    }

    Ok(Code { locals, body })
}

#[derive(Debug, Error)]
pub enum DecodeCodeLocalsError {
    #[error("failed decoding count of function locals")]
    DecodeLocalsCount(DecodeU32Error),

    #[error("too many locals: expected at most {max_locals}; got {actual_locals}")]
    LocalsCountOutOfBound { max_locals: u64, actual_locals: u64 },

    #[error("failed decoding local Value type")]
    DecodeLocalValType(#[from] DecodeValTypeError),
}

fn parse_code_local<R: Read + ?Sized>(
    reader: &mut R,
    expanded_locals: &mut u64,
    max_locals: u64,
) -> Result<Local, DecodeCodeLocalsError> {
    let count = decode_u32(reader).map_err(DecodeCodeLocalsError::DecodeLocalsCount)?;

    *expanded_locals += u64::from(count);
    if *expanded_locals > max_locals {
        return Err(DecodeCodeLocalsError::LocalsCountOutOfBound {
            max_locals,
            actual_locals: *expanded_locals,
        });
    }

    Ok(Local {
        count,
        t: ValType::decode(reader)?,
    })
}

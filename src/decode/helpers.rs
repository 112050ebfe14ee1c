use crate::core::Expr;
use crate::core::indices::IndexBounds;
use crate::core::instruction::{Ieee32, Ieee64, Instruction};
use crate::decode::instructions::{self, ParseResult};
use crate::decode::integer::{DecodeU32Error, decode_u32};
use std::io;
use std::io::Read;
use thiserror::Error;

pub(crate) fn read_byte<R: Read + ?Sized>(reader: &mut R) -> Result<u8, io::Error> {
    let mut buf = [0u8];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

#[derive(Debug, Error)]
pub enum ParseExpressionError {
    #[error("failed parsing instruction")]
    ParseInstruction(#[from] instructions::ParseError),

    #[error("unexpected Else delimiter")]
    UnexpectedElse,
}

/// Decodes an `end`-terminated instruction sequence whose references must
/// resolve within `bounds`.
pub fn decode_expr<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<Expr, ParseExpressionError> {
    let mut body = Vec::new();

    loop {
        match Instruction::parse(reader, bounds)? {
            ParseResult::Instruction(ins) => body.push(ins),
            ParseResult::End => break,

            // `Else` is only expected to appear inside `if` bodies
            ParseResult::Else => return Err(ParseExpressionError::UnexpectedElse),
        }
    }

    Ok(body)
}

#[derive(Debug, Error)]
pub enum DecodeFloat32Error {
    #[error("failed reading 4 bytes for f32")]
    ReadPayload(#[from] io::Error),
}

pub fn decode_f32<R: Read + ?Sized>(r: &mut R) -> Result<Ieee32, DecodeFloat32Error> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(Ieee32(u32::from_le_bytes(buf)))
}

#[derive(Debug, Error)]
pub enum DecodeFloat64Error {
    #[error("failed reading 8 bytes for f64")]
    ReadPayload(#[from] io::Error),
}

pub fn decode_f64<R: Read + ?Sized>(r: &mut R) -> Result<Ieee64, DecodeFloat64Error> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(Ieee64(u64::from_le_bytes(buf)))
}

#[derive(Error)]
pub enum DecodeVectorError<E> {
    #[error("failed decoding vector length")]
    DecodeLength(#[from] DecodeU32Error),

    #[error("failed parsing vector element at position {position}")]
    ParseElement { position: u32, source: E },
}

// declared lengths come from untrusted input: only this many elements are
// reserved up front
const MAX_PREALLOCATED: u32 = 1024;

/// Decodes a length-prefixed vector, calling `parse_fn` once per element.
pub fn decode_vector<R, F, T, E>(
    reader: &mut R,
    parse_fn: F,
) -> Result<Vec<T>, DecodeVectorError<E>>
where
    R: Read + ?Sized,
    F: FnMut(&mut R) -> Result<T, E>,
{
    let len = decode_u32(reader)?;
    decode_array(reader, len, parse_fn)
}

/// Decodes `len` elements without a length prefix.
pub fn decode_array<R, F, T, E>(
    reader: &mut R,
    len: u32,
    mut parse_fn: F,
) -> Result<Vec<T>, DecodeVectorError<E>>
where
    R: Read + ?Sized,
    F: FnMut(&mut R) -> Result<T, E>,
{
    let mut items = Vec::with_capacity(len.min(MAX_PREALLOCATED) as usize);
    for i in 0..len {
        let elem = parse_fn(reader).map_err(|err| DecodeVectorError::ParseElement {
            position: i,
            source: err,
        })?;
        items.push(elem);
    }

    Ok(items)
}

// we want any DecodeVectorError::ParseElement errors to also display the inner
// error type pointed to by source.
impl<E: std::fmt::Debug> std::fmt::Debug for DecodeVectorError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DecodeLength(e) => f.debug_tuple("DecodeLength").field(e).finish(),
            Self::ParseElement { position, source } => f
                .debug_struct("ParseElement")
                .field("position", position)
                .field(
                    "source",
                    &format_args!(
                        "{}::{source:#?}",
                        std::any::type_name::<E>()
                            .rsplit("::")
                            .next()
                            .unwrap_or_else(|| std::any::type_name::<E>())
                    ),
                )
                .finish(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeByteVectorError {
    #[error("failed decoding vector length")]
    DecodeLength(#[from] DecodeU32Error),

    #[error("failed reading vector elements")]
    ReadElements(#[from] io::Error),
}

pub fn decode_byte_vector<R: Read + ?Sized>(
    reader: &mut R,
) -> Result<Vec<u8>, DecodeByteVectorError> {
    let len = decode_u32(reader)?;
    let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOCATED) as usize);
    let read = reader.take(len.into()).read_to_end(&mut bytes)?;
    if read != len as usize {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(bytes)
}

#[derive(Debug, Error)]
pub enum DecodeNameError {
    #[error(transparent)]
    DecodeByteVector(#[from] DecodeByteVectorError),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub fn decode_name<R: Read + ?Sized>(reader: &mut R) -> Result<String, DecodeNameError> {
    Ok(String::from_utf8(decode_byte_vector(reader)?)?)
}

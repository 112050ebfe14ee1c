use crate::core::custom_section::NameSection;
use crate::core::indices::{FuncIdx, LocalIdx};
use crate::decode::helpers::{
    DecodeByteVectorError, DecodeNameError, DecodeVectorError, decode_byte_vector, decode_name,
    decode_vector,
};
use crate::decode::integer::{DecodeU32Error, decode_u32};
use crate::decode::read_byte;
use std::io::{self, Cursor, Read};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeCustomSectionError {
    #[error("failed decoding custom section name")]
    DecodeName(#[from] DecodeNameError),

    #[error("failed reading custom section contents")]
    Io(#[from] io::Error),
}

/// Splits a custom section into its name and uninterpreted content.
pub(crate) fn decode_custom_section<R: Read + ?Sized>(
    reader: &mut R,
) -> Result<(String, Vec<u8>), DecodeCustomSectionError> {
    let name = decode_name(reader)?;
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    Ok((name, content))
}

#[derive(Debug, Error)]
pub enum DecodeNameSectionError {
    #[error("failed reading subsection id")]
    ReadSubsectionId(io::Error),

    #[error("duplicate or out of order name subsection {0}")]
    SubsectionOutOfOrder(u8),

    #[error("failed reading name subsection {id}")]
    ReadSubsection {
        id: u8,
        #[source]
        source: DecodeByteVectorError,
    },

    #[error("failed decoding module name")]
    ModuleName(#[source] DecodeNameError),

    #[error("failed decoding function names")]
    FunctionNames(#[source] DecodeVectorError<DecodeNameAssocError>),

    #[error("failed decoding local names")]
    LocalNames(#[source] DecodeVectorError<DecodeIndirectNameAssocError>),

    #[error("name subsection {id} has {leftover} trailing bytes")]
    SubsectionSizeMismatch { id: u8, leftover: usize },
}

#[derive(Debug, Error)]
pub enum DecodeNameAssocError {
    #[error("failed decoding index")]
    Index(#[from] DecodeU32Error),

    #[error(transparent)]
    Name(#[from] DecodeNameError),
}

#[derive(Debug, Error)]
pub enum DecodeIndirectNameAssocError {
    #[error("failed decoding function index")]
    Index(#[from] DecodeU32Error),

    #[error("failed decoding local name map")]
    Names(#[from] DecodeVectorError<DecodeNameAssocError>),
}

fn parse_name_assoc<R: Read + ?Sized>(reader: &mut R) -> Result<(u32, String), DecodeNameAssocError> {
    Ok((decode_u32(reader)?, decode_name(reader)?))
}

fn parse_indirect_name_assoc<R: Read + ?Sized>(
    reader: &mut R,
) -> Result<(FuncIdx, Vec<(LocalIdx, String)>), DecodeIndirectNameAssocError> {
    let func = FuncIdx(decode_u32(reader)?);
    let names = decode_vector(reader, parse_name_assoc)?
        .into_iter()
        .map(|(idx, name)| (LocalIdx(idx), name))
        .collect();
    Ok((func, names))
}

/// Interprets the content of a `name` custom section.
///
/// <https://www.w3.org/TR/wasm-core-2/#name-section>
pub(crate) fn decode_name_section(content: &[u8]) -> Result<NameSection, DecodeNameSectionError> {
    let mut reader = Cursor::new(content);
    let mut names = NameSection::default();
    let mut last_known: Option<u8> = None;

    while (reader.position() as usize) < content.len() {
        let id = read_byte(&mut reader).map_err(DecodeNameSectionError::ReadSubsectionId)?;
        let payload = decode_byte_vector(&mut reader)
            .map_err(|source| DecodeNameSectionError::ReadSubsection { id, source })?;

        if id > NameSection::LOCAL_SUBSECTION {
            names.unknown.push((id, payload));
            continue;
        }
        if last_known.is_some_and(|last| id <= last) {
            return Err(DecodeNameSectionError::SubsectionOutOfOrder(id));
        }
        last_known = Some(id);

        let mut sub = Cursor::new(payload.as_slice());
        match id {
            NameSection::MODULE_SUBSECTION => {
                names.module =
                    Some(decode_name(&mut sub).map_err(DecodeNameSectionError::ModuleName)?);
            }
            NameSection::FUNCTION_SUBSECTION => {
                names.functions = decode_vector(&mut sub, parse_name_assoc)
                    .map_err(DecodeNameSectionError::FunctionNames)?
                    .into_iter()
                    .map(|(idx, name)| (FuncIdx(idx), name))
                    .collect();
            }
            _ => {
                names.locals = decode_vector(&mut sub, parse_indirect_name_assoc)
                    .map_err(DecodeNameSectionError::LocalNames)?;
            }
        }

        let leftover = payload.len() - sub.position() as usize;
        if leftover != 0 {
            return Err(DecodeNameSectionError::SubsectionSizeMismatch { id, leftover });
        }
    }

    Ok(names)
}

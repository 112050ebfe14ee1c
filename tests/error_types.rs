use pretty_assertions::assert_eq;
use wacodec::core::SectionKind;
use wacodec::core::indices::{IndexSpace, ReferenceError};
use wacodec::decode::indices::DecodeTypeIdxError;
use wacodec::decode::instructions::ParseError;
use wacodec::decode::integer::DecodeU32Error;
use wacodec::decode::sections::{DecodeCodeError, DecodeCodeSectionError, DecodeFunctionSectionError};
use wacodec::decode::{
    DecodeSectionHeaderError, DecodeVectorError, InvalidSectionIdError, ParseExpressionError,
    ParsePreambleError,
};
use wacodec::{DecodeModuleError, decode_module};

const PREAMBLE: [u8; 8] = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

// type 0: [] -> []
const TYPE_SECTION: &[u8] = &[0x01, 0x04, 0x01, 0x60, 0x00, 0x00];
// one function of type 0
const FUNCTION_SECTION: &[u8] = &[0x03, 0x02, 0x01, 0x00];

fn decode(sections: &[&[u8]]) -> Result<wacodec::Module, DecodeModuleError> {
    let mut bytes = PREAMBLE.to_vec();
    for section in sections {
        bytes.extend_from_slice(section);
    }
    decode_module(bytes.as_slice())
}

/// A single-function module whose body is `body` followed by `end`.
fn decode_body(body: &[u8]) -> Result<wacodec::Module, DecodeModuleError> {
    let mut entry = vec![0x00]; // no locals
    entry.extend_from_slice(body);
    entry.push(0x0B);

    let mut code = vec![0x0A, (entry.len() + 2) as u8, 0x01, entry.len() as u8];
    code.extend_from_slice(&entry);
    decode(&[TYPE_SECTION, FUNCTION_SECTION, &code])
}

fn instruction_error(err: DecodeModuleError) -> ParseError {
    match err {
        DecodeModuleError::DecodeCodeSection(DecodeCodeSectionError::DecodeVector(
            DecodeVectorError::ParseElement {
                source:
                    DecodeCodeError::DecodeFunctionBody(ParseExpressionError::ParseInstruction(err)),
                ..
            },
        )) => err,
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn preamble_errors() {
    let err = decode_module(&PREAMBLE[..4]).unwrap_err();
    match err {
        DecodeModuleError::ParsePreamble(ParsePreambleError::Io(_)) => {}
        other => panic!("unexpected error: {other:?}"),
    }

    let err = decode_module(&[0x00, 0x61, 0x73, 0x6D, 0x02, 0x00, 0x00, 0x00][..]).unwrap_err();
    match err {
        DecodeModuleError::ParsePreamble(ParsePreambleError::Unexpected(got)) => {
            assert_eq!(got[4], 0x02)
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn invalid_section_id() {
    match decode(&[&[0x0D, 0x00]]).unwrap_err() {
        DecodeModuleError::DecodeSectionHeader(DecodeSectionHeaderError::InvalidSectionId(
            InvalidSectionIdError(id),
        )) => assert_eq!(id, 0x0D),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn overlong_section_size() {
    match decode(&[&[0x01, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00]]).unwrap_err() {
        DecodeModuleError::DecodeSectionHeader(DecodeSectionHeaderError::DecodeSectionSize(
            DecodeU32Error::RepresentationTooLong,
        )) => {}
        other => panic!("unexpected error: {other:?}"),
    }

    match decode(&[&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x1F]]).unwrap_err() {
        DecodeModuleError::DecodeSectionHeader(DecodeSectionHeaderError::DecodeSectionSize(
            DecodeU32Error::TooLarge,
        )) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn truncated_section() {
    match decode(&[&[0x01, 0x05, 0x01]]).unwrap_err() {
        DecodeModuleError::SectionSizeMismatch {
            section_kind,
            declared,
            got,
        } => {
            assert_eq!(section_kind, SectionKind::Type);
            assert_eq!(declared, 5);
            assert_eq!(got, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn section_with_trailing_bytes() {
    match decode(&[&[0x01, 0x05, 0x01, 0x60, 0x00, 0x00, 0x00]]).unwrap_err() {
        DecodeModuleError::SectionSizeMismatch {
            section_kind,
            declared,
            got,
        } => {
            assert_eq!(section_kind, SectionKind::Type);
            assert_eq!(declared, 5);
            assert_eq!(got, 4);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unresolved_type_index() {
    match decode(&[FUNCTION_SECTION, &[0x0A, 0x04, 0x01, 0x02, 0x00, 0x0B]]).unwrap_err() {
        DecodeModuleError::DecodeFunctionSection(DecodeFunctionSectionError::DecodeVector(
            DecodeVectorError::ParseElement {
                position,
                source: DecodeTypeIdxError::Unresolved(err),
            },
        )) => {
            assert_eq!(position, 0);
            assert_eq!(
                err,
                ReferenceError {
                    space: IndexSpace::Type,
                    index: 0,
                    len: 0
                }
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_code_section() {
    match decode(&[TYPE_SECTION, FUNCTION_SECTION]).unwrap_err() {
        DecodeModuleError::CodeFuncEntriesLenMismatch {
            codes_len,
            funcs_len,
        } => {
            assert_eq!(codes_len, 0);
            assert_eq!(funcs_len, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn code_count_mismatch() {
    match decode(&[TYPE_SECTION, FUNCTION_SECTION, &[0x0A, 0x01, 0x00]]).unwrap_err() {
        DecodeModuleError::DecodeCodeSection(DecodeCodeSectionError::CountMismatch {
            codes,
            functions,
        }) => {
            assert_eq!(codes, 0);
            assert_eq!(functions, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn invalid_opcodes() {
    match instruction_error(decode_body(&[0x06]).unwrap_err()) {
        ParseError::InvalidOpcode(op) => assert_eq!(op, 0x06),
        other => panic!("unexpected error: {other:?}"),
    }

    match instruction_error(decode_body(&[0xFC, 0x63]).unwrap_err()) {
        ParseError::InvalidExtensionOpcode { prefix, code } => {
            assert_eq!(prefix, 0xFC);
            assert_eq!(code, 0x63);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unresolved_call() {
    match instruction_error(decode_body(&[0x10, 0x05]).unwrap_err()) {
        ParseError::Unresolved(err) => assert_eq!(
            err,
            ReferenceError {
                space: IndexSpace::Func,
                index: 5,
                len: 1
            }
        ),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn data_count_mismatch() {
    let err = decode(&[
        &[0x0C, 0x01, 0x02],             // DataCount: 2
        &[0x0B, 0x03, 0x01, 0x01, 0x00], // one passive segment
    ])
    .unwrap_err();

    match err {
        DecodeModuleError::DataCountDatasLenMismatch {
            datas_len,
            data_count,
        } => {
            assert_eq!(datas_len, 1);
            assert_eq!(data_count, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn data_index_without_data_count() {
    let err = decode(&[
        TYPE_SECTION,
        FUNCTION_SECTION,
        &[0x0A, 0x07, 0x01, 0x05, 0x00, 0xFC, 0x09, 0x00, 0x0B], // data.drop 0
        &[0x0B, 0x03, 0x01, 0x01, 0x00],
    ])
    .unwrap_err();

    match err {
        DecodeModuleError::DataIndexWithoutDataCount => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn errors_keep_their_source_chain() {
    let err = decode_body(&[0x10, 0x05]).unwrap_err();

    let mut chain = Vec::new();
    let mut source: Option<&dyn std::error::Error> = Some(&err);
    while let Some(e) = source {
        chain.push(e.to_string());
        source = e.source();
    }

    assert_eq!(chain.first().map(String::as_str), Some("failed decoding Code section"));
    assert!(chain.len() > 2, "{chain:?}");
}

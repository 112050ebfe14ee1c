use crate::core::custom_section::{CustomContent, CustomSection, NameSection, Placement};
use crate::core::sections::count;
use crate::core::{Module, SectionHeader, SectionKind};
use crate::decode::FromMarkerByte;
use crate::decode::integer::{DecodeU32Error, decode_u32};
use crate::decode::read_byte;
use crate::decode::sections::*;
use log::{debug, trace};
use phf::phf_ordered_map;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use thiserror::Error;

pub(crate) const MAGIC_NUMBER: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];
pub(crate) const VERSION: u32 = 1;

static EXPECTED_PREAMBLE: [u8; 8] = [
    MAGIC_NUMBER[0],
    MAGIC_NUMBER[1],
    MAGIC_NUMBER[2],
    MAGIC_NUMBER[3],
    VERSION as u8,
    0x00,
    0x00,
    0x00,
];

#[derive(Debug, Error)]
#[error("invalid section ID: expected one of {markers}; got {0:#04X}", markers=SectionKind::markers_formatted())]
pub struct InvalidSectionIdError(pub u8);

impl From<u8> for InvalidSectionIdError {
    fn from(b: u8) -> Self {
        Self(b)
    }
}

// Valid marker bytes for [SectionKind].
#[expect(non_upper_case_globals)]
static SectionId_MARKERS: phf::OrderedMap<u8, SectionKind> = phf_ordered_map! {
            0u8 => SectionKind::Custom,
            1u8 => SectionKind::Type,
            2u8 => SectionKind::Import,
            3u8 => SectionKind::Function,
            4u8 => SectionKind::Table,
            5u8 => SectionKind::Memory,
            6u8 => SectionKind::Global,
            7u8 => SectionKind::Export,
            8u8 => SectionKind::Start,
            9u8 => SectionKind::Element,
            10u8 => SectionKind::Code,
            11u8 => SectionKind::Data,
            12u8 => SectionKind::DataCount,
};

impl FromMarkerByte for SectionKind {
    type Error = InvalidSectionIdError;

    fn markers() -> &'static phf::OrderedMap<u8, Self> {
        &SectionId_MARKERS
    }
}

/// The top-level error that may occur when attempting to decode bytes into
/// a [Module].
///
/// Encompasses all possible errors that may occur during decoding,
/// including section-specific errors.
#[derive(Debug, Error)]
pub enum DecodeModuleError {
    #[error(transparent)]
    ParsePreamble(#[from] ParsePreambleError),

    #[error("number of Code entries does not match number of Function entries")]
    CodeFuncEntriesLenMismatch { codes_len: usize, funcs_len: usize },

    #[error("failed reading {section_kind:?} section")]
    ReadSection {
        section_kind: SectionKind,
        #[source]
        source: io::Error,
    },

    #[error("encountered duplicate section: {0:?}")]
    DuplicateSection(SectionKind),

    #[error("{section_kind:?} section size mismatch: declared {declared} bytes; got {got}")]
    SectionSizeMismatch {
        section_kind: SectionKind,
        declared: u32,
        got: u64,
    },

    #[error(
        "Data Count section does not match Datas length: declared {data_count}; got {datas_len}"
    )]
    DataCountDatasLenMismatch { datas_len: usize, data_count: u32 },

    #[error("Data index was present in Code section, but Data Count section is missing")]
    DataIndexWithoutDataCount,

    // section-specific errors
    #[error(transparent)]
    DecodeSectionHeader(#[from] DecodeSectionHeaderError),

    #[error(transparent)]
    DecodeCustomSection(#[from] DecodeCustomSectionError),

    #[error(transparent)]
    DecodeTypeSection(#[from] DecodeTypeSectionError),

    #[error(transparent)]
    DecodeImportSection(#[from] DecodeImportSectionError),

    #[error(transparent)]
    DecodeFunctionSection(#[from] DecodeFunctionSectionError),

    #[error(transparent)]
    DecodeTableSection(#[from] DecodeTableSectionError),

    #[error(transparent)]
    DecodeMemorySection(#[from] DecodeMemorySectionError),

    #[error(transparent)]
    DecodeGlobalSection(#[from] DecodeGlobalSectionError),

    #[error(transparent)]
    DecodeExportSection(#[from] DecodeExportSectionError),

    #[error(transparent)]
    DecodeStartSection(#[from] DecodeStartSectionError),

    #[error(transparent)]
    DecodeElementSection(#[from] DecodeElementSectionError),

    #[error(transparent)]
    DecodeDatacountSection(#[from] DecodeDataCountSectionError),

    #[error(transparent)]
    DecodeCodeSection(#[from] DecodeCodeSectionError),

    #[error(transparent)]
    DecodeDataSection(#[from] DecodeDataSectionError),
}

/// The raw content of one section, as found in the binary.
struct RawSection {
    header: SectionHeader,
    content: Vec<u8>,
}

/// Decode `input` into a WebAssembly [Module].
///
/// Standard sections may appear in any physical order but at most once each.
/// They are decoded in precedence order, so that every index refers to a
/// section decoded before it. A custom section is placed after the last
/// standard section preceding it in the binary.
pub fn decode_module(mut input: impl Read) -> Result<Module, DecodeModuleError> {
    parse_preamble(&mut input)?;

    let mut standard: BTreeMap<SectionKind, RawSection> = BTreeMap::new();
    let mut customs: Vec<(Placement, RawSection)> = Vec::new();
    let mut last_standard: Option<SectionKind> = None;

    while let Some(header) = decode_section_header(&mut input)? {
        let content = read_section(&mut input, header)?;
        trace!("read {} section ({} bytes)", header.kind, header.size);

        let raw = RawSection { header, content };
        if header.kind == SectionKind::Custom {
            let placement = match last_standard {
                Some(kind) => Placement::After(kind),
                None => Placement::Before(SectionKind::Type),
            };
            customs.push((placement, raw));
            continue;
        }

        if standard.insert(header.kind, raw).is_some() {
            return Err(DecodeModuleError::DuplicateSection(header.kind));
        }
        last_standard = Some(header.kind);
    }

    let mut module = Module::new();
    let mut take = |kind: SectionKind| standard.remove(&kind);

    if let Some(raw) = take(SectionKind::Type) {
        module.types = decode_section(&raw, decode_type_section)?;
    }
    if let Some(raw) = take(SectionKind::Import) {
        let types = count(module.types.len());
        module.imports = decode_section(&raw, |r| decode_import_section(r, types))?;
    }
    if let Some(raw) = take(SectionKind::Function) {
        let types = count(module.types.len());
        module.functions = decode_section(&raw, |r| decode_function_section(r, types))?;
    }
    if let Some(raw) = take(SectionKind::Table) {
        module.tables = decode_section(&raw, decode_table_section)?;
    }
    if let Some(raw) = take(SectionKind::Memory) {
        module.memories = decode_section(&raw, decode_memory_section)?;
    }
    if let Some(raw) = take(SectionKind::Global) {
        let bounds = module.bounds();
        module.globals = decode_section(&raw, |r| decode_global_section(r, &bounds))?;
    }
    if let Some(raw) = take(SectionKind::Export) {
        let bounds = module.bounds();
        module.exports = decode_section(&raw, |r| decode_export_section(r, &bounds))?;
    }
    if let Some(raw) = take(SectionKind::Start) {
        let funcs = module.func_count();
        module.start = decode_section(&raw, |r| decode_start_section(r, funcs))?;
    }
    if let Some(raw) = take(SectionKind::Element) {
        let bounds = module.bounds();
        module.elements = decode_section(&raw, |r| decode_element_section(r, &bounds))?;
    }
    let data_count = match take(SectionKind::DataCount) {
        Some(raw) => Some(decode_section(&raw, decode_datacount_section)?),
        None => None,
    };
    if let Some(raw) = take(SectionKind::Data) {
        let bounds = module.bounds();
        module.datas = decode_section(&raw, |r| decode_data_section(r, &bounds))?;
    }
    match take(SectionKind::Code) {
        Some(raw) => {
            let bounds = module.bounds();
            let params: Vec<u32> = module
                .functions
                .iter()
                .map(|t| {
                    module
                        .types
                        .get(t.0 as usize)
                        .map_or(0, |ft| count(ft.parameters.len()))
                })
                .collect();
            module.codes = decode_section(&raw, |r| decode_code_section(r, &bounds, &params))?;
        }
        // the Code section may only be left out when no function is defined
        None if !module.functions.is_empty() => {
            return Err(DecodeModuleError::CodeFuncEntriesLenMismatch {
                funcs_len: module.functions.len(),
                codes_len: 0,
            });
        }
        None => {}
    }

    // the optional data count must match the length of the data segment vector
    if let Some(n) = data_count
        && n as usize != module.datas.len()
    {
        return Err(DecodeModuleError::DataCountDatasLenMismatch {
            datas_len: module.datas.len(),
            data_count: n,
        });
    }

    // and it must be present if any data index occurs in the code section
    if data_count.is_none() && module.uses_data_indices() {
        return Err(DecodeModuleError::DataIndexWithoutDataCount);
    }

    for (placement, raw) in customs {
        let (name, bytes) = decode_section(&raw, decode_custom_section)?;
        let content = if name == CustomSection::NAME_SECTION {
            match decode_name_section(&bytes) {
                Ok(names) => CustomContent::Names(names),
                Err(err) => {
                    debug!("keeping malformed name section as raw bytes: {err}");
                    CustomContent::Raw(bytes)
                }
            }
        } else {
            CustomContent::Raw(bytes)
        };
        module.add_custom(CustomSection {
            name,
            placement,
            content,
        });
    }

    debug!(
        "decoded module: {} types, {} imports, {} functions, {} custom sections",
        module.types.len(),
        module.imports.len(),
        module.functions.len(),
        module.customs.len()
    );

    Ok(module)
}

fn read_section<R: Read + ?Sized>(
    reader: &mut R,
    header: SectionHeader,
) -> Result<Vec<u8>, DecodeModuleError> {
    let mut content = Vec::new();
    reader
        .take(header.size.into())
        .read_to_end(&mut content)
        .map_err(|source| DecodeModuleError::ReadSection {
            section_kind: header.kind,
            source,
        })?;

    if content.len() != header.size as usize {
        return Err(DecodeModuleError::SectionSizeMismatch {
            section_kind: header.kind,
            declared: header.size,
            got: content.len() as u64,
        });
    }

    Ok(content)
}

/// Runs a section decoder over the section's content, which it must consume
/// exactly.
fn decode_section<'a, T, E, F>(raw: &'a RawSection, decode: F) -> Result<T, DecodeModuleError>
where
    F: FnOnce(&mut Cursor<&'a [u8]>) -> Result<T, E>,
    DecodeModuleError: From<E>,
{
    let mut reader = Cursor::new(raw.content.as_slice());
    let section = decode(&mut reader)?;

    if reader.position() != raw.content.len() as u64 {
        return Err(DecodeModuleError::SectionSizeMismatch {
            section_kind: raw.header.kind,
            declared: raw.header.size,
            got: reader.position(),
        });
    }

    debug!("decoded {} section", raw.header.kind);
    Ok(section)
}

#[derive(Debug, Error)]
pub enum ParsePreambleError {
    #[error("failed decoding preamble")]
    Io(#[from] io::Error),

    #[error("unexpected preamble: expected {preamble:#X?}; got {0:#X?}", preamble=EXPECTED_PREAMBLE)]
    Unexpected([u8; 8]),
}

fn parse_preamble<R: Read + ?Sized>(reader: &mut R) -> Result<(), ParsePreambleError> {
    let mut preamble = [0u8; 8];
    reader.read_exact(&mut preamble)?;

    if preamble != EXPECTED_PREAMBLE {
        return Err(ParsePreambleError::Unexpected(preamble));
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum DecodeSectionHeaderError {
    #[error("failed reading section ID byte")]
    ReadSectionIdByte(#[from] io::Error),

    #[error("invalid section ID")]
    InvalidSectionId(#[from] InvalidSectionIdError),

    #[error("failed decoding section size")]
    DecodeSectionSize(#[from] DecodeU32Error),
}

fn decode_section_header<R: Read + ?Sized>(
    reader: &mut R,
) -> Result<Option<SectionHeader>, DecodeSectionHeaderError> {
    let id = match read_byte(reader) {
        Ok(id) => id,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let kind = SectionKind::from_marker(id)?;
    let size = decode_u32(reader)?;

    Ok(Some(SectionHeader { kind, size }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indices::FuncIdx;

    fn module_bytes(sections: &[&[u8]]) -> Vec<u8> {
        let mut bytes = EXPECTED_PREAMBLE.to_vec();
        for s in sections {
            bytes.extend_from_slice(s);
        }
        bytes
    }

    #[test]
    fn sections_decode_in_precedence_order_whatever_their_position() {
        // Export section referring to a function, written before the Type,
        // Function and Code sections it depends on.
        let bytes = module_bytes(&[
            &[0x07, 0x05, 0x01, 0x01, b'f', 0x00, 0x00],
            &[0x01, 0x04, 0x01, 0x60, 0x00, 0x00],
            &[0x0A, 0x04, 0x01, 0x02, 0x00, 0x0B],
            &[0x03, 0x02, 0x01, 0x00],
        ]);

        let module = decode_module(bytes.as_slice()).unwrap();
        assert_eq!(module.func_count(), 1);
        assert_eq!(module.exports.find("f").map(|e| e.name.as_str()), Some("f"));
    }

    #[test]
    fn custom_sections_remember_their_neighbour() {
        let bytes = module_bytes(&[
            &[0x00, 0x03, 0x01, b'a', 0xAA],
            &[0x01, 0x01, 0x00],
            &[0x00, 0x02, 0x01, b'b'],
        ]);

        let module = decode_module(bytes.as_slice()).unwrap();
        assert_eq!(
            module.customs,
            vec![
                CustomSection::raw("a", vec![0xAAu8]).with_placement(Placement::Before(SectionKind::Type)),
                CustomSection::raw("b", Vec::<u8>::new()).with_placement(Placement::After(SectionKind::Type)),
            ]
        );
    }

    #[test]
    fn malformed_name_section_is_kept_raw() {
        // "name" with a function-name subsection claiming more bytes than present
        let bytes = module_bytes(&[&[0x00, 0x07, 0x04, b'n', b'a', b'm', b'e', 0x01, 0x05]]);

        let module = decode_module(bytes.as_slice()).unwrap();
        assert_eq!(module.customs[0].content, CustomContent::Raw(vec![0x01, 0x05]));
    }

    #[test]
    fn name_section_is_interpreted() {
        let bytes = module_bytes(&[&[
            0x00, 0x0B, 0x04, b'n', b'a', b'm', b'e', 0x01, 0x04, 0x01, 0x00, 0x01, b'f',
        ]]);

        let module = decode_module(bytes.as_slice()).unwrap();
        assert_eq!(
            module.customs[0].content,
            CustomContent::Names(NameSection {
                functions: vec![(FuncIdx(0), "f".into())],
                ..Default::default()
            })
        );
    }
}

//! Decoding of WebAssembly values, types, instructions, sections and modules.
pub(crate) mod helpers;
pub mod indices;
pub mod instructions;
pub mod integer;
mod module;
pub mod registry;
pub mod sections;
pub mod types;

pub(crate) use helpers::read_byte;
pub(crate) use module::{MAGIC_NUMBER, VERSION};
pub use helpers::{
    DecodeByteVectorError, DecodeFloat32Error, DecodeFloat64Error, DecodeNameError,
    DecodeVectorError, ParseExpressionError, decode_array, decode_byte_vector, decode_expr,
    decode_f32, decode_f64, decode_name, decode_vector,
};
pub use module::{
    DecodeModuleError, DecodeSectionHeaderError, InvalidSectionIdError, ParsePreambleError,
    decode_module,
};

pub(crate) trait FromMarkerByte
where
    Self: Sized + Copy + std::fmt::Debug + 'static,
{
    type Error: From<u8>;

    // defines the mapping between expected bytes and the corresponding value type
    fn markers() -> &'static phf::OrderedMap<u8, Self>;

    fn markers_formatted() -> String {
        Self::markers()
            .entries()
            .map(|(marker, variant)| format!("{marker:#04X} ({variant:?})"))
            .collect::<Vec<String>>()
            .join(", ")
    }

    fn from_marker(b: u8) -> Result<Self, Self::Error> {
        match Self::markers().get(&b) {
            Some(n) => Ok(*n),
            None => Err(b.into()),
        }
    }
}

//! An encoder for the binary format, the inverse of [`crate::decode`].
pub(crate) mod helpers;
pub mod instructions;
pub mod integer;
mod module;
mod sections;
pub mod types;

pub use helpers::{
    LengthOverflowError, encode_array, encode_byte_vector, encode_f32, encode_f64, encode_name,
    encode_sized, encode_vector,
};
pub use instructions::encode_expr;
pub use module::{EncodeError, encode_module};

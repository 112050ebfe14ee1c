//! A codec for WebAssembly modules in the binary format.
//!
//! This library implements the Binary format of the WebAssembly [specification],
//! version 2, in both directions, along with the type checking needed to
//! emit only well-formed modules.
//!
//! The main entry points are [`decode_module()`] and [`encode_module()`].
//! Modules can also be assembled in memory through the builder methods of
//! [`Module`].
//!
//! [specification]: https://www.w3.org/TR/wasm-core-2/
#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod decode;
pub mod encode;
pub mod validate;

pub use config::{EncodeOptions, Feature};
pub use core::Module;
pub use decode::{DecodeModuleError, decode_module};
pub use encode::{EncodeError, encode_module};
pub use validate::ValidationError;

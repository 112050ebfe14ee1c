//! Contains type definitions for all core WebAssembly types.
//!
//! <https://www.w3.org/TR/wasm-core-2/#types>
pub mod functype;
pub mod globaltype;
pub mod limits;
pub mod memtype;
pub mod reftype;
pub mod tabletype;
pub mod valtype;

pub use functype::FuncType;
pub use globaltype::{GlobalType, Mut};
pub use limits::{InvalidLimitsError, Limits};
pub use memtype::MemType;
pub use reftype::RefType;
pub use tabletype::TableType;
pub use valtype::ValType;

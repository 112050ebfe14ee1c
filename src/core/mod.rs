//! In-memory representation of a WebAssembly module.
pub mod custom_section;
pub mod indices;
pub mod instruction;
mod module;
pub mod sections;
pub mod types;

pub use custom_section::{CustomContent, CustomSection, NameSection, Placement};
pub use instruction::{BlockType, Ieee32, Ieee64, Instruction, Memarg, Opcode};
pub use module::{Module, ModuleError, SectionHeader, SectionKind};
pub use sections::{
    Code, Data, DataMode, Elem, ElemInit, ElemMode, Export, ExportDesc, Global, Import,
    ImportDesc, Local,
};

/// An instruction sequence. The terminating `end` only exists on the wire.
pub type Expr = Vec<Instruction>;

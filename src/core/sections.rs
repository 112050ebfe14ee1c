//! Containers for the standard sections of a module and the segments they own.
//!
//! Containers keep their entries private: entries that introduce an index are
//! only appended through [`Module`](crate::core::Module), which keeps the index
//! spaces consistent (imports first, one body per declared function).
use crate::core::Expr;
use crate::core::indices::*;
use crate::core::types::{FuncType, GlobalType, MemType, RefType, TableType, ValType};

macro_rules! section_container {
    ($(#[$meta:meta])* $name:ident, $item:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct $name {
            entries: Vec<$item>,
        }

        impl $name {
            pub fn entries(&self) -> &[$item] {
                &self.entries
            }

            pub fn iter(&self) -> std::slice::Iter<'_, $item> {
                self.entries.iter()
            }

            pub fn get(&self, idx: usize) -> Option<&$item> {
                self.entries.get(idx)
            }

            pub fn len(&self) -> usize {
                self.entries.len()
            }

            pub fn is_empty(&self) -> bool {
                self.entries.is_empty()
            }

            /// Appends an entry and returns its position within the section.
            pub(crate) fn push(&mut self, item: $item) -> u32 {
                self.entries.push(item);
                count(self.entries.len()) - 1
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = &'a $item;
            type IntoIter = std::slice::Iter<'a, $item>;

            fn into_iter(self) -> Self::IntoIter {
                self.entries.iter()
            }
        }
    };
}

pub(crate) fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

section_container!(
    /// Function signatures referenced by type index.
    ///
    /// <https://www.w3.org/TR/wasm-core-2/#type-section>
    TypeSection,
    FuncType
);

impl TypeSection {
    /// Returns the index of a structurally equal signature, appending a copy
    /// of `ft` if there is none yet.
    pub fn insert(&mut self, ft: &FuncType) -> TypeIdx {
        match self.entries.iter().position(|t| t == ft) {
            Some(i) => TypeIdx(count(i)),
            None => TypeIdx(self.push(ft.clone())),
        }
    }

    pub fn resolve(&self, idx: TypeIdx) -> Result<&FuncType, ReferenceError> {
        Ok(&self.entries[idx.resolve(count(self.entries.len()))?])
    }
}

/// <https://www.w3.org/TR/wasm-core-2/#imports>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub desc: ImportDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDesc {
    Func(TypeIdx),
    Table(TableType),
    Mem(MemType),
    Global(GlobalType),
}

impl ImportDesc {
    pub fn space(&self) -> IndexSpace {
        match self {
            ImportDesc::Func(_) => IndexSpace::Func,
            ImportDesc::Table(_) => IndexSpace::Table,
            ImportDesc::Mem(_) => IndexSpace::Memory,
            ImportDesc::Global(_) => IndexSpace::Global,
        }
    }
}

section_container!(
    /// <https://www.w3.org/TR/wasm-core-2/#import-section>
    ImportSection,
    Import
);

impl ImportSection {
    /// Number of imports contributing to the given index space.
    pub fn count(&self, space: IndexSpace) -> u32 {
        count(self.imports_of(space).count())
    }

    fn imports_of(&self, space: IndexSpace) -> impl Iterator<Item = &ImportDesc> {
        self.entries
            .iter()
            .map(|i| &i.desc)
            .filter(move |d| d.space() == space)
    }

    pub(crate) fn func(&self, idx: usize) -> Option<TypeIdx> {
        self.imports_of(IndexSpace::Func)
            .nth(idx)
            .and_then(|d| match d {
                ImportDesc::Func(t) => Some(*t),
                _ => None,
            })
    }

    pub(crate) fn table(&self, idx: usize) -> Option<TableType> {
        self.imports_of(IndexSpace::Table)
            .nth(idx)
            .and_then(|d| match d {
                ImportDesc::Table(t) => Some(*t),
                _ => None,
            })
    }

    pub(crate) fn memory(&self, idx: usize) -> Option<MemType> {
        self.imports_of(IndexSpace::Memory)
            .nth(idx)
            .and_then(|d| match d {
                ImportDesc::Mem(m) => Some(*m),
                _ => None,
            })
    }

    pub(crate) fn global(&self, idx: usize) -> Option<GlobalType> {
        self.imports_of(IndexSpace::Global)
            .nth(idx)
            .and_then(|d| match d {
                ImportDesc::Global(g) => Some(*g),
                _ => None,
            })
    }
}

section_container!(
    /// Signatures of the functions defined by the module, one type index per
    /// function. Bodies live at the same position in the [`CodeSection`].
    ///
    /// <https://www.w3.org/TR/wasm-core-2/#function-section>
    FunctionSection,
    TypeIdx
);

section_container!(
    /// <https://www.w3.org/TR/wasm-core-2/#table-section>
    TableSection,
    TableType
);

section_container!(
    /// <https://www.w3.org/TR/wasm-core-2/#memory-section>
    MemorySection,
    MemType
);

/// <https://www.w3.org/TR/wasm-core-2/#globals>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub r#type: GlobalType,
    pub init: Expr,
}

section_container!(
    /// <https://www.w3.org/TR/wasm-core-2/#global-section>
    GlobalSection,
    Global
);

/// <https://www.w3.org/TR/wasm-core-2/#exports>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub desc: ExportDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportDesc {
    Func(FuncIdx),
    Table(TableIdx),
    Mem(MemIdx),
    Global(GlobalIdx),
}

section_container!(
    /// <https://www.w3.org/TR/wasm-core-2/#export-section>
    ExportSection,
    Export
);

impl ExportSection {
    pub fn find(&self, name: &str) -> Option<&Export> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// <https://www.w3.org/TR/wasm-core-2/#start-section>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartSection {
    pub function: Option<FuncIdx>,
}

/// <https://www.w3.org/TR/wasm-core-2/#element-segments>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elem {
    pub r#type: RefType,
    pub init: ElemInit,
    pub mode: ElemMode,
}

/// The initial references of an element segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElemInit {
    /// Plain function indices, only valid for `funcref` segments.
    Functions(Vec<FuncIdx>),
    /// One constant expression per element.
    Expressions(Vec<Expr>),
}

impl ElemInit {
    pub fn len(&self) -> usize {
        match self {
            ElemInit::Functions(f) => f.len(),
            ElemInit::Expressions(e) => e.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElemMode {
    Active { table: TableIdx, offset: Expr },
    Passive,
    Declarative,
}

section_container!(
    /// <https://www.w3.org/TR/wasm-core-2/#element-section>
    ElementSection,
    Elem
);

/// <https://www.w3.org/TR/wasm-core-2/#data-segments>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub init: Vec<u8>,
    pub mode: DataMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataMode {
    Active { memory: MemIdx, offset: Expr },
    Passive,
}

section_container!(
    /// <https://www.w3.org/TR/wasm-core-2/#data-section>
    DataSection,
    Data
);

/// A run of `count` locals sharing one value type, as declared on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Local {
    pub count: u32,
    pub t: ValType,
}

/// The locals and body of one defined function.
///
/// <https://www.w3.org/TR/wasm-core-2/#binary-code>
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Code {
    pub locals: Vec<Local>,
    pub body: Expr,
}

impl Code {
    pub fn local_count(&self) -> u64 {
        self.locals.iter().map(|l| u64::from(l.count)).sum()
    }
}

section_container!(
    /// <https://www.w3.org/TR/wasm-core-2/#code-section>
    CodeSection,
    Code
);

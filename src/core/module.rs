use crate::core::custom_section::CustomSection;
use crate::core::indices::*;
use crate::core::instruction::BlockType;
use crate::core::sections::*;
use crate::core::types::{FuncType, GlobalType, MemType, TableType, ValType};
use crate::core::Expr;
use std::fmt;
use thiserror::Error;

/// WebAssembly programs are organized into modules, which are the unit of deployment,
/// loading, and compilation. A module collects definitions for types, functions, tables,
/// memories, and globals. In addition, it can declare imports and exports and provide
/// initialization in the form of data and element segments, or a start function.
///
/// Each standard section exists exactly once; an empty section is simply
/// left out of the binary. Custom sections are kept in insertion order.
///
/// <https://www.w3.org/TR/wasm-core-2/#modules>
/// <https://www.w3.org/TR/wasm-core-2/#binary-module>
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Module {
    pub types: TypeSection,

    /// Every import defines an index in the respective index space. In each index space, the
    /// indices of imports go before the first index of any definition contained in the module
    /// itself.
    pub imports: ImportSection,

    pub functions: FunctionSection,
    pub tables: TableSection,
    pub memories: MemorySection,
    pub globals: GlobalSection,
    pub exports: ExportSection,
    pub start: StartSection,
    pub elements: ElementSection,
    pub datas: DataSection,

    /// One body per entry of [`Self::functions`], at the same position.
    pub codes: CodeSection,

    pub customs: Vec<CustomSection>,
}

/// The standard sections and the custom section, declared in physical
/// precedence order.
///
/// Precedence differs from the numeric section id for the last three: the
/// Data Count section (id 12) is written before the Data section (id 11),
/// which is written before the Code section (id 10).
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
pub enum SectionKind {
    Type,
    Import,
    Function,
    Table,
    Memory,
    Global,
    Export,
    Start,
    Element,
    DataCount,
    Data,
    Code,
    Custom,
}

impl SectionKind {
    pub const STANDARD: [SectionKind; 12] = [
        SectionKind::Type,
        SectionKind::Import,
        SectionKind::Function,
        SectionKind::Table,
        SectionKind::Memory,
        SectionKind::Global,
        SectionKind::Export,
        SectionKind::Start,
        SectionKind::Element,
        SectionKind::DataCount,
        SectionKind::Data,
        SectionKind::Code,
    ];

    pub fn id(self) -> u8 {
        match self {
            SectionKind::Custom => 0,
            SectionKind::Type => 1,
            SectionKind::Import => 2,
            SectionKind::Function => 3,
            SectionKind::Table => 4,
            SectionKind::Memory => 5,
            SectionKind::Global => 6,
            SectionKind::Export => 7,
            SectionKind::Start => 8,
            SectionKind::Element => 9,
            SectionKind::Code => 10,
            SectionKind::Data => 11,
            SectionKind::DataCount => 12,
        }
    }

    /// Sort key of the section in the binary. Standard sections are spaced
    /// ten apart so custom sections can be placed between them.
    pub fn precedence(self) -> u32 {
        match self {
            SectionKind::Custom => u32::MAX,
            kind => (kind as u32 + 1) * 10,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Each section consists of a one-byte section id, the u32 size of the contents
/// (in bytes), and the actual contents, whose structure is dependent on the section id.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct SectionHeader {
    pub kind: SectionKind,
    pub size: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModuleError {
    #[error("cannot import into the {0} index space after a definition was added to it")]
    ImportAfterDefinition(IndexSpace),

    #[error("duplicate export name {0:?}")]
    DuplicateExport(String),

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `ft` in the Type section.
    pub fn add_type(&mut self, ft: &FuncType) -> TypeIdx {
        self.types.insert(ft)
    }

    pub fn import_func(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        r#type: TypeIdx,
    ) -> Result<FuncIdx, ModuleError> {
        r#type.resolve(count(self.types.len()))?;
        if !self.functions.is_empty() {
            return Err(ModuleError::ImportAfterDefinition(IndexSpace::Func));
        }
        let idx = self.func_count();
        self.push_import(module, name, ImportDesc::Func(r#type));
        Ok(FuncIdx(idx))
    }

    pub fn import_table(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        r#type: TableType,
    ) -> Result<TableIdx, ModuleError> {
        if !self.tables.is_empty() {
            return Err(ModuleError::ImportAfterDefinition(IndexSpace::Table));
        }
        let idx = self.table_count();
        self.push_import(module, name, ImportDesc::Table(r#type));
        Ok(TableIdx(idx))
    }

    pub fn import_memory(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        r#type: MemType,
    ) -> Result<MemIdx, ModuleError> {
        if !self.memories.is_empty() {
            return Err(ModuleError::ImportAfterDefinition(IndexSpace::Memory));
        }
        let idx = self.memory_count();
        self.push_import(module, name, ImportDesc::Mem(r#type));
        Ok(MemIdx(idx))
    }

    pub fn import_global(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        r#type: GlobalType,
    ) -> Result<GlobalIdx, ModuleError> {
        if !self.globals.is_empty() {
            return Err(ModuleError::ImportAfterDefinition(IndexSpace::Global));
        }
        let idx = self.global_count();
        self.push_import(module, name, ImportDesc::Global(r#type));
        Ok(GlobalIdx(idx))
    }

    fn push_import(&mut self, module: impl Into<String>, name: impl Into<String>, desc: ImportDesc) {
        self.imports.push(Import {
            module: module.into(),
            name: name.into(),
            desc,
        });
    }

    /// Defines a function with the given signature, declared locals (in
    /// addition to its parameters) and body.
    pub fn add_function(
        &mut self,
        r#type: TypeIdx,
        locals: Vec<Local>,
        body: Expr,
    ) -> Result<FuncIdx, ModuleError> {
        r#type.resolve(count(self.types.len()))?;
        let idx = self.func_count();
        self.functions.push(r#type);
        self.codes.push(Code { locals, body });
        Ok(FuncIdx(idx))
    }

    pub fn add_table(&mut self, r#type: TableType) -> TableIdx {
        let idx = self.table_count();
        self.tables.push(r#type);
        TableIdx(idx)
    }

    pub fn add_memory(&mut self, r#type: MemType) -> MemIdx {
        let idx = self.memory_count();
        self.memories.push(r#type);
        MemIdx(idx)
    }

    pub fn add_global(&mut self, r#type: GlobalType, init: Expr) -> GlobalIdx {
        let idx = self.global_count();
        self.globals.push(Global { r#type, init });
        GlobalIdx(idx)
    }

    pub fn add_export(
        &mut self,
        name: impl Into<String>,
        desc: ExportDesc,
    ) -> Result<(), ModuleError> {
        let name = name.into();
        if self.exports.find(&name).is_some() {
            return Err(ModuleError::DuplicateExport(name));
        }
        match desc {
            ExportDesc::Func(f) => f.resolve(self.func_count()).map(drop),
            ExportDesc::Table(t) => t.resolve(self.table_count()).map(drop),
            ExportDesc::Mem(m) => m.resolve(self.memory_count()).map(drop),
            ExportDesc::Global(g) => g.resolve(self.global_count()).map(drop),
        }?;
        self.exports.push(Export { name, desc });
        Ok(())
    }

    pub fn set_start(&mut self, function: FuncIdx) -> Result<(), ModuleError> {
        function.resolve(self.func_count())?;
        self.start.function = Some(function);
        Ok(())
    }

    pub fn add_element(&mut self, elem: Elem) -> ElemIdx {
        ElemIdx(self.elements.push(elem))
    }

    pub fn add_data(&mut self, data: Data) -> DataIdx {
        DataIdx(self.datas.push(data))
    }

    pub fn add_custom(&mut self, section: CustomSection) {
        self.customs.push(section);
    }

    pub fn func_count(&self) -> u32 {
        self.imports.count(IndexSpace::Func) + count(self.functions.len())
    }

    pub fn table_count(&self) -> u32 {
        self.imports.count(IndexSpace::Table) + count(self.tables.len())
    }

    pub fn memory_count(&self) -> u32 {
        self.imports.count(IndexSpace::Memory) + count(self.memories.len())
    }

    pub fn global_count(&self) -> u32 {
        self.imports.count(IndexSpace::Global) + count(self.globals.len())
    }

    /// Index bounds covering every entry currently in the module.
    pub fn bounds(&self) -> IndexBounds {
        IndexBounds {
            types: count(self.types.len()),
            funcs: self.func_count(),
            tables: self.table_count(),
            memories: self.memory_count(),
            globals: self.global_count(),
            elems: count(self.elements.len()),
            datas: count(self.datas.len()),
            locals: 0,
            labels: 0,
        }
    }

    /// Signature of an imported or defined function.
    pub fn func_type(&self, idx: FuncIdx) -> Result<&FuncType, ReferenceError> {
        let i = idx.resolve(self.func_count())?;
        let imported = self.imports.count(IndexSpace::Func) as usize;
        let type_idx = if i < imported {
            self.imports.func(i)
        } else {
            self.functions.get(i - imported).copied()
        };
        // in range by the resolve above
        let type_idx = type_idx.ok_or(ReferenceError {
            space: IndexSpace::Func,
            index: idx.0,
            len: self.func_count(),
        })?;
        self.types.resolve(type_idx)
    }

    pub fn table_type(&self, idx: TableIdx) -> Result<TableType, ReferenceError> {
        let i = idx.resolve(self.table_count())?;
        let imported = self.imports.count(IndexSpace::Table) as usize;
        let found = if i < imported {
            self.imports.table(i)
        } else {
            self.tables.get(i - imported).copied()
        };
        found.ok_or(ReferenceError {
            space: IndexSpace::Table,
            index: idx.0,
            len: self.table_count(),
        })
    }

    pub fn memory_type(&self, idx: MemIdx) -> Result<MemType, ReferenceError> {
        let i = idx.resolve(self.memory_count())?;
        let imported = self.imports.count(IndexSpace::Memory) as usize;
        let found = if i < imported {
            self.imports.memory(i)
        } else {
            self.memories.get(i - imported).copied()
        };
        found.ok_or(ReferenceError {
            space: IndexSpace::Memory,
            index: idx.0,
            len: self.memory_count(),
        })
    }

    pub fn global_type(&self, idx: GlobalIdx) -> Result<GlobalType, ReferenceError> {
        let i = idx.resolve(self.global_count())?;
        let imported = self.imports.count(IndexSpace::Global) as usize;
        let found = if i < imported {
            self.imports.global(i)
        } else {
            self.globals.get(i - imported).map(|g| g.r#type)
        };
        found.ok_or(ReferenceError {
            space: IndexSpace::Global,
            index: idx.0,
            len: self.global_count(),
        })
    }

    pub fn elem_type(&self, idx: ElemIdx) -> Result<ValType, ReferenceError> {
        let i = idx.resolve(count(self.elements.len()))?;
        Ok(self.elements.entries()[i].r#type.into())
    }

    /// The signature a block type stands for.
    pub fn block_signature(&self, bt: BlockType) -> Result<FuncType, ReferenceError> {
        Ok(match bt {
            BlockType::Empty => FuncType::default(),
            BlockType::Value(t) => FuncType::new([], [t]),
            BlockType::Type(idx) => self.types.resolve(idx)?.clone(),
        })
    }

    /// Whether any function body refers to a data segment by index.
    pub fn uses_data_indices(&self) -> bool {
        self.codes
            .iter()
            .any(|code| code.body.iter().any(|i| i.uses_data_index()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Limits, Mut};

    #[test]
    fn precedence_follows_declaration_order() {
        let precedences: Vec<u32> = SectionKind::STANDARD
            .iter()
            .map(|k| k.precedence())
            .collect();
        let mut sorted = precedences.clone();
        sorted.sort();
        assert_eq!(precedences, sorted);

        assert!(SectionKind::DataCount.precedence() < SectionKind::Data.precedence());
        assert!(SectionKind::Data.precedence() < SectionKind::Code.precedence());
        assert!(SectionKind::DataCount.id() > SectionKind::Data.id());
    }

    #[test]
    fn imports_come_before_definitions() {
        let mut module = Module::new();
        let t = module.add_type(&FuncType::default());

        let imported = module.import_func("env", "f", t).unwrap();
        let defined = module.add_function(t, vec![], vec![]).unwrap();
        assert_eq!(imported, FuncIdx(0));
        assert_eq!(defined, FuncIdx(1));

        assert_eq!(
            module.import_func("env", "g", t),
            Err(ModuleError::ImportAfterDefinition(IndexSpace::Func))
        );

        // other index spaces are unaffected
        let g = module
            .import_global("env", "g", GlobalType(Mut::Const, ValType::I32))
            .unwrap();
        assert_eq!(g, GlobalIdx(0));
    }

    #[test]
    fn function_lookup_spans_imports_and_definitions() {
        let mut module = Module::new();
        let unary = module.add_type(&FuncType::new([ValType::I32], []));
        let nullary = module.add_type(&FuncType::default());

        module.import_func("env", "log", unary).unwrap();
        module.add_function(nullary, vec![], vec![]).unwrap();

        assert_eq!(module.func_type(FuncIdx(0)).unwrap().parameters, [ValType::I32]);
        assert_eq!(module.func_type(FuncIdx(1)).unwrap(), &FuncType::default());
        assert!(module.func_type(FuncIdx(2)).is_err());
        assert_eq!(module.codes.len(), module.functions.len());
    }

    #[test]
    fn export_names_must_be_unique() {
        let mut module = Module::new();
        let mem = module.add_memory(MemType {
            limits: Limits::at_least(1),
        });
        module.add_export("memory", ExportDesc::Mem(mem)).unwrap();
        assert_eq!(
            module.add_export("memory", ExportDesc::Mem(mem)),
            Err(ModuleError::DuplicateExport("memory".into()))
        );
        assert!(matches!(
            module.add_export("other", ExportDesc::Mem(MemIdx(1))),
            Err(ModuleError::Reference(_))
        ));
    }
}

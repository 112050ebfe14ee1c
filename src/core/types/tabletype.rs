use crate::core::types::limits::Limits;
use crate::core::types::reftype::RefType;
use crate::core::types::valtype::ValType;

/// A table of references, sized in entries.
///
/// <https://www.w3.org/TR/wasm-core-2/#table-types>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct TableType {
    pub reftype: RefType,
    pub limits: Limits,
}

impl TableType {
    /// Operand type of `table.get`, `table.set` and friends on this table.
    pub fn elem_type(&self) -> ValType {
        self.reftype.into()
    }
}

use crate::core::types::valtype::ValType;

/// Global types classify global variables, which hold a value and can either be mutable or
/// immutable.
///
/// <https://www.w3.org/TR/wasm-core-2/#global-types>
/// <https://www.w3.org/TR/wasm-core-2/#binary-globaltype>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct GlobalType(pub Mut, pub ValType);

impl GlobalType {
    pub fn is_mutable(&self) -> bool {
        self.0 == Mut::Var
    }

    pub fn valtype(&self) -> ValType {
        self.1
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Mut {
    Const,
    Var,
}

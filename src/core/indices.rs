//! Type definitions for WebAssembly indices.
//!
//! Every index is a stable handle into one of the module's index spaces. The
//! function, table, memory and global spaces number imports first, followed by
//! the definitions of the module itself.
//!
//! See <https://www.w3.org/TR/wasm-core-2/#indices>
use std::fmt;
use thiserror::Error;

/// The index spaces a reference can point into.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum IndexSpace {
    Type,
    Func,
    Table,
    Memory,
    Global,
    Elem,
    Data,
    Local,
    Label,
}

impl fmt::Display for IndexSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexSpace::Type => "type",
            IndexSpace::Func => "function",
            IndexSpace::Table => "table",
            IndexSpace::Memory => "memory",
            IndexSpace::Global => "global",
            IndexSpace::Elem => "element",
            IndexSpace::Data => "data",
            IndexSpace::Local => "local",
            IndexSpace::Label => "label",
        })
    }
}

/// An index that does not resolve to a live entry of its index space.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("unresolved {space} index {index}: {len} defined")]
pub struct ReferenceError {
    pub space: IndexSpace,
    pub index: u32,
    pub len: u32,
}

macro_rules! define_index_type {
    ($name:ident, $space:expr) => {
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
        pub struct $name(pub u32);

        impl $name {
            pub const SPACE: IndexSpace = $space;

            /// Checks the index against the number of live entries in its
            /// index space.
            pub fn resolve(self, len: u32) -> Result<usize, ReferenceError> {
                if self.0 < len {
                    Ok(self.0 as usize)
                } else {
                    Err(ReferenceError {
                        space: Self::SPACE,
                        index: self.0,
                        len,
                    })
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

define_index_type!(TypeIdx, IndexSpace::Type);
define_index_type!(FuncIdx, IndexSpace::Func);
define_index_type!(TableIdx, IndexSpace::Table);
define_index_type!(MemIdx, IndexSpace::Memory);
define_index_type!(GlobalIdx, IndexSpace::Global);
define_index_type!(ElemIdx, IndexSpace::Elem);
define_index_type!(DataIdx, IndexSpace::Data);
define_index_type!(LocalIdx, IndexSpace::Local);
define_index_type!(LabelIdx, IndexSpace::Label);

/// Upper bounds of every index space visible at one point of a module.
///
/// Decoding builds these from the sections decoded so far, encoding from the
/// complete module. Locals and labels only exist inside function bodies.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct IndexBounds {
    pub types: u32,
    pub funcs: u32,
    pub tables: u32,
    pub memories: u32,
    pub globals: u32,
    pub elems: u32,
    pub datas: u32,
    pub locals: u32,
    pub labels: u32,
}

impl IndexBounds {
    /// Bounds for a function body declaring `locals` locals (parameters
    /// included). The body itself is the outermost label.
    pub fn for_body(self, locals: u32) -> Self {
        Self {
            locals,
            labels: 1,
            ..self
        }
    }

    /// Bounds for the body of a nested block.
    pub fn nested(self) -> Self {
        Self {
            labels: self.labels + 1,
            ..self
        }
    }

    /// Bounds for a constant expression: no locals, no labels.
    pub fn constant(self) -> Self {
        Self {
            locals: 0,
            labels: 0,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_index_at_len() {
        assert_eq!(FuncIdx(2).resolve(3), Ok(2));
        assert_eq!(
            FuncIdx(3).resolve(3),
            Err(ReferenceError {
                space: IndexSpace::Func,
                index: 3,
                len: 3
            })
        );
    }

    #[test]
    fn body_bounds_open_one_label() {
        let bounds = IndexBounds {
            funcs: 4,
            ..Default::default()
        }
        .for_body(2);
        assert_eq!(bounds.labels, 1);
        assert_eq!(bounds.nested().labels, 2);
        assert_eq!(bounds.constant().locals, 0);
        assert_eq!(bounds.funcs, 4);
    }
}

/// Reference types classify first-class references to objects in the runtime store.
///
/// <https://www.w3.org/TR/wasm-core-2/#reference-types>
/// <https://www.w3.org/TR/wasm-core-2/#binary-reftype>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum RefType {
    Func,
    Extern,
}

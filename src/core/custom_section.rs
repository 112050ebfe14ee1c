//! WebAssembly custom section type definition.
use crate::core::indices::{FuncIdx, LocalIdx};
use crate::core::module::SectionKind;

/// Custom sections are intended to be used for debugging information or
/// third-party extensions, and are ignored by the WebAssembly semantics.
///
/// Their contents consist of a name further identifying the custom section,
/// followed by content for custom use. A custom section also records where it
/// sits relative to the standard sections of its module.
///
/// <https://www.w3.org/TR/wasm-core-2/#custom-section>
/// <https://www.w3.org/TR/wasm-core-2/#binary-customsec>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSection {
    pub name: String,
    pub placement: Placement,
    pub content: CustomContent,
}

impl CustomSection {
    pub const NAME_SECTION: &'static str = "name";

    /// A custom section with uninterpreted content, placed at the end of the
    /// module.
    pub fn raw(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            placement: Placement::End,
            content: CustomContent::Raw(bytes.into()),
        }
    }

    /// The `name` section carrying debug names, placed at the end of the
    /// module.
    pub fn names(names: NameSection) -> Self {
        Self {
            name: Self::NAME_SECTION.to_string(),
            placement: Placement::End,
            content: CustomContent::Names(names),
        }
    }

    pub fn with_placement(self, placement: Placement) -> Self {
        Self { placement, ..self }
    }

    pub fn is_debug_names(&self) -> bool {
        matches!(self.content, CustomContent::Names(_))
    }
}

/// Position of a custom section relative to the standard sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Immediately before the given standard section.
    Before(SectionKind),
    /// Immediately after the given standard section.
    After(SectionKind),
    /// At the same position as the given standard section, following it.
    Like(SectionKind),
    #[default]
    End,
}

impl Placement {
    /// The precedence key this placement sorts under, relative to
    /// [`SectionKind::precedence`].
    pub fn precedence(self) -> u32 {
        match self {
            Placement::Before(kind) => kind.precedence().saturating_sub(1),
            Placement::After(kind) => kind.precedence().saturating_add(1),
            Placement::Like(kind) => kind.precedence(),
            Placement::End => u32::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomContent {
    Names(NameSection),
    Raw(Vec<u8>),
}

/// Debug names for the module, its functions and their locals.
///
/// Subsections this crate does not interpret are kept as raw bytes, keyed by
/// their subsection id.
///
/// <https://www.w3.org/TR/wasm-core-2/#name-section>
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameSection {
    pub module: Option<String>,
    pub functions: Vec<(FuncIdx, String)>,
    pub locals: Vec<(FuncIdx, Vec<(LocalIdx, String)>)>,
    pub unknown: Vec<(u8, Vec<u8>)>,
}

impl NameSection {
    pub const MODULE_SUBSECTION: u8 = 0;
    pub const FUNCTION_SUBSECTION: u8 = 1;
    pub const LOCAL_SUBSECTION: u8 = 2;

    pub fn function_name(&self, idx: FuncIdx) -> Option<&str> {
        self.functions
            .iter()
            .find(|(i, _)| *i == idx)
            .map(|(_, name)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.module.is_none()
            && self.functions.is_empty()
            && self.locals.is_empty()
            && self.unknown.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placements_sort_around_their_anchor() {
        let anchor = SectionKind::Memory.precedence();
        assert!(Placement::Before(SectionKind::Memory).precedence() < anchor);
        assert_eq!(Placement::Like(SectionKind::Memory).precedence(), anchor);
        assert!(Placement::After(SectionKind::Memory).precedence() > anchor);
        assert!(
            Placement::After(SectionKind::Memory).precedence()
                < Placement::Before(SectionKind::Global).precedence()
        );
        assert_eq!(Placement::default(), Placement::End);
    }
}

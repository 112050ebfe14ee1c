use crate::core::types::limits::Limits;

/// A linear memory, sized in 64 KiB pages.
///
/// <https://www.w3.org/TR/wasm-core-2/#memory-types>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct MemType {
    pub limits: Limits,
}

impl MemType {
    /// Pages addressable with 32-bit offsets.
    pub const MAX_PAGES: u32 = 1 << 16;

    /// The first bound beyond [`Self::MAX_PAGES`], minimum before maximum.
    pub fn oversized_bound(&self) -> Option<u32> {
        std::iter::once(self.limits.min())
            .chain(self.limits.max())
            .find(|&pages| pages > Self::MAX_PAGES)
    }
}

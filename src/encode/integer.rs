//! LEB128 and fixed-width integer writers.
//!
//! <https://en.wikipedia.org/wiki/LEB128>

/// How an integer is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relaxation {
    /// Minimal LEB128.
    #[default]
    Canonical,
    /// LEB128 padded to `ceil(width/7)` bytes, so the length of the encoding
    /// does not depend on the value.
    Full,
    /// Fixed-width little-endian.
    None,
}

fn write_unsigned(out: &mut Vec<u8>, mut value: u64, max_len: usize, padded: bool) {
    for i in 1..=max_len {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        let more = if padded { i < max_len } else { value != 0 };
        if more {
            byte |= 0x80;
        }
        out.push(byte);

        if !more {
            break;
        }
    }
}

fn write_signed(out: &mut Vec<u8>, mut value: i64, max_len: usize, padded: bool) {
    for i in 1..=max_len {
        let mut byte = (value & 0x7F) as u8;
        // arithmetic shift: the sign is carried into the padding bits
        value >>= 7;

        let done_minimal = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        let more = if padded { i < max_len } else { !done_minimal };
        if more {
            byte |= 0x80;
        }
        out.push(byte);

        if !more {
            break;
        }
    }
}

pub fn encode_u8(out: &mut Vec<u8>, value: u8, relaxation: Relaxation) {
    match relaxation {
        Relaxation::None => out.push(value),
        Relaxation::Canonical => write_unsigned(out, value.into(), 2, false),
        Relaxation::Full => write_unsigned(out, value.into(), 2, true),
    }
}

pub fn encode_u32(out: &mut Vec<u8>, value: u32, relaxation: Relaxation) {
    match relaxation {
        Relaxation::None => out.extend_from_slice(&value.to_le_bytes()),
        Relaxation::Canonical => write_unsigned(out, value.into(), 5, false),
        Relaxation::Full => write_unsigned(out, value.into(), 5, true),
    }
}

pub fn encode_u64(out: &mut Vec<u8>, value: u64, relaxation: Relaxation) {
    match relaxation {
        Relaxation::None => out.extend_from_slice(&value.to_le_bytes()),
        Relaxation::Canonical => write_unsigned(out, value, 10, false),
        Relaxation::Full => write_unsigned(out, value, 10, true),
    }
}

pub fn encode_i32(out: &mut Vec<u8>, value: i32, relaxation: Relaxation) {
    match relaxation {
        Relaxation::None => out.extend_from_slice(&value.to_le_bytes()),
        Relaxation::Canonical => write_signed(out, value.into(), 5, false),
        Relaxation::Full => write_signed(out, value.into(), 5, true),
    }
}

pub fn encode_i64(out: &mut Vec<u8>, value: i64, relaxation: Relaxation) {
    match relaxation {
        Relaxation::None => out.extend_from_slice(&value.to_le_bytes()),
        Relaxation::Canonical => write_signed(out, value, 10, false),
        Relaxation::Full => write_signed(out, value, 10, true),
    }
}

/// Writes the signed 33-bit integer used for type indices in block types.
pub(crate) fn encode_s33(out: &mut Vec<u8>, value: i64) {
    write_signed(out, value, 5, false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn u32_bytes(value: u32, relaxation: Relaxation) -> Vec<u8> {
        let mut out = Vec::new();
        encode_u32(&mut out, value, relaxation);
        out
    }

    fn i32_bytes(value: i32, relaxation: Relaxation) -> Vec<u8> {
        let mut out = Vec::new();
        encode_i32(&mut out, value, relaxation);
        out
    }

    fn i64_bytes(value: i64, relaxation: Relaxation) -> Vec<u8> {
        let mut out = Vec::new();
        encode_i64(&mut out, value, relaxation);
        out
    }

    #[test]
    fn canonical_unsigned_is_minimal() {
        assert_eq!(u32_bytes(0, Relaxation::Canonical), [0x00]);
        assert_eq!(u32_bytes(127, Relaxation::Canonical), [0x7F]);
        assert_eq!(u32_bytes(128, Relaxation::Canonical), [0x80, 0x01]);
        assert_eq!(u32_bytes(624_485, Relaxation::Canonical), [0xE5, 0x8E, 0x26]);
        assert_eq!(
            u32_bytes(u32::MAX, Relaxation::Canonical),
            [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]
        );
    }

    #[test]
    fn full_unsigned_pads_to_width() {
        assert_eq!(u32_bytes(0, Relaxation::Full), [0x80, 0x80, 0x80, 0x80, 0x00]);
        assert_eq!(u32_bytes(3, Relaxation::Full), [0x83, 0x80, 0x80, 0x80, 0x00]);

        let mut out = Vec::new();
        encode_u8(&mut out, 1, Relaxation::Full);
        assert_eq!(out, [0x81, 0x00]);

        let mut out = Vec::new();
        encode_u64(&mut out, 0, Relaxation::Full);
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn none_is_fixed_little_endian() {
        assert_eq!(u32_bytes(1, Relaxation::None), [0x01, 0x00, 0x00, 0x00]);
        assert_eq!(i32_bytes(-2, Relaxation::None), [0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn canonical_signed_is_minimal() {
        assert_eq!(i32_bytes(0, Relaxation::Canonical), [0x00]);
        assert_eq!(i32_bytes(-1, Relaxation::Canonical), [0x7F]);
        assert_eq!(i32_bytes(63, Relaxation::Canonical), [0x3F]);
        assert_eq!(i32_bytes(64, Relaxation::Canonical), [0xC0, 0x00]);
        assert_eq!(i32_bytes(-64, Relaxation::Canonical), [0x40]);
        assert_eq!(i32_bytes(-65, Relaxation::Canonical), [0xBF, 0x7F]);
        assert_eq!(i64_bytes(-123_456, Relaxation::Canonical), [0xC0, 0xBB, 0x78]);
    }

    #[test]
    fn full_signed_carries_sign_into_padding() {
        assert_eq!(i32_bytes(-1, Relaxation::Full), [0xFF, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert_eq!(i32_bytes(1, Relaxation::Full), [0x81, 0x80, 0x80, 0x80, 0x00]);

        let min = i64_bytes(i64::MIN, Relaxation::Full);
        assert_eq!(min.len(), 10);
        assert_eq!(min[9], 0x7F);
        assert_eq!(i64_bytes(i64::MIN, Relaxation::Canonical), min);
    }
}

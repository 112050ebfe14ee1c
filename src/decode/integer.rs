//! Helpers for decoding LEB128-encoded integers.
//!
//! The LEB128 decoders accept any representation up to `ceil(N/7)` bytes,
//! which covers both the canonical and the full-width encodings. Fixed-width
//! little-endian integers are read with the `*_relaxed` variants.
//!
//! <https://en.wikipedia.org/wiki/LEB128>
use crate::decode::read_byte;
use crate::encode::integer::Relaxation;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeU8Error {
    #[error("uint8 too large")]
    TooLarge,

    #[error("uint8 representation too long")]
    RepresentationTooLong,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub fn decode_u8<R: io::Read + ?Sized>(reader: &mut R) -> Result<u8, DecodeU8Error> {
    let first = read_byte(reader)?;
    if first & 0x80 == 0 {
        return Ok(first);
    }

    // 2 == ceil(8/7); the second byte carries the single remaining bit
    let second = read_byte(reader)?;
    if second & 0x80 != 0 {
        return Err(DecodeU8Error::RepresentationTooLong);
    }
    if second & 0b1111_1110 != 0 {
        return Err(DecodeU8Error::TooLarge);
    }

    Ok((first & 0x7F) | (second << 7))
}

#[derive(Error, Debug)]
pub enum DecodeU32Error {
    #[error("uint32 too large")]
    TooLarge,

    #[error("uint32 representation too long")]
    RepresentationTooLong,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub fn decode_u32<R: io::Read + ?Sized>(reader: &mut R) -> Result<u32, DecodeU32Error> {
    let mut result: u32 = 0;
    let mut shift: u8 = 0;

    // 5 == ceil(32/7)
    for i in 1..=5 {
        let byte = read_byte(reader)?;

        result |= u32::from(byte & 0b0111_1111 /* 0x7F */) << shift;

        let continuation_bit = byte & 0b1000_0000 /* 0x80 */;
        if continuation_bit == 0 {
            if i == 5 && (byte & 0b1111_0000/* 0xF0 */) != 0 {
                // 4*7=28 bits consumed so far, which leaves at most 4 bits of
                // payload in the last byte
                return Err(DecodeU32Error::TooLarge);
            }
            return Ok(result);
        }

        shift += 7;
    }

    Err(DecodeU32Error::RepresentationTooLong)
}

#[derive(Error, Debug)]
pub enum DecodeU64Error {
    #[error("uint64 too large")]
    TooLarge,

    #[error("uint64 representation too long")]
    RepresentationTooLong,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub fn decode_u64<R: io::Read + ?Sized>(reader: &mut R) -> Result<u64, DecodeU64Error> {
    let mut result: u64 = 0;
    let mut shift: u8 = 0;

    // 10 == ceil(64/7)
    for i in 1..=10 {
        let byte = read_byte(reader)?;

        result |= u64::from(byte & 0b0111_1111) << shift;

        if byte & 0b1000_0000 == 0 {
            if i == 10 && (byte & 0b1111_1110) != 0 {
                // 9*7=63 bits consumed, one bit of payload left
                return Err(DecodeU64Error::TooLarge);
            }
            return Ok(result);
        }

        shift += 7;
    }

    Err(DecodeU64Error::RepresentationTooLong)
}

#[derive(Error, Debug)]
pub enum DecodeI32Error {
    #[error("int32 too large")]
    TooLarge,

    #[error("int32 representation too long")]
    RepresentationTooLong,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub fn decode_i32<R: io::Read + ?Sized>(reader: &mut R) -> Result<i32, DecodeI32Error> {
    let mut result: i64 = 0;
    let mut shift: u8 = 0;

    // 5 == ceil(32/7)
    for _ in 1..=5 {
        let byte = read_byte(reader)?;

        result |= i64::from(byte & 0b0111_1111 /* 0x7F */) << shift;
        shift += 7;

        let continuation_bit = byte & 0b1000_0000 /* 0x80 */;
        if continuation_bit == 0 {
            if (byte & 0b0100_0000/* 0x40 */) != 0 {
                result |= !0 << shift;
            }

            return i32::try_from(result).map_err(|_| DecodeI32Error::TooLarge);
        }
    }

    Err(DecodeI32Error::RepresentationTooLong)
}

#[derive(Error, Debug)]
pub enum DecodeI64Error {
    #[error("int64 representation too long")]
    RepresentationTooLong,

    #[error("int64 incorrect sign extension")]
    IncorrectSignExtension,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub fn decode_i64<R: io::Read + ?Sized>(reader: &mut R) -> Result<i64, DecodeI64Error> {
    let mut result: i64 = 0;
    let mut shift: u8 = 0;

    // 10 == ceil(64/7)
    for _ in 1..=10 {
        let byte = read_byte(reader)?;

        result |= i64::from(byte & 0b0111_1111 /* 0x7F */) << shift;
        shift += 7;

        let continuation_bit = byte & 0b1000_0000 /* 0x80 */;
        if continuation_bit == 0 {
            let on_10th_byte = shift >= 64;
            let is_negative = (byte & 0b0100_0000/* 0x40 */) != 0;

            if on_10th_byte {
                let padding = byte & 0b0011_1111 /* 0x3F */;
                if is_negative && padding != 0b0011_1111 {
                    // six low-order bits must be all 1s
                    return Err(DecodeI64Error::IncorrectSignExtension);
                }
                if !is_negative && padding != 0b0000_0000 {
                    // six low-order bits must be all 0s
                    return Err(DecodeI64Error::IncorrectSignExtension);
                }
            } else if is_negative {
                result |= !0 << shift;
            }

            return Ok(result);
        }
    }

    Err(DecodeI64Error::RepresentationTooLong)
}

#[derive(Error, Debug)]
pub enum DecodeS33Error {
    #[error("int33 out of range")]
    TooLarge,

    #[error("int33 representation too long")]
    RepresentationTooLong,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Decodes the signed 33-bit integer used for type indices in block types.
pub fn decode_s33<R: io::Read + ?Sized>(reader: &mut R) -> Result<i64, DecodeS33Error> {
    let mut result: i64 = 0;
    let mut shift: u8 = 0;

    const MIN: i64 = -(1 << 32);
    const MAX: i64 = (1 << 32) - 1;

    // 5 == ceil(33/7)
    for _ in 1..=5 {
        let byte = read_byte(reader)?;

        result |= i64::from(byte & 0b0111_1111) << shift;
        shift += 7;

        if byte & 0b1000_0000 == 0 {
            if (byte & 0b0100_0000) != 0 {
                result |= !0 << shift;
            }

            if !(MIN..=MAX).contains(&result) {
                return Err(DecodeS33Error::TooLarge);
            }

            return Ok(result);
        }
    }

    Err(DecodeS33Error::RepresentationTooLong)
}

fn read_array<const N: usize, R: io::Read + ?Sized>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads a u8 written under `relaxation`.
pub fn decode_u8_relaxed<R: io::Read + ?Sized>(
    reader: &mut R,
    relaxation: Relaxation,
) -> Result<u8, DecodeU8Error> {
    match relaxation {
        Relaxation::None => Ok(read_byte(reader)?),
        Relaxation::Canonical | Relaxation::Full => decode_u8(reader),
    }
}

/// Reads a u32 written under `relaxation`.
pub fn decode_u32_relaxed<R: io::Read + ?Sized>(
    reader: &mut R,
    relaxation: Relaxation,
) -> Result<u32, DecodeU32Error> {
    match relaxation {
        Relaxation::None => Ok(u32::from_le_bytes(read_array(reader)?)),
        Relaxation::Canonical | Relaxation::Full => decode_u32(reader),
    }
}

/// Reads a u64 written under `relaxation`.
pub fn decode_u64_relaxed<R: io::Read + ?Sized>(
    reader: &mut R,
    relaxation: Relaxation,
) -> Result<u64, DecodeU64Error> {
    match relaxation {
        Relaxation::None => Ok(u64::from_le_bytes(read_array(reader)?)),
        Relaxation::Canonical | Relaxation::Full => decode_u64(reader),
    }
}

/// Reads an i32 written under `relaxation`.
pub fn decode_i32_relaxed<R: io::Read + ?Sized>(
    reader: &mut R,
    relaxation: Relaxation,
) -> Result<i32, DecodeI32Error> {
    match relaxation {
        Relaxation::None => Ok(i32::from_le_bytes(read_array(reader)?)),
        Relaxation::Canonical | Relaxation::Full => decode_i32(reader),
    }
}

/// Reads an i64 written under `relaxation`.
pub fn decode_i64_relaxed<R: io::Read + ?Sized>(
    reader: &mut R,
    relaxation: Relaxation,
) -> Result<i64, DecodeI64Error> {
    match relaxation {
        Relaxation::None => Ok(i64::from_le_bytes(read_array(reader)?)),
        Relaxation::Canonical | Relaxation::Full => decode_i64(reader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::integer::{encode_i32, encode_i64, encode_u8, encode_u32, encode_u64};
    use std::io::Cursor;

    fn canonical_u32(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        encode_u32(&mut out, value, Relaxation::Canonical);
        out
    }

    fn canonical_i64(value: i64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_i64(&mut out, value, Relaxation::Canonical);
        out
    }

    fn read_u32_from(bytes: Vec<u8>) -> Result<u32, DecodeU32Error> {
        let mut cursor = Cursor::new(bytes);
        decode_u32(&mut cursor)
    }

    fn read_i32_from(bytes: Vec<u8>) -> Result<i32, DecodeI32Error> {
        let mut cursor = Cursor::new(bytes);
        decode_i32(&mut cursor)
    }

    fn read_i64_from(bytes: Vec<u8>) -> Result<i64, DecodeI64Error> {
        let mut cursor = Cursor::new(bytes);
        decode_i64(&mut cursor)
    }

    #[test]
    fn read_u8_accepts_two_byte_maximum() {
        assert_eq!(decode_u8(&mut Cursor::new([0x7F])).unwrap(), 0x7F);
        assert_eq!(decode_u8(&mut Cursor::new([0xFF, 0x01])).unwrap(), 0xFF);
        assert!(matches!(
            decode_u8(&mut Cursor::new([0xFF, 0x02])),
            Err(DecodeU8Error::TooLarge)
        ));
        assert!(matches!(
            decode_u8(&mut Cursor::new([0x80, 0x80])),
            Err(DecodeU8Error::RepresentationTooLong)
        ));
    }

    #[test]
    fn read_u32_decodes_simple_values() {
        assert_eq!(read_u32_from(canonical_u32(0)).unwrap(), 0);
        assert_eq!(read_u32_from(canonical_u32(127)).unwrap(), 127);
        assert_eq!(read_u32_from(canonical_u32(128)).unwrap(), 128);
        assert_eq!(read_u32_from(canonical_u32(u32::MAX)).unwrap(), u32::MAX);
    }

    #[test]
    fn read_u32_rejects_payload_bits_in_last_byte() {
        let err = read_u32_from(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x10]).unwrap_err();
        assert!(matches!(err, DecodeU32Error::TooLarge));
    }

    #[test]
    fn read_u32_accepts_extended_zero() {
        assert_eq!(read_u32_from(vec![0x80, 0x00]).unwrap(), 0);
    }

    #[test]
    fn read_u32_rejects_representation_too_long() {
        let err = read_u32_from(vec![0x80, 0x80, 0x80, 0x80, 0x80]).unwrap_err();
        assert!(matches!(err, DecodeU32Error::RepresentationTooLong));
    }

    #[test]
    fn read_u64_rejects_payload_bits_in_last_byte() {
        let mut bytes = vec![0xFF; 9];
        bytes.push(0x02);
        assert!(matches!(
            decode_u64(&mut Cursor::new(bytes)),
            Err(DecodeU64Error::TooLarge)
        ));

        let mut bytes = vec![0xFF; 9];
        bytes.push(0x01);
        assert_eq!(decode_u64(&mut Cursor::new(bytes)).unwrap(), u64::MAX);
    }

    #[test]
    fn read_i32_decodes_edge_values() {
        for value in [0, 1, -1, 63, -64, 64, -65, i32::MAX, i32::MIN] {
            assert_eq!(read_i32_from(canonical_i64(value.into())).unwrap(), value);
        }
    }

    #[test]
    fn read_i32_accepts_non_minimal_encoding_for_negative_one() {
        assert_eq!(read_i32_from(vec![0xFF, 0x7F]).unwrap(), -1);
    }

    #[test]
    fn read_i32_rejects_out_of_range_positive() {
        let bytes = canonical_i64(i64::from(i32::MAX) + 1);
        let err = read_i32_from(bytes).unwrap_err();
        assert!(matches!(err, DecodeI32Error::TooLarge));
    }

    #[test]
    fn read_i32_rejects_out_of_range_negative() {
        let bytes = canonical_i64(i64::from(i32::MIN) - 1);
        let err = read_i32_from(bytes).unwrap_err();
        assert!(matches!(err, DecodeI32Error::TooLarge));
    }

    #[test]
    fn read_i32_rejects_representation_too_long() {
        let err = read_i32_from(vec![0x80, 0x80, 0x80, 0x80, 0x80]).unwrap_err();
        assert!(matches!(err, DecodeI32Error::RepresentationTooLong));
    }

    #[test]
    fn read_i64_decodes_edge_values() {
        for value in [0i64, 1, -1, i64::MAX, i64::MIN] {
            assert_eq!(read_i64_from(canonical_i64(value)).unwrap(), value);
        }
    }

    #[test]
    fn read_i64_rejects_incorrect_negative_padding() {
        let mut bytes = canonical_i64(i64::MIN);
        let last = bytes.last_mut().unwrap();
        *last &= !0x01; // flip one of the padding bits
        let err = read_i64_from(bytes).unwrap_err();
        assert!(matches!(err, DecodeI64Error::IncorrectSignExtension));
    }

    #[test]
    fn read_i64_rejects_incorrect_positive_padding() {
        let mut bytes = vec![0x80; 9];
        bytes.push(0x02);
        let err = read_i64_from(bytes).unwrap_err();
        assert!(matches!(err, DecodeI64Error::IncorrectSignExtension));
    }

    #[test]
    fn read_i64_rejects_representation_too_long() {
        let err = read_i64_from(vec![0x80; 10]).unwrap_err();
        assert!(matches!(err, DecodeI64Error::RepresentationTooLong));
    }

    #[test]
    fn read_s33_covers_unsigned_type_indices() {
        let mut out = Vec::new();
        encode_i64(&mut out, i64::from(u32::MAX), Relaxation::Canonical);
        assert_eq!(decode_s33(&mut Cursor::new(out)).unwrap(), i64::from(u32::MAX));

        let mut out = Vec::new();
        encode_i64(&mut out, 1 << 32, Relaxation::Canonical);
        assert!(matches!(
            decode_s33(&mut Cursor::new(out)),
            Err(DecodeS33Error::TooLarge)
        ));
    }

    #[test]
    fn relaxed_reads_match_every_encoding() {
        for relaxation in [Relaxation::Canonical, Relaxation::Full, Relaxation::None] {
            let mut out = Vec::new();
            encode_u8(&mut out, 0xC8, relaxation);
            encode_u32(&mut out, 624_485, relaxation);
            encode_u64(&mut out, u64::MAX - 7, relaxation);
            encode_i32(&mut out, -123_456, relaxation);
            encode_i64(&mut out, i64::MIN + 3, relaxation);

            let mut reader = Cursor::new(out);
            assert_eq!(decode_u8_relaxed(&mut reader, relaxation).unwrap(), 0xC8);
            assert_eq!(decode_u32_relaxed(&mut reader, relaxation).unwrap(), 624_485);
            assert_eq!(decode_u64_relaxed(&mut reader, relaxation).unwrap(), u64::MAX - 7);
            assert_eq!(decode_i32_relaxed(&mut reader, relaxation).unwrap(), -123_456);
            assert_eq!(decode_i64_relaxed(&mut reader, relaxation).unwrap(), i64::MIN + 3);
        }
    }
}

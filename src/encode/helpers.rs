use crate::core::instruction::{Ieee32, Ieee64};
use crate::encode::integer::{Relaxation, encode_u32};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("length {0} does not fit in a u32")]
pub struct LengthOverflowError(pub usize);

/// Writes a vector length prefix.
pub fn encode_len(out: &mut Vec<u8>, len: usize) -> Result<(), LengthOverflowError> {
    let len = u32::try_from(len).map_err(|_| LengthOverflowError(len))?;
    encode_u32(out, len, Relaxation::Canonical);
    Ok(())
}

/// Writes `items` prefixed with their count.
pub fn encode_vector<'a, T, F, E>(out: &mut Vec<u8>, items: &'a [T], encode_fn: F) -> Result<(), E>
where
    T: 'a,
    F: FnMut(&mut Vec<u8>, &'a T) -> Result<(), E>,
    E: From<LengthOverflowError>,
{
    encode_len(out, items.len())?;
    encode_array(out, items, encode_fn)
}

/// Writes `items` back to back, without a count.
pub fn encode_array<'a, T, F, E>(out: &mut Vec<u8>, items: &'a [T], mut encode_fn: F) -> Result<(), E>
where
    T: 'a,
    F: FnMut(&mut Vec<u8>, &'a T) -> Result<(), E>,
{
    for item in items {
        encode_fn(out, item)?;
    }
    Ok(())
}

pub fn encode_byte_vector(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), LengthOverflowError> {
    encode_len(out, bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
}

/// Writes a UTF-8 name as a byte vector.
pub fn encode_name(out: &mut Vec<u8>, name: &str) -> Result<(), LengthOverflowError> {
    encode_byte_vector(out, name.as_bytes())
}

pub fn encode_f32(out: &mut Vec<u8>, value: Ieee32) {
    out.extend_from_slice(&value.0.to_le_bytes());
}

pub fn encode_f64(out: &mut Vec<u8>, value: Ieee64) {
    out.extend_from_slice(&value.0.to_le_bytes());
}

/// Appends `content` to `out` behind its size, as sections and function
/// bodies are framed.
pub fn encode_sized(out: &mut Vec<u8>, content: &[u8]) -> Result<(), LengthOverflowError> {
    encode_byte_vector(out, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn vectors_are_length_prefixed_and_arrays_are_not() {
        let mut out = Vec::new();
        encode_vector(&mut out, &[1u8, 2, 3], |out, b| {
            out.push(*b);
            Ok::<_, LengthOverflowError>(())
        })
        .unwrap();
        assert_eq!(out, [0x03, 0x01, 0x02, 0x03]);

        let mut out = Vec::new();
        encode_array(&mut out, &[1u8, 2], |out, b| {
            out.push(*b);
            Ok::<_, LengthOverflowError>(())
        })
        .unwrap();
        assert_eq!(out, [0x01, 0x02]);
    }

    #[test]
    fn names_are_utf8_byte_vectors() {
        let mut out = Vec::new();
        encode_name(&mut out, "añb").unwrap();
        assert_eq!(out, [0x04, b'a', 0xC3, 0xB1, b'b']);
    }

    #[test]
    fn floats_keep_their_bit_pattern() {
        let nan = Ieee32(0x7FC0_0001);
        let mut out = Vec::new();
        encode_f32(&mut out, nan);
        assert_eq!(out, [0x01, 0x00, 0xC0, 0x7F]);

        let mut out = Vec::new();
        encode_f64(&mut out, Ieee64::from(-0.0f64));
        assert_eq!(out, [0, 0, 0, 0, 0, 0, 0, 0x80]);
    }
}

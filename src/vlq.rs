//! Variable-length quantity codec, the base-128 big-endian encoding used for delta-times and for
//! meta/sysex event lengths. See `original_source/include/midi_vlq.h` for the reference behavior
//! this module matches: a field is at most 4 bytes, the continuation bit (0x80) marks all but the
//! last byte, and the largest encodable value is `0x0FFFFFFF` (268,435,455).

use snafu::Snafu;

/// The continuation bit: set on every byte of a VLQ field except the last.
pub(crate) const CONTINUE: u8 = 0b1000_0000;

/// The low 7 data bits of a VLQ byte.
const DATA_MASK: u8 = 0b0111_1111;

/// The largest value a 4-byte VLQ field can encode.
pub(crate) const MAX_VALUE: u32 = 0x0FFF_FFFF;

#[derive(Debug, Snafu, Eq, PartialEq)]
pub(crate) enum VlqError {
    #[snafu(display("vlq field had zero bytes"))]
    Empty,

    #[snafu(display("vlq field exceeded 4 bytes"))]
    TooBig,

    #[snafu(display("vlq field's final byte had the continuation bit set"))]
    Truncated,
}

pub(crate) type VlqResult<T> = std::result::Result<T, VlqError>;

/// The result of decoding a VLQ field: the value, how many bytes it spanned, and whether the field
/// was well-formed (terminated before 4 bytes with the continuation bit clear).
///
/// A field can still yield `valid == false` and a usable `value` — callers that only need "best
/// effort" recovery (diagnostics, lenient re-sync) can use the value; callers enforcing strict
/// correctness should treat `valid == false` as an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct VlqField {
    pub value: u32,
    pub byte_len: u8,
    pub valid: bool,
}

/// Decodes a VLQ field from `bytes`, which must be 1-4 bytes long (more is a [`VlqError::TooBig`]).
/// Matches `read_vlq` in `original_source/include/midi_vlq.h`: non-canonical (overlong) encodings
/// decode to their numeric value without complaint, but a field whose final byte still has the
/// continuation bit set is not `valid`.
pub(crate) fn decode_slice(bytes: &[u8]) -> VlqResult<u32> {
    let field = decode_field(bytes)?;
    Ok(field.value)
}

pub(crate) fn decode_field(bytes: &[u8]) -> VlqResult<VlqField> {
    if bytes.is_empty() {
        return Err(VlqError::Empty);
    }
    if bytes.len() > 4 {
        return Err(VlqError::TooBig);
    }
    let mut value: u32 = 0;
    let mut last = 0u8;
    for &b in bytes {
        value = (value << 7) | (b & DATA_MASK) as u32;
        last = b;
    }
    Ok(VlqField {
        value,
        byte_len: bytes.len() as u8,
        valid: last & CONTINUE == 0,
    })
}

/// The number of bytes required to encode `value` as a canonical VLQ, after clamping to
/// [`MAX_VALUE`].
pub(crate) fn field_size(value: u32) -> u8 {
    let clamped = value.min(MAX_VALUE);
    let mut n = 0u8;
    let mut v = clamped;
    loop {
        v >>= 7;
        n += 1;
        if v == 0 {
            break;
        }
    }
    n
}

/// Encodes `value` as a canonical (shortest) VLQ, clamping to [`MAX_VALUE`] if it overflows 4
/// bytes' worth of 7-bit groups.
pub(crate) fn encode(value: u32) -> Vec<u8> {
    let clamped = value.min(MAX_VALUE);
    let len = field_size(clamped);
    let mut out = Vec::with_capacity(len as usize);
    for i in (0..len).rev() {
        let shift = i * 7;
        let mut byte = ((clamped >> shift) & DATA_MASK as u32) as u8;
        if i != 0 {
            byte |= CONTINUE;
        }
        out.push(byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_single_byte() {
        assert_eq!(0x00, decode_slice(&[0x00]).unwrap());
        assert_eq!(0x40, decode_slice(&[0x40]).unwrap());
        assert_eq!(0x7F, decode_slice(&[0x7F]).unwrap());
    }

    #[test]
    fn decode_two_bytes() {
        assert_eq!(0x80, decode_slice(&[0x81, 0x00]).unwrap());
        assert_eq!(0x2000, decode_slice(&[0xC0, 0x00]).unwrap());
        assert_eq!(0x3FFF, decode_slice(&[0xFF, 0x7F]).unwrap());
    }

    #[test]
    fn decode_four_bytes_max() {
        assert_eq!(MAX_VALUE, decode_slice(&[0xFF, 0xFF, 0xFF, 0x7F]).unwrap());
    }

    #[test]
    fn decode_too_big_errors() {
        assert_eq!(
            VlqError::TooBig,
            decode_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]).unwrap_err()
        );
    }

    #[test]
    fn decode_empty_errors() {
        assert_eq!(VlqError::Empty, decode_slice(&[]).unwrap_err());
    }

    #[test]
    fn decode_truncated_is_not_valid_but_still_decodes() {
        let field = decode_field(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert!(!field.valid);
        assert_eq!(4, field.byte_len);
    }

    #[test]
    fn non_canonical_overlong_encoding_decodes_to_value() {
        // 0x00 encoded in two bytes instead of one: 0x80 0x00.
        let field = decode_field(&[0x80, 0x00]).unwrap();
        assert_eq!(0, field.value);
        assert!(field.valid);
    }

    #[test]
    fn encode_round_trips_canonical() {
        for &v in &[0u32, 0x7F, 0x80, 0x2000, 0x3FFF, 0x1FFFFF, MAX_VALUE] {
            let bytes = encode(v);
            assert_eq!(field_size(v) as usize, bytes.len());
            let decoded = decode_field(&bytes).unwrap();
            assert_eq!(v, decoded.value);
            assert!(decoded.valid);
        }
    }

    #[test]
    fn encode_clamps_above_max() {
        let bytes = encode(u32::MAX);
        assert_eq!(encode(MAX_VALUE), bytes);
    }

    #[test]
    fn field_size_matches_known_boundaries() {
        assert_eq!(1, field_size(0x7F));
        assert_eq!(2, field_size(0x80));
        assert_eq!(2, field_size(0x3FFF));
        assert_eq!(3, field_size(0x4000));
        assert_eq!(3, field_size(0x1FFFFF));
        assert_eq!(4, field_size(0x200000));
        assert_eq!(4, field_size(MAX_VALUE));
    }
}

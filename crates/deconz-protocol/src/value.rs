//! Numeric / variant value (C2)
//!
//! The reference implementation stores attribute values in a C `union`
//! (`NumericUnion`) tagged implicitly by the owning attribute's data type.
//! Rust has no safe union-with-implicit-tag, so this is a plain tagged enum;
//! the width actually used is selected by the caller from the attribute's
//! `DataTypeId`, not stored redundantly in the value itself.

use crate::error::{ProtocolError, Result};

/// A numeric attribute value sized to match some `DataTypeId`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl NumericValue {
    /// Clamp an unsigned write to `[0, 2^width - 1]`, per §8's quantified invariant.
    /// Returns an error rather than silently truncating when `value` does not fit
    /// losslessly and could not be clamped (i.e. it is simply out of representable
    /// range for `width`).
    pub fn clamp_unsigned(value: u64, width: u8) -> Result<NumericValue> {
        let max: u128 = if width >= 64 { u64::MAX as u128 } else { (1u128 << width) - 1 };
        if u128::from(value) > max {
            return Err(ProtocolError::OutOfRange { width });
        }
        Ok(match width {
            1..=8 => NumericValue::U8(value as u8),
            9..=16 => NumericValue::U16(value as u16),
            17..=32 => NumericValue::U32(value as u32),
            33..=64 => NumericValue::U64(value),
            _ => return Err(ProtocolError::OutOfRange { width }),
        })
    }

    #[must_use]
    pub fn as_u64(self) -> Option<u64> {
        match self {
            NumericValue::Bool(b) => Some(u64::from(b)),
            NumericValue::U8(v) => Some(u64::from(v)),
            NumericValue::U16(v) => Some(u64::from(v)),
            NumericValue::U32(v) => Some(u64::from(v)),
            NumericValue::U64(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            NumericValue::I8(v) => Some(i64::from(v)),
            NumericValue::I16(v) => Some(i64::from(v)),
            NumericValue::I32(v) => Some(i64::from(v)),
            NumericValue::I64(v) => Some(v),
            _ => None,
        }
    }
}

/// Result of decoding a ZCL character string: either it parsed as valid UTF-8,
/// or the UTF-8 decode failed and the bytes passed a Latin-1 printability
/// heuristic and were transcoded, or neither and the bytes are kept opaque for
/// hex display. Modeled as a sum type per SPEC_FULL.md §9's dynamic-dispatch note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringDecoded {
    Utf8(String),
    LatinOpaque(Vec<u8>),
}

impl StringDecoded {
    /// Decode a ZCL character-string payload (length byte already stripped,
    /// trailing NULs already stripped by the caller).
    ///
    /// Pipeline (SPEC_FULL.md §4.5): try UTF-8 first, unconditionally; on
    /// failure, check whether every byte is Latin-1-printable and if so
    /// transcode with the two documented substitutions; otherwise keep the
    /// raw bytes for hex display.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Self {
        if let Ok(s) = std::str::from_utf8(bytes) {
            return StringDecoded::Utf8(s.to_string());
        }

        if bytes.iter().all(|&b| is_latin1_printable(b)) {
            let mut s = String::with_capacity(bytes.len());
            for &b in bytes {
                let ch = match b {
                    0xA0 => ' ',
                    0xAD => '-',
                    _ => b as char,
                };
                s.push(ch);
            }
            return StringDecoded::Utf8(s);
        }

        StringDecoded::LatinOpaque(bytes.to_vec())
    }
}

/// Printable Latin-1: common whitespace plus the printable ranges, matching
/// the heuristic described in SPEC_FULL.md §4.5.
fn is_latin1_printable(b: u8) -> bool {
    matches!(b, 0x09 | 0x0A | 0x0D | 0x20..=0x7E | 0xA0..=0xFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_unsigned_accepts_in_range() {
        assert_eq!(NumericValue::clamp_unsigned(255, 8).unwrap(), NumericValue::U8(255));
        assert!(NumericValue::clamp_unsigned(256, 8).is_err());
    }

    #[test]
    fn round_trip_just_written_value() {
        let v = NumericValue::clamp_unsigned(42, 16).unwrap();
        assert_eq!(v.as_u64(), Some(42));
    }

    #[test]
    fn utf8_payload_decodes_as_utf8() {
        let bytes = "hello".as_bytes();
        assert_eq!(StringDecoded::decode(bytes), StringDecoded::Utf8("hello".to_string()));
    }

    #[test]
    fn latin1_fallback_matches_spec_example() {
        // 0xC2 0xE4 are not valid UTF-8 together, but are printable Latin-1.
        let decoded = StringDecoded::decode(&[0xC2, 0xE4]);
        match decoded {
            StringDecoded::Utf8(s) => {
                assert_eq!(s.chars().count(), 2);
                assert_eq!(s.as_bytes(), &[0xC3, 0x82, 0xC3, 0xA4]);
            }
            StringDecoded::LatinOpaque(_) => panic!("expected latin1 fallback to succeed"),
        }
    }

    #[test]
    fn control_bytes_fall_back_to_opaque() {
        let decoded = StringDecoded::decode(&[0xFF, 0x01, 0x02]);
        assert!(matches!(decoded, StringDecoded::LatinOpaque(_)));
    }
}

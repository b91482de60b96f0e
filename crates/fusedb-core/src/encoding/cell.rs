//! Fixed-width cell codec.
//!
//! A cell is a byte slice of exact column width. INSERT values arrive as
//! textual tokens from the parser and are encoded here; SELECT decodes
//! cells back into [`Value`]s.

use crate::error::EncodingError;
use crate::types::{ColumnType, Value};

/// Encode a textual token into `dest`, an exact-width, zeroed cell slot.
///
/// - INT: signed decimal, 8 bytes little-endian.
/// - FLOAT: IEEE-754 double, 8 bytes little-endian.
/// - BOOL: `true`/`false` (case-insensitive), one byte 1 or 0.
/// - CHAR(N): raw bytes, right-padded with NUL up to N.
pub fn encode_into(
    dest: &mut [u8],
    ty: ColumnType,
    column: &str,
    token: &str,
) -> Result<(), EncodingError> {
    match ty {
        ColumnType::Int => {
            let n: i64 = token.parse().map_err(|_| EncodingError::BadValue {
                column: column.to_string(),
                expected: "INT",
                value: token.to_string(),
            })?;
            dest[..8].copy_from_slice(&n.to_le_bytes());
        }
        ColumnType::Float => {
            let x: f64 = token.parse().map_err(|_| EncodingError::BadValue {
                column: column.to_string(),
                expected: "FLOAT",
                value: token.to_string(),
            })?;
            dest[..8].copy_from_slice(&x.to_le_bytes());
        }
        ColumnType::Bool => {
            if token.eq_ignore_ascii_case("true") {
                dest[0] = 1;
            } else if token.eq_ignore_ascii_case("false") {
                dest[0] = 0;
            } else {
                return Err(EncodingError::BadValue {
                    column: column.to_string(),
                    expected: "BOOL",
                    value: token.to_string(),
                });
            }
        }
        ColumnType::Char => {
            let bytes = token.as_bytes();
            if bytes.len() > dest.len() {
                return Err(EncodingError::ValueTooLong {
                    column: column.to_string(),
                    max: dest.len(),
                    actual: bytes.len(),
                });
            }
            // Remaining bytes stay NUL: the slot was zeroed by the caller.
            dest[..bytes.len()].copy_from_slice(bytes);
        }
    }
    Ok(())
}

/// Decode a cell of exact column width into a [`Value`].
///
/// CHAR cells keep their trailing NUL padding; readers may trim.
pub fn decode(ty: ColumnType, cell: &[u8]) -> Value {
    match ty {
        ColumnType::Int => Value::Int(i64::from_le_bytes(cell[..8].try_into().unwrap())),
        ColumnType::Float => Value::Float(f64::from_le_bytes(cell[..8].try_into().unwrap())),
        ColumnType::Bool => Value::Bool(cell[0] != 0),
        ColumnType::Char => Value::Char(String::from_utf8_lossy(cell).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_roundtrip() {
        let mut buf = [0u8; 8];
        encode_into(&mut buf, ColumnType::Int, "n", "-42").unwrap();
        assert_eq!(decode(ColumnType::Int, &buf), Value::Int(-42));
    }

    #[test]
    fn test_int_rejects_garbage() {
        let mut buf = [0u8; 8];
        let err = encode_into(&mut buf, ColumnType::Int, "n", "12x").unwrap_err();
        assert!(matches!(err, EncodingError::BadValue { .. }));
    }

    #[test]
    fn test_float_roundtrip_bit_exact() {
        let mut buf = [0u8; 8];
        encode_into(&mut buf, ColumnType::Float, "f", "1.25").unwrap();
        assert_eq!(decode(ColumnType::Float, &buf), Value::Float(1.25));

        encode_into(&mut buf, ColumnType::Float, "f", "-0.1").unwrap();
        match decode(ColumnType::Float, &buf) {
            Value::Float(x) => assert_eq!(x.to_bits(), (-0.1f64).to_bits()),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_bool_encoding() {
        let mut buf = [0u8; 1];
        encode_into(&mut buf, ColumnType::Bool, "b", "TRUE").unwrap();
        assert_eq!(buf[0], 1);
        encode_into(&mut buf, ColumnType::Bool, "b", "false").unwrap();
        assert_eq!(buf[0], 0);
        assert_eq!(decode(ColumnType::Bool, &buf), Value::Bool(false));

        assert!(encode_into(&mut buf, ColumnType::Bool, "b", "yes").is_err());
    }

    #[test]
    fn test_char_padding_retained() {
        let mut buf = [0u8; 10];
        encode_into(&mut buf, ColumnType::Char, "c", "abc").unwrap();
        assert_eq!(&buf[..4], b"abc\0");
        assert_eq!(
            decode(ColumnType::Char, &buf),
            Value::Char("abc\0\0\0\0\0\0\0".to_string())
        );
    }

    #[test]
    fn test_char_too_long() {
        let mut buf = [0u8; 3];
        let err = encode_into(&mut buf, ColumnType::Char, "c", "abcd").unwrap_err();
        match err {
            EncodingError::ValueTooLong { max, actual, .. } => {
                assert_eq!(max, 3);
                assert_eq!(actual, 4);
            }
            other => panic!("expected ValueTooLong, got {other:?}"),
        }
    }

    #[test]
    fn test_char_exact_width_fits() {
        let mut buf = [0u8; 3];
        encode_into(&mut buf, ColumnType::Char, "c", "abc").unwrap();
        assert_eq!(&buf, b"abc");
    }
}

use std::fmt;

use crate::descriptor::{ByteFormat, DataType};
use crate::error::DecodeError;

/// Unscaled value as read from the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl RawValue {
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::U16(v) => f64::from(v),
            Self::I16(v) => f64::from(v),
            Self::U32(v) => f64::from(v),
            Self::I32(v) => f64::from(v),
            Self::U64(v) => v as f64,
            Self::I64(v) => v as f64,
            Self::F32(v) => f64::from(v),
            Self::F64(v) => v,
        }
    }

    pub fn scaled(self, scale: f64) -> f64 {
        self.as_f64() * scale
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U16(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
        }
    }
}

/// Puts `words` into big-endian order according to `format`.
pub fn reorder_words(words: &[u16], format: ByteFormat) -> Vec<u16> {
    match format {
        ByteFormat::Abcd | ByteFormat::Ab => words.to_vec(),
        ByteFormat::Cdab => words.iter().rev().copied().collect(),
        ByteFormat::Ba | ByteFormat::Badc => words.iter().map(|word| word.swap_bytes()).collect(),
        ByteFormat::Dcba => words.iter().rev().map(|word| word.swap_bytes()).collect(),
    }
}

/// Interprets big-endian ordered words as `data_type`.
///
/// The word count must match the type width exactly.
pub fn decode_words(words: &[u16], data_type: DataType) -> Result<RawValue, DecodeError> {
    let expected = data_type.word_count();
    if words.len() != expected {
        return Err(DecodeError::WordCount {
            data_type,
            expected,
            actual: words.len(),
        });
    }

    let value = match data_type {
        DataType::Uint16 => RawValue::U16(words[0]),
        DataType::Int16 => RawValue::I16(i16::from_be_bytes(words[0].to_be_bytes())),
        DataType::Uint32 => RawValue::U32(u32::from_be_bytes(be_bytes::<4>(words))),
        DataType::Int32 => RawValue::I32(i32::from_be_bytes(be_bytes::<4>(words))),
        DataType::Float32 => RawValue::F32(f32::from_be_bytes(be_bytes::<4>(words))),
        DataType::Uint64 => RawValue::U64(u64::from_be_bytes(be_bytes::<8>(words))),
        DataType::Int64 => RawValue::I64(i64::from_be_bytes(be_bytes::<8>(words))),
        DataType::Float64 => RawValue::F64(f64::from_be_bytes(be_bytes::<8>(words))),
    };
    Ok(value)
}

/// Reorders the words a type consumes and decodes them.
///
/// Words past the type width (a descriptor with surplus quantity) are ignored.
pub fn decode_register(
    words: &[u16],
    data_type: DataType,
    format: ByteFormat,
) -> Result<RawValue, DecodeError> {
    let needed = data_type.word_count();
    let used = words.get(..needed).ok_or(DecodeError::WordCount {
        data_type,
        expected: needed,
        actual: words.len(),
    })?;
    decode_words(&reorder_words(used, format), data_type)
}

fn be_bytes<const N: usize>(words: &[u16]) -> [u8; N] {
    let mut bytes = [0u8; N];
    for (chunk, word) in bytes.chunks_exact_mut(2).zip(words) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::{RawValue, decode_register, decode_words, reorder_words};
    use crate::descriptor::{ByteFormat, DataType};
    use crate::error::DecodeError;

    #[test]
    fn word_swapped_uint32() {
        let value = decode_register(&[0x0001, 0x0002], DataType::Uint32, ByteFormat::Cdab)
            .expect("should decode");
        assert_eq!(value, RawValue::U32(0x0002_0001));
        assert_eq!(value, RawValue::U32(131_073));
    }

    #[test]
    fn byte_swap_is_an_involution() {
        for format in [ByteFormat::Ba, ByteFormat::Badc] {
            let once = reorder_words(&[0xAABB], format);
            assert_eq!(once, vec![0xBBAA]);
            assert_eq!(reorder_words(&once, format), vec![0xAABB]);
        }
    }

    #[test]
    fn badc_keeps_word_order() {
        assert_eq!(
            reorder_words(&[0x0102, 0x0304], ByteFormat::Badc),
            vec![0x0201, 0x0403]
        );
    }

    #[test]
    fn full_swap_reverses_words_then_bytes() {
        assert_eq!(
            reorder_words(&[0x0001, 0x0002], ByteFormat::Dcba),
            vec![0x0200, 0x0100]
        );
    }

    #[test]
    fn identity_formats_leave_words_alone() {
        let words = [0x1234, 0x5678, 0x9ABC, 0xDEF0];
        assert_eq!(reorder_words(&words, ByteFormat::Abcd), words.to_vec());
        assert_eq!(reorder_words(&words, ByteFormat::Ab), words.to_vec());
        assert_eq!(
            reorder_words(&words, ByteFormat::Cdab),
            vec![0xDEF0, 0x9ABC, 0x5678, 0x1234]
        );
    }

    #[test]
    fn sixteen_bit_signedness() {
        assert_eq!(decode_words(&[0xFFFF], DataType::Int16), Ok(RawValue::I16(-1)));
        assert_eq!(decode_words(&[0xFFFF], DataType::Uint16), Ok(RawValue::U16(65_535)));
    }

    #[test]
    fn float32_ieee_layout() {
        let value = decode_words(&[0x4048, 0xF5C3], DataType::Float32).expect("should decode");
        assert_eq!((value.as_f64() * 100.0).round(), 314.0, "{value}");
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn sixty_four_bit_types() {
        let words = [0xFFFF, 0xFFFF, 0xFFFF, 0xFFFE];
        assert_eq!(decode_words(&words, DataType::Int64), Ok(RawValue::I64(-2)));
        assert_eq!(
            decode_words(&[0x0000, 0x0001, 0x0000, 0x0000], DataType::Uint64),
            Ok(RawValue::U64(1 << 32))
        );
        let pi = std::f64::consts::PI.to_bits();
        let words = [
            (pi >> 48) as u16,
            (pi >> 32) as u16,
            (pi >> 16) as u16,
            pi as u16,
        ];
        assert_eq!(
            decode_words(&words, DataType::Float64),
            Ok(RawValue::F64(std::f64::consts::PI))
        );
    }

    #[test]
    fn signed_32_bit_with_full_swap() {
        // -2 is 0xFFFF_FFFE; DCBA lays it out as FE FF FF FF.
        let value = decode_register(&[0xFEFF, 0xFFFF], DataType::Int32, ByteFormat::Dcba)
            .expect("should decode");
        assert_eq!(value, RawValue::I32(-2));
    }

    #[test]
    fn nan_passes_through() {
        let value = decode_words(&[0x7FC0, 0x0000], DataType::Float32).expect("should decode");
        assert!(value.as_f64().is_nan());
    }

    #[test]
    fn word_count_mismatch_is_an_error() {
        let err = decode_words(&[0x0001], DataType::Uint32).expect_err("too few words");
        assert_eq!(
            err,
            DecodeError::WordCount {
                data_type: DataType::Uint32,
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn surplus_words_are_not_consumed() {
        let words = [0x0001, 0x0002, 0xFFFF, 0xFFFF];
        let value =
            decode_register(&words, DataType::Uint32, ByteFormat::Cdab).expect("should decode");
        assert_eq!(value, RawValue::U32(0x0002_0001));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = "ACBD".parse::<ByteFormat>().expect_err("unknown format");
        assert_eq!(err, DecodeError::UnsupportedByteFormat("ACBD".into()));
        let err = "bool".parse::<DataType>().expect_err("unknown type");
        assert_eq!(err, DecodeError::UnsupportedDataType("bool".into()));
    }

    #[test]
    fn scaling_promotes_to_float() {
        assert!((RawValue::I16(-15).scaled(0.1) - -1.5).abs() < 1e-12);
        assert!((RawValue::U32(1000).scaled(0.001) - 1.0).abs() < 1e-12);
    }
}

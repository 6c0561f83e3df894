//! Byte-level encodings shared with the engine.
//!
//! Dense buffers are raw little-endian element arrays with no header. Sparse
//! vectors travel as two buffers of equal element count: `u32` indices and
//! values in the element type. Byte-string sequences carry a `u32`
//! little-endian length prefix per item.

use half::f16;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("buffer of {len} bytes is not a multiple of the {width}-byte element width")]
    Misaligned { len: usize, width: usize },

    #[error("expected exactly {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("sparse buffers disagree: {indices} indices vs {values} values")]
    SparseLengthMismatch { indices: usize, values: usize },

    #[error("truncated length-prefixed sequence at byte {offset}")]
    Truncated { offset: usize },

    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("value {value} out of range for {target}")]
    OutOfRange { value: i64, target: &'static str },

    #[error("expected a {expected} buffer")]
    ShapeMismatch { expected: &'static str },
}

/// An encoded field value as exchanged with the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    Dense(Vec<u8>),
    Sparse { indices: Vec<u8>, values: Vec<u8> },
}

impl Encoded {
    pub fn byte_len(&self) -> usize {
        match self {
            Encoded::Dense(b) => b.len(),
            Encoded::Sparse { indices, values } => indices.len() + values.len(),
        }
    }

    pub fn dense(&self) -> Result<&[u8], CodecError> {
        match self {
            Encoded::Dense(b) => Ok(b),
            Encoded::Sparse { .. } => Err(CodecError::ShapeMismatch { expected: "dense" }),
        }
    }

    pub fn sparse(&self) -> Result<(&[u8], &[u8]), CodecError> {
        match self {
            Encoded::Sparse { indices, values } => Ok((indices, values)),
            Encoded::Dense(_) => Err(CodecError::ShapeMismatch { expected: "sparse" }),
        }
    }
}

/// Fixed-width numeric element with a little-endian wire form.
pub trait LeElement: Copy {
    const WIDTH: usize;

    fn put_le(self, out: &mut Vec<u8>);

    /// `bytes` is exactly `WIDTH` long.
    fn get_le(bytes: &[u8]) -> Self;
}

macro_rules! le_element {
    ($($t:ty => $w:expr),* $(,)?) => {
        $(
            impl LeElement for $t {
                const WIDTH: usize = $w;

                #[inline]
                fn put_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn get_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; $w];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

le_element!(
    i8 => 1,
    i16 => 2,
    i32 => 4,
    i64 => 8,
    u32 => 4,
    u64 => 8,
    f16 => 2,
    f32 => 4,
    f64 => 8,
);

pub fn encode_slice<T: LeElement>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::WIDTH);
    for &v in values {
        v.put_le(&mut out);
    }
    out
}

pub fn decode_slice<T: LeElement>(bytes: &[u8]) -> Result<Vec<T>, CodecError> {
    if bytes.len() % T::WIDTH != 0 {
        return Err(CodecError::Misaligned {
            len: bytes.len(),
            width: T::WIDTH,
        });
    }
    Ok(bytes.chunks_exact(T::WIDTH).map(T::get_le).collect())
}

pub fn encode_scalar<T: LeElement>(value: T) -> Vec<u8> {
    let mut out = Vec::with_capacity(T::WIDTH);
    value.put_le(&mut out);
    out
}

pub fn decode_scalar<T: LeElement>(bytes: &[u8]) -> Result<T, CodecError> {
    if bytes.len() != T::WIDTH {
        return Err(CodecError::WrongLength {
            expected: T::WIDTH,
            actual: bytes.len(),
        });
    }
    Ok(T::get_le(bytes))
}

#[inline]
pub fn encode_bools(values: &[bool]) -> Vec<u8> {
    values.iter().map(|&b| u8::from(b)).collect()
}

pub fn decode_bools(bytes: &[u8]) -> Result<Vec<bool>, CodecError> {
    bytes
        .iter()
        .map(|&b| match b {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        })
        .collect()
}

pub fn encode_byte_strings<B: AsRef<[u8]>>(items: &[B]) -> Vec<u8> {
    let total: usize = items.iter().map(|i| 4 + i.as_ref().len()).sum();
    let mut out = Vec::with_capacity(total);
    for item in items {
        let item = item.as_ref();
        // Lengths beyond u32 cannot be produced by the engine either.
        (item.len() as u32).put_le(&mut out);
        out.extend_from_slice(item);
    }
    out
}

pub fn decode_byte_strings(bytes: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
    let mut items = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let header = bytes
            .get(offset..offset + 4)
            .ok_or(CodecError::Truncated { offset })?;
        let len = u32::get_le(header) as usize;
        let start = offset + 4;
        let item = bytes
            .get(start..start + len)
            .ok_or(CodecError::Truncated { offset })?;
        items.push(item.to_vec());
        offset = start + len;
    }
    Ok(items)
}

pub fn encode_strings(items: &[String]) -> Vec<u8> {
    encode_byte_strings(items)
}

pub fn decode_strings(bytes: &[u8]) -> Result<Vec<String>, CodecError> {
    decode_byte_strings(bytes)?
        .into_iter()
        .map(|raw| String::from_utf8(raw).map_err(|e| CodecError::InvalidUtf8(e.to_string())))
        .collect()
}

pub fn encode_sparse<T: LeElement>(indices: &[u32], values: &[T]) -> Encoded {
    Encoded::Sparse {
        indices: encode_slice(indices),
        values: encode_slice(values),
    }
}

pub fn decode_sparse<T: LeElement>(
    indices: &[u8],
    values: &[u8],
) -> Result<(Vec<u32>, Vec<T>), CodecError> {
    let idx = decode_slice::<u32>(indices)?;
    let vals = decode_slice::<T>(values)?;
    if idx.len() != vals.len() {
        return Err(CodecError::SparseLengthMismatch {
            indices: idx.len(),
            values: vals.len(),
        });
    }
    Ok((idx, vals))
}

/// Narrows to binary16 with round-to-nearest-even.
#[inline]
pub fn narrow_f16(v: f32) -> f16 {
    f16::from_f32(v)
}

#[inline]
pub fn widen_f16(v: f16) -> f32 {
    v.to_f32()
}

/// INT4 values are carried one per signed byte and must fit in a nibble.
pub fn check_int4(values: &[i8]) -> Result<(), CodecError> {
    match values.iter().find(|v| !(-8..=7).contains(*v)) {
        Some(&v) => Err(CodecError::OutOfRange {
            value: i64::from(v),
            target: "INT4",
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_f32_is_raw_little_endian() {
        let buf = encode_slice(&[1.0f32, -2.5]);
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&buf[4..8], &(-2.5f32).to_le_bytes());
        assert_eq!(decode_slice::<f32>(&buf).unwrap(), vec![1.0, -2.5]);
    }

    #[test]
    fn test_misaligned_buffer_rejected() {
        let err = decode_slice::<f32>(&[0u8; 6]).unwrap_err();
        assert_eq!(err, CodecError::Misaligned { len: 6, width: 4 });
    }

    #[test]
    fn test_sparse_buffers_must_agree() {
        let indices = encode_slice(&[0u32, 7]);
        let values = encode_slice(&[0.5f32]);
        let err = decode_sparse::<f32>(&indices, &values).unwrap_err();
        assert_eq!(err, CodecError::SparseLengthMismatch { indices: 2, values: 1 });
    }

    #[test]
    fn test_sparse_preserves_index_order() {
        let Encoded::Sparse { indices, values } = encode_sparse(&[9u32, 2, 5], &[1.0f32, 2.0, 3.0]) else {
            panic!("expected sparse encoding");
        };
        let (idx, vals) = decode_sparse::<f32>(&indices, &values).unwrap();
        assert_eq!(idx, vec![9, 2, 5]);
        assert_eq!(vals, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_length_prefixed_strings() {
        let items = vec!["a".to_string(), String::new(), "héllo".to_string()];
        let buf = encode_strings(&items);
        assert_eq!(&buf[0..4], &1u32.to_le_bytes());
        assert_eq!(decode_strings(&buf).unwrap(), items);
    }

    #[test]
    fn test_truncated_strings_rejected() {
        let mut buf = encode_strings(&["abc".to_string()]);
        buf.pop();
        assert!(matches!(decode_strings(&buf), Err(CodecError::Truncated { offset: 0 })));
    }

    #[test]
    fn test_bools() {
        assert_eq!(decode_bools(&encode_bools(&[true, false])).unwrap(), vec![true, false]);
        assert_eq!(decode_bools(&[2]).unwrap_err(), CodecError::InvalidBool(2));
    }

    #[test]
    fn test_f16_rounding_is_fixed_point() {
        for v in [0.1f32, 1.0 / 3.0, 65504.0, -0.000_061_035_156, 1234.567] {
            let once = widen_f16(narrow_f16(v));
            let twice = widen_f16(narrow_f16(once));
            assert_eq!(once.to_bits(), twice.to_bits());
        }
        assert_eq!(widen_f16(narrow_f16(0.5)), 0.5);
    }

    #[test]
    fn test_scalar_width_checked() {
        assert_eq!(decode_scalar::<i32>(&encode_scalar(-7i32)).unwrap(), -7);
        assert!(decode_scalar::<i64>(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_int4_range() {
        assert!(check_int4(&[-8, 0, 7]).is_ok());
        assert!(check_int4(&[8]).is_err());
    }
}

use half::f16;
use serde_json::{Map, Number, Value as Json};

use crate::codec::{self, CodecError, Encoded};
use crate::{DataType, Error, Result};

/// A typed field value. One variant per [`DataType`] plus an explicit null
/// marker, distinct from a field being absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Binary(Vec<u8>),
    String(String),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    VectorBinary32(Vec<u32>),
    VectorBinary64(Vec<u64>),
    VectorFp16(Vec<f16>),
    VectorFp32(Vec<f32>),
    VectorFp64(Vec<f64>),
    VectorInt4(Vec<i8>),
    VectorInt8(Vec<i8>),
    VectorInt16(Vec<i16>),
    SparseVectorFp16 { indices: Vec<u32>, values: Vec<f16> },
    SparseVectorFp32 { indices: Vec<u32>, values: Vec<f32> },
    ArrayBinary(Vec<Vec<u8>>),
    ArrayString(Vec<String>),
    ArrayBool(Vec<bool>),
    ArrayInt32(Vec<i32>),
    ArrayInt64(Vec<i64>),
    ArrayUint32(Vec<u32>),
    ArrayUint64(Vec<u64>),
    ArrayFloat(Vec<f32>),
    ArrayDouble(Vec<f64>),
}

impl Value {
    /// `None` only for [`Value::Null`].
    pub fn data_type(&self) -> Option<DataType> {
        let dt = match self {
            Value::Null => return None,
            Value::Binary(_) => DataType::Binary,
            Value::String(_) => DataType::String,
            Value::Bool(_) => DataType::Bool,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Uint32(_) => DataType::Uint32,
            Value::Uint64(_) => DataType::Uint64,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::VectorBinary32(_) => DataType::VectorBinary32,
            Value::VectorBinary64(_) => DataType::VectorBinary64,
            Value::VectorFp16(_) => DataType::VectorFp16,
            Value::VectorFp32(_) => DataType::VectorFp32,
            Value::VectorFp64(_) => DataType::VectorFp64,
            Value::VectorInt4(_) => DataType::VectorInt4,
            Value::VectorInt8(_) => DataType::VectorInt8,
            Value::VectorInt16(_) => DataType::VectorInt16,
            Value::SparseVectorFp16 { .. } => DataType::SparseVectorFp16,
            Value::SparseVectorFp32 { .. } => DataType::SparseVectorFp32,
            Value::ArrayBinary(_) => DataType::ArrayBinary,
            Value::ArrayString(_) => DataType::ArrayString,
            Value::ArrayBool(_) => DataType::ArrayBool,
            Value::ArrayInt32(_) => DataType::ArrayInt32,
            Value::ArrayInt64(_) => DataType::ArrayInt64,
            Value::ArrayUint32(_) => DataType::ArrayUint32,
            Value::ArrayUint64(_) => DataType::ArrayUint64,
            Value::ArrayFloat(_) => DataType::ArrayFloat,
            Value::ArrayDouble(_) => DataType::ArrayDouble,
        };
        Some(dt)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Builds a sparse FP32 vector from `(index, value)` pairs, keeping their order.
    pub fn sparse_fp32<I: IntoIterator<Item = (u32, f32)>>(entries: I) -> Self {
        let (indices, values) = entries.into_iter().unzip();
        Value::SparseVectorFp32 { indices, values }
    }

    /// Builds a sparse FP16 vector, narrowing each value.
    pub fn sparse_fp16<I: IntoIterator<Item = (u32, f32)>>(entries: I) -> Self {
        let (indices, values) = entries
            .into_iter()
            .map(|(i, v)| (i, codec::narrow_f16(v)))
            .unzip();
        Value::SparseVectorFp16 { indices, values }
    }

    /// Narrows an f32 slice into an FP16 dense vector.
    pub fn vector_fp16(values: &[f32]) -> Self {
        Value::VectorFp16(values.iter().map(|&v| codec::narrow_f16(v)).collect())
    }

    /// Canonical encoding. `Null` encodes as an empty dense buffer.
    pub fn encode(&self) -> Encoded {
        use codec::{encode_bools, encode_byte_strings, encode_scalar, encode_slice, encode_sparse};
        let bytes = match self {
            Value::Null => Vec::new(),
            Value::Binary(b) => b.clone(),
            Value::String(s) => s.as_bytes().to_vec(),
            Value::Bool(b) => encode_bools(&[*b]),
            Value::Int32(v) => encode_scalar(*v),
            Value::Int64(v) => encode_scalar(*v),
            Value::Uint32(v) => encode_scalar(*v),
            Value::Uint64(v) => encode_scalar(*v),
            Value::Float(v) => encode_scalar(*v),
            Value::Double(v) => encode_scalar(*v),
            Value::VectorBinary32(v) | Value::ArrayUint32(v) => encode_slice(v),
            Value::VectorBinary64(v) | Value::ArrayUint64(v) => encode_slice(v),
            Value::VectorFp16(v) => encode_slice(v),
            Value::VectorFp32(v) | Value::ArrayFloat(v) => encode_slice(v),
            Value::VectorFp64(v) | Value::ArrayDouble(v) => encode_slice(v),
            Value::VectorInt4(v) | Value::VectorInt8(v) => encode_slice(v),
            Value::VectorInt16(v) => encode_slice(v),
            Value::SparseVectorFp16 { indices, values } => return encode_sparse(indices, values),
            Value::SparseVectorFp32 { indices, values } => return encode_sparse(indices, values),
            Value::ArrayBinary(items) => encode_byte_strings(items),
            Value::ArrayString(items) => encode_byte_strings(items),
            Value::ArrayBool(v) => encode_bools(v),
            Value::ArrayInt32(v) => encode_slice(v),
            Value::ArrayInt64(v) => encode_slice(v),
        };
        Encoded::Dense(bytes)
    }

    /// Decodes an engine buffer as `data_type`.
    pub fn decode(data_type: DataType, encoded: &Encoded) -> Result<Value> {
        Self::decode_raw(data_type, encoded).map_err(|e| Error::decode("", data_type, e.to_string()))
    }

    fn decode_raw(data_type: DataType, encoded: &Encoded) -> std::result::Result<Value, CodecError> {
        use codec::{decode_bools, decode_byte_strings, decode_scalar, decode_slice, decode_sparse, decode_strings};

        if data_type.is_sparse_vector() {
            let (indices, values) = encoded.sparse()?;
            return Ok(match data_type {
                DataType::SparseVectorFp16 => {
                    let (indices, values) = decode_sparse::<f16>(indices, values)?;
                    Value::SparseVectorFp16 { indices, values }
                }
                _ => {
                    let (indices, values) = decode_sparse::<f32>(indices, values)?;
                    Value::SparseVectorFp32 { indices, values }
                }
            });
        }

        let bytes = encoded.dense()?;
        let value = match data_type {
            DataType::Binary => Value::Binary(bytes.to_vec()),
            DataType::String => Value::String(
                String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::InvalidUtf8(e.to_string()))?,
            ),
            DataType::Bool => {
                let flags = decode_bools(bytes)?;
                match flags.as_slice() {
                    [b] => Value::Bool(*b),
                    _ => {
                        return Err(CodecError::WrongLength {
                            expected: 1,
                            actual: bytes.len(),
                        })
                    }
                }
            }
            DataType::Int32 => Value::Int32(decode_scalar(bytes)?),
            DataType::Int64 => Value::Int64(decode_scalar(bytes)?),
            DataType::Uint32 => Value::Uint32(decode_scalar(bytes)?),
            DataType::Uint64 => Value::Uint64(decode_scalar(bytes)?),
            DataType::Float => Value::Float(decode_scalar(bytes)?),
            DataType::Double => Value::Double(decode_scalar(bytes)?),
            DataType::VectorBinary32 => Value::VectorBinary32(decode_slice(bytes)?),
            DataType::VectorBinary64 => Value::VectorBinary64(decode_slice(bytes)?),
            DataType::VectorFp16 => Value::VectorFp16(decode_slice(bytes)?),
            DataType::VectorFp32 => Value::VectorFp32(decode_slice(bytes)?),
            DataType::VectorFp64 => Value::VectorFp64(decode_slice(bytes)?),
            DataType::VectorInt4 => {
                let values = decode_slice::<i8>(bytes)?;
                codec::check_int4(&values)?;
                Value::VectorInt4(values)
            }
            DataType::VectorInt8 => Value::VectorInt8(decode_slice(bytes)?),
            DataType::VectorInt16 => Value::VectorInt16(decode_slice(bytes)?),
            DataType::ArrayBinary => Value::ArrayBinary(decode_byte_strings(bytes)?),
            DataType::ArrayString => Value::ArrayString(decode_strings(bytes)?),
            DataType::ArrayBool => Value::ArrayBool(decode_bools(bytes)?),
            DataType::ArrayInt32 => Value::ArrayInt32(decode_slice(bytes)?),
            DataType::ArrayInt64 => Value::ArrayInt64(decode_slice(bytes)?),
            DataType::ArrayUint32 => Value::ArrayUint32(decode_slice(bytes)?),
            DataType::ArrayUint64 => Value::ArrayUint64(decode_slice(bytes)?),
            DataType::ArrayFloat => Value::ArrayFloat(decode_slice(bytes)?),
            DataType::ArrayDouble => Value::ArrayDouble(decode_slice(bytes)?),
            DataType::SparseVectorFp16 | DataType::SparseVectorFp32 => {
                unreachable!("sparse types handled above")
            }
        };
        Ok(value)
    }

    /// Reads this value as `data_type`. Identical types clone; types that
    /// share an element layout re-decode the canonical bytes; anything else
    /// is a decode error.
    pub fn reinterpret(&self, data_type: DataType) -> Result<Value> {
        match self.data_type() {
            None => Ok(Value::Null),
            Some(stored) if stored == data_type => Ok(self.clone()),
            Some(stored) if stored.shares_layout(data_type) => Value::decode(data_type, &self.encode()),
            Some(stored) => Err(Error::decode("", data_type, format!("stored as {}", stored))),
        }
    }

    /// Number of elements for vectors and arrays, 1 for scalars, 0 for null.
    pub fn len(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::VectorBinary32(v) | Value::ArrayUint32(v) => v.len(),
            Value::VectorBinary64(v) | Value::ArrayUint64(v) => v.len(),
            Value::VectorFp16(v) => v.len(),
            Value::VectorFp32(v) | Value::ArrayFloat(v) => v.len(),
            Value::VectorFp64(v) | Value::ArrayDouble(v) => v.len(),
            Value::VectorInt4(v) | Value::VectorInt8(v) => v.len(),
            Value::VectorInt16(v) => v.len(),
            Value::SparseVectorFp16 { indices, .. } | Value::SparseVectorFp32 { indices, .. } => {
                indices.len()
            }
            Value::ArrayBinary(v) => v.len(),
            Value::ArrayString(v) => v.len(),
            Value::ArrayBool(v) => v.len(),
            Value::ArrayInt32(v) => v.len(),
            Value::ArrayInt64(v) => v.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate heap footprint, used for memory accounting.
    pub fn approx_bytes(&self) -> usize {
        std::mem::size_of::<Value>() + self.encode().byte_len()
    }

    /// Dense vector widened to f32, for scoring.
    pub fn to_f32_vector(&self) -> Option<Vec<f32>> {
        let v = match self {
            Value::VectorFp32(v) => v.clone(),
            Value::VectorFp16(v) => v.iter().map(|&x| codec::widen_f16(x)).collect(),
            Value::VectorFp64(v) => v.iter().map(|&x| x as f32).collect(),
            Value::VectorInt4(v) | Value::VectorInt8(v) => v.iter().map(|&x| f32::from(x)).collect(),
            Value::VectorInt16(v) => v.iter().map(|&x| f32::from(x)).collect(),
            Value::VectorBinary32(v) => unpack_bits(v.iter().flat_map(|w| w.to_le_bytes())),
            Value::VectorBinary64(v) => unpack_bits(v.iter().flat_map(|w| w.to_le_bytes())),
            _ => return None,
        };
        Some(v)
    }

    /// Sparse entries widened to f32, in stored order.
    pub fn sparse_entries(&self) -> Option<(Vec<u32>, Vec<f32>)> {
        match self {
            Value::SparseVectorFp32 { indices, values } => Some((indices.clone(), values.clone())),
            Value::SparseVectorFp16 { indices, values } => Some((
                indices.clone(),
                values.iter().map(|&v| codec::widen_f16(v)).collect(),
            )),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Uint32(v) => Some(f64::from(*v)),
            Value::Uint64(v) => Some(*v as f64),
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Binary(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Plain rendering for scalars, used as group-by keys.
    pub fn to_key_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Binary(b) => String::from_utf8_lossy(b).into_owned(),
            Value::Bool(b) => b.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Uint32(v) => v.to_string(),
            Value::Uint64(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            other => other.to_json().to_string(),
        }
    }

    pub fn to_json(&self) -> Json {
        fn float(v: f64) -> Json {
            Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null)
        }
        fn list<T, F: Fn(&T) -> Json>(items: &[T], f: F) -> Json {
            Json::Array(items.iter().map(f).collect())
        }
        fn bytes(b: &[u8]) -> Json {
            list(b, |x| Json::from(*x))
        }

        match self {
            Value::Null => Json::Null,
            Value::Binary(b) => bytes(b),
            Value::String(s) => Json::String(s.clone()),
            Value::Bool(b) => Json::Bool(*b),
            Value::Int32(v) => Json::from(*v),
            Value::Int64(v) => Json::from(*v),
            Value::Uint32(v) => Json::from(*v),
            Value::Uint64(v) => Json::from(*v),
            Value::Float(v) => float(f64::from(*v)),
            Value::Double(v) => float(*v),
            Value::VectorBinary32(v) | Value::ArrayUint32(v) => list(v, |x| Json::from(*x)),
            Value::VectorBinary64(v) | Value::ArrayUint64(v) => list(v, |x| Json::from(*x)),
            Value::VectorFp16(v) => list(v, |x| float(f64::from(x.to_f32()))),
            Value::VectorFp32(v) | Value::ArrayFloat(v) => list(v, |x| float(f64::from(*x))),
            Value::VectorFp64(v) | Value::ArrayDouble(v) => list(v, |x| float(*x)),
            Value::VectorInt4(v) | Value::VectorInt8(v) => list(v, |x| Json::from(*x)),
            Value::VectorInt16(v) => list(v, |x| Json::from(*x)),
            Value::SparseVectorFp16 { indices, values } => {
                let widened: Vec<f32> = values.iter().map(|v| v.to_f32()).collect();
                sparse_json(indices, &widened)
            }
            Value::SparseVectorFp32 { indices, values } => sparse_json(indices, values),
            Value::ArrayBinary(items) => list(items, |b| bytes(b)),
            Value::ArrayString(items) => list(items, |s| Json::String(s.clone())),
            Value::ArrayBool(items) => list(items, |b| Json::Bool(*b)),
            Value::ArrayInt32(v) => list(v, |x| Json::from(*x)),
            Value::ArrayInt64(v) => list(v, |x| Json::from(*x)),
        }
    }

    /// Converts a dynamically-typed caller value into the storage shape for
    /// `data_type`. JSON `null` yields [`Value::Null`].
    ///
    /// Sparse vectors accept an object `{"<index>": value}` (insertion order
    /// is kept) or an array of `[index, value]` pairs.
    pub fn from_json(data_type: DataType, json: &Json) -> Result<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        let bad = |what: &str| {
            Error::InvalidArgument(format!("expected {} for {}, got {}", what, data_type, json))
        };

        let value = match data_type {
            DataType::String => Value::String(json.as_str().ok_or_else(|| bad("a string"))?.to_string()),
            DataType::Binary => Value::Binary(json_bytes(json).ok_or_else(|| bad("a string or byte array"))?),
            DataType::Bool => Value::Bool(json.as_bool().ok_or_else(|| bad("a boolean"))?),
            DataType::Int32 => Value::Int32(json_int(json, data_type)?),
            DataType::Int64 => Value::Int64(json_int(json, data_type)?),
            DataType::Uint32 => Value::Uint32(json_int(json, data_type)?),
            DataType::Uint64 => Value::Uint64(json_uint(json, data_type)?),
            DataType::Float => Value::Float(json_f64(json, data_type)? as f32),
            DataType::Double => Value::Double(json_f64(json, data_type)?),
            DataType::SparseVectorFp16 | DataType::SparseVectorFp32 => {
                let entries = json_sparse(json, data_type)?;
                if data_type == DataType::SparseVectorFp16 {
                    Value::sparse_fp16(entries)
                } else {
                    Value::sparse_fp32(entries)
                }
            }
            _ => {
                let items = json.as_array().ok_or_else(|| bad("an array"))?;
                sequence_from_json(data_type, items)?
            }
        };
        Ok(value)
    }
}

fn sequence_from_json(data_type: DataType, items: &[Json]) -> Result<Value> {
    fn each<T>(items: &[Json], f: impl Fn(&Json) -> Result<T>) -> Result<Vec<T>> {
        items.iter().map(f).collect()
    }

    let value = match data_type {
        DataType::VectorBinary32 => Value::VectorBinary32(each(items, |j| json_int(j, data_type))?),
        DataType::VectorBinary64 => Value::VectorBinary64(each(items, |j| json_uint(j, data_type))?),
        DataType::VectorFp16 => {
            Value::VectorFp16(each(items, |j| Ok(codec::narrow_f16(json_f64(j, data_type)? as f32)))?)
        }
        DataType::VectorFp32 => Value::VectorFp32(each(items, |j| Ok(json_f64(j, data_type)? as f32))?),
        DataType::VectorFp64 => Value::VectorFp64(each(items, |j| json_f64(j, data_type))?),
        DataType::VectorInt4 => {
            let values: Vec<i8> = each(items, |j| json_int(j, data_type))?;
            codec::check_int4(&values).map_err(|e| Error::InvalidArgument(e.to_string()))?;
            Value::VectorInt4(values)
        }
        DataType::VectorInt8 => Value::VectorInt8(each(items, |j| json_int(j, data_type))?),
        DataType::VectorInt16 => Value::VectorInt16(each(items, |j| json_int(j, data_type))?),
        DataType::ArrayBinary => Value::ArrayBinary(each(items, |j| {
            json_bytes(j).ok_or_else(|| Error::InvalidArgument(format!("expected bytes in {}, got {}", data_type, j)))
        })?),
        DataType::ArrayString => Value::ArrayString(each(items, |j| {
            j.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidArgument(format!("expected string in {}, got {}", data_type, j)))
        })?),
        DataType::ArrayBool => Value::ArrayBool(each(items, |j| {
            j.as_bool()
                .ok_or_else(|| Error::InvalidArgument(format!("expected boolean in {}, got {}", data_type, j)))
        })?),
        DataType::ArrayInt32 => Value::ArrayInt32(each(items, |j| json_int(j, data_type))?),
        DataType::ArrayInt64 => Value::ArrayInt64(each(items, |j| json_int(j, data_type))?),
        DataType::ArrayUint32 => Value::ArrayUint32(each(items, |j| json_int(j, data_type))?),
        DataType::ArrayUint64 => Value::ArrayUint64(each(items, |j| json_uint(j, data_type))?),
        DataType::ArrayFloat => Value::ArrayFloat(each(items, |j| Ok(json_f64(j, data_type)? as f32))?),
        DataType::ArrayDouble => Value::ArrayDouble(each(items, |j| json_f64(j, data_type))?),
        other => {
            return Err(Error::InvalidArgument(format!("{} is not a sequence type", other)));
        }
    };
    Ok(value)
}

fn json_int<T: TryFrom<i64>>(json: &Json, data_type: DataType) -> Result<T> {
    let raw = json
        .as_i64()
        .ok_or_else(|| Error::InvalidArgument(format!("expected an integer for {}, got {}", data_type, json)))?;
    T::try_from(raw)
        .map_err(|_| Error::InvalidArgument(format!("{} is out of range for {}", raw, data_type)))
}

fn json_uint(json: &Json, data_type: DataType) -> Result<u64> {
    json.as_u64()
        .ok_or_else(|| Error::InvalidArgument(format!("expected an unsigned integer for {}, got {}", data_type, json)))
}

fn json_f64(json: &Json, data_type: DataType) -> Result<f64> {
    json.as_f64()
        .ok_or_else(|| Error::InvalidArgument(format!("expected a number for {}, got {}", data_type, json)))
}

fn json_bytes(json: &Json) -> Option<Vec<u8>> {
    match json {
        Json::String(s) => Some(s.as_bytes().to_vec()),
        Json::Array(items) => items
            .iter()
            .map(|j| j.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect(),
        _ => None,
    }
}

fn json_sparse(json: &Json, data_type: DataType) -> Result<Vec<(u32, f32)>> {
    let bad_index = |raw: &dyn std::fmt::Display| {
        Error::InvalidArgument(format!("invalid sparse index {} for {}", raw, data_type))
    };
    match json {
        Json::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let idx: u32 = k.trim().parse().map_err(|_| bad_index(k))?;
                Ok((idx, json_f64(v, data_type)? as f32))
            })
            .collect(),
        Json::Array(pairs) => pairs
            .iter()
            .map(|pair| match pair.as_array().map(Vec::as_slice) {
                Some([idx, val]) => {
                    let idx = idx
                        .as_u64()
                        .and_then(|i| u32::try_from(i).ok())
                        .ok_or_else(|| bad_index(idx))?;
                    Ok((idx, json_f64(val, data_type)? as f32))
                }
                _ => Err(Error::InvalidArgument(format!(
                    "expected [index, value] pair for {}, got {}",
                    data_type, pair
                ))),
            })
            .collect(),
        other => Err(Error::InvalidArgument(format!(
            "expected an object or pair list for {}, got {}",
            data_type, other
        ))),
    }
}

fn sparse_json(indices: &[u32], values: &[f32]) -> Json {
    let mut map = Map::new();
    for (i, v) in indices.iter().zip(values) {
        let num = Number::from_f64(f64::from(*v)).map(Json::Number).unwrap_or(Json::Null);
        map.insert(i.to_string(), num);
    }
    Json::Object(map)
}

/// Expands packed binary words into 0.0/1.0 components, least significant
/// bit first.
fn unpack_bits<I: IntoIterator<Item = u8>>(bytes: I) -> Vec<f32> {
    bytes
        .into_iter()
        .flat_map(|b| (0..8).map(move |bit| f32::from((b >> bit) & 1)))
        .collect()
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from!(
    String => String,
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float,
    f64 => Double,
    Vec<f32> => VectorFp32,
    Vec<f64> => VectorFp64,
    Vec<String> => ArrayString,
    Vec<bool> => ArrayBool,
    Vec<i32> => ArrayInt32,
    Vec<i64> => ArrayInt64,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::ArrayString(v.into_iter().map(str::to_string).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn samples() -> Vec<Value> {
        vec![
            Value::Binary(vec![0, 255, 7]),
            Value::String("héllo".into()),
            Value::Bool(true),
            Value::Int32(-42),
            Value::Int64(i64::MIN),
            Value::Uint32(u32::MAX),
            Value::Uint64(u64::MAX),
            Value::Float(3.25),
            Value::Double(-1e300),
            Value::VectorBinary32(vec![0xdead_beef, 1]),
            Value::VectorBinary64(vec![u64::MAX]),
            Value::VectorFp32(vec![1.0, -2.0, 0.125]),
            Value::VectorFp64(vec![1e-9, 2.0]),
            Value::VectorInt4(vec![-8, 0, 7]),
            Value::VectorInt8(vec![-128, 127]),
            Value::VectorInt16(vec![-32768, 12]),
            Value::sparse_fp32([(3, 0.5), (1, 1.5)]),
            Value::ArrayBinary(vec![vec![1, 2], vec![]]),
            Value::ArrayString(vec!["a".into(), "b".into()]),
            Value::ArrayBool(vec![true, false, true]),
            Value::ArrayInt32(vec![1, -1]),
            Value::ArrayInt64(vec![i64::MAX]),
            Value::ArrayUint32(vec![9]),
            Value::ArrayUint64(vec![10, 11]),
            Value::ArrayFloat(vec![0.5]),
            Value::ArrayDouble(vec![0.25, 4.0]),
        ]
    }

    #[test]
    fn test_encode_decode_roundtrip_for_lossless_types() {
        for v in samples() {
            let dt = v.data_type().unwrap();
            let back = Value::decode(dt, &v.encode()).unwrap();
            assert_eq!(back, v, "round trip failed for {}", dt);
        }
    }

    #[test]
    fn test_fp16_narrowing_reaches_fixed_point() {
        let first = Value::vector_fp16(&[0.1, 1.0 / 3.0, -7.77]);
        let decoded = Value::decode(DataType::VectorFp16, &first.encode()).unwrap();
        let widened = decoded.to_f32_vector().unwrap();
        let second = Value::vector_fp16(&widened);
        assert_eq!(Value::decode(DataType::VectorFp16, &second.encode()).unwrap(), decoded);
    }

    #[test]
    fn test_sparse_json_keeps_insertion_order() {
        let v = Value::from_json(DataType::SparseVectorFp32, &json!({"7": 1.25, "0": 0.5})).unwrap();
        assert_eq!(
            v,
            Value::SparseVectorFp32 {
                indices: vec![7, 0],
                values: vec![1.25, 0.5]
            }
        );
        let pairs = Value::from_json(DataType::SparseVectorFp32, &json!([[0, 0.5], [7, 1.25]])).unwrap();
        assert_eq!(pairs.sparse_entries().unwrap(), (vec![0, 7], vec![0.5, 1.25]));
    }

    #[test]
    fn test_from_json_range_checks() {
        assert!(Value::from_json(DataType::VectorInt8, &json!([1, 300])).is_err());
        assert!(Value::from_json(DataType::VectorInt4, &json!([8])).is_err());
        assert!(Value::from_json(DataType::Int32, &json!(1u64 << 40)).is_err());
        assert!(Value::from_json(DataType::Uint32, &json!(-1)).is_err());
        assert_eq!(Value::from_json(DataType::Uint64, &json!(u64::MAX)).unwrap(), Value::Uint64(u64::MAX));
    }

    #[test]
    fn test_from_json_type_mismatch() {
        assert!(Value::from_json(DataType::String, &json!(5)).is_err());
        assert!(Value::from_json(DataType::VectorFp32, &json!("nope")).is_err());
        assert!(Value::from_json(DataType::Bool, &json!(1)).is_err());
    }

    #[test]
    fn test_null_is_distinct() {
        assert_eq!(Value::from_json(DataType::Int32, &Json::Null).unwrap(), Value::Null);
        assert_eq!(Value::Null.data_type(), None);
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn test_reinterpret_shared_layout() {
        let stored = Value::ArrayFloat(vec![1.0, 2.0]);
        assert_eq!(
            stored.reinterpret(DataType::VectorFp32).unwrap(),
            Value::VectorFp32(vec![1.0, 2.0])
        );
        assert!(stored.reinterpret(DataType::VectorFp64).unwrap_err().is_decode());
    }

    #[test]
    fn test_binary_vectors_unpack_to_bits() {
        let v = Value::VectorBinary32(vec![0b101]);
        let bits = v.to_f32_vector().unwrap();
        assert_eq!(bits.len(), 32);
        assert_eq!(&bits[..3], &[1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_json_rendering() {
        assert_eq!(Value::from("x").to_json(), json!("x"));
        assert_eq!(Value::VectorFp32(vec![0.5]).to_json(), json!([0.5]));
        assert_eq!(Value::sparse_fp32([(7, 1.25)]).to_json(), json!({"7": 1.25}));
    }
}

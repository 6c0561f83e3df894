use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Column data types understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Binary,
    String,
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Double,
    VectorBinary32,
    VectorBinary64,
    VectorFp16,
    VectorFp32,
    VectorFp64,
    VectorInt4,
    VectorInt8,
    VectorInt16,
    SparseVectorFp16,
    SparseVectorFp32,
    ArrayBinary,
    ArrayString,
    ArrayBool,
    ArrayInt32,
    ArrayInt64,
    ArrayUint32,
    ArrayUint64,
    ArrayFloat,
    ArrayDouble,
}

/// Canonical in-memory element layout of a [`DataType`].
///
/// Two data types with the same element layout and the same shape share a
/// byte encoding, which is what allows reinterpreting reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Bytes,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U32,
    U64,
    F16,
    F32,
    F64,
}

impl Element {
    /// Fixed width in bytes, `None` for variable-length byte strings.
    pub fn width(self) -> Option<usize> {
        match self {
            Element::Bytes => None,
            Element::Bool | Element::I8 => Some(1),
            Element::I16 | Element::F16 => Some(2),
            Element::I32 | Element::U32 | Element::F32 => Some(4),
            Element::I64 | Element::U64 | Element::F64 => Some(8),
        }
    }
}

/// How values of a data type are laid out: one element, a sequence, or a
/// sparse index/value pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Sequence,
    Sparse,
}

impl DataType {
    pub const ALL: [DataType; 28] = [
        DataType::Binary,
        DataType::String,
        DataType::Bool,
        DataType::Int32,
        DataType::Int64,
        DataType::Uint32,
        DataType::Uint64,
        DataType::Float,
        DataType::Double,
        DataType::VectorBinary32,
        DataType::VectorBinary64,
        DataType::VectorFp16,
        DataType::VectorFp32,
        DataType::VectorFp64,
        DataType::VectorInt4,
        DataType::VectorInt8,
        DataType::VectorInt16,
        DataType::SparseVectorFp16,
        DataType::SparseVectorFp32,
        DataType::ArrayBinary,
        DataType::ArrayString,
        DataType::ArrayBool,
        DataType::ArrayInt32,
        DataType::ArrayInt64,
        DataType::ArrayUint32,
        DataType::ArrayUint64,
        DataType::ArrayFloat,
        DataType::ArrayDouble,
    ];

    #[inline]
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            DataType::Binary
                | DataType::String
                | DataType::Bool
                | DataType::Int32
                | DataType::Int64
                | DataType::Uint32
                | DataType::Uint64
                | DataType::Float
                | DataType::Double
        )
    }

    #[inline]
    pub fn is_dense_vector(self) -> bool {
        matches!(
            self,
            DataType::VectorBinary32
                | DataType::VectorBinary64
                | DataType::VectorFp16
                | DataType::VectorFp32
                | DataType::VectorFp64
                | DataType::VectorInt4
                | DataType::VectorInt8
                | DataType::VectorInt16
        )
    }

    #[inline]
    pub fn is_sparse_vector(self) -> bool {
        matches!(self, DataType::SparseVectorFp16 | DataType::SparseVectorFp32)
    }

    #[inline]
    pub fn is_vector(self) -> bool {
        self.is_dense_vector() || self.is_sparse_vector()
    }

    #[inline]
    pub fn is_array(self) -> bool {
        matches!(
            self,
            DataType::ArrayBinary
                | DataType::ArrayString
                | DataType::ArrayBool
                | DataType::ArrayInt32
                | DataType::ArrayInt64
                | DataType::ArrayUint32
                | DataType::ArrayUint64
                | DataType::ArrayFloat
                | DataType::ArrayDouble
        )
    }

    /// Dense vectors must declare a nonzero dimension.
    #[inline]
    pub fn requires_dimension(self) -> bool {
        self.is_dense_vector()
    }

    pub fn shape(self) -> Shape {
        if self.is_scalar() {
            Shape::Scalar
        } else if self.is_sparse_vector() {
            Shape::Sparse
        } else {
            Shape::Sequence
        }
    }

    pub fn element(self) -> Element {
        match self {
            DataType::Binary
            | DataType::String
            | DataType::ArrayBinary
            | DataType::ArrayString => Element::Bytes,
            DataType::Bool | DataType::ArrayBool => Element::Bool,
            DataType::VectorInt4 | DataType::VectorInt8 => Element::I8,
            DataType::VectorInt16 => Element::I16,
            DataType::Int32 | DataType::ArrayInt32 => Element::I32,
            DataType::Int64 | DataType::ArrayInt64 => Element::I64,
            DataType::Uint32 | DataType::VectorBinary32 | DataType::ArrayUint32 => Element::U32,
            DataType::Uint64 | DataType::VectorBinary64 | DataType::ArrayUint64 => Element::U64,
            DataType::VectorFp16 | DataType::SparseVectorFp16 => Element::F16,
            DataType::Float
            | DataType::VectorFp32
            | DataType::SparseVectorFp32
            | DataType::ArrayFloat => Element::F32,
            DataType::Double | DataType::VectorFp64 | DataType::ArrayDouble => Element::F64,
        }
    }

    #[inline]
    pub fn element_width(self) -> Option<usize> {
        self.element().width()
    }

    /// True when a value stored as `self` can be re-decoded as `other`.
    pub fn shares_layout(self, other: DataType) -> bool {
        self.element() == other.element() && self.shape() == other.shape()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Binary => "BINARY",
            DataType::String => "STRING",
            DataType::Bool => "BOOL",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::Uint32 => "UINT32",
            DataType::Uint64 => "UINT64",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::VectorBinary32 => "VECTOR_BINARY32",
            DataType::VectorBinary64 => "VECTOR_BINARY64",
            DataType::VectorFp16 => "VECTOR_FP16",
            DataType::VectorFp32 => "VECTOR_FP32",
            DataType::VectorFp64 => "VECTOR_FP64",
            DataType::VectorInt4 => "VECTOR_INT4",
            DataType::VectorInt8 => "VECTOR_INT8",
            DataType::VectorInt16 => "VECTOR_INT16",
            DataType::SparseVectorFp16 => "SPARSE_VECTOR_FP16",
            DataType::SparseVectorFp32 => "SPARSE_VECTOR_FP32",
            DataType::ArrayBinary => "ARRAY_BINARY",
            DataType::ArrayString => "ARRAY_STRING",
            DataType::ArrayBool => "ARRAY_BOOL",
            DataType::ArrayInt32 => "ARRAY_INT32",
            DataType::ArrayInt64 => "ARRAY_INT64",
            DataType::ArrayUint32 => "ARRAY_UINT32",
            DataType::ArrayUint64 => "ARRAY_UINT64",
            DataType::ArrayFloat => "ARRAY_FLOAT",
            DataType::ArrayDouble => "ARRAY_DOUBLE",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        DataType::ALL
            .iter()
            .copied()
            .find(|dt| dt.as_str() == upper)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown data type: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    Hnsw,
    Ivf,
    Flat,
    Invert,
}

impl IndexType {
    #[inline]
    pub fn is_vector_index(self) -> bool {
        !matches!(self, IndexType::Invert)
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexType::Hnsw => "HNSW",
            IndexType::Ivf => "IVF",
            IndexType::Flat => "FLAT",
            IndexType::Invert => "INVERT",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricType {
    L2,
    Ip,
    Cosine,
    MipsL2,
}

impl MetricType {
    /// Whether a larger score ranks higher under this metric.
    #[inline]
    pub fn higher_is_better(self) -> bool {
        matches!(self, MetricType::Ip | MetricType::MipsL2)
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetricType::L2 => "L2",
            MetricType::Ip => "IP",
            MetricType::Cosine => "COSINE",
            MetricType::MipsL2 => "MIPSL2",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuantizeType {
    #[default]
    Undefined,
    Fp16,
    Int8,
    Int4,
}

impl fmt::Display for QuantizeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuantizeType::Undefined => "UNDEFINED",
            QuantizeType::Fp16 => "FP16",
            QuantizeType::Int8 => "INT8",
            QuantizeType::Int4 => "INT4",
        })
    }
}

/// Pending write operation recorded on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    Insert,
    Upsert,
    Update,
    Delete,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Insert => "INSERT",
            Operator::Upsert => "UPSERT",
            Operator::Update => "UPDATE",
            Operator::Delete => "DELETE",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_disjoint_and_total() {
        for dt in DataType::ALL {
            let hits = [dt.is_scalar(), dt.is_dense_vector(), dt.is_sparse_vector(), dt.is_array()]
                .iter()
                .filter(|b| **b)
                .count();
            assert_eq!(hits, 1, "{} must belong to exactly one category", dt);
        }
    }

    #[test]
    fn test_name_roundtrip() {
        for dt in DataType::ALL {
            assert_eq!(dt.as_str().parse::<DataType>().unwrap(), dt);
        }
        assert_eq!("vector_fp32".parse::<DataType>().unwrap(), DataType::VectorFp32);
        assert!("VECTOR_FP8".parse::<DataType>().is_err());
    }

    #[test]
    fn test_int4_packs_as_signed_bytes() {
        assert_eq!(DataType::VectorInt4.element(), Element::I8);
        assert_eq!(DataType::VectorInt4.element_width(), Some(1));
        assert!(DataType::VectorInt4.shares_layout(DataType::VectorInt8));
    }

    #[test]
    fn test_shares_layout_requires_same_shape() {
        assert!(DataType::ArrayFloat.shares_layout(DataType::VectorFp32));
        assert!(!DataType::Float.shares_layout(DataType::VectorFp32));
        assert!(!DataType::SparseVectorFp32.shares_layout(DataType::VectorFp32));
        assert!(DataType::String.shares_layout(DataType::Binary));
    }

    #[test]
    fn test_metric_ordering() {
        assert!(MetricType::Ip.higher_is_better());
        assert!(!MetricType::L2.higher_is_better());
        assert!(!MetricType::Cosine.higher_is_better());
    }
}

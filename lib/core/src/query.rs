use serde_json::Value as Json;

use crate::codec::{self, Encoded};
use crate::doc::Doc;
use crate::params::QueryParams;
use crate::schema::FieldSchema;
use crate::types::DataType;
use crate::value::Value;
use crate::{Error, Result};

pub const DEFAULT_TOPK: u32 = 10;
pub const DEFAULT_GROUP_COUNT: u32 = 2;
pub const DEFAULT_GROUP_TOPK: u32 = 3;

/// A k-nearest-neighbour request against one vector field.
///
/// Dense query vectors are always carried as little-endian f32; the engine
/// converts to the field's element type. Sparse query values use the
/// field's own element type.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub topk: u32,
    pub field_name: String,
    pub filter: String,
    pub include_vector: bool,
    pub include_doc_id: bool,
    /// `None` returns every scalar field.
    pub output_fields: Option<Vec<String>>,
    pub query_vector: Vec<u8>,
    pub query_sparse_indices: Vec<u8>,
    pub query_sparse_values: Vec<u8>,
    pub query_params: Option<QueryParams>,
}

impl Default for VectorQuery {
    fn default() -> Self {
        Self {
            topk: DEFAULT_TOPK,
            field_name: String::new(),
            filter: String::new(),
            include_vector: false,
            include_doc_id: false,
            output_fields: None,
            query_vector: Vec::new(),
            query_sparse_indices: Vec::new(),
            query_sparse_values: Vec::new(),
            query_params: None,
        }
    }
}

impl VectorQuery {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_topk(mut self, topk: u32) -> Self {
        self.topk = topk;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    #[must_use]
    pub fn with_query_params(mut self, params: impl Into<QueryParams>) -> Self {
        self.query_params = Some(params.into());
        self
    }

    /// Encodes `value` as the query vector for `field`.
    pub fn set_vector(&mut self, field: &FieldSchema, value: &Json) -> Result<()> {
        match encode_query_vector(field, value)? {
            Encoded::Dense(buf) => {
                self.query_vector = buf;
                self.query_sparse_indices.clear();
                self.query_sparse_values.clear();
            }
            Encoded::Sparse { indices, values } => {
                self.query_vector.clear();
                self.query_sparse_indices = indices;
                self.query_sparse_values = values;
            }
        }
        Ok(())
    }

    pub fn set_dense(&mut self, vector: &[f32]) {
        self.query_vector = codec::encode_slice(vector);
        self.query_sparse_indices.clear();
        self.query_sparse_values.clear();
    }

    /// Sets an FP32 sparse query.
    pub fn set_sparse(&mut self, indices: &[u32], values: &[f32]) {
        self.query_vector.clear();
        self.query_sparse_indices = codec::encode_slice(indices);
        self.query_sparse_values = codec::encode_slice(values);
    }

    pub fn has_sparse(&self) -> bool {
        !self.query_sparse_indices.is_empty()
    }

    pub fn dense_vector(&self) -> Result<Vec<f32>> {
        codec::decode_slice::<f32>(&self.query_vector)
            .map_err(|e| Error::InvalidArgument(format!("query vector: {}", e)))
    }

    /// Decodes the sparse buffers using the element type of `data_type`,
    /// widening to f32.
    pub fn sparse_vector(&self, data_type: DataType) -> Result<(Vec<u32>, Vec<f32>)> {
        if !data_type.is_sparse_vector() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a sparse vector type",
                data_type
            )));
        }
        let encoded = Encoded::Sparse {
            indices: self.query_sparse_indices.clone(),
            values: self.query_sparse_values.clone(),
        };
        let value = Value::decode(data_type, &encoded)
            .map_err(|e| Error::InvalidArgument(format!("query sparse vector: {}", e)))?;
        value
            .sparse_entries()
            .ok_or_else(|| Error::Internal("sparse decode produced a dense value".into()))
    }
}

fn encode_query_vector(field: &FieldSchema, value: &Json) -> Result<Encoded> {
    if value.is_null() {
        return Err(Error::InvalidArgument(format!(
            "query vector for `{}` must not be null",
            field.name
        )));
    }
    if field.is_sparse_vector() {
        return Ok(Value::from_json(field.data_type, value)?.encode());
    }
    if field.is_dense_vector() {
        return Ok(Value::from_json(DataType::VectorFp32, value)?.encode());
    }
    Err(Error::InvalidArgument(format!(
        "field `{}` of type {} is not a vector field",
        field.name, field.data_type
    )))
}

/// A vector query whose hits are bucketed by the value of a scalar field.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByVectorQuery {
    pub field_name: String,
    pub group_by_field_name: String,
    pub group_count: u32,
    pub group_topk: u32,
    pub filter: String,
    pub include_vector: bool,
    pub output_fields: Option<Vec<String>>,
    pub query_vector: Vec<u8>,
    pub query_sparse_indices: Vec<u8>,
    pub query_sparse_values: Vec<u8>,
    pub query_params: Option<QueryParams>,
}

impl Default for GroupByVectorQuery {
    fn default() -> Self {
        Self {
            field_name: String::new(),
            group_by_field_name: String::new(),
            group_count: DEFAULT_GROUP_COUNT,
            group_topk: DEFAULT_GROUP_TOPK,
            filter: String::new(),
            include_vector: false,
            output_fields: None,
            query_vector: Vec::new(),
            query_sparse_indices: Vec::new(),
            query_sparse_values: Vec::new(),
            query_params: None,
        }
    }
}

impl GroupByVectorQuery {
    pub fn new(field_name: impl Into<String>, group_by_field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            group_by_field_name: group_by_field_name.into(),
            ..Self::default()
        }
    }

    pub fn set_vector(&mut self, field: &FieldSchema, value: &Json) -> Result<()> {
        let mut q = VectorQuery::new(field.name.clone());
        q.set_vector(field, value)?;
        self.query_vector = q.query_vector;
        self.query_sparse_indices = q.query_sparse_indices;
        self.query_sparse_values = q.query_sparse_values;
        Ok(())
    }

    pub fn set_dense(&mut self, vector: &[f32]) {
        self.query_vector = codec::encode_slice(vector);
        self.query_sparse_indices.clear();
        self.query_sparse_values.clear();
    }

    /// The scoring half of this request, without a result limit.
    pub fn as_vector_query(&self) -> VectorQuery {
        VectorQuery {
            topk: u32::MAX,
            field_name: self.field_name.clone(),
            filter: self.filter.clone(),
            include_vector: self.include_vector,
            include_doc_id: false,
            output_fields: self.output_fields.clone(),
            query_vector: self.query_vector.clone(),
            query_sparse_indices: self.query_sparse_indices.clone(),
            query_sparse_values: self.query_sparse_values.clone(),
            query_params: self.query_params.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupResult {
    /// String form of the group-by field, empty for null or absent values.
    pub group_by_value: String,
    pub docs: Vec<Doc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::HnswQueryParams;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let q = VectorQuery::default();
        assert_eq!(q.topk, 10);
        assert!(q.query_params.is_none());
        let g = GroupByVectorQuery::default();
        assert_eq!((g.group_count, g.group_topk), (2, 3));
    }

    #[test]
    fn test_dense_vector_is_f32_even_for_fp16_fields() {
        let field = FieldSchema::new("v", DataType::VectorFp16).with_dimension(2);
        let mut q = VectorQuery::new("v");
        q.set_vector(&field, &json!([0.5, 0.25])).unwrap();
        assert_eq!(q.query_vector.len(), 8);
        assert_eq!(q.dense_vector().unwrap(), vec![0.5, 0.25]);
        assert!(!q.has_sparse());
    }

    #[test]
    fn test_sparse_vector_uses_field_element_type() {
        let field = FieldSchema::new("s", DataType::SparseVectorFp16);
        let mut q = VectorQuery::new("s");
        q.set_vector(&field, &json!({"3": 1.5, "1": 0.5})).unwrap();
        assert_eq!(q.query_sparse_indices.len(), 8);
        assert_eq!(q.query_sparse_values.len(), 4);
        assert_eq!(
            q.sparse_vector(DataType::SparseVectorFp16).unwrap(),
            (vec![3, 1], vec![1.5, 0.5])
        );
        assert!(q.query_vector.is_empty());
    }

    #[test]
    fn test_scalar_field_rejected() {
        let field = FieldSchema::new("t", DataType::String);
        let mut q = VectorQuery::new("t");
        assert!(matches!(
            q.set_vector(&field, &json!([1.0])),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_set_sparse_then_dense_clears_sparse() {
        let mut q = VectorQuery::new("v");
        q.set_sparse(&[1, 2], &[0.1, 0.2]);
        assert!(q.has_sparse());
        q.set_dense(&[1.0]);
        assert!(!q.has_sparse());
    }

    #[test]
    fn test_group_query_projection() {
        let mut g = GroupByVectorQuery::new("emb", "category");
        g.set_dense(&[1.0, 0.0]);
        g.filter = "price > 1".into();
        g.query_params = Some(HnswQueryParams::new(32).into());
        let q = g.as_vector_query();
        assert_eq!(q.field_name, "emb");
        assert_eq!(q.filter, "price > 1");
        assert_eq!(q.dense_vector().unwrap(), vec![1.0, 0.0]);
        assert!(q.query_params.is_some());
    }
}

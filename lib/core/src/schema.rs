use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::params::IndexParams;
use crate::types::{DataType, IndexType};
use crate::{Error, Result};

/// Metadata attribute names that live on every document outside the field
/// list.
pub const RESERVED_NAMES: [&str; 4] = ["pk", "doc_id", "score", "operator"];

/// Describes one column of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub data_type: DataType,
    /// Required for dense vectors. For sparse vectors a nonzero value bounds
    /// the index space. Zero for everything else.
    pub dimension: u32,
    pub nullable: bool,
    pub index_params: Option<IndexParams>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            dimension: 0,
            nullable: false,
            index_params: None,
        }
    }

    /// Validated constructor. The index params are copied, so later changes
    /// to the caller's value do not reach the schema.
    pub fn create(
        name: impl Into<String>,
        data_type: DataType,
        dimension: u32,
        nullable: bool,
        index_params: Option<&IndexParams>,
    ) -> Result<Self> {
        let field = Self {
            name: name.into(),
            data_type,
            dimension,
            nullable,
            index_params: index_params.cloned(),
        };
        field.validate()?;
        Ok(field)
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: u32) -> Self {
        self.dimension = dimension;
        self
    }

    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn with_index_params(mut self, params: IndexParams) -> Self {
        self.index_params = Some(params);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidArgument("field name must not be empty".into()));
        }
        if self.data_type.requires_dimension() && self.dimension == 0 {
            return Err(Error::InvalidArgument(format!(
                "field `{}` of type {} requires a dimension",
                self.name, self.data_type
            )));
        }
        if !self.data_type.is_vector() && self.dimension != 0 {
            return Err(Error::InvalidArgument(format!(
                "field `{}` of type {} cannot have a dimension",
                self.name, self.data_type
            )));
        }
        if let Some(params) = &self.index_params {
            check_index_compat(&self.name, self.data_type, params)?;
        }
        Ok(())
    }

    pub fn index_type(&self) -> Option<IndexType> {
        self.index_params.as_ref().map(IndexParams::index_type)
    }

    #[inline]
    pub fn is_vector_field(&self) -> bool {
        self.data_type.is_vector()
    }

    #[inline]
    pub fn is_dense_vector(&self) -> bool {
        self.data_type.is_dense_vector()
    }

    #[inline]
    pub fn is_sparse_vector(&self) -> bool {
        self.data_type.is_sparse_vector()
    }

    #[inline]
    pub fn is_array_type(&self) -> bool {
        self.data_type.is_array()
    }

    pub fn has_invert_index(&self) -> bool {
        self.index_type() == Some(IndexType::Invert)
    }

    pub fn set_dimension(&mut self, dimension: u32) -> Result<()> {
        let previous = std::mem::replace(&mut self.dimension, dimension);
        self.validate().inspect_err(|_| self.dimension = previous)
    }

    pub fn set_nullable(&mut self, nullable: bool) {
        self.nullable = nullable;
    }

    /// Replaces the index params with a copy of `params`.
    pub fn set_index_params(&mut self, params: Option<&IndexParams>) -> Result<()> {
        if let Some(p) = params {
            check_index_compat(&self.name, self.data_type, p)?;
        }
        self.index_params = params.cloned();
        Ok(())
    }
}

fn check_index_compat(name: &str, data_type: DataType, params: &IndexParams) -> Result<()> {
    match (data_type.is_vector(), params.is_vector_index()) {
        (true, false) => Err(Error::InvalidArgument(format!(
            "vector field `{}` cannot take a {} index",
            name,
            params.index_type()
        ))),
        (false, true) => Err(Error::InvalidArgument(format!(
            "field `{}` of type {} cannot take a {} index",
            name,
            data_type,
            params.index_type()
        ))),
        _ => Ok(()),
    }
}

impl fmt::Display for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FieldSchema{{name={}, type={}, dim={}, nullable={}",
            self.name, self.data_type, self.dimension, self.nullable
        )?;
        match &self.index_params {
            Some(p) => write!(f, ", index={}}}", p),
            None => f.write_str("}"),
        }
    }
}

/// A named, ordered set of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    fields: Vec<FieldSchema>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn create(name: impl Into<String>, fields: Vec<FieldSchema>) -> Result<Self> {
        let mut schema = Self::new(name);
        for field in fields {
            schema.add_field(field)?;
        }
        Ok(schema)
    }

    pub fn add_field(&mut self, field: FieldSchema) -> Result<()> {
        field.validate()?;
        if self.has_field(&field.name) {
            return Err(Error::AlreadyExists(format!(
                "field `{}` already exists in schema `{}`",
                field.name, self.name
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    #[inline]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn get_field_mut(&mut self, name: &str) -> Option<&mut FieldSchema> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldSchema> {
        let pos = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(pos))
    }

    pub fn rename_field(&mut self, from: &str, to: &str) -> Result<()> {
        if to.trim().is_empty() {
            return Err(Error::InvalidArgument("field name must not be empty".into()));
        }
        if from != to && self.has_field(to) {
            return Err(Error::AlreadyExists(format!("field `{}` already exists", to)));
        }
        let field = self
            .get_field_mut(from)
            .ok_or_else(|| Error::NotFound(format!("field `{}` not found", from)))?;
        field.name = to.to_string();
        Ok(())
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn all_field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Fields stored without any index.
    pub fn forward_fields(&self) -> Vec<&FieldSchema> {
        self.fields.iter().filter(|f| f.index_params.is_none()).collect()
    }

    pub fn vector_fields(&self) -> Vec<&FieldSchema> {
        self.fields.iter().filter(|f| f.is_vector_field()).collect()
    }

    pub fn indexed_fields(&self) -> Vec<&FieldSchema> {
        self.fields.iter().filter(|f| f.index_params.is_some()).collect()
    }

    /// Names that always resolve to document metadata. `pk` stops being
    /// reserved once a field claims it.
    pub fn is_reserved(&self, name: &str) -> bool {
        match name {
            "pk" => !self.has_field("pk"),
            _ => RESERVED_NAMES.contains(&name),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidArgument("collection name must not be empty".into()));
        }
        if self.fields.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "collection `{}` declares no fields",
                self.name
            )));
        }
        for field in &self.fields {
            field.validate()?;
            if matches!(field.name.as_str(), "doc_id" | "score" | "operator") {
                return Err(Error::InvalidArgument(format!(
                    "field name `{}` is reserved",
                    field.name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for CollectionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionSchema{{name={}, fields=[", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", field)?;
        }
        f.write_str("]}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub doc_count: u64,
    /// Fraction of live documents covered by each index, keyed by field.
    pub index_completeness: BTreeMap<String, f32>,
}

impl fmt::Display for CollectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionStats{{doc_count={}, index_completeness={{", self.doc_count)?;
        for (i, (name, ratio)) in self.index_completeness.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {:.2}", name, ratio)?;
        }
        f.write_str("}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{HnswIndexParams, InvertIndexParams};
    use crate::types::MetricType;

    fn products() -> CollectionSchema {
        CollectionSchema::create(
            "products",
            vec![
                FieldSchema::new("title", DataType::String),
                FieldSchema::new("category", DataType::String).with_index_params(IndexParams::invert()),
                FieldSchema::create(
                    "embedding",
                    DataType::VectorFp32,
                    4,
                    false,
                    Some(&IndexParams::hnsw(MetricType::Cosine)),
                )
                .unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_dense_vector_requires_dimension() {
        let err = FieldSchema::create("v", DataType::VectorFp32, 0, false, None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(FieldSchema::create("v", DataType::VectorFp32, 4, false, None).is_ok());
    }

    #[test]
    fn test_sparse_dimension_is_optional() {
        assert!(FieldSchema::create("s", DataType::SparseVectorFp32, 0, false, None).is_ok());
        assert!(FieldSchema::create("s", DataType::SparseVectorFp16, 30000, false, None).is_ok());
    }

    #[test]
    fn test_scalar_rejects_dimension() {
        assert!(FieldSchema::create("n", DataType::Int32, 3, false, None).is_err());
    }

    #[test]
    fn test_index_family_must_match_type() {
        let hnsw = IndexParams::hnsw(MetricType::L2);
        assert!(FieldSchema::create("n", DataType::Int64, 0, false, Some(&hnsw)).is_err());
        let invert = IndexParams::invert();
        assert!(FieldSchema::create("v", DataType::VectorFp16, 8, false, Some(&invert)).is_err());
    }

    #[test]
    fn test_create_copies_index_params() {
        let mut params = IndexParams::Hnsw(HnswIndexParams::new(MetricType::Ip));
        let field = FieldSchema::create("v", DataType::VectorFp32, 4, false, Some(&params)).unwrap();
        params.set_metric_type(MetricType::L2);
        assert_eq!(field.index_params.as_ref().unwrap().metric_type(), Some(MetricType::Ip));
        assert_eq!(field.index_type(), Some(IndexType::Hnsw));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut schema = products();
        let err = schema.add_field(FieldSchema::new("title", DataType::String)).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn test_lookup_and_views() {
        let schema = products();
        assert!(schema.get_field("missing").is_none());
        assert_eq!(schema.get_field("embedding").unwrap().dimension, 4);
        assert_eq!(schema.all_field_names(), vec!["title", "category", "embedding"]);
        let forward: Vec<_> = schema.forward_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(forward, vec!["title"]);
        assert_eq!(schema.vector_fields().len(), 1);
        assert_eq!(schema.indexed_fields().len(), 2);
        assert!(schema.get_field("category").unwrap().has_invert_index());
    }

    #[test]
    fn test_rename_field() {
        let mut schema = products();
        assert!(matches!(
            schema.rename_field("title", "category"),
            Err(Error::AlreadyExists(_))
        ));
        schema.rename_field("title", "name").unwrap();
        assert!(schema.has_field("name"));
        assert!(!schema.has_field("title"));
        assert!(matches!(schema.rename_field("nope", "x"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_reserved_names() {
        let mut schema = products();
        assert!(schema.is_reserved("pk"));
        assert!(schema.is_reserved("score"));
        assert!(!schema.is_reserved("title"));
        schema.add_field(FieldSchema::new("pk", DataType::String)).unwrap();
        assert!(!schema.is_reserved("pk"));
    }

    #[test]
    fn test_validate() {
        assert!(CollectionSchema::new("empty").validate().is_err());
        assert!(CollectionSchema::new("").validate().is_err());
        assert!(products().validate().is_ok());
        let bad = CollectionSchema::create("c", vec![FieldSchema::new("score", DataType::Float)]).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_set_index_params_validates() {
        let mut field = FieldSchema::new("tag", DataType::String);
        assert!(field.set_index_params(Some(&IndexParams::flat(MetricType::L2))).is_err());
        assert!(field.index_params.is_none());
        field
            .set_index_params(Some(&InvertIndexParams::new(false, true).into()))
            .unwrap();
        assert!(field.has_invert_index());
        field.set_index_params(None).unwrap();
        assert_eq!(field.index_type(), None);
    }

    #[test]
    fn test_display() {
        let field = FieldSchema::new("title", DataType::String);
        assert_eq!(
            field.to_string(),
            "FieldSchema{name=title, type=STRING, dim=0, nullable=false}"
        );
        let mut stats = CollectionStats::default();
        stats.doc_count = 3;
        stats.index_completeness.insert("embedding".into(), 1.0);
        assert_eq!(
            stats.to_string(),
            "CollectionStats{doc_count=3, index_completeness={embedding: 1.00}}"
        );
    }
}

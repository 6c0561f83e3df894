//! # docvec core
//!
//! Value types shared by the `docvec` facade and its engines:
//!
//! - [`Status`] / [`Error`] - the outcome taxonomy of every operation
//! - [`DataType`] and the byte [`codec`] used to exchange field values
//! - [`FieldSchema`] / [`CollectionSchema`] - collection structure
//! - [`IndexParams`] / [`QueryParams`] - closed parameter families
//! - [`Doc`] / [`Value`] - documents and their typed fields
//! - [`VectorQuery`] / [`GroupByVectorQuery`] - query value objects
//! - [`Engine`] / [`CollectionHandle`] - the engine contract
//!
//! ## Example
//!
//! ```rust
//! use docvec_core::{CollectionSchema, DataType, Doc, FieldSchema, IndexParams, MetricType};
//! use serde_json::json;
//!
//! let embedding = FieldSchema::create(
//!     "embedding",
//!     DataType::VectorFp32,
//!     4,
//!     false,
//!     Some(&IndexParams::hnsw(MetricType::Cosine)),
//! )
//! .unwrap();
//! let schema = CollectionSchema::create(
//!     "products",
//!     vec![FieldSchema::new("title", DataType::String), embedding],
//! )
//! .unwrap();
//!
//! let mut doc = Doc::with_pk("p1");
//! doc.set_field("title", DataType::String, &json!("Shoe")).unwrap();
//! doc.set_field("embedding", DataType::VectorFp32, &json!([0.1, 0.2, 0.3, 0.4])).unwrap();
//! assert!(schema.get_field("embedding").is_some());
//! ```

pub mod codec;
pub mod config;
pub mod doc;
pub mod engine;
pub mod error;
pub mod options;
pub mod params;
pub mod query;
pub mod schema;
pub mod types;
pub mod value;

pub use codec::{CodecError, Encoded};
pub use config::{GlobalConfig, LogConfig, LogLevel};
pub use doc::Doc;
pub use engine::{CollectionHandle, Engine};
pub use error::{Error, Result, Status, StatusCode};
pub use options::{
    AddColumnOptions, AlterColumnOptions, CollectionOptions, CreateIndexOptions, OptimizeOptions,
};
pub use params::{
    FlatIndexParams, FlatQueryParams, HnswIndexParams, HnswQueryParams, IndexParams,
    InvertIndexParams, IvfIndexParams, IvfQueryParams, QueryParams,
};
pub use query::{GroupByVectorQuery, GroupResult, VectorQuery};
pub use schema::{CollectionSchema, CollectionStats, FieldSchema};
pub use types::{DataType, IndexType, MetricType, Operator, QuantizeType};
pub use value::Value;

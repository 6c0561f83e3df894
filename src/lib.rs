//! # docvec
//!
//! Typed document collections with dense and sparse vector fields.
//!
//! A collection has a schema of named, typed fields. Documents are keyed by
//! a primary key and carry typed values; vector fields can be queried by
//! similarity with an optional filter expression. Index and query execution
//! sit behind the [`Engine`] trait; [`LocalEngine`] is the bundled engine,
//! which keeps documents in memory and snapshots them to a directory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docvec::prelude::*;
//!
//! # fn main() -> docvec::Result<()> {
//! let schema = CollectionSchema::create(
//!     "products",
//!     vec![
//!         FieldSchema::new("title", DataType::String),
//!         FieldSchema::create(
//!             "embedding",
//!             DataType::VectorFp32,
//!             3,
//!             false,
//!             Some(&IndexParams::hnsw(MetricType::Cosine)),
//!         )?,
//!     ],
//! )?;
//! let collection = Collection::create_and_open("./data/products", &schema, None)?;
//!
//! let mut doc = Doc::with_pk("p1");
//! doc.set_value("title", "lamp");
//! doc.set_value("embedding", vec![0.1f32, 0.2, 0.3]);
//! let statuses = collection.insert(&[doc])?;
//! assert!(statuses[0].is_ok());
//!
//! let mut query = VectorQuery::new("embedding").with_topk(5);
//! query.set_dense(&[0.1, 0.2, 0.3]);
//! for hit in collection.query(&query)? {
//!     println!("{} {}", hit.pk(), hit.score());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - `docvec-core`: schema, values, documents, parameters and the engine
//!   traits
//! - `docvec-storage`: the local engine, filter expressions and ranking
//! - `docvec`: the [`Collection`] facade, [`init`] and the CLI

mod collection;
mod init;

pub use collection::{open_collection, Collection, QueryVectorOptions};
pub use init::init;

pub use docvec_core::{
    config, AddColumnOptions, AlterColumnOptions, CollectionHandle, CollectionOptions,
    CollectionSchema, CollectionStats, CreateIndexOptions, DataType, Doc, Engine, Error,
    FieldSchema, FlatIndexParams, FlatQueryParams, GlobalConfig, GroupByVectorQuery, GroupResult,
    HnswIndexParams, HnswQueryParams, IndexParams, IndexType, InvertIndexParams, IvfIndexParams,
    IvfQueryParams, LogConfig, LogLevel, MetricType, Operator, OptimizeOptions, QuantizeType,
    QueryParams, Result, Status, StatusCode, Value, VectorQuery,
};
pub use docvec_storage::{ExprFilter, Filter, LocalEngine};

pub mod prelude {
    pub use crate::{
        open_collection, Collection, CollectionOptions, CollectionSchema, DataType, Doc,
        FieldSchema, GroupByVectorQuery, IndexParams, MetricType, QueryParams,
        QueryVectorOptions, Result, Status, StatusCode, VectorQuery,
    };
}

//! The contract between the collection facade and a storage/query engine.
//!
//! Engines own persistence, indexing and execution. Batch writes return one
//! [`Status`] per input, in input order; a failing item never aborts the
//! batch. After `destroy` every call on the handle fails with
//! `FailedPrecondition`.

use std::collections::HashMap;
use std::path::Path;

use crate::doc::Doc;
use crate::error::{Result, Status};
use crate::options::{
    AddColumnOptions, AlterColumnOptions, CollectionOptions, CreateIndexOptions, OptimizeOptions,
};
use crate::params::IndexParams;
use crate::query::{GroupByVectorQuery, GroupResult, VectorQuery};
use crate::schema::{CollectionSchema, CollectionStats, FieldSchema};

pub trait Engine: Send + Sync {
    /// Creates a collection at `path` and opens it.
    fn create_and_open(
        &self,
        path: &Path,
        schema: &CollectionSchema,
        options: &CollectionOptions,
    ) -> Result<Box<dyn CollectionHandle>>;

    /// Opens an existing collection.
    fn open(&self, path: &Path, options: &CollectionOptions) -> Result<Box<dyn CollectionHandle>>;
}

pub trait CollectionHandle: Send + Sync {
    fn path(&self) -> Result<String>;
    fn schema(&self) -> Result<CollectionSchema>;
    fn stats(&self) -> Result<CollectionStats>;
    fn options(&self) -> Result<CollectionOptions>;

    /// Blocks until all accepted writes are durable.
    fn flush(&self) -> Result<()>;

    /// Removes the collection and its data.
    fn destroy(&self) -> Result<()>;

    fn create_index(&self, column: &str, params: &IndexParams, options: CreateIndexOptions) -> Result<()>;
    fn drop_index(&self, column: &str) -> Result<()>;
    fn optimize(&self, options: OptimizeOptions) -> Result<()>;

    /// `expression` is empty to fill nulls, or a literal fill value.
    fn add_column(&self, field: &FieldSchema, expression: &str, options: AddColumnOptions) -> Result<()>;
    fn drop_column(&self, name: &str) -> Result<()>;

    /// Renames `name` to `rename` when non-empty and applies `new_schema`
    /// when given.
    fn alter_column(
        &self,
        name: &str,
        rename: &str,
        new_schema: Option<&FieldSchema>,
        options: AlterColumnOptions,
    ) -> Result<()>;

    fn insert(&self, docs: &[Doc]) -> Result<Vec<Status>>;
    fn upsert(&self, docs: &[Doc]) -> Result<Vec<Status>>;
    fn update(&self, docs: &[Doc]) -> Result<Vec<Status>>;
    fn delete(&self, pks: &[String]) -> Result<Vec<Status>>;

    /// All-or-nothing. Matching nothing is not an error.
    fn delete_by_filter(&self, filter: &str) -> Result<()>;

    fn query(&self, query: &VectorQuery) -> Result<Vec<Doc>>;
    fn group_by_query(&self, query: &GroupByVectorQuery) -> Result<Vec<GroupResult>>;

    /// Keys not present in the collection are absent from the map.
    fn fetch(&self, pks: &[String]) -> Result<HashMap<String, Doc>>;
}

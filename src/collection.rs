use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use docvec_core::{
    AddColumnOptions, AlterColumnOptions, CollectionHandle, CollectionOptions, CollectionSchema,
    CollectionStats, CreateIndexOptions, Doc, Engine, Error, FieldSchema, GroupByVectorQuery,
    GroupResult, IndexParams, OptimizeOptions, QueryParams, Result, Status, VectorQuery,
};
use docvec_storage::LocalEngine;

/// Optional parts of a [`Collection::query_vector`] call.
#[derive(Debug, Clone, Default)]
pub struct QueryVectorOptions {
    pub filter: String,
    pub include_vector: bool,
    pub include_doc_id: bool,
    pub query_params: Option<QueryParams>,
    pub output_fields: Option<Vec<String>>,
}

/// An open collection.
///
/// All work is delegated to the engine handle. Once [`Collection::destroy`]
/// succeeds every further call fails with `FailedPrecondition`.
pub struct Collection {
    handle: Box<dyn CollectionHandle>,
    destroyed: AtomicBool,
}

impl Collection {
    /// Creates a collection at `path` with the local engine.
    pub fn create_and_open(
        path: impl AsRef<Path>,
        schema: &CollectionSchema,
        options: Option<CollectionOptions>,
    ) -> Result<Self> {
        Self::create_and_open_with_engine(&LocalEngine::new(), path, schema, options)
    }

    pub fn create_and_open_with_engine(
        engine: &dyn Engine,
        path: impl AsRef<Path>,
        schema: &CollectionSchema,
        options: Option<CollectionOptions>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let options = options.unwrap_or_default();
        debug!(path = %path.display(), schema = %schema.name, "create_and_open");
        let handle = engine
            .create_and_open(path, schema, &options)
            .inspect_err(|e| warn!(path = %path.display(), error = %e, "create_and_open failed"))?;
        Ok(Self::from_handle(handle))
    }

    /// Opens an existing collection at `path` with the local engine.
    pub fn open(path: impl AsRef<Path>, options: Option<CollectionOptions>) -> Result<Self> {
        Self::open_with_engine(&LocalEngine::new(), path, options)
    }

    pub fn open_with_engine(
        engine: &dyn Engine,
        path: impl AsRef<Path>,
        options: Option<CollectionOptions>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let options = options.unwrap_or_default();
        debug!(path = %path.display(), read_only = options.read_only, "open");
        let handle = engine
            .open(path, &options)
            .inspect_err(|e| warn!(path = %path.display(), error = %e, "open failed"))?;
        Ok(Self::from_handle(handle))
    }

    pub fn from_handle(handle: Box<dyn CollectionHandle>) -> Self {
        Self {
            handle,
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    fn call<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&dyn CollectionHandle) -> Result<T>,
    ) -> Result<T> {
        if self.is_destroyed() {
            return Err(Error::FailedPrecondition(
                "collection has been destroyed".into(),
            ));
        }
        debug!(op, "collection call");
        f(self.handle.as_ref()).inspect_err(|e| warn!(op, error = %e, "collection call failed"))
    }

    pub fn path(&self) -> Result<String> {
        self.call("path", |h| h.path())
    }

    pub fn schema(&self) -> Result<CollectionSchema> {
        self.call("schema", |h| h.schema())
    }

    pub fn stats(&self) -> Result<CollectionStats> {
        self.call("stats", |h| h.stats())
    }

    pub fn options(&self) -> Result<CollectionOptions> {
        self.call("options", |h| h.options())
    }

    /// Blocks until everything written so far is durable.
    pub fn flush(&self) -> Result<()> {
        self.call("flush", |h| h.flush())
    }

    /// Deletes the collection and its directory. Not reversible.
    pub fn destroy(&self) -> Result<()> {
        self.call("destroy", |h| h.destroy())?;
        self.destroyed.store(true, Ordering::Release);
        Ok(())
    }

    pub fn create_index(&self, column: &str, params: &IndexParams, concurrency: u32) -> Result<()> {
        self.call("create_index", |h| {
            h.create_index(column, params, CreateIndexOptions::new(concurrency))
        })
    }

    pub fn drop_index(&self, column: &str) -> Result<()> {
        self.call("drop_index", |h| h.drop_index(column))
    }

    pub fn optimize(&self, concurrency: u32) -> Result<()> {
        self.call("optimize", |h| h.optimize(OptimizeOptions::new(concurrency)))
    }

    /// Adds a scalar column. `expression` is empty (null fill) or a literal
    /// of the column type used to fill existing documents.
    pub fn add_column(&self, field: &FieldSchema, expression: &str, concurrency: u32) -> Result<()> {
        self.call("add_column", |h| {
            h.add_column(field, expression, AddColumnOptions::new(concurrency))
        })
    }

    pub fn drop_column(&self, name: &str) -> Result<()> {
        self.call("drop_column", |h| h.drop_column(name))
    }

    /// Renames `name` to `rename` (when non-empty) and applies nullability
    /// and index changes from `new_schema`.
    pub fn alter_column(
        &self,
        name: &str,
        rename: &str,
        new_schema: Option<&FieldSchema>,
        concurrency: u32,
    ) -> Result<()> {
        self.call("alter_column", |h| {
            h.alter_column(name, rename, new_schema, AlterColumnOptions::new(concurrency))
        })
    }

    /// One status per input document, in input order.
    pub fn insert(&self, docs: &[Doc]) -> Result<Vec<Status>> {
        self.call("insert", |h| h.insert(docs))
    }

    pub fn upsert(&self, docs: &[Doc]) -> Result<Vec<Status>> {
        self.call("upsert", |h| h.upsert(docs))
    }

    pub fn update(&self, docs: &[Doc]) -> Result<Vec<Status>> {
        self.call("update", |h| h.update(docs))
    }

    pub fn delete<S: AsRef<str>>(&self, pks: &[S]) -> Result<Vec<Status>> {
        let pks: Vec<String> = pks.iter().map(|s| s.as_ref().to_string()).collect();
        self.call("delete", |h| h.delete(&pks))
    }

    /// Deletes every document matching `filter`. Matching nothing is not an
    /// error.
    pub fn delete_by_filter(&self, filter: &str) -> Result<()> {
        self.call("delete_by_filter", |h| h.delete_by_filter(filter))
    }

    pub fn query(&self, query: &VectorQuery) -> Result<Vec<Doc>> {
        self.call("query", |h| h.query(query))
    }

    pub fn group_by_query(&self, query: &GroupByVectorQuery) -> Result<Vec<GroupResult>> {
        self.call("group_by_query", |h| h.group_by_query(query))
    }

    /// Documents by primary key. Missing keys are absent from the map.
    pub fn fetch<S: AsRef<str>>(&self, pks: &[S]) -> Result<HashMap<String, Doc>> {
        let pks: Vec<String> = pks.iter().map(|s| s.as_ref().to_string()).collect();
        self.call("fetch", |h| h.fetch(&pks))
    }

    /// Builds and runs a [`VectorQuery`] against `field` from a JSON vector.
    pub fn query_vector(
        &self,
        field: &str,
        vector: &Json,
        topk: u32,
        options: QueryVectorOptions,
    ) -> Result<Vec<Doc>> {
        let schema = self.schema()?;
        let field_schema = schema
            .get_field(field)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown field `{}`", field)))?;
        let mut query = VectorQuery::new(field).with_topk(topk);
        query.set_vector(field_schema, vector)?;
        query.filter = options.filter;
        query.include_vector = options.include_vector;
        query.include_doc_id = options.include_doc_id;
        query.query_params = options.query_params;
        query.output_fields = options.output_fields;
        self.query(&query)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("path", &self.handle.path().ok())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Opens the collection at `path`, runs `f` and flushes afterwards, also
/// when `f` failed. An error from `f` takes precedence over a flush error.
pub fn open_collection<T, F>(
    path: impl AsRef<Path>,
    options: Option<CollectionOptions>,
    f: F,
) -> Result<T>
where
    F: FnOnce(&Collection) -> Result<T>,
{
    let collection = Collection::open(path, options)?;
    let result = f(&collection);
    let flushed = if collection.is_destroyed() {
        Ok(())
    } else {
        collection.flush()
    };
    let value = result?;
    flushed?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvec_core::{DataType, MetricType, StatusCode};
    use serde_json::json;
    use tempfile::TempDir;

    fn schema() -> CollectionSchema {
        CollectionSchema::create(
            "notes",
            vec![
                FieldSchema::new("body", DataType::String),
                FieldSchema::create(
                    "v",
                    DataType::VectorFp32,
                    3,
                    false,
                    Some(&IndexParams::flat(MetricType::Cosine)),
                )
                .unwrap(),
            ],
        )
        .unwrap()
    }

    fn note(pk: &str, v: [f32; 3]) -> Doc {
        let mut d = Doc::with_pk(pk);
        d.set_value("body", format!("note {}", pk));
        d.set_value("v", v.to_vec());
        d
    }

    #[test]
    fn test_query_vector_from_json() {
        let dir = TempDir::new().unwrap();
        let c = Collection::create_and_open(dir.path().join("n"), &schema(), None).unwrap();
        c.insert(&[note("x", [1.0, 0.0, 0.0]), note("y", [0.0, 1.0, 0.0])])
            .unwrap();
        let hits = c
            .query_vector("v", &json!([0.9, 0.1, 0.0]), 1, QueryVectorOptions::default())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].pk(), "x");

        let err = c
            .query_vector("nope", &json!([1.0]), 1, QueryVectorOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), StatusCode::InvalidArgument);
    }

    #[test]
    fn test_destroy_is_terminal() {
        let dir = TempDir::new().unwrap();
        let c = Collection::create_and_open(dir.path().join("n"), &schema(), None).unwrap();
        c.destroy().unwrap();
        assert!(c.is_destroyed());
        assert_eq!(c.path().unwrap_err().code(), StatusCode::FailedPrecondition);
        assert_eq!(
            c.insert(&[note("x", [1.0, 0.0, 0.0])]).unwrap_err().code(),
            StatusCode::FailedPrecondition
        );
    }

    #[test]
    fn test_open_collection_flushes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("n");
        drop(Collection::create_and_open(&path, &schema(), None).unwrap());

        let inserted = open_collection(&path, None, |c| {
            let statuses = c.insert(&[note("a", [0.0, 0.0, 1.0])])?;
            Ok(statuses.len())
        })
        .unwrap();
        assert_eq!(inserted, 1);

        let count = open_collection(&path, None, |c| Ok(c.stats()?.doc_count)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_open_collection_closure_error_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("n");
        drop(Collection::create_and_open(&path, &schema(), None).unwrap());
        let err = open_collection(&path, None, |_| -> Result<()> {
            Err(Error::Unavailable("boom".into()))
        })
        .unwrap_err();
        assert_eq!(err.code(), StatusCode::Unavailable);
    }
}

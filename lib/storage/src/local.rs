//! Local reference engine: an in-memory document store snapshotted to a
//! directory, with brute-force ranking.

use ahash::{AHashMap, AHashSet, RandomState};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rayon::prelude::*;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use docvec_core::config;
use docvec_core::{
    AddColumnOptions, AlterColumnOptions, CollectionHandle, CollectionOptions, CollectionSchema,
    CollectionStats, CreateIndexOptions, DataType, Doc, Engine, Error, FieldSchema, GroupByVectorQuery,
    GroupResult, IndexParams, MetricType, OptimizeOptions, Operator, Result, Status, Value,
    VectorQuery,
};

use crate::filter::{ExprFilter, Filter};
use crate::persistence::{self, DocsSnapshot, Manifest, StoredDoc};
use crate::search::{self, SparseQuery, TopK};

type DocMap = HashMap<String, Doc, RandomState>;

/// Engine backed by a local directory per collection.
///
/// Limits left unset fall back to the process-wide configuration.
#[derive(Debug, Default, Clone)]
pub struct LocalEngine {
    memory_limit_bytes: Option<u64>,
    query_threads: Option<u32>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit_bytes = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_query_threads(mut self, n: u32) -> Self {
        self.query_threads = Some(n);
        self
    }

    fn limits(&self) -> Limits {
        let global = config::global();
        Limits {
            memory_limit_bytes: self.memory_limit_bytes.or(global.memory_limit_bytes),
            query_threads: self.query_threads.or(global.query_thread_count),
            optimize_threads: global.optimize_thread_count,
        }
    }
}

impl Engine for LocalEngine {
    fn create_and_open(
        &self,
        path: &Path,
        schema: &CollectionSchema,
        options: &CollectionOptions,
    ) -> Result<Box<dyn CollectionHandle>> {
        Ok(Box::new(LocalCollection::create(path, schema, options, self.limits())?))
    }

    fn open(&self, path: &Path, options: &CollectionOptions) -> Result<Box<dyn CollectionHandle>> {
        Ok(Box::new(LocalCollection::open(path, options, self.limits())?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Limits {
    memory_limit_bytes: Option<u64>,
    query_threads: Option<u32>,
    optimize_threads: Option<u32>,
}

/// Result of the last build of one index.
#[derive(Debug, Default)]
struct IndexState {
    covered: AHashSet<String>,
    /// Widened dense vectors by primary key. Empty for scalar and sparse
    /// fields.
    vectors: AHashMap<String, Vec<f32>>,
}

struct State {
    schema: CollectionSchema,
    docs: DocMap,
    next_doc_id: i64,
    indexes: AHashMap<String, IndexState>,
    mem_bytes: u64,
    dirty: bool,
    destroyed: bool,
}

impl State {
    fn new(schema: CollectionSchema, docs: DocMap, next_doc_id: i64) -> Self {
        let mem_bytes = docs.values().map(|d| d.approx_bytes() as u64).sum();
        let indexes = schema
            .indexed_fields()
            .into_iter()
            .map(|f| (f.name.clone(), IndexState::default()))
            .collect();
        Self {
            schema,
            docs,
            next_doc_id,
            indexes,
            mem_bytes,
            dirty: false,
            destroyed: false,
        }
    }

    fn recount_memory(&mut self) {
        self.mem_bytes = self.docs.values().map(|d| d.approx_bytes() as u64).sum();
    }

    /// Forgets `pk` in every index so completeness reflects the write.
    fn invalidate(&mut self, pk: &str) {
        for index in self.indexes.values_mut() {
            index.covered.remove(pk);
            index.vectors.remove(pk);
        }
    }

    fn apply(&mut self, doc: &Doc, op: Operator, memory_limit: Option<u64>) -> Result<()> {
        validate_doc(&self.schema, doc, op != Operator::Update)?;

        let existing = self.docs.get(doc.pk());
        match (op, existing.is_some()) {
            (Operator::Insert, true) => {
                return Err(Error::AlreadyExists(format!("doc `{}` already exists", doc.pk())));
            }
            (Operator::Update, false) => {
                return Err(Error::NotFound(format!("doc `{}` not found", doc.pk())));
            }
            _ => {}
        }

        let mut stored = match (op, existing) {
            (Operator::Update, Some(old)) => old.clone(),
            _ => Doc::with_pk(doc.pk()),
        };
        for (name, value) in doc.fields() {
            stored.set_value(name, value.clone());
        }
        stored.set_operator(op);
        stored.set_score(0.0);

        let old_bytes = existing.map_or(0, |d| d.approx_bytes() as u64);
        let new_bytes = stored.approx_bytes() as u64;
        let projected = self.mem_bytes.saturating_sub(old_bytes) + new_bytes;
        if let Some(limit) = memory_limit {
            if projected > limit {
                return Err(Error::ResourceExhausted(format!(
                    "memory limit of {} bytes reached",
                    limit
                )));
            }
        }

        let doc_id = match existing {
            Some(old) => old.doc_id(),
            None => {
                let id = self.next_doc_id;
                self.next_doc_id += 1;
                id
            }
        };
        stored.set_doc_id(doc_id);

        self.invalidate(doc.pk());
        self.docs.insert(doc.pk().to_string(), stored);
        self.mem_bytes = projected;
        self.dirty = true;
        Ok(())
    }

    fn remove(&mut self, pk: &str) -> bool {
        match self.docs.remove(pk) {
            Some(doc) => {
                self.mem_bytes = self.mem_bytes.saturating_sub(doc.approx_bytes() as u64);
                self.invalidate(pk);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    fn rebuild_index(&mut self, column: &str, pool: &rayon::ThreadPool) {
        let Some(field) = self.schema.get_field(column) else {
            return;
        };
        if field.index_params.is_none() {
            self.indexes.remove(column);
            return;
        }
        let docs = &self.docs;
        let vectors: AHashMap<String, Vec<f32>> = if field.is_dense_vector() {
            pool.install(|| {
                docs.par_iter()
                    .filter_map(|(pk, doc)| {
                        doc.get(column)
                            .and_then(Value::to_f32_vector)
                            .map(|v| (pk.clone(), v))
                    })
                    .collect::<Vec<_>>()
            })
            .into_iter()
            .collect()
        } else {
            AHashMap::new()
        };
        let covered = docs.keys().cloned().collect();
        debug!(column, docs = docs.len(), "rebuilt index");
        self.indexes
            .insert(column.to_string(), IndexState { covered, vectors });
    }

    fn stats(&self) -> CollectionStats {
        let live = self.docs.len();
        let index_completeness = self
            .schema
            .indexed_fields()
            .into_iter()
            .map(|f| {
                let covered = self.indexes.get(&f.name).map_or(0, |i| i.covered.len());
                let ratio = if live == 0 {
                    1.0
                } else {
                    covered as f32 / live as f32
                };
                (f.name.clone(), ratio)
            })
            .collect();
        CollectionStats {
            doc_count: live as u64,
            index_completeness,
        }
    }

    fn snapshot(&self) -> DocsSnapshot {
        let mut docs: Vec<StoredDoc> = self.docs.values().map(StoredDoc::from).collect();
        docs.sort_by_key(|d| d.doc_id);
        let index_coverage = self
            .indexes
            .iter()
            .map(|(name, index)| (name.clone(), index.covered.iter().cloned().collect()))
            .collect();
        DocsSnapshot {
            docs,
            index_coverage,
        }
    }
}

/// Dimension of a dense value as compared against the schema: bits for
/// binary vectors, elements otherwise.
fn dense_dimension(value: &Value) -> usize {
    match value {
        Value::VectorBinary32(words) => words.len() * 32,
        Value::VectorBinary64(words) => words.len() * 64,
        other => other.len(),
    }
}

fn check_value(field: &FieldSchema, value: &Value) -> Result<()> {
    let Some(actual) = value.data_type() else {
        if field.nullable {
            return Ok(());
        }
        return Err(Error::InvalidArgument(format!(
            "field `{}` is not nullable",
            field.name
        )));
    };
    if actual != field.data_type {
        return Err(Error::InvalidArgument(format!(
            "field `{}` expects {}, got {}",
            field.name, field.data_type, actual
        )));
    }
    if field.is_dense_vector() {
        let dim = dense_dimension(value);
        if dim != field.dimension as usize {
            return Err(Error::InvalidArgument(format!(
                "field `{}` expects dimension {}, got {}",
                field.name, field.dimension, dim
            )));
        }
    }
    if field.is_sparse_vector() && field.dimension > 0 {
        if let Some((indices, _)) = value.sparse_entries() {
            if let Some(bad) = indices.iter().find(|&&i| i >= field.dimension) {
                return Err(Error::InvalidArgument(format!(
                    "field `{}` sparse index {} exceeds dimension {}",
                    field.name, bad, field.dimension
                )));
            }
        }
    }
    Ok(())
}

/// Checks one incoming document. Missing non-nullable fields are only
/// tolerated when `require_complete` is false.
fn validate_doc(schema: &CollectionSchema, doc: &Doc, require_complete: bool) -> Result<()> {
    if doc.pk().is_empty() {
        return Err(Error::InvalidArgument("primary key must not be empty".into()));
    }
    for (name, value) in doc.fields() {
        let field = schema.get_field(name).ok_or_else(|| {
            Error::InvalidArgument(format!("unknown field `{}` in doc `{}`", name, doc.pk()))
        })?;
        check_value(field, value)?;
    }
    if require_complete {
        if let Some(missing) = schema
            .fields()
            .iter()
            .find(|f| !f.nullable && !doc.has_value(&f.name))
        {
            return Err(Error::InvalidArgument(format!(
                "required field `{}` missing from doc `{}`",
                missing.name,
                doc.pk()
            )));
        }
    }
    Ok(())
}

/// Parses an `add_column` fill expression for `field`. Empty means null.
fn parse_fill(field: &FieldSchema, expression: &str) -> Result<Option<Value>> {
    let text = expression.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let json = if matches!(field.data_type, DataType::String | DataType::Binary) {
        Json::String(unquote(text).to_string())
    } else {
        serde_json::from_str(text).map_err(|e| {
            Error::InvalidArgument(format!(
                "cannot parse `{}` as a {} literal: {}",
                text, field.data_type, e
            ))
        })?
    };
    Value::from_json(field.data_type, &json).map(Some)
}

fn unquote(text: &str) -> &str {
    for q in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(q) && text.ends_with(q) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Internal(format!("failed to start worker pool: {}", e)))
}

/// Prepared query vector.
enum Probe {
    Dense { vector: Vec<f32>, metric: MetricType },
    Sparse(SparseQuery),
}

impl Probe {
    fn higher_is_better(&self) -> bool {
        match self {
            Probe::Dense { metric, .. } => metric.higher_is_better(),
            Probe::Sparse(_) => true,
        }
    }
}

pub struct LocalCollection {
    path: PathBuf,
    options: CollectionOptions,
    limits: Limits,
    query_pool: Option<rayon::ThreadPool>,
    state: RwLock<State>,
}

impl LocalCollection {
    fn create(
        path: &Path,
        schema: &CollectionSchema,
        options: &CollectionOptions,
        limits: Limits,
    ) -> Result<Self> {
        schema.validate()?;
        if options.read_only {
            return Err(Error::InvalidArgument(
                "a collection cannot be created read-only".into(),
            ));
        }
        if persistence::exists(path) {
            return Err(Error::AlreadyExists(format!(
                "collection already exists at {}",
                path.display()
            )));
        }
        std::fs::create_dir_all(path)?;
        let manifest = Manifest::new(schema.clone(), options.clone());
        persistence::write_manifest(path, &manifest)?;
        persistence::write_docs(path, &DocsSnapshot::default())?;

        info!(path = %path.display(), schema = %schema.name, "created collection");
        let state = State::new(schema.clone(), DocMap::default(), 0);
        Self::from_parts(path, options, limits, state)
    }

    fn open(path: &Path, options: &CollectionOptions, limits: Limits) -> Result<Self> {
        let manifest = persistence::read_manifest(path)?;
        let snapshot = persistence::read_docs(path)?;

        let mut docs = DocMap::default();
        for stored in snapshot.docs {
            let doc = stored.into_doc()?;
            docs.insert(doc.pk().to_string(), doc);
        }
        let mut state = State::new(manifest.schema, docs, manifest.next_doc_id);

        for (column, keys) in snapshot.index_coverage {
            let Some(field) = state.schema.get_field(&column) else {
                continue;
            };
            if field.index_params.is_none() {
                continue;
            }
            let dense = field.is_dense_vector();
            let mut index = IndexState::default();
            for pk in keys {
                let Some(doc) = state.docs.get(&pk) else {
                    continue;
                };
                if dense {
                    if let Some(v) = doc.get(&column).and_then(Value::to_f32_vector) {
                        index.vectors.insert(pk.clone(), v);
                    }
                }
                index.covered.insert(pk);
            }
            state.indexes.insert(column, index);
        }

        info!(
            path = %path.display(),
            docs = state.docs.len(),
            read_only = options.read_only,
            "opened collection"
        );
        Self::from_parts(path, options, limits, state)
    }

    fn from_parts(
        path: &Path,
        options: &CollectionOptions,
        limits: Limits,
        state: State,
    ) -> Result<Self> {
        let query_pool = match limits.query_threads {
            Some(n) => Some(build_pool(n as usize)?),
            None => None,
        };
        Ok(Self {
            path: path.to_path_buf(),
            options: options.clone(),
            limits,
            query_pool,
            state: RwLock::new(state),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        let state = self.state.read();
        if state.destroyed {
            return Err(destroyed());
        }
        Ok(state)
    }

    fn ensure_live(&self) -> Result<()> {
        self.read().map(|_| ())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        let state = self.state.write();
        if state.destroyed {
            return Err(destroyed());
        }
        if self.options.read_only {
            return Err(Error::PermissionDenied(format!(
                "collection at {} is read-only",
                self.path.display()
            )));
        }
        Ok(state)
    }

    fn ddl_pool(&self, concurrency: u32) -> Result<rayon::ThreadPool> {
        let threads = if concurrency > 0 {
            concurrency
        } else {
            self.limits.optimize_threads.unwrap_or(0)
        };
        build_pool(threads as usize)
    }

    fn persist(&self, state: &mut State) -> Result<()> {
        persist_state(&self.path, &self.options, state)
    }

    fn write_batch(&self, docs: &[Doc], op: Operator) -> Result<Vec<Status>> {
        let mut state = self.write()?;
        let limit = self.limits.memory_limit_bytes;
        let statuses: Vec<Status> = docs
            .iter()
            .map(|doc| match state.apply(doc, op, limit) {
                Ok(()) => Status::ok(),
                Err(e) => Status::from(e),
            })
            .collect();
        debug!(
            op = %op,
            total = docs.len(),
            failed = statuses.iter().filter(|s| !s.is_ok()).count(),
            "write batch"
        );
        Ok(statuses)
    }

    fn probe(field: &FieldSchema, query: &VectorQuery) -> Result<Probe> {
        if field.is_sparse_vector() {
            let (indices, values) = query.sparse_vector(field.data_type)?;
            if indices.is_empty() {
                return Err(Error::InvalidArgument("query vector is empty".into()));
            }
            return Ok(Probe::Sparse(SparseQuery::new(&indices, &values)));
        }
        let vector = query.dense_vector()?;
        if vector.is_empty() {
            return Err(Error::InvalidArgument("query vector is empty".into()));
        }
        if vector.len() != field.dimension as usize {
            return Err(Error::InvalidArgument(format!(
                "query vector has dimension {}, field `{}` expects {}",
                vector.len(),
                field.name,
                field.dimension
            )));
        }
        let metric = field
            .index_params
            .as_ref()
            .and_then(IndexParams::metric_type)
            .unwrap_or(MetricType::L2);
        Ok(Probe::Dense { vector, metric })
    }

    /// Scores every filtered candidate and returns the best `limit` as
    /// `(doc, score)`, best first.
    fn rank<'s>(
        &self,
        state: &'s State,
        query: &VectorQuery,
        limit: usize,
    ) -> Result<Vec<(&'s Doc, f32)>> {
        let field = state.schema.get_field(&query.field_name).ok_or_else(|| {
            Error::NotFound(format!("field `{}` not found", query.field_name))
        })?;
        if !field.is_vector_field() {
            return Err(Error::InvalidArgument(format!(
                "field `{}` is not a vector field",
                field.name
            )));
        }
        if let Some(names) = &query.output_fields {
            if let Some(bad) = names.iter().find(|n| !state.schema.has_field(n)) {
                return Err(Error::InvalidArgument(format!("unknown output field `{}`", bad)));
            }
        }
        let probe = Self::probe(field, query)?;
        let filter = ExprFilter::parse(&query.filter, &state.schema)?;
        let radius = query.query_params.as_ref().map_or(0.0, |p| p.radius());
        let higher_is_better = probe.higher_is_better();

        let column = field.name.as_str();
        let cache = state.indexes.get(column).map(|i| &i.vectors);
        let candidates: Vec<&Doc> = state
            .docs
            .values()
            .filter(|d| d.has_value(column) && filter.matches(d))
            .collect();

        let score_all = || -> Vec<(usize, f32)> {
            candidates
                .par_iter()
                .enumerate()
                .filter_map(|(slot, doc)| {
                    let score = match &probe {
                        Probe::Dense { vector, metric } => {
                            let cached = cache.and_then(|c| c.get(doc.pk()));
                            match cached {
                                Some(v) => search::dense_score(*metric, vector, v),
                                None => {
                                    let v = doc.get(column)?.to_f32_vector()?;
                                    search::dense_score(*metric, vector, &v)
                                }
                            }
                        }
                        Probe::Sparse(q) => {
                            let (indices, values) = doc.get(column)?.sparse_entries()?;
                            q.dot(&indices, &values)
                        }
                    };
                    Some((slot, score))
                })
                .collect()
        };
        let scored = match &self.query_pool {
            Some(pool) => pool.install(score_all),
            None => score_all(),
        };

        let mut top = TopK::new(limit, higher_is_better);
        for (slot, score) in scored {
            if search::within_radius(score, radius, higher_is_better) {
                top.push(score, candidates[slot].doc_id(), slot);
            }
        }
        Ok(top
            .into_sorted()
            .into_iter()
            .map(|(slot, score)| (candidates[slot], score))
            .collect())
    }
}

fn destroyed() -> Error {
    Error::FailedPrecondition("collection has been destroyed".into())
}

fn persist_state(path: &Path, options: &CollectionOptions, state: &mut State) -> Result<()> {
    if options.read_only || state.destroyed {
        return Ok(());
    }
    let mut manifest = Manifest::new(state.schema.clone(), options.clone());
    manifest.next_doc_id = state.next_doc_id;
    persistence::write_manifest(path, &manifest)?;
    persistence::write_docs(path, &state.snapshot())?;
    state.dirty = false;
    Ok(())
}

/// Copies `doc` for output: score set, doc id kept only on request, vector
/// fields only on request, scalar fields limited to `output_fields`.
fn project(
    schema: &CollectionSchema,
    doc: &Doc,
    score: f32,
    include_vector: bool,
    include_doc_id: bool,
    output_fields: Option<&[String]>,
) -> Doc {
    let mut out = doc.clone();
    out.set_score(score);
    if !include_doc_id {
        out.set_doc_id(0);
    }
    out.retain_fields(|name, _| match schema.get_field(name) {
        Some(field) if field.is_vector_field() => include_vector,
        Some(_) => output_fields.map_or(true, |names| names.iter().any(|n| n == name)),
        None => false,
    });
    out
}

impl CollectionHandle for LocalCollection {
    fn path(&self) -> Result<String> {
        self.ensure_live()?;
        Ok(self.path.display().to_string())
    }

    fn schema(&self) -> Result<CollectionSchema> {
        Ok(self.read()?.schema.clone())
    }

    fn stats(&self) -> Result<CollectionStats> {
        Ok(self.read()?.stats())
    }

    fn options(&self) -> Result<CollectionOptions> {
        self.ensure_live()?;
        Ok(self.options.clone())
    }

    fn flush(&self) -> Result<()> {
        if self.options.read_only {
            self.ensure_live()?;
            return Ok(());
        }
        let mut state = self.write()?;
        if state.dirty {
            self.persist(&mut state)?;
        }
        debug!(path = %self.path.display(), "flushed");
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        let mut state = self.write()?;
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        state.docs.clear();
        state.indexes.clear();
        state.mem_bytes = 0;
        state.dirty = false;
        state.destroyed = true;
        info!(path = %self.path.display(), "destroyed collection");
        Ok(())
    }

    fn create_index(&self, column: &str, params: &IndexParams, options: CreateIndexOptions) -> Result<()> {
        let mut state = self.write()?;
        let field = state
            .schema
            .get_field_mut(column)
            .ok_or_else(|| Error::NotFound(format!("field `{}` not found", column)))?;
        field.set_index_params(Some(params))?;
        let pool = self.ddl_pool(options.concurrency)?;
        state.rebuild_index(column, &pool);
        state.dirty = true;
        self.persist(&mut state)?;
        info!(column, index = %params.index_type(), "created index");
        Ok(())
    }

    fn drop_index(&self, column: &str) -> Result<()> {
        let mut state = self.write()?;
        let field = state
            .schema
            .get_field_mut(column)
            .ok_or_else(|| Error::NotFound(format!("field `{}` not found", column)))?;
        match &field.index_params {
            None => {
                return Err(Error::FailedPrecondition(format!(
                    "field `{}` has no index",
                    column
                )));
            }
            Some(params) if params.is_vector_index() => {
                let metric = params.metric_type().unwrap_or(MetricType::L2);
                field.index_params = Some(IndexParams::flat(metric));
                let pool = self.ddl_pool(0)?;
                state.rebuild_index(column, &pool);
            }
            Some(_) => {
                field.index_params = None;
                state.indexes.remove(column);
            }
        }
        state.dirty = true;
        self.persist(&mut state)?;
        info!(column, "dropped index");
        Ok(())
    }

    fn optimize(&self, options: OptimizeOptions) -> Result<()> {
        let mut state = self.write()?;
        let pool = self.ddl_pool(options.concurrency)?;
        let columns: Vec<String> = state
            .schema
            .indexed_fields()
            .into_iter()
            .map(|f| f.name.clone())
            .collect();
        for column in &columns {
            state.rebuild_index(column, &pool);
        }
        state.dirty = true;
        self.persist(&mut state)?;
        info!(indexes = columns.len(), "optimized collection");
        Ok(())
    }

    fn add_column(&self, field: &FieldSchema, expression: &str, options: AddColumnOptions) -> Result<()> {
        let mut state = self.write()?;
        if state.schema.has_field(&field.name) {
            return Err(Error::AlreadyExists(format!("field `{}` already exists", field.name)));
        }
        if field.is_vector_field() {
            return Err(Error::NotSupported(format!(
                "cannot add vector column `{}` to an existing collection",
                field.name
            )));
        }
        if matches!(field.name.as_str(), "doc_id" | "score" | "operator") {
            return Err(Error::InvalidArgument(format!("field name `{}` is reserved", field.name)));
        }
        let fill = parse_fill(field, expression)?;
        if fill.is_none() && !field.nullable && !state.docs.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "column `{}` is not nullable and needs a fill expression",
                field.name
            )));
        }
        state.schema.add_field(field.clone())?;

        if let Some(value) = fill {
            let pool = self.ddl_pool(options.concurrency)?;
            let name = field.name.as_str();
            let docs = &mut state.docs;
            pool.install(|| {
                docs.par_iter_mut()
                    .for_each(|(_, doc)| doc.set_value(name, value.clone()));
            });
            state.recount_memory();
        }
        if field.index_params.is_some() {
            let pool = self.ddl_pool(options.concurrency)?;
            state.rebuild_index(&field.name, &pool);
        }
        state.dirty = true;
        self.persist(&mut state)?;
        info!(column = %field.name, "added column");
        Ok(())
    }

    fn drop_column(&self, name: &str) -> Result<()> {
        let mut state = self.write()?;
        if !state.schema.has_field(name) {
            return Err(Error::NotFound(format!("field `{}` not found", name)));
        }
        if state.schema.fields().len() == 1 {
            return Err(Error::FailedPrecondition(format!(
                "cannot drop `{}`, the only column",
                name
            )));
        }
        state.schema.remove_field(name);
        state.docs.par_iter_mut().for_each(|(_, doc)| {
            doc.remove_field(name);
        });
        state.indexes.remove(name);
        state.recount_memory();
        state.dirty = true;
        self.persist(&mut state)?;
        info!(column = name, "dropped column");
        Ok(())
    }

    fn alter_column(
        &self,
        name: &str,
        rename: &str,
        new_schema: Option<&FieldSchema>,
        options: AlterColumnOptions,
    ) -> Result<()> {
        let mut state = self.write()?;
        let current = state
            .schema
            .get_field(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("field `{}` not found", name)))?;

        let target = match rename.trim() {
            "" => name,
            other => other,
        };
        if target != name && state.schema.has_field(target) {
            return Err(Error::AlreadyExists(format!("field `{}` already exists", target)));
        }
        if matches!(target, "doc_id" | "score" | "operator") {
            return Err(Error::InvalidArgument(format!("field name `{}` is reserved", target)));
        }

        let mut updated = current.clone();
        if let Some(ns) = new_schema {
            if ns.data_type != current.data_type {
                return Err(Error::NotSupported(format!(
                    "changing `{}` from {} to {}",
                    name, current.data_type, ns.data_type
                )));
            }
            if ns.dimension != current.dimension {
                return Err(Error::NotSupported(format!(
                    "changing the dimension of `{}`",
                    name
                )));
            }
            updated.nullable = ns.nullable;
            updated.set_index_params(ns.index_params.as_ref())?;
        }
        if current.nullable && !updated.nullable && state.docs.values().any(|d| !d.has_value(name)) {
            return Err(Error::FailedPrecondition(format!(
                "column `{}` has null values and cannot become non-nullable",
                name
            )));
        }
        updated.name = target.to_string();

        let index_changed = updated.index_params != current.index_params;
        if let Some(slot) = state.schema.get_field_mut(name) {
            *slot = updated;
        }
        if target != name {
            state.docs.par_iter_mut().for_each(|(_, doc)| {
                doc.rename_field(name, target);
            });
            if let Some(index) = state.indexes.remove(name) {
                state.indexes.insert(target.to_string(), index);
            }
        }
        if index_changed {
            let pool = self.ddl_pool(options.concurrency)?;
            state.rebuild_index(target, &pool);
        }
        state.dirty = true;
        self.persist(&mut state)?;
        info!(column = name, renamed = target, "altered column");
        Ok(())
    }

    fn insert(&self, docs: &[Doc]) -> Result<Vec<Status>> {
        self.write_batch(docs, Operator::Insert)
    }

    fn upsert(&self, docs: &[Doc]) -> Result<Vec<Status>> {
        self.write_batch(docs, Operator::Upsert)
    }

    fn update(&self, docs: &[Doc]) -> Result<Vec<Status>> {
        self.write_batch(docs, Operator::Update)
    }

    fn delete(&self, pks: &[String]) -> Result<Vec<Status>> {
        let mut state = self.write()?;
        let statuses = pks
            .iter()
            .map(|pk| {
                if state.remove(pk) {
                    Status::ok()
                } else {
                    Status::not_found(format!("doc `{}` not found", pk))
                }
            })
            .collect();
        debug!(total = pks.len(), "delete batch");
        Ok(statuses)
    }

    fn delete_by_filter(&self, filter: &str) -> Result<()> {
        let mut state = self.write()?;
        let parsed = ExprFilter::parse(filter, &state.schema)?;
        let doomed: Vec<String> = state
            .docs
            .values()
            .filter(|d| parsed.matches(d))
            .map(|d| d.pk().to_string())
            .collect();
        for pk in &doomed {
            state.remove(pk);
        }
        debug!(filter, deleted = doomed.len(), "delete by filter");
        Ok(())
    }

    fn query(&self, query: &VectorQuery) -> Result<Vec<Doc>> {
        if query.topk == 0 {
            return Err(Error::InvalidArgument("topk must be positive".into()));
        }
        let state = self.read()?;
        let hits = self.rank(&state, query, query.topk as usize)?;
        let output = query.output_fields.as_deref();
        Ok(hits
            .into_iter()
            .map(|(doc, score)| {
                project(
                    &state.schema,
                    doc,
                    score,
                    query.include_vector,
                    query.include_doc_id,
                    output,
                )
            })
            .collect())
    }

    fn group_by_query(&self, query: &GroupByVectorQuery) -> Result<Vec<GroupResult>> {
        if query.group_count == 0 || query.group_topk == 0 {
            return Err(Error::InvalidArgument(
                "group_count and group_topk must be positive".into(),
            ));
        }
        let state = self.read()?;
        let group_field = state
            .schema
            .get_field(&query.group_by_field_name)
            .ok_or_else(|| {
                Error::NotFound(format!("field `{}` not found", query.group_by_field_name))
            })?;
        if group_field.is_vector_field() {
            return Err(Error::InvalidArgument(format!(
                "cannot group by vector field `{}`",
                group_field.name
            )));
        }
        let group_name = group_field.name.as_str();

        let vq = query.as_vector_query();
        let hits = self.rank(&state, &vq, state.docs.len())?;
        let output = query.output_fields.as_deref();

        let mut groups: Vec<GroupResult> = Vec::new();
        let mut slots: AHashMap<String, usize> = AHashMap::new();
        for (doc, score) in hits {
            let key = doc.get(group_name).map(Value::to_key_string).unwrap_or_default();
            let slot = match slots.get(&key) {
                Some(&i) => i,
                None if groups.len() < query.group_count as usize => {
                    groups.push(GroupResult {
                        group_by_value: key.clone(),
                        docs: Vec::new(),
                    });
                    slots.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
                None => continue,
            };
            let group = &mut groups[slot];
            if group.docs.len() < query.group_topk as usize {
                group.docs.push(project(
                    &state.schema,
                    doc,
                    score,
                    query.include_vector,
                    false,
                    output,
                ));
            }
        }
        Ok(groups)
    }

    fn fetch(&self, pks: &[String]) -> Result<HashMap<String, Doc>> {
        let state = self.read()?;
        Ok(pks
            .iter()
            .filter_map(|pk| state.docs.get(pk).map(|d| (pk.clone(), d.clone())))
            .collect())
    }
}

impl Drop for LocalCollection {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.dirty {
            return;
        }
        if let Err(e) = persist_state(&self.path, &self.options, state) {
            warn!(path = %self.path.display(), error = %e, "failed to persist collection on close");
        }
    }
}

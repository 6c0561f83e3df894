use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use docvec_core::{
    CollectionOptions, CollectionSchema, DataType, Doc, Encoded, Error, Operator, Result, Value,
};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const DOCS_FILE: &str = "docs.bin";
pub const FORMAT_VERSION: u32 = 1;

/// Collection metadata, kept as JSON so it can be inspected by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub schema: CollectionSchema,
    pub options: CollectionOptions,
    pub next_doc_id: i64,
    pub updated_at: DateTime<Utc>,
}

impl Manifest {
    pub fn new(schema: CollectionSchema, options: CollectionOptions) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            schema,
            options,
            next_doc_id: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Everything needed to rebuild the in-memory document store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocsSnapshot {
    pub docs: Vec<StoredDoc>,
    /// Keys covered by the last build of each index, by field.
    pub index_coverage: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoredDoc {
    pub pk: String,
    pub doc_id: i64,
    pub operator: Operator,
    pub fields: Vec<StoredField>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoredField {
    pub name: String,
    /// `None` for an explicit null.
    pub data_type: Option<DataType>,
    pub payload: StoredPayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum StoredPayload {
    Dense(Vec<u8>),
    Sparse { indices: Vec<u8>, values: Vec<u8> },
}

impl From<&Doc> for StoredDoc {
    fn from(doc: &Doc) -> Self {
        let fields = doc
            .fields()
            .map(|(name, value)| StoredField {
                name: name.to_string(),
                data_type: value.data_type(),
                payload: match value.encode() {
                    Encoded::Dense(bytes) => StoredPayload::Dense(bytes),
                    Encoded::Sparse { indices, values } => StoredPayload::Sparse { indices, values },
                },
            })
            .collect();
        Self {
            pk: doc.pk().to_string(),
            doc_id: doc.doc_id(),
            operator: doc.operator(),
            fields,
        }
    }
}

impl StoredDoc {
    pub fn into_doc(self) -> Result<Doc> {
        let mut doc = Doc::with_pk(self.pk);
        doc.set_doc_id(self.doc_id);
        doc.set_operator(self.operator);
        for field in self.fields {
            let value = match field.data_type {
                None => Value::Null,
                Some(dt) => {
                    let encoded = match field.payload {
                        StoredPayload::Dense(bytes) => Encoded::Dense(bytes),
                        StoredPayload::Sparse { indices, values } => Encoded::Sparse { indices, values },
                    };
                    Value::decode(dt, &encoded).map_err(|e| {
                        Error::Internal(format!(
                            "corrupt value for field `{}` of doc `{}`: {}",
                            field.name,
                            doc.pk(),
                            e
                        ))
                    })?
                }
            };
            doc.set_value(field.name, value);
        }
        Ok(doc)
    }
}

pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE)
}

pub fn docs_path(dir: &Path) -> PathBuf {
    dir.join(DOCS_FILE)
}

pub fn exists(dir: &Path) -> bool {
    manifest_path(dir).is_file()
}

/// Replaces `path` with `bytes` so readers never observe a partial file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(bytes))
        .map_err(|e| Error::Internal(format!("failed to write {}: {}", path.display(), e)))
}

pub fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(manifest)?;
    write_atomic(&manifest_path(dir), &bytes)
}

pub fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = manifest_path(dir);
    if !path.is_file() {
        return Err(Error::NotFound(format!("no collection at {}", dir.display())));
    }
    let bytes = std::fs::read(&path)?;
    let manifest: Manifest = serde_json::from_slice(&bytes)?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(Error::NotSupported(format!(
            "collection format version {} (expected {})",
            manifest.format_version, FORMAT_VERSION
        )));
    }
    Ok(manifest)
}

pub fn write_docs(dir: &Path, snapshot: &DocsSnapshot) -> Result<()> {
    let bytes = bincode::serialize(snapshot).map_err(|e| Error::Serialization(e.to_string()))?;
    write_atomic(&docs_path(dir), &bytes)
}

/// An absent document file is an empty collection.
pub fn read_docs(dir: &Path) -> Result<DocsSnapshot> {
    let path = docs_path(dir);
    if !path.is_file() {
        return Ok(DocsSnapshot::default());
    }
    let bytes = std::fs::read(&path)?;
    bincode::deserialize(&bytes).map_err(|e| Error::Serialization(e.to_string()))
}

use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::fmt;

use crate::schema::{CollectionSchema, FieldSchema};
use crate::types::{DataType, Operator};
use crate::value::Value;
use crate::{Error, Result};

/// A keyed record: primary key, engine metadata and typed field values.
///
/// A field may be absent, present with [`Value::Null`], or present with a
/// value. Absent and null both read back as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Doc {
    pk: String,
    doc_id: i64,
    score: f32,
    operator: Operator,
    fields: BTreeMap<String, Value>,
}

impl Doc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pk(pk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn pk(&self) -> &str {
        &self.pk
    }

    pub fn set_pk(&mut self, pk: impl Into<String>) {
        self.pk = pk.into();
    }

    #[inline]
    pub fn doc_id(&self) -> i64 {
        self.doc_id
    }

    pub fn set_doc_id(&mut self, doc_id: i64) {
        self.doc_id = doc_id;
    }

    #[inline]
    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn set_score(&mut self, score: f32) {
        self.score = score;
    }

    #[inline]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn set_operator(&mut self, operator: Operator) {
        self.operator = operator;
    }

    /// Converts a dynamic caller value by `data_type` and stores it. JSON
    /// `null` marks the field present-and-null.
    pub fn set_field(&mut self, name: &str, data_type: DataType, value: &Json) -> Result<()> {
        let converted = Value::from_json(data_type, value).map_err(|e| match e {
            Error::InvalidArgument(msg) => Error::InvalidArgument(format!("field `{}`: {}", name, msg)),
            other => other,
        })?;
        self.fields.insert(name.to_string(), converted);
        Ok(())
    }

    /// Like [`Doc::set_field`] with the type taken from `field`. Null is
    /// refused for non-nullable fields.
    pub fn set_field_by_schema(&mut self, field: &FieldSchema, value: &Json) -> Result<()> {
        if value.is_null() && !field.nullable {
            return Err(Error::InvalidArgument(format!(
                "field `{}` is not nullable",
                field.name
            )));
        }
        self.set_field(&field.name, field.data_type, value)
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn set_null(&mut self, name: impl Into<String>) {
        self.fields.insert(name.into(), Value::Null);
    }

    /// Reads a field as `data_type`. `Ok(None)` for absent or null fields.
    pub fn get_field(&self, name: &str, data_type: DataType) -> Result<Option<Value>> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .reinterpret(data_type)
                .map(Some)
                .map_err(|e| e.for_field(name)),
        }
    }

    /// Raw access to the stored value, including explicit nulls.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Present and not null.
    pub fn has_value(&self, name: &str) -> bool {
        matches!(self.fields.get(name), Some(v) if !v.is_null())
    }

    pub fn is_null(&self, name: &str) -> bool {
        matches!(self.fields.get(name), Some(Value::Null))
    }

    pub fn remove_field(&mut self, name: &str) -> bool {
        self.fields.remove(name).is_some()
    }

    /// Renames a stored field, returning whether it was present.
    pub fn rename_field(&mut self, from: &str, to: &str) -> bool {
        match self.fields.remove(from) {
            Some(v) => {
                self.fields.insert(to.to_string(), v);
                true
            }
            None => false,
        }
    }

    /// Drops every field not accepted by `keep`.
    pub fn retain_fields<F: FnMut(&str, &Value) -> bool>(&mut self, mut keep: F) {
        self.fields.retain(|k, v| keep(k, v));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Resets fields and metadata.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Approximate memory footprint, used for engine accounting.
    pub fn approx_bytes(&self) -> usize {
        std::mem::size_of::<Doc>()
            + self.pk.len()
            + self
                .fields
                .iter()
                .map(|(k, v)| k.len() + v.approx_bytes())
                .sum::<usize>()
    }

    /// JSON object with `pk`, `score` and each schema field present on this
    /// document, in schema order.
    pub fn to_json(&self, schema: &CollectionSchema) -> Json {
        let mut map = Map::new();
        map.insert("pk".into(), Json::String(self.pk.clone()));
        map.insert(
            "score".into(),
            serde_json::Number::from_f64(f64::from(self.score)).map_or(Json::Null, Json::Number),
        );
        for field in schema.fields() {
            if let Some(value) = self.fields.get(&field.name) {
                map.insert(field.name.clone(), value.to_json());
            }
        }
        Json::Object(map)
    }
}

impl fmt::Display for Doc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Doc{{pk={}, doc_id={}, score={}, operator={}, fields=[",
            self.pk, self.doc_id, self.score, self.operator
        )?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value.to_json())?;
        }
        f.write_str("]}")
    }
}

//! Schema Codec
//!
//! Decoding reads every compiled field from the input object (or its default),
//! validates it, and aggregates failures per field. Nothing is returned unless
//! every field passed. Encoding is the lossless reverse projection and never
//! validates; [`Record::validate`] re-checks a record after mutation.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use super::CompiledSchema;
use crate::error::{Result, SchemaError};
use crate::failure::{Failure, LeafFailure};
use crate::types::TypeKind;

static NULL: Value = Value::Null;

/// Value held by a record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    /// Field typed directly by another schema
    Record(Record),
}

impl FieldValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(value) => Some(value),
            FieldValue::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Record(record) => Some(record),
            FieldValue::Value(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            FieldValue::Value(value) => value.clone(),
            FieldValue::Record(record) => record.to_value(),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

impl From<Record> for FieldValue {
    fn from(record: Record) -> Self {
        FieldValue::Record(record)
    }
}

/// A decoded instance of a compiled schema
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<CompiledSchema>,
    /// Parallel to `schema.fields()`
    values: Vec<FieldValue>,
}

impl Record {
    pub(crate) fn decode(schema: &Arc<CompiledSchema>, input: &Value) -> std::result::Result<Self, Failure> {
        let map = match input {
            Value::Object(map) => map,
            Value::Null => return Err(LeafFailure::null().into()),
            _ => return Err(LeafFailure::unexpected_type().into()),
        };

        let mut values = Vec::with_capacity(schema.fields().len());
        let mut failures = Vec::new();
        for field in schema.fields() {
            let raw = map
                .get(field.name())
                .or_else(|| field.default())
                .unwrap_or(&NULL);

            let decoded = match field.ty().kind() {
                TypeKind::Record(nested) => field
                    .ty()
                    .check_validators(raw)
                    .map_err(Failure::from)
                    .and_then(|()| Record::decode(nested, raw))
                    .map(FieldValue::Record),
                _ => field
                    .ty()
                    .validate(raw)
                    .map(|()| FieldValue::Value(raw.clone())),
            };

            match decoded {
                Ok(value) => {
                    trace!(schema = %schema.name(), field = field.name(), "field decoded");
                    values.push(value);
                }
                Err(failure) => {
                    trace!(schema = %schema.name(), field = field.name(), %failure, "field rejected");
                    failures.push((field.name().to_string(), failure));
                }
            }
        }

        if failures.is_empty() {
            Ok(Self {
                schema: Arc::clone(schema),
                values,
            })
        } else {
            Err(Failure::Fields(failures))
        }
    }

    pub fn schema(&self) -> &Arc<CompiledSchema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema
            .field_index(name)
            .and_then(|index| self.values.get(index))
    }

    /// Plain value of a field; `None` for nested records
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(FieldValue::as_value)
    }

    /// Nested record held by a field
    pub fn record(&self, name: &str) -> Option<&Record> {
        self.get(name).and_then(FieldValue::as_record)
    }

    /// Assign a field without validating; see [`Record::validate`]
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let index = self
            .schema
            .field_index(name)
            .ok_or_else(|| SchemaError::UnknownField {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
            })?;
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value.into();
        }
        Ok(())
    }

    /// Re-validate every field, aggregating failures like decode.
    ///
    /// A nested record of the declared schema runs the field's own validator
    /// chain, then validates itself so its failures surface at its own depth.
    pub fn validate(&self) -> std::result::Result<(), Failure> {
        let mut failures = Vec::new();
        for (field, value) in self.schema.fields().iter().zip(&self.values) {
            let result = match (value, field.ty().kind()) {
                (FieldValue::Record(nested), TypeKind::Record(expected))
                    if Arc::ptr_eq(nested.schema(), expected) =>
                {
                    field
                        .ty()
                        .check_validators(&nested.to_value())
                        .map_err(Failure::from)
                        .and_then(|()| nested.validate())
                }
                (FieldValue::Record(nested), _) => field.ty().validate(&nested.to_value()),
                (FieldValue::Value(value), _) => field.ty().validate(value),
            };
            if let Err(failure) = result {
                failures.push((field.name().to_string(), failure));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Failure::Fields(failures))
        }
    }

    /// Encode in compiled field order
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (field, value) in self.schema.fields().iter().zip(&self.values) {
            map.insert(field.name().to_string(), value.to_value());
        }
        Value::Object(map)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.values == other.values
    }
}

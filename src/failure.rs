//! Validation failures
//!
//! A [`LeafFailure`] is a single validator violation. A [`Failure`] is the tree
//! that records, lists and unions build out of leaves, mirroring the shape of
//! the value that was validated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Value was null where a value is required
pub const CODE_NULL: u32 = 1;
/// Value kind is not one of the accepted kinds
pub const CODE_UNEXPECTED_TYPE: u32 = 2;
/// Numeric upper bound exceeded
pub const CODE_MAX: u32 = 3;
/// Numeric lower bound not reached
pub const CODE_MIN: u32 = 4;
/// Length upper bound exceeded
pub const CODE_MAX_LENGTH: u32 = 5;
/// Length lower bound not reached
pub const CODE_MIN_LENGTH: u32 = 6;

/// A single validator violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafFailure {
    pub code: u32,
    pub message: String,
}

impl LeafFailure {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn null() -> Self {
        Self::new(CODE_NULL, "None type not permitted")
    }

    pub fn unexpected_type() -> Self {
        Self::new(CODE_UNEXPECTED_TYPE, "unexpected type")
    }

    /// Render as `{"code": .., "message": ..}`
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("code".to_string(), Value::from(self.code));
        map.insert("message".to_string(), Value::from(self.message.clone()));
        Value::Object(map)
    }
}

impl fmt::Display for LeafFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Failure of one list element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementFailure {
    pub index: usize,
    pub failure: Failure,
}

/// Validation failure tree
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    #[error("{0}")]
    Leaf(LeafFailure),

    /// Record fields (or mapping entries) that failed, in declaration order
    #[error("invalid fields: {}", field_names(.0))]
    Fields(Vec<(String, Failure)>),

    /// Every failing list element
    #[error("{} invalid element(s) at {}", .0.len(), element_indices(.0))]
    Elements(Vec<ElementFailure>),

    /// One failure per union member, in member order
    #[error("no union member accepted the value ({} tried)", .0.len())]
    Members(Vec<Failure>),
}

fn field_names(fields: &[(String, Failure)]) -> String {
    fields
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn element_indices(elements: &[ElementFailure]) -> String {
    elements
        .iter()
        .map(|e| e.index.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Failure {
    /// Leaf code, if this is a leaf
    pub fn code(&self) -> Option<u32> {
        match self {
            Failure::Leaf(leaf) => Some(leaf.code),
            _ => None,
        }
    }

    pub fn leaf(&self) -> Option<&LeafFailure> {
        match self {
            Failure::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Failure recorded for a field
    pub fn field(&self, name: &str) -> Option<&Failure> {
        match self {
            Failure::Fields(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, failure)| failure),
            _ => None,
        }
    }

    /// Names of the failed fields
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            Failure::Fields(fields) => fields.iter().map(|(name, _)| name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Failure recorded for a list element
    pub fn element(&self, index: usize) -> Option<&Failure> {
        match self {
            Failure::Elements(elements) => elements
                .iter()
                .find(|e| e.index == index)
                .map(|e| &e.failure),
            _ => None,
        }
    }

    /// Render as a value tree.
    ///
    /// List element failures carry an `"index"` key merged into the element's
    /// own failure object. Element failures that are not objects (nested lists,
    /// unions) are wrapped as `{"index": i, "errors": [...]}`.
    pub fn to_value(&self) -> Value {
        match self {
            Failure::Leaf(leaf) => leaf.to_value(),
            Failure::Fields(fields) => {
                let mut map = Map::new();
                for (name, failure) in fields {
                    map.insert(name.clone(), failure.to_value());
                }
                Value::Object(map)
            }
            Failure::Elements(elements) => Value::Array(
                elements
                    .iter()
                    .map(|e| match e.failure.to_value() {
                        Value::Object(mut map) => {
                            map.insert("index".to_string(), Value::from(e.index));
                            Value::Object(map)
                        }
                        other => {
                            let mut map = Map::new();
                            map.insert("index".to_string(), Value::from(e.index));
                            map.insert("errors".to_string(), other);
                            Value::Object(map)
                        }
                    })
                    .collect(),
            ),
            Failure::Members(members) => {
                Value::Array(members.iter().map(Failure::to_value).collect())
            }
        }
    }
}

impl From<LeafFailure> for Failure {
    fn from(leaf: LeafFailure) -> Self {
        Failure::Leaf(leaf)
    }
}

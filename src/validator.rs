//! Atomic validators
//!
//! A validator checks one value and either passes or produces a
//! [`LeafFailure`]. Validators are pure and total: a value of the wrong shape
//! for a comparator is reported as an unexpected type, never a panic.

use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::failure::{
    LeafFailure, CODE_MAX, CODE_MAX_LENGTH, CODE_MIN, CODE_MIN_LENGTH, CODE_NULL,
    CODE_UNEXPECTED_TYPE,
};
use crate::value::ValueKind;

/// Signature of a caller-supplied check
pub type CheckFn = dyn Fn(&Value) -> Result<(), LeafFailure> + Send + Sync;

/// Named caller-supplied validator
#[derive(Clone)]
pub struct CustomValidator {
    name: Arc<str>,
    check: Arc<CheckFn>,
}

impl CustomValidator {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Numeric bound for `Max`/`Min`.
///
/// Integer bounds compare exactly against integer values; floats on either
/// side fall back to `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    Int(i128),
    Float(f64),
}

impl Limit {
    /// Ordering of `value` relative to this bound; `None` for NaN
    fn compare(&self, value: &Number) -> Option<Ordering> {
        let exact = value
            .as_i64()
            .map(i128::from)
            .or_else(|| value.as_u64().map(i128::from));
        match (exact, self) {
            (Some(v), Limit::Int(limit)) => Some(v.cmp(limit)),
            _ => value.as_f64()?.partial_cmp(&self.as_f64()),
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            Limit::Int(n) => *n as f64,
            Limit::Float(f) => *f,
        }
    }
}

macro_rules! limit_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Limit {
            fn from(n: $ty) -> Self {
                Limit::Int(i128::from(n))
            }
        })*
    };
}

limit_from_int!(i32, i64, u32, u64);

impl From<usize> for Limit {
    fn from(n: usize) -> Self {
        Limit::Int(n as i128)
    }
}

impl From<f64> for Limit {
    fn from(f: f64) -> Self {
        Limit::Float(f)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Int(n) => write!(f, "{}", n),
            Limit::Float(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Validator {
    /// Rejects null
    NotNull,
    /// Rejects values whose exact kind is not listed
    TypeMembership(Vec<ValueKind>),
    Max { limit: Limit, inclusive: bool },
    Min { limit: Limit, inclusive: bool },
    MaxLength { limit: usize, inclusive: bool },
    MinLength { limit: usize, inclusive: bool },
    Custom(CustomValidator),
}

impl Validator {
    pub fn kinds(kinds: impl IntoIterator<Item = ValueKind>) -> Self {
        Validator::TypeMembership(kinds.into_iter().collect())
    }

    pub fn max(limit: impl Into<Limit>, inclusive: bool) -> Self {
        Validator::Max {
            limit: limit.into(),
            inclusive,
        }
    }

    pub fn min(limit: impl Into<Limit>, inclusive: bool) -> Self {
        Validator::Min {
            limit: limit.into(),
            inclusive,
        }
    }

    pub fn max_length(limit: usize, inclusive: bool) -> Self {
        Validator::MaxLength { limit, inclusive }
    }

    pub fn min_length(limit: usize, inclusive: bool) -> Self {
        Validator::MinLength { limit, inclusive }
    }

    pub fn custom<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), LeafFailure> + Send + Sync + 'static,
    {
        let name: String = name.into();
        Validator::Custom(CustomValidator {
            name: Arc::from(name),
            check: Arc::new(check),
        })
    }

    /// Failure code this validator reports (0 for custom validators, whose
    /// code is chosen by the check itself)
    pub fn code(&self) -> u32 {
        match self {
            Validator::NotNull => CODE_NULL,
            Validator::TypeMembership(_) => CODE_UNEXPECTED_TYPE,
            Validator::Max { .. } => CODE_MAX,
            Validator::Min { .. } => CODE_MIN,
            Validator::MaxLength { .. } => CODE_MAX_LENGTH,
            Validator::MinLength { .. } => CODE_MIN_LENGTH,
            Validator::Custom(_) => 0,
        }
    }

    pub fn check(&self, value: &Value) -> Result<(), LeafFailure> {
        match self {
            Validator::NotNull => {
                if value.is_null() {
                    return Err(LeafFailure::null());
                }
            }
            Validator::TypeMembership(kinds) => {
                if !kinds.contains(&ValueKind::of(value)) {
                    return Err(LeafFailure::unexpected_type());
                }
            }
            Validator::Max { limit, inclusive } => {
                let n = number_of(value).ok_or_else(LeafFailure::unexpected_type)?;
                let ok = match limit.compare(n) {
                    Some(Ordering::Less) => true,
                    Some(Ordering::Equal) => *inclusive,
                    Some(Ordering::Greater) | None => false,
                };
                if !ok {
                    let op = if *inclusive { "<=" } else { "<" };
                    return Err(LeafFailure::new(
                        CODE_MAX,
                        format!("value must be {} {}", op, limit),
                    ));
                }
            }
            Validator::Min { limit, inclusive } => {
                let n = number_of(value).ok_or_else(LeafFailure::unexpected_type)?;
                let ok = match limit.compare(n) {
                    Some(Ordering::Greater) => true,
                    Some(Ordering::Equal) => *inclusive,
                    Some(Ordering::Less) | None => false,
                };
                if !ok {
                    let op = if *inclusive { ">=" } else { ">" };
                    return Err(LeafFailure::new(
                        CODE_MIN,
                        format!("value must be {} {}", op, limit),
                    ));
                }
            }
            Validator::MaxLength { limit, inclusive } => {
                let len = length_of(value).ok_or_else(LeafFailure::unexpected_type)?;
                if len > *limit || (len == *limit && !inclusive) {
                    let op = if *inclusive { "<=" } else { "<" };
                    return Err(LeafFailure::new(
                        CODE_MAX_LENGTH,
                        format!("value must have length {} {}", op, limit),
                    ));
                }
            }
            Validator::MinLength { limit, inclusive } => {
                let len = length_of(value).ok_or_else(LeafFailure::unexpected_type)?;
                if len < *limit || (len == *limit && !inclusive) {
                    let op = if *inclusive { ">=" } else { ">" };
                    return Err(LeafFailure::new(
                        CODE_MIN_LENGTH,
                        format!("value must have length {} {}", op, limit),
                    ));
                }
            }
            Validator::Custom(custom) => (custom.check)(value)?,
        }
        Ok(())
    }
}

/// Identity is `(code, parameters)`; custom validators compare by instance.
impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Validator::NotNull, Validator::NotNull) => true,
            (Validator::TypeMembership(a), Validator::TypeMembership(b)) => a == b,
            (
                Validator::Max { limit: a, inclusive: ai },
                Validator::Max { limit: b, inclusive: bi },
            )
            | (
                Validator::Min { limit: a, inclusive: ai },
                Validator::Min { limit: b, inclusive: bi },
            ) => a == b && ai == bi,
            (
                Validator::MaxLength { limit: a, inclusive: ai },
                Validator::MaxLength { limit: b, inclusive: bi },
            )
            | (
                Validator::MinLength { limit: a, inclusive: ai },
                Validator::MinLength { limit: b, inclusive: bi },
            ) => a == b && ai == bi,
            (Validator::Custom(a), Validator::Custom(b)) => Arc::ptr_eq(&a.check, &b.check),
            _ => false,
        }
    }
}

fn number_of(value: &Value) -> Option<&Number> {
    match value {
        Value::Number(n) => Some(n),
        _ => None,
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

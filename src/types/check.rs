//! Validation of values against descriptors
//!
//! The validator chain runs first and fails fast; an optional accepts null
//! without consulting it. Composite kinds then validate their elements:
//! - lists collect every failing element
//! - mappings stop at the first invalid key or value, unless configured to collect
//! - optionals accept null and otherwise delegate
//! - unions accept the first member that validates, in member order

use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

use super::{any, TypeDescriptor, TypeKind, TypeRef};
use crate::config::MappingFailures;
use crate::failure::{ElementFailure, Failure, LeafFailure};

impl TypeDescriptor {
    /// Run the validator chain only
    pub fn check_validators(&self, value: &Value) -> Result<(), LeafFailure> {
        for validator in self.all_validators() {
            validator.check(value)?;
        }
        Ok(())
    }

    /// Validate a value against this type
    pub fn validate(&self, value: &Value) -> Result<(), Failure> {
        if value.is_null() && matches!(self.kind, TypeKind::Optional(_)) {
            return Ok(());
        }
        self.check_validators(value)?;

        match &self.kind {
            TypeKind::Any | TypeKind::Null | TypeKind::Primitive | TypeKind::Var(_) => Ok(()),
            TypeKind::List(elem) => validate_list(elem.as_ref(), value),
            TypeKind::Mapping { entries, failures } => {
                validate_mapping(entries.as_ref(), *failures, value)
            }
            TypeKind::Optional(inner) => or_any(inner.as_ref()).validate(value),
            TypeKind::Union(members) => validate_union(members, value),
            TypeKind::Record(schema) => schema.decode(value).map(|_| ()),
        }
    }
}

fn or_any(ty: Option<&TypeRef>) -> TypeRef {
    ty.map(Arc::clone).unwrap_or_else(any)
}

fn validate_list(elem: Option<&TypeRef>, value: &Value) -> Result<(), Failure> {
    let Value::Array(items) = value else {
        return Err(LeafFailure::unexpected_type().into());
    };
    let elem = or_any(elem);

    let failures: Vec<ElementFailure> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            elem.validate(item)
                .err()
                .map(|failure| ElementFailure { index, failure })
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        trace!(failed = failures.len(), total = items.len(), "list elements rejected");
        Err(Failure::Elements(failures))
    }
}

fn validate_mapping(
    entries: Option<&(TypeRef, TypeRef)>,
    mode: MappingFailures,
    value: &Value,
) -> Result<(), Failure> {
    let Value::Object(map) = value else {
        return Err(LeafFailure::unexpected_type().into());
    };
    let (key_type, value_type) = match entries {
        Some((key, value)) => (Arc::clone(key), Arc::clone(value)),
        None => (any(), any()),
    };

    let mut failures = Vec::new();
    for (key, entry) in map {
        let result = key_type
            .validate(&Value::String(key.clone()))
            .and_then(|()| value_type.validate(entry));
        if let Err(failure) = result {
            match mode {
                MappingFailures::FailFast => return Err(failure),
                MappingFailures::Collect => failures.push((key.clone(), failure)),
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Failure::Fields(failures))
    }
}

fn validate_union(members: &[TypeRef], value: &Value) -> Result<(), Failure> {
    let open;
    let members = if members.is_empty() {
        open = [any(), any()];
        &open[..]
    } else {
        members
    };

    let mut failures = Vec::with_capacity(members.len());
    for member in members {
        match member.validate(value) {
            Ok(()) => {
                trace!(member = %member, "union member accepted value");
                return Ok(());
            }
            Err(failure) => failures.push(failure),
        }
    }
    Err(Failure::Members(failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{CODE_NULL, CODE_UNEXPECTED_TYPE};
    use crate::validator::Validator;
    use crate::value::ValueKind;
    use serde_json::json;

    fn primitive(name: &str, kinds: &[ValueKind]) -> TypeRef {
        Arc::new(TypeDescriptor::new(
            name,
            name.to_lowercase(),
            vec![Validator::NotNull, Validator::kinds(kinds.iter().copied())],
            TypeKind::Primitive,
        ))
    }

    fn list_of(elem: Option<TypeRef>) -> TypeDescriptor {
        TypeDescriptor::new(
            "List",
            "list",
            vec![Validator::NotNull, Validator::kinds([ValueKind::Array])],
            TypeKind::List(elem),
        )
    }

    fn mapping_of(key: TypeRef, value: TypeRef, failures: MappingFailures) -> TypeDescriptor {
        TypeDescriptor::new(
            "Mapping",
            "mapping",
            vec![Validator::NotNull, Validator::kinds([ValueKind::Object])],
            TypeKind::Mapping {
                entries: Some((key, value)),
                failures,
            },
        )
    }

    #[test]
    fn test_list_collects_every_element_failure() {
        let list = list_of(Some(primitive("Integer", &[ValueKind::Integer])));
        let failure = list.validate(&json!([1, "x", 3, "y"])).unwrap_err();
        match &failure {
            Failure::Elements(elements) => {
                let indices: Vec<usize> = elements.iter().map(|e| e.index).collect();
                assert_eq!(indices, vec![1, 3]);
            }
            other => panic!("Expected Elements, got {:?}", other),
        }
        assert_eq!(failure.element(1).and_then(Failure::code), Some(CODE_UNEXPECTED_TYPE));
    }

    #[test]
    fn test_list_shape_checked_before_elements() {
        let list = list_of(Some(primitive("Integer", &[ValueKind::Integer])));
        assert_eq!(list.validate(&json!(null)).unwrap_err().code(), Some(CODE_NULL));
        assert_eq!(list.validate(&json!({})).unwrap_err().code(), Some(CODE_UNEXPECTED_TYPE));
    }

    #[test]
    fn test_bare_list_rejects_null_elements() {
        let list = list_of(None);
        assert!(list.validate(&json!([1, "a", true])).is_ok());
        assert!(list.validate(&json!([null])).is_err());
    }

    #[test]
    fn test_mapping_fails_fast() {
        let mapping = mapping_of(
            primitive("String", &[ValueKind::String]),
            primitive("Integer", &[ValueKind::Integer]),
            MappingFailures::FailFast,
        );
        assert!(mapping.validate(&json!({"a": 1, "b": 2})).is_ok());
        let failure = mapping.validate(&json!({"a": "x", "b": "y"})).unwrap_err();
        assert_eq!(failure.code(), Some(CODE_UNEXPECTED_TYPE));
    }

    #[test]
    fn test_mapping_collect_mode() {
        let mapping = mapping_of(
            primitive("String", &[ValueKind::String]),
            primitive("Integer", &[ValueKind::Integer]),
            MappingFailures::Collect,
        );
        let failure = mapping.validate(&json!({"a": "x", "b": 2, "c": null})).unwrap_err();
        assert_eq!(failure.field_names(), vec!["a", "c"]);
        assert_eq!(failure.field("c").and_then(Failure::code), Some(CODE_NULL));
    }

    #[test]
    fn test_optional_accepts_null() {
        let optional = TypeDescriptor::new(
            "Optional",
            "optional",
            vec![],
            TypeKind::Optional(Some(primitive("Integer", &[ValueKind::Integer]))),
        );
        assert!(optional.validate(&json!(null)).is_ok());
        assert!(optional.validate(&json!(1)).is_ok());
        assert!(optional.validate(&json!(1.0)).is_err());
    }

    #[test]
    fn test_optional_with_extra_validators_accepts_null() {
        let optional = TypeDescriptor::new(
            "Optional",
            "optional",
            vec![],
            TypeKind::Optional(Some(primitive("String", &[ValueKind::String]))),
        );
        let short = TypeDescriptor::derive("short_opt", &optional, vec![Validator::max_length(3, true)]);
        assert!(short.validate(&json!(null)).is_ok());
        assert!(short.validate(&json!("abc")).is_ok());
        assert_eq!(short.validate(&json!("abcd")).unwrap_err().code(), Some(5));
        assert!(short.validate(&json!(4)).is_err());
    }

    #[test]
    fn test_union_reports_every_member() {
        let union = TypeDescriptor::new(
            "Union",
            "union",
            vec![],
            TypeKind::Union(vec![
                primitive("Integer", &[ValueKind::Integer]),
                primitive("String", &[ValueKind::String]),
            ]),
        );
        assert!(union.validate(&json!(1)).is_ok());
        assert!(union.validate(&json!("test")).is_ok());
        match union.validate(&json!(true)).unwrap_err() {
            Failure::Members(members) => assert_eq!(members.len(), 2),
            other => panic!("Expected Members, got {:?}", other),
        }
    }

    #[test]
    fn test_open_union_rejects_only_null() {
        let union = TypeDescriptor::new("Union", "union", vec![], TypeKind::Union(Vec::new()));
        assert!(union.validate(&json!(1)).is_ok());
        assert!(union.validate(&json!("test")).is_ok());
        assert!(union.validate(&json!(null)).is_err());
    }
}

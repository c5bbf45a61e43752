//! Generic Binding Resolver
//!
//! Turns generic descriptors plus concrete arguments into bound descriptors,
//! and threads parameter bindings through schema inheritance.
//!
//! Resolution never fails on unbound variables: a variable with no binding
//! stays a variable and validates as `any`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, SchemaError};
use crate::registry::TypeRegistry;
use crate::schema::CompiledSchema;
use crate::types::{TypeDescriptor, TypeKind, TypeRef, TypeVar};

/// Binding from type variable to concrete descriptor
pub type GenericParams = HashMap<TypeVar, TypeRef>;

/// Anything usable where a type is expected
#[derive(Debug, Clone)]
pub enum TypeArg {
    /// Registry key, resolved through the registry
    Native(String),
    Type(TypeRef),
    /// Schema-typed position; decodes into a nested record
    Schema(Arc<CompiledSchema>),
    Var(TypeVar),
}

impl From<&str> for TypeArg {
    fn from(key: &str) -> Self {
        TypeArg::Native(key.to_string())
    }
}

impl From<String> for TypeArg {
    fn from(key: String) -> Self {
        TypeArg::Native(key)
    }
}

impl From<TypeRef> for TypeArg {
    fn from(ty: TypeRef) -> Self {
        TypeArg::Type(ty)
    }
}

impl From<&TypeRef> for TypeArg {
    fn from(ty: &TypeRef) -> Self {
        TypeArg::Type(Arc::clone(ty))
    }
}

impl From<Arc<CompiledSchema>> for TypeArg {
    fn from(schema: Arc<CompiledSchema>) -> Self {
        TypeArg::Schema(schema)
    }
}

impl From<&Arc<CompiledSchema>> for TypeArg {
    fn from(schema: &Arc<CompiledSchema>) -> Self {
        TypeArg::Schema(Arc::clone(schema))
    }
}

impl From<TypeVar> for TypeArg {
    fn from(var: TypeVar) -> Self {
        TypeArg::Var(var)
    }
}

impl From<&TypeVar> for TypeArg {
    fn from(var: &TypeVar) -> Self {
        TypeArg::Var(var.clone())
    }
}

/// Resolver bound to a registry
pub struct GenericResolver<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> GenericResolver<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Resolve one argument to a descriptor
    pub fn resolve_arg(&self, arg: &TypeArg) -> TypeRef {
        match arg {
            TypeArg::Native(key) => self.registry.resolve(key),
            TypeArg::Type(ty) => Arc::clone(ty),
            TypeArg::Schema(schema) => TypeDescriptor::record(schema),
            TypeArg::Var(var) => TypeDescriptor::var(var),
        }
    }

    pub fn resolve_args(&self, args: &[TypeArg]) -> Vec<TypeRef> {
        args.iter().map(|arg| self.resolve_arg(arg)).collect()
    }

    /// Apply arguments to an unparameterized generic template
    pub fn parameterize(&self, generic: &TypeRef, args: &[TypeArg]) -> Result<TypeRef> {
        let Some(arity) = generic.arity() else {
            return Err(SchemaError::NotGeneric(generic.to_string()));
        };
        let is_union = matches!(generic.kind(), TypeKind::Union(_));
        let arity_ok = if is_union {
            args.len() >= arity
        } else {
            args.len() == arity
        };
        if !arity_ok {
            return Err(SchemaError::ArityMismatch {
                name: generic.name().to_string(),
                expected: if is_union {
                    format!("at least {}", arity)
                } else {
                    arity.to_string()
                },
                actual: args.len(),
            });
        }

        let args = self.resolve_args(args);
        Ok(self.instantiate(generic, args, generic.extra_validators().to_vec()))
    }

    /// Build a new descriptor from `generic` with positional `args`.
    ///
    /// Callers guarantee the argument count matches the kind. A union holding
    /// the null type is normalized to an optional here.
    fn instantiate(
        &self,
        generic: &TypeDescriptor,
        mut args: Vec<TypeRef>,
        extra: Vec<crate::validator::Validator>,
    ) -> TypeRef {
        let kind = match generic.kind() {
            TypeKind::List(_) => TypeKind::List(args.pop()),
            TypeKind::Optional(_) => TypeKind::Optional(args.pop()),
            TypeKind::Mapping { failures, .. } => {
                let value = args.pop();
                let key = args.pop();
                TypeKind::Mapping {
                    entries: key.zip(value),
                    failures: *failures,
                }
            }
            TypeKind::Union(_) => {
                if args.iter().any(|arg| arg.is_null()) {
                    return self.collapse_to_optional(args, extra);
                }
                TypeKind::Union(args)
            }
            other => other.clone(),
        };
        Arc::new(generic.rebuilt(kind, extra))
    }

    /// `Union<A, None>` becomes `Optional<A>`; with several non-null members
    /// it becomes `Optional<Union<...>>`. Caller-attached validators move to
    /// the optional.
    fn collapse_to_optional(
        &self,
        members: Vec<TypeRef>,
        extra: Vec<crate::validator::Validator>,
    ) -> TypeRef {
        let mut rest: Vec<TypeRef> = members.into_iter().filter(|m| !m.is_null()).collect();
        let inner = match rest.len() {
            0 => None,
            1 => rest.pop(),
            _ => {
                let union = self.registry.resolve("union");
                Some(Arc::new(
                    union.rebuilt(TypeKind::Union(rest), union.extra_validators().to_vec()),
                ))
            }
        };
        let optional = self.registry.resolve("optional");
        let extra = if extra.is_empty() {
            optional.extra_validators().to_vec()
        } else {
            extra
        };
        trace!(validators = extra.len(), "union with null member normalized to optional");
        Arc::new(optional.rebuilt(TypeKind::Optional(inner), extra))
    }

    /// Bind declared parameters to resolved arguments, position by position
    pub fn bind(&self, params: &[TypeVar], args: &[TypeArg]) -> GenericParams {
        params
            .iter()
            .cloned()
            .zip(self.resolve_args(args))
            .collect()
    }

    /// Union of `own` over `inherited`; `own` wins on collisions
    pub fn inherit(inherited: &GenericParams, own: &GenericParams) -> GenericParams {
        let mut merged = inherited.clone();
        merged.extend(own.iter().map(|(var, ty)| (var.clone(), Arc::clone(ty))));
        merged
    }

    /// Replace bound variables in `ty`.
    ///
    /// A bare variable becomes its binding, or stays as is when unbound. A
    /// composite is rebuilt only when at least one argument changed; otherwise
    /// the same instance is returned.
    pub fn substitute(&self, ty: &TypeRef, params: &GenericParams) -> TypeRef {
        if let TypeKind::Var(var) = ty.kind() {
            return match params.get(var) {
                Some(bound) => {
                    trace!(var = %var, bound = %bound, "type variable bound");
                    Arc::clone(bound)
                }
                None => Arc::clone(ty),
            };
        }

        let args = ty.type_args();
        if args.is_empty() {
            return Arc::clone(ty);
        }
        let substituted: Vec<TypeRef> = args.iter().map(|arg| self.substitute(arg, params)).collect();
        let changed = args
            .iter()
            .zip(&substituted)
            .any(|(before, after)| !Arc::ptr_eq(before, after));
        if !changed {
            return Arc::clone(ty);
        }

        // Validators attached to the declared composite survive
        // re-parameterization; otherwise the template's defaults apply.
        let extra = if ty.extra_validators().is_empty() {
            self.registry
                .lookup(ty.key())
                .map(|template| template.extra_validators().to_vec())
                .unwrap_or_default()
        } else {
            ty.extra_validators().to_vec()
        };
        self.instantiate(ty, substituted, extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parameterize_list() {
        let registry = TypeRegistry::with_builtins();
        let list = registry.list_of("integer").unwrap();
        assert_eq!(list.to_string(), "[<Integer>]");
        assert!(list.validate(&json!([1, 2])).is_ok());
        assert!(list.validate(&json!(["test"])).is_err());

        // The template is untouched
        assert_eq!(registry.resolve("list").to_string(), "[<Any>]");
    }

    #[test]
    fn test_parameterize_mapping() {
        let registry = TypeRegistry::with_builtins();
        let mapping = registry.mapping_of("string", "integer").unwrap();
        assert_eq!(mapping.to_string(), "{<String>: <Integer>}");
        assert!(mapping.validate(&json!({})).is_ok());
        assert!(mapping.validate(&json!({"test": 1})).is_ok());
        assert!(mapping.validate(&json!({"test": 1.0})).is_err());
        assert!(mapping.validate(&json!([])).is_err());
    }

    #[test]
    fn test_arity_mismatch() {
        let registry = TypeRegistry::with_builtins();
        let err = registry.parameterize("list", &["integer".into(), "string".into()]).unwrap_err();
        assert!(matches!(err, SchemaError::ArityMismatch { actual: 2, .. }));
        assert!(registry.union_of(["integer"]).is_err());
    }

    #[test]
    fn test_parameterize_non_generic() {
        let registry = TypeRegistry::with_builtins();
        let err = registry.parameterize("integer", &["string".into()]).unwrap_err();
        assert!(matches!(err, SchemaError::NotGeneric(_)));

        let list = registry.list_of("integer").unwrap();
        let resolver = GenericResolver::new(&registry);
        assert!(resolver.parameterize(&list, &["string".into()]).is_err());
    }

    #[test]
    fn test_union_with_null_collapses_to_optional() {
        let registry = TypeRegistry::with_builtins();
        let union = registry.union_of(["integer", "null"]).unwrap();
        let optional = registry.optional_of("integer").unwrap();

        assert!(matches!(union.kind(), TypeKind::Optional(Some(_))));
        assert_eq!(union.to_string(), optional.to_string());
        assert_eq!(union.to_string(), "Optional<<Integer>>");
        for case in [json!(1), json!(null), json!(1.0), json!("1"), json!(true), json!([]), json!({})] {
            assert_eq!(union.validate(&case).is_ok(), optional.validate(&case).is_ok());
        }
    }

    #[test]
    fn test_wide_union_with_null() {
        let registry = TypeRegistry::with_builtins();
        let union = registry.union_of(["integer", "string", "null"]).unwrap();
        assert_eq!(union.to_string(), "Optional<Union<<Integer>, <String>>>");
        assert!(union.validate(&json!(null)).is_ok());
        assert!(union.validate(&json!("a")).is_ok());
        assert!(union.validate(&json!(true)).is_err());
    }

    #[test]
    fn test_collapsed_union_keeps_attached_validators() {
        let mut registry = TypeRegistry::with_builtins();
        let small = registry
            .derive_type("small", "union", vec![crate::validator::Validator::max(5, true)])
            .unwrap();

        let resolver = GenericResolver::new(&registry);
        let collapsed = resolver
            .parameterize(&small, &["integer".into(), "null".into()])
            .unwrap();
        assert!(matches!(collapsed.kind(), TypeKind::Optional(Some(_))));
        assert_eq!(collapsed.extra_validators(), small.extra_validators());
        assert!(collapsed.validate(&json!(null)).is_ok());
        assert!(collapsed.validate(&json!(5)).is_ok());
        assert_eq!(collapsed.validate(&json!(7)).unwrap_err().code(), Some(3));
    }

    #[test]
    fn test_substitute_var_and_composite() {
        let registry = TypeRegistry::with_builtins();
        let resolver = GenericResolver::new(&registry);
        let t = TypeVar::new("T");
        let list_t = registry.list_of(&t).unwrap();
        assert_eq!(list_t.to_string(), "[~T]");

        let params = resolver.bind(&[t.clone()], &["integer".into()]);
        let bound = resolver.substitute(&list_t, &params);
        assert_eq!(bound.to_string(), "[<Integer>]");
        assert!(bound.validate(&json!(["x"])).is_err());

        let var = TypeDescriptor::var(&t);
        assert!(Arc::ptr_eq(&resolver.substitute(&var, &params), &registry.resolve("integer")));
    }

    #[test]
    fn test_substitute_unchanged_is_shared() {
        let registry = TypeRegistry::with_builtins();
        let resolver = GenericResolver::new(&registry);
        let t = TypeVar::new("T");
        let u = TypeVar::new("U");
        let list_u = registry.list_of(&u).unwrap();
        let params = resolver.bind(&[t], &["integer".into()]);

        assert!(Arc::ptr_eq(&resolver.substitute(&list_u, &params), &list_u));
        let integer = registry.resolve("integer");
        assert!(Arc::ptr_eq(&resolver.substitute(&integer, &params), &integer));
    }

    #[test]
    fn test_substitute_nested() {
        let registry = TypeRegistry::with_builtins();
        let resolver = GenericResolver::new(&registry);
        let t = TypeVar::new("T");
        let nested = registry.list_of(registry.optional_of(&t).unwrap()).unwrap();
        let params = resolver.bind(&[t], &["string".into()]);
        assert_eq!(resolver.substitute(&nested, &params).to_string(), "[Optional<<String>>]");
    }

    #[test]
    fn test_substitute_keeps_custom_validators() {
        let mut registry = TypeRegistry::with_builtins();
        let t = TypeVar::new("T");
        let list_t = registry.list_of(&t).unwrap();
        let short = registry
            .derive_type("short", &list_t, vec![crate::validator::Validator::max_length(1, true)])
            .unwrap();

        let resolver = GenericResolver::new(&registry);
        let params = resolver.bind(&[t], &["integer".into()]);
        let bound = resolver.substitute(&short, &params);
        assert_eq!(bound.to_string(), "<short>");
        assert!(bound.validate(&json!([1])).is_ok());
        assert!(bound.validate(&json!([1, 2])).is_err());
        assert!(bound.validate(&json!(["a"])).is_err());
    }

    #[test]
    fn test_inherit_prefers_own_bindings() {
        let registry = TypeRegistry::with_builtins();
        let resolver = GenericResolver::new(&registry);
        let t = TypeVar::new("T");
        let u = TypeVar::new("U");
        let parent = resolver.bind(&[t.clone(), u.clone()], &["integer".into(), "string".into()]);
        let own = resolver.bind(&[t.clone()], &["double".into()]);

        let merged = GenericResolver::inherit(&parent, &own);
        assert_eq!(merged[&t].to_string(), "<Double>");
        assert_eq!(merged[&u].to_string(), "<String>");
    }
}

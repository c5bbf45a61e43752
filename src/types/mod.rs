//! Type descriptors
//!
//! A [`TypeDescriptor`] is an immutable, possibly generic description of a
//! validated type: a name, an ordered validator chain and a [`TypeKind`].
//! Descriptors are shared as [`TypeRef`]s; parameterizing a generic template
//! always produces a new descriptor and never touches the template.
//!
//! ## Display
//!
//! ```text
//! <Integer>            primitive
//! [<Integer>]          list
//! {<String>: <Double>} mapping
//! Optional<<Integer>>  optional
//! Union<<A>, <B>>      union
//! <test_type>          derived type
//! <Car>                record
//! ~T                   unbound type variable
//! ```
//! Unparameterized containers show `<Any>` in each element position.

mod check;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::config::MappingFailures;
use crate::schema::CompiledSchema;
use crate::validator::Validator;

/// Shared handle to an immutable descriptor
pub type TypeRef = Arc<TypeDescriptor>;

static NEXT_TYPE_VAR: AtomicU64 = AtomicU64::new(1);

/// A type variable. Identity is per instance: two variables both named `T`
/// are different variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeVar {
    id: u64,
    name: Arc<str>,
}

impl TypeVar {
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            id: NEXT_TYPE_VAR.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "~{}", self.name)
    }
}

/// Structural variant of a descriptor
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Any non-null value
    Any,
    /// The null type; only meaningful as a union member
    Null,
    /// Scalar checked entirely by its validator chain
    Primitive,
    /// `None` until parameterized
    List(Option<TypeRef>),
    Mapping {
        entries: Option<(TypeRef, TypeRef)>,
        failures: MappingFailures,
    },
    Optional(Option<TypeRef>),
    /// Empty until parameterized; never holds the null type
    Union(Vec<TypeRef>),
    Record(Arc<CompiledSchema>),
    Var(TypeVar),
}

#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: String,
    /// Registry key of the template this descriptor was built from
    key: String,
    derived: bool,
    base_validators: Vec<Validator>,
    extra_validators: Vec<Validator>,
    kind: TypeKind,
}

impl TypeDescriptor {
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        base_validators: Vec<Validator>,
        kind: TypeKind,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            derived: false,
            base_validators,
            extra_validators: Vec::new(),
            kind,
        }
    }

    /// Descriptor for an unbound type variable, validated as `any`
    pub fn var(var: &TypeVar) -> TypeRef {
        Arc::new(Self::new(
            var.name(),
            "any",
            vec![Validator::NotNull],
            TypeKind::Var(var.clone()),
        ))
    }

    /// Record descriptor for a compiled schema
    pub fn record(schema: &Arc<CompiledSchema>) -> TypeRef {
        Arc::new(Self::new(
            schema.name(),
            schema.name(),
            Vec::new(),
            TypeKind::Record(Arc::clone(schema)),
        ))
    }

    /// Copy of `base` under a new name with extra validators appended after
    /// the base's own extras
    pub fn derive(name: impl Into<String>, base: &TypeDescriptor, extra: Vec<Validator>) -> Self {
        let name: String = name.into();
        let mut extra_validators = base.extra_validators.clone();
        extra_validators.extend(extra);
        Self {
            key: name.clone(),
            name,
            derived: true,
            base_validators: base.base_validators.clone(),
            extra_validators,
            kind: base.kind.clone(),
        }
    }

    /// Same descriptor with a different kind and extra validators
    pub(crate) fn rebuilt(&self, kind: TypeKind, extra_validators: Vec<Validator>) -> Self {
        Self {
            name: self.name.clone(),
            key: self.key.clone(),
            derived: self.derived,
            base_validators: self.base_validators.clone(),
            extra_validators,
            kind,
        }
    }

    pub fn with_extra_validators(mut self, extra: Vec<Validator>) -> Self {
        self.extra_validators = extra;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_derived(&self) -> bool {
        self.derived
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn base_validators(&self) -> &[Validator] {
        &self.base_validators
    }

    pub fn extra_validators(&self) -> &[Validator] {
        &self.extra_validators
    }

    /// Base validators followed by extras
    pub fn all_validators(&self) -> impl Iterator<Item = &Validator> {
        self.base_validators.iter().chain(self.extra_validators.iter())
    }

    /// Type arguments in positional order; empty for non-generic or
    /// unparameterized descriptors
    pub fn type_args(&self) -> Vec<TypeRef> {
        match &self.kind {
            TypeKind::List(Some(elem)) => vec![Arc::clone(elem)],
            TypeKind::Mapping {
                entries: Some((key, value)),
                ..
            } => vec![Arc::clone(key), Arc::clone(value)],
            TypeKind::Optional(Some(inner)) => vec![Arc::clone(inner)],
            TypeKind::Union(members) => members.clone(),
            _ => Vec::new(),
        }
    }

    /// Number of type parameters an unparameterized template accepts
    /// (`None` for non-generic descriptors, `Some(2)` meaning "two or more"
    /// for unions)
    pub fn arity(&self) -> Option<usize> {
        match &self.kind {
            TypeKind::List(None) | TypeKind::Optional(None) => Some(1),
            TypeKind::Mapping { entries: None, .. } => Some(2),
            TypeKind::Union(members) if members.is_empty() => Some(2),
            _ => None,
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, TypeKind::Var(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, TypeKind::Null)
    }

    /// True if a type variable appears anywhere in this descriptor
    pub fn has_vars(&self) -> bool {
        self.is_var() || self.type_args().iter().any(|arg| arg.has_vars())
    }
}

/// The shared `any` descriptor
pub fn any() -> TypeRef {
    static ANY: OnceLock<TypeRef> = OnceLock::new();
    Arc::clone(ANY.get_or_init(|| {
        Arc::new(TypeDescriptor::new(
            "Any",
            "any",
            vec![Validator::NotNull],
            TypeKind::Any,
        ))
    }))
}

struct OrAny<'a>(Option<&'a TypeRef>);

impl fmt::Display for OrAny<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ty) => write!(f, "{}", ty),
            None => f.write_str("<Any>"),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.derived {
            return write!(f, "<{}>", self.name);
        }
        match &self.kind {
            TypeKind::Any | TypeKind::Null | TypeKind::Primitive => write!(f, "<{}>", self.name),
            TypeKind::Var(var) => write!(f, "{}", var),
            TypeKind::Record(schema) => write!(f, "<{}>", schema.name()),
            TypeKind::List(elem) => write!(f, "[{}]", OrAny(elem.as_ref())),
            TypeKind::Mapping { entries, .. } => match entries {
                Some((key, value)) => write!(f, "{{{}: {}}}", key, value),
                None => f.write_str("{<Any>: <Any>}"),
            },
            TypeKind::Optional(inner) => write!(f, "Optional<{}>", OrAny(inner.as_ref())),
            TypeKind::Union(members) if members.is_empty() => f.write_str("Union<<Any>, <Any>>"),
            TypeKind::Union(members) => {
                let members: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "Union<{}>", members.join(", "))
            }
        }
    }
}

//! Type Registry
//!
//! Maps canonical native keys (`integer`, `string`, `list`, ...) to type
//! descriptors. The registry is populated during initialization, then frozen;
//! decode and encode traffic only ever reads it.
//!
//! Unknown keys resolve to the open `any` type rather than failing.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::{debug, warn};

use crate::config::{EngineConfig, MappingFailures};
use crate::error::{Result, SchemaError};
use crate::generics::{GenericResolver, TypeArg};
use crate::types::{self, TypeDescriptor, TypeKind, TypeRef};
use crate::validator::Validator;
use crate::value::ValueKind;

/// Registry of named type descriptors
#[derive(Debug)]
pub struct TypeRegistry {
    types: HashMap<String, TypeRef>,
    frozen: bool,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TypeRegistry {
    /// Empty registry with no builtins
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
            frozen: false,
        }
    }

    /// Registry holding the builtin primitives and generic templates
    pub fn with_builtins() -> Self {
        Self::with_mapping_failures(MappingFailures::default())
    }

    /// Registry built from engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut registry = Self::with_mapping_failures(config.validation.mapping_failures);
        if config.registry.freeze_on_build {
            registry.freeze();
        }
        registry
    }

    fn with_mapping_failures(failures: MappingFailures) -> Self {
        let mut types: HashMap<String, TypeRef> = HashMap::new();
        let not_null = || Validator::NotNull;

        types.insert("any".to_string(), types::any());
        for (key, name, kinds) in [
            ("integer", "Integer", vec![ValueKind::Integer]),
            ("string", "String", vec![ValueKind::String]),
            ("double", "Double", vec![ValueKind::Float, ValueKind::Integer]),
            ("boolean", "Boolean", vec![ValueKind::Boolean]),
        ] {
            types.insert(
                key.to_string(),
                Arc::new(TypeDescriptor::new(
                    name,
                    key,
                    vec![not_null(), Validator::TypeMembership(kinds)],
                    TypeKind::Primitive,
                )),
            );
        }
        types.insert(
            "null".to_string(),
            Arc::new(TypeDescriptor::new(
                "None",
                "null",
                vec![Validator::kinds([ValueKind::Null])],
                TypeKind::Null,
            )),
        );
        types.insert(
            "list".to_string(),
            Arc::new(TypeDescriptor::new(
                "List",
                "list",
                vec![not_null(), Validator::kinds([ValueKind::Array])],
                TypeKind::List(None),
            )),
        );
        types.insert(
            "mapping".to_string(),
            Arc::new(TypeDescriptor::new(
                "Mapping",
                "mapping",
                vec![not_null(), Validator::kinds([ValueKind::Object])],
                TypeKind::Mapping {
                    entries: None,
                    failures,
                },
            )),
        );
        types.insert(
            "optional".to_string(),
            Arc::new(TypeDescriptor::new(
                "Optional",
                "optional",
                Vec::new(),
                TypeKind::Optional(None),
            )),
        );
        types.insert(
            "union".to_string(),
            Arc::new(TypeDescriptor::new(
                "Union",
                "union",
                Vec::new(),
                TypeKind::Union(Vec::new()),
            )),
        );

        debug!(count = types.len(), ?failures, "type registry initialised with builtins");
        Self {
            types,
            frozen: false,
        }
    }

    /// Stop accepting registrations
    pub fn freeze(&mut self) {
        if !self.frozen {
            debug!(count = self.types.len(), "type registry frozen");
        }
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Register a descriptor under a key (last writer wins)
    pub fn register(&mut self, key: impl Into<String>, descriptor: TypeRef) -> Result<()> {
        let key = key.into();
        if self.frozen {
            warn!(key = %key, "registration attempted on frozen type registry");
            return Err(SchemaError::RegistryFrozen(key));
        }
        debug!(key = %key, descriptor = %descriptor, "registering type");
        self.types.insert(key, descriptor);
        Ok(())
    }

    /// Register a primitive accepting exactly the given value kinds
    pub fn register_primitive(&mut self, key: &str, kinds: &[ValueKind]) -> Result<TypeRef> {
        let descriptor = Arc::new(TypeDescriptor::new(
            display_name(key),
            key,
            vec![Validator::NotNull, Validator::kinds(kinds.iter().copied())],
            TypeKind::Primitive,
        ));
        self.register(key, Arc::clone(&descriptor))?;
        Ok(descriptor)
    }

    /// Build a validated subtype of `base` and register it under `name`.
    ///
    /// The new type keeps the base's chain and appends `extra`. `base` may be
    /// a native key or any already-built descriptor such as `[<Integer>]`.
    /// `name` must be a fresh key; use [`TypeRegistry::register`] to replace
    /// an existing entry deliberately.
    pub fn derive_type(
        &mut self,
        name: &str,
        base: impl Into<TypeArg>,
        extra: Vec<Validator>,
    ) -> Result<TypeRef> {
        if self.types.contains_key(name) {
            warn!(name, "derived type would shadow a registered type");
            return Err(SchemaError::DuplicateType(name.to_string()));
        }
        let base = GenericResolver::new(self).resolve_arg(&base.into());
        let descriptor = Arc::new(TypeDescriptor::derive(name, &base, extra));
        debug!(name, base = %base, "deriving validated type");
        self.register(name, Arc::clone(&descriptor))?;
        Ok(descriptor)
    }

    /// Look up a key without fallback
    pub fn lookup(&self, key: &str) -> Option<TypeRef> {
        self.types.get(key).cloned()
    }

    /// Look up a key, falling back to `any` when it is not registered
    pub fn resolve(&self, key: &str) -> TypeRef {
        match self.types.get(key) {
            Some(descriptor) => Arc::clone(descriptor),
            None => {
                warn!(key, "unregistered native type, falling back to any");
                types::any()
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.types.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Parameterize the template registered under `key`
    pub fn parameterize(&self, key: &str, args: &[TypeArg]) -> Result<TypeRef> {
        let template = self.resolve(key);
        GenericResolver::new(self).parameterize(&template, args)
    }

    /// `List<elem>`
    pub fn list_of(&self, elem: impl Into<TypeArg>) -> Result<TypeRef> {
        self.parameterize("list", &[elem.into()])
    }

    /// `Mapping<key, value>`
    pub fn mapping_of(&self, key: impl Into<TypeArg>, value: impl Into<TypeArg>) -> Result<TypeRef> {
        self.parameterize("mapping", &[key.into(), value.into()])
    }

    /// `Optional<inner>`
    pub fn optional_of(&self, inner: impl Into<TypeArg>) -> Result<TypeRef> {
        self.parameterize("optional", &[inner.into()])
    }

    /// `Union<members...>`; a null member collapses the union to an optional
    pub fn union_of<I, A>(&self, members: I) -> Result<TypeRef>
    where
        I: IntoIterator<Item = A>,
        A: Into<TypeArg>,
    {
        let members: Vec<TypeArg> = members.into_iter().map(Into::into).collect();
        self.parameterize("union", &members)
    }
}

/// `integer` -> `Integer`, `postal_code` -> `PostalCode`
fn display_name(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Process-wide registry, initialised with builtins on first use
pub fn global() -> &'static RwLock<TypeRegistry> {
    static GLOBAL: OnceLock<RwLock<TypeRegistry>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(TypeRegistry::with_builtins()))
}

/// Run `f` against the process-wide registry
pub fn with_global<T>(f: impl FnOnce(&TypeRegistry) -> T) -> Result<T> {
    let registry = global().read().map_err(|_| SchemaError::RegistryPoisoned)?;
    Ok(f(&registry))
}

/// Run `f` against the process-wide registry during initialization
pub fn with_global_mut<T>(f: impl FnOnce(&mut TypeRegistry) -> Result<T>) -> Result<T> {
    let mut registry = global().write().map_err(|_| SchemaError::RegistryPoisoned)?;
    f(&mut registry)
}

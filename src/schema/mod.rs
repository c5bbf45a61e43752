//! Schema Compiler
//!
//! A [`SchemaDeclaration`] names a record type, its parents, its own type
//! parameters and its fields. Compiling it against a [`TypeRegistry`] yields
//! a [`CompiledSchema`]: the inheritance-merged, generically-resolved field
//! table used by the codec in [`record`].
//!
//! ## Inheritance
//!
//! Parents are merged left to right. A field redeclared by a later parent or
//! by the schema itself replaces the earlier field at its original position;
//! new fields append in declaration order.
//!
//! ## Generics
//!
//! Bindings made on an ancestor (`Base[<Integer>]`) carry over to every
//! descendant. A schema that declares no type parameters inherits the ones its
//! parents left unbound; a schema that declares its own shadows any inherited
//! binding for the same variable, so its new fields stay open until the schema
//! itself is parameterized.

pub mod record;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::failure::Failure;
use crate::generics::{GenericParams, GenericResolver, TypeArg};
use crate::registry::TypeRegistry;
use crate::types::{TypeDescriptor, TypeRef, TypeVar};

pub use record::{FieldValue, Record};

/// One entry of a compiled field table
#[derive(Debug, Clone)]
pub struct FieldDecl {
    name: String,
    ty: TypeRef,
    default: Option<Value>,
}

impl FieldDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Value used when the field is missing from decoded input
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Builder for a record declaration
#[derive(Debug, Clone)]
pub struct SchemaDeclaration {
    name: String,
    parents: Vec<Arc<CompiledSchema>>,
    type_params: Vec<TypeVar>,
    fields: Vec<(String, TypeArg, Option<Value>)>,
}

impl SchemaDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            type_params: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Add a parent; call repeatedly for several parents, furthest first
    pub fn extends(mut self, parent: &Arc<CompiledSchema>) -> Self {
        self.parents.push(Arc::clone(parent));
        self
    }

    /// Declare a type parameter of this schema
    pub fn type_param(mut self, var: &TypeVar) -> Self {
        self.type_params.push(var.clone());
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: impl Into<TypeArg>) -> Self {
        self.fields.push((name.into(), ty.into(), None));
        self
    }

    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        ty: impl Into<TypeArg>,
        default: Value,
    ) -> Self {
        self.fields.push((name.into(), ty.into(), Some(default)));
        self
    }

    /// Merge parents, resolve field types and bind inherited parameters
    pub fn compile(self, registry: &TypeRegistry) -> Result<Arc<CompiledSchema>> {
        let resolver = GenericResolver::new(registry);

        let mut fields: Vec<FieldDecl> = Vec::new();
        let mut bindings = GenericParams::new();
        let mut inherited_params: Vec<TypeVar> = Vec::new();
        for parent in &self.parents {
            for field in &parent.fields {
                merge_field(&mut fields, field.clone());
            }
            bindings = GenericResolver::inherit(&bindings, &parent.bindings);
            for var in &parent.type_params {
                if !inherited_params.contains(var) {
                    inherited_params.push(var.clone());
                }
            }
        }

        let type_params = if self.type_params.is_empty() {
            inherited_params
        } else {
            for var in &self.type_params {
                bindings.remove(var);
            }
            self.type_params
        };

        for (name, arg, default) in self.fields {
            let declared = resolver.resolve_arg(&arg);
            let ty = resolver.substitute(&declared, &bindings);
            merge_field(&mut fields, FieldDecl { name, ty, default });
        }

        debug!(
            schema = %self.name,
            fields = fields.len(),
            params = type_params.len(),
            parents = self.parents.len(),
            "compiled schema"
        );
        Ok(Arc::new(CompiledSchema {
            name: self.name,
            fields,
            type_params,
            bindings,
        }))
    }
}

/// Replace a same-named field in place, or append
fn merge_field(fields: &mut Vec<FieldDecl>, field: FieldDecl) {
    match fields.iter_mut().find(|existing| existing.name == field.name) {
        Some(existing) => *existing = field,
        None => fields.push(field),
    }
}

/// Inheritance-merged field table of a record type
#[derive(Debug)]
pub struct CompiledSchema {
    name: String,
    fields: Vec<FieldDecl>,
    /// Parameters still open on this schema
    type_params: Vec<TypeVar>,
    bindings: GenericParams,
}

impl CompiledSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub(crate) fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn type_params(&self) -> &[TypeVar] {
        &self.type_params
    }

    pub fn bindings(&self) -> &GenericParams {
        &self.bindings
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// Descriptor that validates values by decoding them with this schema
    pub fn as_type(self: &Arc<Self>) -> TypeRef {
        TypeDescriptor::record(self)
    }

    /// Bind this schema's open parameters, producing `Name[A, B]`
    pub fn parameterize(self: &Arc<Self>, registry: &TypeRegistry, args: &[TypeArg]) -> Result<Arc<Self>> {
        if self.type_params.is_empty() {
            return Err(SchemaError::NotGeneric(self.name.clone()));
        }
        if args.len() != self.type_params.len() {
            return Err(SchemaError::ArityMismatch {
                name: self.name.clone(),
                expected: self.type_params.len().to_string(),
                actual: args.len(),
            });
        }

        let resolver = GenericResolver::new(registry);
        let resolved = resolver.resolve_args(args);
        let own: GenericParams = self.type_params.iter().cloned().zip(resolved.iter().cloned()).collect();
        let bindings = GenericResolver::inherit(&self.bindings, &own);

        let fields = self
            .fields
            .iter()
            .map(|field| FieldDecl {
                name: field.name.clone(),
                ty: resolver.substitute(&field.ty, &bindings),
                default: field.default.clone(),
            })
            .collect();

        let shown: Vec<String> = resolved.iter().map(ToString::to_string).collect();
        let name = format!("{}[{}]", self.name, shown.join(", "));
        debug!(schema = %self.name, parameterized = %name, "parameterized schema");

        Ok(Arc::new(Self {
            name,
            fields,
            type_params: Vec::new(),
            bindings,
        }))
    }

    /// Decode a value tree into a record, reporting every failing field
    pub fn decode(self: &Arc<Self>, value: &Value) -> std::result::Result<Record, Failure> {
        Record::decode(self, value)
    }

    /// Project a record back to a value tree; never validates
    pub fn encode(&self, record: &Record) -> Value {
        record.to_value()
    }
}

impl fmt::Display for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<SchemaType[<{}>]>", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKind;
    use serde_json::json;

    fn car(registry: &TypeRegistry) -> Arc<CompiledSchema> {
        SchemaDeclaration::new("Car")
            .field("make", "string")
            .field("model", "string")
            .field("year", "integer")
            .compile(registry)
            .unwrap()
    }

    fn field_types(schema: &CompiledSchema) -> Vec<(String, String)> {
        schema
            .fields()
            .iter()
            .map(|field| (field.name().to_string(), field.ty().to_string()))
            .collect()
    }

    #[test]
    fn test_compile_simple_schema() {
        let registry = TypeRegistry::with_builtins();
        let car = car(&registry);
        assert_eq!(
            field_types(&car),
            vec![
                ("make".to_string(), "<String>".to_string()),
                ("model".to_string(), "<String>".to_string()),
                ("year".to_string(), "<Integer>".to_string()),
            ]
        );
        assert_eq!(car.to_string(), "<SchemaType[<Car>]>");
        assert_eq!(car.as_type().to_string(), "<Car>");
        assert!(!car.is_generic());
    }

    #[test]
    fn test_subclass_appends_and_overrides() {
        let registry = TypeRegistry::with_builtins();
        let car = car(&registry);
        let electric = SchemaDeclaration::new("ElectricCar")
            .extends(&car)
            .field("battery_size", "integer")
            .field("year", "double")
            .compile(&registry)
            .unwrap();

        let names: Vec<&str> = electric.fields().iter().map(FieldDecl::name).collect();
        assert_eq!(names, vec!["make", "model", "year", "battery_size"]);
        assert_eq!(electric.field("year").unwrap().ty().to_string(), "<Double>");
        assert_eq!(car.field("year").unwrap().ty().to_string(), "<Integer>");
    }

    #[test]
    fn test_nested_schema_field() {
        let registry = TypeRegistry::with_builtins();
        let car = car(&registry);
        let driver = SchemaDeclaration::new("Driver")
            .field("name", "string")
            .field("car", &car)
            .compile(&registry)
            .unwrap();

        match driver.field("car").unwrap().ty().kind() {
            TypeKind::Record(schema) => assert!(Arc::ptr_eq(schema, &car)),
            other => panic!("Expected Record, got {:?}", other),
        }
    }

    #[test]
    fn test_generic_schema() {
        let registry = TypeRegistry::with_builtins();
        let t = TypeVar::new("T");
        let list_t = registry.list_of(&t).unwrap();
        let generic = SchemaDeclaration::new("GenericTestSchema")
            .type_param(&t)
            .field("x", &t)
            .field("y", list_t)
            .compile(&registry)
            .unwrap();

        assert!(generic.is_generic());
        assert_eq!(generic.field("x").unwrap().ty().to_string(), "~T");
        assert_eq!(generic.field("y").unwrap().ty().to_string(), "[~T]");

        let ints = generic.parameterize(&registry, &["integer".into()]).unwrap();
        assert_eq!(ints.name(), "GenericTestSchema[<Integer>]");
        assert_eq!(ints.field("x").unwrap().ty().to_string(), "<Integer>");
        assert_eq!(ints.field("y").unwrap().ty().to_string(), "[<Integer>]");

        let doubles = generic.parameterize(&registry, &["double".into()]).unwrap();
        assert_eq!(doubles.field("y").unwrap().ty().to_string(), "[<Double>]");
        // Parameterizing never touches the generic schema
        assert_eq!(generic.field("x").unwrap().ty().to_string(), "~T");
    }

    #[test]
    fn test_subclass_inherits_open_params() {
        let registry = TypeRegistry::with_builtins();
        let t = TypeVar::new("T");
        let generic = SchemaDeclaration::new("Base")
            .type_param(&t)
            .field("x", &t)
            .compile(&registry)
            .unwrap();
        let child = SchemaDeclaration::new("Child")
            .extends(&generic)
            .compile(&registry)
            .unwrap();

        assert_eq!(child.type_params(), &[t.clone()]);
        let bound = child.parameterize(&registry, &["string".into()]).unwrap();
        assert_eq!(bound.field("x").unwrap().ty().to_string(), "<String>");
    }

    #[test]
    fn test_parameterize_errors() {
        let registry = TypeRegistry::with_builtins();
        let car = car(&registry);
        assert!(matches!(
            car.parameterize(&registry, &["integer".into()]),
            Err(SchemaError::NotGeneric(name)) if name == "Car"
        ));

        let t = TypeVar::new("T");
        let generic = SchemaDeclaration::new("Box")
            .type_param(&t)
            .field("item", &t)
            .compile(&registry)
            .unwrap();
        assert!(matches!(
            generic.parameterize(&registry, &["integer".into(), "string".into()]),
            Err(SchemaError::ArityMismatch { actual: 2, .. })
        ));
    }

    #[test]
    fn test_default_kept_on_field() {
        let registry = TypeRegistry::with_builtins();
        let car = car(&registry);
        let toyota = SchemaDeclaration::new("ToyotaCar")
            .extends(&car)
            .field_with_default("make", "string", json!("Toyota"))
            .compile(&registry)
            .unwrap();
        assert_eq!(toyota.field("make").unwrap().default(), Some(&json!("Toyota")));
        assert_eq!(toyota.fields()[0].name(), "make");
    }
}

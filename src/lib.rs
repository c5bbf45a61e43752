//! Instance Schemas
//!
//! Declarative schemas for already-parsed value trees: declare a record type
//! once, then decode input into validated records, re-validate them after
//! mutation, and encode them back.
//!
//! ## Features
//!
//! - **Typed Validation**: primitives, lists, mappings, optionals and unions
//!   with ordered validator chains and numeric failure codes
//! - **Derived Types**: named subtypes that append validators to a base type
//! - **Inheritance**: field tables merged through parent schemas with in-place overrides
//! - **Generics**: type variables bound per schema and carried through subclasses
//! - **Aggregated Failures**: every failing field or list element reported at once
//!
//! ## Architecture
//!
//! ```text
//! TypeRegistry ── native keys ──► TypeDescriptor ◄── GenericResolver
//!                                      │
//! SchemaDeclaration ── compile ──► CompiledSchema ── decode ──► Record
//!                                      ▲                          │
//!                                      └──────── encode ──────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use instance_schemas::{SchemaDeclaration, TypeRegistry};
//! use serde_json::json;
//!
//! let registry = TypeRegistry::with_builtins();
//! let car = SchemaDeclaration::new("Car")
//!     .field("make", "string")
//!     .field("year", "integer")
//!     .compile(&registry)
//!     .unwrap();
//!
//! let record = car.decode(&json!({"make": "Honda", "year": 2007})).unwrap();
//! assert_eq!(record.value("make"), Some(&json!("Honda")));
//! assert!(car.decode(&json!({"make": "Honda", "year": "2007"})).is_err());
//! ```

pub mod config;
pub mod error;
pub mod failure;
pub mod generics;
pub mod registry;
pub mod schema;
pub mod types;
pub mod validator;
pub mod value;

pub use config::{EngineConfig, MappingFailures};
pub use error::{Result, SchemaError};
pub use failure::{ElementFailure, Failure, LeafFailure};
pub use generics::{GenericParams, GenericResolver, TypeArg};
pub use registry::TypeRegistry;
pub use schema::{CompiledSchema, FieldDecl, FieldValue, Record, SchemaDeclaration};
pub use types::{TypeDescriptor, TypeKind, TypeRef, TypeVar};
pub use validator::{CustomValidator, Limit, Validator};
pub use value::ValueKind;

//! Error types for type registration and schema declaration
//!
//! Validation outcomes are not errors in this sense; they are reported as
//! [`crate::failure::Failure`] values.

use thiserror::Error;

/// Result type for declaration-time operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Type registry and schema compiler errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Wrong number of type arguments for {name}: expected {expected}, got {actual}")]
    ArityMismatch {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("Type is not generic: {0}")]
    NotGeneric(String),

    #[error("Unknown field '{field}' on schema {schema}")]
    UnknownField { schema: String, field: String },

    #[error("Type name already registered: {0}")]
    DuplicateType(String),

    #[error("Registry is frozen: cannot register '{0}'")]
    RegistryFrozen(String),

    #[error("Process-wide type registry lock is poisoned")]
    RegistryPoisoned,

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

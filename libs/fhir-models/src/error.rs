//! Error types for FHIR models

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Type already registered: {0}")]
    DuplicateType(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Type {0} is abstract and cannot be instantiated")]
    AbstractType(String),

    #[error("Unknown field '{field}' on {type_name}")]
    UnknownField { type_name: String, field: String },

    #[error("Cardinality violation at {path}: {message}")]
    Cardinality { path: String, message: String },

    #[error("Type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Invalid {type_code} value: '{value}'")]
    InvalidPrimitive { type_code: String, value: String },

    #[error("Invalid type definition: {0}")]
    InvalidDefinition(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

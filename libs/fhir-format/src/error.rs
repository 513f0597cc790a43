//! Error types for FHIR format conversion

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("expected a JSON object for the resource")]
    ExpectedObject,
    #[error("missing resourceType property")]
    MissingResourceType,
    #[error("resource type mismatch: expected {expected}, found {found}")]
    ResourceTypeMismatch { expected: String, found: String },
    #[error("{0} is not a resource type")]
    NotAResource(String),
    #[error("invalid content at {path}: {message}")]
    InvalidContent { path: String, message: String },
    #[error(transparent)]
    Model(#[from] ferrum_models::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormatError>;

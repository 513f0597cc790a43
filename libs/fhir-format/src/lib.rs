//! Descriptor-driven FHIR serialization.
//!
//! Instances are written to and read from a format-neutral tree
//! ([`tree::TreeElement`]); each wire format is a [`Format`] strategy over
//! that tree:
//! - [`JsonFormat`]: FHIR JSON (`serde_json::Value`), `_name` metadata entries
//! - [`XmlFormat`]: FHIR XML text, `value` attributes, wrapped contained resources
//! - [`HashFormat`]: ordered map with native scalars ([`HashValue`])
//!
//! Decimal values keep their scale in every format: `1.50` is never `1.5`.
//!
//! ```
//! use ferrum_format::{from_json_str, to_json_string};
//! use ferrum_models::TypeRegistry;
//!
//! let registry = TypeRegistry::r4();
//! let input = r#"{"resourceType":"Goal","lifecycleStatus":"active","description":{"text":"Walk"},"subject":{"reference":"Patient/1"}}"#;
//!
//! let goal = from_json_str(&registry, input).unwrap();
//! assert_eq!(goal.type_name(), "Goal");
//! assert_eq!(to_json_string(&goal, false).unwrap(), input);
//! ```

pub mod convert;
pub mod de;
pub mod error;
pub mod format;
pub mod hash;
pub mod json;
mod object;
pub mod ser;
pub mod tree;
pub mod xml;

pub use convert::{json_to_xml, xml_to_json};
pub use de::{DeserializeOptions, UnknownFieldPolicy};
pub use error::{FormatError, Result};
pub use format::{deserialize, deserialize_as, serialize, Format};
pub use hash::{HashFormat, HashValue};
pub use json::JsonFormat;
pub use xml::XmlFormat;

use ferrum_models::{Instance, TypeRegistry};
use std::sync::Arc;

/// Serialize an instance to a FHIR JSON value
pub fn to_json_value(instance: &Instance) -> Result<serde_json::Value> {
    serialize(&JsonFormat, instance)
}

/// Serialize an instance to FHIR JSON text
pub fn to_json_string(instance: &Instance, pretty: bool) -> Result<String> {
    let value = to_json_value(instance)?;
    let text = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(text)
}

/// Parse a FHIR JSON resource, rejecting unknown keys
pub fn from_json_str(registry: &Arc<TypeRegistry>, input: &str) -> Result<Instance> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    deserialize(&JsonFormat, &value, registry, &DeserializeOptions::default())
}

/// Serialize an instance to indented FHIR XML
pub fn to_xml_string(instance: &Instance) -> Result<String> {
    serialize(&XmlFormat::new(), instance)
}

/// Parse a FHIR XML resource, rejecting unknown elements
pub fn from_xml_str(registry: &Arc<TypeRegistry>, input: &str) -> Result<Instance> {
    deserialize(
        &XmlFormat::new(),
        &input.to_string(),
        registry,
        &DeserializeOptions::default(),
    )
}

pub fn to_hash(instance: &Instance) -> Result<HashValue> {
    serialize(&HashFormat, instance)
}

pub fn from_hash(registry: &Arc<TypeRegistry>, value: &HashValue) -> Result<Instance> {
    deserialize(&HashFormat, value, registry, &DeserializeOptions::default())
}

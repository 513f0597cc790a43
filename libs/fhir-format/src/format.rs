//! Format strategy and the generic serialize/deserialize entry points

use crate::de::{self, DeserializeOptions};
use crate::error::Result;
use crate::ser;
use crate::tree::TreeElement;
use ferrum_models::{Instance, TypeRegistry};
use std::sync::Arc;

/// A wire format: renders the neutral tree and reads it back
pub trait Format {
    type Document;

    fn write(&self, tree: &TreeElement) -> Result<Self::Document>;
    fn read(&self, document: &Self::Document) -> Result<TreeElement>;
}

/// Serialize an instance with the given format
pub fn serialize<F: Format>(format: &F, instance: &Instance) -> Result<F::Document> {
    let tree = ser::to_tree(instance)?;
    format.write(&tree)
}

/// Deserialize a resource; its type comes from the document
pub fn deserialize<F: Format>(
    format: &F,
    document: &F::Document,
    registry: &Arc<TypeRegistry>,
    options: &DeserializeOptions,
) -> Result<Instance> {
    let tree = format.read(document)?;
    de::from_tree(registry, &tree, None, options)
}

/// Deserialize a document as the named type (datatypes, nested types, or a checked resource type)
pub fn deserialize_as<F: Format>(
    format: &F,
    document: &F::Document,
    registry: &Arc<TypeRegistry>,
    type_name: &str,
    options: &DeserializeOptions,
) -> Result<Instance> {
    let tree = format.read(document)?;
    de::from_tree(registry, &tree, Some(type_name), options)
}

//! JSON-shaped object mapping shared by the JSON and hash formats
//!
//! Follows the FHIR JSON rules: `resourceType` marks resources, arrays mark
//! repeating properties and primitive metadata (`id`, `extension`) lives in
//! a sibling `_name` entry, aligned index by index for arrays.

use crate::error::{FormatError, Result};
use crate::tree::{Scalar, Shape, TreeElement, TreeNode, TreePrimitive, TreeProperty};
use indexmap::IndexMap;

/// Borrowed view of one document node
pub(crate) enum ObjectView<'a, T> {
    Null,
    Scalar(Scalar),
    Array(&'a [T]),
    Object(IndexMap<&'a str, &'a T>),
}

/// A JSON-like document value
pub(crate) trait ObjectTree: Sized {
    fn null() -> Self;
    fn string(text: &str) -> Self;
    fn from_scalar(scalar: &Scalar) -> Result<Self>;
    fn array(items: Vec<Self>) -> Self;
    fn object(entries: Vec<(String, Self)>) -> Self;
    fn view(&self) -> ObjectView<'_, Self>;
}

pub(crate) fn read_document<T: ObjectTree>(document: &T) -> Result<TreeElement> {
    match document.view() {
        ObjectView::Object(entries) => read_object(&entries),
        _ => Err(FormatError::ExpectedObject),
    }
}

pub(crate) fn write_document<T: ObjectTree>(tree: &TreeElement) -> Result<T> {
    write_object(tree)
}

fn read_object<T: ObjectTree>(entries: &IndexMap<&str, &T>) -> Result<TreeElement> {
    let mut element = TreeElement {
        resource_type: match entries.get("resourceType").map(|v| v.view()) {
            Some(ObjectView::Scalar(Scalar::String(name))) => Some(name),
            Some(_) => return Err(FormatError::MissingResourceType),
            None => None,
        },
        properties: Vec::new(),
    };

    for (key, value) in entries {
        if *key == "resourceType" {
            continue;
        }

        if let Some(base) = key.strip_prefix('_') {
            // Metadata without a value: `_status` alone
            if !entries.contains_key(base) {
                let (shape, nodes) = read_property(None, Some(*value))?;
                element
                    .properties
                    .push(TreeProperty::new(base, shape, nodes));
            }
            continue;
        }

        let meta_key = format!("_{}", key);
        let meta = entries.get(meta_key.as_str()).copied();
        let (shape, nodes) = read_property(Some(*value), meta)?;
        element.properties.push(TreeProperty::new(*key, shape, nodes));
    }

    Ok(element)
}

fn read_property<T: ObjectTree>(value: Option<&T>, meta: Option<&T>) -> Result<(Shape, Vec<TreeNode>)> {
    let value_view = value.map(|v| v.view());
    let meta_view = meta.map(|m| m.view());

    match (value_view, meta_view) {
        (Some(ObjectView::Array(items)), meta) => {
            let metas: &[T] = match meta {
                Some(ObjectView::Array(m)) => m,
                _ => &[],
            };
            let mut nodes = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                if let Some(node) = read_node(Some(item), metas.get(index))? {
                    nodes.push(node);
                }
            }
            Ok((Shape::Array, nodes))
        }
        (None, Some(ObjectView::Array(metas))) => {
            let mut nodes = Vec::with_capacity(metas.len());
            for meta in metas {
                if let Some(node) = read_node(None, Some(meta))? {
                    nodes.push(node);
                }
            }
            Ok((Shape::Array, nodes))
        }
        _ => {
            let node = read_node(value, meta)?;
            Ok((Shape::Single, node.into_iter().collect()))
        }
    }
}

fn read_node<T: ObjectTree>(value: Option<&T>, meta: Option<&T>) -> Result<Option<TreeNode>> {
    let scalar = match value.map(|v| v.view()) {
        Some(ObjectView::Object(entries)) => {
            return Ok(Some(TreeNode::Element(read_object(&entries)?)))
        }
        Some(ObjectView::Array(_)) => return Err(FormatError::ExpectedObject),
        Some(ObjectView::Scalar(scalar)) => Some(scalar),
        Some(ObjectView::Null) | None => None,
    };

    let mut primitive = TreePrimitive {
        value: scalar,
        ..Default::default()
    };

    if let Some(ObjectView::Object(meta)) = meta.map(|m| m.view()) {
        primitive.id = match meta.get("id").map(|v| v.view()) {
            Some(ObjectView::Scalar(s)) => Some(s.text().to_string()),
            _ => None,
        };
        if let Some(ObjectView::Array(extensions)) = meta.get("extension").map(|v| v.view()) {
            for extension in extensions {
                match extension.view() {
                    ObjectView::Object(entries) => primitive.extension.push(read_object(&entries)?),
                    _ => return Err(FormatError::ExpectedObject),
                }
            }
        }
    }

    if primitive.value.is_none() && !primitive.has_metadata() {
        // Array alignment placeholder
        return Ok(None);
    }
    Ok(Some(TreeNode::Primitive(primitive)))
}

fn write_object<T: ObjectTree>(element: &TreeElement) -> Result<T> {
    let mut entries = Vec::with_capacity(element.properties.len() + 1);
    if let Some(resource_type) = &element.resource_type {
        entries.push(("resourceType".to_string(), T::string(resource_type)));
    }

    for property in &element.properties {
        let mut values = Vec::with_capacity(property.values.len());
        let mut metas = Vec::with_capacity(property.values.len());
        let mut has_value = false;
        let mut has_meta = false;

        for node in &property.values {
            let (value, meta) = write_node::<T>(node)?;
            has_value |= value.is_some();
            has_meta |= meta.is_some();
            values.push(value.unwrap_or_else(T::null));
            metas.push(meta.unwrap_or_else(T::null));
        }

        if property.is_array() {
            if has_value {
                entries.push((property.name.clone(), T::array(values)));
            }
            if has_meta {
                entries.push((format!("_{}", property.name), T::array(metas)));
            }
        } else {
            if has_value {
                entries.extend(values.into_iter().next().map(|v| (property.name.clone(), v)));
            }
            if has_meta {
                entries.extend(metas.into_iter().next().map(|m| (format!("_{}", property.name), m)));
            }
        }
    }

    Ok(T::object(entries))
}

/// Value and `_name` metadata of one node
fn write_node<T: ObjectTree>(node: &TreeNode) -> Result<(Option<T>, Option<T>)> {
    match node {
        TreeNode::Element(element) => Ok((Some(write_object(element)?), None)),
        TreeNode::Xhtml(source) => Ok((Some(T::string(source)), None)),
        TreeNode::Primitive(primitive) => {
            let value = primitive.value.as_ref().map(T::from_scalar).transpose()?;
            if !primitive.has_metadata() {
                return Ok((value, None));
            }

            let mut meta = Vec::new();
            if let Some(id) = &primitive.id {
                meta.push(("id".to_string(), T::string(id)));
            }
            if !primitive.extension.is_empty() {
                let extensions = primitive
                    .extension
                    .iter()
                    .map(write_object::<T>)
                    .collect::<Result<Vec<T>>>()?;
                meta.push(("extension".to_string(), T::array(extensions)));
            }
            Ok((value, Some(T::object(meta))))
        }
    }
}

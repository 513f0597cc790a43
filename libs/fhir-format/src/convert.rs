//! Schema-agnostic JSON ↔ XML conversion.
//!
//! Works without type definitions, so some information has to be guessed:
//! - `id` on non-resource elements and `url` on extensions become attributes.
//! - A `div` string holding markup is embedded as XHTML.
//! - XML values turn into JSON booleans or numbers when they look like one.
//! - Elements occurring once in XML become single JSON values.
//!
//! Use [`crate::serialize`] with a registry-backed instance when exact
//! shapes matter.

use crate::error::{FormatError, Result};
use crate::format::Format;
use crate::json::JsonFormat;
use crate::tree::{Scalar, TreeElement, TreeNode, TreePrimitive};
use crate::xml::XmlFormat;
use serde_json::Value;

/// Convert a FHIR JSON payload into its XML representation.
pub fn json_to_xml(input: &str) -> Result<String> {
    let value: Value = serde_json::from_str(input)?;
    if !value.is_object() {
        return Err(FormatError::ExpectedObject);
    }
    let mut tree = JsonFormat.read(&value)?;
    if tree.resource_type.is_none() {
        return Err(FormatError::MissingResourceType);
    }
    mark_attributes(&mut tree, None);
    XmlFormat::new().write(&tree)
}

/// Convert a FHIR XML payload into its JSON representation.
pub fn xml_to_json(input: &str) -> Result<String> {
    let mut tree = XmlFormat::new().read_str(input)?;
    guess_scalars(&mut tree);
    let value = JsonFormat.write(&tree)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

fn mark_attributes(element: &mut TreeElement, name: Option<&str>) {
    let is_extension = matches!(name, Some("extension") | Some("modifierExtension"));
    let is_resource = element.resource_type.is_some();

    for property in &mut element.properties {
        let primitive_only = property
            .values
            .iter()
            .all(|v| matches!(v, TreeNode::Primitive(p) if !p.has_metadata()));
        property.xml_attr = primitive_only
            && !property.is_array()
            && ((property.name == "id" && !is_resource) || (property.name == "url" && is_extension));

        for node in &mut property.values {
            if property.name == "div" {
                let markup = match &*node {
                    TreeNode::Primitive(TreePrimitive {
                        value: Some(Scalar::String(markup)),
                        ..
                    }) if markup.trim_start().starts_with('<') => Some(markup.clone()),
                    _ => None,
                };
                if let Some(markup) = markup {
                    *node = TreeNode::Xhtml(markup);
                    continue;
                }
            }
            match node {
                TreeNode::Element(child) => mark_attributes(child, Some(&property.name)),
                TreeNode::Primitive(primitive) => {
                    for extension in &mut primitive.extension {
                        mark_attributes(extension, Some("extension"));
                    }
                }
                TreeNode::Xhtml(_) => {}
            }
        }
    }
}

fn guess_scalars(element: &mut TreeElement) {
    for property in &mut element.properties {
        for node in &mut property.values {
            match node {
                TreeNode::Element(child) => guess_scalars(child),
                TreeNode::Primitive(primitive) => {
                    if let Some(Scalar::Lexical(text)) = &primitive.value {
                        primitive.value = Some(guess_scalar(text));
                    }
                    for extension in &mut primitive.extension {
                        guess_scalars(extension);
                    }
                }
                TreeNode::Xhtml(_) => {}
            }
        }
    }
}

fn guess_scalar(text: &str) -> Scalar {
    match text {
        "true" => Scalar::Bool(true),
        "false" => Scalar::Bool(false),
        _ if text.parse::<i64>().is_ok() && !(text.len() > 1 && text.starts_with('0')) => {
            Scalar::Number(text.to_string())
        }
        _ => Scalar::String(text.to_string()),
    }
}

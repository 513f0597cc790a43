//! Tree → instance decoding
//!
//! Keys resolve to fields by exact wire name or by choice prefix plus type
//! suffix. Structural problems (unknown keys, arrays on single-valued
//! fields, scalars of the wrong kind) are errors; a document carrying two
//! siblings of one choice field is accepted and left to the validator.

use crate::error::{FormatError, Result};
use crate::tree::{Scalar, Shape, TreeElement, TreeNode, TreePrimitive};
use ferrum_models::{
    Error, FieldDescriptor, Instance, Primitive, PrimitiveType, PrimitiveValue, ScalarKind,
    TypeRegistry, Value, ANY_RESOURCE,
};
use std::sync::Arc;

/// What to do with keys that match no field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFieldPolicy {
    #[default]
    Reject,
    /// Skip the key and log a warning
    Ignore,
}

#[derive(Debug, Clone, Default)]
pub struct DeserializeOptions {
    pub unknown_fields: UnknownFieldPolicy,
}

impl DeserializeOptions {
    pub fn lenient() -> Self {
        Self {
            unknown_fields: UnknownFieldPolicy::Ignore,
        }
    }
}

/// Decode a tree into an instance.
///
/// The type comes from `type_name` when given, otherwise from the tree's
/// resource type; when both are present they must agree.
pub fn from_tree(
    registry: &Arc<TypeRegistry>,
    tree: &TreeElement,
    type_name: Option<&str>,
    options: &DeserializeOptions,
) -> Result<Instance> {
    let name = match (type_name, tree.resource_type.as_deref()) {
        (Some(expected), Some(found)) if expected != found => {
            return Err(FormatError::ResourceTypeMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
            })
        }
        (Some(name), _) | (None, Some(name)) => name,
        (None, None) => return Err(FormatError::MissingResourceType),
    };

    Decoder { registry, options }.element(name, tree)
}

struct Decoder<'a> {
    registry: &'a Arc<TypeRegistry>,
    options: &'a DeserializeOptions,
}

impl Decoder<'_> {
    fn element(&self, type_name: &str, tree: &TreeElement) -> Result<Instance> {
        let mut instance = self.registry.instantiate(type_name)?;
        let descriptor = instance.descriptor().clone();

        for property in &tree.properties {
            let Some(wire) = descriptor.resolve_wire(&property.name) else {
                match self.options.unknown_fields {
                    UnknownFieldPolicy::Reject => {
                        return Err(Error::UnknownField {
                            type_name: type_name.to_string(),
                            field: property.name.clone(),
                        }
                        .into())
                    }
                    UnknownFieldPolicy::Ignore => {
                        tracing::warn!(
                            type_name = %type_name,
                            field = %property.name,
                            "ignoring unknown field"
                        );
                        continue;
                    }
                }
            };

            let field = wire.field;
            check_shape(field, property.shape, property.values.len())?;

            let type_code = match wire.choice_type {
                Some(ty) => ty.code.as_str(),
                None => field.types()[0].code.as_str(),
            };

            for node in &property.values {
                let value = self.value(field, type_code, node)?;
                if field.is_choice() {
                    instance.append_choice(field.name(), value)?;
                } else {
                    instance.push(field.name(), value)?;
                }
            }
        }

        Ok(instance)
    }

    fn value(&self, field: &FieldDescriptor, type_code: &str, node: &TreeNode) -> Result<Value> {
        if let Some(ty) = PrimitiveType::from_code(type_code) {
            return match node {
                TreeNode::Primitive(p) => self.primitive(field, ty, p).map(Value::Primitive),
                TreeNode::Xhtml(source) if ty == PrimitiveType::Xhtml => Ok(Value::Primitive(
                    Primitive::new(ty, PrimitiveValue::Text(source.clone())),
                )),
                // XML primitives written with more than value/id attributes
                TreeNode::Element(e) if e.resource_type.is_none() => {
                    let p = self.element_as_primitive(field, e)?;
                    self.primitive(field, ty, &p).map(Value::Primitive)
                }
                _ => Err(unexpected(field, type_code, node)),
            };
        }

        let TreeNode::Element(tree) = node else {
            return Err(unexpected(field, type_code, node));
        };

        if type_code == ANY_RESOURCE {
            let resource_type = tree
                .resource_type
                .as_deref()
                .ok_or(FormatError::MissingResourceType)?;
            if !self.registry.lookup(resource_type)?.is_resource() {
                return Err(FormatError::NotAResource(resource_type.to_string()));
            }
            return self.element(resource_type, tree).map(Value::Element);
        }

        self.element(type_code, tree).map(Value::Element)
    }

    fn primitive(
        &self,
        field: &FieldDescriptor,
        ty: PrimitiveType,
        tree: &TreePrimitive,
    ) -> Result<Primitive> {
        let mut primitive = Primitive::empty(ty);
        if let Some(scalar) = &tree.value {
            primitive.value = Some(scalar_value(field, ty, scalar)?);
        }
        primitive.id = tree.id.clone();
        primitive.extension = tree
            .extension
            .iter()
            .map(|e| self.element("Extension", e))
            .collect::<Result<Vec<_>>>()?;

        if primitive.value.is_none() && !tree.has_metadata() {
            return Err(FormatError::InvalidContent {
                path: field.path().to_string(),
                message: "primitive has neither a value nor id/extension".to_string(),
            });
        }
        Ok(primitive)
    }

    /// An XML element standing in for a primitive (`<given id="a"><extension .../></given>`)
    fn element_as_primitive(
        &self,
        field: &FieldDescriptor,
        element: &TreeElement,
    ) -> Result<TreePrimitive> {
        let mut primitive = TreePrimitive::default();
        for property in &element.properties {
            let text = || {
                property
                    .values
                    .first()
                    .and_then(TreeNode::as_primitive)
                    .and_then(|p| p.value.as_ref())
                    .map(|s| s.text().to_string())
            };
            match property.name.as_str() {
                "value" if property.xml_attr => {
                    primitive.value = text().map(Scalar::Lexical);
                }
                "id" if property.xml_attr => primitive.id = text(),
                "extension" => {
                    for node in &property.values {
                        if let TreeNode::Element(ext) = node {
                            primitive.extension.push(ext.clone());
                        }
                    }
                }
                other => match self.options.unknown_fields {
                    UnknownFieldPolicy::Reject => {
                        return Err(Error::UnknownField {
                            type_name: field.path().to_string(),
                            field: other.to_string(),
                        }
                        .into())
                    }
                    UnknownFieldPolicy::Ignore => {
                        tracing::warn!(
                            path = %field.path(),
                            field = %other,
                            "ignoring unknown content in a primitive"
                        );
                    }
                },
            }
        }
        Ok(primitive)
    }
}

fn check_shape(field: &FieldDescriptor, shape: Shape, count: usize) -> Result<()> {
    let message = if field.is_repeating() {
        (shape == Shape::Single).then(|| {
            format!(
                "expected an array ({}), found a single value",
                field.cardinality()
            )
        })
    } else if shape == Shape::Array || count > 1 {
        Some(format!(
            "expected a single value ({}), found {} value(s) in an array",
            field.cardinality(),
            count
        ))
    } else {
        None
    };

    match message {
        Some(message) => Err(Error::Cardinality {
            path: field.path().to_string(),
            message,
        }
        .into()),
        None => Ok(()),
    }
}

/// Convert a scalar to the value space of `ty`, honoring the scalar kinds of typed formats
fn scalar_value(field: &FieldDescriptor, ty: PrimitiveType, scalar: &Scalar) -> Result<PrimitiveValue> {
    let accepted = match (scalar, ty.scalar_kind()) {
        (Scalar::Lexical(_), _) => true,
        (Scalar::Bool(_), ScalarKind::Boolean) => true,
        (Scalar::Number(_), ScalarKind::Number) => true,
        (Scalar::String(_), ScalarKind::Text) => true,
        _ => false,
    };

    if !accepted {
        return Err(Error::TypeMismatch {
            path: field.path().to_string(),
            expected: ty.code().to_string(),
            found: scalar.kind_name().to_string(),
        }
        .into());
    }

    Ok(ty.parse(scalar.text())?)
}

fn unexpected(field: &FieldDescriptor, type_code: &str, node: &TreeNode) -> FormatError {
    let found = match node {
        TreeNode::Primitive(_) => "primitive",
        TreeNode::Element(e) if e.resource_type.is_some() => "resource",
        TreeNode::Element(_) => "element",
        TreeNode::Xhtml(_) => "xhtml",
    };
    Error::TypeMismatch {
        path: field.path().to_string(),
        expected: type_code.to_string(),
        found: found.to_string(),
    }
    .into()
}

//! Instance → tree lowering
//!
//! Walks the descriptor in declaration order. Empty slots are omitted,
//! repeating fields become arrays and choice values take the wire name of
//! their concrete type (`valueString`).

use crate::error::Result;
use crate::tree::{Scalar, Shape, TreeElement, TreeNode, TreePrimitive, TreeProperty};
use ferrum_models::{Error, FieldDescriptor, Instance, Primitive, PrimitiveValue, Representation, Value};

/// Lower an instance into the neutral tree
pub fn to_tree(instance: &Instance) -> Result<TreeElement> {
    element(instance)
}

fn element(instance: &Instance) -> Result<TreeElement> {
    let mut tree = TreeElement {
        resource_type: instance
            .is_resource()
            .then(|| instance.type_name().to_string()),
        properties: Vec::new(),
    };

    for (index, field) in instance.descriptor().fields().iter().enumerate() {
        let values = instance.slot(index);
        if values.is_empty() {
            continue;
        }

        let (name, shape) = if field.is_choice() {
            if values.len() > 1 {
                let variants: Vec<_> = values.iter().map(Value::type_code).collect();
                return Err(Error::Cardinality {
                    path: field.path().to_string(),
                    message: format!(
                        "choice holds {} variants ({}), only one can be written",
                        values.len(),
                        variants.join(", ")
                    ),
                }
                .into());
            }
            (field.choice_wire_name(values[0].type_code()), Shape::Single)
        } else if field.is_repeating() {
            (field.wire_name().to_string(), Shape::Array)
        } else {
            (field.wire_name().to_string(), Shape::Single)
        };

        let nodes = values
            .iter()
            .map(|value| node(field, value))
            .collect::<Result<Vec<_>>>()?;

        let mut property = TreeProperty::new(name, shape, nodes);
        property.xml_attr = field.representation() == Representation::XmlAttr;
        tree.properties.push(property);
    }

    Ok(tree)
}

fn node(field: &FieldDescriptor, value: &Value) -> Result<TreeNode> {
    match value {
        Value::Element(instance) => Ok(TreeNode::Element(element(instance)?)),
        Value::Primitive(primitive) if field.representation() == Representation::Xhtml => Ok(
            TreeNode::Xhtml(primitive.value.as_ref().map(|v| v.to_string()).unwrap_or_default()),
        ),
        Value::Primitive(primitive) => Ok(TreeNode::Primitive(self::primitive(primitive)?)),
    }
}

fn primitive(primitive: &Primitive) -> Result<TreePrimitive> {
    Ok(TreePrimitive {
        value: primitive.value.as_ref().map(scalar),
        id: primitive.id.clone(),
        extension: primitive
            .extension
            .iter()
            .map(element)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn scalar(value: &PrimitiveValue) -> Scalar {
    match value {
        PrimitiveValue::Boolean(b) => Scalar::Bool(*b),
        PrimitiveValue::Integer(i) => Scalar::Number(i.to_string()),
        PrimitiveValue::Decimal(d) => Scalar::Number(d.to_string()),
        PrimitiveValue::Text(s) => Scalar::String(s.clone()),
    }
}

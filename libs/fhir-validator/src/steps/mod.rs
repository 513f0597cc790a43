//! Validation steps
//!
//! Every step walks the instance tree through [`Walker`] and reports issues
//! located by wire path with indexes (`AuditEvent.agent[0].who`).

pub mod bindings;
pub mod cardinality;
pub mod choice;
pub mod references;

use ferrum_models::{FieldDescriptor, Instance, Value};

/// Depth-first traversal over an instance and every nested instance
pub(crate) struct Walker<'a> {
    root: &'a Instance,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(root: &'a Instance) -> Self {
        Self { root }
    }

    /// Call `visit` for each instance with its location
    pub(crate) fn visit<F>(&self, mut visit: F)
    where
        F: FnMut(&Instance, &str),
    {
        walk(self.root, self.root.type_name(), &mut visit);
    }
}

fn walk<F>(instance: &Instance, location: &str, visit: &mut F)
where
    F: FnMut(&Instance, &str),
{
    visit(instance, location);

    for (field, values) in instance.fields() {
        for (index, value) in values.iter().enumerate() {
            let value_location = value_location(location, field, value, index);
            match value {
                Value::Element(child) => walk(child, &value_location, visit),
                Value::Primitive(primitive) => {
                    for (i, extension) in primitive.extension.iter().enumerate() {
                        walk(extension, &format!("{}.extension[{}]", value_location, i), visit);
                    }
                }
            }
        }
    }
}

/// Location of a field as a whole (`AuditEvent.source`)
pub(crate) fn field_location(parent: &str, field: &FieldDescriptor) -> String {
    format!("{}.{}", parent, field.wire_name())
}

/// Location of one value (`AuditEvent.agent[0]`, `Goal.target[0].detailQuantity`)
pub(crate) fn value_location(parent: &str, field: &FieldDescriptor, value: &Value, index: usize) -> String {
    let name = if field.is_choice() {
        field.choice_wire_name(value.type_code())
    } else {
        field.wire_name().to_string()
    };

    if field.is_repeating() {
        format!("{}.{}[{}]", parent, name, index)
    } else {
        format!("{}.{}", parent, name)
    }
}

//! Runtime instances of FHIR types
//!
//! An [`Instance`] holds one slot per field of its [`TypeDescriptor`], in
//! declaration order. Structural rules (field existence, declared types,
//! the upper cardinality bound) are enforced when values are stored; the
//! lower bound, choice exclusivity and terminology bindings are left to the
//! validator.

use crate::descriptor::{FieldDescriptor, TypeDescriptor, TypeKind, WireMatch, ANY_RESOURCE};
use crate::error::{Error, Result};
use crate::primitive::{DecimalValue, PrimitiveType, PrimitiveValue};
use crate::registry::TypeRegistry;
use std::fmt;
use std::sync::Arc;

/// A primitive value together with its element id and extensions
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub ty: PrimitiveType,
    pub value: Option<PrimitiveValue>,
    pub id: Option<String>,
    pub extension: Vec<Instance>,
}

impl Primitive {
    pub fn new(ty: PrimitiveType, value: PrimitiveValue) -> Self {
        Self {
            ty,
            value: Some(value),
            id: None,
            extension: Vec::new(),
        }
    }

    /// A primitive without a value (only id and/or extensions)
    pub fn empty(ty: PrimitiveType) -> Self {
        Self {
            ty,
            value: None,
            id: None,
            extension: Vec::new(),
        }
    }

    /// Parse canonical text into a primitive of the given type
    pub fn parse(ty: PrimitiveType, text: &str) -> Result<Self> {
        Ok(Self::new(ty, ty.parse(text)?))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_extension(mut self, extension: Instance) -> Self {
        self.extension.push(extension);
        self
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// A value stored in an instance slot
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Primitive(Primitive),
    /// Complex datatype, nested backbone element or contained resource
    Element(Instance),
}

impl Value {
    pub fn primitive(ty: PrimitiveType, text: &str) -> Result<Self> {
        Primitive::parse(ty, text).map(Self::Primitive)
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::text(PrimitiveType::String, text.into())
    }

    pub fn code(code: impl Into<String>) -> Self {
        Self::text(PrimitiveType::Code, code.into())
    }

    pub fn uri(uri: impl Into<String>) -> Self {
        Self::text(PrimitiveType::Uri, uri.into())
    }

    pub fn boolean(value: bool) -> Self {
        Self::Primitive(Primitive::new(
            PrimitiveType::Boolean,
            PrimitiveValue::Boolean(value),
        ))
    }

    pub fn integer(value: i32) -> Self {
        Self::Primitive(Primitive::new(
            PrimitiveType::Integer,
            PrimitiveValue::Integer(value.into()),
        ))
    }

    pub fn decimal(value: impl Into<DecimalValue>) -> Self {
        Self::Primitive(Primitive::new(
            PrimitiveType::Decimal,
            PrimitiveValue::Decimal(value.into()),
        ))
    }

    pub fn element(instance: Instance) -> Self {
        Self::Element(instance)
    }

    fn text(ty: PrimitiveType, text: String) -> Self {
        Self::Primitive(Primitive::new(ty, PrimitiveValue::Text(text)))
    }

    /// Type code of the value (`string`, `Coding`, `AuditEvent.Agent`, ...)
    pub fn type_code(&self) -> &str {
        match self {
            Self::Primitive(p) => p.ty.code(),
            Self::Element(instance) => instance.type_name(),
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Self::Primitive(p) => Some(p),
            Self::Element(_) => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Element(instance) => Some(instance),
            Self::Primitive(_) => None,
        }
    }

    /// Primitive value as text, if this is a primitive with a text value
    pub fn as_str(&self) -> Option<&str> {
        self.as_primitive()
            .and_then(|p| p.value.as_ref())
            .and_then(PrimitiveValue::as_str)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Self::Element(instance)
    }
}

impl From<Primitive> for Value {
    fn from(primitive: Primitive) -> Self {
        Self::Primitive(primitive)
    }
}

/// Borrowed view of a populated field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Single(&'a Value),
    List(&'a [Value]),
}

impl<'a> FieldRef<'a> {
    pub fn as_single(self) -> Option<&'a Value> {
        match self {
            Self::Single(value) => Some(value),
            Self::List(_) => None,
        }
    }

    pub fn as_list(self) -> &'a [Value] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::List(values) => values,
        }
    }
}

/// An instance of a resource, datatype or nested element type
#[derive(Clone)]
pub struct Instance {
    registry: Arc<TypeRegistry>,
    descriptor: Arc<TypeDescriptor>,
    slots: Vec<Vec<Value>>,
}

impl Instance {
    /// Create an empty instance; all fields absent
    pub fn new(registry: Arc<TypeRegistry>, descriptor: Arc<TypeDescriptor>) -> Self {
        let slots = vec![Vec::new(); descriptor.fields().len()];
        Self {
            registry,
            descriptor,
            slots,
        }
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn is_resource(&self) -> bool {
        self.descriptor.kind() == TypeKind::Resource
    }

    /// True when no field holds a value
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }

    /// Create an empty instance of another type from the same registry
    pub fn instantiate(&self, name: &str) -> Result<Instance> {
        self.registry.instantiate(name)
    }

    /// Get a field by internal name
    pub fn get(&self, name: &str) -> Result<Option<FieldRef<'_>>> {
        let (index, field) = self.resolve(name)?;
        let slot = &self.slots[index];
        if slot.is_empty() {
            return Ok(None);
        }
        Ok(Some(if field.is_repeating() {
            FieldRef::List(slot)
        } else {
            FieldRef::Single(&slot[0])
        }))
    }

    /// All values of a field (empty when absent)
    pub fn values(&self, name: &str) -> Result<&[Value]> {
        let (index, _) = self.resolve(name)?;
        Ok(&self.slots[index])
    }

    pub fn first(&self, name: &str) -> Result<Option<&Value>> {
        Ok(self.values(name)?.first())
    }

    /// Replace the value at `position`, returning the previous one
    pub fn replace(
        &mut self,
        name: &str,
        position: usize,
        value: impl Into<Value>,
    ) -> Result<Value> {
        let value = value.into();
        let (index, field) = self.resolve(name)?;
        let count = self.slots[index].len();
        if position >= count {
            return Err(Error::Cardinality {
                path: field.path().to_string(),
                message: format!("no value at index {}, field holds {}", position, count),
            });
        }
        self.check_type(field, &value)?;
        Ok(std::mem::replace(&mut self.slots[index][position], value))
    }

    /// Assign a single-valued field, replacing any previous value (or choice variant)
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (index, field) = self.resolve(name)?;
        if field.is_repeating() {
            return Err(Error::Cardinality {
                path: field.path().to_string(),
                message: format!(
                    "field repeats ({}), a single value cannot be assigned",
                    field.cardinality()
                ),
            });
        }
        self.check_type(field, &value)?;
        self.slots[index] = vec![value];
        Ok(())
    }

    /// Replace all values of a repeating field
    pub fn set_list(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        let (index, field) = self.resolve(name)?;
        if !field.is_repeating() {
            return Err(Error::Cardinality {
                path: field.path().to_string(),
                message: format!("field is single-valued ({}), a list was given", field.cardinality()),
            });
        }
        if field.cardinality().exceeds_max(values.len()) {
            return Err(too_many(field, values.len()));
        }
        for value in &values {
            self.check_type(field, value)?;
        }
        self.slots[index] = values;
        Ok(())
    }

    /// Append one value, failing when the field is already full
    pub fn push(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (index, field) = self.resolve(name)?;
        let count = self.slots[index].len() + 1;
        if field.cardinality().exceeds_max(count) {
            return Err(too_many(field, count));
        }
        self.check_type(field, &value)?;
        self.slots[index].push(value);
        Ok(())
    }

    /// Remove all values of a field
    pub fn clear(&mut self, name: &str) -> Result<()> {
        let (index, _) = self.resolve(name)?;
        self.slots[index].clear();
        Ok(())
    }

    /// Add another variant to a choice slot without replacing the present one.
    ///
    /// Used by decoders for documents carrying two choice siblings
    /// (`valueBoolean` and `valueString`); such an instance is representable
    /// but reported by the validator and refused by serializers.
    pub fn append_choice(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (index, field) = self.resolve(name)?;
        if !field.is_choice() {
            return self.push(name, value);
        }
        self.check_type(field, &value)?;
        self.slots[index].push(value);
        Ok(())
    }

    /// Resolve a wire key (`class`, `valueString`) to its field
    pub fn field_by_wire(&self, key: &str) -> Option<WireMatch<'_>> {
        self.descriptor.resolve_wire(key)
    }

    /// Populated fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &[Value])> {
        self.descriptor
            .fields()
            .iter()
            .zip(self.slots.iter())
            .filter(|(_, values)| !values.is_empty())
            .map(|(field, values)| (field, values.as_slice()))
    }

    /// Slot access by field index (used by serializers walking the descriptor)
    pub fn slot(&self, index: usize) -> &[Value] {
        self.slots.get(index).map_or(&[], Vec::as_slice)
    }

    fn resolve(&self, name: &str) -> Result<(usize, &FieldDescriptor)> {
        self.descriptor
            .field_index(name)
            .map(|index| (index, &self.descriptor.fields()[index]))
            .ok_or_else(|| Error::UnknownField {
                type_name: self.descriptor.name().to_string(),
                field: name.to_string(),
            })
    }

    fn check_type(&self, field: &FieldDescriptor, value: &Value) -> Result<()> {
        let mismatch = |found: &str| Error::TypeMismatch {
            path: field.path().to_string(),
            expected: field.type_codes(),
            found: found.to_string(),
        };

        match value {
            Value::Primitive(primitive) => {
                if field.type_ref(primitive.ty.code()).is_none() {
                    return Err(mismatch(primitive.ty.code()));
                }
                if let Some(v) = &primitive.value {
                    if !primitive.ty.accepts(v) {
                        return Err(Error::InvalidPrimitive {
                            type_code: primitive.ty.code().to_string(),
                            value: v.to_string(),
                        });
                    }
                }
                Ok(())
            }
            Value::Element(instance) => {
                let name = instance.type_name();
                if field.type_ref(name).is_some() {
                    // Same name is not enough: the descriptor must be the registered one
                    return match self.registry.get(name) {
                        Some(registered) if Arc::ptr_eq(registered, &instance.descriptor) => Ok(()),
                        _ => Err(mismatch(&format!("{} (foreign descriptor)", name))),
                    };
                }
                if instance.is_resource() && field.type_ref(ANY_RESOURCE).is_some() {
                    return Ok(());
                }
                Err(mismatch(name))
            }
        }
    }
}

fn too_many(field: &FieldDescriptor, count: usize) -> Error {
    Error::Cardinality {
        path: field.path().to_string(),
        message: format!(
            "field allows {}, {} values would be stored",
            field.cardinality(),
            count
        ),
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor.name() == other.descriptor.name() && self.slots == other.slots
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.descriptor.name());
        for (field, values) in self.fields() {
            if field.is_repeating() {
                s.field(field.name(), &values);
            } else {
                s.field(field.name(), &values[0]);
            }
        }
        s.finish()
    }
}

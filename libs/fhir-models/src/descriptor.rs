//! Type and field descriptors
//!
//! A [`TypeDescriptor`] is the immutable, load-once description of one FHIR
//! type (a resource, a datatype or a nested backbone element such as
//! `AuditEvent.Agent`). Its ordered [`FieldDescriptor`]s drive instance
//! access, serialization and validation.

use crate::error::{Error, Result};
use crate::primitive::PrimitiveType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Wire names that cannot be used as identifiers and get a `local_` prefix
const RESERVED_WORDS: &[&str] = &["class"];

/// Type code accepted by fields holding any resource (`contained`)
pub const ANY_RESOURCE: &str = "Resource";

/// Kind of FHIR type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    /// FHIR Resource (e.g., AuditEvent, Encounter)
    Resource,
    /// Complex datatype (e.g., Coding, Reference)
    ComplexType,
    /// Backbone element (nested complex element within a resource)
    BackboneElement,
}

/// Cardinality of a field (min..max)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    /// Minimum occurrences
    pub min: u32,
    /// Maximum occurrences (None means unbounded/*)
    pub max: Option<u32>,
}

impl Cardinality {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn optional() -> Self {
        Self::new(0, Some(1))
    }

    pub fn many() -> Self {
        Self::new(0, None)
    }

    /// Check if this field is a list/array
    pub fn is_array(&self) -> bool {
        self.max.map(|m| m > 1).unwrap_or(true)
    }

    /// Check if this field is optional
    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    /// Check if this field is required
    pub fn is_required(&self) -> bool {
        self.min > 0
    }

    /// Whether `count` occurrences exceed the upper bound
    pub fn exceeds_max(&self, count: usize) -> bool {
        self.max.is_some_and(|max| count > max as usize)
    }

    /// Whether `count` occurrences satisfy both bounds
    pub fn allows(&self, count: usize) -> bool {
        count >= self.min as usize && !self.exceeds_max(count)
    }

    fn check(&self) -> bool {
        self.max.map_or(true, |max| max >= 1 && self.min <= max)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}

/// Type reference for a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Type code (e.g., "string", "CodeableConcept", "AuditEvent.Agent")
    pub code: String,
    /// Target resource types (for Reference and canonical fields)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_profiles: Vec<String>,
}

impl TypeRef {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            target_profiles: Vec::new(),
        }
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_profiles = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        PrimitiveType::from_code(&self.code)
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive().is_some()
    }

    /// Suffix used by choice fields (`string` → `String`)
    pub fn choice_suffix(&self) -> String {
        capitalize_first(&self.code)
    }

    /// Whether a reference to `resource_type` satisfies the target profiles
    pub fn allows_target(&self, resource_type: &str) -> bool {
        self.target_profiles.is_empty()
            || self
                .target_profiles
                .iter()
                .any(|t| t == ANY_RESOURCE || t == resource_type)
    }
}

/// Binding strength (required > extensible > preferred > example)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

impl BindingStrength {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "required" => Some(Self::Required),
            "extensible" => Some(Self::Extensible),
            "preferred" => Some(Self::Preferred),
            "example" => Some(Self::Example),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Extensible => "extensible",
            Self::Preferred => "preferred",
            Self::Example => "example",
        }
    }
}

/// Terminology binding of a coded field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub strength: BindingStrength,
    /// Canonical URL of the bound value set
    pub value_set: Option<String>,
    /// Permitted codes keyed by code system URI
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub codes: IndexMap<String, Vec<String>>,
}

impl Binding {
    pub fn new(strength: BindingStrength) -> Self {
        Self {
            strength,
            value_set: None,
            codes: IndexMap::new(),
        }
    }

    pub fn with_value_set(mut self, url: impl Into<String>) -> Self {
        self.value_set = Some(url.into());
        self
    }

    pub fn with_codes<I, S>(mut self, system: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codes
            .entry(system.into())
            .or_default()
            .extend(codes.into_iter().map(Into::into));
        self
    }

    /// Whether a code table is known for this binding
    pub fn has_codes(&self) -> bool {
        !self.codes.is_empty()
    }

    /// Check a code against the table. A code without a system matches
    /// any listed system.
    pub fn permits(&self, system: Option<&str>, code: &str) -> bool {
        match system {
            Some(system) => self
                .codes
                .get(system)
                .is_some_and(|codes| codes.iter().any(|c| c == code)),
            None => self
                .codes
                .values()
                .any(|codes| codes.iter().any(|c| c == code)),
        }
    }
}

/// How a field is represented in XML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Representation {
    #[default]
    Element,
    /// Written as an attribute (`Element.id`, `Extension.url`)
    XmlAttr,
    /// Embedded XHTML (`Narrative.div`)
    Xhtml,
}

/// Describes one field of a type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    name: String,
    wire_name: String,
    path: String,
    types: Vec<TypeRef>,
    cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    binding: Option<Binding>,
    is_choice: bool,
    representation: Representation,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_reference: Option<String>,
    is_modifier: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    short: Option<String>,
}

impl FieldDescriptor {
    /// Create a field from its wire name (`status`, `value[x]`, `class`).
    ///
    /// A trailing `[x]` marks a choice field; reserved words get an internal
    /// `local_` name while keeping their wire name.
    pub fn new(
        wire_name: &str,
        path: impl Into<String>,
        types: Vec<TypeRef>,
        cardinality: Cardinality,
    ) -> Result<Self> {
        let path = path.into();
        let (wire_name, is_choice) = match wire_name.strip_suffix("[x]") {
            Some(base) => (base.to_string(), true),
            None => (wire_name.to_string(), false),
        };

        if wire_name.is_empty() {
            return Err(Error::InvalidDefinition(format!("{}: empty field name", path)));
        }
        if types.is_empty() {
            return Err(Error::InvalidDefinition(format!("{}: no declared types", path)));
        }
        if !cardinality.check() {
            return Err(Error::InvalidDefinition(format!(
                "{}: invalid cardinality {}",
                path, cardinality
            )));
        }

        let name = if RESERVED_WORDS.contains(&wire_name.as_str()) {
            format!("local_{}", wire_name)
        } else {
            wire_name.clone()
        };

        Ok(Self {
            name,
            wire_name,
            path,
            types,
            cardinality,
            binding: None,
            is_choice,
            representation: Representation::Element,
            content_reference: None,
            is_modifier: false,
            short: None,
        })
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    pub fn with_content_reference(mut self, reference: impl Into<String>) -> Self {
        self.content_reference = Some(reference.into());
        self
    }

    pub fn with_modifier(mut self, is_modifier: bool) -> Self {
        self.is_modifier = is_modifier;
        self
    }

    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = Some(short.into());
        self
    }

    /// Copy of this field re-rooted under another type (inherited fields)
    pub(crate) fn rebased(&self, parent_path: &str) -> Self {
        let mut field = self.clone();
        let leaf = self.path.rsplit('.').next().unwrap_or(&self.path);
        field.path = format!("{}.{}", parent_path, leaf);
        field
    }

    /// Internal identifier (`local_class` for wire name `class`)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn types(&self) -> &[TypeRef] {
        &self.types
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn is_choice(&self) -> bool {
        self.is_choice
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    pub fn content_reference(&self) -> Option<&str> {
        self.content_reference.as_deref()
    }

    pub fn is_modifier(&self) -> bool {
        self.is_modifier
    }

    pub fn short(&self) -> Option<&str> {
        self.short.as_deref()
    }

    pub fn is_repeating(&self) -> bool {
        self.cardinality.is_array()
    }

    /// The declared type with the given code
    pub fn type_ref(&self, code: &str) -> Option<&TypeRef> {
        self.types.iter().find(|t| t.code == code)
    }

    /// Declared type codes joined for messages (`string|boolean`)
    pub fn type_codes(&self) -> String {
        self.types
            .iter()
            .map(|t| t.code.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Wire name of a choice variant (`value` + `string` → `valueString`)
    pub fn choice_wire_name(&self, type_code: &str) -> String {
        format!("{}{}", self.wire_name, capitalize_first(type_code))
    }

    /// Resolve a type-suffixed wire key (`valueString`) against this choice field
    pub fn match_choice_key(&self, key: &str) -> Option<&TypeRef> {
        if !self.is_choice {
            return None;
        }
        let suffix = key.strip_prefix(self.wire_name.as_str())?;
        self.types.iter().find(|t| t.choice_suffix() == suffix)
    }
}

/// Result of resolving a wire key against a descriptor
#[derive(Debug, Clone, Copy)]
pub struct WireMatch<'a> {
    pub index: usize,
    pub field: &'a FieldDescriptor,
    /// Concrete type selected by a choice key
    pub choice_type: Option<&'a TypeRef>,
}

/// Describes a resource, datatype or nested element type
#[derive(Debug, Clone, Serialize)]
pub struct TypeDescriptor {
    name: String,
    kind: TypeKind,
    /// Path of the element this type describes (`AuditEvent.agent`)
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<String>,
    is_abstract: bool,
    fields: Vec<FieldDescriptor>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
    #[serde(skip)]
    by_wire: HashMap<String, usize>,
}

impl TypeDescriptor {
    /// Build a descriptor; field names (internal and wire) must be unique.
    pub fn new(
        name: impl Into<String>,
        kind: TypeKind,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self> {
        let name = name.into();
        let mut by_name = HashMap::with_capacity(fields.len());
        let mut by_wire = HashMap::with_capacity(fields.len());

        for (index, field) in fields.iter().enumerate() {
            if by_name.insert(field.name.clone(), index).is_some()
                || by_wire.insert(field.wire_name.clone(), index).is_some()
            {
                return Err(Error::InvalidDefinition(format!(
                    "{}: duplicate field '{}'",
                    name, field.wire_name
                )));
            }
        }

        Ok(Self {
            path: name.clone(),
            name,
            kind,
            url: None,
            base: None,
            is_abstract: false,
            fields,
            by_name,
            by_wire,
        })
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_resource(&self) -> bool {
        self.kind == TypeKind::Resource
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Field by internal name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Resolve a wire key by exact name, then by choice prefix + type suffix
    pub fn resolve_wire(&self, key: &str) -> Option<WireMatch<'_>> {
        if let Some(&index) = self.by_wire.get(key) {
            let field = &self.fields[index];
            if !field.is_choice {
                return Some(WireMatch {
                    index,
                    field,
                    choice_type: None,
                });
            }
        }

        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_choice)
            .find_map(|(index, field)| {
                field.match_choice_key(key).map(|ty| WireMatch {
                    index,
                    field,
                    choice_type: Some(ty),
                })
            })
    }
}

/// Capitalize the first letter of a string
pub(crate) fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, types: &[&str], min: u32, max: Option<u32>) -> FieldDescriptor {
        FieldDescriptor::new(
            name,
            format!("Test.{}", name),
            types.iter().map(|t| TypeRef::new(*t)).collect(),
            Cardinality::new(min, max),
        )
        .unwrap()
    }

    #[test]
    fn cardinality_bounds() {
        let card = Cardinality::new(1, Some(2));
        assert!(card.is_array());
        assert!(card.is_required());
        assert!(!card.allows(0));
        assert!(card.allows(2));
        assert!(card.exceeds_max(3));
        assert_eq!(card.to_string(), "1..2");
        assert_eq!(Cardinality::many().to_string(), "0..*");
        assert!(!Cardinality::optional().is_array());
    }

    #[test]
    fn rejects_inverted_cardinality() {
        let err = FieldDescriptor::new(
            "status",
            "Test.status",
            vec![TypeRef::new("code")],
            Cardinality::new(2, Some(1)),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition(_)));
    }

    #[test]
    fn reserved_word_gets_local_name() {
        let f = field("class", &["Coding"], 1, Some(1));
        assert_eq!(f.name(), "local_class");
        assert_eq!(f.wire_name(), "class");
    }

    #[test]
    fn choice_keys_resolve_by_suffix() {
        let f = field("value[x]", &["string", "boolean", "CodeableConcept"], 1, Some(1));
        assert!(f.is_choice());
        assert_eq!(f.wire_name(), "value");
        assert_eq!(f.choice_wire_name("dateTime"), "valueDateTime");
        assert_eq!(f.match_choice_key("valueBoolean").unwrap().code, "boolean");
        assert_eq!(
            f.match_choice_key("valueCodeableConcept").unwrap().code,
            "CodeableConcept"
        );
        assert!(f.match_choice_key("valueInteger").is_none());
        assert!(f.match_choice_key("value").is_none());
    }

    #[test]
    fn descriptor_rejects_duplicate_fields() {
        let err = TypeDescriptor::new(
            "Test",
            TypeKind::ComplexType,
            vec![
                field("code", &["code"], 0, Some(1)),
                field("code", &["string"], 0, Some(1)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition(_)));
    }

    #[test]
    fn resolve_wire_prefers_exact_names() {
        let descriptor = TypeDescriptor::new(
            "Test",
            TypeKind::ComplexType,
            vec![
                field("value[x]", &["string", "boolean"], 0, Some(1)),
                field("valueSet", &["canonical"], 0, Some(1)),
            ],
        )
        .unwrap();

        let m = descriptor.resolve_wire("valueSet").unwrap();
        assert_eq!(m.field.name(), "valueSet");
        assert!(m.choice_type.is_none());

        let m = descriptor.resolve_wire("valueString").unwrap();
        assert_eq!(m.index, 0);
        assert_eq!(m.choice_type.unwrap().code, "string");

        assert!(descriptor.resolve_wire("value").is_none());
        assert!(descriptor.resolve_wire("unknown").is_none());
    }

    #[test]
    fn binding_code_tables() {
        let binding = Binding::new(BindingStrength::Required)
            .with_codes("http://hl7.org/fhir/audit-event-action", ["C", "R"]);
        assert!(binding.permits(None, "C"));
        assert!(binding.permits(Some("http://hl7.org/fhir/audit-event-action"), "R"));
        assert!(!binding.permits(Some("http://example.org"), "R"));
        assert!(!binding.permits(None, "X"));
    }
}

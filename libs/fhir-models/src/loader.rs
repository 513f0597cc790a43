//! Loader for StructureDefinition-shaped type definitions
//!
//! Reads definitions (differential or snapshot element lists) and turns them
//! into [`TypeDescriptor`]s: one per definition plus one per nested backbone
//! element (`AuditEvent.agent` → `AuditEvent.Agent`). Base definitions are
//! resolved first so inherited fields can be flattened into every type.

use crate::descriptor::{
    capitalize_first, Binding, BindingStrength, Cardinality, FieldDescriptor, Representation,
    TypeDescriptor, TypeKind, TypeRef,
};
use crate::error::{Error, Result};
use crate::registry::TypeRegistry;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;

/// Type codes that introduce a nested element type
const NESTED_BASES: &[&str] = &["BackboneElement", "Element"];

const FHIRPATH_SYSTEM_PREFIX: &str = "http://hl7.org/fhirpath/System.";

/// Builds descriptors from definitions and registers them
#[derive(Debug, Default, Clone)]
pub struct DefinitionLoader {
    /// value set URL → code system URI → codes
    code_tables: HashMap<String, IndexMap<String, Vec<String>>>,
}

impl DefinitionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add code tables used to fill binding codes.
    ///
    /// Shape: `{ "<value set url>": { "<code system uri>": ["code", ...] } }`
    pub fn with_code_tables(mut self, tables: &Value) -> Result<Self> {
        let tables = tables
            .as_object()
            .ok_or_else(|| Error::InvalidDefinition("code tables must be an object".into()))?;

        for (value_set, systems) in tables {
            let systems = systems.as_object().ok_or_else(|| {
                Error::InvalidDefinition(format!("code table '{}' must be an object", value_set))
            })?;
            let entry = self.code_tables.entry(value_set.clone()).or_default();
            for (system, codes) in systems {
                let codes = codes.as_array().ok_or_else(|| {
                    Error::InvalidDefinition(format!(
                        "codes of '{}' in '{}' must be an array",
                        system, value_set
                    ))
                })?;
                entry.entry(system.clone()).or_default().extend(
                    codes
                        .iter()
                        .filter_map(|c| c.as_str())
                        .map(String::from),
                );
            }
        }

        Ok(self)
    }

    pub fn with_code_tables_str(self, json: &str) -> Result<Self> {
        let tables: Value = serde_json::from_str(json)?;
        self.with_code_tables(&tables)
    }

    /// Split a JSON document into definitions: an array, a Bundle or a single definition
    pub fn parse_definitions(json: &str) -> Result<Vec<Value>> {
        let document: Value = serde_json::from_str(json)?;
        Ok(match document {
            Value::Array(items) => items,
            Value::Object(ref obj)
                if obj.get("resourceType").and_then(|v| v.as_str()) == Some("Bundle") =>
            {
                obj.get("entry")
                    .and_then(|v| v.as_array())
                    .map(|entries| {
                        entries
                            .iter()
                            .filter_map(|e| e.get("resource").cloned())
                            .collect()
                    })
                    .unwrap_or_default()
            }
            other => vec![other],
        })
    }

    pub fn load_str(&self, registry: &mut TypeRegistry, json: &str) -> Result<usize> {
        let definitions = Self::parse_definitions(json)?;
        self.load(registry, definitions)
    }

    /// Register all definitions, bases before derived types.
    ///
    /// Returns the number of descriptors registered (nested types included).
    pub fn load(&self, registry: &mut TypeRegistry, definitions: Vec<Value>) -> Result<usize> {
        let mut pending: Vec<Value> = definitions
            .into_iter()
            .filter(|sd| {
                let resource_type = sd.get("resourceType").and_then(|v| v.as_str());
                let kind = sd.get("kind").and_then(|v| v.as_str());
                let keep = matches!(resource_type, None | Some("StructureDefinition"))
                    && !matches!(kind, Some("primitive-type") | Some("logical"));
                if !keep {
                    tracing::debug!(
                        name = sd.get("name").and_then(|v| v.as_str()).unwrap_or("?"),
                        "skipping definition"
                    );
                }
                keep
            })
            .collect();

        let mut count = 0;
        while !pending.is_empty() {
            let (ready, waiting): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|sd| dependencies(sd).iter().all(|d| registry.contains(d)));

            if ready.is_empty() {
                let names: Vec<_> = waiting
                    .iter()
                    .map(|sd| sd.get("name").and_then(|v| v.as_str()).unwrap_or("?"))
                    .collect();
                return Err(Error::InvalidDefinition(format!(
                    "unresolved base types for: {}",
                    names.join(", ")
                )));
            }

            for sd in &ready {
                for descriptor in self.build_definition(sd, registry)? {
                    registry.register(descriptor)?;
                    count += 1;
                }
            }
            pending = waiting;
        }

        Ok(count)
    }

    /// Build the descriptors of one definition; nested types come first, the root last
    fn build_definition(&self, sd: &Value, registry: &TypeRegistry) -> Result<Vec<TypeDescriptor>> {
        let name = sd
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidDefinition("definition missing 'name'".into()))?;

        let kind = match sd.get("kind").and_then(|v| v.as_str()) {
            Some("resource") => TypeKind::Resource,
            Some("complex-type") => TypeKind::ComplexType,
            other => {
                return Err(Error::InvalidDefinition(format!(
                    "{}: unsupported kind {:?}",
                    name, other
                )))
            }
        };

        let is_abstract = sd
            .get("abstract")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let base = sd
            .get("baseDefinition")
            .and_then(|v| v.as_str())
            .map(extract_type_name_from_url);

        let elements: Vec<&Value> = ["differential", "snapshot"]
            .iter()
            .find_map(|key| sd.get(*key).and_then(|s| s.get("element")))
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::InvalidDefinition(format!("{}: missing element list", name)))?
            .iter()
            .collect();

        let inherited = match &base {
            Some(base) => rebase_fields(&*registry.lookup(base)?, name),
            None => Vec::new(),
        };

        let mut out = Vec::new();
        let mut root = self.build_type(registry, name, kind, name, inherited, &elements, &mut out)?;
        root = root.with_abstract(is_abstract);
        if let Some(url) = sd.get("url").and_then(|v| v.as_str()) {
            root = root.with_url(url);
        }
        if let Some(base) = base {
            root = root.with_base(base);
        }
        out.push(root);
        Ok(out)
    }

    /// Build the type rooted at `root_path` from the direct children in `elements`
    #[allow(clippy::too_many_arguments)]
    fn build_type(
        &self,
        registry: &TypeRegistry,
        name: &str,
        kind: TypeKind,
        root_path: &str,
        inherited: Vec<FieldDescriptor>,
        elements: &[&Value],
        out: &mut Vec<TypeDescriptor>,
    ) -> Result<TypeDescriptor> {
        let mut fields = inherited;
        let prefix = format!("{}.", root_path);

        for element in elements {
            let path = element_path(element)?;
            let Some(leaf) = path.strip_prefix(&prefix) else {
                continue;
            };
            if leaf.is_empty() || leaf.contains('.') {
                continue;
            }

            let field = if let Some(reference) = element.get("contentReference").and_then(|v| v.as_str()) {
                let target = nested_type_name(reference.trim_start_matches('#'));
                self.parse_element(element, Some(vec![TypeRef::new(target)]))?
                    .with_content_reference(reference)
            } else if let Some(base_code) = nested_base(element) {
                let nested_name = nested_type_name(path);
                let nested_inherited = rebase_fields(&*registry.lookup(base_code)?, path);
                let child_prefix = format!("{}.", path);
                let children: Vec<&Value> = elements
                    .iter()
                    .copied()
                    .filter(|e| element_path(e).is_ok_and(|p| p.starts_with(&child_prefix)))
                    .collect();

                let nested = self
                    .build_type(
                        registry,
                        &nested_name,
                        TypeKind::BackboneElement,
                        path,
                        nested_inherited,
                        &children,
                        out,
                    )?
                    .with_base(base_code);
                out.push(nested);

                self.parse_element(element, Some(vec![TypeRef::new(nested_name)]))?
            } else {
                self.parse_element(element, None)?
            };

            // Re-declared inherited elements (snapshots, constraints) replace in place
            match fields.iter().position(|f| f.wire_name() == field.wire_name()) {
                Some(index) => fields[index] = field,
                None => fields.push(field),
            }
        }

        Ok(TypeDescriptor::new(name, kind, fields)?.with_path(root_path))
    }

    /// Parse a single element into a field
    fn parse_element(&self, element: &Value, types: Option<Vec<TypeRef>>) -> Result<FieldDescriptor> {
        let path = element_path(element)?;
        let wire_name = path
            .rsplit('.')
            .next()
            .ok_or_else(|| Error::InvalidDefinition(format!("invalid path: {}", path)))?;

        let min = element.get("min").and_then(|v| v.as_u64()).unwrap_or(0);
        let min = u32::try_from(min)
            .map_err(|_| Error::InvalidDefinition(format!("{}: min out of range", path)))?;

        let max = match element.get("max").and_then(|v| v.as_str()) {
            Some("*") => None,
            Some(n) => Some(n.parse::<u32>().map_err(|_| {
                Error::InvalidDefinition(format!("{}: invalid max '{}'", path, n))
            })?),
            None => Some(1),
        };

        let types = match types {
            Some(types) => types,
            None => parse_types(element, path)?,
        };

        let mut field = FieldDescriptor::new(wire_name, path, types, Cardinality::new(min, max))?;

        if let Some(binding) = element.get("binding") {
            field = field.with_binding(self.parse_binding(binding, path)?);
        }

        let is_xml_attr = element
            .get("representation")
            .and_then(|v| v.as_array())
            .is_some_and(|r| r.iter().any(|v| v.as_str() == Some("xmlAttr")));
        if is_xml_attr {
            field = field.with_representation(Representation::XmlAttr);
        } else if field.type_ref("xhtml").is_some() {
            field = field.with_representation(Representation::Xhtml);
        }

        let is_modifier = element
            .get("isModifier")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        field = field.with_modifier(is_modifier);

        if let Some(short) = element.get("short").and_then(|v| v.as_str()) {
            field = field.with_short(short);
        }

        Ok(field)
    }

    fn parse_binding(&self, binding: &Value, path: &str) -> Result<Binding> {
        let strength = binding
            .get("strength")
            .and_then(|v| v.as_str())
            .and_then(BindingStrength::from_code)
            .ok_or_else(|| Error::InvalidDefinition(format!("{}: invalid binding strength", path)))?;

        let mut result = Binding::new(strength);
        if let Some(value_set) = binding.get("valueSet").and_then(|v| v.as_str()) {
            let url = value_set.split('|').next().unwrap_or(value_set);
            if let Some(systems) = self.code_tables.get(url) {
                for (system, codes) in systems {
                    result = result.with_codes(system.clone(), codes.iter().cloned());
                }
            }
            result = result.with_value_set(url);
        }

        Ok(result)
    }
}

fn element_path(element: &Value) -> Result<&str> {
    element
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::InvalidDefinition("element missing 'path'".into()))
}

/// Parse the `type` array of an element
fn parse_types(element: &Value, path: &str) -> Result<Vec<TypeRef>> {
    let specs = element
        .get("type")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::InvalidDefinition(format!("{}: missing 'type'", path)))?;

    specs
        .iter()
        .map(|spec| {
            let code = spec
                .get("code")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::InvalidDefinition(format!("{}: type missing 'code'", path)))?;

            let targets = spec
                .get("targetProfile")
                .and_then(|v| v.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str())
                        .map(extract_type_name_from_url)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            Ok(TypeRef::new(normalize_type_code(code)).with_targets(targets))
        })
        .collect()
}

/// FHIRPath system types used by `id`/`url` elements map to FHIR primitives
fn normalize_type_code(code: &str) -> String {
    match code.strip_prefix(FHIRPATH_SYSTEM_PREFIX) {
        Some("String") => "string".to_string(),
        Some("Boolean") => "boolean".to_string(),
        Some("Integer") => "integer".to_string(),
        Some("Decimal") => "decimal".to_string(),
        Some("Date") => "date".to_string(),
        Some("DateTime") => "dateTime".to_string(),
        Some("Time") => "time".to_string(),
        _ => code.to_string(),
    }
}

/// Base type of a nested element (`BackboneElement` or `Element`), if any
fn nested_base(element: &Value) -> Option<&'static str> {
    let types = element.get("type")?.as_array()?;
    if types.len() != 1 {
        return None;
    }
    let code = types[0].get("code")?.as_str()?;
    NESTED_BASES.iter().copied().find(|base| *base == code)
}

/// Types that must be registered before a definition can be built
fn dependencies(sd: &Value) -> Vec<String> {
    let mut deps: Vec<String> = sd
        .get("baseDefinition")
        .and_then(|v| v.as_str())
        .map(extract_type_name_from_url)
        .into_iter()
        .collect();

    let elements = ["differential", "snapshot"]
        .iter()
        .find_map(|key| sd.get(*key).and_then(|s| s.get("element")))
        .and_then(|v| v.as_array());

    for element in elements.into_iter().flatten() {
        let is_child = element_path(element).is_ok_and(|p| p.contains('.'));
        if !is_child || element.get("contentReference").is_some() {
            continue;
        }
        if let Some(base) = nested_base(element) {
            if !deps.iter().any(|d| d == base) {
                deps.push(base.to_string());
            }
        }
    }

    deps
}

fn rebase_fields(base: &TypeDescriptor, path: &str) -> Vec<FieldDescriptor> {
    base.fields().iter().map(|f| f.rebased(path)).collect()
}

/// Qualified name of a nested type: `CodeSystem.concept.designation` → `CodeSystem.Concept.Designation`
pub fn nested_type_name(path: &str) -> String {
    let mut segments = path.split('.');
    let mut name = segments.next().unwrap_or_default().to_string();
    for segment in segments {
        name.push('.');
        name.push_str(&capitalize_first(segment));
    }
    name
}

/// Extract the type name from a canonical URL
/// E.g., "http://hl7.org/fhir/StructureDefinition/Patient" -> "Patient"
fn extract_type_name_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_definitions() -> Vec<Value> {
        vec![
            json!({
                "resourceType": "StructureDefinition",
                "name": "Element",
                "kind": "complex-type",
                "abstract": true,
                "differential": { "element": [
                    { "path": "Element" },
                    { "path": "Element.id", "max": "1",
                      "type": [{ "code": "http://hl7.org/fhirpath/System.String" }],
                      "representation": ["xmlAttr"] }
                ]}
            }),
            json!({
                "resourceType": "StructureDefinition",
                "name": "BackboneElement",
                "kind": "complex-type",
                "abstract": true,
                "baseDefinition": "http://hl7.org/fhir/StructureDefinition/Element",
                "differential": { "element": [
                    { "path": "BackboneElement" },
                    { "path": "BackboneElement.modifierExtension", "max": "*",
                      "type": [{ "code": "Coding" }] }
                ]}
            }),
        ]
    }

    fn tree_definition() -> Value {
        json!({
            "resourceType": "StructureDefinition",
            "name": "Tree",
            "url": "http://example.org/StructureDefinition/Tree",
            "kind": "resource",
            "differential": { "element": [
                { "path": "Tree" },
                { "path": "Tree.status", "min": 1, "max": "1", "type": [{ "code": "code" }],
                  "binding": { "strength": "required",
                               "valueSet": "http://example.org/ValueSet/status|1.0" } },
                { "path": "Tree.node", "max": "*", "type": [{ "code": "BackboneElement" }] },
                { "path": "Tree.node.label", "max": "1", "type": [{ "code": "string" }] },
                { "path": "Tree.node.value[x]", "max": "1",
                  "type": [{ "code": "string" }, { "code": "boolean" }] },
                { "path": "Tree.node.node", "max": "*", "contentReference": "#Tree.node" },
                { "path": "Tree.owner", "max": "1",
                  "type": [{ "code": "Reference",
                             "targetProfile": ["http://hl7.org/fhir/StructureDefinition/Patient"] }] }
            ]}
        })
    }

    fn load(definitions: Vec<Value>) -> Result<TypeRegistry> {
        let loader = DefinitionLoader::new().with_code_tables(&json!({
            "http://example.org/ValueSet/status": { "http://example.org/status": ["on", "off"] }
        }))?;
        let mut registry = TypeRegistry::new();
        loader.load(&mut registry, definitions)?;
        Ok(registry)
    }

    #[test]
    fn builds_nested_types_and_bindings() {
        let mut definitions = vec![tree_definition()];
        definitions.extend(base_definitions());
        let registry = load(definitions).unwrap();

        let tree = registry.lookup("Tree").unwrap();
        assert_eq!(tree.url(), Some("http://example.org/StructureDefinition/Tree"));
        let status = tree.field("status").unwrap();
        assert!(status.cardinality().is_required());
        let binding = status.binding().unwrap();
        assert_eq!(binding.strength, BindingStrength::Required);
        assert_eq!(binding.value_set.as_deref(), Some("http://example.org/ValueSet/status"));
        assert!(binding.permits(Some("http://example.org/status"), "on"));

        let owner = tree.field("owner").unwrap();
        assert_eq!(owner.types()[0].target_profiles, vec!["Patient".to_string()]);

        let node = registry.lookup("Tree.Node").unwrap();
        assert_eq!(node.kind(), TypeKind::BackboneElement);
        assert_eq!(node.path(), "Tree.node");
        let names: Vec<_> = node.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "modifierExtension", "label", "value", "node"]);
        assert_eq!(node.field("id").unwrap().path(), "Tree.node.id");
        assert_eq!(node.field("id").unwrap().types()[0].code, "string");
        assert_eq!(
            node.field("id").unwrap().representation(),
            Representation::XmlAttr
        );
        assert_eq!(node.field("node").unwrap().types()[0].code, "Tree.Node");
        assert!(node.field("value").unwrap().is_choice());
    }

    #[test]
    fn unresolved_base_is_reported() {
        let err = load(vec![tree_definition()]).unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition(msg) if msg.contains("Tree")));
    }

    #[test]
    fn duplicate_definitions_fail() {
        let mut definitions = base_definitions();
        definitions.extend(base_definitions());
        assert!(matches!(load(definitions).unwrap_err(), Error::DuplicateType(_)));
    }

    #[test]
    fn nested_type_names() {
        assert_eq!(nested_type_name("CodeSystem.concept"), "CodeSystem.Concept");
        assert_eq!(
            nested_type_name("NutritionOrder.oralDiet.nutrient"),
            "NutritionOrder.OralDiet.Nutrient"
        );
    }

    #[test]
    fn test_extract_type_name_from_url() {
        assert_eq!(
            extract_type_name_from_url("http://hl7.org/fhir/StructureDefinition/Patient"),
            "Patient"
        );
        assert_eq!(extract_type_name_from_url("Patient"), "Patient");
    }
}

use ferrum_models::{
    BindingStrength, DefinitionLoader, Error, Instance, TypeKind, TypeRegistry, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn concept(registry: &Arc<TypeRegistry>, code: &str) -> Instance {
    let mut concept = registry.instantiate("CodeSystem.Concept").unwrap();
    concept.set("code", Value::code(code)).unwrap();
    concept
}

fn code_of(concept: &Instance) -> &str {
    concept.first("code").unwrap().unwrap().as_str().unwrap()
}

#[test]
fn concept_hierarchy_nests_through_content_reference() {
    let registry = TypeRegistry::r4();
    let codes = ["body", "limb", "arm", "hand", "finger"];

    let mut nested: Option<Instance> = None;
    for code in codes.iter().rev() {
        let mut current = concept(&registry, code);
        if let Some(child) = nested.take() {
            current.push("concept", child).unwrap();
        }
        nested = Some(current);
    }

    let mut code_system = registry.instantiate("CodeSystem").unwrap();
    code_system.set("status", Value::code("draft")).unwrap();
    code_system.push("concept", nested.unwrap()).unwrap();

    let mut seen = Vec::new();
    let mut level = code_system.first("concept").unwrap();
    while let Some(value) = level {
        let current = value.as_instance().unwrap();
        assert_eq!(current.type_name(), "CodeSystem.Concept");
        seen.push(code_of(current).to_string());
        level = current.first("concept").unwrap();
    }
    assert_eq!(seen, codes);
}

#[test]
fn audit_event_agents_repeat_and_source_is_single() {
    let registry = TypeRegistry::r4();
    let mut event = registry.instantiate("AuditEvent").unwrap();

    for requestor in [true, false] {
        let mut agent = event.instantiate("AuditEvent.Agent").unwrap();
        agent.set("requestor", Value::boolean(requestor)).unwrap();
        event.push("agent", agent).unwrap();
    }
    assert_eq!(event.values("agent").unwrap().len(), 2);

    let source = event.instantiate("AuditEvent.Source").unwrap();
    event.push("source", source.clone()).unwrap();
    assert!(matches!(
        event.push("source", source).unwrap_err(),
        Error::Cardinality { .. }
    ));

    let agent = event.instantiate("AuditEvent.Agent").unwrap();
    assert!(matches!(
        event.set("source", agent).unwrap_err(),
        Error::TypeMismatch { .. }
    ));
}

#[test]
fn descriptors_expose_bindings_and_wire_names() {
    let registry = TypeRegistry::r4();

    let event = registry.lookup("AuditEvent").unwrap();
    let action = event.field("action").unwrap();
    let binding = action.binding().unwrap();
    assert_eq!(binding.strength, BindingStrength::Required);
    for code in ["C", "R", "U", "D", "E"] {
        assert!(binding.permits(None, code), "{}", code);
    }
    assert!(!binding.permits(None, "X"));

    let encounter = registry.lookup("Encounter").unwrap();
    let class = encounter.field("local_class").unwrap();
    assert_eq!(class.wire_name(), "class");
    assert_eq!(class.path(), "Encounter.class");
    assert_eq!(
        encounter.field("type").unwrap().binding().unwrap().strength,
        BindingStrength::Example
    );

    let property = registry.lookup("CodeSystem.Concept.Property").unwrap();
    assert_eq!(property.kind(), TypeKind::BackboneElement);
    let value = property.field("value").unwrap();
    assert!(value.is_choice());
    assert_eq!(value.choice_wire_name("boolean"), "valueBoolean");
}

#[test]
fn loader_registers_custom_types() {
    let definitions = json!([
        {
            "resourceType": "StructureDefinition",
            "name": "Label",
            "kind": "complex-type",
            "abstract": false,
            "type": "Label",
            "differential": { "element": [
                { "path": "Label" },
                { "path": "Label.text", "min": 1, "max": "1", "type": [{ "code": "string" }] },
                { "path": "Label.tag", "min": 0, "max": "2", "type": [{ "code": "code" }],
                  "binding": { "strength": "required", "valueSet": "http://example.org/tags" } }
            ]}
        }
    ]);
    let tables = json!({ "http://example.org/tags": { "http://example.org/tag": ["red", "blue"] } });

    let mut registry = TypeRegistry::new();
    let loader = DefinitionLoader::new().with_code_tables(&tables).unwrap();
    let count = loader
        .load_str(&mut registry, &definitions.to_string())
        .unwrap();
    assert_eq!(count, 1);

    let registry = Arc::new(registry);
    let mut label = registry.instantiate("Label").unwrap();
    label.set("text", Value::string("urgent")).unwrap();
    label.push("tag", Value::code("red")).unwrap();
    label.push("tag", Value::code("blue")).unwrap();
    assert!(matches!(
        label.push("tag", Value::code("red")).unwrap_err(),
        Error::Cardinality { .. }
    ));

    let tag = label.descriptor().field("tag").unwrap();
    assert!(tag.binding().unwrap().permits(Some("http://example.org/tag"), "blue"));
    assert!(matches!(
        registry.lookup("Missing").unwrap_err(),
        Error::UnknownType(_)
    ));
}

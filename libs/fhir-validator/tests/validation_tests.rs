use ferrum_format::from_json_str;
use ferrum_models::{Instance, TypeRegistry, Value};
use ferrum_validator::{
    IssueCode, IssueSeverity, Preset, ValidationOutcome, Validator, ValidatorConfig,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn parse(resource: serde_json::Value) -> Instance {
    from_json_str(&TypeRegistry::r4(), &resource.to_string()).unwrap()
}

fn validate(resource: &Instance) -> ValidationOutcome {
    Validator::from_config(&ValidatorConfig::default())
        .unwrap()
        .validate(resource)
}

fn locations(outcome: &ValidationOutcome, severity: IssueSeverity) -> Vec<&str> {
    outcome
        .issues
        .iter()
        .filter(|i| i.severity == severity)
        .filter_map(|i| i.location.as_deref())
        .collect()
}

fn audit_event() -> serde_json::Value {
    json!({
        "resourceType": "AuditEvent",
        "id": "ae1",
        "type": { "system": "http://dicom.nema.org/resources/ontology/DCM", "code": "110100" },
        "action": "E",
        "recorded": "2026-01-05T10:00:00Z",
        "outcome": "0",
        "agent": [{
            "who": { "reference": "Practitioner/p1" },
            "requestor": true,
            "network": { "address": "10.0.0.1", "type": "2" }
        }],
        "source": {
            "observer": { "reference": "Device/d1" },
            "type": [{ "system": "http://terminology.hl7.org/CodeSystem/security-source-type", "code": "4" }]
        },
        "entity": [{
            "what": { "reference": "Patient/p1" },
            "type": { "system": "http://terminology.hl7.org/CodeSystem/audit-entity-type", "code": "1" },
            "role": { "system": "http://terminology.hl7.org/CodeSystem/object-role", "code": "1" }
        }]
    })
}

fn encounter() -> serde_json::Value {
    json!({
        "resourceType": "Encounter",
        "status": "finished",
        "class": { "system": "http://terminology.hl7.org/CodeSystem/v3-ActCode", "code": "AMB" },
        "type": [{
            "coding": [{ "system": "http://terminology.hl7.org/CodeSystem/encounter-type", "code": "ADMS" }]
        }],
        "subject": { "reference": "Patient/p1" }
    })
}

#[test]
fn valid_audit_event_has_no_issues() {
    let outcome = validate(&parse(audit_event()));

    assert_eq!(outcome.resource_type.as_deref(), Some("AuditEvent"));
    assert!(outcome.valid, "{:?}", outcome.issues);
    assert!(outcome.issues.is_empty(), "{:?}", outcome.issues);
}

#[test]
fn missing_source_is_exactly_one_cardinality_error() {
    let mut resource = audit_event();
    resource.as_object_mut().unwrap().remove("source");

    let outcome = validate(&parse(resource));

    assert!(!outcome.valid);
    assert_eq!(outcome.issues.len(), 1, "{:?}", outcome.issues);
    let issue = &outcome.issues[0];
    assert_eq!(issue.severity, IssueSeverity::Error);
    assert_eq!(issue.code, IssueCode::Required);
    assert_eq!(issue.location.as_deref(), Some("AuditEvent.source"));
}

#[test]
fn nested_locations_carry_indexes() {
    let mut resource = audit_event();
    resource["agent"][0].as_object_mut().unwrap().remove("requestor");

    let outcome = validate(&parse(resource));

    assert_eq!(
        locations(&outcome, IssueSeverity::Error),
        vec!["AuditEvent.agent[0].requestor"]
    );
}

#[test]
fn action_outside_required_binding_is_an_error() {
    let mut resource = audit_event();
    resource["action"] = json!("X");

    let outcome = validate(&parse(resource));

    assert!(!outcome.valid);
    assert_eq!(outcome.error_count(), 1);
    let issue = &outcome.issues[0];
    assert_eq!(issue.code, IssueCode::CodeInvalid);
    assert_eq!(issue.location.as_deref(), Some("AuditEvent.action"));
}

#[test]
fn every_action_code_is_accepted() {
    for action in ["C", "R", "U", "D", "E"] {
        let mut event = parse(audit_event());
        event.set("action", Value::code(action)).unwrap();
        assert!(validate(&event).issues.is_empty(), "action {}", action);
    }
}

#[test]
fn encounter_type_outside_example_binding_is_only_a_warning() {
    let mut resource = encounter();
    resource["type"][0]["coding"][0]["code"] = json!("NOT-A-TYPE");

    let outcome = validate(&parse(resource));

    assert!(outcome.valid);
    assert_eq!(outcome.error_count(), 0);
    assert_eq!(outcome.warning_count(), 1);
    assert_eq!(
        locations(&outcome, IssueSeverity::Warning),
        vec!["Encounter.type[0]"]
    );
    assert_eq!(outcome.issues[0].code, IssueCode::CodeInvalid);
}

#[test]
fn extensible_handling_follows_the_preset() {
    let mut resource = encounter();
    resource["class"]["code"] = json!("XYZ");
    let encounter = parse(resource);

    let standard = validate(&encounter);
    assert!(standard.valid);
    assert_eq!(locations(&standard, IssueSeverity::Warning), vec!["Encounter.class"]);

    let strict = Validator::from_config(&ValidatorConfig::preset(Preset::Strict))
        .unwrap()
        .validate(&encounter);
    assert!(!strict.valid);
    assert_eq!(locations(&strict, IssueSeverity::Error), vec!["Encounter.class"]);
}

#[test]
fn two_choice_variants_are_an_error() {
    let code_system = parse(json!({
        "resourceType": "CodeSystem",
        "status": "draft",
        "content": "complete",
        "concept": [{
            "code": "a",
            "property": [{ "code": "flag", "valueBoolean": true, "valueString": "yes" }]
        }]
    }));

    let outcome = validate(&code_system);

    assert!(!outcome.valid);
    assert_eq!(outcome.issues.len(), 1, "{:?}", outcome.issues);
    let issue = &outcome.issues[0];
    assert_eq!(issue.code, IssueCode::Structure);
    assert_eq!(
        issue.location.as_deref(),
        Some("CodeSystem.concept[0].property[0].value")
    );
    assert!(issue.diagnostics.contains("valueBoolean, valueString"));
}

#[test]
fn reference_to_wrong_resource_type_is_an_error() {
    let mut resource = encounter();
    resource["subject"]["reference"] = json!("Device/d1");

    let outcome = validate(&parse(resource));

    assert_eq!(
        locations(&outcome, IssueSeverity::Error),
        vec!["Encounter.subject.reference"]
    );
    assert_eq!(outcome.issues[0].code, IssueCode::Structure);
}

#[test]
fn contained_resources_are_validated() {
    let mut resource = encounter();
    resource["contained"] = json!([{
        "resourceType": "Goal",
        "id": "g1",
        "description": { "text": "Walk daily" },
        "subject": { "reference": "Patient/p1" }
    }]);

    let outcome = validate(&parse(resource));

    assert_eq!(
        locations(&outcome, IssueSeverity::Error),
        vec!["Encounter.contained[0].lifecycleStatus"]
    );
}

#[test]
fn all_findings_are_collected() {
    let mut resource = audit_event();
    resource.as_object_mut().unwrap().remove("source");
    resource["action"] = json!("X");
    resource["agent"][0]["who"]["reference"] = json!("Goal/g1");

    let outcome = validate(&parse(resource));
    assert_eq!(outcome.error_count(), 3, "{:?}", outcome.issues);

    let fail_fast = Validator::from_config(&ValidatorConfig::builder().fail_fast(true).build())
        .unwrap()
        .validate(&parse({
            let mut r = audit_event();
            r.as_object_mut().unwrap().remove("source");
            r["action"] = json!("X");
            r
        }));
    assert_eq!(fail_fast.error_count(), 1);
    assert_eq!(fail_fast.issues[0].code, IssueCode::Required);
}

#[test]
fn max_issues_caps_the_outcome() {
    let empty = TypeRegistry::r4().instantiate("AuditEvent").unwrap();

    let all = validate(&empty);
    assert_eq!(all.error_count(), 4, "{:?}", all.issues);

    let capped = Validator::from_config(&ValidatorConfig::builder().max_issues(2).build())
        .unwrap()
        .validate(&empty);
    assert_eq!(capped.issues.len(), 2);
    assert!(!capped.valid);
}

#[test]
fn operation_outcome_lists_issues() {
    let mut resource = audit_event();
    resource.as_object_mut().unwrap().remove("source");

    let outcome = validate(&parse(resource)).to_operation_outcome();

    assert_eq!(outcome["resourceType"], "OperationOutcome");
    assert_eq!(outcome["issue"][0]["severity"], "error");
    assert_eq!(outcome["issue"][0]["code"], "required");
    assert_eq!(outcome["issue"][0]["location"], json!(["AuditEvent.source"]));
}

use ferrum_format::from_json_str;
use ferrum_models::TypeRegistry;
use ferrum_validator::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example 1: Using presets
    let structural = ValidatorConfig::preset(Preset::Structural);
    let plan = structural.compile()?;
    println!("Structural plan has {} steps", plan.steps.len());

    // Example 2: Builder pattern
    let custom_cfg = ValidatorConfig::builder()
        .preset(Preset::Strict)
        .reference_mode(ReferenceMode::Off)
        .fail_fast(true)
        .max_issues(500)
        .build();

    let plan = custom_cfg.compile()?;
    println!("Custom plan has {} steps", plan.steps.len());

    // Example 3: YAML configuration
    let yaml = r#"
schema:
  cardinality: true
  choice: true
terminology:
  mode: Local
  extensible_handling: Error
exec:
  fail_fast: false
  max_issues: 100
"#;

    let cfg = ValidatorConfig::from_yaml(yaml)?;
    let validator = Validator::from_config(&cfg)?;

    // Example 4: Validating a parsed resource
    let event = from_json_str(
        &TypeRegistry::r4(),
        r#"{
            "resourceType": "AuditEvent",
            "type": { "system": "http://dicom.nema.org/resources/ontology/DCM", "code": "110100" },
            "action": "X",
            "recorded": "2026-01-05T10:00:00Z",
            "agent": [{ "requestor": true }]
        }"#,
    )?;

    let outcome = validator.validate(&event);
    for issue in &outcome.issues {
        println!(
            "{} [{}] {}: {}",
            issue.severity,
            issue.code,
            issue.location.as_deref().unwrap_or("-"),
            issue.diagnostics
        );
    }

    // Example 5: Error handling
    let empty_cfg = ValidatorConfig::builder()
        .cardinality(false)
        .choice(false)
        .terminology_mode(TerminologyMode::Off)
        .reference_mode(ReferenceMode::Off)
        .build();

    match empty_cfg.compile() {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Caught expected error: {}", e),
    }

    // Example 6: Export to YAML
    let yaml_output = ValidatorConfig::preset(Preset::Strict).to_yaml()?;
    println!("\nStrict preset as YAML:\n{}", yaml_output);

    Ok(())
}

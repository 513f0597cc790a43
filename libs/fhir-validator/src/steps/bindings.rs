//! Terminology bindings checked against the embedded code tables
//!
//! Coded values are `code` primitives, `Coding`, `CodeableConcept` and
//! `Quantity`-like elements (anything with `system` and `code`). A
//! `CodeableConcept` passes when one of its codings is listed. Bindings
//! without a code table are skipped.

use super::{value_location, Walker};
use crate::validator::{IssueCode, IssueSeverity, ValidationIssue};
use crate::{BindingsPlan, ExtensibleHandling};
use ferrum_models::{Binding, BindingStrength, Instance, Value};

pub fn validate_bindings(walker: &Walker<'_>, plan: &BindingsPlan, issues: &mut Vec<ValidationIssue>) {
    walker.visit(|instance, location| {
        for (field, values) in instance.fields() {
            let Some(binding) = field.binding().filter(|b| b.has_codes()) else {
                continue;
            };

            for (index, value) in values.iter().enumerate() {
                let codes = coded_values(value);
                if codes.is_empty() || codes.iter().any(|(system, code)| binding.permits(*system, code)) {
                    continue;
                }

                let listed: Vec<String> = codes
                    .iter()
                    .map(|(system, code)| match system {
                        Some(system) => format!("{}#{}", system, code),
                        None => code.to_string(),
                    })
                    .collect();

                let diagnostics = format!(
                    "Code '{}' is not in value set '{}' ({} binding)",
                    listed.join("', '"),
                    binding.value_set.as_deref().unwrap_or("(unnamed)"),
                    binding.strength.code()
                );
                let issue = match severity(binding, plan) {
                    IssueSeverity::Error => ValidationIssue::error(IssueCode::CodeInvalid, diagnostics),
                    IssueSeverity::Warning => {
                        ValidationIssue::warning(IssueCode::CodeInvalid, diagnostics)
                    }
                };

                issues.push(
                    issue
                        .with_location(value_location(location, field, value, index))
                        .with_expression(vec![field.path().to_string()]),
                );
            }
        }
    });
}

fn severity(binding: &Binding, plan: &BindingsPlan) -> IssueSeverity {
    match binding.strength {
        BindingStrength::Required => IssueSeverity::Error,
        BindingStrength::Extensible => match plan.extensible_handling {
            ExtensibleHandling::Error => IssueSeverity::Error,
            ExtensibleHandling::Warn => IssueSeverity::Warning,
        },
        BindingStrength::Preferred | BindingStrength::Example => IssueSeverity::Warning,
    }
}

/// `(system, code)` pairs carried by a value
fn coded_values(value: &Value) -> Vec<(Option<&str>, &str)> {
    match value {
        Value::Primitive(_) => value.as_str().map(|code| (None, code)).into_iter().collect(),
        Value::Element(instance) if instance.type_name() == "CodeableConcept" => instance
            .values("coding")
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_instance)
            .filter_map(system_and_code)
            .collect(),
        Value::Element(instance) => system_and_code(instance).into_iter().collect(),
    }
}

fn system_and_code(instance: &Instance) -> Option<(Option<&str>, &str)> {
    let descriptor = instance.descriptor();
    if descriptor.field("system").is_none() || descriptor.field("code").is_none() {
        return None;
    }
    let code = text(instance, "code")?;
    Some((text(instance, "system"), code))
}

fn text<'a>(instance: &'a Instance, name: &str) -> Option<&'a str> {
    instance.first(name).ok().flatten().and_then(Value::as_str)
}

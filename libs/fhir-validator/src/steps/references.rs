//! Reference target checks
//!
//! Relative references (`Patient/123`, `Patient/123/_history/2`) must point
//! to one of the field's target resource types. Absolute URLs, URNs and
//! local `#id` references are not resolved.

use super::{value_location, Walker};
use crate::validator::{IssueCode, ValidationIssue};
use crate::ReferencesPlan;
use ferrum_models::{FieldDescriptor, TypeRef, Value};

const REFERENCE: &str = "Reference";

pub fn validate_references(
    walker: &Walker<'_>,
    _plan: &ReferencesPlan,
    issues: &mut Vec<ValidationIssue>,
) {
    walker.visit(|instance, location| {
        for (field, values) in instance.fields() {
            let Some(type_ref) = reference_type(field) else {
                continue;
            };

            for (index, value) in values.iter().enumerate() {
                let Some(reference) = value
                    .as_instance()
                    .filter(|r| r.type_name() == REFERENCE)
                    .and_then(|r| r.first("reference").ok().flatten())
                    .and_then(Value::as_str)
                else {
                    continue;
                };

                let Some(target) = relative_target(reference) else {
                    continue;
                };
                if type_ref.allows_target(target) {
                    continue;
                }

                issues.push(
                    ValidationIssue::error(
                        IssueCode::Structure,
                        format!(
                            "Reference '{}' points to {}, but only {} are allowed",
                            reference,
                            target,
                            type_ref.target_profiles.join(", ")
                        ),
                    )
                    .with_location(format!(
                        "{}.reference",
                        value_location(location, field, value, index)
                    ))
                    .with_expression(vec![field.path().to_string()]),
                );
            }
        }
    });
}

fn reference_type(field: &FieldDescriptor) -> Option<&TypeRef> {
    field
        .type_ref(REFERENCE)
        .filter(|t| !t.target_profiles.is_empty())
}

/// Resource type of a relative reference
fn relative_target(reference: &str) -> Option<&str> {
    if reference.starts_with('#') || reference.contains(':') {
        return None;
    }

    let parts: Vec<&str> = reference.split('/').collect();
    let well_formed = match parts.as_slice() {
        [_, id] => !id.is_empty(),
        [_, id, "_history", version] => !id.is_empty() && !version.is_empty(),
        _ => false,
    };
    let resource_type = parts[0];
    let is_type_name = resource_type.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && resource_type.chars().all(|c| c.is_ascii_alphanumeric());

    (well_formed && is_type_name).then_some(resource_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_targets() {
        assert_eq!(relative_target("Patient/123"), Some("Patient"));
        assert_eq!(relative_target("Patient/123/_history/2"), Some("Patient"));
        assert_eq!(relative_target("#g1"), None);
        assert_eq!(relative_target("http://example.org/fhir/Patient/1"), None);
        assert_eq!(relative_target("urn:uuid:0c3151bd-1cbf-4d64-b04d-cd9187a4c6e0"), None);
        assert_eq!(relative_target("patient/1"), None);
        assert_eq!(relative_target("Patient"), None);
    }
}

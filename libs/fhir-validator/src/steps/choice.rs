//! Choice fields hold at most one variant

use super::{field_location, Walker};
use crate::validator::{IssueCode, ValidationIssue};
use crate::ChoicePlan;

pub fn validate_choices(walker: &Walker<'_>, _plan: &ChoicePlan, issues: &mut Vec<ValidationIssue>) {
    walker.visit(|instance, location| {
        for (field, values) in instance.fields() {
            if !field.is_choice() || values.len() < 2 {
                continue;
            }

            let variants: Vec<String> = values
                .iter()
                .map(|v| field.choice_wire_name(v.type_code()))
                .collect();
            let path = field_location(location, field);

            issues.push(
                ValidationIssue::error(
                    IssueCode::Structure,
                    format!(
                        "Choice element '{}[x]' allows one type, but found {}: {}",
                        path,
                        values.len(),
                        variants.join(", ")
                    ),
                )
                .with_location(path)
                .with_expression(vec![field.path().to_string()]),
            );
        }
    });
}

//! Cardinality validation (`min..max` per field)

use super::{field_location, Walker};
use crate::validator::{IssueCode, ValidationIssue};
use crate::CardinalityPlan;

pub fn validate_cardinality(
    walker: &Walker<'_>,
    plan: &CardinalityPlan,
    issues: &mut Vec<ValidationIssue>,
) {
    walker.visit(|instance, location| {
        for (index, field) in instance.descriptor().fields().iter().enumerate() {
            let count = instance.slot(index).len();
            let cardinality = field.cardinality();

            let code = if count < cardinality.min as usize {
                IssueCode::Required
            } else if cardinality.exceeds_max(count) && !(field.is_choice() && plan.skip_choice_max) {
                IssueCode::Structure
            } else {
                continue;
            };

            let path = field_location(location, field);
            issues.push(
                ValidationIssue::error(
                    code,
                    format!(
                        "Element '{}' has cardinality {}, but found {} occurrence(s)",
                        path, cardinality, count
                    ),
                )
                .with_location(path)
                .with_expression(vec![field.path().to_string()]),
            );
        }
    });
}

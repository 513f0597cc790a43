use crate::steps::Walker;
use crate::{ConfigError, Step, ValidationPlan};
use ferrum_models::Instance;
use serde_json::Value;

/// Reusable validator - owns the compiled plan
#[derive(Debug, Clone)]
pub struct Validator {
    plan: ValidationPlan,
}

impl Validator {
    pub fn new(plan: ValidationPlan) -> Self {
        Self { plan }
    }

    pub fn from_config(config: &crate::ValidatorConfig) -> Result<Self, ConfigError> {
        let plan = config.compile()?;
        Ok(Self::new(plan))
    }

    /// Validate an instance, collecting every finding
    pub fn validate(&self, resource: &Instance) -> ValidationOutcome {
        ValidationRun::new(&self.plan, resource).execute()
    }

    pub fn validate_batch(&self, resources: &[Instance]) -> Vec<ValidationOutcome> {
        resources.iter().map(|r| self.validate(r)).collect()
    }

    pub fn plan(&self) -> &ValidationPlan {
        &self.plan
    }
}

/// Short-lived validation execution
struct ValidationRun<'a> {
    plan: &'a ValidationPlan,
    resource: &'a Instance,
    issues: Vec<ValidationIssue>,
}

impl<'a> ValidationRun<'a> {
    fn new(plan: &'a ValidationPlan, resource: &'a Instance) -> Self {
        Self {
            plan,
            resource,
            issues: Vec::new(),
        }
    }

    fn execute(mut self) -> ValidationOutcome {
        for step in &self.plan.steps {
            if self.plan.fail_fast && self.has_errors() {
                break;
            }

            if self.issues.len() >= self.plan.max_issues {
                break;
            }

            self.execute_step(step);
        }
        let valid = !self.has_errors();
        self.issues.truncate(self.plan.max_issues);

        let outcome = ValidationOutcome {
            resource_type: Some(self.resource.type_name().to_string()),
            valid,
            issues: self.issues,
        };
        tracing::debug!(
            resource_type = %self.resource.type_name(),
            errors = outcome.error_count(),
            warnings = outcome.warning_count(),
            "validation finished"
        );
        outcome
    }

    fn execute_step(&mut self, step: &Step) {
        let before = self.issues.len();
        let walker = Walker::new(self.resource);

        match step {
            Step::Cardinality(plan) => {
                crate::steps::cardinality::validate_cardinality(&walker, plan, &mut self.issues)
            }
            Step::Choice(plan) => {
                crate::steps::choice::validate_choices(&walker, plan, &mut self.issues)
            }
            Step::Bindings(plan) => {
                crate::steps::bindings::validate_bindings(&walker, plan, &mut self.issues)
            }
            Step::References(plan) => {
                crate::steps::references::validate_references(&walker, plan, &mut self.issues)
            }
        }

        tracing::trace!(
            step = step.name(),
            issues = self.issues.len() - before,
            "validation step done"
        );
    }

    fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Error)
    }
}

/// Validation result for a single resource
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub resource_type: Option<String>,
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    pub fn has_errors(&self) -> bool {
        !self.valid
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .count()
    }

    pub fn to_operation_outcome(&self) -> Value {
        serde_json::json!({
            "resourceType": "OperationOutcome",
            "issue": self.issues.iter().map(|i| i.to_json()).collect::<Vec<_>>()
        })
    }
}

/// Individual validation issue
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: IssueCode,
    pub diagnostics: String,
    pub location: Option<String>,
    pub expression: Option<Vec<String>>,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, diagnostics: String) -> Self {
        Self {
            severity: IssueSeverity::Error,
            code,
            diagnostics,
            location: None,
            expression: None,
        }
    }

    pub fn warning(code: IssueCode, diagnostics: String) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            code,
            diagnostics,
            location: None,
            expression: None,
        }
    }

    pub fn with_location(mut self, location: String) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_expression(mut self, expression: Vec<String>) -> Self {
        self.expression = Some(expression);
        self
    }

    fn to_json(&self) -> Value {
        let mut issue = serde_json::json!({
            "severity": self.severity.to_string().to_lowercase(),
            "code": self.code.to_string(),
            "diagnostics": self.diagnostics,
        });

        if let Some(ref loc) = self.location {
            issue["location"] = serde_json::json!([loc]);
        }

        if let Some(ref expr) = self.expression {
            issue["expression"] = serde_json::json!(expr);
        }

        issue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "Error"),
            Self::Warning => write!(f, "Warning"),
        }
    }
}

/// OperationOutcome issue types reported by the validation steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    /// Element count above its maximum, or an invalid reference
    Structure,
    /// Element count below its minimum
    Required,
    /// Code outside its binding
    CodeInvalid,
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Structure => "structure",
            Self::Required => "required",
            Self::CodeInvalid => "code-invalid",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_outcome_operations() {
        let outcome = ValidationOutcome {
            resource_type: Some("AuditEvent".to_string()),
            valid: false,
            issues: vec![
                ValidationIssue::error(IssueCode::Required, "Missing required element source".to_string()),
                ValidationIssue::warning(IssueCode::CodeInvalid, "Code not in example value set".to_string()),
            ],
        };

        assert!(!outcome.valid);
        assert!(outcome.has_errors());
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.warning_count(), 1);
    }

    #[test]
    fn test_operation_outcome_conversion() {
        let outcome = ValidationOutcome {
            resource_type: Some("AuditEvent".to_string()),
            valid: false,
            issues: vec![ValidationIssue::error(
                IssueCode::Required,
                "source is required".to_string(),
            )
            .with_location("AuditEvent.source".to_string())
            .with_expression(vec!["AuditEvent.source".to_string()])],
        };

        let op_outcome = outcome.to_operation_outcome();
        assert_eq!(op_outcome["resourceType"], "OperationOutcome");
        assert_eq!(op_outcome["issue"][0]["severity"], "error");
        assert_eq!(op_outcome["issue"][0]["code"], "required");
        assert_eq!(op_outcome["issue"][0]["location"][0], "AuditEvent.source");
    }

    #[test]
    fn issue_codes_use_operation_outcome_names() {
        let codes: Vec<String> = [IssueCode::Structure, IssueCode::Required, IssueCode::CodeInvalid]
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(codes, vec!["structure", "required", "code-invalid"]);
        assert_eq!(IssueSeverity::Warning.to_string(), "Warning");
    }
}

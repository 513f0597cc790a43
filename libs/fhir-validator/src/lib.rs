//! FHIR instance validation.
//!
//! A [`ValidatorConfig`] is compiled once into a [`ValidationPlan`]; the
//! [`Validator`] runs the plan against instances and collects every finding
//! into a [`ValidationOutcome`] instead of stopping at the first one.
//!
//! Steps:
//! - cardinality: `min..max` of every field
//! - choice: at most one variant per choice field
//! - bindings: codes against the embedded code tables
//! - references: relative reference types against target profiles
//!
//! ```
//! use ferrum_models::{TypeRegistry, Value};
//! use ferrum_validator::{IssueCode, Validator, ValidatorConfig};
//!
//! let registry = TypeRegistry::r4();
//! let mut event = registry.instantiate("AuditEvent").unwrap();
//! event.set("action", Value::code("X")).unwrap();
//!
//! let validator = Validator::from_config(&ValidatorConfig::default()).unwrap();
//! let outcome = validator.validate(&event);
//! assert!(!outcome.valid);
//! assert!(outcome.issues.iter().any(|i| i.code == IssueCode::CodeInvalid));
//! ```

mod config;
mod error;
mod plan;
mod steps;
mod validator;

pub use config::{
    ExecConfig, ExtensibleHandling, Preset, ReferenceMode, ReferencesConfig, SchemaConfig,
    TerminologyConfig, TerminologyMode, ValidatorConfig, ValidatorConfigBuilder,
};
pub use error::ConfigError;
pub use plan::{BindingsPlan, CardinalityPlan, ChoicePlan, ReferencesPlan, Step, ValidationPlan};
pub use validator::{IssueCode, IssueSeverity, ValidationIssue, ValidationOutcome, Validator};

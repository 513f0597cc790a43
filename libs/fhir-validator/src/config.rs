//! Validator configuration
//!
//! Configurations are plain serde structs (loadable from YAML) and get
//! compiled into a [`ValidationPlan`] once.

use crate::plan::{
    BindingsPlan, CardinalityPlan, ChoicePlan, ReferencesPlan, Step, ValidationPlan,
};
use crate::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// Cardinality and choice checks only
    Structural,
    /// Every step, extensible bindings as warnings
    Standard,
    /// Every step, extensible bindings as errors
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminologyMode {
    Off,
    /// Check codes against the embedded code tables
    #[default]
    Local,
}

/// Severity of extensible binding violations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensibleHandling {
    #[default]
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceMode {
    Off,
    /// Check the type of relative references against target profiles
    #[default]
    TypeOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub cardinality: bool,
    pub choice: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            cardinality: true,
            choice: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminologyConfig {
    pub mode: TerminologyMode,
    pub extensible_handling: ExtensibleHandling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferencesConfig {
    pub mode: ReferenceMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub fail_fast: bool,
    pub max_issues: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            max_issues: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub schema: SchemaConfig,
    pub terminology: TerminologyConfig,
    pub references: ReferencesConfig,
    pub exec: ExecConfig,
}

impl ValidatorConfig {
    pub fn preset(preset: Preset) -> Self {
        let mut cfg = Self::default();
        match preset {
            Preset::Structural => {
                cfg.terminology.mode = TerminologyMode::Off;
                cfg.references.mode = ReferenceMode::Off;
            }
            Preset::Standard => {}
            Preset::Strict => {
                cfg.terminology.extensible_handling = ExtensibleHandling::Error;
            }
        }
        cfg
    }

    pub fn builder() -> ValidatorConfigBuilder {
        ValidatorConfigBuilder::default()
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Compile into an executable plan
    pub fn compile(&self) -> Result<ValidationPlan, ConfigError> {
        if self.exec.max_issues == 0 {
            return Err(ConfigError::InvalidConfig(
                "exec.max_issues must be at least 1".to_string(),
            ));
        }

        let mut steps = Vec::new();
        if self.schema.cardinality {
            steps.push(Step::Cardinality(CardinalityPlan::from(&self.schema)));
        }
        if self.schema.choice {
            steps.push(Step::Choice(ChoicePlan::from(&self.schema)));
        }
        if self.terminology.mode != TerminologyMode::Off {
            steps.push(Step::Bindings(BindingsPlan::from(&self.terminology)));
        }
        if self.references.mode != ReferenceMode::Off {
            steps.push(Step::References(ReferencesPlan::from(&self.references)));
        }

        if steps.is_empty() {
            return Err(ConfigError::NoSteps);
        }

        Ok(ValidationPlan {
            steps,
            fail_fast: self.exec.fail_fast,
            max_issues: self.exec.max_issues,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidatorConfigBuilder {
    cfg: ValidatorConfig,
}

impl ValidatorConfigBuilder {
    pub fn preset(mut self, preset: Preset) -> Self {
        self.cfg = ValidatorConfig::preset(preset);
        self
    }

    pub fn cardinality(mut self, enabled: bool) -> Self {
        self.cfg.schema.cardinality = enabled;
        self
    }

    pub fn choice(mut self, enabled: bool) -> Self {
        self.cfg.schema.choice = enabled;
        self
    }

    pub fn terminology_mode(mut self, mode: TerminologyMode) -> Self {
        self.cfg.terminology.mode = mode;
        self
    }

    pub fn extensible_handling(mut self, handling: ExtensibleHandling) -> Self {
        self.cfg.terminology.extensible_handling = handling;
        self
    }

    pub fn reference_mode(mut self, mode: ReferenceMode) -> Self {
        self.cfg.references.mode = mode;
        self
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.cfg.exec.fail_fast = fail_fast;
        self
    }

    pub fn max_issues(mut self, max_issues: usize) -> Self {
        self.cfg.exec.max_issues = max_issues;
        self
    }

    pub fn build(self) -> ValidatorConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_compiles_all_steps() {
        let plan = ValidatorConfig::default().compile().unwrap();
        assert_eq!(plan.steps.len(), 4);
        assert!(!plan.fail_fast);
        assert_eq!(plan.max_issues, 1000);
    }

    #[test]
    fn structural_preset_skips_terminology_and_references() {
        let plan = ValidatorConfig::preset(Preset::Structural).compile().unwrap();
        assert!(plan
            .steps
            .iter()
            .all(|s| matches!(s, Step::Cardinality(_) | Step::Choice(_))));
    }

    #[test]
    fn builder_overrides_preset() {
        let cfg = ValidatorConfig::builder()
            .preset(Preset::Strict)
            .reference_mode(ReferenceMode::Off)
            .fail_fast(true)
            .max_issues(10)
            .build();

        assert_eq!(
            cfg.terminology.extensible_handling,
            ExtensibleHandling::Error
        );
        let plan = cfg.compile().unwrap();
        assert_eq!(plan.steps.len(), 3);
        assert!(plan.fail_fast);
    }

    #[test]
    fn empty_plans_are_rejected() {
        let cfg = ValidatorConfig::builder()
            .cardinality(false)
            .choice(false)
            .terminology_mode(TerminologyMode::Off)
            .reference_mode(ReferenceMode::Off)
            .build();
        assert!(matches!(cfg.compile(), Err(ConfigError::NoSteps)));

        let cfg = ValidatorConfig::builder().max_issues(0).build();
        assert!(matches!(cfg.compile(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn yaml_round_trip() {
        let yaml = r#"
terminology:
  mode: Local
  extensible_handling: Error
references:
  mode: Off
exec:
  max_issues: 50
"#;
        let cfg = ValidatorConfig::from_yaml(yaml).unwrap();
        assert!(cfg.schema.cardinality);
        assert_eq!(cfg.references.mode, ReferenceMode::Off);
        assert_eq!(cfg.exec.max_issues, 50);

        let back = ValidatorConfig::from_yaml(&cfg.to_yaml().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }
}

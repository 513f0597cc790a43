use crate::{ExtensibleHandling, ReferenceMode, ReferencesConfig, SchemaConfig, TerminologyConfig};

/// Compiled validation plan - list of steps to execute
#[derive(Debug, Clone)]
pub struct ValidationPlan {
    pub steps: Vec<Step>,
    pub fail_fast: bool,
    pub max_issues: usize,
}

#[derive(Debug, Clone)]
pub enum Step {
    Cardinality(CardinalityPlan),
    Choice(ChoicePlan),
    Bindings(BindingsPlan),
    References(ReferencesPlan),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cardinality(_) => "cardinality",
            Self::Choice(_) => "choice",
            Self::Bindings(_) => "bindings",
            Self::References(_) => "references",
        }
    }
}

// ============================================================================
// Step Plans
// ============================================================================

#[derive(Debug, Clone)]
pub struct CardinalityPlan {
    /// Leave the upper bound of choice fields to the choice step
    pub skip_choice_max: bool,
}

impl From<&SchemaConfig> for CardinalityPlan {
    fn from(cfg: &SchemaConfig) -> Self {
        Self {
            skip_choice_max: cfg.choice,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChoicePlan {}

impl From<&SchemaConfig> for ChoicePlan {
    fn from(_cfg: &SchemaConfig) -> Self {
        Self {}
    }
}

#[derive(Debug, Clone)]
pub struct BindingsPlan {
    pub extensible_handling: ExtensibleHandling,
}

impl From<&TerminologyConfig> for BindingsPlan {
    fn from(cfg: &TerminologyConfig) -> Self {
        Self {
            extensible_handling: cfg.extensible_handling,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReferencesPlan {
    pub mode: ReferenceMode,
}

impl From<&ReferencesConfig> for ReferencesPlan {
    fn from(cfg: &ReferencesConfig) -> Self {
        Self { mode: cfg.mode }
    }
}

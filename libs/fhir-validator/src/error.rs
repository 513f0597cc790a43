use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no validation steps enabled")]
    NoSteps,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

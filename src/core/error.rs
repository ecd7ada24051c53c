use thiserror::Error;

/// Input that breaks an invariant of `ScenarioData`. `field` is the JSON path
/// of the offending value, e.g. `personalData.retirementAge`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure of a financial math primitive. The comparator contains these per
/// scenario; they never abort a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no root found after {iterations} iterations")]
    NoConvergence { iterations: u32 },
}

/// `EngineConfig` values outside their accepted range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be between 0 and 1, got {value}")]
    ShareOutOfRange { name: &'static str, value: f64 },
    #[error("profile ceilings must increase with risk tolerance")]
    UnorderedCeilings,
    #[error("solver {0}")]
    Solver(&'static str),
}

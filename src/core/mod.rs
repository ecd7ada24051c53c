pub mod comparator;
pub mod config;
pub mod engine;
pub mod error;
pub mod math;
pub mod projector;
pub mod protection;
pub mod solver;
pub mod thermometer;
pub mod types;

pub use config::{ContributionTiming, EngineConfig, ProfileCeilings, SolverConfig};
pub use engine::{calculate_scenario, validate_scenario};
pub use error::{ConfigError, MathError, ValidationError};
pub use types::{CalculationResults, ScenarioData, ThermometerBand};

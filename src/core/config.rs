use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::types::Suitability;

/// When a periodic payment lands within its compounding period.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContributionTiming {
    /// Annuity-due: the payment compounds during the period it is made.
    StartOfPeriod,
    /// Ordinary annuity: the payment starts compounding in the next period.
    EndOfPeriod,
}

/// Search domain and stopping rules for the bracketed root finder.
/// Rates are per period, as decimals.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    pub rate_min: f64,
    pub rate_max: f64,
    pub value_tolerance: f64,
    pub rate_tolerance: f64,
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rate_min: -0.5,
            rate_max: 1.0,
            value_tolerance: 1e-6,
            rate_tolerance: 1e-12,
            max_iterations: 100,
        }
    }
}

/// Highest nominal annual return (percent) considered plausible per band.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileCeilings {
    pub conservative: f64,
    pub moderate: f64,
    pub moderate_aggressive: f64,
    pub aggressive: f64,
}

impl Default for ProfileCeilings {
    fn default() -> Self {
        Self {
            conservative: 9.0,
            moderate: 11.0,
            moderate_aggressive: 13.0,
            aggressive: 15.0,
        }
    }
}

impl ProfileCeilings {
    pub fn ceiling_for(&self, suitability: Suitability) -> f64 {
        match suitability {
            Suitability::Conservative => self.conservative,
            Suitability::Moderate => self.moderate,
            Suitability::ModerateAggressive => self.moderate_aggressive,
            Suitability::Aggressive => self.aggressive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub contribution_timing: ContributionTiming,
    /// Months of family expense covered by immediate protection.
    pub protection_months: u32,
    /// Share (decimal) of non-sellable asset value needed as succession cash.
    pub succession_cost_rate: f64,
    pub dependent_support_until_age: Option<u32>,
    pub include_family_projects_in_protection: bool,
    /// Withholding tax (decimal) on the yield of a portfolio quoted gross.
    pub withholding_tax_rate: f64,
    pub profile_ceilings: ProfileCeilings,
    pub solver: SolverConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contribution_timing: ContributionTiming::StartOfPeriod,
            protection_months: 12,
            succession_cost_rate: 0.15,
            dependent_support_until_age: None,
            include_family_projects_in_protection: true,
            withholding_tax_rate: 0.15,
            profile_ceilings: ProfileCeilings::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("successionCostRate", self.succession_cost_rate),
            ("withholdingTaxRate", self.withholding_tax_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ShareOutOfRange { name, value });
            }
        }
        let c = self.profile_ceilings;
        if !(c.conservative <= c.moderate
            && c.moderate <= c.moderate_aggressive
            && c.moderate_aggressive <= c.aggressive)
        {
            return Err(ConfigError::UnorderedCeilings);
        }
        let s = self.solver;
        if !s.rate_min.is_finite() || !s.rate_max.is_finite() || s.rate_min <= -1.0 {
            return Err(ConfigError::Solver("rate bounds must be finite and > -1"));
        }
        if s.rate_max <= s.rate_min {
            return Err(ConfigError::Solver("rate_max must be greater than rate_min"));
        }
        if s.value_tolerance <= 0.0 || s.rate_tolerance <= 0.0 {
            return Err(ConfigError::Solver("tolerances must be > 0"));
        }
        if s.max_iterations == 0 {
            return Err(ConfigError::Solver("max_iterations must be > 0"));
        }
        Ok(())
    }
}

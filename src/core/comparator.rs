use tracing::{debug, warn};

use super::config::SolverConfig;
use super::error::MathError;
use super::math::{
    annuity_present_value, future_value, monthly_to_annual, perpetuity_present_value, real_rate,
    required_payment,
};
use super::projector::{ProjectionPlan, Trajectory, WithdrawalPolicy};
use super::solver::find_increasing_root;
use super::types::{NotRetiredResults, ScenarioOutcome, YearlyProjection};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Scenario {
    Current,
    Maintenance,
    Consumption,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Current, Scenario::Maintenance, Scenario::Consumption];

    pub fn policy(self) -> WithdrawalPolicy {
        match self {
            Scenario::Current => WithdrawalPolicy::DesiredIncome,
            Scenario::Maintenance => WithdrawalPolicy::PreserveCapital,
            Scenario::Consumption => WithdrawalPolicy::ConsumeCapital,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonSettings {
    /// Stated real return during retirement, monthly decimal.
    pub retirement_real_rate: f64,
    /// Annual inflation, decimal.
    pub annual_inflation: f64,
    /// Highest plausible nominal annual return for the client, percent.
    pub rate_ceiling: f64,
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub results: NotRetiredResults,
    pub yearly_projections: Vec<YearlyProjection>,
}

pub fn compare_scenarios(plan: &ProjectionPlan, settings: ComparisonSettings) -> Comparison {
    let projected_capital = plan.accumulate(plan.accumulation_rate);
    let [current, maintenance, consumption] = Scenario::ALL.map(|scenario| {
        let trajectory = plan.project(scenario.policy());
        let outcome = evaluate_scenario(plan, settings, scenario, projected_capital, &trajectory);
        (outcome, trajectory)
    });

    let yearly_projections = (0..current.1.yearly_capital.len())
        .map(|k| YearlyProjection {
            age: plan.current_age + k as u32,
            current_scenario: current.1.yearly_capital[k],
            maintenance_scenario: maintenance.1.yearly_capital[k],
            consumption_scenario: consumption.1.yearly_capital[k],
        })
        .collect();

    Comparison {
        results: NotRetiredResults {
            current_scenario: current.0,
            maintenance_scenario: maintenance.0,
            consumption_scenario: consumption.0,
        },
        yearly_projections,
    }
}

fn evaluate_scenario(
    plan: &ProjectionPlan,
    settings: ComparisonSettings,
    scenario: Scenario,
    projected_capital: f64,
    trajectory: &Trajectory,
) -> ScenarioOutcome {
    let capital = contained(scenario, "required capital", || {
        required_capital(plan, settings, scenario)
    });

    let requirement = capital.and_then(|target| {
        contained(scenario, "required rate", || {
            required_annual_rate(plan, target, settings.solver)
        })
    });
    let (rate, within_profile) = match requirement {
        Some(RateRequirement::Rate(r)) => (Some(r), r * 100.0 <= settings.rate_ceiling + 1e-9),
        Some(RateRequirement::AlreadyMet) => (None, true),
        None => (None, false),
    };

    let annual_savings = match scenario {
        Scenario::Current => Some(plan.monthly_contribution * 12.0),
        Scenario::Maintenance | Scenario::Consumption => capital.and_then(|target| {
            contained(scenario, "required savings", || {
                required_annual_savings(plan, target)
            })
        }),
    };

    let real = rate.map(|r| real_rate(r, settings.annual_inflation));

    debug!(
        ?scenario,
        projected_capital,
        required_capital = ?capital,
        ?requirement,
        within_profile,
        "scenario evaluated"
    );

    ScenarioOutcome {
        annual_savings,
        retirement_age: plan.retirement_age,
        projected_capital,
        required_capital: capital,
        required_rate: rate.map(|r| r * 100.0),
        required_real_rate: real.map(|r| r * 100.0),
        within_profile,
        depletion_age: trajectory.depletion_age,
    }
}

/// Turns a primitive failure into a "not computable" marker for one scenario.
fn contained<T, F>(scenario: Scenario, what: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T, MathError>,
{
    match f() {
        Ok(value) => Some(value),
        Err(err @ MathError::NoConvergence { .. }) => {
            warn!(?scenario, %err, "{what} search did not converge");
            None
        }
        Err(err) => {
            debug!(?scenario, %err, "{what} not computable");
            None
        }
    }
}

/// Capital needed at the retirement date, in nominal money of that date.
pub fn required_capital(
    plan: &ProjectionPlan,
    settings: ComparisonSettings,
    scenario: Scenario,
) -> Result<f64, MathError> {
    let monthly_need = plan.net_need_at(plan.retirement_age) * plan.inflation_to_retirement();
    if monthly_need <= 0.0 {
        return Ok(0.0);
    }
    match scenario {
        Scenario::Maintenance => {
            perpetuity_present_value(monthly_need, settings.retirement_real_rate, plan.timing)
        }
        Scenario::Current | Scenario::Consumption => annuity_present_value(
            monthly_need,
            plan.retirement_months(),
            settings.retirement_real_rate,
            plan.timing,
        ),
    }
}

/// Outcome of back-solving the accumulation rate for a target capital.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateRequirement {
    /// Nominal annual rate, decimal.
    Rate(f64),
    /// The target is reached even at the bottom of the search domain, so no
    /// particular return is required.
    AlreadyMet,
}

/// Nominal annual rate at which the plan's contributions reach `target`.
pub fn required_annual_rate(
    plan: &ProjectionPlan,
    target: f64,
    solver: SolverConfig,
) -> Result<RateRequirement, MathError> {
    let root = find_increasing_root(|rate| plan.accumulate(rate) - target, solver)?;
    if root.at_lower_bound {
        return Ok(RateRequirement::AlreadyMet);
    }
    Ok(RateRequirement::Rate(monthly_to_annual(root.value)))
}

/// Yearly contribution that reaches `target` at the plan's own return.
/// Lump sums and income streams before retirement are netted into the target.
pub fn required_annual_savings(plan: &ProjectionPlan, target: f64) -> Result<f64, MathError> {
    let rate = plan.accumulation_rate;
    let months = plan.months_to_retirement();
    let without_contributions = ProjectionPlan {
        monthly_contribution: 0.0,
        ..plan.clone()
    }
    .accumulate(rate);
    if without_contributions >= target {
        return Ok(0.0);
    }
    let extras = without_contributions
        - future_value(rate, months, 0.0, plan.initial_capital, plan.timing);
    let monthly = required_payment(target - extras, plan.initial_capital, months, rate, plan.timing)?;
    Ok(monthly * 12.0)
}

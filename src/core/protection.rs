use super::config::EngineConfig;
use super::error::MathError;
use super::math::annuity_present_value;
use super::types::{FamilyProtection, ProjectKind, ScenarioData};

/// Cash the family would need on the client's death.
///
/// `real_monthly_rate` discounts the support owed to dependents when
/// `dependent_support_until_age` is configured; the only failure is that
/// discount being undefined.
pub fn family_protection(
    data: &ScenarioData,
    config: &EngineConfig,
    real_monthly_rate: f64,
) -> Result<FamilyProtection, MathError> {
    let expense = data.financial_data.monthly_family_expense;

    let uninsured_debt: f64 = data
        .debts
        .iter()
        .filter(|d| !d.has_life_insurance)
        .map(|d| d.outstanding_balance)
        .sum();

    let transition = expense * config.protection_months as f64;

    let dependent_support = match config.dependent_support_until_age {
        Some(until_age) => {
            let years = data
                .personal_data
                .dependents
                .iter()
                .map(|d| until_age.saturating_sub(d.age))
                .max()
                .unwrap_or(0);
            let months = years * 12;
            annuity_present_value(expense, months, real_monthly_rate, config.contribution_timing)?
        }
        None => 0.0,
    };

    let family_projects: f64 = if config.include_family_projects_in_protection {
        data.projects
            .iter()
            .filter(|p| p.kind == ProjectKind::Family)
            .map(|p| p.amount)
            .sum()
    } else {
        0.0
    };

    let immediate_protection = uninsured_debt + transition + dependent_support + family_projects;

    let illiquid: f64 = data
        .assets
        .iter()
        .filter(|a| !a.sellable)
        .map(|a| a.value)
        .sum();
    let succession_liquidity = illiquid * config.succession_cost_rate;

    let available = data.portfolio.total.max(0.0);
    let total_protection = (immediate_protection + succession_liquidity - available).max(0.0);

    Ok(FamilyProtection {
        immediate_protection,
        succession_liquidity,
        total_protection,
    })
}

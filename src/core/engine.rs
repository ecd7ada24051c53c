use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::comparator::{ComparisonSettings, compare_scenarios};
use super::config::EngineConfig;
use super::error::ValidationError;
use super::math::annual_to_monthly;
use super::projector::{IncomeStream, LumpSum, ProjectionPlan};
use super::protection::family_protection;
use super::thermometer::{financial_thermometer, thermometer_band};
use super::types::{CalculationResults, ScenarioData, TaxTreatment};

/// Accepted range, in percent per year, for every rate in the input.
const RATE_RANGE: std::ops::RangeInclusive<f64> = -10.0..=50.0;
const MAX_AGE: u32 = 130;
const PORTFOLIO_TOLERANCE: f64 = 1e-2;

/// Runs the full planning calculation for one client scenario.
///
/// The input is validated first and nothing is computed if any invariant is
/// broken. Results that cannot be computed for a single scenario are reported
/// as `None` inside that scenario and do not affect the others.
pub fn calculate_scenario(
    data: &ScenarioData,
    config: &EngineConfig,
    calculated_at: DateTime<Utc>,
) -> Result<CalculationResults, ValidationError> {
    config
        .validate()
        .map_err(|err| ValidationError::new("config", err.to_string()))?;
    validate_scenario(data)?;

    let plan = build_plan(data, config);
    let assumptions = &data.assumptions;
    let settings = ComparisonSettings {
        retirement_real_rate: annual_to_monthly(assumptions.retirement_real_rate / 100.0),
        annual_inflation: assumptions.annual_inflation / 100.0,
        rate_ceiling: config
            .profile_ceilings
            .ceiling_for(data.personal_data.suitability),
        solver: config.solver,
    };
    debug!(
        accumulation_rate = plan.accumulation_rate,
        months_to_retirement = plan.months_to_retirement(),
        retirement_need = plan.retirement_need,
        "projection plan built"
    );

    let comparison = compare_scenarios(&plan, settings);
    let financial_thermometer = financial_thermometer(&comparison.results);
    let family_protection = family_protection(data, config, settings.retirement_real_rate)
        .map_err(|err| ValidationError::new("assumptions.retirementRealRate", err.to_string()))?;

    info!(
        financial_thermometer,
        total_protection = family_protection.total_protection,
        "scenario calculated"
    );

    Ok(CalculationResults {
        not_retired: comparison.results,
        financial_thermometer,
        thermometer_band: thermometer_band(financial_thermometer),
        yearly_projections: comparison.yearly_projections,
        family_protection,
        calculated_at,
    })
}

/// Nominal annual return (percent) of the current portfolio: the
/// value-weighted reference rate, with the liquidity reserve at CDI and
/// withholding tax taken off gross yields.
pub fn accumulation_rate(data: &ScenarioData, config: &EngineConfig) -> f64 {
    let portfolio = &data.portfolio;
    let cdi = data.assumptions.annual_cdi;
    let invested = portfolio.assets_total();
    let weighted = if invested > 0.0 {
        portfolio.assets.iter().map(|a| a.value * a.rate).sum::<f64>() / invested
    } else {
        cdi
    };
    let liquidity = portfolio.immediate_liquidity_needs / 100.0;
    let blended = (1.0 - liquidity) * weighted + liquidity * cdi;
    match portfolio.tax_treatment {
        TaxTreatment::Gross => blended * (1.0 - config.withholding_tax_rate),
        TaxTreatment::Net => blended,
    }
}

pub fn build_plan(data: &ScenarioData, config: &EngineConfig) -> ProjectionPlan {
    let personal = &data.personal_data;
    let financial = &data.financial_data;
    let assumptions = &data.assumptions;

    let rental_income: f64 = data
        .assets
        .iter()
        .filter_map(|a| a.monthly_rental_income)
        .sum();

    let income_streams = data
        .other_revenues
        .iter()
        .map(|r| IncomeStream {
            monthly_amount: r.value,
            start_age: r.start_age.unwrap_or(personal.age),
            end_age: r.end_age.unwrap_or(personal.life_expectancy),
        })
        .collect();

    let lump_sums = data
        .projects
        .iter()
        .map(|p| LumpSum {
            year_offset: p.deadline_years,
            amount: p.amount,
        })
        .collect();

    ProjectionPlan {
        current_age: personal.age,
        retirement_age: personal.retirement_age,
        life_expectancy: personal.life_expectancy,
        initial_capital: data.portfolio.total,
        monthly_contribution: financial.monthly_savings,
        accumulation_rate: annual_to_monthly(accumulation_rate(data, config) / 100.0),
        retirement_rate: annual_to_monthly(assumptions.retirement_return_nominal / 100.0),
        inflation_rate: annual_to_monthly(assumptions.annual_inflation / 100.0),
        retirement_need: financial.desired_monthly_retirement_income
            - financial.expected_monthly_retirement_revenues
            - rental_income,
        income_streams,
        lump_sums,
        timing: config.contribution_timing,
    }
}

pub fn validate_scenario(data: &ScenarioData) -> Result<(), ValidationError> {
    let personal = &data.personal_data;
    if personal.retirement_age <= personal.age {
        return Err(ValidationError::new(
            "personalData.retirementAge",
            format!(
                "retirement age {} must be greater than current age {}",
                personal.retirement_age, personal.age
            ),
        ));
    }
    if personal.life_expectancy <= personal.retirement_age {
        return Err(ValidationError::new(
            "personalData.lifeExpectancy",
            format!(
                "life expectancy {} must be greater than retirement age {}",
                personal.life_expectancy, personal.retirement_age
            ),
        ));
    }
    if personal.life_expectancy > MAX_AGE {
        return Err(ValidationError::new(
            "personalData.lifeExpectancy",
            format!("life expectancy must be <= {MAX_AGE}"),
        ));
    }

    let financial = &data.financial_data;
    for (field, value) in [
        ("monthlyFamilyExpense", financial.monthly_family_expense),
        (
            "desiredMonthlyRetirementIncome",
            financial.desired_monthly_retirement_income,
        ),
        ("monthlySavings", financial.monthly_savings),
        (
            "expectedMonthlyRetirementRevenues",
            financial.expected_monthly_retirement_revenues,
        ),
    ] {
        non_negative(&format!("financialData.{field}"), value)?;
    }

    let portfolio = &data.portfolio;
    for (i, asset) in portfolio.assets.iter().enumerate() {
        non_negative(&format!("portfolio.assets[{i}].value"), asset.value)?;
        percentage(&format!("portfolio.assets[{i}].percentage"), asset.percentage)?;
        rate(&format!("portfolio.assets[{i}].rate"), asset.rate)?;
    }
    non_negative("portfolio.total", portfolio.total)?;
    let assets_total = portfolio.assets_total();
    if (assets_total - portfolio.total).abs() > PORTFOLIO_TOLERANCE {
        return Err(ValidationError::new(
            "portfolio.total",
            format!(
                "declared total {:.2} does not match the sum of asset values {:.2}",
                portfolio.total, assets_total
            ),
        ));
    }
    percentage(
        "portfolio.immediateLiquidityNeeds",
        portfolio.immediate_liquidity_needs,
    )?;

    for (i, asset) in data.assets.iter().enumerate() {
        non_negative(&format!("assets[{i}].value"), asset.value)?;
        if let Some(rent) = asset.monthly_rental_income {
            non_negative(&format!("assets[{i}].monthlyRentalIncome"), rent)?;
        }
    }

    for (i, debt) in data.debts.iter().enumerate() {
        non_negative(
            &format!("debts[{i}].outstandingBalance"),
            debt.outstanding_balance,
        )?;
        non_negative(
            &format!("debts[{i}].remainingTermYears"),
            debt.remaining_term_years,
        )?;
    }

    for (i, project) in data.projects.iter().enumerate() {
        non_negative(&format!("projects[{i}].amount"), project.amount)?;
    }

    for (i, revenue) in data.other_revenues.iter().enumerate() {
        non_negative(&format!("otherRevenues[{i}].value"), revenue.value)?;
        if let (Some(start), Some(end)) = (revenue.start_age, revenue.end_age) {
            if end <= start {
                return Err(ValidationError::new(
                    format!("otherRevenues[{i}].endAge"),
                    "end age must be greater than start age",
                ));
            }
        }
    }

    let assumptions = &data.assumptions;
    for (field, value) in [
        ("annualInflation", assumptions.annual_inflation),
        ("annualCDI", assumptions.annual_cdi),
        ("retirementReturnNominal", assumptions.retirement_return_nominal),
        ("retirementRealRate", assumptions.retirement_real_rate),
    ] {
        rate(&format!("assumptions.{field}"), value)?;
    }

    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(field, format!("must be >= 0, got {value}")));
    }
    Ok(())
}

fn percentage(field: &str, value: f64) -> Result<(), ValidationError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::new(
            field,
            format!("must be between 0 and 100, got {value}"),
        ));
    }
    Ok(())
}

fn rate(field: &str, value: f64) -> Result<(), ValidationError> {
    if !RATE_RANGE.contains(&value) {
        return Err(ValidationError::new(
            field,
            format!(
                "must be between {} and {} percent, got {value}",
                RATE_RANGE.start(),
                RATE_RANGE.end()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ContributionTiming;
    use crate::core::math::{annual_to_monthly, future_value};
    use crate::core::types::{
        Debt, Dependent, FinancialData, InvestmentObjective, MacroeconomicAssumptions,
        MaritalStatus, OtherRevenue, PersonalData, Portfolio, PortfolioAsset, Project,
        ProjectKind, RealAsset, Suitability, ThermometerBand,
    };

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn sample_data() -> ScenarioData {
        ScenarioData {
            personal_data: PersonalData {
                age: 40,
                dependents: vec![Dependent {
                    name: "Pedro".to_string(),
                    age: 8,
                }],
                retirement_age: 65,
                life_expectancy: 90,
                marital_status: MaritalStatus::Married,
                suitability: Suitability::Moderate,
            },
            financial_data: FinancialData {
                monthly_family_expense: 12_000.0,
                desired_monthly_retirement_income: 10_000.0,
                monthly_savings: 2_000.0,
                expected_monthly_retirement_revenues: 0.0,
                investment_objective: InvestmentObjective::Growth,
            },
            portfolio: Portfolio {
                assets: vec![PortfolioAsset {
                    name: "Fixed income".to_string(),
                    value: 400_000.0,
                    percentage: 100.0,
                    rate: 9.7,
                }],
                total: 400_000.0,
                tax_treatment: TaxTreatment::Net,
                immediate_liquidity_needs: 0.0,
            },
            assets: vec![RealAsset {
                name: "Home".to_string(),
                value: 900_000.0,
                sellable: false,
                monthly_rental_income: None,
            }],
            debts: vec![Debt {
                description: "Mortgage".to_string(),
                outstanding_balance: 250_000.0,
                remaining_term_years: 12.0,
                has_life_insurance: false,
            }],
            projects: Vec::new(),
            other_revenues: Vec::new(),
            assumptions: MacroeconomicAssumptions {
                annual_inflation: 4.0,
                annual_cdi: 10.5,
                retirement_return_nominal: 8.0,
                retirement_real_rate: 4.0,
            },
        }
    }

    fn calculate(data: &ScenarioData) -> CalculationResults {
        calculate_scenario(data, &EngineConfig::default(), fixed_time()).expect("valid scenario")
    }

    #[test]
    fn rejects_retirement_before_current_age() {
        let mut data = sample_data();
        data.personal_data.age = 70;
        data.personal_data.retirement_age = 60;
        let err = calculate_scenario(&data, &EngineConfig::default(), fixed_time())
            .expect_err("must reject age ordering");
        assert!(err.field.contains("retirementAge"));
    }

    #[test]
    fn rejects_life_expectancy_before_retirement() {
        let mut data = sample_data();
        data.personal_data.life_expectancy = 65;
        let err = validate_scenario(&data).expect_err("must reject");
        assert_eq!(err.field, "personalData.lifeExpectancy");
    }

    #[test]
    fn rejects_negative_money_without_clamping() {
        let mut data = sample_data();
        data.financial_data.monthly_savings = -1.0;
        let err = validate_scenario(&data).expect_err("must reject");
        assert_eq!(err.field, "financialData.monthlySavings");

        let mut data = sample_data();
        data.debts[0].outstanding_balance = f64::NAN;
        let err = validate_scenario(&data).expect_err("must reject");
        assert_eq!(err.field, "debts[0].outstandingBalance");
    }

    #[test]
    fn rejects_portfolio_total_mismatch() {
        let mut data = sample_data();
        data.portfolio.total = 400_000.5;
        let err = validate_scenario(&data).expect_err("must reject");
        assert_eq!(err.field, "portfolio.total");

        data.portfolio.total = 400_000.005;
        assert!(validate_scenario(&data).is_ok());
    }

    #[test]
    fn rejects_out_of_range_assumptions() {
        let mut data = sample_data();
        data.assumptions.annual_inflation = 75.0;
        let err = validate_scenario(&data).expect_err("must reject");
        assert_eq!(err.field, "assumptions.annualInflation");
    }

    #[test]
    fn rejects_inverted_revenue_window() {
        let mut data = sample_data();
        data.other_revenues.push(OtherRevenue {
            source: "Pension".to_string(),
            value: 1_000.0,
            observations: None,
            start_age: Some(70),
            end_age: Some(70),
        });
        let err = validate_scenario(&data).expect_err("must reject");
        assert_eq!(err.field, "otherRevenues[0].endAge");
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            succession_cost_rate: 2.0,
            ..EngineConfig::default()
        };
        let err = calculate_scenario(&sample_data(), &config, fixed_time())
            .expect_err("must reject config");
        assert_eq!(err.field, "config");
    }

    #[test]
    fn accumulation_rate_blends_liquidity_and_tax() {
        let mut data = sample_data();
        let config = EngineConfig::default();
        assert_approx(accumulation_rate(&data, &config), 9.7);

        data.portfolio.immediate_liquidity_needs = 20.0;
        assert_approx(accumulation_rate(&data, &config), 0.8 * 9.7 + 0.2 * 10.5);

        data.portfolio.tax_treatment = TaxTreatment::Gross;
        assert_approx(
            accumulation_rate(&data, &config),
            (0.8 * 9.7 + 0.2 * 10.5) * 0.85,
        );

        data.portfolio.assets.clear();
        data.portfolio.total = 0.0;
        data.portfolio.immediate_liquidity_needs = 0.0;
        data.portfolio.tax_treatment = TaxTreatment::Net;
        assert_approx(accumulation_rate(&data, &config), 10.5);
    }

    #[test]
    fn end_to_end_matches_worked_example() {
        let results = calculate(&sample_data());
        let expected = future_value(
            annual_to_monthly(0.097),
            300,
            2_000.0,
            400_000.0,
            ContributionTiming::StartOfPeriod,
        );
        let current = &results.not_retired.current_scenario;
        assert_approx_tol(current.projected_capital, expected, 1e-3);
        assert_approx_tol(current.projected_capital, 6_421_150.12, 1.0);
        assert_eq!(current.annual_savings, Some(24_000.0));
        assert_eq!(results.yearly_projections.len(), 51);
        assert_eq!(results.calculated_at, fixed_time());
    }

    #[test]
    fn maintenance_capital_is_at_least_consumption_capital() {
        let results = calculate(&sample_data());
        let r = &results.not_retired;
        assert!(
            r.maintenance_scenario.required_capital.expect("defined")
                >= r.consumption_scenario.required_capital.expect("defined")
        );
    }

    #[test]
    fn thermometer_is_ten_when_capital_exceeds_maintenance_target() {
        let mut data = sample_data();
        data.financial_data.desired_monthly_retirement_income = 1_000.0;
        let results = calculate(&data);
        assert_eq!(results.financial_thermometer, 10.0);
        assert_eq!(results.thermometer_band, ThermometerBand::Comfortable);
    }

    #[test]
    fn thermometer_is_zero_without_capital() {
        let mut data = sample_data();
        data.portfolio.assets.clear();
        data.portfolio.total = 0.0;
        data.financial_data.monthly_savings = 0.0;
        let results = calculate(&data);
        assert_eq!(results.financial_thermometer, 0.0);
        assert_eq!(results.thermometer_band, ThermometerBand::Critical);
        assert_eq!(results.not_retired.current_scenario.required_rate, None);
    }

    #[test]
    fn infeasible_maintenance_does_not_block_other_scenarios() {
        let mut data = sample_data();
        data.assumptions.retirement_real_rate = -1.0;
        let results = calculate(&data);
        let r = &results.not_retired;
        assert_eq!(r.maintenance_scenario.required_capital, None);
        assert!(!r.maintenance_scenario.within_profile);
        assert!(r.consumption_scenario.required_capital.is_some());
        assert!(r.current_scenario.required_capital.is_some());
        assert!(results.financial_thermometer <= 7.0);
    }

    #[test]
    fn revenues_and_rent_reduce_the_retirement_need() {
        let base = calculate(&sample_data());
        let mut data = sample_data();
        data.financial_data.expected_monthly_retirement_revenues = 2_000.0;
        data.assets[0].monthly_rental_income = Some(1_000.0);
        data.other_revenues.push(OtherRevenue {
            source: "Royalties".to_string(),
            value: 500.0,
            observations: Some("book".to_string()),
            start_age: None,
            end_age: None,
        });
        let with_revenues = calculate(&data);

        let plan = build_plan(&data, &EngineConfig::default());
        assert_approx(plan.retirement_need, 7_000.0);
        assert_approx(plan.net_need_at(65), 6_500.0);
        assert!(
            with_revenues.not_retired.maintenance_scenario.required_capital
                < base.not_retired.maintenance_scenario.required_capital
        );
        assert!(
            with_revenues.not_retired.current_scenario.projected_capital
                > base.not_retired.current_scenario.projected_capital
        );
    }

    #[test]
    fn projects_reduce_projected_capital() {
        let base = calculate(&sample_data());
        let mut data = sample_data();
        data.projects.push(Project {
            kind: ProjectKind::Personal,
            name: "Sabbatical".to_string(),
            amount: 100_000.0,
            deadline_years: 10,
        });
        let with_project = calculate(&data);
        assert!(
            with_project.not_retired.current_scenario.projected_capital
                < base.not_retired.current_scenario.projected_capital
        );
        assert!(with_project.yearly_projections[10].current_scenario < base.yearly_projections[10].current_scenario);
        assert_eq!(
            with_project.yearly_projections[9].current_scenario,
            base.yearly_projections[9].current_scenario
        );
    }

    #[test]
    fn family_protection_uses_engine_config() {
        let results = calculate(&sample_data());
        let protection = results.family_protection;
        assert_approx(protection.immediate_protection, 250_000.0 + 12.0 * 12_000.0);
        assert_approx(protection.succession_liquidity, 135_000.0);
        assert_approx(
            protection.total_protection,
            250_000.0 + 144_000.0 + 135_000.0 - 400_000.0,
        );
    }

    #[test]
    fn covered_need_without_capital_scores_zero_and_needs_no_rate() {
        let mut data = sample_data();
        data.portfolio.assets.clear();
        data.portfolio.total = 0.0;
        data.financial_data.monthly_savings = 0.0;
        data.financial_data.desired_monthly_retirement_income = 5_000.0;
        data.financial_data.expected_monthly_retirement_revenues = 5_000.0;
        let results = calculate(&data);
        let current = &results.not_retired.current_scenario;
        assert_eq!(current.projected_capital, 0.0);
        assert_eq!(current.required_capital, Some(0.0));
        assert_eq!(current.required_rate, None);
        assert_eq!(current.required_real_rate, None);
        assert!(current.within_profile);
        assert_eq!(results.financial_thermometer, 0.0);
        assert_eq!(results.thermometer_band, ThermometerBand::Critical);
    }

    #[test]
    fn same_input_same_output() {
        let data = sample_data();
        assert_eq!(calculate(&data), calculate(&data));
    }

    #[test]
    fn end_of_period_convention_projects_less() {
        let data = sample_data();
        let config = EngineConfig {
            contribution_timing: ContributionTiming::EndOfPeriod,
            ..EngineConfig::default()
        };
        let ordinary = calculate_scenario(&data, &config, fixed_time()).expect("valid");
        let due = calculate(&data);
        assert!(
            ordinary.not_retired.current_scenario.projected_capital
                < due.not_retired.current_scenario.projected_capital
        );
    }

    #[test]
    fn scenario_json_uses_camel_case_contract() {
        let json = r#"{
          "personalData": {
            "age": 35,
            "dependents": [{"name": "Lia", "age": 3}],
            "retirementAge": 60,
            "lifeExpectancy": 85,
            "maritalStatus": "stable-union",
            "suitability": "moderate-aggressive"
          },
          "financialData": {
            "monthlyFamilyExpense": 8000,
            "desiredMonthlyRetirementIncome": 12000,
            "monthlySavings": 3000,
            "expectedMonthlyRetirementRevenues": 1500,
            "investmentObjective": "growth"
          },
          "portfolio": {
            "assets": [
              {"name": "CDB", "value": 150000, "percentage": 60, "rate": 11.0},
              {"name": "Equities", "value": 100000, "percentage": 40, "rate": 14.0}
            ],
            "total": 250000,
            "taxTreatment": "gross",
            "immediateLiquidityNeeds": 10
          },
          "projects": [{"type": "family", "name": "School", "amount": 80000, "deadlineYears": 4}],
          "otherRevenues": [{"source": "Rent", "value": 900, "startAge": 40}],
          "assumptions": {
            "annualInflation": 4.5,
            "annualCDI": 10.75,
            "retirementReturnNominal": 9.0,
            "retirementRealRate": 4.3
          }
        }"#;
        let data: ScenarioData = serde_json::from_str(json).expect("json should parse");
        assert_eq!(data.personal_data.suitability, Suitability::ModerateAggressive);
        assert_eq!(data.personal_data.marital_status, MaritalStatus::StableUnion);
        assert_eq!(data.projects[0].kind, ProjectKind::Family);
        assert_eq!(data.other_revenues[0].start_age, Some(40));
        assert!(data.debts.is_empty());
        assert_approx(data.assumptions.annual_cdi, 10.75);

        let results = calculate(&data);
        let out = serde_json::to_string(&results).expect("results should serialize");
        assert!(out.contains("\"notRetired\""));
        assert!(out.contains("\"maintenanceScenario\""));
        assert!(out.contains("\"financialThermometer\""));
        assert!(out.contains("\"yearlyProjections\""));
        assert!(out.contains("\"familyProtection\""));
        assert!(out.contains("\"successionLiquidity\""));
    }

    #[test]
    fn not_computable_values_serialize_as_null() {
        let mut data = sample_data();
        data.assumptions.retirement_real_rate = 0.0;
        let results = calculate(&data);
        let value = serde_json::to_value(&results).expect("serializable");
        let maintenance = &value["notRetired"]["maintenanceScenario"];
        assert!(maintenance["requiredCapital"].is_null());
        assert!(maintenance["requiredRate"].is_null());
        assert_eq!(maintenance["withinProfile"], serde_json::Value::Bool(false));
    }
}

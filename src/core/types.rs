use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Suitability {
    Conservative,
    Moderate,
    #[serde(alias = "moderateAggressive", alias = "moderate_aggressive")]
    ModerateAggressive,
    Aggressive,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaritalStatus {
    Single,
    Married,
    #[serde(alias = "stableUnion", alias = "stable_union")]
    StableUnion,
    Divorced,
    Widowed,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvestmentObjective {
    #[serde(alias = "capitalPreservation", alias = "capital_preservation")]
    CapitalPreservation,
    Income,
    Growth,
    #[serde(alias = "wealthTransfer", alias = "wealth_transfer")]
    WealthTransfer,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxTreatment {
    /// Reference rates are quoted before withholding tax.
    Gross,
    /// Reference rates are already net of withholding tax.
    Net,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectKind {
    Personal,
    Family,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependent {
    pub name: String,
    pub age: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalData {
    pub age: u32,
    #[serde(default)]
    pub dependents: Vec<Dependent>,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub marital_status: MaritalStatus,
    pub suitability: Suitability,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialData {
    pub monthly_family_expense: f64,
    pub desired_monthly_retirement_income: f64,
    pub monthly_savings: f64,
    pub expected_monthly_retirement_revenues: f64,
    pub investment_objective: InvestmentObjective,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAsset {
    pub name: String,
    pub value: f64,
    /// Share of the portfolio total, 0..=100.
    pub percentage: f64,
    /// Nominal annual reference rate in percent.
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    #[serde(default)]
    pub assets: Vec<PortfolioAsset>,
    pub total: f64,
    pub tax_treatment: TaxTreatment,
    /// Share of the portfolio held for immediate liquidity, 0..=100.
    pub immediate_liquidity_needs: f64,
}

impl Portfolio {
    pub fn assets_total(&self) -> f64 {
        self.assets.iter().map(|a| a.value).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealAsset {
    pub name: String,
    pub value: f64,
    pub sellable: bool,
    #[serde(default)]
    pub monthly_rental_income: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub description: String,
    pub outstanding_balance: f64,
    pub remaining_term_years: f64,
    pub has_life_insurance: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "type")]
    pub kind: ProjectKind,
    pub name: String,
    pub amount: f64,
    pub deadline_years: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherRevenue {
    pub source: String,
    /// Monthly amount in today's money.
    pub value: f64,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub start_age: Option<u32>,
    /// Exclusive.
    #[serde(default)]
    pub end_age: Option<u32>,
}

/// All rates in percent per year.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroeconomicAssumptions {
    pub annual_inflation: f64,
    #[serde(rename = "annualCDI", alias = "annualCdi")]
    pub annual_cdi: f64,
    pub retirement_return_nominal: f64,
    pub retirement_real_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioData {
    pub personal_data: PersonalData,
    pub financial_data: FinancialData,
    pub portfolio: Portfolio,
    #[serde(default)]
    pub assets: Vec<RealAsset>,
    #[serde(default)]
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub other_revenues: Vec<OtherRevenue>,
    pub assumptions: MacroeconomicAssumptions,
}

/// One scenario of the comparison. `None` marks a value that is not computable
/// for this client and is serialized as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub annual_savings: Option<f64>,
    pub retirement_age: u32,
    pub projected_capital: f64,
    pub required_capital: Option<f64>,
    pub required_rate: Option<f64>,
    pub required_real_rate: Option<f64>,
    pub within_profile: bool,
    pub depletion_age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotRetiredResults {
    pub current_scenario: ScenarioOutcome,
    pub maintenance_scenario: ScenarioOutcome,
    pub consumption_scenario: ScenarioOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyProjection {
    pub age: u32,
    pub current_scenario: f64,
    pub maintenance_scenario: f64,
    pub consumption_scenario: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyProtection {
    pub immediate_protection: f64,
    pub succession_liquidity: f64,
    pub total_protection: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThermometerBand {
    Critical,
    Attention,
    OnTrack,
    Comfortable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResults {
    pub not_retired: NotRetiredResults,
    pub financial_thermometer: f64,
    pub thermometer_band: ThermometerBand,
    pub yearly_projections: Vec<YearlyProjection>,
    pub family_protection: FamilyProtection,
    pub calculated_at: DateTime<Utc>,
}

use tracing::warn;

use super::config::ContributionTiming;
use super::math::{real_rate, required_withdrawal};

/// Balances at or below one cent count as exhausted.
const DEPLETED: f64 = 0.01;

/// How capital is drawn after retirement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WithdrawalPolicy {
    /// Draw the net desired income until the capital runs out.
    DesiredIncome,
    /// Draw at most the real yield so principal keeps its purchasing power.
    PreserveCapital,
    /// Draw the level real amount that empties the capital at life expectancy.
    ConsumeCapital,
}

/// Monthly income in today's money, active for ages in `[start_age, end_age)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomeStream {
    pub monthly_amount: f64,
    pub start_age: u32,
    pub end_age: u32,
}

/// One-off outflow in today's money, taken at the start of year `year_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LumpSum {
    pub year_offset: u32,
    pub amount: f64,
}

/// A fully resolved financial position. Rates are monthly decimals and all
/// amounts except `monthly_contribution` are in today's money.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionPlan {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub initial_capital: f64,
    /// Fixed nominal contribution made every month before retirement.
    pub monthly_contribution: f64,
    pub accumulation_rate: f64,
    pub retirement_rate: f64,
    pub inflation_rate: f64,
    /// Desired monthly income net of fixed retirement revenues.
    pub retirement_need: f64,
    pub income_streams: Vec<IncomeStream>,
    pub lump_sums: Vec<LumpSum>,
    pub timing: ContributionTiming,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Capital at each age from the current age to life expectancy inclusive.
    pub yearly_capital: Vec<f64>,
    pub retirement_capital: f64,
    pub depletion_age: Option<u32>,
}

impl ProjectionPlan {
    pub fn months_to_retirement(&self) -> u32 {
        self.retirement_age.saturating_sub(self.current_age) * 12
    }

    pub fn retirement_months(&self) -> u32 {
        self.life_expectancy.saturating_sub(self.retirement_age) * 12
    }

    /// Monthly draw needed at `age` in today's money once active income
    /// streams are counted. Negative when streams exceed the need.
    pub fn net_need_at(&self, age: u32) -> f64 {
        self.retirement_need - self.stream_income_at(age)
    }

    /// Inflation index from today to the retirement date.
    pub fn inflation_to_retirement(&self) -> f64 {
        self.inflation_index(self.months_to_retirement())
    }

    /// Capital reached at the retirement age when growing at `monthly_rate`.
    pub fn accumulate(&self, monthly_rate: f64) -> f64 {
        let years = self.retirement_age.saturating_sub(self.current_age);
        let mut balance = self.initial_capital;
        for offset in 0..years {
            balance = self.apply_lump_sums(balance, offset);
            balance = self.accumulation_year(balance, offset, monthly_rate);
        }
        self.apply_lump_sums(balance, years)
    }

    pub fn project(&self, policy: WithdrawalPolicy) -> Trajectory {
        let years = self.life_expectancy.saturating_sub(self.current_age);
        let mut yearly_capital = Vec::with_capacity(years as usize + 1);
        let mut balance = self.initial_capital;
        let mut retirement_capital = 0.0;
        let mut depletion_age = None;

        for offset in 0..=years {
            let age = self.current_age + offset;
            balance = self.apply_lump_sums(balance, offset);
            if age == self.retirement_age {
                retirement_capital = balance;
            }
            if age >= self.retirement_age && depletion_age.is_none() && balance <= DEPLETED {
                depletion_age = Some(age);
            }
            yearly_capital.push(balance);

            if offset == years {
                break;
            }
            balance = if age < self.retirement_age {
                self.accumulation_year(balance, offset, self.accumulation_rate)
            } else {
                let (next, exhausted_at) = self.retirement_year(balance, offset, policy);
                if depletion_age.is_none() {
                    depletion_age = exhausted_at;
                }
                next
            };
        }

        Trajectory {
            yearly_capital,
            retirement_capital,
            depletion_age,
        }
    }

    fn accumulation_year(&self, mut balance: f64, offset: u32, monthly_rate: f64) -> f64 {
        let age = self.current_age + offset;
        let streams = self.stream_income_at(age);
        for month in 0..12 {
            let t = offset * 12 + month;
            let flow = self.monthly_contribution + streams * self.payment_index(t);
            balance = self.step(balance, monthly_rate, flow);
        }
        balance
    }

    /// One retirement year. Also returns the age at the end of the first
    /// month in which the balance was exhausted, if any.
    fn retirement_year(
        &self,
        mut balance: f64,
        offset: u32,
        policy: WithdrawalPolicy,
    ) -> (f64, Option<u32>) {
        let age = self.current_age + offset;
        let need = self.net_need_at(age);
        // Level real draw for this year, re-sized so lump sums taken after
        // retirement are spread over the remaining horizon.
        let consumption_draw = match policy {
            WithdrawalPolicy::ConsumeCapital if balance > DEPLETED => {
                let remaining = self.life_expectancy.saturating_sub(age) * 12;
                match required_withdrawal(
                    balance,
                    remaining,
                    self.real_retirement_rate(),
                    self.timing,
                ) {
                    Ok(draw) => draw,
                    Err(err) => {
                        warn!(
                            age,
                            balance,
                            %err,
                            "consumption draw not computable, drawing nothing this year"
                        );
                        0.0
                    }
                }
            }
            _ => 0.0,
        };
        let mut exhausted_at = None;

        for month in 0..12 {
            let t = offset * 12 + month;
            let flow = match policy {
                WithdrawalPolicy::DesiredIncome => -need * self.payment_index(t),
                WithdrawalPolicy::PreserveCapital => {
                    let wanted = need * self.payment_index(t);
                    if wanted <= 0.0 {
                        -wanted
                    } else {
                        -wanted.min(self.preserving_draw(balance))
                    }
                }
                WithdrawalPolicy::ConsumeCapital => {
                    let year_start = self.inflation_index(offset * 12);
                    -consumption_draw * self.payment_index(t) / year_start
                }
            };
            balance = self.step(balance, self.retirement_rate, flow);
            if exhausted_at.is_none() && balance <= DEPLETED {
                exhausted_at = Some(self.current_age + (t + 1) / 12);
            }
        }
        (balance, exhausted_at)
    }

    /// Largest draw that leaves the balance growing exactly with inflation.
    fn preserving_draw(&self, balance: f64) -> f64 {
        let spread = self.retirement_rate - self.inflation_rate;
        if spread <= 0.0 || balance <= 0.0 {
            return 0.0;
        }
        match self.timing {
            ContributionTiming::StartOfPeriod => balance * spread / (1.0 + self.retirement_rate),
            ContributionTiming::EndOfPeriod => balance * spread,
        }
    }

    fn real_retirement_rate(&self) -> f64 {
        real_rate(self.retirement_rate, self.inflation_rate)
    }

    fn step(&self, balance: f64, rate: f64, flow: f64) -> f64 {
        let next = match self.timing {
            ContributionTiming::StartOfPeriod => (balance + flow) * (1.0 + rate),
            ContributionTiming::EndOfPeriod => balance * (1.0 + rate) + flow,
        };
        next.max(0.0)
    }

    fn apply_lump_sums(&self, balance: f64, offset: u32) -> f64 {
        let due: f64 = self
            .lump_sums
            .iter()
            .filter(|l| l.year_offset == offset)
            .map(|l| l.amount)
            .sum();
        if due <= 0.0 {
            return balance;
        }
        (balance - due * self.inflation_index(offset * 12)).max(0.0)
    }

    fn stream_income_at(&self, age: u32) -> f64 {
        self.income_streams
            .iter()
            .filter(|s| age >= s.start_age && age < s.end_age)
            .map(|s| s.monthly_amount)
            .sum()
    }

    fn inflation_index(&self, months: u32) -> f64 {
        (1.0 + self.inflation_rate).powi(months as i32)
    }

    /// Inflation index for a payment made in month `t`: the start of the
    /// month for annuity-due timing, its end otherwise.
    fn payment_index(&self, t: u32) -> f64 {
        match self.timing {
            ContributionTiming::StartOfPeriod => self.inflation_index(t),
            ContributionTiming::EndOfPeriod => self.inflation_index(t + 1),
        }
    }
}

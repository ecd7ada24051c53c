//! Time-value-of-money primitives.
//!
//! Rates are decimal and per period; `periods` counts those same periods.
//! Annual rates are converted with [`annual_to_monthly`], which compounds
//! instead of dividing by twelve.
//!
//! Payment timing is always explicit. The engine's default is
//! [`ContributionTiming::StartOfPeriod`] (annuity-due): a contribution made
//! at the start of a month earns that month's return.

use super::config::{ContributionTiming, SolverConfig};
use super::error::MathError;
use super::solver::find_increasing_root;

const ZERO_RATE_EPS: f64 = 1e-12;

pub fn annual_to_monthly(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

pub fn monthly_to_annual(monthly_rate: f64) -> f64 {
    (1.0 + monthly_rate).powi(12) - 1.0
}

/// Fisher relation: `(1 + nominal) / (1 + inflation) - 1`.
pub fn real_rate(nominal: f64, inflation: f64) -> f64 {
    (1.0 + nominal) / (1.0 + inflation) - 1.0
}

/// Future value of one unit paid every period for `periods` periods.
pub fn annuity_factor(rate: f64, periods: u32, timing: ContributionTiming) -> f64 {
    if rate.abs() < ZERO_RATE_EPS {
        return periods as f64;
    }
    let ordinary = ((1.0 + rate).powi(periods as i32) - 1.0) / rate;
    match timing {
        ContributionTiming::StartOfPeriod => ordinary * (1.0 + rate),
        ContributionTiming::EndOfPeriod => ordinary,
    }
}

/// `FV = PV·(1+r)^n + PMT·[((1+r)^n − 1)/r]`, times `(1+r)` for
/// start-of-period payments. At a zero rate this is `PV + PMT·n`.
pub fn future_value(
    rate: f64,
    periods: u32,
    payment: f64,
    present_value: f64,
    timing: ContributionTiming,
) -> f64 {
    if rate.abs() < ZERO_RATE_EPS {
        return present_value + payment * periods as f64;
    }
    present_value * (1.0 + rate).powi(periods as i32)
        + payment * annuity_factor(rate, periods, timing)
}

pub fn future_value_due(rate: f64, periods: u32, payment: f64, present_value: f64) -> f64 {
    future_value(
        rate,
        periods,
        payment,
        present_value,
        ContributionTiming::StartOfPeriod,
    )
}

pub fn future_value_ordinary(rate: f64, periods: u32, payment: f64, present_value: f64) -> f64 {
    future_value(
        rate,
        periods,
        payment,
        present_value,
        ContributionTiming::EndOfPeriod,
    )
}

/// Level contribution that grows `present_value` into `target_fv`.
///
/// Fails with `InvalidInput` when there is no gap to close
/// (`target_fv <= present_value`) or `periods == 0`.
pub fn required_payment(
    target_fv: f64,
    present_value: f64,
    periods: u32,
    rate: f64,
    timing: ContributionTiming,
) -> Result<f64, MathError> {
    check_finite(&[target_fv, present_value, rate])?;
    check_rate(rate)?;
    if periods == 0 {
        return Err(MathError::InvalidInput("periods must be > 0".to_string()));
    }
    if target_fv <= present_value {
        return Err(MathError::InvalidInput(format!(
            "target {target_fv:.2} does not exceed present value {present_value:.2}"
        )));
    }
    Ok(solve_payment(target_fv, present_value, periods, rate, timing))
}

/// Level withdrawal that takes `present_value` to exactly zero after
/// `periods` periods. The sign is flipped relative to [`required_payment`]:
/// the returned amount is taken out of the balance.
pub fn required_withdrawal(
    present_value: f64,
    periods: u32,
    rate: f64,
    timing: ContributionTiming,
) -> Result<f64, MathError> {
    check_finite(&[present_value, rate])?;
    check_rate(rate)?;
    if periods == 0 {
        return Err(MathError::InvalidInput("periods must be > 0".to_string()));
    }
    if present_value <= 0.0 {
        return Err(MathError::InvalidInput(
            "no capital to withdraw from".to_string(),
        ));
    }
    Ok(-solve_payment(0.0, present_value, periods, rate, timing))
}

fn solve_payment(
    target_fv: f64,
    present_value: f64,
    periods: u32,
    rate: f64,
    timing: ContributionTiming,
) -> f64 {
    if rate.abs() < ZERO_RATE_EPS {
        return (target_fv - present_value) / periods as f64;
    }
    let grown = present_value * (1.0 + rate).powi(periods as i32);
    (target_fv - grown) / annuity_factor(rate, periods, timing)
}

/// Capital that funds `payment` per period for `periods` periods and ends at zero.
pub fn annuity_present_value(
    payment: f64,
    periods: u32,
    rate: f64,
    timing: ContributionTiming,
) -> Result<f64, MathError> {
    check_finite(&[payment, rate])?;
    check_rate(rate)?;
    if rate.abs() < ZERO_RATE_EPS {
        return Ok(payment * periods as f64);
    }
    let ordinary = payment * (1.0 - (1.0 + rate).powi(-(periods as i32))) / rate;
    Ok(match timing {
        ContributionTiming::StartOfPeriod => ordinary * (1.0 + rate),
        ContributionTiming::EndOfPeriod => ordinary,
    })
}

/// Capital whose yield alone pays `payment` per period forever.
/// Undefined for non-positive rates.
pub fn perpetuity_present_value(
    payment: f64,
    rate: f64,
    timing: ContributionTiming,
) -> Result<f64, MathError> {
    check_finite(&[payment, rate])?;
    if rate <= ZERO_RATE_EPS {
        return Err(MathError::InvalidInput(format!(
            "a perpetuity needs a positive rate, got {rate}"
        )));
    }
    let ordinary = payment / rate;
    Ok(match timing {
        ContributionTiming::StartOfPeriod => ordinary * (1.0 + rate),
        ContributionTiming::EndOfPeriod => ordinary,
    })
}

/// Per-period rate at which `present_value` plus `payment` each period grows
/// into `target_fv`. Solved by bisection over the solver's rate domain.
pub fn required_rate(
    target_fv: f64,
    present_value: f64,
    payment: f64,
    periods: u32,
    timing: ContributionTiming,
    solver: SolverConfig,
) -> Result<f64, MathError> {
    check_finite(&[target_fv, present_value, payment])?;
    if periods == 0 {
        return Err(MathError::InvalidInput("periods must be > 0".to_string()));
    }
    if present_value < 0.0 || payment < 0.0 {
        return Err(MathError::InvalidInput(
            "present value and payment must be >= 0".to_string(),
        ));
    }
    let root = find_increasing_root(
        |rate| future_value(rate, periods, payment, present_value, timing) - target_fv,
        solver,
    )?;
    Ok(root.value)
}

fn check_finite(values: &[f64]) -> Result<(), MathError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(MathError::InvalidInput("non-finite argument".to_string()))
    }
}

fn check_rate(rate: f64) -> Result<(), MathError> {
    if rate <= -1.0 {
        return Err(MathError::InvalidInput(format!("rate {rate} must be > -1")));
    }
    Ok(())
}

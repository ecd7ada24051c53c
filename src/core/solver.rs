use tracing::trace;

use super::config::SolverConfig;
use super::error::MathError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootEstimate {
    pub value: f64,
    pub iterations: u32,
    /// The objective was already met at `rate_min`; `value` is that bound.
    pub at_lower_bound: bool,
}

/// Bisection for `objective(x) = 0` over `[rate_min, rate_max]`, where
/// `objective` is non-decreasing in `x`.
///
/// If the objective is already non-negative at the lower bound the lower bound
/// is returned. If it is still negative at the upper bound there is no root in
/// the domain and the search fails without iterating.
pub fn find_increasing_root<F>(objective: F, config: SolverConfig) -> Result<RootEstimate, MathError>
where
    F: Fn(f64) -> f64,
{
    validate_config(config)?;

    let low_value = evaluate(&objective, config.rate_min)?;
    if low_value >= 0.0 {
        return Ok(RootEstimate {
            value: config.rate_min,
            iterations: 0,
            at_lower_bound: true,
        });
    }
    let high_value = evaluate(&objective, config.rate_max)?;
    if high_value < 0.0 {
        return Err(MathError::NoConvergence { iterations: 0 });
    }

    let mut lo = config.rate_min;
    let mut hi = config.rate_max;
    let mut it = 0;
    while it < config.max_iterations {
        it += 1;
        let mid = (lo + hi) * 0.5;
        let value = evaluate(&objective, mid)?;
        trace!(iteration = it, lo, hi, mid, value, "bisection step");

        if value >= 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }

        if value.abs() <= config.value_tolerance || (hi - lo).abs() <= config.rate_tolerance {
            return Ok(RootEstimate {
                value: mid,
                iterations: it,
                at_lower_bound: false,
            });
        }
    }

    Err(MathError::NoConvergence { iterations: it })
}

fn evaluate<F>(objective: &F, x: f64) -> Result<f64, MathError>
where
    F: Fn(f64) -> f64,
{
    let value = objective(x);
    if value.is_nan() {
        return Err(MathError::InvalidInput(format!(
            "objective is undefined at rate {x}"
        )));
    }
    Ok(value)
}

fn validate_config(config: SolverConfig) -> Result<(), MathError> {
    if !config.rate_min.is_finite() || !config.rate_max.is_finite() {
        return Err(MathError::InvalidInput("search bounds must be finite".to_string()));
    }
    if config.rate_max <= config.rate_min {
        return Err(MathError::InvalidInput(
            "rate_max must be greater than rate_min".to_string(),
        ));
    }
    if config.max_iterations == 0 {
        return Err(MathError::InvalidInput("max_iterations must be > 0".to_string()));
    }
    Ok(())
}

use super::types::{NotRetiredResults, ThermometerBand};

/// Score at which the projected capital covers the consumption target.
const CONSUMPTION_SCORE: f64 = 7.0;
const MAX_SCORE: f64 = 10.0;

/// 0..=10 feasibility score from the current scenario's projected capital
/// against the maintenance and consumption targets.
///
/// Full maintenance coverage scores 10, full consumption coverage scores 7,
/// and both segments are interpolated linearly. No projected capital scores 0
/// even when nothing is required. When only the consumption target is
/// computable the score tops out at 7.
pub fn financial_thermometer(results: &NotRetiredResults) -> f64 {
    let projected = results.current_scenario.projected_capital;
    let maintenance = results.maintenance_scenario.required_capital;
    let consumption = results.consumption_scenario.required_capital;

    let score = match (maintenance, consumption) {
        _ if projected <= 0.0 => 0.0,
        (Some(m), _) if m <= 0.0 => MAX_SCORE,
        (Some(m), Some(c)) => {
            let ratio = projected / m;
            let threshold = (c / m).clamp(0.0, 1.0);
            if ratio >= 1.0 {
                MAX_SCORE
            } else if ratio >= threshold {
                CONSUMPTION_SCORE
                    + (MAX_SCORE - CONSUMPTION_SCORE) * (ratio - threshold) / (1.0 - threshold)
            } else {
                CONSUMPTION_SCORE * ratio / threshold
            }
        }
        (Some(m), None) => {
            if projected >= m {
                MAX_SCORE
            } else {
                0.0
            }
        }
        (None, Some(c)) if c > 0.0 => CONSUMPTION_SCORE * (projected / c).min(1.0),
        (None, Some(_)) => CONSUMPTION_SCORE,
        (None, None) => 0.0,
    };

    score.clamp(0.0, MAX_SCORE)
}

pub fn thermometer_band(score: f64) -> ThermometerBand {
    if score >= MAX_SCORE - 1e-9 {
        ThermometerBand::Comfortable
    } else if score >= CONSUMPTION_SCORE {
        ThermometerBand::OnTrack
    } else if score >= 4.0 {
        ThermometerBand::Attention
    } else {
        ThermometerBand::Critical
    }
}

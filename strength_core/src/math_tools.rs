//! Stateless numeric primitives shared by the engine and reporting code.
//!
//! Functions here validate their own contracts and return `Err` on
//! violations. The prescription pipeline calls them only with inputs
//! it has already guarded.

use crate::{Error, Result};
use chrono::NaiveDateTime;

/// Epley coefficient (per rep)
pub const EPL_COEFF: f64 = 0.0333;
pub const ALPHA_MIN: f64 = 0.75;
pub const ALPHA_MAX: f64 = 1.0;
/// Fat-free mass fraction of body weight
pub const FFM_FRACTION: f64 = 0.407;
pub const EA_BASELINE: f64 = 1.097;
/// Rolling window length (sets)
pub const L: usize = 3;
pub const W1: f64 = 0.4;
pub const W2: f64 = 0.3;
pub const W3: f64 = 0.3;

/// Reps above this count no longer raise the Epley estimate
pub const EPLEY_REP_CAP: u32 = 8;

pub const KG_TO_LB: f64 = 2.20462;

const GRAVITY: f64 = 9.81;

/// Clamp `value` to the inclusive range [min, max]
pub fn clamp(value: f64, min: f64, max: f64) -> Result<f64> {
    if min > max {
        return Err(Error::InvalidRange { min, max });
    }
    Ok(value.max(min).min(max))
}

/// Estimated one-rep max using the Epley formula.
///
/// The rep term saturates at 8 reps.
pub fn epley_1rm(weight: f64, reps: i64, factor: f64) -> Result<f64> {
    if reps < 0 {
        return Err(Error::invalid_input("reps must be non-negative"));
    }
    let reps = reps.min(i64::from(EPLEY_REP_CAP)) as u32;
    Ok(epley_1rm_with(weight, reps, EPL_COEFF) * factor)
}

/// Epley estimate for already-validated reps with an explicit coefficient
pub fn epley_1rm_with(weight: f64, reps: u32, coeff: f64) -> f64 {
    let rep_term = f64::from(reps.min(EPLEY_REP_CAP));
    weight * (1.0 + coeff * rep_term)
}

/// Training volume as Σ reps × weight over `(reps, weight)` pairs
pub fn volume(sets: &[(u32, f64)]) -> f64 {
    sets.iter().map(|(r, w)| f64::from(*r) * w).sum()
}

pub fn experience_score(months_active: f64, workouts_per_month: f64) -> Result<f64> {
    if months_active < 0.0 || workouts_per_month < 0.0 {
        return Err(Error::invalid_input("experience inputs must be non-negative"));
    }
    Ok(months_active * workouts_per_month)
}

/// Relative change from `prev_avg` to `recent_avg`
pub fn basic_threshold(recent_avg: f64, prev_avg: f64) -> Result<f64> {
    if prev_avg == 0.0 {
        return Err(Error::invalid_input("prev_avg must not be zero"));
    }
    Ok((recent_avg - prev_avg) / prev_avg)
}

/// Daily 1RM gain needed to reach `target_1rm` in `days_remaining` days
pub fn required_progression(target_1rm: f64, current_1rm: f64, days_remaining: i64) -> Result<f64> {
    if days_remaining <= 0 {
        return Err(Error::invalid_input("days_remaining must be positive"));
    }
    Ok((target_1rm - current_1rm) / days_remaining as f64)
}

/// Evenly spaced values from `start` to `end` inclusive
fn linspace(start: f64, end: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (steps - 1) as f64;
            (0..steps).map(|i| start + step * i as f64).collect()
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Warm-up ramp from 30% to 90% of `target_weight` across `sets` steps
pub fn warmup_weights(target_weight: f64, sets: usize) -> Result<Vec<f64>> {
    if target_weight <= 0.0 || sets == 0 {
        return Err(Error::invalid_input("warm-up needs a positive weight and set count"));
    }
    Ok(linspace(0.3, 0.9, sets)
        .into_iter()
        .map(|pct| round_to(target_weight * pct, 2))
        .collect())
}

/// Warm-up plan as `(reps, weight)` pairs.
///
/// Reps descend from `target_reps + 2` to `max(1, target_reps / 2)` while
/// the weight ramps up.
pub fn warmup_plan(target_weight: f64, target_reps: u32, sets: usize) -> Result<Vec<(u32, f64)>> {
    if target_reps == 0 {
        return Err(Error::invalid_input("warm-up needs positive target reps"));
    }
    let weights = warmup_weights(target_weight, sets)?;
    let top = f64::from(target_reps) + 2.0;
    let bottom = f64::from((target_reps / 2).max(1));
    Ok(linspace(top, bottom, sets)
        .into_iter()
        .zip(weights)
        .map(|(r, w)| (r.round() as u32, w))
        .collect())
}

/// Mean bar velocity (m/s) over a set, assuming `rom` metres per rep
pub fn estimate_velocity_from_set(
    reps: u32,
    start: NaiveDateTime,
    finish: NaiveDateTime,
    rom: f64,
) -> f64 {
    let seconds = (finish - start).num_milliseconds() as f64 / 1000.0;
    if reps == 0 || seconds <= 0.0 {
        return 0.0;
    }
    f64::from(reps) * rom / seconds
}

/// Average mechanical power (W) for a set
pub fn estimate_power_from_set(
    reps: u32,
    weight: f64,
    start: NaiveDateTime,
    finish: NaiveDateTime,
    rom: f64,
) -> f64 {
    let velocity = estimate_velocity_from_set(reps, start, finish, rom);
    weight * GRAVITY * velocity
}

/// Volume per minute, scaled by ln(1 + RPE) when an average RPE is known
pub fn session_efficiency(volume: f64, duration_seconds: f64, avg_rpe: Option<f64>) -> f64 {
    if duration_seconds <= 0.0 {
        return 0.0;
    }
    let base = volume / (duration_seconds / 60.0);
    let rpe_adj = avg_rpe.map_or(1.0, f64::ln_1p);
    base * rpe_adj
}

pub fn session_density(volume: f64, duration_seconds: f64) -> f64 {
    if duration_seconds <= 0.0 {
        return 0.0;
    }
    volume / (duration_seconds / 60.0)
}

/// Sets completed per minute
pub fn set_pace(sets: u32, duration_seconds: f64) -> f64 {
    if duration_seconds <= 0.0 {
        return 0.0;
    }
    f64::from(sets) / (duration_seconds / 60.0)
}

/// Shannon entropy (bits) of category counts
pub fn diversity_index(counts: &[u32]) -> f64 {
    let total: u32 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = f64::from(total);
    counts
        .iter()
        .filter(|c| **c > 0)
        .map(|c| {
            let p = f64::from(*c) / total;
            -p * p.log2()
        })
        .sum()
}

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0 for fewer than two values
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Population std / mean; 0 with fewer than two samples or a zero mean
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    population_std(values) / m
}

/// Overtraining risk on a 0-10 scale
pub fn overtraining_index(stress: f64, fatigue: f64, variability: f64) -> f64 {
    let base = (stress + fatigue) / 2.0;
    (base * (1.0 + variability)).clamp(0.0, 10.0)
}

/// Readiness on a 0-10 scale; 10 when both stress and fatigue are zero
pub fn readiness_score(stress: f64, fatigue: f64) -> f64 {
    (10.0 - stress.hypot(fatigue)).clamp(0.0, 10.0)
}

/// Fuse a model and an algorithmic estimate weighted by squared confidence.
///
/// `algo_reliability` scales the algorithm's confidence and is floored at 0.
pub fn weighted_fusion(
    model_pred: f64,
    model_conf: f64,
    algo_pred: f64,
    algo_conf: f64,
    algo_reliability: f64,
) -> Result<f64> {
    let adj_algo_conf = algo_conf * algo_reliability.max(0.0);
    let model_w = model_conf.powi(2);
    let algo_w = adj_algo_conf.powi(2);
    let total = model_w + algo_w;
    if total == 0.0 {
        return Err(Error::invalid_input("total confidence cannot be zero"));
    }
    Ok((model_w * model_pred + algo_w * algo_pred) / total)
}

pub fn kg_to_lb(kg: f64) -> f64 {
    round_to(kg * KG_TO_LB, 2)
}

pub fn lb_to_kg(lb: f64) -> f64 {
    round_to(lb / KG_TO_LB, 2)
}

//! Prescription engine for the next training session.
//!
//! The pipeline turns set-by-set history plus optional recovery signals and
//! a goal into a set-by-set prescription:
//! - Load summary, trend slope and short-term load comparison
//! - Plateau, fatigue and acute:chronic diagnostics
//! - Recovery signals feeding the MEV/MRV volume landmarks
//! - Progression modifier, deload decision and set count
//! - Per-set reps, weight, target RPE and rest
//!
//! `prescribe` is total: sparse or degenerate history falls back to neutral
//! values and, for an empty history, a single conservative set.

use crate::math_tools::{mean, population_std};
use crate::trend;
use crate::{
    Analysis, AthleteProfile, Focus, GoalConstraint, Prescription, PrescriptionSet,
    Recommendations, RecoveryEntry, RecoveryLog, TrainingHistory, VolumeStatus,
};
use serde::{Deserialize, Serialize};

/// Upper bound on prescribed reps per set
const MAX_REPS: u32 = 20;

/// Acute:chronic band treated as optimal
const AC_OPTIMAL_LOW: f64 = 0.8;
const AC_OPTIMAL_HIGH: f64 = 1.3;

// ============================================================================
// Configuration
// ============================================================================

/// Volume landmark tuning
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LandmarkConfig {
    /// Minimum effective volume
    #[serde(default = "default_mev")]
    pub mev: f64,

    /// Per-day fatigue decay
    #[serde(default = "default_decay")]
    pub decay: f64,

    #[serde(default = "default_theta")]
    pub theta: f64,

    /// Baseline stress term, replaced by logged stress when present
    #[serde(default = "default_stress")]
    pub stress: f64,

    #[serde(default = "default_phase_factor")]
    pub phase_factor: f64,
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            mev: default_mev(),
            decay: default_decay(),
            theta: default_theta(),
            stress: default_stress(),
            phase_factor: default_phase_factor(),
        }
    }
}

fn default_mev() -> f64 {
    10.0
}

fn default_decay() -> f64 {
    0.9
}

fn default_theta() -> f64 {
    0.1
}

fn default_stress() -> f64 {
    0.3
}

fn default_phase_factor() -> f64 {
    0.5
}

/// Tuning constants owned by the prescription pipeline.
///
/// These are independent of the compile-time constants in `math_tools`;
/// the two sets share some names but never override each other.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrescriptionConstants {
    pub epl_coeff: f64,
    /// Sets per block in the recent-vs-previous load comparison
    pub window: usize,
    /// Sets in the acute block of the acute:chronic ratio
    pub acute_window: usize,
    pub plateau_slope_weight: f64,
    pub plateau_cv_weight: f64,
    pub plateau_threshold_weight: f64,
    pub slope_tolerance: f64,
    pub cv_threshold_pct: f64,
    pub threshold_tolerance: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
    /// History time units per week. Timestamps are day offsets by default.
    pub time_units_per_week: f64,
    pub fallback_reps: u32,
    pub max_sets: u32,
    pub max_deload_sets: u32,
}

impl Default for PrescriptionConstants {
    fn default() -> Self {
        Self {
            epl_coeff: 0.0333,
            window: 3,
            acute_window: 7,
            plateau_slope_weight: 0.4,
            plateau_cv_weight: 0.3,
            plateau_threshold_weight: 0.3,
            slope_tolerance: 1e-3,
            cv_threshold_pct: 1.5,
            threshold_tolerance: 0.02,
            alpha_min: -0.20,
            alpha_max: 0.07,
            time_units_per_week: 7.0,
            fallback_reps: 5,
            max_sets: 10,
            max_deload_sets: 4,
        }
    }
}

/// Everything the pipeline reads besides its inputs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
    pub landmarks: LandmarkConfig,
    pub constants: PrescriptionConstants,
}

// ============================================================================
// Reporting Helpers
// ============================================================================

/// Best Epley estimate across the history; 0 when empty
pub fn current_1rm(history: &TrainingHistory, epl_coeff: f64) -> f64 {
    history
        .samples()
        .map(|s| crate::math_tools::epley_1rm_with(s.weight, s.reps, epl_coeff))
        .fold(0.0, f64::max)
}

/// Mean volume of the last `acute_window` sets over the mean of all sets
pub fn ac_ratio(volumes: &[f64], acute_window: usize) -> f64 {
    let chronic = mean(volumes);
    if chronic == 0.0 {
        return 1.0;
    }
    let start = volumes.len().saturating_sub(acute_window);
    mean(&volumes[start..]) / chronic
}

/// Mean session load over its standard deviation; 1.0 when loads do not vary
pub fn weekly_monotony(session_loads: &[f64]) -> f64 {
    let std = population_std(session_loads);
    if std > 0.0 {
        mean(session_loads) / std
    } else {
        1.0
    }
}

/// Deload pressure from under-performance, effort above RPE 7 and poor recovery
pub fn deload_trigger(perf_factor: f64, mean_rpe: f64, recovery_factor: f64) -> f64 {
    let recovery_scale = if recovery_factor > 0.0 {
        1.0 / recovery_factor
    } else {
        1.0
    };
    (1.0 - perf_factor) * (mean_rpe - 7.0).max(0.0) * recovery_scale
}

/// Composite deload score in [0, 1] for reporting.
///
/// `rpe_factor` is recent RPE over baseline RPE; `trend` is a relative
/// performance trend where negative means declining.
pub fn deload_assessment(
    fatigue_signal: f64,
    rpe_factor: f64,
    ac_ratio: f64,
    recovery_quality: f64,
    trend: f64,
) -> f64 {
    let score = 0.30 * fatigue_signal.clamp(0.0, 1.0)
        + 0.25 * ((rpe_factor - 1.0) / 0.3).clamp(0.0, 1.0)
        + 0.20 * ((ac_ratio - AC_OPTIMAL_HIGH) / 0.2).clamp(0.0, 1.0)
        + 0.15 * (1.0 - recovery_quality).clamp(0.0, 1.0)
        + 0.10 * (-trend).clamp(0.0, 1.0);
    score.clamp(0.0, 1.0)
}

/// Sleep quantity response centred on 8 hours
pub fn sleep_factor(hours: f64) -> f64 {
    (1.0 - 0.06 * (8.0 - hours)).clamp(0.5, 1.1)
}

/// Sleep quality response on a 0-5 scale; 5 is neutral
pub fn perceived_sleep_quality_factor(quality: f64) -> f64 {
    (1.0 - 0.02 * (5.0 - quality)).clamp(0.5, 1.0)
}

/// Geometric mean of the sleep factors; a missing signal counts as neutral
pub fn sleep_recovery_index(hours: Option<f64>, quality: Option<f64>) -> f64 {
    let quantity = hours.map_or(1.0, sleep_factor);
    let quality = quality.map_or(1.0, perceived_sleep_quality_factor);
    (quantity * quality).sqrt()
}

/// Energy availability factor from average intake and body weight.
///
/// Intake is scaled by an 85% fat-free-mass estimate against a 40 kcal/kg
/// reference. Without calories or a usable body weight the factor is 1.0.
pub fn energy_availability(avg_calories: Option<f64>, body_weight: f64) -> f64 {
    match avg_calories {
        Some(calories) if body_weight > 0.0 => {
            ((calories / (body_weight * 0.85)) / 40.0).clamp(0.5, 1.1)
        }
        _ => 1.0,
    }
}

/// Mean of energy availability and sleep recovery for a single day
pub fn recovery_quality(
    calories: Option<f64>,
    sleep_hours: Option<f64>,
    sleep_quality: Option<f64>,
    body_weight: f64,
) -> f64 {
    let ea = energy_availability(calories, body_weight);
    let sri = sleep_recovery_index(sleep_hours, sleep_quality);
    (ea + sri) / 2.0
}

/// Per-session performance: session volume over `reference`, clamped to [0.5, 1.5]
pub fn performance_scores(history: &TrainingHistory, reference: f64) -> Vec<f64> {
    let sessions = history.session_volumes();
    if reference <= 0.0 {
        return vec![1.0; sessions.len()];
    }
    sessions
        .iter()
        .map(|v| (v / reference).clamp(0.5, 1.5))
        .collect()
}

// ============================================================================
// Pipeline
// ============================================================================

/// Recovery inputs reduced to what the landmarks need
struct RecoverySignals {
    energy_availability: f64,
    sleep_recovery_index: f64,
    stress: f64,
    /// One score per session, aligned from the most recent end
    per_session: Vec<f64>,
}

fn recovery_signals(
    log: Option<&RecoveryLog>,
    sessions: usize,
    body_weight: f64,
    baseline_stress: f64,
) -> RecoverySignals {
    let Some(log) = log.filter(|l| !l.is_empty()) else {
        return RecoverySignals {
            energy_availability: 1.0,
            sleep_recovery_index: 1.0,
            stress: baseline_stress,
            per_session: vec![1.0; sessions],
        };
    };

    let average = |values: Vec<f64>| (!values.is_empty()).then(|| mean(&values));
    let ea = energy_availability(average(log.calories()), body_weight);
    let sri = sleep_recovery_index(average(log.sleep_hours()), average(log.sleep_quality()));
    let stress = average(log.stress_levels()).map_or(baseline_stress, |s| s / 10.0);

    let daily: Vec<f64> = log
        .entries
        .iter()
        .map(|entry: &RecoveryEntry| {
            let day_ea = entry
                .calories
                .map_or(ea, |c| energy_availability(Some(c), body_weight));
            (day_ea + sleep_recovery_index(entry.sleep_hours, entry.sleep_quality)) / 2.0
        })
        .collect();

    // Days pair with sessions from the most recent end; sessions older than
    // the log fall back to the log-wide average.
    let fallback = (ea + sri) / 2.0;
    let offset = daily.len() as isize - sessions as isize;
    let per_session = (0..sessions)
        .map(|i| {
            let j = offset + i as isize;
            if j >= 0 {
                daily[j as usize]
            } else {
                fallback
            }
        })
        .collect();

    RecoverySignals {
        energy_availability: ea,
        sleep_recovery_index: sri,
        stress,
        per_session,
    }
}

fn plateau_score(slope: f64, cv_pct: f64, threshold: f64, c: &PrescriptionConstants) -> f64 {
    let mut score = 0.0;
    if slope.abs() < c.slope_tolerance {
        score += c.plateau_slope_weight;
    }
    if cv_pct < c.cv_threshold_pct {
        score += c.plateau_cv_weight;
    }
    if threshold.abs() <= c.threshold_tolerance {
        score += c.plateau_threshold_weight;
    }
    score
}

/// Relative change of the last `window` set volumes against the block before.
///
/// A history too short for a previous block compares against itself.
fn relative_threshold(volumes: &[f64], window: usize) -> f64 {
    let n = volumes.len();
    let recent = mean(&volumes[n.saturating_sub(window)..]);
    let previous_block = &volumes[n.saturating_sub(2 * window)..n.saturating_sub(window)];
    let previous = if previous_block.is_empty() {
        recent
    } else {
        mean(previous_block)
    };
    if previous == 0.0 {
        0.0
    } else {
        (recent - previous) / previous
    }
}

fn exponential_fatigue(volumes: &[f64], timestamps: &[f64], decay: f64) -> f64 {
    let Some(now) = timestamps.last() else {
        return 0.0;
    };
    volumes
        .iter()
        .zip(timestamps)
        .map(|(v, t)| v * decay.powf(now - t))
        .sum()
}

// Saturates to 1.0 for any goal.
// TODO: compare the athlete's projected weekly_rate against the required rate.
fn achievement_probability(required_rate: Option<f64>) -> f64 {
    match required_rate {
        Some(rate) if rate != 0.0 => (rate.abs() / rate.abs()).min(1.0),
        _ => 1.0,
    }
}

fn urgency(current_1rm: f64, goal: Option<&GoalConstraint>) -> f64 {
    match goal {
        Some(g) if g.target_1rm > 0.0 => {
            1.0 / (1.0 + (-10.0 * (current_1rm / g.target_1rm - 0.5)).exp())
        }
        _ => 0.0,
    }
}

fn round_1dp(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn minimal_prescription(config: &EngineConfig) -> Prescription {
    let mev = config.landmarks.mev;
    let set = PrescriptionSet {
        set_number: 1,
        reps: config.constants.fallback_reps.clamp(1, MAX_REPS),
        weight: 0.0,
        target_rpe: 7.0,
        rest_seconds: 100,
    };
    Prescription {
        sets: vec![set],
        total_sets: 1,
        deload_recommended: false,
        analysis: Analysis {
            current_1rm: 0.0,
            plateau_score: 0.0,
            fatigue_level: 0.0,
            progression_modifier: 0.0,
            urgency_factor: 0.0,
            achievement_probability: 1.0,
            ac_ratio: 1.0,
            weekly_monotony: 1.0,
            deload_trigger: 0.0,
            weekly_rate: 0.0,
            mrv: mev,
            adjusted_mrv: mev,
            volume_target: mev,
            energy_availability: 1.0,
            sleep_recovery_index: 1.0,
            confidence_interval: (0.0, 0.0),
        },
        recommendations: Recommendations {
            focus: Focus::Strength,
            volume_status: VolumeStatus::Optimal,
            recovery_needed: false,
        },
    }
}

/// Build the next session's prescription.
///
/// `recovery` entries are day-indexed and pair with sessions from the most
/// recent end. A goal with zero days remaining is ignored.
pub fn prescribe(
    history: &TrainingHistory,
    recovery: Option<&RecoveryLog>,
    goal: Option<&GoalConstraint>,
    athlete: &AthleteProfile,
    config: &EngineConfig,
) -> Prescription {
    let c = &config.constants;
    let lm = &config.landmarks;

    if history.is_empty() {
        tracing::info!("Empty history, prescribing a single fallback set");
        return minimal_prescription(config);
    }

    let goal = match goal {
        Some(g) if g.days_remaining == 0 => {
            tracing::warn!("Goal has no days remaining, ignoring it");
            None
        }
        other => other,
    };

    let weights = history.weights();
    let timestamps = history.timestamps();
    let volumes = history.volumes();
    let sessions = history.session_volumes();
    let n = history.len();

    // Load summary and trend
    let current_1rm = current_1rm(history, c.epl_coeff);
    let total_volume: f64 = volumes.iter().sum();
    let y_mean = mean(weights);
    let slope = trend::linear_regression_slope(timestamps, weights);
    let threshold = relative_threshold(&volumes, c.window);

    let session_mean = mean(&sessions);
    let cv_pct = if sessions.len() >= 2 && session_mean != 0.0 {
        population_std(&sessions) / session_mean * 100.0
    } else {
        0.0
    };

    let plateau = plateau_score(slope, cv_pct, threshold, c);
    let fatigue = exponential_fatigue(&volumes, timestamps, lm.decay);
    let ac = ac_ratio(&volumes, c.acute_window);

    tracing::debug!(
        "1RM {:.2}, slope {:.4}, threshold {:.4}, cv {:.2}%, plateau {:.2}, fatigue {:.1}, a:c {:.2}",
        current_1rm,
        slope,
        threshold,
        cv_pct,
        plateau,
        fatigue,
        ac
    );

    // Recovery and landmarks
    let signals = recovery_signals(recovery, sessions.len(), athlete.body_weight, lm.stress);
    let ea = signals.energy_availability;
    let sri = signals.sleep_recovery_index;
    let perf = performance_scores(history, lm.mev);
    let mean_perf = mean(&perf);
    let mean_recovery = mean(&signals.per_session);

    let mrv = (lm.mev * (1.0 + (lm.theta * fatigue / 1000.0).exp() - signals.stress) * ea).max(0.0);
    let adjusted_mrv = mrv * mean_perf * mean_recovery;

    let perf_recovery: Vec<f64> = perf
        .iter()
        .zip(&signals.per_session)
        .map(|(p, r)| p * r)
        .collect();
    let required_rate = goal.map(|g| (g.target_1rm - current_1rm) / f64::from(g.days_remaining));
    let tolerance = match required_rate {
        Some(rate) if rate != 0.0 => perf_recovery.iter().sum::<f64>() / rate.abs(),
        _ => mean(&perf_recovery),
    };
    let volume_target = lm.mev + (adjusted_mrv - lm.mev) * lm.phase_factor * tolerance;

    tracing::debug!(
        "EA {:.3}, SRI {:.3}, stress {:.2}, MRV {:.2}, adjusted MRV {:.2}, volume target {:.2}",
        ea,
        sri,
        signals.stress,
        mrv,
        adjusted_mrv,
        volume_target
    );

    // Progression
    let urgency_factor = urgency(current_1rm, goal);
    let delta_1rm = if y_mean != 0.0 {
        (current_1rm - y_mean) / y_mean
    } else {
        0.0
    };
    let alpha = ((0.6 * delta_1rm + 0.4 * threshold) * mean_recovery)
        .max(c.alpha_min)
        .min(c.alpha_max);
    let achievement = achievement_probability(required_rate);

    let weekly_rate = if y_mean != 0.0 {
        slope * c.time_units_per_week / y_mean
    } else {
        0.0
    };
    let monotony = weekly_monotony(&sessions);

    // Deload decision
    let mean_rpe = mean(history.rpe());
    let trigger = deload_trigger(mean_perf, mean_rpe, mean_recovery);
    let (ci_low, ci_high) = trend::confidence_interval(timestamps, weights);
    let deload = trigger >= 1.0 || (ci_low < 0.0 && 0.0 < ci_high);

    // Set count
    let mean_set_volume = total_volume / n as f64;
    let volume_ratio = if mean_set_volume > 0.0 {
        adjusted_mrv / mean_set_volume
    } else {
        1.0
    };
    let fatigue_factor = if mrv > 0.0 {
        (1.0 - fatigue / mrv).clamp(0.6, 1.0)
    } else {
        0.6
    };
    let raw_sets = volume_ratio
        * (1.0 - plateau)
        * (1.0 + alpha)
        * (1.0 + urgency_factor)
        * fatigue_factor
        * (1.0 - monotony / 2.0).clamp(0.5, 1.0)
        * achievement.clamp(0.6, 1.0);

    let mut total_sets = (raw_sets.round() as u32).clamp(1, c.max_sets.max(1));
    if deload {
        total_sets = total_sets.div_ceil(2).clamp(1, c.max_deload_sets.max(1));
    }

    // Per-set schedule
    let base_reps = (mean(&history.reps().iter().map(|r| f64::from(*r)).collect::<Vec<_>>())
        * (1.0 + alpha * (1.0 - plateau)))
        .round();
    let intensity_target = if base_reps >= 6.0 { 0.75 } else { 0.85 };
    let rpe_cv = crate::math_tools::coefficient_of_variation(history.rpe());
    let rate_damping = 1.0 - weekly_rate / (weekly_rate.abs() + 1.0);
    let target_rpe = round_1dp((7.0 + 0.3 * plateau).clamp(6.0, 9.0));
    let weight_floor = 0.5 * y_mean;
    let weight_ceiling = 0.95 * current_1rm;

    let sets: Vec<PrescriptionSet> = (1..=total_sets)
        .map(|k| {
            let p = if total_sets > 1 {
                f64::from(k - 1) / f64::from(total_sets - 1)
            } else {
                0.0
            };

            let mut reps = ((base_reps * (1.0 - p * threshold) * rate_damping).round() as u32)
                .clamp(1, MAX_REPS);
            if deload {
                reps = ((f64::from(reps) * 0.7).ceil() as u32).max(1);
            }

            let mut weight = current_1rm
                * intensity_target
                * (1.0 - 0.05 * p)
                * (1.0 - 0.1 * plateau)
                * ea
                * sri;
            if deload {
                weight *= 0.8;
            }
            let weight = weight.max(weight_floor).min(weight_ceiling);

            let low_rep_rest = if reps < 5 { 15.0 } else { 0.0 };
            let rest = 90.0 + 30.0 * rpe_cv + low_rep_rest + 10.0 * f64::from(k);

            PrescriptionSet {
                set_number: k,
                reps,
                weight: round_1dp(weight),
                target_rpe,
                rest_seconds: rest.round() as u32,
            }
        })
        .collect();

    tracing::info!(
        "Prescribed {} sets (raw {:.2}), deload: {}, trigger {:.2}, CI ({:.4}, {:.4})",
        total_sets,
        raw_sets,
        deload,
        trigger,
        ci_low,
        ci_high
    );

    let volume_status = if (AC_OPTIMAL_LOW..=AC_OPTIMAL_HIGH).contains(&ac) {
        VolumeStatus::Optimal
    } else {
        VolumeStatus::Adjust
    };

    Prescription {
        sets,
        total_sets,
        deload_recommended: deload,
        analysis: Analysis {
            current_1rm,
            plateau_score: plateau,
            fatigue_level: fatigue,
            progression_modifier: alpha,
            urgency_factor,
            achievement_probability: achievement,
            ac_ratio: ac,
            weekly_monotony: monotony,
            deload_trigger: trigger,
            weekly_rate,
            mrv,
            adjusted_mrv,
            volume_target,
            energy_availability: ea,
            sleep_recovery_index: sri,
            confidence_interval: (ci_low, ci_high),
        },
        recommendations: Recommendations {
            focus: if intensity_target > 0.8 {
                Focus::Strength
            } else {
                Focus::Hypertrophy
            },
            volume_status,
            recovery_needed: deload,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn history(weights: &[f64], reps: &[u32], rpe: &[f64], timestamps: &[f64]) -> TrainingHistory {
        TrainingHistory::from_columns(
            weights.to_vec(),
            reps.to_vec(),
            rpe.to_vec(),
            timestamps.to_vec(),
        )
        .unwrap()
    }

    fn ascending_history() -> TrainingHistory {
        history(
            &[100.0, 105.0, 110.0, 112.5, 115.0],
            &[5; 5],
            &[8.0; 5],
            &[0.0, 7.0, 14.0, 21.0, 28.0],
        )
    }

    fn recovery_day(day: u32, calories: f64) -> RecoveryEntry {
        RecoveryEntry {
            date: NaiveDate::from_ymd_opt(2024, 3, day),
            calories: Some(calories),
            sleep_hours: Some(8.0),
            sleep_quality: Some(4.0),
            stress_level: None,
        }
    }

    fn assert_invariants(p: &Prescription, weights: &[f64]) {
        let y_mean = mean(weights);
        assert_eq!(p.total_sets as usize, p.sets.len());
        if p.deload_recommended {
            assert!((1..=4).contains(&p.total_sets));
        } else {
            assert!((1..=10).contains(&p.total_sets));
        }
        for set in &p.sets {
            assert!((1..=20).contains(&set.reps));
            assert!((6.0..=9.0).contains(&set.target_rpe));
            assert!(set.weight >= 0.5 * y_mean - 0.05);
            assert!(set.weight <= 0.95 * p.analysis.current_1rm + 0.05);
        }
        assert!((0.0..=1.0).contains(&p.analysis.plateau_score));
        assert!((-0.20..=0.07).contains(&p.analysis.progression_modifier));
    }

    #[test]
    fn test_sleep_factors() {
        assert!((sleep_factor(7.0) - 0.94).abs() < 1e-9);
        assert!((perceived_sleep_quality_factor(4.0) - 0.98).abs() < 1e-9);
        assert!((sleep_factor(2.0) - 0.64).abs() < 1e-9);
        assert_eq!(sleep_factor(12.0), 1.1);
        assert!((sleep_recovery_index(Some(8.0), Some(4.0)) - 0.98f64.sqrt()).abs() < 1e-12);
        assert_eq!(sleep_recovery_index(None, None), 1.0);
    }

    #[test]
    fn test_energy_availability() {
        assert!((energy_availability(Some(2720.0), 80.0) - 1.0).abs() < 1e-12);
        assert_eq!(energy_availability(Some(500.0), 80.0), 0.5);
        assert_eq!(energy_availability(Some(9000.0), 80.0), 1.1);
        assert_eq!(energy_availability(None, 80.0), 1.0);
        assert_eq!(energy_availability(Some(2720.0), 0.0), 1.0);
    }

    #[test]
    fn test_ac_ratio_and_monotony() {
        assert_eq!(ac_ratio(&[], 7), 1.0);
        assert_eq!(ac_ratio(&[100.0, 100.0], 7), 1.0);
        // Last two sets carry the load
        let ratio = ac_ratio(&[10.0, 10.0, 40.0, 40.0], 2);
        assert!((ratio - 1.6).abs() < 1e-12);

        assert_eq!(weekly_monotony(&[500.0, 500.0]), 1.0);
        assert!((weekly_monotony(&[4.0, 6.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_deload_trigger_and_assessment() {
        assert_eq!(deload_trigger(1.5, 8.0, 1.0), -0.5);
        assert!((deload_trigger(0.5, 9.0, 0.5) - 2.0).abs() < 1e-12);
        assert_eq!(deload_trigger(0.5, 6.0, 1.0), 0.0);

        assert_eq!(deload_assessment(0.0, 1.0, 1.0, 1.0, 0.0), 0.0);
        assert!((deload_assessment(1.0, 1.3, 1.5, 0.0, -1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_performance_scores_clamped() {
        let h = history(&[1.0, 100.0], &[1, 1], &[8.0, 8.0], &[0.0, 1.0]);
        assert_eq!(performance_scores(&h, 10.0), vec![0.5, 1.5]);
        assert_eq!(performance_scores(&h, 0.0), vec![1.0, 1.0]);
    }

    #[test]
    fn test_current_1rm_scenario() {
        let h = history(&[100.0, 105.0, 110.0], &[5; 3], &[8.0; 3], &[0.0, 1.0, 2.0]);
        let p = prescribe(&h, None, None, &AthleteProfile::default(), &EngineConfig::default());

        assert_eq!(round_1dp(p.analysis.current_1rm), 128.3);
        assert!((p.analysis.plateau_score - 0.3).abs() < 1e-12);
        assert!(!p.deload_recommended);
        assert_eq!(p.total_sets, 1);
        assert_eq!(p.sets[0].weight, 105.8);
        assert_eq!(p.sets[0].target_rpe, 7.1);
        assert_invariants(&p, h.weights());
    }

    #[test]
    fn test_full_pipeline_with_recovery_and_goal() {
        crate::logging::init_test();
        let h = ascending_history();
        let log = RecoveryLog::new(vec![
            recovery_day(1, 2720.0),
            recovery_day(8, 2720.0),
            recovery_day(15, 2720.0),
            recovery_day(22, 2720.0),
            recovery_day(29, 2176.0),
        ]);
        let goal = GoalConstraint {
            target_1rm: 140.0,
            days_remaining: 30,
        };

        let p = prescribe(
            &h,
            Some(&log),
            Some(&goal),
            &AthleteProfile::default(),
            &EngineConfig::default(),
        );

        assert_eq!(p.total_sets, 1);
        assert!(!p.deload_recommended);
        assert_eq!(
            p.sets[0],
            PrescriptionSet {
                set_number: 1,
                reps: 5,
                weight: 108.4,
                target_rpe: 7.0,
                rest_seconds: 100,
            }
        );
        assert!((p.analysis.energy_availability - 0.96).abs() < 1e-9);
        assert!((p.analysis.progression_modifier - 0.07).abs() < 1e-12);
        assert!(p.analysis.urgency_factor > 0.98 && p.analysis.urgency_factor < 1.0);
        assert_eq!(p.analysis.achievement_probability, 1.0);
        assert_eq!(p.recommendations.focus, Focus::Strength);
        assert!(!p.recommendations.recovery_needed);
    }

    #[test]
    fn test_identical_sets_plateau() {
        let h = history(&[100.0; 6], &[5; 6], &[8.0; 6], &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let p = prescribe(&h, None, None, &AthleteProfile::default(), &EngineConfig::default());

        assert!(p.analysis.plateau_score >= 0.7);
        assert!(!p.deload_recommended);
        assert_eq!(p.sets[0].reps, 5);
        assert_eq!(p.sets[0].weight, 89.2);
        assert_eq!(p.sets[0].target_rpe, 7.3);
        assert_eq!(p.sets[0].rest_seconds, 100);
        assert_invariants(&p, h.weights());
    }

    #[test]
    fn test_empty_history_returns_minimal_prescription() {
        let p = prescribe(
            &TrainingHistory::new(),
            None,
            None,
            &AthleteProfile::default(),
            &EngineConfig::default(),
        );
        assert_eq!(p.total_sets, 1);
        assert_eq!(p.sets.len(), 1);
        assert_eq!(p.sets[0].reps, 5);
        assert_eq!(p.sets[0].rest_seconds, 100);
        assert!(!p.deload_recommended);
        assert_eq!(p.analysis.mrv, 10.0);
    }

    #[test]
    fn test_single_set_history() {
        let h = history(&[60.0], &[8], &[7.0], &[0.0]);
        let p = prescribe(&h, None, None, &AthleteProfile::default(), &EngineConfig::default());
        assert_eq!(p.analysis.ac_ratio, 1.0);
        assert_eq!(p.analysis.confidence_interval, (0.0, 0.0));
        assert_invariants(&p, h.weights());
    }

    #[test]
    fn test_light_loads_yield_multiple_sets() {
        let weights = [0.2, 0.4, 0.6, 0.8, 1.0, 1.2, 1.4, 1.6];
        let h = history(
            &weights,
            &[1; 8],
            &[7.0; 8],
            &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
        );
        let p = prescribe(&h, None, None, &AthleteProfile::default(), &EngineConfig::default());

        assert!(!p.deload_recommended);
        assert_eq!(p.total_sets, 3);
        let rests: Vec<u32> = p.sets.iter().map(|s| s.rest_seconds).collect();
        assert_eq!(rests, vec![115, 125, 135]);
        assert!(p.sets.windows(2).all(|w| w[1].weight <= w[0].weight));
        assert_invariants(&p, &weights);
    }

    #[test]
    fn test_max_sets_caps_count() {
        let weights = [0.1, 0.3, 0.2, 0.5, 0.4, 0.7, 0.6, 0.9];
        let h = history(
            &weights,
            &[1; 8],
            &[7.0; 8],
            &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
        );
        let mut config = EngineConfig::default();
        let p = prescribe(&h, None, None, &AthleteProfile::default(), &config);
        assert_eq!(p.total_sets, 8);

        config.constants.max_sets = 5;
        let p = prescribe(&h, None, None, &AthleteProfile::default(), &config);
        assert_eq!(p.total_sets, 5);
        assert_eq!(p.sets.last().map(|s| s.set_number), Some(5));
    }

    #[test]
    fn test_noisy_flat_trend_triggers_deload() {
        let weights = [20.0, 22.5, 25.0, 20.0, 22.5, 25.0];
        let h = history(&weights, &[5; 6], &[8.0; 6], &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let p = prescribe(&h, None, None, &AthleteProfile::default(), &EngineConfig::default());

        let (low, high) = p.analysis.confidence_interval;
        assert!(low < 0.0 && high > 0.0);
        assert!(p.deload_recommended);
        assert!(p.recommendations.recovery_needed);
        assert!(p.total_sets <= 4);
        // 5 reps cut to ceil(3.5), weight scaled by 0.8 before the bounds
        assert_eq!(p.sets[0].reps, 4);
        assert_eq!(p.sets[0].weight, 17.8);
        assert_eq!(p.sets[0].rest_seconds, 115);
        assert_invariants(&p, &weights);
    }

    #[test]
    fn test_logged_stress_overrides_baseline() {
        let h = ascending_history();
        let calm: Vec<RecoveryEntry> = (1..=5).map(|d| recovery_day(d, 2720.0)).collect();
        let stressed: Vec<RecoveryEntry> = calm
            .iter()
            .cloned()
            .map(|e| RecoveryEntry {
                stress_level: Some(6.0),
                ..e
            })
            .collect();
        let athlete = AthleteProfile::default();
        let config = EngineConfig::default();

        let base = prescribe(&h, Some(&RecoveryLog::new(calm)), None, &athlete, &config);
        let high = prescribe(&h, Some(&RecoveryLog::new(stressed)), None, &athlete, &config);

        // stress 0.6 instead of 0.3 removes 0.3·MEV·EA
        assert!((base.analysis.mrv - high.analysis.mrv - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_volume_target_with_and_without_goal() {
        let h = ascending_history();
        let log = RecoveryLog::new(vec![
            recovery_day(1, 2720.0),
            recovery_day(8, 2720.0),
            recovery_day(15, 2720.0),
            recovery_day(22, 2720.0),
            recovery_day(29, 2176.0),
        ]);
        let goal = GoalConstraint {
            target_1rm: 140.0,
            days_remaining: 30,
        };
        let athlete = AthleteProfile::default();
        let config = EngineConfig::default();

        let with_goal = prescribe(&h, Some(&log), Some(&goal), &athlete, &config);
        let without = prescribe(&h, Some(&log), None, &athlete, &config);

        assert!((with_goal.analysis.volume_target - 299.1278435143813).abs() < 1e-6);
        assert!((without.analysis.volume_target - 21.280804694452762).abs() < 1e-6);
        // the goal raises tolerance and urgency, not the set schedule here
        assert!(with_goal.analysis.urgency_factor > 0.0);
        assert_eq!(without.analysis.urgency_factor, 0.0);
        assert_eq!(with_goal.sets, without.sets);
    }

    #[test]
    fn test_weekly_rate_uses_day_offsets() {
        // a steady 5x5 climb logged weekly must not collapse to singles
        let h = ascending_history();
        let p = prescribe(&h, None, None, &AthleteProfile::default(), &EngineConfig::default());

        assert_eq!(p.total_sets, 1);
        assert_eq!(p.sets[0].reps, 5);
        assert_eq!(p.sets[0].weight, 114.0);
        assert_eq!(p.sets[0].rest_seconds, 100);
    }

    #[test]
    fn test_goal_urgency() {
        let h = history(&[100.0, 105.0, 110.0], &[5; 3], &[8.0; 3], &[0.0, 1.0, 2.0]);
        let athlete = AthleteProfile::default();
        let config = EngineConfig::default();

        let near = GoalConstraint {
            target_1rm: 140.0,
            days_remaining: 30,
        };
        let far = GoalConstraint {
            target_1rm: 500.0,
            days_remaining: 30,
        };
        let expired = GoalConstraint {
            target_1rm: 140.0,
            days_remaining: 0,
        };

        let near_p = prescribe(&h, None, Some(&near), &athlete, &config);
        let far_p = prescribe(&h, None, Some(&far), &athlete, &config);
        let expired_p = prescribe(&h, None, Some(&expired), &athlete, &config);

        assert!((near_p.analysis.urgency_factor - 0.9847).abs() < 1e-4);
        assert!((far_p.analysis.urgency_factor - 0.0806).abs() < 1e-4);
        assert_eq!(expired_p.analysis.urgency_factor, 0.0);
    }

    #[test]
    fn test_recovery_pairs_from_recent_end() {
        let log = RecoveryLog::new(vec![
            RecoveryEntry {
                sleep_hours: Some(8.0),
                ..Default::default()
            },
            RecoveryEntry {
                sleep_hours: Some(4.0),
                ..Default::default()
            },
        ]);
        let signals = recovery_signals(Some(&log), 3, 80.0, 0.3);

        assert_eq!(signals.per_session.len(), 3);
        // oldest session predates the log
        assert!((signals.per_session[0] - (1.0 + signals.sleep_recovery_index) / 2.0).abs() < 1e-12);
        assert_eq!(signals.per_session[1], 1.0);
        assert!((signals.per_session[2] - (1.0 + 0.76f64.sqrt()) / 2.0).abs() < 1e-12);
    }
}

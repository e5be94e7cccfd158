//! Read-only trend analytics over training series.
//!
//! These functions back progress reports: trend slopes, change points,
//! band-energy decomposition, stress/fatigue accounting and plateau
//! scoring. Time arguments are day offsets (fractional days allowed).
//! Paired slices are walked with `zip`, so trailing elements of
//! a longer slice are ignored. Degenerate input (too few points, zero
//! variance, zero 1RM) yields a neutral 0 rather than an error.

use crate::math_tools::{self, mean};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Guard added to energy denominators
pub const EPSILON: f64 = 1e-9;

/// Default set duration (seconds) when none was logged
pub const DEFAULT_SET_DURATION: f64 = 50.0;

/// Two-sided 95% normal quantile
const Z_95: f64 = 1.96;

// Relative change across a window below which a series counts as flat
const FLAT_TOLERANCE: f64 = 0.02;

// ATL/CTL time constants in days
const ATL_DAYS: f64 = 7.0;
const CTL_DAYS: f64 = 42.0;

// ============================================================================
// Regression
// ============================================================================

/// Ordinary least-squares slope of `y` on `x`
pub fn linear_regression_slope(x: &[f64], y: &[f64]) -> f64 {
    let ones = vec![1.0; x.len().min(y.len())];
    weighted_linear_regression(x, y, &ones)
}

/// 95% confidence interval `(lower, upper)` on the OLS slope.
///
/// With fewer than three points the standard error is undefined and the
/// interval collapses onto the slope.
pub fn confidence_interval(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len().min(y.len());
    let slope = linear_regression_slope(x, y);
    if n < 3 {
        return (slope, slope);
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x);
    let my = mean(y);
    let sxx: f64 = x.iter().map(|v| (v - mx).powi(2)).sum();
    if sxx == 0.0 {
        return (slope, slope);
    }
    let intercept = my - slope * mx;
    let ssr: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - (intercept + slope * xi)).powi(2))
        .sum();
    let se = (ssr / (n - 2) as f64).sqrt() / sxx.sqrt();
    (slope - Z_95 * se, slope + Z_95 * se)
}

/// Weighted least-squares slope; 0 when weights sum to zero or `x` is constant
pub fn weighted_linear_regression(x: &[f64], y: &[f64], weights: &[f64]) -> f64 {
    let points: Vec<(f64, f64, f64)> = x
        .iter()
        .zip(y)
        .zip(weights)
        .map(|((xi, yi), wi)| (*xi, *yi, *wi))
        .collect();
    if points.len() < 2 {
        return 0.0;
    }
    let sw: f64 = points.iter().map(|p| p.2).sum();
    if sw <= 0.0 {
        return 0.0;
    }
    let mx = points.iter().map(|p| p.2 * p.0).sum::<f64>() / sw;
    let my = points.iter().map(|p| p.2 * p.1).sum::<f64>() / sw;
    let sxx: f64 = points.iter().map(|p| p.2 * (p.0 - mx).powi(2)).sum();
    if sxx == 0.0 {
        return 0.0;
    }
    let sxy: f64 = points.iter().map(|p| p.2 * (p.0 - mx) * (p.1 - my)).sum();
    sxy / sxx
}

/// Recency-weighted slope: point `i` of `n` gets weight `exp(-alpha·(n-1-i))`
pub fn weighted_slope(x: &[f64], y: &[f64], alpha: f64) -> f64 {
    let n = x.len().min(y.len());
    let weights: Vec<f64> = (0..n)
        .map(|i| (-alpha * (n - 1 - i) as f64).exp())
        .collect();
    weighted_linear_regression(x, y, &weights)
}

// ============================================================================
// Shape Analysis
// ============================================================================

/// Largest absolute shift in mean across any single split of the series
pub fn change_point(values: &[f64]) -> f64 {
    (1..values.len())
        .map(|k| (mean(&values[k..]) - mean(&values[..k])).abs())
        .fold(0.0, f64::max)
}

/// Signal energy split into three bands
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BandEnergy {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl BandEnergy {
    /// High-band share relative to the rest of the signal
    pub fn high_ratio(&self) -> f64 {
        self.high / (self.low + self.mid + EPSILON)
    }
}

// One Haar level: (approximation, detail). Odd input repeats its last sample.
fn haar_step(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut approx = Vec::with_capacity(values.len() / 2 + 1);
    let mut detail = Vec::with_capacity(values.len() / 2 + 1);
    for pair in values.chunks(2) {
        let a = pair[0];
        let b = pair.get(1).copied().unwrap_or(a);
        approx.push((a + b) / std::f64::consts::SQRT_2);
        detail.push((a - b) / std::f64::consts::SQRT_2);
    }
    (approx, detail)
}

fn energy(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// Two-level Haar decomposition of `values` into band energies.
///
/// `high` is the first-level detail energy, `mid` the second-level detail
/// energy and `low` the remaining approximation energy.
pub fn wavelet_energy(values: &[f64]) -> BandEnergy {
    if values.len() < 2 {
        return BandEnergy {
            low: energy(values),
            ..Default::default()
        };
    }
    let (approx1, detail1) = haar_step(values);
    if approx1.len() < 2 {
        return BandEnergy {
            low: energy(&approx1),
            mid: 0.0,
            high: energy(&detail1),
        };
    }
    let (approx2, detail2) = haar_step(&approx1);
    BandEnergy {
        low: energy(&approx2),
        mid: energy(&detail2),
        high: energy(&detail1),
    }
}

// ============================================================================
// Stress and Fatigue
// ============================================================================

fn relative_intensity(weight: f64, reps: u32, current_1rm: f64) -> f64 {
    math_tools::epley_1rm_with(weight, reps, math_tools::EPL_COEFF) / current_1rm
}

/// Training stress of a group of sets: Σ hours × intensity² × 100,
/// intensity being each set's Epley estimate relative to `current_1rm`
pub fn calculate_exercise_tss(
    weights: &[f64],
    reps: &[u32],
    durations: &[f64],
    current_1rm: f64,
) -> f64 {
    if current_1rm <= 0.0 {
        return 0.0;
    }
    weights
        .iter()
        .zip(reps)
        .zip(durations)
        .map(|((w, r), d)| {
            let intensity = relative_intensity(*w, *r, current_1rm);
            (d.max(0.0) / 3600.0) * intensity.powi(2) * 100.0
        })
        .sum()
}

/// Per-set TSS decayed with a 7-day time constant back from the last set
pub fn tss_adjusted_fatigue(
    weights: &[f64],
    reps: &[u32],
    times: &[f64],
    durations: &[f64],
    current_1rm: f64,
) -> f64 {
    let Some(t_last) = times.iter().copied().reduce(f64::max) else {
        return 0.0;
    };
    weights
        .iter()
        .zip(reps)
        .zip(times)
        .zip(durations)
        .map(|(((w, r), t), d)| {
            let tss = calculate_exercise_tss(&[*w], &[*r], &[*d], current_1rm);
            tss * (-(t_last - t) / ATL_DAYS).exp()
        })
        .sum()
}

/// Normalized stress (0-10) over the last `window` sets.
///
/// Each set contributes RPE/10 × relative intensity, weighted by
/// `0.9^(t_last - t)` so recent sets dominate.
pub fn stress_level(
    weights: &[f64],
    reps: &[u32],
    rpe: &[f64],
    times: &[f64],
    current_1rm: f64,
    window: usize,
) -> f64 {
    if current_1rm <= 0.0 || window == 0 {
        return 0.0;
    }
    let sets: Vec<(f64, u32, f64, f64)> = weights
        .iter()
        .zip(reps)
        .zip(rpe)
        .zip(times)
        .map(|(((w, r), e), t)| (*w, *r, *e, *t))
        .collect();
    let recent = &sets[sets.len().saturating_sub(window)..];
    let Some(t_last) = recent.iter().map(|s| s.3).reduce(f64::max) else {
        return 0.0;
    };

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (w, r, e, t) in recent {
        let recency = 0.9f64.powf(t_last - t);
        weighted += recency * (e / 10.0) * relative_intensity(*w, *r, current_1rm);
        total_weight += recency;
    }
    if total_weight <= 0.0 {
        return 0.0;
    }
    (10.0 * weighted / total_weight).clamp(0.0, 10.0)
}

/// Per-day training stress balance
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyBalance {
    pub day: i64,
    pub tss: f64,
    pub atl: f64,
    pub ctl: f64,
    pub tsb: f64,
}

/// Daily ATL/CTL/TSB over TSS, one entry per training day.
///
/// Days are `floor(time)`. Rest days between entries decay both averages
/// in closed form, so the output length follows the number of training
/// days rather than the span they cover.
pub fn training_stress_balance(
    weights: &[f64],
    reps: &[u32],
    durations: &[f64],
    times: &[f64],
    current_1rm: f64,
) -> Vec<DailyBalance> {
    let mut daily: BTreeMap<i64, f64> = BTreeMap::new();
    for (((w, r), d), t) in weights.iter().zip(reps).zip(durations).zip(times) {
        let tss = calculate_exercise_tss(&[*w], &[*r], &[*d], current_1rm);
        *daily.entry(t.floor() as i64).or_insert(0.0) += tss;
    }

    let atl_k = 2.0 / (ATL_DAYS + 1.0);
    let ctl_k = 2.0 / (CTL_DAYS + 1.0);
    let (mut atl, mut ctl) = (0.0, 0.0);
    let mut previous: Option<i64> = None;
    daily
        .into_iter()
        .map(|(day, tss)| {
            // zero-TSS days since the previous entry
            let rest_days = previous.map_or(0.0, |p| (day - p - 1) as f64);
            atl *= (1.0 - atl_k).powf(rest_days);
            ctl *= (1.0 - ctl_k).powf(rest_days);
            atl = atl * (1.0 - atl_k) + tss * atl_k;
            ctl = ctl * (1.0 - ctl_k) + tss * ctl_k;
            previous = Some(day);
            DailyBalance {
                day,
                tss,
                atl,
                ctl,
                tsb: ctl - atl,
            }
        })
        .collect()
}

/// Coefficient of variation of weekly volume (week = `floor(t / 7)`)
pub fn weekly_load_variability(weights: &[f64], reps: &[u32], times: &[f64]) -> f64 {
    let mut weekly: BTreeMap<i64, f64> = BTreeMap::new();
    for ((w, r), t) in weights.iter().zip(reps).zip(times) {
        *weekly.entry((t / 7.0).floor() as i64).or_insert(0.0) += w * f64::from(*r);
    }
    let volumes: Vec<f64> = weekly.into_values().collect();
    math_tools::coefficient_of_variation(&volumes)
}

// ============================================================================
// Plateau and Trend Classification
// ============================================================================

// 1 when the fitted change across the window is under FLAT_TOLERANCE of
// the mean, falling linearly to 0 at twice the tolerance.
fn flatness(times: &[f64], values: &[f64]) -> f64 {
    let m = mean(values);
    if values.len() < 2 || m <= 0.0 {
        return 0.0;
    }
    let span = times.last().copied().unwrap_or(0.0) - times.first().copied().unwrap_or(0.0);
    let slope = linear_regression_slope(times, values);
    let relative_change = (slope * span).abs() / m;
    (2.0 - relative_change / FLAT_TOLERANCE).clamp(0.0, 1.0)
}

/// Plateau score in [0, 1] combining a flat performance trend, rising
/// effort and flat volume.
///
/// Needs at least three points; returns 0 otherwise.
pub fn advanced_plateau_detection(
    performance: &[f64],
    times: &[f64],
    rpe: &[f64],
    volumes: &[f64],
) -> f64 {
    let n = performance
        .len()
        .min(times.len())
        .min(rpe.len())
        .min(volumes.len());
    if n < 3 {
        return 0.0;
    }
    let times = &times[..n];
    let span = times[n - 1] - times[0];

    let flat_performance = flatness(times, &performance[..n]);
    let rpe_rise = linear_regression_slope(times, &rpe[..n]) * span;
    let effort = (rpe_rise / 2.0).clamp(0.0, 1.0);
    let flat_volume = flatness(times, &volumes[..n]);

    0.5 * flat_performance + 0.25 * effort + 0.25 * flat_volume
}

/// Multi-scale plateau score in [0, 1].
///
/// Flatness is measured over the whole series, the last half and the last
/// quarter, with the most recent window weighted highest.
pub fn pyramid_plateau_detection(times: &[f64], values: &[f64]) -> f64 {
    let n = times.len().min(values.len());
    if n < 4 {
        return 0.0;
    }
    let windows = [(n, 0.2), (n / 2, 0.3), ((n / 4).max(2), 0.5)];
    windows
        .iter()
        .map(|(len, weight)| {
            let start = n - len;
            weight * flatness(&times[start..n], &values[start..n])
        })
        .sum()
}

/// Direction of a 1RM trend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub slope: f64,
    pub r_squared: f64,
    pub volatility: f64,
    pub direction: TrendDirection,
    pub plateau_score: f64,
}

/// Classify a 1RM series: fitted slope, fit quality, volatility and plateau
pub fn analyze_1rm_trends(times: &[f64], values: &[f64]) -> TrendSummary {
    let n = times.len().min(values.len());
    let (times, values) = (&times[..n], &values[..n]);
    let slope = linear_regression_slope(times, values);
    let m = mean(values);

    let r_squared = if n < 2 {
        0.0
    } else {
        let mt = mean(times);
        let intercept = m - slope * mt;
        let sst: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
        let ssr: f64 = times
            .iter()
            .zip(values)
            .map(|(t, v)| (v - (intercept + slope * t)).powi(2))
            .sum();
        if sst > 0.0 {
            (1.0 - ssr / sst).clamp(0.0, 1.0)
        } else {
            0.0
        }
    };

    let span = if n > 0 { times[n - 1] - times[0] } else { 0.0 };
    let relative_change = if m > 0.0 { slope * span / m } else { 0.0 };
    let direction = if relative_change > FLAT_TOLERANCE {
        TrendDirection::Improving
    } else if relative_change < -FLAT_TOLERANCE {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    TrendSummary {
        slope,
        r_squared,
        volatility: math_tools::coefficient_of_variation(values),
        direction,
        plateau_score: pyramid_plateau_detection(times, values),
    }
}

/// Momentum of a 1RM series: recency-weighted slope amplified by the
/// largest change point and the high-band energy share
pub fn performance_momentum(times: &[f64], estimates: &[f64]) -> f64 {
    if estimates.is_empty() {
        return 0.0;
    }
    let slope = weighted_slope(times, estimates, 0.4);
    let change = change_point(estimates);
    let bands = wavelet_energy(estimates);
    slope * (1.0 + change / estimates.len() as f64) * (1.0 + bands.high_ratio() / 10.0)
}

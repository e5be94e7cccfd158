//! Core domain types for the training-load prescription engine.
//!
//! This module defines the values that flow through the pipeline:
//! - Set-by-set training history (four aligned columns)
//! - Day-keyed recovery signals and goal constraints
//! - The prescription and its diagnostic analysis block
//! - Forecast points

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// History Types
// ============================================================================

/// A single logged set
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub weight: f64,
    pub reps: u32,
    pub rpe: f64,
    /// Day offset; sets sharing a timestamp form one session
    pub timestamp: f64,
}

/// Set-by-set training history stored as four index-aligned columns.
///
/// The columns are private so they can only grow together; every
/// constructor checks that they share one length.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    weights: Vec<f64>,
    reps: Vec<u32>,
    rpe: Vec<f64>,
    timestamps: Vec<f64>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from parallel columns.
    ///
    /// Fails with `InvalidInput` when the columns disagree on length.
    pub fn from_columns(
        weights: Vec<f64>,
        reps: Vec<u32>,
        rpe: Vec<f64>,
        timestamps: Vec<f64>,
    ) -> Result<Self> {
        let n = weights.len();
        if reps.len() != n || rpe.len() != n || timestamps.len() != n {
            return Err(Error::invalid_input(format!(
                "history columns must share one length (weights {}, reps {}, rpe {}, timestamps {})",
                n,
                reps.len(),
                rpe.len(),
                timestamps.len()
            )));
        }
        Ok(Self {
            weights,
            reps,
            rpe,
            timestamps,
        })
    }

    pub fn push(&mut self, sample: HistorySample) {
        self.weights.push(sample.weight);
        self.reps.push(sample.reps);
        self.rpe.push(sample.rpe);
        self.timestamps.push(sample.timestamp);
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn reps(&self) -> &[u32] {
        &self.reps
    }

    pub fn rpe(&self) -> &[f64] {
        &self.rpe
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Most recent timestamp, if any
    pub fn last_timestamp(&self) -> Option<f64> {
        self.timestamps.last().copied()
    }

    /// Per-set volume (weight × reps)
    pub fn volumes(&self) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.reps)
            .map(|(w, r)| w * f64::from(*r))
            .collect()
    }

    /// Volume per training session.
    ///
    /// Consecutive sets sharing a timestamp belong to the same session.
    pub fn session_volumes(&self) -> Vec<f64> {
        let mut sessions: Vec<f64> = Vec::new();
        let mut last_ts: Option<f64> = None;
        for (ts, volume) in self.timestamps.iter().zip(self.volumes()) {
            let same_session = last_ts == Some(*ts);
            match sessions.last_mut() {
                Some(total) if same_session => *total += volume,
                _ => sessions.push(volume),
            }
            last_ts = Some(*ts);
        }
        sessions
    }

    pub fn samples(&self) -> impl Iterator<Item = HistorySample> + '_ {
        (0..self.len()).map(move |i| HistorySample {
            weight: self.weights[i],
            reps: self.reps[i],
            rpe: self.rpe[i],
            timestamp: self.timestamps[i],
        })
    }
}

impl FromIterator<HistorySample> for TrainingHistory {
    fn from_iter<I: IntoIterator<Item = HistorySample>>(iter: I) -> Self {
        let mut history = TrainingHistory::new();
        for sample in iter {
            history.push(sample);
        }
        history
    }
}

// ============================================================================
// Recovery and Goal Types
// ============================================================================

/// One day of recovery signals
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryEntry {
    pub date: Option<NaiveDate>,
    pub calories: Option<f64>,
    pub sleep_hours: Option<f64>,
    /// Perceived sleep quality on a 0-5 scale
    pub sleep_quality: Option<f64>,
    /// Perceived stress on a 0-10 scale
    pub stress_level: Option<f64>,
}

/// Day-indexed recovery log, oldest entry first
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryLog {
    pub entries: Vec<RecoveryEntry>,
}

impl RecoveryLog {
    pub fn new(mut entries: Vec<RecoveryEntry>) -> Self {
        // Undated entries keep their relative position at the front.
        entries.sort_by_key(|e| e.date);
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn calories(&self) -> Vec<f64> {
        self.entries.iter().filter_map(|e| e.calories).collect()
    }

    pub fn sleep_hours(&self) -> Vec<f64> {
        self.entries.iter().filter_map(|e| e.sleep_hours).collect()
    }

    pub fn sleep_quality(&self) -> Vec<f64> {
        self.entries.iter().filter_map(|e| e.sleep_quality).collect()
    }

    pub fn stress_levels(&self) -> Vec<f64> {
        self.entries.iter().filter_map(|e| e.stress_level).collect()
    }
}

/// Target 1RM to reach within a number of days
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalConstraint {
    pub target_1rm: f64,
    pub days_remaining: u32,
}

/// Athlete attributes the pipeline reads alongside history
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteProfile {
    pub body_weight: f64,
    /// Reserved; accepted but not read by the pipeline
    pub months_active: f64,
    /// Reserved; accepted but not read by the pipeline
    pub workouts_per_month: f64,
}

impl Default for AthleteProfile {
    fn default() -> Self {
        Self {
            body_weight: 80.0,
            months_active: 1.0,
            workouts_per_month: 8.0,
        }
    }
}

// ============================================================================
// Prescription Types
// ============================================================================

/// One prescribed working set
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionSet {
    pub set_number: u32,
    pub reps: u32,
    pub weight: f64,
    pub target_rpe: f64,
    pub rest_seconds: u32,
}

/// Diagnostics computed while building a prescription
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub current_1rm: f64,
    pub plateau_score: f64,
    pub fatigue_level: f64,
    pub progression_modifier: f64,
    pub urgency_factor: f64,
    pub achievement_probability: f64,
    pub ac_ratio: f64,
    pub weekly_monotony: f64,
    pub deload_trigger: f64,
    pub weekly_rate: f64,
    pub mrv: f64,
    pub adjusted_mrv: f64,
    pub volume_target: f64,
    pub energy_availability: f64,
    pub sleep_recovery_index: f64,
    /// 95% interval on the load trend slope
    pub confidence_interval: (f64, f64),
}

/// Training emphasis of the session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    Strength,
    Hypertrophy,
}

/// Whether acute load sits inside the 0.8-1.3 acute:chronic band
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStatus {
    Optimal,
    Adjust,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub focus: Focus,
    pub volume_status: VolumeStatus,
    pub recovery_needed: bool,
}

/// A full next-session prescription
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub sets: Vec<PrescriptionSet>,
    pub total_sets: u32,
    pub deload_recommended: bool,
    pub analysis: Analysis,
    pub recommendations: Recommendations,
}

/// Projected 1RM at the end of a forecast week
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub week: u32,
    pub est_1rm: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(weight: f64, reps: u32, timestamp: f64) -> HistorySample {
        HistorySample {
            weight,
            reps,
            rpe: 8.0,
            timestamp,
        }
    }

    #[test]
    fn test_from_columns_rejects_mismatched_lengths() {
        let result = TrainingHistory::from_columns(
            vec![100.0, 105.0],
            vec![5],
            vec![8.0, 8.0],
            vec![0.0, 1.0],
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_push_keeps_columns_aligned() {
        let mut history = TrainingHistory::new();
        history.push(sample(100.0, 5, 0.0));
        history.push(sample(110.0, 3, 1.0));

        assert_eq!(history.len(), 2);
        assert_eq!(history.reps(), &[5, 3]);
        assert_eq!(history.volumes(), vec![500.0, 330.0]);
        assert_eq!(history.last_timestamp(), Some(1.0));
    }

    #[test]
    fn test_session_volumes_group_shared_timestamps() {
        let history: TrainingHistory = vec![
            sample(100.0, 5, 0.0),
            sample(100.0, 5, 0.0),
            sample(110.0, 5, 1.0),
            sample(100.0, 5, 0.0),
        ]
        .into_iter()
        .collect();

        // Only consecutive sets merge; a later set at timestamp 0 opens a new session.
        assert_eq!(history.session_volumes(), vec![1000.0, 550.0, 500.0]);
    }

    #[test]
    fn test_recovery_log_sorted_by_date() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d);
        let log = RecoveryLog::new(vec![
            RecoveryEntry {
                date: day(3),
                calories: Some(2500.0),
                ..Default::default()
            },
            RecoveryEntry {
                date: day(1),
                calories: Some(2000.0),
                ..Default::default()
            },
        ]);
        assert_eq!(log.calories(), vec![2000.0, 2500.0]);
        assert!(log.sleep_hours().is_empty());
    }

    #[test]
    fn test_prescription_serializes_enums_snake_case() {
        let recs = Recommendations {
            focus: Focus::Hypertrophy,
            volume_status: VolumeStatus::Optimal,
            recovery_needed: false,
        };
        let json = serde_json::to_string(&recs).unwrap();
        assert!(json.contains("\"hypertrophy\""));
        assert!(json.contains("\"optimal\""));
    }
}

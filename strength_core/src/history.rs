//! CSV loaders for set logs and recovery logs.
//!
//! This is the caller-side I/O boundary: the engine itself only sees
//! `TrainingHistory` and `RecoveryLog`. Malformed rows are skipped with a
//! warning so one bad line does not hide the rest of the log.

use crate::trend::DEFAULT_SET_DURATION;
use crate::{Error, HistorySample, RecoveryEntry, RecoveryLog, Result, TrainingHistory};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One logged set with its optional duration and calendar date
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
    pub weight: f64,
    pub reps: u32,
    pub rpe: f64,
    pub timestamp: f64,
    /// Set duration in seconds
    pub duration: Option<f64>,
    pub date: Option<NaiveDate>,
}

/// CSV row format for set logs
#[derive(Debug, Deserialize)]
struct SetRow {
    weight: f64,
    reps: u32,
    rpe: f64,
    timestamp: f64,
    duration: Option<f64>,
    date: Option<String>,
}

fn parse_date(raw: Option<String>) -> Result<Option<NaiveDate>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|e| Error::invalid_input(format!("Invalid date {:?}: {}", s, e))),
    }
}

impl TryFrom<SetRow> for SetLog {
    type Error = crate::Error;

    fn try_from(row: SetRow) -> Result<Self> {
        if !row.weight.is_finite() || row.weight < 0.0 {
            return Err(Error::invalid_input(format!("Invalid weight: {}", row.weight)));
        }
        if !(0.0..=10.0).contains(&row.rpe) {
            return Err(Error::invalid_input(format!("RPE out of range: {}", row.rpe)));
        }
        if !row.timestamp.is_finite() {
            return Err(Error::invalid_input("Timestamp must be finite"));
        }

        Ok(SetLog {
            weight: row.weight,
            reps: row.reps,
            rpe: row.rpe,
            timestamp: row.timestamp,
            duration: row.duration.filter(|d| *d > 0.0),
            date: parse_date(row.date)?,
        })
    }
}

/// Load a set log with headers `weight,reps,rpe,timestamp[,duration,date]`.
///
/// Rows keep file order.
pub fn load_set_log(path: &Path) -> Result<Vec<SetLog>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut sets = Vec::new();
    for (line, result) in reader.deserialize::<SetRow>().enumerate() {
        match result {
            Ok(row) => match SetLog::try_from(row) {
                Ok(set) => sets.push(set),
                Err(e) => tracing::warn!("Skipping set row {}: {}", line + 1, e),
            },
            Err(e) => tracing::warn!("Failed to deserialize set row {}: {}", line + 1, e),
        }
    }

    tracing::info!("Loaded {} sets from {:?}", sets.len(), path);
    Ok(sets)
}

/// Day offset of every set.
///
/// When every row carries a `date`, offsets count days since the earliest
/// date and sets sharing a date share an offset. Otherwise the `timestamp`
/// column is divided by `units_per_day`.
pub fn day_offsets(sets: &[SetLog], units_per_day: f64) -> Vec<f64> {
    if let Some(dates) = sets.iter().map(|s| s.date).collect::<Option<Vec<_>>>() {
        if let Some(first) = dates.iter().min().copied() {
            return dates
                .iter()
                .map(|d| (*d - first).num_days() as f64)
                .collect();
        }
    }
    sets.iter().map(|s| s.timestamp / units_per_day).collect()
}

/// Build the engine's four aligned columns, timestamps as day offsets
pub fn to_history(sets: &[SetLog], units_per_day: f64) -> TrainingHistory {
    sets.iter()
        .zip(day_offsets(sets, units_per_day))
        .map(|(s, day)| HistorySample {
            weight: s.weight,
            reps: s.reps,
            rpe: s.rpe,
            timestamp: day,
        })
        .collect()
}

/// Per-set durations in seconds, defaulting unlogged sets
pub fn durations(sets: &[SetLog]) -> Vec<f64> {
    sets.iter()
        .map(|s| s.duration.unwrap_or(DEFAULT_SET_DURATION))
        .collect()
}

/// CSV row format for recovery logs
#[derive(Debug, Deserialize)]
struct RecoveryRow {
    date: Option<String>,
    calories: Option<f64>,
    sleep_hours: Option<f64>,
    sleep_quality: Option<f64>,
    stress_level: Option<f64>,
}

impl TryFrom<RecoveryRow> for RecoveryEntry {
    type Error = crate::Error;

    fn try_from(row: RecoveryRow) -> Result<Self> {
        if let Some(q) = row.sleep_quality {
            if !(0.0..=5.0).contains(&q) {
                return Err(Error::invalid_input(format!("Sleep quality out of range: {}", q)));
            }
        }
        if let Some(s) = row.stress_level {
            if !(0.0..=10.0).contains(&s) {
                return Err(Error::invalid_input(format!("Stress level out of range: {}", s)));
            }
        }
        if row.sleep_hours.is_some_and(|h| !(0.0..=24.0).contains(&h)) {
            return Err(Error::invalid_input("Sleep hours must lie in [0, 24]"));
        }

        Ok(RecoveryEntry {
            date: parse_date(row.date)?,
            calories: row.calories.filter(|c| *c >= 0.0),
            sleep_hours: row.sleep_hours,
            sleep_quality: row.sleep_quality,
            stress_level: row.stress_level,
        })
    }
}

/// Load a recovery log with headers
/// `date,calories,sleep_hours,sleep_quality,stress_level`.
///
/// Every column but `date` may be blank. Entries are sorted by date.
pub fn load_recovery_log(path: &Path) -> Result<RecoveryLog> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut entries = Vec::new();
    for (line, result) in reader.deserialize::<RecoveryRow>().enumerate() {
        match result {
            Ok(row) => match RecoveryEntry::try_from(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping recovery row {}: {}", line + 1, e),
            },
            Err(e) => tracing::warn!("Failed to deserialize recovery row {}: {}", line + 1, e),
        }
    }

    tracing::info!("Loaded {} recovery days from {:?}", entries.len(), path);
    Ok(RecoveryLog::new(entries))
}

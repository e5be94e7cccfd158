//! Forward simulation of 1RM progress.
//!
//! The forecaster assumes the athlete performs exactly the first set the
//! engine prescribes, feeds that set back into a local copy of the history
//! and repeats. It is a self-consistent projection of the engine, not an
//! independent model.

use crate::engine::{self, EngineConfig};
use crate::{AthleteProfile, Error, ForecastPoint, HistorySample, Result, TrainingHistory};

/// Project the estimated 1RM at the end of each of the next `weeks` weeks.
///
/// Each simulated workout is stamped one day after the previous sample,
/// the first one on an empty history at day 1. Fails with `InvalidInput` when either horizon is zero.
pub fn forecast(
    history: &TrainingHistory,
    weeks: u32,
    workouts_per_week: u32,
    athlete: &AthleteProfile,
    config: &EngineConfig,
) -> Result<Vec<ForecastPoint>> {
    if weeks == 0 || workouts_per_week == 0 {
        return Err(Error::invalid_input(format!(
            "forecast horizon must be positive (weeks {}, workouts per week {})",
            weeks, workouts_per_week
        )));
    }

    let mut simulated = history.clone();
    let mut points = Vec::with_capacity(weeks as usize);

    for week in 1..=weeks {
        for _ in 0..workouts_per_week {
            let prescription = engine::prescribe(&simulated, None, None, athlete, config);
            let Some(first) = prescription.sets.first() else {
                break;
            };
            let timestamp = next_timestamp(&simulated);
            simulated.push(HistorySample {
                weight: first.weight,
                reps: first.reps,
                rpe: first.target_rpe.round(),
                timestamp,
            });
        }

        let est_1rm = engine::current_1rm(&simulated, config.constants.epl_coeff);
        tracing::debug!("Week {}: estimated 1RM {:.2}", week, est_1rm);
        points.push(ForecastPoint {
            week,
            est_1rm: (est_1rm * 100.0).round() / 100.0,
        });
    }

    tracing::info!(
        "Forecast {} weeks x {} workouts from {} logged sets",
        weeks,
        workouts_per_week,
        history.len()
    );
    Ok(points)
}

fn next_timestamp(history: &TrainingHistory) -> f64 {
    history.last_timestamp().unwrap_or(0.0) + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_history() -> TrainingHistory {
        TrainingHistory::from_columns(
            vec![100.0, 105.0, 110.0],
            vec![5, 5, 5],
            vec![8.0, 8.0, 8.0],
            vec![0.0, 1.0, 2.0],
        )
        .unwrap()
    }

    #[test]
    fn test_forecast_returns_one_point_per_week() {
        let history = create_test_history();
        let points = forecast(
            &history,
            4,
            3,
            &AthleteProfile::default(),
            &EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(points.len(), 4);
        let weeks: Vec<u32> = points.iter().map(|p| p.week).collect();
        assert_eq!(weeks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_forecast_never_drops_below_logged_best() {
        let history = create_test_history();
        let points = forecast(
            &history,
            3,
            2,
            &AthleteProfile::default(),
            &EngineConfig::default(),
        )
        .unwrap();

        // 110 x 5 is the logged best
        assert!(points.iter().all(|p| p.est_1rm >= 128.31));
        assert!(points.windows(2).all(|w| w[1].est_1rm >= w[0].est_1rm));
        // The caller's history is untouched
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_forecast_from_empty_history() {
        let points = forecast(
            &TrainingHistory::new(),
            2,
            1,
            &AthleteProfile::default(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].est_1rm, 0.0);
    }

    #[test]
    fn test_simulated_workouts_advance_one_day() {
        assert_eq!(next_timestamp(&TrainingHistory::new()), 1.0);
        assert_eq!(next_timestamp(&create_test_history()), 3.0);
    }

    #[test]
    fn test_forecast_rejects_zero_horizon() {
        let history = create_test_history();
        let athlete = AthleteProfile::default();
        let config = EngineConfig::default();

        assert!(matches!(
            forecast(&history, 0, 3, &athlete, &config),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            forecast(&history, 3, 0, &athlete, &config),
            Err(Error::InvalidInput(_))
        ));
    }
}

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use strength_core::math_tools::{self, mean};
use strength_core::trend::{self, DailyBalance, TrendSummary};
use strength_core::*;

/// Sets of the most recent block used for effort and stress figures
const RECENT_WINDOW: usize = 5;

#[derive(Parser)]
#[command(name = "liftrx")]
#[command(about = "Strength training-load prescription engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override config file location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Prescribe the next session from a set log
    Prescribe {
        /// Set log CSV (weight,reps,rpe,timestamp[,duration,date])
        #[arg(long)]
        history: PathBuf,

        /// Recovery log CSV (date,calories,sleep_hours,sleep_quality,stress_level)
        #[arg(long)]
        recovery: Option<PathBuf>,

        /// Goal 1RM
        #[arg(long, requires = "days_remaining")]
        target_1rm: Option<f64>,

        /// Days left to reach the goal 1RM
        #[arg(long, requires = "target_1rm")]
        days_remaining: Option<u32>,

        /// Override the configured body weight
        #[arg(long)]
        body_weight: Option<f64>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Project 1RM over the coming weeks
    Forecast {
        #[arg(long)]
        history: PathBuf,

        #[arg(long)]
        weeks: u32,

        /// Simulated workouts per week
        #[arg(long, default_value_t = 3)]
        per_week: u32,

        #[arg(long)]
        json: bool,
    },

    /// Print a warmup ramp for a working weight
    Warmup {
        #[arg(long)]
        weight: f64,

        #[arg(long)]
        reps: u32,

        #[arg(long, default_value_t = 3)]
        sets: usize,
    },

    /// Report trend, stress and readiness figures for a set log
    Trends {
        #[arg(long)]
        history: PathBuf,

        /// Recovery log used for the deload score
        #[arg(long)]
        recovery: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Destination (defaults to the standard config path)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    strength_core::logging::init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Prescribe {
            history,
            recovery,
            target_1rm,
            days_remaining,
            body_weight,
            json,
        } => {
            let goal = target_1rm
                .zip(days_remaining)
                .map(|(target_1rm, days_remaining)| GoalConstraint {
                    target_1rm,
                    days_remaining,
                });
            let config = load_config(config_path)?;
            cmd_prescribe(&history, recovery.as_deref(), goal, body_weight, json, &config)
        }
        Commands::Forecast {
            history,
            weeks,
            per_week,
            json,
        } => cmd_forecast(&history, weeks, per_week, json, &load_config(config_path)?),
        Commands::Warmup { weight, reps, sets } => cmd_warmup(weight, reps, sets),
        Commands::Trends {
            history,
            recovery,
            json,
        } => cmd_trends(&history, recovery.as_deref(), json, &load_config(config_path)?),
        Commands::Config { action } => cmd_config(action, config_path),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn cmd_prescribe(
    history_path: &Path,
    recovery_path: Option<&Path>,
    goal: Option<GoalConstraint>,
    body_weight: Option<f64>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let sets = load_set_log(history_path)?;
    let history = history::to_history(&sets, config.log.timestamp_units_per_day);
    let recovery = recovery_path.map(load_recovery_log).transpose()?;
    if let Some(goal) = &goal {
        tracing::info!(
            "Goal: {:.1} in {} days",
            goal.target_1rm,
            goal.days_remaining
        );
    }

    let mut athlete = config.athlete;
    if let Some(bw) = body_weight {
        if bw <= 0.0 {
            return Err(Error::InvalidInput("body weight must be positive".into()));
        }
        tracing::debug!("Body weight override: {}", bw);
        athlete.body_weight = bw;
    }

    let prescription = prescribe(
        &history,
        recovery.as_ref(),
        goal.as_ref(),
        &athlete,
        &config.engine_config(),
    );
    tracing::info!(
        "Prescribed {} sets from {} logged sets (deload: {})",
        prescription.total_sets,
        history.len(),
        prescription.deload_recommended
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&prescription)?);
    } else {
        display_prescription(&prescription);
    }
    Ok(())
}

fn cmd_forecast(
    history_path: &Path,
    weeks: u32,
    per_week: u32,
    json: bool,
    config: &Config,
) -> Result<()> {
    let sets = load_set_log(history_path)?;
    let history = history::to_history(&sets, config.log.timestamp_units_per_day);
    tracing::debug!(
        "Forecasting {} weeks at {} workouts/week from {} sets",
        weeks,
        per_week,
        history.len()
    );
    let points = forecast(
        &history,
        weeks,
        per_week,
        &config.athlete,
        &config.engine_config(),
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
    } else {
        println!("Projected 1RM ({} workouts/week)", per_week);
        for point in &points {
            println!("  Week {:>2}: {:.2}", point.week, point.est_1rm);
        }
    }
    Ok(())
}

fn cmd_warmup(weight: f64, reps: u32, sets: usize) -> Result<()> {
    let plan = math_tools::warmup_plan(weight, reps, sets)?;
    tracing::debug!("Warmup ramp of {} sets for {} x {}", plan.len(), weight, reps);

    println!("Warmup for {} x {}", weight, reps);
    for (i, (reps, weight)) in plan.iter().enumerate() {
        println!("  {}. {} reps @ {:.1}", i + 1, reps, weight);
    }
    Ok(())
}

/// Summary printed by `liftrx trends`
#[derive(Debug, Serialize)]
struct TrendReport {
    sets: usize,
    current_1rm: f64,
    trend: TrendSummary,
    momentum: f64,
    plateau_score: f64,
    stress: f64,
    fatigue: f64,
    readiness: f64,
    overtraining_index: f64,
    load_variability: f64,
    deload_score: f64,
    balance: Option<DailyBalance>,
}

fn trend_report(
    sets: &[SetLog],
    recovery: Option<&RecoveryLog>,
    config: &Config,
) -> TrendReport {
    let history = history::to_history(sets, config.log.timestamp_units_per_day);
    let durations = history::durations(sets);
    let c = &config.prescription;

    let weights = history.weights();
    let reps = history.reps();
    let rpe = history.rpe();
    let times = history.timestamps();
    let volumes = history.volumes();

    let current_1rm = engine::current_1rm(&history, c.epl_coeff);
    let estimates: Vec<f64> = history
        .samples()
        .map(|s| math_tools::epley_1rm_with(s.weight, s.reps, c.epl_coeff))
        .collect();

    let summary = trend::analyze_1rm_trends(times, &estimates);
    let stress = trend::stress_level(weights, reps, rpe, times, current_1rm, RECENT_WINDOW);
    let fatigue = trend::tss_adjusted_fatigue(weights, reps, times, &durations, current_1rm);
    let variability = trend::weekly_load_variability(weights, reps, times);

    let recent_rpe = mean(&rpe[rpe.len().saturating_sub(RECENT_WINDOW)..]);
    let baseline_rpe = mean(rpe);
    let rpe_factor = if baseline_rpe > 0.0 {
        recent_rpe / baseline_rpe
    } else {
        1.0
    };
    let recovery_quality = recovery.filter(|log| !log.is_empty()).map_or(1.0, |log| {
        let average = |values: Vec<f64>| (!values.is_empty()).then(|| mean(&values));
        engine::recovery_quality(
            average(log.calories()),
            average(log.sleep_hours()),
            average(log.sleep_quality()),
            config.athlete.body_weight,
        )
    });
    let span = match (times.first(), times.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    };
    let estimate_mean = mean(&estimates);
    let relative_trend = if estimate_mean > 0.0 {
        summary.slope * span / estimate_mean
    } else {
        0.0
    };

    TrendReport {
        sets: history.len(),
        current_1rm,
        trend: summary,
        momentum: trend::performance_momentum(times, &estimates),
        plateau_score: trend::advanced_plateau_detection(&estimates, times, rpe, &volumes),
        stress,
        fatigue,
        readiness: math_tools::readiness_score(stress, fatigue / 1000.0),
        overtraining_index: math_tools::overtraining_index(stress, fatigue / 1000.0, variability),
        load_variability: variability,
        deload_score: engine::deload_assessment(
            stress / 10.0,
            rpe_factor,
            engine::ac_ratio(&volumes, c.acute_window),
            recovery_quality,
            relative_trend,
        ),
        balance: trend::training_stress_balance(weights, reps, &durations, times, current_1rm)
            .last()
            .copied(),
    }
}

fn cmd_trends(
    history_path: &Path,
    recovery_path: Option<&Path>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let sets = load_set_log(history_path)?;
    let recovery = recovery_path.map(load_recovery_log).transpose()?;
    let report = trend_report(&sets, recovery.as_ref(), config);
    tracing::info!(
        "Trend report over {} sets: {:?}",
        report.sets,
        report.trend.direction
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Trends over {} sets", report.sets);
    println!("  Estimated 1RM:      {:.1}", report.current_1rm);
    println!(
        "  Direction:          {:?} (slope {:.4}, r² {:.2})",
        report.trend.direction, report.trend.slope, report.trend.r_squared
    );
    println!("  Momentum:           {:.4}", report.momentum);
    println!("  Plateau score:      {:.2}", report.plateau_score);
    println!("  Stress (0-10):      {:.2}", report.stress);
    println!("  Fatigue (TSS):      {:.2}", report.fatigue);
    println!("  Readiness (0-10):   {:.2}", report.readiness);
    println!("  Overtraining index: {:.2}", report.overtraining_index);
    println!("  Load variability:   {:.2}", report.load_variability);
    println!("  Deload score:       {:.2}", report.deload_score);
    if let Some(balance) = report.balance {
        println!(
            "  Balance (day {}):    ATL {:.2}, CTL {:.2}, TSB {:.2}",
            balance.day, balance.atl, balance.ctl, balance.tsb
        );
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Init { path, force } => {
            let path = match path.or_else(|| config_path.map(Path::to_path_buf)) {
                Some(path) => path,
                None => Config::default_config_path()?,
            };
            if path.exists() && !force {
                return Err(Error::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            if path.exists() {
                tracing::warn!("Overwriting existing config at {:?}", path);
            }
            Config::default().save_to(&path)?;
            println!("✓ Wrote default config to {}", path.display());
            Ok(())
        }
    }
}

fn display_prescription(prescription: &Prescription) {
    let a = &prescription.analysis;
    let r = &prescription.recommendations;

    println!();
    if prescription.deload_recommended {
        println!("  NEXT SESSION: {} sets (deload)", prescription.total_sets);
    } else {
        println!("  NEXT SESSION: {} sets", prescription.total_sets);
    }
    println!();

    for set in &prescription.sets {
        println!(
            "  Set {}: {} reps @ {:.1}  RPE {:.1}  rest {}s",
            set.set_number, set.reps, set.weight, set.target_rpe, set.rest_seconds
        );
    }

    println!();
    println!("  Focus: {:?}  Volume: {:?}", r.focus, r.volume_status);
    println!("  Estimated 1RM:        {:.1}", a.current_1rm);
    println!("  Plateau score:        {:.2}", a.plateau_score);
    println!("  Progression modifier: {:+.3}", a.progression_modifier);
    println!("  Acute:chronic ratio:  {:.2}", a.ac_ratio);
    println!("  Fatigue:              {:.1}", a.fatigue_level);
    println!("  Volume target:        {:.1}", a.volume_target);
    if a.urgency_factor > 0.0 {
        println!("  Goal urgency:         {:.2}", a.urgency_factor);
    }
    println!();
}

#![forbid(unsafe_code)]

//! Core domain model and training-load logic for liftrx.
//!
//! This crate provides:
//! - Domain types (history, recovery signals, prescriptions)
//! - Numeric primitives and trend analytics
//! - Prescription engine and progress forecaster
//! - Configuration and CSV loaders

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod math_tools;
pub mod trend;
pub mod engine;
pub mod forecast;
pub mod history;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use engine::{prescribe, EngineConfig, LandmarkConfig, PrescriptionConstants};
pub use forecast::forecast;
pub use history::{load_recovery_log, load_set_log, SetLog};

//! Monitor Configuration Module
//!
//! Provides station configuration loaded from TOML files. Horizons, scenario
//! policy, fallback tuning, derived-parameter assumptions and role thresholds
//! are operator-tunable; the classification bands stay fixed in `defaults`.
//!
//! ## Loading Order
//!
//! 1. `AQUASCOPE_CONFIG` environment variable (path to TOML file)
//! 2. `aquascope.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is immutable and handed to `AnalysisPipeline::new`;
//! nothing in the crate reads configuration from ambient global state.

mod monitor_config;
pub mod defaults;

pub use monitor_config::*;

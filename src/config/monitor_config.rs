//! Monitor Configuration - pipeline horizons, fallback tuning and role
//! thresholds as TOML values
//!
//! Each struct implements `Default` with the values of `config::defaults`,
//! so an empty or missing config file behaves exactly like the built-in
//! constants.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults::{
    ADMIN_CONFIDENCE, CLEANUP_FREQUENCY, CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_ALKALINITY,
    DEFAULT_FLUORIDE, DEFAULT_HARDNESS, DEFAULT_SERVER_ADDR, FALLBACK_INDEX_SCORE,
    FALLBACK_MATERIAL_CONFIDENCE, FORECAST_HORIZON_DAYS, FORECAST_NOISE_SD,
    GOVERNMENT_CONFIDENCE, INDEX_SCORE_MAX, INDEX_SCORE_MIN, PHYSICS_FALLBACK_POINTS,
    PHYSICS_HORIZON_HOURS, POLLUTION_LOAD_PER_PARTICLE, PUBLIC_CONFIDENCE,
    REGULATION_STRICTNESS, RESEARCHER_CONFIDENCE, SIMULATION_HORIZON_DAYS, SIMULATION_STEP_SD,
    TOTAL_COLIFORM_FACTOR,
};
use crate::types::{Polymer, RoleProfile, UserRole};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a monitoring station deployment.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$AQUASCOPE_CONFIG` env var
/// 2. `./aquascope.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// Station identification
    #[serde(default)]
    pub station: StationInfo,

    /// Forecast, physics and simulation horizons
    #[serde(default)]
    pub horizons: HorizonConfig,

    /// Fixed scenario policy handed to the simulator
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Synthetic fallback tuning
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Assumptions for the parameters that are not measured directly
    #[serde(default)]
    pub derived_parameters: DerivedParameterConfig,

    /// Confidence threshold per user role
    #[serde(default)]
    pub roles: RoleThresholdConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$AQUASCOPE_CONFIG` environment variable
    /// 2. `./aquascope.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), station = %config.station.name, "Loaded monitor config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(station = %config.station.name, "Loaded monitor config from ./{}", CONFIG_FILE_NAME);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", CONFIG_FILE_NAME);
                }
            }
        }

        info!("No {} found, using built-in defaults", CONFIG_FILE_NAME);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self = toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Confidence threshold configured for a role.
    pub fn role_threshold(&self, role: UserRole) -> f64 {
        match role {
            UserRole::Public => self.roles.public,
            UserRole::Government => self.roles.government,
            UserRole::Researcher => self.roles.researcher,
            UserRole::Admin => self.roles.admin,
        }
    }

    /// Role profile with the `[roles]` threshold in place of the built-in one.
    pub fn role_profile(&self, role: UserRole) -> RoleProfile {
        RoleProfile {
            confidence_threshold: self.role_threshold(role),
            ..*role.profile()
        }
    }

    /// Validate that the configuration is internally consistent.
    ///
    /// Collects every problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let h = &self.horizons;
        if h.forecast_days == 0 {
            errors.push("horizons.forecast_days must be > 0".to_string());
        }
        if h.physics_hours == 0 {
            errors.push("horizons.physics_hours must be > 0".to_string());
        }
        if h.physics_fallback_points < 2 {
            errors.push(format!(
                "horizons.physics_fallback_points must be >= 2 (got {})",
                h.physics_fallback_points
            ));
        }
        if h.simulation_days == 0 {
            errors.push("horizons.simulation_days must be > 0".to_string());
        }

        let p = &self.policy;
        Self::check_finite(p.pollution_load_per_particle, "policy.pollution_load_per_particle", &mut errors);
        Self::check_unit(p.cleanup_frequency, "policy.cleanup_frequency", &mut errors);
        Self::check_unit(p.regulation_strictness, "policy.regulation_strictness", &mut errors);
        if p.pollution_load_per_particle < 0.0 {
            errors.push(format!(
                "policy.pollution_load_per_particle must be >= 0 (got {})",
                p.pollution_load_per_particle
            ));
        }

        let f = &self.fallback;
        Self::check_unit(f.material_confidence, "fallback.material_confidence", &mut errors);
        Self::check_finite(f.index_score, "fallback.index_score", &mut errors);
        if f.index_score.is_finite() && !(INDEX_SCORE_MIN..=INDEX_SCORE_MAX).contains(&f.index_score) {
            errors.push(format!(
                "fallback.index_score must be within [{INDEX_SCORE_MIN}, {INDEX_SCORE_MAX}] (got {})",
                f.index_score
            ));
        }
        Self::check_spread(f.forecast_noise_sd, "fallback.forecast_noise_sd", &mut errors);
        Self::check_spread(f.simulation_step_sd, "fallback.simulation_step_sd", &mut errors);

        let d = &self.derived_parameters;
        Self::check_finite(d.total_coliform_factor, "derived_parameters.total_coliform_factor", &mut errors);
        Self::check_finite(d.fluoride, "derived_parameters.fluoride", &mut errors);
        Self::check_finite(d.hardness, "derived_parameters.hardness", &mut errors);
        Self::check_finite(d.alkalinity, "derived_parameters.alkalinity", &mut errors);

        for role in UserRole::ALL {
            let name = format!("roles.{}", role.key());
            Self::check_unit(self.role_threshold(role), &name, &mut errors);
        }

        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_finite(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() {
            errors.push(format!("{name}: value must be finite (got {value})"));
        }
    }

    fn check_unit(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN comparisons silently pass the range check
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            errors.push(format!("{name}: must be within [0, 1] (got {value})"));
        }
    }

    fn check_spread(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value < 0.0 {
            errors.push(format!("{name}: must be a finite standard deviation >= 0 (got {value})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Config parse error ({}): {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Station Info
// ============================================================================

/// Identification metadata - not used for logic, but appears in logs and reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationInfo {
    /// Station name / identifier
    #[serde(default = "default_station_name")]
    pub name: String,

    /// Water body or site description
    #[serde(default)]
    pub site: String,
}

fn default_station_name() -> String {
    "DEFAULT".to_string()
}

impl Default for StationInfo {
    fn default() -> Self {
        Self {
            name: default_station_name(),
            site: String::new(),
        }
    }
}

// ============================================================================
// Horizons
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HorizonConfig {
    /// Daily points produced by the trend forecaster
    #[serde(default = "default_forecast_days")]
    pub forecast_days: usize,

    /// Hours covered by the physics predictor
    #[serde(default = "default_physics_hours")]
    pub physics_hours: u32,

    /// Points in the synthetic physics series
    #[serde(default = "default_physics_fallback_points")]
    pub physics_fallback_points: usize,

    /// Daily points produced by the scenario simulator
    #[serde(default = "default_simulation_days")]
    pub simulation_days: usize,
}

fn default_forecast_days() -> usize {
    FORECAST_HORIZON_DAYS
}
fn default_physics_hours() -> u32 {
    PHYSICS_HORIZON_HOURS
}
fn default_physics_fallback_points() -> usize {
    PHYSICS_FALLBACK_POINTS
}
fn default_simulation_days() -> usize {
    SIMULATION_HORIZON_DAYS
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            forecast_days: default_forecast_days(),
            physics_hours: default_physics_hours(),
            physics_fallback_points: default_physics_fallback_points(),
            simulation_days: default_simulation_days(),
        }
    }
}

// ============================================================================
// Scenario Policy
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
    /// Pollution load per detected particle
    #[serde(default = "default_pollution_load_per_particle")]
    pub pollution_load_per_particle: f64,

    /// Cleanup frequency (0-1)
    #[serde(default = "default_cleanup_frequency")]
    pub cleanup_frequency: f64,

    /// Regulation strictness (0-1)
    #[serde(default = "default_regulation_strictness")]
    pub regulation_strictness: f64,
}

fn default_pollution_load_per_particle() -> f64 {
    POLLUTION_LOAD_PER_PARTICLE
}
fn default_cleanup_frequency() -> f64 {
    CLEANUP_FREQUENCY
}
fn default_regulation_strictness() -> f64 {
    REGULATION_STRICTNESS
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            pollution_load_per_particle: default_pollution_load_per_particle(),
            cleanup_frequency: default_cleanup_frequency(),
            regulation_strictness: default_regulation_strictness(),
        }
    }
}

// ============================================================================
// Fallbacks
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FallbackConfig {
    /// Polymer label reported when the classifier is unavailable
    #[serde(default)]
    pub polymer: Polymer,

    /// Confidence attached to the fallback polymer
    #[serde(default = "default_material_confidence")]
    pub material_confidence: f64,

    /// Index score used without a scorer or a last-known score
    #[serde(default = "default_index_score")]
    pub index_score: f64,

    /// Std-dev of the per-day forecast perturbation
    #[serde(default = "default_forecast_noise_sd")]
    pub forecast_noise_sd: f64,

    /// Std-dev of each simulated random-walk step
    #[serde(default = "default_simulation_step_sd")]
    pub simulation_step_sd: f64,

    /// Fixed RNG seed; unset draws a fresh seed per run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_material_confidence() -> f64 {
    FALLBACK_MATERIAL_CONFIDENCE
}
fn default_index_score() -> f64 {
    FALLBACK_INDEX_SCORE
}
fn default_forecast_noise_sd() -> f64 {
    FORECAST_NOISE_SD
}
fn default_simulation_step_sd() -> f64 {
    SIMULATION_STEP_SD
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            polymer: Polymer::default(),
            material_confidence: default_material_confidence(),
            index_score: default_index_score(),
            forecast_noise_sd: default_forecast_noise_sd(),
            simulation_step_sd: default_simulation_step_sd(),
            seed: None,
        }
    }
}

// ============================================================================
// Derived Parameters
// ============================================================================

/// Values for the parameter keys a field sample does not measure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedParameterConfig {
    /// total_coliform = fecal_coliform * factor
    #[serde(default = "default_total_coliform_factor")]
    pub total_coliform_factor: f64,

    #[serde(default = "default_fluoride")]
    pub fluoride: f64,

    #[serde(default = "default_hardness")]
    pub hardness: f64,

    #[serde(default = "default_alkalinity")]
    pub alkalinity: f64,
}

fn default_total_coliform_factor() -> f64 {
    TOTAL_COLIFORM_FACTOR
}
fn default_fluoride() -> f64 {
    DEFAULT_FLUORIDE
}
fn default_hardness() -> f64 {
    DEFAULT_HARDNESS
}
fn default_alkalinity() -> f64 {
    DEFAULT_ALKALINITY
}

impl Default for DerivedParameterConfig {
    fn default() -> Self {
        Self {
            total_coliform_factor: default_total_coliform_factor(),
            fluoride: default_fluoride(),
            hardness: default_hardness(),
            alkalinity: default_alkalinity(),
        }
    }
}

// ============================================================================
// Roles
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleThresholdConfig {
    #[serde(default = "default_public")]
    pub public: f64,
    #[serde(default = "default_government")]
    pub government: f64,
    #[serde(default = "default_researcher")]
    pub researcher: f64,
    #[serde(default = "default_admin")]
    pub admin: f64,
}

fn default_public() -> f64 {
    PUBLIC_CONFIDENCE
}
fn default_government() -> f64 {
    GOVERNMENT_CONFIDENCE
}
fn default_researcher() -> f64 {
    RESEARCHER_CONFIDENCE
}
fn default_admin() -> f64 {
    ADMIN_CONFIDENCE
}

impl Default for RoleThresholdConfig {
    fn default() -> Self {
        Self {
            public: default_public(),
            government: default_government(),
            researcher: default_researcher(),
            admin: default_admin(),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    DEFAULT_SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

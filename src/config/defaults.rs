//! System-wide default constants.
//!
//! Centralises the numbers the analysis pipeline and its fallbacks depend on.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Configuration Loading
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "AQUASCOPE_CONFIG";

/// Config file looked up in the current working directory.
pub const CONFIG_FILE_NAME: &str = "aquascope.toml";

/// Default HTTP bind address for `aquascope serve`.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

// ============================================================================
// Classification Thresholds (fixed, not operator-tunable)
// ============================================================================

/// Particle count above which contamination risk is High.
pub const PARTICLE_RISK_HIGH_ABOVE: u32 = 100;

/// Particle count above which contamination risk is Moderate.
pub const PARTICLE_RISK_MODERATE_ABOVE: u32 = 50;

/// Index score above which water quality is Good.
pub const INDEX_GOOD_ABOVE: f64 = 75.0;

/// Index score above which water quality is Moderate.
pub const INDEX_MODERATE_ABOVE: f64 = 50.0;

/// Classifier confidence above which the polymer label is High confidence.
pub const CONFIDENCE_HIGH_ABOVE: f64 = 0.8;

/// Classifier confidence above which the polymer label is Medium confidence.
pub const CONFIDENCE_MEDIUM_ABOVE: f64 = 0.5;

/// Dissolved oxygen level (mg/L) below which a predicted point is critical.
pub const CRITICAL_OXYGEN_MG_L: f64 = 4.0;

/// Final-minus-initial simulated score beyond which the trend is not Stable.
pub const SIMULATION_TREND_DELTA: f64 = 5.0;

/// Index scores live on a 0-100 scale.
pub const INDEX_SCORE_MIN: f64 = 0.0;
pub const INDEX_SCORE_MAX: f64 = 100.0;

// ============================================================================
// Stage Output Checks
// ============================================================================

/// Allowed deviation of a material probability distribution from 1.0.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Number of points a spectrum is resampled to before classification.
pub const SPECTRUM_LENGTH: usize = 1024;

/// Minimum points a supplied spectrum must carry to be interpolated.
pub const MIN_SPECTRUM_POINTS: usize = 2;

// ============================================================================
// Horizons
// ============================================================================

/// Trend forecast horizon (days).
pub const FORECAST_HORIZON_DAYS: usize = 60;

/// Physics (dissolved oxygen) prediction horizon (hours).
pub const PHYSICS_HORIZON_HOURS: u32 = 72;

/// Points in the synthetic physics fallback series.
pub const PHYSICS_FALLBACK_POINTS: usize = 100;

/// Scenario simulation horizon (days).
pub const SIMULATION_HORIZON_DAYS: usize = 30;

// ============================================================================
// Scenario Policy
// ============================================================================

/// Pollution load contributed by each detected particle.
pub const POLLUTION_LOAD_PER_PARTICLE: f64 = 10.0;

/// Fraction of the horizon on which cleanup runs.
pub const CLEANUP_FREQUENCY: f64 = 0.2;

/// Regulation strictness (0 = none, 1 = strict).
pub const REGULATION_STRICTNESS: f64 = 0.7;

// ============================================================================
// Fallbacks
// ============================================================================

/// Confidence attached to the fallback polymer label.
pub const FALLBACK_MATERIAL_CONFIDENCE: f64 = 0.85;

/// Heuristic index score used when the scorer is unavailable and no
/// last-known score was supplied.
pub const FALLBACK_INDEX_SCORE: f64 = 52.3;

/// Standard deviation of the per-day forecast perturbation.
pub const FORECAST_NOISE_SD: f64 = 5.0;

/// Standard deviation of each simulated random-walk step.
pub const SIMULATION_STEP_SD: f64 = 2.0;

/// Oxygen oscillation amplitude (mg/L) of the physics fallback.
pub const PHYSICS_FALLBACK_AMPLITUDE: f64 = 2.0;

/// Oxygen oscillation period divisor (hours) of the physics fallback.
pub const PHYSICS_FALLBACK_PERIOD_HOURS: f64 = 12.0;

/// Total oxygen decay (mg/L) across the physics fallback horizon.
pub const PHYSICS_FALLBACK_DECAY: f64 = 3.0;

// ============================================================================
// Derived Water Parameters
// ============================================================================

/// total_coliform = fecal_coliform * factor
pub const TOTAL_COLIFORM_FACTOR: f64 = 8.0;

/// Fluoride (mg/L) assumed when not measured.
pub const DEFAULT_FLUORIDE: f64 = 0.8;

/// Hardness (mg/L as CaCO3) assumed when not measured.
pub const DEFAULT_HARDNESS: f64 = 180.0;

/// Alkalinity (mg/L as CaCO3) assumed when not measured.
pub const DEFAULT_ALKALINITY: f64 = 120.0;

// ============================================================================
// Role Confidence Thresholds
// ============================================================================

pub const PUBLIC_CONFIDENCE: f64 = 0.50;
pub const GOVERNMENT_CONFIDENCE: f64 = 0.35;
pub const RESEARCHER_CONFIDENCE: f64 = 0.10;
pub const ADMIN_CONFIDENCE: f64 = 0.10;

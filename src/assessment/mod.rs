//! Assessment - fixed threshold mappings over stage outputs
//!
//! Every function here is pure: the same input always maps to the same
//! level. The cut-offs live in `config::defaults` and are not configurable,
//! so two stations always agree on what "High" or "Poor" means.
//!
//! - Particle count -> `ContaminationRisk` (>100 High, >50 Moderate, else Low)
//! - Classifier confidence -> `ConfidenceLevel` (>0.8 High, >0.5 Medium, else Low)
//! - Index score -> `QualityBand` (>75 Good, >50 Moderate, else Poor)
//! - Oxygen series -> critical point count (strictly below 4.0 mg/L)
//! - Simulated change -> `SimulationTrend` (beyond +/-5 is a trend)

pub mod advisories;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::defaults::{
    CONFIDENCE_HIGH_ABOVE, CONFIDENCE_MEDIUM_ABOVE, CRITICAL_OXYGEN_MG_L, INDEX_GOOD_ABOVE,
    INDEX_MODERATE_ABOVE, PARTICLE_RISK_HIGH_ABOVE, PARTICLE_RISK_MODERATE_ABOVE,
    SIMULATION_TREND_DELTA,
};
use crate::types::PhysicsResult;

// ============================================================================
// Contamination Risk
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContaminationRisk {
    Low,
    Moderate,
    High,
}

impl ContaminationRisk {
    pub fn label(self) -> &'static str {
        match self {
            ContaminationRisk::Low => "Low",
            ContaminationRisk::Moderate => "Moderate",
            ContaminationRisk::High => "High",
        }
    }
}

impl fmt::Display for ContaminationRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn risk_level(particle_count: u32) -> ContaminationRisk {
    if particle_count > PARTICLE_RISK_HIGH_ABOVE {
        ContaminationRisk::High
    } else if particle_count > PARTICLE_RISK_MODERATE_ABOVE {
        ContaminationRisk::Moderate
    } else {
        ContaminationRisk::Low
    }
}

// ============================================================================
// Classifier Confidence
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// Level of a classifier confidence. Both cut-offs are exclusive, so 0.8
/// is Medium and 0.5 is Low.
pub fn confidence_level(confidence: f64) -> ConfidenceLevel {
    if confidence > CONFIDENCE_HIGH_ABOVE {
        ConfidenceLevel::High
    } else if confidence > CONFIDENCE_MEDIUM_ABOVE {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

// ============================================================================
// Quality Band
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    Good,
    Moderate,
    Poor,
}

impl QualityBand {
    pub fn label(self) -> &'static str {
        match self {
            QualityBand::Good => "Good",
            QualityBand::Moderate => "Moderate",
            QualityBand::Poor => "Poor",
        }
    }

    /// Display colour used by dashboards
    pub fn colour(self) -> &'static str {
        match self {
            QualityBand::Good => "green",
            QualityBand::Moderate => "amber",
            QualityBand::Poor => "red",
        }
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Band for an index score. NaN falls through to `Poor`.
pub fn quality_band(score: f64) -> QualityBand {
    if score > INDEX_GOOD_ABOVE {
        QualityBand::Good
    } else if score > INDEX_MODERATE_ABOVE {
        QualityBand::Moderate
    } else {
        QualityBand::Poor
    }
}

// ============================================================================
// Dissolved Oxygen
// ============================================================================

pub fn is_critical_oxygen(oxygen_mg_l: f64) -> bool {
    oxygen_mg_l < CRITICAL_OXYGEN_MG_L
}

/// Number of values strictly below the critical oxygen level.
pub fn critical_point_count(values: &[f64]) -> usize {
    values.iter().filter(|&&v| is_critical_oxygen(v)).count()
}

/// Critical-oxygen alert derived from a physics projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxygenAlert {
    pub headline: String,
    pub critical_points: usize,
    /// Projection hours at which the level is critical
    pub critical_hours: Vec<f64>,
    pub min_oxygen: f64,
    /// Recommended actions; empty when no point is critical
    pub actions: Vec<String>,
}

impl OxygenAlert {
    pub fn from_projection(physics: &PhysicsResult) -> Self {
        let critical_hours = physics.critical_hours();
        let critical_points = critical_hours.len();
        let (headline, actions) = if physics.has_critical_alert() {
            (
                format!(
                    "ALERT: DO falls below critical level ({CRITICAL_OXYGEN_MG_L:.1} mg/L) at {critical_points} time points"
                ),
                advisories::OXYGEN_ACTIONS.iter().map(|s| (*s).to_string()).collect(),
            )
        } else {
            (advisories::OXYGEN_SAFE.to_string(), Vec::new())
        };
        Self {
            headline,
            critical_points,
            critical_hours,
            min_oxygen: physics.min_oxygen,
            actions,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.critical_points > 0
    }
}

// ============================================================================
// Trends
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationTrend {
    Improving,
    Stable,
    Declining,
}

impl fmt::Display for SimulationTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimulationTrend::Improving => "Improving",
            SimulationTrend::Stable => "Stable",
            SimulationTrend::Declining => "Declining",
        };
        f.write_str(s)
    }
}

pub fn simulation_trend(initial: f64, final_value: f64) -> SimulationTrend {
    let change = final_value - initial;
    if change > SIMULATION_TREND_DELTA {
        SimulationTrend::Improving
    } else if change < -SIMULATION_TREND_DELTA {
        SimulationTrend::Declining
    } else {
        SimulationTrend::Stable
    }
}

/// Two-way outlook shown next to the forecast chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastOutlook {
    Improving,
    Declining,
}

impl fmt::Display for ForecastOutlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastOutlook::Improving => write!(f, "improving"),
            ForecastOutlook::Declining => write!(f, "declining"),
        }
    }
}

pub fn forecast_outlook(initial: f64, last: f64) -> ForecastOutlook {
    if last > initial {
        ForecastOutlook::Improving
    } else {
        ForecastOutlook::Declining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(risk_level(150), ContaminationRisk::High);
        assert_eq!(risk_level(101), ContaminationRisk::High);
        assert_eq!(risk_level(100), ContaminationRisk::Moderate);
        assert_eq!(risk_level(75), ContaminationRisk::Moderate);
        assert_eq!(risk_level(51), ContaminationRisk::Moderate);
        assert_eq!(risk_level(50), ContaminationRisk::Low);
        assert_eq!(risk_level(20), ContaminationRisk::Low);
        assert_eq!(risk_level(0), ContaminationRisk::Low);
    }

    #[test]
    fn test_confidence_level_boundaries() {
        assert_eq!(confidence_level(0.95), ConfidenceLevel::High);
        assert_eq!(confidence_level(0.80001), ConfidenceLevel::High);
        assert_eq!(confidence_level(0.8), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(0.50001), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(0.5), ConfidenceLevel::Low);
        assert_eq!(confidence_level(0.0), ConfidenceLevel::Low);
        assert_eq!(confidence_level(f64::NAN), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::Medium.to_string(), "Medium");
    }

    #[test]
    fn test_quality_band_boundaries() {
        assert_eq!(quality_band(75.1), QualityBand::Good);
        assert_eq!(quality_band(75.0), QualityBand::Moderate);
        assert_eq!(quality_band(50.1), QualityBand::Moderate);
        assert_eq!(quality_band(50.0), QualityBand::Poor);
        assert_eq!(quality_band(f64::NAN), QualityBand::Poor);
        assert_eq!(QualityBand::Moderate.colour(), "amber");
    }

    #[test]
    fn test_critical_points_strictly_below() {
        assert_eq!(critical_point_count(&[4.0, 3.999, 0.0, 7.5]), 2);
        assert_eq!(critical_point_count(&[]), 0);
    }

    fn projection(levels: &[f64]) -> PhysicsResult {
        PhysicsResult::from_series(
            levels
                .iter()
                .enumerate()
                .map(|(h, &oxygen_mg_l)| crate::types::PhysicsPoint { hour: h as f64, oxygen_mg_l })
                .collect(),
        )
    }

    #[test]
    fn test_oxygen_alert_actions_only_when_critical() {
        let quiet = OxygenAlert::from_projection(&projection(&[6.0, 5.2, 5.5]));
        assert!(!quiet.is_critical());
        assert!(quiet.actions.is_empty());
        assert!(quiet.critical_hours.is_empty());
        assert_eq!(quiet.headline, advisories::OXYGEN_SAFE);

        let alert = OxygenAlert::from_projection(&projection(&[5.0, 3.9, 3.1, 4.0, 2.5]));
        assert_eq!(alert.critical_points, 3);
        assert_eq!(alert.critical_hours, vec![1.0, 2.0, 4.0]);
        assert_eq!(alert.min_oxygen, 2.5);
        assert_eq!(alert.actions.len(), 3);
        assert!(alert.headline.contains("3 time points"));
        assert!(alert.headline.contains("4.0 mg/L"));
    }

    #[test]
    fn test_simulation_trend_threshold() {
        assert_eq!(simulation_trend(50.0, 55.1), SimulationTrend::Improving);
        assert_eq!(simulation_trend(50.0, 55.0), SimulationTrend::Stable);
        assert_eq!(simulation_trend(50.0, 45.0), SimulationTrend::Stable);
        assert_eq!(simulation_trend(50.0, 44.9), SimulationTrend::Declining);
    }

    #[test]
    fn test_forecast_outlook_ties_decline() {
        assert_eq!(forecast_outlook(50.0, 50.0), ForecastOutlook::Declining);
        assert_eq!(forecast_outlook(50.0, 50.5), ForecastOutlook::Improving);
    }
}

//! Fixed advisory texts attached to assessments
//!
//! Plain reference text for each audience. Text that depends on a measured
//! value is built by a function so the value is embedded in the message.

use super::{ContaminationRisk, SimulationTrend};
use crate::config::defaults::PARTICLE_RISK_HIGH_ABOVE;

/// Public health guidance for a contamination risk level.
pub fn health_guidance(risk: ContaminationRisk) -> &'static [&'static str] {
    match risk {
        ContaminationRisk::High => &[
            "NOT suitable for drinking",
            "May severely affect aquatic life",
            "Avoid direct contact with water",
            "Report to local authorities immediately",
            "Seek medical advice if consumed",
        ],
        ContaminationRisk::Moderate => &[
            "Requires treatment before use",
            "Monitor regularly",
            "Consider filtration systems",
            "Children and elderly should avoid",
        ],
        ContaminationRisk::Low => &[
            "Within acceptable limits",
            "Continue monitoring",
            "Practice water conservation",
            "Support cleanup initiatives",
        ],
    }
}

pub fn risk_headline(risk: ContaminationRisk) -> &'static str {
    match risk {
        ContaminationRisk::High => "HIGH CONTAMINATION DETECTED (risk level: severe)",
        ContaminationRisk::Moderate => "MODERATE CONTAMINATION",
        ContaminationRisk::Low => "LOW CONTAMINATION",
    }
}

pub const OXYGEN_ACTIONS: [&str; 3] = [
    "Increase aeration in affected zones",
    "Reduce organic load discharge",
    "Deploy emergency oxygenation systems",
];

pub const OXYGEN_SAFE: &str = "DO levels remain within safe limits throughout forecast period";

const POLICY_ACTIONS: [&str; 4] = [
    "Ban single-use plastics in 5km radius",
    "Deploy cleanup crews within 24 hours",
    "Issue public health advisory",
    "Enforce strict penalties for industrial discharge",
];

/// Immediate policy actions; empty unless the count is in the high band.
pub fn policy_recommendations(particle_count: u32) -> Vec<String> {
    if particle_count > PARTICLE_RISK_HIGH_ABOVE {
        POLICY_ACTIONS.iter().map(|s| (*s).to_string()).collect()
    } else {
        Vec::new()
    }
}

/// Short description of a particle shape label; `None` for labels the
/// detector vocabulary does not define.
pub fn particle_type_description(label: &str) -> Option<&'static str> {
    match label.to_ascii_lowercase().as_str() {
        "fiber" => Some("Long thin particles from textiles"),
        "fragment" => Some("Irregular pieces from plastic breakdown"),
        "pellet" => Some("Small spherical industrial particles"),
        "film" => Some("Thin sheet-like plastic pieces"),
        "foam" => Some("Expanded polystyrene particles"),
        _ => None,
    }
}

pub fn simulation_summary(trend: SimulationTrend, change: f64) -> String {
    match trend {
        SimulationTrend::Improving => {
            format!("Policy scenario improves WQI by {change:.1} points over the horizon")
        }
        SimulationTrend::Declining => {
            format!("Policy scenario worsens WQI by {:.1} points over the horizon", change.abs())
        }
        SimulationTrend::Stable => format!("Policy scenario keeps WQI stable ({change:+.1} points)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_recommendations_only_above_high_band() {
        assert!(policy_recommendations(100).is_empty());
        let recs = policy_recommendations(101);
        assert_eq!(recs.len(), 4);
        assert!(recs[0].contains("single-use plastics"));
    }

    #[test]
    fn test_every_risk_has_guidance() {
        for risk in [ContaminationRisk::Low, ContaminationRisk::Moderate, ContaminationRisk::High] {
            assert!(!health_guidance(risk).is_empty());
        }
    }

    #[test]
    fn test_particle_descriptions() {
        assert_eq!(particle_type_description("Fiber"), Some("Long thin particles from textiles"));
        assert_eq!(particle_type_description("bead"), None);
    }

    #[test]
    fn test_simulation_summary_wording() {
        assert!(simulation_summary(SimulationTrend::Declining, -7.34).contains("7.3"));
        assert!(simulation_summary(SimulationTrend::Stable, 1.0).contains("+1.0"));
    }
}

//! Structural checks on collaborator outputs
//!
//! A value that fails its check is treated like a missing one: the stage is
//! degraded and the fallback substituted. Checks that pass may return a
//! normalised copy (summaries recomputed from the underlying series).

use crate::assessment;
use crate::config::defaults::{INDEX_SCORE_MAX, INDEX_SCORE_MIN, PROBABILITY_SUM_TOLERANCE};
use crate::types::{
    DetectionResult, ForecastResult, IndexResult, MaterialResult, Polymer, PhysicsResult,
    SimulationResult,
};

pub type CheckResult<T> = Result<T, String>;

fn in_unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

pub fn detection(value: DetectionResult) -> CheckResult<DetectionResult> {
    let total = value.type_total();
    if total != u64::from(value.count) {
        return Err(format!(
            "particle type counts sum to {total}, reported total is {}",
            value.count
        ));
    }
    if let Some(conf) = value.mean_confidence {
        if !in_unit(conf) {
            return Err(format!("mean confidence {conf} outside [0, 1]"));
        }
    }
    Ok(value)
}

pub fn material(value: MaterialResult) -> CheckResult<MaterialResult> {
    if !in_unit(value.confidence) {
        return Err(format!("confidence {} outside [0, 1]", value.confidence));
    }
    if let Some((label, p)) = value.all_probabilities.iter().find(|(_, p)| !in_unit(**p)) {
        return Err(format!("probability of {label} is {p}, outside [0, 1]"));
    }
    let sum = value.probability_sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(format!("probabilities sum to {sum:.6}, expected 1"));
    }
    let reported = value.all_probabilities.get(&value.polymer).copied().unwrap_or(0.0);
    let best: Option<(&Polymer, &f64)> =
        value.all_probabilities.iter().max_by(|a, b| a.1.total_cmp(b.1));
    if let Some((best_label, best_p)) = best {
        if reported + PROBABILITY_SUM_TOLERANCE < *best_p {
            return Err(format!(
                "reported polymer {} ({reported:.3}) is not the most probable ({best_label} at {best_p:.3})",
                value.polymer
            ));
        }
    }
    Ok(value)
}

pub fn index(value: IndexResult) -> CheckResult<IndexResult> {
    if !value.score.is_finite() || !(INDEX_SCORE_MIN..=INDEX_SCORE_MAX).contains(&value.score) {
        return Err(format!(
            "score {} outside [{INDEX_SCORE_MIN}, {INDEX_SCORE_MAX}]",
            value.score
        ));
    }
    let expected = assessment::quality_band(value.score);
    if value.classification != expected {
        return Err(format!(
            "label {} does not match score {:.1} (expected {expected})",
            value.classification, value.score
        ));
    }
    Ok(value)
}

pub fn forecast(value: ForecastResult, horizon_days: usize) -> CheckResult<ForecastResult> {
    if value.len() != horizon_days {
        return Err(format!("{} points, expected {horizon_days}", value.len()));
    }
    if value.points.windows(2).any(|w| w[0].date >= w[1].date) {
        return Err("dates are not strictly increasing".to_string());
    }
    if let Some(p) = value.points.iter().find(|p| !p.score.is_finite()) {
        return Err(format!("non-finite score on {}", p.date));
    }
    Ok(value)
}

pub fn physics(value: PhysicsResult, horizon_hours: u32) -> CheckResult<PhysicsResult> {
    let horizon = f64::from(horizon_hours);
    if value.points.is_empty() {
        return Err("empty oxygen series".to_string());
    }
    if let Some(p) = value
        .points
        .iter()
        .find(|p| !p.hour.is_finite() || !p.oxygen_mg_l.is_finite())
    {
        return Err(format!("non-finite point at hour {}", p.hour));
    }
    if value.points.windows(2).any(|w| w[0].hour >= w[1].hour) {
        return Err("hours are not strictly increasing".to_string());
    }
    if let Some(p) = value.points.iter().find(|p| !(0.0..=horizon).contains(&p.hour)) {
        return Err(format!("hour {} outside [0, {horizon_hours}]", p.hour));
    }
    Ok(PhysicsResult::from_series(value.points))
}

pub fn simulation(value: SimulationResult, horizon_days: usize) -> CheckResult<SimulationResult> {
    if value.points.len() != horizon_days {
        return Err(format!("{} points, expected {horizon_days}", value.points.len()));
    }
    if !value.initial_value.is_finite() {
        return Err(format!("non-finite initial value {}", value.initial_value));
    }
    if value.points.windows(2).any(|w| w[0].day >= w[1].day) {
        return Err("days are not strictly increasing".to_string());
    }
    if let Some(p) = value.points.iter().find(|p| !p.value.is_finite()) {
        return Err(format!("non-finite value on day {}", p.day));
    }
    Ok(SimulationResult::from_trajectory(value.initial_value, value.points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::QualityBand;
    use crate::types::{ForecastPoint, PhysicsPoint};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[test]
    fn test_detection_histogram_must_match_total() {
        let mut d = DetectionResult::from_types([("fiber", 4), ("film", 1)], Some(0.7));
        assert!(detection(d.clone()).is_ok());
        d.count = 9;
        let err = detection(d).unwrap_err();
        assert!(err.contains("sum to 5"));

        let bad_conf = DetectionResult::from_types([("foam", 1)], Some(1.3));
        assert!(detection(bad_conf).is_err());
    }

    #[test]
    fn test_material_rejects_unnormalised_distribution() {
        let mut m = MaterialResult::fixed(Polymer::Ps, 0.6);
        assert!(material(m.clone()).is_ok());

        m.all_probabilities.insert(Polymer::Pe, 0.5);
        assert!(material(m).unwrap_err().contains("sum to"));
    }

    #[test]
    fn test_material_rejects_non_argmax_label() {
        let probs = BTreeMap::from([
            (Polymer::Pe, 0.1),
            (Polymer::Pp, 0.6),
            (Polymer::Ps, 0.1),
            (Polymer::Pet, 0.1),
            (Polymer::Pvc, 0.05),
            (Polymer::Pmma, 0.05),
        ]);
        let m = MaterialResult {
            polymer: Polymer::Pe,
            confidence: 0.1,
            all_probabilities: probs,
        };
        assert!(material(m).unwrap_err().contains("not the most probable"));
    }

    #[test]
    fn test_index_label_must_match_band() {
        assert!(index(IndexResult::from_score(80.0)).is_ok());
        let wrong = IndexResult {
            score: 80.0,
            classification: QualityBand::Poor,
        };
        assert!(index(wrong).is_err());
        assert!(index(IndexResult::from_score(120.0)).is_err());
        assert!(index(IndexResult::from_score(f64::NAN)).is_err());
    }

    #[test]
    fn test_forecast_length_and_order() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let f = ForecastResult::daily(start, vec![50.0; 60]);
        assert!(forecast(f.clone(), 60).is_ok());
        assert!(forecast(f, 30).is_err());

        let d = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let repeated = ForecastResult {
            points: vec![
                ForecastPoint { date: d, score: 50.0 },
                ForecastPoint { date: d, score: 51.0 },
            ],
        };
        assert!(forecast(repeated, 2).unwrap_err().contains("strictly increasing"));
    }

    #[test]
    fn test_physics_summary_is_recomputed() {
        let mut p = PhysicsResult::from_series(vec![
            PhysicsPoint { hour: 0.0, oxygen_mg_l: 5.0 },
            PhysicsPoint { hour: 36.0, oxygen_mg_l: 3.0 },
            PhysicsPoint { hour: 72.0, oxygen_mg_l: 4.0 },
        ]);
        p.critical_points = 0;
        p.mean_oxygen = 99.0;

        let checked = physics(p, 72).unwrap();
        assert_eq!(checked.critical_points, 1);
        assert!((checked.mean_oxygen - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_physics_rejects_out_of_horizon() {
        let p = PhysicsResult::from_series(vec![
            PhysicsPoint { hour: 0.0, oxygen_mg_l: 5.0 },
            PhysicsPoint { hour: 96.0, oxygen_mg_l: 5.0 },
        ]);
        assert!(physics(p, 72).is_err());
        assert!(physics(PhysicsResult::from_series(Vec::new()), 72).is_err());
    }

    #[test]
    fn test_simulation_final_value_follows_series() {
        let mut s = SimulationResult::daily(50.0, (0..30).map(f64::from));
        s.final_value = -1.0;
        let checked = simulation(s, 30).unwrap();
        assert_eq!(checked.final_value, 29.0);

        let short = SimulationResult::daily(50.0, vec![50.0; 10]);
        assert!(simulation(short, 30).is_err());
    }
}

//! Values produced by the six analytic stages
//!
//! Every type here is plain data plus a convenience constructor that
//! establishes its own invariants. Collaborators are free to build them by
//! hand; the pipeline re-checks the invariants before trusting a value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::assessment::{
    self, ConfidenceLevel, ContaminationRisk, ForecastOutlook, QualityBand, SimulationTrend,
};

// ============================================================================
// Stage 1: Particle Detection
// ============================================================================

/// Particle count and per-type histogram for one sample image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Total particles detected
    pub count: u32,
    /// Particle type label -> count; sums to `count`
    pub particle_types: BTreeMap<String, u32>,
    /// Mean detection confidence over reported particles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_confidence: Option<f64>,
    /// Reference to a rendered overlay (path or URI) produced by the detector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
}

impl DetectionResult {
    /// Zero particles, empty histogram.
    pub fn empty() -> Self {
        Self {
            count: 0,
            particle_types: BTreeMap::new(),
            mean_confidence: None,
            overlay: None,
        }
    }

    /// Build from a type histogram; the total is the histogram sum.
    pub fn from_types<I, S>(types: I, mean_confidence: Option<f64>) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut particle_types: BTreeMap<String, u32> = BTreeMap::new();
        for (label, n) in types {
            *particle_types.entry(label.into()).or_default() += n;
        }
        let count = particle_types.values().sum();
        Self {
            count,
            particle_types,
            mean_confidence,
            overlay: None,
        }
    }

    /// Sum of the per-type counts.
    pub fn type_total(&self) -> u64 {
        self.particle_types.values().map(|&n| u64::from(n)).sum()
    }

    /// Most frequent particle type (ties resolve to the first label).
    pub fn dominant_type(&self) -> Option<(&str, u32)> {
        self.particle_types
            .iter()
            .fold(None, |best: Option<(&str, u32)>, (label, &n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((label.as_str(), n)),
            })
    }

    pub fn risk(&self) -> ContaminationRisk {
        assessment::risk_level(self.count)
    }
}

// ============================================================================
// Stage 2: Material Classification
// ============================================================================

/// Closed set of polymer labels the material classifier can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polymer {
    /// Polyethylene - the lowest-cost default label
    #[default]
    Pe,
    Pp,
    Ps,
    Pet,
    Pvc,
    Pmma,
}

impl Polymer {
    pub const ALL: [Polymer; 6] = [
        Polymer::Pe,
        Polymer::Pp,
        Polymer::Ps,
        Polymer::Pet,
        Polymer::Pvc,
        Polymer::Pmma,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Polymer::Pe => "PE",
            Polymer::Pp => "PP",
            Polymer::Ps => "PS",
            Polymer::Pet => "PET",
            Polymer::Pvc => "PVC",
            Polymer::Pmma => "PMMA",
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            Polymer::Pe => "Polyethylene",
            Polymer::Pp => "Polypropylene",
            Polymer::Ps => "Polystyrene",
            Polymer::Pet => "Polyethylene Terephthalate",
            Polymer::Pvc => "Polyvinyl Chloride",
            Polymer::Pmma => "Polymethyl Methacrylate",
        }
    }

    /// Characteristic Raman peaks: (wavenumber cm^-1, band assignment).
    pub fn characteristic_peaks(self) -> &'static [(u32, &'static str)] {
        match self {
            Polymer::Pe => &[
                (2850, "C-H symmetric stretch"),
                (2880, "C-H asymmetric stretch"),
                (2900, "C-H stretch"),
            ],
            Polymer::Pp => &[(841, "C-C stretch"), (973, "C-H rock"), (2840, "C-H stretch")],
            Polymer::Ps => &[
                (1001, "Ring breathing"),
                (1602, "Aromatic C=C"),
                (3050, "Aromatic C-H"),
            ],
            Polymer::Pet => &[
                (1616, "Aromatic ring"),
                (1730, "C=O stretch"),
                (2970, "C-H stretch"),
            ],
            Polymer::Pvc => &[(638, "C-Cl stretch"), (1430, "CH2 bend"), (2910, "C-H stretch")],
            Polymer::Pmma => &[(814, "C-O stretch"), (1730, "C=O stretch"), (2950, "C-H stretch")],
        }
    }
}

impl fmt::Display for Polymer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Polymer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|p| p.code() == upper)
            .ok_or_else(|| format!("unknown polymer '{s}'"))
    }
}

/// Polymer label with its confidence and the full probability distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialResult {
    pub polymer: Polymer,
    /// Probability of `polymer`, in [0, 1]
    pub confidence: f64,
    /// Probability per label; sums to 1
    pub all_probabilities: BTreeMap<Polymer, f64>,
}

impl MaterialResult {
    /// `polymer` at `confidence`, the remainder split evenly over the other
    /// labels.
    pub fn fixed(polymer: Polymer, confidence: f64) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        let rest = (1.0 - confidence) / (Polymer::ALL.len() - 1) as f64;
        let all_probabilities = Polymer::ALL
            .into_iter()
            .map(|p| (p, if p == polymer { confidence } else { rest }))
            .collect();
        Self {
            polymer,
            confidence,
            all_probabilities,
        }
    }

    pub fn probability_sum(&self) -> f64 {
        self.all_probabilities.values().sum()
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        assessment::confidence_level(self.confidence)
    }

    /// Labels ordered by descending probability.
    pub fn ranked(&self) -> Vec<(Polymer, f64)> {
        let mut ranked: Vec<(Polymer, f64)> =
            self.all_probabilities.iter().map(|(p, v)| (*p, *v)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

// ============================================================================
// Stage 3: Index Scoring
// ============================================================================

/// Water quality index score (0-100) and its band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexResult {
    pub score: f64,
    pub classification: QualityBand,
}

impl IndexResult {
    pub fn from_score(score: f64) -> Self {
        Self {
            score,
            classification: assessment::quality_band(score),
        }
    }
}

// ============================================================================
// Stage 4: Trend Forecast
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub score: f64,
}

/// Daily index projection, strictly increasing in date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub points: Vec<ForecastPoint>,
}

impl ForecastResult {
    /// One point per day starting at `start`.
    pub fn daily(start: NaiveDate, scores: impl IntoIterator<Item = f64>) -> Self {
        let points = start
            .iter_days()
            .zip(scores)
            .map(|(date, score)| ForecastPoint { date, score })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn final_score(&self) -> Option<f64> {
        self.points.last().map(|p| p.score)
    }

    /// Direction of the last forecast point relative to `initial_score`.
    pub fn outlook(&self, initial_score: f64) -> Option<ForecastOutlook> {
        self.final_score()
            .map(|last| assessment::forecast_outlook(initial_score, last))
    }
}

// ============================================================================
// Stage 5: Physics Prediction
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsPoint {
    /// Hours from the sample time
    pub hour: f64,
    /// Predicted dissolved oxygen (mg/L)
    pub oxygen_mg_l: f64,
}

/// Dissolved oxygen projection with its derived summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsResult {
    pub points: Vec<PhysicsPoint>,
    pub mean_oxygen: f64,
    pub min_oxygen: f64,
    /// Points strictly below the critical oxygen level
    pub critical_points: usize,
}

impl PhysicsResult {
    /// Build from a series; the summary is computed from the points.
    pub fn from_series(points: Vec<PhysicsPoint>) -> Self {
        let values: Vec<f64> = points.iter().map(|p| p.oxygen_mg_l).collect();
        let (mean_oxygen, min_oxygen) = if values.is_empty() {
            (f64::NAN, f64::NAN)
        } else {
            (Statistics::mean(values.iter()), Statistics::min(values.iter()))
        };
        let critical_points = assessment::critical_point_count(&values);
        Self {
            points,
            mean_oxygen,
            min_oxygen,
            critical_points,
        }
    }

    /// Hours at which the predicted level is critical.
    pub fn critical_hours(&self) -> Vec<f64> {
        self.points
            .iter()
            .filter(|p| assessment::is_critical_oxygen(p.oxygen_mg_l))
            .map(|p| p.hour)
            .collect()
    }

    pub fn has_critical_alert(&self) -> bool {
        self.critical_points > 0
    }
}

// ============================================================================
// Stage 6: Scenario Simulation
// ============================================================================

/// Fixed policy levers handed to the scenario simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyParameters {
    /// Detected particle count x load per particle
    pub pollution_load: f64,
    pub cleanup_frequency: f64,
    pub regulation_strictness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationPoint {
    /// Days from the sample date
    pub day: u32,
    pub value: f64,
}

/// Simulated index trajectory under the fixed policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub initial_value: f64,
    pub points: Vec<SimulationPoint>,
    pub final_value: f64,
}

impl SimulationResult {
    /// Build from a trajectory; `final_value` is the last point, or the
    /// initial value for an empty trajectory.
    pub fn from_trajectory(initial_value: f64, points: Vec<SimulationPoint>) -> Self {
        let final_value = points.last().map_or(initial_value, |p| p.value);
        Self {
            initial_value,
            points,
            final_value,
        }
    }

    /// One point per day starting at day 0.
    pub fn daily(initial_value: f64, values: impl IntoIterator<Item = f64>) -> Self {
        let points = values
            .into_iter()
            .enumerate()
            .map(|(day, value)| SimulationPoint {
                day: u32::try_from(day).unwrap_or(u32::MAX),
                value,
            })
            .collect();
        Self::from_trajectory(initial_value, points)
    }

    pub fn change(&self) -> f64 {
        self.final_value - self.initial_value
    }

    pub fn trend(&self) -> SimulationTrend {
        assessment::simulation_trend(self.initial_value, self.final_value)
    }
}

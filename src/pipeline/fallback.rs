//! Synthetic stage values used when a collaborator cannot supply one
//!
//! Deterministic fallbacks (detection, material, index) are fixed values.
//! The path-shaped fallbacks (forecast, simulation) are random walks drawn
//! from a per-run `StdRng`; a configured seed makes them reproducible.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::config::defaults::{
    INDEX_SCORE_MAX, INDEX_SCORE_MIN, PHYSICS_FALLBACK_AMPLITUDE, PHYSICS_FALLBACK_DECAY,
    PHYSICS_FALLBACK_PERIOD_HOURS, SPECTRUM_LENGTH,
};
use crate::config::{FallbackConfig, HorizonConfig};
use crate::types::{
    DetectionResult, ForecastResult, IndexResult, MaterialResult, PhysicsPoint, PhysicsResult,
    SimulationResult,
};

pub struct FallbackGenerator<'a> {
    fallback: &'a FallbackConfig,
    horizons: &'a HorizonConfig,
    rng: StdRng,
}

impl<'a> FallbackGenerator<'a> {
    pub fn new(fallback: &'a FallbackConfig, horizons: &'a HorizonConfig) -> Self {
        let rng = match fallback.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            fallback,
            horizons,
            rng,
        }
    }

    /// No particles.
    pub fn detection(&self) -> DetectionResult {
        DetectionResult::empty()
    }

    /// Configured default polymer at its fixed confidence.
    pub fn material(&self) -> MaterialResult {
        MaterialResult::fixed(self.fallback.polymer, self.fallback.material_confidence)
    }

    /// Last-known score when the caller supplied one, else the heuristic default.
    pub fn index(&self, last_known: Option<f64>) -> IndexResult {
        let score = last_known
            .filter(|s| s.is_finite())
            .unwrap_or(self.fallback.index_score)
            .clamp(INDEX_SCORE_MIN, INDEX_SCORE_MAX);
        IndexResult::from_score(score)
    }

    /// Uniform noise in [0, 1) at classifier width, classified when no
    /// spectrum was submitted.
    pub fn stand_in_spectrum(&mut self) -> Vec<f64> {
        (0..SPECTRUM_LENGTH).map(|_| self.rng.gen::<f64>()).collect()
    }

    /// `initial` perturbed independently each day, clamped to the index scale.
    pub fn forecast(&mut self, initial: f64, start: NaiveDate) -> ForecastResult {
        let sd = self.fallback.forecast_noise_sd;
        let scores: Vec<f64> = (0..self.horizons.forecast_days)
            .map(|_| {
                let z: f64 = self.rng.sample(StandardNormal);
                (initial + z * sd).clamp(INDEX_SCORE_MIN, INDEX_SCORE_MAX)
            })
            .collect();
        ForecastResult::daily(start, scores)
    }

    /// Oscillating, linearly decaying oxygen path anchored at the measured
    /// dissolved oxygen:
    ///
    /// `do(t) = do0 + sin(t / 12) * 2 - t / horizon * 3`
    pub fn physics(&self, dissolved_oxygen: f64) -> PhysicsResult {
        let horizon = f64::from(self.horizons.physics_hours);
        let n = self.horizons.physics_fallback_points.max(2);
        let step = horizon / (n - 1) as f64;
        let points = (0..n)
            .map(|i| {
                let hour = i as f64 * step;
                let oxygen_mg_l = dissolved_oxygen
                    + (hour / PHYSICS_FALLBACK_PERIOD_HOURS).sin() * PHYSICS_FALLBACK_AMPLITUDE
                    - hour / horizon * PHYSICS_FALLBACK_DECAY;
                PhysicsPoint { hour, oxygen_mg_l }
            })
            .collect();
        PhysicsResult::from_series(points)
    }

    /// Cumulative random walk seeded at `initial`, one point per day from day 0.
    pub fn simulation(&mut self, initial: f64) -> SimulationResult {
        let sd = self.fallback.simulation_step_sd;
        let mut walk = 0.0;
        let values: Vec<f64> = (0..self.horizons.simulation_days)
            .map(|_| {
                let z: f64 = self.rng.sample(StandardNormal);
                walk += z;
                initial + walk * sd
            })
            .collect();
        SimulationResult::daily(initial, values)
    }
}

//! Collaborator contracts for the six analytic stages
//!
//! The models themselves live outside this crate. Each stage is a trait an
//! external wrapper implements; the orchestrator holds one boxed
//! implementation per stage in a `StageSet`.
//!
//! ## Stages
//!
//! 1. **ParticleDetector** - image -> particle count + type histogram
//! 2. **MaterialClassifier** - 1024-point spectrum -> polymer distribution
//! 3. **IndexScorer** - water parameter vector -> quality index
//! 4. **TrendForecaster** - current score -> daily projection
//! 5. **PhysicsPredictor** - water parameters + horizon -> oxygen projection
//! 6. **ScenarioSimulator** - policy + initial score -> index trajectory
//!
//! Implementations return `anyhow::Result` so wrappers can surface any
//! error type; the orchestrator absorbs errors and panics alike.

mod unavailable;

pub use unavailable::Unavailable;

use crate::types::{
    DetectionResult, ForecastResult, IndexResult, MaterialResult, ParameterVector, PhysicsResult,
    PolicyParameters, SampleImage, SimulationResult,
};

/// Stage 1: counts and labels particles in a sample image.
pub trait ParticleDetector: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Detect particles, discarding candidates below `confidence_threshold`.
    fn detect(&self, image: &SampleImage, confidence_threshold: f64) -> anyhow::Result<DetectionResult>;
}

/// Stage 2: labels the polymer behind a Raman spectrum.
pub trait MaterialClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// `spectrum` is intensity resampled to the fixed classifier width.
    fn classify(&self, spectrum: &[f64]) -> anyhow::Result<MaterialResult>;
}

/// Stage 3: scores water quality from the parameter vector.
pub trait IndexScorer: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, parameters: &ParameterVector) -> anyhow::Result<IndexResult>;
}

/// Stage 4: projects the index score forward, one point per day.
pub trait TrendForecaster: Send + Sync {
    fn name(&self) -> &str;

    fn forecast(&self, initial_score: f64, horizon_days: usize) -> anyhow::Result<ForecastResult>;
}

/// Stage 5: physics-informed dissolved oxygen prediction.
pub trait PhysicsPredictor: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, parameters: &ParameterVector, horizon_hours: u32) -> anyhow::Result<PhysicsResult>;
}

/// Stage 6: digital twin run under a fixed policy.
pub trait ScenarioSimulator: Send + Sync {
    fn name(&self) -> &str;

    fn simulate(
        &self,
        policy: &PolicyParameters,
        initial_score: f64,
        horizon_days: usize,
    ) -> anyhow::Result<SimulationResult>;
}

/// One collaborator per stage.
///
/// `StageSet::default()` wires `Unavailable` into every slot, which makes
/// every stage degrade to its fallback.
pub struct StageSet {
    pub detector: Box<dyn ParticleDetector>,
    pub classifier: Box<dyn MaterialClassifier>,
    pub scorer: Box<dyn IndexScorer>,
    pub forecaster: Box<dyn TrendForecaster>,
    pub physics: Box<dyn PhysicsPredictor>,
    pub simulator: Box<dyn ScenarioSimulator>,
}

impl Default for StageSet {
    fn default() -> Self {
        Self {
            detector: Box::new(Unavailable),
            classifier: Box::new(Unavailable),
            scorer: Box::new(Unavailable),
            forecaster: Box::new(Unavailable),
            physics: Box::new(Unavailable),
            simulator: Box::new(Unavailable),
        }
    }
}

impl StageSet {
    pub fn with_detector(mut self, detector: impl ParticleDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn with_classifier(mut self, classifier: impl MaterialClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn with_scorer(mut self, scorer: impl IndexScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_forecaster(mut self, forecaster: impl TrendForecaster + 'static) -> Self {
        self.forecaster = Box::new(forecaster);
        self
    }

    pub fn with_physics(mut self, physics: impl PhysicsPredictor + 'static) -> Self {
        self.physics = Box::new(physics);
        self
    }

    pub fn with_simulator(mut self, simulator: impl ScenarioSimulator + 'static) -> Self {
        self.simulator = Box::new(simulator);
        self
    }

    /// Collaborator names in stage order.
    pub fn names(&self) -> [&str; 6] {
        [
            self.detector.name(),
            self.classifier.name(),
            self.scorer.name(),
            self.forecaster.name(),
            self.physics.name(),
            self.simulator.name(),
        ]
    }
}

impl std::fmt::Debug for StageSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

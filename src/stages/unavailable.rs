//! Stand-in collaborator for stages with no model installed

use anyhow::bail;

use super::{
    IndexScorer, MaterialClassifier, ParticleDetector, PhysicsPredictor, ScenarioSimulator,
    TrendForecaster,
};
use crate::types::{
    DetectionResult, ForecastResult, IndexResult, MaterialResult, ParameterVector, PhysicsResult,
    PolicyParameters, SampleImage, SimulationResult, StageKind,
};

/// Fails every call, so the stage always takes its fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

const NAME: &str = "unavailable";

fn not_installed<T>(stage: StageKind) -> anyhow::Result<T> {
    bail!("no {} model installed", stage.collaborator())
}

impl ParticleDetector for Unavailable {
    fn name(&self) -> &str {
        NAME
    }

    fn detect(&self, _image: &SampleImage, _confidence_threshold: f64) -> anyhow::Result<DetectionResult> {
        not_installed(StageKind::Detect)
    }
}

impl MaterialClassifier for Unavailable {
    fn name(&self) -> &str {
        NAME
    }

    fn classify(&self, _spectrum: &[f64]) -> anyhow::Result<MaterialResult> {
        not_installed(StageKind::Classify)
    }
}

impl IndexScorer for Unavailable {
    fn name(&self) -> &str {
        NAME
    }

    fn score(&self, _parameters: &ParameterVector) -> anyhow::Result<IndexResult> {
        not_installed(StageKind::Score)
    }
}

impl TrendForecaster for Unavailable {
    fn name(&self) -> &str {
        NAME
    }

    fn forecast(&self, _initial_score: f64, _horizon_days: usize) -> anyhow::Result<ForecastResult> {
        not_installed(StageKind::Forecast)
    }
}

impl PhysicsPredictor for Unavailable {
    fn name(&self) -> &str {
        NAME
    }

    fn predict(&self, _parameters: &ParameterVector, _horizon_hours: u32) -> anyhow::Result<PhysicsResult> {
        not_installed(StageKind::PhysicsPredict)
    }
}

impl ScenarioSimulator for Unavailable {
    fn name(&self) -> &str {
        NAME
    }

    fn simulate(
        &self,
        _policy: &PolicyParameters,
        _initial_score: f64,
        _horizon_days: usize,
    ) -> anyhow::Result<SimulationResult> {
        not_installed(StageKind::Simulate)
    }
}

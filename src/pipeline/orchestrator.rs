//! Analysis Pipeline Orchestrator
//!
//! Runs the six stages strictly in order. Every collaborator call is
//! isolated: an `Err`, a panic or an output that fails its structural check
//! degrades that stage only, and the stage's fallback flows on to the next
//! stage exactly as a real value would.
//!
//! ```text
//! STAGE 1: Detect          image                      -> DetectionResult
//! STAGE 2: Classify        spectrum (or stand-in)     -> MaterialResult
//! STAGE 3: Score           parameter vector           -> IndexResult
//! STAGE 4: Forecast        stage-3 score              -> ForecastResult
//! STAGE 5: PhysicsPredict  parameter vector, horizon  -> PhysicsResult
//! STAGE 6: Simulate        stage-1 load, stage-3 score -> SimulationResult
//! ```

use chrono::Utc;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::checks::{self, CheckResult};
use super::fallback::FallbackGenerator;
use crate::config::{ConfigError, MonitorConfig};
use crate::report::{Report, StageOutcomes, SubmissionMetadata};
use crate::stages::StageSet;
use crate::types::{
    ParameterVector, PolicyParameters, RequestContext, SampleSubmission, StageError, StageKind,
    StageResult,
};

/// Stateless across runs: holds only the collaborators and the read-only
/// configuration, so one instance can serve concurrent runs.
pub struct AnalysisPipeline {
    stages: StageSet,
    config: MonitorConfig,
}

impl std::fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("stages", &self.stages.names())
            .field("config", &self.config)
            .finish()
    }
}

impl AnalysisPipeline {
    /// Build a pipeline over `stages`. The config is validated here, so a
    /// zero horizon or a NaN threshold never reaches a run.
    pub fn new(stages: StageSet, config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            station = %config.station.name,
            collaborators = ?stages.names(),
            "Initializing analysis pipeline"
        );
        Ok(Self { stages, config })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn stages(&self) -> &StageSet {
        &self.stages
    }

    /// Run all six stages on one submission. Never fails: the returned
    /// report always carries a value for every stage.
    pub fn run(&self, submission: SampleSubmission, ctx: &RequestContext) -> Report {
        let started = Instant::now();
        let generated_at = Utc::now();
        let horizons = &self.config.horizons;
        let mut fallback = FallbackGenerator::new(&self.config.fallback, horizons);

        let measurements = submission.measurements();
        let parameters =
            ParameterVector::from_measurements(measurements, &self.config.derived_parameters);
        let detection_threshold = ctx.detection_threshold(submission.confidence_threshold());

        // Stage 1: Detect
        let detection = match submission.image() {
            Some(image) => attempt(
                StageKind::Detect,
                || self.stages.detector.detect(image, detection_threshold),
                checks::detection,
            ),
            None => Err(StageError::MissingInput {
                stage: StageKind::Detect,
                reason: "no sample image submitted".to_string(),
            }),
        };
        let detection = settle(detection, || fallback.detection());

        // Stage 2: Classify
        let (signal, stand_in) = match submission.spectrum() {
            Some(spectrum) => (spectrum.classifier_input(), false),
            None => (fallback.stand_in_spectrum(), true),
        };
        let material = attempt(
            StageKind::Classify,
            || self.stages.classifier.classify(&signal),
            checks::material,
        );
        let material = match material {
            Ok(value) if stand_in => degrade(
                value,
                &StageError::StandInInput {
                    stage: StageKind::Classify,
                    reason: "no spectrum submitted, classified a noise signal".to_string(),
                },
            ),
            outcome => settle(outcome, || fallback.material()),
        };

        // Stage 3: Score
        let index = attempt(
            StageKind::Score,
            || self.stages.scorer.score(&parameters),
            checks::index,
        );
        let index = settle(index, || fallback.index(ctx.last_known_index));
        let initial_score = index.value().score;

        // Stage 4: Forecast
        let forecast_days = horizons.forecast_days;
        let forecast = attempt(
            StageKind::Forecast,
            || self.stages.forecaster.forecast(initial_score, forecast_days),
            |v| checks::forecast(v, forecast_days),
        );
        let forecast = settle(forecast, || {
            fallback.forecast(initial_score, generated_at.date_naive())
        });

        // Stage 5: PhysicsPredict
        let physics_hours = horizons.physics_hours;
        let physics = attempt(
            StageKind::PhysicsPredict,
            || self.stages.physics.predict(&parameters, physics_hours),
            |v| checks::physics(v, physics_hours),
        );
        let physics = settle(physics, || fallback.physics(measurements.dissolved_oxygen));

        // Stage 6: Simulate
        let policy = PolicyParameters {
            pollution_load: f64::from(detection.value().count)
                * self.config.policy.pollution_load_per_particle,
            cleanup_frequency: self.config.policy.cleanup_frequency,
            regulation_strictness: self.config.policy.regulation_strictness,
        };
        let simulation_days = horizons.simulation_days;
        let simulation = attempt(
            StageKind::Simulate,
            || {
                self.stages
                    .simulator
                    .simulate(&policy, initial_score, simulation_days)
            },
            |v| checks::simulation(v, simulation_days),
        );
        let simulation = settle(simulation, || fallback.simulation(initial_score));

        let metadata = SubmissionMetadata {
            station: self.config.station.name.clone(),
            role: ctx.role,
            confidence_threshold: submission.confidence_threshold(),
            detection_threshold,
            image_name: submission.image().and_then(|i| i.name.clone()),
            image_bytes: submission.image().map_or(0, |i| i.bytes.len()),
            spectrum_points: submission.spectrum().map(|s| s.len()),
            measurements: measurements.clone(),
            parameters,
            context: *ctx,
        };
        let outcomes = StageOutcomes {
            detection,
            material,
            index,
            forecast,
            physics,
            simulation,
        };
        let report = Report::assemble(generated_at, metadata, outcomes, policy);

        let degraded = report.degraded_stages();
        info!(
            report_id = %report.id(),
            role = %ctx.role,
            degraded = ?degraded.iter().map(ToString::to_string).collect::<Vec<_>>(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete ({}/6 stages measured)",
            6 - degraded.len()
        );
        report
    }

    /// Run independent submissions in parallel. Output order matches input.
    pub fn run_batch(&self, jobs: Vec<(SampleSubmission, RequestContext)>) -> Vec<Report> {
        info!(jobs = jobs.len(), "Starting batch analysis");
        jobs.into_par_iter()
            .map(|(submission, ctx)| self.run(submission, &ctx))
            .collect()
    }
}

/// Invoke a collaborator with errors and panics contained, then check its
/// output.
fn attempt<T>(
    stage: StageKind,
    call: impl FnOnce() -> anyhow::Result<T>,
    check: impl FnOnce(T) -> CheckResult<T>,
) -> Result<T, StageError> {
    debug!(stage = %stage, collaborator = stage.collaborator(), "Stage {} starting", stage.order());
    let value = match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            return Err(StageError::Unavailable {
                stage,
                reason: format!("{e:#}"),
            })
        }
        Err(payload) => {
            return Err(StageError::Unavailable {
                stage,
                reason: format!("collaborator panicked: {}", panic_message(payload.as_ref())),
            })
        }
    };
    check(value).map_err(|reason| StageError::Degraded { stage, reason })
}

fn settle<T>(outcome: Result<T, StageError>, fallback: impl FnOnce() -> T) -> StageResult<T> {
    match outcome {
        Ok(value) => StageResult::ok(value),
        Err(err) => degrade(fallback(), &err),
    }
}

fn degrade<T>(value: T, err: &StageError) -> StageResult<T> {
    warn!(
        stage = %err.stage(),
        kind = %err.kind(),
        reason = %err.reason(),
        "Stage degraded, using synthetic value"
    );
    StageResult::degraded(value, err)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

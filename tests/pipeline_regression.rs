//! Pipeline Regression Tests
//!
//! Drives `AnalysisPipeline::run` with scripted collaborators (working,
//! failing, panicking and misbehaving) and asserts the report contract:
//! six stages, correct tags, fallbacks flowing downstream, exports intact.

use aquascope::config::MonitorConfig;
use aquascope::pipeline::AnalysisPipeline;
use aquascope::report::export::{self, ExportFormat};
use aquascope::stages::{
    IndexScorer, MaterialClassifier, ParticleDetector, PhysicsPredictor, ScenarioSimulator,
    StageSet, TrendForecaster,
};
use aquascope::types::{
    DegradationKind, DetectionResult, ForecastResult, IndexResult, MaterialResult,
    ParameterVector, PhysicsPoint, PhysicsResult, PolicyParameters, Polymer, RequestContext,
    SampleImage, SampleSubmission, SimulationResult, Spectrum, SpectrumPoint, StageKind,
    StageTag, UserRole, WaterMeasurements, WaterParameter,
};
use chrono::Utc;
use std::sync::{Arc, Mutex};

// ============================================================================
// Scripted Collaborators
// ============================================================================

struct FixedDetector {
    seen_threshold: Arc<Mutex<Option<f64>>>,
}

impl ParticleDetector for FixedDetector {
    fn name(&self) -> &str {
        "fixed-detector"
    }

    fn detect(&self, _image: &SampleImage, confidence_threshold: f64) -> anyhow::Result<DetectionResult> {
        *self.seen_threshold.lock().unwrap() = Some(confidence_threshold);
        Ok(DetectionResult::from_types([("fiber", 80), ("fragment", 40)], Some(0.82)))
    }
}

struct FailingDetector;

impl ParticleDetector for FailingDetector {
    fn name(&self) -> &str {
        "failing-detector"
    }

    fn detect(&self, _image: &SampleImage, _t: f64) -> anyhow::Result<DetectionResult> {
        anyhow::bail!("weights file not found")
    }
}

struct FixedClassifier;

impl MaterialClassifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed-classifier"
    }

    fn classify(&self, spectrum: &[f64]) -> anyhow::Result<MaterialResult> {
        anyhow::ensure!(spectrum.len() == 1024, "expected 1024 points, got {}", spectrum.len());
        Ok(MaterialResult::fixed(Polymer::Pet, 0.7))
    }
}

struct FixedScorer;

impl IndexScorer for FixedScorer {
    fn name(&self) -> &str {
        "fixed-scorer"
    }

    fn score(&self, parameters: &ParameterVector) -> anyhow::Result<IndexResult> {
        anyhow::ensure!(parameters.len() == 16, "incomplete parameter vector");
        Ok(IndexResult::from_score(68.4))
    }
}

/// Claims "Good" for a score in the moderate band.
struct MislabellingScorer;

impl IndexScorer for MislabellingScorer {
    fn name(&self) -> &str {
        "mislabelling-scorer"
    }

    fn score(&self, _parameters: &ParameterVector) -> anyhow::Result<IndexResult> {
        Ok(IndexResult {
            score: 60.0,
            classification: aquascope::assessment::QualityBand::Good,
        })
    }
}

struct RecordingForecaster {
    seen_initial: Arc<Mutex<Option<f64>>>,
}

impl TrendForecaster for RecordingForecaster {
    fn name(&self) -> &str {
        "recording-forecaster"
    }

    fn forecast(&self, initial_score: f64, horizon_days: usize) -> anyhow::Result<ForecastResult> {
        *self.seen_initial.lock().unwrap() = Some(initial_score);
        Ok(ForecastResult::daily(
            Utc::now().date_naive(),
            vec![initial_score + 1.0; horizon_days],
        ))
    }
}

struct PanickingForecaster;

impl TrendForecaster for PanickingForecaster {
    fn name(&self) -> &str {
        "panicking-forecaster"
    }

    fn forecast(&self, _initial_score: f64, _horizon_days: usize) -> anyhow::Result<ForecastResult> {
        panic!("forecaster state corrupted")
    }
}

struct FlatPhysics;

impl PhysicsPredictor for FlatPhysics {
    fn name(&self) -> &str {
        "flat-physics"
    }

    fn predict(&self, parameters: &ParameterVector, horizon_hours: u32) -> anyhow::Result<PhysicsResult> {
        let oxygen = parameters
            .get(WaterParameter::DissolvedOxygen)
            .ok_or_else(|| anyhow::anyhow!("dissolved_oxygen missing"))?
            - 1.5;
        let points = (0..=horizon_hours)
            .map(|h| PhysicsPoint {
                hour: f64::from(h),
                oxygen_mg_l: oxygen,
            })
            .collect();
        Ok(PhysicsResult::from_series(points))
    }
}

struct RecordingSimulator {
    seen_policy: Arc<Mutex<Option<PolicyParameters>>>,
}

impl ScenarioSimulator for RecordingSimulator {
    fn name(&self) -> &str {
        "recording-simulator"
    }

    fn simulate(
        &self,
        policy: &PolicyParameters,
        initial_score: f64,
        horizon_days: usize,
    ) -> anyhow::Result<SimulationResult> {
        *self.seen_policy.lock().unwrap() = Some(*policy);
        let values = (0..horizon_days).map(|d| initial_score + d as f64 * 0.5);
        Ok(SimulationResult::daily(initial_score, values))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct Recorded {
    threshold: Arc<Mutex<Option<f64>>>,
    forecast_initial: Arc<Mutex<Option<f64>>>,
    policy: Arc<Mutex<Option<PolicyParameters>>>,
}

fn working_stages(recorded: &Recorded) -> StageSet {
    StageSet::default()
        .with_detector(FixedDetector {
            seen_threshold: Arc::clone(&recorded.threshold),
        })
        .with_classifier(FixedClassifier)
        .with_scorer(FixedScorer)
        .with_forecaster(RecordingForecaster {
            seen_initial: Arc::clone(&recorded.forecast_initial),
        })
        .with_physics(FlatPhysics)
        .with_simulator(RecordingSimulator {
            seen_policy: Arc::clone(&recorded.policy),
        })
}

fn seeded_config() -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.fallback.seed = Some(2024);
    config
}

fn spectrum() -> Spectrum {
    let points = (0..200)
        .map(|i| SpectrumPoint {
            wavenumber: 400.0 + f64::from(i) * 15.0,
            intensity: (f64::from(i) / 10.0).sin().abs(),
        })
        .collect();
    Spectrum::new(points).unwrap()
}

fn full_submission(threshold: f64) -> SampleSubmission {
    SampleSubmission::new(WaterMeasurements::default(), threshold)
        .unwrap()
        .with_image(SampleImage::new(vec![0x89, 0x50, 0x4e, 0x47], Some("river.png".to_string())))
        .with_spectrum(spectrum())
}

fn bare_submission() -> SampleSubmission {
    let measurements = WaterMeasurements {
        dissolved_oxygen: 7.5,
        ph: 7.0,
        temperature: 25.0,
        ..WaterMeasurements::default()
    };
    SampleSubmission::new(measurements, 0.5).unwrap()
}

fn ctx(role: UserRole, config: &MonitorConfig) -> RequestContext {
    RequestContext::for_role(role, config)
}

// ============================================================================
// Degradation Contract
// ============================================================================

#[test]
fn all_collaborators_failing_yields_six_degraded_stages() {
    let config = seeded_config();
    let pipeline = AnalysisPipeline::new(StageSet::default(), config.clone()).unwrap();

    let report = pipeline.run(bare_submission(), &ctx(UserRole::Government, &config));

    let statuses = report.statuses();
    assert_eq!(statuses.len(), 6);
    assert!(statuses.iter().all(|s| s.tag == StageTag::Degraded));
    assert_eq!(report.degraded_stages(), StageKind::ALL.to_vec());

    // Fallback values are complete and usable
    assert_eq!(report.detection().value().count, 0);
    assert_eq!(report.material().value().polymer, Polymer::Pe);
    assert_eq!(report.index().value().score, 52.3);
    assert_eq!(report.forecast().value().len(), 60);
    assert_eq!(report.physics().value().points.len(), 100);
    assert_eq!(report.simulation().value().points.len(), 30);
}

#[test]
fn repeated_failing_runs_share_tags() {
    let config = MonitorConfig::default();
    let pipeline = AnalysisPipeline::new(StageSet::default(), config.clone()).unwrap();
    let context = ctx(UserRole::Researcher, &config);

    let a = pipeline.run(bare_submission(), &context);
    let b = pipeline.run(bare_submission(), &context);

    let tags_a: Vec<StageTag> = a.statuses().iter().map(|s| s.tag).collect();
    let tags_b: Vec<StageTag> = b.statuses().iter().map(|s| s.tag).collect();
    assert_eq!(tags_a, tags_b);
    assert!(tags_a.iter().all(|t| *t == StageTag::Degraded));
    assert_ne!(a.id(), b.id());
}

#[test]
fn missing_image_skips_detector() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let pipeline = AnalysisPipeline::new(working_stages(&recorded), config.clone()).unwrap();

    let submission = SampleSubmission::new(WaterMeasurements::default(), 0.4)
        .unwrap()
        .with_spectrum(spectrum());
    let report = pipeline.run(submission, &ctx(UserRole::Government, &config));

    assert_eq!(report.detection().degradation(), Some(DegradationKind::MissingInput));
    assert!(recorded.threshold.lock().unwrap().is_none());
    assert_eq!(report.index().tag(), StageTag::Ok);
}

#[test]
fn detector_error_degrades_detection_only() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let stages = working_stages(&recorded).with_detector(FailingDetector);
    let pipeline = AnalysisPipeline::new(stages, config.clone()).unwrap();

    let report = pipeline.run(full_submission(0.5), &ctx(UserRole::Government, &config));

    let detection = report.detection();
    assert_eq!(detection.tag(), StageTag::Degraded);
    assert_eq!(detection.degradation(), Some(DegradationKind::Unavailable));
    assert_eq!(detection.value().count, 0);
    assert!(detection.reason().unwrap().contains("weights file not found"));

    // Downstream stages still ran on real collaborators
    for result_tag in [
        report.material().tag(),
        report.index().tag(),
        report.forecast().tag(),
        report.physics().tag(),
        report.simulation().tag(),
    ] {
        assert_eq!(result_tag, StageTag::Ok);
    }
    // Zero particles means zero pollution load
    let policy = recorded.policy.lock().unwrap().unwrap();
    assert_eq!(policy.pollution_load, 0.0);
}

#[test]
fn panicking_forecaster_is_contained() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let stages = working_stages(&recorded).with_forecaster(PanickingForecaster);
    let pipeline = AnalysisPipeline::new(stages, config.clone()).unwrap();

    let report = pipeline.run(full_submission(0.5), &ctx(UserRole::Admin, &config));

    let forecast = report.forecast();
    assert_eq!(forecast.degradation(), Some(DegradationKind::Unavailable));
    assert!(forecast.reason().unwrap().contains("forecaster state corrupted"));

    let points = &forecast.value().points;
    assert_eq!(points.len(), 60);
    assert_eq!(points[0].date, report.generated_at().date_naive());
    assert!(points.windows(2).all(|w| w[0].date < w[1].date));
    assert_eq!(report.simulation().tag(), StageTag::Ok);
}

#[test]
fn invalid_scorer_output_falls_back_to_last_known_index() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let stages = working_stages(&recorded).with_scorer(MislabellingScorer);
    let pipeline = AnalysisPipeline::new(stages, config.clone()).unwrap();
    let context = ctx(UserRole::Government, &config).with_last_known_index(Some(71.5));

    let report = pipeline.run(full_submission(0.5), &context);

    let index = report.index();
    assert_eq!(index.degradation(), Some(DegradationKind::InvalidOutput));
    assert_eq!(index.value().score, 71.5);
    // The forecaster sees the fallback score exactly as it would a real one
    assert_eq!(*recorded.forecast_initial.lock().unwrap(), Some(71.5));
}

#[test]
fn stand_in_spectrum_is_tagged_synthetic() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let pipeline = AnalysisPipeline::new(working_stages(&recorded), config.clone()).unwrap();

    let submission = SampleSubmission::new(WaterMeasurements::default(), 0.5)
        .unwrap()
        .with_image(SampleImage::new(vec![1, 2, 3], None));
    let report = pipeline.run(submission, &ctx(UserRole::Researcher, &config));

    let material = report.material();
    assert_eq!(material.degradation(), Some(DegradationKind::StandInInput));
    assert_eq!(material.value().polymer, Polymer::Pet);
    assert!(report.metadata().spectrum_points.is_none());
}

// ============================================================================
// Data Flow
// ============================================================================

#[test]
fn working_collaborators_produce_fully_measured_report() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let pipeline = AnalysisPipeline::new(working_stages(&recorded), config.clone()).unwrap();

    let report = pipeline.run(full_submission(0.2), &ctx(UserRole::Government, &config));

    assert!(report.is_fully_measured());
    let detection = report.detection().value();
    assert_eq!(detection.count, 120);
    assert_eq!(
        detection.particle_types.values().map(|&n| u64::from(n)).sum::<u64>(),
        u64::from(detection.count)
    );
    assert!((report.material().value().probability_sum() - 1.0).abs() < 1e-6);
    assert_eq!(*recorded.forecast_initial.lock().unwrap(), Some(68.4));

    let physics = report.physics().value();
    assert_eq!(physics.points.len(), 73);
    assert_eq!(
        physics.critical_points,
        physics.points.iter().filter(|p| p.oxygen_mg_l < 4.0).count()
    );
}

#[test]
fn detector_receives_stricter_threshold() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let pipeline = AnalysisPipeline::new(working_stages(&recorded), config.clone()).unwrap();

    let report = pipeline.run(full_submission(0.2), &ctx(UserRole::Public, &config));
    assert_eq!(*recorded.threshold.lock().unwrap(), Some(0.5));
    assert_eq!(report.metadata().detection_threshold, 0.5);

    pipeline.run(full_submission(0.9), &ctx(UserRole::Public, &config));
    assert_eq!(*recorded.threshold.lock().unwrap(), Some(0.9));
}

#[test]
fn simulator_receives_derived_pollution_load() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let pipeline = AnalysisPipeline::new(working_stages(&recorded), config.clone()).unwrap();

    let report = pipeline.run(full_submission(0.5), &ctx(UserRole::Government, &config));

    let policy = recorded.policy.lock().unwrap().unwrap();
    assert_eq!(policy.pollution_load, 1200.0);
    assert_eq!(policy.cleanup_frequency, 0.2);
    assert_eq!(policy.regulation_strictness, 0.7);
    assert_eq!(*report.policy(), policy);
}

#[test]
fn batch_runs_preserve_order() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let pipeline = AnalysisPipeline::new(working_stages(&recorded), config.clone()).unwrap();
    let context = ctx(UserRole::Government, &config);

    let jobs = vec![
        (full_submission(0.5), context),
        (bare_submission(), context),
        (full_submission(0.5), context),
    ];
    let reports = pipeline.run_batch(jobs);

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].detection().value().count, 120);
    assert_eq!(reports[1].detection().degradation(), Some(DegradationKind::MissingInput));
    assert_eq!(reports[2].detection().value().count, 120);
}

// ============================================================================
// Exports & Views
// ============================================================================

#[test]
fn summary_csv_matches_dashboard_layout() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let pipeline = AnalysisPipeline::new(working_stages(&recorded), config.clone()).unwrap();

    let report = pipeline.run(full_submission(0.5), &ctx(UserRole::Government, &config));
    let csv = export::summary_csv(&report);

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Metric,Value",
            "Microplastics,120",
            "Polymer,PET",
            "WQI,68.4",
            "DO (72h),6.0",
            "Final WQI (30d),82.9",
        ]
    );
}

#[test]
fn stage_and_detection_exports() {
    let config = seeded_config();
    let pipeline = AnalysisPipeline::new(StageSet::default(), config.clone()).unwrap();
    let report = pipeline.run(bare_submission(), &ctx(UserRole::Admin, &config));

    let stages = export::stages_csv(&report);
    let lines: Vec<&str> = stages.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "Stage,Status,Reason");
    assert!(lines[1].starts_with("detect,DEGRADED,"));
    assert!(lines[5].starts_with("physics_predict,DEGRADED,"));

    let detection = export::detection_csv(&report);
    let header = detection.lines().next().unwrap();
    assert_eq!(header, "Date,Total_Particles,Avg_Confidence,Risk_Level");
    assert!(detection.lines().nth(1).unwrap().ends_with(",0,0.00%,Low"));
}

#[test]
fn json_export_carries_stage_tags() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let stages = working_stages(&recorded).with_detector(FailingDetector);
    let pipeline = AnalysisPipeline::new(stages, config.clone()).unwrap();
    let report = pipeline.run(full_submission(0.5), &ctx(UserRole::Government, &config));

    let json = ExportFormat::Json.render(&report).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["detection"]["status"], "degraded");
    assert_eq!(v["detection"]["kind"], "unavailable");
    assert_eq!(v["index"]["status"], "ok");
    assert_eq!(v["metadata"]["image_name"], "river.png");
}

#[test]
fn json_export_carries_assessment() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let pipeline = AnalysisPipeline::new(working_stages(&recorded), config.clone()).unwrap();
    let report = pipeline.run(full_submission(0.5), &ctx(UserRole::Researcher, &config));

    let json = ExportFormat::Json.render(&report).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    let assessment = &v["assessment"];
    assert_eq!(assessment["risk"], "high");
    assert_eq!(assessment["dominant_particle_type"], "fiber");
    assert_eq!(assessment["particle_types"][0]["label"], "fiber");
    assert_eq!(assessment["particle_types"][0]["description"], "Long thin particles from textiles");
    assert_eq!(assessment["material"]["polymer"], "PET");
    assert_eq!(assessment["material"]["confidence_level"], "medium");
    assert_eq!(assessment["material"]["characteristic_peaks"][1]["wavenumber"], 1730);
    assert!(assessment["oxygen_alert"]["headline"].is_string());

    let view = serde_json::to_value(report.view_for(UserRole::Researcher)).unwrap();
    assert_eq!(view["assessment"]["material"]["confidence_level"], "medium");
    assert_eq!(view["assessment"]["material"]["full_name"], "Polyethylene Terephthalate");
}

#[test]
fn export_written_to_dir_uses_timestamped_name() {
    let config = seeded_config();
    let pipeline = AnalysisPipeline::new(StageSet::default(), config.clone()).unwrap();
    let report = pipeline.run(bare_submission(), &ctx(UserRole::Government, &config));

    let dir = tempfile::tempdir().unwrap();
    let path = export::write_to_dir(&report, ExportFormat::Summary, dir.path()).unwrap();

    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("analysis_") && name.ends_with(".csv"));
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("Metric,Value\n"));
}

#[test]
fn public_view_hides_everything_but_detection() {
    let config = seeded_config();
    let recorded = Recorded::default();
    let pipeline = AnalysisPipeline::new(working_stages(&recorded), config.clone()).unwrap();
    let report = pipeline.run(full_submission(0.5), &ctx(UserRole::Public, &config));

    let view = report.view_for(UserRole::Public);
    assert_eq!(view.stages.len(), 6);
    assert_eq!(view.visible_stages(), vec![StageKind::Detect]);
    assert_eq!(
        view.assessment.risk,
        Some(aquascope::assessment::ContaminationRisk::High)
    );
    assert!(view.assessment.policy_recommendations.is_none());

    let gov = report.view_for(UserRole::Government);
    assert_eq!(gov.assessment.policy_recommendations.map(|r| r.len()), Some(4));
}

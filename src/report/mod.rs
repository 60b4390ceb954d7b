//! Report - the aggregate of one pipeline run
//!
//! A `Report` always holds a value for all six stages (real or fallback)
//! and is never mutated after assembly. Presentation goes through
//! `Report::view_for`, which trims the stage values a role may not see while
//! still listing every stage's real/synthetic tag.

pub mod export;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::assessment::{
    self, advisories, ConfidenceLevel, ContaminationRisk, ForecastOutlook, OxygenAlert,
    QualityBand, SimulationTrend,
};
use crate::types::{
    DetectionResult, ForecastResult, IndexResult, MaterialResult, ParameterVector, PhysicsResult,
    PolicyParameters, Polymer, RequestContext, SimulationResult, StageKind, StageResult,
    StageStatus, UserRole, WaterMeasurements,
};

// ============================================================================
// Metadata
// ============================================================================

/// What was submitted and under which context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionMetadata {
    pub station: String,
    pub role: UserRole,
    /// Threshold supplied with the submission
    pub confidence_threshold: f64,
    /// Threshold actually handed to the detector
    pub detection_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    pub image_bytes: usize,
    /// Points in the submitted spectrum; `None` when a stand-in was classified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectrum_points: Option<usize>,
    pub measurements: WaterMeasurements,
    pub parameters: ParameterVector,
    pub context: RequestContext,
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    id: Uuid,
    generated_at: DateTime<Utc>,
    metadata: SubmissionMetadata,
    detection: StageResult<DetectionResult>,
    material: StageResult<MaterialResult>,
    index: StageResult<IndexResult>,
    forecast: StageResult<ForecastResult>,
    physics: StageResult<PhysicsResult>,
    simulation: StageResult<SimulationResult>,
    policy: PolicyParameters,
}

/// All six stage results of one run, in stage order.
#[derive(Debug, Clone)]
pub struct StageOutcomes {
    pub detection: StageResult<DetectionResult>,
    pub material: StageResult<MaterialResult>,
    pub index: StageResult<IndexResult>,
    pub forecast: StageResult<ForecastResult>,
    pub physics: StageResult<PhysicsResult>,
    pub simulation: StageResult<SimulationResult>,
}

impl Report {
    pub fn assemble(
        generated_at: DateTime<Utc>,
        metadata: SubmissionMetadata,
        outcomes: StageOutcomes,
        policy: PolicyParameters,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            generated_at,
            metadata,
            detection: outcomes.detection,
            material: outcomes.material,
            index: outcomes.index,
            forecast: outcomes.forecast,
            physics: outcomes.physics,
            simulation: outcomes.simulation,
            policy,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn metadata(&self) -> &SubmissionMetadata {
        &self.metadata
    }

    pub fn detection(&self) -> &StageResult<DetectionResult> {
        &self.detection
    }

    pub fn material(&self) -> &StageResult<MaterialResult> {
        &self.material
    }

    pub fn index(&self) -> &StageResult<IndexResult> {
        &self.index
    }

    pub fn forecast(&self) -> &StageResult<ForecastResult> {
        &self.forecast
    }

    pub fn physics(&self) -> &StageResult<PhysicsResult> {
        &self.physics
    }

    pub fn simulation(&self) -> &StageResult<SimulationResult> {
        &self.simulation
    }

    /// Policy levers the simulator was run under.
    pub fn policy(&self) -> &PolicyParameters {
        &self.policy
    }

    /// Tag and reason of every stage, in stage order.
    pub fn statuses(&self) -> [StageStatus; 6] {
        [
            StageStatus::of(StageKind::Detect, &self.detection),
            StageStatus::of(StageKind::Classify, &self.material),
            StageStatus::of(StageKind::Score, &self.index),
            StageStatus::of(StageKind::Forecast, &self.forecast),
            StageStatus::of(StageKind::PhysicsPredict, &self.physics),
            StageStatus::of(StageKind::Simulate, &self.simulation),
        ]
    }

    pub fn degraded_stages(&self) -> Vec<StageKind> {
        self.statuses()
            .into_iter()
            .filter(|s| s.kind.is_some())
            .map(|s| s.stage)
            .collect()
    }

    /// True when no stage value is synthetic.
    pub fn is_fully_measured(&self) -> bool {
        self.degraded_stages().is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        let detection = self.detection.value();
        let index = self.index.value();
        ReportSummary {
            particle_count: detection.count,
            polymer: self.material.value().polymer,
            index_score: index.score,
            quality_band: index.classification,
            mean_oxygen: self.physics.value().mean_oxygen,
            final_simulated_index: self.simulation.value().final_value,
        }
    }

    pub fn assessment(&self) -> Assessment {
        let detection = self.detection.value();
        let risk = assessment::risk_level(detection.count);
        let index = self.index.value();
        let simulation = self.simulation.value();
        let trend = simulation.trend();

        Assessment {
            risk: Some(risk),
            risk_headline: Some(advisories::risk_headline(risk)),
            health_guidance: Some(
                advisories::health_guidance(risk)
                    .iter()
                    .map(|s| (*s).to_string())
                    .collect(),
            ),
            particle_types: Some(
                detection
                    .particle_types
                    .iter()
                    .map(|(label, &count)| ParticleTypeNote {
                        label: label.clone(),
                        count,
                        description: advisories::particle_type_description(label),
                    })
                    .collect(),
            ),
            dominant_particle_type: detection.dominant_type().map(|(label, _)| label.to_string()),
            material: Some(MaterialAssessment::from_result(self.material.value())),
            quality_band: Some(index.classification),
            quality_colour: Some(index.classification.colour()),
            forecast_outlook: self.forecast.value().outlook(index.score),
            oxygen_alert: Some(OxygenAlert::from_projection(self.physics.value())),
            simulation_trend: Some(trend),
            simulation_summary: Some(advisories::simulation_summary(trend, simulation.change())),
            policy_recommendations: Some(advisories::policy_recommendations(detection.count)),
        }
    }

    /// The slice of this report a role is allowed to see.
    pub fn view_for(&self, role: UserRole) -> ReportView {
        let profile = role.profile();
        let visible = |stage: StageKind| profile.permits(stage);

        ReportView {
            report_id: self.id,
            generated_at: self.generated_at,
            role,
            stages: self.statuses().to_vec(),
            detection: visible(StageKind::Detect).then(|| self.detection.clone()),
            material: visible(StageKind::Classify).then(|| self.material.clone()),
            index: visible(StageKind::Score).then(|| self.index.clone()),
            forecast: visible(StageKind::Forecast).then(|| self.forecast.clone()),
            physics: visible(StageKind::PhysicsPredict).then(|| self.physics.clone()),
            simulation: visible(StageKind::Simulate).then(|| self.simulation.clone()),
            assessment: self.assessment().restricted_to(role),
        }
    }
}

// ============================================================================
// Summary & Assessment
// ============================================================================

/// The five headline numbers of the summary export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportSummary {
    pub particle_count: u32,
    pub polymer: Polymer,
    pub index_score: f64,
    pub quality_band: QualityBand,
    pub mean_oxygen: f64,
    pub final_simulated_index: f64,
}

/// One row of the particle histogram with its shape description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleTypeNote {
    pub label: String,
    pub count: u32,
    /// `None` for labels outside the detector's documented vocabulary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RamanPeak {
    /// Raman shift (cm^-1)
    pub wavenumber: u32,
    pub assignment: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolymerProbability {
    pub polymer: Polymer,
    pub probability: f64,
}

/// Researcher-facing reading of the material classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialAssessment {
    pub polymer: Polymer,
    pub full_name: &'static str,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    /// Reference peaks of the identified polymer
    pub characteristic_peaks: Vec<RamanPeak>,
    /// Every label, most probable first
    pub ranked: Vec<PolymerProbability>,
}

impl MaterialAssessment {
    pub fn from_result(material: &MaterialResult) -> Self {
        let polymer = material.polymer;
        Self {
            polymer,
            full_name: polymer.full_name(),
            confidence: material.confidence,
            confidence_level: material.confidence_level(),
            characteristic_peaks: polymer
                .characteristic_peaks()
                .iter()
                .map(|&(wavenumber, assignment)| RamanPeak { wavenumber, assignment })
                .collect(),
            ranked: material
                .ranked()
                .into_iter()
                .map(|(polymer, probability)| PolymerProbability { polymer, probability })
                .collect(),
        }
    }
}

/// Threshold assessments derived from the stage values. Each field belongs
/// to the stage it is computed from and is `None` when that stage is hidden.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<ContaminationRisk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_headline: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_guidance: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particle_types: Option<Vec<ParticleTypeNote>>,
    /// Most frequent particle label; `None` also when nothing was detected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_particle_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_band: Option<QualityBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_colour: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_outlook: Option<ForecastOutlook>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_alert: Option<OxygenAlert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_trend: Option<SimulationTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_summary: Option<String>,
    /// Immediate actions; derived from the detection count but addressed to
    /// policy makers, so it follows the simulation stage's visibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_recommendations: Option<Vec<String>>,
}

impl Assessment {
    pub fn restricted_to(self, role: UserRole) -> Self {
        let profile = role.profile();
        let keep = |stage: StageKind| profile.permits(stage);
        Self {
            risk: self.risk.filter(|_| keep(StageKind::Detect)),
            risk_headline: self.risk_headline.filter(|_| keep(StageKind::Detect)),
            health_guidance: self.health_guidance.filter(|_| keep(StageKind::Detect)),
            particle_types: self.particle_types.filter(|_| keep(StageKind::Detect)),
            dominant_particle_type: self
                .dominant_particle_type
                .filter(|_| keep(StageKind::Detect)),
            material: self.material.filter(|_| keep(StageKind::Classify)),
            quality_band: self.quality_band.filter(|_| keep(StageKind::Score)),
            quality_colour: self.quality_colour.filter(|_| keep(StageKind::Score)),
            forecast_outlook: self.forecast_outlook.filter(|_| keep(StageKind::Forecast)),
            oxygen_alert: self.oxygen_alert.filter(|_| keep(StageKind::PhysicsPredict)),
            simulation_trend: self.simulation_trend.filter(|_| keep(StageKind::Simulate)),
            simulation_summary: self.simulation_summary.filter(|_| keep(StageKind::Simulate)),
            policy_recommendations: self
                .policy_recommendations
                .filter(|_| keep(StageKind::Simulate)),
        }
    }
}

// ============================================================================
// Role View
// ============================================================================

/// Role-filtered projection of a `Report`.
///
/// `stages` always lists all six tags so a viewer can tell which hidden
/// values would have been synthetic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub role: UserRole,
    pub stages: Vec<StageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<StageResult<DetectionResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<StageResult<MaterialResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<StageResult<IndexResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<StageResult<ForecastResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physics: Option<StageResult<PhysicsResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<StageResult<SimulationResult>>,
    pub assessment: Assessment,
}

impl ReportView {
    /// Stages whose values this view carries.
    pub fn visible_stages(&self) -> Vec<StageKind> {
        let present = [
            self.detection.is_some(),
            self.material.is_some(),
            self.index.is_some(),
            self.forecast.is_some(),
            self.physics.is_some(),
            self.simulation.is_some(),
        ];
        StageKind::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(stage, shown)| shown.then_some(stage))
            .collect()
    }
}

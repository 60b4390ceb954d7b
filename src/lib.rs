//! AquaScope: Water Quality & Microplastic Analysis
//!
//! Six-stage analysis pipeline turning a water sample (image, optional Raman
//! spectrum, field measurements) into one report, degrading per stage when a
//! model is missing or misbehaves.
//!
//! ## Architecture
//!
//! - **Stages**: collaborator traits for the six external models
//! - **Pipeline**: ordered, isolated stage execution with synthetic fallbacks
//! - **Assessment**: fixed threshold mappings and advisory texts
//! - **Report**: immutable run aggregate, per-role views and exports
//! - **API**: Axum HTTP surface over the pipeline

pub mod api;
pub mod assessment;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod stages;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, MonitorConfig};

// Re-export the pipeline entry points
pub use pipeline::AnalysisPipeline;
pub use stages::{
    IndexScorer, MaterialClassifier, ParticleDetector, PhysicsPredictor, ScenarioSimulator,
    StageSet, TrendForecaster,
};

// Re-export commonly used types
pub use report::{Report, ReportView};
pub use types::{
    RequestContext, SampleSubmission, StageError, StageKind, StageResult, SubmissionError,
    UserRole, WaterMeasurements,
};

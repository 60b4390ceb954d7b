//! Analysis Pipeline Module
//!
//! ## Six-Stage Pipeline
//!
//! ```text
//! STAGE 1: Detect          (image, skipped without one)
//! STAGE 2: Classify        (submitted spectrum or noise stand-in)
//! STAGE 3: Score           (16-key parameter vector)
//! STAGE 4: Forecast        (stage-3 score, 60 days)
//! STAGE 5: PhysicsPredict  (parameter vector, 72 hours)
//! STAGE 6: Simulate        (stage-1 pollution load + stage-3 score, 30 days)
//! ```
//!
//! GUARANTEE: `AnalysisPipeline::run` always returns a report with all six
//! stages populated. A stage that cannot produce a trustworthy value is
//! tagged `Degraded` and carries a synthetic one.

pub mod checks;
pub mod fallback;
mod orchestrator;

pub use fallback::FallbackGenerator;
pub use orchestrator::AnalysisPipeline;

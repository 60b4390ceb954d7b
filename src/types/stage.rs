//! Stage identifiers, tagged stage results and the stage error taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The six analytic stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Detect,
    Classify,
    Score,
    Forecast,
    PhysicsPredict,
    Simulate,
}

impl StageKind {
    /// Execution order. Later stages consume earlier outputs.
    pub const ALL: [StageKind; 6] = [
        StageKind::Detect,
        StageKind::Classify,
        StageKind::Score,
        StageKind::Forecast,
        StageKind::PhysicsPredict,
        StageKind::Simulate,
    ];

    /// 1-based position in the pipeline
    pub fn order(self) -> usize {
        self as usize + 1
    }

    /// Name of the external collaborator behind the stage
    pub fn collaborator(self) -> &'static str {
        match self {
            StageKind::Detect => "Particle Detector",
            StageKind::Classify => "Material Classifier",
            StageKind::Score => "Index Scorer",
            StageKind::Forecast => "Trend Forecaster",
            StageKind::PhysicsPredict => "Physics Predictor",
            StageKind::Simulate => "Scenario Simulator",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageKind::Detect => "detect",
            StageKind::Classify => "classify",
            StageKind::Score => "score",
            StageKind::Forecast => "forecast",
            StageKind::PhysicsPredict => "physics_predict",
            StageKind::Simulate => "simulate",
        };
        f.write_str(s)
    }
}

/// Why a stage carries a synthetic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    /// Collaborator missing, returned an error or panicked
    Unavailable,
    /// Collaborator ran but its output failed the structural checks
    InvalidOutput,
    /// Required input absent from the submission (e.g. no image)
    MissingInput,
    /// Collaborator ran on a stand-in signal, so its value is synthetic
    StandInInput,
}

impl fmt::Display for DegradationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DegradationKind::Unavailable => "unavailable",
            DegradationKind::InvalidOutput => "invalid_output",
            DegradationKind::MissingInput => "missing_input",
            DegradationKind::StandInInput => "stand_in_input",
        };
        f.write_str(s)
    }
}

/// Stage-level failure. Always caught inside the orchestrator and turned into
/// a `StageResult::Degraded`; never propagated out of a pipeline run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("{stage} unavailable: {reason}")]
    Unavailable { stage: StageKind, reason: String },

    #[error("{stage} output rejected: {reason}")]
    Degraded { stage: StageKind, reason: String },

    #[error("{stage} skipped: {reason}")]
    MissingInput { stage: StageKind, reason: String },

    #[error("{stage} ran on stand-in input: {reason}")]
    StandInInput { stage: StageKind, reason: String },
}

impl StageError {
    pub fn stage(&self) -> StageKind {
        match self {
            StageError::Unavailable { stage, .. }
            | StageError::Degraded { stage, .. }
            | StageError::MissingInput { stage, .. }
            | StageError::StandInInput { stage, .. } => *stage,
        }
    }

    pub fn kind(&self) -> DegradationKind {
        match self {
            StageError::Unavailable { .. } => DegradationKind::Unavailable,
            StageError::Degraded { .. } => DegradationKind::InvalidOutput,
            StageError::MissingInput { .. } => DegradationKind::MissingInput,
            StageError::StandInInput { .. } => DegradationKind::StandInInput,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            StageError::Unavailable { reason, .. }
            | StageError::Degraded { reason, .. }
            | StageError::MissingInput { reason, .. }
            | StageError::StandInInput { reason, .. } => reason,
        }
    }
}

/// Machine-readable real/synthetic marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageTag {
    Ok,
    Degraded,
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageTag::Ok => write!(f, "OK"),
            StageTag::Degraded => write!(f, "DEGRADED"),
        }
    }
}

/// Outcome of one stage. Both variants carry a usable value so downstream
/// stages never observe an absence; only the tag says whether it is real.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageResult<T> {
    Ok {
        value: T,
    },
    Degraded {
        fallback: T,
        kind: DegradationKind,
        reason: String,
    },
}

impl<T> StageResult<T> {
    pub fn ok(value: T) -> Self {
        StageResult::Ok { value }
    }

    pub fn degraded(fallback: T, error: &StageError) -> Self {
        StageResult::Degraded {
            fallback,
            kind: error.kind(),
            reason: error.to_string(),
        }
    }

    /// The value to compute with, real or synthetic.
    pub fn value(&self) -> &T {
        match self {
            StageResult::Ok { value } => value,
            StageResult::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageResult::Ok { value } => value,
            StageResult::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn tag(&self) -> StageTag {
        match self {
            StageResult::Ok { .. } => StageTag::Ok,
            StageResult::Degraded { .. } => StageTag::Degraded,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageResult::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            StageResult::Ok { .. } => None,
            StageResult::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn degradation(&self) -> Option<DegradationKind> {
        match self {
            StageResult::Ok { .. } => None,
            StageResult::Degraded { kind, .. } => Some(*kind),
        }
    }
}

/// Tag and reason of one stage, without its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStatus {
    pub stage: StageKind,
    pub tag: StageTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DegradationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StageStatus {
    pub fn of<T>(stage: StageKind, result: &StageResult<T>) -> Self {
        Self {
            stage,
            tag: result.tag(),
            kind: result.degradation(),
            reason: result.reason().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_fixed() {
        let orders: Vec<usize> = StageKind::ALL.iter().map(|s| s.order()).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(StageKind::ALL[0], StageKind::Detect);
        assert_eq!(StageKind::ALL[5], StageKind::Simulate);
    }

    #[test]
    fn test_degraded_and_ok_expose_value_identically() {
        let ok: StageResult<u32> = StageResult::ok(7);
        let err = StageError::Unavailable {
            stage: StageKind::Detect,
            reason: "model missing".to_string(),
        };
        let degraded: StageResult<u32> = StageResult::degraded(7, &err);

        assert_eq!(ok.value(), degraded.value());
        assert_eq!(ok.tag(), StageTag::Ok);
        assert_eq!(degraded.tag(), StageTag::Degraded);
        assert_eq!(degraded.degradation(), Some(DegradationKind::Unavailable));
        assert_eq!(degraded.reason(), Some("detect unavailable: model missing"));
        assert_eq!(ok.reason(), None);
    }

    #[test]
    fn test_stage_error_taxonomy() {
        let err = StageError::Degraded {
            stage: StageKind::Classify,
            reason: "probabilities sum to 0.7".to_string(),
        };
        assert_eq!(err.stage(), StageKind::Classify);
        assert_eq!(err.kind(), DegradationKind::InvalidOutput);
        assert_eq!(err.reason(), "probabilities sum to 0.7");
    }

    #[test]
    fn test_stage_result_serializes_tag() {
        let err = StageError::MissingInput {
            stage: StageKind::Detect,
            reason: "no image".to_string(),
        };
        let r: StageResult<u32> = StageResult::degraded(0, &err);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "degraded");
        assert_eq!(v["kind"], "missing_input");
        assert_eq!(v["fallback"], 0);

        let ok = serde_json::to_value(StageResult::ok(3u32)).unwrap();
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["value"], 3);
    }
}

//! User roles and the request-scoped context handed to a pipeline run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::StageKind;
use crate::config::MonitorConfig;

/// Closed set of dashboard audiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Public,
    Government,
    Researcher,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Public,
        UserRole::Government,
        UserRole::Researcher,
        UserRole::Admin,
    ];

    /// Lower-case key used in config sections and the HTTP API.
    pub fn key(self) -> &'static str {
        match self {
            UserRole::Public => "public",
            UserRole::Government => "government",
            UserRole::Researcher => "researcher",
            UserRole::Admin => "admin",
        }
    }

    /// Built-in profile for this role. The threshold here is the default;
    /// `MonitorConfig::role_profile` applies the `[roles]` override.
    pub fn profile(self) -> &'static RoleProfile {
        match self {
            UserRole::Public => &ROLE_PROFILES[0],
            UserRole::Government => &ROLE_PROFILES[1],
            UserRole::Researcher => &ROLE_PROFILES[2],
            UserRole::Admin => &ROLE_PROFILES[3],
        }
    }

    pub fn can_view(self, stage: StageKind) -> bool {
        self.profile().permits(stage)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Public => "Public",
            UserRole::Government => "Government",
            UserRole::Researcher => "Researcher",
            UserRole::Admin => "Admin",
        };
        f.write_str(s)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.key() == lower)
            .ok_or_else(|| format!("unknown role '{s}' (expected public, government, researcher or admin)"))
    }
}

// ============================================================================
// Role Lookup Table
// ============================================================================

/// Detection threshold and visible stages for one role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoleProfile {
    pub role: UserRole,
    pub confidence_threshold: f64,
    pub permitted_stages: &'static [StageKind],
}

impl RoleProfile {
    pub fn permits(&self, stage: StageKind) -> bool {
        self.permitted_stages.contains(&stage)
    }
}

const DETECTION_ONLY: &[StageKind] = &[StageKind::Detect];

static ROLE_PROFILES: [RoleProfile; 4] = [
    RoleProfile {
        role: UserRole::Public,
        confidence_threshold: crate::config::defaults::PUBLIC_CONFIDENCE,
        permitted_stages: DETECTION_ONLY,
    },
    RoleProfile {
        role: UserRole::Government,
        confidence_threshold: crate::config::defaults::GOVERNMENT_CONFIDENCE,
        permitted_stages: &StageKind::ALL,
    },
    RoleProfile {
        role: UserRole::Researcher,
        confidence_threshold: crate::config::defaults::RESEARCHER_CONFIDENCE,
        permitted_stages: &StageKind::ALL,
    },
    RoleProfile {
        role: UserRole::Admin,
        confidence_threshold: crate::config::defaults::ADMIN_CONFIDENCE,
        permitted_stages: &StageKind::ALL,
    },
];

// ============================================================================
// Request Context
// ============================================================================

/// Everything a run needs to know about who asked, passed explicitly into
/// `AnalysisPipeline::run`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub role: UserRole,
    /// Role threshold in effect (config override or built-in profile)
    pub confidence_threshold: f64,
    /// Index score of the previous analysis, used as the scoring fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_index: Option<f64>,
}

impl RequestContext {
    /// Context for `role` with the threshold from `config`.
    pub fn for_role(role: UserRole, config: &MonitorConfig) -> Self {
        Self {
            role,
            confidence_threshold: config.role_profile(role).confidence_threshold,
            last_known_index: None,
        }
    }

    pub fn with_last_known_index(mut self, score: Option<f64>) -> Self {
        self.last_known_index = score.filter(|s| s.is_finite());
        self
    }

    /// Threshold handed to the detector: the stricter of the submission's
    /// own threshold and the role's.
    pub fn detection_threshold(&self, submission_threshold: f64) -> f64 {
        submission_threshold.max(self.confidence_threshold)
    }
}

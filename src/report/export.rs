//! Report exports: summary CSV, per-stage CSV, detection CSV and JSON

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use super::{Assessment, Report};
use crate::assessment;
use crate::types::{StageKind, UserRole};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write export to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Export layouts a report can be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// `Metric,Value` headline numbers
    #[default]
    Summary,
    /// `Stage,Status,Reason` for all six stages
    Stages,
    /// One-row detection report with a column per particle type
    Detection,
    /// Full report as pretty-printed JSON
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Summary,
        ExportFormat::Stages,
        ExportFormat::Detection,
        ExportFormat::Json,
    ];

    pub fn render(self, report: &Report) -> Result<String, ExportError> {
        Ok(match self {
            ExportFormat::Summary => summary_csv(report),
            ExportFormat::Stages => stages_csv(report),
            ExportFormat::Detection => detection_csv(report),
            ExportFormat::Json => serde_json::to_string_pretty(&JsonExport {
                report,
                assessment: report.assessment(),
            })?,
        })
    }

    /// Stages whose values the layout reveals. The stages layout only carries
    /// tags and reasons, which every role view lists anyway.
    pub fn revealed_stages(self) -> &'static [StageKind] {
        match self {
            ExportFormat::Summary | ExportFormat::Json => &StageKind::ALL,
            ExportFormat::Detection => &[StageKind::Detect],
            ExportFormat::Stages => &[],
        }
    }

    pub fn permitted_for(self, role: UserRole) -> bool {
        self.revealed_stages().iter().all(|&stage| role.can_view(stage))
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            _ => "text/csv",
        }
    }

    /// Timestamped default file name, e.g. `analysis_20240601_153000.csv`.
    pub fn default_file_name(self, at: DateTime<Utc>) -> String {
        let stamp = at.format("%Y%m%d_%H%M%S");
        match self {
            ExportFormat::Summary => format!("analysis_{stamp}.csv"),
            ExportFormat::Stages => format!("analysis_stages_{stamp}.csv"),
            ExportFormat::Detection => format!("water_analysis_{stamp}.csv"),
            ExportFormat::Json => format!("analysis_{stamp}.json"),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportFormat::Summary => "summary",
            ExportFormat::Stages => "stages",
            ExportFormat::Detection => "detection",
            ExportFormat::Json => "json",
        };
        f.write_str(s)
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.to_string() == lower)
            .ok_or_else(|| format!("unknown export format '{s}' (expected summary, stages, detection or json)"))
    }
}

// ============================================================================
// Renderers
// ============================================================================

/// Full report with its derived assessment alongside the stage values.
#[derive(Serialize)]
struct JsonExport<'a> {
    #[serde(flatten)]
    report: &'a Report,
    assessment: Assessment,
}

fn escape_csv_cell(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(cells: &[String]) -> String {
    let mut line = cells
        .iter()
        .map(|c| escape_csv_cell(c))
        .collect::<Vec<String>>()
        .join(",");
    line.push('\n');
    line
}

/// `Metric,Value` with the five headline rows. Count is an integer, scores
/// have one decimal.
pub fn summary_csv(report: &Report) -> String {
    let s = report.summary();
    let rows = [
        ("Microplastics", s.particle_count.to_string()),
        ("Polymer", s.polymer.to_string()),
        ("WQI", format!("{:.1}", s.index_score)),
        ("DO (72h)", format!("{:.1}", s.mean_oxygen)),
        ("Final WQI (30d)", format!("{:.1}", s.final_simulated_index)),
    ];

    let mut out = csv_line(&["Metric".to_string(), "Value".to_string()]);
    for (metric, value) in rows {
        out.push_str(&csv_line(&[metric.to_string(), value]));
    }
    out
}

/// `Stage,Status,Reason` for all six stages in order.
pub fn stages_csv(report: &Report) -> String {
    let mut out = csv_line(&["Stage".to_string(), "Status".to_string(), "Reason".to_string()]);
    for status in report.statuses() {
        out.push_str(&csv_line(&[
            status.stage.to_string(),
            status.tag.to_string(),
            status.reason.unwrap_or_default(),
        ]));
    }
    out
}

fn title_case(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Single-row detection report:
/// `Date,Total_Particles,Avg_Confidence,Risk_Level,<Type>_Count...`
pub fn detection_csv(report: &Report) -> String {
    let detection = report.detection().value();

    let mut header = vec![
        "Date".to_string(),
        "Total_Particles".to_string(),
        "Avg_Confidence".to_string(),
        "Risk_Level".to_string(),
    ];
    let mut row = vec![
        report.generated_at().format("%Y-%m-%d %H:%M:%S").to_string(),
        detection.count.to_string(),
        format!("{:.2}%", detection.mean_confidence.unwrap_or(0.0) * 100.0),
        assessment::risk_level(detection.count).to_string(),
    ];
    for (label, count) in &detection.particle_types {
        header.push(format!("{}_Count", title_case(label)));
        row.push(count.to_string());
    }

    let mut out = csv_line(&header);
    out.push_str(&csv_line(&row));
    out
}

// ============================================================================
// Writers
// ============================================================================

/// Render `report` as `format` and write it to `path`.
pub fn write_export(report: &Report, format: ExportFormat, path: &Path) -> Result<(), ExportError> {
    let contents = format.render(report)?;
    std::fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(report_id = %report.id(), format = %format, path = %path.display(), "Export written");
    Ok(())
}

/// Write into `dir` under the format's default timestamped file name.
pub fn write_to_dir(report: &Report, format: ExportFormat, dir: &Path) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(format.default_file_name(report.generated_at()));
    write_export(report, format, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape_csv_cell() {
        assert_eq!(escape_csv_cell("plain"), "plain");
        assert_eq!(escape_csv_cell("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("fiber"), "Fiber");
        assert_eq!(title_case("FOAM"), "Foam");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_default_file_names() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap();
        assert_eq!(ExportFormat::Summary.default_file_name(at), "analysis_20240601_153000.csv");
        assert_eq!(ExportFormat::Json.default_file_name(at), "analysis_20240601_153000.json");
        assert_eq!(ExportFormat::Detection.default_file_name(at), "water_analysis_20240601_153000.csv");
    }

    #[test]
    fn test_public_role_limited_to_detection_layouts() {
        assert!(ExportFormat::Detection.permitted_for(UserRole::Public));
        assert!(ExportFormat::Stages.permitted_for(UserRole::Public));
        assert!(!ExportFormat::Summary.permitted_for(UserRole::Public));
        assert!(!ExportFormat::Json.permitted_for(UserRole::Public));
        for format in ExportFormat::ALL {
            assert!(format.permitted_for(UserRole::Researcher));
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert_eq!("stages".parse::<ExportFormat>(), Ok(ExportFormat::Stages));
        assert!("xlsx".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Summary.content_type(), "text/csv");
    }
}

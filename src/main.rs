//! AquaScope - Water Quality & Microplastic Analysis
//!
//! Command-line front end for the six-stage analysis pipeline.
//!
//! # Usage
//!
//! ```bash
//! # Analyze one submission, print the summary CSV
//! aquascope analyze sample.toml --role government
//!
//! # Full report as JSON into a file
//! aquascope analyze sample.toml --format json --out report.json
//!
//! # Every *.toml submission in a directory, in parallel
//! aquascope batch --dir submissions/ --out reports/
//!
//! # HTTP API
//! aquascope serve --addr 0.0.0.0:8080
//! ```
//!
//! # Environment Variables
//!
//! - `AQUASCOPE_CONFIG`: Path to the TOML config (default: ./aquascope.toml)
//! - `AQUASCOPE_CORS_ORIGINS`: Comma-separated origins allowed by the API
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use aquascope::api::{create_app, AppState};
use aquascope::report::export::{self, ExportFormat};
use aquascope::types::SubmissionInput;
use aquascope::{
    AnalysisPipeline, MonitorConfig, RequestContext, SampleSubmission, StageSet, UserRole,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "aquascope")]
#[command(about = "AquaScope Water Quality & Microplastic Analysis")]
#[command(version)]
struct CliArgs {
    /// Explicit config file (otherwise $AQUASCOPE_CONFIG, then ./aquascope.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run the pipeline on one submission file
    Analyze {
        /// Submission TOML (measurements, optional image_path / spectrum_path)
        submission: PathBuf,
        /// Requesting role (public, government, researcher, admin)
        #[arg(long, default_value = "government")]
        role: UserRole,
        /// Index score of the previous analysis, used if the scorer is unavailable
        #[arg(long)]
        last_index: Option<f64>,
        /// Output layout (summary, stages, detection, json)
        #[arg(long, default_value = "summary")]
        format: ExportFormat,
        /// Write to this file instead of stdout
        #[arg(long, conflicts_with = "out_dir")]
        out: Option<PathBuf>,
        /// Write into this directory under a timestamped name
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Run every *.toml submission in a directory in parallel
    Batch {
        /// Directory holding submission files
        #[arg(long)]
        dir: PathBuf,
        /// Directory receiving one summary CSV per submission
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "government")]
        role: UserRole,
    },

    /// Serve the HTTP API
    Serve {
        /// Override the server address (default from config: "0.0.0.0:8080")
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Print the role lookup table with effective thresholds
    Roles,

    /// Print the effective configuration as TOML
    Config,
}

// ============================================================================
// Helpers
// ============================================================================

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    match path {
        Some(p) => MonitorConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(MonitorConfig::load()),
    }
}

/// Read a submission TOML, resolving file references next to it.
fn load_submission(path: &Path, ctx: &RequestContext) -> Result<SampleSubmission> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read submission {}", path.display()))?;
    let input: SubmissionInput = toml::from_str(&text)
        .with_context(|| format!("Failed to parse submission {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let input = input
        .resolve_files(base)
        .with_context(|| format!("Failed to read files referenced by {}", path.display()))?;
    input
        .into_submission(ctx.confidence_threshold)
        .with_context(|| format!("Invalid submission {}", path.display()))
}

/// Refuse layouts that reveal stages the role may not view, as the API does.
fn ensure_export_permitted(format: ExportFormat, role: UserRole) -> Result<()> {
    anyhow::ensure!(
        format.permitted_for(role),
        "role {role} may not export the {format} layout (try --format detection or stages)"
    );
    Ok(())
}

fn submission_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();
    Ok(files)
}

fn build_pipeline(config: MonitorConfig) -> Result<AnalysisPipeline> {
    AnalysisPipeline::new(StageSet::default(), config).context("Invalid configuration")
}

// ============================================================================
// Commands
// ============================================================================

fn run_analyze(
    pipeline: &AnalysisPipeline,
    submission_path: &Path,
    ctx: RequestContext,
    format: ExportFormat,
    out: Option<&Path>,
    out_dir: Option<&Path>,
) -> Result<()> {
    ensure_export_permitted(format, ctx.role)?;
    let submission = load_submission(submission_path, &ctx)?;
    let report = pipeline.run(submission, &ctx);

    for status in report.statuses() {
        if let Some(reason) = &status.reason {
            warn!(stage = %status.stage, "{} value is synthetic: {}", status.stage, reason);
        }
    }

    match (out, out_dir) {
        (Some(path), _) => export::write_export(&report, format, path)?,
        (None, Some(dir)) => {
            let path = export::write_to_dir(&report, format, dir)?;
            println!("{}", path.display());
        }
        (None, None) => print!("{}", format.render(&report)?),
    }
    Ok(())
}

fn run_batch(pipeline: &AnalysisPipeline, dir: &Path, out: &Path, ctx: RequestContext) -> Result<()> {
    ensure_export_permitted(ExportFormat::Summary, ctx.role)?;
    let files = submission_files(dir)?;
    let mut names = Vec::with_capacity(files.len());
    let mut jobs = Vec::with_capacity(files.len());
    for path in &files {
        match load_submission(path, &ctx) {
            Ok(submission) => {
                let stem = path
                    .file_stem()
                    .map_or_else(|| "submission".to_string(), |s| s.to_string_lossy().into_owned());
                names.push(stem);
                jobs.push((submission, ctx));
            }
            Err(e) => warn!(path = %path.display(), error = %format!("{e:#}"), "Skipping submission"),
        }
    }

    std::fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;
    let reports = pipeline.run_batch(jobs);
    for (name, report) in names.iter().zip(&reports) {
        let path = out.join(format!("{name}.csv"));
        export::write_export(report, ExportFormat::Summary, &path)?;
    }

    info!(
        submitted = files.len(),
        analyzed = reports.len(),
        out = %out.display(),
        "Batch complete"
    );
    Ok(())
}

async fn run_server(pipeline: AnalysisPipeline, addr: &str) -> Result<()> {
    let app = create_app(AppState::new(pipeline));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "AquaScope API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received Ctrl+C, shutting down");
        })
        .await
        .context("Server error")
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let config = load_config(args.config.as_deref())?;

    match args.command {
        SubCommand::Analyze {
            submission,
            role,
            last_index,
            format,
            out,
            out_dir,
        } => {
            let ctx = RequestContext::for_role(role, &config).with_last_known_index(last_index);
            let pipeline = build_pipeline(config)?;
            run_analyze(&pipeline, &submission, ctx, format, out.as_deref(), out_dir.as_deref())
        }
        SubCommand::Batch { dir, out, role } => {
            let ctx = RequestContext::for_role(role, &config);
            let pipeline = build_pipeline(config)?;
            run_batch(&pipeline, &dir, &out, ctx)
        }
        SubCommand::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.server.addr.clone());
            let pipeline = build_pipeline(config)?;
            run_server(pipeline, &addr).await
        }
        SubCommand::Roles => {
            println!("{:<12} {:>10}  permitted stages", "role", "threshold");
            for role in UserRole::ALL {
                let profile = config.role_profile(role);
                let stages: Vec<String> =
                    profile.permitted_stages.iter().map(ToString::to_string).collect();
                println!(
                    "{:<12} {:>10.2}  {}",
                    role.key(),
                    profile.confidence_threshold,
                    stages.join(", ")
                );
            }
            Ok(())
        }
        SubCommand::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

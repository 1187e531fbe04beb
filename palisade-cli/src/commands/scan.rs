//! `palisade scan` command handler
//!
//! Runs the full pipeline: artifact detection, build resolution, both scan
//! stages, then severity aggregation. The scan itself never aborts on a
//! single tool failure; only infrastructure errors (bad config, unreadable
//! repository) stop the command.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use palisade_artifact_resolver::ArtifactResolver;
use palisade_build_executor::{BuildExecutor, BuildReport};
use palisade_core::config::{PalisadeConfig, RepositoryConfig};
use palisade_core::error::PalisadeError;
use palisade_core::event::ProgressEvent;
use palisade_core::types::{ScanCategory, ScanStatus, Severity, SeverityCounts};
use palisade_scan_orchestrator::{ScanOrchestrator, ScanResults, summarize};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
pub async fn execute(
    args: ScanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = PalisadeConfig::load(config_path).await?;
    let repository_config = config.repository.clone();

    // CLI flags override the file + env configuration
    if let Some(fail_on) = &args.fail_on {
        if Severity::from_str_loose(fail_on).is_none() {
            return Err(CliError::Command(format!(
                "invalid severity: {} (expected: critical, high, medium, low, info)",
                fail_on
            )));
        }
        config.severity.fail_on = fail_on.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.general.output_dir = dir.display().to_string();
    }

    let raw_target = args.path.to_string_lossy().into_owned();
    let repo_name = args
        .repo_name
        .clone()
        .unwrap_or_else(|| derive_repo_name(&raw_target));

    // Git URLs are cloned into the configured temp dir; local paths are
    // scanned in place. Cloned checkouts are removed again when
    // [repository] cleanup is enabled, including on Ctrl-C.
    let (repo_root, cloned) =
        acquire_repository(&raw_target, &repo_name, &repository_config).await?;
    if cloned && repository_config.cleanup {
        let cleanup_path = repo_root.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(path = %cleanup_path.display(), "interrupted, removing cloned repository");
                let _ = std::fs::remove_dir_all(&cleanup_path);
                std::process::exit(130);
            }
        });
    }

    let trace_id = uuid::Uuid::new_v4().to_string();
    info!(repo = %repo_name, path = %repo_root.display(), trace_id = %trace_id, "starting scan");

    // Progress events are drained into the log; a full channel never blocks
    // the pipeline itself.
    let (progress_tx, mut progress_rx) = mpsc::channel::<ProgressEvent>(256);
    let progress_task = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            info!(trace_id = %event.metadata.trace_id, "{event}");
        }
    });

    let mut inventory = ArtifactResolver::detect(&repo_root).map_err(PalisadeError::from)?;

    let build_report = if config.build.enabled && !args.no_build {
        let executor = BuildExecutor::new(config.build.clone())
            .with_progress(progress_tx.clone(), trace_id.clone());
        let report = executor
            .build(&repo_root, &repo_name, &mut inventory)
            .await
            .map_err(PalisadeError::from)?;
        Some(report)
    } else {
        info!("build step skipped");
        None
    };

    let orchestrator = ScanOrchestrator::new(config.scanners.clone(), config.performance.clone())
        .with_progress(progress_tx.clone(), trace_id.clone());
    let results = orchestrator
        .run(&repo_root, &inventory)
        .await
        .map_err(PalisadeError::from)?;

    // Close the channel so the drain task finishes.
    drop(progress_tx);
    let _ = progress_task.await;

    if cloned && repository_config.cleanup {
        if let Err(e) = std::fs::remove_dir_all(&repo_root) {
            warn!(path = %repo_root.display(), error = %e, "failed to remove cloned repository");
        }
    }

    let summary = summarize(&results);
    let fail_on = config.fail_on_severity();
    let report = build_scan_report(&repo_name, &repo_root, build_report.as_ref(), &results, &summary, fail_on);

    write_report_file(&config.general.output_dir, &repo_name, &report)?;
    writer.render(&report)?;

    let breaching: u64 = summary.values().map(|c| c.at_or_above(fail_on)).sum();
    if breaching > 0 {
        return Err(CliError::Threshold(format!(
            "{} findings at or above {}",
            breaching, fail_on
        )));
    }

    Ok(())
}

/// Derive a display name from a local path or git URL.
fn derive_repo_name(target: &str) -> String {
    let trimmed = target.trim_end_matches('/').trim_end_matches(".git");
    trimmed
        .rsplit(['/', ':'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("repository")
        .to_owned()
}

fn is_git_url(target: &str) -> bool {
    target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("git@")
        || target.ends_with(".git")
}

/// Resolve the scan target: clone git URLs into the temp dir, use local
/// paths as-is. Returns the repository root and whether it was cloned.
async fn acquire_repository(
    target: &str,
    repo_name: &str,
    config: &RepositoryConfig,
) -> Result<(PathBuf, bool), CliError> {
    if !is_git_url(target) {
        return Ok((PathBuf::from(target), false));
    }

    let dest = Path::new(&config.temp_dir).join(repo_name);
    if dest.exists() {
        std::fs::remove_dir_all(&dest)?;
    }
    std::fs::create_dir_all(&config.temp_dir)?;

    info!(url = %target, dest = %dest.display(), "cloning repository");
    let dest_arg = dest.display().to_string();
    let status = tokio::process::Command::new("git")
        .args(["clone", "--depth", "1", target, &dest_arg])
        .status()
        .await
        .map_err(|e| CliError::Command(format!("failed to run git: {e}")))?;
    if !status.success() {
        return Err(CliError::Command(format!(
            "git clone of {target} failed with {status}"
        )));
    }

    Ok((dest, true))
}

/// Persist the full report as JSON under the configured output directory.
fn write_report_file(output_dir: &str, repo_name: &str, report: &ScanReport) -> Result<(), CliError> {
    std::fs::create_dir_all(output_dir)?;
    let path = Path::new(output_dir).join(format!("{repo_name}-scan-report.json"));
    let file = std::fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, report)?;
    info!(path = %path.display(), "report written");
    Ok(())
}

fn build_scan_report(
    repo_name: &str,
    path: &Path,
    build: Option<&BuildReport>,
    results: &ScanResults,
    summary: &std::collections::BTreeMap<ScanCategory, SeverityCounts>,
    fail_on: Severity,
) -> ScanReport {
    let mut units = Vec::new();
    let mut not_installed = std::collections::BTreeSet::new();
    let mut conflicts = None;

    for (key, result) in results {
        if result.status == ScanStatus::NotInstalled {
            not_installed.insert(result.tool.clone());
        }
        if key.category == ScanCategory::Consistency && key.tool == "syft" {
            conflicts = result.payload.as_json().cloned();
        }
        units.push(UnitEntry {
            category: key.category.to_string(),
            tool: key.tool.clone(),
            target: key.target.clone(),
            status: result.status.to_string(),
            error: result.error_detail.clone(),
            duration_secs: result.duration.as_secs_f64(),
        });
    }

    let categories = summary
        .iter()
        .map(|(category, counts)| CategoryEntry {
            category: category.to_string(),
            counts: *counts,
        })
        .collect();

    let mut totals = SeverityCounts::default();
    for counts in summary.values() {
        totals.critical += counts.critical;
        totals.high += counts.high;
        totals.medium += counts.medium;
        totals.low += counts.low;
        totals.info += counts.info;
    }

    ScanReport {
        repo: repo_name.to_owned(),
        path: path.display().to_string(),
        build: build.map(|report| BuildSummary {
            maven_runs: report.maven.len(),
            gradle_runs: report.gradle.len(),
            image_builds: report.container.len(),
            succeeded: report.succeeded(),
            failed: report.failed(),
            artifacts_added: report.artifacts_added,
        }),
        categories,
        totals,
        fail_on: fail_on.to_string(),
        not_installed: not_installed.into_iter().collect(),
        conflicts,
        units,
    }
}

/// Full scan report: build summary, per-category severity counts, and the
/// status of every scan unit that ran.
#[derive(Serialize)]
pub struct ScanReport {
    pub repo: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSummary>,
    pub categories: Vec<CategoryEntry>,
    pub totals: SeverityCounts,
    pub fail_on: String,
    pub not_installed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<serde_json::Value>,
    pub units: Vec<UnitEntry>,
}

#[derive(Serialize)]
pub struct BuildSummary {
    pub maven_runs: usize,
    pub gradle_runs: usize,
    pub image_builds: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub artifacts_added: usize,
}

#[derive(Serialize)]
pub struct CategoryEntry {
    pub category: String,
    pub counts: SeverityCounts,
}

#[derive(Serialize)]
pub struct UnitEntry {
    pub category: String,
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_secs: f64,
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Scan: {} ({})", self.repo.bold(), self.path)?;

        if let Some(build) = &self.build {
            writeln!(
                w,
                "Build: {} maven, {} gradle, {} images ({} succeeded, {} failed, {} new artifacts)",
                build.maven_runs,
                build.gradle_runs,
                build.image_builds,
                build.succeeded,
                build.failed,
                build.artifacts_added
            )?;
        } else {
            writeln!(w, "Build: skipped")?;
        }
        writeln!(w)?;

        writeln!(
            w,
            "{:<14} {:>9} {:>6} {:>7} {:>5} {:>5}",
            "Category", "Critical", "High", "Medium", "Low", "Info"
        )?;
        writeln!(w, "{}", "-".repeat(52))?;
        for entry in &self.categories {
            writeln!(
                w,
                "{:<14} {:>9} {:>6} {:>7} {:>5} {:>5}",
                entry.category,
                entry.counts.critical,
                entry.counts.high,
                entry.counts.medium,
                entry.counts.low,
                entry.counts.info
            )?;
        }
        writeln!(w)?;

        let total_str = format!(
            "{} total (C:{} H:{} M:{} L:{} I:{})",
            self.totals.total(),
            self.totals.critical,
            self.totals.high,
            self.totals.medium,
            self.totals.low,
            self.totals.info
        );
        if self.totals.total() > 0 {
            writeln!(w, "Findings: {}", total_str.red().bold())?;
        } else {
            writeln!(w, "Findings: {}", total_str.green().bold())?;
        }
        writeln!(w, "Fail threshold: {}", self.fail_on)?;

        if !self.not_installed.is_empty() {
            writeln!(
                w,
                "{} {}",
                "Not installed:".yellow().bold(),
                self.not_installed.join(", ")
            )?;
        }

        if let Some(conflicts) = self.conflicts.as_ref().and_then(|v| v.as_array()) {
            if !conflicts.is_empty() {
                writeln!(w)?;
                writeln!(
                    w,
                    "{}",
                    format!("Version conflicts: {}", conflicts.len()).yellow().bold()
                )?;
                for conflict in conflicts {
                    let package = conflict["package"].as_str().unwrap_or("?");
                    let versions: Vec<String> = conflict["versions"]
                        .as_array()
                        .map(|a| {
                            a.iter()
                                .filter_map(|v| v.as_str().map(str::to_owned))
                                .collect()
                        })
                        .unwrap_or_default();
                    writeln!(w, "  {} ({})", package, versions.join(", "))?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use palisade_core::types::{Payload, ResultKey, ScanResult};

    fn sample_result(
        category: ScanCategory,
        tool: &str,
        status: ScanStatus,
        payload: Payload,
    ) -> ScanResult {
        ScanResult {
            category,
            tool: tool.to_owned(),
            target: None,
            status,
            payload,
            error_detail: None,
            duration: Duration::from_secs(1),
        }
    }

    #[test]
    fn repo_name_from_local_path() {
        assert_eq!(derive_repo_name("/home/user/projects/demo"), "demo");
        assert_eq!(derive_repo_name("./demo/"), "demo");
    }

    #[test]
    fn repo_name_from_git_url() {
        assert_eq!(
            derive_repo_name("https://github.com/acme/widget.git"),
            "widget"
        );
        assert_eq!(derive_repo_name("git@github.com:acme/widget.git"), "widget");
    }

    #[test]
    fn git_url_detection() {
        assert!(is_git_url("https://github.com/acme/widget.git"));
        assert!(is_git_url("git@github.com:acme/widget.git"));
        assert!(is_git_url("http://internal/repo.git"));
        assert!(!is_git_url("/home/user/projects/demo"));
        assert!(!is_git_url("./demo"));
    }

    #[test]
    fn report_collects_not_installed_tools() {
        let mut results = ScanResults::new();
        let result = sample_result(
            ScanCategory::Secrets,
            "gitleaks",
            ScanStatus::NotInstalled,
            Payload::Empty,
        );
        results.insert(result.key(), result);

        let summary = summarize(&results);
        let report = build_scan_report(
            "demo",
            Path::new("/repo"),
            None,
            &results,
            &summary,
            Severity::High,
        );

        assert_eq!(report.not_installed, vec!["gitleaks".to_owned()]);
        assert!(report.build.is_none());
        assert_eq!(report.categories.len(), 8);
    }

    #[test]
    fn report_extracts_conflicts_from_syft_result() {
        use serde_json::json;

        let mut results = ScanResults::new();
        let conflicts = json!([{
            "package": "libX",
            "ecosystem": "maven",
            "versions": ["1.0", "2.0"],
            "severity": "medium",
            "description": "Multiple versions of 'libX' detected",
            "remediation": "Run 'mvn dependency:tree'"
        }]);
        let result = sample_result(
            ScanCategory::Consistency,
            "syft",
            ScanStatus::IssuesFound,
            Payload::Json(conflicts),
        );
        results.insert(result.key(), result);

        let summary = summarize(&results);
        let report = build_scan_report(
            "demo",
            Path::new("/repo"),
            None,
            &results,
            &summary,
            Severity::High,
        );

        let conflicts = report.conflicts.expect("conflicts should be present");
        assert_eq!(conflicts.as_array().unwrap().len(), 1);
    }

    #[test]
    fn report_renders_text_without_panic() {
        let results = ScanResults::new();
        let summary: BTreeMap<ScanCategory, SeverityCounts> = summarize(&results);
        let report = build_scan_report(
            "demo",
            Path::new("/repo"),
            None,
            &results,
            &summary,
            Severity::High,
        );

        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Scan: demo"));
        assert!(output.contains("Build: skipped"));
        assert!(output.contains("secrets"));
        assert!(output.contains("consistency"));
    }

    #[test]
    fn report_totals_sum_all_categories() {
        let mut summary: BTreeMap<ScanCategory, SeverityCounts> = BTreeMap::new();
        for category in ScanCategory::ALL {
            summary.insert(category, SeverityCounts::default());
        }
        summary.get_mut(&ScanCategory::Secrets).unwrap().high = 2;
        summary.get_mut(&ScanCategory::Sast).unwrap().medium = 3;

        let report = build_scan_report(
            "demo",
            Path::new("/repo"),
            None,
            &ScanResults::new(),
            &summary,
            Severity::High,
        );

        assert_eq!(report.totals.high, 2);
        assert_eq!(report.totals.medium, 3);
        assert_eq!(report.totals.total(), 5);
    }
}

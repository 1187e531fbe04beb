//! Maven/Gradle/Docker 빌드 실행
//!
//! 빌드는 루트 기술자에서만 실행합니다. Maven reactor와 Gradle
//! 멀티 프로젝트 빌드가 하위 모듈을 함께 빌드하므로, 하위 기술자를
//! 개별 빌드하면 동일 산출물을 중복 생성하게 됩니다.
//!
//! 개별 빌드의 실패·시간 초과·실행 불가는 모두 결과로 기록될 뿐
//! 파이프라인을 중단시키지 않습니다.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{info, warn};

use palisade_artifact_resolver::{ArtifactInventory, ArtifactResolver, compute_build_roots};
use palisade_core::config::BuildConfig;
use palisade_core::error::BuildError;
use palisade_core::event::{MODULE_BUILD_EXECUTOR, ProgressEvent, ProgressKind};
use palisade_core::types::{BuildDescriptor, BuildKind, ScanStatus};

use crate::image::image_name_for;
use crate::report::{BuildOutcome, BuildReport, BuildRun, ImageBuild};

const GRADLE_ARGS: &[&str] = &["clean", "build", "-x", "test"];

/// 빌드 실행기
///
/// ```no_run
/// # async fn example() -> Result<(), palisade_core::error::PalisadeError> {
/// use palisade_build_executor::BuildExecutor;
/// use palisade_core::config::BuildConfig;
/// use palisade_artifact_resolver::ArtifactResolver;
///
/// let mut inventory = ArtifactResolver::detect("/repo")?;
/// let executor = BuildExecutor::new(BuildConfig::default());
/// let report = executor
///     .build(std::path::Path::new("/repo"), "repo", &mut inventory)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct BuildExecutor {
    config: BuildConfig,
    progress: Option<mpsc::Sender<ProgressEvent>>,
    trace_id: String,
}

impl BuildExecutor {
    /// 설정으로 빌드 실행기를 생성합니다.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            progress: None,
            trace_id: String::new(),
        }
    }

    /// 진행 이벤트 채널을 연결합니다.
    pub fn with_progress(mut self, sender: mpsc::Sender<ProgressEvent>, trace_id: impl Into<String>) -> Self {
        self.progress = Some(sender);
        self.trace_id = trace_id.into();
        self
    }

    /// 루트 빌드와 이미지 빌드를 모두 실행하고 산출물을 재탐지합니다.
    ///
    /// 반환되는 [`BuildReport`]에는 빌드별 결과와 재탐지로 추가된
    /// 산출물 수가 담깁니다. 재탐지는 빌드 성공 여부와 무관하게
    /// 항상 수행됩니다.
    pub async fn build(
        &self,
        repo_root: &Path,
        repo_name: &str,
        inventory: &mut ArtifactInventory,
    ) -> Result<BuildReport, BuildError> {
        let mut report = BuildReport::default();

        let roots = compute_build_roots(&inventory.build_descriptors);
        info!(
            roots = roots.len(),
            descriptors = inventory.build_descriptors.len(),
            "starting root builds"
        );

        for &idx in &roots {
            let descriptor = inventory.build_descriptors[idx].clone();
            let run = self.run_descriptor(&descriptor).await?;
            match descriptor.kind {
                BuildKind::Maven => report.maven.push(run),
                BuildKind::Gradle => report.gradle.push(run),
            }
        }

        // Dockerfile은 루트 필터링과 무관하게 전부 빌드합니다
        let dockerfiles: Vec<_> = inventory.dockerfiles.iter().cloned().collect();
        for dockerfile in dockerfiles {
            let image_build = self.build_image(&dockerfile, repo_root, repo_name).await;
            if image_build.outcome.is_success() {
                inventory.record_image(image_build.image.clone());
                counter!(palisade_core::metrics::BUILD_IMAGES_TOTAL).increment(1);
            }
            report.container.push(image_build);
        }

        // 빌드 성공 여부와 무관하게 산출물 재탐지
        match ArtifactResolver::rescan_compiled(repo_root, inventory) {
            Ok(added) => {
                report.artifacts_added = added;
                self.emit(ProgressKind::InventoryUpdated { added });
            }
            Err(e) => warn!(error = %e, "compiled artifact rescan failed"),
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            artifacts_added = report.artifacts_added,
            "build step finished"
        );
        Ok(report)
    }

    async fn run_descriptor(&self, descriptor: &BuildDescriptor) -> Result<BuildRun, BuildError> {
        let (program, args) = self.command_for(descriptor)?;
        let command_display = std::iter::once(program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        self.emit(ProgressKind::BuildStarted {
            root: descriptor.dir.display().to_string(),
        });

        let kind_label = descriptor.kind.to_string();
        counter!(
            palisade_core::metrics::BUILD_RUNS_TOTAL,
            palisade_core::metrics::LABEL_BUILD_KIND => kind_label.clone()
        )
        .increment(1);

        let (outcome, duration, log) = run_command(
            &program,
            &args,
            &descriptor.dir,
            Duration::from_secs(self.config.timeout_secs),
        )
        .await;

        histogram!(palisade_core::metrics::BUILD_DURATION_SECONDS).record(duration.as_secs_f64());
        match &outcome {
            BuildOutcome::Timeout => {
                counter!(palisade_core::metrics::BUILD_TIMEOUTS_TOTAL).increment(1);
                warn!(dir = %descriptor.dir.display(), "build exceeded timeout and was killed");
            }
            BuildOutcome::Failed { exit } => {
                counter!(
                    palisade_core::metrics::BUILD_FAILURES_TOTAL,
                    palisade_core::metrics::LABEL_BUILD_KIND => kind_label
                )
                .increment(1);
                warn!(dir = %descriptor.dir.display(), exit, "build failed");
            }
            BuildOutcome::Error { reason } => {
                counter!(
                    palisade_core::metrics::BUILD_FAILURES_TOTAL,
                    palisade_core::metrics::LABEL_BUILD_KIND => kind_label
                )
                .increment(1);
                warn!(dir = %descriptor.dir.display(), reason = reason.as_str(), "build could not start");
            }
            BuildOutcome::Success => {
                info!(dir = %descriptor.dir.display(), elapsed_ms = duration.as_millis() as u64, "build succeeded");
            }
        }

        self.emit(ProgressKind::BuildFinished {
            root: descriptor.dir.display().to_string(),
            status: match outcome {
                BuildOutcome::Success => ScanStatus::Completed,
                BuildOutcome::Failed { .. } => ScanStatus::Failed,
                BuildOutcome::Timeout => ScanStatus::Timeout,
                BuildOutcome::Error { .. } => ScanStatus::Error,
            },
        });

        Ok(BuildRun {
            kind: descriptor.kind,
            dir: descriptor.dir.clone(),
            command: command_display,
            outcome,
            duration,
            log,
        })
    }

    fn command_for(&self, descriptor: &BuildDescriptor) -> Result<(String, Vec<String>), BuildError> {
        match descriptor.kind {
            BuildKind::Maven => {
                let mut parts = self.config.maven_command.split_whitespace();
                let Some(program) = parts.next() else {
                    return Err(BuildError::InvalidCommand {
                        reason: "maven command is empty".to_owned(),
                    });
                };
                Ok((program.to_owned(), parts.map(str::to_owned).collect()))
            }
            BuildKind::Gradle => {
                // 래퍼가 있으면 우선 사용합니다 (버전 고정)
                let program = if descriptor.dir.join("gradlew").is_file() {
                    "./gradlew".to_owned()
                } else {
                    "gradle".to_owned()
                };
                Ok((program, GRADLE_ARGS.iter().map(|s| (*s).to_owned()).collect()))
            }
        }
    }

    async fn build_image(&self, dockerfile: &Path, repo_root: &Path, repo_name: &str) -> ImageBuild {
        let image = image_name_for(dockerfile, repo_root, repo_name);
        let context = dockerfile.parent().unwrap_or(repo_root);

        self.emit(ProgressKind::BuildStarted {
            root: dockerfile.display().to_string(),
        });

        let args = vec![
            "build".to_owned(),
            "-t".to_owned(),
            image.clone(),
            "-f".to_owned(),
            dockerfile.display().to_string(),
            context.display().to_string(),
        ];
        let (outcome, duration, log) = run_command(
            "docker",
            &args,
            repo_root,
            Duration::from_secs(self.config.timeout_secs),
        )
        .await;

        if !outcome.is_success() {
            warn!(dockerfile = %dockerfile.display(), image = image.as_str(), "image build did not succeed");
        }

        self.emit(ProgressKind::BuildFinished {
            root: dockerfile.display().to_string(),
            status: match outcome {
                BuildOutcome::Success => ScanStatus::Completed,
                BuildOutcome::Failed { .. } => ScanStatus::Failed,
                BuildOutcome::Timeout => ScanStatus::Timeout,
                BuildOutcome::Error { .. } => ScanStatus::Error,
            },
        });

        ImageBuild {
            dockerfile: dockerfile.to_path_buf(),
            image,
            outcome,
            duration,
            log,
        }
    }

    fn emit(&self, kind: ProgressKind) {
        if let Some(sender) = &self.progress {
            let event = ProgressEvent::new(MODULE_BUILD_EXECUTOR, self.trace_id.clone(), kind);
            if let Err(e) = sender.try_send(event) {
                warn!(error = %e, "progress channel full, dropping build event");
            }
        }
    }
}

/// 하나의 외부 명령을 제한 시간 안에서 실행합니다.
///
/// 제한 시간이 지나면 프로세스는 kill되고 [`BuildOutcome::Timeout`]이
/// 반환됩니다. 실행 파일 부재 등 spawn 실패는 [`BuildOutcome::Error`]로
/// 분류됩니다.
async fn run_command(
    program: &str,
    args: &[String],
    dir: &Path,
    limit: Duration,
) -> (BuildOutcome, Duration, String) {
    let started = Instant::now();

    let spawned = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match spawned {
        Ok(child) => child,
        Err(e) => {
            return (
                BuildOutcome::Error {
                    reason: format!("failed to spawn {program}: {e}"),
                },
                started.elapsed(),
                String::new(),
            );
        }
    };

    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
            log.push_str(&String::from_utf8_lossy(&output.stderr));
            let outcome = if output.status.success() {
                BuildOutcome::Success
            } else {
                BuildOutcome::Failed {
                    exit: output.status.code().unwrap_or(-1),
                }
            };
            (outcome, started.elapsed(), log)
        }
        Ok(Err(e)) => (
            BuildOutcome::Error {
                reason: format!("failed to wait for {program}: {e}"),
            },
            started.elapsed(),
            String::new(),
        ),
        // future가 드롭되며 kill_on_drop으로 프로세스가 정리됩니다
        Err(_) => (BuildOutcome::Timeout, started.elapsed(), String::new()),
    }
}

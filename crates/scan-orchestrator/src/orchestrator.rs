//! 스테이지 편성과 병렬 실행
//!
//! 소스 스테이지(secrets, sast, dependencies, iac)를 먼저, 아티팩트
//! 스테이지(containers, helm, linting, consistency)를 그 다음에
//! 실행합니다. 아티팩트 스테이지는 빌드와 재탐지가 끝난 인벤토리를
//! 읽으므로 순서가 바뀌면 안 됩니다.
//!
//! 스테이지 안에서는 유닛을 설정된 병렬도까지 동시에 실행하며, 유닛
//! 간 공유 상태는 (category, tool[, target]) 키의 append-only 결과
//! 맵뿐입니다. 키가 유닛마다 고유하므로 잠금이 필요 없습니다.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{info, warn};

use palisade_artifact_resolver::ArtifactInventory;
use palisade_core::config::{PerformanceConfig, ScannersConfig};
use palisade_core::error::ScanError;
use palisade_core::event::{MODULE_SCAN_ORCHESTRATOR, ProgressEvent, ProgressKind, Stage};
use palisade_core::types::{Payload, ResultKey, ScanResult, ScanStatus};

use crate::conflict::{detect_conflicts, parse_syft_packages};
use crate::tool::Tool;
use crate::unit::ScanUnit;

/// (category, tool[, target]) 키의 append-only 결과 맵
pub type ScanResults = BTreeMap<ResultKey, ScanResult>;

/// 스캔 오케스트레이터
///
/// ```no_run
/// # async fn example() -> Result<(), palisade_core::error::PalisadeError> {
/// use palisade_core::config::PalisadeConfig;
/// use palisade_artifact_resolver::ArtifactResolver;
/// use palisade_scan_orchestrator::{ScanOrchestrator, summarize};
///
/// let config = PalisadeConfig::default();
/// let inventory = ArtifactResolver::detect("/repo")?;
/// let orchestrator = ScanOrchestrator::new(config.scanners, config.performance);
/// let results = orchestrator
///     .run(std::path::Path::new("/repo"), &inventory)
///     .await?;
/// let summary = summarize(&results);
/// # Ok(())
/// # }
/// ```
pub struct ScanOrchestrator {
    scanners: ScannersConfig,
    performance: PerformanceConfig,
    progress: Option<mpsc::Sender<ProgressEvent>>,
    trace_id: String,
}

impl ScanOrchestrator {
    /// 스캐너·성능 설정으로 오케스트레이터를 생성합니다.
    pub fn new(scanners: ScannersConfig, performance: PerformanceConfig) -> Self {
        Self {
            scanners,
            performance,
            progress: None,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// 진행 이벤트 채널을 연결합니다.
    pub fn with_progress(
        mut self,
        sender: mpsc::Sender<ProgressEvent>,
        trace_id: impl Into<String>,
    ) -> Self {
        self.progress = Some(sender);
        self.trace_id = trace_id.into();
        self
    }

    /// 이 실행의 추적 ID
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// 두 스테이지를 순서대로 실행하고 전체 결과 맵을 반환합니다.
    ///
    /// 유닛의 모든 실패 모드는 결과로 기록됩니다. 여기서 반환되는
    /// 에러는 태스크 join 실패뿐입니다.
    pub async fn run(
        &self,
        repo_root: &Path,
        inventory: &ArtifactInventory,
    ) -> Result<ScanResults, ScanError> {
        let mut results = ScanResults::new();

        self.emit(ProgressKind::RunStarted {
            target: repo_root.display().to_string(),
        });

        let source_units = self.source_units(repo_root, inventory);
        self.run_stage(Stage::Source, source_units, &mut results)
            .await?;

        // 아티팩트 스테이지는 빌드 해소 + 재탐지가 끝난 인벤토리 기준
        let artifact_units = self.artifact_units(repo_root, inventory);
        self.run_stage(Stage::Artifact, artifact_units, &mut results)
            .await?;

        // 일관성 유닛의 syft SBOM을 충돌 레코드로 변환합니다
        self.resolve_conflicts(&mut results);

        info!(units = results.len(), "scan orchestration finished");
        Ok(results)
    }

    fn source_units(&self, repo_root: &Path, inventory: &ArtifactInventory) -> Vec<ScanUnit> {
        let repo = repo_root.display().to_string();
        let mut units = Vec::new();

        let secrets = &self.scanners.secrets;
        if secrets.enabled && secrets.uses_tool("gitleaks") {
            units.push(
                ScanUnit::repo_wide(Tool::Gitleaks, &repo).with_timeout(Duration::from_secs(
                    self.performance.secrets_timeout_secs,
                )),
            );
        }

        let sast = &self.scanners.sast;
        if sast.enabled {
            if sast.uses_tool("semgrep") {
                units.push(ScanUnit::repo_wide(Tool::Semgrep, &repo));
            }
            if sast.uses_tool("spotbugs") {
                for jar in &inventory.jar_files {
                    units.push(ScanUnit::per_target(Tool::Spotbugs, jar.display().to_string()));
                }
            }
        }

        let dependencies = &self.scanners.dependencies;
        if dependencies.enabled && dependencies.uses_tool("trivy") {
            units.push(ScanUnit::repo_wide(Tool::TrivyFs, &repo));
        }

        let iac = &self.scanners.iac;
        if iac.enabled {
            if iac.uses_tool("trivy") {
                units.push(ScanUnit::repo_wide(Tool::TrivyConfig, &repo));
            }
            if iac.uses_tool("checkov") {
                units.push(ScanUnit::repo_wide(Tool::Checkov, &repo));
            }
        }

        units
    }

    fn artifact_units(&self, repo_root: &Path, inventory: &ArtifactInventory) -> Vec<ScanUnit> {
        let repo = repo_root.display().to_string();
        let mut units = Vec::new();

        let containers = &self.scanners.containers;
        if containers.enabled {
            for image in &inventory.docker_images {
                if containers.uses_tool("trivy") {
                    units.push(ScanUnit::per_target(Tool::TrivyImage, image.clone()));
                }
                if containers.uses_tool("grype") {
                    units.push(ScanUnit::per_target(Tool::Grype, image.clone()));
                }
            }
        }

        let helm = &self.scanners.helm;
        if helm.enabled {
            for chart in &inventory.helm_charts {
                let chart = chart.display().to_string();
                if helm.uses_tool("kubescape") {
                    units.push(ScanUnit::per_target(Tool::Kubescape, chart.clone()));
                }
                if helm.uses_tool("kubeaudit") {
                    units.push(ScanUnit::per_target(Tool::Kubeaudit, chart.clone()));
                }
                if helm.uses_tool("helm-lint") {
                    units.push(ScanUnit::per_target(Tool::HelmLint, chart.clone()));
                }
                if helm.uses_tool("trivy") {
                    // 차트 설정 검사는 Helm 카테고리로 집계됩니다
                    units.push(
                        ScanUnit::per_target(Tool::TrivyConfig, chart.clone())
                            .in_category(palisade_core::types::ScanCategory::Helm),
                    );
                }
            }
        }

        let linting = &self.scanners.linting;
        if linting.enabled && linting.uses_tool("hadolint") {
            for dockerfile in &inventory.dockerfiles {
                units.push(ScanUnit::per_target(
                    Tool::Hadolint,
                    dockerfile.display().to_string(),
                ));
            }
        }

        let consistency = &self.scanners.consistency;
        if consistency.enabled && consistency.uses_tool("syft") {
            units.push(ScanUnit::repo_wide(Tool::Syft, &repo));
        }

        units
    }

    async fn run_stage(
        &self,
        stage: Stage,
        units: Vec<ScanUnit>,
        results: &mut ScanResults,
    ) -> Result<(), ScanError> {
        self.emit(ProgressKind::StageStarted {
            stage,
            unit_count: units.len(),
        });
        info!(%stage, units = units.len(), "starting scan stage");

        let semaphore = Arc::new(Semaphore::new(self.performance.max_parallel_units.max(1)));
        let mut tasks: JoinSet<(ResultKey, ScanResult)> = JoinSet::new();

        for unit in units {
            let semaphore = Arc::clone(&semaphore);
            let progress = self.progress.clone();
            let trace_id = self.trace_id.clone();
            tasks.spawn(async move {
                // 세마포어가 닫히는 경우는 없으므로 실패 시 그냥 실행합니다
                let _permit = semaphore.acquire_owned().await;
                emit_with(&progress, &trace_id, ProgressKind::UnitStarted {
                    category: unit.category,
                    tool: unit.tool.name().to_owned(),
                });

                let key = unit.key();
                let result = unit.run().await;

                record_unit_metrics(&result);
                emit_with(&progress, &trace_id, ProgressKind::UnitFinished {
                    category: result.category,
                    tool: result.tool.clone(),
                    status: result.status,
                });
                (key, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (key, result) = joined.map_err(|e| ScanError::TaskJoin(e.to_string()))?;
            // 유닛마다 키가 고유하므로 삽입은 항상 새 항목입니다
            results.insert(key, result);
        }

        self.emit(ProgressKind::StageFinished { stage });
        Ok(())
    }

    /// syft 결과를 충돌 레코드 페이로드로 바꿉니다.
    ///
    /// SBOM 파싱과 충돌 탐지는 프로세스 실행과 분리된 순수 함수이며,
    /// syft가 실패한 경우에는 결과를 건드리지 않습니다.
    fn resolve_conflicts(&self, results: &mut ScanResults) {
        let key = ResultKey {
            category: palisade_core::types::ScanCategory::Consistency,
            tool: Tool::Syft.name().to_owned(),
            target: None,
        };
        let Some(result) = results.get_mut(&key) else {
            return;
        };
        if result.status != ScanStatus::Completed {
            return;
        }
        let Some(sbom) = result.payload.as_json() else {
            gauge!(palisade_core::metrics::SCAN_VERSION_CONFLICTS).set(0.0);
            return;
        };

        let packages = parse_syft_packages(sbom);
        let conflicts = detect_conflicts(&packages);
        gauge!(palisade_core::metrics::SCAN_VERSION_CONFLICTS).set(conflicts.len() as f64);
        info!(
            packages = packages.len(),
            conflicts = conflicts.len(),
            "diamond dependency analysis finished"
        );

        if !conflicts.is_empty() {
            result.status = ScanStatus::IssuesFound;
        }
        match serde_json::to_value(&conflicts) {
            Ok(value) => result.payload = Payload::Json(value),
            Err(e) => {
                warn!(error = %e, "failed to serialize conflict records");
                result.payload = Payload::Empty;
            }
        }
    }

    fn emit(&self, kind: ProgressKind) {
        emit_with(&self.progress, &self.trace_id, kind);
    }
}

fn emit_with(progress: &Option<mpsc::Sender<ProgressEvent>>, trace_id: &str, kind: ProgressKind) {
    if let Some(sender) = progress {
        let event = ProgressEvent::new(MODULE_SCAN_ORCHESTRATOR, trace_id, kind);
        if let Err(e) = sender.try_send(event) {
            warn!(error = %e, "progress channel full, dropping scan event");
        }
    }
}

fn record_unit_metrics(result: &ScanResult) {
    let category = result.category.to_string();
    let tool = result.tool.clone();

    counter!(
        palisade_core::metrics::SCAN_UNITS_COMPLETED_TOTAL,
        palisade_core::metrics::LABEL_CATEGORY => category.clone(),
        palisade_core::metrics::LABEL_TOOL => tool.clone(),
        palisade_core::metrics::LABEL_STATUS => result.status.to_string()
    )
    .increment(1);
    histogram!(
        palisade_core::metrics::SCAN_UNIT_DURATION_SECONDS,
        palisade_core::metrics::LABEL_CATEGORY => category.clone(),
        palisade_core::metrics::LABEL_TOOL => tool.clone()
    )
    .record(result.duration.as_secs_f64());

    match result.status {
        ScanStatus::Timeout => {
            counter!(
                palisade_core::metrics::SCAN_UNIT_TIMEOUTS_TOTAL,
                palisade_core::metrics::LABEL_CATEGORY => category,
                palisade_core::metrics::LABEL_TOOL => tool
            )
            .increment(1);
        }
        ScanStatus::NotInstalled => {
            counter!(
                palisade_core::metrics::SCAN_UNITS_NOT_INSTALLED_TOTAL,
                palisade_core::metrics::LABEL_TOOL => tool
            )
            .increment(1);
        }
        _ => {}
    }
}

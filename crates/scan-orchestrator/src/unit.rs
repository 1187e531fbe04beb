//! 스캔 유닛 — 외부 도구 1회 호출의 원자 단위
//!
//! 하나의 유닛은 정확히 하나의 외부 프로세스를 제한 시간 안에서
//! 실행하고, 종료 코드를 테이블로 분류하고, 출력을 파싱합니다.
//! 도구 출력의 불안정성이 오케스트레이터를 중단시켜서는 안 되므로,
//! 파싱 실패는 빈 페이로드의 완료 결과로 강등됩니다.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use palisade_core::types::{Payload, ResultKey, ScanCategory, ScanResult, ScanStatus};

use crate::spotbugs;
use crate::tool::{ExitMeaning, OutputKind, Tool};

/// 스캔 유닛 — (카테고리, 도구, 대상) 조합 하나의 상태 없는 기술자
#[derive(Debug, Clone)]
pub struct ScanUnit {
    /// 스캔 카테고리
    pub category: ScanCategory,
    /// 실행할 도구
    pub tool: Tool,
    /// 대상 (저장소 경로, jar 경로, 이미지 이름, 차트 디렉토리)
    pub target: String,
    /// 결과 키에 들어가는 대상 식별자 (도구가 대상별로 여러 번 돌 때만)
    pub target_key: Option<String>,
    /// 제한 시간
    pub timeout: Duration,
}

impl ScanUnit {
    /// 저장소 전체를 대상으로 하는 유닛을 만듭니다.
    pub fn repo_wide(tool: Tool, repo_path: impl Into<String>) -> Self {
        Self {
            category: tool.category(),
            tool,
            target: repo_path.into(),
            target_key: None,
            timeout: tool.spec().timeout,
        }
    }

    /// 대상별로 실행되는 유닛을 만듭니다 (jar, Dockerfile, 차트, 이미지).
    pub fn per_target(tool: Tool, target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            category: tool.category(),
            tool,
            target_key: Some(target.clone()),
            target,
            timeout: tool.spec().timeout,
        }
    }

    /// 제한 시간을 덮어씁니다 (설정의 시크릿 스캔 제한 시간 등).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 집계 카테고리를 덮어씁니다. 같은 도구가 다른 카테고리의
    /// 대상을 검사할 때 사용합니다 (차트의 trivy config 등).
    pub fn in_category(mut self, category: ScanCategory) -> Self {
        self.category = category;
        self
    }

    /// 이 유닛의 결과 키
    pub fn key(&self) -> ResultKey {
        ResultKey {
            category: self.category,
            tool: self.tool.name().to_owned(),
            target: self.target_key.clone(),
        }
    }

    /// 유닛을 실행하고 항상 결과를 반환합니다.
    ///
    /// 어떤 실패 모드도 에러로 전파되지 않습니다. 도구 부재는
    /// `NotInstalled`, 제한 시간 초과는 `Timeout`, 0이 아닌 종료
    /// 코드는 테이블에 따라 `IssuesFound` 또는 `Failed`입니다.
    pub async fn run(&self) -> ScanResult {
        let started = Instant::now();
        let spec = self.tool.spec();

        // 보고서 파일이 필요한 도구는 임시 파일로 받습니다
        let report_file = if self.tool.needs_report_file() {
            match tempfile::NamedTempFile::new() {
                Ok(f) => Some(f),
                Err(e) => {
                    return self.finish(
                        ScanStatus::Error,
                        Payload::Empty,
                        Some(format!("failed to create report file: {e}")),
                        started.elapsed(),
                    );
                }
            }
        } else {
            None
        };
        let report_path = report_file.as_ref().map(|f| f.path());

        // stdin으로 매니페스트를 받는 도구는 차트를 먼저 렌더링합니다
        let input = if self.tool.pipes_rendered_chart() {
            match self.render_chart(started).await {
                Ok(rendered) => Some(rendered),
                Err(result) => return result,
            }
        } else {
            None
        };

        let args = self.tool.args(&self.target, report_path);
        debug!(tool = %self.tool, target = self.target.as_str(), "starting scan unit");

        let output = match execute_process(spec.program, &args, self.timeout, input).await {
            Execution::NotInstalled(detail) => {
                return self.finish(
                    ScanStatus::NotInstalled,
                    Payload::Empty,
                    Some(detail),
                    started.elapsed(),
                );
            }
            Execution::Error(detail) => {
                return self.finish(
                    ScanStatus::Error,
                    Payload::Empty,
                    Some(detail),
                    started.elapsed(),
                );
            }
            Execution::Timeout => {
                warn!(tool = %self.tool, timeout_secs = self.timeout.as_secs(), "scan unit timed out");
                return self.finish(
                    ScanStatus::Timeout,
                    Payload::Empty,
                    Some(format!(
                        "{} exceeded {}s timeout",
                        spec.program,
                        self.timeout.as_secs()
                    )),
                    started.elapsed(),
                );
            }
            Execution::Exited(output) => output,
        };

        let exit = output.status.code().unwrap_or(-1);
        let status = classify_exit(spec.exit, exit);

        if status == ScanStatus::Failed {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return self.finish(status, Payload::Empty, Some(stderr), started.elapsed());
        }

        let (status, payload) = parse_output(spec.output, status, &output.stdout, report_path);
        self.finish(status, payload, None, started.elapsed())
    }

    /// `helm template`으로 차트를 렌더링하여 매니페스트 바이트를
    /// 돌려줍니다. helm 부재는 `NotInstalled`, 렌더링 실패는 `Failed`로
    /// 강등되며 결과로 즉시 반환됩니다.
    async fn render_chart(&self, started: Instant) -> Result<Vec<u8>, ScanResult> {
        let args = vec!["template".to_owned(), self.target.clone()];
        match execute_process("helm", &args, self.timeout, None).await {
            Execution::Exited(output) if output.status.success() => Ok(output.stdout),
            Execution::Exited(output) => Err(self.finish(
                ScanStatus::Failed,
                Payload::Empty,
                Some(format!(
                    "failed to template chart: {}",
                    String::from_utf8_lossy(&output.stderr)
                )),
                started.elapsed(),
            )),
            Execution::NotInstalled(_) => Err(self.finish(
                ScanStatus::NotInstalled,
                Payload::Empty,
                Some("helm not installed".to_owned()),
                started.elapsed(),
            )),
            Execution::Timeout => Err(self.finish(
                ScanStatus::Timeout,
                Payload::Empty,
                Some(format!(
                    "helm template exceeded {}s timeout",
                    self.timeout.as_secs()
                )),
                started.elapsed(),
            )),
            Execution::Error(detail) => Err(self.finish(
                ScanStatus::Error,
                Payload::Empty,
                Some(detail),
                started.elapsed(),
            )),
        }
    }

    fn finish(
        &self,
        status: ScanStatus,
        payload: Payload,
        error_detail: Option<String>,
        duration: Duration,
    ) -> ScanResult {
        ScanResult {
            category: self.category,
            tool: self.tool.name().to_owned(),
            target: self.target_key.clone(),
            status,
            payload,
            error_detail,
            duration,
        }
    }
}

/// 종료 코드를 테이블의 의미에 따라 분류합니다.
fn classify_exit(meaning: ExitMeaning, code: i32) -> ScanStatus {
    match (meaning, code) {
        (_, 0) => ScanStatus::Completed,
        (ExitMeaning::OneMeansFindings, 1) => ScanStatus::IssuesFound,
        (ExitMeaning::TwoMeansFindings, 2) => ScanStatus::IssuesFound,
        _ => ScanStatus::Failed,
    }
}

/// 프로세스 1회 실행 결과
enum Execution {
    NotInstalled(String),
    Error(String),
    Timeout,
    Exited(std::process::Output),
}

/// 외부 도구 프로세스를 제한 시간 안에서 실행합니다.
///
/// `input`이 있으면 stdin으로 파이프합니다 (kubeaudit의 렌더링된
/// 매니페스트). 제한 시간이 지나면 future가 드롭되고 `kill_on_drop`이
/// 프로세스를 정리합니다. 실행 파일 부재(`NotFound`)는 `NotInstalled`로
/// 구분됩니다.
async fn execute_process(
    program: &str,
    args: &[String],
    limit: Duration,
    input: Option<Vec<u8>>,
) -> Execution {
    let stdin = if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    };
    let spawned = Command::new(program)
        .args(args)
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Execution::NotInstalled(format!("{program} not installed"));
        }
        Err(e) => {
            return Execution::Error(format!("failed to spawn {program}: {e}"));
        }
    };

    let wait = async {
        if let Some(bytes) = input {
            if let Some(mut sink) = child.stdin.take() {
                // 파이프 쓰기 실패(도구 조기 종료)는 종료 상태로 드러납니다
                let _ = sink.write_all(&bytes).await;
            }
        }
        child.wait_with_output().await
    };

    match timeout(limit, wait).await {
        Ok(Ok(output)) => Execution::Exited(output),
        Ok(Err(e)) => Execution::Error(format!("failed to wait for {program}: {e}")),
        Err(_) => Execution::Timeout,
    }
}

/// 출력 파싱. 실패는 빈 페이로드의 `Completed`로 강등됩니다.
fn parse_output(
    kind: OutputKind,
    status: ScanStatus,
    stdout: &[u8],
    report_path: Option<&std::path::Path>,
) -> (ScanStatus, Payload) {
    match kind {
        OutputKind::JsonStdout => match serde_json::from_slice(stdout) {
            Ok(value) => (status, Payload::Json(value)),
            Err(e) => {
                debug!(error = %e, "tool stdout was not valid JSON, downgrading");
                (ScanStatus::Completed, Payload::Empty)
            }
        },
        OutputKind::TextStdout => (
            status,
            Payload::Text(String::from_utf8_lossy(stdout).into_owned()),
        ),
        OutputKind::JsonReportFile => {
            let Some(path) = report_path else {
                return (ScanStatus::Completed, Payload::Empty);
            };
            match std::fs::read(path) {
                Ok(content) if !content.is_empty() => match serde_json::from_slice(&content) {
                    Ok(value) => (status, Payload::Json(value)),
                    Err(_) => (ScanStatus::Completed, Payload::Empty),
                },
                // 보고서 파일이 없거나 비어 있으면 발견 없음
                _ => (ScanStatus::Completed, Payload::Empty),
            }
        }
        OutputKind::XmlReportFile => {
            let Some(path) = report_path else {
                return (ScanStatus::Completed, Payload::Empty);
            };
            match std::fs::read_to_string(path) {
                Ok(xml) => {
                    let normalized = spotbugs::normalize_report(&xml);
                    if normalized.as_array().is_some_and(|a| !a.is_empty()) {
                        (ScanStatus::IssuesFound, Payload::Json(normalized))
                    } else {
                        (ScanStatus::Completed, Payload::Empty)
                    }
                }
                Err(_) => (ScanStatus::Completed, Payload::Empty),
            }
        }
    }
}

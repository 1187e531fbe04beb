//! 진행 이벤트 — 파이프라인 진행 상황의 기본 단위
//!
//! 오케스트레이터는 실행 중 발생하는 주요 전환점마다 [`ProgressEvent`]를
//! 발행하고, CLI 같은 소비자는 채널로 수신하여 출력합니다.
//! [`EventMetadata`]는 모든 이벤트에 공통으로 포함되는 추적 정보입니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::{ScanCategory, ScanStatus};

// --- 모듈명 상수 ---

/// 아티팩트 리졸버 모듈명
pub const MODULE_ARTIFACT_RESOLVER: &str = "artifact-resolver";
/// 빌드 실행기 모듈명
pub const MODULE_BUILD_EXECUTOR: &str = "build-executor";
/// 스캔 오케스트레이터 모듈명
pub const MODULE_SCAN_ORCHESTRATOR: &str = "scan-orchestrator";

/// 이벤트 메타데이터 — 모든 이벤트에 공통으로 포함되는 추적 정보
///
/// 각 이벤트의 발생 시각, 생성 모듈, 추적 ID를 담고 있어
/// 한 번의 스캔 실행에 속한 이벤트를 연결할 수 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명 (예: "scan-orchestrator")
    pub source_module: String,
    /// 추적 ID — 같은 실행의 이벤트를 연결합니다
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    ///
    /// 한 실행 내에서 동일한 추적 ID를 유지할 때 사용합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// 새로운 UUID v4 trace_id를 생성하여 메타데이터를 만듭니다.
    ///
    /// 새로운 스캔 실행의 시작점에서 사용합니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} trace={}",
            unix_timestamp_str(self.timestamp),
            self.source_module,
            self.trace_id,
        )
    }
}

/// 파이프라인 실행 스테이지
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// 소스 스테이지 — 빌드 산출물 없이 가능한 스캔
    Source,
    /// 아티팩트 스테이지 — 빌드 산출물이 필요한 스캔
    Artifact,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Source => write!(f, "source"),
            Stage::Artifact => write!(f, "artifact"),
        }
    }
}

/// 진행 이벤트의 종류
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressKind {
    /// 스캔 실행 시작
    RunStarted {
        /// 스캔 대상 경로
        target: String,
    },
    /// 스테이지 시작
    StageStarted {
        /// 시작된 스테이지
        stage: Stage,
        /// 이 스테이지에서 실행될 유닛 수
        unit_count: usize,
    },
    /// 스테이지 종료
    StageFinished {
        /// 종료된 스테이지
        stage: Stage,
    },
    /// 빌드 시작
    BuildStarted {
        /// 빌드 루트 디렉토리
        root: String,
    },
    /// 빌드 종료
    BuildFinished {
        /// 빌드 루트 디렉토리
        root: String,
        /// 빌드 결과 상태
        status: ScanStatus,
    },
    /// 스캔 유닛 시작
    UnitStarted {
        /// 유닛의 카테고리
        category: ScanCategory,
        /// 실행되는 도구
        tool: String,
    },
    /// 스캔 유닛 종료
    UnitFinished {
        /// 유닛의 카테고리
        category: ScanCategory,
        /// 실행된 도구
        tool: String,
        /// 유닛 종료 상태
        status: ScanStatus,
    },
    /// 아티팩트 인벤토리 갱신 (빌드 후 재탐지)
    InventoryUpdated {
        /// 새로 탐지된 아티팩트 수
        added: usize,
    },
}

/// 파이프라인 진행 이벤트
///
/// 오케스트레이터가 mpsc 채널로 발행하며, 채널이 가득 차면
/// 이벤트를 버리고 경고만 남깁니다. 진행 이벤트 유실이
/// 스캔 자체를 중단시켜서는 안 됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 이벤트 내용
    pub kind: ProgressKind,
}

impl ProgressEvent {
    /// 기존 trace에 연결된 진행 이벤트를 생성합니다.
    pub fn new(source_module: &str, trace_id: impl Into<String>, kind: ProgressKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(source_module, trace_id),
            kind,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ProgressKind::RunStarted { target } => write!(f, "run started: {target}"),
            ProgressKind::StageStarted { stage, unit_count } => {
                write!(f, "stage {stage} started ({unit_count} units)")
            }
            ProgressKind::StageFinished { stage } => write!(f, "stage {stage} finished"),
            ProgressKind::BuildStarted { root } => write!(f, "build started: {root}"),
            ProgressKind::BuildFinished { root, status } => {
                write!(f, "build finished: {root} ({status})")
            }
            ProgressKind::UnitStarted { category, tool } => {
                write!(f, "unit started: {category}/{tool}")
            }
            ProgressKind::UnitFinished {
                category,
                tool,
                status,
            } => write!(f, "unit finished: {category}/{tool} ({status})"),
            ProgressKind::InventoryUpdated { added } => {
                write!(f, "inventory updated: {added} new artifacts")
            }
        }
    }
}

/// SystemTime을 사람이 읽을 수 있는 형태로 변환합니다.
fn unix_timestamp_str(time: SystemTime) -> String {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => {
            let secs = duration.as_secs();
            format!("{secs}")
        }
        Err(_) => "unknown".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_metadata_new_preserves_trace_id() {
        let meta = EventMetadata::new("test-module", "trace-abc-123");
        assert_eq!(meta.source_module, "test-module");
        assert_eq!(meta.trace_id, "trace-abc-123");
        assert!(meta.timestamp <= SystemTime::now());
    }

    #[test]
    fn event_metadata_with_new_trace_generates_uuid() {
        let meta = EventMetadata::with_new_trace("test-module");
        assert_eq!(meta.source_module, "test-module");
        assert!(!meta.trace_id.is_empty());
        // UUID v4 형식 확인: 8-4-4-4-12
        assert_eq!(meta.trace_id.len(), 36);
        assert_eq!(meta.trace_id.chars().filter(|c| *c == '-').count(), 4);
    }

    #[test]
    fn event_metadata_display() {
        let meta = EventMetadata::new("scan-orchestrator", "trace-xyz");
        let display = meta.to_string();
        assert!(display.contains("scan-orchestrator"));
        assert!(display.contains("trace-xyz"));
    }

    #[test]
    fn progress_event_carries_trace_id() {
        let event = ProgressEvent::new(
            MODULE_SCAN_ORCHESTRATOR,
            "run-trace-1",
            ProgressKind::RunStarted {
                target: "/repo".to_owned(),
            },
        );
        assert_eq!(event.metadata.trace_id, "run-trace-1");
        assert_eq!(event.metadata.source_module, "scan-orchestrator");
        assert!(!event.id.is_empty());
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Source.to_string(), "source");
        assert_eq!(Stage::Artifact.to_string(), "artifact");
    }

    #[test]
    fn unit_finished_display() {
        let event = ProgressEvent::new(
            MODULE_SCAN_ORCHESTRATOR,
            "t",
            ProgressKind::UnitFinished {
                category: ScanCategory::Secrets,
                tool: "gitleaks".to_owned(),
                status: ScanStatus::Completed,
            },
        );
        let display = event.to_string();
        assert!(display.contains("secrets"));
        assert!(display.contains("gitleaks"));
    }

    #[test]
    fn progress_kind_serde_roundtrip() {
        let kind = ProgressKind::StageStarted {
            stage: Stage::Artifact,
            unit_count: 4,
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("stage_started"));
        let back: ProgressKind = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            back,
            ProgressKind::StageStarted {
                stage: Stage::Artifact,
                unit_count: 4
            }
        ));
    }

    #[test]
    fn events_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<ProgressEvent>();
    }
}

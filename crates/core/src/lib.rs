//! Palisade 공통 크레이트 — 타입, 에러, 설정, 진행 이벤트, 메트릭 상수
//!
//! 모든 palisade 크레이트가 공유하는 기반을 정의합니다.
//! 오케스트레이션 로직은 상위 크레이트(artifact-resolver, build-executor,
//! scan-orchestrator)에 있으며, 이 크레이트는 데이터 모델만 담습니다.

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{BuildError, ConfigError, PalisadeError, ResolverError, ScanError};

// 설정
pub use config::PalisadeConfig;

// 이벤트
pub use event::{EventMetadata, ProgressEvent, ProgressKind, Stage};

// 도메인 타입
pub use types::{
    BuildDescriptor, BuildKind, ConflictRecord, PackageRecord, Payload, ResultKey, ScanCategory,
    ScanResult, ScanStatus, Severity, SeverityCounts,
};

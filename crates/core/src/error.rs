//! 에러 타입 — 도메인별 에러 정의
//!
//! 스캔 유닛 수준의 실패(NOT_INSTALLED, TIMEOUT, FAILED, ERROR)는
//! 에러가 아니라 [`ScanResult`](crate::types::ScanResult)로 보고됩니다.
//! 이 모듈의 에러는 실행 자체를 계속할 수 없는 조건
//! (잘못된 설정, 존재하지 않는 저장소 루트 등)에만 사용됩니다.

/// Palisade 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PalisadeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 아티팩트/빌드 그래프 해석 에러
    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// 빌드 실행 에러
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// 스캔 오케스트레이션 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 아티팩트/빌드 그래프 해석 에러
///
/// 개별 빌드 파일의 파싱 실패는 에러가 아니라 "선언 모듈 없음"으로
/// 처리됩니다. 이 에러는 탐색 자체가 불가능한 경우에만 발생합니다.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// 저장소 루트가 존재하지 않음 — 실행 전체를 중단하는 유일한 해석 에러
    ///
    /// 읽을 수 없는 개별 항목은 경고 후 건너뛰므로 탐색 자체는
    /// 에러를 만들지 않습니다.
    #[error("repository root does not exist: {path}")]
    RootNotFound { path: String },
}

/// 빌드 실행 에러
///
/// 빌드 도구의 0이 아닌 종료 코드와 스폰 실패는 에러가 아니라
/// 빌드 결과로 보고됩니다.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// 빌드 설정이 비어 있음 (명령어가 빈 문자열 등)
    #[error("invalid build command: {reason}")]
    InvalidCommand { reason: String },
}

/// 스캔 오케스트레이션 에러
///
/// 리포트 파일이나 진행 채널의 실패는 유닛 결과 또는 경고 로그로
/// 흡수되며 에러가 되지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 내부 태스크 조인 실패
    #[error("scan task join failed: {0}")]
    TaskJoin(String),
}

//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `palisade_`
//! - 모듈명: `resolver_`, `build_`, `scan_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(palisade_core::metrics::SCAN_UNITS_COMPLETED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 심각도 레이블 키 (info, low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 스캔 카테고리 레이블 키 (secrets, sast, ...)
pub const LABEL_CATEGORY: &str = "category";

/// 도구 레이블 키 (gitleaks, semgrep, ...)
pub const LABEL_TOOL: &str = "tool";

/// 유닛 종료 상태 레이블 키 (completed, issues_found, ...)
pub const LABEL_STATUS: &str = "status";

/// 빌드 종류 레이블 키 (maven, gradle)
pub const LABEL_BUILD_KIND: &str = "build_kind";

// ─── Artifact Resolver 메트릭 ──────────────────────────────────────

/// Resolver: 탐지된 아티팩트 수 (counter, label: category)
pub const RESOLVER_ARTIFACTS_DETECTED_TOTAL: &str = "palisade_resolver_artifacts_detected_total";

/// Resolver: 탐지 소요 시간 (histogram, 초)
pub const RESOLVER_DETECTION_DURATION_SECONDS: &str =
    "palisade_resolver_detection_duration_seconds";

/// Resolver: 계산된 빌드 루트 수 (gauge)
pub const RESOLVER_BUILD_ROOTS: &str = "palisade_resolver_build_roots";

// ─── Build Executor 메트릭 ─────────────────────────────────────────

/// Build: 실행된 빌드 수 (counter, label: build_kind)
pub const BUILD_RUNS_TOTAL: &str = "palisade_build_runs_total";

/// Build: 실패한 빌드 수 (counter, label: build_kind)
pub const BUILD_FAILURES_TOTAL: &str = "palisade_build_failures_total";

/// Build: 제한 시간 초과 빌드 수 (counter)
pub const BUILD_TIMEOUTS_TOTAL: &str = "palisade_build_timeouts_total";

/// Build: 빌드 소요 시간 (histogram, 초)
pub const BUILD_DURATION_SECONDS: &str = "palisade_build_duration_seconds";

/// Build: 빌드된 컨테이너 이미지 수 (counter)
pub const BUILD_IMAGES_TOTAL: &str = "palisade_build_images_total";

// ─── Scan Orchestrator 메트릭 ──────────────────────────────────────

/// Scan: 종료된 스캔 유닛 수 (counter, labels: category, tool, status)
pub const SCAN_UNITS_COMPLETED_TOTAL: &str = "palisade_scan_units_completed_total";

/// Scan: 제한 시간 초과 유닛 수 (counter, labels: category, tool)
pub const SCAN_UNIT_TIMEOUTS_TOTAL: &str = "palisade_scan_unit_timeouts_total";

/// Scan: 미설치 도구 유닛 수 (counter, label: tool)
pub const SCAN_UNITS_NOT_INSTALLED_TOTAL: &str = "palisade_scan_units_not_installed_total";

/// Scan: 유닛 소요 시간 (histogram, 초, labels: category, tool)
pub const SCAN_UNIT_DURATION_SECONDS: &str = "palisade_scan_unit_duration_seconds";

/// Scan: 발견된 이슈 수 (counter, labels: category, severity)
pub const SCAN_FINDINGS_TOTAL: &str = "palisade_scan_findings_total";

/// Scan: 버전 충돌 수 (gauge)
pub const SCAN_VERSION_CONFLICTS: &str = "palisade_scan_version_conflicts";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// `metrics::describe_counter!()`, `describe_gauge!()`, `describe_histogram!()`을
/// 호출하여 HELP 텍스트를 설정합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 CLI 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Artifact Resolver
    describe_counter!(
        RESOLVER_ARTIFACTS_DETECTED_TOTAL,
        "Total number of artifacts detected by the resolver"
    );
    describe_histogram!(
        RESOLVER_DETECTION_DURATION_SECONDS,
        "Time to walk the repository and detect artifacts in seconds"
    );
    describe_gauge!(
        RESOLVER_BUILD_ROOTS,
        "Number of build roots computed from the module graph"
    );

    // Build Executor
    describe_counter!(BUILD_RUNS_TOTAL, "Total number of builds executed");
    describe_counter!(BUILD_FAILURES_TOTAL, "Total number of failed builds");
    describe_counter!(
        BUILD_TIMEOUTS_TOTAL,
        "Total number of builds killed after exceeding the timeout"
    );
    describe_histogram!(BUILD_DURATION_SECONDS, "Build duration in seconds");
    describe_counter!(
        BUILD_IMAGES_TOTAL,
        "Total number of container images built from Dockerfiles"
    );

    // Scan Orchestrator
    describe_counter!(
        SCAN_UNITS_COMPLETED_TOTAL,
        "Total number of scan units that reached a terminal status"
    );
    describe_counter!(
        SCAN_UNIT_TIMEOUTS_TOTAL,
        "Total number of scan units killed after exceeding their timeout"
    );
    describe_counter!(
        SCAN_UNITS_NOT_INSTALLED_TOTAL,
        "Total number of scan units skipped because the tool binary was missing"
    );
    describe_histogram!(
        SCAN_UNIT_DURATION_SECONDS,
        "Time to run a single scan unit in seconds"
    );
    describe_counter!(
        SCAN_FINDINGS_TOTAL,
        "Total number of findings aggregated across all scan units"
    );
    describe_gauge!(
        SCAN_VERSION_CONFLICTS,
        "Number of diamond dependency version conflicts detected"
    );
}

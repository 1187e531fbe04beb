//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 스캔 카테고리, 심각도, 스캔 결과, 빌드 기술자 등
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// 모든 외부 도구의 이질적인 심각도 어휘를 이 다섯 단계로 정규화합니다.
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 정보성 이벤트
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며, 인식할 수 없는 문자열은 `None`을 반환합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" | "unknown" | "negligible" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 심각도별 건수 집계
///
/// 카테고리별 요약 테이블의 한 행입니다. 기본값은 전부 0이며,
/// 결과가 없는 카테고리도 반드시 all-zero 행으로 표현됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Critical 건수
    pub critical: u64,
    /// High 건수
    pub high: u64,
    /// Medium 건수
    pub medium: u64,
    /// Low 건수
    pub low: u64,
    /// Info 건수
    pub info: u64,
}

impl SeverityCounts {
    /// 심각도 한 건을 집계에 반영합니다.
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }

    /// n건을 한 번에 반영합니다.
    pub fn record_n(&mut self, severity: Severity, n: u64) {
        match severity {
            Severity::Critical => self.critical += n,
            Severity::High => self.high += n,
            Severity::Medium => self.medium += n,
            Severity::Low => self.low += n,
            Severity::Info => self.info += n,
        }
    }

    /// 전체 건수를 반환합니다.
    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low + self.info
    }

    /// 주어진 심각도 이상의 건수를 반환합니다.
    pub fn at_or_above(&self, severity: Severity) -> u64 {
        let mut sum = 0;
        if severity <= Severity::Critical {
            sum += self.critical;
        }
        if severity <= Severity::High {
            sum += self.high;
        }
        if severity <= Severity::Medium {
            sum += self.medium;
        }
        if severity <= Severity::Low {
            sum += self.low;
        }
        if severity <= Severity::Info {
            sum += self.info;
        }
        sum
    }
}

/// 스캔 카테고리 — 고정된 8개 집합
///
/// 집계기는 입력에 어떤 카테고리가 빠져 있어도
/// 항상 8개 카테고리 전부를 출력에 포함해야 합니다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ScanCategory {
    /// 하드코딩된 시크릿 탐지
    Secrets,
    /// 정적 애플리케이션 보안 테스트
    Sast,
    /// 의존성 취약점 스캔
    Dependencies,
    /// Infrastructure-as-Code 설정 검사
    Iac,
    /// 컨테이너 이미지 스캔
    Containers,
    /// Helm 차트 검사
    Helm,
    /// 린트 검사 (Dockerfile 등)
    Linting,
    /// 다이아몬드 의존성 일관성 검사
    Consistency,
}

impl ScanCategory {
    /// 고정된 전체 카테고리 목록 (출력 순서 고정)
    pub const ALL: [ScanCategory; 8] = [
        Self::Secrets,
        Self::Sast,
        Self::Dependencies,
        Self::Iac,
        Self::Containers,
        Self::Helm,
        Self::Linting,
        Self::Consistency,
    ];

    /// 소스 스테이지에 속하는지 여부
    ///
    /// 소스 스테이지 카테고리는 체크아웃된 트리만 읽으며,
    /// 아티팩트 스테이지 카테고리는 빌드 완료 후의 인벤토리를 읽습니다.
    pub fn is_source_stage(&self) -> bool {
        matches!(
            self,
            Self::Secrets | Self::Sast | Self::Dependencies | Self::Iac
        )
    }
}

impl fmt::Display for ScanCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secrets => write!(f, "secrets"),
            Self::Sast => write!(f, "sast"),
            Self::Dependencies => write!(f, "dependencies"),
            Self::Iac => write!(f, "iac"),
            Self::Containers => write!(f, "containers"),
            Self::Helm => write!(f, "helm"),
            Self::Linting => write!(f, "linting"),
            Self::Consistency => write!(f, "consistency"),
        }
    }
}

/// 스캔 유닛 상태
///
/// 상태 전환: `Pending → Running → {Completed, IssuesFound, Failed,
/// Timeout, NotInstalled, Error}` — 마지막 여섯 개는 모두 종결 상태입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// 대기 중
    Pending,
    /// 실행 중
    Running,
    /// 정상 완료, 발견 사항 없음
    Completed,
    /// 정상 완료, 발견 사항 있음 (도구의 정상 동작 결과)
    IssuesFound,
    /// 도구가 실행되었으나 비정상 종료 코드로 실패
    Failed,
    /// 제한 시간 초과 — 해당 프로세스만 종료됨
    Timeout,
    /// 실행 파일이 설치되어 있지 않음
    NotInstalled,
    /// 호출 수준의 예기치 않은 오류
    Error,
}

impl ScanStatus {
    /// 종결 상태인지 여부
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::IssuesFound => write!(f, "issues_found"),
            Self::Failed => write!(f, "failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::NotInstalled => write!(f, "not_installed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// 스캔 유닛의 출력 페이로드
///
/// 도구 출력이 기대한 스키마로 파싱되지 않으면 `Empty`로 강등될 뿐,
/// 예외로 전파되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Payload {
    /// 파싱된 JSON 출력
    Json(serde_json::Value),
    /// 원시 텍스트 출력 (hadolint 텍스트 모드, helm lint 등)
    Text(String),
    /// 출력 없음 또는 파싱 실패로 강등됨
    Empty,
}

impl Payload {
    /// JSON 페이로드에 대한 참조를 반환합니다.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// 텍스트 페이로드에 대한 참조를 반환합니다.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// 결과 맵 키 — (카테고리, 도구[, 대상])
///
/// 유닛마다 키가 유일하므로 동시 삽입에 교차 잠금이 필요 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    /// 스캔 카테고리
    pub category: ScanCategory,
    /// 도구 이름
    pub tool: String,
    /// 대상 식별자 (도구가 대상별로 한 번씩 실행되는 경우)
    pub target: Option<String>,
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(t) => write!(f, "{}/{}/{}", self.category, self.tool, t),
            None => write!(f, "{}/{}", self.category, self.tool),
        }
    }
}

/// 스캔 유닛 하나의 결과
///
/// 생성 후 불변입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// 스캔 카테고리
    pub category: ScanCategory,
    /// 도구 이름
    pub tool: String,
    /// 대상 식별자 (대상별 실행인 경우)
    pub target: Option<String>,
    /// 종결 상태
    pub status: ScanStatus,
    /// 파싱된 출력 또는 원시 출력
    pub payload: Payload,
    /// 오류 상세 (NotInstalled/Timeout/Failed/Error일 때)
    pub error_detail: Option<String>,
    /// 유닛 실행 시간
    pub duration: Duration,
}

impl ScanResult {
    /// 이 결과의 결과 맵 키를 반환합니다.
    pub fn key(&self) -> ResultKey {
        ResultKey {
            category: self.category,
            tool: self.tool.clone(),
            target: self.target.clone(),
        }
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.key(), self.status)
    }
}

/// SBOM 패키지 레코드
///
/// SBOM 생성 도구의 출력에서 추출한 (이름, 버전, 에코시스템) 튜플입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// 패키지 이름
    pub name: String,
    /// 패키지 버전 (원본 문자열 그대로)
    pub version: String,
    /// 에코시스템 식별자 (예: "java-archive", "python", "npm")
    pub ecosystem: String,
}

/// 버전 충돌 레코드 (다이아몬드 의존성)
///
/// 같은 (이름, 에코시스템) 그룹에 서로 다른 버전이 2개 이상 존재할 때
/// 그룹당 하나씩 생성됩니다. 심각도는 항상 Medium으로 고정됩니다 —
/// 다이아몬드 의존성은 정합성/신뢰성 위험이지 그 자체로 직접적인
/// 보안 취약점이 아니므로 자동으로 격상하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// 패키지 이름
    pub package: String,
    /// 에코시스템 식별자
    pub ecosystem: String,
    /// 발견된 버전 목록 (사전순 정렬, 중복 제거)
    pub versions: Vec<String>,
    /// 심각도 (항상 Medium)
    pub severity: Severity,
    /// 충돌 설명
    pub description: String,
    /// 에코시스템별 해결 가이드
    pub remediation: String,
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.package,
            self.ecosystem,
            self.versions.join(", "),
        )
    }
}

/// 빌드 도구 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    /// Maven (pom.xml)
    Maven,
    /// Gradle (build.gradle, build.gradle.kts)
    Gradle,
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maven => write!(f, "maven"),
            Self::Gradle => write!(f, "gradle"),
        }
    }
}

/// 빌드 기술자 — 저장소 트리에서 발견된 빌드 파일 하나
///
/// 트리 탐색 중 생성되며 이후 불변입니다.
/// `declared_modules`는 Maven `<module>` 선언에서 추출한 상대 경로이며,
/// Gradle 기술자와 파싱 불가능한 기술자는 빈 목록을 가집니다
/// (보수적으로 루트 후보로 유지하기 위함).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
    /// 빌드 도구 종류
    pub kind: BuildKind,
    /// 빌드 파일 경로 (pom.xml, build.gradle 등)
    pub path: PathBuf,
    /// 빌드 파일이 위치한 디렉토리
    pub dir: PathBuf,
    /// 선언된 하위 모듈의 상대 경로 (선언 순서 보존)
    pub declared_modules: Vec<String>,
}

impl fmt::Display for BuildDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (modules: {})",
            self.kind,
            self.path.display(),
            self.declared_modules.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_default_is_info() {
        assert_eq!(Severity::default(), Severity::Info);
    }

    #[test]
    fn severity_from_str_loose() {
        assert_eq!(Severity::from_str_loose("HIGH"), Some(Severity::High));
        assert_eq!(Severity::from_str_loose("crit"), Some(Severity::Critical));
        assert_eq!(
            Severity::from_str_loose("moderate"),
            Some(Severity::Medium)
        );
        assert_eq!(Severity::from_str_loose("negligible"), Some(Severity::Info));
        assert_eq!(Severity::from_str_loose("whatever"), None);
    }

    #[test]
    fn severity_counts_record_and_total() {
        let mut counts = SeverityCounts::default();
        counts.record(Severity::Critical);
        counts.record(Severity::High);
        counts.record(Severity::High);
        counts.record(Severity::Info);
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.high, 2);
        assert_eq!(counts.info, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn severity_counts_at_or_above() {
        let counts = SeverityCounts {
            critical: 1,
            high: 2,
            medium: 3,
            low: 4,
            info: 5,
        };
        assert_eq!(counts.at_or_above(Severity::High), 3);
        assert_eq!(counts.at_or_above(Severity::Medium), 6);
        assert_eq!(counts.at_or_above(Severity::Info), 15);
    }

    #[test]
    fn all_categories_has_eight_entries() {
        assert_eq!(ScanCategory::ALL.len(), 8);
    }

    #[test]
    fn source_stage_split() {
        let source: Vec<_> = ScanCategory::ALL
            .iter()
            .filter(|c| c.is_source_stage())
            .collect();
        assert_eq!(source.len(), 4);
        assert!(ScanCategory::Secrets.is_source_stage());
        assert!(!ScanCategory::Containers.is_source_stage());
        assert!(!ScanCategory::Consistency.is_source_stage());
    }

    #[test]
    fn status_terminality() {
        assert!(!ScanStatus::Pending.is_terminal());
        assert!(!ScanStatus::Running.is_terminal());
        assert!(ScanStatus::Completed.is_terminal());
        assert!(ScanStatus::IssuesFound.is_terminal());
        assert!(ScanStatus::NotInstalled.is_terminal());
        assert!(ScanStatus::Timeout.is_terminal());
    }

    #[test]
    fn result_key_display() {
        let key = ResultKey {
            category: ScanCategory::Linting,
            tool: "hadolint".to_owned(),
            target: Some("app/Dockerfile".to_owned()),
        };
        assert_eq!(key.to_string(), "linting/hadolint/app/Dockerfile");

        let key = ResultKey {
            category: ScanCategory::Secrets,
            tool: "gitleaks".to_owned(),
            target: None,
        };
        assert_eq!(key.to_string(), "secrets/gitleaks");
    }

    #[test]
    fn result_key_ordering_is_stable() {
        let a = ResultKey {
            category: ScanCategory::Secrets,
            tool: "gitleaks".to_owned(),
            target: None,
        };
        let b = ResultKey {
            category: ScanCategory::Sast,
            tool: "semgrep".to_owned(),
            target: None,
        };
        // 카테고리 선언 순서가 정렬 순서를 결정
        assert!(a < b);
    }

    #[test]
    fn scan_result_serialize_roundtrip() {
        let result = ScanResult {
            category: ScanCategory::Dependencies,
            tool: "trivy".to_owned(),
            target: None,
            status: ScanStatus::IssuesFound,
            payload: Payload::Json(serde_json::json!({"Results": []})),
            error_detail: None,
            duration: Duration::from_secs(3),
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: ScanResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, ScanStatus::IssuesFound);
        assert!(back.payload.as_json().is_some());
    }

    #[test]
    fn payload_accessors() {
        assert!(Payload::Empty.as_json().is_none());
        assert!(Payload::Empty.as_text().is_none());
        assert_eq!(
            Payload::Text("ok".to_owned()).as_text(),
            Some("ok")
        );
    }

    #[test]
    fn conflict_record_display() {
        let record = ConflictRecord {
            package: "com.fasterxml.jackson.core:jackson-databind".to_owned(),
            ecosystem: "java-archive".to_owned(),
            versions: vec!["2.12.0".to_owned(), "2.9.8".to_owned()],
            severity: Severity::Medium,
            description: "desc".to_owned(),
            remediation: "fix".to_owned(),
        };
        let display = record.to_string();
        assert!(display.contains("jackson-databind"));
        assert!(display.contains("2.12.0, 2.9.8"));
    }

    #[test]
    fn build_descriptor_display() {
        let desc = BuildDescriptor {
            kind: BuildKind::Maven,
            path: PathBuf::from("/repo/pom.xml"),
            dir: PathBuf::from("/repo"),
            declared_modules: vec!["a".to_owned(), "b".to_owned()],
        };
        let display = desc.to_string();
        assert!(display.contains("maven"));
        assert!(display.contains("modules: 2"));
    }
}

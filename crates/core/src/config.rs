//! 설정 관리 — palisade.toml 파싱 및 런타임 설정
//!
//! [`PalisadeConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PALISADE_BUILD_ENABLED=false` 형식)
//! 3. 설정 파일 (`palisade.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), palisade_core::error::PalisadeError> {
//! use palisade_core::config::PalisadeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PalisadeConfig::load("palisade.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PalisadeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PalisadeError};
use crate::types::Severity;

/// Palisade 통합 설정
///
/// `palisade.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 크레이트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PalisadeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 빌드 설정
    #[serde(default)]
    pub build: BuildConfig,
    /// 스캐너 카테고리별 설정
    #[serde(default)]
    pub scanners: ScannersConfig,
    /// 심각도 정책
    #[serde(default)]
    pub severity: SeverityPolicy,
    /// 성능 설정
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// 저장소 관리 설정
    #[serde(default)]
    pub repository: RepositoryConfig,
}

impl PalisadeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PalisadeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PalisadeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PalisadeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PalisadeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PalisadeError> {
        toml::from_str(toml_str).map_err(|e| {
            PalisadeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PALISADE_{SECTION}_{FIELD}`
    /// 예: `PALISADE_BUILD_ENABLED=false`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PALISADE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PALISADE_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.output_dir, "PALISADE_GENERAL_OUTPUT_DIR");

        // Build
        override_bool(&mut self.build.enabled, "PALISADE_BUILD_ENABLED");
        override_string(&mut self.build.maven_command, "PALISADE_BUILD_MAVEN_COMMAND");
        override_u64(&mut self.build.timeout_secs, "PALISADE_BUILD_TIMEOUT_SECS");

        // Scanners
        override_bool(&mut self.scanners.secrets.enabled, "PALISADE_SCANNERS_SECRETS_ENABLED");
        override_csv(&mut self.scanners.secrets.tools, "PALISADE_SCANNERS_SECRETS_TOOLS");
        override_bool(&mut self.scanners.sast.enabled, "PALISADE_SCANNERS_SAST_ENABLED");
        override_csv(&mut self.scanners.sast.tools, "PALISADE_SCANNERS_SAST_TOOLS");
        override_bool(
            &mut self.scanners.dependencies.enabled,
            "PALISADE_SCANNERS_DEPENDENCIES_ENABLED",
        );
        override_csv(
            &mut self.scanners.dependencies.tools,
            "PALISADE_SCANNERS_DEPENDENCIES_TOOLS",
        );
        override_bool(&mut self.scanners.iac.enabled, "PALISADE_SCANNERS_IAC_ENABLED");
        override_csv(&mut self.scanners.iac.tools, "PALISADE_SCANNERS_IAC_TOOLS");
        override_bool(
            &mut self.scanners.containers.enabled,
            "PALISADE_SCANNERS_CONTAINERS_ENABLED",
        );
        override_csv(
            &mut self.scanners.containers.tools,
            "PALISADE_SCANNERS_CONTAINERS_TOOLS",
        );
        override_bool(&mut self.scanners.helm.enabled, "PALISADE_SCANNERS_HELM_ENABLED");
        override_csv(&mut self.scanners.helm.tools, "PALISADE_SCANNERS_HELM_TOOLS");
        override_bool(&mut self.scanners.linting.enabled, "PALISADE_SCANNERS_LINTING_ENABLED");
        override_csv(&mut self.scanners.linting.tools, "PALISADE_SCANNERS_LINTING_TOOLS");
        override_bool(
            &mut self.scanners.consistency.enabled,
            "PALISADE_SCANNERS_CONSISTENCY_ENABLED",
        );
        override_csv(
            &mut self.scanners.consistency.tools,
            "PALISADE_SCANNERS_CONSISTENCY_TOOLS",
        );

        // Severity
        override_string(&mut self.severity.fail_on, "PALISADE_SEVERITY_FAIL_ON");

        // Performance
        override_usize(
            &mut self.performance.max_parallel_units,
            "PALISADE_PERFORMANCE_MAX_PARALLEL_UNITS",
        );
        override_u64(
            &mut self.performance.secrets_timeout_secs,
            "PALISADE_PERFORMANCE_SECRETS_TIMEOUT_SECS",
        );

        // Repository
        override_string(&mut self.repository.temp_dir, "PALISADE_REPOSITORY_TEMP_DIR");
        override_bool(&mut self.repository.cleanup, "PALISADE_REPOSITORY_CLEANUP");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PalisadeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // fail_on 검증
        if Severity::from_str_loose(&self.severity.fail_on).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "severity.fail_on".to_owned(),
                reason: "must be one of: info, low, medium, high, critical".to_owned(),
            }
            .into());
        }

        // 빌드 명령어 검증
        if self.build.enabled && self.build.maven_command.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "build.maven_command".to_owned(),
                reason: "must not be empty when build is enabled".to_owned(),
            }
            .into());
        }

        if self.build.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "build.timeout_secs".to_owned(),
                reason: "must be greater than zero".to_owned(),
            }
            .into());
        }

        // 병렬도 검증
        if self.performance.max_parallel_units == 0 {
            return Err(ConfigError::InvalidValue {
                field: "performance.max_parallel_units".to_owned(),
                reason: "must be greater than zero".to_owned(),
            }
            .into());
        }

        Ok(())
    }

    /// fail_on 문자열을 파싱한 심각도를 반환합니다.
    ///
    /// `validate()`를 통과한 설정에서만 호출해야 하며,
    /// 파싱 불가 시 기본값 High를 반환합니다.
    pub fn fail_on_severity(&self) -> Severity {
        Severity::from_str_loose(&self.severity.fail_on).unwrap_or(Severity::High)
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 결과 보고서 출력 디렉토리
    pub output_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            output_dir: "./reports".to_owned(),
        }
    }
}

/// 빌드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// 빌드 수행 여부
    pub enabled: bool,
    /// Maven 빌드 명령어 오버라이드
    pub maven_command: String,
    /// 빌드당 최대 실행 시간 (초)
    pub timeout_secs: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            maven_command: "mvn clean package -DskipTests".to_owned(),
            timeout_secs: 600,
        }
    }
}

/// 스캐너 카테고리 하나의 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 사용할 도구 목록
    pub tools: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tools: Vec::new(),
        }
    }
}

impl ScannerConfig {
    fn with_tools(tools: &[&str]) -> Self {
        Self {
            enabled: true,
            tools: tools.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// 도구가 이 카테고리에서 활성화되어 있는지 확인합니다.
    pub fn uses_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }
}

/// 스캐너 카테고리별 설정 묶음
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannersConfig {
    /// 시크릿 탐지
    pub secrets: ScannerConfig,
    /// SAST
    pub sast: ScannerConfig,
    /// 의존성 취약점
    pub dependencies: ScannerConfig,
    /// IaC 설정 검사
    pub iac: ScannerConfig,
    /// 컨테이너 이미지
    pub containers: ScannerConfig,
    /// Helm 차트
    pub helm: ScannerConfig,
    /// 린트
    pub linting: ScannerConfig,
    /// 다이아몬드 의존성 일관성
    pub consistency: ScannerConfig,
}

impl Default for ScannersConfig {
    fn default() -> Self {
        Self {
            secrets: ScannerConfig::with_tools(&["gitleaks"]),
            sast: ScannerConfig::with_tools(&["semgrep", "spotbugs"]),
            dependencies: ScannerConfig::with_tools(&["trivy"]),
            iac: ScannerConfig::with_tools(&["trivy", "checkov"]),
            containers: ScannerConfig::with_tools(&["trivy", "grype"]),
            helm: ScannerConfig::with_tools(&["kubescape", "kubeaudit", "helm-lint", "trivy"]),
            linting: ScannerConfig::with_tools(&["hadolint"]),
            consistency: ScannerConfig::with_tools(&["syft"]),
        }
    }
}

/// 심각도 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityPolicy {
    /// 이 심각도 이상 발견 시 0이 아닌 종료 코드 반환
    pub fail_on: String,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            fail_on: "high".to_owned(),
        }
    }
}

/// 성능 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// 스테이지 내 동시 실행 유닛 수 상한
    pub max_parallel_units: usize,
    /// 시크릿 스캔 제한 시간 (초) — 전체 히스토리 탐색이라 가장 깁니다
    pub secrets_timeout_secs: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_parallel_units: 3,
            secrets_timeout_secs: 1800,
        }
    }
}

/// 저장소 관리 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// 임시 클론 디렉토리
    pub temp_dir: String,
    /// 스캔 후 임시 디렉토리 정리 여부
    pub cleanup: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/palisade".to_owned(),
            cleanup: true,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

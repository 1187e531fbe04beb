//! 빌드 결과 타입

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use palisade_core::types::BuildKind;

/// 개별 빌드의 종료 분류
///
/// `Error`는 프로세스를 띄우지 못한 경우(실행 파일 부재 등)에만
/// 사용하며, 0이 아닌 빌드 종료 코드는 항상 `Failed`입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BuildOutcome {
    /// 종료 코드 0
    Success,
    /// 0이 아닌 종료 코드
    Failed {
        /// 프로세스 종료 코드 (시그널 종료 시 -1)
        exit: i32,
    },
    /// 제한 시간 초과로 강제 종료
    Timeout,
    /// 프로세스 실행 자체가 실패
    Error {
        /// 실패 사유
        reason: String,
    },
}

impl BuildOutcome {
    /// 성공 여부
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success)
    }
}

/// Maven/Gradle 빌드 1회의 기록
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRun {
    /// 빌드 종류
    pub kind: BuildKind,
    /// 빌드가 실행된 디렉토리 (루트 기술자의 디렉토리)
    pub dir: PathBuf,
    /// 실행된 명령어 (로그 표시용)
    pub command: String,
    /// 종료 분류
    pub outcome: BuildOutcome,
    /// 소요 시간
    pub duration: Duration,
    /// stdout과 stderr를 합친 로그
    pub log: String,
}

/// 컨테이너 이미지 빌드 1회의 기록
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBuild {
    /// 원본 Dockerfile 경로
    pub dockerfile: PathBuf,
    /// 빌드된 이미지 이름 (`palisade/<name>:latest`)
    pub image: String,
    /// 종료 분류
    pub outcome: BuildOutcome,
    /// 소요 시간
    pub duration: Duration,
    /// stdout과 stderr를 합친 로그
    pub log: String,
}

/// 빌드 단계 전체의 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    /// Maven 빌드 결과
    pub maven: Vec<BuildRun>,
    /// Gradle 빌드 결과
    pub gradle: Vec<BuildRun>,
    /// 컨테이너 이미지 빌드 결과
    pub container: Vec<ImageBuild>,
    /// 재탐지로 새로 추가된 산출물 수
    pub artifacts_added: usize,
}

impl BuildReport {
    /// 성공한 빌드 수 (이미지 포함)
    pub fn succeeded(&self) -> usize {
        self.maven
            .iter()
            .chain(self.gradle.iter())
            .filter(|r| r.outcome.is_success())
            .count()
            + self
                .container
                .iter()
                .filter(|r| r.outcome.is_success())
                .count()
    }

    /// 실패로 분류되는 빌드 수 (Failed, Timeout, Error 모두 포함)
    pub fn failed(&self) -> usize {
        self.maven
            .iter()
            .chain(self.gradle.iter())
            .filter(|r| !r.outcome.is_success())
            .count()
            + self
                .container
                .iter()
                .filter(|r| !r.outcome.is_success())
                .count()
    }
}

//! 아티팩트 인벤토리 — 탐지 결과의 집합 표현
//!
//! 모든 필드는 정렬·중복 제거된 집합(`BTreeSet`)으로 유지되어
//! 재탐지를 여러 번 수행해도 결과가 변하지 않습니다.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use palisade_core::types::BuildDescriptor;

/// 저장소에서 탐지된 스캔 대상 아티팩트의 모음
///
/// 빌드 후 재탐지(`rescan_compiled`)는 항목을 추가만 할 뿐
/// 제거하지 않습니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactInventory {
    /// Dockerfile 경로 목록
    pub dockerfiles: BTreeSet<PathBuf>,
    /// Helm 차트 디렉토리 목록 (Chart.yaml의 부모 디렉토리)
    pub helm_charts: BTreeSet<PathBuf>,
    /// 빌드 기술자 목록 (pom.xml, build.gradle*)
    pub build_descriptors: Vec<BuildDescriptor>,
    /// 빌드 산출물: jar 파일
    pub jar_files: BTreeSet<PathBuf>,
    /// 빌드 산출물: war 파일
    pub war_files: BTreeSet<PathBuf>,
    /// 빌드된 컨테이너 이미지 이름
    pub docker_images: BTreeSet<String>,
    /// Kubernetes 매니페스트 파일 목록
    pub kubernetes_manifests: BTreeSet<PathBuf>,
}

impl ArtifactInventory {
    /// 빈 인벤토리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 빌드 기술자를 추가합니다. 같은 경로의 기술자는 한 번만 유지됩니다.
    pub fn push_descriptor(&mut self, descriptor: BuildDescriptor) {
        if !self
            .build_descriptors
            .iter()
            .any(|d| d.path == descriptor.path)
        {
            self.build_descriptors.push(descriptor);
        }
    }

    /// 컴파일 산출물(jar/war)을 추가하고 새로 추가된 항목 수를 반환합니다.
    pub fn append_compiled(
        &mut self,
        jars: impl IntoIterator<Item = PathBuf>,
        wars: impl IntoIterator<Item = PathBuf>,
    ) -> usize {
        let mut added = 0;
        for jar in jars {
            if self.jar_files.insert(jar) {
                added += 1;
            }
        }
        for war in wars {
            if self.war_files.insert(war) {
                added += 1;
            }
        }
        added
    }

    /// 빌드된 이미지 이름을 추가합니다.
    pub fn record_image(&mut self, name: impl Into<String>) -> bool {
        self.docker_images.insert(name.into())
    }

    /// 아티팩트 스테이지에 스캔할 대상이 하나라도 있는지 확인합니다.
    pub fn has_artifact_targets(&self) -> bool {
        !self.dockerfiles.is_empty()
            || !self.helm_charts.is_empty()
            || !self.jar_files.is_empty()
            || !self.war_files.is_empty()
            || !self.docker_images.is_empty()
    }

    /// 탐지된 전체 아티팩트 수 (빌드 기술자 포함)
    pub fn total(&self) -> usize {
        self.dockerfiles.len()
            + self.helm_charts.len()
            + self.build_descriptors.len()
            + self.jar_files.len()
            + self.war_files.len()
            + self.docker_images.len()
            + self.kubernetes_manifests.len()
    }
}

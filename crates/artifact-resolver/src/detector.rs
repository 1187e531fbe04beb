//! 저장소 트리 순회 및 아티팩트 분류
//!
//! 트리를 한 번만 순회하며 파일 이름 패턴으로 아티팩트를 분류합니다.
//! `target`/`build` 디렉토리는 소스 계열 아티팩트에서는 제외하지만
//! 컴파일 산출물(jar/war/ear) 탐지에서는 포함합니다.

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use palisade_core::error::ResolverError;
use palisade_core::types::{BuildDescriptor, BuildKind};

use crate::inventory::ArtifactInventory;
use crate::maven;

/// 모든 아티팩트 계열에서 제외되는 디렉토리
const EXCLUDED_DIRS: &[&str] = &["node_modules", "vendor", ".git", "dist", "reports"];

/// 소스 계열 아티팩트에서만 제외되는 빌드 출력 디렉토리
const BUILD_OUTPUT_DIRS: &[&str] = &["target", "build"];

/// Kubernetes 매니페스트로 취급하는 고정 파일 이름
const K8S_MANIFEST_NAMES: &[&str] = &[
    "deployment.yaml",
    "deployment.yml",
    "service.yaml",
    "service.yml",
    "ingress.yaml",
    "ingress.yml",
];

/// 저장소 아티팩트 탐지기
///
/// 상태를 갖지 않으며 모든 메서드는 연관 함수입니다. 같은 트리에
/// 두 번 실행해도 동일한 인벤토리를 반환합니다.
pub struct ArtifactResolver;

impl ArtifactResolver {
    /// 저장소 루트를 한 번 순회하여 인벤토리를 만듭니다.
    ///
    /// 루트가 존재하지 않으면 [`ResolverError::RootNotFound`]를
    /// 반환합니다. 읽을 수 없는 항목은 경고만 남기고 건너뜁니다.
    pub fn detect(root: impl AsRef<Path>) -> Result<ArtifactInventory, ResolverError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ResolverError::RootNotFound {
                path: root.display().to_string(),
            });
        }

        let started = Instant::now();
        let mut inventory = ArtifactInventory::new();

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !is_excluded_dir(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "unreadable entry during detection, skipping");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            classify(entry.path(), root, &mut inventory);
        }

        let elapsed = started.elapsed();
        histogram!(palisade_core::metrics::RESOLVER_DETECTION_DURATION_SECONDS)
            .record(elapsed.as_secs_f64());
        counter!(palisade_core::metrics::RESOLVER_ARTIFACTS_DETECTED_TOTAL)
            .increment(inventory.total() as u64);

        info!(
            root = %root.display(),
            artifacts = inventory.total(),
            descriptors = inventory.build_descriptors.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "artifact detection finished"
        );
        Ok(inventory)
    }

    /// 빌드 후 컴파일 산출물만 다시 탐지하여 인벤토리에 추가합니다.
    ///
    /// jar/war/ear만 대상으로 하며, 기존 항목은 제거하지 않습니다.
    /// 새로 추가된 항목 수를 반환합니다.
    pub fn rescan_compiled(
        root: impl AsRef<Path>,
        inventory: &mut ArtifactInventory,
    ) -> Result<usize, ResolverError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ResolverError::RootNotFound {
                path: root.display().to_string(),
            });
        }

        let mut jars = Vec::new();
        let mut wars = Vec::new();
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !is_excluded_dir(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "unreadable entry during rescan, skipping");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match archive_extension(entry.path()) {
                Some(ArchiveKind::Jar) => jars.push(entry.path().to_path_buf()),
                Some(ArchiveKind::War) => wars.push(entry.path().to_path_buf()),
                None => {}
            }
        }

        let added = inventory.append_compiled(jars, wars);
        debug!(root = %root.display(), added, "compiled artifact rescan finished");
        Ok(added)
    }
}

enum ArchiveKind {
    Jar,
    War,
}

fn archive_extension(path: &Path) -> Option<ArchiveKind> {
    match path.extension().and_then(|e| e.to_str()) {
        // ear는 jar와 같은 방식으로 스캔되므로 함께 분류합니다
        Some("jar") | Some("ear") => Some(ArchiveKind::Jar),
        Some("war") => Some(ArchiveKind::War),
        _ => None,
    }
}

fn is_excluded_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| EXCLUDED_DIRS.contains(&name) && path.is_dir())
}

/// 경로가 빌드 출력 디렉토리(`target`, `build`) 아래에 있는지 확인합니다.
fn in_build_output(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|c| match c {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|n| BUILD_OUTPUT_DIRS.contains(&n)),
        _ => false,
    })
}

fn classify(path: &Path, root: &Path, inventory: &mut ArtifactInventory) {
    // 컴파일 산출물은 빌드 출력 디렉토리 안에서도 수집합니다
    match archive_extension(path) {
        Some(ArchiveKind::Jar) => {
            inventory.jar_files.insert(path.to_path_buf());
            return;
        }
        Some(ArchiveKind::War) => {
            inventory.war_files.insert(path.to_path_buf());
            return;
        }
        None => {}
    }

    // 소스 계열 아티팩트는 빌드 출력물을 무시합니다 (복사본 중복 방지)
    if in_build_output(path, root) {
        return;
    }

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };

    if name.starts_with("Dockerfile") {
        inventory.dockerfiles.insert(path.to_path_buf());
    } else if name == "Chart.yaml" {
        if let Some(chart_dir) = path.parent() {
            inventory.helm_charts.insert(chart_dir.to_path_buf());
        }
    } else if name == "pom.xml" {
        let dir = path.parent().map(PathBuf::from).unwrap_or_default();
        inventory.push_descriptor(BuildDescriptor {
            kind: BuildKind::Maven,
            path: path.to_path_buf(),
            dir,
            declared_modules: maven::declared_modules_from_file(path),
        });
    } else if name.starts_with("build.gradle") {
        let dir = path.parent().map(PathBuf::from).unwrap_or_default();
        inventory.push_descriptor(BuildDescriptor {
            kind: BuildKind::Gradle,
            path: path.to_path_buf(),
            dir,
            declared_modules: Vec::new(),
        });
    } else if K8S_MANIFEST_NAMES.contains(&name) {
        inventory.kubernetes_manifests.insert(path.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn detect_on_missing_root_is_fatal() {
        let err = ArtifactResolver::detect("/nonexistent/repo").unwrap_err();
        assert!(matches!(err, ResolverError::RootNotFound { .. }));
    }

    #[test]
    fn classifies_by_filename_pattern() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("Dockerfile"));
        touch(&root.join("api/Dockerfile.dev"));
        touch(&root.join("charts/app/Chart.yaml"));
        touch(&root.join("k8s/deployment.yaml"));
        touch(&root.join("k8s/service.yml"));
        touch(&root.join("lib/dist.jar"));
        touch(&root.join("lib/app.war"));
        fs::write(root.join("pom.xml"), "<project/>").unwrap();
        touch(&root.join("svc/build.gradle.kts"));

        let inv = ArtifactResolver::detect(root).unwrap();
        assert_eq!(inv.dockerfiles.len(), 2);
        assert_eq!(inv.helm_charts.len(), 1);
        assert!(inv.helm_charts.contains(&root.join("charts/app")));
        assert_eq!(inv.kubernetes_manifests.len(), 2);
        assert_eq!(inv.jar_files.len(), 1);
        assert_eq!(inv.war_files.len(), 1);
        assert_eq!(inv.build_descriptors.len(), 2);
    }

    #[test]
    fn excluded_dirs_are_pruned_entirely() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("node_modules/pkg/Dockerfile"));
        touch(&root.join(".git/objects/app.jar"));
        touch(&root.join("vendor/lib/pom.xml"));
        touch(&root.join("Dockerfile"));

        let inv = ArtifactResolver::detect(root).unwrap();
        assert_eq!(inv.dockerfiles.len(), 1);
        assert!(inv.jar_files.is_empty());
        assert!(inv.build_descriptors.is_empty());
    }

    #[test]
    fn build_output_skipped_for_source_but_searched_for_archives() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("target/classes/Dockerfile"));
        touch(&root.join("target/app.jar"));
        touch(&root.join("build/libs/app.war"));

        let inv = ArtifactResolver::detect(root).unwrap();
        assert!(inv.dockerfiles.is_empty());
        assert_eq!(inv.jar_files.len(), 1);
        assert_eq!(inv.war_files.len(), 1);
    }

    #[test]
    fn ear_is_collected_with_jars() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("app.ear"));
        let inv = ArtifactResolver::detect(tmp.path()).unwrap();
        assert_eq!(inv.jar_files.len(), 1);
    }

    #[test]
    fn maven_descriptor_carries_declared_modules() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("pom.xml"),
            "<project><modules><module>a</module></modules></project>",
        )
        .unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("a/pom.xml"), "<project/>").unwrap();

        let inv = ArtifactResolver::detect(root).unwrap();
        let parent = inv
            .build_descriptors
            .iter()
            .find(|d| d.dir == root)
            .unwrap();
        assert_eq!(parent.declared_modules, vec!["a"]);
    }

    #[test]
    fn detect_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("Dockerfile"));
        touch(&root.join("lib/app.jar"));
        fs::write(root.join("pom.xml"), "<project/>").unwrap();

        let first = ArtifactResolver::detect(root).unwrap();
        let second = ArtifactResolver::detect(root).unwrap();
        assert_eq!(first.total(), second.total());
        assert_eq!(first.dockerfiles, second.dockerfiles);
        assert_eq!(first.jar_files, second.jar_files);
    }

    #[test]
    fn rescan_appends_but_never_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("existing.jar"));

        let mut inv = ArtifactResolver::detect(root).unwrap();
        assert_eq!(inv.jar_files.len(), 1);

        // 빌드가 만든 산출물
        touch(&root.join("target/built.jar"));
        touch(&root.join("target/built.war"));

        let added = ArtifactResolver::rescan_compiled(root, &mut inv).unwrap();
        assert_eq!(added, 2);
        assert_eq!(inv.jar_files.len(), 2);
        assert_eq!(inv.war_files.len(), 1);

        // 다시 실행해도 추가 없음
        let added = ArtifactResolver::rescan_compiled(root, &mut inv).unwrap();
        assert_eq!(added, 0);
    }
}

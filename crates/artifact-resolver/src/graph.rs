//! 빌드 그래프 — 모듈 선언으로부터 루트 빌드 집합 계산
//!
//! 애그리게이터 pom이 선언한 모듈 디렉토리와 다른 기술자의 디렉토리가
//! 일치하면 부모→자식 간선이 생깁니다. 루트는 들어오는 간선이 없는
//! 기술자이며, 빌드는 루트에서만 실행됩니다 (Maven reactor가 하위
//! 모듈을 함께 빌드하므로 중복 빌드를 피합니다).

use std::collections::HashMap;
use std::path::PathBuf;

use metrics::gauge;
use tracing::debug;

use palisade_core::types::{BuildDescriptor, BuildKind};

/// 기술자 목록에서 루트 빌드의 인덱스를 계산합니다.
///
/// - 경로 비교는 전부 canonicalize 후에 수행합니다.
/// - 존재하지 않는 모듈 디렉토리 선언은 무시합니다.
/// - Gradle 기술자는 모듈 그래프를 모델링하지 않으므로 항상 루트입니다.
/// - 루트 집합과 비루트 집합은 서로소이며 합치면 전체 기술자입니다.
pub fn compute_build_roots(descriptors: &[BuildDescriptor]) -> Vec<usize> {
    // canonical dir -> index. canonicalize 실패(삭제된 디렉토리 등)는
    // 그래프에서 제외되어 루트로 남습니다.
    let mut dir_index: HashMap<PathBuf, usize> = HashMap::new();
    for (i, d) in descriptors.iter().enumerate() {
        if let Ok(canonical) = d.dir.canonicalize() {
            dir_index.insert(canonical, i);
        }
    }

    let mut has_parent = vec![false; descriptors.len()];

    for parent in descriptors {
        if parent.kind != BuildKind::Maven {
            continue;
        }
        for module in &parent.declared_modules {
            let module_dir = parent.dir.join(module);
            let Ok(canonical) = module_dir.canonicalize() else {
                debug!(
                    parent = %parent.dir.display(),
                    module = module.as_str(),
                    "declared module dir does not exist, ignoring"
                );
                continue;
            };
            if let Some(&child) = dir_index.get(&canonical) {
                if descriptors[child].kind == BuildKind::Maven {
                    has_parent[child] = true;
                }
            }
        }
    }

    let roots: Vec<usize> = (0..descriptors.len())
        .filter(|&i| !has_parent[i])
        .collect();

    gauge!(palisade_core::metrics::RESOLVER_BUILD_ROOTS).set(roots.len() as f64);

    roots
}

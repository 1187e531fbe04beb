//! 다이아몬드 의존성 충돌 탐지
//!
//! syft SBOM의 패키지 목록을 (이름, 에코시스템) 쌍으로 묶고, 서로
//! 다른 버전이 둘 이상인 그룹마다 충돌 레코드를 하나 만듭니다.
//! 다이아몬드 의존성은 자체로는 직접적인 공격 경로가 아니라
//! 정확성·신뢰성 위험이므로 심각도는 Medium으로 고정되며 자동으로
//! 격상되지 않습니다.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use palisade_core::types::{ConflictRecord, PackageRecord, Severity};

/// syft JSON 출력(`artifacts` 배열)에서 패키지 레코드를 추출합니다.
///
/// 이름·버전·타입 중 하나라도 없는 항목은 건너뜁니다.
pub fn parse_syft_packages(sbom: &Value) -> Vec<PackageRecord> {
    let Some(artifacts) = sbom.get("artifacts").and_then(Value::as_array) else {
        return Vec::new();
    };
    artifacts
        .iter()
        .filter_map(|pkg| {
            Some(PackageRecord {
                name: pkg.get("name")?.as_str()?.to_owned(),
                version: pkg.get("version")?.as_str()?.to_owned(),
                ecosystem: pkg.get("type")?.as_str()?.to_owned(),
            })
        })
        .collect()
}

/// 버전 충돌을 탐지합니다.
///
/// 버전은 사전순으로 정렬됩니다 (semver 비교가 아님 — 결정적 출력을
/// 위한 선택이며, remediation이 가리키는 "최신" 버전도 사전순 최대값
/// 입니다). 출력은 (이름, 에코시스템) 순으로 정렬되어 결정적입니다.
pub fn detect_conflicts(packages: &[PackageRecord]) -> Vec<ConflictRecord> {
    let mut registry: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    for pkg in packages {
        registry
            .entry((pkg.name.clone(), pkg.ecosystem.clone()))
            .or_default()
            .insert(pkg.version.clone());
    }

    registry
        .into_iter()
        .filter(|(_, versions)| versions.len() > 1)
        .map(|((name, ecosystem), versions)| {
            let versions: Vec<String> = versions.into_iter().collect();
            // BTreeSet 순회가 곧 사전순이므로 마지막 원소가 최대값
            let latest = versions
                .last()
                .cloned()
                .unwrap_or_default();
            let description = format!(
                "Multiple versions of '{name}' detected: {}. This can lead to \
                 runtime errors or unpredictable behavior.",
                versions.join(", ")
            );
            let remediation = remediation_for(&name, &ecosystem, &latest);
            ConflictRecord {
                package: name,
                ecosystem,
                versions,
                severity: Severity::Medium,
                description,
                remediation,
            }
        })
        .collect()
}

/// 에코시스템 식별자 부분 문자열 매칭으로 조치 안내를 선택합니다.
fn remediation_for(name: &str, ecosystem: &str, latest: &str) -> String {
    if ecosystem.contains("maven") || ecosystem.contains("java") {
        format!(
            "Identify the root cause using `mvn dependency:tree -Dverbose -Dincludes={name}`. \
             Then, force convergence by adding `{name}:{latest}` to the \
             `<dependencyManagement>` section of your root pom.xml."
        )
    } else if ecosystem.contains("python") || ecosystem.contains("pip") {
        format!(
            "Check your requirements using `pipdeptree -p {name}`. \
             Pin `{name}=={latest}` in your requirements.txt or use a lockfile \
             manager like Poetry/Pipenv."
        )
    } else if ecosystem.contains("npm") || ecosystem.contains("node") {
        format!(
            "Run `npm list {name}` to see the tree. Consider using `npm dedupe` \
             or adding an 'overrides' section in package.json for `{name}`."
        )
    } else {
        format!("Investigate build configuration to ensure only version {latest} of {name} is used.")
    }
}

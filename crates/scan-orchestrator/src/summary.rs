//! 결과 집계 — 이질적인 도구 출력의 단일 심각도 모델 정규화
//!
//! 카테고리별로 도구 고유의 페이로드 형태를 검사하여 5단계 심각도
//! 건수로 변환합니다. 소비자는 8개 카테고리를 무조건 인덱싱하므로,
//! 입력에 카테고리가 없어도 출력에는 all-zero 행이 반드시 존재합니다.
//! 형태 불일치(키 없음, 타입 불일치)는 0/Info로 흡수되며 절대
//! 에러로 올라가지 않습니다.

use std::collections::BTreeMap;

use metrics::counter;
use serde_json::Value;

use palisade_core::types::{
    Payload, ResultKey, ScanCategory, ScanResult, Severity, SeverityCounts,
};

/// 모든 스캔 결과를 카테고리별 심각도 건수로 집계합니다.
pub fn summarize(
    results: &BTreeMap<ResultKey, ScanResult>,
) -> BTreeMap<ScanCategory, SeverityCounts> {
    // 빈 입력이어도 8개 카테고리 전부가 all-zero로 존재해야 합니다
    let mut summary: BTreeMap<ScanCategory, SeverityCounts> = ScanCategory::ALL
        .iter()
        .map(|c| (*c, SeverityCounts::default()))
        .collect();

    for (key, result) in results {
        let counts = summary.entry(key.category).or_default();
        count_result(result, counts);
    }

    for (category, counts) in &summary {
        record_findings_metrics(*category, counts);
    }

    summary
}

fn record_findings_metrics(category: ScanCategory, counts: &SeverityCounts) {
    let pairs = [
        (Severity::Info, counts.info),
        (Severity::Low, counts.low),
        (Severity::Medium, counts.medium),
        (Severity::High, counts.high),
        (Severity::Critical, counts.critical),
    ];
    for (severity, n) in pairs {
        if n == 0 {
            continue;
        }
        counter!(
            palisade_core::metrics::SCAN_FINDINGS_TOTAL,
            palisade_core::metrics::LABEL_CATEGORY => category.to_string(),
            palisade_core::metrics::LABEL_SEVERITY => severity.to_string().to_lowercase()
        )
        .increment(n);
    }
}

fn count_result(result: &ScanResult, counts: &mut SeverityCounts) {
    match result.tool.as_str() {
        // 시크릿: 발견 건수 전부 High
        "gitleaks" => {
            if let Some(findings) = result.payload.as_json().and_then(Value::as_array) {
                counts.record_n(Severity::High, findings.len() as u64);
            }
        }
        // SAST: semgrep 고유 어휘를 정규 척도로 변환
        "semgrep" => {
            for finding in json_array(result, &["results"]) {
                let severity = finding
                    .pointer("/extra/severity")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                counts.record(match severity {
                    "ERROR" => Severity::High,
                    "WARNING" => Severity::Medium,
                    _ => Severity::Info,
                });
            }
        }
        // SAST: spotbugs priority 정수 (1=높음, 2=중간)
        "spotbugs" => {
            if let Some(bugs) = result.payload.as_json().and_then(Value::as_array) {
                for bug in bugs {
                    counts.record(match bug.get("priority").and_then(Value::as_i64) {
                        Some(1) => Severity::High,
                        Some(2) => Severity::Medium,
                        _ => Severity::Info,
                    });
                }
            }
        }
        // trivy 계열: Results[] 안의 취약점/설정 오류 목록
        "trivy-fs" | "trivy-image" => {
            count_trivy_nested(result, "Vulnerabilities", counts);
        }
        "trivy-config" => {
            count_trivy_nested(result, "Misconfigurations", counts);
        }
        // checkov: failed_checks 건수, 심각도 문자열은 느슨하게 해석
        "checkov" => {
            count_checkov(result, counts);
        }
        // grype: matches[].vulnerability.severity
        "grype" => {
            for m in json_array(result, &["matches"]) {
                let severity = m
                    .pointer("/vulnerability/severity")
                    .and_then(Value::as_str)
                    .and_then(Severity::from_str_loose)
                    .unwrap_or(Severity::Info);
                counts.record(severity);
            }
        }
        // kubescape: 실패한 컨트롤의 scoreFactor를 구간으로 매핑
        "kubescape" => {
            count_kubescape(result, counts);
        }
        // kubeaudit: NDJSON 줄마다 level을 해석
        "kubeaudit" => {
            count_kubeaudit(result, counts);
        }
        // helm lint: "[ERROR]" 줄마다 Medium
        "helm-lint" => {
            if let Some(text) = result.payload.as_text() {
                let errors = text.lines().filter(|l| l.contains("[ERROR]")).count();
                counts.record_n(Severity::Medium, errors as u64);
            }
        }
        // hadolint: JSON 배열의 level을 해석
        "hadolint" => {
            if let Some(findings) = result.payload.as_json().and_then(Value::as_array) {
                for finding in findings {
                    counts.record(severity_from_level(
                        finding.get("level").and_then(Value::as_str),
                    ));
                }
            }
        }
        // 일관성: 충돌 레코드마다 Medium (고정)
        "syft" => {
            if let Some(conflicts) = result.payload.as_json().and_then(Value::as_array) {
                counts.record_n(Severity::Medium, conflicts.len() as u64);
            }
        }
        _ => {}
    }
}

/// 페이로드에서 중첩 경로의 배열을 찾고, 없으면 빈 배열입니다.
fn json_array<'a>(result: &'a ScanResult, path: &[&str]) -> Vec<&'a Value> {
    let Some(mut value) = result.payload.as_json() else {
        return Vec::new();
    };
    for key in path {
        match value.get(key) {
            Some(v) => value = v,
            None => return Vec::new(),
        }
    }
    value
        .as_array()
        .map(|a| a.iter().collect())
        .unwrap_or_default()
}

fn count_trivy_nested(result: &ScanResult, list_key: &str, counts: &mut SeverityCounts) {
    for target_result in json_array(result, &["Results"]) {
        let Some(items) = target_result.get(list_key).and_then(Value::as_array) else {
            continue;
        };
        for item in items {
            let severity = item
                .get("Severity")
                .and_then(Value::as_str)
                .and_then(Severity::from_str_loose)
                .unwrap_or(Severity::Info);
            counts.record(severity);
        }
    }
}

fn count_checkov(result: &ScanResult, counts: &mut SeverityCounts) {
    let Some(value) = result.payload.as_json() else {
        return;
    };
    // checkov는 체크 타입이 하나면 객체, 여럿이면 객체 배열을 냅니다
    let reports: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    for report in reports {
        let Some(failed) = report
            .pointer("/results/failed_checks")
            .and_then(Value::as_array)
        else {
            continue;
        };
        for check in failed {
            let severity = check
                .get("severity")
                .and_then(Value::as_str)
                .and_then(Severity::from_str_loose)
                .unwrap_or(Severity::Info);
            counts.record(severity);
        }
    }
}

fn count_kubescape(result: &ScanResult, counts: &mut SeverityCounts) {
    let Some(controls) = result
        .payload
        .as_json()
        .and_then(|v| v.pointer("/summaryDetails/controls"))
        .and_then(Value::as_object)
    else {
        return;
    };
    for control in controls.values() {
        let failed = control
            .pointer("/ResourceCounters/failedResources")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if failed == 0 {
            continue;
        }
        let score = control
            .get("scoreFactor")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let severity = if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else if score > 0.0 {
            Severity::Low
        } else {
            Severity::Info
        };
        counts.record(severity);
    }
}

/// 린트 계열의 level 문자열 (error/warning)을 정규 척도로 변환합니다.
fn severity_from_level(level: Option<&str>) -> Severity {
    match level {
        Some("error") => Severity::High,
        Some("warning") => Severity::Medium,
        _ => Severity::Info,
    }
}

/// kubeaudit은 `--format json`으로 감사 결과를 줄 단위 JSON으로
/// 냅니다. 단일 문서가 아니므로 텍스트 페이로드를 줄마다 파싱하며,
/// JSON이 아닌 줄은 무시합니다.
fn count_kubeaudit(result: &ScanResult, counts: &mut SeverityCounts) {
    let Some(text) = result.payload.as_text() else {
        return;
    };
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(record) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        counts.record(severity_from_level(
            record.get("level").and_then(Value::as_str),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn result(category: ScanCategory, tool: &str, payload: Payload) -> (ResultKey, ScanResult) {
        let result = ScanResult {
            category,
            tool: tool.to_owned(),
            target: None,
            status: palisade_core::types::ScanStatus::Completed,
            payload,
            error_detail: None,
            duration: Duration::from_secs(1),
        };
        (result.key(), result)
    }

    #[test]
    fn empty_input_yields_all_eight_categories() {
        let summary = summarize(&BTreeMap::new());
        assert_eq!(summary.len(), 8);
        for counts in summary.values() {
            assert_eq!(counts.total(), 0);
        }
    }

    #[test]
    fn gitleaks_findings_count_as_high() {
        let mut results = BTreeMap::new();
        let (key, value) = result(
            ScanCategory::Secrets,
            "gitleaks",
            Payload::Json(json!([{"RuleID": "a"}, {"RuleID": "b"}])),
        );
        results.insert(key, value);

        let summary = summarize(&results);
        assert_eq!(summary[&ScanCategory::Secrets].high, 2);
        assert_eq!(summary[&ScanCategory::Secrets].total(), 2);
    }

    #[test]
    fn semgrep_severity_vocabulary() {
        let payload = Payload::Json(json!({
            "results": [
                {"extra": {"severity": "ERROR"}},
                {"extra": {"severity": "WARNING"}},
                {"extra": {"severity": "INVENTORY"}},
                {"check_id": "no-extra-key"}
            ]
        }));
        let mut results = BTreeMap::new();
        let (key, value) = result(ScanCategory::Sast, "semgrep", payload);
        results.insert(key, value);

        let counts = summarize(&results)[&ScanCategory::Sast];
        assert_eq!(counts.high, 1);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.info, 2);
    }

    #[test]
    fn spotbugs_priority_mapping() {
        let payload = Payload::Json(json!([
            {"priority": 1},
            {"priority": 2},
            {"priority": 3},
            {"no_priority": true}
        ]));
        let mut results = BTreeMap::new();
        let (key, value) = result(ScanCategory::Sast, "spotbugs", payload);
        results.insert(key, value);

        let counts = summarize(&results)[&ScanCategory::Sast];
        assert_eq!(counts.high, 1);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.info, 2);
    }

    #[test]
    fn trivy_severity_lowercased_unknown_to_info() {
        let payload = Payload::Json(json!({
            "Results": [
                {"Vulnerabilities": [
                    {"Severity": "CRITICAL"},
                    {"Severity": "High"},
                    {"Severity": "BOGUS"}
                ]},
                {"Target": "no-vulns-key"}
            ]
        }));
        let mut results = BTreeMap::new();
        let (key, value) = result(ScanCategory::Dependencies, "trivy-fs", payload);
        results.insert(key, value);

        let counts = summarize(&results)[&ScanCategory::Dependencies];
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.high, 1);
        assert_eq!(counts.info, 1);
    }

    #[test]
    fn trivy_config_reads_misconfigurations() {
        let payload = Payload::Json(json!({
            "Results": [{"Misconfigurations": [{"Severity": "MEDIUM"}]}]
        }));
        let mut results = BTreeMap::new();
        let (key, value) = result(ScanCategory::Iac, "trivy-config", payload);
        results.insert(key, value);

        assert_eq!(summarize(&results)[&ScanCategory::Iac].medium, 1);
    }

    #[test]
    fn checkov_counts_failed_checks() {
        let payload = Payload::Json(json!([
            {"results": {"failed_checks": [
                {"check_id": "CKV_1", "severity": "HIGH"},
                {"check_id": "CKV_2", "severity": null}
            ]}},
            {"results": {"passed_checks": []}}
        ]));
        let mut results = BTreeMap::new();
        let (key, value) = result(ScanCategory::Iac, "checkov", payload);
        results.insert(key, value);

        let counts = summarize(&results)[&ScanCategory::Iac];
        assert_eq!(counts.high, 1);
        assert_eq!(counts.info, 1);
    }

    #[test]
    fn grype_matches_are_bucketed() {
        let payload = Payload::Json(json!({
            "matches": [
                {"vulnerability": {"severity": "Critical"}},
                {"vulnerability": {"severity": "Negligible"}}
            ]
        }));
        let mut results = BTreeMap::new();
        let (key, value) = result(ScanCategory::Containers, "grype", payload);
        results.insert(key, value);

        let counts = summarize(&results)[&ScanCategory::Containers];
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.info, 1);
    }

    #[test]
    fn kubescape_score_factor_bands() {
        let payload = Payload::Json(json!({
            "summaryDetails": {"controls": {
                "C-0001": {"scoreFactor": 9.0, "ResourceCounters": {"failedResources": 2}},
                "C-0002": {"scoreFactor": 7.0, "ResourceCounters": {"failedResources": 1}},
                "C-0003": {"scoreFactor": 4.0, "ResourceCounters": {"failedResources": 1}},
                "C-0004": {"scoreFactor": 1.0, "ResourceCounters": {"failedResources": 1}},
                "C-0005": {"scoreFactor": 9.0, "ResourceCounters": {"failedResources": 0}}
            }}
        }));
        let mut results = BTreeMap::new();
        let (key, value) = result(ScanCategory::Helm, "kubescape", payload);
        results.insert(key, value);

        let counts = summarize(&results)[&ScanCategory::Helm];
        assert_eq!(counts.critical, 1);
        assert_eq!(counts.high, 1);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn helm_lint_error_lines_are_medium() {
        let text = "==> Linting ./chart\n[INFO] Chart.yaml: icon is recommended\n[ERROR] templates/: parse error\n[ERROR] values.yaml: invalid\n";
        let mut results = BTreeMap::new();
        let (key, value) = result(
            ScanCategory::Helm,
            "helm-lint",
            Payload::Text(text.to_owned()),
        );
        results.insert(key, value);

        assert_eq!(summarize(&results)[&ScanCategory::Helm].medium, 2);
    }

    #[test]
    fn hadolint_levels_from_json_payload() {
        let payload = Payload::Json(json!([
            {"level": "error"},
            {"level": "warning"},
            {"level": "style"}
        ]));
        let mut results = BTreeMap::new();
        let (key, value) = result(ScanCategory::Linting, "hadolint", payload);
        results.insert(key, value);

        let counts = summarize(&results)[&ScanCategory::Linting];
        assert_eq!(counts.high, 1);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.info, 1);
    }

    #[test]
    fn kubeaudit_ndjson_lines_are_bucketed() {
        // 줄 단위 JSON에 비JSON 잡음이 섞여도 해당 줄만 무시됩니다
        let text = concat!(
            r#"{"AuditResultName": "AppArmorAnnotationMissing", "level": "error"}"#,
            "\n",
            r#"{"AuditResultName": "LimitsNotSet", "level": "warning"}"#,
            "\n",
            "time=\"...\" level=info msg=\"starting audit\"\n",
            "\n",
        );
        let mut results = BTreeMap::new();
        let (key, value) = result(
            ScanCategory::Helm,
            "kubeaudit",
            Payload::Text(text.to_owned()),
        );
        results.insert(key, value);

        let counts = summarize(&results)[&ScanCategory::Helm];
        assert_eq!(counts.high, 1);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn consistency_conflicts_are_medium() {
        let payload = Payload::Json(json!([
            {"package": "libX", "versions": ["1.0", "2.0"]},
            {"package": "libZ", "versions": ["1.0", "3.0"]}
        ]));
        let mut results = BTreeMap::new();
        let (key, value) = result(ScanCategory::Consistency, "syft", payload);
        results.insert(key, value);

        assert_eq!(summarize(&results)[&ScanCategory::Consistency].medium, 2);
    }

    #[test]
    fn shape_mismatch_is_absorbed_to_zero() {
        let mut results = BTreeMap::new();
        for (category, tool, payload) in [
            (ScanCategory::Secrets, "gitleaks", Payload::Json(json!({"not": "array"}))),
            (ScanCategory::Dependencies, "trivy-fs", Payload::Json(json!(42))),
            (ScanCategory::Sast, "semgrep", Payload::Empty),
            (ScanCategory::Linting, "hadolint", Payload::Text("not json".to_owned())),
        ] {
            let (key, value) = result(category, tool, payload);
            results.insert(key, value);
        }

        let summary = summarize(&results);
        assert_eq!(summary.len(), 8);
        for counts in summary.values() {
            assert_eq!(counts.total(), 0);
        }
    }

    #[test]
    fn failed_units_contribute_zero() {
        let mut results = BTreeMap::new();
        let (key, mut value) = result(ScanCategory::Secrets, "gitleaks", Payload::Empty);
        value.status = palisade_core::types::ScanStatus::NotInstalled;
        results.insert(key, value);

        let summary = summarize(&results);
        assert_eq!(summary[&ScanCategory::Secrets].total(), 0);
    }
}

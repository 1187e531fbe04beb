//! 닫힌 도구 테이블
//!
//! 도구별 호출 규약(인자 템플릿, 제한 시간, 종료 코드 의미, 출력
//! 형식)을 한 곳에서 정의합니다. 유닛 실행기는 이 테이블만 보고
//! 모든 도구를 동일한 방식으로 다룹니다.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use palisade_core::types::ScanCategory;

/// 종료 코드 해석 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitMeaning {
    /// 0만 정상, 그 외는 전부 실패
    ZeroClean,
    /// 1은 "발견 있음"이며 크래시가 아님, 그 외 0이 아닌 코드는 실패
    OneMeansFindings,
    /// 2는 "발견 있음" (kubeaudit), 그 외 0이 아닌 코드는 실패
    TwoMeansFindings,
}

/// 출력 파싱 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// stdout의 JSON
    JsonStdout,
    /// stdout의 원시 텍스트
    TextStdout,
    /// 보고서 파일의 JSON (gitleaks)
    JsonReportFile,
    /// 보고서 파일의 XML을 JSON으로 정규화 (spotbugs)
    XmlReportFile,
}

/// 도구 하나의 호출 규약
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    /// 실행 파일 이름
    pub program: &'static str,
    /// 제한 시간
    pub timeout: Duration,
    /// 종료 코드 의미
    pub exit: ExitMeaning,
    /// 출력 형식
    pub output: OutputKind,
}

/// 지원되는 외부 도구의 닫힌 집합
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    /// gitleaks — 시크릿 탐지
    Gitleaks,
    /// trivy fs — 의존성 취약점
    TrivyFs,
    /// trivy config — IaC 설정 검사
    TrivyConfig,
    /// checkov — IaC 정책 검사
    Checkov,
    /// semgrep — SAST
    Semgrep,
    /// spotbugs — jar 바이트코드 SAST
    Spotbugs,
    /// trivy image — 컨테이너 이미지 취약점
    TrivyImage,
    /// grype — 컨테이너 이미지 취약점
    Grype,
    /// kubescape — Helm 차트 보안 프레임워크 검사
    Kubescape,
    /// kubeaudit — 렌더링된 매니페스트 보안 감사
    Kubeaudit,
    /// helm lint — 차트 린트
    HelmLint,
    /// hadolint — Dockerfile 린트
    Hadolint,
    /// syft — SBOM 생성
    Syft,
}

impl Tool {
    /// 결과 키와 설정 매칭에 사용하는 도구 이름
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Gitleaks => "gitleaks",
            Tool::TrivyFs => "trivy-fs",
            Tool::TrivyConfig => "trivy-config",
            Tool::Checkov => "checkov",
            Tool::Semgrep => "semgrep",
            Tool::Spotbugs => "spotbugs",
            Tool::TrivyImage => "trivy-image",
            Tool::Grype => "grype",
            Tool::Kubescape => "kubescape",
            Tool::Kubeaudit => "kubeaudit",
            Tool::HelmLint => "helm-lint",
            Tool::Hadolint => "hadolint",
            Tool::Syft => "syft",
        }
    }

    /// 도구가 속하는 스캔 카테고리
    pub fn category(&self) -> ScanCategory {
        match self {
            Tool::Gitleaks => ScanCategory::Secrets,
            Tool::Semgrep | Tool::Spotbugs => ScanCategory::Sast,
            Tool::TrivyFs => ScanCategory::Dependencies,
            Tool::TrivyConfig | Tool::Checkov => ScanCategory::Iac,
            Tool::TrivyImage | Tool::Grype => ScanCategory::Containers,
            Tool::Kubescape | Tool::Kubeaudit | Tool::HelmLint => ScanCategory::Helm,
            Tool::Hadolint => ScanCategory::Linting,
            Tool::Syft => ScanCategory::Consistency,
        }
    }

    /// 도구의 호출 규약
    pub fn spec(&self) -> ToolSpec {
        match self {
            Tool::Gitleaks => ToolSpec {
                program: "gitleaks",
                timeout: Duration::from_secs(1800),
                exit: ExitMeaning::OneMeansFindings,
                output: OutputKind::JsonReportFile,
            },
            Tool::TrivyFs => ToolSpec {
                program: "trivy",
                timeout: Duration::from_secs(600),
                exit: ExitMeaning::ZeroClean,
                output: OutputKind::JsonStdout,
            },
            Tool::TrivyConfig => ToolSpec {
                program: "trivy",
                timeout: Duration::from_secs(300),
                exit: ExitMeaning::ZeroClean,
                output: OutputKind::JsonStdout,
            },
            Tool::Checkov => ToolSpec {
                program: "checkov",
                timeout: Duration::from_secs(300),
                exit: ExitMeaning::OneMeansFindings,
                output: OutputKind::JsonStdout,
            },
            Tool::Semgrep => ToolSpec {
                program: "semgrep",
                timeout: Duration::from_secs(600),
                exit: ExitMeaning::OneMeansFindings,
                output: OutputKind::JsonStdout,
            },
            Tool::Spotbugs => ToolSpec {
                program: "spotbugs",
                timeout: Duration::from_secs(300),
                exit: ExitMeaning::ZeroClean,
                output: OutputKind::XmlReportFile,
            },
            Tool::TrivyImage => ToolSpec {
                program: "trivy",
                timeout: Duration::from_secs(600),
                exit: ExitMeaning::ZeroClean,
                output: OutputKind::JsonStdout,
            },
            Tool::Grype => ToolSpec {
                program: "grype",
                timeout: Duration::from_secs(600),
                exit: ExitMeaning::ZeroClean,
                output: OutputKind::JsonStdout,
            },
            Tool::Kubescape => ToolSpec {
                program: "kubescape",
                timeout: Duration::from_secs(300),
                exit: ExitMeaning::OneMeansFindings,
                output: OutputKind::JsonStdout,
            },
            Tool::Kubeaudit => ToolSpec {
                program: "kubeaudit",
                timeout: Duration::from_secs(60),
                exit: ExitMeaning::TwoMeansFindings,
                output: OutputKind::TextStdout,
            },
            Tool::HelmLint => ToolSpec {
                program: "helm",
                timeout: Duration::from_secs(60),
                exit: ExitMeaning::OneMeansFindings,
                output: OutputKind::TextStdout,
            },
            Tool::Hadolint => ToolSpec {
                program: "hadolint",
                timeout: Duration::from_secs(60),
                exit: ExitMeaning::OneMeansFindings,
                output: OutputKind::JsonStdout,
            },
            Tool::Syft => ToolSpec {
                program: "syft",
                timeout: Duration::from_secs(600),
                exit: ExitMeaning::ZeroClean,
                output: OutputKind::JsonStdout,
            },
        }
    }

    /// 대상에 대한 인자 목록을 만듭니다.
    ///
    /// `report_path`는 보고서 파일 출력이 필요한 도구(gitleaks,
    /// spotbugs)에만 사용됩니다.
    pub fn args(&self, target: &str, report_path: Option<&Path>) -> Vec<String> {
        let report = |p: Option<&Path>| {
            p.map(|p| p.display().to_string())
                .unwrap_or_else(|| "/dev/null".to_owned())
        };
        match self {
            Tool::Gitleaks => vec![
                "detect".into(),
                "--source".into(),
                target.into(),
                "--report-format".into(),
                "json".into(),
                "--report-path".into(),
                report(report_path),
                "--no-git".into(),
            ],
            Tool::TrivyFs => vec![
                "fs".into(),
                "--format".into(),
                "json".into(),
                "--scanners".into(),
                "vuln".into(),
                target.into(),
            ],
            Tool::TrivyConfig => vec![
                "config".into(),
                "--format".into(),
                "json".into(),
                target.into(),
            ],
            Tool::Checkov => vec![
                "--directory".into(),
                target.into(),
                "--output".into(),
                "json".into(),
                "--quiet".into(),
                "--skip-path".into(),
                "reports".into(),
            ],
            Tool::Semgrep => vec![
                "scan".into(),
                "--config".into(),
                "auto".into(),
                "--json".into(),
                target.into(),
            ],
            Tool::Spotbugs => vec![
                "-textui".into(),
                "-xml:withMessages".into(),
                "-output".into(),
                report(report_path),
                target.into(),
            ],
            Tool::TrivyImage => vec![
                "image".into(),
                "--format".into(),
                "json".into(),
                "--scanners".into(),
                "vuln".into(),
                target.into(),
            ],
            Tool::Grype => vec![target.into(), "--output".into(), "json".into()],
            Tool::Kubescape => vec![
                "scan".into(),
                "framework".into(),
                "nsa".into(),
                "--format".into(),
                "json".into(),
                target.into(),
            ],
            // 대상 차트는 stdin으로 들어오는 렌더링된 매니페스트입니다
            Tool::Kubeaudit => vec![
                "all".into(),
                "-f".into(),
                "-".into(),
                "--format".into(),
                "json".into(),
            ],
            Tool::HelmLint => vec!["lint".into(), target.into()],
            Tool::Hadolint => vec!["--format".into(), "json".into(), target.into()],
            Tool::Syft => vec![
                "packages".into(),
                format!("dir:{target}"),
                "-o".into(),
                "json".into(),
            ],
        }
    }

    /// 렌더링된 차트 매니페스트를 stdin으로 받는 도구인지 확인합니다.
    ///
    /// 해당 도구의 대상은 차트 디렉토리이며, 유닛 실행기가 먼저
    /// `helm template`으로 매니페스트를 렌더링하여 파이프로 넘깁니다.
    pub fn pipes_rendered_chart(&self) -> bool {
        matches!(self, Tool::Kubeaudit)
    }

    /// 보고서 파일이 필요한 도구인지 확인합니다.
    pub fn needs_report_file(&self) -> bool {
        matches!(
            self.spec().output,
            OutputKind::JsonReportFile | OutputKind::XmlReportFile
        )
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TOOLS: &[Tool] = &[
        Tool::Gitleaks,
        Tool::TrivyFs,
        Tool::TrivyConfig,
        Tool::Checkov,
        Tool::Semgrep,
        Tool::Spotbugs,
        Tool::TrivyImage,
        Tool::Grype,
        Tool::Kubescape,
        Tool::Kubeaudit,
        Tool::HelmLint,
        Tool::Hadolint,
        Tool::Syft,
    ];

    #[test]
    fn tool_names_are_unique() {
        let mut names: Vec<_> = ALL_TOOLS.iter().map(Tool::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_TOOLS.len());
    }

    #[test]
    fn every_tool_has_positive_timeout() {
        for tool in ALL_TOOLS {
            assert!(tool.spec().timeout > Duration::ZERO, "{tool}");
        }
    }

    #[test]
    fn secrets_scanner_has_longest_timeout() {
        let max = ALL_TOOLS
            .iter()
            .map(|t| t.spec().timeout)
            .max()
            .unwrap();
        assert_eq!(Tool::Gitleaks.spec().timeout, max);
    }

    #[test]
    fn findings_exit_tools_match_contract() {
        // 1이 "발견 있음"인 도구들
        for tool in [Tool::Checkov, Tool::Semgrep, Tool::Hadolint, Tool::Kubescape] {
            assert_eq!(tool.spec().exit, ExitMeaning::OneMeansFindings, "{tool}");
        }
        // 0이 아닌 코드가 전부 실패인 도구들
        for tool in [Tool::TrivyFs, Tool::TrivyImage, Tool::Grype, Tool::Syft] {
            assert_eq!(tool.spec().exit, ExitMeaning::ZeroClean, "{tool}");
        }
    }

    #[test]
    fn gitleaks_args_include_report_path() {
        let report = Path::new("/tmp/report.json");
        let args = Tool::Gitleaks.args("/repo", Some(report));
        assert!(args.contains(&"--no-git".to_owned()));
        assert!(args.contains(&"/tmp/report.json".to_owned()));
        assert!(args.contains(&"/repo".to_owned()));
    }

    #[test]
    fn kubeaudit_reads_manifests_from_stdin() {
        // 차트 디렉토리가 아니라 렌더링된 매니페스트를 파이프로 받습니다
        assert!(Tool::Kubeaudit.pipes_rendered_chart());
        let args = Tool::Kubeaudit.args("/repo/charts/app", None);
        assert_eq!(args, vec!["all", "-f", "-", "--format", "json"]);
        assert_eq!(Tool::Kubeaudit.spec().exit, ExitMeaning::TwoMeansFindings);
        assert_eq!(Tool::Kubeaudit.category(), ScanCategory::Helm);
    }

    #[test]
    fn only_kubeaudit_pipes_rendered_charts() {
        for tool in ALL_TOOLS {
            assert_eq!(
                tool.pipes_rendered_chart(),
                *tool == Tool::Kubeaudit,
                "{tool}"
            );
        }
    }

    #[test]
    fn hadolint_emits_json_to_stdout() {
        assert_eq!(Tool::Hadolint.spec().output, OutputKind::JsonStdout);
        let args = Tool::Hadolint.args("/repo/Dockerfile", None);
        assert!(args.contains(&"--format".to_owned()));
        assert!(args.contains(&"json".to_owned()));
    }

    #[test]
    fn syft_args_use_dir_scheme() {
        let args = Tool::Syft.args("/repo", None);
        assert!(args.contains(&"dir:/repo".to_owned()));
    }

    #[test]
    fn trivy_variants_share_program() {
        assert_eq!(Tool::TrivyFs.spec().program, "trivy");
        assert_eq!(Tool::TrivyConfig.spec().program, "trivy");
        assert_eq!(Tool::TrivyImage.spec().program, "trivy");
        // 하지만 결과 키는 서로 다릅니다
        assert_ne!(Tool::TrivyFs.name(), Tool::TrivyImage.name());
    }

    #[test]
    fn categories_cover_all_eight() {
        let mut categories: Vec<_> = ALL_TOOLS.iter().map(Tool::category).collect();
        categories.sort_unstable();
        categories.dedup();
        assert_eq!(categories.len(), ScanCategory::ALL.len());
    }
}

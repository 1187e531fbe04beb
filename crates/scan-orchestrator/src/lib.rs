//! # palisade-scan-orchestrator
//!
//! 외부 보안 도구를 스캔 유닛으로 감싸 두 스테이지로 편성하고,
//! 결과를 고정된 심각도 모델로 집계하는 크레이트입니다.
//!
//! # Module Structure
//!
//! - [`tool`]: 닫힌 도구 테이블 (`Tool`, `ToolSpec`, 종료 코드 의미)
//! - [`unit`]: 스캔 유닛 실행 (`ScanUnit`, 제한 시간, 출력 파싱)
//! - [`spotbugs`]: SpotBugs XML 보고서의 JSON 정규화
//! - [`conflict`]: SBOM 다이아몬드 의존성 충돌 탐지
//! - [`summary`]: 카테고리별 심각도 집계 (`summarize`)
//! - [`orchestrator`]: 스테이지 편성과 병렬 실행 (`ScanOrchestrator`)
//!
//! # Architecture
//!
//! ```text
//! ArtifactInventory --> ScanOrchestrator
//!                            |
//!              source stage (secrets, sast, dependencies, iac)
//!                            |
//!              artifact stage (containers, helm, linting, consistency)
//!                            |
//!                  BTreeMap<ResultKey, ScanResult>
//!                            |
//!                        summarize --> BTreeMap<ScanCategory, SeverityCounts>
//! ```
//!
//! 한 유닛의 실패·시간 초과·도구 부재는 결과로 기록될 뿐 형제 유닛을
//! 막지 않습니다. 오케스트레이터 밖으로 나가는 에러는 없습니다.

pub mod conflict;
pub mod orchestrator;
pub mod spotbugs;
pub mod summary;
pub mod tool;
pub mod unit;

// --- Public API Re-exports ---

pub use conflict::{detect_conflicts, parse_syft_packages};
pub use orchestrator::{ScanOrchestrator, ScanResults};
pub use summary::summarize;
pub use tool::{ExitMeaning, OutputKind, Tool, ToolSpec};
pub use unit::ScanUnit;

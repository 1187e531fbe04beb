//! # palisade-artifact-resolver
//!
//! 저장소 트리를 한 번 순회하여 스캔 대상 아티팩트를 수집하고,
//! Maven 모듈 선언으로부터 빌드 그래프를 계산하여 루트 빌드만
//! 실행하도록 만드는 크레이트입니다.
//!
//! # Module Structure
//!
//! - [`inventory`]: 아티팩트 인벤토리 (`ArtifactInventory`)
//! - [`detector`]: 트리 순회 및 분류 (`ArtifactResolver`)
//! - [`maven`]: pom.xml `<module>` 선언 파싱
//! - [`graph`]: 빌드 그래프와 루트 집합 계산
//!
//! # Architecture
//!
//! ```text
//! repository root --> ArtifactResolver::detect --> ArtifactInventory
//!                                                       |
//!                                       BuildDescriptor 목록 (pom.xml 파싱 포함)
//!                                                       |
//!                                             compute_build_roots
//!                                                       |
//!                                       루트 빌드만 build-executor로 전달
//! ```

pub mod detector;
pub mod graph;
pub mod inventory;
pub mod maven;

// --- Public API Re-exports ---

pub use detector::ArtifactResolver;
pub use graph::compute_build_roots;
pub use inventory::ArtifactInventory;
pub use maven::parse_declared_modules;

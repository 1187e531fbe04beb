//! # palisade-build-executor
//!
//! 루트 빌드 기술자에 대해 Maven/Gradle 빌드를 실행하고,
//! Dockerfile마다 컨테이너 이미지를 빌드한 뒤, 산출물을 다시
//! 탐지하여 인벤토리에 추가하는 크레이트입니다.
//!
//! # Module Structure
//!
//! - [`report`]: 빌드 결과 타입 (`BuildReport`, `BuildRun`, `BuildOutcome`)
//! - [`runner`]: Maven/Gradle 빌드 실행 (`BuildExecutor`)
//! - [`image`]: Dockerfile별 이미지 빌드 및 이름 규칙
//!
//! 빌드 실패는 파이프라인을 중단시키지 않습니다. 결과는 기록되고,
//! 이후 아티팩트 스테이지는 그때까지 존재하는 산출물로 진행합니다.

pub mod image;
pub mod report;
pub mod runner;

// --- Public API Re-exports ---

pub use image::image_name_for;
pub use report::{BuildOutcome, BuildReport, BuildRun, ImageBuild};
pub use runner::BuildExecutor;

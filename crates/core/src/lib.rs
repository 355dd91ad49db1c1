#![doc = include_str!("../README.md")]

pub mod config;
pub mod digest;
pub mod error;
pub mod fixture;
pub mod sut;
pub mod trace;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, FixtureError, HarnessError, LifecycleError, ProbeError};

// 설정
pub use config::HarnessConfig;

// 도메인 타입
pub use types::{Outcome, ParsedResponse, SizeTestCase, Tally, TestCase, Verdict};

// SUT 확장 포인트
pub use sut::{
    AdaptationMode, BoxFuture, PreviewPolicy, ProbeInvoker, ProbeRequest, RawTrace, SutLifecycle,
};

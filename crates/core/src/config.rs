//! 설정 관리 — icaptest.toml 파싱 및 런타임 설정
//!
//! [`HarnessConfig`]는 하네스 자체의 설정입니다. SUT가 읽는
//! `config.toml`(서비스 → 키 → 값 문서)과는 별개이며, 그 문서는
//! `icaptest-lifecycle`의 스냅샷 계층이 다룹니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`ICAPTEST_SUT_PORT=1345` 형식)
//! 2. 설정 파일 (`icaptest.toml`)
//! 3. 기본값 (`Default` 구현)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HarnessError};

/// Icaptest 통합 설정
///
/// `icaptest.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// SUT 프로세스/주소 설정
    #[serde(default)]
    pub sut: SutConfig,
    /// 외부 프로브 클라이언트 설정
    #[serde(default)]
    pub probe: ProbeConfig,
    /// 픽스처 경로 설정
    #[serde(default)]
    pub fixtures: FixturesConfig,
}

impl HarnessConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HarnessError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HarnessError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HarnessError> {
        toml::from_str(toml_str).map_err(|e| {
            HarnessError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 네이밍 규칙: `ICAPTEST_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "ICAPTEST_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "ICAPTEST_GENERAL_LOG_FORMAT");

        // SUT
        override_string(&mut self.sut.binary, "ICAPTEST_SUT_BINARY");
        override_string(&mut self.sut.process_name, "ICAPTEST_SUT_PROCESS_NAME");
        override_string(&mut self.sut.config_path, "ICAPTEST_SUT_CONFIG_PATH");
        override_string(&mut self.sut.host, "ICAPTEST_SUT_HOST");
        override_u16(&mut self.sut.port, "ICAPTEST_SUT_PORT");
        override_u64(&mut self.sut.ready_timeout_ms, "ICAPTEST_SUT_READY_TIMEOUT_MS");
        override_u64(&mut self.sut.ready_poll_ms, "ICAPTEST_SUT_READY_POLL_MS");

        // Probe
        override_string(&mut self.probe.client, "ICAPTEST_PROBE_CLIENT");
        override_string(&mut self.probe.request_url, "ICAPTEST_PROBE_REQUEST_URL");
        override_u32(
            &mut self.probe.over_limit_preview,
            "ICAPTEST_PROBE_OVER_LIMIT_PREVIEW",
        );
        override_u32(
            &mut self.probe.mid_file_preview,
            "ICAPTEST_PROBE_MID_FILE_PREVIEW",
        );

        // Fixtures
        override_string(&mut self.fixtures.dir, "ICAPTEST_FIXTURES_DIR");
        override_string(
            &mut self.fixtures.service_cases,
            "ICAPTEST_FIXTURES_SERVICE_CASES",
        );
        override_string(&mut self.fixtures.size_cases, "ICAPTEST_FIXTURES_SIZE_CASES");
        override_string(
            &mut self.fixtures.service_probe_file,
            "ICAPTEST_FIXTURES_SERVICE_PROBE_FILE",
        );
        override_string(
            &mut self.fixtures.output_file,
            "ICAPTEST_FIXTURES_OUTPUT_FILE",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.sut.binary.is_empty() {
            return Err(invalid("sut.binary", "must not be empty"));
        }
        if self.sut.process_name.is_empty() {
            return Err(invalid("sut.process_name", "must not be empty"));
        }
        if self.sut.port == 0 {
            return Err(invalid("sut.port", "must not be 0"));
        }
        if self.sut.ready_timeout_ms == 0 {
            return Err(invalid("sut.ready_timeout_ms", "must not be 0"));
        }
        if self.sut.ready_poll_ms == 0 {
            return Err(invalid("sut.ready_poll_ms", "must not be 0"));
        }

        if self.probe.client.is_empty() {
            return Err(invalid("probe.client", "must not be empty"));
        }
        if self.probe.mid_file_preview == 0 {
            return Err(invalid(
                "probe.mid_file_preview",
                "must not be 0 (use the explicit zero-window sweep instead)",
            ));
        }

        if self.fixtures.dir.is_empty() {
            return Err(invalid("fixtures.dir", "must not be empty"));
        }
        if self.fixtures.size_limit_bytes <= 0 {
            return Err(invalid("fixtures.size_limit_bytes", "must be positive"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> HarnessError {
    HarnessError::Config(ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    })
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// SUT 프로세스/주소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SutConfig {
    /// SUT 실행 파일 경로
    pub binary: String,
    /// 잔여 프로세스 강제 종료에 쓰는 프로세스 이름
    pub process_name: String,
    /// SUT 자체 설정 파일 경로 (변경/복원 대상)
    pub config_path: String,
    /// ICAP 수신 호스트
    pub host: String,
    /// ICAP 수신 포트
    pub port: u16,
    /// 준비 대기 하드 타임아웃 (ms)
    pub ready_timeout_ms: u64,
    /// 준비 폴링 간격 (ms)
    pub ready_poll_ms: u64,
}

impl Default for SutConfig {
    fn default() -> Self {
        Self {
            binary: "./icapeg".to_owned(),
            process_name: "icapeg".to_owned(),
            config_path: "config.toml".to_owned(),
            host: "127.0.0.1".to_owned(),
            port: 1344,
            ready_timeout_ms: 30_000,
            ready_poll_ms: 250,
        }
    }
}

impl SutConfig {
    /// `host:port` 주소 문자열
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 외부 프로브 클라이언트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// ICAP 클라이언트 실행 파일
    pub client: String,
    /// 요청 적응 모드에서 사용할 대상 URL
    pub request_url: String,
    /// 프로토콜 한계 초과 프리뷰 창 (바이트)
    pub over_limit_preview: u32,
    /// 파일 크기 전후를 가로지르는 프리뷰 창 (바이트)
    pub mid_file_preview: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            client: "c-icap-client".to_owned(),
            request_url: "http://www.example.com".to_owned(),
            over_limit_preview: 2048,
            mid_file_preview: 100,
        }
    }
}

/// 픽스처 경로 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    /// 픽스처 디렉토리
    pub dir: String,
    /// 서비스 이름 픽스처 파일 (dir 기준)
    pub service_cases: String,
    /// 파일 크기 매니페스트 파일 (dir 기준)
    pub size_cases: String,
    /// 서비스 이름 스위프에 사용할 입력 파일 (dir 기준)
    pub service_probe_file: String,
    /// 적응 결과 캡처 파일 경로
    pub output_file: String,
    /// 크기 제한 블록에서 SUT에 설정하는 max_filesize 값 (바이트).
    /// 매니페스트의 기대 결과 토큰은 이 한계를 기준으로 작성됩니다.
    pub size_limit_bytes: i64,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            dir: "testdata".to_owned(),
            service_cases: "service_name.csv".to_owned(),
            size_cases: "test_size.csv".to_owned(),
            service_probe_file: "book.pdf".to_owned(),
            output_file: "testdata/output".to_owned(),
            size_limit_bytes: 100,
        }
    }
}

impl FixturesConfig {
    /// 서비스 이름 픽스처의 전체 경로
    pub fn service_cases_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.service_cases)
    }

    /// 파일 크기 매니페스트의 전체 경로
    pub fn size_cases_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.size_cases)
    }

    /// 스위프 입력 파일의 전체 경로
    pub fn input_path(&self, file_name: &str) -> PathBuf {
        Path::new(&self.dir).join(file_name)
    }

    /// 서비스 이름 스위프 입력 파일의 전체 경로
    pub fn service_probe_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.service_probe_file)
    }

    /// 캡처 파일의 전체 경로
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_file)
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

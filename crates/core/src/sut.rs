//! SUT 확장 포인트 — 프로브 호출과 생명주기 제어 trait
//!
//! 외부 ICAP 클라이언트 실행은 [`ProbeInvoker`] 뒤에, SUT 프로세스
//! 제어는 [`SutLifecycle`] 뒤에 추상화됩니다. 오케스트레이터는 두
//! trait 객체만 알기 때문에 실제 SUT 없이도 (녹음된 추적을 돌려주는
//! 대역으로) 하네스 자체를 테스트할 수 있습니다.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::error::{HarnessError, ProbeError};

/// `Box<dyn …>` 컬렉션에 담기 위한 dyn 호환 퓨처 별칭
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 적응 모드 — 응답 적응(RESPMOD) 또는 요청 적응(REQMOD)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdaptationMode {
    /// 응답 본문 적응
    Respmod,
    /// 요청 본문 적응. 클라이언트에 전달할 대상 URL을 포함합니다.
    Reqmod {
        /// `-req`로 전달되는 대상 URL
        url: String,
    },
}

impl fmt::Display for AdaptationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Respmod => write!(f, "response"),
            Self::Reqmod { .. } => write!(f, "request"),
        }
    }
}

/// 클라이언트 측 프리뷰 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewPolicy {
    /// 플래그 없음 — 클라이언트 기본 협상
    ClientDefault,
    /// `-nopreview` — 프리뷰 비활성화
    Disabled,
    /// `-w <n>` — 명시적 프리뷰 창 (0 포함)
    Window(u32),
}

/// 프로브 교환 하나의 파라미터
///
/// 빌더 스타일 setter로 조립합니다. 기본값: 응답 모드, 204 허용,
/// 클라이언트 기본 프리뷰, 메서드 지정 없음.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// 대상 ICAP 서비스 이름
    pub service: String,
    /// 전송할 입력 파일
    pub input_file: PathBuf,
    /// 적응 결과를 받을 캡처 파일
    pub output_file: PathBuf,
    /// 적응 모드
    pub mode: AdaptationMode,
    /// 204 (무수정) 협상 지름길 허용 여부
    pub allow_204: bool,
    /// 프리뷰 정책
    pub preview: PreviewPolicy,
    /// HTTP 메서드 라벨. 검증 목적상 비표준 토큰도 그대로 전달됩니다.
    pub method: Option<String>,
}

impl ProbeRequest {
    /// 기본값으로 요청을 만듭니다.
    pub fn new(
        service: impl Into<String>,
        input_file: impl Into<PathBuf>,
        output_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            service: service.into(),
            input_file: input_file.into(),
            output_file: output_file.into(),
            mode: AdaptationMode::Respmod,
            allow_204: true,
            preview: PreviewPolicy::ClientDefault,
            method: None,
        }
    }

    /// 적응 모드를 지정합니다.
    pub fn mode(mut self, mode: AdaptationMode) -> Self {
        self.mode = mode;
        self
    }

    /// 204 협상 지름길을 비활성화합니다 (`-no204`).
    pub fn no_204(mut self) -> Self {
        self.allow_204 = false;
        self
    }

    /// 프리뷰 정책을 지정합니다.
    pub fn preview(mut self, preview: PreviewPolicy) -> Self {
        self.preview = preview;
        self
    }

    /// HTTP 메서드 라벨을 지정합니다.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

/// 프로브 호출 한 번이 남긴 진단 추적
///
/// 순서가 보존된 텍스트 라인들입니다. 파서가 즉시 소비하며 보존되지
/// 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTrace {
    lines: Vec<String>,
}

impl RawTrace {
    /// 클라이언트가 남긴 바이트 스트림에서 추적을 만듭니다.
    ///
    /// UTF-8이 아닌 바이트는 손실 변환하고, 탭 문자를 제거한 뒤
    /// 라인 단위로 나눕니다 (CRLF 정규화 포함).
    pub fn from_bytes(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw).replace('\t', "");
        let lines = text
            .lines()
            .map(|line| line.trim_end_matches('\r').to_owned())
            .collect();
        Self { lines }
    }

    /// 준비된 라인들로 추적을 만듭니다 (테스트 대역용).
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// 라인 이터레이터
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// 추적이 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// 외부 프로브 호출 능력
///
/// 프로덕션 구현은 외부 ICAP 클라이언트를 실행하고, 테스트 대역은
/// 준비된 추적을 돌려줍니다.
pub trait ProbeInvoker: Send + Sync {
    /// 교환 하나를 실행하고 진단 추적을 돌려줍니다.
    ///
    /// SUT가 교환을 거부해도 에러가 아닙니다 — 추적에 상태 라인이
    /// 없으면 파서가 센티널을 돌려주고 검증이 실패로 집계됩니다.
    fn invoke<'a>(&'a self, req: &'a ProbeRequest) -> BoxFuture<'a, Result<RawTrace, ProbeError>>;
}

/// SUT 생명주기 제어 능력
///
/// 어떤 전이 후에도 SUT 인스턴스는 정확히 하나만 살아 있어야 합니다.
/// 모든 전이는 동기적(완료까지 await)입니다. `reconfigure`는 변경 직전
/// 설정의 스냅샷을 쌓고, `restore`는 가장 최근 스냅샷을 바이트 그대로
/// 되돌립니다 — 즉 reconfigure/restore는 LIFO로 1:1 짝을 이루며,
/// 실행이 끝나기 전에 [`pending_restores`](Self::pending_restores)가
/// 0이 되어야 합니다.
pub trait SutLifecycle: Send {
    /// SUT를 백그라운드로 기동하고 준비될 때까지 기다립니다.
    fn start(&mut self) -> BoxFuture<'_, Result<(), HarnessError>>;

    /// 설정 키 하나를 변경하고 SUT를 재기동합니다.
    fn reconfigure<'a>(
        &'a mut self,
        service: &'a str,
        key: &'a str,
        value: toml::Value,
    ) -> BoxFuture<'a, Result<(), HarnessError>>;

    /// 가장 최근 스냅샷을 되돌리고 SUT를 재기동합니다.
    fn restore(&mut self) -> BoxFuture<'_, Result<(), HarnessError>>;

    /// 아직 복원되지 않은 reconfigure 에포크 수
    fn pending_restores(&self) -> usize;

    /// SUT를 종료합니다 (재기동 없음, 실행 종료 시점).
    fn shutdown(&mut self) -> BoxFuture<'_, Result<(), HarnessError>>;
}

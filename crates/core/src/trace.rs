//! 추적 파싱 — 프로브 진단 출력에서 ICAP 상태와 캐시 태그 추출
//!
//! 파싱은 best-effort이며 절대 에러를 내지 않습니다. 기대한 라인이
//! 없다는 것은 (대개 실패하는) 유효한 결과이지 예외 상황이 아닙니다.

use crate::sut::RawTrace;
use crate::types::ParsedResponse;

/// ICAP 상태 라인 접두사
const STATUS_PREFIX: &str = "ICAP/1.0 ";

/// 캐시 태그 헤더 접두사
const ISTAG_PREFIX: &str = "ISTag:";

/// 상태 코드의 고정 폭 (3자리)
const STATUS_CODE_WIDTH: usize = 3;

/// 추적에서 첫 번째 ICAP 상태 라인을 찾아 코드와 메시지를 추출합니다.
///
/// 상태 라인이 없거나 코드 영역보다 짧으면 `No output` 센티널 쌍을
/// 돌려줍니다 (형식 오류 ≡ 부재).
pub fn parse_status(trace: &RawTrace) -> ParsedResponse {
    for line in trace.lines() {
        let Some(rest) = line.strip_prefix(STATUS_PREFIX) else {
            continue;
        };
        if rest.len() < STATUS_CODE_WIDTH || !rest.is_char_boundary(STATUS_CODE_WIDTH) {
            return ParsedResponse::no_output();
        }
        let code = &rest[..STATUS_CODE_WIDTH];
        let message = rest
            .get(STATUS_CODE_WIDTH + 1..)
            .unwrap_or_default()
            .trim();
        return ParsedResponse::new(code, message);
    }
    ParsedResponse::no_output()
}

/// 추적에서 첫 번째 `ISTag` 헤더 라인을 찾아 태그 값을 돌려줍니다.
///
/// 값을 둘러싼 따옴표는 제거합니다. 라인이 없으면 `None`입니다.
pub fn parse_istag(trace: &RawTrace) -> Option<String> {
    for line in trace.lines() {
        let Some(rest) = line.strip_prefix(ISTAG_PREFIX) else {
            continue;
        };
        let value = rest.trim().trim_matches('"');
        return Some(value.to_owned());
    }
    None
}

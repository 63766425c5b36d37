//! 일상 대화 판별 모듈
//!
//! 인사/잡담/작별 인사는 검색 없이 소형 모델로 바로 응답합니다.

use std::sync::OnceLock;

use regex::Regex;

/// 인사, 잡담, 작별 패턴
const CASUAL_PATTERNS: &[&str] = &[
    r"\b(hi|hello|hey|hola|namaste|vanakkam)\b",
    r"\b(how are you|how r u|whats up|sup|wassup)\b",
    r"\b(good morning|good evening|good afternoon)\b",
    r"\b(ela unnav|ela unnaav|baagunnava|ela undi)\b",
    r"\b(thank you|thanks|bye|goodbye|see you)\b",
];

/// 짧은 입력에서 찾는 인사 단어
const GREETING_TOKENS: &[&str] = &["hi", "hello", "hey", "ela"];

/// 짧은 입력 기준 (단어 수)
const SHORT_INPUT_MAX_WORDS: usize = 3;

fn casual_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        CASUAL_PATTERNS
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)).expect("Invalid casual regex"))
            .collect()
    })
}

/// 인사/잡담 여부 판별
///
/// 패턴이 하나라도 맞으면 `true`. 아니면 3단어 이하이면서
/// 인사 단어를 부분 문자열로 포함할 때 `true`입니다 (`hii`, `heyyy` 등).
pub fn is_casual(text: &str) -> bool {
    let lower = text.trim().to_lowercase();

    if casual_patterns().iter().any(|re| re.is_match(&lower)) {
        return true;
    }

    lower.split_whitespace().count() <= SHORT_INPUT_MAX_WORDS
        && GREETING_TOKENS.iter().any(|g| lower.contains(g))
}

// ============================================================================
// Tests
// ============================================================================

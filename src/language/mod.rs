//! 언어 분류 모듈 - 영어 / 텔루구어(문자) / 텔루구어(로마자 표기)
//!
//! 1. `whatlang` 통계 감지로 텔루구 문자 여부 확인
//! 2. 실패하거나 텔루구어가 아니면 로마자 텔루구어 정규식 검사
//! 3. 둘 다 아니면 영어
//!
//! 휴리스틱이므로 오탐/미탐이 있을 수 있습니다.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// 로마자 텔루구어 단어/대명사 패턴 (순서 무관, 하나라도 맞으면 판정)
const TRANSLITERATED_PATTERNS: &[&str] = &[
    r"\b(ela|ela unnav|em cheyali|em chesav|baagunnava|eppudu|ekkada|entha|enduku)\b",
    r"\b(nenu|meeru|memu|vaaru|iddaru|mana|mi|na)\b",
    r"\b(cheppu|cheppandi|help|kavali|undi|ledhu|avunu|kadhu)\b",
];

// ============================================================================
// DetectedLanguage
// ============================================================================

/// 요청별로 판정되는 입력 언어
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedLanguage {
    English,
    TeluguNative,
    TeluguTransliterated,
}

impl DetectedLanguage {
    /// 언어 코드 (`en`, `te`, `te_transliterated`)
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::TeluguNative => "te",
            Self::TeluguTransliterated => "te_transliterated",
        }
    }

    /// 언어 코드 파싱. 알 수 없는 코드는 영어로 처리합니다.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "te" => Self::TeluguNative,
            "te_transliterated" => Self::TeluguTransliterated,
            _ => Self::English,
        }
    }

    /// 텔루구어 계열 여부
    pub fn is_telugu(self) -> bool {
        matches!(self, Self::TeluguNative | Self::TeluguTransliterated)
    }
}

impl fmt::Display for DetectedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// Statistical Detection
// ============================================================================

/// 통계적 언어 감지 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptDetection {
    /// 텔루구어로 확인됨
    Telugu,
    /// 다른 언어로 감지됨
    Other(whatlang::Lang),
    /// 판단 불가 (빈 입력, 너무 짧은 입력 등)
    Inconclusive,
}

/// `whatlang`으로 언어 감지
pub fn detect_script(text: &str) -> ScriptDetection {
    match whatlang::detect(text) {
        Some(info) if info.lang() == whatlang::Lang::Tel => ScriptDetection::Telugu,
        Some(info) => ScriptDetection::Other(info.lang()),
        None => ScriptDetection::Inconclusive,
    }
}

// ============================================================================
// Classifier
// ============================================================================

fn transliterated_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        TRANSLITERATED_PATTERNS
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)).expect("Invalid transliteration regex"))
            .collect()
    })
}

/// 로마자 텔루구어 패턴 일치 여부
pub fn looks_transliterated(text: &str) -> bool {
    let lower = text.to_lowercase();
    transliterated_patterns().iter().any(|re| re.is_match(&lower))
}

/// 입력 텍스트의 언어 판정
pub fn classify(text: &str) -> DetectedLanguage {
    match detect_script(text) {
        ScriptDetection::Telugu => return DetectedLanguage::TeluguNative,
        ScriptDetection::Other(lang) => {
            tracing::trace!("Statistical detection reported {:?}", lang);
        }
        ScriptDetection::Inconclusive => {
            tracing::debug!("Language detection inconclusive, falling back to patterns");
        }
    }

    if looks_transliterated(text) {
        DetectedLanguage::TeluguTransliterated
    } else {
        DetectedLanguage::English
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transliterated_telugu() {
        assert_eq!(classify("ela unnav"), DetectedLanguage::TeluguTransliterated);
        assert_eq!(
            classify("nenu doctor ni kalavali"),
            DetectedLanguage::TeluguTransliterated
        );
    }

    #[test]
    fn test_native_telugu() {
        assert_eq!(
            classify("నాకు జ్వరం మరియు తలనొప్పి ఉంది, నేను ఏమి చేయాలి?"),
            DetectedLanguage::TeluguNative
        );
    }

    #[test]
    fn test_english() {
        assert_eq!(
            classify("What are the common symptoms of diabetes?"),
            DetectedLanguage::English
        );
    }

    #[test]
    fn test_empty_input_is_english() {
        assert_eq!(detect_script(""), ScriptDetection::Inconclusive);
        assert_eq!(classify(""), DetectedLanguage::English);
        assert_eq!(classify("   \n\t "), DetectedLanguage::English);
    }

    #[test]
    fn test_patterns_are_case_insensitive() {
        assert!(looks_transliterated("ELA Unnav"));
        assert!(looks_transliterated("Meeru Cheppandi"));
    }

    #[test]
    fn test_patterns_respect_word_boundaries() {
        // "mi"/"na"가 단어 중간에 있으면 일치하지 않아야 함
        assert!(!looks_transliterated("vitamin deficiency"));
        assert!(!looks_transliterated("banana"));
    }

    #[test]
    fn test_language_codes() {
        for lang in [
            DetectedLanguage::English,
            DetectedLanguage::TeluguNative,
            DetectedLanguage::TeluguTransliterated,
        ] {
            assert_eq!(DetectedLanguage::from_code(lang.code()), lang);
        }
        assert_eq!(DetectedLanguage::from_code("fr"), DetectedLanguage::English);
        assert!(DetectedLanguage::TeluguTransliterated.is_telugu());
        assert!(!DetectedLanguage::English.is_telugu());
    }
}

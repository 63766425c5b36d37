//! 프롬프트 조립 모듈
//!
//! 언어별 시스템 프롬프트 템플릿에 대화 기록, 질문, 검색 문맥을 채워 넣습니다.
//! 템플릿은 응답 길이(1-2문장)와 문장 중간 종료 금지를 지시하지만,
//! 생성 결과를 후처리하거나 자르지는 않습니다.

use crate::language::DetectedLanguage;

/// 대화 기록 슬롯
pub const SLOT_CHAT_HISTORY: &str = "{chat_history}";
/// 사용자 질문 슬롯
pub const SLOT_USER_INPUT: &str = "{user_input}";
/// 검색 문맥 슬롯
pub const SLOT_CONTEXT: &str = "{context}";

const SLOTS: [&str; 3] = [SLOT_CHAT_HISTORY, SLOT_USER_INPUT, SLOT_CONTEXT];

const ENGLISH_TEMPLATE: &str = "\
You are a knowledgeable AI medical assistant.
Your name is Meetocure AI Assistant.
Always reply clearly in English.
Keep the answer short (1-2 sentences) but meaningful.

Previous conversation:
{chat_history}

Question:
{user_input}

Context information from documents:
{context}

Instructions:
- Answer only in English.
- Keep the answer short (1-2 sentences) but complete.
- Never stop in the middle of a sentence.
- Explain complex medical terms in simple words.

Your Answer:
";

const TELUGU_TEMPLATE: &str = "\
మీరు ఒక జ్ఞానపూర్వక AI వైద్య సహాయకుడిగా వ్యవహరించాలి.
ఎల్లప్పుడూ తెలుగు లో స్పష్టంగా మరియు స్నేహపూర్వకంగా సమాధానం ఇవ్వండి.
సమాధానం చిన్నదిగా (1-2 వాక్యాలు) కానీ అర్థవంతంగా ఉండాలి.

మునుపటి సంభాషణ:
{chat_history}

ప్రశ్న:
{user_input}

పత్రాల నుండి సందర్భ సమాచారం:
{context}

సూచనలు:
- తెలుగు లోనే సమాధానం ఇవ్వాలి.
- సమాధానం చిన్నదిగా (1-2 వాక్యాలు) కానీ పూర్తిగా ఉండాలి.
- ఎప్పుడూ వాక్యం మధ్యలో ఆపకండి.
- క్లిష్ట పదాలను సులభంగా వివరించాలి.

మీ సమాధానం:
";

// ============================================================================
// PromptTemplate
// ============================================================================

/// 언어별 프롬프트 템플릿
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    English,
    /// 텔루구 문자와 로마자 표기가 공유
    Telugu,
}

impl PromptTemplate {
    /// 판정된 언어에 맞는 템플릿 선택
    pub fn for_language(language: DetectedLanguage) -> Self {
        match language {
            DetectedLanguage::TeluguNative | DetectedLanguage::TeluguTransliterated => {
                Self::Telugu
            }
            DetectedLanguage::English => Self::English,
        }
    }

    /// 언어 코드로 템플릿 선택. 알 수 없는 코드는 영어 템플릿.
    pub fn for_code(code: &str) -> Self {
        Self::for_language(DetectedLanguage::from_code(code))
    }

    /// 템플릿 원문
    pub fn text(self) -> &'static str {
        match self {
            Self::English => ENGLISH_TEMPLATE,
            Self::Telugu => TELUGU_TEMPLATE,
        }
    }

    /// 슬롯을 채워 프롬프트 생성
    ///
    /// 한 번의 순회로 치환하므로 값 안에 슬롯 문자열이 있어도 다시 치환되지 않습니다.
    pub fn render(self, chat_history: &str, user_input: &str, context: &str) -> String {
        let template = self.text();
        let mut out =
            String::with_capacity(template.len() + chat_history.len() + user_input.len() + context.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];

            let value = if tail.starts_with(SLOT_CHAT_HISTORY) {
                Some((SLOT_CHAT_HISTORY, chat_history))
            } else if tail.starts_with(SLOT_USER_INPUT) {
                Some((SLOT_USER_INPUT, user_input))
            } else if tail.starts_with(SLOT_CONTEXT) {
                Some((SLOT_CONTEXT, context))
            } else {
                None
            };

            match value {
                Some((slot, value)) => {
                    out.push_str(value);
                    rest = &tail[slot.len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// 언어에 맞는 시스템 프롬프트 생성
pub fn build(
    user_input: &str,
    chat_history: &str,
    context: &str,
    language: DetectedLanguage,
) -> String {
    PromptTemplate::for_language(language).render(chat_history, user_input, context)
}

// ============================================================================
// Tests
// ============================================================================

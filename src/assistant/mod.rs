//! 의료 상담 어시스턴트 - 분류 → (검색) → 생성 → 기록
//!
//! 호출자가 직접 생성하고 소유합니다. 여러 사용자가 하나의 인스턴스를 공유하려면
//! 호출자가 동기화해야 합니다 (`server` 모듈은 `Mutex`로 감쌉니다).
//!
//! ```text
//! respond(text)
//!   ├─ language::classify
//!   ├─ casual::is_casual ── yes ─▶ fast model(user text)
//!   └─ no ─▶ retriever(top_k) ─▶ prompt::build ─▶ medical model(system + user)
//!   └─ record turn (성공 시에만)
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::casual;
use crate::knowledge::{join_passages, Retriever};
use crate::language::{self, DetectedLanguage};
use crate::llm::{ChatMessage, ChatModel, LlmError};
use crate::memory::ConversationMemory;
use crate::prompt;

/// 기본 검색 구절 수
pub const DEFAULT_TOP_K: usize = 5;

/// 영어 사과 메시지
pub const APOLOGY_EN: &str = "Sorry, I couldn't process your request right now. Please try again.";
/// 텔루구어 사과 메시지
pub const APOLOGY_TE: &str =
    "క్షమించండి, మీ ప్రశ్నను ప్రాసెస్ చేయలేకపోయాను. మరోసారి ప్రయత్నించండి.";

/// 언어에 맞는 사과 메시지
pub fn apology(language: DetectedLanguage) -> &'static str {
    if language.is_telugu() {
        APOLOGY_TE
    } else {
        APOLOGY_EN
    }
}

// ============================================================================
// Types
// ============================================================================

/// 응답 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// 인사/잡담 - 소형 모델 직접 호출
    Casual,
    /// 검색 증강 생성 - 대형 모델
    Medical,
}

/// 성공한 응답
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub language: DetectedLanguage,
    pub route: Route,
    /// 프롬프트에 들어간 구절 수 (Casual이면 0)
    pub passages: usize,
}

/// 응답 실패
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("{route:?} generation failed: {source}")]
    Generation {
        route: Route,
        #[source]
        source: LlmError,
    },
}

// ============================================================================
// MedicalAssistant
// ============================================================================

/// 의료 상담 어시스턴트
pub struct MedicalAssistant {
    fast: Arc<dyn ChatModel>,
    medical: Arc<dyn ChatModel>,
    retriever: Arc<dyn Retriever>,
    top_k: usize,
    memory: ConversationMemory,
}

impl MedicalAssistant {
    /// 새 어시스턴트 생성
    ///
    /// # Arguments
    /// * `fast` - 일상 대화용 소형 모델
    /// * `medical` - 의료 질문용 대형 모델
    /// * `retriever` - 문맥 검색기
    pub fn new(
        fast: Arc<dyn ChatModel>,
        medical: Arc<dyn ChatModel>,
        retriever: Arc<dyn Retriever>,
    ) -> Self {
        Self {
            fast,
            medical,
            retriever,
            top_k: DEFAULT_TOP_K,
            memory: ConversationMemory::new(),
        }
    }

    /// 검색 구절 수 지정
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// 사용자 입력에 응답. 실패하면 사과 메시지를 반환하고 기록하지 않습니다.
    pub async fn respond(&mut self, text: &str) -> String {
        match self.try_respond(text).await {
            Ok(reply) => reply.text,
            Err(e) => {
                let language = language::classify(text);
                tracing::error!("Failed to respond ({}): {}", language, e);
                apology(language).to_string()
            }
        }
    }

    /// 사용자 입력에 응답 (실패를 값으로 반환)
    pub async fn try_respond(&mut self, text: &str) -> Result<Reply, AssistantError> {
        let language = language::classify(text);

        let reply = if casual::is_casual(text) {
            tracing::debug!("Routing casual turn to {}", self.fast.name());
            self.respond_casual(text, language).await?
        } else {
            tracing::debug!("Routing medical turn to {}", self.medical.name());
            self.respond_medical(text, language).await?
        };

        self.memory.record(text, reply.text.as_str());
        Ok(reply)
    }

    async fn respond_casual(
        &self,
        text: &str,
        language: DetectedLanguage,
    ) -> Result<Reply, AssistantError> {
        let answer = self
            .fast
            .complete(&[ChatMessage::user(text)])
            .await
            .map_err(|source| AssistantError::Generation {
                route: Route::Casual,
                source,
            })?;

        Ok(Reply {
            text: answer,
            language,
            route: Route::Casual,
            passages: 0,
        })
    }

    async fn respond_medical(
        &self,
        text: &str,
        language: DetectedLanguage,
    ) -> Result<Reply, AssistantError> {
        // 검색 실패는 빈 문맥으로 진행
        let passages = match self.retriever.retrieve(text, self.top_k).await {
            Ok(passages) => passages,
            Err(e) => {
                tracing::warn!("Retrieval failed, continuing without context: {:#}", e);
                Vec::new()
            }
        };

        let context = join_passages(&passages);
        let system_prompt = prompt::build(text, &self.memory.render(), &context, language);

        let answer = self
            .medical
            .complete(&[ChatMessage::system(system_prompt), ChatMessage::user(text)])
            .await
            .map_err(|source| AssistantError::Generation {
                route: Route::Medical,
                source,
            })?;

        Ok(Reply {
            text: answer,
            language,
            route: Route::Medical,
            passages: passages.len(),
        })
    }

    /// 대화 기록 삭제
    pub fn clear_history(&mut self) {
        self.memory.reset();
    }

    /// 대화 기록 (`Human:` / `AI:` 형식)
    pub fn history(&self) -> String {
        self.memory.render()
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::knowledge::RetrievedPassage;
    use crate::llm::Role;

    /// 호출을 기록하는 가짜 모델
    struct RecordingModel {
        name: &'static str,
        reply: Result<&'static str, u16>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl RecordingModel {
        fn replying(name: &'static str, reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Ok(reply),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(name: &'static str, status: u16) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Err(status),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(status) => Err(LlmError::Api {
                    status,
                    message: "quota exceeded".to_string(),
                }),
            }
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    /// 고정 구절을 반환하는 가짜 검색기
    struct StaticRetriever {
        passages: Option<Vec<&'static str>>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl StaticRetriever {
        fn with(passages: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                passages: Some(passages.to_vec()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                passages: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn retrieve(&self, query: &str, k: usize) -> anyhow::Result<Vec<RetrievedPassage>> {
            self.calls.lock().unwrap().push((query.to_string(), k));
            match &self.passages {
                Some(p) => Ok(p.iter().take(k).map(|t| RetrievedPassage::new(*t)).collect()),
                None => anyhow::bail!("vector store unavailable"),
            }
        }
    }

    #[tokio::test]
    async fn test_casual_turn_uses_fast_model_only() {
        let fast = RecordingModel::replying("fast", "Hello! How can I help you today?");
        let medical = RecordingModel::replying("medical", "unused");
        let retriever = StaticRetriever::with(&["unused"]);
        let mut assistant = MedicalAssistant::new(fast.clone(), medical.clone(), retriever.clone());

        let reply = assistant.try_respond("hello there").await.unwrap();

        assert_eq!(reply.route, Route::Casual);
        assert_eq!(reply.text, "Hello! How can I help you today?");
        assert_eq!(fast.calls(), vec![vec![ChatMessage::user("hello there")]]);
        assert!(medical.calls().is_empty());
        assert_eq!(retriever.call_count(), 0);
        assert_eq!(assistant.memory().len(), 1);
    }

    #[tokio::test]
    async fn test_medical_turn_uses_retrieval_and_prompt() {
        let fast = RecordingModel::replying("fast", "unused");
        let medical = RecordingModel::replying("medical", "Diabetes is high blood sugar.");
        let retriever = StaticRetriever::with(&["Diabetes is...", "Insulin is..."]);
        let mut assistant = MedicalAssistant::new(fast.clone(), medical.clone(), retriever.clone())
            .with_top_k(5);

        let reply = assistant.try_respond("What is diabetes?").await.unwrap();

        assert_eq!(reply.route, Route::Medical);
        assert_eq!(reply.language, DetectedLanguage::English);
        assert_eq!(reply.passages, 2);
        assert!(fast.calls().is_empty());
        assert_eq!(
            retriever.calls.lock().unwrap().clone(),
            vec![("What is diabetes?".to_string(), 5)]
        );

        let calls = medical.calls();
        assert_eq!(calls.len(), 1);
        let messages = &calls[0];
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Diabetes is...\n\nInsulin is..."));
        assert!(messages[0].content.contains("Never stop in the middle of a sentence."));
        assert_eq!(messages[1], ChatMessage::user("What is diabetes?"));

        assert_eq!(
            assistant.history(),
            "Human: What is diabetes?\nAI: Diabetes is high blood sugar."
        );
    }

    #[tokio::test]
    async fn test_history_is_fed_into_next_prompt() {
        let fast = RecordingModel::replying("fast", "Hi!");
        let medical = RecordingModel::replying("medical", "Rest and fluids.");
        let retriever = StaticRetriever::with(&[]);
        let mut assistant = MedicalAssistant::new(fast, medical.clone(), retriever);

        assistant.respond("hi").await;
        assistant.respond("How should a common cold be treated?").await;

        let calls = medical.calls();
        assert!(calls[0][0].content.contains("Human: hi\nAI: Hi!"));
    }

    #[tokio::test]
    async fn test_telugu_uses_telugu_template() {
        let fast = RecordingModel::replying("fast", "unused");
        let medical = RecordingModel::replying("medical", "జ్వరం అంటే...");
        let mut assistant =
            MedicalAssistant::new(fast, medical.clone(), StaticRetriever::with(&["Fever is..."]));

        let reply = assistant
            .try_respond("జ్వరం వచ్చినప్పుడు నేను ఏమి తినాలి?")
            .await
            .unwrap();

        assert_eq!(reply.language, DetectedLanguage::TeluguNative);
        assert!(medical.calls()[0][0].content.contains("మీ సమాధానం:"));
    }

    #[tokio::test]
    async fn test_generation_failure_returns_apology_without_recording() {
        let fast = RecordingModel::replying("fast", "Hi!");
        let medical = RecordingModel::failing("medical", 429);
        let mut assistant =
            MedicalAssistant::new(fast, medical, StaticRetriever::with(&["Diabetes is..."]));

        assistant.respond("hi").await;
        let before = assistant.history();

        let answer = assistant.respond("What are the symptoms of diabetes?").await;

        assert_eq!(answer, APOLOGY_EN);
        assert_eq!(assistant.memory().len(), 1);
        assert_eq!(assistant.history(), before);
    }

    #[tokio::test]
    async fn test_casual_failure_returns_telugu_apology() {
        let fast = RecordingModel::failing("fast", 500);
        let medical = RecordingModel::replying("medical", "unused");
        let mut assistant = MedicalAssistant::new(fast, medical, StaticRetriever::with(&[]));

        let answer = assistant.respond("ela unnav").await;

        assert_eq!(answer, APOLOGY_TE);
        assert!(assistant.memory().is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades_to_empty_context() {
        let fast = RecordingModel::replying("fast", "unused");
        let medical = RecordingModel::replying("medical", "Please see a doctor.");
        let mut assistant = MedicalAssistant::new(fast, medical.clone(), StaticRetriever::broken());

        let reply = assistant
            .try_respond("Is chest pain after exercise dangerous?")
            .await
            .unwrap();

        assert_eq!(reply.passages, 0);
        assert!(medical.calls()[0][0]
            .content
            .contains("Context information from documents:\n\n"));
        assert_eq!(assistant.memory().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let fast = RecordingModel::replying("fast", "Hi!");
        let medical = RecordingModel::replying("medical", "unused");
        let mut assistant = MedicalAssistant::new(fast, medical, StaticRetriever::with(&[]));

        assistant.respond("hello").await;
        assert!(!assistant.history().is_empty());

        assistant.clear_history();
        assert_eq!(assistant.history(), "");
    }

    #[test]
    fn test_apology_language() {
        assert_eq!(apology(DetectedLanguage::English), APOLOGY_EN);
        assert_eq!(apology(DetectedLanguage::TeluguNative), APOLOGY_TE);
        assert_eq!(apology(DetectedLanguage::TeluguTransliterated), APOLOGY_TE);
    }
}

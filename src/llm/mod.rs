//! LLM 모듈 - Together AI 채팅 완성 API
//!
//! 의료 질문용 대형 모델과 일상 대화용 소형 모델 두 계층을 같은 클라이언트로 다룹니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let llm = TogetherChat::new(api_key, "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo", 200)?;
//! let reply = llm.complete(&[ChatMessage::user("hello")]).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Together AI 채팅 완성 엔드포인트 (OpenAI 호환)
/// source: https://docs.together.ai/reference/chat-completions-1
pub const TOGETHER_CHAT_URL: &str = "https://api.together.xyz/v1/chat/completions";

/// 요청 타임아웃
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// 429 에러 시 최대 재시도 횟수
const MAX_RETRIES: u32 = 3;
/// 재시도 시 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 2000;

// ============================================================================
// Messages
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 채팅 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// 생성 호출 실패
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limit exceeded after {0} retries")]
    RateLimited(u32),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// ChatModel Trait
// ============================================================================

/// 채팅 모델 트레이트
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 메시지 목록에 대한 응답 생성
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Together AI
// ============================================================================

/// Together AI 채팅 모델
#[derive(Debug, Clone)]
pub struct TogetherChat {
    api_key: String,
    model: String,
    max_tokens: u32,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// API 에러 응답
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl TogetherChat {
    /// 새 채팅 모델 생성
    ///
    /// # Arguments
    /// * `api_key` - Together AI API 키
    /// * `model` - 모델 ID
    /// * `max_tokens` - 응답 최대 토큰 수
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            endpoint: TOGETHER_CHAT_URL.to_string(),
            client,
        })
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// 응답 본문에서 첫 번째 선택지 텍스트 추출
fn parse_completion(body: &str) -> Result<String, LlmError> {
    let response: CompletionResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(LlmError::EmptyResponse)
}

/// 에러 응답 본문에서 메시지 추출
fn parse_api_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    LlmError::Api { status, message }
}

#[async_trait]
impl ChatModel for TogetherChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
        };

        // 재시도 루프 (429 에러 시 지수 백오프)
        for attempt in 0..=MAX_RETRIES {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;

            if status.is_success() {
                return parse_completion(&body);
            }

            if status.as_u16() == 429 && attempt < MAX_RETRIES {
                let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
                tracing::warn!(
                    "Rate limit hit (429) on {}, backing off {:?} (attempt {}/{})",
                    self.model,
                    backoff,
                    attempt + 1,
                    MAX_RETRIES
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            if status.as_u16() == 429 {
                break;
            }

            return Err(parse_api_error(status.as_u16(), &body));
        }

        Err(LlmError::RateLimited(MAX_RETRIES))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let request = CompletionRequest {
            model: "m",
            messages: &messages,
            max_tokens: 200,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 200);
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":" Hello! \n"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Hello!");
    }

    #[test]
    fn test_parse_completion_empty() {
        let body = r#"{"choices":[]}"#;
        assert!(matches!(parse_completion(body), Err(LlmError::EmptyResponse)));

        let body = r#"{"choices":[{"message":{"role":"assistant","content":"   "}}]}"#;
        assert!(matches!(parse_completion(body), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_parse_completion_invalid_json() {
        assert!(matches!(parse_completion("not json"), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_parse_api_error() {
        let err = parse_api_error(401, r#"{"error":{"message":"Invalid API key","type":"auth"}}"#);
        assert_eq!(err.to_string(), "api error (401): Invalid API key");

        let err = parse_api_error(502, "Bad Gateway");
        assert_eq!(err.to_string(), "api error (502): Bad Gateway");
    }

    #[test]
    fn test_model_name() {
        let llm = TogetherChat::new("key", "meta-llama/test", 200).unwrap();
        assert_eq!(llm.name(), "meta-llama/test");
        assert_eq!(llm.max_tokens(), 200);
    }
}

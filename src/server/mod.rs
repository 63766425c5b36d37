//! HTTP 서버 모듈 - 어시스턴트 REST API
//!
//! | Method | Path | 설명 |
//! |---|---|---|
//! | GET | `/health` | 상태 확인 |
//! | GET | `/` | 인사 메시지 |
//! | POST | `/assistance` | `{"text"}` → `{"reply"}` |
//! | POST | `/assistance/reset` | 대화 기록 삭제 |
//! | GET | `/assistance/history` | 대화 기록 조회 |
//!
//! 어시스턴트 하나를 `Mutex`로 공유하므로 요청은 한 번에 하나씩 처리됩니다.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::assistant::MedicalAssistant;

/// 입력 최대 길이 (문자 수)
pub const MAX_TEXT_CHARS: usize = 4000;

/// 공유 상태
pub type SharedAssistant = Arc<Mutex<MedicalAssistant>>;

// ============================================================================
// Request / Response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct Message {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryResponse {
    pub history: String,
}

/// 요청 검증 실패
#[derive(Debug, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }
}

/// 본문 파싱 실패도 같은 `{"detail"}` 형식으로 응답
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// 입력 검증 후 앞뒤 공백 제거
pub fn validate_text(text: &str) -> Result<&str, ApiError> {
    if text.is_empty() {
        return Err(ApiError::unprocessable("text must not be empty"));
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ApiError::unprocessable(format!(
            "text must be at most {} characters",
            MAX_TEXT_CHARS
        )));
    }

    let cleaned = text.trim();
    if cleaned.is_empty() {
        return Err(ApiError::unprocessable(
            "text must not be empty or whitespace",
        ));
    }
    Ok(cleaned)
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "Chatbot": "Hello! I'm your medical assistant. Ask anything." }))
}

async fn assistance(
    State(assistant): State<SharedAssistant>,
    payload: Result<Json<Message>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(message) = payload?;
    let cleaned = validate_text(&message.text)?;
    let reply = assistant.lock().await.respond(cleaned).await;
    Ok(Json(ChatResponse { reply }))
}

async fn reset(State(assistant): State<SharedAssistant>) -> StatusCode {
    assistant.lock().await.clear_history();
    tracing::info!("Conversation history cleared");
    StatusCode::NO_CONTENT
}

async fn history(State(assistant): State<SharedAssistant>) -> Json<HistoryResponse> {
    let history = assistant.lock().await.history();
    Json(HistoryResponse { history })
}

// ============================================================================
// Router / Serve
// ============================================================================

/// 라우터 생성
pub fn router(assistant: SharedAssistant) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(root))
        .route("/assistance", post(assistance))
        .route("/assistance/reset", post(reset))
        .route("/assistance/history", get(history))
        .layer(CorsLayer::permissive())
        .with_state(assistant)
}

/// 서버 실행 (Ctrl+C로 종료)
pub async fn serve(assistant: MedicalAssistant, bind: &str) -> Result<()> {
    let app = router(Arc::new(Mutex::new(assistant)));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("HTTP server error")
}

// ============================================================================
// Tests
// ============================================================================

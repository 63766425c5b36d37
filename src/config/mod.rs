//! 설정 모듈 - 환경변수 기반 런타임 설정
//!
//! `.env` 파일을 먼저 읽은 뒤 `envy`로 환경변수를 [`Settings`]로 역직렬화합니다.
//!
//! | 환경변수 | 기본값 |
//! |---|---|
//! | `TOGETHER_API_KEY` | (없음, 네트워크 명령에 필수) |
//! | `MEDIBOT_PDF_PATH` | `A-Z Family Medical Encyclopedia.pdf` |
//! | `MEDIBOT_DATA_DIR` | `<data_local_dir>/.medibot-rag` |
//! | `MEDIBOT_MEDICAL_MODEL` | `meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo` |
//! | `MEDIBOT_FAST_MODEL` | `meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo` |
//! | `MEDIBOT_EMBEDDING_MODEL` | `BAAI/bge-base-en-v1.5` |
//! | `MEDIBOT_TOP_K` | `5` |
//! | `MEDIBOT_BIND` | `0.0.0.0:8000` |

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// 대형(의료) 모델
pub const DEFAULT_MEDICAL_MODEL: &str = "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo";
/// 소형(일상 대화) 모델
pub const DEFAULT_FAST_MODEL: &str = "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo";
/// 임베딩 모델 (768차원)
pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-base-en-v1.5";
/// 기본 의료 백과사전 PDF
pub const DEFAULT_PDF_PATH: &str = "A-Z Family Medical Encyclopedia.pdf";

// ============================================================================
// Settings
// ============================================================================

/// 런타임 설정
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default, rename = "together_api_key")]
    pub api_key: Option<String>,

    #[serde(default = "default_pdf_path", rename = "medibot_pdf_path")]
    pub pdf_path: PathBuf,

    #[serde(default, rename = "medibot_data_dir")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_medical_model", rename = "medibot_medical_model")]
    pub medical_model: String,

    #[serde(default = "default_medical_max_tokens", rename = "medibot_medical_max_tokens")]
    pub medical_max_tokens: u32,

    #[serde(default = "default_fast_model", rename = "medibot_fast_model")]
    pub fast_model: String,

    #[serde(default = "default_fast_max_tokens", rename = "medibot_fast_max_tokens")]
    pub fast_max_tokens: u32,

    #[serde(default = "default_embedding_model", rename = "medibot_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_top_k", rename = "medibot_top_k")]
    pub top_k: usize,

    #[serde(default = "default_bind", rename = "medibot_bind")]
    pub bind: String,
}

fn default_pdf_path() -> PathBuf {
    PathBuf::from(DEFAULT_PDF_PATH)
}

fn default_medical_model() -> String {
    DEFAULT_MEDICAL_MODEL.to_string()
}

fn default_medical_max_tokens() -> u32 {
    500
}

fn default_fast_model() -> String {
    DEFAULT_FAST_MODEL.to_string()
}

fn default_fast_max_tokens() -> u32 {
    200
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Settings {
    /// `.env` + 환경변수에서 설정 로드
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenv::dotenv() {
            tracing::debug!(".env not loaded: {}", e);
        }
        Self::from_iter(std::env::vars())
    }

    /// 키-값 쌍에서 설정 로드 (테스트용)
    pub fn from_iter<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let settings: Settings =
            envy::from_iter(vars).context("Failed to parse settings from environment")?;
        Ok(settings.normalized())
    }

    /// 빈 API 키는 미설정으로 취급
    fn normalized(mut self) -> Self {
        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.api_key = None;
        }
        self
    }

    /// API 키 반환 (없으면 설정 안내 에러)
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "TOGETHER_API_KEY not set.\n\
                 Set: export TOGETHER_API_KEY=your-api-key (or add it to .env)\n\
                 Get your API key at: https://api.together.ai/settings/api-keys"
            )
        })
    }

    /// API 키 존재 여부
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// 데이터 디렉토리 (설정값 우선)
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(get_data_dir)
    }

    /// 벡터 인덱스 경로
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir().join("index")
    }
}

// ============================================================================
// Data Directory
// ============================================================================

/// 기본 데이터 디렉토리 (~/.medibot-rag/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".medibot-rag")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_iter(vars(&[])).unwrap();
        assert!(settings.api_key.is_none());
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.medical_max_tokens, 500);
        assert_eq!(settings.fast_max_tokens, 200);
        assert_eq!(settings.medical_model, DEFAULT_MEDICAL_MODEL);
        assert_eq!(settings.fast_model, DEFAULT_FAST_MODEL);
        assert_eq!(settings.pdf_path, PathBuf::from(DEFAULT_PDF_PATH));
        assert_eq!(settings.bind, "0.0.0.0:8000");
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_iter(vars(&[
            ("TOGETHER_API_KEY", "abc"),
            ("MEDIBOT_TOP_K", "3"),
            ("MEDIBOT_DATA_DIR", "/tmp/medibot"),
        ]))
        .unwrap();

        assert_eq!(settings.require_api_key().unwrap(), "abc");
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.index_dir(), PathBuf::from("/tmp/medibot/index"));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let settings = Settings::from_iter(vars(&[("TOGETHER_API_KEY", "  ")])).unwrap();
        assert!(!settings.has_api_key());
        assert!(settings.require_api_key().is_err());
    }

    #[test]
    fn test_invalid_top_k() {
        let result = Settings::from_iter(vars(&[("MEDIBOT_TOP_K", "many")]));
        assert!(result.is_err());
    }
}

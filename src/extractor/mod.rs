//! 콘텐츠 추출 모듈
//!
//! 의료 백과사전 PDF에서 페이지 단위 텍스트를 추출합니다.

pub mod pdf;

use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

// ============================================================================
// Extracted Document
// ============================================================================

/// PDF 한 페이지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPage {
    /// 페이지 번호 (1부터 시작)
    pub number: usize,
    pub text: String,
}

/// 추출된 PDF 문서
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub pages: Vec<PdfPage>,
    /// 원본 파일 SHA-256 (hex)
    pub sha256: String,
}

impl ExtractedDocument {
    /// 총 텍스트 길이 (문자 수)
    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// 바이트 SHA-256 (hex)
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// 파일 SHA-256 (hex)
pub async fn file_sha256(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read file: {:?}", path))?;
    Ok(sha256_hex(&bytes))
}

/// PDF 파일에서 페이지별 텍스트 추출
pub async fn extract_pdf(path: &Path) -> Result<ExtractedDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read PDF: {:?}", path))?;
    let sha256 = sha256_hex(&bytes);

    // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
    let owned_path = path.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || pdf::extract_pages_from_mem(&bytes, &owned_path))
        .await
        .context("PDF extraction task failed")??;

    Ok(ExtractedDocument {
        pages: pages
            .into_iter()
            .map(|(number, text)| PdfPage { number, text })
            .collect(),
        sha256,
    })
}

// ============================================================================
// Tests
// ============================================================================

//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 텍스트를 추출합니다.

use std::path::Path;

use anyhow::{Context, Result};

/// PDF 바이트에서 페이지별 텍스트 추출
///
/// (페이지 번호, 텍스트) 목록을 반환합니다. 페이지 번호는 1부터 시작합니다.
pub fn extract_pages_from_mem(bytes: &[u8], path: &Path) -> Result<Vec<(usize, String)>> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .with_context(|| format!("Failed to extract text from PDF: {:?}", path))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok(vec![]);
    }

    Ok(split_pdf_pages(&text))
}

/// PDF 텍스트를 페이지별로 분리
///
/// 폼피드(`\x0c`)로 나누고, 구분자가 없으면 전체를 한 페이지로 취급합니다.
/// 빈 페이지는 건너뛰지만 번호는 PDF의 실제 페이지 순서를 따릅니다.
fn split_pdf_pages(text: &str) -> Vec<(usize, String)> {
    let pages: Vec<(usize, String)> = text
        .split('\x0c')
        .enumerate()
        .map(|(i, s)| (i + 1, s.trim().to_string()))
        .filter(|(_, s)| !s.is_empty())
        .collect();

    if pages.is_empty() {
        vec![(1, text.trim().to_string())]
    } else {
        pages
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pdf_pages_with_formfeed() {
        let text = "Abdomen\x0cAcne";
        let pages = split_pdf_pages(text);
        assert_eq!(
            pages,
            vec![(1, "Abdomen".to_string()), (2, "Acne".to_string())]
        );
    }

    #[test]
    fn test_blank_page_keeps_numbering() {
        let text = "Abdomen\x0cAcne\x0c  \x0cAllergy";
        let pages = split_pdf_pages(text);
        assert_eq!(
            pages,
            vec![
                (1, "Abdomen".to_string()),
                (2, "Acne".to_string()),
                (4, "Allergy".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_pdf_pages_no_separator() {
        let pages = split_pdf_pages("  Just some text without page breaks ");
        assert_eq!(
            pages,
            vec![(1, "Just some text without page breaks".to_string())]
        );
    }

    #[test]
    fn test_invalid_pdf_bytes() {
        let result = extract_pages_from_mem(b"not a pdf", Path::new("bad.pdf"));
        assert!(result.is_err());
    }
}

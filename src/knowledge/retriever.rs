//! 검색기 - 질문에 대한 상위 k개 문맥 구절 반환

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;

use super::vector::VectorStore;

/// 검색된 문맥 구절 (요청 단위로만 사용)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedPassage {
    pub text: String,
}

impl RetrievedPassage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// 구절을 빈 줄로 이어 붙여 프롬프트 문맥 생성
pub fn join_passages(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ============================================================================
// Retriever Trait
// ============================================================================

/// 검색기 트레이트
#[async_trait]
pub trait Retriever: Send + Sync {
    /// 질문과 관련된 구절 최대 `k`개
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>>;
}

// ============================================================================
// VectorRetriever
// ============================================================================

/// 임베딩 + 벡터 저장소 기반 검색기
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl VectorRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(vec![]);
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let results = self
            .store
            .search(&query_embedding, k)
            .await
            .context("Vector search failed")?;

        tracing::debug!("Retrieved {} passages for query", results.len());

        Ok(results
            .into_iter()
            .take(k)
            .map(|r| RetrievedPassage::new(r.chunk_text))
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::vector::{MemoryVectorStore, VectorEntry};

    /// 키워드 기반 2차원 가짜 임베딩
    struct KeywordEmbedding;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedding {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(vec![
                if lower.contains("sugar") || lower.contains("diabetes") { 1.0 } else { 0.0 },
                if lower.contains("lung") || lower.contains("asthma") { 1.0 } else { 0.0 },
            ])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    async fn retriever() -> VectorRetriever {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .insert_batch(&[
                VectorEntry {
                    chunk_id: 0,
                    page: 3,
                    chunk_text: "Asthma affects the lungs.".to_string(),
                    embedding: vec![0.0, 1.0],
                },
                VectorEntry {
                    chunk_id: 1,
                    page: 7,
                    chunk_text: "Diabetes raises blood sugar.".to_string(),
                    embedding: vec![1.0, 0.0],
                },
            ])
            .await
            .unwrap();

        VectorRetriever::new(Arc::new(KeywordEmbedding), store)
    }

    #[tokio::test]
    async fn test_retrieve_top_passage() {
        let retriever = retriever().await;
        let passages = retriever.retrieve("What is diabetes?", 1).await.unwrap();
        assert_eq!(passages, vec![RetrievedPassage::new("Diabetes raises blood sugar.")]);
    }

    #[tokio::test]
    async fn test_retrieve_zero_k() {
        let retriever = retriever().await;
        assert!(retriever.retrieve("asthma", 0).await.unwrap().is_empty());
    }

    #[test]
    fn test_join_passages() {
        let passages = vec![RetrievedPassage::new("one"), RetrievedPassage::new("two")];
        assert_eq!(join_passages(&passages), "one\n\ntwo");
        assert_eq!(join_passages(&[]), "");
    }
}

//! 인덱스 구축 - PDF → 청크 → 임베딩 → 벡터 저장소
//!
//! 한 번 구축한 인덱스는 `manifest.json`이 있는 한 재사용합니다.
//! `force`가 지정되면 기존 벡터를 지우고 다시 만듭니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingProvider;
use crate::extractor::{self, ExtractedDocument};

use super::chunker::Chunker;
use super::vector::{VectorEntry, VectorStore};

/// 매니페스트 파일 이름
pub const MANIFEST_FILE: &str = "manifest.json";

/// 한 번에 임베딩할 청크 수
const EMBED_BATCH_SIZE: usize = 32;

// ============================================================================
// IndexManifest
// ============================================================================

/// 구축된 인덱스 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub pdf_path: PathBuf,
    pub pdf_sha256: String,
    pub page_count: usize,
    pub chunk_count: usize,
    pub embedding_model: String,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    /// 인덱스 디렉토리에서 매니페스트 읽기 (없으면 None)
    pub async fn load(index_dir: &Path) -> Result<Option<Self>> {
        let path = index_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read manifest: {:?}", path))?;
        let manifest = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
        Ok(Some(manifest))
    }

    /// 매니페스트 저장
    pub async fn save(&self, index_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(index_dir)
            .await
            .context("Failed to create index directory")?;

        let path = index_dir.join(MANIFEST_FILE);
        let raw = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;
        tokio::fs::write(&path, raw)
            .await
            .with_context(|| format!("Failed to write manifest: {:?}", path))
    }

    /// 매니페스트 삭제 (없으면 무시)
    pub async fn remove(index_dir: &Path) -> Result<()> {
        let path = index_dir.join(MANIFEST_FILE);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove manifest: {:?}", path)),
        }
    }
}

/// 구축 결과
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    /// 기존 인덱스 재사용
    Reused(IndexManifest),
    /// 새로 구축
    Built(IndexManifest),
}

impl IndexOutcome {
    pub fn manifest(&self) -> &IndexManifest {
        match self {
            Self::Reused(m) | Self::Built(m) => m,
        }
    }
}

// ============================================================================
// IndexBuilder
// ============================================================================

/// 오프라인 인덱스 구축기
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: Box<dyn Chunker>,
    index_dir: PathBuf,
}

impl IndexBuilder {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        chunker: Box<dyn Chunker>,
        index_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            embedder,
            store,
            chunker,
            index_dir: index_dir.into(),
        }
    }

    /// PDF 파일에서 인덱스 구축 (이미 있으면 재사용)
    pub async fn build(&self, pdf_path: &Path, force: bool) -> Result<IndexOutcome> {
        if !force {
            if let Some(manifest) = self.reusable_manifest().await? {
                let current = extractor::file_sha256(pdf_path).await.ok();
                if current.as_deref().is_some_and(|sha| sha != manifest.pdf_sha256) {
                    tracing::warn!(
                        "{:?} changed since the index was built; rebuild with --force to refresh",
                        pdf_path
                    );
                }
                tracing::info!("Reusing index with {} chunks", manifest.chunk_count);
                return Ok(IndexOutcome::Reused(manifest));
            }
        }

        tracing::info!("Extracting text from {:?}", pdf_path);
        let document = extractor::extract_pdf(pdf_path).await?;
        tracing::info!(
            "Extracted {} pages ({} chars)",
            document.pages.len(),
            document.total_chars()
        );
        let manifest = self.build_from_document(pdf_path, &document).await?;
        Ok(IndexOutcome::Built(manifest))
    }

    /// 매니페스트가 있고 저장된 벡터 수가 일치하면 재사용 가능
    async fn reusable_manifest(&self) -> Result<Option<IndexManifest>> {
        let Some(manifest) = IndexManifest::load(&self.index_dir).await? else {
            return Ok(None);
        };

        if manifest.dimension != self.embedder.dimension() {
            tracing::warn!(
                "Index dimension {} does not match embedder dimension {}, rebuilding",
                manifest.dimension,
                self.embedder.dimension()
            );
            return Ok(None);
        }

        let stored = self.store.count().await?;
        if stored != manifest.chunk_count {
            tracing::warn!(
                "Index holds {} vectors but manifest expects {}, rebuilding",
                stored,
                manifest.chunk_count
            );
            return Ok(None);
        }

        Ok(Some(manifest))
    }

    /// 추출된 문서로 인덱스 구축
    pub async fn build_from_document(
        &self,
        pdf_path: &Path,
        document: &ExtractedDocument,
    ) -> Result<IndexManifest> {
        let chunks: Vec<(i32, String)> = document
            .pages
            .iter()
            .flat_map(|page| {
                let number = i32::try_from(page.number).unwrap_or(i32::MAX);
                self.chunker
                    .chunk(&page.text)
                    .into_iter()
                    .map(move |chunk| (number, chunk))
            })
            .collect();

        if chunks.is_empty() {
            anyhow::bail!("No text chunks produced from {:?}", pdf_path);
        }

        tracing::info!(
            "Split {} pages into {} chunks ({})",
            document.pages.len(),
            chunks.len(),
            self.chunker.name()
        );

        // 구축이 중간에 실패해도 이전 매니페스트가 남지 않도록 먼저 삭제
        IndexManifest::remove(&self.index_dir).await?;

        self.store
            .clear()
            .await
            .context("Failed to clear existing vectors")?;

        let mut inserted = 0usize;
        for (batch_index, batch) in chunks.chunks(EMBED_BATCH_SIZE).enumerate() {
            let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
            let embeddings = self
                .embedder
                .embed_batch(&texts)
                .await
                .context("Failed to embed chunks")?;

            let offset = batch_index * EMBED_BATCH_SIZE;
            let entries: Vec<VectorEntry> = batch
                .iter()
                .zip(embeddings)
                .enumerate()
                .map(|(i, ((page, text), embedding))| VectorEntry {
                    chunk_id: (offset + i) as i64,
                    page: *page,
                    chunk_text: text.clone(),
                    embedding,
                })
                .collect();

            inserted += self
                .store
                .insert_batch(&entries)
                .await
                .context("Failed to insert vectors")?;

            tracing::info!("Indexed {}/{} chunks", inserted, chunks.len());
        }

        let manifest = IndexManifest {
            pdf_path: pdf_path.to_path_buf(),
            pdf_sha256: document.sha256.clone(),
            page_count: document.pages.len(),
            chunk_count: inserted,
            embedding_model: self.embedder.name().to_string(),
            dimension: self.embedder.dimension(),
            created_at: Utc::now(),
        };
        manifest.save(&self.index_dir).await?;

        Ok(manifest)
    }
}

// ============================================================================
// Tests
// ============================================================================

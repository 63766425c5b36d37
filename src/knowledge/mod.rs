//! Knowledge 모듈 - 의료 백과사전 벡터 인덱스와 검색
//!
//! - Chunker: 재귀 문자 분할 (1000자, 50자 오버랩)
//! - LanceDB: 벡터 검색 (ANN)
//! - Index: PDF → 청크 → 임베딩 일괄 구축, 매니페스트로 재사용
//! - Retriever: 질문 임베딩 후 상위 k개 구절 반환

mod chunker;
mod index;
mod lance;
mod retriever;
mod vector;

// Re-exports
pub use chunker::{default_chunker, ChunkConfig, Chunker, RecursiveChunker};
pub use index::{IndexBuilder, IndexManifest, IndexOutcome, MANIFEST_FILE};
pub use lance::LanceVectorStore;
pub use retriever::{join_passages, RetrievedPassage, Retriever, VectorRetriever};
pub use vector::{cosine_similarity, MemoryVectorStore, SearchResult, VectorEntry, VectorStore};

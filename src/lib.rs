//! medibot-rag - 영어/텔루구어 의료 상담 어시스턴트
//!
//! 의료 백과사전 PDF를 LanceDB 벡터 인덱스로 만들고, 질문 언어를 감지해
//! 일상 대화는 소형 모델로, 의료 질문은 검색 문맥과 대화 기록을 담은
//! 프롬프트로 대형 모델에 보냅니다.

pub mod assistant;
pub mod casual;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod extractor;
pub mod knowledge;
pub mod language;
pub mod llm;
pub mod memory;
pub mod prompt;
pub mod server;

// Re-exports
pub use assistant::{AssistantError, MedicalAssistant, Reply, Route};
pub use config::{get_data_dir, Settings};
pub use embedding::{EmbeddingProvider, TogetherEmbedding};
pub use knowledge::{
    default_chunker, ChunkConfig, Chunker, IndexBuilder, IndexManifest, IndexOutcome,
    LanceVectorStore, RetrievedPassage, Retriever, SearchResult, VectorEntry, VectorRetriever,
    VectorStore,
};
pub use language::DetectedLanguage;
pub use llm::{ChatMessage, ChatModel, LlmError, TogetherChat};
pub use memory::ConversationMemory;
pub use prompt::PromptTemplate;

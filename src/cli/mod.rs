//! CLI 모듈
//!
//! medibot-rag CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::assistant::MedicalAssistant;
use crate::config::Settings;
use crate::embedding::{EmbeddingProvider, TogetherEmbedding};
use crate::knowledge::{
    default_chunker, IndexBuilder, IndexManifest, IndexOutcome, LanceVectorStore, VectorRetriever,
    VectorStore,
};
use crate::llm::{ChatModel, TogetherChat};
use crate::server;

/// 벡터 테이블 디렉토리 이름
const VECTOR_DIR: &str = "chunks.lance";

/// 대화 종료 명령
const EXIT_WORDS: [&str; 3] = ["quit", "exit", "bye"];

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "medibot-rag")]
#[command(version, about = "Bilingual (English/Telugu) medical assistant", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 의료 백과사전 PDF로 벡터 인덱스 구축
    Index {
        /// PDF 경로 (기본: MEDIBOT_PDF_PATH)
        #[arg(short, long)]
        pdf: Option<PathBuf>,

        /// 기존 인덱스를 지우고 다시 구축
        #[arg(long)]
        force: bool,
    },

    /// 질문 하나에 답변
    Ask {
        /// 질문 (영어 또는 텔루구어)
        question: String,
    },

    /// 대화형 상담
    Chat,

    /// HTTP 서버 실행
    Serve {
        /// 바인드 주소 (기본: MEDIBOT_BIND)
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load()?;

    match cli.command {
        Commands::Index { pdf, force } => cmd_index(&settings, pdf, force).await,
        Commands::Ask { question } => cmd_ask(&settings, &question).await,
        Commands::Chat => cmd_chat(&settings).await,
        Commands::Serve { addr } => cmd_serve(&settings, addr).await,
        Commands::Status => cmd_status(&settings).await,
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// 임베딩 + 벡터 저장소 생성
async fn open_knowledge(
    settings: &Settings,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn VectorStore>)> {
    let api_key = settings.require_api_key()?;
    let embedder = TogetherEmbedding::new(api_key, settings.embedding_model.as_str())
        .context("Failed to create embedding client")?;

    let store = LanceVectorStore::open(
        &settings.index_dir().join(VECTOR_DIR),
        embedder.dimension(),
    )
    .await
    .context("Failed to open vector store")?;

    Ok((Arc::new(embedder), Arc::new(store)))
}

/// 인덱스 구축 (이미 있으면 재사용)
async fn ensure_index(
    settings: &Settings,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    pdf: Option<PathBuf>,
    force: bool,
) -> Result<IndexOutcome> {
    let pdf_path = pdf.unwrap_or_else(|| settings.pdf_path.clone());
    let builder = IndexBuilder::new(embedder, store, default_chunker(), settings.index_dir());

    builder
        .build(&pdf_path, force)
        .await
        .with_context(|| format!("Failed to build index from {:?}", pdf_path))
}

/// 설정으로 어시스턴트 조립 (인덱스가 없으면 먼저 구축)
async fn build_assistant(settings: &Settings) -> Result<MedicalAssistant> {
    let (embedder, store) = open_knowledge(settings).await?;
    ensure_index(settings, embedder.clone(), store.clone(), None, false).await?;

    let api_key = settings.require_api_key()?;
    let fast = TogetherChat::new(api_key, settings.fast_model.as_str(), settings.fast_max_tokens)
        .context("Failed to create fast chat model")?;
    let medical = TogetherChat::new(
        api_key,
        settings.medical_model.as_str(),
        settings.medical_max_tokens,
    )
    .context("Failed to create medical chat model")?;

    tracing::info!(
        "Models: {} (max {} tokens), {} (max {} tokens)",
        medical.name(),
        medical.max_tokens(),
        fast.name(),
        fast.max_tokens()
    );

    let retriever = VectorRetriever::new(embedder, store);

    Ok(
        MedicalAssistant::new(Arc::new(fast), Arc::new(medical), Arc::new(retriever))
            .with_top_k(settings.top_k),
    )
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 인덱스 구축 명령어 (index)
async fn cmd_index(settings: &Settings, pdf: Option<PathBuf>, force: bool) -> Result<()> {
    let (embedder, store) = open_knowledge(settings).await?;

    println!("[*] Preparing index in {}", settings.index_dir().display());

    let outcome = ensure_index(settings, embedder, store, pdf, force).await?;
    let manifest = outcome.manifest();

    match &outcome {
        IndexOutcome::Reused(_) => println!("[OK] Existing index reused (use --force to rebuild)"),
        IndexOutcome::Built(_) => println!("[OK] Index built"),
    }
    print_manifest(manifest);

    Ok(())
}

/// 단일 질문 명령어 (ask)
async fn cmd_ask(settings: &Settings, question: &str) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    let mut assistant = build_assistant(settings).await?;
    let reply = assistant.respond(question).await;
    println!("{}", reply);

    Ok(())
}

/// 대화형 명령어 (chat)
async fn cmd_chat(settings: &Settings) -> Result<()> {
    let mut assistant = build_assistant(settings).await?;

    println!("Medical assistant ready. Ask in English or Telugu.");
    println!("Type 'quit', 'exit' or 'bye' to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit_word(input) {
            break;
        }

        let reply = assistant.respond(input).await;
        println!("Bot: {}", reply);
    }

    tracing::debug!("Chat ended after {} turns", assistant.memory().len());
    println!("Goodbye! Stay healthy.");
    Ok(())
}

/// 서버 명령어 (serve)
async fn cmd_serve(settings: &Settings, addr: Option<String>) -> Result<()> {
    let assistant = build_assistant(settings).await?;
    let bind = addr.unwrap_or_else(|| settings.bind.clone());

    println!("[*] Serving on http://{}", bind);
    server::serve(assistant, &bind).await
}

/// 상태 명령어 (status)
async fn cmd_status(settings: &Settings) -> Result<()> {
    println!("medibot-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] Data directory: {}", settings.data_dir().display());
    println!("[*] PDF: {}", settings.pdf_path.display());
    println!(
        "[*] Models: {} (medical), {} (casual)",
        settings.medical_model, settings.fast_model
    );

    if settings.has_api_key() {
        println!("[OK] API key: set");
    } else {
        println!("[!] API key: not set");
        println!("    Set: export TOGETHER_API_KEY=your-key");
    }

    match IndexManifest::load(&settings.index_dir()).await {
        Ok(Some(manifest)) => {
            println!("[OK] Index:");
            print_manifest(&manifest);
        }
        Ok(None) => println!("[!] Index: not built (run `medibot-rag index`)"),
        Err(e) => println!("[!] Failed to read index manifest: {}", e),
    }

    // 벡터 수 (API 키가 있을 때만)
    if settings.has_api_key() {
        match open_knowledge(settings).await {
            Ok((_, store)) => match store.count().await {
                Ok(count) => println!("[OK] Vectors stored: {}", count),
                Err(e) => tracing::debug!("Failed to count vectors: {}", e),
            },
            Err(e) => tracing::debug!("Failed to open vector store: {}", e),
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn print_manifest(manifest: &IndexManifest) {
    println!("     PDF: {}", manifest.pdf_path.display());
    println!(
        "     {} pages, {} chunks ({} dims, {})",
        manifest.page_count, manifest.chunk_count, manifest.dimension, manifest.embedding_model
    );
    println!(
        "     Built: {} | sha256 {}",
        manifest.created_at.format("%Y-%m-%d %H:%M"),
        truncate_text(&manifest.pdf_sha256, 12)
    );
}

fn is_exit_word(input: &str) -> bool {
    let lower = input.trim().to_lowercase();
    EXIT_WORDS.contains(&lower.as_str())
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

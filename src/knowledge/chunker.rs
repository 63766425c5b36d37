//! Text Chunking Module
//!
//! 재귀 문자 분할기: 문단 → 줄 → 단어 → 문자 순으로 구분자를 낮춰가며
//! `chunk_size` 이하의 청크를 만들고, 인접 청크 사이에 `chunk_overlap`만큼 겹침을 둡니다.
//! 길이는 바이트가 아닌 문자 수 기준입니다.

use std::collections::VecDeque;

use anyhow::Result;

/// 기본 구분자 (우선순위 순)
const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    /// 최대 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 오버랩 크기 (문자 수)
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 50,
        }
    }
}

impl ChunkConfig {
    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than 0");
        }
        if self.chunk_overlap >= self.chunk_size {
            anyhow::bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap,
                self.chunk_size
            );
        }
        Ok(())
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// RecursiveChunker
// ============================================================================

/// 재귀 문자 분할 청커
pub struct RecursiveChunker {
    config: ChunkConfig,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// 기본 설정(1000자, 50자 오버랩)으로 생성
    pub fn with_defaults() -> Self {
        Self {
            config: ChunkConfig::default(),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // 텍스트에 존재하는 첫 번째 구분자 선택 ("" 는 항상 선택 가능)
        let position = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s.as_str()))
            .unwrap_or(separators.len().saturating_sub(1));

        let Some(separator) = separators.get(position) else {
            return vec![text.to_string()];
        };
        let remaining = &separators[position + 1..];

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) < self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_splits(&pending, separator));
                pending.clear();
            }

            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_splits(&pending, separator));
        }

        chunks
    }

    /// 작은 조각을 chunk_size 이하로 합치고 오버랩 유지
    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(split);
            let joined_len = |current: &VecDeque<&str>, total: usize| {
                total + len + if current.is_empty() { 0 } else { sep_len }
            };

            if joined_len(&current, total) > self.config.chunk_size && !current.is_empty() {
                push_joined(&mut docs, &current, separator);

                // 오버랩 크기 이하가 될 때까지 앞쪽 조각 제거
                while total > self.config.chunk_overlap
                    || (joined_len(&current, total) > self.config.chunk_size && total > 0)
                {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    total = total.saturating_sub(
                        char_len(first) + if current.is_empty() { 0 } else { sep_len },
                    );
                }
            }

            total += len + if current.is_empty() { 0 } else { sep_len };
            current.push_back(split.as_str());
        }

        push_joined(&mut docs, &current, separator);
        docs
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        let mut chunks = self.split_recursive(text, &self.separators);
        chunks.retain(|c| !c.trim().is_empty());
        chunks
    }

    fn name(&self) -> &'static str {
        "RecursiveChunker"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(docs: &mut Vec<String>, parts: &VecDeque<&str>, separator: &str) {
    let joined = parts.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(RecursiveChunker::with_defaults())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(chunk_size: usize, chunk_overlap: usize) -> RecursiveChunker {
        RecursiveChunker::new(ChunkConfig {
            chunk_size,
            chunk_overlap,
        })
        .unwrap()
    }

    #[test]
    fn test_chunker_empty() {
        let chunker = RecursiveChunker::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk(" \n\n ").is_empty());
    }

    #[test]
    fn test_small_text_is_single_chunk() {
        let chunker = RecursiveChunker::with_defaults();
        let chunks = chunker.chunk("Asthma\n\nA chronic lung disease.");
        assert_eq!(chunks, vec!["Asthma\n\nA chronic lung disease."]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = chunker(40, 10);
        let text = "Diabetes is a condition in which the body cannot control blood sugar. \
                    Insulin helps glucose enter cells. Exercise and diet are important.";
        let chunks = chunker.chunk(text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40), "{:?}", chunks);
    }

    #[test]
    fn test_overlap_between_chunks() {
        let chunker = chunker(10, 4);
        let chunks = chunker.chunk("a b c d e f g h i j");

        assert_eq!(chunks[0], "a b c d e");
        // 두 번째 청크는 앞 청크의 끝 단어로 시작
        assert!(chunks[1].starts_with("d e"), "{:?}", chunks);
    }

    #[test]
    fn test_paragraphs_preferred() {
        let chunker = chunker(30, 0);
        let chunks = chunker.chunk("First paragraph here.\n\nSecond paragraph here.");
        assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph here."]);
    }

    #[test]
    fn test_long_word_split_by_chars() {
        let chunker = chunker(5, 0);
        let chunks = chunker.chunk("abcdefghijkl");
        assert_eq!(chunks, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_unicode_counted_by_chars() {
        let chunker = chunker(4, 0);
        let chunks = chunker.chunk("జ్వరంతలనొప్పి");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.concat(), "జ్వరంతలనొప్పి");
    }

    #[test]
    fn test_invalid_config() {
        assert!(RecursiveChunker::new(ChunkConfig {
            chunk_size: 10,
            chunk_overlap: 10,
        })
        .is_err());
        assert!(RecursiveChunker::new(ChunkConfig {
            chunk_size: 0,
            chunk_overlap: 0,
        })
        .is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ChunkConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 50);
    }
}

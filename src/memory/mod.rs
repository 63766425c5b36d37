//! 대화 기록 모듈
//!
//! 질문/응답 턴을 삽입 순서대로 보관합니다.
//! 크기 제한이나 요약이 없으므로 어시스턴트 인스턴스 수명 동안 계속 늘어납니다.

/// 한 번의 질문/응답
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    question: String,
    answer: String,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }
}

/// 추가 전용 대화 기록
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 턴 추가
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ConversationTurn::new(question, answer));
    }

    /// `Human: ...` / `AI: ...` 줄로 렌더링
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .flat_map(|turn| [format!("Human: {}", turn.question), format!("AI: {}", turn.answer)])
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 전체 기록 삭제
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

mod factory;
mod openai;
mod reliable;
mod stub;

pub use factory::create_completion;
pub use openai::OpenAiCompletion;
pub use reliable::ReliableCompletion;
pub use stub::StubCompletion;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

impl TurnRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Ordered multi-turn completion request.
///
/// Continuations append prior turns instead of concatenating prompt strings,
/// keeping the contract backend-agnostic.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub turns: Vec<CompletionTurn>,
    pub temperature: f64,
}

impl CompletionRequest {
    #[must_use]
    pub fn from_prompt(prompt: impl Into<String>, temperature: f64) -> Self {
        Self {
            turns: vec![CompletionTurn {
                role: TurnRole::User,
                content: prompt.into(),
            }],
            temperature,
        }
    }

    #[must_use]
    pub fn with_turn(mut self, role: TurnRole, content: impl Into<String>) -> Self {
        self.turns.push(CompletionTurn {
            role,
            content: content.into(),
        });
        self
    }

    /// Extend this request with the model's previous answer and a follow-up
    /// instruction, preserving turn order.
    #[must_use]
    pub fn continued(
        self,
        assistant_text: impl Into<String>,
        follow_up: impl Into<String>,
    ) -> Self {
        self.with_turn(TurnRole::Assistant, assistant_text)
            .with_turn(TurnRole::User, follow_up)
    }

    /// Role-labeled single-string rendering for backends that only accept
    /// plain text.
    #[must_use]
    pub fn flattened_text(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
pub trait Completion: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;
}

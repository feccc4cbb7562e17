//! Generative answer backend: the `AnswerSource` seam and the Gemini client behind it.

mod gemini;

pub use gemini::{
    no_answer_reason, parse_answer, Candidate, Content, GeminiClient, GeminiError,
    GenerateContentResponse, Part, PromptFeedback,
};

use async_trait::async_trait;

/// Outcome of asking the generative backend. Failures are already folded into `NoAnswer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    /// Call failed, timed out, or the response carried no usable text.
    NoAnswer,
    /// No API key configured; nothing was sent.
    Unconfigured,
}

/// Something that turns a user utterance into an `Answer`. Never fails.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn answer(&self, prompt: &str) -> Answer;
}

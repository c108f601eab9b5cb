//! Answer types and the fixed user-facing messages.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Replies used when retrieval finds nothing relevant. One is picked per
/// question by a stable hash, so the same question always gets the same reply.
pub const NO_INFORMATION_MESSAGES: [&str; 3] = [
    "Sorry, the knowledge base has no information on this question.",
    "I could not find anything about this in the available documents.",
    "There is nothing relevant to this question in the knowledge base yet.",
];

/// Reply when relevant context exists but the model found no answer in it.
pub const NO_EXACT_ANSWER_MESSAGE: &str =
    "Unfortunately, the knowledge base does not contain an exact answer to your question.";

/// Reply when answering failed for technical reasons.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, an error occurred while generating the answer. Please try again later.";

/// Why an answer has the text it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Synthesized from retrieved context
    Grounded,
    /// Nothing cleared the similarity threshold
    NoInformation,
    /// Context was found but held no answer
    NoExactAnswer,
    /// A failure was converted into an apology
    Failed,
}

/// A source used to answer a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source file or document name
    pub source: String,

    /// Human-readable location within the source
    pub location: String,

    /// Short evidence snippet
    pub snippet: String,

    pub score: f32,
}

/// The final reply to a question. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub kind: AnswerKind,
    pub sources: Vec<SourceRef>,
    /// Highest similarity among the retrieved chunks, 0 when none
    pub max_score: f32,
}

impl Answer {
    pub fn grounded(text: impl Into<String>, sources: Vec<SourceRef>, max_score: f32) -> Self {
        Self {
            text: text.into(),
            kind: AnswerKind::Grounded,
            sources,
            max_score,
        }
    }

    pub fn no_information(question: &str) -> Self {
        Self {
            text: no_information_message(question).to_string(),
            kind: AnswerKind::NoInformation,
            sources: Vec::new(),
            max_score: 0.0,
        }
    }

    pub fn no_exact_answer(sources: Vec<SourceRef>, max_score: f32) -> Self {
        Self {
            text: NO_EXACT_ANSWER_MESSAGE.to_string(),
            kind: AnswerKind::NoExactAnswer,
            sources,
            max_score,
        }
    }

    pub fn apology() -> Self {
        Self {
            text: APOLOGY_MESSAGE.to_string(),
            kind: AnswerKind::Failed,
            sources: Vec::new(),
            max_score: 0.0,
        }
    }
}

/// The no-information reply for `question`: SHA-256 of the question text,
/// first 8 bytes as a big-endian integer, modulo the number of replies.
pub fn no_information_message(question: &str) -> &'static str {
    let digest = Sha256::digest(question.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let slot = u64::from_be_bytes(prefix) % NO_INFORMATION_MESSAGES.len() as u64;
    NO_INFORMATION_MESSAGES[slot as usize]
}

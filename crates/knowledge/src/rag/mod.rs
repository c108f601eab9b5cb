//! Grounded answering over a knowledge base.
//!
//! Retrieved chunks become the context for an [`AnswerModel`]; the
//! [`Answerer`] maps every outcome, including failures, to a non-empty reply.

pub mod ask;
pub mod model;
pub mod types;

pub use ask::Answerer;
pub use model::{create_answer_model, AnswerModel, ExtractiveAnswerModel, LlmAnswerModel};
pub use types::{
    no_information_message, Answer, AnswerKind, SourceRef, APOLOGY_MESSAGE,
    NO_EXACT_ANSWER_MESSAGE, NO_INFORMATION_MESSAGES,
};

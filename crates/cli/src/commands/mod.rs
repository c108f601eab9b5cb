//! Command handlers for the docqa CLI.

pub mod ask;
pub mod knowledge;

pub use ask::AskCommand;
pub use knowledge::KnowledgeCommand;

use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::{config::load_config, create_answer_model, KnowledgeBase};
use std::time::Duration;

/// Open a knowledge base with the answer model selected in `config`.
pub(crate) async fn open_base(config: &AppConfig, base: &str) -> AppResult<KnowledgeBase> {
    let base_config = load_config(&config.workspace, base)?;
    let answer_model = create_answer_model(
        config,
        Duration::from_secs(base_config.answer_timeout_secs),
    )?;

    KnowledgeBase::open(&config.workspace, base, answer_model).await
}

/// Pretty-printed JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

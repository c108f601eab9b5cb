//! Ask command handler.
//!
//! Answers a question from the chunks retrieved out of a knowledge base.

use super::{open_base, print_json};
use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::DEFAULT_BASE;

/// Ask a question answered from a knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Knowledge base to answer from
    #[arg(short, long, default_value = DEFAULT_BASE)]
    pub base: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command against base '{}'", self.base);

        let base = open_base(config, &self.base).await?;
        let answer = base.ask(&self.question).await;

        tracing::debug!(
            "Answer kind={:?}, max_score={:.3}, sources={}",
            answer.kind,
            answer.max_score,
            answer.sources.len()
        );

        if self.json {
            return print_json(&answer);
        }

        println!("{}", answer.text);
        if !answer.sources.is_empty() {
            println!();
            println!("Sources:");
            for source_ref in &answer.sources {
                println!(
                    "- {} ({}, score {:.3})",
                    source_ref.source, source_ref.location, source_ref.score
                );
            }
        }

        Ok(())
    }
}

//! Prompt system for docqa.
//!
//! Structured prompt management with:
//! - YAML-based prompt definitions under `.docqa/prompts/`
//! - Handlebars template rendering
//! - A built-in grounded-answer prompt used when no override exists

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use loader::{builtin_prompt, load_or_builtin, load_prompt, GROUNDED_ANSWER_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};

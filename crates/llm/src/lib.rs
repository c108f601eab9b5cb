//! LLM integration crate for docqa.
//!
//! Provider-agnostic access to text generation models. The knowledge crate
//! uses it to turn a grounded prompt into a free-text answer.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use docqa_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::with_timeout("http://localhost:11434", Duration::from_secs(60))?;
//! let request = LlmRequest::new("Where is the head office?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OllamaClient;
pub use types::ProviderType;

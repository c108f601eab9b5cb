//! Answer models: turn `(context, question)` into an answer span.

use crate::text::normalized_words;
use docqa_core::{AppConfig, AppError, AppResult};
use docqa_llm::{create_client, LlmClient, LlmRequest};
use docqa_prompt::{build_prompt, load_or_builtin, PromptDefinition, GROUNDED_ANSWER_ID};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Context lines returned by the extractive model
const MAX_EXTRACTED_LINES: usize = 3;

/// Sampling temperature for generated answers
const ANSWER_TEMPERATURE: f32 = 0.3;

const ANSWER_MAX_TOKENS: u32 = 1000;

/// Produces an answer from retrieved context.
///
/// `Ok(None)` means the model ran but found no answer in the context.
#[async_trait::async_trait]
pub trait AnswerModel: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    async fn answer(&self, context: &str, question: &str) -> AppResult<Option<String>>;
}

/// Returns the first context lines that share a word with the question.
#[derive(Debug, Default)]
pub struct ExtractiveAnswerModel;

#[async_trait::async_trait]
impl AnswerModel for ExtractiveAnswerModel {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn answer(&self, context: &str, question: &str) -> AppResult<Option<String>> {
        let question_words: HashSet<String> = normalized_words(question).into_iter().collect();
        if question_words.is_empty() {
            return Ok(None);
        }

        let relevant: Vec<&str> = context
            .lines()
            .filter(|line| {
                normalized_words(line)
                    .iter()
                    .any(|word| question_words.contains(word))
            })
            .take(MAX_EXTRACTED_LINES)
            .collect();

        if relevant.is_empty() {
            Ok(None)
        } else {
            Ok(Some(relevant.join("\n")))
        }
    }
}

/// Generates an answer with an LLM from the grounded-answer prompt.
#[derive(Debug)]
pub struct LlmAnswerModel {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
}

impl LlmAnswerModel {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
        }
    }
}

#[async_trait::async_trait]
impl AnswerModel for LlmAnswerModel {
    fn name(&self) -> &str {
        self.client.provider_name()
    }

    async fn answer(&self, context: &str, question: &str) -> AppResult<Option<String>> {
        let mut variables = HashMap::new();
        variables.insert("context".to_string(), context.to_string());
        variables.insert("question".to_string(), question.to_string());
        let built = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(ANSWER_TEMPERATURE)
            .with_max_tokens(ANSWER_MAX_TOKENS);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.client.complete(&request).await?;
        tracing::debug!(
            model = %response.model,
            tokens = response.usage.total_tokens,
            "Generated answer"
        );

        let text = response.content.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

/// Build the answer model selected in the application config.
///
/// The LLM-backed model reads `.docqa/prompts/answer.grounded.yml` when it
/// exists and the built-in prompt otherwise.
pub fn create_answer_model(config: &AppConfig, timeout: Duration) -> AppResult<Arc<dyn AnswerModel>> {
    match config.provider.as_str() {
        "extractive" => Ok(Arc::new(ExtractiveAnswerModel)),
        "ollama" => {
            let client = create_client("ollama", config.endpoint.as_deref(), timeout)?;
            let prompt = load_or_builtin(&config.workspace, GROUNDED_ANSWER_ID)?;
            Ok(Arc::new(LlmAnswerModel::new(client, &config.model, prompt)))
        }
        other => Err(AppError::Config(format!("Unknown answer provider: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_llm::{LlmResponse, LlmUsage};
    use docqa_prompt::builtin_prompt;
    use std::sync::Mutex;

    /// Records the last request and replies with a fixed text.
    #[derive(Debug)]
    struct CannedClient {
        reply: String,
        last_request: Mutex<Option<LlmRequest>>,
    }

    impl CannedClient {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                last_request: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for CannedClient {
        fn provider_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            Ok(LlmResponse {
                content: self.reply.clone(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    #[tokio::test]
    async fn test_extractive_returns_matching_lines() {
        let context = "Москва — столица России.\nПариж — столица Франции.\nБорщ варят со свёклой.";

        let answer = ExtractiveAnswerModel
            .answer(context, "Какая столица России?")
            .await
            .unwrap();

        assert_eq!(
            answer.as_deref(),
            Some("Москва — столица России.\nПариж — столица Франции.")
        );
    }

    #[tokio::test]
    async fn test_extractive_caps_lines() {
        let context = "a x\nb x\nc x\nd x\ne x";
        let answer = ExtractiveAnswerModel.answer(context, "x").await.unwrap().unwrap();
        assert_eq!(answer.lines().count(), MAX_EXTRACTED_LINES);
    }

    #[tokio::test]
    async fn test_extractive_none_without_overlap() {
        let answer = ExtractiveAnswerModel
            .answer("Борщ варят со свёклой.", "Where is the office?")
            .await
            .unwrap();
        assert!(answer.is_none());
    }

    #[tokio::test]
    async fn test_llm_model_sends_grounded_prompt() {
        let client = Arc::new(CannedClient::new("  Moscow.  "));
        let model = LlmAnswerModel::new(client.clone(), "llama3.2", builtin_prompt());

        let answer = model.answer("Moscow is the capital.", "Capital?").await.unwrap();
        assert_eq!(answer.as_deref(), Some("Moscow."));

        let request = client.last_request.lock().unwrap().clone().unwrap();
        assert!(request.prompt.contains("Moscow is the capital."));
        assert!(request.prompt.contains("Capital?"));
        assert!(request.system.is_some());
        assert_eq!(request.temperature, Some(ANSWER_TEMPERATURE));
    }

    #[tokio::test]
    async fn test_llm_blank_reply_is_none() {
        let model = LlmAnswerModel::new(Arc::new(CannedClient::new(" \n ")), "m", builtin_prompt());
        assert!(model.answer("ctx", "q").await.unwrap().is_none());
    }

    #[test]
    fn test_create_answer_model() {
        let config = AppConfig::default();
        let model = create_answer_model(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(model.name(), "extractive");

        let config = AppConfig {
            provider: "ollama".to_string(),
            ..AppConfig::default()
        };
        let model = create_answer_model(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(model.name(), "ollama");

        let config = AppConfig {
            provider: "gpt".to_string(),
            ..AppConfig::default()
        };
        assert!(create_answer_model(&config, Duration::from_secs(5)).is_err());
    }
}

//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use docqa_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifier of the prompt used to synthesize grounded answers.
pub const GROUNDED_ANSWER_ID: &str = "answer.grounded";

const GROUNDED_ANSWER_SYSTEM: &str = "You answer questions using only the provided context. \
Be precise and informative. Reply in the language of the question. \
If the context does not contain the answer, say so honestly.";

const GROUNDED_ANSWER_TEMPLATE: &str = "Context:\n{{context}}\n\nQuestion: {{question}}\n";

/// The built-in grounded-answer prompt.
pub fn builtin_prompt() -> PromptDefinition {
    PromptDefinition {
        id: GROUNDED_ANSWER_ID.to_string(),
        title: "Grounded answer".to_string(),
        api_version: "1.0".to_string(),
        created_by: "docqa".to_string(),
        system: Some(GROUNDED_ANSWER_SYSTEM.to_string()),
        template: GROUNDED_ANSWER_TEMPLATE.to_string(),
    }
}

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".docqa/prompts")
}

/// Load a prompt definition by ID from `.docqa/prompts/<id>.yml`.
///
/// # Example
/// ```no_run
/// use docqa_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "answer.grounded")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Load a workspace override if one exists, otherwise the built-in prompt.
///
/// Only [`GROUNDED_ANSWER_ID`] has a built-in fallback; other ids must exist
/// on disk.
pub fn load_or_builtin(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let on_disk = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));
    if on_disk.exists() || prompt_id != GROUNDED_ANSWER_ID {
        return load_prompt(workspace_path, prompt_id);
    }

    tracing::debug!("Using built-in prompt {}", GROUNDED_ANSWER_ID);
    Ok(builtin_prompt())
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, body: &str) {
        let prompts = prompts_dir(dir);
        fs::create_dir_all(&prompts).unwrap();
        fs::write(prompts.join(format!("{}.yml", id)), body).unwrap();
    }

    fn valid_body(id: &str) -> String {
        format!(
            "id: {}\ntitle: Custom\napiVersion: \"1.0\"\ntemplate: \"{{{{context}}}} / {{{{question}}}}\"\n",
            id
        )
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp = TempDir::new().unwrap();
        write_prompt(temp.path(), "custom", &valid_body("custom"));

        let def = load_prompt(temp.path(), "custom").unwrap();
        assert_eq!(def.id, "custom");
        assert_eq!(def.template, "{{context}} / {{question}}");
    }

    #[test]
    fn test_load_missing_prompt() {
        let temp = TempDir::new().unwrap();
        let result = load_prompt(temp.path(), "nope");
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_invalid_api_version_rejected() {
        let temp = TempDir::new().unwrap();
        write_prompt(
            temp.path(),
            "bad",
            "id: bad\ntitle: Bad\napiVersion: \"1\"\ntemplate: x\n",
        );
        assert!(load_prompt(temp.path(), "bad").is_err());
    }

    #[test]
    fn test_builtin_used_without_override() {
        let temp = TempDir::new().unwrap();
        let def = load_or_builtin(temp.path(), GROUNDED_ANSWER_ID).unwrap();
        assert_eq!(def.created_by, "docqa");
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp = TempDir::new().unwrap();
        write_prompt(temp.path(), GROUNDED_ANSWER_ID, &valid_body(GROUNDED_ANSWER_ID));

        let def = load_or_builtin(temp.path(), GROUNDED_ANSWER_ID).unwrap();
        assert_eq!(def.title, "Custom");
    }
}

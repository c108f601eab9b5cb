//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use docqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Both the template and the optional system message are rendered with the
/// same variables. Missing variables render as empty strings.
///
/// # Example
/// ```no_run
/// use docqa_prompt::{build_prompt, builtin_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("context".to_string(), "The office is in Moscow.".to_string());
/// vars.insert("question".to_string(), "Where is the office?".to_string());
///
/// let built = build_prompt(&builtin_prompt(), vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut handlebars = Handlebars::new();
    // Prompts are plain text, not HTML.
    handlebars.register_escape_fn(handlebars::no_escape);

    let user = render(&mut handlebars, "template", &definition.template, &variables)?;
    let system = match &definition.system {
        Some(system) => Some(render(&mut handlebars, "system", system, &variables)?),
        None => None,
    };

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

fn render(
    handlebars: &mut Handlebars<'_>,
    name: &str,
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template {}: {}", name, e)))?;

    handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::builtin_prompt;

    fn definition(template: &str) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            system: None,
            template: template.to_string(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let built = build_prompt(&definition("Question: {{question}}"), vars).unwrap();
        assert_eq!(built.user, "Question: Hello, world!");
        assert!(built.system.is_none());
    }

    #[test]
    fn test_no_html_escaping() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "a < b & \"c\"".to_string());

        let built = build_prompt(&definition("{{question}}"), vars).unwrap();
        assert_eq!(built.user, "a < b & \"c\"");
    }

    #[test]
    fn test_builtin_prompt_includes_context_and_question() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "Офис находится в Москве.".to_string());
        vars.insert("question".to_string(), "Где офис?".to_string());

        let built = build_prompt(&builtin_prompt(), vars).unwrap();
        assert!(built.user.contains("Офис находится в Москве."));
        assert!(built.user.contains("Где офис?"));
        assert!(built.system.is_some());
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let built = build_prompt(&definition("Q: {{missing}}"), HashMap::new()).unwrap();
        assert_eq!(built.user, "Q: ");
    }

    #[test]
    fn test_invalid_template_is_prompt_error() {
        let result = build_prompt(&definition("{{#if ready}}unclosed"), HashMap::new());
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}

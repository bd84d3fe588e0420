//! Prompt templates mapping a change intent to a system/user message pair.
//!
//! Templates are pure string-formatting specifications. The `update_code`
//! template is load-bearing: its instructions pin the model's output format
//! to a bare JSON object mapping file paths to contents, which the
//! generation orchestrator parses without any leniency for prose or fences.

use crate::error::GenerationError;

/// A rendered system/user message pair ready for the completion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Parameters available to templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateParams {
    /// The user's requirement (story text plus any notes).
    pub requirement: String,
    /// Existing codebase serialized as a JSON object text block.
    pub existing_code: Option<String>,
}

struct PromptTemplate {
    system: &'static str,
    user: &'static str,
}

const GENERATE_CODE: PromptTemplate = PromptTemplate {
    system: "You are an AI coding assistant. Produce code that fulfills the user's requirement.\n\
        Follow these guidelines:\n\
        1. Write modular, reusable code with error handling\n\
        2. Organize code into appropriate files and modules\n\
        3. Use descriptive file names that reflect their purpose\n\
        4. Return a JSON object mapping file paths to file contents\n\
        5. Do not include markdown code blocks or any other formatting around the JSON",
    user: "The user wants the following feature:\n\
        {requirement}\n\n\
        Write a program that fulfills this requirement.\n\
        Use best practices, documentation comments, and clear code structure.\n\
        Organize the code into appropriate files and modules.\n\
        Return a JSON object where keys are file paths and values are the file contents.\n\
        Example format:\n\
        {\"main.py\": \"content of main.py\", \"utils/helpers.py\": \"content of helpers.py\"}",
};

const UPDATE_CODE: PromptTemplate = PromptTemplate {
    system: "You are an AI coding assistant. Modify the given code to fulfill the user story.\n\
        Follow these guidelines:\n\
        1. Preserve existing functionality and code style\n\
        2. Only change what is necessary\n\
        3. Create new files if needed for better code organization\n\
        4. IMPORTANT: Your response must be a single valid JSON object with string keys and values\n\
        5. Keys are file paths, values are complete updated file contents\n\
        6. Do not include markdown code blocks, fencing, or any prose around the JSON\n\
        7. The response must be in exactly this format:\n\
        {\"file/path/one.py\": \"content of file one\", \"file/path/two.py\": \"content of file two\"}",
    user: "Existing codebase (JSON object mapping file paths to code):\n\
        {existing_code}\n\n\
        The user story is:\n\
        {requirement}\n\n\
        Update the existing codebase to fulfill this requirement, preserving existing functionality.\n\
        Only change what is necessary. You may create new files for better organization.\n\
        Return a JSON object where keys are file paths and values are the updated file contents.\n\
        Remember: your response must be a valid JSON object without any markdown formatting.",
};

/// Render a named template with the given parameters.
pub fn render(name: &str, params: &TemplateParams) -> Result<RenderedPrompt, GenerationError> {
    let template = match name {
        "generate_code" => &GENERATE_CODE,
        "update_code" => &UPDATE_CODE,
        other => return Err(GenerationError::TemplateNotFound(other.to_string())),
    };

    let user = template
        .user
        .replace("{requirement}", &params.requirement)
        .replace(
            "{existing_code}",
            params.existing_code.as_deref().unwrap_or("{}"),
        );

    Ok(RenderedPrompt {
        system: template.system.to_string(),
        user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_template_fails() {
        let err = render("refactor_everything", &TemplateParams::default()).unwrap_err();
        assert!(matches!(err, GenerationError::TemplateNotFound(name) if name == "refactor_everything"));
    }

    #[test]
    fn generate_code_interpolates_requirement() {
        let params = TemplateParams {
            requirement: "Add health check endpoint".to_string(),
            existing_code: None,
        };
        let prompt = render("generate_code", &params).unwrap();
        assert!(prompt.user.contains("Add health check endpoint"));
        assert!(prompt.system.contains("JSON object"));
    }

    #[test]
    fn update_code_embeds_existing_codebase() {
        let params = TemplateParams {
            requirement: "Rename the greeting".to_string(),
            existing_code: Some(r#"{"main.py": "print('hello')"}"#.to_string()),
        };
        let prompt = render("update_code", &params).unwrap();
        assert!(prompt.user.contains(r#""main.py""#));
        assert!(prompt.user.contains("Rename the greeting"));
    }

    #[test]
    fn update_code_pins_output_format() {
        let prompt = render("update_code", &TemplateParams::default()).unwrap();
        // The orchestrator parses the raw response as JSON; the template must
        // forbid prose and fencing.
        assert!(prompt.system.contains("valid JSON object"));
        assert!(prompt.system.contains("Do not include markdown"));
    }
}

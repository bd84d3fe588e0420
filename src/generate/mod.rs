//! Code generation orchestrator.
//!
//! Drives the template engine and the completion provider, parses the
//! response into a [`FileSet`], and owns the retry policy: transport
//! failures get a bounded exponential backoff, malformed model output fails
//! immediately (the backend runs near temperature 0, so a blind retry would
//! likely reproduce the same malformed output).

pub mod clean;

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::completion::{CompletionProvider, Message, retry_with_backoff};
use crate::error::GenerationError;
use crate::fileset::FileSet;
use crate::request::ChangeRequest;
use crate::templates::{self, TemplateParams};

pub use clean::clean_code_block;

/// Orchestrates one generation call: Rendering -> AwaitingCompletion ->
/// Parsing -> Done/Failed. No intermediate persistence; a failure at any
/// stage discards all work for the call.
pub struct Generator {
    provider: Box<dyn CompletionProvider>,
}

impl Generator {
    pub fn new(provider: Box<dyn CompletionProvider>) -> Self {
        Generator { provider }
    }

    /// Generate a fresh project for the request.
    pub async fn generate_from_scratch(
        &self,
        request: &ChangeRequest,
    ) -> Result<FileSet, GenerationError> {
        let params = TemplateParams {
            requirement: requirement_text(request),
            existing_code: None,
        };
        self.run_template("generate_code", &params).await
    }

    /// Generate an updated file set against an existing snapshot.
    ///
    /// The result may introduce paths not present in `existing`; callers
    /// only ever apply paths explicitly present in the result, and never
    /// delete paths missing from it.
    pub async fn generate_update(
        &self,
        request: &ChangeRequest,
        existing: &FileSet,
    ) -> Result<FileSet, GenerationError> {
        let params = TemplateParams {
            requirement: requirement_text(request),
            existing_code: Some(existing.to_json()),
        };
        self.run_template("update_code", &params).await
    }

    async fn run_template(
        &self,
        template_name: &str,
        params: &TemplateParams,
    ) -> Result<FileSet, GenerationError> {
        let prompt = templates::render(template_name, params)?;
        let messages = [Message::system(prompt.system), Message::user(prompt.user)];

        debug!(template = template_name, "Requesting completion");
        let response = retry_with_backoff(
            || self.provider.complete(&messages),
            GenerationError::is_transport,
            |e| GenerationError::RetriesExhausted(Box::new(e)),
        )
        .await?;

        parse_file_set(&response)
    }
}

/// Fold the request's story and notes into a single requirement text block.
fn requirement_text(request: &ChangeRequest) -> String {
    if request.notes().trim().is_empty() {
        request.story().to_string()
    } else {
        format!(
            "{}\n\nAdditional notes:\n{}",
            request.story(),
            request.notes()
        )
    }
}

/// Parse a completion response as a JSON object mapping paths to contents.
///
/// An enclosing fence around the JSON itself is tolerated, and every file
/// content passes through [`clean_code_block`] so fenced per-file values
/// never land on disk.
fn parse_file_set(response: &str) -> Result<FileSet, GenerationError> {
    let body = clean_code_block(response);

    let parsed: BTreeMap<String, String> = serde_json::from_str(&body).map_err(|e| {
        warn!("Generation response was not a JSON path->content object: {e}");
        GenerationError::InvalidOutput(format!(
            "expected a JSON object mapping file paths to contents: {e}; response: {}",
            truncate(&body, 200)
        ))
    })?;

    if parsed.is_empty() {
        return Err(GenerationError::InvalidOutput(
            "generation produced an empty file set".to_string(),
        ));
    }

    let mut files = FileSet::new();
    for (path, content) in parsed {
        files.insert(path, clean_code_block(&content))?;
    }
    Ok(files)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

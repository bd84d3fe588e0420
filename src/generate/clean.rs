//! Fence stripping for model output.

/// Strip a single enclosing fenced-code block from `text`.
///
/// Removes the leading fence line (three backticks plus an optional language
/// tag) and the trailing fence line, if and only if both are present.
/// Unfenced input is returned unchanged. Applying this twice equals applying
/// it once, except when the interior is itself a complete fenced block: each
/// call strips exactly one enclosing layer.
pub fn clean_code_block(text: &str) -> String {
    let trimmed = text.trim();

    let Some(first_newline) = trimmed.find('\n') else {
        // A single line can't carry both an opening and closing fence.
        return trimmed.to_string();
    };

    let first_line = trimmed[..first_newline].trim_end();
    let Some(last_newline) = trimmed.rfind('\n') else {
        return trimmed.to_string();
    };
    let last_line = trimmed[last_newline + 1..].trim();

    if is_opening_fence(first_line) && last_line == "```" {
        if last_newline > first_newline {
            trimmed[first_newline + 1..last_newline].trim().to_string()
        } else {
            // Exactly two lines: an opening and a closing fence around nothing.
            String::new()
        }
    } else {
        trimmed.to_string()
    }
}

/// A fence line is three backticks followed by at most a language tag.
fn is_opening_fence(line: &str) -> bool {
    line.strip_prefix("```")
        .is_some_and(|rest| rest.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '+' || c == '-'))
}

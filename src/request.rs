//! Change requests: the validated unit of work entering the system.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum user story length in characters.
pub const MAX_STORY_LEN: usize = 1000;

/// Maximum notes length in characters.
pub const MAX_NOTES_LEN: usize = 2000;

/// Classification of how urgent a change request is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(ValidationError::InvalidPriority(other.to_string())),
        }
    }
}

/// A user's natural-language requirement plus metadata.
///
/// Constructed once at the system boundary through [`ChangeRequest::new`],
/// which enforces the length and enum invariants; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    story: String,
    priority: Priority,
    notes: String,
    /// Hosting URL of the target repository; empty means "generate fresh".
    repository: String,
}

impl ChangeRequest {
    pub fn new(
        story: impl Into<String>,
        priority: Priority,
        notes: impl Into<String>,
        repository: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let story = story.into();
        let notes = notes.into();

        if story.trim().is_empty() {
            return Err(ValidationError::StoryMissing);
        }
        if story.chars().count() > MAX_STORY_LEN {
            return Err(ValidationError::StoryTooLong(story.chars().count()));
        }
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(ValidationError::NotesTooLong(notes.chars().count()));
        }

        Ok(ChangeRequest {
            story,
            priority,
            notes,
            repository: repository.into(),
        })
    }

    pub fn story(&self) -> &str {
        &self.story
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// The raw repository target; `None` when the request asks for a fresh
    /// project instead of a change to an existing one.
    pub fn repository(&self) -> Option<&str> {
        let trimmed = self.repository.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

//! Story record store.
//!
//! Persists one record per processed change request. Writes are best-effort:
//! the workflow goes through [`record_best_effort`], which logs a failure
//! and moves on. The generated or published artifact is the primary
//! deliverable, the record is secondary.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::request::Priority;

/// One processed change request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRecord {
    pub story: String,
    pub priority: Priority,
    pub notes: String,
    pub repository: Option<String>,
    pub branch_name: Option<String>,
    pub pull_request_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Narrow interface to the record store; the persistence layer behind it is
/// pluggable.
pub trait StoryStore: Send + Sync {
    fn append(&self, record: &StoryRecord) -> Result<(), StoreError>;
}

/// Append-only JSONL file store.
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoryStore for JsonlStore {
    fn append(&self, record: &StoryRecord) -> Result<(), StoreError> {
        let line = serde_json::to_string(record).map_err(StoreError::SerializeFailed)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::WriteFailed)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(StoreError::WriteFailed)?;
        writeln!(file, "{line}").map_err(StoreError::WriteFailed)
    }
}

/// Fire-and-log write wrapper: a store failure never fails the operation.
pub fn record_best_effort(store: &dyn StoryStore, record: &StoryRecord) {
    if let Err(e) = store.append(record) {
        warn!("Failed to persist story record: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StoryRecord {
        StoryRecord {
            story: "Add health check endpoint".to_string(),
            priority: Priority::High,
            notes: String::new(),
            repository: Some("https://github.com/acme/widgets".to_string()),
            branch_name: Some("feature/user-story-update-20240101000000".to_string()),
            pull_request_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn appends_one_json_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("stories.jsonl"));

        store.append(&record()).unwrap();
        store.append(&record()).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: StoryRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.story, "Add health check endpoint");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("nested/deep/stories.jsonl"));
        store.append(&record()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn best_effort_swallows_failures() {
        struct FailingStore;
        impl StoryStore for FailingStore {
            fn append(&self, _record: &StoryRecord) -> Result<(), StoreError> {
                Err(StoreError::WriteFailed(std::io::Error::other("disk full")))
            }
        }

        // Must not panic or propagate.
        record_best_effort(&FailingStore, &record());
    }
}

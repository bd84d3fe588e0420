//! storyforge - turns natural-language user stories into code changes.
//!
//! # Overview
//!
//! storyforge takes a user story (plus priority, notes, and an optional
//! target repository), asks a completion backend (OpenAI or Ollama) to
//! generate or modify source files, and lands the result either as a fresh
//! project tree on disk or as a branch plus pull request on the target
//! repository (GitHub or Bitbucket Server).

pub mod completion;
pub mod config;
pub mod error;
pub mod fileset;
pub mod generate;
pub mod hosting;
pub mod publish;
pub mod request;
pub mod snapshot;
pub mod store;
pub mod templates;
pub mod workflow;

// Re-export commonly used types
pub use config::{Config, HostKind, ProviderKind};
pub use error::{
    ConfigError, GenerationError, GitError, HostingError, SnapshotError, StoreError,
    ValidationError, WorkflowError,
};
pub use fileset::FileSet;
pub use generate::Generator;
pub use hosting::{HostingProvider, RepositoryIdentity, RepositorySummary, UserInfo};
pub use publish::PublishResult;
pub use request::{ChangeRequest, Priority};
pub use workflow::{Outcome, Workflow};

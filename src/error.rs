//! Error types for storyforge modules using thiserror.

use thiserror::Error;

/// Errors from change request validation. Surfaced at the system boundary
/// before any side effect is attempted.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("User story is required")]
    StoryMissing,

    #[error("User story is too long ({0} chars, max {max})", max = crate::request::MAX_STORY_LEN)]
    StoryTooLong(usize),

    #[error("Notes are too long ({0} chars, max {max})", max = crate::request::MAX_NOTES_LEN)]
    NotesTooLong(usize),

    #[error("Priority must be one of: low, medium, high (got '{0}')")]
    InvalidPriority(String),
}

/// Errors from rendering templates and calling the generation backend.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Generation backend failure: {0}")]
    Backend(String),

    #[error("Invalid generation output: {0}")]
    InvalidOutput(String),

    #[error("Generated file path is not a safe relative path: {0}")]
    UnsafePath(String),

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<GenerationError>),
}

impl GenerationError {
    /// Transport-level failures are retried; malformed model output is not,
    /// since the backend runs near temperature 0 and would likely reproduce
    /// the same output.
    pub fn is_transport(&self) -> bool {
        matches!(self, GenerationError::Backend(_))
    }
}

/// Errors from snapshotting a working tree.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot root does not exist or is not a directory: {0}")]
    RootNotFound(std::path::PathBuf),

    #[error("Failed to walk working tree: {0}")]
    Walk(#[source] ignore::Error),
}

/// Errors from git operations (clone, fetch, checkout, branch, commit, push).
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to clone {url}: {source}")]
    CloneFailed {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to open repository at {path}: {source}")]
    OpenFailed {
        path: std::path::PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to fetch from origin: {0}")]
    FetchFailed(#[source] git2::Error),

    #[error("Failed to checkout branch '{branch}': {source}")]
    CheckoutFailed {
        branch: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to create branch '{branch}': {source}")]
    BranchFailed {
        branch: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to write generated file {path}: {source}")]
    WriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to stage changes: {0}")]
    StagingFailed(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Failed to push branch '{branch}': {detail}")]
    PushFailed { branch: String, detail: String },

    #[error("Failed to remove corrupt checkout at {path}: {source}")]
    CleanupFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from remote hosting operations (listing, PR creation, auth).
#[derive(Error, Debug)]
pub enum HostingError {
    #[error("Invalid repository URL: {0}")]
    InvalidRepositoryUrl(String),

    #[error("Hosting provider '{0}' does not support OAuth authorization")]
    OAuthNotSupported(&'static str),

    #[error("Missing hosting configuration: {0}")]
    MissingConfig(&'static str),

    #[error("OAuth token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Hosting authentication failed: no access token available")]
    AuthenticationFailed,

    #[error("Repository not found: {owner}/{repo}")]
    RepositoryNotFound { owner: String, repo: String },

    #[error("Failed to create pull request: {0}")]
    CreatePullRequest(#[source] Box<octocrab::Error>),

    #[error("Failed to list repositories: {0}")]
    ListRepositories(#[source] Box<octocrab::Error>),

    #[error("Failed to fetch user info: {0}")]
    UserInfo(#[source] Box<octocrab::Error>),

    #[error("Hosting request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Hosting API returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Errors from the story record store. Absorbed by the best-effort write
/// wrapper; never fails the user-visible operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to serialize story record: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    #[error("Failed to write story record: {0}")]
    WriteFailed(#[source] std::io::Error),
}

/// Errors from loading configuration out of the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Unsupported model provider: {0} (expected 'openai' or 'ollama')")]
    UnknownModelProvider(String),

    #[error("Unsupported hosting provider: {0} (expected 'github' or 'bitbucket')")]
    UnknownHostingProvider(String),
}

/// Top-level error for one end-to-end change request.
///
/// Component errors propagate unhidden so the caller can report a precise
/// failure reason. [`StoreError`] is intentionally absent: record writes are
/// best-effort and absorbed at the call site.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Hosting(#[from] HostingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write generated project to {path}: {source}")]
    OutputWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

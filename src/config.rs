//! Environment-sourced configuration.
//!
//! All settings are read once at process start into a [`Config`] value and
//! passed down by reference; nothing re-reads the environment mid-process.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

/// Default request timeout for completion backend calls.
const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 60;

/// Request timeout for hosting metadata calls (listing, user info, PR creation).
pub const HOSTING_TIMEOUT_SECS: u64 = 10;

/// Which completion backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(ConfigError::UnknownModelProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => f.write_str("openai"),
            ProviderKind::Ollama => f.write_str("ollama"),
        }
    }
}

/// Which hosting backend to use for listing and pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    GitHub,
    Bitbucket,
}

impl HostKind {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "github" => Ok(HostKind::GitHub),
            "bitbucket" => Ok(HostKind::Bitbucket),
            other => Err(ConfigError::UnknownHostingProvider(other.to_string())),
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKind::GitHub => f.write_str("github"),
            HostKind::Bitbucket => f.write_str("bitbucket"),
        }
    }
}

/// Process configuration, sourced from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Canonical branch pull requests target. Never written to directly.
    pub base_branch: String,
    /// Root directory under which remote checkouts are kept and reused.
    pub repo_dir: PathBuf,
    /// Root directory for from-scratch project generation.
    pub output_dir: PathBuf,
    /// Completion backend selection.
    pub model_provider: ProviderKind,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    /// Timeout applied to each completion backend request.
    pub completion_timeout: Duration,
    /// Hosting backend selection.
    pub hosting_provider: HostKind,
    pub github_token: Option<String>,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
    pub github_callback_url: Option<String>,
    pub bitbucket_server_url: Option<String>,
    pub bitbucket_access_token: Option<String>,
    /// File extensions (without dot) eligible for snapshotting.
    pub snapshot_extensions: Vec<String>,
    /// Path of the JSONL story record file.
    pub store_path: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Provider credentials are optional here; the provider factories fail
    /// with a precise [`ConfigError`] when a selected backend is missing its
    /// credentials, so an unused backend never blocks startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        let repo_dir = PathBuf::from(env_or("REPO_DIR", "repos"));
        let store_path = repo_dir.join("user_stories.jsonl");

        Ok(Config {
            base_branch: env_or("BASE_BRANCH", "main"),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "generated")),
            model_provider: ProviderKind::parse(&env_or("MODEL_PROVIDER", "openai"))?,
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com"),
            openai_model: env_or("OPENAI_MODEL", "gpt-4"),
            ollama_base_url: env_or("OLLAMA_BASE_URL", "http://localhost:11434"),
            ollama_model: env_or("OLLAMA_MODEL", "codellama"),
            completion_timeout: completion_timeout_from_env(),
            hosting_provider: HostKind::parse(&env_or("GIT_PROVIDER", "github"))?,
            github_token: env_opt("GITHUB_TOKEN"),
            github_client_id: env_opt("GITHUB_CLIENT_ID"),
            github_client_secret: env_opt("GITHUB_CLIENT_SECRET"),
            github_callback_url: env_opt("GITHUB_CALLBACK_URL"),
            bitbucket_server_url: env_opt("BITBUCKET_SERVER_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
            bitbucket_access_token: env_opt("BITBUCKET_ACCESS_TOKEN"),
            snapshot_extensions: parse_extensions(&env_or("SNAPSHOT_EXTENSIONS", "py")),
            repo_dir,
            store_path,
        })
    }
}

/// Read a var, falling back to a default when unset or empty.
fn env_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

/// Read an optional var; empty counts as unset.
fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn completion_timeout_from_env() -> Duration {
    match env::var("COMPLETION_TIMEOUT_SECS") {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                warn!(
                    "Invalid COMPLETION_TIMEOUT_SECS value '{}', using default {}s",
                    v, DEFAULT_COMPLETION_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_COMPLETION_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_COMPLETION_TIMEOUT_SECS),
    }
}

/// Split a comma-separated extension list, normalizing case and dots.
fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

//! Integration tests for environment-sourced configuration.
//!
//! Environment variables are process-global, so every test here is serialized.

use std::time::Duration;

use serial_test::serial;

use storyforge::config::{Config, HostKind, ProviderKind};
use storyforge::error::ConfigError;

const ALL_VARS: &[&str] = &[
    "BASE_BRANCH",
    "REPO_DIR",
    "OUTPUT_DIR",
    "MODEL_PROVIDER",
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "OPENAI_MODEL",
    "OLLAMA_BASE_URL",
    "OLLAMA_MODEL",
    "COMPLETION_TIMEOUT_SECS",
    "GIT_PROVIDER",
    "GITHUB_TOKEN",
    "GITHUB_CLIENT_ID",
    "GITHUB_CLIENT_SECRET",
    "GITHUB_CALLBACK_URL",
    "BITBUCKET_SERVER_URL",
    "BITBUCKET_ACCESS_TOKEN",
    "SNAPSHOT_EXTENSIONS",
];

#[test]
#[serial]
fn defaults_apply_when_nothing_is_set() {
    temp_env::with_vars_unset(ALL_VARS.to_vec(), || {
        let config = Config::from_env().unwrap();

        assert_eq!(config.base_branch, "main");
        assert_eq!(config.repo_dir, std::path::PathBuf::from("repos"));
        assert_eq!(config.output_dir, std::path::PathBuf::from("generated"));
        assert_eq!(config.model_provider, ProviderKind::OpenAi);
        assert_eq!(config.hosting_provider, HostKind::GitHub);
        assert_eq!(config.openai_model, "gpt-4");
        assert_eq!(config.ollama_base_url, "http://localhost:11434");
        assert_eq!(config.completion_timeout, Duration::from_secs(60));
        assert_eq!(config.snapshot_extensions, vec!["py"]);
        assert_eq!(
            config.store_path,
            std::path::PathBuf::from("repos/user_stories.jsonl")
        );
        assert!(config.openai_api_key.is_none());
    });
}

#[test]
#[serial]
fn overrides_are_picked_up() {
    temp_env::with_vars(
        [
            ("BASE_BRANCH", Some("develop")),
            ("REPO_DIR", Some("/var/lib/storyforge/repos")),
            ("MODEL_PROVIDER", Some("ollama")),
            ("OLLAMA_MODEL", Some("deepseek-coder")),
            ("GIT_PROVIDER", Some("bitbucket")),
            ("BITBUCKET_SERVER_URL", Some("https://bb.example.com/")),
            ("BITBUCKET_ACCESS_TOKEN", Some("bb-token")),
            ("COMPLETION_TIMEOUT_SECS", Some("120")),
            ("SNAPSHOT_EXTENSIONS", Some("py, .rs ,JS")),
        ],
        || {
            let config = Config::from_env().unwrap();

            assert_eq!(config.base_branch, "develop");
            assert_eq!(
                config.repo_dir,
                std::path::PathBuf::from("/var/lib/storyforge/repos")
            );
            assert_eq!(config.model_provider, ProviderKind::Ollama);
            assert_eq!(config.ollama_model, "deepseek-coder");
            assert_eq!(config.hosting_provider, HostKind::Bitbucket);
            // Trailing slash is trimmed so URL joins stay clean.
            assert_eq!(
                config.bitbucket_server_url.as_deref(),
                Some("https://bb.example.com")
            );
            assert_eq!(config.completion_timeout, Duration::from_secs(120));
            assert_eq!(config.snapshot_extensions, vec!["py", "rs", "js"]);
            assert_eq!(
                config.store_path,
                std::path::PathBuf::from("/var/lib/storyforge/repos/user_stories.jsonl")
            );
        },
    );
}

#[test]
#[serial]
fn unknown_model_provider_is_rejected() {
    temp_env::with_var("MODEL_PROVIDER", Some("anthropic"), || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::UnknownModelProvider(_))
        ));
    });
}

#[test]
#[serial]
fn unknown_hosting_provider_is_rejected() {
    temp_env::with_vars(
        [("MODEL_PROVIDER", Some("openai")), ("GIT_PROVIDER", Some("gitea"))],
        || {
            assert!(matches!(
                Config::from_env(),
                Err(ConfigError::UnknownHostingProvider(_))
            ));
        },
    );
}

#[test]
#[serial]
fn empty_values_fall_back_to_defaults() {
    temp_env::with_vars(
        [
            ("BASE_BRANCH", Some("")),
            ("MODEL_PROVIDER", Some("")),
            ("OPENAI_API_KEY", Some("  ")),
        ],
        || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.base_branch, "main");
            assert_eq!(config.model_provider, ProviderKind::OpenAi);
            assert!(config.openai_api_key.is_none());
        },
    );
}

#[test]
#[serial]
fn invalid_timeout_falls_back_to_default() {
    temp_env::with_var("COMPLETION_TIMEOUT_SECS", Some("soon"), || {
        let config = Config::from_env().unwrap();
        assert_eq!(config.completion_timeout, Duration::from_secs(60));
    });
}

//! storyforge - CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use storyforge::config::Config;
use storyforge::request::{ChangeRequest, Priority};
use storyforge::workflow::{Outcome, Workflow};

/// Turn a user story into code changes, landed locally or as a pull request.
#[derive(Parser, Debug)]
#[command(name = "storyforge")]
#[command(about = "Turn a user story into code changes via an LLM backend")]
#[command(version)]
struct Cli {
    /// The user story describing the desired change
    story: String,

    /// Priority of the story (low, medium, or high)
    #[arg(long, default_value = "medium")]
    priority: String,

    /// Additional notes for the generator
    #[arg(long, default_value = "")]
    notes: String,

    /// Target repository URL; omit to generate a fresh project locally
    #[arg(long)]
    repository: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let priority: Priority = cli.priority.parse().context("Invalid priority")?;
    let request = ChangeRequest::new(
        cli.story,
        priority,
        cli.notes,
        cli.repository.unwrap_or_default(),
    )
    .context("Invalid change request")?;

    let config = Config::from_env().context("Invalid configuration")?;
    let workflow = Workflow::from_config(config).context("Failed to initialize")?;

    match workflow.process(&request).await? {
        Outcome::Generated { output_dir, files } => {
            println!(
                "✓ Generated {} file(s) in {}",
                files.len(),
                output_dir.display()
            );
            for path in files.paths() {
                println!("  {path}");
            }
        }
        Outcome::Published(result) => {
            println!("✓ Pushed branch {}", result.branch_name);
            if let Some(url) = result.pull_request_url {
                println!("✓ Pull request: {url}");
            }
        }
    }

    Ok(())
}

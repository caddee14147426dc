use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pipeline_healer::agent::claude::ClaudeClient;
use pipeline_healer::config::AppConfig;
use pipeline_healer::platform::github::GitHubPlatform;
use pipeline_healer::platform::types::RepoId;
use pipeline_healer::platform::Platform;
use pipeline_healer::report;
use pipeline_healer::shutdown::cancel_on_shutdown;
use pipeline_healer::workflow::{EngineSettings, WorkflowEngine, WorkflowState};

#[derive(Parser)]
#[command(
    name = "pipeline-healer",
    about = "Diagnose a failed GitHub Actions run and open a pull request with the fix"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Heal a failed workflow run. Prompts for missing arguments.
    Heal {
        /// Repository as owner/name
        repo: Option<String>,
        /// Failed workflow run ID
        run_id: Option<String>,
    },
    /// List recent workflow runs of a repository
    Runs {
        /// Repository as owner/name
        repo: String,
        #[arg(short, long, default_value_t = 5)]
        limit: u8,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn prompt_line(question: &str) -> anyhow::Result<String> {
    println!("{question}");
    print!("> ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = AppConfig::load(cli.config.as_deref())?;
    let platform = Arc::new(GitHubPlatform::new(&config.github)?);

    match cli.command {
        Command::Runs { repo, limit } => {
            let repo = RepoId::parse(&repo)?;
            let runs = platform.list_workflow_runs(&repo, limit).await?;
            println!("{}", report::workflow_runs(&runs));
            Ok(ExitCode::SUCCESS)
        }
        Command::Heal { repo, run_id } => {
            let repo = match repo {
                Some(repo) => repo,
                None => prompt_line("Enter your repository (format: owner/repo-name):")?,
            };
            let run_id = match run_id {
                Some(run_id) => run_id,
                None => prompt_line(
                    "\nEnter the failed workflow run ID\n(You can find this in the GitHub Actions URL)",
                )?,
            };
            let repo = RepoId::parse(&repo)?;
            if run_id.is_empty() {
                anyhow::bail!("Run ID must not be empty");
            }

            let claude = Arc::new(ClaudeClient::from_config(&config.claude)?);
            let engine = WorkflowEngine::new(platform, claude, EngineSettings::from_config(&config));

            tracing::info!(repo = %repo, run_id = %run_id, model = %config.claude.model, "Starting healing run");
            println!("{}", report::banner(&repo.full_name(), &run_id));

            let cancel = CancellationToken::new();
            cancel_on_shutdown(cancel.clone());

            let outcome = engine.run(WorkflowState::new(repo, run_id), &cancel).await;
            cancel.cancel();

            match outcome {
                Ok(state) => {
                    println!("{}", report::success(&state));
                    Ok(ExitCode::SUCCESS)
                }
                Err(failure) => {
                    eprintln!("{}", report::failure(&failure));
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

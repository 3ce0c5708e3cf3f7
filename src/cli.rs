use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::Token;
use crate::config::{Config, GitHubConfig};
use crate::error::LastGreenError;
use crate::output;
use crate::providers::GitHubClient;
use crate::resolver::{EventContext, Query, Resolver, WorkflowId};

#[derive(Parser)]
#[command(name = "lastgreen")]
#[command(
    author,
    version,
    about = "Find the commit of the last successful CI run on a branch",
    long_about = None
)]
pub struct Cli {
    /// GitHub token
    #[arg(short, long, env = "INPUT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Job that must have succeeded; omit to look for a fully successful run
    #[arg(short, long, env = "INPUT_JOB")]
    job: Option<String>,

    /// Restrict the search to one workflow (id or file name)
    #[arg(short, long, env = "INPUT_WORKFLOW_ID")]
    workflow_id: Option<String>,

    /// Repository in 'owner/repo' form
    #[arg(short, long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Name of the triggering event
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: Option<String>,

    /// Ref that triggered the workflow (e.g. refs/heads/main)
    #[arg(long = "ref", env = "GITHUB_REF")]
    git_ref: Option<String>,

    /// Source branch of the pull request
    #[arg(long, env = "GITHUB_HEAD_REF")]
    head_ref: Option<String>,

    /// Runs whose jobs may be fetched concurrently
    #[arg(long)]
    job_concurrency: Option<usize>,

    /// File the `sha=<commit>` output line is appended to
    #[arg(short, long, env = "GITHUB_OUTPUT")]
    output_file: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Effective settings after merging flags, environment and config file.
#[derive(Debug)]
struct Settings {
    token: Token,
    api_url: String,
    repository: String,
    query: Query,
    job_concurrency: usize,
    timeout: Duration,
}

impl Cli {
    fn settings(&self, file: GitHubConfig) -> Result<Settings> {
        let token = non_empty(&self.token)
            .or_else(|| non_empty(&file.token))
            .ok_or_else(|| LastGreenError::Config("Input required and not supplied: token".into()))?;

        let repository = non_empty(&self.repository)
            .or_else(|| non_empty(&file.repository))
            .ok_or_else(|| {
                LastGreenError::Config("Repository not supplied (expected 'owner/repo')".into())
            })?;

        let job = non_empty(&self.job).or_else(|| non_empty(&file.job));
        match &job {
            Some(job) => info!("Checking for the latest successful run of job: {job}"),
            None => info!(
                "Job name not provided, checking for the latest successful workflow run instead"
            ),
        }

        let workflow = non_empty(&self.workflow_id)
            .or_else(|| non_empty(&file.workflow_id))
            .map(WorkflowId::from);

        Ok(Settings {
            token: Token::from(token),
            api_url: non_empty(&self.api_url).unwrap_or(file.base_url),
            repository,
            query: Query { job, workflow },
            job_concurrency: self.job_concurrency.unwrap_or(file.job_concurrency),
            timeout: Duration::from_secs(file.timeout_secs),
        })
    }

    fn event_context(&self) -> EventContext {
        EventContext {
            event_name: non_empty(&self.event_name),
            git_ref: non_empty(&self.git_ref),
            head_ref: non_empty(&self.head_ref),
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let settings = self.settings(config.github)?;

        info!("Resolving for repository: {}", settings.repository);

        let client = GitHubClient::new(
            &settings.api_url,
            &settings.repository,
            settings.token,
            settings.timeout,
        )?;
        let resolver = Resolver::new(client).with_job_concurrency(settings.job_concurrency);

        let resolution = resolver
            .resolve(&self.event_context(), &settings.query)
            .await?;

        output::emit(resolution.as_output(), self.output_file.as_deref())?;

        Ok(())
    }
}

/// GitHub Actions exports unset inputs as empty strings; treat those as absent.
fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

/// Sentinel evidence for a run with no failed jobs.
pub const NO_FAILURES_FOUND: &str = "No failed jobs found in this run";

#[async_trait]
pub trait Platform: Send + Sync {
    /// List the jobs (with steps) of a workflow run.
    async fn list_run_jobs(&self, repo: &RepoId, run_id: &str) -> Result<Vec<RunJob>>;

    /// Failure markers for every failed job and step of a run, or
    /// [`NO_FAILURES_FOUND`].
    async fn get_failed_run_evidence(&self, repo: &RepoId, run_id: &str) -> Result<String> {
        let jobs = self.list_run_jobs(repo, run_id).await?;
        Ok(render_failure_evidence(&jobs))
    }

    /// Name of the repository's default branch.
    async fn default_branch(&self, repo: &RepoId) -> Result<String>;

    /// Decoded content of a file at a ref.
    async fn get_file_content(&self, repo: &RepoId, path: &str, git_ref: &str) -> Result<String>;

    /// Blob sha of a file at a ref.
    async fn file_sha(&self, repo: &RepoId, path: &str, git_ref: &str) -> Result<String>;

    /// Create `new_branch` pointing at the head commit of `from_ref`.
    async fn create_branch(&self, repo: &RepoId, new_branch: &str, from_ref: &str) -> Result<()>;

    /// Delete a branch.
    async fn delete_branch(&self, repo: &RepoId, branch: &str) -> Result<()>;

    /// Commit new content for a single file onto a branch.
    async fn update_file(&self, repo: &RepoId, update: &UpdateFile) -> Result<()>;

    /// Create a pull request.
    async fn create_pull_request(&self, repo: &RepoId, pr: &CreatePullRequest)
        -> Result<PullRequest>;

    /// Most recent workflow runs, newest first.
    async fn list_workflow_runs(&self, repo: &RepoId, limit: u8)
        -> Result<Vec<WorkflowRunSummary>>;
}

/// Render failed jobs and steps as the evidence text handed to diagnosis.
pub fn render_failure_evidence(jobs: &[RunJob]) -> String {
    let separator = "=".repeat(60);
    let mut lines = Vec::new();

    for job in jobs.iter().filter(|j| is_failure(&j.conclusion)) {
        lines.push(format!("\n{separator}"));
        lines.push(format!("JOB: {}", job.name));
        lines.push(separator.clone());

        for step in job.steps.iter().filter(|s| is_failure(&s.conclusion)) {
            lines.push(format!("\n❌ FAILED STEP: {}", step.name));
            lines.push("Status: failure".to_string());
        }
    }

    if lines.is_empty() {
        return NO_FAILURES_FOUND.to_string();
    }

    lines.join("\n")
}

fn is_failure(conclusion: &Option<String>) -> bool {
    conclusion.as_deref() == Some("failure")
}

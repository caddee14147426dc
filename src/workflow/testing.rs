//! Deterministic collaborators for workflow tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agent::ReasoningEngine;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

/// Replays canned replies in order and records every prompt.
pub struct ScriptedEngine {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new(replies: Vec<&str>) -> Self {
        Self::from_results(replies.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn from_results(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::ClaudeApi("no scripted reply left".to_string())))
    }
}

/// Never answers.
pub struct HangingEngine;

#[async_trait]
impl ReasoningEngine for HangingEngine {
    async fn invoke(&self, _prompt: &str) -> Result<String> {
        std::future::pending().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    ListRunJobs,
    DefaultBranch,
    GetFileContent,
    FileSha,
    CreateBranch,
    DeleteBranch,
    UpdateFile,
    CreatePullRequest,
}

/// In-memory GitHub. Records a line per call in `calls()`.
pub struct FakePlatform {
    jobs: Vec<RunJob>,
    default_branch: String,
    files: HashMap<String, String>,
    failure: Option<(Op, String)>,
    cancel_on: Option<(Op, CancellationToken)>,
    calls: Mutex<Vec<String>>,
    branches: Mutex<Vec<String>>,
    updates: Mutex<Vec<UpdateFile>>,
    pull_requests: Mutex<Vec<CreatePullRequest>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            default_branch: "main".to_string(),
            files: HashMap::new(),
            failure: None,
            cancel_on: None,
            calls: Mutex::new(Vec::new()),
            branches: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            pull_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_failed_step(job: &str, step: &str) -> Self {
        let mut platform = Self::new();
        platform.jobs.push(RunJob {
            name: job.to_string(),
            conclusion: Some("failure".to_string()),
            steps: vec![RunStep {
                name: step.to_string(),
                conclusion: Some("failure".to_string()),
            }],
        });
        platform
    }

    pub fn with_default_branch(mut self, branch: &str) -> Self {
        self.default_branch = branch.to_string();
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    pub fn failing(mut self, op: Op, message: &str) -> Self {
        self.failure = Some((op, message.to_string()));
        self
    }

    /// Cancel `token` while `op` runs; the call itself still succeeds.
    pub fn cancelling_after(mut self, op: Op, token: CancellationToken) -> Self {
        self.cancel_on = Some((op, token));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn branches(&self) -> Vec<String> {
        self.branches.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<UpdateFile> {
        self.updates.lock().unwrap().clone()
    }

    pub fn pull_requests(&self) -> Vec<CreatePullRequest> {
        self.pull_requests.lock().unwrap().clone()
    }

    fn record(&self, op: Op, line: String) -> Result<()> {
        self.calls.lock().unwrap().push(line);
        if let Some((cancelling, token)) = &self.cancel_on {
            if *cancelling == op {
                token.cancel();
            }
        }
        match &self.failure {
            Some((failing, message)) if *failing == op => {
                Err(AppError::GitHubApi(format!("{op:?}: {message}")))
            }
            _ => Ok(()),
        }
    }

    fn file(&self, op: &str, path: &str) -> Result<&String> {
        self.files
            .get(path)
            .ok_or_else(|| AppError::GitHubApi(format!("{op} {path}: File not found")))
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn list_run_jobs(&self, repo: &RepoId, run_id: &str) -> Result<Vec<RunJob>> {
        self.record(Op::ListRunJobs, format!("list_run_jobs {repo} {run_id}"))?;
        Ok(self.jobs.clone())
    }

    async fn default_branch(&self, _repo: &RepoId) -> Result<String> {
        self.record(Op::DefaultBranch, "default_branch".to_string())?;
        Ok(self.default_branch.clone())
    }

    async fn get_file_content(&self, _repo: &RepoId, path: &str, git_ref: &str) -> Result<String> {
        self.record(Op::GetFileContent, format!("get_file_content {path}@{git_ref}"))?;
        self.file("get_file_content", path).cloned()
    }

    async fn file_sha(&self, _repo: &RepoId, path: &str, git_ref: &str) -> Result<String> {
        self.record(Op::FileSha, format!("file_sha {path}@{git_ref}"))?;
        self.file("file_sha", path)?;
        Ok(format!("sha-{path}"))
    }

    async fn create_branch(&self, _repo: &RepoId, new_branch: &str, from_ref: &str) -> Result<()> {
        self.record(Op::CreateBranch, format!("create_branch {new_branch} from {from_ref}"))?;
        self.branches.lock().unwrap().push(new_branch.to_string());
        Ok(())
    }

    async fn delete_branch(&self, _repo: &RepoId, branch: &str) -> Result<()> {
        self.record(Op::DeleteBranch, format!("delete_branch {branch}"))?;
        self.branches.lock().unwrap().retain(|b| b != branch);
        Ok(())
    }

    async fn update_file(&self, _repo: &RepoId, update: &UpdateFile) -> Result<()> {
        self.record(Op::UpdateFile, format!("update_file {}@{}", update.path, update.branch))?;
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &CreatePullRequest,
    ) -> Result<PullRequest> {
        self.record(Op::CreatePullRequest, format!("create_pull_request {}", pr.head_branch))?;
        let mut prs = self.pull_requests.lock().unwrap();
        prs.push(pr.clone());
        let number = prs.len() as u64;
        Ok(PullRequest {
            number,
            html_url: format!("https://github.com/{repo}/pull/{number}"),
        })
    }

    async fn list_workflow_runs(
        &self,
        _repo: &RepoId,
        _limit: u8,
    ) -> Result<Vec<WorkflowRunSummary>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_names_the_operation() {
        let platform = FakePlatform::new();
        let repo = RepoId::new("octo", "app");

        let err = platform.file_sha(&repo, "gone.py", "main").await.unwrap_err();
        assert_eq!(err.to_string(), "GitHub API error: file_sha gone.py: File not found");

        let err = platform
            .get_file_content(&repo, "gone.py", "main")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "GitHub API error: get_file_content gone.py: File not found"
        );
    }
}

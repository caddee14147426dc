use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::platform::types::{PullRequest, RunJob, WorkflowRunSummary};

/// `GET /repos/{owner}/{repo}/actions/runs/{run_id}/jobs`
#[derive(Debug, Deserialize)]
pub struct JobsPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub jobs: Vec<RunJob>,
}

/// Whether the jobs listing continues past the page just read. A short page
/// ends it; so does reaching `total_count` when GitHub reported one.
pub fn has_more_jobs(fetched: usize, page_len: usize, per_page: usize, total_count: u64) -> bool {
    page_len >= per_page && (total_count == 0 || (fetched as u64) < total_count)
}

/// `GET /repos/{owner}/{repo}/actions/runs`
#[derive(Debug, Deserialize)]
pub struct RunsPage {
    #[serde(default)]
    pub workflow_runs: Vec<RawRun>,
}

#[derive(Debug, Deserialize)]
pub struct RawRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub head_commit: Option<RawHeadCommit>,
}

#[derive(Debug, Deserialize)]
pub struct RawHeadCommit {
    #[serde(default)]
    pub message: String,
}

/// `GET /repos/{owner}/{repo}/contents/{path}` for a single file.
#[derive(Debug, Deserialize)]
pub struct FileContents {
    pub sha: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// `GET /repos/{owner}/{repo}/git/ref/heads/{branch}`
#[derive(Debug, Deserialize)]
pub struct GitRef {
    pub object: GitObject,
}

#[derive(Debug, Deserialize)]
pub struct GitObject {
    pub sha: String,
}

pub fn map_run(run: RawRun) -> WorkflowRunSummary {
    WorkflowRunSummary {
        id: run.id,
        name: run.name.unwrap_or_default(),
        conclusion: run.conclusion,
        head_commit_message: run.head_commit.map(|c| c.message).unwrap_or_default(),
    }
}

/// Decode the base64 payload of the contents API. GitHub wraps it at 60
/// columns, so embedded newlines are stripped first.
pub fn decode_file_contents(path: &str, file: &FileContents) -> Result<String> {
    let raw = file.content.as_deref().unwrap_or_default();

    match file.encoding.as_deref() {
        Some("base64") | None => {}
        Some(other) => {
            return Err(AppError::GitHubApi(format!(
                "get_file_content {path}: unsupported encoding {other}"
            )))
        }
    }

    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact).map_err(|e| {
        AppError::GitHubApi(format!("get_file_content {path}: invalid base64 payload: {e}"))
    })?;

    String::from_utf8(bytes)
        .map_err(|_| AppError::GitHubApi(format!("get_file_content {path}: file is not UTF-8")))
}

pub fn encode_file_contents(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}

pub fn map_pull_request(pr: octocrab::models::pulls::PullRequest) -> PullRequest {
    PullRequest {
        number: pr.number,
        html_url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
    }
}

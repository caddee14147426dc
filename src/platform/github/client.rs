use async_trait::async_trait;
use octocrab::Octocrab;
use serde_json::json;

use crate::config::GitHubConfig;
use crate::error::{host_message, host_status, AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

use super::mapper::{self, FileContents, GitRef, JobsPage, RunsPage};

const JOBS_PER_PAGE: usize = 100;

pub struct GitHubPlatform {
    client: Octocrab,
}

impl GitHubPlatform {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(AppError::Config(
                "GitHub token is empty (set GITHUB_TOKEN or github.token)".to_string(),
            ));
        }

        let mut builder = Octocrab::builder().personal_token(config.token.clone());
        if let Some(base) = &config.api_base_url {
            builder = builder
                .base_uri(base.as_str())
                .map_err(|e| AppError::Config(format!("Invalid GitHub API base URL: {e}")))?;
        }

        let client = builder
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))?;

        Ok(Self { client })
    }

    fn contents_route(repo: &RepoId, path: &str) -> String {
        let encoded = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("/repos/{}/{}/contents/{encoded}", repo.owner, repo.name)
    }

    async fn get_contents(&self, repo: &RepoId, path: &str, git_ref: &str, op: &str) -> Result<FileContents> {
        let route = Self::contents_route(repo, path);
        self.client
            .get(&route, Some(&[("ref", git_ref)]))
            .await
            .map_err(|e| file_error(op, path, &e))
    }

    async fn branch_head_sha(&self, repo: &RepoId, branch: &str) -> Result<String> {
        let route = format!(
            "/repos/{}/{}/git/ref/heads/{}",
            repo.owner,
            repo.name,
            urlencoding::encode(branch)
        );
        let git_ref: GitRef = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(|e| op_error(&format!("read head of {branch}"), &e))?;
        Ok(git_ref.object.sha)
    }
}

fn op_error(op: &str, e: &octocrab::Error) -> AppError {
    AppError::GitHubApi(format!("{op}: {}", host_message(e)))
}

fn file_error(op: &str, path: &str, e: &octocrab::Error) -> AppError {
    AppError::GitHubApi(file_error_message(op, path, host_status(e), &host_message(e)))
}

fn file_error_message(op: &str, path: &str, status: Option<u16>, message: &str) -> String {
    match status {
        Some(404) => format!("{op} {path}: File not found"),
        _ => format!("{op} {path}: {message}"),
    }
}

#[async_trait]
impl Platform for GitHubPlatform {
    async fn list_run_jobs(&self, repo: &RepoId, run_id: &str) -> Result<Vec<RunJob>> {
        let route = format!(
            "/repos/{}/{}/actions/runs/{}/jobs",
            repo.owner,
            repo.name,
            urlencoding::encode(run_id.trim())
        );
        let per_page = JOBS_PER_PAGE.to_string();
        let mut jobs = Vec::new();
        let mut page_no: u32 = 1;

        loop {
            let page_param = page_no.to_string();
            let page: JobsPage = self
                .client
                .get(
                    &route,
                    Some(&[("per_page", per_page.as_str()), ("page", page_param.as_str())]),
                )
                .await
                .map_err(|e| op_error(&format!("list jobs of run {run_id}"), &e))?;

            let page_len = page.jobs.len();
            jobs.extend(page.jobs);
            if !mapper::has_more_jobs(jobs.len(), page_len, JOBS_PER_PAGE, page.total_count) {
                break;
            }
            page_no += 1;
        }

        tracing::debug!(repo = %repo, run_id, jobs = jobs.len(), pages = page_no, "Fetched run jobs");
        Ok(jobs)
    }

    async fn default_branch(&self, repo: &RepoId) -> Result<String> {
        let info = self
            .client
            .repos(&repo.owner, &repo.name)
            .get()
            .await
            .map_err(|e| op_error("get repository", &e))?;

        Ok(info.default_branch.unwrap_or_else(|| "main".to_string()))
    }

    async fn get_file_content(&self, repo: &RepoId, path: &str, git_ref: &str) -> Result<String> {
        let file = self
            .get_contents(repo, path, git_ref, "get_file_content")
            .await?;
        mapper::decode_file_contents(path, &file)
    }

    async fn file_sha(&self, repo: &RepoId, path: &str, git_ref: &str) -> Result<String> {
        let file = self.get_contents(repo, path, git_ref, "file_sha").await?;
        Ok(file.sha)
    }

    async fn create_branch(&self, repo: &RepoId, new_branch: &str, from_ref: &str) -> Result<()> {
        let sha = self.branch_head_sha(repo, from_ref).await?;

        let route = format!("/repos/{}/{}/git/refs", repo.owner, repo.name);
        let body = json!({
            "ref": format!("refs/heads/{new_branch}"),
            "sha": sha,
        });
        let _: serde_json::Value = self
            .client
            .post(&route, Some(&body))
            .await
            .map_err(|e| op_error(&format!("create_branch {new_branch}"), &e))?;

        tracing::info!(repo = %repo, branch = new_branch, from = from_ref, sha = %sha, "Created branch");
        Ok(())
    }

    async fn delete_branch(&self, repo: &RepoId, branch: &str) -> Result<()> {
        let route = format!(
            "/repos/{}/{}/git/refs/heads/{}",
            repo.owner,
            repo.name,
            urlencoding::encode(branch)
        );

        // The endpoint answers 204 with an empty body, so skip deserialization
        let response = self
            .client
            ._delete(route.as_str(), None::<&()>)
            .await
            .map_err(|e| op_error(&format!("delete_branch {branch}"), &e))?;
        octocrab::map_github_error(response)
            .await
            .map_err(|e| op_error(&format!("delete_branch {branch}"), &e))?;

        Ok(())
    }

    async fn update_file(&self, repo: &RepoId, update: &UpdateFile) -> Result<()> {
        let route = Self::contents_route(repo, &update.path);
        let body = json!({
            "message": update.commit_message,
            "content": mapper::encode_file_contents(&update.content),
            "sha": update.base_sha,
            "branch": update.branch,
        });

        let _: serde_json::Value = self
            .client
            .put(&route, Some(&body))
            .await
            .map_err(|e| file_error("update_file", &update.path, &e))?;

        tracing::info!(
            repo = %repo,
            branch = %update.branch,
            path = %update.path,
            "Committed file update"
        );
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &CreatePullRequest,
    ) -> Result<PullRequest> {
        let created = self
            .client
            .pulls(&repo.owner, &repo.name)
            .create(&pr.title, &pr.head_branch, &pr.base_branch)
            .body(&pr.body)
            .send()
            .await
            .map_err(|e| op_error("create_pull_request", &e))?;

        Ok(mapper::map_pull_request(created))
    }

    async fn list_workflow_runs(
        &self,
        repo: &RepoId,
        limit: u8,
    ) -> Result<Vec<WorkflowRunSummary>> {
        let route = format!("/repos/{}/{}/actions/runs", repo.owner, repo.name);
        let per_page = limit.to_string();
        let page: RunsPage = self
            .client
            .get(&route, Some(&[("per_page", per_page.as_str())]))
            .await
            .map_err(|e| op_error("list workflow runs", &e))?;

        Ok(page
            .workflow_runs
            .into_iter()
            .take(limit as usize)
            .map(mapper::map_run)
            .collect())
    }
}

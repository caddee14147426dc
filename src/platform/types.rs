use serde::Deserialize;

/// An `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Split `owner/name`. Only the shape is checked; the host decides
    /// whether the repository exists.
    pub fn parse(full_name: &str) -> crate::error::Result<Self> {
        match full_name.trim().split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(crate::error::AppError::Config(format!(
                "Invalid repo name (expected owner/name): {full_name}"
            ))),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A job of a workflow run, as returned by the Actions jobs endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RunJob {
    pub name: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub steps: Vec<RunStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStep {
    pub name: String,
    #[serde(default)]
    pub conclusion: Option<String>,
}

/// Summary line for a recent workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowRunSummary {
    pub id: u64,
    pub name: String,
    pub conclusion: Option<String>,
    pub head_commit_message: String,
}

#[derive(Debug, Clone)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    pub head_branch: String,
    pub base_branch: String,
}

#[derive(Debug, Clone)]
pub struct UpdateFile {
    pub path: String,
    pub content: String,
    pub branch: String,
    pub commit_message: String,
    /// Blob sha of the file being replaced.
    pub base_sha: String,
}

#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

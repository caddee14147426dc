use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub github: GitHubConfig,
    pub claude: ClaudeConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    pub token: String,
    /// Branch pull requests are opened against.
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    /// Override for GitHub Enterprise installations.
    #[serde(default)]
    pub api_base_url: Option<String>,
}

// Manual Debug impl to avoid leaking the token
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"[REDACTED]")
            .field("base_branch", &self.base_branch)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// What to do when the diagnosis reply could not be parsed.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Keep going with the placeholder file path.
    #[default]
    Continue,
    /// Fail the run at the analysis stage.
    Abort,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
    #[serde(default = "default_commit_summary_chars")]
    pub commit_summary_chars: usize,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_delete_orphaned_branch")]
    pub delete_orphaned_branch: bool,
    #[serde(default)]
    pub on_fallback_diagnosis: FallbackPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            branch_prefix: default_branch_prefix(),
            commit_summary_chars: default_commit_summary_chars(),
            call_timeout_secs: default_call_timeout_secs(),
            delete_orphaned_branch: default_delete_orphaned_branch(),
            on_fallback_diagnosis: FallbackPolicy::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.call_timeout_secs)
    }
}

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_branch_prefix() -> String {
    "auto-fix".to_string()
}

fn default_commit_summary_chars() -> usize {
    50
}

fn default_call_timeout_secs() -> u64 {
    120
}

fn default_delete_orphaned_branch() -> bool {
    true
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Conventional credential variables act as defaults
        for (key, var) in [
            ("github.token", "GITHUB_TOKEN"),
            ("claude.api_key", "ANTHROPIC_API_KEY"),
        ] {
            if let Ok(value) = std::env::var(var) {
                builder = builder
                    .set_default(key, value)
                    .map_err(|e| AppError::Config(e.to_string()))?;
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("pipeline-healer").required(false));
        }

        // Environment variable overrides with HEALER_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("HEALER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healer.toml");
        std::fs::write(&path, contents).unwrap();
        let path = path.to_string_lossy().into_owned();
        (dir, path)
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let (_dir, path) = write_config(
            r#"
[github]
token = "ghp_test"

[claude]
api_key = "sk-test"
"#,
        );

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.github.base_branch, "main");
        assert_eq!(config.workflow.branch_prefix, "auto-fix");
        assert_eq!(config.workflow.commit_summary_chars, 50);
        assert!(config.workflow.delete_orphaned_branch);
        assert_eq!(config.workflow.on_fallback_diagnosis, FallbackPolicy::Continue);
    }

    #[test]
    fn test_fallback_policy_parses() {
        let (_dir, path) = write_config(
            r#"
[github]
token = "ghp_test"

[claude]
api_key = "sk-test"

[workflow]
on_fallback_diagnosis = "abort"
call_timeout_secs = 5
"#,
        );

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.workflow.on_fallback_diagnosis, FallbackPolicy::Abort);
        assert_eq!(config.workflow.call_timeout(), std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let github = GitHubConfig {
            token: "ghp_secret".to_string(),
            base_branch: "main".to_string(),
            api_base_url: None,
        };
        let claude = ClaudeConfig {
            api_key: "sk-secret".to_string(),
            model: default_model(),
            max_tokens: 1,
        };
        let rendered = format!("{github:?} {claude:?}");
        assert!(!rendered.contains("ghp_secret"));
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}

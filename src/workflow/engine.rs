use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::agent::normalize::Normalized;
use crate::agent::ReasoningEngine;
use crate::config::{AppConfig, FallbackPolicy};
use crate::error::AppError;
use crate::platform::Platform;
use crate::workflow::branch;
use crate::workflow::stages::{self, ApplyOptions, StageContext};
use crate::workflow::types::{Diagnosis, WorkflowFailure, WorkflowState};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub base_branch: String,
    pub branch_prefix: String,
    pub commit_summary_chars: usize,
    pub call_timeout: Duration,
    pub delete_orphaned_branch: bool,
    pub on_fallback_diagnosis: FallbackPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            base_branch: config.github.base_branch.clone(),
            branch_prefix: config.workflow.branch_prefix.clone(),
            commit_summary_chars: config.workflow.commit_summary_chars,
            call_timeout: config.workflow.call_timeout(),
            delete_orphaned_branch: config.workflow.delete_orphaned_branch,
            on_fallback_diagnosis: config.workflow.on_fallback_diagnosis,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_branch: "main".to_string(),
            branch_prefix: "auto-fix".to_string(),
            commit_summary_chars: 50,
            call_timeout: Duration::from_secs(120),
            delete_orphaned_branch: true,
            on_fallback_diagnosis: FallbackPolicy::Continue,
        }
    }
}

/// Drives FetchLogs → AnalyzeError → GenerateFix → ApplyFix →
/// CreatePullRequest. A stage runs only if the previous one succeeded; the
/// first error stops the run and is returned with the partial state.
pub struct WorkflowEngine {
    platform: Arc<dyn Platform>,
    engine: Arc<dyn ReasoningEngine>,
    settings: EngineSettings,
}

impl WorkflowEngine {
    pub fn new(
        platform: Arc<dyn Platform>,
        engine: Arc<dyn ReasoningEngine>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            platform,
            engine,
            settings,
        }
    }

    pub async fn run(
        &self,
        state: WorkflowState,
        cancel: &CancellationToken,
    ) -> Result<WorkflowState, WorkflowFailure> {
        let ctx = StageContext {
            platform: self.platform.as_ref(),
            engine: self.engine.as_ref(),
            cancel,
            call_timeout: self.settings.call_timeout,
        };
        let repo = state.repo().clone();
        let run_id = state.run_id().to_string();

        tracing::info!(repo = %repo, run_id = %run_id, "Fetching logs from GitHub");
        let evidence = match stages::fetch_logs(&ctx, &repo, &run_id).await {
            Ok(evidence) => evidence,
            Err(error) => return Err(fail(state, error)),
        };
        let state = state.with_evidence(evidence.clone());

        tracing::info!(stage = %state.current_stage(), "Analyzing error");
        let normalized = match stages::analyze_error(&ctx, &evidence).await {
            Ok(normalized) => normalized,
            Err(error) => return Err(fail(state, error)),
        };
        let diagnosis = match normalized {
            Normalized::Structured(fields) => Diagnosis::new(fields, false),
            Normalized::Fallback(raw) => {
                if self.settings.on_fallback_diagnosis == FallbackPolicy::Abort {
                    let error = AppError::FallbackDiagnosis(preview(&raw, 200));
                    return Err(fail(state, error));
                }
                tracing::warn!(
                    "Diagnosis reply was unstructured; continuing with an unknown file path"
                );
                Diagnosis::new(Normalized::Fallback(raw).into_fields(), true)
            }
        };
        let state = state.with_diagnosis(diagnosis.clone());

        tracing::info!(
            stage = %state.current_stage(),
            file = %diagnosis.failed_file,
            error_type = %diagnosis.error_type,
            "Generating fix"
        );
        let fix = match stages::generate_fix(&ctx, &repo, &evidence, &diagnosis).await {
            Ok(fix) => fix,
            Err(error) => return Err(fail(state, error)),
        };
        let state = state.with_fix(fix.clone());

        let branch = branch::next_branch_name(&self.settings.branch_prefix);
        tracing::info!(stage = %state.current_stage(), branch = %branch, "Applying fix to new branch");
        let opts = ApplyOptions {
            branch,
            commit_summary_chars: self.settings.commit_summary_chars,
            delete_orphaned_branch: self.settings.delete_orphaned_branch,
            repo: &repo,
        };
        let applied = match stages::apply_fix(&ctx, &diagnosis, &fix, opts).await {
            Ok(applied) => applied,
            Err(error) => return Err(fail(state, error)),
        };
        let state = state.with_applied_fix(applied.clone());

        tracing::info!(stage = %state.current_stage(), "Creating pull request");
        let pr = match stages::create_pull_request(
            &ctx,
            &repo,
            &self.settings.base_branch,
            &diagnosis,
            &fix,
            &applied,
        )
        .await
        {
            Ok(pr) => pr,
            Err(error) => return Err(fail(state, error)),
        };
        let state = state.with_pull_request(pr);

        tracing::info!(
            stage = %state.current_stage(),
            pr_url = state.pr_url().unwrap_or_default(),
            "Healing complete"
        );
        Ok(state)
    }
}

fn fail(state: WorkflowState, error: AppError) -> WorkflowFailure {
    tracing::error!(
        last_completed = %state.last_completed_stage(),
        error = %error,
        "Healing failed"
    );
    WorkflowFailure {
        state: state.failed(),
        error,
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

use serde::Serialize;

use crate::agent::normalize::{DiagnosisFields, FixFields};
use crate::error::AppError;
use crate::platform::types::RepoId;

/// Progress marker. Only moves forward; `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Starting,
    LogsFetched,
    ErrorAnalyzed,
    FixGenerated,
    FixApplied,
    Completed,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Starting => "starting",
            Stage::LogsFetched => "logs_fetched",
            Stage::ErrorAnalyzed => "error_analyzed",
            Stage::FixGenerated => "fix_generated",
            Stage::FixApplied => "fix_applied",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of FetchLogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub text: String,
}

/// Output of AnalyzeError.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub error_type: String,
    pub failed_file: String,
    pub analysis: String,
    /// The reply could not be parsed and placeholders were used.
    pub from_fallback: bool,
}

impl Diagnosis {
    pub fn new(fields: DiagnosisFields, from_fallback: bool) -> Self {
        Self {
            error_type: fields.error_type,
            failed_file: fields.failed_file,
            analysis: fields.analysis,
            from_fallback,
        }
    }
}

/// Output of GenerateFix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fix {
    pub fixed_content: String,
    pub explanation: String,
    /// Ref the original file was read from; the fix branch starts here.
    pub base_ref: String,
    pub from_fallback: bool,
}

impl Fix {
    pub fn new(fields: FixFields, base_ref: String, from_fallback: bool) -> Self {
        Self {
            fixed_content: fields.fixed_content,
            explanation: fields.explanation,
            base_ref,
            from_fallback,
        }
    }
}

/// Output of ApplyFix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFix {
    pub branch: String,
}

/// Output of CreatePullRequest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPullRequest {
    pub number: u64,
    pub url: String,
}

/// State of one healing run.
///
/// Each `with_*` transition consumes the previous value, fills exactly one
/// group of fields and advances the progress marker.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    repo: RepoId,
    run_id: String,
    evidence: Option<Evidence>,
    diagnosis: Option<Diagnosis>,
    fix: Option<Fix>,
    applied: Option<AppliedFix>,
    pull_request: Option<OpenedPullRequest>,
    stage: Stage,
    last_completed: Stage,
}

impl WorkflowState {
    pub fn new(repo: RepoId, run_id: impl Into<String>) -> Self {
        Self {
            repo,
            run_id: run_id.into(),
            evidence: None,
            diagnosis: None,
            fix: None,
            applied: None,
            pull_request: None,
            stage: Stage::Starting,
            last_completed: Stage::Starting,
        }
    }

    fn advance(mut self, stage: Stage) -> Self {
        debug_assert!(self.stage < stage && self.stage != Stage::Failed);
        self.stage = stage;
        self.last_completed = stage;
        self
    }

    pub(crate) fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = Some(evidence);
        self.advance(Stage::LogsFetched)
    }

    pub(crate) fn with_diagnosis(mut self, diagnosis: Diagnosis) -> Self {
        self.diagnosis = Some(diagnosis);
        self.advance(Stage::ErrorAnalyzed)
    }

    pub(crate) fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self.advance(Stage::FixGenerated)
    }

    pub(crate) fn with_applied_fix(mut self, applied: AppliedFix) -> Self {
        self.applied = Some(applied);
        self.advance(Stage::FixApplied)
    }

    pub(crate) fn with_pull_request(mut self, pr: OpenedPullRequest) -> Self {
        self.pull_request = Some(pr);
        self.advance(Stage::Completed)
    }

    pub(crate) fn failed(mut self) -> Self {
        self.stage = Stage::Failed;
        self
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn current_stage(&self) -> Stage {
        self.stage
    }

    /// Last stage that finished; stays put when the run fails.
    pub fn last_completed_stage(&self) -> Stage {
        self.last_completed
    }

    pub fn evidence(&self) -> Option<&Evidence> {
        self.evidence.as_ref()
    }

    pub fn diagnosis(&self) -> Option<&Diagnosis> {
        self.diagnosis.as_ref()
    }

    pub fn fix(&self) -> Option<&Fix> {
        self.fix.as_ref()
    }

    pub fn applied_fix(&self) -> Option<&AppliedFix> {
        self.applied.as_ref()
    }

    pub fn pull_request(&self) -> Option<&OpenedPullRequest> {
        self.pull_request.as_ref()
    }

    pub fn error_logs(&self) -> Option<&str> {
        self.evidence.as_ref().map(|e| e.text.as_str())
    }

    pub fn failed_file(&self) -> Option<&str> {
        self.diagnosis.as_ref().map(|d| d.failed_file.as_str())
    }

    pub fn error_analysis(&self) -> Option<&str> {
        self.diagnosis.as_ref().map(|d| d.analysis.as_str())
    }

    pub fn proposed_fix(&self) -> Option<&str> {
        self.fix.as_ref().map(|f| f.fixed_content.as_str())
    }

    pub fn fix_explanation(&self) -> Option<&str> {
        self.fix.as_ref().map(|f| f.explanation.as_str())
    }

    pub fn branch_name(&self) -> Option<&str> {
        self.applied.as_ref().map(|a| a.branch.as_str())
    }

    pub fn pr_url(&self) -> Option<&str> {
        self.pull_request.as_ref().map(|p| p.url.as_str())
    }

    pub fn success(&self) -> bool {
        self.stage == Stage::Completed && self.pull_request.is_some()
    }
}

/// A run that stopped on a collaborator error. `state` holds everything
/// produced before the failing stage.
#[derive(Debug, thiserror::Error)]
#[error("{error} (last completed stage: {})", .state.last_completed_stage())]
pub struct WorkflowFailure {
    pub state: WorkflowState,
    pub error: AppError,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WorkflowState {
        WorkflowState::new(RepoId::new("octo", "app"), "123")
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = state();
        assert_eq!(state.current_stage(), Stage::Starting);
        assert!(state.error_logs().is_none());
        assert!(state.pr_url().is_none());
        assert!(!state.success());
    }

    #[test]
    fn test_transitions_advance_marker() {
        let state = state().with_evidence(Evidence {
            text: "JOB: test".to_string(),
        });
        assert_eq!(state.current_stage(), Stage::LogsFetched);

        let state = state.with_diagnosis(Diagnosis::new(
            DiagnosisFields {
                error_type: "syntax".to_string(),
                failed_file: "app.py".to_string(),
                analysis: "bad indent".to_string(),
            },
            false,
        ));
        assert_eq!(state.current_stage(), Stage::ErrorAnalyzed);
        assert_eq!(state.failed_file(), Some("app.py"));
        assert_eq!(state.repo().full_name(), "octo/app");
        assert_eq!(state.run_id(), "123");
    }

    #[test]
    fn test_failed_keeps_fields_and_last_stage() {
        let state = state()
            .with_evidence(Evidence {
                text: "logs".to_string(),
            })
            .failed();
        assert_eq!(state.current_stage(), Stage::Failed);
        assert_eq!(state.last_completed_stage(), Stage::LogsFetched);
        assert_eq!(state.error_logs(), Some("logs"));
        assert!(!state.success());
    }

    #[test]
    fn test_failure_message_includes_error() {
        let failure = WorkflowFailure {
            state: state().failed(),
            error: AppError::GitHubApi("get_file_content app.py: File not found".to_string()),
        };
        let message = failure.to_string();
        assert!(message.contains("File not found"));
        assert!(message.contains("starting"));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::LogsFetched.to_string(), "logs_fetched");
        assert_eq!(
            serde_json::to_value(Stage::FixApplied).unwrap(),
            serde_json::json!("fix_applied")
        );
        assert!(Stage::Starting < Stage::Completed);
    }
}

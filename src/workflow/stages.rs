//! The five healing stages. Each takes only the typed outputs of the stages
//! before it and performs its collaborator calls through [`StageContext`].

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::agent::normalize::{normalize, DiagnosisFields, FixFields, Normalized};
use crate::agent::{prompt, ReasoningEngine};
use crate::error::{AppError, Result};
use crate::platform::types::{CreatePullRequest, RepoId, UpdateFile};
use crate::platform::Platform;
use crate::workflow::types::{AppliedFix, Diagnosis, Evidence, Fix, OpenedPullRequest};

/// Collaborators plus the limits every call runs under.
pub struct StageContext<'a> {
    pub platform: &'a dyn Platform,
    pub engine: &'a dyn ReasoningEngine,
    pub cancel: &'a CancellationToken,
    pub call_timeout: Duration,
}

impl StageContext<'_> {
    /// Fail if cancellation was requested.
    pub fn checkpoint(&self, at: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled(at.to_string()));
        }
        Ok(())
    }

    /// Run one collaborator call, bounded by the timeout and the cancel token.
    pub async fn call<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        self.checkpoint(&format!("before {op}"))?;

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(AppError::Cancelled(format!("during {op}")));
            }
            outcome = tokio::time::timeout(self.call_timeout, fut) => outcome,
        };

        outcome.map_err(|_| {
            AppError::Timeout(format!(
                "{op} did not finish within {}s",
                self.call_timeout.as_secs()
            ))
        })?
    }

    /// One reasoning-engine round trip; engine errors are prefixed with `op`.
    pub async fn ask(&self, op: &str, prompt: &str) -> Result<String> {
        self.call(op, self.engine.invoke(prompt))
            .await
            .map_err(|e| match e {
                AppError::ClaudeApi(m) => AppError::ClaudeApi(format!("{op}: {m}")),
                AppError::ClaudeRateLimited(m) => AppError::ClaudeRateLimited(format!("{op}: {m}")),
                AppError::Http(e) => AppError::ClaudeApi(format!("{op}: {e}")),
                AppError::Serialization(e) => AppError::ClaudeApi(format!("{op}: {e}")),
                other => other,
            })
    }
}

pub async fn fetch_logs(ctx: &StageContext<'_>, repo: &RepoId, run_id: &str) -> Result<Evidence> {
    let text = ctx
        .call(
            "get_failed_run_evidence",
            ctx.platform.get_failed_run_evidence(repo, run_id),
        )
        .await?;
    ctx.checkpoint("after fetch_logs")?;

    Ok(Evidence { text })
}

/// One round trip to the engine; a malformed reply is returned as
/// [`Normalized::Fallback`], not as an error.
pub async fn analyze_error(
    ctx: &StageContext<'_>,
    evidence: &Evidence,
) -> Result<Normalized<DiagnosisFields>> {
    let prompt = prompt::diagnosis_prompt(&evidence.text);
    let reply = ctx.ask("diagnose", &prompt).await?;
    ctx.checkpoint("after analyze_error")?;

    Ok(normalize(&reply))
}

pub async fn generate_fix(
    ctx: &StageContext<'_>,
    repo: &RepoId,
    evidence: &Evidence,
    diagnosis: &Diagnosis,
) -> Result<Fix> {
    let base_ref = ctx
        .call("default_branch", ctx.platform.default_branch(repo))
        .await?;

    let file_content = ctx
        .call(
            "get_file_content",
            ctx.platform
                .get_file_content(repo, &diagnosis.failed_file, &base_ref),
        )
        .await?;

    let prompt = prompt::fix_prompt(
        &diagnosis.failed_file,
        &file_content,
        &diagnosis.analysis,
        &evidence.text,
    );
    let reply = ctx.ask("generate_fix", &prompt).await?;
    ctx.checkpoint("after generate_fix")?;

    let normalized = normalize::<FixFields>(&reply);
    let from_fallback = normalized.is_fallback();
    if from_fallback {
        tracing::warn!(file = %diagnosis.failed_file, "Fix reply was unstructured, using it as file content");
    }

    Ok(Fix::new(normalized.into_fields(), base_ref, from_fallback))
}

pub struct ApplyOptions<'a> {
    pub branch: String,
    pub commit_summary_chars: usize,
    pub delete_orphaned_branch: bool,
    pub repo: &'a RepoId,
}

/// Create the fix branch and commit the proposed content onto it.
///
/// Branch creation and the file update are separate host calls. When the
/// update fails the branch is deleted again if `delete_orphaned_branch` is
/// set; the update error is returned either way. Once the update succeeded
/// the branch is returned even if cancellation was requested meanwhile, so
/// the caller can still report it.
pub async fn apply_fix(
    ctx: &StageContext<'_>,
    diagnosis: &Diagnosis,
    fix: &Fix,
    opts: ApplyOptions<'_>,
) -> Result<AppliedFix> {
    let repo = opts.repo;

    let base_sha = ctx
        .call(
            "file_sha",
            ctx.platform
                .file_sha(repo, &diagnosis.failed_file, &fix.base_ref),
        )
        .await?;

    ctx.call(
        "create_branch",
        ctx.platform.create_branch(repo, &opts.branch, &fix.base_ref),
    )
    .await?;

    let update = UpdateFile {
        path: diagnosis.failed_file.clone(),
        content: fix.fixed_content.clone(),
        branch: opts.branch.clone(),
        commit_message: prompt::commit_message(&diagnosis.analysis, opts.commit_summary_chars),
        base_sha,
    };

    if let Err(e) = ctx
        .call("update_file", ctx.platform.update_file(repo, &update))
        .await
    {
        if opts.delete_orphaned_branch {
            remove_orphaned_branch(ctx, repo, &opts.branch).await;
        } else {
            tracing::warn!(branch = %opts.branch, "File update failed; branch left in place");
        }
        return Err(e);
    }

    Ok(AppliedFix { branch: opts.branch })
}

// Runs even after cancellation, so it only honors the timeout.
async fn remove_orphaned_branch(ctx: &StageContext<'_>, repo: &RepoId, branch: &str) {
    match tokio::time::timeout(ctx.call_timeout, ctx.platform.delete_branch(repo, branch)).await {
        Ok(Ok(())) => tracing::info!(branch, "Deleted orphaned fix branch"),
        Ok(Err(e)) => tracing::warn!(branch, error = %e, "Failed to delete orphaned fix branch"),
        Err(_) => tracing::warn!(branch, "Timed out deleting orphaned fix branch"),
    }
}

pub async fn create_pull_request(
    ctx: &StageContext<'_>,
    repo: &RepoId,
    base_branch: &str,
    diagnosis: &Diagnosis,
    fix: &Fix,
    applied: &AppliedFix,
) -> Result<OpenedPullRequest> {
    let request = CreatePullRequest {
        title: prompt::pull_request_title(&diagnosis.failed_file),
        body: prompt::pull_request_body(&diagnosis.failed_file, &diagnosis.analysis, &fix.explanation),
        head_branch: applied.branch.clone(),
        base_branch: base_branch.to_string(),
    };

    let pr = ctx
        .call(
            "create_pull_request",
            ctx.platform.create_pull_request(repo, &request),
        )
        .await?;

    Ok(OpenedPullRequest {
        number: pr.number,
        url: pr.html_url,
    })
}

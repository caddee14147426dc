//! Human-readable output for the command line.

use crate::platform::types::WorkflowRunSummary;
use crate::workflow::{WorkflowFailure, WorkflowState};

const RULE_WIDTH: usize = 60;
const SUMMARY_CHARS: usize = 100;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

pub fn banner(repo: &str, run_id: &str) -> String {
    format!(
        "🚀 Pipeline healer starting...\n{rule}\nRepository: {repo}\nRun ID: {run_id}\n{rule}",
        rule = rule()
    )
}

pub fn success(state: &WorkflowState) -> String {
    format!(
        "\n{rule}\n✅ HEALING COMPLETE!\n{rule}\nPull Request: {pr}\nBranch: {branch}\n\n📋 Summary:\nError: {error}\nFix: {fix}",
        rule = rule(),
        pr = state.pr_url().unwrap_or("N/A"),
        branch = state.branch_name().unwrap_or("N/A"),
        error = truncate(state.error_analysis().unwrap_or("N/A"), SUMMARY_CHARS),
        fix = truncate(state.fix_explanation().unwrap_or("N/A"), SUMMARY_CHARS),
    )
}

/// The error plus whatever the run produced before it stopped.
pub fn failure(outcome: &WorkflowFailure) -> String {
    let state = &outcome.state;
    let mut lines = vec![
        format!("\n❌ Error during healing: {}", outcome.error),
        format!("Stopped after stage: {}", state.last_completed_stage()),
    ];

    if let Some(logs) = state.error_logs() {
        lines.push(format!("Evidence: {}", truncate(logs.trim(), SUMMARY_CHARS)));
    }
    if let Some(diagnosis) = state.diagnosis() {
        lines.push(format!(
            "Diagnosis: [{}] {} - {}",
            diagnosis.error_type,
            diagnosis.failed_file,
            truncate(&diagnosis.analysis, SUMMARY_CHARS)
        ));
    }
    if let Some(fix) = state.fix() {
        lines.push(format!("Fix: {}", truncate(&fix.explanation, SUMMARY_CHARS)));
    }
    if let Some(branch) = state.branch_name() {
        lines.push(format!("Branch: {branch}"));
    }
    let mut source = std::error::Error::source(&outcome.error);
    while let Some(cause) = source {
        lines.push(format!("  caused by: {cause}"));
        source = std::error::Error::source(cause);
    }

    lines.join("\n")
}

pub fn workflow_runs(runs: &[WorkflowRunSummary]) -> String {
    if runs.is_empty() {
        return "No workflow runs found".to_string();
    }

    runs.iter()
        .map(|run| {
            let glyph = if run.conclusion.as_deref() == Some("success") {
                "✓"
            } else {
                "✗"
            };
            format!(
                "{glyph} Run #{} - {} - {} - {}",
                run.id,
                run.name,
                run.conclusion.as_deref().unwrap_or("in_progress"),
                run.head_commit_message.chars().take(50).collect::<String>()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

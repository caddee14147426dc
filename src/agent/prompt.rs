pub fn diagnosis_prompt(error_logs: &str) -> String {
    format!(
        r#"You are an expert DevOps engineer. Analyze this GitHub Actions error:

{error_logs}

Provide:
1. What type of error is this? (dependency, syntax, configuration, etc.)
2. Which file likely has the problem?
3. What specifically went wrong?

Be concise and specific. Respond with only a JSON object, no surrounding prose:
{{
    "error_type": "...",
    "failed_file": "...",
    "analysis": "..."
}}"#
    )
}

pub fn fix_prompt(file_path: &str, file_content: &str, error_analysis: &str, error_logs: &str) -> String {
    format!(
        r#"You are an expert DevOps engineer. Here's a failed file and error analysis:

FILE: {file_path}
FILE CONTENT:
{file_content}

ERROR ANALYSIS:
{error_analysis}

ERROR LOGS:
{error_logs}

Generate a fixed version of the file. Provide:
1. The complete corrected file content
2. Explanation of what you changed and why

Respond with only a JSON object, no surrounding prose:
{{
    "fixed_content": "...",
    "explanation": "..."
}}"#
    )
}

pub fn pull_request_body(failed_file: &str, error_analysis: &str, fix_explanation: &str) -> String {
    format!(
        r#"## 🤖 Automated Fix

**Error Analysis:**
{error_analysis}

**What I Changed:**
{fix_explanation}

**File Fixed:**
`{failed_file}`

---
*This PR was automatically created by pipeline-healer*
*Please review the changes before merging!*"#
    )
}

pub fn pull_request_title(failed_file: &str) -> String {
    format!("🤖 Auto-fix: {failed_file}")
}

/// Commit message built from the first `max_chars` characters of the analysis.
pub fn commit_message(error_analysis: &str, max_chars: usize) -> String {
    let summary: String = error_analysis.chars().take(max_chars).collect();
    format!("🤖 Auto-fix: {summary}")
}

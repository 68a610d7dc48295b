//! Prompts for LLM-based failure analysis

use crate::remedy::types::FixRequest;

/// System prompt framing the backend as a build error expert.
pub const SYSTEM_PROMPT: &str = r#"You are a build error expert for continuous-integration systems. You receive the tail of a failed build log and must decide whether the failure is fixable by editing source files.

Respond with a single JSON object and nothing else:
{
  "fixable": true or false,
  "rationale": "one or two sentences explaining the root cause",
  "edits": [
    {"path": "relative/path/to/file", "content": "the complete new file content"}
  ]
}

Rules:
1. "fixable" is true only when a concrete source edit can plausibly repair the build (syntax errors, missing imports, typos, bad configuration values). Infrastructure problems, missing credentials, and unavailable services are not fixable.
2. Every "path" must be relative to the repository root. Never reference paths outside the repository.
3. "content" is the full replacement content of the file, not a diff.
4. When "fixable" is false, "edits" must be an empty array and "rationale" must explain the core issue for a human.
5. Do not repeat a fix listed under "previously attempted fixes" - it already failed."#;

/// Builds the user prompt for one remediation attempt.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build_fix_prompt(request: &FixRequest) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "Project kind: {}\nRemediation attempt: {}\n",
            request.project_kind, request.attempt_number
        ));

        if !request.previous_fix_summaries.is_empty() {
            prompt.push_str("\nPreviously attempted fixes (all failed, do not repeat):\n");
            for summary in &request.previous_fix_summaries {
                prompt.push_str(&format!("- {}\n", summary));
            }
        }

        prompt.push_str("\nBuild log tail:\n```\n");
        prompt.push_str(&request.truncated_error_log);
        prompt.push_str("\n```\n");
        prompt
    }
}

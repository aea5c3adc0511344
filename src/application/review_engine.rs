//! Static and LLM-assisted pull-request review (C11).
//!
//! Runs cheap checks first — file size, debug statements, stray
//! TODO/FIXME, silent error handlers — the same ordering the teacher's
//! `services::overseers` run in (lint before the expensive LLM pass),
//! then optionally hands the diff to an LLM for a free-form critique
//! parsed back into `[CRITICAL|WARNING|INFO]`-tagged findings. Test
//! execution is delegated entirely to [`ShellSandbox::run_test_suite`];
//! this module never shells out itself.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::domain::errors::CoreResult;
use crate::domain::models::config::ReviewMergeConfig;
use crate::domain::models::review::{PrReviewResult, ReviewIssue, Severity, TestOutcome};
use crate::domain::ports::forge::PrFile;
use crate::domain::ports::llm::{CompletionRequest, LlmPort};
use crate::infrastructure::sandbox::{CommandStatus, ShellSandbox};

const MAX_FILE_LINES: usize = 500;
/// Characters of patch content sent to the LLM critique pass, to keep
/// prompts bounded regardless of how large the PR is.
const MAX_PATCH_CHARS: usize = 4000;

fn todo_fixme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(todo|fixme)\b").unwrap())
}

fn silent_except_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+\s*except\b[^:]*:\s*$").unwrap())
}

fn public_fn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+\s*pub(?:\([^)]*\))?\s+(?:async\s+)?fn\s+(\w+)").unwrap())
}

fn python_def_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+\s*def\s+(\w+)\s*\(").unwrap())
}

fn print_statement_needle(filename: &str) -> Option<&'static str> {
    if filename.ends_with(".py") {
        Some("print(")
    } else if filename.ends_with(".js") || filename.ends_with(".ts") {
        Some("console.log(")
    } else if filename.ends_with(".rs") {
        Some("dbg!(")
    } else {
        None
    }
}

/// Added lines (those starting with `+`, excluding the `+++` file
/// header) from a unified diff patch.
fn added_lines(patch: &str) -> impl Iterator<Item = &str> {
    patch.lines().filter(|l| l.starts_with('+') && !l.starts_with("+++"))
}

fn scan_file_for_issues(file: &PrFile) -> Vec<ReviewIssue> {
    let mut issues = Vec::new();
    let Some(patch) = &file.patch else { return issues };

    let added: Vec<&str> = added_lines(patch).collect();
    if added.len() > MAX_FILE_LINES {
        issues.push(ReviewIssue {
            severity: Severity::Warning,
            file: file.filename.clone(),
            message: format!("{} added lines exceed the {MAX_FILE_LINES}-line review comfort threshold", added.len()),
        });
    }

    if let Some(needle) = print_statement_needle(&file.filename) {
        if added.iter().any(|l| l.contains(needle)) {
            issues.push(ReviewIssue {
                severity: Severity::Info,
                file: file.filename.clone(),
                message: format!("debug statement (`{needle}`) left in added code"),
            });
        }
    }

    let todo_count = added.iter().filter(|l| todo_fixme_re().is_match(l)).count();
    if todo_count > 0 {
        issues.push(ReviewIssue {
            severity: Severity::Info,
            file: file.filename.clone(),
            message: format!("{todo_count} TODO/FIXME marker(s) introduced"),
        });
    }

    if filename_is_python(&file.filename) {
        for window in added.windows(2) {
            if silent_except_re().is_match(window[0]) && window[1].trim_start_matches('+').trim() == "pass" {
                issues.push(ReviewIssue {
                    severity: Severity::Warning,
                    file: file.filename.clone(),
                    message: "silent exception handler (bare `except` with a lone `pass` body)".to_string(),
                });
                break;
            }
        }
    }

    for (i, line) in added.iter().enumerate() {
        if let Some(caps) = public_fn_re().captures(line) {
            let has_doc_comment = i > 0 && added[i - 1].trim_start_matches('+').trim_start().starts_with("///");
            if !has_doc_comment {
                issues.push(ReviewIssue {
                    severity: Severity::Info,
                    file: file.filename.clone(),
                    message: format!("newly added public function `{}` has no doc comment", &caps[1]),
                });
            }
        } else if let Some(caps) = python_def_re().captures(line) {
            let name = &caps[1];
            let has_docstring = added.get(i + 1).is_some_and(|next| {
                let next = next.trim_start_matches('+').trim_start();
                next.starts_with("\"\"\"") || next.starts_with("'''")
            });
            if !name.starts_with('_') && !has_docstring {
                issues.push(ReviewIssue {
                    severity: Severity::Info,
                    file: file.filename.clone(),
                    message: format!("newly added public function `{name}` has no docstring"),
                });
            }
        }
    }

    issues
}

fn filename_is_python(filename: &str) -> bool {
    filename.ends_with(".py")
}

/// Parse `[CRITICAL|WARNING|INFO]`-prefixed lines out of an LLM critique.
/// A non-empty response with no line matching any prefix is attached as
/// a single INFO note instead of being silently dropped.
fn parse_llm_critique(response: &str) -> Vec<ReviewIssue> {
    let mut issues = Vec::new();
    for line in response.lines() {
        let trimmed = line.trim();
        let (severity, rest) = if let Some(rest) = trimmed.strip_prefix("[CRITICAL]") {
            (Severity::Critical, rest)
        } else if let Some(rest) = trimmed.strip_prefix("[WARNING]") {
            (Severity::Warning, rest)
        } else if let Some(rest) = trimmed.strip_prefix("[INFO]") {
            (Severity::Info, rest)
        } else {
            continue;
        };
        issues.push(ReviewIssue { severity, file: "llm-critique".to_string(), message: rest.trim().to_string() });
    }

    if issues.is_empty() && !response.trim().is_empty() {
        issues.push(ReviewIssue {
            severity: Severity::Info,
            file: "llm-critique".to_string(),
            message: response.trim().to_string(),
        });
    }

    issues
}

/// Static-plus-optional-LLM review pipeline for one pull request.
pub struct ReviewEngine {
    llm: Option<Arc<dyn LlmPort>>,
    sandbox: Arc<ShellSandbox>,
    config: ReviewMergeConfig,
}

impl ReviewEngine {
    pub fn new(sandbox: Arc<ShellSandbox>, config: ReviewMergeConfig) -> Self {
        Self { llm: None, sandbox, config }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmPort>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Review every changed file and, if any file path suggests a
    /// checkout with tests, run the test suite inside `workspace`.
    pub async fn review(&self, files: &[PrFile], workspace: Option<&Path>) -> CoreResult<PrReviewResult> {
        let mut issues: Vec<ReviewIssue> = files.iter().flat_map(scan_file_for_issues).collect();

        if self.config.use_llm {
            if let Some(llm) = &self.llm {
                if let Some(critique) = self.run_llm_critique(files, llm).await {
                    issues.extend(critique);
                }
            }
        }

        let test_outcome = match workspace {
            Some(cwd) => self.run_tests(cwd).await,
            None => None,
        };

        Ok(PrReviewResult { approved: false, issues, test_outcome }.finalize())
    }

    async fn run_llm_critique(&self, files: &[PrFile], llm: &Arc<dyn LlmPort>) -> Option<Vec<ReviewIssue>> {
        let mut diff = String::new();
        for file in files {
            if let Some(patch) = &file.patch {
                diff.push_str(&format!("--- {}\n{patch}\n", file.filename));
            }
            if diff.len() >= MAX_PATCH_CHARS {
                break;
            }
        }
        if let Some((boundary, _)) = diff.char_indices().nth(MAX_PATCH_CHARS) {
            diff.truncate(boundary);
        }

        let prompt = format!(
            "Review this diff. Report findings one per line, prefixed with exactly one of \
             [CRITICAL], [WARNING], or [INFO]. Only report real issues.\n\n{diff}"
        );
        let response = llm.complete(CompletionRequest::new(prompt, self.config.llm_model.clone())).await.ok()?;
        Some(parse_llm_critique(&response))
    }

    async fn run_tests(&self, cwd: &Path) -> Option<TestOutcome> {
        match self.sandbox.run_test_suite(cwd).await {
            Ok(outcome) => Some(TestOutcome {
                passed: outcome.status == CommandStatus::Success,
                summary: if outcome.stdout.is_empty() { outcome.stderr } else { outcome.stdout },
            }),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::ReviewMergeConfig;

    fn file(filename: &str, patch: &str) -> PrFile {
        PrFile { filename: filename.to_string(), additions: 1, deletions: 0, patch: Some(patch.to_string()) }
    }

    fn engine() -> ReviewEngine {
        ReviewEngine::new(Arc::new(ShellSandbox::with_defaults()), ReviewMergeConfig::default())
    }

    #[tokio::test]
    async fn clean_pr_with_no_workspace_is_approved() {
        let files = vec![file("a.rs", "+fn foo() {}\n")];
        let result = engine().review(&files, None).await.unwrap();
        assert!(result.approved);
        assert!(result.issues.is_empty());
    }

    #[tokio::test]
    async fn debug_statement_is_flagged_as_info() {
        let files = vec![file("a.py", "+print('debug')\n")];
        let result = engine().review(&files, None).await.unwrap();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn todo_marker_is_flagged() {
        let files = vec![file("a.rs", "+// TODO: handle this case\n")];
        let result = engine().review(&files, None).await.unwrap();
        assert!(result.issues.iter().any(|i| i.message.contains("TODO")));
    }

    #[test]
    fn llm_critique_parses_severity_tags() {
        let response = "[CRITICAL] SQL injection risk\n[WARNING] missing null check\nnot a finding\n";
        let issues = parse_llm_critique(response);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].severity, Severity::Critical);
        assert_eq!(issues[1].severity, Severity::Warning);
    }

    #[test]
    fn oversized_file_is_flagged_as_warning() {
        let patch: String = (0..600).map(|i| format!("+line {i}\n")).collect();
        let issues = scan_file_for_issues(&file("big.rs", &patch));
        assert!(issues.iter().any(|i| i.severity == Severity::Warning));
    }

    #[tokio::test]
    async fn bare_except_with_lone_pass_is_flagged() {
        let files = vec![file("a.py", "+def f():\n+    try:\n+        g()\n+    except:\n+        pass\n")];
        let result = engine().review(&files, None).await.unwrap();
        assert!(result.issues.iter().any(|i| i.message.contains("silent exception handler")));
    }

    #[tokio::test]
    async fn except_with_real_handling_is_not_flagged() {
        let files = vec![file("a.py", "+    except ValueError:\n+        log.warning('bad input')\n")];
        let result = engine().review(&files, None).await.unwrap();
        assert!(!result.issues.iter().any(|i| i.message.contains("silent exception handler")));
    }

    #[tokio::test]
    async fn undocumented_public_rust_fn_is_flagged() {
        let files = vec![file("a.rs", "+pub fn do_thing() {\n+    todo!()\n+}\n")];
        let result = engine().review(&files, None).await.unwrap();
        assert!(result.issues.iter().any(|i| i.message.contains("do_thing") && i.message.contains("doc comment")));
    }

    #[tokio::test]
    async fn documented_public_rust_fn_is_not_flagged() {
        let files = vec![file("a.rs", "+/// Does the thing.\n+pub fn do_thing() {\n+    todo!()\n+}\n")];
        let result = engine().review(&files, None).await.unwrap();
        assert!(!result.issues.iter().any(|i| i.message.contains("doc comment")));
    }

    #[test]
    fn unparseable_llm_critique_becomes_a_single_info_note() {
        let issues = parse_llm_critique("looks fine to me, no notable issues");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
    }

    #[test]
    fn empty_llm_critique_produces_no_issues() {
        assert!(parse_llm_critique("   \n").is_empty());
    }
}

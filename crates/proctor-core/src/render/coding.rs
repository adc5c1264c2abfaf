//! Coding renderer and its test harness.
//!
//! The renderer shows the problem and the current code buffer. Running the
//! buffer goes through a [`CodeExecutor`], one isolated run per test case;
//! output is compared to the expected output after trimming both.

use std::time::Instant;

use futures::stream::{self, StreamExt};

use crate::config::RunnerConfig;
use crate::error::EditError;
use crate::model::{CodingProblem, Question, QuestionBody, QuestionKind, TestCase};
use crate::response::{CodingResult, Response, TestCaseResult};
use crate::traits::{CodeExecutor, ExecutionRequest};

use super::{unescape, QuestionRenderer};

pub struct CodingRenderer;

/// The code currently in the buffer: the recorded one, else the starter code.
pub fn current_code<'a>(problem: &'a CodingProblem, response: Option<&'a Response>) -> &'a str {
    response
        .and_then(Response::as_coding)
        .map(|c| c.code.as_str())
        .unwrap_or(problem.starter_code.as_str())
}

impl QuestionRenderer for CodingRenderer {
    fn render(&self, question: &Question, response: Option<&Response>) -> Vec<String> {
        let QuestionBody::Coding(problem) = &question.body else {
            return Vec::new();
        };
        let mut lines = Vec::new();
        lines.extend(problem.statement.lines().map(str::to_string));

        for (label, text) in [
            ("Input format", &problem.input_format),
            ("Output format", &problem.output_format),
            ("Constraints", &problem.constraints),
        ] {
            if !text.is_empty() {
                lines.push(String::new());
                lines.push(format!("{label}:"));
                lines.extend(text.lines().map(|l| format!("  {l}")));
            }
        }

        if let Some(sample) = problem.test_cases.first() {
            lines.push(String::new());
            lines.push("Sample input:".to_string());
            lines.extend(sample.input.lines().map(|l| format!("  {l}")));
            lines.push("Sample output:".to_string());
            lines.extend(sample.expected_output.lines().map(|l| format!("  {l}")));
        }

        lines.push(String::new());
        lines.push(format!("Code ({}):", problem.language));
        let code = current_code(problem, response);
        if code.is_empty() {
            lines.push("    (empty)".to_string());
        } else {
            lines.extend(
                code.lines()
                    .enumerate()
                    .map(|(i, l)| format!("{:>3} | {l}", i + 1)),
            );
        }

        if let Some(result) = response.and_then(Response::as_coding) {
            if !result.results.is_empty() {
                lines.push(String::new());
                for r in &result.results {
                    let status = if r.passed { "PASS" } else { "FAIL" };
                    let detail = match &r.error {
                        Some(e) => format!(" ({e})"),
                        None if !r.passed => format!(" (got {:?})", r.actual.trim()),
                        None => String::new(),
                    };
                    lines.push(format!("  test {}: {status}{detail}", r.index + 1));
                }
                lines.push(format!(
                    "  {}/{} passed",
                    result.passed_count(),
                    result.results.len()
                ));
            }
        }
        lines
    }

    fn edit(
        &self,
        _question: &Question,
        _current: Option<&Response>,
        input: &str,
    ) -> Result<Response, EditError> {
        let code = unescape(input);
        if code.trim().is_empty() {
            return Err(EditError::Empty {
                kind: QuestionKind::Coding,
            });
        }
        // An edited buffer has not been run, so it cannot have passed.
        Ok(Response::Coding(CodingResult::unrun(code)))
    }

    fn instructions(&self) -> &'static str {
        "answer <code>  (use \\n for line breaks), then: run"
    }
}

/// Run `code` against every test case of `problem`.
///
/// Every failure (non-zero exit, timeout, sandbox error) is recorded as a
/// failed test case with its message; this function never errors. The
/// aggregate `passed` flag is true only when there is at least one test case
/// and all of them pass.
pub async fn run_test_cases(
    executor: &dyn CodeExecutor,
    problem: &CodingProblem,
    code: &str,
    config: &RunnerConfig,
) -> CodingResult {
    let timeout_ms = config.timeout_secs.saturating_mul(1000);
    // Collected first: a borrowing closure inside the stream is not `Send`.
    let runs: Vec<_> = problem
        .test_cases
        .iter()
        .enumerate()
        .map(|(index, case)| run_one(executor, problem, code, index, case, timeout_ms))
        .collect();
    let results: Vec<TestCaseResult> = stream::iter(runs)
        .buffered(config.parallelism.max(1))
        .collect()
        .await;

    let passed = !results.is_empty() && results.iter().all(|r| r.passed);
    tracing::info!(
        language = %problem.language,
        cases = results.len(),
        passed = results.iter().filter(|r| r.passed).count(),
        "coding run finished"
    );

    CodingResult {
        code: code.to_string(),
        passed,
        results,
    }
}

async fn run_one(
    executor: &dyn CodeExecutor,
    problem: &CodingProblem,
    code: &str,
    index: usize,
    case: &TestCase,
    timeout_ms: u64,
) -> TestCaseResult {
    let start = Instant::now();
    let request = ExecutionRequest {
        code: code.to_string(),
        language: problem.language,
        stdin: case.input.clone(),
        timeout_ms,
    };

    let (actual, passed, error) = match executor.execute(&request).await {
        Ok(output) if output.success() => {
            let passed = output.stdout.trim() == case.expected_output.trim();
            (output.stdout, passed, None)
        }
        Ok(output) => {
            let status = output
                .exit_code
                .map_or_else(|| "killed by signal".to_string(), |c| format!("exit code {c}"));
            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                status
            } else {
                format!("{status}: {}", last_lines(stderr, 5))
            };
            (output.stdout, false, Some(message))
        }
        Err(e) => {
            tracing::debug!(index, error = %e, "test case errored");
            (String::new(), false, Some(e.to_string()))
        }
    };

    TestCaseResult {
        index,
        input: case.input.clone(),
        expected: case.expected_output.clone(),
        actual,
        passed,
        error,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use crate::model::Language;
    use crate::traits::ExecutionOutput;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Doubles the integer on stdin when the code says "double"; anything
    /// else echoes; "crash" exits non-zero; "hang" times out.
    struct FakeExecutor;

    #[async_trait]
    impl CodeExecutor for FakeExecutor {
        async fn execute(
            &self,
            request: &ExecutionRequest,
        ) -> Result<ExecutionOutput, ExecutionError> {
            match request.code.as_str() {
                "hang" => Err(ExecutionError::Timeout(request.timeout_ms)),
                "crash" => Ok(ExecutionOutput {
                    stdout: String::new(),
                    stderr: "Traceback\nZeroDivisionError".into(),
                    exit_code: Some(1),
                    duration_ms: 1,
                }),
                "double" => {
                    let n: i64 = request.stdin.trim().parse().unwrap_or(0);
                    Ok(ExecutionOutput {
                        stdout: format!("{}\n", n * 2),
                        stderr: String::new(),
                        exit_code: Some(0),
                        duration_ms: 1,
                    })
                }
                _ => Ok(ExecutionOutput {
                    stdout: request.stdin.clone(),
                    stderr: String::new(),
                    exit_code: Some(0),
                    duration_ms: 1,
                }),
            }
        }
    }

    fn problem(cases: &[(&str, &str)]) -> CodingProblem {
        CodingProblem {
            statement: "Double the number.".into(),
            input_format: "One integer".into(),
            output_format: "One integer".into(),
            constraints: String::new(),
            language: Language::Python,
            starter_code: "n = int(input())".into(),
            test_cases: cases
                .iter()
                .map(|(i, o)| TestCase {
                    input: i.to_string(),
                    expected_output: o.to_string(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn all_cases_pass() {
        let p = problem(&[("1", "2"), ("5", "10"), ("-3", " -6 ")]);
        let result = run_test_cases(&FakeExecutor, &p, "double", &RunnerConfig::default()).await;
        assert!(result.passed);
        assert_eq!(result.passed_count(), 3);
        assert_eq!(result.results[2].index, 2);
    }

    #[tokio::test]
    async fn one_failing_case_fails_the_run() {
        let p = problem(&[("1", "2"), ("5", "10"), ("7", "15")]);
        let result = run_test_cases(&FakeExecutor, &p, "double", &RunnerConfig::default()).await;
        assert!(!result.passed);
        assert_eq!(result.passed_count(), 2);
        assert!(!result.results[2].passed);
        assert!(result.results[2].error.is_none());
    }

    #[tokio::test]
    async fn errors_become_failed_cases() {
        let p = problem(&[("1", "2")]);
        let crashed = run_test_cases(&FakeExecutor, &p, "crash", &RunnerConfig::default()).await;
        assert!(!crashed.passed);
        let message = crashed.results[0].error.as_deref().unwrap();
        assert!(message.starts_with("exit code 1"));
        assert!(message.contains("ZeroDivisionError"));

        let hung = run_test_cases(&FakeExecutor, &p, "hang", &RunnerConfig::default()).await;
        assert_eq!(hung.results[0].error.as_deref(), Some("timed out after 5000ms"));
    }

    #[tokio::test]
    async fn run_can_be_spawned_onto_the_runtime() {
        let executor: Arc<dyn CodeExecutor> = Arc::new(FakeExecutor);
        let p = Arc::new(problem(&[("2", "4"), ("3", "6")]));
        let handle = tokio::spawn(async move {
            run_test_cases(executor.as_ref(), &p, "double", &RunnerConfig::default()).await
        });
        let result = handle.await.unwrap();
        assert!(result.passed);
        assert_eq!(result.passed_count(), 2);
    }

    #[tokio::test]
    async fn no_test_cases_never_passes() {
        let p = problem(&[]);
        let result = run_test_cases(&FakeExecutor, &p, "double", &RunnerConfig::default()).await;
        assert!(!result.passed);
        assert!(result.results.is_empty());
    }

    #[test]
    fn edit_replaces_buffer_and_clears_pass() {
        let q = Question {
            id: "k".into(),
            title: "Double".into(),
            content: String::new(),
            points: 10.0,
            body: QuestionBody::Coding(problem(&[("1", "2")])),
        };
        let previous = Response::Coding(CodingResult {
            code: "old".into(),
            passed: true,
            results: vec![],
        });
        let edited = CodingRenderer.edit(&q, Some(&previous), r"n = int(input())\nprint(n * 2)").unwrap();
        let coding = edited.as_coding().unwrap();
        assert!(!coding.passed);
        assert_eq!(coding.code.lines().count(), 2);

        let lines = CodingRenderer.render(&q, Some(&edited));
        assert!(lines.contains(&"Code (python):".to_string()));
        assert!(lines.contains(&"  2 | print(n * 2)".to_string()));
    }
}

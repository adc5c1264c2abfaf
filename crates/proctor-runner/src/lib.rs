//! proctor-runner — Sandboxed execution of learner code.
//!
//! Every run gets its own temporary directory and a separate child process
//! with a cleared environment, a hard deadline, and an output cap. Rust
//! submissions are compiled with `rustc` once per distinct source and the
//! binary is reused by every test case; Python and JavaScript are handed to
//! their interpreters.

pub mod builds;
pub mod compiler;
pub mod process;
pub mod sandbox;

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use proctor_core::config::RunnerConfig;
use proctor_core::error::ExecutionError;
use proctor_core::model::Language;
use proctor_core::traits::{CodeExecutor, ExecutionOutput, ExecutionRequest};

use crate::builds::BuildCache;
use crate::process::Limits;
use crate::sandbox::Sandbox;

/// Local code executor backed by per-run sandboxes.
pub struct LocalRunner {
    config: RunnerConfig,
    builds: BuildCache,
}

impl LocalRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            builds: BuildCache::new(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Distinct Rust sources built so far and still cached.
    pub fn cached_builds(&self) -> usize {
        self.builds.len()
    }

    /// Interpreter or compiler configured for `language`.
    fn program_for(&self, language: Language) -> Result<&str, ExecutionError> {
        let program = match language {
            Language::Python => &self.config.python,
            Language::JavaScript => &self.config.node,
            Language::Rust => &self.config.rustc,
        };
        if program.trim().is_empty() {
            return Err(ExecutionError::UnsupportedLanguage(language));
        }
        Ok(program)
    }

    fn create_sandbox(&self, request: &ExecutionRequest) -> Result<Sandbox, ExecutionError> {
        let timeout = if request.timeout_ms > 0 {
            Duration::from_millis(request.timeout_ms)
        } else {
            self.config.timeout()
        };
        Sandbox::new(request.language, timeout)
    }
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

#[async_trait]
impl CodeExecutor for LocalRunner {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutput, ExecutionError> {
        let run_id = Uuid::new_v4();
        let program = self.program_for(request.language)?;
        let sandbox = self.create_sandbox(request)?;
        let limits = Limits {
            timeout: sandbox.timeout(),
            max_output_bytes: self.config.max_output_bytes,
        };

        tracing::debug!(
            %run_id,
            language = %request.language,
            dir = %sandbox.work_dir().display(),
            "executing learner code"
        );

        let result = match request.language {
            Language::Python | Language::JavaScript => {
                let source = sandbox.write_source(&request.code)?;
                process::run(&sandbox, program, &[source.as_path()], &request.stdin, limits).await
            }
            Language::Rust => {
                // Held until the run ends so eviction cannot delete the binary.
                let build = self.builds.get_or_build(&request.code, program).await?;
                let binary = build.binary_path();
                process::run(
                    &sandbox,
                    &binary.to_string_lossy(),
                    &[],
                    &request.stdin,
                    limits,
                )
                .await
            }
        };

        match &result {
            Ok(output) => tracing::debug!(
                %run_id,
                exit_code = ?output.exit_code,
                duration_ms = output.duration_ms,
                "learner code finished"
            ),
            Err(e) => tracing::debug!(%run_id, error = %e, "learner code failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::model::{CodingProblem, TestCase};
    use proctor_core::render::coding::run_test_cases;

    fn request(code: &str, language: Language, stdin: &str) -> ExecutionRequest {
        ExecutionRequest {
            code: code.to_string(),
            language,
            stdin: stdin.to_string(),
            timeout_ms: 10_000,
        }
    }

    #[tokio::test]
    async fn empty_interpreter_is_unsupported() {
        let runner = LocalRunner::new(RunnerConfig {
            node: String::new(),
            ..RunnerConfig::default()
        });
        let err = runner
            .execute(&request("console.log(1)", Language::JavaScript, ""))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::UnsupportedLanguage(Language::JavaScript)
        ));
    }

    #[tokio::test]
    async fn rust_program_reads_stdin() {
        let runner = LocalRunner::default();
        let code = r#"
use std::io::Read;
fn main() {
    let mut s = String::new();
    std::io::stdin().read_to_string(&mut s).unwrap();
    let n: i64 = s.trim().parse().unwrap();
    println!("{}", n * 2);
}
"#;
        let output = runner
            .execute(&request(code, Language::Rust, "21\n"))
            .await
            .unwrap();
        assert!(output.success(), "stderr: {}", output.stderr);
        assert_eq!(output.stdout.trim(), "42");
    }

    #[tokio::test]
    async fn rust_compile_error_is_reported() {
        let runner = LocalRunner::default();
        let err = runner
            .execute(&request("fn main() { let x: u8 = \"no\"; }", Language::Rust, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::CompileFailed(_)));
    }

    #[tokio::test]
    async fn rust_panic_has_non_zero_exit() {
        let runner = LocalRunner::default();
        let output = runner
            .execute(&request(
                "fn main() { panic!(\"boom\"); }",
                Language::Rust,
                "",
            ))
            .await
            .unwrap();
        assert!(!output.success());
        assert!(output.stderr.contains("boom"));
    }

    #[tokio::test]
    async fn infinite_loop_times_out() {
        let runner = LocalRunner::default();
        let mut req = request("fn main() { loop {} }", Language::Rust, "");
        req.timeout_ms = 300;
        let err = runner.execute(&req).await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err}");
    }

    #[tokio::test]
    async fn grades_a_rust_coding_problem() {
        let runner = LocalRunner::default();
        let problem = CodingProblem {
            statement: "Print the sum of two numbers".into(),
            input_format: "a b".into(),
            output_format: "a + b".into(),
            constraints: String::new(),
            language: Language::Rust,
            starter_code: String::new(),
            test_cases: vec![
                TestCase {
                    input: "1 2".into(),
                    expected_output: "3".into(),
                },
                TestCase {
                    input: "10 -4".into(),
                    expected_output: "6".into(),
                },
            ],
        };
        let code = r#"
fn main() {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).unwrap();
    let sum: i64 = line.split_whitespace().map(|n| n.parse::<i64>().unwrap()).sum();
    println!("{sum}");
}
"#;
        let result = run_test_cases(&runner, &problem, code, runner.config()).await;
        assert!(result.passed, "{:?}", result.results);
        assert_eq!(result.passed_count(), 2);
        assert_eq!(runner.cached_builds(), 1);
    }

    #[tokio::test]
    async fn test_cases_share_one_rust_build() {
        let runner = LocalRunner::default();
        let problem = CodingProblem {
            statement: "Print the square".into(),
            input_format: "n".into(),
            output_format: "n * n".into(),
            constraints: String::new(),
            language: Language::Rust,
            starter_code: String::new(),
            test_cases: (1..=6)
                .map(|n: i64| TestCase {
                    input: n.to_string(),
                    expected_output: (n * n).to_string(),
                })
                .collect(),
        };
        let code = r#"
fn main() {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).unwrap();
    let n: i64 = line.trim().parse().unwrap();
    println!("{}", n * n);
}
"#;
        let first = run_test_cases(&runner, &problem, code, runner.config()).await;
        assert!(first.passed, "{:?}", first.results);
        assert_eq!(runner.cached_builds(), 1);

        // Running unchanged code again reuses the build.
        let second = run_test_cases(&runner, &problem, code, runner.config()).await;
        assert!(second.passed);
        assert_eq!(runner.cached_builds(), 1);

        let broken = run_test_cases(&runner, &problem, "fn main() {", runner.config()).await;
        assert!(!broken.passed);
        assert!(broken
            .results
            .iter()
            .all(|r| r.error.as_deref().is_some_and(|e| e.contains("compil"))));
        assert_eq!(runner.cached_builds(), 2);
    }
}

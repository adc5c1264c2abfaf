//! Compilation of Rust submissions with `rustc`.

use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::process::Command;

use proctor_core::error::ExecutionError;

use crate::sandbox::Sandbox;

/// Upper bound on a single `rustc` invocation.
pub const COMPILE_TIMEOUT: Duration = Duration::from_secs(60);

/// Diagnostics shown to the learner when compilation fails.
const MAX_REPORTED_ERRORS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Note,
    Help,
}

/// One rustc diagnostic, reduced to what a learner needs.
#[derive(Debug, Clone, Serialize)]
pub struct CompilerDiagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub code: Option<String>,
    /// 1-based line of the primary span in the learner's file.
    pub line: Option<u32>,
}

impl std::fmt::Display for CompilerDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {line}: ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " [{code}]")?;
        }
        Ok(())
    }
}

/// Compile the sandbox's `main.rs` into its binary path.
pub async fn compile(sandbox: &Sandbox, rustc: &str) -> Result<Duration, ExecutionError> {
    let start = Instant::now();

    let mut cmd = Command::new(rustc);
    cmd.arg("--edition=2021")
        .arg("--error-format=json")
        .arg("-O")
        .arg("-o")
        .arg(sandbox.binary_path())
        .arg(sandbox.source_path())
        .current_dir(sandbox.work_dir())
        .env_clear()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, val) in sandbox.build_env() {
        cmd.env(&key, &val);
    }
    // rustup proxies locate their toolchain through these.
    for var in ["HOME", "RUSTUP_HOME", "CARGO_HOME", "RUSTUP_TOOLCHAIN"] {
        if let Some(value) = std::env::var_os(var) {
            cmd.env(var, value);
        }
    }

    let output = tokio::time::timeout(COMPILE_TIMEOUT, cmd.output())
        .await
        .map_err(|_| ExecutionError::Timeout(COMPILE_TIMEOUT.as_millis() as u64))?
        .map_err(|e| ExecutionError::SpawnFailed {
            program: rustc.to_string(),
            message: e.to_string(),
        })?;

    let elapsed = start.elapsed();
    if output.status.success() {
        tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "rustc succeeded");
        return Ok(elapsed);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let errors: Vec<_> = parse_rustc_json_output(&stderr)
        .into_iter()
        .filter(|d| d.level == DiagnosticLevel::Error)
        .collect();
    tracing::debug!(errors = errors.len(), "rustc failed");

    let summary = if errors.is_empty() {
        stderr.lines().take(MAX_REPORTED_ERRORS).collect::<Vec<_>>().join("\n")
    } else {
        errors
            .iter()
            .take(MAX_REPORTED_ERRORS)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    };
    Err(ExecutionError::CompileFailed(summary))
}

/// Parse rustc's JSON diagnostics, one object per line.
pub fn parse_rustc_json_output(output: &str) -> Vec<CompilerDiagnostic> {
    let mut diagnostics = Vec::new();

    for line in output.lines() {
        let Ok(message) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        if message.get("$message_type").and_then(|t| t.as_str()) == Some("artifact") {
            continue;
        }

        let level = match message.get("level").and_then(|l| l.as_str()) {
            Some("error") | Some("error: internal compiler error") => DiagnosticLevel::Error,
            Some("warning") => DiagnosticLevel::Warning,
            Some("help") => DiagnosticLevel::Help,
            _ => DiagnosticLevel::Note,
        };

        let text = message
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("")
            .to_string();
        // Summary lines like "aborting due to previous error" carry no span.
        if text.starts_with("aborting due to") {
            continue;
        }

        let code = message
            .get("code")
            .and_then(|c| c.get("code"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string());

        let line = message
            .get("spans")
            .and_then(|s| s.as_array())
            .and_then(|spans| {
                spans
                    .iter()
                    .find(|s| s.get("is_primary").and_then(|p| p.as_bool()) == Some(true))
                    .or_else(|| spans.first())
            })
            .and_then(|span| span.get("line_start")?.as_u64())
            .map(|l| l as u32);

        diagnostics.push(CompilerDiagnostic {
            level,
            message: text,
            code,
            line,
        });
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::model::Language;

    const RUSTC_OUTPUT: &str = r#"{"$message_type":"diagnostic","message":"mismatched types","code":{"code":"E0308","explanation":null},"level":"error","spans":[{"file_name":"main.rs","line_start":2,"line_end":2,"column_start":18,"column_end":30,"is_primary":true,"text":[]}],"children":[],"rendered":"error[E0308]: mismatched types"}
{"$message_type":"diagnostic","message":"unused variable: `x`","code":{"code":"unused_variables","explanation":null},"level":"warning","spans":[{"file_name":"main.rs","line_start":3,"line_end":3,"column_start":9,"column_end":10,"is_primary":true,"text":[]}],"children":[],"rendered":"warning: unused variable"}
{"$message_type":"diagnostic","message":"aborting due to 1 previous error","code":null,"level":"error","spans":[],"children":[],"rendered":"error: aborting"}
not json at all"#;

    #[test]
    fn parses_diagnostics() {
        let diagnostics = parse_rustc_json_output(RUSTC_OUTPUT);
        assert_eq!(diagnostics.len(), 2);

        let error = &diagnostics[0];
        assert_eq!(error.level, DiagnosticLevel::Error);
        assert_eq!(error.code.as_deref(), Some("E0308"));
        assert_eq!(error.line, Some(2));
        assert_eq!(error.to_string(), "line 2: mismatched types [E0308]");

        assert_eq!(diagnostics[1].level, DiagnosticLevel::Warning);
    }

    #[tokio::test]
    async fn compile_valid_code() {
        let sandbox = Sandbox::new(Language::Rust, Duration::from_secs(5)).unwrap();
        sandbox
            .write_source("fn main() { println!(\"hi\"); }")
            .unwrap();

        compile(&sandbox, "rustc").await.unwrap();
        assert!(sandbox.binary_path().exists());
    }

    #[tokio::test]
    async fn compile_invalid_code() {
        let sandbox = Sandbox::new(Language::Rust, Duration::from_secs(5)).unwrap();
        sandbox
            .write_source("fn main() {\n    let n: i32 = \"not an int\";\n}")
            .unwrap();

        let err = compile(&sandbox, "rustc").await.unwrap_err();
        match err {
            ExecutionError::CompileFailed(summary) => {
                assert!(summary.contains("mismatched types"), "{summary}");
                assert!(summary.contains("line 2"), "{summary}");
            }
            other => panic!("expected compile failure, got {other}"),
        }
    }
}

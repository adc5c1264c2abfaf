//! Child process execution with a deadline and an output cap.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use proctor_core::error::ExecutionError;
use proctor_core::traits::ExecutionOutput;

use crate::sandbox::Sandbox;

/// Limits applied to one child process.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub timeout: std::time::Duration,
    /// Combined stdout + stderr bytes.
    pub max_output_bytes: usize,
}

/// Run `program args..` inside `sandbox`, feeding `stdin`.
///
/// The child runs in the sandbox directory with a cleared environment and
/// is killed when the deadline passes or its output exceeds the cap.
pub async fn run(
    sandbox: &Sandbox,
    program: &str,
    args: &[&Path],
    stdin: &str,
    limits: Limits,
) -> Result<ExecutionOutput, ExecutionError> {
    let start = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(sandbox.work_dir())
        .env_clear()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, val) in sandbox.build_env() {
        cmd.env(&key, &val);
    }

    let mut child = cmd.spawn().map_err(|e| ExecutionError::SpawnFailed {
        program: program.to_string(),
        message: e.to_string(),
    })?;

    let (Some(mut child_stdin), Some(stdout), Some(stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        return Err(ExecutionError::Io("child stdio was not captured".into()));
    };

    let input = stdin.as_bytes().to_vec();
    let cap = limits.max_output_bytes;
    let io = async {
        let feed = async move {
            // The program may exit without reading its input.
            let _ = child_stdin.write_all(&input).await;
            drop(child_stdin);
            Ok::<_, ExecutionError>(())
        };
        let ((), out, err) =
            tokio::try_join!(feed, read_capped(stdout, cap), read_capped(stderr, cap))?;
        if out.len() + err.len() > cap {
            return Err(ExecutionError::OutputLimit(cap));
        }
        let status = child.wait().await?;
        Ok::<_, ExecutionError>((out, err, status))
    };

    let (out, err, status) = match tokio::time::timeout(limits.timeout, io).await {
        Ok(result) => result?,
        Err(_) => {
            let ms = limits.timeout.as_millis() as u64;
            tracing::debug!(program, timeout_ms = ms, "learner program timed out");
            return Err(ExecutionError::Timeout(ms));
        }
    };

    Ok(ExecutionOutput {
        stdout: String::from_utf8_lossy(&out).into_owned(),
        stderr: String::from_utf8_lossy(&err).into_owned(),
        exit_code: status.code(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Read a stream to its end, failing as soon as it exceeds `cap` bytes.
async fn read_capped<R>(reader: R, cap: usize) -> Result<Vec<u8>, ExecutionError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .take(cap as u64 + 1)
        .read_to_end(&mut buf)
        .await?;
    if buf.len() > cap {
        return Err(ExecutionError::OutputLimit(cap));
    }
    Ok(buf)
}

//! Seams between the engine and its collaborators.
//!
//! [`CodeExecutor`] is implemented by the `proctor-runner` crate.
//! [`SessionHooks`] is implemented by whatever shell hosts the engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;
use crate::integrity::ProhibitedAction;
use crate::model::Language;
use crate::response::ResponseMap;

// ---------------------------------------------------------------------------
// Code execution
// ---------------------------------------------------------------------------

/// Runs learner code in isolation from the hosting process.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run `request.code` once, feeding `request.stdin`.
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutput, ExecutionError>;
}

/// A single program run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: Language,
    #[serde(default)]
    pub stdin: String,
    /// Hard deadline for this run in milliseconds.
    pub timeout_ms: u64,
}

/// Captured output of a finished program run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl ExecutionOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

// ---------------------------------------------------------------------------
// Hosting shell callbacks
// ---------------------------------------------------------------------------

/// Something the learner must be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// A prohibited key combination was suppressed.
    IntegrityWarning {
        action: ProhibitedAction,
        violations: u32,
    },
    /// The attempt was terminated for repeated violations. Blocking.
    IntegrityTermination { violations: u32 },
    /// The countdown reached zero and the attempt was submitted.
    TimeExpired,
}

/// Callbacks crossing the engine boundary.
///
/// `on_complete` fires exactly once per terminal submission. `on_cancel`
/// fires on manual cancel, on close from the result view, and after a forced
/// integrity termination.
pub trait SessionHooks: Send + Sync {
    fn on_complete(&self, score: f64, responses: &ResponseMap);
    fn on_cancel(&self);
    fn on_notice(&self, _notice: &Notice) {}
}

/// Hooks that ignore everything.
pub struct NoopHooks;

impl SessionHooks for NoopHooks {
    fn on_complete(&self, _: f64, _: &ResponseMap) {}
    fn on_cancel(&self) {}
}

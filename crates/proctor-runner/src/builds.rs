//! Compiled binaries for Rust submissions, shared across test cases.
//!
//! Every test case of a coding run executes the same source, so it is
//! compiled once and each case only runs the binary. Builds are keyed by
//! source text and the most recent few are kept. A lookup that arrives while
//! the same source is still compiling waits for that build instead of
//! starting another `rustc`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

use proctor_core::error::ExecutionError;
use proctor_core::model::Language;

use crate::compiler::{self, COMPILE_TIMEOUT};
use crate::sandbox::Sandbox;

/// Builds kept before the oldest is dropped.
pub const MAX_BUILDS: usize = 8;

/// A finished build. The sandbox owns the binary at `binary_path()`.
pub type Build = Arc<Sandbox>;

type Slot = Arc<OnceCell<Result<Build, ExecutionError>>>;

/// Bounded cache of Rust builds, oldest evicted first.
///
/// Compile failures are cached too, so every test case of a broken
/// submission reports the same diagnostics from a single `rustc` call.
#[derive(Default)]
pub struct BuildCache {
    slots: Mutex<VecDeque<(String, Slot)>>,
}

impl BuildCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the build for `code`, compiling it with `rustc` on first use.
    pub async fn get_or_build(&self, code: &str, rustc: &str) -> Result<Build, ExecutionError> {
        let slot = self.slot(code);
        slot.get_or_init(|| build(code, rustc)).await.clone()
    }

    /// Number of sources with a build started or finished.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn slot(&self, code: &str) -> Slot {
        let mut slots = self.lock();
        if let Some((_, slot)) = slots.iter().find(|(source, _)| source == code) {
            return Arc::clone(slot);
        }
        let slot: Slot = Arc::new(OnceCell::new());
        if slots.len() >= MAX_BUILDS {
            slots.pop_front();
        }
        slots.push_back((code.to_string(), Arc::clone(&slot)));
        slot
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<(String, Slot)>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn build(code: &str, rustc: &str) -> Result<Build, ExecutionError> {
    let sandbox = Sandbox::new(Language::Rust, COMPILE_TIMEOUT)?;
    sandbox.write_source(code)?;
    let elapsed = compiler::compile(&sandbox, rustc).await?;
    tracing::debug!(
        elapsed_ms = elapsed.as_millis() as u64,
        dir = %sandbox.work_dir().display(),
        "rust build cached"
    );
    Ok(Arc::new(sandbox))
}

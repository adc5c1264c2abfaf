//! Per-run scratch directory for learner code.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use proctor_core::error::ExecutionError;
use proctor_core::model::Language;

/// A throwaway directory holding one learner program.
///
/// On drop, the temporary directory and everything the program wrote into
/// it are removed.
#[derive(Debug)]
pub struct Sandbox {
    /// Temporary directory containing the source file and any build output.
    work_dir: TempDir,
    /// Hard deadline for the program run.
    timeout: Duration,
    language: Language,
}

impl Sandbox {
    /// Create a new empty sandbox.
    pub fn new(language: Language, timeout: Duration) -> Result<Self, ExecutionError> {
        let work_dir = tempfile::Builder::new()
            .prefix("proctor-run-")
            .tempdir()?;

        Ok(Self {
            work_dir,
            timeout,
            language,
        })
    }

    /// Get the path to the sandbox working directory.
    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    /// Get the sandbox timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Path the learner source is written to.
    pub fn source_path(&self) -> PathBuf {
        let filename = match self.language {
            Language::Python => "main.py",
            Language::JavaScript => "main.js",
            Language::Rust => "main.rs",
        };
        self.work_dir.path().join(filename)
    }

    /// Path of the compiled binary for compiled languages.
    pub fn binary_path(&self) -> PathBuf {
        self.work_dir.path().join("main")
    }

    /// Write the learner's code into the sandbox.
    pub fn write_source(&self, code: &str) -> Result<PathBuf, ExecutionError> {
        let path = self.source_path();
        std::fs::write(&path, code)?;
        Ok(path)
    }

    /// Environment for child processes.
    ///
    /// Children start from an empty environment; only `PATH` is inherited so
    /// interpreters can be found. Home and temp point into the sandbox.
    pub fn build_env(&self) -> Vec<(String, String)> {
        let dir = self.work_dir.path().to_string_lossy().to_string();
        let mut env = vec![
            ("HOME".to_string(), dir.clone()),
            ("TMPDIR".to_string(), dir.clone()),
            ("TEMP".to_string(), dir.clone()),
            ("TMP".to_string(), dir),
            ("LANG".to_string(), "C.UTF-8".to_string()),
            ("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string()),
            ("PYTHONIOENCODING".to_string(), "utf-8".to_string()),
            ("NODE_OPTIONS".to_string(), String::new()),
        ];
        if let Some(path) = std::env::var_os("PATH") {
            env.push(("PATH".to_string(), path.to_string_lossy().to_string()));
        }
        env
    }
}

//! Configuration loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level proctor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProctorConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Where attempt reports are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Session timing and integrity policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Used when an assessment carries no time limit of its own.
    #[serde(default = "default_time_limit")]
    pub default_time_limit_secs: u64,
    /// Violation count at which the attempt is terminated.
    #[serde(default = "default_violation_threshold")]
    pub violation_threshold: u32,
    /// Countdown period. One period removes one second from the clock.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_time_limit_secs: default_time_limit(),
            violation_threshold: default_violation_threshold(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

/// Sandbox settings for coding questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Hard deadline per test case.
    #[serde(default = "default_runner_timeout")]
    pub timeout_secs: u64,
    /// Combined stdout + stderr cap per run.
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,
    /// Test cases executed concurrently within one run.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_node")]
    pub node: String,
    #[serde(default = "default_rustc")]
    pub rustc: String,
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_runner_timeout(),
            max_output_bytes: default_max_output(),
            parallelism: default_parallelism(),
            python: default_python(),
            node: default_node(),
            rustc: default_rustc(),
        }
    }
}

fn default_time_limit() -> u64 {
    3600
}
fn default_violation_threshold() -> u32 {
    3
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_runner_timeout() -> u64 {
    5
}
fn default_max_output() -> usize {
    64 * 1024
}
fn default_parallelism() -> usize {
    4
}
fn default_python() -> String {
    "python3".to_string()
}
fn default_node() -> String {
    "node".to_string()
}
fn default_rustc() -> String {
    "rustc".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./proctor-results")
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `proctor.toml` in the current directory
/// 2. `~/.config/proctor/config.toml`
///
/// Environment variable overrides: `PROCTOR_RUNNER_TIMEOUT_SECS`,
/// `PROCTOR_TIME_LIMIT_SECS`.
pub fn load_config() -> Result<ProctorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ProctorConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("proctor.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => ProctorConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Parse a TOML config string.
pub fn parse_config(content: &str) -> Result<ProctorConfig> {
    Ok(toml::from_str(content)?)
}

fn apply_env_overrides(
    config: &mut ProctorConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(v) = lookup("PROCTOR_RUNNER_TIMEOUT_SECS") {
        config.runner.timeout_secs = v
            .trim()
            .parse()
            .with_context(|| format!("invalid PROCTOR_RUNNER_TIMEOUT_SECS: '{v}'"))?;
    }
    if let Some(v) = lookup("PROCTOR_TIME_LIMIT_SECS") {
        config.session.default_time_limit_secs = v
            .trim()
            .parse()
            .with_context(|| format!("invalid PROCTOR_TIME_LIMIT_SECS: '{v}'"))?;
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("proctor"))
}

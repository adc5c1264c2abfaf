//! Learner responses.
//!
//! A response entry exists only for questions the learner has touched.
//! Absence means "unanswered" at scoring time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Responses keyed by question id.
pub type ResponseMap = BTreeMap<String, Response>;

/// Type-shaped payload for a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Response {
    /// Choice answers and predicted output.
    Text(String),
    /// Fill-blank (blank number -> text) and matching (left -> right).
    Map(BTreeMap<String, String>),
    /// Jumbling: lines in the learner's order.
    Sequence(Vec<String>),
    /// Spot-error: zero-based line index.
    Index(usize),
    Coding(CodingResult),
}

impl Response {
    /// Whether the payload counts as an answer for presence-based scoring.
    ///
    /// Empty strings, maps and sequences count as absent.
    pub fn is_present(&self) -> bool {
        match self {
            Response::Text(s) => !s.is_empty(),
            Response::Map(m) => m.values().any(|v| !v.is_empty()),
            Response::Sequence(v) => !v.is_empty(),
            Response::Index(_) => true,
            Response::Coding(c) => !c.code.trim().is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Response::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Response::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[String]> {
        match self {
            Response::Sequence(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Response::Index(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_coding(&self) -> Option<&CodingResult> {
        match self {
            Response::Coding(c) => Some(c),
            _ => None,
        }
    }

    /// One-line summary for status displays.
    pub fn summary(&self) -> String {
        match self {
            Response::Text(s) => s.lines().next().unwrap_or_default().to_string(),
            Response::Map(m) => m
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", "),
            Response::Sequence(v) => format!("{} lines ordered", v.len()),
            Response::Index(i) => format!("line {}", i + 1),
            Response::Coding(c) => {
                if c.results.is_empty() {
                    format!("{} lines, not run", c.code.lines().count())
                } else {
                    format!("{}/{} tests passed", c.passed_count(), c.results.len())
                }
            }
        }
    }
}

/// Outcome of running a coding buffer against a question's test cases.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CodingResult {
    pub code: String,
    /// True iff every test case passed. Never true for a buffer that has not
    /// been run or for a question with no test cases.
    pub passed: bool,
    #[serde(default)]
    pub results: Vec<TestCaseResult>,
}

impl CodingResult {
    /// An edited, not-yet-run buffer.
    pub fn unrun(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            passed: false,
            results: Vec::new(),
        }
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }
}

/// Result of a single test case run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub index: usize,
    pub input: String,
    pub expected: String,
    #[serde(default)]
    pub actual: String,
    pub passed: bool,
    /// Runtime, compile or sandbox error message, if the case errored.
    #[serde(default)]
    pub error: Option<String>,
    pub duration_ms: u64,
}

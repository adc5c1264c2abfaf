//! Error types.
//!
//! Session operations never fail. These types cover the two places where a
//! learner action can be rejected or go wrong: parsing typed input into a
//! response payload, and executing a coding buffer in the sandbox.

use thiserror::Error;

use crate::model::{Language, QuestionKind};

/// Errors that can occur when running learner code.
///
/// The coding renderer turns every one of these into a failed test case;
/// none of them reach the hosting shell.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    /// The program ran past its per-test-case deadline and was killed.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// No interpreter or compiler is configured for the language.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(Language),

    /// The child process could not be started.
    #[error("failed to start {program}: {message}")]
    SpawnFailed { program: String, message: String },

    /// Compilation (for compiled languages) failed.
    #[error("compilation failed: {0}")]
    CompileFailed(String),

    /// The program wrote more than the allowed amount of output.
    #[error("output exceeded {0} bytes")]
    OutputLimit(usize),

    /// Setting up or tearing down the sandbox failed.
    #[error("sandbox I/O error: {0}")]
    Io(String),
}

impl ExecutionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout(_))
    }
}

impl From<std::io::Error> for ExecutionError {
    fn from(e: std::io::Error) -> Self {
        ExecutionError::Io(e.to_string())
    }
}

/// Learner input that a renderer could not turn into a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("{kind} answers cannot be empty")]
    Empty { kind: QuestionKind },

    #[error("'{input}' is not a valid choice (expected 1-{count} or A-{last})")]
    UnknownOption {
        input: String,
        count: usize,
        last: char,
    },

    #[error("expected a number between 1 and {max}, got '{input}'")]
    OutOfRange { input: String, max: usize },

    #[error("malformed input '{input}': {expected}")]
    Malformed { input: String, expected: &'static str },

    #[error("no question with id '{0}'")]
    UnknownQuestion(String),

    #[error("the attempt is no longer in progress")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_classified() {
        assert!(ExecutionError::Timeout(500).is_timeout());
        assert!(!ExecutionError::CompileFailed("x".into()).is_timeout());
    }

    #[test]
    fn messages_are_readable() {
        assert_eq!(ExecutionError::Timeout(2000).to_string(), "timed out after 2000ms");
        let e = EditError::UnknownOption {
            input: "Z".into(),
            count: 4,
            last: 'D',
        };
        assert_eq!(e.to_string(), "'Z' is not a valid choice (expected 1-4 or A-D)");
    }
}

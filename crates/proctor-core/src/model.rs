//! Core data model types for proctor.
//!
//! An [`Assessment`] is supplied by the authoring side and is never mutated by
//! the engine. Question order is significant: it defines navigation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An immutable, scored question set for one course module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Unique identifier for this assessment.
    pub id: String,
    /// The course module this assessment belongs to.
    pub module_id: String,
    /// Human-readable title.
    pub title: String,
    /// Description shown before the attempt starts.
    #[serde(default)]
    pub description: String,
    /// Maximum achievable score.
    pub total_points: f64,
    /// Minimum percentage of `total_points` required to pass.
    pub passing_score: f64,
    /// Time limit in seconds; the session default applies when absent.
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    /// Ordered question sequence.
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Assessment {
    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Index of the last question, or 0 for an empty assessment.
    pub fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }
}

/// A single question. Common fields plus a variant-specific body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique within the owning assessment.
    pub id: String,
    pub title: String,
    /// Prompt content. For fill-blank questions this is the template
    /// containing blank markers.
    #[serde(default)]
    pub content: String,
    /// Points awarded for full credit.
    pub points: f64,
    pub body: QuestionBody,
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        self.body.kind()
    }
}

/// Variant payload of a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionBody {
    Choice {
        options: Vec<String>,
        /// Must equal one of `options`.
        correct_answer: String,
    },
    FillBlank {
        #[serde(default)]
        hints: Vec<String>,
    },
    PredictOutput {
        code: String,
        #[serde(default)]
        hint: Option<String>,
    },
    Jumbling {
        /// Lines in canonical (correct) order.
        lines: Vec<String>,
    },
    Matching {
        left: Vec<String>,
        /// `right[i]` pairs with `left[i]`.
        right: Vec<String>,
    },
    SpotError {
        lines: Vec<String>,
        /// Zero-based index of the erroneous line.
        error_line: usize,
        #[serde(default)]
        explanation: String,
        #[serde(default)]
        correction: String,
    },
    Coding(CodingProblem),
}

impl QuestionBody {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionBody::Choice { .. } => QuestionKind::Choice,
            QuestionBody::FillBlank { .. } => QuestionKind::FillBlank,
            QuestionBody::PredictOutput { .. } => QuestionKind::PredictOutput,
            QuestionBody::Jumbling { .. } => QuestionKind::Jumbling,
            QuestionBody::Matching { .. } => QuestionKind::Matching,
            QuestionBody::SpotError { .. } => QuestionKind::SpotError,
            QuestionBody::Coding(_) => QuestionKind::Coding,
        }
    }
}

/// A programming problem graded by running test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingProblem {
    pub statement: String,
    #[serde(default)]
    pub input_format: String,
    #[serde(default)]
    pub output_format: String,
    #[serde(default)]
    pub constraints: String,
    #[serde(default = "default_language")]
    pub language: Language,
    /// Initial contents of the code buffer.
    #[serde(default)]
    pub starter_code: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// One stdin/stdout pair for a coding question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

fn default_language() -> Language {
    Language::Python
}

/// Type tag of a question variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    Choice,
    FillBlank,
    PredictOutput,
    Jumbling,
    Matching,
    SpotError,
    Coding,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 7] = [
        QuestionKind::Choice,
        QuestionKind::FillBlank,
        QuestionKind::PredictOutput,
        QuestionKind::Jumbling,
        QuestionKind::Matching,
        QuestionKind::SpotError,
        QuestionKind::Coding,
    ];
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestionKind::Choice => "choice",
            QuestionKind::FillBlank => "fill-blank",
            QuestionKind::PredictOutput => "predict-output",
            QuestionKind::Jumbling => "jumbling",
            QuestionKind::Matching => "matching",
            QuestionKind::SpotError => "spot-error",
            QuestionKind::Coding => "coding",
        };
        f.write_str(s)
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "choice" | "mcq" => Ok(QuestionKind::Choice),
            "fill-blank" | "fill-in-blank" => Ok(QuestionKind::FillBlank),
            "predict-output" => Ok(QuestionKind::PredictOutput),
            "jumbling" | "reorder" => Ok(QuestionKind::Jumbling),
            "matching" => Ok(QuestionKind::Matching),
            "spot-error" => Ok(QuestionKind::SpotError),
            "coding" => Ok(QuestionKind::Coding),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// Languages a coding question can be answered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Rust,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::JavaScript => write!(f, "javascript"),
            Language::Rust => write!(f, "rust"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "rust" | "rs" => Ok(Language::Rust),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_display_and_parse() {
        assert_eq!(Language::Python.to_string(), "python");
        assert_eq!(Language::JavaScript.to_string(), "javascript");
        assert_eq!("py".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("Node".parse::<Language>().unwrap(), Language::JavaScript);
        assert_eq!("rs".parse::<Language>().unwrap(), Language::Rust);
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn question_kind_parse_accepts_aliases() {
        for kind in QuestionKind::ALL {
            assert_eq!(kind.to_string().parse::<QuestionKind>().unwrap(), kind);
        }
        assert_eq!(
            "fill_blank".parse::<QuestionKind>().unwrap(),
            QuestionKind::FillBlank
        );
        assert_eq!(
            "reorder".parse::<QuestionKind>().unwrap(),
            QuestionKind::Jumbling
        );
        assert!("essay".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn question_body_serializes_with_type_tag() {
        let q = Question {
            id: "q1".into(),
            title: "Pick one".into(),
            content: "Which?".into(),
            points: 5.0,
            body: QuestionBody::SpotError {
                lines: vec!["a".into(), "b".into()],
                error_line: 1,
                explanation: String::new(),
                correction: String::new(),
            },
        };
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["body"]["type"], "spot-error");
        assert_eq!(json["body"]["error_line"], 1);
        let back: Question = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), QuestionKind::SpotError);
    }
}

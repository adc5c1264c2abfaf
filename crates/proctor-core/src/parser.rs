//! TOML assessment parser.
//!
//! Loads assessment definitions from TOML files and directories, and
//! validates them against the authoring contract.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{
    Assessment, CodingProblem, Language, Question, QuestionBody, QuestionKind, TestCase,
};
use crate::render::fill_blank::count_blanks;

/// Question counts the authoring subsystem is expected to produce.
pub const EXPECTED_QUESTION_COUNT: std::ops::RangeInclusive<usize> = 15..=20;

/// Intermediate TOML structure for parsing assessment files.
#[derive(Debug, Deserialize)]
struct TomlAssessmentFile {
    assessment: TomlAssessmentHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlAssessmentHeader {
    id: String,
    #[serde(default)]
    module_id: String,
    title: String,
    #[serde(default)]
    description: String,
    /// Defaults to the sum of question points.
    #[serde(default)]
    total_points: Option<f64>,
    #[serde(default = "default_passing_score")]
    passing_score: f64,
    #[serde(default)]
    time_limit_secs: Option<u64>,
}

fn default_passing_score() -> f64 {
    70.0
}

/// One `[[questions]]` entry. Variant fields are flat and optional; which
/// ones are required depends on `type`.
#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    title: String,
    #[serde(default)]
    content: String,
    points: f64,

    // choice
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answer: Option<String>,

    // fill-blank
    #[serde(default)]
    hints: Vec<String>,

    // predict-output
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    hint: Option<String>,

    // jumbling, spot-error
    #[serde(default)]
    lines: Vec<String>,

    // matching
    #[serde(default)]
    left: Vec<String>,
    #[serde(default)]
    right: Vec<String>,

    // spot-error
    #[serde(default)]
    error_line: Option<usize>,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    correction: String,

    // coding
    #[serde(default)]
    statement: Option<String>,
    #[serde(default)]
    input_format: String,
    #[serde(default)]
    output_format: String,
    #[serde(default)]
    constraints: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    starter_code: String,
    #[serde(default)]
    test_cases: Vec<TomlTestCase>,
}

#[derive(Debug, Deserialize)]
struct TomlTestCase {
    #[serde(default)]
    input: String,
    expected_output: String,
}

/// Parse a single TOML file into an `Assessment`.
pub fn parse_assessment(path: &Path) -> Result<Assessment> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read assessment file: {}", path.display()))?;

    parse_assessment_str(&content, path)
}

/// Parse a TOML string into an `Assessment` (useful for testing).
pub fn parse_assessment_str(content: &str, source_path: &Path) -> Result<Assessment> {
    let parsed: TomlAssessmentFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(convert_question)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid question in {}", source_path.display()))?;

    let header = parsed.assessment;
    let total_points = header
        .total_points
        .unwrap_or_else(|| questions.iter().map(|q| q.points).sum());

    Ok(Assessment {
        id: header.id,
        module_id: header.module_id,
        title: header.title,
        description: header.description,
        total_points,
        passing_score: header.passing_score,
        time_limit_secs: header.time_limit_secs,
        questions,
    })
}

fn convert_question(q: TomlQuestion) -> Result<Question> {
    let kind: QuestionKind = q
        .kind
        .parse()
        .map_err(|e: String| anyhow::anyhow!("question '{}': {}", q.id, e))?;

    let body = match kind {
        QuestionKind::Choice => QuestionBody::Choice {
            correct_answer: required(q.correct_answer, "correct_answer", &q.id)?,
            options: q.options,
        },
        QuestionKind::FillBlank => QuestionBody::FillBlank { hints: q.hints },
        QuestionKind::PredictOutput => QuestionBody::PredictOutput {
            code: required(q.code, "code", &q.id)?,
            hint: q.hint,
        },
        QuestionKind::Jumbling => QuestionBody::Jumbling { lines: q.lines },
        QuestionKind::Matching => QuestionBody::Matching {
            left: q.left,
            right: q.right,
        },
        QuestionKind::SpotError => QuestionBody::SpotError {
            error_line: required(q.error_line, "error_line", &q.id)?,
            lines: q.lines,
            explanation: q.explanation,
            correction: q.correction,
        },
        QuestionKind::Coding => {
            let language = q
                .language
                .map(|l| l.parse().map_err(|e: String| anyhow::anyhow!("{}", e)))
                .transpose()?
                .unwrap_or(Language::Python);
            QuestionBody::Coding(CodingProblem {
                statement: required(q.statement, "statement", &q.id)?,
                input_format: q.input_format,
                output_format: q.output_format,
                constraints: q.constraints,
                language,
                starter_code: q.starter_code,
                test_cases: q
                    .test_cases
                    .into_iter()
                    .map(|t| TestCase {
                        input: t.input,
                        expected_output: t.expected_output,
                    })
                    .collect(),
            })
        }
    };

    Ok(Question {
        id: q.id,
        title: q.title,
        content: q.content,
        points: q.points,
        body,
    })
}

fn required<T>(value: Option<T>, field: &str, question_id: &str) -> Result<T> {
    value.with_context(|| format!("question '{question_id}' is missing `{field}`"))
}

/// Recursively load all `.toml` assessment files from a directory.
pub fn load_assessment_directory(dir: &Path) -> Result<Vec<Assessment>> {
    let mut assessments = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            assessments.extend(load_assessment_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_assessment(&path) {
                Ok(assessment) => assessments.push(assessment),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    assessments.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(assessments)
}

/// A warning from assessment validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn assessment(message: impl Into<String>) -> Self {
        Self {
            question_id: None,
            message: message.into(),
        }
    }

    fn question(question: &Question, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(question.id.clone()),
            message: message.into(),
        }
    }
}

/// Validate an assessment for authoring mistakes. None of these stop the
/// engine from running it.
pub fn validate_assessment(assessment: &Assessment) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let count = assessment.questions.len();
    if !EXPECTED_QUESTION_COUNT.contains(&count) {
        warnings.push(ValidationWarning::assessment(format!(
            "assessment has {count} questions, expected {} to {}",
            EXPECTED_QUESTION_COUNT.start(),
            EXPECTED_QUESTION_COUNT.end()
        )));
    }

    if !(0.0..=100.0).contains(&assessment.passing_score) {
        warnings.push(ValidationWarning::assessment(format!(
            "passing_score {} is not a percentage",
            assessment.passing_score
        )));
    }

    let sum: f64 = assessment.questions.iter().map(|q| q.points).sum();
    if (sum - assessment.total_points).abs() > f64::EPSILON {
        warnings.push(ValidationWarning::assessment(format!(
            "question points sum to {sum} but total_points is {}",
            assessment.total_points
        )));
    }

    let mut seen_ids = HashSet::new();
    for question in &assessment.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning::question(
                question,
                format!("duplicate question ID: {}", question.id),
            ));
        }
        if question.points <= 0.0 {
            warnings.push(ValidationWarning::question(
                question,
                "points must be positive",
            ));
        }
        warnings.extend(validate_body(question));
    }

    warnings
}

fn validate_body(question: &Question) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    match &question.body {
        QuestionBody::Choice {
            options,
            correct_answer,
        } => {
            if !options.contains(correct_answer) {
                warnings.push(ValidationWarning::question(
                    question,
                    format!("correct_answer '{correct_answer}' is not one of the options"),
                ));
            }
        }
        QuestionBody::FillBlank { .. } => {
            if count_blanks(&question.content) == 0 {
                warnings.push(ValidationWarning::question(
                    question,
                    "content has no blank markers (___)",
                ));
            }
        }
        QuestionBody::SpotError {
            lines, error_line, ..
        } => {
            if *error_line >= lines.len() {
                warnings.push(ValidationWarning::question(
                    question,
                    format!(
                        "error_line {error_line} is out of range for {} lines",
                        lines.len()
                    ),
                ));
            }
        }
        QuestionBody::Matching { left, right } => {
            if left.len() != right.len() {
                warnings.push(ValidationWarning::question(
                    question,
                    format!(
                        "matching has {} left items but {} right items",
                        left.len(),
                        right.len()
                    ),
                ));
            }
        }
        QuestionBody::Coding(problem) => {
            if problem.test_cases.is_empty() {
                warnings.push(ValidationWarning::question(
                    question,
                    "coding question has no test cases and can never pass",
                ));
            }
        }
        QuestionBody::Jumbling { lines } => {
            if lines.len() < 2 {
                warnings.push(ValidationWarning::question(
                    question,
                    "jumbling needs at least two lines",
                ));
            }
        }
        QuestionBody::PredictOutput { .. } => {}
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[assessment]
id = "ownership-quiz"
module_id = "rust-101"
title = "Ownership"
description = "Moves, borrows and lifetimes"
passing_score = 60
time_limit_secs = 900

[[questions]]
id = "q1"
type = "choice"
title = "Moves"
content = "What happens to `a` after `let b = a;` for a String?"
points = 5
options = ["It is copied", "It is moved", "It is cloned"]
correct_answer = "It is moved"

[[questions]]
id = "q2"
type = "fill-blank"
title = "Borrow"
content = "A shared reference is written ___ and a mutable one ___."
points = 5
hints = ["Think of the ampersand"]

[[questions]]
id = "q3"
type = "spot-error"
title = "Spot it"
points = 5
lines = ["let s = String::new();", "let t = s;", "println!(\"{s}\");"]
error_line = 2
explanation = "s was moved"
correction = "println!(\"{t}\");"

[[questions]]
id = "q4"
type = "coding"
title = "Echo"
points = 10
statement = "Print the input line back"
starter_code = "print(input())"

[[questions.test_cases]]
input = "hello"
expected_output = "hello"
"#;

    #[test]
    fn parse_valid_toml() {
        let a = parse_assessment_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(a.id, "ownership-quiz");
        assert_eq!(a.module_id, "rust-101");
        assert_eq!(a.questions.len(), 4);
        assert_eq!(a.total_points, 25.0);
        assert_eq!(a.passing_score, 60.0);
        assert_eq!(a.time_limit_secs, Some(900));

        let kinds: Vec<_> = a.questions.iter().map(Question::kind).collect();
        assert_eq!(
            kinds,
            vec![
                QuestionKind::Choice,
                QuestionKind::FillBlank,
                QuestionKind::SpotError,
                QuestionKind::Coding
            ]
        );
        match &a.questions[3].body {
            QuestionBody::Coding(p) => {
                assert_eq!(p.language, Language::Python);
                assert_eq!(p.test_cases.len(), 1);
                assert_eq!(p.starter_code, "print(input())");
            }
            other => panic!("expected coding body, got {other:?}"),
        }
    }

    #[test]
    fn parse_missing_optional_fields() {
        let toml = r#"
[assessment]
id = "minimal"
title = "Minimal"

[[questions]]
id = "j"
type = "jumbling"
title = "Order"
points = 3
lines = ["a", "b"]
"#;
        let a = parse_assessment_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(a.passing_score, 70.0);
        assert_eq!(a.total_points, 3.0);
        assert!(a.time_limit_secs.is_none());
        assert!(a.module_id.is_empty());
    }

    #[test]
    fn missing_variant_field_is_an_error() {
        let toml = r#"
[assessment]
id = "broken"
title = "Broken"

[[questions]]
id = "c"
type = "choice"
title = "No answer"
points = 1
options = ["a"]
"#;
        let err = parse_assessment_str(toml, &PathBuf::from("test.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("correct_answer"));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let toml = r#"
[assessment]
id = "x"
title = "X"

[[questions]]
id = "e"
type = "essay"
title = "Essay"
points = 1
"#;
        assert!(parse_assessment_str(toml, &PathBuf::from("test.toml")).is_err());
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_assessment_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn validate_flags_authoring_mistakes() {
        let toml = r#"
[assessment]
id = "dupes"
title = "Dupes"
total_points = 50
passing_score = 120

[[questions]]
id = "same"
type = "choice"
title = "First"
points = 0
options = ["a", "b"]
correct_answer = "c"

[[questions]]
id = "same"
type = "matching"
title = "Second"
points = 5
left = ["x", "y"]
right = ["1"]

[[questions]]
id = "blank"
type = "fill-blank"
title = "No markers"
content = "nothing to fill"
points = 5

[[questions]]
id = "spot"
type = "spot-error"
title = "Out of range"
points = 5
lines = ["a"]
error_line = 3

[[questions]]
id = "code"
type = "coding"
title = "Untested"
points = 5
statement = "Do something"
"#;
        let a = parse_assessment_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_assessment(&a);
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));

        assert!(has("expected 15 to 20"));
        assert!(has("not a percentage"));
        assert!(has("sum to 20"));
        assert!(has("duplicate"));
        assert!(has("points must be positive"));
        assert!(has("not one of the options"));
        assert!(has("2 left items but 1 right"));
        assert!(has("no blank markers"));
        assert!(has("out of range"));
        assert!(has("no test cases"));
    }

    #[test]
    fn valid_assessment_only_warns_about_count() {
        let a = parse_assessment_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_assessment(&a);
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].question_id.is_none());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quiz.toml"), VALID_TOML).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("bad.toml"), "not [toml").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# ignored").unwrap();

        let assessments = load_assessment_directory(dir.path()).unwrap();
        assert_eq!(assessments.len(), 1);
        assert_eq!(assessments[0].id, "ownership-quiz");
    }
}

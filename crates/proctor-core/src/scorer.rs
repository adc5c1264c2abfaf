//! Per-variant scoring rules and the pass/fail verdict.
//!
//! Scoring is a pure function of the question list and the response map.
//! Four variants (fill-blank, predict-output, jumbling, matching) award half
//! credit for any present answer without checking it.

use serde::{Deserialize, Serialize};

use crate::model::{Assessment, Question, QuestionBody, QuestionKind};
use crate::response::{Response, ResponseMap};

/// How a question variant is graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRule {
    /// Full points iff the text equals the correct answer.
    ExactAnswer,
    /// Full points iff the coding run passed every test case.
    AllTestsPass,
    /// Full points iff the selected line is the erroneous one.
    ExactLine,
    /// Half points iff any answer is present.
    HalfForPresence,
}

impl ScoringRule {
    pub fn for_kind(kind: QuestionKind) -> Self {
        match kind {
            QuestionKind::Choice => ScoringRule::ExactAnswer,
            QuestionKind::Coding => ScoringRule::AllTestsPass,
            QuestionKind::SpotError => ScoringRule::ExactLine,
            QuestionKind::FillBlank
            | QuestionKind::PredictOutput
            | QuestionKind::Jumbling
            | QuestionKind::Matching => ScoringRule::HalfForPresence,
        }
    }
}

/// Points awarded for one question. A missing or wrongly shaped response
/// earns nothing.
pub fn award(question: &Question, response: Option<&Response>) -> f64 {
    let points = question.points.max(0.0);
    let Some(response) = response else {
        return 0.0;
    };

    let full = match (ScoringRule::for_kind(question.kind()), &question.body) {
        (ScoringRule::ExactAnswer, QuestionBody::Choice { correct_answer, .. }) => {
            response.as_text() == Some(correct_answer.as_str())
        }
        (ScoringRule::AllTestsPass, _) => response.as_coding().is_some_and(|c| c.passed),
        (ScoringRule::ExactLine, QuestionBody::SpotError { error_line, .. }) => {
            response.as_index() == Some(*error_line)
        }
        (ScoringRule::HalfForPresence, _) => {
            return if response.is_present() {
                points / 2.0
            } else {
                0.0
            };
        }
        _ => false,
    };

    if full {
        points
    } else {
        0.0
    }
}

/// Sum of awarded points, clamped to `[0, total_points]`.
pub fn score(questions: &[Question], responses: &ResponseMap, total_points: f64) -> f64 {
    let raw: f64 = questions
        .iter()
        .map(|q| award(q, responses.get(&q.id)))
        .sum();
    raw.clamp(0.0, total_points.max(0.0))
}

/// `100 * score / total_points`; zero when the assessment carries no points.
pub fn percentage(score: f64, total_points: f64) -> f64 {
    if total_points <= 0.0 {
        return 0.0;
    }
    100.0 * score / total_points
}

/// Final outcome of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub score: f64,
    pub total_points: f64,
    pub percentage: f64,
    /// Reaching the passing score exactly counts as a pass.
    pub passed: bool,
}

impl Verdict {
    pub fn new(score: f64, total_points: f64, passing_score: f64) -> Self {
        let percentage = percentage(score, total_points);
        Self {
            score,
            total_points,
            percentage,
            passed: percentage >= passing_score,
        }
    }
}

/// Points for a single question, for result breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionScore {
    pub question_id: String,
    pub title: String,
    pub kind: QuestionKind,
    pub rule: ScoringRule,
    pub answered: bool,
    pub awarded: f64,
    pub max: f64,
}

/// A scored attempt with its per-question breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSheet {
    pub questions: Vec<QuestionScore>,
    pub verdict: Verdict,
}

impl ScoreSheet {
    pub fn compute(assessment: &Assessment, responses: &ResponseMap) -> Self {
        let questions = assessment
            .questions
            .iter()
            .map(|q| {
                let response = responses.get(&q.id);
                QuestionScore {
                    question_id: q.id.clone(),
                    title: q.title.clone(),
                    kind: q.kind(),
                    rule: ScoringRule::for_kind(q.kind()),
                    answered: response.is_some_and(Response::is_present),
                    awarded: award(q, response),
                    max: q.points.max(0.0),
                }
            })
            .collect();

        let total = score(&assessment.questions, responses, assessment.total_points);
        Self {
            questions,
            verdict: Verdict::new(total, assessment.total_points, assessment.passing_score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodingProblem, Language, TestCase};
    use crate::response::CodingResult;
    use std::collections::BTreeMap;

    fn question(id: &str, points: f64, body: QuestionBody) -> Question {
        Question {
            id: id.into(),
            title: id.into(),
            content: String::new(),
            points,
            body,
        }
    }

    fn choice() -> Question {
        question(
            "c1",
            10.0,
            QuestionBody::Choice {
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_answer: "B".into(),
            },
        )
    }

    fn spot_error() -> Question {
        question(
            "s1",
            8.0,
            QuestionBody::SpotError {
                lines: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                error_line: 2,
                explanation: String::new(),
                correction: String::new(),
            },
        )
    }

    fn coding() -> Question {
        question(
            "k1",
            20.0,
            QuestionBody::Coding(CodingProblem {
                statement: "echo".into(),
                input_format: String::new(),
                output_format: String::new(),
                constraints: String::new(),
                language: Language::Python,
                starter_code: String::new(),
                test_cases: vec![
                    TestCase {
                        input: "1".into(),
                        expected_output: "1".into(),
                    };
                    3
                ],
            }),
        )
    }

    #[test]
    fn choice_full_credit_only_for_correct_answer() {
        let q = choice();
        assert_eq!(award(&q, Some(&Response::Text("B".into()))), 10.0);
        assert_eq!(award(&q, Some(&Response::Text("A".into()))), 0.0);
        assert_eq!(award(&q, Some(&Response::Text("b".into()))), 0.0);
        assert_eq!(award(&q, None), 0.0);
    }

    #[test]
    fn spot_error_full_credit_only_for_error_line() {
        let q = spot_error();
        assert_eq!(award(&q, Some(&Response::Index(2))), 8.0);
        for wrong in [0, 1, 3] {
            assert_eq!(award(&q, Some(&Response::Index(wrong))), 0.0);
        }
        assert_eq!(award(&q, None), 0.0);
    }

    #[test]
    fn coding_is_all_or_nothing() {
        let q = coding();
        let mut result = CodingResult::unrun("print(input())");
        assert_eq!(award(&q, Some(&Response::Coding(result.clone()))), 0.0);
        result.passed = true;
        assert_eq!(award(&q, Some(&Response::Coding(result))), 20.0);
    }

    #[test]
    fn presence_only_kinds_get_half() {
        let fill = question("f", 6.0, QuestionBody::FillBlank { hints: vec![] });
        let mut blanks = BTreeMap::new();
        blanks.insert("1".to_string(), "wrong anyway".to_string());
        assert_eq!(award(&fill, Some(&Response::Map(blanks))), 3.0);
        assert_eq!(award(&fill, Some(&Response::Map(BTreeMap::new()))), 0.0);

        let predict = question(
            "p",
            5.0,
            QuestionBody::PredictOutput {
                code: "print(1)".into(),
                hint: None,
            },
        );
        assert_eq!(award(&predict, Some(&Response::Text("42".into()))), 2.5);
        assert_eq!(award(&predict, Some(&Response::Text(String::new()))), 0.0);

        let jumble = question(
            "j",
            4.0,
            QuestionBody::Jumbling {
                lines: vec!["a".into(), "b".into()],
            },
        );
        assert_eq!(
            award(&jumble, Some(&Response::Sequence(vec!["b".into(), "a".into()]))),
            2.0
        );
        assert_eq!(award(&jumble, None), 0.0);
    }

    #[test]
    fn wrong_shape_earns_nothing() {
        assert_eq!(award(&choice(), Some(&Response::Index(1))), 0.0);
        assert_eq!(award(&spot_error(), Some(&Response::Text("2".into()))), 0.0);
    }

    #[test]
    fn score_is_clamped_to_total_points() {
        let questions = vec![choice(), spot_error()];
        let mut responses = ResponseMap::new();
        responses.insert("c1".into(), Response::Text("B".into()));
        responses.insert("s1".into(), Response::Index(2));
        assert_eq!(score(&questions, &responses, 18.0), 18.0);
        assert_eq!(score(&questions, &responses, 12.0), 12.0);
        assert_eq!(score(&questions, &ResponseMap::new(), 18.0), 0.0);
    }

    #[test]
    fn verdict_equality_counts_as_pass() {
        let v = Verdict::new(7.0, 10.0, 70.0);
        assert_eq!(v.percentage, 70.0);
        assert!(v.passed);
        assert!(!Verdict::new(6.9, 10.0, 70.0).passed);
    }

    #[test]
    fn zero_total_points_yields_zero_percentage() {
        let v = Verdict::new(0.0, 0.0, 50.0);
        assert_eq!(v.percentage, 0.0);
        assert!(!v.passed);
    }

    #[test]
    fn sheet_reports_each_question() {
        let assessment = Assessment {
            id: "a".into(),
            module_id: "m".into(),
            title: "A".into(),
            description: String::new(),
            total_points: 18.0,
            passing_score: 50.0,
            time_limit_secs: None,
            questions: vec![choice(), spot_error()],
        };
        let mut responses = ResponseMap::new();
        responses.insert("c1".into(), Response::Text("B".into()));
        let sheet = ScoreSheet::compute(&assessment, &responses);
        assert_eq!(sheet.questions.len(), 2);
        assert!(sheet.questions[0].answered);
        assert_eq!(sheet.questions[0].awarded, 10.0);
        assert!(!sheet.questions[1].answered);
        assert_eq!(sheet.verdict.score, 10.0);
        assert!(sheet.verdict.passed);
    }
}

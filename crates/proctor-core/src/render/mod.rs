//! Question renderers.
//!
//! Each question variant has a renderer that turns a question plus the
//! current response into a terminal view, and parses one line of learner
//! input into a new response payload. Renderers hold no state: the session
//! echoes the stored response back on every render, so navigating away and
//! back shows exactly what was recorded.

pub mod choice;
pub mod coding;
pub mod fill_blank;
pub mod jumbling;
pub mod matching;
pub mod predict_output;
pub mod spot_error;

use std::fmt;

use serde::Serialize;

use crate::error::EditError;
use crate::model::{Assessment, Question, QuestionKind};
use crate::response::Response;
use crate::scorer::ScoringRule;

/// Presentation and input capture for one question variant.
pub trait QuestionRenderer: Send + Sync {
    /// Body lines for `question`, reflecting `response` if one is recorded.
    fn render(&self, question: &Question, response: Option<&Response>) -> Vec<String>;

    /// Parse learner input into the payload to record for `question`.
    fn edit(
        &self,
        question: &Question,
        current: Option<&Response>,
        input: &str,
    ) -> Result<Response, EditError>;

    /// Short usage line shown under the question.
    fn instructions(&self) -> &'static str;
}

/// Dispatch entry for a question type tag.
#[derive(Clone, Copy)]
pub struct KindEntry {
    pub renderer: &'static dyn QuestionRenderer,
    pub rule: ScoringRule,
}

static CHOICE: choice::ChoiceRenderer = choice::ChoiceRenderer;
static FILL_BLANK: fill_blank::FillBlankRenderer = fill_blank::FillBlankRenderer;
static PREDICT_OUTPUT: predict_output::PredictOutputRenderer = predict_output::PredictOutputRenderer;
static JUMBLING: jumbling::JumblingRenderer = jumbling::JumblingRenderer;
static MATCHING: matching::MatchingRenderer = matching::MatchingRenderer;
static SPOT_ERROR: spot_error::SpotErrorRenderer = spot_error::SpotErrorRenderer;
static CODING: coding::CodingRenderer = coding::CodingRenderer;

/// Look up the renderer and scoring rule for a question type.
pub fn dispatch(kind: QuestionKind) -> KindEntry {
    let renderer: &'static dyn QuestionRenderer = match kind {
        QuestionKind::Choice => &CHOICE,
        QuestionKind::FillBlank => &FILL_BLANK,
        QuestionKind::PredictOutput => &PREDICT_OUTPUT,
        QuestionKind::Jumbling => &JUMBLING,
        QuestionKind::Matching => &MATCHING,
        QuestionKind::SpotError => &SPOT_ERROR,
        QuestionKind::Coding => &CODING,
    };
    KindEntry {
        renderer,
        rule: ScoringRule::for_kind(kind),
    }
}

/// A rendered question, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    /// Zero-based position in the assessment.
    pub index: usize,
    pub total: usize,
    pub question_id: String,
    pub kind: QuestionKind,
    pub title: String,
    pub points: f64,
    pub content: String,
    pub body: Vec<String>,
    /// Summary of the recorded response, if any.
    pub answer: Option<String>,
    pub instructions: &'static str,
}

impl QuestionView {
    pub fn build(assessment: &Assessment, index: usize, response: Option<&Response>) -> Option<Self> {
        let question = assessment.questions.get(index)?;
        let entry = dispatch(question.kind());
        // Fill-blank content is rendered inside the body with its blanks filled.
        let content = if question.kind() == QuestionKind::FillBlank {
            String::new()
        } else {
            question.content.clone()
        };
        Some(Self {
            index,
            total: assessment.questions.len(),
            question_id: question.id.clone(),
            kind: question.kind(),
            title: question.title.clone(),
            points: question.points,
            content,
            body: entry.renderer.render(question, response),
            answer: response.map(Response::summary),
            instructions: entry.renderer.instructions(),
        })
    }
}

impl fmt::Display for QuestionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Question {}/{} [{}] {} ({} pts)",
            self.index + 1,
            self.total,
            self.kind,
            self.title,
            self.points
        )?;
        if !self.content.is_empty() {
            writeln!(f)?;
            for line in self.content.lines() {
                writeln!(f, "{line}")?;
            }
        }
        if !self.body.is_empty() {
            writeln!(f)?;
            for line in &self.body {
                writeln!(f, "{line}")?;
            }
        }
        writeln!(f)?;
        match &self.answer {
            Some(answer) => writeln!(f, "Your answer: {answer}")?,
            None => writeln!(f, "Your answer: (none)")?,
        }
        write!(f, "{}", self.instructions)
    }
}

/// Parse learner input for `question` using its renderer.
pub fn apply_edit(
    question: &Question,
    current: Option<&Response>,
    input: &str,
) -> Result<Response, EditError> {
    dispatch(question.kind()).renderer.edit(question, current, input)
}

/// Expand `\n` and `\t` escapes so multi-line answers fit on one input line.
pub(crate) fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Deterministic shuffled display order for `len` items, seeded by the
/// question id. Never the identity order when `len > 1`.
pub(crate) fn display_order(seed: &str, len: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    if len < 2 {
        return order;
    }

    // FNV-1a over the id, then xorshift for the Fisher-Yates draws.
    let mut state = seed.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    for i in (1..len).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state % (i as u64 + 1)) as usize;
        order.swap(i, j);
    }

    if order.iter().enumerate().all(|(i, &v)| i == v) {
        order.rotate_left(1);
    }
    order
}

/// Letter label for a zero-based position: 0 -> 'A'.
pub(crate) fn letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// Parse a 1-based number in `1..=max` into a zero-based index.
pub(crate) fn parse_position(input: &str, max: usize) -> Result<usize, EditError> {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n - 1),
        _ => Err(EditError::OutOfRange {
            input: input.trim().to_string(),
            max,
        }),
    }
}

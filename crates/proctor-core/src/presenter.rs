//! Result presenter: the terminal pass/fail view of a completed attempt.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::model::Assessment;
use crate::scorer::{QuestionScore, ScoreSheet, Verdict};
use crate::session::{CompletionReason, SessionState};

/// The two things a learner can do from the result view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultAction {
    /// Start over against the same assessment.
    Retake,
    /// Leave without penalty; the attempt is already recorded.
    Close,
}

impl FromStr for ResultAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retake" | "retry" => Ok(ResultAction::Retake),
            "close" | "exit" => Ok(ResultAction::Close),
            other => Err(format!("unknown result action: {other}")),
        }
    }
}

/// Display model for a completed attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub title: String,
    pub verdict: Verdict,
    pub passing_score: f64,
    pub reason: CompletionReason,
    pub violations: u32,
    pub breakdown: Vec<QuestionScore>,
}

impl ResultView {
    /// Build the view, or `None` while the attempt is still in progress.
    pub fn build(assessment: &Assessment, state: &SessionState) -> Option<Self> {
        let outcome = state.outcome?;
        let sheet = ScoreSheet::compute(assessment, &state.responses);
        Some(Self {
            title: assessment.title.clone(),
            verdict: Verdict::new(
                outcome.score,
                assessment.total_points,
                assessment.passing_score,
            ),
            passing_score: assessment.passing_score,
            reason: outcome.reason,
            violations: state.violation_count,
            breakdown: sheet.questions,
        })
    }

    /// Encouragement shown only on failure.
    pub fn retry_prompt(&self) -> Option<String> {
        (!self.verdict.passed).then(|| {
            format!(
                "You need {:.0}% to pass. Review the material and try again.",
                self.passing_score
            )
        })
    }

    pub fn actions(&self) -> [ResultAction; 2] {
        [ResultAction::Retake, ResultAction::Close]
    }
}

impl fmt::Display for ResultView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let badge = if self.verdict.passed { "PASSED" } else { "FAILED" };
        writeln!(f, "{} [{badge}]", self.title)?;
        writeln!(
            f,
            "Score: {} / {} ({:.1}%)",
            self.verdict.score, self.verdict.total_points, self.verdict.percentage
        )?;
        writeln!(f, "Completed: {}", self.reason)?;
        if self.violations > 0 {
            writeln!(f, "Integrity violations: {}", self.violations)?;
        }
        for q in &self.breakdown {
            writeln!(
                f,
                "  {:<24} {:>6} / {:<6} {}",
                q.title,
                q.awarded,
                q.max,
                if q.answered { "" } else { "(unanswered)" }
            )?;
        }
        if let Some(prompt) = self.retry_prompt() {
            writeln!(f, "{prompt}")?;
        }
        write!(f, "Actions: retake | close")
    }
}

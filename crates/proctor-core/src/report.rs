//! Attempt reports with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Assessment;
use crate::response::ResponseMap;
use crate::scorer::{QuestionScore, ScoreSheet, Verdict};
use crate::session::{CompletionReason, Outcome, SessionState};

/// Record of one completed attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// The engine session that produced the attempt.
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Summary of the assessment (without the question definitions).
    pub assessment: AssessmentSummary,
    pub score: f64,
    pub percentage: f64,
    pub passed: bool,
    pub reason: CompletionReason,
    pub violations: u32,
    pub breakdown: Vec<QuestionScore>,
    /// Responses as frozen at completion.
    pub responses: ResponseMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub question_count: usize,
    pub total_points: f64,
    pub passing_score: f64,
}

impl AssessmentSummary {
    pub fn of(assessment: &Assessment) -> Self {
        Self {
            id: assessment.id.clone(),
            module_id: assessment.module_id.clone(),
            title: assessment.title.clone(),
            question_count: assessment.questions.len(),
            total_points: assessment.total_points,
            passing_score: assessment.passing_score,
        }
    }
}

impl AttemptReport {
    /// Build a report from a completed session, or `None` if the session
    /// has not completed.
    pub fn from_session(
        assessment: &Assessment,
        session_id: Uuid,
        started_at: DateTime<Utc>,
        state: &SessionState,
    ) -> Option<Self> {
        let outcome = state.outcome?;
        Some(Self::new(
            assessment,
            session_id,
            started_at,
            outcome,
            state.violation_count,
            state.responses.clone(),
        ))
    }

    /// Build a report from what the completion callback delivered.
    pub fn new(
        assessment: &Assessment,
        session_id: Uuid,
        started_at: DateTime<Utc>,
        outcome: Outcome,
        violations: u32,
        responses: ResponseMap,
    ) -> Self {
        let verdict = Verdict::new(
            outcome.score,
            assessment.total_points,
            assessment.passing_score,
        );
        let sheet = ScoreSheet::compute(assessment, &responses);

        Self {
            id: Uuid::new_v4(),
            session_id,
            started_at,
            completed_at: Utc::now(),
            assessment: AssessmentSummary::of(assessment),
            score: verdict.score,
            percentage: verdict.percentage,
            passed: verdict.passed,
            reason: outcome.reason,
            violations,
            breakdown: sheet.questions,
            responses,
        }
    }

    /// File stem used when writing the report into an output directory.
    pub fn file_stem(&self) -> String {
        format!(
            "{}-{}",
            self.assessment.id,
            self.completed_at.format("%Y%m%dT%H%M%S")
        )
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AttemptReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Short markdown summary.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str(&format!("# {}\n\n", self.assessment.title));
        md.push_str(&format!(
            "**{}** with {} / {} ({:.1}%), {}\n\n",
            if self.passed { "Passed" } else { "Failed" },
            self.score,
            self.assessment.total_points,
            self.percentage,
            self.reason
        ));
        if self.violations > 0 {
            md.push_str(&format!("Integrity violations: {}\n\n", self.violations));
        }
        md.push_str("| Question | Type | Awarded | Max |\n");
        md.push_str("|----------|------|---------|-----|\n");
        for q in &self.breakdown {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                q.title, q.kind, q.awarded, q.max
            ));
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::model::{Question, QuestionBody};
    use crate::response::Response;
    use crate::session::Action;

    fn assessment() -> Assessment {
        let question = |id: &str, answer: &str| Question {
            id: id.into(),
            title: format!("Question {id}"),
            content: String::new(),
            points: 5.0,
            body: QuestionBody::Choice {
                options: vec!["yes".into(), "no".into()],
                correct_answer: answer.into(),
            },
        };
        Assessment {
            id: "traits".into(),
            module_id: "rust-102".into(),
            title: "Traits".into(),
            description: String::new(),
            total_points: 10.0,
            passing_score: 50.0,
            time_limit_secs: Some(60),
            questions: vec![question("a", "yes"), question("b", "no")],
        }
    }

    fn completed_state(a: &Assessment) -> SessionState {
        let config = SessionConfig::default();
        let mut state = SessionState::initial(a, &config);
        state.reduce(
            a,
            &config,
            Action::SetResponse {
                question_id: "a".into(),
                response: Response::Text("yes".into()),
            },
        );
        state.reduce(a, &config, Action::Submit);
        state
    }

    #[test]
    fn no_report_for_unfinished_session() {
        let a = assessment();
        let state = SessionState::initial(&a, &SessionConfig::default());
        assert!(AttemptReport::from_session(&a, Uuid::new_v4(), Utc::now(), &state).is_none());
    }

    #[test]
    fn report_captures_outcome() {
        let a = assessment();
        let session_id = Uuid::new_v4();
        let report =
            AttemptReport::from_session(&a, session_id, Utc::now(), &completed_state(&a)).unwrap();
        assert_eq!(report.session_id, session_id);
        assert_eq!(report.score, 5.0);
        assert_eq!(report.percentage, 50.0);
        assert!(report.passed);
        assert_eq!(report.reason, CompletionReason::Submitted);
        assert_eq!(report.breakdown.len(), 2);
        assert_eq!(report.assessment.question_count, 2);
        assert!(report.file_stem().starts_with("traits-"));
    }

    #[test]
    fn json_roundtrip() {
        let a = assessment();
        let report =
            AttemptReport::from_session(&a, Uuid::new_v4(), Utc::now(), &completed_state(&a))
                .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        report.save_json(&path).unwrap();

        let loaded = AttemptReport::load_json(&path).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.responses, report.responses);
        assert_eq!(loaded.breakdown, report.breakdown);
    }

    #[test]
    fn markdown_output() {
        let a = assessment();
        let report =
            AttemptReport::from_session(&a, Uuid::new_v4(), Utc::now(), &completed_state(&a))
                .unwrap();
        let md = report.to_markdown();
        assert!(md.contains("# Traits"));
        assert!(md.contains("**Passed**"));
        assert!(md.contains("| Question a | choice | 5 | 5 |"));
    }
}

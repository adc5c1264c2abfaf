//! Predict-the-output renderer.

use crate::error::EditError;
use crate::model::{Question, QuestionBody, QuestionKind};
use crate::response::Response;

use super::{unescape, QuestionRenderer};

pub struct PredictOutputRenderer;

impl QuestionRenderer for PredictOutputRenderer {
    fn render(&self, question: &Question, response: Option<&Response>) -> Vec<String> {
        let QuestionBody::PredictOutput { code, hint } = &question.body else {
            return Vec::new();
        };
        let mut lines: Vec<String> = code
            .lines()
            .enumerate()
            .map(|(i, line)| format!("{:>3} | {line}", i + 1))
            .collect();

        if let Some(hint) = hint {
            lines.push(String::new());
            lines.push(format!("Hint: {hint}"));
        }
        if let Some(predicted) = response.and_then(Response::as_text) {
            lines.push(String::new());
            lines.push("Predicted output:".to_string());
            lines.extend(predicted.lines().map(|l| format!("  {l}")));
        }
        lines
    }

    fn edit(
        &self,
        _question: &Question,
        _current: Option<&Response>,
        input: &str,
    ) -> Result<Response, EditError> {
        let text = unescape(input.trim());
        if text.is_empty() {
            return Err(EditError::Empty {
                kind: QuestionKind::PredictOutput,
            });
        }
        Ok(Response::Text(text))
    }

    fn instructions(&self) -> &'static str {
        "answer <expected output>   (use \\n for line breaks)"
    }
}

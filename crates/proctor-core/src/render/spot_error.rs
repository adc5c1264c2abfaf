//! Spot-the-error renderer.

use crate::error::EditError;
use crate::model::{Question, QuestionBody, QuestionKind};
use crate::response::Response;

use super::{parse_position, QuestionRenderer};

pub struct SpotErrorRenderer;

impl QuestionRenderer for SpotErrorRenderer {
    fn render(&self, question: &Question, response: Option<&Response>) -> Vec<String> {
        let QuestionBody::SpotError { lines, .. } = &question.body else {
            return Vec::new();
        };
        let selected = response.and_then(Response::as_index);
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let mark = if selected == Some(i) { '>' } else { ' ' };
                format!("{mark}{:>3} | {line}", i + 1)
            })
            .collect()
    }

    fn edit(
        &self,
        question: &Question,
        _current: Option<&Response>,
        input: &str,
    ) -> Result<Response, EditError> {
        let QuestionBody::SpotError { lines, .. } = &question.body else {
            return Err(EditError::Malformed {
                input: input.to_string(),
                expected: "a spot-error question",
            });
        };
        if input.trim().is_empty() {
            return Err(EditError::Empty {
                kind: QuestionKind::SpotError,
            });
        }
        parse_position(input, lines.len()).map(Response::Index)
    }

    fn instructions(&self) -> &'static str {
        "answer <number of the line containing the error>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> Question {
        Question {
            id: "s".into(),
            title: "Find it".into(),
            content: String::new(),
            points: 3.0,
            body: QuestionBody::SpotError {
                lines: vec![
                    "let v = vec![1];".into(),
                    "let r = &v;".into(),
                    "drop(v);".into(),
                    "println!(\"{r:?}\");".into(),
                ],
                error_line: 2,
                explanation: "v is moved while borrowed".into(),
                correction: "drop after last use of r".into(),
            },
        }
    }

    #[test]
    fn line_numbers_are_one_based() {
        assert_eq!(
            SpotErrorRenderer.edit(&question(), None, "3").unwrap(),
            Response::Index(2)
        );
        assert!(SpotErrorRenderer.edit(&question(), None, "5").is_err());
        assert!(SpotErrorRenderer.edit(&question(), None, "").is_err());
    }

    #[test]
    fn selected_line_is_marked() {
        let lines = SpotErrorRenderer.render(&question(), Some(&Response::Index(2)));
        assert_eq!(lines[2], ">  3 | drop(v);");
        assert_eq!(lines[0], "   1 | let v = vec![1];");
    }
}

//! Multiple-choice renderer.

use crate::error::EditError;
use crate::model::{Question, QuestionBody, QuestionKind};
use crate::response::Response;

use super::{letter, QuestionRenderer};

pub struct ChoiceRenderer;

impl QuestionRenderer for ChoiceRenderer {
    fn render(&self, question: &Question, response: Option<&Response>) -> Vec<String> {
        let QuestionBody::Choice { options, .. } = &question.body else {
            return Vec::new();
        };
        let selected = response.and_then(Response::as_text);
        options
            .iter()
            .enumerate()
            .map(|(i, option)| {
                let mark = if selected == Some(option.as_str()) { '*' } else { ' ' };
                format!(" {mark} {}) {option}", letter(i))
            })
            .collect()
    }

    fn edit(
        &self,
        question: &Question,
        _current: Option<&Response>,
        input: &str,
    ) -> Result<Response, EditError> {
        let QuestionBody::Choice { options, .. } = &question.body else {
            return Err(EditError::Malformed {
                input: input.to_string(),
                expected: "a choice question",
            });
        };
        let input = input.trim();
        if input.is_empty() {
            return Err(EditError::Empty {
                kind: QuestionKind::Choice,
            });
        }

        // Exact option text wins over letter/number shortcuts.
        if let Some(option) = options.iter().find(|o| o.as_str() == input) {
            return Ok(Response::Text(option.clone()));
        }

        let index = if let Ok(n) = input.parse::<usize>() {
            n.checked_sub(1)
        } else {
            let mut chars = input.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => {
                    Some((c.to_ascii_uppercase() as u8 - b'A') as usize)
                }
                _ => None,
            }
        };

        index
            .and_then(|i| options.get(i))
            .map(|o| Response::Text(o.clone()))
            .ok_or_else(|| EditError::UnknownOption {
                input: input.to_string(),
                count: options.len(),
                last: letter(options.len().saturating_sub(1)),
            })
    }

    fn instructions(&self) -> &'static str {
        "answer <letter | number | option text>"
    }
}

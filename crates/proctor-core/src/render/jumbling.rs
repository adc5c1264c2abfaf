//! Reorder-the-lines renderer.
//!
//! Lines start in a scrambled order. The learner answers with a permutation
//! of the line numbers as currently displayed, and the resulting order
//! becomes the displayed order for the next edit.

use crate::error::EditError;
use crate::model::{Question, QuestionBody, QuestionKind};
use crate::response::Response;

use super::{display_order, QuestionRenderer};

pub struct JumblingRenderer;

fn displayed_lines(question: &Question, response: Option<&Response>) -> Vec<String> {
    let QuestionBody::Jumbling { lines } = &question.body else {
        return Vec::new();
    };
    match response.and_then(Response::as_sequence) {
        Some(ordered) if ordered.len() == lines.len() => ordered.to_vec(),
        _ => display_order(&question.id, lines.len())
            .into_iter()
            .map(|i| lines[i].clone())
            .collect(),
    }
}

impl QuestionRenderer for JumblingRenderer {
    fn render(&self, question: &Question, response: Option<&Response>) -> Vec<String> {
        displayed_lines(question, response)
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>3} | {line}", i + 1))
            .collect()
    }

    fn edit(
        &self,
        question: &Question,
        current: Option<&Response>,
        input: &str,
    ) -> Result<Response, EditError> {
        let shown = displayed_lines(question, current);
        let tokens: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Err(EditError::Empty {
                kind: QuestionKind::Jumbling,
            });
        }
        if tokens.len() != shown.len() {
            return Err(EditError::Malformed {
                input: input.trim().to_string(),
                expected: "every line number exactly once",
            });
        }

        let mut used = vec![false; shown.len()];
        let mut ordered = Vec::with_capacity(shown.len());
        for token in tokens {
            let i = super::parse_position(token, shown.len())?;
            if std::mem::replace(&mut used[i], true) {
                return Err(EditError::Malformed {
                    input: input.trim().to_string(),
                    expected: "every line number exactly once",
                });
            }
            ordered.push(shown[i].clone());
        }
        Ok(Response::Sequence(ordered))
    }

    fn instructions(&self) -> &'static str {
        "answer <line numbers in the correct order, e.g. 3 1 2>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> Question {
        Question {
            id: "j".into(),
            title: "Order".into(),
            content: String::new(),
            points: 3.0,
            body: QuestionBody::Jumbling {
                lines: vec!["fn main() {".into(), "    run();".into(), "}".into()],
            },
        }
    }

    #[test]
    fn initial_order_is_scrambled() {
        let q = question();
        let shown = displayed_lines(&q, None);
        assert_eq!(shown.len(), 3);
        let QuestionBody::Jumbling { lines } = &q.body else { unreachable!() };
        assert_ne!(&shown, lines);
    }

    #[test]
    fn permutation_refers_to_displayed_order() {
        let q = question();
        let shown = displayed_lines(&q, None);
        let r = JumblingRenderer.edit(&q, None, "3 2 1").unwrap();
        let expected: Vec<String> = shown.iter().rev().cloned().collect();
        assert_eq!(r, Response::Sequence(expected.clone()));

        // The recorded order is what gets displayed next.
        assert_eq!(displayed_lines(&q, Some(&r)), expected);
        let back = JumblingRenderer.edit(&q, Some(&r), "3,2,1").unwrap();
        assert_eq!(back, Response::Sequence(shown));
    }

    #[test]
    fn rejects_partial_or_repeated_permutations() {
        let q = question();
        assert!(JumblingRenderer.edit(&q, None, "1 2").is_err());
        assert!(JumblingRenderer.edit(&q, None, "1 1 2").is_err());
        assert!(JumblingRenderer.edit(&q, None, "1 2 4").is_err());
        assert!(JumblingRenderer.edit(&q, None, "").is_err());
    }
}

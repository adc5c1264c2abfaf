//! Fill-in-the-blank renderer.
//!
//! Blanks are runs of three or more underscores in the question content and
//! are numbered from 1 in reading order.

use std::collections::BTreeMap;

use crate::error::EditError;
use crate::model::{Question, QuestionBody, QuestionKind};
use crate::response::Response;

use super::QuestionRenderer;

pub struct FillBlankRenderer;

/// Number of blank markers in a template.
pub fn count_blanks(template: &str) -> usize {
    split_template(template).len().saturating_sub(1)
}

/// Text segments between blanks; always one more than the blank count.
fn split_template(template: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let bytes = template.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            let run_start = i;
            while i < bytes.len() && bytes[i] == b'_' {
                i += 1;
            }
            if i - run_start >= 3 {
                segments.push(&template[start..run_start]);
                start = i;
            }
        } else {
            i += 1;
        }
    }
    segments.push(&template[start..]);
    segments
}

impl QuestionRenderer for FillBlankRenderer {
    fn render(&self, question: &Question, response: Option<&Response>) -> Vec<String> {
        let QuestionBody::FillBlank { hints } = &question.body else {
            return Vec::new();
        };
        let filled = response.and_then(Response::as_map);

        let segments = split_template(&question.content);
        let mut text = String::new();
        for (i, segment) in segments.iter().enumerate() {
            text.push_str(segment);
            if i + 1 < segments.len() {
                let n = i + 1;
                match filled.and_then(|m| m.get(&n.to_string())) {
                    Some(v) if !v.is_empty() => text.push_str(&format!("[{n}: {v}]")),
                    _ => text.push_str(&format!("[{n}: ____]")),
                }
            }
        }

        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        if !hints.is_empty() {
            lines.push(String::new());
            for (i, hint) in hints.iter().enumerate() {
                lines.push(format!("Hint {}: {hint}", i + 1));
            }
        }
        lines
    }

    fn edit(
        &self,
        question: &Question,
        current: Option<&Response>,
        input: &str,
    ) -> Result<Response, EditError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EditError::Empty {
                kind: QuestionKind::FillBlank,
            });
        }
        let (blank, value) = input.split_once('=').ok_or_else(|| EditError::Malformed {
            input: input.to_string(),
            expected: "<blank number>=<text>",
        })?;

        // A template without markers is treated as a single blank.
        let max = count_blanks(&question.content).max(1);
        let n = super::parse_position(blank, max)? + 1;

        let mut blanks: BTreeMap<String, String> = current
            .and_then(Response::as_map)
            .cloned()
            .unwrap_or_default();
        let value = value.trim();
        if value.is_empty() {
            blanks.remove(&n.to_string());
        } else {
            blanks.insert(n.to_string(), value.to_string());
        }
        Ok(Response::Map(blanks))
    }

    fn instructions(&self) -> &'static str {
        "answer <blank>=<text>   (empty text clears the blank)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> Question {
        Question {
            id: "f".into(),
            title: "Declare".into(),
            content: "let ___ = vec![1, 2];\nfor x in ___.iter() {}".into(),
            points: 4.0,
            body: QuestionBody::FillBlank {
                hints: vec!["same name twice".into()],
            },
        }
    }

    #[test]
    fn counts_markers() {
        assert_eq!(count_blanks("a ___ b _____ c"), 2);
        assert_eq!(count_blanks("snake_case __ not a blank"), 0);
        assert_eq!(count_blanks("___"), 1);
    }

    #[test]
    fn edits_merge_into_existing_blanks() {
        let q = question();
        let first = FillBlankRenderer.edit(&q, None, "1=v").unwrap();
        let both = FillBlankRenderer.edit(&q, Some(&first), "2 = v").unwrap();
        let map = both.as_map().unwrap();
        assert_eq!(map.get("1").map(String::as_str), Some("v"));
        assert_eq!(map.get("2").map(String::as_str), Some("v"));

        let cleared = FillBlankRenderer.edit(&q, Some(&both), "1=").unwrap();
        assert_eq!(cleared.as_map().unwrap().len(), 1);
    }

    #[test]
    fn rejects_bad_input() {
        let q = question();
        assert!(matches!(
            FillBlankRenderer.edit(&q, None, "v"),
            Err(EditError::Malformed { .. })
        ));
        assert!(matches!(
            FillBlankRenderer.edit(&q, None, "3=v"),
            Err(EditError::OutOfRange { max: 2, .. })
        ));
    }

    #[test]
    fn render_fills_blanks_and_shows_hints() {
        let q = question();
        let response = FillBlankRenderer.edit(&q, None, "1=nums").unwrap();
        let lines = FillBlankRenderer.render(&q, Some(&response));
        assert_eq!(lines[0], "let [1: nums] = vec![1, 2];");
        assert_eq!(lines[1], "for x in [2: ____].iter() {}");
        assert_eq!(lines.last().unwrap(), "Hint 1: same name twice");
    }
}

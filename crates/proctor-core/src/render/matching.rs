//! Matching renderer.
//!
//! Left items are numbered, right items are lettered in a scrambled order.
//! The recorded response maps left item text to right item text.

use std::collections::BTreeMap;

use crate::error::EditError;
use crate::model::{Question, QuestionBody, QuestionKind};
use crate::response::Response;

use super::{display_order, letter, QuestionRenderer};

pub struct MatchingRenderer;

fn right_column(question: &Question, right: &[String]) -> Vec<String> {
    display_order(&format!("{}:right", question.id), right.len())
        .into_iter()
        .map(|i| right[i].clone())
        .collect()
}

impl QuestionRenderer for MatchingRenderer {
    fn render(&self, question: &Question, response: Option<&Response>) -> Vec<String> {
        let QuestionBody::Matching { left, right } = &question.body else {
            return Vec::new();
        };
        let pairs = response.and_then(Response::as_map);
        let column = right_column(question, right);

        let mut lines = Vec::with_capacity(left.len() + column.len() + 1);
        for (i, item) in left.iter().enumerate() {
            match pairs.and_then(|p| p.get(item)) {
                Some(matched) => lines.push(format!("{:>3}. {item}  ->  {matched}", i + 1)),
                None => lines.push(format!("{:>3}. {item}", i + 1)),
            }
        }
        lines.push(String::new());
        for (i, item) in column.iter().enumerate() {
            lines.push(format!("  {}) {item}", letter(i)));
        }
        lines
    }

    fn edit(
        &self,
        question: &Question,
        current: Option<&Response>,
        input: &str,
    ) -> Result<Response, EditError> {
        let QuestionBody::Matching { left, right } = &question.body else {
            return Err(EditError::Malformed {
                input: input.to_string(),
                expected: "a matching question",
            });
        };
        let column = right_column(question, right);

        let pairs: Vec<&str> = input
            .split([',', ';'])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if pairs.is_empty() {
            return Err(EditError::Empty {
                kind: QuestionKind::Matching,
            });
        }

        let mut matched: BTreeMap<String, String> = current
            .and_then(Response::as_map)
            .cloned()
            .unwrap_or_default();

        for pair in pairs {
            let (l, r) = pair.split_once('=').ok_or_else(|| EditError::Malformed {
                input: pair.to_string(),
                expected: "<left number>=<right letter>",
            })?;
            let li = super::parse_position(l, left.len())?;
            let r = r.trim();
            let ri = match r.chars().next() {
                Some(c) if r.len() == 1 && c.is_ascii_alphabetic() => {
                    (c.to_ascii_uppercase() as u8 - b'A') as usize
                }
                _ => usize::MAX,
            };
            let Some(target) = column.get(ri) else {
                return Err(EditError::UnknownOption {
                    input: r.to_string(),
                    count: column.len(),
                    last: letter(column.len().saturating_sub(1)),
                });
            };
            matched.insert(left[li].clone(), target.clone());
        }

        Ok(Response::Map(matched))
    }

    fn instructions(&self) -> &'static str {
        "answer <left>=<right>[, <left>=<right> ...]   e.g. 1=B, 2=A"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> Question {
        Question {
            id: "m".into(),
            title: "Pairs".into(),
            content: String::new(),
            points: 4.0,
            body: QuestionBody::Matching {
                left: vec!["Vec".into(), "HashMap".into(), "Option".into()],
                right: vec!["growable array".into(), "key-value store".into(), "maybe a value".into()],
            },
        }
    }

    #[test]
    fn pairs_use_displayed_letters() {
        let q = question();
        let QuestionBody::Matching { right, .. } = &q.body else { unreachable!() };
        let column = right_column(&q, right);

        let r = MatchingRenderer.edit(&q, None, "1=a, 3=C").unwrap();
        let map = r.as_map().unwrap();
        assert_eq!(map.get("Vec"), Some(&column[0]));
        assert_eq!(map.get("Option"), Some(&column[2]));

        let r = MatchingRenderer.edit(&q, Some(&r), "2=b").unwrap();
        assert_eq!(r.as_map().unwrap().len(), 3);
    }

    #[test]
    fn rejects_out_of_range() {
        let q = question();
        assert!(MatchingRenderer.edit(&q, None, "4=A").is_err());
        assert!(MatchingRenderer.edit(&q, None, "1=Z").is_err());
        assert!(MatchingRenderer.edit(&q, None, "1-A").is_err());
        assert!(MatchingRenderer.edit(&q, None, " ").is_err());
    }

    #[test]
    fn render_shows_recorded_pairs() {
        let q = question();
        let r = MatchingRenderer.edit(&q, None, "1=A").unwrap();
        let lines = MatchingRenderer.render(&q, Some(&r));
        assert!(lines[0].starts_with("  1. Vec  ->  "));
        assert_eq!(lines[1], "  2. HashMap");
        assert_eq!(lines.len(), 7);
    }
}

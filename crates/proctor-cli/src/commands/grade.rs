//! The `proctor grade` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use proctor_core::parser;
use proctor_core::response::ResponseMap;
use proctor_core::scorer::ScoreSheet;

pub fn execute(assessment_path: PathBuf, responses_path: PathBuf) -> Result<()> {
    let assessment = parser::parse_assessment(&assessment_path)?;

    let content = std::fs::read_to_string(&responses_path)
        .with_context(|| format!("failed to read responses: {}", responses_path.display()))?;
    let responses: ResponseMap =
        serde_json::from_str(&content).context("failed to parse responses JSON")?;

    for id in responses.keys() {
        if assessment.question(id).is_none() {
            eprintln!("WARNING: response for unknown question '{id}' ignored");
        }
    }

    let sheet = ScoreSheet::compute(&assessment, &responses);

    let mut table = Table::new();
    table.set_header(vec!["Question", "Type", "Rule", "Answered", "Points"]);
    for q in &sheet.questions {
        table.add_row(vec![
            Cell::new(&q.title),
            Cell::new(q.kind),
            Cell::new(format!("{:?}", q.rule)),
            Cell::new(if q.answered { "yes" } else { "no" }),
            Cell::new(format!("{} / {}", q.awarded, q.max)),
        ]);
    }
    println!("{table}");

    let verdict = sheet.verdict;
    println!(
        "Score: {} / {} ({:.1}%) {}",
        verdict.score,
        verdict.total_points,
        verdict.percentage,
        if verdict.passed { "PASSED" } else { "FAILED" }
    );

    Ok(())
}

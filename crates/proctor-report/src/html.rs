//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use proctor_core::report::AttemptReport;
use proctor_core::response::Response;
use proctor_core::scorer::QuestionScore;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML page for one attempt.
pub fn generate_html(report: &AttemptReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>proctor attempt: {}</title>\n",
        html_escape(&report.assessment.title)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    let (verdict_class, verdict_text) = if report.passed {
        ("pass", "PASSED")
    } else {
        ("fail", "FAILED")
    };
    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>{} <span class=\"badge {verdict_class}\">{verdict_text}</span></h1>\n",
        html_escape(&report.assessment.title)
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Module: <strong>{}</strong> | {} questions | started {} | completed {}</p>\n",
        html_escape(&report.assessment.module_id),
        report.assessment.question_count,
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Summary
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<tbody>\n");
    html.push_str(&format!(
        "<tr><th>Score</th><td>{} / {}</td></tr>\n",
        report.score, report.assessment.total_points
    ));
    html.push_str(&format!(
        "<tr><th>Percentage</th><td>{:.1}% (passing: {:.0}%)</td></tr>\n",
        report.percentage, report.assessment.passing_score
    ));
    html.push_str(&format!(
        "<tr><th>Completed by</th><td>{}</td></tr>\n",
        html_escape(&report.reason.to_string())
    ));
    html.push_str(&format!(
        "<tr><th>Integrity violations</th><td>{}</td></tr>\n",
        report.violations
    ));
    html.push_str("</tbody></table>\n");

    if !report.breakdown.is_empty() {
        html.push_str(&generate_bar_chart(&report.breakdown));
    }
    html.push_str("</section>\n");

    // Per-question breakdown
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Questions</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Question</th><th onclick=\"sortTable(1)\">Type</th><th onclick=\"sortTable(2)\">Rule</th><th onclick=\"sortTable(3)\">Points</th><th onclick=\"sortTable(4)\">Response</th></tr></thead>\n");
    html.push_str("<tbody>\n");

    for q in &report.breakdown {
        let row_class = if !q.answered {
            "unanswered"
        } else if q.awarded >= q.max {
            "pass"
        } else {
            "fail"
        };
        let response = report
            .responses
            .get(&q.question_id)
            .map(Response::summary)
            .unwrap_or_else(|| "-".to_string());

        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{:?}</td><td>{} / {}</td><td>{}</td></tr>\n",
            row_class,
            html_escape(&q.title),
            q.kind,
            q.rule,
            q.awarded,
            q.max,
            html_escape(&response)
        ));
    }

    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Coding runs
    let coding: Vec<_> = report
        .responses
        .iter()
        .filter_map(|(id, r)| r.as_coding().map(|c| (id, c)))
        .collect();
    if !coding.is_empty() {
        html.push_str("<section class=\"coding\">\n");
        html.push_str("<h2>Coding runs</h2>\n");
        for (id, result) in coding {
            html.push_str(&format!(
                "<details>\n<summary>{} ({}/{} tests passed)</summary>\n",
                html_escape(id),
                result.passed_count(),
                result.results.len()
            ));
            html.push_str("<pre><code>");
            html.push_str(&html_escape(&result.code));
            html.push_str("</code></pre>\n");
            if !result.results.is_empty() {
                html.push_str("<table>\n<thead><tr><th>#</th><th>Input</th><th>Expected</th><th>Actual</th><th>Error</th></tr></thead>\n<tbody>\n");
                for case in &result.results {
                    html.push_str(&format!(
                        "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                        if case.passed { "pass" } else { "fail" },
                        case.index + 1,
                        html_escape(&case.input),
                        html_escape(&case.expected),
                        html_escape(&case.actual),
                        html_escape(case.error.as_deref().unwrap_or(""))
                    ));
                }
                html.push_str("</tbody></table>\n");
            }
            html.push_str("</details>\n");
        }
        html.push_str("</section>\n");
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(
        &serde_json::to_string_pretty(report)
            .unwrap_or_default()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    );
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &AttemptReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn generate_bar_chart(breakdown: &[QuestionScore]) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 220;

    let total_height = breakdown.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 80,
        total_height
    );

    for (i, q) in breakdown.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let ratio = if q.max > 0.0 {
            (q.awarded / q.max).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let width = (ratio * max_width as f64) as usize;

        let color = if ratio >= 1.0 {
            "#22c55e"
        } else if ratio > 0.0 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"13\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&q.title)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{} / {}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            q.awarded,
            q.max
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --muted: #f3f4f6; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --muted: #1f2937; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.badge { font-size: 0.9rem; padding: 0.2rem 0.6rem; border-radius: 6px; vertical-align: middle; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.unanswered { background: var(--muted); color: #6b7280; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb) : vb.localeCompare(va);
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;

//! proctor-report — Rendering of finished attempt reports.

pub mod html;

pub use html::{generate_html, write_html_report};

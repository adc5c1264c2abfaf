//! The `proctor take` command.
//!
//! Hosts one engine session on the terminal. Each input line is a shell
//! command; see [`ShellCommand`] for the grammar.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Notify;

use proctor_core::config::load_config_from;
use proctor_core::engine::{self, EngineHandle, EngineView};
use proctor_core::integrity::{KeyDisposition, KeyEvent};
use proctor_core::model::Assessment;
use proctor_core::parser;
use proctor_core::presenter::{ResultAction, ResultView};
use proctor_core::report::AttemptReport;
use proctor_core::response::{CodingResult, ResponseMap};
use proctor_core::session::{CompletionReason, Outcome};
use proctor_core::traits::{Notice, SessionHooks};
use proctor_report::html::write_html_report;
use proctor_runner::LocalRunner;

/// One line of shell input.
#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    Next,
    Prev,
    /// 1-based question number.
    GoTo(usize),
    Answer(String),
    Run,
    Key(KeyEvent),
    Submit,
    Cancel,
    Retake,
    Close,
    Show,
    Status,
    Help,
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((line, ""));

        match word.to_lowercase().as_str() {
            "next" | "n" => Ok(ShellCommand::Next),
            "prev" | "previous" | "p" => Ok(ShellCommand::Prev),
            "goto" | "go" => rest
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .map(ShellCommand::GoTo)
                .ok_or_else(|| format!("goto needs a question number, got '{rest}'")),
            "answer" | "a" => Ok(ShellCommand::Answer(rest.to_string())),
            "run" => Ok(ShellCommand::Run),
            "key" => rest.parse().map(ShellCommand::Key),
            "submit" => Ok(ShellCommand::Submit),
            "cancel" => Ok(ShellCommand::Cancel),
            "retake" | "retry" => Ok(ShellCommand::Retake),
            "close" | "exit" => Ok(ShellCommand::Close),
            "show" => Ok(ShellCommand::Show),
            "status" => Ok(ShellCommand::Status),
            "help" | "?" => Ok(ShellCommand::Help),
            other => Err(format!("unknown command '{other}', try 'help'")),
        }
    }
}

const HELP: &str = "\
Commands:
  next | prev | goto N     move between questions
  answer <input>           record an answer for the current question
  run                      run the current coding question's tests
  key <combo>              send a key combination, e.g. ctrl+c
  show | status            redisplay the question or the session status
  submit                   finish and score the attempt
  cancel                   leave without submitting
  retake | close           result view actions";

/// Completion data delivered through the hooks.
#[derive(Default)]
struct Record {
    violations: u32,
    completion: Option<(Outcome, ResponseMap)>,
}

/// Hooks that print notices and keep the completion for the report.
#[derive(Default)]
struct ConsoleHooks {
    record: Mutex<Record>,
    completed: Notify,
}

impl ConsoleHooks {
    fn record(&self) -> MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take_completion(&self) -> Option<(Outcome, ResponseMap, u32)> {
        let mut record = self.record();
        let violations = record.violations;
        record
            .completion
            .take()
            .map(|(outcome, responses)| (outcome, responses, violations))
    }

    fn reset(&self) {
        *self.record() = Record::default();
    }
}

impl SessionHooks for ConsoleHooks {
    fn on_complete(&self, score: f64, responses: &ResponseMap) {
        let outcome = Outcome {
            score,
            reason: CompletionReason::Submitted,
        };
        self.record().completion = Some((outcome, responses.clone()));
        self.completed.notify_one();
    }

    fn on_cancel(&self) {
        eprintln!("Session closed.");
    }

    fn on_notice(&self, notice: &Notice) {
        let mut record = self.record();
        match notice {
            Notice::IntegrityWarning { action, violations } => {
                record.violations = *violations;
                eprintln!(
                    "WARNING: {action} is not allowed during the assessment ({violations} so far)"
                );
            }
            Notice::IntegrityTermination { violations } => {
                record.violations = *violations;
                if let Some((outcome, _)) = record.completion.as_mut() {
                    outcome.reason = CompletionReason::IntegrityViolation;
                }
                eprintln!(
                    "The assessment was terminated after {violations} integrity violations."
                );
            }
            Notice::TimeExpired => {
                if let Some((outcome, _)) = record.completion.as_mut() {
                    outcome.reason = CompletionReason::TimeExpired;
                }
                eprintln!("Time is up. Your answers were submitted.");
            }
        }
    }
}

/// Everything the shell needs between lines.
struct Shell {
    assessment: Arc<Assessment>,
    handle: EngineHandle,
    hooks: Arc<ConsoleHooks>,
    started_at: DateTime<Utc>,
    output: PathBuf,
    formats: Vec<String>,
}

impl Shell {
    async fn dispatch(&mut self, command: ShellCommand) -> Result<()> {
        match command {
            ShellCommand::Next => {
                self.handle.next().await;
                self.show().await;
            }
            ShellCommand::Prev => {
                self.handle.previous().await;
                self.show().await;
            }
            ShellCommand::GoTo(n) => {
                self.handle.go_to(n - 1).await;
                self.show().await;
            }
            ShellCommand::Answer(input) => match self.handle.edit(input).await {
                Ok(response) => println!("Saved: {}", response.summary()),
                Err(e) => println!("Not saved: {e}"),
            },
            ShellCommand::Run => match self.handle.run_code().await {
                Some(result) => print_run(&result),
                None => println!("The current question is not a coding question."),
            },
            ShellCommand::Key(event) => {
                if self.handle.key_event(event.clone()).await == KeyDisposition::Suppress {
                    println!("Blocked: {event}");
                }
            }
            ShellCommand::Submit => self.handle.submit().await,
            ShellCommand::Cancel => self.handle.cancel().await,
            ShellCommand::Retake => {
                self.hooks.reset();
                self.handle.result_action(ResultAction::Retake).await;
                if self
                    .handle
                    .snapshot()
                    .await
                    .is_some_and(|s| s.is_in_progress())
                {
                    self.started_at = Utc::now();
                    self.show().await;
                }
            }
            ShellCommand::Close => self.handle.result_action(ResultAction::Close).await,
            ShellCommand::Show => self.show().await,
            ShellCommand::Status => self.status().await,
            ShellCommand::Help => println!("{HELP}"),
        }
        Ok(())
    }

    async fn show(&self) {
        match self.handle.view().await {
            Some(EngineView::Question {
                question,
                remaining_secs,
                violations,
            }) => {
                println!("{question}");
                println!(
                    "Time left: {}  Violations: {violations}",
                    format_clock(remaining_secs)
                );
            }
            Some(EngineView::Result(result)) => print_result(&result),
            Some(EngineView::Empty { title }) => {
                println!("{title} has no questions. Type 'submit' to finish.")
            }
            None => {}
        }
    }

    async fn status(&self) {
        let Some(state) = self.handle.snapshot().await else {
            return;
        };
        let answered = state.responses.values().filter(|r| r.is_present()).count();
        println!(
            "Question {}/{} | answered {answered} | time left {} | violations {} | {}",
            state.current_index + 1,
            self.assessment.questions.len(),
            format_clock(state.remaining_secs),
            state.violation_count,
            if state.is_in_progress() {
                "in progress"
            } else {
                "completed"
            }
        );
    }

    /// Write reports for a completion the hooks delivered, if any.
    async fn flush_completion(&self) -> Result<()> {
        let Some((outcome, responses, violations)) = self.hooks.take_completion() else {
            return Ok(());
        };

        let report = AttemptReport::new(
            &self.assessment,
            self.handle.session_id(),
            self.started_at,
            outcome,
            violations,
            responses,
        );
        if self.handle.is_closed() {
            // Forced termination closes the engine before a result view exists.
            println!(
                "{} [{}]\nScore: {} / {} ({:.1}%)\nCompleted: {}",
                report.assessment.title,
                if report.passed { "PASSED" } else { "FAILED" },
                report.score,
                report.assessment.total_points,
                report.percentage,
                report.reason
            );
        } else {
            self.show().await;
        }
        save_report(&report, &self.output, &self.formats)
    }
}

pub async fn execute(
    assessment_path: PathBuf,
    script: Option<PathBuf>,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    format: String,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let assessment = Arc::new(parser::parse_assessment(&assessment_path)?);
    for w in parser::validate_assessment(&assessment) {
        tracing::warn!(question = ?w.question_id, "{}", w.message);
    }

    let formats: Vec<String> = match format.as_str() {
        "all" => vec!["json".into(), "html".into()],
        "none" => Vec::new(),
        other => other.split(',').map(|f| f.trim().to_string()).collect(),
    };
    let output = output.unwrap_or_else(|| config.output_dir.clone());

    let input: Box<dyn AsyncRead + Unpin + Send> = match &script {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open script: {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(input).lines();

    let hooks = Arc::new(ConsoleHooks::default());
    let runner = Arc::new(LocalRunner::new(config.runner.clone()));
    let handle = engine::spawn(Arc::clone(&assessment), &config, runner, hooks.clone());

    println!(
        "proctor v{}: {} ({} questions, passing score {}%)",
        env!("CARGO_PKG_VERSION"),
        assessment.title,
        assessment.questions.len(),
        assessment.passing_score
    );
    if script.is_none() {
        println!("Type 'help' for commands.");
    }

    let mut shell = Shell {
        assessment,
        handle,
        hooks,
        started_at: Utc::now(),
        output,
        formats,
    };
    shell.show().await;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                match line.parse::<ShellCommand>() {
                    Ok(command) => shell.dispatch(command).await?,
                    Err(e) => println!("{e}"),
                }
            }
            _ = shell.hooks.completed.notified() => {}
            _ = shell.handle.closed() => {}
        }

        // Every command sent so far has been applied once this returns.
        let _ = shell.handle.snapshot().await;
        shell.flush_completion().await?;
        if shell.handle.is_closed() {
            break;
        }
    }

    if !shell.handle.is_closed() {
        let in_progress = shell
            .handle
            .snapshot()
            .await
            .is_some_and(|s| s.is_in_progress());
        if in_progress {
            println!("Input ended before the attempt was submitted; nothing was recorded.");
        }
    }
    Ok(())
}

fn save_report(report: &AttemptReport, output: &Path, formats: &[String]) -> Result<()> {
    if formats.is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(output)?;
    let stem = report.file_stem();

    for fmt in formats {
        match fmt.as_str() {
            "json" => {
                let path = output.join(format!("{stem}.json"));
                report.save_json(&path)?;
                eprintln!("Attempt saved to: {}", path.display());
            }
            "html" => {
                let path = output.join(format!("{stem}.html"));
                write_html_report(report, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            _ => {
                eprintln!("Unknown format: {fmt}");
            }
        }
    }
    Ok(())
}

fn print_result(result: &ResultView) {
    println!("{result}");
}

fn print_run(result: &CodingResult) {
    for case in &result.results {
        let status = if case.passed { "PASS" } else { "FAIL" };
        println!(
            "  test {}: {status} ({}ms)",
            case.index + 1,
            case.duration_ms
        );
        if !case.passed {
            println!("    expected: {}", case.expected.trim());
            println!("    actual:   {}", case.actual.trim());
            if let Some(error) = &case.error {
                println!("    error:    {error}");
            }
        }
    }
    println!(
        "{}/{} tests passed{}",
        result.passed_count(),
        result.results.len(),
        if result.passed { "" } else { "; keep going" }
    );
}

fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

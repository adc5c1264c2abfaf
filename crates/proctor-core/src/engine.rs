//! Session controller.
//!
//! Each attempt runs as one task that owns the [`SessionState`], the
//! [`Countdown`] and the [`IntegrityMonitor`]. The host talks to it through
//! an [`EngineHandle`]; commands, countdown ticks and finished coding runs
//! are all funnelled into the same loop, so they are applied one at a time
//! in arrival order and no locking is needed.
//!
//! The loop ends on cancel, on close, after a forced integrity termination,
//! or when every handle is dropped. The timer, the monitor and any coding
//! run still in flight are released on all of those paths.
//!
//! A coding run only records its result if it finishes inside the attempt
//! that started it and the code buffer still holds the code that was run.
//! Stopping the timer aborts every run in flight.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{ProctorConfig, RunnerConfig, SessionConfig};
use crate::error::EditError;
use crate::integrity::{IntegrityMonitor, KeyDisposition, KeyEvent};
use crate::model::{Assessment, QuestionBody};
use crate::presenter::{ResultAction, ResultView};
use crate::render::coding::{current_code, run_test_cases};
use crate::render::{apply_edit, QuestionView};
use crate::response::{CodingResult, Response};
use crate::session::{Action, Effect, SessionState};
use crate::timer::{Countdown, Tick};
use crate::traits::{CodeExecutor, SessionHooks};

const COMMAND_BUFFER: usize = 64;

/// What the learner should currently see.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum EngineView {
    Question {
        question: QuestionView,
        remaining_secs: u64,
        violations: u32,
    },
    Result(ResultView),
    /// An assessment without questions, still in progress.
    Empty { title: String },
}

enum Command {
    SetResponse {
        question_id: String,
        response: Response,
    },
    Edit {
        input: String,
        reply: oneshot::Sender<Result<Response, EditError>>,
    },
    Act(Action),
    Key {
        event: KeyEvent,
        reply: oneshot::Sender<KeyDisposition>,
    },
    RunCode {
        reply: oneshot::Sender<Option<CodingResult>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionState>,
    },
    View {
        reply: oneshot::Sender<EngineView>,
    },
}

/// Messages from tasks the engine spawned itself.
enum Internal {
    CodeFinished {
        /// Timer generation of the attempt that started the run.
        generation: u64,
        question_id: String,
        result: CodingResult,
        reply: oneshot::Sender<Option<CodingResult>>,
    },
}

/// Start an attempt at `assessment` and return a handle to drive it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn(
    assessment: Arc<Assessment>,
    config: &ProctorConfig,
    executor: Arc<dyn CodeExecutor>,
    hooks: Arc<dyn SessionHooks>,
) -> EngineHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (tick_tx, tick_rx) = mpsc::channel(COMMAND_BUFFER);
    let (internal_tx, internal_rx) = mpsc::channel(COMMAND_BUFFER);
    let session_id = Uuid::new_v4();

    let (state, effects) = SessionState::start(&assessment, &config.session);
    tracing::info!(
        %session_id,
        assessment = %assessment.id,
        questions = assessment.questions.len(),
        remaining_secs = state.remaining_secs,
        "assessment session started"
    );

    let mut engine = Engine {
        session_id,
        assessment,
        session_config: config.session.clone(),
        runner_config: config.runner.clone(),
        state,
        executor,
        hooks,
        countdown: None,
        monitor: None,
        generation: 0,
        tick_tx,
        internal_tx,
        runs: Vec::new(),
    };
    // Starting only arms resources; it cannot end the session.
    let _ = engine.apply(effects);

    tokio::spawn(engine.run(command_rx, tick_rx, internal_rx));

    EngineHandle {
        tx: command_tx,
        session_id,
    }
}

/// Cloneable handle to a running attempt.
///
/// Operations on a closed engine are silently ignored; queries return
/// `None`.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
    session_id: Uuid,
}

impl EngineHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Whether the engine has shut down.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait until the engine has shut down.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Record a typed response for any question.
    pub async fn set_response(&self, question_id: impl Into<String>, response: Response) {
        self.send(Command::SetResponse {
            question_id: question_id.into(),
            response,
        })
        .await;
    }

    /// Parse learner input for the current question and record it.
    pub async fn edit(&self, input: impl Into<String>) -> Result<Response, EditError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Edit {
            input: input.into(),
            reply,
        })
        .await;
        rx.await.unwrap_or(Err(EditError::Closed))
    }

    pub async fn next(&self) {
        self.send(Command::Act(Action::Next)).await;
    }

    pub async fn previous(&self) {
        self.send(Command::Act(Action::Previous)).await;
    }

    pub async fn go_to(&self, index: usize) {
        self.send(Command::Act(Action::GoTo(index))).await;
    }

    pub async fn submit(&self) {
        self.send(Command::Act(Action::Submit)).await;
    }

    pub async fn cancel(&self) {
        self.send(Command::Act(Action::Cancel)).await;
    }

    pub async fn retake(&self) {
        self.send(Command::Act(Action::Retake)).await;
    }

    /// Invoke one of the result view's actions.
    pub async fn result_action(&self, action: ResultAction) {
        let action = match action {
            ResultAction::Retake => Action::Retake,
            ResultAction::Close => Action::Close,
        };
        self.send(Command::Act(action)).await;
    }

    /// Pass a key event through the integrity monitor.
    pub async fn key_event(&self, event: KeyEvent) -> KeyDisposition {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Key { event, reply }).await;
        rx.await.unwrap_or(KeyDisposition::Pass)
    }

    /// Run the current coding question's buffer against its test cases.
    ///
    /// Returns `None` when the current question is not a coding question,
    /// the attempt is not in progress, or the attempt ended before the run
    /// finished.
    pub async fn run_code(&self) -> Option<CodingResult> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::RunCode { reply }).await;
        rx.await.ok().flatten()
    }

    pub async fn snapshot(&self) -> Option<SessionState> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await;
        rx.await.ok()
    }

    pub async fn view(&self) -> Option<EngineView> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::View { reply }).await;
        rx.await.ok()
    }

    async fn send(&self, command: Command) {
        if self.tx.send(command).await.is_err() {
            tracing::debug!(session_id = %self.session_id, "engine closed, command dropped");
        }
    }
}

struct Engine {
    session_id: Uuid,
    assessment: Arc<Assessment>,
    session_config: SessionConfig,
    runner_config: RunnerConfig,
    state: SessionState,
    executor: Arc<dyn CodeExecutor>,
    hooks: Arc<dyn SessionHooks>,
    countdown: Option<Countdown>,
    monitor: Option<IntegrityMonitor>,
    /// Bumped each time the timer is armed.
    generation: u64,
    tick_tx: mpsc::Sender<Tick>,
    internal_tx: mpsc::Sender<Internal>,
    runs: Vec<JoinHandle<()>>,
}

impl Engine {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut ticks: mpsc::Receiver<Tick>,
        mut internal: mpsc::Receiver<Internal>,
    ) {
        loop {
            let flow = tokio::select! {
                Some(tick) = ticks.recv() => self.on_tick(tick),
                Some(message) = internal.recv() => self.on_internal(message),
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => {
                        tracing::debug!(session_id = %self.session_id, "all handles dropped");
                        ControlFlow::Break(())
                    }
                },
            };
            if flow.is_break() {
                break;
            }
        }
        self.release();
    }

    fn on_tick(&mut self, tick: Tick) -> ControlFlow<()> {
        let current = self.countdown.as_ref().map(Countdown::generation);
        if current != Some(tick.generation) {
            tracing::trace!(generation = tick.generation, "stale tick ignored");
            return ControlFlow::Continue(());
        }
        self.reduce(Action::Tick)
    }

    fn on_internal(&mut self, message: Internal) -> ControlFlow<()> {
        match message {
            Internal::CodeFinished {
                generation,
                question_id,
                result,
                reply,
            } => {
                self.runs.retain(|h| !h.is_finished());
                if generation != self.generation || !self.state.is_in_progress() {
                    tracing::debug!(
                        session_id = %self.session_id,
                        %question_id,
                        generation,
                        "coding run outlived its attempt, discarded"
                    );
                    let _ = reply.send(None);
                    return ControlFlow::Continue(());
                }
                if !self.buffer_holds(&question_id, &result.code) {
                    tracing::debug!(
                        session_id = %self.session_id,
                        %question_id,
                        "code edited while running, result not recorded"
                    );
                    let _ = reply.send(Some(result));
                    return ControlFlow::Continue(());
                }
                let flow = self.reduce(Action::SetResponse {
                    question_id,
                    response: Response::Coding(result.clone()),
                });
                let _ = reply.send(Some(result));
                flow
            }
        }
    }

    fn on_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::SetResponse {
                question_id,
                response,
            } => {
                if self.assessment.question(&question_id).is_none() {
                    tracing::warn!(%question_id, "response for unknown question recorded");
                }
                self.reduce(Action::SetResponse {
                    question_id,
                    response,
                })
            }
            Command::Edit { input, reply } => {
                let (result, flow) = self.edit_current(&input);
                let _ = reply.send(result);
                flow
            }
            Command::Act(action) => self.reduce(action),
            Command::Key { event, reply } => {
                let detected = self.monitor.as_mut().and_then(|m| m.inspect(&event));
                match detected {
                    Some(action) => {
                        let _ = reply.send(KeyDisposition::Suppress);
                        self.reduce(Action::Violation(action))
                    }
                    None => {
                        let _ = reply.send(KeyDisposition::Pass);
                        ControlFlow::Continue(())
                    }
                }
            }
            Command::RunCode { reply } => {
                self.start_code_run(reply);
                ControlFlow::Continue(())
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.state.clone());
                ControlFlow::Continue(())
            }
            Command::View { reply } => {
                let _ = reply.send(self.view());
                ControlFlow::Continue(())
            }
        }
    }

    fn edit_current(&mut self, input: &str) -> (Result<Response, EditError>, ControlFlow<()>) {
        if !self.state.is_in_progress() {
            return (Err(EditError::Closed), ControlFlow::Continue(()));
        }
        let assessment = Arc::clone(&self.assessment);
        let Some(question) = assessment.questions.get(self.state.current_index) else {
            return (
                Err(EditError::UnknownQuestion(self.state.current_index.to_string())),
                ControlFlow::Continue(()),
            );
        };
        let current = self.state.responses.get(&question.id);
        match apply_edit(question, current, input) {
            Ok(response) => {
                let flow = self.reduce(Action::SetResponse {
                    question_id: question.id.clone(),
                    response: response.clone(),
                });
                (Ok(response), flow)
            }
            Err(e) => (Err(e), ControlFlow::Continue(())),
        }
    }

    /// Whether the recorded buffer for `question_id` is exactly `code`.
    fn buffer_holds(&self, question_id: &str, code: &str) -> bool {
        match self.assessment.question(question_id).map(|q| &q.body) {
            Some(QuestionBody::Coding(problem)) => {
                current_code(problem, self.state.responses.get(question_id)) == code
            }
            _ => false,
        }
    }

    fn start_code_run(&mut self, reply: oneshot::Sender<Option<CodingResult>>) {
        let index = self.state.current_index;
        let question = self.assessment.questions.get(index);
        let Some((question_id, code)) = question.and_then(|q| match &q.body {
            QuestionBody::Coding(problem) if self.state.is_in_progress() => Some((
                q.id.clone(),
                current_code(problem, self.state.responses.get(&q.id)).to_string(),
            )),
            _ => None,
        }) else {
            let _ = reply.send(None);
            return;
        };

        tracing::info!(session_id = %self.session_id, %question_id, "running coding question");
        let assessment = Arc::clone(&self.assessment);
        let executor = Arc::clone(&self.executor);
        let runner_config = self.runner_config.clone();
        let internal = self.internal_tx.clone();
        let generation = self.generation;

        let handle = tokio::spawn(async move {
            let Some(QuestionBody::Coding(problem)) = assessment.questions.get(index).map(|q| &q.body)
            else {
                return;
            };
            let result = run_test_cases(executor.as_ref(), problem, &code, &runner_config).await;
            let _ = internal
                .send(Internal::CodeFinished {
                    generation,
                    question_id,
                    result,
                    reply,
                })
                .await;
        });
        self.runs.push(handle);
    }

    fn view(&self) -> EngineView {
        if let Some(result) = ResultView::build(&self.assessment, &self.state) {
            return EngineView::Result(result);
        }
        let index = self.state.current_index;
        let response = self
            .assessment
            .questions
            .get(index)
            .and_then(|q| self.state.responses.get(&q.id));
        match QuestionView::build(&self.assessment, index, response) {
            Some(question) => EngineView::Question {
                question,
                remaining_secs: self.state.remaining_secs,
                violations: self.state.violation_count,
            },
            None => EngineView::Empty {
                title: self.assessment.title.clone(),
            },
        }
    }

    fn reduce(&mut self, action: Action) -> ControlFlow<()> {
        let effects = self
            .state
            .reduce(&self.assessment, &self.session_config, action);
        self.apply(effects)
    }

    fn apply(&mut self, effects: Vec<Effect>) -> ControlFlow<()> {
        let mut flow = ControlFlow::Continue(());
        for effect in effects {
            match effect {
                Effect::ArmTimer => {
                    self.generation += 1;
                    self.countdown = Some(Countdown::start(
                        self.generation,
                        self.session_config.tick_interval(),
                        self.tick_tx.clone(),
                    ));
                }
                Effect::StopTimer => {
                    if let Some(mut countdown) = self.countdown.take() {
                        countdown.stop();
                    }
                    self.abort_runs();
                }
                Effect::AttachMonitor => {
                    self.monitor = Some(IntegrityMonitor::attach(self.generation));
                }
                Effect::DetachMonitor => {
                    self.monitor = None;
                }
                Effect::Notify(notice) => {
                    tracing::debug!(session_id = %self.session_id, ?notice, "notice");
                    self.hooks.on_notice(&notice);
                }
                Effect::Complete {
                    score,
                    responses,
                    reason,
                } => {
                    tracing::info!(
                        session_id = %self.session_id,
                        score,
                        %reason,
                        answered = responses.len(),
                        "assessment session completed"
                    );
                    self.hooks.on_complete(score, &responses);
                }
                Effect::Cancel => {
                    tracing::info!(session_id = %self.session_id, "assessment session cancelled");
                    self.hooks.on_cancel();
                    flow = ControlFlow::Break(());
                }
            }
        }
        flow
    }

    fn release(&mut self) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.stop();
        }
        self.monitor = None;
        self.abort_runs();
        tracing::debug!(session_id = %self.session_id, "session resources released");
    }

    /// Abort coding runs in flight. Their callers see `None`.
    fn abort_runs(&mut self) {
        for run in self.runs.drain(..) {
            if !run.is_finished() {
                tracing::debug!(session_id = %self.session_id, "coding run aborted");
            }
            run.abort();
        }
    }
}

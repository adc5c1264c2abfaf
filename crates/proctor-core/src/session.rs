//! Session state and its reducer.
//!
//! [`SessionState`] is the single source of truth for one attempt. Every
//! transition goes through [`SessionState::reduce`], which mutates the state
//! and returns the [`Effect`]s the controller must carry out (arming the
//! timer, notifying the host, ...). Nothing here touches a clock or a
//! channel, so the state machine is testable on its own.
//!
//! ```text
//! InProgress --submit | expiry | integrity threshold--> Completed
//! Completed  --retake-->                                InProgress
//! ```

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::integrity::ProhibitedAction;
use crate::model::Assessment;
use crate::response::{Response, ResponseMap};
use crate::scorer;
use crate::traits::Notice;

/// Lifecycle phase of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InProgress,
    /// Terminal until an explicit retake.
    Completed,
}

/// Why an attempt reached `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Submitted,
    TimeExpired,
    IntegrityViolation,
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionReason::Submitted => write!(f, "submitted"),
            CompletionReason::TimeExpired => write!(f, "time expired"),
            CompletionReason::IntegrityViolation => write!(f, "integrity violation"),
        }
    }
}

/// Score frozen at the moment of completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub score: f64,
    pub reason: CompletionReason,
}

/// Mutable state of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_index: usize,
    pub responses: ResponseMap,
    pub remaining_secs: u64,
    pub violation_count: u32,
    pub phase: Phase,
    /// Set exactly when `phase` is `Completed`.
    pub outcome: Option<Outcome>,
}

/// An input to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetResponse {
        question_id: String,
        response: Response,
    },
    Next,
    Previous,
    GoTo(usize),
    /// One countdown period elapsed.
    Tick,
    /// The integrity monitor detected and suppressed a prohibited action.
    Violation(ProhibitedAction),
    Submit,
    /// Leave the attempt while it is in progress.
    Cancel,
    /// Leave the result view of a completed attempt.
    Close,
    Retake,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ArmTimer,
    StopTimer,
    AttachMonitor,
    DetachMonitor,
    Notify(Notice),
    /// Invoke the host completion callback with frozen responses.
    Complete {
        score: f64,
        responses: ResponseMap,
        reason: CompletionReason,
    },
    /// Invoke the host cancellation callback. The engine shuts down after.
    Cancel,
}

impl SessionState {
    /// Fresh state for an attempt, as produced by `start` and `retake`.
    pub fn initial(assessment: &Assessment, config: &SessionConfig) -> Self {
        Self {
            current_index: 0,
            responses: ResponseMap::new(),
            remaining_secs: assessment
                .time_limit_secs
                .unwrap_or(config.default_time_limit_secs),
            violation_count: 0,
            phase: Phase::InProgress,
            outcome: None,
        }
    }

    /// Start an attempt. Arms the timer and attaches the monitor.
    pub fn start(assessment: &Assessment, config: &SessionConfig) -> (Self, Vec<Effect>) {
        (
            Self::initial(assessment, config),
            vec![Effect::ArmTimer, Effect::AttachMonitor],
        )
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == Phase::InProgress
    }

    /// Apply one action and return the effects to perform.
    pub fn reduce(
        &mut self,
        assessment: &Assessment,
        config: &SessionConfig,
        action: Action,
    ) -> Vec<Effect> {
        match action {
            Action::SetResponse {
                question_id,
                response,
            } => {
                // Responses are frozen once the attempt completes.
                if self.is_in_progress() {
                    self.responses.insert(question_id, response);
                }
                Vec::new()
            }
            Action::Next => {
                if self.is_in_progress() {
                    self.current_index = (self.current_index + 1).min(assessment.last_index());
                }
                Vec::new()
            }
            Action::Previous => {
                if self.is_in_progress() {
                    self.current_index = self.current_index.saturating_sub(1);
                }
                Vec::new()
            }
            Action::GoTo(index) => {
                if self.is_in_progress() {
                    self.current_index = index.min(assessment.last_index());
                }
                Vec::new()
            }
            Action::Tick => {
                if !self.is_in_progress() {
                    return Vec::new();
                }
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs > 0 {
                    return Vec::new();
                }
                let mut effects = self.complete(assessment, CompletionReason::TimeExpired);
                effects.push(Effect::Notify(Notice::TimeExpired));
                effects
            }
            Action::Violation(action) => {
                if !self.is_in_progress() {
                    return Vec::new();
                }
                // The threshold check reads the count from before this
                // violation is added, so termination lands one event late.
                let threshold_reached = self.violation_count >= config.violation_threshold;
                self.violation_count += 1;

                if threshold_reached {
                    let mut effects =
                        self.complete(assessment, CompletionReason::IntegrityViolation);
                    effects.push(Effect::Notify(Notice::IntegrityTermination {
                        violations: self.violation_count,
                    }));
                    effects.push(Effect::Cancel);
                    effects
                } else {
                    vec![Effect::Notify(Notice::IntegrityWarning {
                        action,
                        violations: self.violation_count,
                    })]
                }
            }
            Action::Submit => {
                if !self.is_in_progress() {
                    return Vec::new();
                }
                self.complete(assessment, CompletionReason::Submitted)
            }
            Action::Cancel => {
                if self.is_in_progress() {
                    vec![Effect::StopTimer, Effect::DetachMonitor, Effect::Cancel]
                } else {
                    vec![Effect::Cancel]
                }
            }
            Action::Close => {
                if self.is_in_progress() {
                    Vec::new()
                } else {
                    vec![Effect::Cancel]
                }
            }
            Action::Retake => {
                if self.is_in_progress() {
                    return Vec::new();
                }
                *self = Self::initial(assessment, config);
                vec![Effect::ArmTimer, Effect::AttachMonitor]
            }
        }
    }

    fn complete(&mut self, assessment: &Assessment, reason: CompletionReason) -> Vec<Effect> {
        let score = scorer::score(
            &assessment.questions,
            &self.responses,
            assessment.total_points,
        );
        self.phase = Phase::Completed;
        self.outcome = Some(Outcome { score, reason });

        vec![
            Effect::StopTimer,
            Effect::DetachMonitor,
            Effect::Complete {
                score,
                responses: self.responses.clone(),
                reason,
            },
        ]
    }
}

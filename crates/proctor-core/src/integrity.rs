//! Integrity monitor: detects copy, cut and select-all key combinations.
//!
//! The monitor is a scoped subscription. The engine attaches one when the
//! session enters `InProgress` and drops it on every exit path; while no
//! monitor is attached, key events pass through uninspected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Modifier keys held during a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    /// Command on macOS, Windows key elsewhere.
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

/// A single key-combination event from the learner's input device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    pub fn ctrl(key: impl Into<String>) -> Self {
        Self::new(
            key,
            Modifiers {
                ctrl: true,
                ..Default::default()
            },
        )
    }

    pub fn plain(key: impl Into<String>) -> Self {
        Self::new(key, Modifiers::default())
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (held, name) in [(m.ctrl, "ctrl"), (m.meta, "meta"), (m.alt, "alt"), (m.shift, "shift")] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(&self.key)
    }
}

/// Parses combos like `ctrl+c`, `Cmd+Shift+X` or `a`.
impl FromStr for KeyEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key, mods)) = parts.split_last() else {
            return Err("empty key combination".into());
        };
        if key.is_empty() {
            return Err(format!("missing key in '{s}'"));
        }

        let mut modifiers = Modifiers::default();
        for m in mods {
            match m.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "meta" | "cmd" | "command" | "super" | "win" => modifiers.meta = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                other => return Err(format!("unknown modifier: {other}")),
            }
        }

        Ok(KeyEvent::new(*key, modifiers))
    }
}

/// What happens to a key event after inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Let the event take its normal effect.
    Pass,
    /// Swallow the event.
    Suppress,
}

/// A prohibited clipboard or selection action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProhibitedAction {
    Copy,
    Cut,
    SelectAll,
}

impl fmt::Display for ProhibitedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProhibitedAction::Copy => write!(f, "copy"),
            ProhibitedAction::Cut => write!(f, "cut"),
            ProhibitedAction::SelectAll => write!(f, "select all"),
        }
    }
}

/// Classify a key event. Either ctrl or meta counts as the modifier.
pub fn classify(event: &KeyEvent) -> Option<ProhibitedAction> {
    if !(event.modifiers.ctrl || event.modifiers.meta) {
        return None;
    }
    match event.key.to_lowercase().as_str() {
        "c" => Some(ProhibitedAction::Copy),
        "x" => Some(ProhibitedAction::Cut),
        "a" => Some(ProhibitedAction::SelectAll),
        _ => None,
    }
}

/// An attached listener for one `InProgress` stretch of a session.
#[derive(Debug)]
pub struct IntegrityMonitor {
    generation: u64,
    inspected: u64,
    detected: u64,
}

impl IntegrityMonitor {
    pub fn attach(generation: u64) -> Self {
        tracing::debug!(generation, "integrity monitor attached");
        Self {
            generation,
            inspected: 0,
            detected: 0,
        }
    }

    /// Inspect one event. A `Some` result must be suppressed and counted as
    /// a violation by the caller.
    pub fn inspect(&mut self, event: &KeyEvent) -> Option<ProhibitedAction> {
        self.inspected += 1;
        let action = classify(event);
        if let Some(action) = action {
            self.detected += 1;
            tracing::warn!(
                generation = self.generation,
                key = %event,
                %action,
                "prohibited key combination"
            );
        }
        action
    }

    pub fn detected(&self) -> u64 {
        self.detected
    }
}

impl Drop for IntegrityMonitor {
    fn drop(&mut self) {
        tracing::debug!(
            generation = self.generation,
            inspected = self.inspected,
            detected = self.detected,
            "integrity monitor detached"
        );
    }
}

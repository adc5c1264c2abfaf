//! proctor-core — Timed assessment engine.
//!
//! This crate defines the assessment data model, the per-variant scoring
//! rules, the session state machine, and the controller that wires the
//! countdown timer and integrity monitor around a single learner attempt.

pub mod config;
pub mod engine;
pub mod error;
pub mod integrity;
pub mod model;
pub mod parser;
pub mod presenter;
pub mod render;
pub mod report;
pub mod response;
pub mod scorer;
pub mod session;
pub mod timer;
pub mod traits;

//! Structured session logging.
//!
//! Every event carries the session id so that a capture session can be
//! followed through the log.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Session logger for structured lifecycle events.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    operation: String,
}

impl SessionLogger {
    /// # Arguments
    /// * `session_id` - The capture session
    /// * `operation` - What the session is doing (e.g. "live_capture", "replay")
    pub fn new(session_id: &Uuid, operation: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session started: {}", message
        );
    }

    /// Log a newly published reference.
    pub fn log_reference(&self, shot_type: &str, has_subject: bool) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            shot_type = %shot_type,
            has_subject,
            "Reference registered"
        );
    }

    /// Log the perfect lock engaging.
    pub fn log_perfect(&self, streak: u32, score: f64) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            streak,
            score,
            "Composition locked"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session completed: {}", message
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span for attaching per-frame work to the session.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            operation = %self.operation
        )
    }
}

//! Navigation error taxonomy.
//!
//! Every failure a single interaction can hit maps onto one [`NavError`]
//! variant. Each variant has a stable [`kind`](NavError::kind) string used as
//! a metric label and log field, and a user-facing message chosen by the
//! error views. None of these errors stop the process.

use thiserror::Error;

use super::types::Behavior;

/// Failures scoped to a single interaction.
///
/// Nothing here is fatal to the process. `SessionExpired` is a normal,
/// user-facing condition rather than a bug.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("malformed navigation token: {reason}")]
    MalformedToken { reason: String },
    #[error("token behavior `{actual}` does not match expected `{expected}`")]
    BehaviorMismatch {
        expected: Behavior,
        actual: Behavior,
    },
    #[error("navigation session expired")]
    SessionExpired,
    #[error("upstream fetch failed: {message}")]
    UpstreamFetchFailed { message: String },
    #[error("unknown command `{command}`")]
    UnknownCommand { command: String },
    #[error("render failed: {message}")]
    Render { message: String },
    #[error("transport delivery failed: {message}")]
    Transport { message: String },
}

impl NavError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamFetchFailed {
            message: message.into(),
        }
    }

    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Stable machine-readable name used for metrics labels and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            NavError::MalformedToken { .. } => "malformed_token",
            NavError::BehaviorMismatch { .. } => "behavior_mismatch",
            NavError::SessionExpired => "session_expired",
            NavError::UpstreamFetchFailed { .. } => "upstream_fetch_failed",
            NavError::UnknownCommand { .. } => "unknown_command",
            NavError::Render { .. } => "render",
            NavError::Transport { .. } => "transport",
        }
    }
}

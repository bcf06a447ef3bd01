//! Flow outcomes and process-level errors.
//!
//! [`FlowError`] pairs a [`NavError`] with the reply slot still open for it.
//! [`AppError`] is what `main` reports before exiting.

use thiserror::Error;

use crate::domain::error::NavError;
use crate::infra::error::InfraError;

/// Which reply slot is still open for an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyChannel {
    /// Nothing acknowledged yet; the error is the initial response.
    Immediate,
    /// A deferred acknowledgment went out; the error replaces its content.
    DeferredEdit,
}

impl ReplyChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyChannel::Immediate => "immediate",
            ReplyChannel::DeferredEdit => "deferred_edit",
        }
    }
}

/// A navigation failure tagged with the channel it must be reported on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{error}")]
pub struct FlowError {
    pub error: NavError,
    pub channel: ReplyChannel,
}

impl FlowError {
    pub fn immediate(error: NavError) -> Self {
        Self {
            error,
            channel: ReplyChannel::Immediate,
        }
    }

    pub fn deferred(error: NavError) -> Self {
        Self {
            error,
            channel: ReplyChannel::DeferredEdit,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

/// How a successful flow delivered its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Immediate,
    Deferred,
}

/// Process-level failure surfaced by the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Navigation(#[from] NavError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

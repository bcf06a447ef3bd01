//! User-facing error replies.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::application::error::{FlowError, ReplyChannel};
use crate::application::transport::{ErrorReporter, InteractionContext, Transport};
use crate::application::views::View;
use crate::domain::error::NavError;

const SOURCE: &str = "application::reporting";

/// Reports failures back to the user through the transport.
pub struct TransportReporter {
    transport: Arc<dyn Transport>,
}

impl TransportReporter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ErrorReporter for TransportReporter {
    async fn report(&self, ctx: &InteractionContext, error: &FlowError) {
        match &error.error {
            NavError::SessionExpired | NavError::UnknownCommand { .. } => debug!(
                target: SOURCE,
                interaction = %ctx.id,
                kind = error.kind(),
                "Interaction ended without a result"
            ),
            other => warn!(
                target: SOURCE,
                interaction = %ctx.id,
                kind = error.kind(),
                channel = error.channel.as_str(),
                error = %other,
                "Interaction failed"
            ),
        }

        let view = error_view(&error.error);
        let delivered = match error.channel {
            ReplyChannel::Immediate => self.transport.acknowledge_immediate(ctx, view).await,
            ReplyChannel::DeferredEdit => self.transport.edit_with_result(ctx, view).await,
        };
        if let Err(err) = delivered {
            warn!(
                target: SOURCE,
                interaction = %ctx.id,
                error = %err,
                "Failed to deliver error reply"
            );
        }
    }
}

/// The message shown to the user for each failure kind.
pub fn error_view(error: &NavError) -> View {
    let text = match error {
        NavError::MalformedToken { .. } => {
            "This component could not be read. Please run the command again."
        }
        NavError::BehaviorMismatch { .. } => "This component does not support that action.",
        NavError::SessionExpired => "These results have expired. Please search again.",
        NavError::UpstreamFetchFailed { .. } => {
            "The data source did not answer. Please try again later."
        }
        NavError::UnknownCommand { .. } => "This command is not available.",
        NavError::Render { .. } | NavError::Transport { .. } => {
            "The result could not be displayed. Please try again."
        }
    };
    View::notice("Something went wrong", text)
}

//! Replies for components minted in the legacy token form.
//!
//! The commands behind these components moved to the user-profile service,
//! so a press only tells the user to run the command again.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::application::dispatcher::LegacyHandler;
use crate::application::error::{Delivery, FlowError};
use crate::application::transport::{InteractionContext, Transport};
use crate::application::views::View;
use crate::domain::token::LegacyToken;

const SOURCE: &str = "application::features::retired";

/// First fields of legacy tokens still found on old messages: add to played,
/// add to wishlist, profile, remove from played, remove from wishlist.
pub const LEGACY_COMMANDS: [&str; 5] = ["加已玩", "加收藏", "個人資料", "刪除已玩", "刪除收藏"];

pub struct RetiredComponent {
    transport: Arc<dyn Transport>,
}

impl RetiredComponent {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl LegacyHandler for RetiredComponent {
    async fn handle(
        &self,
        ctx: &InteractionContext,
        token: LegacyToken,
    ) -> Result<Delivery, FlowError> {
        info!(
            target: SOURCE,
            command = %token.command,
            fields = token.values.len(),
            "Legacy component pressed"
        );
        self.transport
            .acknowledge_immediate(
                ctx,
                View::notice(
                    "This button has retired",
                    format!("Run `/{}` again for an up-to-date message.", token.command),
                ),
            )
            .await
            .map_err(FlowError::immediate)?;
        Ok(Delivery::Immediate)
    }
}

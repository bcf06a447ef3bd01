//! Collaborators at the edge of the navigation core.
//!
//! The core never talks to the chat platform directly. Inbound events
//! arrive as [`InteractionEvent`]s; outbound replies go through the three
//! [`Transport`] operations, and failures go to an [`ErrorReporter`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::error::FlowError;
use crate::application::views::View;
use crate::domain::error::NavError;

/// Who sent an interaction and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionContext {
    pub id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub user_id: String,
}

impl InteractionContext {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            guild_id: None,
            user_id: user_id.into(),
        }
    }

    pub fn in_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// The guild for guild interactions, the user for direct messages.
    pub fn audience(&self) -> &str {
        self.guild_id.as_deref().unwrap_or(&self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEvent {
    #[serde(flatten)]
    pub context: InteractionContext,
    pub data: InteractionData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionData {
    /// A slash command; carries no token.
    Command {
        name: String,
        #[serde(default)]
        options: BTreeMap<String, String>,
    },
    /// A button press or menu selection; `custom_id` is a navigation token.
    Component {
        custom_id: String,
        #[serde(default)]
        values: Vec<String>,
    },
}

/// Flavor of a deferred acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferKind {
    /// "Thinking"; a new message follows.
    NewMessage,
    /// Silent; the message carrying the component is edited in place.
    UpdateMessage,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Answer within the acknowledgment deadline with final content.
    async fn acknowledge_immediate(
        &self,
        ctx: &InteractionContext,
        view: View,
    ) -> Result<(), NavError>;

    /// Answer within the acknowledgment deadline, promising an edit.
    async fn acknowledge_deferred(
        &self,
        ctx: &InteractionContext,
        kind: DeferKind,
    ) -> Result<(), NavError>;

    /// Replace the deferred acknowledgment with content.
    async fn edit_with_result(&self, ctx: &InteractionContext, view: View)
    -> Result<(), NavError>;
}

/// Single sink for user-visible failure messages.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn report(&self, ctx: &InteractionContext, error: &FlowError);
}

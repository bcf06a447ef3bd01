//! Inbound interaction routing.
//!
//! Slash commands route by name, components by the domain tag of their
//! token's command id, legacy components by their first field. Each
//! interaction runs on its own detached task; whatever fails inside that
//! task is handed to the [`ErrorReporter`] before the task ends.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span};

use crate::application::error::{Delivery, FlowError};
use crate::application::transport::{
    ErrorReporter, InteractionContext, InteractionData, InteractionEvent,
};
use crate::domain::error::NavError;
use crate::domain::token::{self, DecodedToken, LegacyToken, NavigationToken};
use crate::domain::types::{Behavior, Domain};

const SOURCE: &str = "application::dispatcher";
const METRIC_DISPATCH: &str = "kurohelper_dispatch_total";

/// What a feature handler is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// A slash command; no token exists yet.
    New {
        command: String,
        options: BTreeMap<String, String>,
    },
    /// A component interaction carrying a decoded token.
    Navigate(NavigationToken),
}

#[async_trait]
pub trait FeatureHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &InteractionContext,
        invocation: Invocation,
    ) -> Result<Delivery, FlowError>;
}

/// Handler for components minted in the legacy token form.
#[async_trait]
pub trait LegacyHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &InteractionContext,
        token: LegacyToken,
    ) -> Result<Delivery, FlowError>;
}

pub struct Dispatcher {
    features: HashMap<Domain, Arc<dyn FeatureHandler>>,
    commands: HashMap<String, Domain>,
    legacy: HashMap<String, Arc<dyn LegacyHandler>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Dispatcher {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            features: HashMap::new(),
            commands: HashMap::new(),
            legacy: HashMap::new(),
            reporter,
        }
    }

    /// Route slash command `command` and every `domain` token to `handler`.
    pub fn register(
        &mut self,
        domain: Domain,
        command: impl Into<String>,
        handler: Arc<dyn FeatureHandler>,
    ) {
        self.commands.insert(command.into(), domain);
        self.features.insert(domain, handler);
    }

    pub fn register_legacy(&mut self, command: impl Into<String>, handler: Arc<dyn LegacyHandler>) {
        self.legacy.insert(command.into(), handler);
    }

    pub fn domains(&self) -> impl Iterator<Item = Domain> + '_ {
        self.features.keys().copied()
    }

    /// Handle `event` on a detached task.
    pub fn dispatch(self: &Arc<Self>, event: InteractionEvent) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        let span = info_span!("interaction", id = %event.context.id);
        tokio::spawn(async move { dispatcher.run(event).await }.instrument(span))
    }

    /// Handle `event` and report any failure; resolves once the reply is out.
    pub async fn run(&self, event: InteractionEvent) {
        let ctx = event.context.clone();
        let outcome = match self.route(&ctx, event.data).await {
            Ok(_) => "ok",
            Err(error) => {
                self.reporter.report(&ctx, &error).await;
                error.kind()
            }
        };
        counter!(METRIC_DISPATCH, "outcome" => outcome).increment(1);
    }

    /// Route one interaction to its handler without reporting failures.
    pub async fn route(
        &self,
        ctx: &InteractionContext,
        data: InteractionData,
    ) -> Result<Delivery, FlowError> {
        match data {
            InteractionData::Command { name, options } => {
                let Some(domain) = self.commands.get(&name).copied() else {
                    info!(target: SOURCE, command = %name, "Unknown slash command");
                    return Err(FlowError::immediate(NavError::unknown_command(name)));
                };
                let handler = self.feature(domain, &name)?;
                debug!(target: SOURCE, command = %name, domain = %domain, "Routing command");
                handler
                    .handle(ctx, Invocation::New {
                        command: name,
                        options,
                    })
                    .await
            }
            InteractionData::Component { custom_id, values } => {
                match token::decode(&custom_id) {
                    Ok(DecodedToken::Compact(token)) => {
                        self.route_compact(ctx, token, values).await
                    }
                    Ok(DecodedToken::Legacy(token)) => self.route_legacy(ctx, token).await,
                    Err(err) => {
                        info!(target: SOURCE, custom_id = %custom_id, error = %err, "Undecodable component token");
                        Err(FlowError::immediate(err))
                    }
                }
            }
        }
    }

    async fn route_compact(
        &self,
        ctx: &InteractionContext,
        token: NavigationToken,
        values: Vec<String>,
    ) -> Result<Delivery, FlowError> {
        // Menus are minted without a value; the transport reports the pick.
        let token = match (token.behavior(), values.first()) {
            (Behavior::SelectMenu, Some(selected)) => token
                .with_value(selected)
                .map_err(FlowError::immediate)?,
            _ => token,
        };

        let command_id = token.command_id().as_str().to_string();
        let Some(domain) = token.command_id().domain() else {
            info!(target: SOURCE, command_id = %command_id, "Token names no known domain");
            return Err(FlowError::immediate(NavError::unknown_command(command_id)));
        };
        let handler = self.feature(domain, &command_id)?;
        debug!(
            target: SOURCE,
            command_id = %command_id,
            behavior = %token.behavior(),
            "Routing component"
        );
        handler.handle(ctx, Invocation::Navigate(token)).await
    }

    async fn route_legacy(
        &self,
        ctx: &InteractionContext,
        token: LegacyToken,
    ) -> Result<Delivery, FlowError> {
        let Some(handler) = self.legacy.get(&token.command).cloned() else {
            info!(target: SOURCE, command = %token.command, "Unknown legacy component");
            return Err(FlowError::immediate(NavError::unknown_command(token.command)));
        };
        handler.handle(ctx, token).await
    }

    fn feature(&self, domain: Domain, command: &str) -> Result<Arc<dyn FeatureHandler>, FlowError> {
        self.features.get(&domain).cloned().ok_or_else(|| {
            info!(target: SOURCE, command, domain = %domain, "Domain has no registered feature");
            FlowError::immediate(NavError::unknown_command(command))
        })
    }
}

//! Reusable navigation flows.
//!
//! Every paginated feature runs through the same choreography: look the
//! result set up (or fetch it on a miss), bind it to a session handle,
//! render a page and deliver it inside the transport's timing contract.
//! Features supply only a fetcher and a builder.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::histogram;
use tracing::{debug, info, warn};

use crate::application::error::{Delivery, FlowError};
use crate::application::transport::{DeferKind, InteractionContext, Transport};
use crate::application::views::View;
use crate::cache::{CacheMiss, CacheStore, SessionIndex, content_key, entry_key, parse_entry_key};
use crate::domain::error::NavError;
use crate::domain::token::{CommandId, NavigationToken};
use crate::domain::types::Behavior;

const SOURCE: &str = "application::navigator";
const METRIC_FETCH_MS: &str = "kurohelper_fetch_ms";

#[derive(Clone)]
pub struct Navigator {
    sessions: Arc<SessionIndex>,
    transport: Arc<dyn Transport>,
    fetch_timeout: Duration,
}

impl Navigator {
    pub fn new(
        sessions: Arc<SessionIndex>,
        transport: Arc<dyn Transport>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            transport,
            fetch_timeout,
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Answer a fresh search.
    ///
    /// A cached result is rendered and sent as the immediate response. On a
    /// miss the interaction is deferred first, then `fetch` runs and its
    /// result is cached before the deferred response is edited.
    pub async fn search_list<T, F, Fut, B>(
        &self,
        ctx: &InteractionContext,
        command_id: &CommandId,
        input: &str,
        results: &CacheStore<String, T>,
        fetch: F,
        build: B,
    ) -> Result<Delivery, FlowError>
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, NavError>>,
        B: Fn(&T, u32, &str) -> Result<View, NavError>,
    {
        let key = content_key(command_id.as_str(), input);

        if let Ok(value) = results.get(&key) {
            let handle = self.sessions.open(&key);
            let view = build(&value, 1, &handle).map_err(FlowError::immediate)?;
            self.transport
                .acknowledge_immediate(ctx, view)
                .await
                .map_err(FlowError::immediate)?;
            return Ok(Delivery::Immediate);
        }

        self.transport
            .acknowledge_deferred(ctx, DeferKind::NewMessage)
            .await
            .map_err(FlowError::immediate)?;

        info!(
            target: SOURCE,
            command_id = %command_id,
            content_key = %key,
            "Result cache miss, fetching"
        );
        let value = self.fetch(fetch).await.map_err(|err| {
            warn!(
                target: SOURCE,
                command_id = %command_id,
                content_key = %key,
                error = %err,
                "Search fetch failed"
            );
            FlowError::deferred(err)
        })?;
        results.set(key.clone(), value.clone());

        let handle = self.sessions.open(&key);
        let view = build(&value, 1, &handle).map_err(FlowError::deferred)?;
        self.edit(ctx, view).await?;
        Ok(Delivery::Deferred)
    }

    /// Redraw the session's result set at the page carried by `token`.
    pub async fn change_page<T, B>(
        &self,
        ctx: &InteractionContext,
        token: &NavigationToken,
        results: &CacheStore<String, T>,
        build: B,
    ) -> Result<Delivery, FlowError>
    where
        T: Clone,
        B: Fn(&T, u32, &str) -> Result<View, NavError>,
    {
        self.acknowledge_update(ctx).await?;
        let view = token.to_page().map_err(FlowError::deferred)?;
        self.redraw(ctx, &view.cache_id, view.page, results, build)
            .await
    }

    /// Redraw the session's result set at page one, whatever the token's value.
    pub async fn back_to_home<T, B>(
        &self,
        ctx: &InteractionContext,
        token: &NavigationToken,
        results: &CacheStore<String, T>,
        build: B,
    ) -> Result<Delivery, FlowError>
    where
        T: Clone,
        B: Fn(&T, u32, &str) -> Result<View, NavError>,
    {
        self.acknowledge_update(ctx).await?;
        let view = token.to_back_to_home().map_err(FlowError::deferred)?;
        self.redraw(ctx, &view.cache_id, 1, results, build).await
    }

    /// Show a single entry picked from a result page.
    ///
    /// Accepts SelectMenu and DetailButton tokens. The session must still be
    /// indexed; the entry itself is read through `details`, falling back to
    /// `fetch` on a miss. A fresh entry session is opened so the detail view
    /// can page on its own; `build` receives the page, the list handle and
    /// the entry handle.
    pub async fn show_detail<K, D, F, Fut, B>(
        &self,
        ctx: &InteractionContext,
        token: &NavigationToken,
        details: &CacheStore<K, D>,
        fetch: F,
        build: B,
    ) -> Result<Delivery, FlowError>
    where
        K: Hash + Eq + Clone + From<String>,
        D: Clone,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<D, NavError>>,
        B: Fn(&D, u32, &str, &str) -> Result<View, NavError>,
    {
        self.acknowledge_update(ctx).await?;

        let (cache_id, item_id) = match token.behavior() {
            Behavior::DetailButton => token
                .to_detail_button()
                .map(|view| (view.cache_id, view.item_id)),
            _ => token
                .to_select_menu()
                .map(|view| (view.cache_id, view.item_id)),
        }
        .map_err(FlowError::deferred)?;

        self.resolve_session(&cache_id)
            .map_err(FlowError::deferred)?;

        let item = self.load_detail(&item_id, details, fetch).await?;
        let entry_handle = self.sessions.open(&entry_key(&cache_id, &item_id));

        let view = build(&item, 1, &cache_id, &entry_handle).map_err(FlowError::deferred)?;
        self.edit(ctx, view).await?;
        Ok(Delivery::Deferred)
    }

    /// Redraw an opened entry at the page carried by `token`.
    ///
    /// The token's cache id is the entry session minted by
    /// [`show_detail`](Self::show_detail).
    pub async fn change_detail_page<K, D, F, Fut, B>(
        &self,
        ctx: &InteractionContext,
        token: &NavigationToken,
        details: &CacheStore<K, D>,
        fetch: F,
        build: B,
    ) -> Result<Delivery, FlowError>
    where
        K: Hash + Eq + Clone + From<String>,
        D: Clone,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<D, NavError>>,
        B: Fn(&D, u32, &str, &str) -> Result<View, NavError>,
    {
        self.acknowledge_update(ctx).await?;
        let view = token.to_page().map_err(FlowError::deferred)?;

        let key = self
            .resolve_session(&view.cache_id)
            .map_err(FlowError::deferred)?;
        let Some((list_handle, item_id)) = parse_entry_key(&key) else {
            return Err(FlowError::deferred(NavError::malformed(format!(
                "session `{}` does not refer to an entry",
                view.cache_id
            ))));
        };

        let item = self.load_detail(item_id, details, fetch).await?;
        let rendered =
            build(&item, view.page, list_handle, &view.cache_id).map_err(FlowError::deferred)?;
        self.edit(ctx, rendered).await?;
        Ok(Delivery::Deferred)
    }

    /// Resolve a session handle to its content key.
    pub fn resolve_session(&self, handle: &str) -> Result<String, NavError> {
        self.sessions
            .resolve(handle)
            .map_err(|miss| session_expired(handle, miss))
    }

    async fn redraw<T, B>(
        &self,
        ctx: &InteractionContext,
        handle: &str,
        page: u32,
        results: &CacheStore<String, T>,
        build: B,
    ) -> Result<Delivery, FlowError>
    where
        T: Clone,
        B: Fn(&T, u32, &str) -> Result<View, NavError>,
    {
        let key = self.resolve_session(handle).map_err(FlowError::deferred)?;
        let value = results
            .get(&key)
            .map_err(|miss| FlowError::deferred(session_expired(handle, miss)))?;
        let view = build(&value, page, handle).map_err(FlowError::deferred)?;
        self.edit(ctx, view).await?;
        Ok(Delivery::Deferred)
    }

    async fn load_detail<K, D, F, Fut>(
        &self,
        item_id: &str,
        details: &CacheStore<K, D>,
        fetch: F,
    ) -> Result<D, FlowError>
    where
        K: Hash + Eq + Clone + From<String>,
        D: Clone,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<D, NavError>>,
    {
        let key = K::from(item_id.to_string());
        if let Ok(item) = details.get(&key) {
            return Ok(item);
        }

        debug!(target: SOURCE, item_id = %item_id, "Detail cache miss, fetching");
        let owned = item_id.to_string();
        let item = self
            .fetch(|| fetch(owned))
            .await
            .map_err(FlowError::deferred)?;
        details.set(key, item.clone());
        Ok(item)
    }

    async fn acknowledge_update(&self, ctx: &InteractionContext) -> Result<(), FlowError> {
        self.transport
            .acknowledge_deferred(ctx, DeferKind::UpdateMessage)
            .await
            .map_err(FlowError::immediate)
    }

    async fn edit(&self, ctx: &InteractionContext, view: View) -> Result<(), FlowError> {
        self.transport
            .edit_with_result(ctx, view)
            .await
            .map_err(FlowError::deferred)
    }

    async fn fetch<T, F, Fut>(&self, fetch: F) -> Result<T, NavError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, NavError>>,
    {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.fetch_timeout, fetch()).await;
        histogram!(METRIC_FETCH_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        match outcome {
            Ok(result) => result,
            Err(_) => Err(NavError::upstream(format!(
                "fetch did not finish within {}s",
                self.fetch_timeout.as_secs()
            ))),
        }
    }
}

fn session_expired(handle: &str, miss: CacheMiss) -> NavError {
    debug!(target: SOURCE, session = %handle, reason = %miss, "Navigation session expired");
    NavError::SessionExpired
}

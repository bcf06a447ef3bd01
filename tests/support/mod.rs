#![allow(dead_code)]

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kurohelper::application::catalog::{Catalog, CatalogError};
use kurohelper::application::dispatcher::Dispatcher;
use kurohelper::application::features::{
    LEGACY_COMMANDS, RetiredComponent, SearchFeature, SearchSettings, command_name,
};
use kurohelper::application::navigator::Navigator;
use kurohelper::application::reporting::TransportReporter;
use kurohelper::application::transport::{
    DeferKind, InteractionContext, InteractionData, InteractionEvent, Transport,
};
use kurohelper::application::views::{Block, ImagePolicy, View};
use kurohelper::cache::SessionIndex;
use kurohelper::domain::catalog::CatalogItem;
use kurohelper::domain::error::NavError;
use kurohelper::domain::types::Domain;
use kurohelper::infra::catalog::JsonCatalog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Immediate(View),
    Deferred(DeferKind),
    Edit(View),
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, Sent)>>,
}

impl RecordingTransport {
    /// Everything sent for interaction `id`, in order.
    pub fn sent_for(&self, id: &str) -> Vec<Sent> {
        self.sent
            .lock()
            .expect("sent lock")
            .iter()
            .filter(|(interaction, _)| interaction == id)
            .map(|(_, sent)| sent.clone())
            .collect()
    }

    /// The view carried by the last message for `id`.
    pub fn last_view(&self, id: &str) -> View {
        self.sent_for(id)
            .into_iter()
            .rev()
            .find_map(|sent| match sent {
                Sent::Immediate(view) | Sent::Edit(view) => Some(view),
                Sent::Deferred(_) => None,
            })
            .expect("a view was sent")
    }

    fn record(&self, ctx: &InteractionContext, sent: Sent) {
        self.sent
            .lock()
            .expect("sent lock")
            .push((ctx.id.clone(), sent));
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn acknowledge_immediate(
        &self,
        ctx: &InteractionContext,
        view: View,
    ) -> Result<(), NavError> {
        self.record(ctx, Sent::Immediate(view));
        Ok(())
    }

    async fn acknowledge_deferred(
        &self,
        ctx: &InteractionContext,
        kind: DeferKind,
    ) -> Result<(), NavError> {
        self.record(ctx, Sent::Deferred(kind));
        Ok(())
    }

    async fn edit_with_result(
        &self,
        ctx: &InteractionContext,
        view: View,
    ) -> Result<(), NavError> {
        self.record(ctx, Sent::Edit(view));
        Ok(())
    }
}

/// Wraps a catalog and counts searches reaching it.
pub struct CountingCatalog {
    inner: JsonCatalog,
    searches: AtomicUsize,
}

impl CountingCatalog {
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Catalog for CountingCatalog {
    async fn search(
        &self,
        domain: Domain,
        source: char,
        keyword: &str,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(domain, source, keyword).await
    }

    async fn get(
        &self,
        domain: Domain,
        source: char,
        id: &str,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        self.inner.get(domain, source, id).await
    }
}

/// Characters `Character 1..=count` with ids `h1..`.
pub fn characters(count: usize) -> Vec<CatalogItem> {
    (1..=count)
        .map(|index| CatalogItem {
            domain: Domain::Character,
            source: '1',
            id: format!("h{index}"),
            title: format!("Character {index}"),
            original: None,
            aliases: Vec::new(),
            summary: format!("Profile of character {index}."),
            image_url: Some(format!("https://img.invalid/h{index}.jpg")),
            works: Vec::new(),
        })
        .collect()
}

pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub transport: Arc<RecordingTransport>,
    pub catalog: Arc<CountingCatalog>,
}

pub fn harness(items: Vec<CatalogItem>, page_size: usize) -> Harness {
    let transport = Arc::new(RecordingTransport::default());
    let catalog = Arc::new(CountingCatalog {
        inner: JsonCatalog::new(items, vec!['1']),
        searches: AtomicUsize::new(0),
    });
    let ttl = Duration::from_secs(600);
    let capacity = NonZeroUsize::new(64).expect("non-zero");
    let navigator = Navigator::new(
        Arc::new(SessionIndex::new(ttl, capacity)),
        transport.clone(),
        Duration::from_secs(5),
    );

    let mut dispatcher = Dispatcher::new(Arc::new(TransportReporter::new(transport.clone())));
    for domain in Domain::ALL {
        let feature = SearchFeature::new(
            domain,
            &['1'],
            catalog.clone(),
            navigator.clone(),
            Arc::new(ImagePolicy::default()),
            SearchSettings {
                page_size,
                ttl,
                result_capacity: capacity,
            },
        )
        .expect("feature builds");
        dispatcher.register(domain, command_name(domain), Arc::new(feature));
    }
    let retired = Arc::new(RetiredComponent::new(transport.clone()));
    for legacy in LEGACY_COMMANDS {
        dispatcher.register_legacy(legacy, retired.clone());
    }

    Harness {
        dispatcher: Arc::new(dispatcher),
        transport,
        catalog,
    }
}

pub fn command(id: &str, name: &str, keyword: &str) -> InteractionEvent {
    let mut options = BTreeMap::new();
    options.insert("keyword".to_string(), keyword.to_string());
    InteractionEvent {
        context: InteractionContext::new(id, "user-1"),
        data: InteractionData::Command {
            name: name.to_string(),
            options,
        },
    }
}

pub fn component(id: &str, custom_id: &str, values: &[&str]) -> InteractionEvent {
    InteractionEvent {
        context: InteractionContext::new(id, "user-1"),
        data: InteractionData::Component {
            custom_id: custom_id.to_string(),
            values: values.iter().map(|value| value.to_string()).collect(),
        },
    }
}

/// Text of the `Page x/y` indicator.
pub fn page_indicator(view: &View) -> Option<&str> {
    view.blocks.iter().find_map(|block| match block {
        Block::Text { text } if text.starts_with("Page ") => Some(text.as_str()),
        _ => None,
    })
}

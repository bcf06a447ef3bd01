//! In-memory collaborators for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::application::catalog::{Catalog, CatalogError};
use crate::application::error::FlowError;
use crate::application::transport::{DeferKind, ErrorReporter, InteractionContext, Transport};
use crate::application::views::View;
use crate::domain::catalog::CatalogItem;
use crate::domain::error::NavError;
use crate::domain::types::Domain;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Immediate { interaction: String, view: View },
    Deferred { interaction: String, kind: DeferKind },
    Edit { interaction: String, view: View },
}

impl Sent {
    pub fn view(&self) -> Option<&View> {
        match self {
            Sent::Immediate { view, .. } | Sent::Edit { view, .. } => Some(view),
            Sent::Deferred { .. } => None,
        }
    }
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("sent lock").clone()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().expect("sent lock").push(sent);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn acknowledge_immediate(
        &self,
        ctx: &InteractionContext,
        view: View,
    ) -> Result<(), NavError> {
        self.record(Sent::Immediate {
            interaction: ctx.id.clone(),
            view,
        });
        Ok(())
    }

    async fn acknowledge_deferred(
        &self,
        ctx: &InteractionContext,
        kind: DeferKind,
    ) -> Result<(), NavError> {
        self.record(Sent::Deferred {
            interaction: ctx.id.clone(),
            kind,
        });
        Ok(())
    }

    async fn edit_with_result(
        &self,
        ctx: &InteractionContext,
        view: View,
    ) -> Result<(), NavError> {
        self.record(Sent::Edit {
            interaction: ctx.id.clone(),
            view,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(String, FlowError)>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<(String, FlowError)> {
        self.reports.lock().expect("reports lock").clone()
    }
}

#[async_trait]
impl ErrorReporter for RecordingReporter {
    async fn report(&self, ctx: &InteractionContext, error: &FlowError) {
        self.reports
            .lock()
            .expect("reports lock")
            .push((ctx.id.clone(), error.clone()));
    }
}

/// Catalog over a fixed item list that counts backend calls.
#[derive(Default)]
pub struct CountingCatalog {
    items: Vec<CatalogItem>,
    searches: AtomicUsize,
    gets: AtomicUsize,
}

impl CountingCatalog {
    /// `count` characters with ids `h0..`, titles `Character 0..` and images.
    pub fn with_characters(count: usize) -> Self {
        let items = (0..count)
            .map(|index| CatalogItem {
                domain: Domain::Character,
                source: '1',
                id: format!("h{index}"),
                title: format!("Character {index}"),
                original: None,
                aliases: Vec::new(),
                summary: format!("Summary of character {index}"),
                image_url: Some(format!("https://img.invalid/h{index}.jpg")),
                works: Vec::new(),
            })
            .collect();
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Catalog for CountingCatalog {
    async fn search(
        &self,
        domain: Domain,
        _source: char,
        keyword: &str,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .items
            .iter()
            .filter(|item| item.domain == domain && item.matches(keyword))
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        domain: Domain,
        _source: char,
        id: &str,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .items
            .iter()
            .find(|item| item.domain == domain && item.id == id)
            .cloned())
    }
}

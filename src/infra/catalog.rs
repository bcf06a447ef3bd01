//! Catalog backed by a JSON file loaded once at startup.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::application::catalog::{Catalog, CatalogError};
use crate::domain::catalog::CatalogItem;
use crate::domain::types::Domain;
use crate::infra::error::InfraError;

const SOURCE: &str = "infra::catalog";

/// In-memory catalog over a JSON array of [`CatalogItem`]s.
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    items: Vec<CatalogItem>,
    sources: Vec<char>,
}

impl JsonCatalog {
    pub fn new(items: Vec<CatalogItem>, sources: Vec<char>) -> Self {
        Self { items, sources }
    }

    /// Read the catalog at `path`; no path yields an empty catalog.
    pub async fn load(path: Option<&Path>, sources: Vec<char>) -> Result<Self, InfraError> {
        let Some(path) = path else {
            info!(target: SOURCE, "no catalog configured; searches return nothing");
            return Ok(Self::new(Vec::new(), sources));
        };

        let raw = tokio::fs::read(path).await?;
        let items: Vec<CatalogItem> = serde_json::from_slice(&raw)
            .map_err(|err| InfraError::catalog(format!("{}: {err}", path.display())))?;
        for item in &items {
            item.check_id().map_err(|reason| {
                InfraError::catalog(format!("{}: {reason}", path.display()))
            })?;
        }

        info!(
            target: SOURCE,
            path = %path.display(),
            items = items.len(),
            "catalog loaded"
        );
        Ok(Self::new(items, sources))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn check_source(&self, domain: Domain, source: char) -> Result<(), CatalogError> {
        if self.sources.contains(&source) {
            Ok(())
        } else {
            Err(CatalogError::UnsupportedSource { domain, tag: source })
        }
    }
}

#[async_trait]
impl Catalog for JsonCatalog {
    async fn search(
        &self,
        domain: Domain,
        source: char,
        keyword: &str,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.check_source(domain, source)?;
        Ok(self
            .items
            .iter()
            .filter(|item| item.domain == domain && item.source == source)
            .filter(|item| item.matches(keyword))
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        domain: Domain,
        source: char,
        id: &str,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        self.check_source(domain, source)?;
        Ok(self
            .items
            .iter()
            .find(|item| item.domain == domain && item.source == source && item.id == id)
            .cloned())
    }
}

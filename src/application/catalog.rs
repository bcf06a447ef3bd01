//! Catalog backend abstraction consumed by search features.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::catalog::CatalogItem;
use crate::domain::error::NavError;
use crate::domain::types::Domain;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog backend failure: {0}")]
    Backend(String),
    #[error("catalog source `{tag}` does not serve {domain}")]
    UnsupportedSource { domain: Domain, tag: char },
}

impl CatalogError {
    pub fn from_backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<CatalogError> for NavError {
    fn from(err: CatalogError) -> Self {
        NavError::upstream(err.to_string())
    }
}

/// Read-only search backend.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Entries of `domain` from `source` whose names contain `keyword`.
    async fn search(
        &self,
        domain: Domain,
        source: char,
        keyword: &str,
    ) -> Result<Vec<CatalogItem>, CatalogError>;

    /// One entry by id; `Ok(None)` when the id is unknown.
    async fn get(
        &self,
        domain: Domain,
        source: char,
        id: &str,
    ) -> Result<Option<CatalogItem>, CatalogError>;
}

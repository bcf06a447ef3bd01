//! Catalog entries returned by search backends.

use serde::{Deserialize, Serialize};

use super::token::is_token_value;
use super::types::Domain;

/// Longest item id that still fits a detail token under the 100-character
/// ceiling: a 3-character command id, tag, two delimiters and a 32-character
/// session handle leave 62.
pub const MAX_ITEM_ID_LEN: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub domain: Domain,
    /// Sub-mode character of the backend the entry came from.
    pub source: char,
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Related titles listed on the detail view, e.g. a brand's games.
    #[serde(default)]
    pub works: Vec<String>,
}

impl CatalogItem {
    /// Original-language title when present, otherwise the romanized one.
    pub fn display_name(&self) -> &str {
        match self.original.as_deref() {
            Some(original) if !original.trim().is_empty() => original,
            _ => &self.title,
        }
    }

    /// Reject ids that cannot be carried inside a navigation token.
    pub fn check_id(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("item id is empty".to_string());
        }
        if self.id.len() > MAX_ITEM_ID_LEN {
            return Err(format!(
                "item id `{}` exceeds {MAX_ITEM_ID_LEN} characters",
                self.id
            ));
        }
        if !is_token_value(&self.id) {
            return Err(format!(
                "item id `{}` must be printable ASCII without `~`, `|` or spaces",
                self.id
            ));
        }
        Ok(())
    }

    /// Case-insensitive substring match over every name the entry carries.
    pub fn matches(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        std::iter::once(self.title.as_str())
            .chain(self.original.as_deref())
            .chain(self.aliases.iter().map(String::as_str))
            .any(|name| name.to_lowercase().contains(&needle))
    }
}

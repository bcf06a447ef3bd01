//! Content keys and session handles.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use uuid::Uuid;

/// Derive the result-cache key for a search.
///
/// Whitespace runs are collapsed and the ends trimmed, so identical queries
/// always land on the same key. The scope (normally the command id) keeps
/// keys from different features apart even though the query text matches.
pub fn content_key(scope: &str, input: &str) -> String {
    let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{scope}:{}", URL_SAFE_NO_PAD.encode(normalized.as_bytes()))
}

const ENTRY_SCOPE: &str = "entry";

/// Session key for one entry opened from the result set behind
/// `list_handle`.
///
/// Content keys are scoped by a 2-3 character command id, so the longer
/// scope here never collides with them.
pub fn entry_key(list_handle: &str, item_id: &str) -> String {
    format!("{ENTRY_SCOPE}:{list_handle}:{item_id}")
}

/// Split an [`entry_key`] back into the list handle and item id.
pub fn parse_entry_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix(ENTRY_SCOPE)?.strip_prefix(':')?;
    rest.split_once(':')
        .filter(|(list_handle, item_id)| !list_handle.is_empty() && !item_id.is_empty())
}

/// Mint a fresh session handle.
///
/// Handles are 32 lowercase hex characters, inside the token cache-id
/// alphabet and short enough to leave room for a value under the token
/// length ceiling.
pub fn mint_session_handle() -> String {
    Uuid::new_v4().simple().to_string()
}
